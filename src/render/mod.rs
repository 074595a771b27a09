//! Script rendering.
//!
//! [`render`] turns a frozen, ordered element list into one self-contained LAMMPS
//! input script plus the [`RunAttributes`] describing it. It validates the list
//! first, so a rendered script always satisfies the registry invariants.
//!
//! Rendering is pure: writing the script to disk and archiving it is left to
//! [`Simulation::render`](crate::Simulation::render).

pub mod template;

use std::io;

use crate::error::Error;
use crate::model::attributes::{RigidGroups, RunAttributes};
use crate::model::element::{Element, ElementKind};
use crate::simulation::SimulationConfig;
use crate::simulation::validate::validate;

pub use template::group_name;

/// A rendered input script.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub text: String,
    pub attributes: RunAttributes,
}

/// Renders `elements` in their current order.
///
/// Species are written first as atom definitions, everything else follows in
/// order after the integrator.
///
/// # Errors
///
/// The consistency errors of registry validation, or [`Error::Io`] if the
/// template could not be written.
pub fn render(
    name: &str,
    elements: &[Element],
    config: &SimulationConfig,
    timestep: f64,
) -> Result<Script, Error> {
    validate(elements)?;

    let (species, simulation): (Vec<&Element>, Vec<&Element>) =
        elements.iter().partition(|e| e.is_species());

    let rigid = RigidGroups::from_ids(
        species
            .iter()
            .filter(|e| e.rigid)
            .filter_map(|e| e.id.as_ref().and_then(|id| id.as_int()))
            .collect(),
    );

    let version = env!("CARGO_PKG_VERSION");
    let generated_at = chrono::Local::now().to_rfc3339();

    let mut buffer = Vec::new();
    template::write(
        &mut buffer,
        &template::Context {
            name,
            config,
            timestep,
            species: &species,
            simulation: &simulation,
            rigid: &rigid,
            version,
            generated_at: &generated_at,
        },
    )?;
    let text =
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok(Script {
        text,
        attributes: RunAttributes {
            name: name.to_string(),
            executable: config.executable.clone(),
            timestep,
            domain: config.domain,
            neighbour: config.neighbour.clone(),
            coulomb_cutoff: config.coulomb_cutoff,
            output_files: dump_files(&simulation),
            rigid,
            version: version.to_string(),
            generated_at,
        },
    })
}

/// Files written by `dump` statements in fix code, in order of appearance.
pub fn dump_files(elements: &[&Element]) -> Vec<String> {
    elements
        .iter()
        .filter(|e| e.kind() == ElementKind::Fix)
        .flat_map(|e| e.code.iter())
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                ["dump", _id, _group, _style, _every, file, ..] => Some(file.to_string()),
                _ => None,
            }
        })
        .collect()
}
