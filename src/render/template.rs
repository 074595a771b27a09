use std::io::Write;

use crate::constants::{ATOMIC_MASS_UNIT, ELEMENTARY_CHARGE};
use crate::error::Error;
use crate::model::attributes::RigidGroups;
use crate::model::element::{Element, ElementId};
use crate::simulation::SimulationConfig;

/// Everything the script template substitutes.
pub struct Context<'a> {
    pub name: &'a str,
    pub config: &'a SimulationConfig,
    pub timestep: f64,
    pub species: &'a [&'a Element],
    pub simulation: &'a [&'a Element],
    pub rigid: &'a RigidGroups,
    pub version: &'a str,
    pub generated_at: &'a str,
}

pub fn write<W: Write>(mut writer: W, ctx: &Context<'_>) -> Result<(), Error> {
    let [lx, ly, lz] = ctx.config.domain;

    writeln!(
        writer,
        "# LAMMPS input generated by ion-forge {} on {}",
        ctx.version, ctx.generated_at
    )?;
    writeln!(writer, "# Simulation: {}", ctx.name)?;
    writeln!(writer)?;
    writeln!(writer, "units si")?;
    writeln!(writer, "atom_style charge")?;
    writeln!(writer, "atom_modify map array")?;
    writeln!(writer)?;

    writeln!(writer, "# Simulation box")?;
    writeln!(
        writer,
        "region simulationDomain block {:e} {lx:e} {:e} {ly:e} {:e} {lz:e} units box",
        -lx, -ly, -lz
    )?;
    writeln!(
        writer,
        "create_box {} simulationDomain",
        ctx.species.len()
    )?;
    writeln!(writer)?;

    writeln!(writer, "# Interactions")?;
    writeln!(
        writer,
        "neighbor {:e} {}",
        ctx.config.neighbour.skin, ctx.config.neighbour.style
    )?;
    writeln!(writer, "pair_style coul/cut {:e}", ctx.config.coulomb_cutoff)?;
    writeln!(writer, "pair_coeff * *")?;
    writeln!(writer)?;

    for element in ctx.species {
        write_species(&mut writer, element)?;
    }

    writeln!(writer, "# Timestep")?;
    writeln!(writer, "timestep {:e}", ctx.timestep)?;
    writeln!(writer)?;

    write_integrator(&mut writer, ctx.rigid)?;

    for element in ctx.simulation {
        for line in &element.code {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn write_species<W: Write>(writer: &mut W, element: &Element) -> Result<(), Error> {
    let (Some(id), Some(data)) = (element.id.as_ref(), element.species_data()) else {
        return Ok(());
    };

    for line in &element.code {
        writeln!(writer, "{line}")?;
    }
    writeln!(writer, "mass {id} {:e}", data.mass * ATOMIC_MASS_UNIT)?;
    for [x, y, z] in &data.positions {
        writeln!(writer, "create_atoms {id} single {x:e} {y:e} {z:e} units box")?;
    }
    writeln!(writer, "group {} type {id}", group_name(id))?;
    writeln!(
        writer,
        "set group {} charge {:e}",
        group_name(id),
        data.charge * ELEMENTARY_CHARGE
    )?;
    writeln!(writer)?;
    Ok(())
}

fn write_integrator<W: Write>(writer: &mut W, rigid: &RigidGroups) -> Result<(), Error> {
    writeln!(writer, "# Integrator")?;
    if rigid.exists {
        let groups: Vec<String> = rigid
            .groups
            .iter()
            .map(|&id| group_name(&ElementId::Int(id)))
            .collect();
        writeln!(writer, "group rigidBodies union {}", groups.join(" "))?;
        writeln!(writer, "group nonRigidBodies subtract all rigidBodies")?;
        writeln!(
            writer,
            "fix rigidIntegrator rigidBodies rigid/nve group {} {}",
            rigid.length,
            groups.join(" ")
        )?;
        writeln!(writer, "fix integrator nonRigidBodies nve")?;
    } else {
        writeln!(writer, "fix integrator all nve")?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Engine group holding the atoms of one species.
pub fn group_name(id: &ElementId) -> String {
    format!("species{id}")
}
