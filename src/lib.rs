//! A Rust library for building, rendering, and running LAMMPS simulations of
//! trapped ions.
//!
//! A simulation is assembled from declarative *elements*: ion species, fixes
//! that apply fields and forces, commands such as `run` or `minimize`, and
//! derived per-atom variables. Elements are produced by factories, appended to a
//! [`Simulation`], and merged into one LAMMPS input script that is then run as a
//! subprocess.
//!
//! # Features
//!
//! - **Element factories** – static and trapping fields, Langevin baths, dumps,
//!   velocity initialisation, energy minimisation, time averages
//! - **Linear Paul traps** – full time-dependent RF fields or the static
//!   pseudo-potential approximation, with secular-frequency helpers
//! - **Deterministic identity** – content-hash ids for fixes and variables, dense
//!   atom-type ids for species
//! - **Validation** – duplicate ids, inconsistent species numbering, and empty
//!   simulations are rejected before anything is written
//! - **Execution** – streams and condenses engine output, stops cleanly on Ctrl-C,
//!   and archives the run record with its outputs
//!
//! # Quick Start
//!
//! ```
//! use ion_forge::factory::{commands, fixes, species};
//! use ion_forge::{Ions, Simulation, SimulationConfig};
//!
//! let dir = tempfile::tempdir()?;
//! let config = SimulationConfig {
//!     output_dir: dir.path().to_path_buf(),
//!     ..Default::default()
//! };
//! let mut sim = Simulation::with_config("quick start", config);
//!
//! let calcium = Ions::new(1.0, 40.0);
//! sim.append(species::place_ions(&calcium, &[[0.0, 0.0, -1e-5], [0.0, 0.0, 1e-5]])?);
//! sim.append(fixes::langevin_bath(1e-3, 1e-5)?);
//! sim.append(commands::evolve(1000)?);
//!
//! let script = sim.render()?;
//! assert!(script.text.contains("create_atoms 1 single"));
//! assert!(script.text.contains("run 1000"));
//! assert!(dir.path().join("quick_start.lammps").is_file());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! - [`factory`] – Element factories and the linear Paul trap generator
//! - [`Simulation`] – The element registry and its render/execute entry points
//! - [`render`] – Pure script rendering
//! - [`run`] – Engine subprocess and output filtering
//! - [`archive`] – Run record persistence
//!
//! # Data Types
//!
//! - [`Element`] – One unit of simulation configuration
//! - [`ElementKind`] – Species, fix, command, or variable
//! - [`ElementId`] – Engine-visible identifier
//! - [`Ions`] – Charge, mass, and rigidity of a species
//! - [`RunAttributes`] – Metadata of a rendered run
//! - [`SimulationConfig`] – Timestep, domain, and engine settings

mod constants;
mod error;
mod identity;
mod model;

pub mod archive;
pub mod factory;
pub mod render;
pub mod run;
pub mod simulation;

pub use constants::{ATOMIC_MASS_UNIT, ELEMENTARY_CHARGE};
pub use error::Error;
pub use identity::{Identities, SpeciesKey};
pub use model::attributes::{RigidGroups, RunAttributes};
pub use model::element::{Element, ElementId, ElementKind, Payload, SpeciesData};
pub use model::ions::Ions;
pub use run::{RunOutcome, RunState};
pub use simulation::{NeighbourList, Simulation, SimulationConfig};
