//! Error type for element construction, registry validation, and run orchestration.
//!
//! Variants are grouped by when they surface: structural errors are raised while an
//! element is being constructed, consistency errors when a [`Simulation`] is
//! rendered, and runtime errors while the engine subprocess is running.
//!
//! [`Simulation`]: crate::Simulation

use crate::model::element::{ElementId, ElementKind};
use thiserror::Error;

/// Errors that can occur while building, rendering, or running a simulation.
#[derive(Debug, Error)]
pub enum Error {
    /// A factory body returned something other than a table.
    #[error("factory '{factory}' must return a table of element fields, got {found}")]
    NotAMapping {
        /// Name of the offending factory.
        factory: String,
        /// TOML type name of the returned value.
        found: &'static str,
    },

    /// The `code` field of an element is not an array of strings.
    #[error("'code' of factory '{factory}' must be a list of strings: {detail}")]
    CodeNotList {
        /// Name of the offending factory.
        factory: String,
        /// What was found instead.
        detail: String,
    },

    /// A field required by the element kind is missing or has the wrong type.
    #[error("{kind} element from '{factory}' is missing required field '{field}'")]
    MissingField {
        /// Name of the offending factory.
        factory: String,
        /// Kind of the element being built.
        kind: ElementKind,
        /// The missing field.
        field: &'static str,
    },

    /// A factory that needs an identifier does not declare `uid` as its first parameter.
    #[error("first parameter of {kind} factory '{factory}' must be 'uid'")]
    IdentifierSlot {
        /// Name of the offending factory.
        factory: String,
        /// Kind the factory was defined for.
        kind: ElementKind,
    },

    /// A variable factory was given a symbol outside the allowed set.
    #[error(
        "unknown variable '{name}': use id, x, y, z, vx, vy, vz or previously defined quantities prefixed with v_, f_ or c_"
    )]
    UnknownVariable {
        /// The rejected symbol.
        name: String,
    },

    /// An argument passed to a built-in factory is out of its valid range.
    #[error("invalid argument for '{factory}': {detail}")]
    InvalidArgument {
        /// Name of the factory.
        factory: &'static str,
        /// Description of the problem.
        detail: String,
    },

    /// The pseudo-potential approximation does not confine along an axis.
    #[error("pseudo-potential is not confining along {axis} (omega^2 = {omega_squared:e})")]
    Unconfined {
        /// Axis label, one of `x`, `y`, `z`.
        axis: char,
        /// Squared secular angular frequency along that axis.
        omega_squared: f64,
    },

    /// Two elements of the same kind share an identifier.
    #[error("elements have identical 'uids': {kind} id {id} appears more than once")]
    DuplicateId {
        /// Kind the duplicate was found in.
        kind: ElementKind,
        /// The repeated identifier.
        id: ElementId,
    },

    /// Species identifiers are not a dense `1..=N` sequence.
    #[error(
        "inconsistent species identity: max species id is {max_id} but only {count} species are defined; two groups of ions may have been assigned to the same ion group"
    )]
    InconsistentSpecies {
        /// Largest species id found.
        max_id: u32,
        /// Number of species elements.
        count: usize,
    },

    /// A species carries a non-integer identifier.
    #[error("species identifier '{0}' is not an integer atom type")]
    NonIntegerSpeciesId(ElementId),

    /// The simulation has no species and cannot be executed.
    #[error("simulation contains no ion species: at least one group of ions is required")]
    NoSpecies,

    /// An element looked up in the registry is not recorded there.
    #[error("element {} is not part of the simulation", describe_id(.id.as_ref()))]
    NotFound {
        /// Identifier of the missing element, if it had one.
        id: Option<ElementId>,
    },

    /// The simulation has already run to completion; its script and archive are final.
    #[error("simulation '{name}' has already been run and cannot be rendered again")]
    AlreadyRun {
        /// Name of the simulation.
        name: String,
    },

    /// The engine reported that it created zero atoms.
    #[error(
        "LAMMPS created 0 atoms: perhaps ions were placed with positions outside the simulation domain"
    )]
    IonsOutsideDomain,

    /// Reading the engine's output failed.
    #[error("lost communication with the LAMMPS process: {0}")]
    ChannelBroken(#[source] std::io::Error),

    /// The engine executable could not be started.
    #[error("failed to launch '{executable}': {source}")]
    Spawn {
        /// Executable that was launched.
        executable: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The engine exited with a failure status.
    #[error("LAMMPS exited with {0}")]
    EngineFailed(std::process::ExitStatus),

    /// Writing the input script failed.
    #[error("I/O operation failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Persisting the run record failed.
    #[error("failed to archive run: {0}")]
    Archive(String),
}

fn describe_id(id: Option<&ElementId>) -> String {
    match id {
        Some(id) => format!("with id {id}"),
        None => "without an id".to_string(),
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Archive(e.to_string())
    }
}

impl Error {
    /// Creates an [`InvalidArgument`](Error::InvalidArgument) error.
    pub fn invalid_argument(factory: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            factory,
            detail: detail.into(),
        }
    }

    /// Creates a [`CodeNotList`](Error::CodeNotList) error.
    pub fn code_not_list(factory: &str, detail: impl Into<String>) -> Self {
        Self::CodeNotList {
            factory: factory.to_string(),
            detail: detail.into(),
        }
    }

    /// Creates a [`MissingField`](Error::MissingField) error.
    pub fn missing_field(factory: &str, kind: ElementKind, field: &'static str) -> Self {
        Self::MissingField {
            factory: factory.to_string(),
            kind,
            field,
        }
    }

    /// Returns `true` for errors detected while validating a simulation before rendering.
    pub fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId { .. }
                | Self::InconsistentSpecies { .. }
                | Self::NonIntegerSpeciesId(_)
                | Self::NoSpecies
        )
    }
}
