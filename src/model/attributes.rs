use serde::Serialize;

use crate::simulation::NeighbourList;

/// Rigid-body bookkeeping for the rendered script.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RigidGroups {
    /// Whether any species is rigid.
    pub exists: bool,
    /// Species ids of the rigid groups, in insertion order.
    pub groups: Vec<u32>,
    /// Number of rigid groups.
    pub length: usize,
}

impl RigidGroups {
    pub fn from_ids(groups: Vec<u32>) -> Self {
        Self {
            exists: !groups.is_empty(),
            length: groups.len(),
            groups,
        }
    }
}

/// Metadata describing one rendered run.
///
/// Produced by the renderer alongside the script text and persisted by the
/// [`Archive`](crate::archive::Archive).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAttributes {
    pub name: String,
    pub executable: String,
    /// Integration timestep in seconds after element hints were applied.
    pub timestep: f64,
    /// Half-widths of the simulation box in metres.
    pub domain: [f64; 3],
    pub coulomb_cutoff: f64,
    /// Files the engine will write through `dump` fixes.
    pub output_files: Vec<String>,
    /// Version of the generator that wrote the script.
    pub version: String,
    /// RFC 3339 timestamp of script generation.
    pub generated_at: String,
    pub neighbour: NeighbourList,
    pub rigid: RigidGroups,
}
