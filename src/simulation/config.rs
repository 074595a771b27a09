use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Neighbour-list settings passed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighbourList {
    /// Skin distance in metres.
    #[serde(default = "default_skin")]
    pub skin: f64,
    /// Binning style; `nsq` suits small, sparse ion crystals.
    #[serde(default = "default_style")]
    pub style: String,
}

impl Default for NeighbourList {
    fn default() -> Self {
        Self {
            skin: default_skin(),
            style: default_style(),
        }
    }
}

fn default_skin() -> f64 {
    1.0
}

fn default_style() -> String {
    "nsq".to_string()
}

/// Run-wide settings of a [`Simulation`](super::Simulation).
///
/// # Examples
///
/// ```
/// use ion_forge::SimulationConfig;
///
/// let config = SimulationConfig {
///     timestep: 1e-7,
///     domain: [5e-4; 3],
///     ..Default::default()
/// };
/// assert_eq!(config.executable, "lmp_serial");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// LAMMPS executable, looked up on `PATH` unless absolute.
    pub executable: String,
    /// Upper bound on the integration timestep in seconds.
    pub timestep: f64,
    /// Half-widths of the simulation box in metres.
    pub domain: [f64; 3],
    pub neighbour: NeighbourList,
    /// Cut-off of the Coulomb pair interaction in metres.
    pub coulomb_cutoff: f64,
    /// Directory receiving the script, the engine's outputs, and the run archive.
    pub output_dir: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            executable: "lmp_serial".to_string(),
            timestep: 1e-6,
            domain: [1e-3; 3],
            neighbour: NeighbourList::default(),
            coulomb_cutoff: 10.0,
            output_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = SimulationConfig::default();
        assert_eq!(config.executable, "lmp_serial");
        assert_eq!(config.timestep, 1e-6);
        assert_eq!(config.domain, [1e-3; 3]);
        assert_eq!(config.neighbour.style, "nsq");
        assert_eq!(config.neighbour.skin, 1.0);
        assert_eq!(config.coulomb_cutoff, 10.0);
    }

    #[test]
    fn partial_table_keeps_defaults() {
        let config: SimulationConfig = toml::from_str(
            r#"
            timestep = 1e-8
            [neighbour]
            style = "bin"
            "#,
        )
        .unwrap();
        assert_eq!(config.timestep, 1e-8);
        assert_eq!(config.neighbour.style, "bin");
        assert_eq!(config.neighbour.skin, 1.0);
        assert_eq!(config.executable, "lmp_serial");
    }
}
