use ion_forge::SimulationConfig;

use crate::cli::RunOptions;

/// Applies command-line overrides to the deck's settings.
pub fn build_simulation_config(deck: SimulationConfig, opts: &RunOptions) -> SimulationConfig {
    SimulationConfig {
        executable: opts.executable.clone().unwrap_or(deck.executable),
        output_dir: opts.output_dir.clone().unwrap_or(deck.output_dir),
        ..deck
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn options(output_dir: Option<&str>, executable: Option<&str>) -> RunOptions {
        RunOptions {
            output_dir: output_dir.map(PathBuf::from),
            executable: executable.map(String::from),
            quiet: false,
        }
    }

    #[test]
    fn deck_settings_are_kept_without_overrides() {
        let deck = SimulationConfig {
            executable: "lmp_mpi".into(),
            timestep: 1e-8,
            ..Default::default()
        };
        let config = build_simulation_config(deck.clone(), &options(None, None));
        assert_eq!(config, deck);
    }

    #[test]
    fn flags_override_the_deck() {
        let config = build_simulation_config(
            SimulationConfig::default(),
            &options(Some("runs"), Some("/opt/lammps/lmp")),
        );
        assert_eq!(config.executable, "/opt/lammps/lmp");
        assert_eq!(config.output_dir, PathBuf::from("runs"));
        assert_eq!(config.timestep, SimulationConfig::default().timestep);
    }
}
