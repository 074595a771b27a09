mod simulation;

pub use simulation::build_simulation_config;
