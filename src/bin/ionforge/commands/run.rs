use anyhow::{Context as _, Result};
use ion_forge::RunOutcome;
use tracing::warn;

use super::{load_simulation, render_simulation};
use crate::cli::DeckArgs;
use crate::display::{Context, Progress, print_simulation_summary};

const TOTAL_STEPS: u8 = 3;

pub async fn run_simulation(args: DeckArgs, ctx: Context) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    let mut sim = load_simulation(&args, &mut progress)?;
    render_simulation(&mut sim, &mut progress)?;

    if ctx.interactive {
        print_simulation_summary(&sim);
    }

    progress.step("Running LAMMPS");
    let outcome = sim
        .execute(|line| progress.engine_line(line))
        .await
        .with_context(|| format!("Simulation '{}' did not complete", sim.name()))?;

    match outcome {
        RunOutcome::Completed => {
            let archive = sim.script_path().with_extension("run");
            let substeps = [
                format!("Engine: {}", sim.config().executable),
                format!("{} lines of output", progress.engine_lines()),
                format!("Outputs archived → {}", archive.display()),
            ];
            let substeps_ref: Vec<&str> = substeps.iter().map(String::as_str).collect();
            progress.complete_step("Running LAMMPS", &substeps_ref);
            progress.finish("Run complete");
        }
        RunOutcome::Terminated => {
            progress.abandon_step("Running LAMMPS (interrupted)");
            progress.finish("Run interrupted");
        }
        RunOutcome::AlreadyCompleted => {
            warn!("Simulation '{}' was already run", sim.name());
            progress.finish("Nothing to do");
        }
    }

    Ok(())
}
