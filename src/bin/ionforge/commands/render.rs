use anyhow::Result;

use super::{load_simulation, render_simulation};
use crate::cli::DeckArgs;
use crate::display::{Context, Progress, print_element_table, print_simulation_summary};

const TOTAL_STEPS: u8 = 2;

pub fn run_render(args: DeckArgs, ctx: Context) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    let mut sim = load_simulation(&args, &mut progress)?;
    render_simulation(&mut sim, &mut progress)?;

    if ctx.interactive {
        print_simulation_summary(&sim);
        print_element_table(&sim);
    } else {
        println!("{}", sim.script_path().display());
    }

    progress.finish("Render complete");

    Ok(())
}
