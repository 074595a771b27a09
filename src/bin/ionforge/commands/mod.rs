mod render;
mod run;

use render::run_render;
use run::run_simulation;

use anyhow::{Context, Result};
use ion_forge::Simulation;

use crate::cli::{Command, DeckArgs};
use crate::config::build_simulation_config;
use crate::display::{Context as DisplayContext, Progress};
use crate::io::read_deck;

pub async fn dispatch(command: Command, ctx: DisplayContext) -> Result<()> {
    match command {
        Command::Render(args) => run_render(args, ctx),
        Command::Run(args) => run_simulation(args, ctx).await,
    }
}

/// Reads the deck and assembles its simulation, as the first progress step.
fn load_simulation(args: &DeckArgs, progress: &mut Progress) -> Result<Simulation> {
    progress.step("Reading deck");

    let deck = read_deck(&args.deck)?;
    let name = deck.name(&args.deck);
    let config = build_simulation_config(deck.simulation.config.clone(), &args.run);
    let species = deck.species.len();
    let elements = deck.elements.len();

    let sim = deck
        .build(&name, config)
        .with_context(|| format!("Failed to assemble simulation from {}", args.deck.display()))?
        .with_source(args.deck.clone());

    let file = args
        .deck
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let substeps = [
        format!("Parse {file}"),
        format!("Add {species} species"),
        format!("Add {elements} elements"),
    ];
    let substeps_ref: Vec<&str> = substeps.iter().map(String::as_str).collect();
    progress.complete_step("Reading deck", &substeps_ref);

    Ok(sim)
}

/// Renders the script, as a progress step.
fn render_simulation(sim: &mut Simulation, progress: &mut Progress) -> Result<()> {
    progress.step("Rendering script");

    sim.render().context("Failed to render LAMMPS script")?;

    let script = sim.script_path();
    let archive = script.with_extension("run");
    let substeps = [
        "Validate species and identifiers".to_string(),
        format!("Write script → {}", script.display()),
        format!("Archive record → {}", archive.display()),
    ];
    let substeps_ref: Vec<&str> = substeps.iter().map(String::as_str).collect();
    progress.complete_step("Rendering script", &substeps_ref);

    Ok(())
}
