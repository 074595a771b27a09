use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ionforge",
    about = "LAMMPS input generation and execution for trapped-ion simulations",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a simulation deck and write its LAMMPS script
    #[command(visible_alias = "r")]
    Render(DeckArgs),

    /// Render a simulation deck and run it with LAMMPS
    #[command(visible_alias = "x")]
    Run(DeckArgs),
}

impl Command {
    pub fn args(&self) -> &DeckArgs {
        match self {
            Command::Render(args) | Command::Run(args) => args,
        }
    }
}

#[derive(Args)]
pub struct DeckArgs {
    /// Simulation deck (TOML)
    #[arg(value_name = "DECK")]
    pub deck: PathBuf,

    #[command(flatten)]
    pub run: RunOptions,
}

/// Overrides of the deck's `[simulation]` settings.
#[derive(Args)]
#[command(next_help_heading = "Run Options")]
pub struct RunOptions {
    /// Directory for the script, engine outputs, and run archive
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// LAMMPS executable
    #[arg(short = 'x', long, value_name = "PATH")]
    pub executable: Option<String>,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
