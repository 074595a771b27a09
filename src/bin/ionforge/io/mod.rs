use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;

use anyhow::{Context, Result};

use crate::deck::Deck;

/// Returns `true` if stderr is a terminal (interactive).
pub fn stderr_is_tty() -> bool {
    io::stderr().is_terminal()
}

pub fn read_deck(path: &Path) -> Result<Deck> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read deck: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse deck: {}", path.display()))
}
