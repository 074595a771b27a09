//! Persistence of run records.
//!
//! Every rendered run leaves a record of what was run: the [`RunAttributes`], a
//! snapshot of the script, optionally the source of the program that built the
//! simulation, and, once the engine has finished, copies of the files it wrote.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Error;
use crate::model::attributes::RunAttributes;

/// Log file LAMMPS writes into its working directory.
pub const ENGINE_LOG: &str = "log.lammps";

/// Destination for run records.
pub trait Archive {
    /// Stores the run attributes, replacing any previous record.
    fn record(&mut self, attributes: &RunAttributes) -> Result<(), Error>;

    /// Stores a text snapshot under `name`.
    fn snapshot(&mut self, name: &str, contents: &str) -> Result<(), Error>;

    /// Copies the named engine outputs from `dir`; files that do not exist are skipped.
    fn collect(&mut self, dir: &Path, files: &[String]) -> Result<(), Error>;
}

/// Archive kept as a directory `<output_dir>/<name>.run/`.
#[derive(Debug, Clone)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    pub fn new(output_dir: &Path, name: &str) -> Self {
        Self {
            root: output_dir.join(format!("{name}.run")),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.root).map_err(|e| {
            Error::Archive(format!("cannot create {}: {e}", self.root.display()))
        })
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), Error> {
        self.ensure_root()?;
        let path = self.root.join(name);
        fs::write(&path, contents)
            .map_err(|e| Error::Archive(format!("cannot write {}: {e}", path.display())))
    }
}

impl Archive for DirArchive {
    fn record(&mut self, attributes: &RunAttributes) -> Result<(), Error> {
        let text = toml::to_string_pretty(attributes)?;
        self.write("record.toml", &text)
    }

    fn snapshot(&mut self, name: &str, contents: &str) -> Result<(), Error> {
        self.write(name, contents)
    }

    fn collect(&mut self, dir: &Path, files: &[String]) -> Result<(), Error> {
        self.ensure_root()?;
        for file in files {
            let source = dir.join(file);
            if !source.is_file() {
                warn!("Engine output {} not found, not archived", source.display());
                continue;
            }
            let name = Path::new(file)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(file));
            let target = self.root.join(name);
            fs::copy(&source, &target).map_err(|e| {
                Error::Archive(format!(
                    "cannot copy {} to {}: {e}",
                    source.display(),
                    target.display()
                ))
            })?;
            debug!("Archived {}", target.display());
        }
        Ok(())
    }
}

/// Snapshots the source of the driver program, if it can be read.
///
/// A missing or unreadable source is logged and otherwise ignored.
pub fn snapshot_source<A: Archive + ?Sized>(archive: &mut A, source: &Path) -> Result<(), Error> {
    let contents = match fs::read_to_string(source) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(
                "Cannot read driver source {}: {e}; continuing without it",
                source.display()
            );
            return Ok(());
        }
    };
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    archive.snapshot(&name, &contents)
}
