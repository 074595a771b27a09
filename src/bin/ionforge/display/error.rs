use std::io::{self, Write};

use anyhow::Error;

use crate::util::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    let msg = err.to_string();
    for line in wrap(&msg, 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 59) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
        source = cause.source();
    }

    if let Some(hints) = HintCollector::collect(err) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

struct HintCollector {
    hints: Vec<String>,
    has_typed_hints: bool,
}

impl HintCollector {
    fn new() -> Self {
        Self {
            hints: Vec::new(),
            has_typed_hints: false,
        }
    }

    fn collect(err: &Error) -> Option<Vec<String>> {
        let mut collector = Self::new();

        collector.collect_simulation_hints(err);
        collector.collect_deck_hints(err);
        if !collector.has_typed_hints {
            if let Some(source) = err.chain().find_map(|e| e.downcast_ref::<io::Error>()) {
                collector.mark_typed();
                collector.collect_std_io_hints(source);
            }
        }

        if !collector.has_typed_hints {
            collector.collect_fallback_hints(err);
        }

        if collector.hints.is_empty() {
            None
        } else {
            Some(collector.hints)
        }
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    fn mark_typed(&mut self) {
        self.has_typed_hints = true;
    }

    fn collect_simulation_hints(&mut self, err: &Error) {
        use ion_forge::Error as SimError;

        let Some(sim_err) = err.chain().find_map(|e| e.downcast_ref::<SimError>()) else {
            return;
        };

        self.mark_typed();

        match sim_err {
            SimError::NotAMapping { .. } | SimError::CodeNotList { .. } => {
                self.add("A custom factory returned a malformed element");
                self.add("Elements are tables with a 'code' list of LAMMPS statements");
            }

            SimError::MissingField { field, kind, .. } => {
                self.add(format!("Every {kind} element needs a '{field}' field"));
                if *field == "id" {
                    self.add("Species receive an id when appended to a simulation");
                }
            }

            SimError::IdentifierSlot { .. } => {
                self.add("Fix and variable factories take 'uid' as their first parameter");
            }

            SimError::UnknownVariable { name } => {
                self.add(format!("'{name}' is not a per-atom attribute LAMMPS knows"));
                self.add("Refer to earlier variables through their output, e.g. 'v_...' or 'f_...'");
            }

            SimError::InvalidArgument { factory, .. } => {
                self.add(format!("Check the parameters given to '{factory}'"));
                self.add("Times, temperatures, and step counts must be positive");
            }

            SimError::Unconfined { axis, .. } => {
                self.add(format!("The trap does not confine ions along {axis}"));
                for hint in unconfined_hints(*axis) {
                    self.add(*hint);
                }
                self.add("Or use the oscillating trap (pseudo = false) to simulate the full field");
            }

            SimError::AlreadyRun { .. } => {
                self.add("A simulation runs at most once; its archive is kept as it was");
                self.add("Build a new simulation to run again");
            }

            SimError::DuplicateId { .. } => {
                self.add("The same fix or variable was added twice with identical arguments");
                self.add("Remove the repeated element, or change one of its parameters");
            }

            SimError::InconsistentSpecies { .. } | SimError::NonIntegerSpeciesId(_) => {
                self.add("Species ids must run 1, 2, ... N without gaps");
                self.add("Let the simulation assign species ids instead of setting them by hand");
            }

            SimError::NoSpecies => {
                self.add("Add at least one [[species]] entry to the deck");
            }

            SimError::NotFound { .. } => {
                self.add("Only elements already added to the simulation can be removed");
            }

            SimError::IonsOutsideDomain => {
                self.add("Ion positions must lie within the simulation domain");
                self.add("Enlarge 'domain' under [simulation] or shrink the ion cloud");
            }

            SimError::ChannelBroken(_) => {
                self.add("The LAMMPS process closed its output unexpectedly");
                self.add("Inspect log.lammps in the output directory");
            }

            SimError::Spawn { executable, source } => {
                if source.kind() == io::ErrorKind::NotFound {
                    self.add(format!("'{executable}' was not found on PATH"));
                    self.add("Install LAMMPS or pass its path with --executable");
                } else {
                    self.collect_std_io_hints(source);
                }
            }

            SimError::EngineFailed(_) => {
                self.add("LAMMPS rejected the script or aborted during the run");
                self.add("Inspect log.lammps in the output directory for the failing command");
            }

            SimError::Io { source } => self.collect_std_io_hints(source),

            SimError::Archive(_) => {
                self.add("The run record could not be written");
                self.add("Check that the output directory is writable");
            }
        }
    }

    fn collect_deck_hints(&mut self, err: &Error) {
        let Some(parse_err) = err.chain().find_map(|e| e.downcast_ref::<toml::de::Error>()) else {
            return;
        };

        self.mark_typed();

        let msg = parse_err.message().to_lowercase();
        if msg.contains("unknown variant") {
            self.add("The 'factory' of an [[element]] is not recognised");
            self.add("Known factories: efield, langevin_bath, dump, linear_paul_trap, evolve, minimise, thermal_velocities, custom, time_average, square_sum, remove");
        } else if msg.contains("missing field") {
            self.add("An entry lacks a required parameter");
        } else if msg.contains("unknown field") {
            self.add("An entry has a parameter that is not recognised; check its spelling");
        } else {
            self.add("The deck is not valid TOML");
            self.add("Check for missing quotes, brackets, or invalid values");
        }
    }

    fn collect_std_io_hints(&mut self, source: &io::Error) {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => {
                self.add("File or directory not found");
                self.add("Check the path spelling and ensure the file exists");
            }

            ErrorKind::PermissionDenied => {
                self.add("Permission denied accessing the file");
                self.add("Check file permissions with `ls -la`");
                self.add("Ensure you have read/write access as needed");
            }

            ErrorKind::InvalidData => {
                self.add("File contains invalid or corrupt data");
                self.add("Verify the deck is UTF-8 text");
            }

            ErrorKind::WriteZero => {
                self.add("Failed to write data (disk full?)");
                self.add("Check available disk space");
            }

            _ => {
                self.add("I/O operation failed");
                self.add("Check file path, permissions, and disk space");
            }
        }
    }

    fn collect_fallback_hints(&mut self, err: &Error) {
        let msg = error_chain_text(err);

        if msg.contains("no species named") || msg.contains("no element named") {
            self.add("Entries can only refer to names defined earlier in the deck");
            return;
        }

        if msg.contains("'positions' or 'cloud'") {
            self.add("Place ions explicitly with 'positions' or randomly with 'cloud'");
            return;
        }

        if msg.contains("permission denied") {
            self.add("Check file permissions with `ls -la`");
            self.add("Ensure you have the required access rights");
        }
    }
}

/// The end caps confine axially but defocus radially, so the remedy depends on the axis.
fn unconfined_hints(axis: char) -> &'static [&'static str] {
    match axis {
        'z' => &["Raise the endcap voltage or kappa to deepen the axial well"],
        _ => &[
            "Raise the RF voltage to strengthen radial confinement",
            "Or lower the endcap voltage, which pushes ions outwards radially",
        ],
    }
}

fn error_chain_text(err: &Error) -> String {
    let mut text = String::new();

    text.push_str(&err.to_string());

    let mut source = err.source();
    while let Some(cause) = source {
        text.push('\n');
        text.push_str(&cause.to_string());
        source = cause.source();
    }

    text.to_lowercase()
}
