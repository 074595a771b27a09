use std::io::{self, Write};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::util::text::truncate;

/// Widest engine line shown inside the spinner message.
const TAIL_WIDTH: usize = 48;

/// Running tally of what the engine has printed during the current step.
#[derive(Debug, Default)]
struct EngineTail {
    lines: usize,
    last: Option<String>,
    thermo: bool,
}

impl EngineTail {
    fn record(&mut self, line: &str) {
        self.lines += 1;
        let trimmed = line.trim();
        if trimmed.starts_with("Step ") {
            self.thermo = true;
        } else if trimmed.starts_with("Loop time") {
            self.thermo = false;
        }
        if !trimmed.is_empty() {
            self.last = Some(truncate(trimmed, TAIL_WIDTH));
        }
    }

    fn status(&self) -> String {
        let phase = if self.thermo { "thermo" } else { "setup" };
        match &self.last {
            Some(last) => format!("{} lines, {phase} │ {last}", self.lines),
            None => "waiting for engine output".to_string(),
        }
    }
}

pub struct StepSpinner {
    bar: Option<ProgressBar>,
    start: Instant,
    step: u8,
    total_steps: u8,
    step_start: Instant,
    label: String,
    tail: EngineTail,
    engine_lines: usize,
}

impl StepSpinner {
    pub fn new(total_steps: u8) -> Self {
        let now = Instant::now();
        Self {
            bar: None,
            start: now,
            step: 0,
            total_steps,
            step_start: now,
            label: String::new(),
            tail: EngineTail::default(),
            engine_lines: 0,
        }
    }

    fn clear(&mut self) -> Duration {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.step_start.elapsed()
    }

    pub fn step(&mut self, description: &str) {
        self.clear();
        self.step += 1;
        self.step_start = Instant::now();
        self.label = step_label(self.step, self.total_steps, description);
        self.tail = EngineTail::default();

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg} {elapsed:.dim}")
                .expect("invalid template")
                .tick_chars("◐◓◑◒"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message(format!("{}...", self.label));
        self.bar = Some(bar);
    }

    /// Echoes an engine line above the spinner and shows it as the step's tail.
    pub fn engine_line(&mut self, line: &str) {
        self.tail.record(line);
        self.engine_lines += 1;
        match &self.bar {
            Some(bar) => {
                bar.suspend(|| print_engine_line(line));
                bar.set_message(format!("{} {}", self.label, self.tail.status()));
            }
            None => print_engine_line(line),
        }
    }

    pub fn complete_step(&mut self, description: &str, substeps: &[&str]) {
        let elapsed = self.clear();
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "  \x1b[32m✔\x1b[0m {:<46} {:>8}",
            description,
            format_elapsed(elapsed)
        );
        for substep in substeps {
            let _ = writeln!(stderr, "    \x1b[2m↳ {substep}\x1b[0m");
        }
    }

    pub fn abandon_step(&mut self, description: &str) {
        let elapsed = self.clear();
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "  \x1b[33m✘\x1b[0m {:<46} {:>8}",
            description,
            format_elapsed(elapsed)
        );
        if let Some(last) = &self.tail.last {
            let _ = writeln!(
                stderr,
                "    \x1b[2m↳ stopped after {} lines, last: {last}\x1b[0m",
                self.tail.lines
            );
        }
    }

    pub fn finish(mut self, summary: &str) {
        self.clear();
        let footer = footer_line(summary, self.step, self.engine_lines, self.start.elapsed());
        let _ = writeln!(io::stderr().lock(), "\n{footer}\n");
    }
}

fn step_label(step: u8, total: u8, description: &str) -> String {
    format!("\x1b[1m{step}/{total}\x1b[0m {description}")
}

fn print_engine_line(line: &str) {
    let _ = writeln!(io::stderr().lock(), "    \x1b[2m┆\x1b[0m {line}");
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let whole = elapsed.as_secs();
        format!("{}m {:02}s", whole / 60, whole % 60)
    }
}

fn footer_line(summary: &str, steps: u8, engine_lines: usize, elapsed: Duration) -> String {
    let mut parts = vec![format!("{steps} steps")];
    if engine_lines > 0 {
        parts.push(format!("{engine_lines} engine lines"));
    }
    parts.push(format_elapsed(elapsed));
    format!("  \x1b[32m●\x1b[0m \x1b[1m{summary}\x1b[0m \x1b[2m({})\x1b[0m", parts.join(", "))
}

/// Non-interactive progress: steps are silent, engine lines go to stdout.
#[derive(Default)]
pub struct SilentProgress {
    engine_lines: usize,
}

impl SilentProgress {
    pub fn engine_line(&mut self, line: &str) {
        self.engine_lines += 1;
        let _ = writeln!(io::stdout().lock(), "{line}");
    }
}

pub enum Progress {
    Interactive(StepSpinner),
    Silent(SilentProgress),
}

impl Progress {
    pub fn new(interactive: bool, total_steps: u8) -> Self {
        if interactive {
            Self::Interactive(StepSpinner::new(total_steps))
        } else {
            Self::Silent(SilentProgress::default())
        }
    }

    pub fn step(&mut self, description: &str) {
        if let Self::Interactive(s) = self {
            s.step(description);
        }
    }

    pub fn engine_line(&mut self, line: &str) {
        match self {
            Self::Interactive(s) => s.engine_line(line),
            Self::Silent(s) => s.engine_line(line),
        }
    }

    /// Engine lines seen so far across all steps.
    pub fn engine_lines(&self) -> usize {
        match self {
            Self::Interactive(s) => s.engine_lines,
            Self::Silent(s) => s.engine_lines,
        }
    }

    pub fn complete_step(&mut self, description: &str, substeps: &[&str]) {
        if let Self::Interactive(s) = self {
            s.complete_step(description, substeps);
        }
    }

    pub fn abandon_step(&mut self, description: &str) {
        if let Self::Interactive(s) = self {
            s.abandon_step(description);
        }
    }

    pub fn finish(self, summary: &str) {
        if let Self::Interactive(s) = self {
            s.finish(summary);
        }
    }
}
