use crate::error::Error;

/// Coalesces the engine's per-call atom-creation reports.
///
/// Every `create_atoms` statement makes LAMMPS print `Created N atoms` followed by
/// indented detail lines such as `create_atoms CPU = ...`. A species with many
/// positions produces one such block per ion; the filter folds a run of blocks
/// into a single `Created <total> atoms` line and passes everything else through.
#[derive(Debug, Default)]
pub struct OutputFilter {
    created: Option<u64>,
}

impl OutputFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line of engine output and returns the lines to show.
    ///
    /// # Errors
    ///
    /// [`Error::IonsOutsideDomain`] if the engine reports creating zero atoms.
    pub fn feed(&mut self, line: &str) -> Result<Vec<String>, Error> {
        if let Some(n) = created_atoms(line) {
            if n == 0 {
                return Err(Error::IonsOutsideDomain);
            }
            *self.created.get_or_insert(0) += n;
            return Ok(Vec::new());
        }

        if self.created.is_some() && is_creation_detail(line) {
            return Ok(Vec::new());
        }

        let mut out = self.finish();
        out.push(line.to_string());
        Ok(out)
    }

    /// Flushes a pending summary at the end of the stream.
    pub fn finish(&mut self) -> Vec<String> {
        self.created
            .take()
            .map(|total| format!("Created {total} atoms"))
            .into_iter()
            .collect()
    }
}

fn created_atoms(line: &str) -> Option<u64> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
        (Some("Created"), Some(n), Some("atoms"), None) => n.parse().ok(),
        _ => None,
    }
}

fn is_creation_detail(line: &str) -> bool {
    line.trim_start().starts_with("create_atoms CPU") || line.starts_with(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lines: &[&str]) -> Result<Vec<String>, Error> {
        let mut filter = OutputFilter::new();
        let mut out = Vec::new();
        for line in lines {
            out.extend(filter.feed(line)?);
        }
        out.extend(filter.finish());
        Ok(out)
    }

    #[test]
    fn repeated_creations_are_summed() {
        let lines = ["Created 1 atoms"; 5];
        assert_eq!(run(&lines).unwrap(), ["Created 5 atoms"]);
    }

    #[test]
    fn timing_lines_are_swallowed_inside_a_block() {
        let lines = [
            "Created 1 atoms",
            "  using box units in orthogonal box = (-0.001 -0.001 -0.001) to (0.001 0.001 0.001)",
            "  create_atoms CPU = 0.000 seconds",
            "Created 2 atoms",
            "  create_atoms CPU = 0.000 seconds",
            "Setting atom values ...",
        ];
        assert_eq!(
            run(&lines).unwrap(),
            ["Created 3 atoms", "Setting atom values ..."]
        );
    }

    #[test]
    fn other_lines_pass_through() {
        let lines = ["LAMMPS (2 Aug 2023)", "  indented header", "Step Temp"];
        assert_eq!(run(&lines).unwrap(), lines);
    }

    #[test]
    fn separate_blocks_are_reported_separately() {
        let lines = ["Created 2 atoms", "mass 2", "Created 3 atoms"];
        assert_eq!(
            run(&lines).unwrap(),
            ["Created 2 atoms", "mass 2", "Created 3 atoms"]
        );
    }

    #[test]
    fn zero_atoms_means_ions_outside_domain() {
        assert!(matches!(
            run(&["Created 1 atoms", "Created 0 atoms"]),
            Err(Error::IonsOutsideDomain)
        ));
    }
}
