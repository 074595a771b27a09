use std::io::{self, Write};

use ion_forge::{Element, ElementKind, Payload, Simulation};

use crate::util::text::{si, truncate};

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

pub fn print_simulation_summary(sim: &Simulation) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let ions: usize = sim
        .elements()
        .iter()
        .filter_map(Element::species_data)
        .map(|data| data.positions.len())
        .sum();
    let [dx, dy, dz] = sim.config().domain;

    let mut rows = vec![
        ("Name", sim.name().to_string()),
        ("Species", format!("{}", sim.identities().species_count())),
        ("Ions", format!("{ions}")),
        ("Elements", format!("{}", sim.len())),
        ("Timestep", si(sim.timestep(), "s")),
        (
            "Domain (±)",
            format!("{} × {} × {}", si(dx, "m"), si(dy, "m"), si(dz, "m")),
        ),
    ];

    if !sim.rigid_groups().is_empty() {
        let groups: Vec<String> = sim.rigid_groups().iter().map(u32::to_string).collect();
        rows.push(("Rigid species", groups.join(", ")));
    }

    if let Some(attributes) = sim.attributes() {
        if !attributes.output_files.is_empty() {
            rows.push(("Output files", attributes.output_files.join(", ")));
        }
    }

    print_kv_table(&mut out, "Simulation Summary", &rows);
}

pub fn print_element_table(sim: &Simulation) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let kind_w = 9usize;
    let id_w = 12usize;
    let prio_w = 5usize;
    let sep_overhead = 9;
    let detail_w = SAFE_TABLE_WIDTH.saturating_sub(kind_w + id_w + prio_w + sep_overhead);

    let line = |l: char, m: char, r: char| {
        format!(
            "{INDENT}{l}{}{m}{}{m}{}{m}{}{r}",
            "─".repeat(kind_w + 2),
            "─".repeat(id_w + 2),
            "─".repeat(prio_w + 2),
            "─".repeat(detail_w + 2),
        )
    };

    let _ = writeln!(out, "{}┌─ Elements ─┐", INDENT);
    let _ = writeln!(out, "{}", line('┌', '┬', '┐'));
    let _ = writeln!(
        out,
        "{INDENT}│ {:<kind_w$} │ {:<id_w$} │ {:>prio_w$} │ {:<detail_w$} │",
        "Kind", "Id", "Prio", "Detail"
    );
    let _ = writeln!(out, "{}", line('├', '┼', '┤'));

    for element in sim.elements() {
        let id = element
            .id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "·".to_string());
        let priority = element
            .priority
            .map(|p| p.to_string())
            .unwrap_or_else(|| "·".to_string());
        let _ = writeln!(
            out,
            "{INDENT}│ {:<kind_w$} │ {:<id_w$} │ {:>prio_w$} │ {:<detail_w$} │",
            element.kind().to_string(),
            truncate(&id, id_w),
            priority,
            truncate(&detail(element), detail_w),
        );
    }

    let _ = writeln!(out, "{}", line('└', '┴', '┘'));
}

fn detail(element: &Element) -> String {
    match &element.payload {
        Payload::Species(data) => format!(
            "{} ions, {:+}e, {} u{}",
            data.positions.len(),
            data.charge,
            data.mass,
            if element.rigid { ", rigid" } else { "" }
        ),
        Payload::Variable { output } => output.clone(),
        Payload::Fix | Payload::Command => first_statement(element, element.kind()),
    }
}

fn first_statement(element: &Element, kind: ElementKind) -> String {
    element
        .code
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .unwrap_or_else(|| format!("(empty {kind})"))
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 16usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);

    let _ = writeln!(
        out,
        "{}┌─ {} ─┐",
        INDENT,
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(
        out,
        "{}┌{k_line}┬{v_line}┐",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );
    let _ = writeln!(
        out,
        "{}│ {:<key_w$} │ {:>val_w$} │",
        INDENT,
        "Setting",
        "Value",
        key_w = key_w,
        val_w = val_w
    );
    let _ = writeln!(
        out,
        "{}├{k_line}┼{v_line}┤",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );

    for (key, val) in rows {
        let _ = writeln!(
            out,
            "{}│ {:<key_w$} │ {:>val_w$} │",
            INDENT,
            truncate(key, key_w),
            truncate(val, val_w),
            key_w = key_w,
            val_w = val_w
        );
    }

    let _ = writeln!(
        out,
        "{}└{k_line}┴{v_line}┘",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );
}
