use std::sync::LazyLock;

use toml::Value;

use super::{ElementFactory, Fragment, builtin, check_variables, string_args};
use crate::error::Error;
use crate::model::element::{Element, ElementKind};

static EFIELD: LazyLock<ElementFactory> =
    LazyLock::new(|| builtin(ElementKind::Fix, "efield", &["uid", "ex", "ey", "ez"]));

static LANGEVIN_BATH: LazyLock<ElementFactory> = LazyLock::new(|| {
    builtin(
        ElementKind::Fix,
        "langevin_bath",
        &["uid", "temperature", "damping_time"],
    )
});

static DUMP: LazyLock<ElementFactory> = LazyLock::new(|| {
    builtin(
        ElementKind::Fix,
        "dump",
        &["uid", "filename", "variables", "steps"],
    )
});

/// Seed handed to the engine's stochastic fixes.
pub const ENGINE_SEED: u32 = 1337;

/// Uniform, time-independent electric field in V/m.
pub fn efield(ex: f64, ey: f64, ez: f64) -> Result<Element, Error> {
    let args = [Value::Float(ex), Value::Float(ey), Value::Float(ez)];
    EFIELD.invoke(&args, |uid| {
        Fragment::new([
            "# Static E-field".to_string(),
            format!("fix {uid} all efield {ex:e} {ey:e} {ez:e}"),
        ])
        .into()
    })
}

/// Langevin heat bath at `temperature` kelvin with damping time in seconds.
pub fn langevin_bath(temperature: f64, damping_time: f64) -> Result<Element, Error> {
    if temperature < 0.0 {
        return Err(Error::invalid_argument(
            "langevin_bath",
            format!("temperature must be non-negative, got {temperature}"),
        ));
    }
    if damping_time <= 0.0 {
        return Err(Error::invalid_argument(
            "langevin_bath",
            format!("damping time must be positive, got {damping_time}"),
        ));
    }

    let args = [Value::Float(temperature), Value::Float(damping_time)];
    LANGEVIN_BATH.invoke(&args, |uid| {
        Fragment::new([
            "# Adding a Langevin bath".to_string(),
            format!(
                "fix {uid} all langevin {temperature:e} {temperature:e} {damping_time:e} {ENGINE_SEED}"
            ),
        ])
        .into()
    })
}

/// What a dump writes besides the atom id.
#[derive(Debug, Clone, Copy)]
pub enum DumpSource<'a> {
    /// Per-atom attributes such as `x`, `vy`.
    Attributes(&'a [String]),
    /// The output columns of a variable element; its code is emitted with the dump.
    Variable(&'a Element),
    /// The output columns of a variable already appended to the simulation; only
    /// the dump itself is emitted, so the variable is not defined twice.
    Defined(&'a Element),
}

/// Writes per-atom quantities to `filename` every `steps` steps.
pub fn dump(filename: &str, source: DumpSource<'_>, steps: u32) -> Result<Element, Error> {
    if steps == 0 {
        return Err(Error::invalid_argument("dump", "steps must be at least 1"));
    }
    if filename.is_empty() || filename.contains(char::is_whitespace) {
        return Err(Error::invalid_argument(
            "dump",
            format!("filename '{filename}' must be non-empty and contain no whitespace"),
        ));
    }

    let (prelude, names) = match source {
        DumpSource::Attributes(attributes) => {
            check_variables(attributes)?;
            (Vec::new(), attributes.join(" "))
        }
        DumpSource::Variable(variable) | DumpSource::Defined(variable) => {
            let output = variable.output().ok_or_else(|| {
                Error::invalid_argument(
                    "dump",
                    format!("expected a variable element, got a {}", variable.kind()),
                )
            })?;
            let prelude = match source {
                DumpSource::Variable(_) => variable.code.clone(),
                _ => Vec::new(),
            };
            (prelude, output.to_string())
        }
    };

    let args = [
        Value::String(filename.to_string()),
        string_args(&[names.clone()]),
        Value::Integer(i64::from(steps)),
    ];
    DUMP.invoke(&args, |uid| {
        let mut lines = prelude;
        lines.push(format!("# Dumping to {filename}"));
        lines.push(format!("dump {uid} all custom {steps} {filename} id {names}"));
        lines.push(format!("dump_modify {uid} sort id"));
        Fragment::new(lines).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::variables::time_average;
    use crate::model::element::ElementId;

    fn uid(element: &Element) -> u32 {
        element.id.as_ref().and_then(ElementId::as_int).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn efield_emits_fix_with_its_id() {
        let field = efield(1.0, 0.0, 0.0).unwrap();
        assert_eq!(field.kind(), ElementKind::Fix);
        assert_eq!(field.code[1], format!("fix {} all efield 1e0 0e0 0e0", uid(&field)));
    }

    #[test]
    fn efield_id_changes_with_arguments() {
        let a = efield(1.0, 1.0, 1.0).unwrap();
        let b = efield(1.0, 1.0, 1.1).unwrap();
        let c = efield(1.0, 1.0, 1.0).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.id, c.id);
    }

    #[test]
    fn langevin_bath_rejects_bad_damping() {
        assert!(langevin_bath(0.0, 1e-5).is_ok());
        assert!(matches!(
            langevin_bath(1e-3, 0.0),
            Err(Error::InvalidArgument { factory: "langevin_bath", .. })
        ));
        assert!(langevin_bath(-1.0, 1e-5).is_err());
    }

    #[test]
    fn dump_of_attributes() {
        let attrs = strings(&["x", "y", "z"]);
        let element = dump("positions.txt", DumpSource::Attributes(&attrs), 10).unwrap();
        let id = uid(&element);
        assert!(
            element
                .code
                .contains(&format!("dump {id} all custom 10 positions.txt id x y z"))
        );
    }

    #[test]
    fn dump_rejects_unknown_attributes() {
        let attrs = strings(&["x", "charge"]);
        assert!(matches!(
            dump("positions.txt", DumpSource::Attributes(&attrs), 10),
            Err(Error::UnknownVariable { .. })
        ));
    }

    #[test]
    fn dump_of_variable_embeds_its_code() {
        let vavg = time_average(20, &strings(&["vx", "vy", "vz"])).unwrap();
        let element = dump("secv.txt", DumpSource::Variable(&vavg), 200).unwrap();
        assert_eq!(element.code[0], vavg.code[0]);
        let last_dump = element.code.iter().find(|l| l.starts_with("dump ")).unwrap();
        assert!(last_dump.ends_with(vavg.output().unwrap()));
    }

    #[test]
    fn dump_of_defined_variable_does_not_redefine_it() {
        let vavg = time_average(20, &strings(&["vx", "vy", "vz"])).unwrap();
        let element = dump("secv.txt", DumpSource::Defined(&vavg), 200).unwrap();
        assert!(!element.code.iter().any(|l| vavg.code.contains(l)));
        let last_dump = element.code.iter().find(|l| l.starts_with("dump ")).unwrap();
        assert!(last_dump.ends_with(vavg.output().unwrap()));
    }

    #[test]
    fn dump_of_non_variable_fails() {
        let field = efield(1.0, 0.0, 0.0).unwrap();
        assert!(dump("out.txt", DumpSource::Variable(&field), 1).is_err());
        assert!(dump("out.txt", DumpSource::Defined(&field), 1).is_err());
    }

    #[test]
    fn dump_validates_filename_and_steps() {
        let attrs = strings(&["x"]);
        assert!(dump("", DumpSource::Attributes(&attrs), 1).is_err());
        assert!(dump("my file.txt", DumpSource::Attributes(&attrs), 1).is_err());
        assert!(dump("file.txt", DumpSource::Attributes(&attrs), 0).is_err());
    }
}
