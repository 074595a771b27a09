use std::sync::LazyLock;

use toml::Value;

use super::fixes::ENGINE_SEED;
use super::{ElementFactory, Fragment, builtin, string_args};
use crate::error::Error;
use crate::model::element::{Element, ElementKind};

static EVOLVE: LazyLock<ElementFactory> =
    LazyLock::new(|| builtin(ElementKind::Command, "evolve", &["steps"]));

static MINIMISE: LazyLock<ElementFactory> = LazyLock::new(|| {
    builtin(
        ElementKind::Command,
        "minimise",
        &["etol", "ftol", "max_iter", "max_eval", "max_dist"],
    )
});

static THERMAL_VELOCITIES: LazyLock<ElementFactory> = LazyLock::new(|| {
    builtin(
        ElementKind::Command,
        "thermal_velocities",
        &["temperature", "zero_momentum"],
    )
});

static CUSTOM: LazyLock<ElementFactory> =
    LazyLock::new(|| builtin(ElementKind::Command, "custom", &["lines"]));

/// Integrates the equations of motion for `steps` timesteps.
pub fn evolve(steps: u64) -> Result<Element, Error> {
    let args = [Value::String(steps.to_string())];
    EVOLVE.invoke(&args, |_| {
        Fragment::new(["# Run simulation".to_string(), format!("run {steps}")]).into()
    })
}

/// Quick-min energy minimisation, typically against a pseudo-potential trap.
///
/// Velocities are zeroed afterwards so the minimised crystal starts at rest.
pub fn minimise(
    etol: f64,
    ftol: f64,
    max_iter: u32,
    max_eval: u32,
    max_dist: f64,
) -> Result<Element, Error> {
    if max_dist <= 0.0 {
        return Err(Error::invalid_argument(
            "minimise",
            format!("maximum displacement must be positive, got {max_dist}"),
        ));
    }

    let args = [
        Value::Float(etol),
        Value::Float(ftol),
        Value::Integer(i64::from(max_iter)),
        Value::Integer(i64::from(max_eval)),
        Value::Float(max_dist),
    ];
    MINIMISE.invoke(&args, |_| {
        Fragment::new([
            "# Minimise energy".to_string(),
            "min_style quickmin".to_string(),
            format!("min_modify dmax {max_dist:e}"),
            format!("minimize {etol:e} {ftol:e} {max_iter} {max_eval}"),
            "velocity all set 0.0 0.0 0.0".to_string(),
        ])
        .into()
    })
}

/// Draws Gaussian velocities for `temperature` kelvin.
pub fn thermal_velocities(temperature: f64, zero_momentum: bool) -> Result<Element, Error> {
    if temperature < 0.0 {
        return Err(Error::invalid_argument(
            "thermal_velocities",
            format!("temperature must be non-negative, got {temperature}"),
        ));
    }

    let mom = if zero_momentum { "yes" } else { "no" };
    let args = [Value::Float(temperature), Value::Boolean(zero_momentum)];
    THERMAL_VELOCITIES.invoke(&args, |_| {
        Fragment::new([
            "# Initial thermal velocities".to_string(),
            format!(
                "velocity all create {temperature:e} {ENGINE_SEED} mom {mom} rot yes dist gaussian"
            ),
        ])
        .into()
    })
}

/// Verbatim engine statements.
pub fn custom(lines: &[String]) -> Result<Element, Error> {
    CUSTOM.invoke(&[string_args(lines)], |_| Fragment::new(lines.iter().cloned()).into())
}
