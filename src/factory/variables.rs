use std::sync::LazyLock;

use toml::Value;

use super::{Fragment, VariableFactory, VariableStyle, builtin_variable, string_args};
use crate::error::Error;
use crate::model::element::Element;

static TIME_AVERAGE: LazyLock<VariableFactory> = LazyLock::new(|| {
    builtin_variable(
        VariableStyle::Fix,
        "time_average",
        &["uid", "steps", "variables"],
    )
});

static SQUARE_SUM: LazyLock<VariableFactory> =
    LazyLock::new(|| builtin_variable(VariableStyle::Atom, "square_sum", &["uid", "variables"]));

/// Per-atom running average of `variables` over windows of `steps` timesteps.
///
/// The averaged columns are exposed as `f_<id>[1]`, `f_<id>[2]`, and so on, and are
/// meant to be written out with [`dump`](super::fixes::dump).
pub fn time_average(steps: u32, variables: &[String]) -> Result<Element, Error> {
    if steps == 0 {
        return Err(Error::invalid_argument(
            "time_average",
            "averaging window must be at least one step",
        ));
    }
    if variables.is_empty() {
        return Err(Error::invalid_argument("time_average", "no variables to average"));
    }

    let args = [Value::Integer(i64::from(steps)), string_args(variables)];
    TIME_AVERAGE.invoke(&args, variables, |uid| {
        Fragment::new([
            format!("# Time averaging {}", variables.join(", ")),
            format!(
                "fix {uid} all ave/atom 1 {steps} {steps} {}",
                variables.join(" ")
            ),
        ])
        .into()
    })
}

/// Per-atom sum of squares of `variables`, e.g. `x^2+y^2+z^2`.
pub fn square_sum(variables: &[String]) -> Result<Element, Error> {
    if variables.is_empty() {
        return Err(Error::invalid_argument("square_sum", "no variables to sum"));
    }

    let args = [string_args(variables)];
    SQUARE_SUM.invoke(&args, variables, |uid| {
        let name = VariableStyle::Atom.engine_name(uid);
        let terms = variables
            .iter()
            .map(|v| format!("{v}^2"))
            .collect::<Vec<_>>()
            .join("+");
        Fragment::new([
            format!("# Sum of squares of {}", variables.join(", ")),
            format!("variable {name} atom \"{terms}\""),
        ])
        .into()
    })
}
