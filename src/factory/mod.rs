//! Element factories.
//!
//! An [`ElementFactory`] is defined once with its kind, name, and formal parameter
//! list. Defining it checks the structural contract that identifier-carrying kinds
//! (fixes and variables) take `uid` as their leftmost parameter. Invoking it hashes
//! the positional arguments into a `uid`, runs the factory body, and validates the
//! shape of the table the body returns before it becomes an [`Element`].
//!
//! The built-in factories live in the submodules:
//!
//! - [`fixes`] – static fields, Langevin baths, dumps
//! - [`trap`] – the linear Paul trap, in oscillating or pseudo-potential form
//! - [`commands`] – evolution, minimisation, velocity initialisation
//! - [`variables`] – time averages and derived per-atom quantities
//! - [`species`] – explicit ion placement and random ion clouds

pub mod commands;
pub mod fixes;
pub mod species;
pub mod trap;
pub mod variables;

use serde::Serialize;
use toml::{Table, Value};

use crate::error::Error;
use crate::identity::Identities;
use crate::model::element::{Element, ElementId, ElementKind};

/// Symbols a variable may reference directly.
pub const ATOM_ATTRIBUTES: [&str; 7] = ["id", "x", "y", "z", "vx", "vy", "vz"];

/// Prefixes of references to previously defined variables, fixes, and computes.
pub const REFERENCE_PREFIXES: [&str; 3] = ["v_", "f_", "c_"];

/// A validated factory definition.
#[derive(Debug, Clone)]
pub struct ElementFactory {
    kind: ElementKind,
    name: String,
    params: Vec<String>,
}

impl ElementFactory {
    /// Defines a factory, checking the leftmost-identifier contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentifierSlot`] if `kind` is a fix or variable and the
    /// first parameter is not `uid`.
    pub fn define(kind: ElementKind, name: impl Into<String>, params: &[&str]) -> Result<Self, Error> {
        let name = name.into();
        let needs_id = matches!(kind, ElementKind::Fix | ElementKind::Variable);
        if needs_id && params.first() != Some(&"uid") {
            return Err(Error::IdentifierSlot {
                factory: name,
                kind,
            });
        }
        Ok(Self {
            kind,
            name,
            params: params.iter().map(|p| p.to_string()).collect(),
        })
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Runs `body` for one invocation with positional `args`.
    ///
    /// The body receives the invocation's content-hash `uid`. Fixes and variables
    /// take it as their identifier unless the body returned an explicit `id`.
    pub fn invoke<F>(&self, args: &[Value], body: F) -> Result<Element, Error>
    where
        F: FnOnce(u32) -> Value,
    {
        let uid = Identities::invocation_id(&self.name, args);
        let value = body(uid);
        self.finish(uid, value)
    }

    fn finish(&self, uid: u32, value: Value) -> Result<Element, Error> {
        let mut element = Element::from_value(&self.name, self.kind, value)?;
        if element.id.is_none() && matches!(self.kind, ElementKind::Fix | ElementKind::Variable) {
            element.id = Some(ElementId::Int(uid));
        }
        Ok(element)
    }
}

/// How a variable exposes its values to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStyle {
    /// Per-atom array produced by a fix, referenced as `f_<id>[i]`.
    Fix,
    /// Per-atom formula, referenced as `v_var<id>`.
    Atom,
}

impl VariableStyle {
    /// Engine name under which a variable with this `uid` is defined.
    pub fn engine_name(self, uid: u32) -> String {
        match self {
            VariableStyle::Fix => uid.to_string(),
            VariableStyle::Atom => format!("var{uid}"),
        }
    }

    fn output(self, uid: u32, columns: usize) -> String {
        match self {
            VariableStyle::Fix => (1..=columns)
                .map(|i| format!("f_{uid}[{i}]"))
                .collect::<Vec<_>>()
                .join(" "),
            VariableStyle::Atom => format!("v_{}", self.engine_name(uid)),
        }
    }
}

/// Factory for variable elements.
///
/// Adds the `variables` check and derives the `output` symbols from the style.
#[derive(Debug, Clone)]
pub struct VariableFactory {
    inner: ElementFactory,
    style: VariableStyle,
}

impl VariableFactory {
    pub fn define(style: VariableStyle, name: impl Into<String>, params: &[&str]) -> Result<Self, Error> {
        Ok(Self {
            inner: ElementFactory::define(ElementKind::Variable, name, params)?,
            style,
        })
    }

    #[inline]
    pub fn style(&self) -> VariableStyle {
        self.style
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Invokes the factory for a set of `variables`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownVariable`] if `variables` is not a subset of
    /// [`ATOM_ATTRIBUTES`] and not every entry carries a reference prefix;
    /// otherwise the shape errors of [`ElementFactory::invoke`].
    pub fn invoke<F>(&self, args: &[Value], variables: &[String], body: F) -> Result<Element, Error>
    where
        F: FnOnce(u32) -> Value,
    {
        check_variables(variables)?;

        let uid = Identities::invocation_id(self.inner.name(), args);
        let mut value = body(uid);
        if let Value::Table(table) = &mut value {
            table
                .entry("output")
                .or_insert_with(|| Value::String(self.style.output(uid, variables.len())));
        }
        self.inner.finish(uid, value)
    }
}

/// Checks that `variables` are atom attributes or, failing that, all references.
pub fn check_variables(variables: &[String]) -> Result<(), Error> {
    if variables.iter().all(|v| ATOM_ATTRIBUTES.contains(&v.as_str())) {
        return Ok(());
    }
    let is_reference = |v: &&String| REFERENCE_PREFIXES.iter().any(|p| v.starts_with(p));
    if variables.iter().all(|v| is_reference(&v)) {
        return Ok(());
    }

    // An unknown name is the culprit; otherwise attributes were mixed with references.
    let bad = variables
        .iter()
        .find(|v| !is_reference(v) && !ATOM_ATTRIBUTES.contains(&v.as_str()))
        .or_else(|| variables.iter().find(|v| !is_reference(v)));
    match bad {
        Some(bad) => Err(Error::UnknownVariable { name: bad.clone() }),
        None => Ok(()),
    }
}

/// Builder for the table a built-in factory body returns.
#[derive(Debug, Clone, Default)]
pub struct Fragment(Table);

impl Fragment {
    pub fn new<I, S>(code: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<Value> = code.into_iter().map(|l| Value::String(l.into())).collect();
        let mut table = Table::new();
        table.insert("code".to_string(), Value::Array(lines));
        Self(table)
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn timestep(self, timestep: f64) -> Self {
        self.set("timestep", timestep)
    }
}

impl From<Fragment> for Value {
    fn from(fragment: Fragment) -> Self {
        Value::Table(fragment.0)
    }
}

/// Converts a structured factory argument into a hashable value.
pub(crate) fn arg<T: Serialize>(factory: &'static str, value: &T) -> Result<Value, Error> {
    Value::try_from(value).map_err(|e| Error::invalid_argument(factory, e.to_string()))
}

pub(crate) fn string_args(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

/// Defines a built-in factory whose signature is fixed at compile time.
pub(crate) fn builtin(kind: ElementKind, name: &str, params: &[&str]) -> ElementFactory {
    ElementFactory::define(kind, name, params)
        .expect("Built-in factory signature is invalid. This is a library bug.")
}

pub(crate) fn builtin_variable(style: VariableStyle, name: &str, params: &[&str]) -> VariableFactory {
    VariableFactory::define(style, name, params)
        .expect("Built-in variable signature is invalid. This is a library bug.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_requires_leftmost_uid() {
        let err = ElementFactory::define(ElementKind::Fix, "fixme", &["ex", "uid"]).unwrap_err();
        assert!(matches!(err, Error::IdentifierSlot { kind: ElementKind::Fix, .. }));

        let err = ElementFactory::define(ElementKind::Fix, "fixme", &[]).unwrap_err();
        assert!(matches!(err, Error::IdentifierSlot { .. }));

        assert!(ElementFactory::define(ElementKind::Fix, "fixme", &["uid", "ex"]).is_ok());
    }

    #[test]
    fn commands_need_no_identifier_slot() {
        let factory = ElementFactory::define(ElementKind::Command, "run", &["steps"]).unwrap();
        let element = factory
            .invoke(&[Value::Integer(10)], |_| Fragment::new(["run 10"]).into())
            .unwrap();
        assert_eq!(element.id, None);
        assert_eq!(element.kind(), ElementKind::Command);
    }

    #[test]
    fn fix_gets_hashed_identifier() {
        let factory = ElementFactory::define(ElementKind::Fix, "fixme", &["uid"]).unwrap();
        let element = factory
            .invoke(&[], |uid| Fragment::new([format!("fix {uid} all nve")]).into())
            .unwrap();
        let id = element.id.as_ref().and_then(ElementId::as_int).unwrap();
        assert_eq!(element.code, vec![format!("fix {id} all nve")]);
    }

    #[test]
    fn empty_table_is_accepted() {
        let factory = ElementFactory::define(ElementKind::Fix, "fixme", &["uid"]).unwrap();
        let element = factory.invoke(&[], |_| Value::Table(Table::new())).unwrap();
        assert!(element.code.is_empty());
    }

    #[test]
    fn body_shape_errors_are_distinguished() {
        let factory = ElementFactory::define(ElementKind::Fix, "fixme", &["uid"]).unwrap();

        let err = factory.invoke(&[], |_| Value::Integer(2)).unwrap_err();
        assert!(matches!(err, Error::NotAMapping { .. }));

        let err = factory.invoke(&[], |_| Value::String("asdas".into())).unwrap_err();
        assert!(matches!(err, Error::NotAMapping { .. }));

        let err = factory
            .invoke(&[], |_| Fragment::default().set("code", "not a list").into())
            .unwrap_err();
        assert!(matches!(err, Error::CodeNotList { .. }));
    }

    #[test]
    fn explicit_id_wins_over_hash() {
        let factory = ElementFactory::define(ElementKind::Fix, "fixme", &["uid"]).unwrap();
        let element = factory
            .invoke(&[], |_| Fragment::new(["unfix 7"]).set("id", 7).into())
            .unwrap();
        assert_eq!(element.id, Some(ElementId::Int(7)));
    }

    #[test]
    fn variable_factory_requires_uid() {
        let err = VariableFactory::define(VariableStyle::Fix, "avg", &["steps"]).unwrap_err();
        assert!(matches!(err, Error::IdentifierSlot { kind: ElementKind::Variable, .. }));
    }

    #[test]
    fn variable_without_variables_is_accepted() {
        let factory = VariableFactory::define(VariableStyle::Fix, "variable", &["uid"]).unwrap();
        let element = factory.invoke(&[], &[], |_| Fragment::default().into()).unwrap();
        assert_eq!(element.output(), Some(""));
    }

    #[test]
    fn variable_output_follows_style() {
        let vars: Vec<String> = ["vx", "vy", "vz"].map(String::from).to_vec();
        let fix_style = VariableFactory::define(VariableStyle::Fix, "avg", &["uid"]).unwrap();
        let element = fix_style.invoke(&[], &vars, |_| Fragment::default().into()).unwrap();
        let uid = element.id.as_ref().and_then(ElementId::as_int).unwrap();
        assert_eq!(
            element.output(),
            Some(format!("f_{uid}[1] f_{uid}[2] f_{uid}[3]").as_str())
        );

        let atom_style = VariableFactory::define(VariableStyle::Atom, "sq", &["uid"]).unwrap();
        let element = atom_style.invoke(&[], &vars, |_| Fragment::default().into()).unwrap();
        let uid = element.id.as_ref().and_then(ElementId::as_int).unwrap();
        assert_eq!(element.output(), Some(format!("v_var{uid}").as_str()));
    }

    #[test]
    fn variables_must_be_attributes_or_references() {
        let ok = |vs: &[&str]| check_variables(&vs.iter().map(|s| s.to_string()).collect::<Vec<_>>());

        assert!(ok(&["x", "y", "z"]).is_ok());
        assert!(ok(&["v_energy", "f_12[1]"]).is_ok());
        assert!(matches!(
            ok(&["x", "temperature"]),
            Err(Error::UnknownVariable { name }) if name == "temperature"
        ));
        assert!(matches!(
            ok(&["v_energy", "x", "charge", "y"]),
            Err(Error::UnknownVariable { name }) if name == "charge"
        ));
        // mixing attributes with references is not allowed
        assert!(matches!(
            ok(&["v_energy", "x"]),
            Err(Error::UnknownVariable { name }) if name == "x"
        ));
    }
}
