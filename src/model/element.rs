use serde::Serialize;
use std::fmt;
use toml::Value;

use crate::error::Error;

/// The four kinds of simulation element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A group of ions sharing charge, mass, and rigidity.
    Species,
    /// A persistent force, field, or output contributed to the run.
    Fix,
    /// A one-shot instruction such as `run` or `minimize`.
    Command,
    /// A derived per-atom or global quantity.
    Variable,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Species => write!(f, "species"),
            ElementKind::Fix => write!(f, "fix"),
            ElementKind::Command => write!(f, "command"),
            ElementKind::Variable => write!(f, "variable"),
        }
    }
}

/// Engine-visible identifier of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ElementId {
    Int(u32),
    Name(String),
}

impl ElementId {
    #[inline]
    pub fn as_int(&self) -> Option<u32> {
        match self {
            ElementId::Int(n) => Some(*n),
            ElementId::Name(_) => None,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Int(n) => write!(f, "{n}"),
            ElementId::Name(s) => write!(f, "{s}"),
        }
    }
}

impl From<u32> for ElementId {
    fn from(n: u32) -> Self {
        ElementId::Int(n)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        ElementId::Name(s.to_string())
    }
}

/// Initial state of one ion species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesData {
    /// Charge in units of the elementary charge.
    pub charge: f64,
    /// Mass in atomic mass units.
    pub mass: f64,
    /// Initial positions in metres.
    pub positions: Vec<[f64; 3]>,
}

/// Kind-specific fields of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Species(SpeciesData),
    Fix,
    Command,
    Variable {
        /// Space-separated engine symbols exposed by the variable.
        output: String,
    },
}

/// One declarative unit of simulation configuration.
///
/// Elements are produced by the factories in [`crate::factory`] or decoded from a
/// TOML table with [`Element::from_value`], then appended to a
/// [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: Option<ElementId>,
    pub code: Vec<String>,
    pub timestep_hint: Option<f64>,
    pub priority: Option<i32>,
    pub rigid: bool,
    pub payload: Payload,
}

impl Element {
    fn bare(payload: Payload) -> Self {
        Self {
            id: None,
            code: Vec::new(),
            timestep_hint: None,
            priority: None,
            rigid: false,
            payload,
        }
    }

    /// Creates an anonymous command from engine statements.
    pub fn command<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::bare(Payload::Command).with_code(lines)
    }

    /// Creates a fix with the given identifier and statements.
    pub fn fix<I, S>(id: impl Into<ElementId>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::bare(Payload::Fix).with_id(id).with_code(lines)
    }

    /// Creates a species without an identifier; one is assigned on append.
    pub fn species(data: SpeciesData) -> Self {
        Self::bare(Payload::Species(data))
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_code<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.code = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_timestep_hint(mut self, timestep: f64) -> Self {
        self.timestep_hint = Some(timestep);
        self
    }

    pub fn with_rigid(mut self, rigid: bool) -> Self {
        self.rigid = rigid;
        self
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        match self.payload {
            Payload::Species(_) => ElementKind::Species,
            Payload::Fix => ElementKind::Fix,
            Payload::Command => ElementKind::Command,
            Payload::Variable { .. } => ElementKind::Variable,
        }
    }

    #[inline]
    pub fn is_species(&self) -> bool {
        matches!(self.payload, Payload::Species(_))
    }

    pub fn species_data(&self) -> Option<&SpeciesData> {
        match &self.payload {
            Payload::Species(data) => Some(data),
            _ => None,
        }
    }

    /// Engine symbols exposed by a variable element.
    pub fn output(&self) -> Option<&str> {
        match &self.payload {
            Payload::Variable { output } => Some(output),
            _ => None,
        }
    }

    /// Decodes an element of the given kind from a factory's returned table.
    ///
    /// The value must be a table. Recognised keys are `id`, `code`, `timestep`,
    /// `priority`, `rigid`, plus `charge`, `mass`, `positions` for species and
    /// `output` for variables; other keys are ignored. A missing `code` is an
    /// empty list.
    pub fn from_value(factory: &str, kind: ElementKind, value: Value) -> Result<Self, Error> {
        let Value::Table(table) = value else {
            return Err(Error::NotAMapping {
                factory: factory.to_string(),
                found: value.type_str(),
            });
        };

        let code = match table.get("code") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(Error::code_not_list(
                        factory,
                        format!("found a {} entry", other.type_str()),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(Error::code_not_list(
                    factory,
                    format!("found a {}", other.type_str()),
                ));
            }
        };

        let id = match table.get("id") {
            None => None,
            Some(Value::Integer(n)) => Some(ElementId::Int(
                u32::try_from(*n).map_err(|_| Error::missing_field(factory, kind, "id"))?,
            )),
            Some(Value::String(s)) => Some(ElementId::Name(s.clone())),
            Some(_) => return Err(Error::missing_field(factory, kind, "id")),
        };

        let payload = match kind {
            ElementKind::Species => Payload::Species(SpeciesData {
                charge: number(&table, "charge")
                    .ok_or_else(|| Error::missing_field(factory, kind, "charge"))?,
                mass: number(&table, "mass")
                    .ok_or_else(|| Error::missing_field(factory, kind, "mass"))?,
                positions: positions(&table)
                    .ok_or_else(|| Error::missing_field(factory, kind, "positions"))?,
            }),
            ElementKind::Fix => Payload::Fix,
            ElementKind::Command => Payload::Command,
            ElementKind::Variable => Payload::Variable {
                output: table
                    .get("output")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| Error::missing_field(factory, kind, "output"))?,
            },
        };

        Ok(Self {
            id,
            code,
            timestep_hint: number(&table, "timestep"),
            priority: table
                .get("priority")
                .and_then(Value::as_integer)
                .and_then(|p| i32::try_from(p).ok()),
            rigid: table.get("rigid").and_then(Value::as_bool).unwrap_or(false),
            payload,
        })
    }
}

fn number(table: &toml::Table, key: &str) -> Option<f64> {
    match table.get(key)? {
        Value::Float(x) => Some(*x),
        Value::Integer(n) => Some(*n as f64),
        _ => None,
    }
}

fn positions(table: &toml::Table) -> Option<Vec<[f64; 3]>> {
    let Value::Array(rows) = table.get("positions")? else {
        return None;
    };
    rows.iter()
        .map(|row| {
            let coords = row.as_array()?;
            if coords.len() != 3 {
                return None;
            }
            let mut out = [0.0; 3];
            for (slot, value) in out.iter_mut().zip(coords) {
                *slot = match value {
                    Value::Float(x) => *x,
                    Value::Integer(n) => *n as f64,
                    _ => return None,
                };
            }
            Some(out)
        })
        .collect()
}
