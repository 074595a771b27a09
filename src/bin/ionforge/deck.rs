//! Simulation decks.
//!
//! A deck is a TOML file describing one simulation:
//!
//! ```toml
//! [simulation]
//! name = "two species"
//! timestep = 1e-7
//!
//! [[species]]
//! name = "calcium"
//! charge = 1
//! mass = 40
//! cloud = { radius = 1e-4, number = 20, seed = 7 }
//!
//! [[element]]
//! factory = "linear_paul_trap"
//! radius = 3.75e-3
//! length = 2.75e-3
//! kappa = 0.244
//! endcap_voltage = 15
//! drives = [{ voltage = 500, frequency = 3.85e6 }]
//!
//! [[element]]
//! factory = "evolve"
//! steps = 10000
//! ```
//!
//! Species are appended first, in order, then the elements. Elements and species
//! may carry a `name` so later entries can refer to them.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use ion_forge::factory::fixes::DumpSource;
use ion_forge::factory::trap::{LinearPaulTrap, TrapMode, TrapScope};
use ion_forge::factory::{commands, fixes, species, trap, variables};
use ion_forge::render::group_name;
use ion_forge::{Element, Ions, Simulation, SimulationConfig};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deck {
    #[serde(default)]
    pub simulation: Settings,
    #[serde(default)]
    pub species: Vec<SpeciesEntry>,
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub name: Option<String>,
    #[serde(flatten)]
    pub config: SimulationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesEntry {
    pub name: Option<String>,
    pub charge: f64,
    pub mass: f64,
    #[serde(default)]
    pub rigid: bool,
    pub positions: Option<Vec<[f64; 3]>>,
    pub cloud: Option<Cloud>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cloud {
    pub radius: f64,
    pub number: usize,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Deserialize)]
pub struct ElementEntry {
    pub name: Option<String>,
    pub priority: Option<i32>,
    #[serde(flatten)]
    pub call: FactoryCall,
}

/// One factory invocation, tagged by factory name.
#[derive(Debug, Deserialize)]
#[serde(tag = "factory", rename_all = "snake_case")]
pub enum FactoryCall {
    Efield {
        ex: f64,
        ey: f64,
        ez: f64,
    },
    LangevinBath {
        temperature: f64,
        damping_time: f64,
    },
    Dump {
        filename: String,
        /// Atom attributes to write.
        variables: Option<Vec<String>>,
        /// Name of a variable element whose output to write.
        variable: Option<String>,
        steps: u32,
    },
    LinearPaulTrap {
        #[serde(flatten)]
        trap: LinearPaulTrap,
        #[serde(default)]
        pseudo: bool,
        /// Species the pseudo-potential is computed for.
        ions: Option<String>,
        /// `all`, a species name, or an engine group.
        scope: Option<String>,
    },
    Evolve {
        steps: u64,
    },
    Minimise {
        #[serde(default)]
        etol: f64,
        #[serde(default)]
        ftol: f64,
        max_iter: u32,
        max_eval: u32,
        max_dist: f64,
    },
    ThermalVelocities {
        temperature: f64,
        #[serde(default)]
        zero_momentum: bool,
    },
    Custom {
        lines: Vec<String>,
    },
    TimeAverage {
        steps: u32,
        variables: Vec<String>,
    },
    SquareSum {
        variables: Vec<String>,
    },
    /// Unfixes a previously named element.
    Remove {
        target: String,
    },
}

impl FactoryCall {
    pub fn factory_name(&self) -> &'static str {
        match self {
            FactoryCall::Efield { .. } => "efield",
            FactoryCall::LangevinBath { .. } => "langevin_bath",
            FactoryCall::Dump { .. } => "dump",
            FactoryCall::LinearPaulTrap { .. } => "linear_paul_trap",
            FactoryCall::Evolve { .. } => "evolve",
            FactoryCall::Minimise { .. } => "minimise",
            FactoryCall::ThermalVelocities { .. } => "thermal_velocities",
            FactoryCall::Custom { .. } => "custom",
            FactoryCall::TimeAverage { .. } => "time_average",
            FactoryCall::SquareSum { .. } => "square_sum",
            FactoryCall::Remove { .. } => "remove",
        }
    }
}

/// Named entries seen so far while assembling a deck.
#[derive(Default)]
struct Names {
    ions: HashMap<String, Ions>,
    elements: HashMap<String, Element>,
}

impl Names {
    fn ions(&self, name: &str) -> Result<&Ions> {
        self.ions
            .get(name)
            .ok_or_else(|| anyhow!("No species named '{name}' is defined before this element"))
    }

    fn element(&self, name: &str) -> Result<&Element> {
        self.elements
            .get(name)
            .ok_or_else(|| anyhow!("No element named '{name}' is defined before this element"))
    }
}

impl Deck {
    /// Simulation name: `[simulation] name`, else the deck's file stem.
    pub fn name(&self, path: &Path) -> String {
        self.simulation.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ionforge".to_string())
        })
    }

    /// Builds the simulation described by the deck.
    pub fn build(self, name: &str, config: SimulationConfig) -> Result<Simulation> {
        let mut sim = Simulation::with_config(name, config);
        let mut names = Names::default();

        for (i, entry) in self.species.into_iter().enumerate() {
            let label = entry.name.clone().unwrap_or_else(|| format!("#{}", i + 1));
            let ions = Ions {
                charge: entry.charge,
                mass: entry.mass,
                rigid: entry.rigid,
            };
            let element = build_species(&ions, &entry)
                .with_context(|| format!("Invalid species '{label}'"))?;
            let stored = sim.append(element);
            if let Some(name) = entry.name {
                names.ions.insert(name.clone(), ions);
                names.elements.insert(name, stored.clone());
            }
        }

        for (i, entry) in self.elements.into_iter().enumerate() {
            let factory = entry.call.factory_name();
            let label = entry
                .name
                .clone()
                .unwrap_or_else(|| format!("#{} ({factory})", i + 1));

            if let FactoryCall::Remove { target } = &entry.call {
                let element = names.element(target)?;
                sim.remove(element)
                    .with_context(|| format!("Cannot remove '{target}'"))?;
                continue;
            }

            let mut element = build_element(&entry.call, &names)
                .with_context(|| format!("Invalid element {label}"))?;
            if let Some(priority) = entry.priority {
                element = element.with_priority(priority);
            }
            let stored = sim.append(element);
            if let Some(name) = entry.name {
                names.elements.insert(name, stored.clone());
            }
        }

        Ok(sim)
    }
}

fn build_species(ions: &Ions, entry: &SpeciesEntry) -> Result<Element> {
    let element = match (&entry.positions, &entry.cloud) {
        (Some(positions), None) => species::place_ions(ions, positions)?,
        (None, Some(cloud)) => species::ion_cloud(ions, cloud.radius, cloud.number, cloud.seed)?,
        (Some(_), Some(_)) => bail!("Give either 'positions' or 'cloud', not both"),
        (None, None) => bail!("One of 'positions' or 'cloud' is required"),
    };
    Ok(element)
}

fn build_element(call: &FactoryCall, names: &Names) -> Result<Element> {
    let element = match call {
        FactoryCall::Efield { ex, ey, ez } => fixes::efield(*ex, *ey, *ez)?,
        FactoryCall::LangevinBath {
            temperature,
            damping_time,
        } => fixes::langevin_bath(*temperature, *damping_time)?,
        FactoryCall::Dump {
            filename,
            variables,
            variable,
            steps,
        } => {
            let source = match (variables, variable) {
                (Some(attributes), None) => DumpSource::Attributes(attributes.as_slice()),
                (None, Some(name)) => DumpSource::Defined(names.element(name)?),
                _ => bail!("Give exactly one of 'variables' or 'variable'"),
            };
            fixes::dump(filename, source, *steps)?
        }
        FactoryCall::LinearPaulTrap {
            trap: geometry,
            pseudo,
            ions,
            scope,
        } => {
            let ions = ions.as_deref().map(|n| names.ions(n)).transpose()?;
            let mode = TrapMode::from_flag(*pseudo, ions)?;
            let scope = resolve_scope(scope.as_deref(), names)?;
            trap::linear_paul_trap(geometry, mode, &scope)?
        }
        FactoryCall::Evolve { steps } => commands::evolve(*steps)?,
        FactoryCall::Minimise {
            etol,
            ftol,
            max_iter,
            max_eval,
            max_dist,
        } => commands::minimise(*etol, *ftol, *max_iter, *max_eval, *max_dist)?,
        FactoryCall::ThermalVelocities {
            temperature,
            zero_momentum,
        } => commands::thermal_velocities(*temperature, *zero_momentum)?,
        FactoryCall::Custom { lines } => commands::custom(lines)?,
        FactoryCall::TimeAverage { steps, variables } => {
            variables::time_average(*steps, variables)?
        }
        FactoryCall::SquareSum { variables } => variables::square_sum(variables)?,
        FactoryCall::Remove { .. } => bail!("'remove' does not build an element"),
    };
    Ok(element)
}

/// A species name maps to that species' engine group.
fn resolve_scope(scope: Option<&str>, names: &Names) -> Result<TrapScope> {
    match scope {
        None | Some("all") => Ok(TrapScope::All),
        Some(name) if names.ions.contains_key(name) => {
            let id = names
                .element(name)?
                .id
                .as_ref()
                .ok_or_else(|| anyhow!("Species '{name}' has no id"))?;
            Ok(TrapScope::Group(group_name(id)))
        }
        Some(group) => Ok(TrapScope::Group(group.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ion_forge::ElementKind;

    const TWO_SPECIES: &str = r#"
        [simulation]
        name = "two species"
        timestep = 1e-6

        [[species]]
        name = "calcium"
        charge = 1
        mass = 40
        positions = [[0, 0, -1e-5], [0, 0, 1e-5]]

        [[species]]
        name = "barium"
        charge = 1
        mass = 138
        rigid = true
        cloud = { radius = 1e-4, number = 5, seed = 3 }

        [[element]]
        name = "trap"
        factory = "linear_paul_trap"
        radius = 3.75e-3
        length = 2.75e-3
        kappa = 0.244
        endcap_voltage = 15
        drives = [{ voltage = 500, frequency = 3.85e6 }]
        pseudo = true
        ions = "calcium"
        scope = "calcium"

        [[element]]
        name = "vavg"
        factory = "time_average"
        steps = 20
        variables = ["vx", "vy", "vz"]

        [[element]]
        factory = "dump"
        filename = "secv.txt"
        variable = "vavg"
        steps = 100

        [[element]]
        factory = "evolve"
        steps = 1000

        [[element]]
        factory = "remove"
        target = "trap"
    "#;

    #[test]
    fn deck_builds_simulation() {
        let deck: Deck = toml::from_str(TWO_SPECIES).unwrap();
        assert_eq!(deck.name(Path::new("ignored.toml")), "two species");

        let sim = deck
            .build("two species", SimulationConfig::default())
            .unwrap();
        assert_eq!(sim.len(), 7);
        assert_eq!(sim.identities().species_count(), 2);
        assert_eq!(sim.rigid_groups(), [2]);
        assert!(sim.timestep() < 1e-6);

        let trap = &sim.elements()[2];
        assert_eq!(trap.kind(), ElementKind::Fix);
        assert!(trap.code.iter().any(|l| l.contains(" species1 addforce ")));

        let last = sim.elements().last().unwrap();
        assert!(last.code.iter().any(|l| l.starts_with("unfix ")));
    }

    #[test]
    fn dumped_variable_is_defined_once() {
        let deck: Deck = toml::from_str(TWO_SPECIES).unwrap();
        let sim = deck
            .build("two species", SimulationConfig::default())
            .unwrap();

        let averages = sim
            .elements()
            .iter()
            .flat_map(|e| &e.code)
            .filter(|l| l.contains(" ave/atom "))
            .count();
        assert_eq!(averages, 1);

        let dump = sim
            .elements()
            .iter()
            .flat_map(|e| &e.code)
            .find(|l| l.starts_with("dump "))
            .unwrap();
        assert!(dump.contains(" secv.txt "));
        assert!(dump.contains("f_"));
    }

    #[test]
    fn every_factory_tag_is_recognised() {
        let tags = [
            r#"factory = "efield"
               ex = 1
               ey = 0
               ez = 0"#,
            r#"factory = "langevin_bath"
               temperature = 1e-3
               damping_time = 1e-5"#,
            r#"factory = "dump"
               filename = "positions.txt"
               variables = ["x", "y", "z"]
               steps = 10"#,
            r#"factory = "evolve"
               steps = 10"#,
            r#"factory = "minimise"
               max_iter = 100
               max_eval = 100
               max_dist = 1e-7"#,
            r#"factory = "thermal_velocities"
               temperature = 1e-3"#,
            r#"factory = "custom"
               lines = ["thermo 100"]"#,
            r#"factory = "square_sum"
               variables = ["x", "y", "z"]"#,
        ];
        for tag in tags {
            let entry: ElementEntry = toml::from_str(tag).unwrap();
            let element = build_element(&entry.call, &Names::default());
            assert!(element.is_ok(), "{tag}: {:?}", element.err());
        }
    }

    #[test]
    fn unknown_factory_is_a_parse_error() {
        let result: Result<ElementEntry, _> = toml::from_str(r#"factory = "teleport""#);
        assert!(result.is_err());
    }

    #[test]
    fn species_need_exactly_one_placement() {
        let deck: Deck = toml::from_str(
            r#"
            [[species]]
            charge = 1
            mass = 40
            "#,
        )
        .unwrap();
        let err = deck.build("bad", SimulationConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("'positions' or 'cloud'"));
    }

    #[test]
    fn references_must_be_defined_first() {
        let deck: Deck = toml::from_str(
            r#"
            [[element]]
            factory = "remove"
            target = "nothing"
            "#,
        )
        .unwrap();
        assert!(deck.build("bad", SimulationConfig::default()).is_err());
    }
}
