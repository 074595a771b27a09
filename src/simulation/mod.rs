//! The element registry.
//!
//! A [`Simulation`] is an ordered collection of [`Element`]s plus the run-wide
//! [`SimulationConfig`]. Appending an element records its identifier, assigns
//! species ids, tracks rigid groups, and lowers the timestep to the element's
//! hint. Consistency checks are deferred until [`Simulation::render`], which
//! validates the whole list, sorts it, writes the LAMMPS script, and archives the
//! run record. [`Simulation::execute`] then runs the engine on that script.
//!
//! # Examples
//!
//! ```no_run
//! use ion_forge::factory::{commands, species, trap};
//! use ion_forge::{Ions, Simulation};
//!
//! # async fn demo() -> Result<(), ion_forge::Error> {
//! let calcium = Ions::new(1.0, 40.0);
//! let geometry = trap::LinearPaulTrap {
//!     radius: 3.75e-3,
//!     length: 2.75e-3,
//!     kappa: 0.244,
//!     endcap_voltage: 15.0,
//!     drives: vec![trap::RfDrive { voltage: 500.0, frequency: 3.85e6 }],
//! };
//!
//! let mut sim = Simulation::new("single ion");
//! sim.append(species::ion_cloud(&calcium, 1e-4, 10, 42)?);
//! sim.append(trap::linear_paul_trap(
//!     &geometry,
//!     trap::TrapMode::Oscillating,
//!     &trap::TrapScope::All,
//! )?);
//! sim.append(commands::evolve(10_000)?);
//!
//! sim.execute(|line| println!("{line}")).await?;
//! # Ok(())
//! # }
//! ```

mod config;
pub(crate) mod order;
pub(crate) mod validate;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::{self, Archive, DirArchive, ENGINE_LOG};
use crate::error::Error;
use crate::identity::{Identities, SpeciesKey};
use crate::model::attributes::RunAttributes;
use crate::model::element::{Element, ElementId, ElementKind, Payload};
use crate::render::{self, Script};
use crate::run::{EngineProcess, RunOutcome, RunState};

pub use config::{NeighbourList, SimulationConfig};

type IdEntry = Option<(ElementKind, ElementId)>;

/// Ordered collection of simulation elements and the state of its run.
pub struct Simulation {
    name: String,
    config: SimulationConfig,
    elements: Vec<Element>,
    ids: Vec<IdEntry>,
    identities: Identities,
    rigid_groups: Vec<u32>,
    timestep: f64,
    state: RunState,
    script: Option<Script>,
    source: Option<PathBuf>,
    archive: Option<Box<dyn Archive + Send>>,
}

impl Simulation {
    /// Creates an empty simulation with the default configuration.
    ///
    /// The name is lowercased with spaces replaced by underscores and names the
    /// script file and the run archive.
    pub fn new(name: &str) -> Self {
        Self::with_config(name, SimulationConfig::default())
    }

    pub fn with_config(name: &str, config: SimulationConfig) -> Self {
        Self {
            name: slugify(name),
            timestep: config.timestep,
            config,
            elements: Vec::new(),
            ids: Vec::new(),
            identities: Identities::new(),
            rigid_groups: Vec::new(),
            state: RunState::Idle,
            script: None,
            source: None,
            archive: None,
        }
    }

    /// Records the file of the program that built this simulation; it is
    /// archived alongside the script.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Replaces the default directory archive.
    pub fn with_archive(mut self, archive: impl Archive + Send + 'static) -> Self {
        self.archive = Some(Box::new(archive));
        self
    }

    /// Appends an element and returns it as stored.
    ///
    /// Species are given priority 0 and, unless they already carry one, the id of
    /// their `(charge, mass, rigid)` group.
    pub fn append(&mut self, mut element: Element) -> &Element {
        if let Payload::Species(data) = &element.payload {
            element.priority = Some(0);
            if element.id.is_none() {
                let key = SpeciesKey::new(data.charge, data.mass, element.rigid);
                element.id = Some(ElementId::Int(self.identities.species_id(key)));
            }
            if element.rigid {
                if let Some(id) = element.id.as_ref().and_then(ElementId::as_int) {
                    if !self.rigid_groups.contains(&id) {
                        self.rigid_groups.push(id);
                    }
                }
            }
        }

        if let Some(hint) = element.timestep_hint {
            if hint < self.timestep {
                info!(
                    "Reducing timestep from {:e} s to {:e} s for {} {}",
                    self.timestep,
                    hint,
                    element.kind(),
                    describe(&element)
                );
                self.timestep = hint;
            }
        }

        if self.state == RunState::Rendered {
            self.state = RunState::Idle;
            self.script = None;
        }

        self.ids.push(id_entry(&element));
        self.elements.push(element);
        &self.elements[self.elements.len() - 1]
    }

    /// Appends every element in order.
    pub fn extend<I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = Element>,
    {
        for element in elements {
            self.append(element);
        }
    }

    /// Whether an element of the same kind with the same id has been appended.
    pub fn contains(&self, element: &Element) -> bool {
        id_entry(element).is_some_and(|entry| self.ids.contains(&Some(entry)))
    }

    /// Position of the first element recorded with `element`'s kind and id.
    pub fn index_of(&self, element: &Element) -> Result<usize, Error> {
        let entry = id_entry(element);
        entry
            .as_ref()
            .and_then(|_| self.ids.iter().position(|e| *e == entry))
            .ok_or_else(|| Error::NotFound {
                id: element.id.clone(),
            })
    }

    /// Cancels a fix from this point of the run on.
    ///
    /// Nothing is deleted: an `unfix` command is appended, so the fix stays in
    /// force for everything before it.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the element has no id or was never appended, and
    /// [`Error::InvalidArgument`] for anything but fixes and fix-style variables.
    pub fn remove(&mut self, element: &Element) -> Result<(), Error> {
        let unfixable = match element.kind() {
            ElementKind::Species | ElementKind::Command => true,
            ElementKind::Fix => false,
            ElementKind::Variable => !element.output().is_some_and(|o| o.starts_with("f_")),
        };
        if unfixable {
            return Err(Error::invalid_argument(
                "remove",
                format!("a {} cannot be removed from a running simulation", element.kind()),
            ));
        }
        self.index_of(element)?;
        let Some(id) = element.id.as_ref() else {
            return Err(Error::NotFound { id: None });
        };
        let unfix = Element::command(["# Deleting a fix".to_string(), format!("unfix {id}")]);
        self.append(unfix);
        Ok(())
    }

    /// Stable sort by priority; elements without one keep their positions.
    pub fn sort(&mut self) {
        order::sort_by_priority(&mut self.elements);
        self.ids = self.elements.iter().map(id_entry).collect();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current timestep: the configured one, lowered by any element hints.
    #[inline]
    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    #[inline]
    pub fn identities(&self) -> &Identities {
        &self.identities
    }

    /// Ids of rigid species in the order they were first appended.
    #[inline]
    pub fn rigid_groups(&self) -> &[u32] {
        &self.rigid_groups
    }

    #[inline]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The last rendered script, if it is still current.
    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    pub fn attributes(&self) -> Option<&RunAttributes> {
        self.script.as_ref().map(|s| &s.attributes)
    }

    /// Where the script is written: `<output_dir>/<name>.lammps`.
    pub fn script_path(&self) -> PathBuf {
        self.config.output_dir.join(self.script_file())
    }

    fn script_file(&self) -> String {
        format!("{}.lammps", self.name)
    }

    /// Validates, sorts, and renders the elements, then writes the script and the
    /// run record.
    ///
    /// Nothing is written if validation fails, and the simulation stays editable.
    ///
    /// # Errors
    ///
    /// Besides validation and I/O errors, [`Error::AlreadyRun`] once the
    /// simulation has completed, leaving its archived record untouched.
    pub fn render(&mut self) -> Result<&Script, Error> {
        if self.state == RunState::Completed {
            warn!("Simulation '{}' has already been run, not rendering again", self.name);
            return Err(Error::AlreadyRun {
                name: self.name.clone(),
            });
        }
        self.state = RunState::Rendering;
        match self.render_inner() {
            Ok(script) => {
                self.state = RunState::Rendered;
                Ok(&*self.script.insert(script))
            }
            Err(e) => {
                self.state = RunState::Idle;
                Err(e)
            }
        }
    }

    fn render_inner(&mut self) -> Result<Script, Error> {
        validate::validate(&self.elements)?;
        self.sort();
        let script = render::render(&self.name, &self.elements, &self.config, self.timestep)?;

        fs::create_dir_all(&self.config.output_dir)?;
        let path = self.script_path();
        fs::write(&path, &script.text)?;
        debug!("Wrote {}", path.display());

        let script_file = self.script_file();
        let source = self.source.clone();
        let archive = self.archive();
        archive.record(&script.attributes)?;
        archive.snapshot(&script_file, &script.text)?;
        if let Some(source) = source {
            archive::snapshot_source(archive, &source)?;
        }

        Ok(script)
    }

    fn archive(&mut self) -> &mut (dyn Archive + Send + 'static) {
        let (output_dir, name) = (&self.config.output_dir, &self.name);
        self.archive
            .get_or_insert_with(|| {
                let archive: Box<dyn Archive + Send> = Box::new(DirArchive::new(output_dir, name));
                archive
            })
            .as_mut()
    }

    /// Runs the engine on the rendered script, rendering first if needed.
    ///
    /// Filtered engine output is passed to `on_line`. A simulation runs to
    /// completion at most once; later calls log a warning and return
    /// [`RunOutcome::AlreadyCompleted`].
    pub async fn execute<F>(&mut self, on_line: F) -> Result<RunOutcome, Error>
    where
        F: FnMut(&str),
    {
        self.execute_until(on_line, tokio::signal::ctrl_c()).await
    }

    /// Like [`execute`](Self::execute), stopping the engine when `cancel`
    /// resolves instead of on Ctrl-C.
    pub async fn execute_until<F, C>(
        &mut self,
        mut on_line: F,
        cancel: C,
    ) -> Result<RunOutcome, Error>
    where
        F: FnMut(&str),
        C: Future,
    {
        if self.state == RunState::Completed {
            warn!("Simulation '{}' has already been run", self.name);
            return Ok(RunOutcome::AlreadyCompleted);
        }
        if self.state != RunState::Rendered {
            self.render()?;
        }

        let output_files = self
            .attributes()
            .map(|a| a.output_files.clone())
            .unwrap_or_default();
        let working_dir = self.config.output_dir.clone();

        let process = match EngineProcess::spawn(
            &self.config.executable,
            Path::new(&self.script_file()),
            &working_dir,
        ) {
            Ok(process) => process,
            Err(e) => {
                self.state = RunState::Failed;
                return Err(e);
            }
        };
        self.state = RunState::Spawned;
        debug!("Engine started for '{}'", self.name);

        self.state = RunState::Streaming;
        match process.stream_until(&mut on_line, cancel).await {
            Ok(RunOutcome::Completed) => {
                self.state = RunState::Completed;
                let mut files = output_files;
                files.push(ENGINE_LOG.to_string());
                self.archive().collect(&working_dir, &files)?;
                Ok(RunOutcome::Completed)
            }
            Ok(outcome) => {
                self.state = RunState::Terminated;
                Ok(outcome)
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("elements", &self.elements.len())
            .field("species", &self.identities.species_count())
            .field("timestep", &self.timestep)
            .field("state", &self.state)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Extend<Element> for Simulation {
    fn extend<I: IntoIterator<Item = Element>>(&mut self, iter: I) {
        Simulation::extend(self, iter);
    }
}

fn id_entry(element: &Element) -> IdEntry {
    element.id.clone().map(|id| (element.kind(), id))
}

fn describe(element: &Element) -> String {
    match &element.id {
        Some(id) => id.to_string(),
        None => "(anonymous)".to_string(),
    }
}

fn slugify(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{commands, fixes, species};
    use crate::model::ions::Ions;

    fn config(dir: &Path) -> SimulationConfig {
        SimulationConfig {
            output_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    fn calcium() -> Element {
        species::place_ions(&Ions::new(1.0, 40.0), &[[0.0, 0.0, 1e-5]]).unwrap()
    }

    #[test]
    fn name_is_slugified() {
        assert_eq!(Simulation::new("Two Species Trap").name(), "two_species_trap");
    }

    #[test]
    fn debug_summarises_elements() {
        let mut sim = Simulation::new("debug");
        sim.append(calcium());
        let shown = format!("{sim:?}");
        assert!(shown.contains("name: \"debug\""));
        assert!(shown.contains("elements: 1"));
        assert!(shown.contains("species: 1"));
    }

    #[test]
    fn species_ids_follow_charge_mass_and_rigidity() {
        let mut sim = Simulation::new("ids");
        let a = sim.append(calcium()).id.clone();
        let b = sim
            .append(species::place_ions(&Ions::new(1.0, 40.0), &[[1e-5, 0.0, 0.0]]).unwrap())
            .id
            .clone();
        let c = sim
            .append(species::place_ions(&Ions::new(1.0, 40.0).rigid(), &[[0.0; 3]]).unwrap())
            .id
            .clone();
        assert_eq!(a, Some(ElementId::Int(1)));
        assert_eq!(a, b);
        assert_eq!(c, Some(ElementId::Int(2)));
        assert_eq!(sim.rigid_groups(), [2]);
        assert_eq!(sim.elements()[0].priority, Some(0));
    }

    #[test]
    fn explicit_species_id_is_kept() {
        let mut sim = Simulation::new("ids");
        let stored = sim.append(calcium().with_id(2));
        assert_eq!(stored.id, Some(ElementId::Int(2)));
    }

    #[test]
    fn timestep_only_decreases() {
        let mut sim = Simulation::new("dt");
        sim.append(Element::command(["# a"]).with_timestep_hint(1e-7));
        sim.append(Element::command(["# b"]).with_timestep_hint(1e-5));
        assert_eq!(sim.timestep(), 1e-7);
    }

    #[test]
    fn contains_and_index_of_use_kind_and_id() {
        let mut sim = Simulation::new("lookup");
        let field = fixes::efield(1.0, 0.0, 0.0).unwrap();
        let run = commands::evolve(10).unwrap();
        sim.append(calcium());
        sim.append(run.clone());
        sim.append(field.clone());

        assert!(sim.contains(&field));
        assert_eq!(sim.index_of(&field).unwrap(), 2);
        assert!(!sim.contains(&run));
        assert!(matches!(sim.index_of(&run), Err(Error::NotFound { id: None })));

        let other = fixes::efield(0.0, 1.0, 0.0).unwrap();
        assert!(!sim.contains(&other));
        assert!(matches!(sim.index_of(&other), Err(Error::NotFound { id: Some(_) })));
    }

    #[test]
    fn remove_appends_unfix() {
        let mut sim = Simulation::new("remove");
        let field = fixes::efield(1.0, 0.0, 0.0).unwrap();
        sim.append(field.clone());
        sim.remove(&field).unwrap();

        assert_eq!(sim.len(), 2);
        let id = field.id.as_ref().unwrap();
        assert_eq!(sim.elements()[1].code.last(), Some(&format!("unfix {id}")));
        assert!(sim.contains(&field));
    }

    #[test]
    fn remove_rejects_unknown_and_non_fix_elements() {
        let mut sim = Simulation::new("remove");
        let field = fixes::efield(1.0, 0.0, 0.0).unwrap();
        assert!(matches!(sim.remove(&field), Err(Error::NotFound { .. })));
        let ions = calcium();
        sim.append(ions.clone());
        assert!(sim.remove(&ions).is_err());
        assert_eq!(sim.len(), 1);
    }

    #[test]
    fn render_writes_script_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = Simulation::with_config("render me", config(dir.path()));
        sim.append(fixes::langevin_bath(1e-3, 1e-5).unwrap());
        sim.append(calcium());
        sim.append(commands::evolve(100).unwrap());

        let script = sim.render().unwrap();
        assert!(script.text.contains("run 100"));
        assert_eq!(sim.state(), RunState::Rendered);
        assert!(dir.path().join("render_me.lammps").is_file());
        assert!(dir.path().join("render_me.run/record.toml").is_file());
        assert!(dir.path().join("render_me.run/render_me.lammps").is_file());
    }

    #[test]
    fn failed_validation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = Simulation::with_config("empty", config(dir.path()));
        sim.append(commands::evolve(100).unwrap());

        assert!(matches!(sim.render(), Err(Error::NoSpecies)));
        assert_eq!(sim.state(), RunState::Idle);
        assert!(!dir.path().join("empty.lammps").exists());
    }

    #[test]
    fn append_after_render_invalidates_script() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = Simulation::with_config("stale", config(dir.path()));
        sim.append(calcium());
        sim.render().unwrap();
        sim.append(commands::evolve(1).unwrap());
        assert_eq!(sim.state(), RunState::Idle);
        assert!(sim.script().is_none());
    }

    #[tokio::test]
    async fn missing_engine_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = Simulation::with_config(
            "no engine",
            SimulationConfig {
                executable: "ion-forge-no-such-engine".into(),
                ..config(dir.path())
            },
        );
        sim.append(calcium());
        let err = sim.execute(|_| {}).await.unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
        assert_eq!(sim.state(), RunState::Failed);
        assert!(dir.path().join("no_engine.lammps").is_file());
    }
}
