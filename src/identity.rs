//! Identifier assignment for simulation elements.
//!
//! Fixes, commands, and variables get a content hash of the factory name and its
//! positional arguments, so that two invocations with different parameters get
//! different engine symbols while a repeated invocation reproduces the same one
//! (and is then reported as a duplicate when the simulation is rendered).
//!
//! Species get dense atom-type numbers starting at 1. The number depends only on
//! the `(charge, mass, rigid)` triple; positions never take part.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use toml::Value;

use crate::model::ions::Ions;

/// Key under which a species is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeciesKey {
    charge_bits: u64,
    mass_bits: u64,
    rigid: bool,
}

impl SpeciesKey {
    pub fn new(charge: f64, mass: f64, rigid: bool) -> Self {
        Self {
            charge_bits: canonical_bits(charge),
            mass_bits: canonical_bits(mass),
            rigid,
        }
    }
}

impl From<&Ions> for SpeciesKey {
    fn from(ions: &Ions) -> Self {
        Self::new(ions.charge, ions.mass, ions.rigid)
    }
}

fn canonical_bits(x: f64) -> u64 {
    // -0.0 and 0.0 describe the same species
    if x == 0.0 { 0 } else { x.to_bits() }
}

/// Identity-assignment service owned by a [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, Default)]
pub struct Identities {
    species: HashMap<SpeciesKey, u32>,
}

impl Identities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the atom type for `key`, minting the next one the first time it is seen.
    pub fn species_id(&mut self, key: SpeciesKey) -> u32 {
        let next = self.species.len() as u32 + 1;
        *self.species.entry(key).or_insert(next)
    }

    /// Number of distinct species seen so far.
    #[inline]
    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Stable identifier for one factory invocation.
    pub fn invocation_id(factory: &str, args: &[Value]) -> u32 {
        let mut hasher = Sha256::new();
        hasher.update(factory.as_bytes());
        for arg in args {
            hasher.update([0x1f]);
            hasher.update(arg.to_string().as_bytes());
        }
        let digest = hasher.finalize();
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_triple_reuses_species_id() {
        let mut ids = Identities::new();
        let calcium = SpeciesKey::new(1.0, 40.0, false);
        assert_eq!(ids.species_id(calcium), 1);
        assert_eq!(ids.species_id(calcium), 1);
        assert_eq!(ids.species_id(SpeciesKey::new(1.0, 40.0, true)), 2);
        assert_eq!(ids.species_id(SpeciesKey::new(2.0, 40.0, false)), 3);
        assert_eq!(ids.species_id(calcium), 1);
        assert_eq!(ids.species_count(), 3);
    }

    #[test]
    fn signed_zero_is_one_species() {
        let mut ids = Identities::new();
        assert_eq!(ids.species_id(SpeciesKey::new(0.0, 40.0, false)), 1);
        assert_eq!(ids.species_id(SpeciesKey::new(-0.0, 40.0, false)), 1);
    }

    #[test]
    fn separate_services_do_not_share_counters() {
        let mut first = Identities::new();
        let mut second = Identities::new();
        first.species_id(SpeciesKey::new(1.0, 40.0, false));
        first.species_id(SpeciesKey::new(1.0, 138.0, false));
        assert_eq!(second.species_id(SpeciesKey::new(1.0, 138.0, false)), 1);
    }

    #[test]
    fn invocation_id_is_deterministic() {
        let args = [Value::Float(1.0), Value::Float(1.0), Value::Float(1.0)];
        assert_eq!(
            Identities::invocation_id("efield", &args),
            Identities::invocation_id("efield", &args)
        );
    }

    #[test]
    fn invocation_id_tracks_arguments_and_factory() {
        let base = [Value::Float(1.0), Value::Float(1.0), Value::Float(1.0)];
        let nudged = [Value::Float(1.0), Value::Float(1.0), Value::Float(1.1)];
        let id = Identities::invocation_id("efield", &base);
        assert_ne!(id, Identities::invocation_id("efield", &nudged));
        assert_ne!(id, Identities::invocation_id("langevin_bath", &base));
    }

    #[test]
    fn argument_boundaries_matter() {
        let split = [Value::String("ab".into()), Value::String("c".into())];
        let joined = [Value::String("a".into()), Value::String("bc".into())];
        assert_ne!(
            Identities::invocation_id("dump", &split),
            Identities::invocation_id("dump", &joined)
        );
    }
}
