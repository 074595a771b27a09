use serde::Deserialize;

/// Physical description of an ion species, independent of its positions.
///
/// Two species with the same charge, mass, and rigidity are the same species as
/// far as identity assignment is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Ions {
    /// Charge in units of the elementary charge.
    pub charge: f64,
    /// Mass in atomic mass units.
    pub mass: f64,
    /// Whether the ions move together as one rigid body.
    #[serde(default)]
    pub rigid: bool,
}

impl Ions {
    pub fn new(charge: f64, mass: f64) -> Self {
        Self {
            charge,
            mass,
            rigid: false,
        }
    }

    pub fn rigid(mut self) -> Self {
        self.rigid = true;
        self
    }

    #[inline]
    pub fn charge_si(&self) -> f64 {
        self.charge * crate::constants::ELEMENTARY_CHARGE
    }

    #[inline]
    pub fn mass_si(&self) -> f64 {
        self.mass * crate::constants::ATOMIC_MASS_UNIT
    }
}
