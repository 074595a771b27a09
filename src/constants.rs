//! Physical constants in SI units (CODATA 2018).

/// Elementary charge in coulombs.
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Atomic mass unit in kilograms.
pub const ATOMIC_MASS_UNIT: f64 = 1.660_539_066_60e-27;
