//! Linear Paul trap field generator.
//!
//! The trap has a quadrupole RF electrode pair of inner radius `r0`, driven by one
//! or more sinusoidal voltages, and end caps a distance `z0` from the centre held at
//! a static voltage scaled by the geometric factor `kappa`:
//!
//! ```text
//! Φ(x, y, z, t) = Σᵢ Vᵢ cos(Ωᵢ t) (x² − y²) / (2 r0²) + κ U (z² − (x² + y²) / 2) / z0²
//! ```
//!
//! In [`TrapMode::Oscillating`] the time-dependent field `E = −∇Φ` is applied
//! directly. In [`TrapMode::PseudoPotential`] the RF part is replaced by its
//! time-averaged harmonic approximation, giving a static restoring force with spring
//! constants `kᵢ = m ωᵢ²` for the trapped species.

use std::f64::consts::PI;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use toml::Value;

use super::{ElementFactory, Fragment, arg, builtin};
use crate::error::Error;
use crate::model::element::{Element, ElementKind};
use crate::model::ions::Ions;

static LINEAR_PAUL_TRAP: LazyLock<ElementFactory> = LazyLock::new(|| {
    builtin(
        ElementKind::Fix,
        "linear_paul_trap",
        &["uid", "trap", "pseudo", "ions", "scope"],
    )
});

/// Timesteps per period of the fastest motion the trap imposes.
pub const STEPS_PER_PERIOD: f64 = 20.0;

/// One sinusoidal RF drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RfDrive {
    /// Amplitude in volts.
    pub voltage: f64,
    /// Frequency in hertz.
    pub frequency: f64,
}

/// Geometry and voltages of a linear Paul trap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPaulTrap {
    /// Distance from the trap axis to the RF electrodes, in metres.
    pub radius: f64,
    /// Distance from the trap centre to an end cap, in metres.
    pub length: f64,
    /// Geometric efficiency of the end caps.
    pub kappa: f64,
    /// Static end-cap voltage in volts.
    pub endcap_voltage: f64,
    /// RF drives; at least one is required.
    pub drives: Vec<RfDrive>,
}

/// Which form of the trapping field to emit.
#[derive(Debug, Clone, Copy)]
pub enum TrapMode<'a> {
    /// Full time-dependent field.
    Oscillating,
    /// Static harmonic approximation for the given species.
    PseudoPotential(&'a Ions),
}

impl<'a> TrapMode<'a> {
    /// Selects the mode from a `pseudo` flag.
    ///
    /// # Errors
    ///
    /// The pseudo-potential depends on charge and mass, so `ions` is required when
    /// `pseudo` is set.
    pub fn from_flag(pseudo: bool, ions: Option<&'a Ions>) -> Result<Self, Error> {
        match (pseudo, ions) {
            (false, _) => Ok(TrapMode::Oscillating),
            (true, Some(ions)) => Ok(TrapMode::PseudoPotential(ions)),
            (true, None) => Err(Error::invalid_argument(
                "linear_paul_trap",
                "the pseudo-potential approximation needs the trapped ion species",
            )),
        }
    }
}

/// Group of atoms the trap force acts on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrapScope {
    #[default]
    All,
    /// A group defined elsewhere in the script.
    Group(String),
}

impl TrapScope {
    pub fn group_id(&self) -> &str {
        match self {
            TrapScope::All => "all",
            TrapScope::Group(name) => name,
        }
    }
}

impl LinearPaulTrap {
    /// Field gradient of the end caps, `κU / z0²`, in V/m².
    #[inline]
    pub fn static_gradient(&self) -> f64 {
        self.kappa * self.endcap_voltage / (self.length * self.length)
    }

    /// Mathieu `(a, q)` parameters along x for one drive.
    pub fn mathieu_parameters(&self, ions: &Ions, drive: &RfDrive) -> (f64, f64) {
        let omega = 2.0 * PI * drive.frequency;
        let charge = ions.charge_si();
        let mass = ions.mass_si();
        let a = -4.0 * charge * self.static_gradient() / (mass * omega * omega);
        let q = 2.0 * charge * drive.voltage / (mass * self.radius * self.radius * omega * omega);
        (a, q)
    }

    /// Squared secular angular frequencies `[ωx², ωy², ωz²]` in the pseudo-potential limit.
    pub fn secular_omega_squared(&self, ions: &Ions) -> [f64; 3] {
        let charge = ions.charge_si();
        let mass = ions.mass_si();
        let r0_4 = self.radius.powi(4);

        let rf: f64 = self
            .drives
            .iter()
            .map(|d| {
                let omega = 2.0 * PI * d.frequency;
                charge * charge * d.voltage * d.voltage / (2.0 * mass * mass * r0_4 * omega * omega)
            })
            .sum();
        let axial = charge * self.static_gradient() / mass;

        [rf - axial, rf - axial, 2.0 * axial]
    }

    /// Secular frequencies in hertz.
    ///
    /// # Errors
    ///
    /// [`Error::Unconfined`] if the trap does not confine `ions` along some axis.
    pub fn secular_frequencies(&self, ions: &Ions) -> Result<[f64; 3], Error> {
        let omega_squared = self.secular_omega_squared(ions);
        let mut out = [0.0; 3];
        for ((slot, w2), axis) in out.iter_mut().zip(omega_squared).zip(['x', 'y', 'z']) {
            if w2.is_nan() || w2 <= 0.0 {
                return Err(Error::Unconfined {
                    axis,
                    omega_squared: w2,
                });
            }
            *slot = w2.sqrt() / (2.0 * PI);
        }
        Ok(out)
    }

    fn validate(&self) -> Result<(), Error> {
        let positive = |value: f64, what: &str| {
            if value > 0.0 {
                Ok(())
            } else {
                Err(Error::invalid_argument(
                    "linear_paul_trap",
                    format!("{what} must be positive, got {value}"),
                ))
            }
        };
        positive(self.radius, "radius")?;
        positive(self.length, "length")?;
        if self.drives.is_empty() {
            return Err(Error::invalid_argument(
                "linear_paul_trap",
                "at least one RF drive is required",
            ));
        }
        for drive in &self.drives {
            positive(drive.frequency, "drive frequency")?;
        }
        Ok(())
    }

    fn max_drive_frequency(&self) -> f64 {
        self.drives.iter().map(|d| d.frequency).fold(0.0, f64::max)
    }
}

/// Linear Paul trap fix.
///
/// The oscillating form hints a timestep resolving the fastest drive; the
/// pseudo-potential form hints one resolving the fastest secular motion.
pub fn linear_paul_trap(
    trap: &LinearPaulTrap,
    mode: TrapMode<'_>,
    scope: &TrapScope,
) -> Result<Element, Error> {
    trap.validate()?;

    let (pseudo, ions) = match mode {
        TrapMode::Oscillating => (false, Value::Boolean(false)),
        TrapMode::PseudoPotential(ions) => (true, arg("linear_paul_trap", &ions_key(ions))?),
    };
    let args = [
        arg("linear_paul_trap", trap)?,
        Value::Boolean(pseudo),
        ions,
        Value::String(scope.group_id().to_string()),
    ];

    match mode {
        TrapMode::Oscillating => {
            let timestep = 1.0 / (STEPS_PER_PERIOD * trap.max_drive_frequency());
            LINEAR_PAUL_TRAP.invoke(&args, |uid| {
                Fragment::new(oscillating_code(uid, trap, scope))
                    .timestep(timestep)
                    .into()
            })
        }
        TrapMode::PseudoPotential(ions) => {
            let frequencies = trap.secular_frequencies(ions)?;
            let fastest = frequencies.iter().copied().fold(0.0, f64::max);
            let timestep = 1.0 / (STEPS_PER_PERIOD * fastest);
            let mass = ions.mass_si();
            let k = frequencies.map(|f| {
                let omega = 2.0 * PI * f;
                mass * omega * omega
            });
            LINEAR_PAUL_TRAP.invoke(&args, |uid| {
                Fragment::new(pseudo_code(uid, k, scope))
                    .timestep(timestep)
                    .into()
            })
        }
    }
}

fn ions_key(ions: &Ions) -> [f64; 2] {
    [ions.charge, ions.mass]
}

fn oscillating_code(uid: u32, trap: &LinearPaulTrap, scope: &TrapScope) -> Vec<String> {
    let r0_2 = trap.radius * trap.radius;
    let mut lines = vec![
        format!("# Linear Paul trap (fix {uid})"),
        format!("variable statConst{uid} equal {:e}", trap.static_gradient()),
    ];

    let mut rf_terms = Vec::with_capacity(trap.drives.len());
    for (i, drive) in trap.drives.iter().enumerate() {
        let n = i + 1;
        lines.push(format!(
            "variable phase{uid}_{n} equal \"2.0*PI*{:e}*step*dt\"",
            drive.frequency
        ));
        lines.push(format!(
            "variable oscConst{uid}_{n} equal {:e}",
            drive.voltage / r0_2
        ));
        rf_terms.push(format!("v_oscConst{uid}_{n}*cos(v_phase{uid}_{n})"));
    }

    lines.push(format!("variable rf{uid} equal \"{}\"", rf_terms.join("+")));
    lines.push(format!(
        "variable oscEX{uid} atom \"(-v_rf{uid}+v_statConst{uid})*x\""
    ));
    lines.push(format!(
        "variable oscEY{uid} atom \"(v_rf{uid}+v_statConst{uid})*y\""
    ));
    lines.push(format!(
        "variable statEZ{uid} atom \"-2.0*v_statConst{uid}*z\""
    ));
    lines.push(format!(
        "fix {uid} {} efield v_oscEX{uid} v_oscEY{uid} v_statEZ{uid}",
        scope.group_id()
    ));
    lines
}

fn pseudo_code(uid: u32, k: [f64; 3], scope: &TrapScope) -> Vec<String> {
    vec![
        format!("# Pseudo-potential approximation of a linear Paul trap (fix {uid})"),
        format!("variable k_x{uid} equal {:e}", k[0]),
        format!("variable k_y{uid} equal {:e}", k[1]),
        format!("variable k_z{uid} equal {:e}", k[2]),
        format!("variable fX{uid} atom \"-v_k_x{uid}*x\""),
        format!("variable fY{uid} atom \"-v_k_y{uid}*y\""),
        format!("variable fZ{uid} atom \"-v_k_z{uid}*z\""),
        format!(
            "variable E{uid} atom \"v_k_x{uid}*x*x/2+v_k_y{uid}*y*y/2+v_k_z{uid}*z*z/2\""
        ),
        format!(
            "fix {uid} {} addforce v_fX{uid} v_fY{uid} v_fZ{uid} energy v_E{uid}",
            scope.group_id()
        ),
        format!("fix_modify {uid} energy yes"),
    ]
}
