use std::sync::LazyLock;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use toml::Value;

use super::{ElementFactory, Fragment, builtin};
use crate::error::Error;
use crate::model::element::{Element, ElementKind};
use crate::model::ions::Ions;

static PLACE_IONS: LazyLock<ElementFactory> =
    LazyLock::new(|| builtin(ElementKind::Species, "place_ions", &["ions", "positions"]));

static ION_CLOUD: LazyLock<ElementFactory> = LazyLock::new(|| {
    builtin(
        ElementKind::Species,
        "ion_cloud",
        &["ions", "radius", "number", "seed"],
    )
});

/// Places ions at explicit `positions` in metres.
pub fn place_ions(ions: &Ions, positions: &[[f64; 3]]) -> Result<Element, Error> {
    check_ions("place_ions", ions)?;
    if positions.is_empty() {
        return Err(Error::invalid_argument("place_ions", "no positions given"));
    }

    let args = [Value::Table(ions_table(ions)), positions_value(positions)];
    PLACE_IONS.invoke(&args, |_| {
        species_fragment(
            ions,
            positions,
            format!(
                "# Placing {} ions (charge {}, mass {})",
                positions.len(),
                ions.charge,
                ions.mass
            ),
        )
    })
}

/// Places `number` ions uniformly at random inside a sphere of `radius` metres.
///
/// The same `seed` always reproduces the same cloud.
pub fn ion_cloud(ions: &Ions, radius: f64, number: usize, seed: u64) -> Result<Element, Error> {
    check_ions("ion_cloud", ions)?;
    if radius <= 0.0 {
        return Err(Error::invalid_argument(
            "ion_cloud",
            format!("radius must be positive, got {radius}"),
        ));
    }
    if number == 0 {
        return Err(Error::invalid_argument("ion_cloud", "number of ions must be at least 1"));
    }

    let mut rng = ChaChaRng::seed_from_u64(seed);
    let positions: Vec<[f64; 3]> = (0..number).map(|_| sample_ball(&mut rng, radius)).collect();

    let args = [
        Value::Table(ions_table(ions)),
        Value::Float(radius),
        Value::Integer(number as i64),
        Value::String(seed.to_string()),
    ];
    ION_CLOUD.invoke(&args, |_| {
        species_fragment(
            ions,
            &positions,
            format!("# Ion cloud of {number} ions within {radius:e} m"),
        )
    })
}

fn sample_ball(rng: &mut ChaChaRng, radius: f64) -> [f64; 3] {
    loop {
        let p: [f64; 3] = [
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        ];
        if p.iter().map(|c| c * c).sum::<f64>() <= 1.0 {
            return p.map(|c| c * radius);
        }
    }
}

fn check_ions(factory: &'static str, ions: &Ions) -> Result<(), Error> {
    if ions.mass.is_nan() || ions.mass <= 0.0 {
        return Err(Error::invalid_argument(
            factory,
            format!("ion mass must be positive, got {}", ions.mass),
        ));
    }
    Ok(())
}

fn ions_table(ions: &Ions) -> toml::Table {
    let mut table = toml::Table::new();
    table.insert("charge".into(), Value::Float(ions.charge));
    table.insert("mass".into(), Value::Float(ions.mass));
    table.insert("rigid".into(), Value::Boolean(ions.rigid));
    table
}

fn positions_value(positions: &[[f64; 3]]) -> Value {
    Value::Array(
        positions
            .iter()
            .map(|p| Value::Array(p.iter().copied().map(Value::Float).collect()))
            .collect(),
    )
}

fn species_fragment(ions: &Ions, positions: &[[f64; 3]], header: String) -> Value {
    Fragment::new([header])
        .set("charge", ions.charge)
        .set("mass", ions.mass)
        .set("rigid", ions.rigid)
        .set("positions", positions_value(positions))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placed_ions_keep_their_positions() {
        let positions = [[1e-4, -0.5e-5, 0.0], [1e-4, 0.0, 0.0], [1e-4, 0.5e-5, 0.0]];
        let element = place_ions(&Ions::new(1.0, 40.0).rigid(), &positions).unwrap();
        assert!(element.is_species());
        assert!(element.rigid);
        assert!(element.id.is_none());
        let data = element.species_data().unwrap();
        assert_eq!(data.positions, positions.to_vec());
        assert_eq!(data.charge, 1.0);
    }

    #[test]
    fn cloud_stays_inside_radius() {
        let element = ion_cloud(&Ions::new(-1.0, 40.0), 1e-3, 50, 7).unwrap();
        let data = element.species_data().unwrap();
        assert_eq!(data.positions.len(), 50);
        for p in &data.positions {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!(r <= 1e-3 * (1.0 + 1e-12));
        }
    }

    #[test]
    fn cloud_is_reproducible_for_a_seed() {
        let ions = Ions::new(1.0, 40.0);
        let a = ion_cloud(&ions, 1e-3, 10, 42).unwrap();
        let b = ion_cloud(&ions, 1e-3, 10, 42).unwrap();
        let c = ion_cloud(&ions, 1e-3, 10, 43).unwrap();
        assert_eq!(a.species_data(), b.species_data());
        assert_ne!(a.species_data(), c.species_data());
    }

    #[test]
    fn invalid_species_arguments() {
        let ions = Ions::new(1.0, 40.0);
        assert!(place_ions(&ions, &[]).is_err());
        assert!(ion_cloud(&ions, 0.0, 10, 1).is_err());
        assert!(ion_cloud(&ions, 1e-3, 0, 1).is_err());
        assert!(ion_cloud(&Ions::new(1.0, 0.0), 1e-3, 1, 1).is_err());
    }
}
