use std::collections::HashSet;

use crate::error::Error;
use crate::model::element::{Element, ElementId, ElementKind};

/// Checks the cross-element invariants of a frozen element list.
///
/// Duplicate identifiers within a kind are reported first, then species-id
/// density, then an empty species list.
pub fn validate(elements: &[Element]) -> Result<(), Error> {
    check_unique_ids(elements)?;
    check_species(elements)
}

fn check_unique_ids(elements: &[Element]) -> Result<(), Error> {
    let mut seen: HashSet<(ElementKind, &ElementId)> = HashSet::new();
    for element in elements {
        let Some(id) = element.id.as_ref() else {
            continue;
        };
        if !seen.insert((element.kind(), id)) {
            return Err(Error::DuplicateId {
                kind: element.kind(),
                id: id.clone(),
            });
        }
    }
    Ok(())
}

fn check_species(elements: &[Element]) -> Result<(), Error> {
    let mut count = 0usize;
    let mut max_id = 0u32;
    for element in elements.iter().filter(|e| e.is_species()) {
        count += 1;
        let id = element
            .id
            .as_ref()
            .ok_or_else(|| Error::missing_field("simulation", ElementKind::Species, "id"))?;
        let n = id
            .as_int()
            .ok_or_else(|| Error::NonIntegerSpeciesId(id.clone()))?;
        max_id = max_id.max(n);
    }

    if count == 0 {
        return Err(Error::NoSpecies);
    }
    if max_id as usize > count {
        return Err(Error::InconsistentSpecies { max_id, count });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::element::SpeciesData;

    fn species(id: u32) -> Element {
        Element::species(SpeciesData {
            charge: 1.0,
            mass: 40.0,
            positions: vec![[0.0; 3]],
        })
        .with_id(id)
    }

    #[test]
    fn duplicate_fix_ids_are_rejected() {
        let elements = vec![
            species(1),
            Element::fix(7, ["fix 7 all nve"]),
            Element::fix(7, ["fix 7 all nve"]),
        ];
        let err = validate(&elements).unwrap_err();
        assert!(matches!(err, Error::DuplicateId { kind: ElementKind::Fix, .. }));
        assert!(err.to_string().contains("identical 'uids'"));
    }

    #[test]
    fn same_id_in_different_kinds_is_allowed() {
        let elements = vec![species(1), Element::fix(1, ["fix 1 all nve"])];
        assert!(validate(&elements).is_ok());
    }

    #[test]
    fn sparse_species_ids_are_inconsistent() {
        let err = validate(&[species(2)]).unwrap_err();
        assert!(matches!(err, Error::InconsistentSpecies { max_id: 2, count: 1 }));
        assert!(validate(&[species(2), species(1)]).is_ok());
    }

    #[test]
    fn named_species_id_is_rejected() {
        let named = species(1).with_id("calcium");
        assert!(matches!(
            validate(&[named]),
            Err(Error::NonIntegerSpeciesId(_))
        ));
    }

    #[test]
    fn species_without_id_is_rejected() {
        let mut anonymous = species(1);
        anonymous.id = None;
        assert!(matches!(
            validate(&[anonymous]),
            Err(Error::MissingField { field: "id", .. })
        ));
    }

    #[test]
    fn empty_simulation_has_no_species() {
        assert!(matches!(
            validate(&[Element::command(["run 10"])]),
            Err(Error::NoSpecies)
        ));
    }
}
