use crate::model::element::Element;

/// Stable priority sort over the elements that declare a priority.
///
/// Elements with a priority are sorted among themselves, species first, and
/// written back into the slots they occupied; elements without one stay where
/// they are.
pub fn sort_by_priority(elements: &mut [Element]) {
    let slots: Vec<usize> = elements
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.priority.map(|_| i))
        .collect();
    if slots.len() < 2 {
        return;
    }

    let mut ranked: Vec<Element> = slots.iter().map(|&i| elements[i].clone()).collect();
    ranked.sort_by_key(|e| (!e.is_species(), e.priority));

    for (slot, element) in slots.into_iter().zip(ranked) {
        elements[slot] = element;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(label: &str, priority: Option<i32>) -> Element {
        let element = Element::command([label]);
        match priority {
            Some(p) => element.with_priority(p),
            None => element,
        }
    }

    fn labels(elements: &[Element]) -> Vec<&str> {
        elements.iter().map(|e| e.code[0].as_str()).collect()
    }

    #[test]
    fn unprioritised_elements_keep_their_slots() {
        let mut elements = vec![
            labelled("a", Some(5)),
            labelled("b", None),
            labelled("c", Some(1)),
            labelled("d", None),
            labelled("e", Some(3)),
        ];
        sort_by_priority(&mut elements);
        assert_eq!(labels(&elements), ["c", "b", "e", "d", "a"]);
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let mut elements = vec![
            labelled("a", Some(2)),
            labelled("b", Some(0)),
            labelled("c", Some(2)),
            labelled("d", Some(0)),
        ];
        sort_by_priority(&mut elements);
        assert_eq!(labels(&elements), ["b", "d", "a", "c"]);
    }

    #[test]
    fn species_sort_before_negative_priorities() {
        use crate::model::element::SpeciesData;

        let ions = Element::species(SpeciesData {
            charge: 1.0,
            mass: 40.0,
            positions: vec![[0.0; 3]],
        })
        .with_code(["ions"])
        .with_priority(0);
        let mut elements = vec![labelled("early", Some(-5)), ions];
        sort_by_priority(&mut elements);
        assert_eq!(labels(&elements), ["ions", "early"]);
    }

    #[test]
    fn no_priorities_is_a_no_op() {
        let mut elements = vec![labelled("a", None), labelled("b", None)];
        sort_by_priority(&mut elements);
        assert_eq!(labels(&elements), ["a", "b"]);
    }
}
