#[cfg(test)]
mod tests_generation {
    use crate::evaluate::NullOracle;
    use crate::search::generation::{Admission, Generation, RunArchive};
    use crate::search::organism::{Organism, OrganismId, Provenance};
    use crate::structure::cell::{Cell, Site, Species};
    use crate::structure::matcher::StructureMatcher;
    use nalgebra::{Matrix3, Vector3};

    fn cubic(a: f64) -> Cell {
        Cell::new(
            Matrix3::from_diagonal_element(a),
            vec![Site::new(Species::new("C"), Vector3::zeros())],
        )
        .unwrap()
    }

    fn organism(id: u64, cell: Cell, value: f64) -> Organism {
        let mut organism = Organism::new(OrganismId(id), cell, Provenance::Seeded);
        organism.value = Some(value);
        organism
    }

    fn matcher() -> StructureMatcher {
        StructureMatcher::new(0.15, 0.1, 2.0)
    }

    // ==================== Fitness normalization ====================

    #[test]
    fn test_fitness_bounds() {
        let mut generation = Generation::new(0);
        let m = matcher();
        for (id, edge, value) in [(0, 5.0, -3.0), (1, 6.0, -1.0), (2, 7.0, 1.0)] {
            generation.try_admit(organism(id, cubic(edge), value), &m, &NullOracle, None);
        }
        generation.find_fitnesses();

        let fitnesses: Vec<f64> = generation
            .organisms()
            .iter()
            .map(|o| o.fitness.unwrap())
            .collect();
        assert!((fitnesses[0] - 1.0).abs() < 1e-12);
        assert!((fitnesses[1] - 0.5).abs() < 1e-12);
        assert!(fitnesses[2].abs() < 1e-12);
        assert_eq!(generation.best().unwrap().id, OrganismId(0));
    }

    #[test]
    fn test_fitness_all_equal() {
        let mut generation = Generation::new(0);
        let m = matcher();
        generation.try_admit(organism(0, cubic(5.0), 2.0), &m, &NullOracle, None);
        generation.try_admit(organism(1, cubic(6.0), 2.0), &m, &NullOracle, None);
        generation.find_fitnesses();
        for o in generation.organisms() {
            assert!((o.fitness.unwrap() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fitness_infinite_values_get_zero() {
        let mut generation = Generation::new(0);
        let m = matcher();
        generation.try_admit(organism(0, cubic(5.0), 1.0), &m, &NullOracle, None);
        generation.try_admit(
            organism(1, cubic(6.0), f64::INFINITY),
            &m,
            &NullOracle,
            None,
        );
        generation.try_admit(organism(2, cubic(7.0), 3.0), &m, &NullOracle, None);
        generation.find_fitnesses();

        let by_id = |id: u64| {
            generation
                .organisms()
                .iter()
                .find(|o| o.id == OrganismId(id))
                .unwrap()
                .fitness
                .unwrap()
        };
        assert!((by_id(0) - 1.0).abs() < 1e-12);
        assert!(by_id(1).abs() < 1e-12);
        assert!(by_id(2).abs() < 1e-12);
    }

    // ==================== Duplicate policies ====================

    #[test]
    fn test_structural_duplicate_replaced_when_better() {
        let mut generation = Generation::new(0);
        let m = matcher();
        assert_eq!(
            generation.try_admit(organism(0, cubic(5.0), 1.0), &m, &NullOracle, None),
            Admission::Accepted
        );
        assert_eq!(
            generation.try_admit(organism(1, cubic(5.0), 0.5), &m, &NullOracle, None),
            Admission::ReplacedIncumbent(OrganismId(0))
        );
        assert_eq!(generation.len(), 1);
        assert_eq!(generation.organisms()[0].id, OrganismId(1));
    }

    #[test]
    fn test_structural_duplicate_rejected_when_not_better() {
        let mut generation = Generation::new(0);
        let m = matcher();
        generation.try_admit(organism(0, cubic(5.0), 1.0), &m, &NullOracle, None);
        assert_eq!(
            generation.try_admit(organism(1, cubic(5.0), 1.0), &m, &NullOracle, None),
            Admission::RejectedAsDuplicate(OrganismId(0))
        );
        assert_eq!(generation.len(), 1);
        assert_eq!(generation.organisms()[0].id, OrganismId(0));
    }

    #[test]
    fn test_near_value_window() {
        let mut generation = Generation::new(0);
        let m = matcher();
        let window = Some(0.1);
        generation.try_admit(organism(0, cubic(5.0), 1.0), &m, &NullOracle, window);

        // Structurally distinct but within the value window and worse.
        assert_eq!(
            generation.try_admit(organism(1, cubic(6.0), 1.05), &m, &NullOracle, window),
            Admission::RejectedNearValue(OrganismId(0))
        );
        // Within the window and better: evicts.
        assert_eq!(
            generation.try_admit(organism(2, cubic(6.0), 0.95), &m, &NullOracle, window),
            Admission::ReplacedIncumbent(OrganismId(0))
        );
        // Outside the window: admitted alongside.
        assert_eq!(
            generation.try_admit(organism(3, cubic(7.0), 2.0), &m, &NullOracle, window),
            Admission::Accepted
        );
        assert_eq!(generation.len(), 2);
    }

    // ==================== Whole-run archive ====================

    #[test]
    fn test_archive_is_monotonic() {
        let mut archive = RunArchive::new(matcher());
        assert!(archive.is_empty());
        assert!(!archive.contains(&cubic(5.0), &NullOracle));

        archive.insert(cubic(5.0));
        assert_eq!(archive.len(), 1);
        assert!(archive.contains(&cubic(5.0), &NullOracle));
        assert!(!archive.contains(&cubic(6.0), &NullOracle));
    }
}
