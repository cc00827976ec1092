#[cfg(test)]
mod tests_matcher {
    use crate::evaluate::NullOracle;
    use crate::structure::cell::{Cell, Site, Species};
    use crate::structure::matcher::StructureMatcher;
    use nalgebra::{Matrix3, Vector3};

    fn matcher() -> StructureMatcher {
        StructureMatcher::new(0.15, 0.1, 2.0)
    }

    fn cubic(a: f64, sites: Vec<Site>) -> Cell {
        Cell::new(Matrix3::from_diagonal_element(a), sites).unwrap()
    }

    fn site(symbol: &str, x: f64, y: f64, z: f64) -> Site {
        Site::new(Species::new(symbol), Vector3::new(x, y, z))
    }

    #[test]
    fn test_reflexive() {
        let cell = cubic(
            5.0,
            vec![site("C", 0.0, 0.0, 0.0), site("Si", 0.5, 0.5, 0.5)],
        );
        assert!(matcher().matches(&cell, &cell, &NullOracle));
    }

    #[test]
    fn test_sheared_basis_matches() {
        // A unimodular basis change describes the same lattice; reduction
        // inside the matcher makes the two cells comparable.
        let cell = cubic(5.0, vec![site("C", 0.1, 0.2, 0.3)]);
        let shear = Matrix3::new(1, 1, 0, 0, 1, 0, 0, 0, 1);
        let sheared = cell.supercell(&shear).unwrap();
        assert!(matcher().matches(&cell, &sheared, &NullOracle));
        assert!(matcher().matches(&sheared, &cell, &NullOracle));
    }

    #[test]
    fn test_axis_relabeling_matches() {
        let a = Cell::from_parameters(
            4.0,
            5.0,
            6.0,
            90.0f64.to_radians(),
            90.0f64.to_radians(),
            90.0f64.to_radians(),
            vec![site("C", 0.0, 0.0, 0.0)],
        )
        .unwrap();
        let b = Cell::from_parameters(
            6.0,
            5.0,
            4.0,
            90.0f64.to_radians(),
            90.0f64.to_radians(),
            90.0f64.to_radians(),
            vec![site("C", 0.0, 0.0, 0.0)],
        )
        .unwrap();
        assert!(matcher().matches(&a, &b, &NullOracle));
    }

    #[test]
    fn test_origin_shift_matches() {
        let a = cubic(
            5.0,
            vec![site("C", 0.0, 0.0, 0.0), site("Si", 0.5, 0.5, 0.5)],
        );
        let b = cubic(
            5.0,
            vec![site("C", 0.3, 0.1, 0.7), site("Si", 0.8, 0.6, 0.2)],
        );
        assert!(matcher().matches(&a, &b, &NullOracle));
    }

    #[test]
    fn test_site_count_mismatch() {
        let a = cubic(5.0, vec![site("C", 0.0, 0.0, 0.0)]);
        let b = cubic(
            5.0,
            vec![site("C", 0.0, 0.0, 0.0), site("C", 0.5, 0.5, 0.5)],
        );
        assert!(!matcher().matches(&a, &b, &NullOracle));
    }

    #[test]
    fn test_composition_mismatch() {
        let a = cubic(5.0, vec![site("C", 0.0, 0.0, 0.0)]);
        let b = cubic(5.0, vec![site("Si", 0.0, 0.0, 0.0)]);
        assert!(!matcher().matches(&a, &b, &NullOracle));
    }

    #[test]
    fn test_length_mismatch() {
        let a = cubic(5.0, vec![site("C", 0.0, 0.0, 0.0)]);
        let b = cubic(5.5, vec![site("C", 0.0, 0.0, 0.0)]);
        assert!(!matcher().matches(&a, &b, &NullOracle));
    }

    #[test]
    fn test_displaced_site_mismatch() {
        // Same lattice, second site displaced well past the atomic misfit.
        let a = cubic(
            5.0,
            vec![site("C", 0.0, 0.0, 0.0), site("C", 0.5, 0.5, 0.5)],
        );
        let b = cubic(
            5.0,
            vec![site("C", 0.0, 0.0, 0.0), site("C", 0.5, 0.5, 0.25)],
        );
        assert!(!matcher().matches(&a, &b, &NullOracle));
    }
}
