#[cfg(test)]
mod tests_development {
    use crate::config::SearchConfig;
    use crate::search::development::{Development, Phase, Rejection};
    use crate::structure::cell::{Cell, Site, Species};
    use nalgebra::{Matrix3, Vector3};

    fn config() -> SearchConfig {
        SearchConfig {
            composition_space: vec!["C".to_string(), "Si".to_string()],
            ..SearchConfig::default()
        }
    }

    fn cubic(a: f64, sites: Vec<Site>) -> Cell {
        Cell::new(Matrix3::from_diagonal_element(a), sites).unwrap()
    }

    fn site(symbol: &str, x: f64, y: f64, z: f64) -> Site {
        Site::new(Species::new(symbol), Vector3::new(x, y, z))
    }

    fn rejected_bound(result: Result<Cell, Rejection>) -> &'static str {
        match result {
            Err(Rejection::Constraint { bound, .. }) => bound,
            other => panic!("expected a constraint rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_valid_cell_passes_reduced() {
        let development = Development::new(&config());
        let cell = cubic(5.0, vec![site("C", 0.1, 0.1, 0.1)]);
        let developed = development.develop(&cell, Phase::PreEvaluation).unwrap();
        assert_eq!(developed.num_sites(), 1);
        let (a, b, c) = developed.lattice_parameters();
        assert!((a - 5.0).abs() < 1e-6);
        assert!((b - 5.0).abs() < 1e-6);
        assert!((c - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_atom_count_bound() {
        let development = Development::new(&config());
        let cell = cubic(5.0, vec![]);
        assert_eq!(
            rejected_bound(development.develop(&cell, Phase::PreEvaluation)),
            "atom count"
        );
    }

    #[test]
    fn test_composition_bound() {
        let development = Development::new(&config());
        let cell = cubic(5.0, vec![site("Fe", 0.0, 0.0, 0.0)]);
        assert_eq!(
            rejected_bound(development.develop(&cell, Phase::PreEvaluation)),
            "composition space"
        );
    }

    #[test]
    fn test_lattice_length_bound() {
        let development = Development::new(&config());
        // Edge below the minimum lattice length of 1 Angstrom.
        let cell = cubic(0.5, vec![site("C", 0.0, 0.0, 0.0)]);
        assert_eq!(
            rejected_bound(development.develop(&cell, Phase::PreEvaluation)),
            "lattice length"
        );
    }

    #[test]
    fn test_interatomic_distance_bound() {
        let development = Development::new(&config());
        // 0.5 Angstrom separation, well under 0.6 times the summed radii.
        let cell = cubic(
            5.0,
            vec![site("C", 0.0, 0.0, 0.0), site("C", 0.1, 0.0, 0.0)],
        );
        assert_eq!(
            rejected_bound(development.develop(&cell, Phase::PreEvaluation)),
            "interatomic distance"
        );
    }

    #[test]
    fn test_coincident_sites_rejected() {
        let development = Development::new(&config());
        let cell = cubic(
            5.0,
            vec![site("C", 0.2, 0.2, 0.2), site("Si", 0.2, 0.2, 0.2)],
        );
        assert_eq!(
            rejected_bound(development.develop(&cell, Phase::PreEvaluation)),
            "interatomic distance"
        );
    }

    #[test]
    fn test_hard_distance_floor() {
        let mut config = config();
        config.constraints.min_interatomic_distance = Some(3.0);
        let development = Development::new(&config);
        // 2.5 Angstroms clears the radius-scaled bound but not the floor.
        let cell = cubic(
            5.0,
            vec![site("C", 0.0, 0.0, 0.0), site("C", 0.5, 0.0, 0.0)],
        );
        assert_eq!(
            rejected_bound(development.develop(&cell, Phase::PreEvaluation)),
            "interatomic distance"
        );
    }

    #[test]
    fn test_value_bound() {
        let mut bounded = config();
        bounded.constraints.max_value = Some(0.0);
        let development = Development::new(&bounded);
        assert!(development.check_value(-1.0).is_ok());
        assert!(development.check_value(1.0).is_err());

        let unbounded = Development::new(&config());
        assert!(unbounded.check_value(1e12).is_ok());
    }
}
