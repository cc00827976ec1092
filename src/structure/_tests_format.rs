#[cfg(test)]
mod tests_format {
    use crate::structure::cell::{Cell, Site, Species};
    use crate::structure::format::{parse_cell, write_cell};
    use nalgebra::Vector3;

    const TOL: f64 = 1e-6;

    #[test]
    fn test_roundtrip() {
        let cell = Cell::from_parameters(
            4.1,
            5.2,
            6.3,
            75.0f64.to_radians(),
            85.0f64.to_radians(),
            95.0f64.to_radians(),
            vec![
                Site::new(Species::new("C"), Vector3::new(0.1, 0.2, 0.3)),
                Site::new(Species::new("Si"), Vector3::new(0.6, 0.7, 0.8)),
            ],
        )
        .unwrap();

        let parsed = parse_cell(&write_cell(&cell)).unwrap();

        let (a, b, c) = parsed.lattice_parameters();
        assert!((a - 4.1).abs() < TOL);
        assert!((b - 5.2).abs() < TOL);
        assert!((c - 6.3).abs() < TOL);
        let (al, be, ga) = parsed.lattice_angles();
        assert!((al.to_degrees() - 75.0).abs() < TOL);
        assert!((be.to_degrees() - 85.0).abs() < TOL);
        assert!((ga.to_degrees() - 95.0).abs() < TOL);

        assert_eq!(parsed.num_sites(), 2);
        assert_eq!(parsed.sites()[0].species, Species::new("C"));
        assert_eq!(parsed.sites()[1].species, Species::new("Si"));
        assert!((parsed.sites()[1].frac - Vector3::new(0.6, 0.7, 0.8)).norm() < TOL);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let text = "\nlength_a 5\nlength_b 5\n\nlength_c 5\nangle_alpha 90\nangle_beta 90\nangle_gamma 90\n\nC 0 0 0\n";
        let cell = parse_cell(text).unwrap();
        assert_eq!(cell.num_sites(), 1);
    }

    #[test]
    fn test_parse_missing_parameter_line() {
        let text = "length_a 5\nlength_b 5\n";
        assert!(parse_cell(text).is_err());
    }

    #[test]
    fn test_parse_wrong_key() {
        let text = "length_a 5\nlength_b 5\nlength_c 5\nangle_alpha 90\nangle_gamma 90\nangle_beta 90\n";
        assert!(parse_cell(text).is_err());
    }

    #[test]
    fn test_parse_invalid_number() {
        let text = "length_a five\nlength_b 5\nlength_c 5\nangle_alpha 90\nangle_beta 90\nangle_gamma 90\n";
        assert!(parse_cell(text).is_err());
    }

    #[test]
    fn test_parse_bad_site_line() {
        let text = "length_a 5\nlength_b 5\nlength_c 5\nangle_alpha 90\nangle_beta 90\nangle_gamma 90\nC 0 0\n";
        assert!(parse_cell(text).is_err());
    }
}
