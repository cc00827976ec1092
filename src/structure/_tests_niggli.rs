#[cfg(test)]
mod tests_niggli {
    use crate::structure::cell::{det3_i32, Cell, Site, Species};
    use crate::structure::niggli::reduce;
    use nalgebra::{Matrix3, Vector3};

    const TOL: f64 = 1e-6;

    fn cubic(a: f64, sites: Vec<Site>) -> Cell {
        Cell::new(Matrix3::from_diagonal_element(a), sites).unwrap()
    }

    fn carbon_at(x: f64, y: f64, z: f64) -> Site {
        Site::new(Species::new("C"), Vector3::new(x, y, z))
    }

    #[test]
    fn test_cubic_already_reduced() {
        let cell = cubic(5.0, vec![carbon_at(0.0, 0.0, 0.0)]);
        let reduced = reduce(&cell).unwrap();

        let (a, b, c) = reduced.cell.lattice_parameters();
        assert!((a - 5.0).abs() < TOL);
        assert!((b - 5.0).abs() < TOL);
        assert!((c - 5.0).abs() < TOL);
        let (al, be, ga) = reduced.cell.lattice_angles();
        let right = std::f64::consts::FRAC_PI_2;
        assert!((al - right).abs() < TOL);
        assert!((be - right).abs() < TOL);
        assert!((ga - right).abs() < TOL);
    }

    #[test]
    fn test_transform_is_unimodular() {
        let cell = Cell::from_parameters(
            4.0,
            6.5,
            7.2,
            55.0f64.to_radians(),
            95.0f64.to_radians(),
            120.0f64.to_radians(),
            vec![carbon_at(0.2, 0.3, 0.4)],
        )
        .unwrap();
        let reduced = reduce(&cell).unwrap();
        assert_eq!(det3_i32(&reduced.transform).abs(), 1);
        assert!((reduced.cell.volume() - cell.volume()).abs() < TOL);
    }

    #[test]
    fn test_skewed_basis_recovers_cubic_parameters() {
        // Shear a cubic lattice by a unimodular transform; reduction must
        // find the cubic representative again.
        let cell = cubic(5.0, vec![carbon_at(0.1, 0.2, 0.3)]);
        let shear = Matrix3::new(1, 1, 0, 0, 1, 1, 0, 0, 1);
        let skewed = cell.supercell(&shear).unwrap();

        let reduced = reduce(&skewed).unwrap();
        let (a, b, c) = reduced.cell.lattice_parameters();
        assert!((a - 5.0).abs() < TOL);
        assert!((b - 5.0).abs() < TOL);
        assert!((c - 5.0).abs() < TOL);
        let right = std::f64::consts::FRAC_PI_2;
        let (al, be, ga) = reduced.cell.lattice_angles();
        assert!((al - right).abs() < TOL);
        assert!((be - right).abs() < TOL);
        assert!((ga - right).abs() < TOL);
    }

    #[test]
    fn test_basis_preserved() {
        let cell = cubic(
            5.0,
            vec![carbon_at(0.0, 0.0, 0.0), carbon_at(0.5, 0.5, 0.5)],
        );
        let shear = Matrix3::new(1, 0, 0, 2, 1, 0, 0, 0, 1);
        let skewed = cell.supercell(&shear).unwrap();

        let reduced = reduce(&skewed).unwrap();
        assert_eq!(reduced.cell.num_sites(), 2);
        assert_eq!(reduced.cell.species_counts(), cell.species_counts());
    }

    #[test]
    fn test_idempotent() {
        let cell = Cell::from_parameters(
            3.8,
            5.1,
            6.9,
            70.0f64.to_radians(),
            100.0f64.to_radians(),
            85.0f64.to_radians(),
            vec![carbon_at(0.25, 0.5, 0.75)],
        )
        .unwrap();
        let once = reduce(&cell).unwrap();
        let twice = reduce(&once.cell).unwrap();

        let (a1, b1, c1) = once.cell.lattice_parameters();
        let (a2, b2, c2) = twice.cell.lattice_parameters();
        assert!((a1 - a2).abs() < TOL);
        assert!((b1 - b2).abs() < TOL);
        assert!((c1 - c2).abs() < TOL);
        let (al1, be1, ga1) = once.cell.lattice_angles();
        let (al2, be2, ga2) = twice.cell.lattice_angles();
        assert!((al1 - al2).abs() < TOL);
        assert!((be1 - be2).abs() < TOL);
        assert!((ga1 - ga2).abs() < TOL);
    }
}
