#[cfg(test)]
mod tests_pair_potential {
    use crate::evaluate::pair_potential::LennardJones;
    use crate::evaluate::EnergyEvaluator;
    use crate::structure::cell::{Cell, Site, Species};
    use nalgebra::{Matrix3, Vector3};

    fn dimer(separation: f64, box_edge: f64) -> Cell {
        Cell::new(
            Matrix3::from_diagonal_element(box_edge),
            vec![
                Site::new(Species::new("C"), Vector3::zeros()),
                Site::new(
                    Species::new("C"),
                    Vector3::new(separation / box_edge, 0.0, 0.0),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dimer_at_the_minimum() {
        // Minimum of the 12-6 potential sits at 2^(1/6) sigma, where the
        // pair energy is -epsilon, i.e. -epsilon/2 per atom. The box is
        // large enough that no other image is inside the cutoff.
        let lj = LennardJones::default();
        let r_min = 2.0f64.powf(1.0 / 6.0) * lj.sigma;
        let cell = dimer(r_min, 20.0);
        assert!((lj.energy_per_atom(&cell) + lj.epsilon / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_compressed_dimer_is_repulsive() {
        let lj = LennardJones::default();
        let cell = dimer(0.8 * lj.sigma, 20.0);
        assert!(lj.energy_per_atom(&cell) > 0.0);
    }

    #[test]
    fn test_empty_cell_is_infinite() {
        let lj = LennardJones::default();
        let cell = Cell::new(Matrix3::from_diagonal_element(5.0), vec![]).unwrap();
        assert!(lj.energy_per_atom(&cell).is_infinite());

        let (_, value) = lj.evaluate(&cell);
        assert!(value.is_infinite());
    }

    #[test]
    fn test_evaluate_without_relaxation_keeps_the_cell() {
        let lj = LennardJones::default();
        let cell = dimer(2.5, 20.0);
        let (relaxed, value) = lj.evaluate(&cell);
        assert!(value.is_finite());
        assert_eq!(relaxed.num_sites(), 2);
        assert!((relaxed.sites()[1].frac - cell.sites()[1].frac).norm() < 1e-12);
    }

    #[test]
    fn test_relaxation_lowers_the_energy() {
        let unrelaxed = LennardJones::default();
        let relaxing = LennardJones {
            relax_steps: 50,
            ..LennardJones::default()
        };
        // Start slightly off the minimum separation.
        let cell = dimer(2.0f64.powf(1.0 / 6.0) * unrelaxed.sigma + 0.3, 20.0);

        let (_, before) = unrelaxed.evaluate(&cell);
        let (_, after) = relaxing.evaluate(&cell);
        assert!(after <= before + 1e-12);
    }
}
