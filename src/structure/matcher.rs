// Tolerance-based structure equivalence: decides whether two cells are the
// same physical structure under misfit tolerances.

use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::evaluate::SymmetryOracle;
use crate::structure::cell::Cell;
use crate::structure::niggli;

/// Axis relabelings tried on cell A: identity plus the three
/// transpositions. Cyclic permutations are relabelings already covered by
/// applying these in sequence.
const AXIS_LABELINGS: [[usize; 3]; 4] = [[0, 1, 2], [2, 1, 0], [1, 0, 2], [0, 2, 1]];

/// Structure matcher with misfit tolerances.
///
/// `matches` is a containment-style test: the origin-shift search iterates
/// over A's sites only, so it is not guaranteed to be symmetric under
/// swapping the arguments beyond what the tolerances absorb.
#[derive(Debug, Clone, Copy)]
pub struct StructureMatcher {
    pub atomic_misfit: f64,
    pub length_misfit: f64,
    pub angle_misfit_deg: f64,
}

impl StructureMatcher {
    pub fn new(atomic_misfit: f64, length_misfit: f64, angle_misfit_deg: f64) -> Self {
        StructureMatcher {
            atomic_misfit,
            length_misfit,
            angle_misfit_deg,
        }
    }

    /// Decide whether `a` and `b` represent the same structure.
    pub fn matches(&self, a: &Cell, b: &Cell, oracle: &dyn SymmetryOracle) -> bool {
        let ca = canonicalize(a, oracle);
        let cb = canonicalize(b, oracle);

        // Cheap short-circuits on the basis.
        if ca.num_sites() != cb.num_sites() {
            return false;
        }
        if ca.species_counts() != cb.species_counts() {
            return false;
        }

        let (bl_a, bl_b, bl_c) = cb.lattice_parameters();
        let (ba, bb, bg) = cb.lattice_angles();
        let angle_misfit = self.angle_misfit_deg.to_radians();

        // Fix B's origin convention once; A's origin is searched below.
        let cb = match shift_to_origin(&cb, 0) {
            // Site counts already agree, so no origin site means both empty.
            Some(cell) => cell,
            None => return true,
        };

        for labeling in AXIS_LABELINGS {
            let pa = match permute_axes(&ca, labeling) {
                Some(cell) => cell,
                None => continue,
            };

            // Cheap gate on the six lattice parameters.
            let (al_a, al_b, al_c) = pa.lattice_parameters();
            let (aa, ab, ag) = pa.lattice_angles();
            if (al_a - bl_a).abs() > self.length_misfit
                || (al_b - bl_b).abs() > self.length_misfit
                || (al_c - bl_c).abs() > self.length_misfit
                || (aa - ba).abs() > angle_misfit
                || (ab - bb).abs() > angle_misfit
                || (ag - bg).abs() > angle_misfit
            {
                continue;
            }

            // Try each site of A at the origin; accept the first shift under
            // which every B site finds a same-element nearest neighbor.
            for origin in 0..pa.num_sites() {
                let shifted = match shift_to_origin(&pa, origin) {
                    Some(cell) => cell,
                    None => continue,
                };
                let all_aligned = cb.sites().iter().all(|b_site| {
                    let center = shifted.frac_to_cart(b_site.frac);
                    shifted
                        .neighbors_within(center, self.atomic_misfit)
                        .first()
                        .map_or(false, |nearest| nearest.species == b_site.species)
                });
                if all_aligned {
                    return true;
                }
            }
        }
        false
    }
}

/// Niggli-reduce and symmetrize a cell for comparison. Both stages degrade
/// gracefully: a failure falls back to the unmodified input of that stage.
fn canonicalize(cell: &Cell, oracle: &dyn SymmetryOracle) -> Cell {
    let reduced = match niggli::reduce(cell) {
        Ok(reduced) => reduced.cell,
        Err(err) => {
            debug!("matcher: reduction failed ({}); using the cell as-is", err);
            cell.clone()
        }
    };
    match oracle.wyckoff_cell(&reduced) {
        Ok(wyckoff) => wyckoff,
        Err(err) => {
            debug!(
                "matcher: symmetry oracle failed ({}); matching on the reduced cell",
                err
            );
            reduced
        }
    }
}

/// Relabel the axes of a cell: permute the lattice columns and the
/// corresponding fractional components together.
fn permute_axes(cell: &Cell, labeling: [usize; 3]) -> Option<Cell> {
    let lattice = cell.lattice();
    let columns: [Vector3<f64>; 3] = [
        lattice.column(labeling[0]).into(),
        lattice.column(labeling[1]).into(),
        lattice.column(labeling[2]).into(),
    ];
    let permuted = Matrix3::from_columns(&columns);
    let sites = cell
        .sites()
        .iter()
        .map(|site| {
            let mut frac = site.frac;
            for (axis, &source) in labeling.iter().enumerate() {
                frac[axis] = site.frac[source];
            }
            crate::structure::cell::Site::new(site.species.clone(), frac)
        })
        .collect();
    Cell::new(permuted, sites).ok()
}

/// Shift all fractional coordinates so the chosen site sits at the origin,
/// wrapping negatives back into [0, 1).
fn shift_to_origin(cell: &Cell, site_index: usize) -> Option<Cell> {
    let origin = cell.sites().get(site_index)?.frac;
    let sites = cell
        .sites()
        .iter()
        .map(|site| {
            crate::structure::cell::Site::new(
                site.species.clone(),
                (site.frac - origin).map(|x| x - x.floor()),
            )
        })
        .collect();
    cell.with_sites(sites).ok()
}
