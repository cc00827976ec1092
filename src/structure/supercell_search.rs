// Search for the "roundest" supercell of a given volume multiple: the
// integer combination of lattice vectors whose cell maximizes the minimum
// inter-image separation.

use anyhow::{bail, Error};
use nalgebra::{Matrix3, Vector3};

use crate::config::SUPERCELL_VOLUME_WINDOW;
use crate::structure::cell::Cell;

/// Find the integer coefficient matrix (rows are combinations of the
/// primitive vectors) whose supercell has volume `volume_multiple` times
/// the primitive volume and the largest inscribed-sphere proxy `dmin`.
///
/// `n` bounds the integer indices per axis, `rmax` the candidate vector
/// length. The enumeration is O(|L|³) in the candidate list, so both
/// bounds should be kept modest.
pub fn find_roundest_supercell(
    cell: &Cell,
    n: i32,
    volume_multiple: u32,
    rmax: f64,
) -> Result<Matrix3<i32>, Error> {
    if n < 1 {
        bail!("supercell search: index bound must be at least 1");
    }
    if volume_multiple == 0 {
        bail!("supercell search: volume multiple must be positive");
    }
    let target_volume = volume_multiple as f64 * cell.volume();
    let rmax_sq = rmax * rmax;

    // Candidate lattice vectors within the length bound.
    let mut candidates: Vec<(Vector3<f64>, [i32; 3])> = Vec::new();
    for i in -n..=n {
        for j in -n..=n {
            for k in -n..=n {
                if i == 0 && j == 0 && k == 0 {
                    continue;
                }
                let v = cell.frac_to_cart(Vector3::new(i as f64, j as f64, k as f64));
                if v.norm_squared() < rmax_sq {
                    candidates.push((v, [i, j, k]));
                }
            }
        }
    }

    let mut best: Option<(f64, Matrix3<i32>)> = None;
    for p in 0..candidates.len() {
        for q in (p + 1)..candidates.len() {
            for r in (q + 1)..candidates.len() {
                let (u, iu) = &candidates[p];
                let (v, iv) = &candidates[q];
                let (w, iw) = &candidates[r];

                let volume = u.cross(v).dot(w).abs();
                if (volume - target_volume).abs() > SUPERCELL_VOLUME_WINDOW * target_volume {
                    continue;
                }

                // Inscribed-sphere proxy: per face, half the volume over the
                // product of the other two vector lengths.
                let du = (0.5 * volume / (v.norm() * w.norm())).abs();
                let dv = (0.5 * volume / (u.norm() * w.norm())).abs();
                let dw = (0.5 * volume / (u.norm() * v.norm())).abs();
                let dmin = du.min(dv).min(dw);

                // Strict improvement, so ties keep the first combination.
                if best.map_or(true, |(best_dmin, _)| dmin > best_dmin) {
                    let coeffs = Matrix3::new(
                        iu[0], iu[1], iu[2], iv[0], iv[1], iv[2], iw[0], iw[1], iw[2],
                    );
                    best = Some((dmin, coeffs));
                }
            }
        }
    }

    match best {
        Some((_, coeffs)) => Ok(coeffs),
        None => bail!(
            "supercell search: no combination within {}% of {}x the cell volume",
            SUPERCELL_VOLUME_WINDOW * 100.0,
            volume_multiple
        ),
    }
}
