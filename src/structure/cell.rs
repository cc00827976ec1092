use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use anyhow::{bail, Error};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::{DEGENERATE_VOLUME_EPS, SUPERCELL_SITE_EPS};

/// A chemical species, identified by its element symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Species(String);

impl Species {
    pub fn new(symbol: &str) -> Self {
        Species(symbol.to_string())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }

    /// Single-bond covalent radius in Angstroms (Cordero et al. values for
    /// the common elements, 1.2 for anything not tabulated).
    pub fn covalent_radius(&self) -> f64 {
        match self.0.as_str() {
            "H" => 0.31,
            "He" => 0.28,
            "Li" => 1.28,
            "Be" => 0.96,
            "B" => 0.84,
            "C" => 0.76,
            "N" => 0.71,
            "O" => 0.66,
            "F" => 0.57,
            "Ne" => 0.58,
            "Na" => 1.66,
            "Mg" => 1.41,
            "Al" => 1.21,
            "Si" => 1.11,
            "P" => 1.07,
            "S" => 1.05,
            "Cl" => 1.02,
            "Ar" => 1.06,
            "K" => 2.03,
            "Ca" => 1.76,
            "Ti" => 1.60,
            "V" => 1.53,
            "Cr" => 1.39,
            "Mn" => 1.39,
            "Fe" => 1.32,
            "Co" => 1.26,
            "Ni" => 1.24,
            "Cu" => 1.32,
            "Zn" => 1.22,
            "Ga" => 1.22,
            "Ge" => 1.20,
            "As" => 1.19,
            "Se" => 1.20,
            "Br" => 1.20,
            "Sr" => 1.95,
            "Y" => 1.90,
            "Zr" => 1.75,
            "Nb" => 1.64,
            "Mo" => 1.54,
            "Ag" => 1.45,
            "Cd" => 1.44,
            "In" => 1.42,
            "Sn" => 1.39,
            "Sb" => 1.39,
            "Te" => 1.38,
            "I" => 1.39,
            "Ba" => 2.15,
            "W" => 1.62,
            "Pt" => 1.36,
            "Au" => 1.36,
            "Pb" => 1.46,
            _ => 1.2,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One basis site: a species at a fractional position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub species: Species,
    pub frac: Vector3<f64>,
}

impl Site {
    pub fn new(species: Species, frac: Vector3<f64>) -> Self {
        Site { species, frac }
    }
}

/// A site image found by the neighbor search.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub species: Species,
    /// Cartesian position of the site image.
    pub position: Vector3<f64>,
    pub distance: f64,
}

/// An immutable periodic cell: three lattice vectors plus an ordered basis.
///
/// Lattice vectors are the columns of `lattice`. Every transformation
/// returns a new `Cell`; invariants (non-degenerate volume, finite
/// coordinates) are enforced at construction and hold for the lifetime of
/// the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    lattice: Matrix3<f64>,
    inv_lattice: Matrix3<f64>,
    sites: Vec<Site>,
}

impl Cell {
    /// Construct a cell from a lattice basis (columns) and sites.
    pub fn new(lattice: Matrix3<f64>, sites: Vec<Site>) -> Result<Self, Error> {
        if !lattice.iter().all(|x| x.is_finite()) {
            bail!("malformed cell: lattice contains non-finite entries");
        }
        if lattice.determinant().abs() < DEGENERATE_VOLUME_EPS {
            bail!("malformed cell: degenerate lattice (volume magnitude below epsilon)");
        }
        for (i, site) in sites.iter().enumerate() {
            if !site.frac.iter().all(|x| x.is_finite()) {
                bail!("malformed cell: site {} has non-finite coordinates", i);
            }
        }
        let inv_lattice = match lattice.try_inverse() {
            Some(inv) => inv,
            None => bail!("malformed cell: lattice is not invertible"),
        };
        Ok(Cell {
            lattice,
            inv_lattice,
            sites,
        })
    }

    /// Construct a cell from the six lattice parameters (angles in radians)
    /// via the canonical vector construction:
    /// `v1 = (a, 0, 0)`, `v2 = (b cosγ, b sinγ, 0)`,
    /// `v3 = (c cosβ, (c cosα − cosγ · c cosβ)/sinγ, sqrt(c² − c1² − c2²))`.
    pub fn from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
        sites: Vec<Site>,
    ) -> Result<Self, Error> {
        if gamma.sin().abs() < DEGENERATE_VOLUME_EPS {
            bail!("malformed cell: gamma is degenerate");
        }
        let v1 = Vector3::new(a, 0.0, 0.0);
        let v2 = Vector3::new(b * gamma.cos(), b * gamma.sin(), 0.0);
        let c1 = c * beta.cos();
        let c2 = (c * alpha.cos() - gamma.cos() * c * beta.cos()) / gamma.sin();
        let c3_sq = c * c - c1 * c1 - c2 * c2;
        if c3_sq <= 0.0 {
            bail!("malformed cell: lattice parameters do not form a 3D lattice");
        }
        let v3 = Vector3::new(c1, c2, c3_sq.sqrt());
        Cell::new(Matrix3::from_columns(&[v1, v2, v3]), sites)
    }

    pub fn lattice(&self) -> &Matrix3<f64> {
        &self.lattice
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    /// Lattice vectors as separate columns.
    pub fn lattice_vectors(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        (
            self.lattice.column(0).into(),
            self.lattice.column(1).into(),
            self.lattice.column(2).into(),
        )
    }

    /// Metric tensor G = A^T * A.
    pub fn metric_tensor(&self) -> Matrix3<f64> {
        self.lattice.transpose() * self.lattice
    }

    /// Get lattice parameters: a, b, c (lengths)
    pub fn lattice_parameters(&self) -> (f64, f64, f64) {
        let g = self.metric_tensor();
        (g[(0, 0)].sqrt(), g[(1, 1)].sqrt(), g[(2, 2)].sqrt())
    }

    /// Get lattice angles: α, β, γ (in radians)
    pub fn lattice_angles(&self) -> (f64, f64, f64) {
        let g = self.metric_tensor();
        let (a, b, c) = self.lattice_parameters();

        // α = angle between b and c vectors
        let alpha = (g[(1, 2)] / (b * c)).clamp(-1.0, 1.0).acos();
        // β = angle between a and c vectors
        let beta = (g[(0, 2)] / (a * c)).clamp(-1.0, 1.0).acos();
        // γ = angle between a and b vectors
        let gamma = (g[(0, 1)] / (a * b)).clamp(-1.0, 1.0).acos();

        (alpha, beta, gamma)
    }

    /// Unit cell volume: magnitude of the scalar triple product.
    pub fn volume(&self) -> f64 {
        self.lattice.determinant().abs()
    }

    /// Convert fractional (u,v,w) coords → cartesian.
    pub fn frac_to_cart(&self, v_frac: Vector3<f64>) -> Vector3<f64> {
        self.lattice * v_frac
    }

    /// Convert cartesian coords → fractional (u,v,w).
    pub fn cart_to_frac(&self, v_cart: Vector3<f64>) -> Vector3<f64> {
        self.inv_lattice * v_cart
    }

    /// Reciprocal lattice basis (2π convention), as columns.
    pub fn reciprocal_lattice(&self) -> Matrix3<f64> {
        (2.0 * PI) * self.inv_lattice.transpose()
    }

    /// Per-element site counts.
    pub fn species_counts(&self) -> BTreeMap<Species, usize> {
        let mut counts = BTreeMap::new();
        for site in &self.sites {
            *counts.entry(site.species.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// A copy of this cell with every fractional coordinate reduced into
    /// `[0, 1)` by integer lattice translations.
    pub fn wrapped(&self) -> Cell {
        let sites = self
            .sites
            .iter()
            .map(|site| Site {
                species: site.species.clone(),
                frac: site.frac.map(|x| x - x.floor()),
            })
            .collect();
        // Lattice unchanged, so the construction invariants still hold.
        Cell {
            lattice: self.lattice,
            inv_lattice: self.inv_lattice,
            sites,
        }
    }

    /// A copy of this cell with a new basis and the lattice unchanged.
    pub fn with_sites(&self, sites: Vec<Site>) -> Result<Cell, Error> {
        Cell::new(self.lattice, sites)
    }

    /// Construct a supercell from an integer coefficient matrix.
    ///
    /// The rows of `coeffs` give the new lattice vectors as integer linear
    /// combinations of the old ones. Original sites are replicated into
    /// every cell image that maps into the new cell; the basis count must
    /// come out to `|det(coeffs)|` times the original.
    pub fn supercell(&self, coeffs: &Matrix3<i32>) -> Result<Cell, Error> {
        let det = det3_i32(coeffs);
        if det == 0 {
            bail!("malformed supercell: coefficient matrix is singular");
        }
        let wrapped = self.wrapped();

        // New lattice vectors: row k of coeffs combines the old columns.
        let coeffs_f = coeffs.map(|x| x as f64);
        let new_lattice = self.lattice * coeffs_f.transpose();
        let new_inv = match new_lattice.try_inverse() {
            Some(inv) => inv,
            None => bail!("malformed supercell: resulting lattice is singular"),
        };

        // Bound the integer image range by the 8 corner combinations of the
        // coefficient rows.
        let mut lo = [0i32; 3];
        let mut hi = [0i32; 3];
        for mask in 0u32..8 {
            let mut corner = [0i32; 3];
            for row in 0..3 {
                if mask & (1 << row) != 0 {
                    for col in 0..3 {
                        corner[col] += coeffs[(row, col)];
                    }
                }
            }
            for col in 0..3 {
                lo[col] = lo[col].min(corner[col]);
                hi[col] = hi[col].max(corner[col]);
            }
        }

        let eps = SUPERCELL_SITE_EPS;
        let mut new_sites = Vec::new();
        for site in wrapped.sites() {
            for i in lo[0]..=hi[0] {
                for j in lo[1]..=hi[1] {
                    for k in lo[2]..=hi[2] {
                        let image = site.frac + Vector3::new(i as f64, j as f64, k as f64);
                        let cart = self.lattice * image;
                        let frac = new_inv * cart;
                        if frac.iter().all(|&x| x > -eps && x <= 1.0 - eps) {
                            new_sites.push(Site::new(site.species.clone(), frac));
                        }
                    }
                }
            }
        }

        let expected = det.unsigned_abs() as usize * self.sites.len();
        if new_sites.len() != expected {
            bail!(
                "malformed supercell: expected {} basis sites, found {}",
                expected,
                new_sites.len()
            );
        }
        Cell::new(new_lattice, new_sites)
    }

    /// All site images within `radius` of `center` (Cartesian), sorted
    /// ascending by distance; ties keep enumeration order.
    ///
    /// The integer image range per axis is bounded through the reciprocal
    /// lattice: the spacing of lattice planes normal to axis i is
    /// 2π/|b_i|, so at most `radius · |b_i| / 2π` planes fit in the radius.
    pub fn neighbors_within(&self, center: Vector3<f64>, radius: f64) -> Vec<Neighbor> {
        let reciprocal = self.reciprocal_lattice();
        let mut bounds = [0.0f64; 3];
        for axis in 0..3 {
            bounds[axis] = radius * reciprocal.column(axis).norm() / (2.0 * PI);
        }
        let center_frac = self.cart_to_frac(center);

        let mut found = Vec::new();
        for site in &self.sites {
            let delta = center_frac - site.frac;
            let lo: Vec<i32> = (0..3)
                .map(|axis| (delta[axis] - bounds[axis]).floor() as i32)
                .collect();
            let hi: Vec<i32> = (0..3)
                .map(|axis| (delta[axis] + bounds[axis]).ceil() as i32)
                .collect();
            for i in lo[0]..=hi[0] {
                for j in lo[1]..=hi[1] {
                    for k in lo[2]..=hi[2] {
                        let image = site.frac + Vector3::new(i as f64, j as f64, k as f64);
                        let position = self.lattice * image;
                        let distance = (position - center).norm();
                        if distance <= radius {
                            found.push(Neighbor {
                                species: site.species.clone(),
                                position,
                                distance,
                            });
                        }
                    }
                }
            }
        }

        // Stable sort keeps enumeration order for equal distances.
        found.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        found
    }

    /// Rebuild the lattice from the six parameters via the canonical
    /// construction, preserving fractional coordinates. Normalizes the
    /// orientation without changing the physical structure.
    pub fn rotated_into_principal_axes(&self) -> Result<Cell, Error> {
        let (a, b, c) = self.lattice_parameters();
        let (alpha, beta, gamma) = self.lattice_angles();
        Cell::from_parameters(a, b, c, alpha, beta, gamma, self.sites.clone())
    }
}

/// Integer 3×3 determinant (nalgebra's determinant needs a field scalar).
pub fn det3_i32(m: &Matrix3<i32>) -> i32 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}
