// Plain-text structure interchange: six lattice-parameter lines (lengths
// in Angstroms, angles in degrees) followed by one `element x y z` line
// per site, whitespace-tokenized.

use anyhow::{bail, Context, Error};
use nalgebra::Vector3;

use crate::structure::cell::{Cell, Site, Species};

const PARAMETER_KEYS: [&str; 6] = [
    "length_a",
    "length_b",
    "length_c",
    "angle_alpha",
    "angle_beta",
    "angle_gamma",
];

/// Serialize a cell into the interchange text form.
pub fn write_cell(cell: &Cell) -> String {
    let (a, b, c) = cell.lattice_parameters();
    let (alpha, beta, gamma) = cell.lattice_angles();
    let values = [
        a,
        b,
        c,
        alpha.to_degrees(),
        beta.to_degrees(),
        gamma.to_degrees(),
    ];

    let mut out = String::new();
    for (key, value) in PARAMETER_KEYS.iter().zip(values) {
        out.push_str(&format!("{} {:.10}\n", key, value));
    }
    for site in cell.sites() {
        out.push_str(&format!(
            "{} {:.10} {:.10} {:.10}\n",
            site.species, site.frac[0], site.frac[1], site.frac[2]
        ));
    }
    out
}

/// Parse a cell from the interchange text form.
pub fn parse_cell(text: &str) -> Result<Cell, Error> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let mut params = [0.0f64; 6];
    for (slot, key) in PARAMETER_KEYS.iter().enumerate() {
        let (line_no, line) = match lines.next() {
            Some(entry) => entry,
            None => bail!("structure text ended before the {} line", key),
        };
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some(token) if token == *key => {}
            Some(token) => bail!("line {}: expected '{}', found '{}'", line_no + 1, key, token),
            None => bail!("line {}: expected '{}'", line_no + 1, key),
        }
        let value = tokens
            .next()
            .with_context(|| format!("line {}: missing value for {}", line_no + 1, key))?;
        params[slot] = value
            .parse()
            .with_context(|| format!("line {}: invalid number '{}'", line_no + 1, value))?;
    }

    let mut sites = Vec::new();
    for (line_no, line) in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 4 {
            bail!(
                "line {}: expected 'element x y z', found {} tokens",
                line_no + 1,
                tokens.len()
            );
        }
        let mut frac = Vector3::zeros();
        for (axis, token) in tokens[1..].iter().enumerate() {
            frac[axis] = token
                .parse()
                .with_context(|| format!("line {}: invalid coordinate '{}'", line_no + 1, token))?;
        }
        sites.push(Site::new(Species::new(tokens[0]), frac));
    }

    Cell::from_parameters(
        params[0],
        params[1],
        params[2],
        params[3].to_radians(),
        params[4].to_radians(),
        params[5].to_radians(),
        sites,
    )
}
