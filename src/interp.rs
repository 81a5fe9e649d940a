//! Semi-Lagrangian cubic Lagrange interpolation at u-, v-, and phi-points
//! with C-grid staggering and pole reflection (§4.4).

use crate::grid::{Field2, Grid};
use std::f64::consts::PI;

/// Which staggered point type a field lives on. Determines the coordinate
/// tables used to locate the interpolation stencil.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointKind {
    Phi,
    U,
    V,
}

/// Cubic Lagrange basis weights for four equally spaced nodes at relative
/// offsets `-1, 0, 1, 2` from the stencil's second node, evaluated at
/// fractional offset `t` in `[0, 1)` from that node.
#[inline]
fn lagrange4(t: f64) -> [f64; 4] {
    [
        -t * (t - 1.0) * (t - 2.0) / 6.0,
        (t + 1.0) * (t - 1.0) * (t - 2.0) / 2.0,
        -(t + 1.0) * t * (t - 2.0) / 2.0,
        (t + 1.0) * t * (t - 1.0) / 6.0,
    ]
}

fn lon_table<'a>(grid: &'a Grid, kind: PointKind) -> &'a [f64] {
    match kind {
        PointKind::U => &grid.lon_u,
        PointKind::Phi | PointKind::V => &grid.lon_phi,
    }
}

fn lat_table<'a>(grid: &'a Grid, kind: PointKind) -> &'a [f64] {
    match kind {
        PointKind::Phi | PointKind::U => &grid.lat_phi,
        PointKind::V => &grid.lat_v,
    }
}

/// Locate the south-west stencil corner `(k, l)` and fractional offsets
/// `(t, s)` for a continuous point `(lambda, theta)` on the coordinate
/// tables of `kind`.
fn locate(grid: &Grid, kind: PointKind, lambda: f64, theta: f64) -> (isize, isize, f64, f64) {
    let lons = lon_table(grid, kind);
    let lats = lat_table(grid, kind);

    let rel = (lambda - lons[0]).rem_euclid(2.0 * PI);
    let fi = rel / grid.dx;
    let k = fi.floor();
    let t = fi - k;

    let fj = (theta - lats[0]) / grid.dy;
    let l = fj.floor();
    let s = fj - l;

    (k as isize, l as isize, t, s)
}

/// Interpolate a scalar field (phi) at a departure point, with pole
/// reflection of the stencil and no sign flip.
pub fn interpolate_scalar(field: &Field2, grid: &Grid, kind: PointKind, lambda: f64, theta: f64) -> f64 {
    let (k, l, t, s) = locate(grid, kind, lambda, theta);
    let wl = lagrange4(t);
    let wt = lagrange4(s);

    let mut acc = 0.0;
    for (m, &wm) in wt.iter().enumerate() {
        let mut row = 0.0;
        for (n, &wn) in wl.iter().enumerate() {
            row += wn * field.at_scalar(k - 1 + n as isize, l - 1 + m as isize);
        }
        acc += wm * row;
    }
    acc
}

/// Interpolate a vector-component field (u, v) at a departure point: like
/// [`interpolate_scalar`] but the contribution of any stencil row that
/// crossed a pole is sign-flipped.
pub fn interpolate_vector(field: &Field2, grid: &Grid, kind: PointKind, lambda: f64, theta: f64) -> f64 {
    let (k, l, t, s) = locate(grid, kind, lambda, theta);
    let wl = lagrange4(t);
    let wt = lagrange4(s);

    let mut acc = 0.0;
    for (m, &wm) in wt.iter().enumerate() {
        let mut row = 0.0;
        for (n, &wn) in wl.iter().enumerate() {
            row += wn * field.at_vector(k - 1 + n as isize, l - 1 + m as isize);
        }
        acc += wm * row;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn interpolation_is_exact_at_arrival_points() {
        let grid = Grid::new(32, 16, 1.0);
        let field = Field2::from_fn(grid.nx, grid.ny, |i, j| (i as f64) * 0.3 + (j as f64) * 0.7);

        for &(i, j) in &[(0usize, 0usize), (5, 3), (31, 15)] {
            let lambda = grid.lon_phi[i];
            let theta = grid.lat_phi[j];
            let got = interpolate_scalar(&field, &grid, PointKind::Phi, lambda, theta);
            let want = field.get(i, j);
            assert!((got - want).abs() < 1e-9, "got {got} want {want}");
        }
    }

    #[test]
    fn lagrange_weights_sum_to_one() {
        for t in [0.0, 0.25, 0.5, 0.75] {
            let w = lagrange4(t);
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }
}
