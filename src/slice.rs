//! SLICE: the two-sweep conservative mass remap (§4.5). An east-west sweep
//! along each latitude row is followed by a north-south sweep along each
//! departure column, each built on the shared [`tridiag::solve`] primitive
//! through a periodic/bounded parabolic-spline reconstruction.

use crate::departure::DeparturePoints;
use crate::grid::{Field2, Grid};
use crate::tridiag::{self, Mode};
use std::f64::consts::PI;

/// Cell-edge values `q_g` solving the periodic parabolic-spline tridiagonal
/// system `(1/6) q_g[i-1] + (2/3) q_g[i] + (1/6) q_g[i+1] = (q[i-1]+q[i])/2`.
fn edge_values_periodic(q: &[f64]) -> Vec<f64> {
    let n = q.len();
    let a = vec![1.0 / 6.0; n];
    let b = vec![2.0 / 3.0; n];
    let c = vec![1.0 / 6.0; n];
    let r: Vec<f64> = (0..n).map(|i| 0.5 * (q[(i + n - 1) % n] + q[i])).collect();
    tridiag::solve(&a, &b, &c, &r, Mode::Periodic)
}

/// Like [`edge_values_periodic`] but bounded, with the end edges closed by
/// a zero-curvature condition (`q_g[0] + q_g[1] = 2*q[0]`, and the mirror
/// at the far end) rather than wrapping.
fn edge_values_bounded(q: &[f64]) -> Vec<f64> {
    let n = q.len();
    let ne = n + 1;
    let mut a = vec![1.0 / 6.0; ne];
    let mut b = vec![2.0 / 3.0; ne];
    let mut c = vec![1.0 / 6.0; ne];
    let mut r = vec![0.0; ne];

    a[0] = 0.0;
    b[0] = 1.0;
    c[0] = 1.0;
    r[0] = 2.0 * q[0];

    for i in 1..n {
        r[i] = 0.5 * (q[i - 1] + q[i]);
    }

    a[n] = 1.0;
    b[n] = 1.0;
    c[n] = 0.0;
    r[n] = 2.0 * q[n - 1];

    tridiag::solve(&a, &b, &c, &r, Mode::Bounded)
}

/// Parabola coefficients for cell `i` given its edge values (§4.5).
fn cell_coeffs(q: &[f64], edges: &[f64], i: usize, ip1: usize) -> (f64, f64, f64) {
    let (g0, g1, qi) = (edges[i], edges[ip1], q[i]);
    let a0 = g0;
    let a1 = -2.0 * g0 - g1 + 3.0 * qi;
    let a2 = g0 + g1 - 2.0 * qi;
    (a0, a1, a2)
}

/// Mass integral from the cell origin to fractional point `xi in [0,1)`,
/// scaled by cell width `dx` (§4.5).
#[inline]
fn partial_mass(a0: f64, a1: f64, a2: f64, xi: f64, dx: f64) -> f64 {
    ((a2 * xi + a1) * xi + a0) * xi * dx
}

/// Cumulative mass from the domain origin `x0` out to coordinate `x`,
/// periodic with domain length `n*dx`, wrapping at full cell multiples.
fn cumulative_periodic(q: &[f64], edges: &[f64], x0: f64, dx: f64, x: f64) -> f64 {
    let n = q.len();
    let mut prefix = vec![0.0; n + 1];
    for i in 0..n {
        prefix[i + 1] = prefix[i] + dx * q[i];
    }
    let total_mass = prefix[n];

    let t = (x - x0) / dx;
    let m = t.floor();
    let frac = t - m;
    let cell = (m.rem_euclid(n as f64)) as usize;
    let wraps = ((m - cell as f64) / n as f64).round();

    let (a0, a1, a2) = cell_coeffs(q, edges, cell, (cell + 1) % n);
    wraps * total_mass + prefix[cell] + partial_mass(a0, a1, a2, frac, dx)
}

/// Cumulative mass from `x0`, bounded to `[x0, x0 + n*dx]` (no wrapping).
fn cumulative_bounded(q: &[f64], edges: &[f64], x0: f64, dx: f64, x: f64) -> f64 {
    let n = q.len();
    let mut prefix = vec![0.0; n + 1];
    for i in 0..n {
        prefix[i + 1] = prefix[i] + dx * q[i];
    }
    let t = ((x - x0) / dx).clamp(0.0, n as f64);
    let cell = (t.floor() as usize).min(n - 1);
    let frac = t - cell as f64;
    let (a0, a1, a2) = cell_coeffs(q, edges, cell, cell + 1);
    prefix[cell] + partial_mass(a0, a1, a2, frac, dx)
}

/// Unwrap a sequence of periodic edge coordinates (domain length `domain`)
/// so successive values are monotonically increasing, matching the
/// trajectory each edge actually traced rather than its value mod the
/// domain.
fn unwrap_monotonic(xs: &mut [f64], domain: f64) {
    for k in 1..xs.len() {
        while xs[k] < xs[k - 1] - domain / 2.0 {
            xs[k] += domain;
        }
        while xs[k] > xs[k - 1] + domain / 2.0 {
            xs[k] -= domain;
        }
    }
}

/// Periodic 1D conservative remap (`slice1d`, §4.5): `x_edges` has `n+1`
/// monotone entries, the departure coordinates of the `n` fixed arrival
/// edges plus the domain-closing final edge (`x_edges[n] = x_edges[0] +
/// n*dx`). Returns `n` remapped cell averages.
pub fn slice1d(q: &[f64], x_edges: &[f64], x0: f64, dx: f64) -> Vec<f64> {
    let n = q.len();
    let edges = edge_values_periodic(q);
    (0..n)
        .map(|i| {
            let lo = cumulative_periodic(q, &edges, x0, dx, x_edges[i]);
            let hi = cumulative_periodic(q, &edges, x0, dx, x_edges[i + 1]);
            (hi - lo) / dx
        })
        .collect()
}

/// Bounded companion (`slice1db`, §4.5): zero-curvature boundary closure,
/// no periodic wrap.
pub fn slice1db(q: &[f64], x_edges: &[f64], x0: f64, dx: f64) -> Vec<f64> {
    let n = q.len();
    let edges = edge_values_bounded(q);
    (0..n)
        .map(|i| {
            let lo = cumulative_bounded(q, &edges, x0, dx, x_edges[i]);
            let hi = cumulative_bounded(q, &edges, x0, dx, x_edges[i + 1]);
            (hi - lo) / dx
        })
        .collect()
}

/// East-west sweep (§4.5): remap each latitude row of `phi` using the
/// u-point departure longitudes at that row as the Lagrangian cell edges.
pub fn remap_east_west(grid: &Grid, phi: &Field2, dp: &DeparturePoints) -> Field2 {
    let domain = 2.0 * PI;
    let mut out = grid.new_phi_field();
    for j in 0..grid.ny {
        let q: Vec<f64> = (0..grid.nx).map(|i| phi.get(i, j)).collect();
        let mut edges: Vec<f64> = (0..grid.nx).map(|i| dp.lambda_u.get(i, j)).collect();
        unwrap_monotonic(&mut edges, domain);
        edges.push(edges[0] + domain);
        let remapped = slice1d(&q, &edges, edges[0], grid.dx);
        for i in 0..grid.nx {
            out.set(i, j, remapped[i]);
        }
    }
    out
}

/// North-south sweep (§4.5): remap each column of `phi` (already
/// east-west remapped) using the v-point departure latitudes at phi
/// longitude as the bounded Lagrangian cell edges (`v` spans pole to
/// pole, so this needs no unwrap).
pub fn remap_north_south(grid: &Grid, phi: &Field2, dp: &DeparturePoints) -> Field2 {
    let mut out = grid.new_phi_field();
    for i in 0..grid.nx {
        let q: Vec<f64> = (0..grid.ny).map(|j| phi.get(i, j)).collect();
        let edges: Vec<f64> = (0..=grid.ny).map(|j| dp.theta_v.get(i, j)).collect();
        let remapped = slice1db(&q, &edges, -PI / 2.0, grid.dy);
        for j in 0..grid.ny {
            out.set(i, j, remapped[j]);
        }
    }
    out
}

/// Run both sweeps (§4.5).
pub fn remap(grid: &Grid, phi: &Field2, dp: &DeparturePoints) -> Field2 {
    let intermediate = remap_east_west(grid, phi, dp);
    remap_north_south(grid, &intermediate, dp)
}

/// Departure-area state for the area-coordinate variant (`areafix = 7`,
/// §4.5). Initialized to the arrival cell areas, per the design note that
/// an implementer must seed `aread[:,j] = A[j]` before the first call.
pub struct AreaState {
    pub a_d: Field2,
}

impl AreaState {
    pub fn new(grid: &Grid) -> Self {
        let a_d = Field2::from_fn(grid.nx, grid.ny, |_, j| grid.area[j]);
        Self { a_d }
    }

    /// Seed a departure-strip divergence estimate by remapping `div`
    /// itself through the current `a_d` (step 1 of the area-coordinate
    /// algorithm).
    pub fn seed_divergence(&self, grid: &Grid, div: &Field2, dp: &DeparturePoints) -> Field2 {
        remap(grid, div, dp)
    }

    /// Evolve `a_d` consistently with the modified divergence (step 2):
    /// `A_d[i,j] <- (1 - dt/2*(div_mod + div_d)) * A[j]`.
    pub fn evolve(&mut self, grid: &Grid, div_mod: &Field2, div_d: &Field2, dt: f64) {
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                let factor = 1.0 - dt / 2.0 * (div_mod.get(i, j) + div_d.get(i, j));
                self.a_d.set(i, j, factor * grid.area[j]);
            }
        }
    }
}

/// Optional C-grid correction (§4.5): a mass-conserving exchange of
/// `dx_d * q_edge` between the two cells sharing each u-edge, accounting
/// for the difference between the exact departure longitude and the one
/// implied by the intermediate control volume.
pub fn cgrid_correction(grid: &Grid, q: &mut Field2, dx_deficit: &Field2, q_edge: &Field2) {
    for j in 0..grid.ny {
        for i in 0..grid.nx {
            let delta = dx_deficit.get(i, j) * q_edge.get(i, j);
            let im1 = if i == 0 { grid.nx - 1 } else { i - 1 };
            q.set(i, j, q.get(i, j) + delta);
            q.set(im1, j, q.get(im1, j) - delta);
        }
    }
}

/// Blend weights for the 3-row polar merge region, innermost row first
/// (§4.5).
const MERGE_WEIGHTS: [f64; 3] = [5.0 / 32.0, 1.0 / 2.0, 27.0 / 32.0];

/// Merge the SLICE result with a pure semi-Lagrangian estimate near each
/// pole (§4.5): outside the polar caps SLICE is trusted outright; inside,
/// a 3-row linear blend is used, with the SL contribution in each row
/// rescaled so the row's area-weighted mass matches SLICE's exactly.
pub fn merge_polar(grid: &Grid, slice_result: &Field2, sl_estimate: &Field2) -> Field2 {
    let mut out = slice_result.clone();
    for (k, &w) in MERGE_WEIGHTS.iter().enumerate() {
        for &j in &[k, grid.ny - 1 - k] {
            let slice_mass: f64 = (0..grid.nx).map(|i| slice_result.get(i, j)).sum();
            let mut sl_mass: f64 = 0.0;
            let mut blended = vec![0.0; grid.nx];
            for i in 0..grid.nx {
                let v = w * sl_estimate.get(i, j) + (1.0 - w) * slice_result.get(i, j);
                blended[i] = v;
                sl_mass += v;
            }
            let correction = if sl_mass.abs() > 1e-300 { slice_mass / sl_mass } else { 1.0 };
            for i in 0..grid.nx {
                out.set(i, j, blended[i] * correction);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn slice1d_is_exact_for_a_uniform_field() {
        let n = 16;
        let q = vec![3.5; n];
        let dx = 1.0;
        let mut edges: Vec<f64> = (0..n).map(|i| i as f64 + 0.1).collect();
        edges.push(edges[0] + n as f64 * dx);
        let out = slice1d(&q, &edges, 0.0, dx);
        for v in out {
            assert!((v - 3.5).abs() < 1e-10);
        }
    }

    #[test]
    fn slice1d_conserves_total_mass_under_a_shift() {
        let n = 16;
        let q: Vec<f64> = (0..n).map(|i| 1.0 + 0.3 * (i as f64).sin()).collect();
        let dx = 1.0;
        let shift = 2.37;
        let mut edges: Vec<f64> = (0..n).map(|i| i as f64 + shift).collect();
        edges.push(edges[0] + n as f64 * dx);
        let out = slice1d(&q, &edges, 0.0, dx);
        let before: f64 = q.iter().sum::<f64>() * dx;
        let after: f64 = out.iter().sum::<f64>() * dx;
        assert!((before - after).abs() < 1e-8);
    }

    #[test]
    fn remap_is_identity_for_zero_wind() {
        let grid = Grid::new(32, 16, 1.0);
        let u0 = grid.new_u_field();
        let v0 = grid.new_v_field();
        let dp = crate::departure::compute_departure_points(&grid, &u0, &v0, 100.0, None);
        let phi = Field2::from_fn(grid.nx, grid.ny, |i, j| 1.0 + 0.1 * (i + j) as f64);
        let out = remap(&grid, &phi, &dp);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                assert!((out.get(i, j) - phi.get(i, j)).abs() < 1e-6);
            }
        }
    }
}
