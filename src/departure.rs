//! Departure-point iteration on the sphere: trajectory tracing with local
//! Cartesian rotation, pole handling, and the polar-cap "modified"
//! departure points required by SLICE (§4.3).

use crate::average::{
    u_to_phi, u_to_v, u_to_vorticity, v_to_phi, v_to_u, v_to_vorticity,
};
use crate::grid::{Field2, Grid};
use std::f64::consts::PI;

const SWEEPS: usize = 10;
const POLAR_EPS: f64 = 1e-9;

/// Departure point `(lambda_d, theta_d)` coordinates at every arrival
/// point type named in §3: u, v, phi, and the vorticity ("corner")
/// points.
#[derive(Clone)]
pub struct DeparturePoints {
    pub lambda_u: Field2,
    pub theta_u: Field2,
    pub lambda_v: Field2,
    pub theta_v: Field2,
    pub lambda_phi: Field2,
    pub theta_phi: Field2,
    pub lambda_corner: Field2,
    pub theta_corner: Field2,
}

/// Convert a co-located wind component field to angular velocity
/// (rad/s): zonal components are divided by `radius * cos(theta)`,
/// meridional components by `radius`. Rows within `POLAR_EPS` of a pole
/// have their zonal conversion clamped rather than blowing up; those rows
/// are never used as arrival points by [`iterate_kind`] (it short-circuits
/// to the identity trajectory there), so the clamp only bounds values
/// that might be read by a stencil straddling the pole.
fn to_angular(field: &Field2, lat_rows: &[f64], radius: f64, zonal: bool) -> Field2 {
    Field2::from_fn(field.nx(), field.ny(), |i, j| {
        let v = field.get(i, j);
        if zonal {
            let c = lat_rows[j].cos().max(1e-6);
            v / (radius * c)
        } else {
            v / radius
        }
    })
}

fn bilinear_vector(field: &Field2, lon0: f64, lat0: f64, dx: f64, dy: f64, lambda: f64, theta: f64) -> f64 {
    let rel = (lambda - lon0).rem_euclid(2.0 * PI);
    let fi = rel / dx;
    let k = fi.floor();
    let t = fi - k;
    let fj = (theta - lat0) / dy;
    let l = fj.floor();
    let s = fj - l;
    let (k, l) = (k as isize, l as isize);

    let v00 = field.at_vector(k, l);
    let v10 = field.at_vector(k + 1, l);
    let v01 = field.at_vector(k, l + 1);
    let v11 = field.at_vector(k + 1, l + 1);
    (1.0 - t) * (1.0 - s) * v00 + t * (1.0 - s) * v10 + (1.0 - t) * s * v01 + t * s * v11
}

/// Local spherical-rotation matrix carrying a vector at the departure
/// point into the arrival point's local Cartesian frame (§4.3 step 2).
fn rotate_to_arrival(theta_a: f64, theta_d: f64, delta_lambda: f64, u_d: f64, v_d: f64) -> (f64, f64) {
    let (sa, ca) = theta_a.sin_cos();
    let (sd, cd) = theta_d.sin_cos();
    let (sl, cl) = delta_lambda.sin_cos();
    let d = 1.0 + sa * sd + ca * cd * cl;

    let m11 = (ca * cd + (1.0 + sa * sd) * cl) / d;
    let m12 = (sa + sd) * sl / d;
    let m21 = -m12;
    let m22 = (ca * cd * cl + sa * sd + cl) / d;

    (m11 * u_d + m12 * v_d, m21 * u_d + m22 * v_d)
}

/// Project a midpoint Cartesian displacement `(x, y)` from arrival point
/// `(lambda_a, theta_a)` back onto the unit sphere (§4.3 step 4).
fn project(lambda_a: f64, theta_a: f64, x: f64, y: f64) -> (f64, f64) {
    let (sa, ca) = theta_a.sin_cos();
    let r = (x * x + y * y + 1.0).sqrt();
    let sin_theta_d = ((y * ca + sa) / r).clamp(-1.0, 1.0);
    let theta_d = sin_theta_d.asin();
    let delta_lambda = x.atan2(ca - y * sa);
    (lambda_a + delta_lambda, theta_d)
}

/// Iterate departure points for a single arrival-point type.
///
/// `u_ang`/`v_ang` are the co-located wind components (already converted
/// to angular velocity) on the SAME staggered grid as the arrival points
/// (`lon_table`, `lat_table`). `prev` supplies the previous step's
/// departure points as the fixed-point iteration's first guess; `None`
/// triggers the linear first-guess formula used only on the first ever
/// step (§4.3).
#[allow(clippy::too_many_arguments)]
fn iterate_kind(
    lon_table: &[f64],
    lat_table: &[f64],
    dx: f64,
    dy: f64,
    u_ang: &Field2,
    v_ang: &Field2,
    dt: f64,
    prev: Option<(&Field2, &Field2)>,
) -> (Field2, Field2) {
    let nx = lon_table.len();
    let ny = lat_table.len();
    let mut out_lambda = Field2::zeros(nx, ny);
    let mut out_theta = Field2::zeros(nx, ny);
    let lon0 = lon_table[0];
    let lat0 = lat_table[0];

    for j in 0..ny {
        let theta_a = lat_table[j];
        if theta_a.abs() >= PI / 2.0 - POLAR_EPS {
            for i in 0..nx {
                out_lambda.set(i, j, lon_table[i]);
                out_theta.set(i, j, theta_a);
            }
            continue;
        }
        for i in 0..nx {
            let lambda_a = lon_table[i];
            let u_arr = u_ang.get(i, j);
            let v_arr = v_ang.get(i, j);

            let (mut lambda_d, mut theta_d) = match prev {
                Some((pl, pt)) => (pl.get(i, j), pt.get(i, j)),
                None => project(lambda_a, theta_a, -dt * u_arr, -dt * v_arr),
            };

            for _ in 0..SWEEPS {
                let u_d = bilinear_vector(u_ang, lon0, lat0, dx, dy, lambda_d, theta_d);
                let v_d = bilinear_vector(v_ang, lon0, lat0, dx, dy, lambda_d, theta_d);
                let (u_rot, v_rot) =
                    rotate_to_arrival(theta_a, theta_d, lambda_d - lambda_a, u_d, v_d);
                let x = -dt / 2.0 * (u_arr + u_rot);
                let y = -dt / 2.0 * (v_arr + v_rot);
                let (nl, nt) = project(lambda_a, theta_a, x, y);
                lambda_d = nl;
                theta_d = nt;
            }

            out_lambda.set(i, j, lambda_d.rem_euclid(2.0 * PI));
            out_theta.set(i, j, theta_d.clamp(-PI / 2.0, PI / 2.0));
        }
    }
    (out_lambda, out_theta)
}

/// Run the departure-point iteration at every arrival-point type (§4.3).
pub fn compute_departure_points(
    grid: &Grid,
    u0: &Field2,
    v0: &Field2,
    dt: f64,
    prev: Option<&DeparturePoints>,
) -> DeparturePoints {
    let v0_u = to_angular(&v_to_u(grid, v0), &grid.lat_phi, grid.radius, false);
    let u0_u = to_angular(u0, &grid.lat_phi, grid.radius, true);

    let u0_v = to_angular(&u_to_v(grid, u0), &grid.lat_v, grid.radius, true);
    let v0_v = to_angular(v0, &grid.lat_v, grid.radius, false);

    let u0_phi = to_angular(&u_to_phi(grid, u0), &grid.lat_phi, grid.radius, true);
    let v0_phi = to_angular(&v_to_phi(grid, v0), &grid.lat_phi, grid.radius, false);

    let u0_z = to_angular(&u_to_vorticity(grid, u0), &grid.lat_v, grid.radius, true);
    let v0_z = to_angular(&v_to_vorticity(grid, v0), &grid.lat_v, grid.radius, false);

    let (lambda_u, theta_u) = iterate_kind(
        &grid.lon_u, &grid.lat_phi, grid.dx, grid.dy, &u0_u, &v0_u, dt,
        prev.map(|p| (&p.lambda_u, &p.theta_u)),
    );
    let (lambda_v, theta_v) = iterate_kind(
        &grid.lon_phi, &grid.lat_v, grid.dx, grid.dy, &u0_v, &v0_v, dt,
        prev.map(|p| (&p.lambda_v, &p.theta_v)),
    );
    let (lambda_phi, theta_phi) = iterate_kind(
        &grid.lon_phi, &grid.lat_phi, grid.dx, grid.dy, &u0_phi, &v0_phi, dt,
        prev.map(|p| (&p.lambda_phi, &p.theta_phi)),
    );
    let (lambda_corner, theta_corner) = iterate_kind(
        &grid.lon_u, &grid.lat_v, grid.dx, grid.dy, &u0_z, &v0_z, dt,
        prev.map(|p| (&p.lambda_corner, &p.theta_corner)),
    );

    DeparturePoints {
        lambda_u, theta_u, lambda_v, theta_v, lambda_phi, theta_phi, lambda_corner, theta_corner,
    }
}

fn dist_to_pole(theta: f64, south: bool) -> f64 {
    if south { theta + PI / 2.0 } else { PI / 2.0 - theta }
}

/// Cosine-squared taper weighting the real departure point against the
/// arrival point, `0` at the pole and `1` at the buffer edge (§4.3).
fn taper_weight(theta_arr: f64, south: bool, edge: f64) -> f64 {
    let d = dist_to_pole(theta_arr, south).clamp(0.0, edge);
    (PI / 2.0 * d / edge).sin().powi(2)
}

fn blend_polar(
    lambda_arr: f64,
    theta_arr: f64,
    lambda_d: f64,
    theta_d: f64,
    south: bool,
    edge: f64,
) -> (f64, f64) {
    let w1 = taper_weight(theta_arr, south, edge);
    let r_real = dist_to_pole(theta_d, south);
    let r_arr = dist_to_pole(theta_arr, south);
    let (x_real, y_real) = (r_real * lambda_d.cos(), r_real * lambda_d.sin());
    let (x_arr, y_arr) = (r_arr * lambda_arr.cos(), r_arr * lambda_arr.sin());

    let x = w1 * x_real + (1.0 - w1) * x_arr;
    let y = w1 * y_real + (1.0 - w1) * y_arr;
    let r = (x * x + y * y).sqrt();
    let lambda = y.atan2(x).rem_euclid(2.0 * PI);
    let theta = if south { r - PI / 2.0 } else { PI / 2.0 - r };
    (lambda, theta.clamp(-PI / 2.0, PI / 2.0))
}

/// Buffer width, in rows, for the polar-cap modification (§4.3: "a
/// buffer zone of width 4dy around each pole").
const BUFFER_ROWS: f64 = 4.0;

/// Pull departure points within a `4*dy` buffer of either pole toward
/// their arrival points (§4.3), used only by SLICE. `is_v_kind` pins the
/// exact pole rows of a v-like field to `(lambda_arr, +-pi/2)`.
pub fn modify_polar_cap(
    dy: f64,
    lon_table: &[f64],
    lat_table: &[f64],
    lambda_d: &Field2,
    theta_d: &Field2,
    is_v_kind: bool,
) -> (Field2, Field2) {
    let nx = lon_table.len();
    let ny = lat_table.len();
    let edge = BUFFER_ROWS * dy;
    let mut out_lambda = lambda_d.clone();
    let mut out_theta = theta_d.clone();

    for j in 0..ny {
        let theta_arr = lat_table[j];
        let south_dist = dist_to_pole(theta_arr, true);
        let north_dist = dist_to_pole(theta_arr, false);
        let (south, dist) = if south_dist <= north_dist { (true, south_dist) } else { (false, north_dist) };
        if dist >= edge {
            continue;
        }
        for i in 0..nx {
            if is_v_kind && (j == 0 || j == ny - 1) {
                out_lambda.set(i, j, lon_table[i]);
                out_theta.set(i, j, theta_arr);
                continue;
            }
            let (l, t) = blend_polar(
                lon_table[i], theta_arr, lambda_d.get(i, j), theta_d.get(i, j), south, edge,
            );
            out_lambda.set(i, j, l);
            out_theta.set(i, j, t);
        }
    }
    (out_lambda, out_theta)
}

/// Damp a wind component in the same polar strip used by
/// [`modify_polar_cap`], `u_mod = w1 * u`, to keep the remap and
/// trajectory consistent (§4.3).
pub fn damp_polar_wind(dy: f64, lat_table: &[f64], field: &Field2) -> Field2 {
    let edge = BUFFER_ROWS * dy;
    Field2::from_fn(field.nx(), field.ny(), |i, j| {
        let theta = lat_table[j];
        let south_dist = dist_to_pole(theta, true);
        let north_dist = dist_to_pole(theta, false);
        let (south, dist) = if south_dist <= north_dist { (true, south_dist) } else { (false, north_dist) };
        let w1 = if dist < edge { taper_weight(theta, south, edge) } else { 1.0 };
        w1 * field.get(i, j)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn zero_wind_departure_points_equal_arrival_points() {
        let grid = Grid::new(32, 16, 1.0);
        let u0 = grid.new_u_field();
        let v0 = grid.new_v_field();
        let dp = compute_departure_points(&grid, &u0, &v0, 100.0, None);

        for i in 0..grid.nx {
            for j in 0..grid.ny {
                assert!((dp.lambda_phi.get(i, j) - grid.lon_phi[i]).abs() < 1e-13);
                assert!((dp.theta_phi.get(i, j) - grid.lat_phi[j]).abs() < 1e-13);
            }
        }
    }

    #[test]
    fn modified_points_reduce_to_arrival_at_the_pole_row() {
        let grid = Grid::new(32, 16, 1.0);
        let lambda_d = Field2::from_fn(grid.nx, grid.ny + 1, |i, _| grid.lon_phi[i] + 0.3);
        let theta_d = Field2::from_fn(grid.nx, grid.ny + 1, |_, j| grid.lat_v[j] * 0.9);
        let (lm, th) = modify_polar_cap(
            grid.dy, &grid.lon_phi, &grid.lat_v, &lambda_d, &theta_d, true,
        );
        for i in 0..grid.nx {
            assert!((th.get(i, 0) - (-PI / 2.0)).abs() < 1e-12);
            assert!((lm.get(i, 0) - grid.lon_phi[i]).abs() < 1e-12);
        }
    }
}
