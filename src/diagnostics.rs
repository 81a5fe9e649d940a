//! Scalar diagnostics computed once per output interval: conserved
//! quantities and error norms against a reference state (§8's testable
//! properties).

use crate::average::{phi_to_vorticity, u_to_vorticity, v_to_vorticity};
use crate::grid::{Field2, Grid};
use crate::state::State;

/// Total mass `sum_{i,j} A[j] * phi[i,j]`, which the fully-implicit step
/// should conserve to round-off (§3's invariant, §8).
pub fn mass(grid: &Grid, phi: &Field2) -> f64 {
    let mut total = 0.0;
    for j in 0..grid.ny {
        let mut row = 0.0;
        for i in 0..grid.nx {
            row += phi.get(i, j);
        }
        total += row * grid.area[j];
    }
    total
}

/// Discrete relative vector `L2` norm of `(u - u_ref, v - v_ref)`, weighted
/// by cell area (phi-point co-location of both components).
pub fn velocity_error_l2(grid: &Grid, u: &Field2, v: &Field2, u_ref: &Field2, v_ref: &Field2) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for j in 0..grid.ny {
        for i in 0..grid.nx {
            let du = u.get(i, j) - u_ref.get(i, j);
            let dv = v.get(i, j) - v_ref.get(i, j);
            let ru = u_ref.get(i, j);
            let rv = v_ref.get(i, j);
            num += grid.area[j] * (du * du + dv * dv);
            den += grid.area[j] * (ru * ru + rv * rv);
        }
    }
    if den > 0.0 { (num / den).sqrt() } else { num.sqrt() }
}

/// Infinity-norm height error `max |h - h_ref| / g`, used for steady-state
/// cases (TC2, TC5) where the analytic solution is known for all time.
pub fn height_error_linf(phi: &Field2, phi_ref: &Field2, g: f64) -> f64 {
    let mut worst: f64 = 0.0;
    for j in 0..phi.ny() {
        for i in 0..phi.nx() {
            let d = (phi.get(i, j) - phi_ref.get(i, j)).abs() / g;
            worst = worst.max(d);
        }
    }
    worst
}

/// Relative vorticity at grid corners: `zeta = dv/dx - du/dy + f`'s
/// rotational part (the planetary term is added by the caller via
/// `two_omega * sin(lat_v)`), built from centered differences of the
/// C-grid velocity components.
pub fn relative_vorticity(grid: &Grid, u: &Field2, v: &Field2) -> Field2 {
    let mut zeta = grid.new_v_field();
    for j in 0..=grid.ny {
        for i in 0..grid.nx {
            let im1 = if i == 0 { grid.nx - 1 } else { i - 1 };
            let dv_dx = (v.get(i, j) - v.get(im1, j)) / grid.dx;
            let du_dy = if j == 0 || j == grid.ny {
                0.0 // undefined at the pole corner row
            } else {
                (u.get(i, j) - u.get(i, j - 1)) / grid.dy
            };
            let cos_v = grid.cos_v[j].max(1e-6);
            zeta.set(i, j, (dv_dx - du_dy) / cos_v / grid.radius);
        }
    }
    zeta
}

/// Potential vorticity `q = (zeta + f) / h`, `h = phi / g` at vorticity
/// points via averaged depth.
pub fn potential_vorticity(grid: &Grid, u: &Field2, v: &Field2, phi: &Field2, two_omega: f64, g: f64) -> Field2 {
    let zeta = relative_vorticity(grid, u, v);
    let depth = phi_to_vorticity(grid, phi);
    let mut q = grid.new_v_field();
    for j in 0..=grid.ny {
        let f = two_omega * grid.sin_v[j];
        for i in 0..grid.nx {
            let h = depth.get(i, j) / g;
            q.set(i, j, (zeta.get(i, j) + f) / h.max(1e-6));
        }
    }
    q
}

/// `(u, v)` recombined onto vorticity points, used only for diagnostic
/// dumps that want a single co-located wind field (§6's dump contents).
pub fn wind_at_vorticity(grid: &Grid, u: &Field2, v: &Field2) -> (Field2, Field2) {
    (u_to_vorticity(grid, u), v_to_vorticity(grid, v))
}

/// Instability probe used alongside [`crate::scheme::StepOutcome`]: true if
/// any field holds a non-finite value, which the driver treats the same as
/// an exceeded `max_delta_u` threshold (§4.8, §6's `ic=8` early-exit).
pub fn has_non_finite(state: &State) -> bool {
    let check = |f: &Field2| -> bool {
        for j in 0..f.ny() {
            for i in 0..f.nx() {
                if !f.get(i, j).is_finite() {
                    return true;
                }
            }
        }
        false
    };
    check(&state.phi) || check(&state.u) || check(&state.v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_of_a_uniform_field_matches_total_area_times_value() {
        let grid = Grid::new(32, 16, 1.0);
        let mut phi = grid.new_phi_field();
        phi.fill(3.0);
        let expected = 3.0 * grid.total_area();
        assert!((mass(&grid, &phi) - expected).abs() < 1e-8);
    }

    #[test]
    fn velocity_error_is_zero_against_itself() {
        let grid = Grid::new(32, 16, 1.0);
        let u = grid.new_u_field();
        let v = grid.new_v_field();
        assert_eq!(velocity_error_l2(&grid, &u, &v, &u, &v), 0.0);
    }

    #[test]
    fn height_error_is_zero_against_itself() {
        let grid = Grid::new(32, 16, 1.0);
        let phi = grid.new_phi_field();
        assert_eq!(height_error_linf(&phi, &phi, 9.80665), 0.0);
    }
}
