//! Fully-implicit outer/inner iteration time-step driver (§4.8).

use crate::average::reconstruct_polar_v;
use crate::departure::{compute_departure_points, damp_polar_wind, modify_polar_cap, DeparturePoints};
use crate::error::{Error, Result};
use crate::grid::{Field2, Grid};
use crate::interp::{interpolate_scalar, interpolate_vector, PointKind};
use crate::multigrid::{Multigrid, RelaxMode};
use crate::slice::{self, AreaState};
use crate::state::State;
use crate::traits::CoriolisScheme;
use serde::{Deserialize, Serialize};

/// How the geopotential is advected between time levels (§4.8, §9:
/// "one tagged variant choosing the phi-advection path").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvectionScheme {
    /// Pure semi-Lagrangian interpolation of the phi residual.
    SemiLagrangian,
    /// SLICE conservative remap.
    Slice,
    /// SLICE inside the polar caps blended with semi-Lagrangian outside.
    Hybrid,
}

impl AdvectionScheme {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "sl" | "semi_lagrangian" => Ok(AdvectionScheme::SemiLagrangian),
            "slice" => Ok(AdvectionScheme::Slice),
            "hybrid" => Ok(AdvectionScheme::Hybrid),
            other => Err(Error::UnknownScheme(other.to_string())),
        }
    }

    fn uses_slice(self) -> bool {
        matches!(self, AdvectionScheme::Slice | AdvectionScheme::Hybrid)
    }
}

/// Parameters fixed for the lifetime of a run: physical constants, the
/// chosen Coriolis/advection schemes, and the outer/inner iteration
/// counts (§4.8, §9: "a single context struct").
pub struct Scheme<C: CoriolisScheme> {
    pub coriolis: C,
    pub advection: AdvectionScheme,
    pub two_omega: f64,
    pub phi_ref: f64,
    pub dt: f64,
    /// Off-centering parameter, `dt/2` (centred) by default (§4.8).
    pub alpha: f64,
    pub outer_iters: usize,
    pub inner_iters: usize,
    pub relax_mode: RelaxMode,

    multigrid: Multigrid,
    area_state: AreaState,
    prev_departure: Option<DeparturePoints>,
}

/// Outcome of a single step (§7: `ic=8`'s instability check is reported
/// to the caller rather than panicking).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    Advanced,
    Unstable { max_delta_u: f64 },
}

impl<C: CoriolisScheme> Scheme<C> {
    pub fn new(
        grid: &Grid,
        coriolis: C,
        advection: AdvectionScheme,
        two_omega: f64,
        phi_ref: f64,
        dt: f64,
        alpha: f64,
        outer_iters: usize,
        inner_iters: usize,
        relax_mode: RelaxMode,
    ) -> Result<Self> {
        if advection.uses_slice() && (alpha - dt / 2.0).abs() > 1e-12 {
            return Err(Error::SliceRequiresCentred);
        }
        Ok(Self {
            coriolis,
            advection,
            two_omega,
            phi_ref,
            dt,
            alpha,
            outer_iters,
            inner_iters,
            relax_mode,
            multigrid: Multigrid::new(grid),
            area_state: AreaState::new(grid),
            prev_departure: None,
        })
    }

    /// `nu = 1/(alpha*dt^2*phi_ref)` for the Helmholtz operator (§4.7).
    fn nu(&self) -> f64 {
        1.0 / (self.alpha * self.dt * self.dt * self.phi_ref)
    }

    fn divergence(&self, grid: &Grid, u: &Field2, v: &Field2) -> Field2 {
        Field2::from_fn(grid.nx, grid.ny, |i, j| {
            let im1 = if i == 0 { grid.nx - 1 } else { i - 1 };
            let du_dx = (u.get(i + 1, j) - u.get(im1 + 1, j)) / grid.dx / grid.cos_phi[j] / grid.radius;
            let dv_dy = (v.get(i, j + 1) * grid.cos_v[j + 1] - v.get(i, j) * grid.cos_v[j])
                / grid.dy
                / grid.cos_phi[j]
                / grid.radius;
            du_dx + dv_dy
        })
    }

    /// Zonal gradient of a phi-point field at u-points (§4.8).
    fn grad_u(&self, grid: &Grid, phi: &Field2) -> Field2 {
        Field2::from_fn(grid.nx, grid.ny, |i, j| {
            let im1 = if i == 0 { grid.nx - 1 } else { i - 1 };
            (phi.get(i, j) - phi.get(im1, j)) / (grid.dx * grid.cos_phi[j] * grid.radius)
        })
    }

    /// Meridional gradient of a phi-point field at v-points (§4.8).
    fn grad_v(&self, grid: &Grid, phi: &Field2) -> Field2 {
        let mut out = grid.new_v_field();
        for j in 1..grid.ny {
            for i in 0..grid.nx {
                out.set(i, j, (phi.get(i, j) - phi.get(i, j - 1)) / (grid.dy * grid.radius));
            }
        }
        out
    }

    /// Advance the state by one full time step (§4.8).
    pub fn step(&mut self, grid: &Grid, state: &mut State) -> StepOutcome {
        let dt = self.dt;
        let alpha = self.alpha;

        // `apply` returns (f*v_bar at u-points, f*u_bar at v-points) — the
        // terms entering the u- and v-momentum equations respectively.
        let (cor_u0, cor_v0) = self.coriolis.apply(grid, &state.u0, &state.v0, &state.phi0, self.two_omega);
        let grad_phi0_x = self.grad_u(grid, &Field2::from_fn(grid.nx, grid.ny, |i, j| {
            state.phi0.get(i, j) + state.phi_s.get(i, j)
        }));
        let grad_phi0_y = self.grad_v(grid, &Field2::from_fn(grid.nx, grid.ny, |i, j| {
            state.phi0.get(i, j) + state.phi_s.get(i, j)
        }));

        // Explicit weight on the current-level residual, `b = 1 - alpha/dt`.
        let b_coeff = 1.0 - alpha / dt;

        let mut ru0 = grid.new_u_field();
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                ru0.set(i, j, state.u0.get(i, j) - b_coeff * dt * (grad_phi0_x.get(i, j) - cor_u0.get(i, j)));
            }
        }
        let mut rv0 = grid.new_v_field();
        for j in 1..grid.ny {
            for i in 0..grid.nx {
                rv0.set(i, j, state.v0.get(i, j) - b_coeff * dt * (grad_phi0_y.get(i, j) + cor_v0.get(i, j)));
            }
        }

        let div0 = self.divergence(grid, &state.u0, &state.v0);
        let mut rphi0 = grid.new_phi_field();
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                rphi0.set(i, j, state.phi0.get(i, j) * (1.0 - b_coeff * dt * div0.get(i, j)));
            }
        }

        let mut dp = compute_departure_points(grid, &state.u0, &state.v0, dt, self.prev_departure.as_ref());

        let grad_phis_u = self.grad_u(grid, &state.phi_s);
        let grad_phis_v = self.grad_v(grid, &state.phi_s);

        let mut rud = grid.new_u_field();
        let mut rvd = grid.new_v_field();
        let mut rphid = grid.new_phi_field();

        for _outer in 0..self.outer_iters {
            if _outer > 0 {
                dp = compute_departure_points(grid, &state.u0, &state.v0, dt, Some(&dp));
            }

            for j in 0..grid.ny {
                for i in 0..grid.nx {
                    let lambda = dp.lambda_u.get(i, j);
                    let theta = dp.theta_u.get(i, j);
                    let rud_val = interpolate_vector(&ru0, grid, PointKind::U, lambda, theta);
                    rud.set(i, j, rud_val - alpha * dt * grad_phis_u.get(i, j));
                }
            }
            for j in 1..grid.ny {
                for i in 0..grid.nx {
                    let lambda = dp.lambda_v.get(i, j);
                    let theta = dp.theta_v.get(i, j);
                    let rvd_val = interpolate_vector(&rv0, grid, PointKind::V, lambda, theta);
                    rvd.set(i, j, rvd_val - alpha * dt * grad_phis_v.get(i, j));
                }
            }

            match self.advection {
                AdvectionScheme::SemiLagrangian => {
                    for j in 0..grid.ny {
                        for i in 0..grid.nx {
                            let lambda = dp.lambda_phi.get(i, j);
                            let theta = dp.theta_phi.get(i, j);
                            rphid.set(i, j, interpolate_scalar(&rphi0, grid, PointKind::Phi, lambda, theta));
                        }
                    }
                }
                AdvectionScheme::Slice | AdvectionScheme::Hybrid => {
                    let (lambda_mod, theta_mod) =
                        modify_polar_cap(grid.dy, &grid.lon_phi, &grid.lat_v, &dp.lambda_v, &dp.theta_v, true);
                    let mut dp_mod = dp.clone();
                    dp_mod.lambda_v = lambda_mod;
                    dp_mod.theta_v = theta_mod;

                    let slice_est = slice::remap(grid, &rphi0, &dp_mod);

                    if self.advection == AdvectionScheme::Hybrid {
                        let mut sl_est = grid.new_phi_field();
                        for j in 0..grid.ny {
                            for i in 0..grid.nx {
                                let lambda = dp.lambda_phi.get(i, j);
                                let theta = dp.theta_phi.get(i, j);
                                sl_est.set(i, j, interpolate_scalar(&rphi0, grid, PointKind::Phi, lambda, theta));
                            }
                        }
                        rphid = slice::merge_polar(grid, &slice_est, &sl_est);
                    } else {
                        rphid = slice_est;
                    }

                    let u0_damped = damp_polar_wind(grid.dy, &grid.lat_phi, &state.u0);
                    let v0_damped = damp_polar_wind(grid.dy, &grid.lat_v, &state.v0);
                    let div_mod = self.divergence(grid, &u0_damped, &v0_damped);
                    self.area_state.evolve(grid, &div_mod, &div0, dt);
                }
            }
        }

        for _inner in 0..self.inner_iters {
            let (cor_u, cor_v) = self.coriolis.apply(grid, &state.u, &state.v, &state.phi, self.two_omega);

            let mut ru = grid.new_u_field();
            for j in 0..grid.ny {
                for i in 0..grid.nx {
                    ru.set(i, j, rud.get(i, j) + alpha * dt * cor_u.get(i, j));
                }
            }
            let mut rv = grid.new_v_field();
            for j in 1..grid.ny {
                for i in 0..grid.nx {
                    rv.set(i, j, rvd.get(i, j) - alpha * dt * cor_v.get(i, j));
                }
            }

            let div_r = self.divergence(grid, &ru, &rv);
            let mut rhs = grid.new_phi_field();
            for j in 0..grid.ny {
                for i in 0..grid.nx {
                    rhs.set(i, j, rphid.get(i, j) - self.phi_ref * alpha * dt * div_r.get(i, j));
                }
            }

            let nu = self.nu();
            let phi_new = self.multigrid.solve(&rhs, nu, self.relax_mode);

            let grad_phi_u = self.grad_u(grid, &phi_new);
            let grad_phi_v = self.grad_v(grid, &phi_new);
            let mut u_new = grid.new_u_field();
            for j in 0..grid.ny {
                for i in 0..grid.nx {
                    u_new.set(i, j, ru.get(i, j) - alpha * dt * grad_phi_u.get(i, j));
                }
            }
            let mut v_new = grid.new_v_field();
            for j in 1..grid.ny {
                for i in 0..grid.nx {
                    v_new.set(i, j, rv.get(i, j) - alpha * dt * grad_phi_v.get(i, j));
                }
            }
            reconstruct_polar_v(grid, &u_new, &mut v_new);

            state.phi = phi_new;
            state.u = u_new;
            state.v = v_new;
        }

        self.prev_departure = Some(dp);

        let mut max_delta_u = 0.0f64;
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                max_delta_u = max_delta_u.max((state.u.get(i, j) - state.u0.get(i, j)).abs());
            }
        }
        state.advance_time_level(dt);

        if max_delta_u > 10.0 {
            StepOutcome::Unstable { max_delta_u }
        } else {
            StepOutcome::Advanced
        }
    }
}
