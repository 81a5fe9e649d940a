//! Prognostic state: phi, u, v at the current and previous time levels,
//! plus the static orography field (§3).

use crate::average::reconstruct_polar_v;
use crate::grid::{Field2, Grid};
use crate::traits::InitialCondition;

/// The full prognostic state, held at two time levels per §3's lifecycle
/// description: `*0` is the previous step, the un-suffixed copy is the
/// current iterate.
pub struct State {
    pub time: f64,
    pub iteration: u64,

    pub phi0: Field2,
    pub u0: Field2,
    pub v0: Field2,

    pub phi: Field2,
    pub u: Field2,
    pub v: Field2,

    /// Static orography, scaled by `g` (phi_s).
    pub phi_s: Field2,
}

impl State {
    /// Build the initial state by sampling `ic` at every staggered grid
    /// point, then reconstructing the polar v-rows per §4.2.
    pub fn from_initial_condition(grid: &Grid, ic: &dyn InitialCondition) -> Self {
        let phi = Field2::from_fn(grid.nx, grid.ny, |i, j| {
            ic.state_at(grid.lon_phi[i], grid.lat_phi[j]).phi
        });
        let u = Field2::from_fn(grid.nx, grid.ny, |i, j| {
            ic.state_at(grid.lon_u[i], grid.lat_phi[j]).u
        });
        let mut v = Field2::from_fn(grid.nx, grid.ny + 1, |i, j| {
            ic.state_at(grid.lon_phi[i], grid.lat_v[j]).v
        });
        reconstruct_polar_v(grid, &u, &mut v);

        let phi_s = Field2::from_fn(grid.nx, grid.ny, |i, j| {
            ic.orography_at(grid.lon_phi[i], grid.lat_phi[j])
        });

        // Keep the two time levels consistent with the invariant that
        // polar v is reconstructed, never independently set.
        let phi0 = phi.clone();
        let u0 = u.clone();
        let v0 = v.clone();

        Self { time: 0.0, iteration: 0, phi0, u0, v0, phi, u, v, phi_s }
    }

    /// Copy the current iterate into the `*0` slot, as the step driver
    /// does at the end of every time step (§3's lifecycle).
    pub fn advance_time_level(&mut self, dt: f64) {
        self.phi0 = self.phi.clone();
        self.u0 = self.u.clone();
        self.v0 = self.v.clone();
        self.time += dt;
        self.iteration += 1;
    }
}
