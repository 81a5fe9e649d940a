//! Capability interfaces the driver dispatches against, named the way the
//! teacher exposes `Hydrodynamics`/`InitialModel`: a trait per swappable
//! concern, selected once at construction (§9).

use crate::grid::{Field2, Grid};

/// A single point's state as returned by an initial-condition provider:
/// geopotential and the two velocity components (§6).
#[derive(Copy, Clone, Debug, Default)]
pub struct Primitive {
    pub phi: f64,
    pub u: f64,
    pub v: f64,
}

/// A pluggable initial-condition provider (§6: ic in {1,2,5,6,7,8,9,105}).
/// Orography is supplied separately since it is static and test-case
/// specific (only the mountain and Hollingsworth cases use a nonzero
/// field).
pub trait InitialCondition {
    fn validate(&self) -> anyhow::Result<()>;
    fn state_at(&self, lambda: f64, theta: f64) -> Primitive;
    fn orography_at(&self, _lambda: f64, _theta: f64) -> f64 {
        0.0
    }
    /// Reference geopotential used by the Helmholtz solver's `nu`
    /// coefficient (§4.7); test-case specific (e.g. 2.94e4 for TC2).
    fn phi_ref(&self) -> f64;
}

/// One of the three energy-consistent Coriolis discretizations (§4.6).
/// `fu`/`fv` are returned on the u-/v-point grids respectively; every
/// implementation must zero `fu` at the polar v-rows (there is no v-point
/// pole analog, momentum residuals are formed on u directly).
pub trait CoriolisScheme {
    fn apply(&self, grid: &Grid, u: &Field2, v: &Field2, phi: &Field2, two_omega: f64) -> (Field2, Field2);
}
