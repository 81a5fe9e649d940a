//! Pluggable initial-condition providers, one per supported `ic` (§6).
//! Each implements [`InitialCondition`]; [`AnyInitialCondition`] is the
//! tagged dispatch enum selected once at startup from the CLI's `ic`
//! argument, in the same style as [`crate::coriolis::AnyCoriolis`].

use crate::error::Error;
use crate::traits::{InitialCondition, Primitive};
use std::f64::consts::PI;

const G: f64 = 9.80665;
const R_EARTH: f64 = 6.3712e6;
const TWO_OMEGA: f64 = 1.45842e-4;

fn cartesian_distance(lambda: f64, theta: f64, lambda0: f64, theta0: f64) -> f64 {
    let (sa, ca) = theta.sin_cos();
    let (sb, cb) = theta0.sin_cos();
    let dlambda = lambda - lambda0;
    // chord length between the two points on the unit sphere.
    let dx = ca * dlambda.cos() - cb;
    let dy = ca * dlambda.sin();
    let dz = sa - sb;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// `ic = 1`: resting uniform geopotential, zero wind.
pub struct Resting {
    pub phi_ref: f64,
}

impl Default for Resting {
    fn default() -> Self {
        Self { phi_ref: 2.94e4 }
    }
}

impl InitialCondition for Resting {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.phi_ref > 0.0, "phi_ref must be positive");
        Ok(())
    }
    fn state_at(&self, _lambda: f64, _theta: f64) -> Primitive {
        Primitive { phi: self.phi_ref, u: 0.0, v: 0.0 }
    }
    fn phi_ref(&self) -> f64 {
        self.phi_ref
    }
}

/// `ic = 2`: Williamson balanced solid-body rotation, `phi_ref = 2.94e4`.
pub struct SolidBodyRotation {
    pub u0: f64,
    pub gh0: f64,
    pub alpha: f64,
}

impl Default for SolidBodyRotation {
    fn default() -> Self {
        Self { u0: 38.61, gh0: 2.94e4, alpha: 0.0 }
    }
}

impl SolidBodyRotation {
    fn balanced(&self, lambda: f64, theta: f64) -> Primitive {
        let (sa, ca) = self.alpha.sin_cos();
        let (st, ct) = theta.sin_cos();
        let cl = lambda.cos();
        let u = self.u0 * (ct * ca + st * cl * sa);
        let v = -self.u0 * lambda.sin() * sa;
        let term = st * ca - ct * cl * sa;
        let phi = self.gh0 - (R_EARTH * TWO_OMEGA * self.u0 + self.u0 * self.u0 / 2.0) * term * term;
        Primitive { phi, u, v }
    }
}

impl InitialCondition for SolidBodyRotation {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.gh0 > 0.0, "gh0 must be positive");
        Ok(())
    }
    fn state_at(&self, lambda: f64, theta: f64) -> Primitive {
        self.balanced(lambda, theta)
    }
    fn phi_ref(&self) -> f64 {
        self.gh0
    }
}

/// `ic = 5`: mountain test case, balanced flow over a Gaussian hill at
/// `(3*pi/2 + pi/4, pi/6)` (§6).
pub struct Mountain {
    background: SolidBodyRotation,
    pub hill_height: f64,
    pub center: (f64, f64),
}

impl Default for Mountain {
    fn default() -> Self {
        Self {
            background: SolidBodyRotation { u0: 20.0, gh0: 5960.0 * G, alpha: 0.0 },
            hill_height: 2000.0 * G,
            center: (3.0 * PI / 2.0 + PI / 4.0, PI / 6.0),
        }
    }
}

impl InitialCondition for Mountain {
    fn validate(&self) -> anyhow::Result<()> {
        self.background.validate()
    }
    fn state_at(&self, lambda: f64, theta: f64) -> Primitive {
        self.background.state_at(lambda, theta)
    }
    fn orography_at(&self, lambda: f64, theta: f64) -> f64 {
        let d = cartesian_distance(lambda, theta, self.center.0, self.center.1);
        self.hill_height * (-(10.0 * d).powi(2)).exp()
    }
    fn phi_ref(&self) -> f64 {
        self.background.phi_ref()
    }
}

/// `ic = 6`: Rossby-Haurwitz wavenumber-4 wave.
pub struct RossbyHaurwitz {
    pub omega0: f64,
    pub k: f64,
    pub r: f64,
    pub gh0: f64,
}

impl Default for RossbyHaurwitz {
    fn default() -> Self {
        Self { omega0: 7.848e-6, k: 7.848e-6, r: 4.0, gh0: 8000.0 * G }
    }
}

impl RossbyHaurwitz {
    fn a_of(&self, theta: f64) -> f64 {
        let c2 = theta.cos().powi(2);
        let cr = theta.cos().powi(self.r as i32 * 2);
        self.omega0 / 2.0 * (TWO_OMEGA + self.omega0) * c2
            + 0.25 * self.k * self.k * cr
                * ((self.r + 1.0) * c2 + (2.0 * self.r * self.r - self.r - 2.0)
                    - 2.0 * self.r * self.r / c2.max(1e-12))
    }

    fn b_of(&self, theta: f64) -> f64 {
        let cr = theta.cos().powi(self.r as i32);
        (TWO_OMEGA + self.omega0) * self.k / ((self.r + 1.0) * (self.r + 2.0))
            * cr
            * (self.r * self.r + 2.0 * self.r + 2.0 - (self.r + 1.0).powi(2) * theta.cos().powi(2))
    }

    fn c_of(&self, theta: f64) -> f64 {
        let c2 = theta.cos().powi(2);
        let cr = theta.cos().powi(self.r as i32 * 2);
        0.25 * self.k * self.k * cr * ((self.r + 1.0) * c2 - (self.r + 2.0))
    }
}

impl InitialCondition for RossbyHaurwitz {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.r >= 1.0, "wavenumber must be >= 1");
        Ok(())
    }
    fn state_at(&self, lambda: f64, theta: f64) -> Primitive {
        let (st, ct) = theta.sin_cos();
        let rl = self.r * lambda;
        let u = R_EARTH * self.omega0 * ct
            + R_EARTH * self.k * ct.powi(self.r as i32 - 1) * (self.r * st * st - ct * ct) * rl.cos();
        let v = -R_EARTH * self.k * self.r * ct.powi(self.r as i32 - 1) * st * rl.sin();
        let phi = self.gh0
            + R_EARTH * R_EARTH
                * (self.a_of(theta) + self.b_of(theta) * rl.cos() + self.c_of(theta) * (2.0 * rl).cos());
        Primitive { phi, u, v }
    }
    fn phi_ref(&self) -> f64 {
        self.gh0
    }
}

/// `ic = 7`: Galewsky barotropically unstable jet with a localized
/// geopotential perturbation (§6). The balanced height profile is
/// obtained by numerically integrating gradient-wind balance along a
/// meridian once at construction.
pub struct GalewskyJet {
    u_max: f64,
    theta0: f64,
    theta1: f64,
    gh0: f64,
    profile: Vec<f64>,
    n_profile: usize,
}

impl Default for GalewskyJet {
    fn default() -> Self {
        let mut model = Self {
            u_max: 80.0,
            theta0: PI / 7.0,
            theta1: PI / 2.0 - PI / 7.0,
            gh0: 10000.0 * G,
            profile: Vec::new(),
            n_profile: 2001,
        };
        model.profile = model.integrate_balance();
        model
    }
}

impl GalewskyJet {
    fn jet_u(&self, theta: f64) -> f64 {
        if theta <= self.theta0 || theta >= self.theta1 {
            0.0
        } else {
            let en = (-4.0 / (self.theta1 - self.theta0).powi(2)).exp();
            (self.u_max / en) * ((self.theta0 - theta) * (theta - self.theta1)).recip().exp()
        }
    }

    fn integrate_balance(&self) -> Vec<f64> {
        let n = self.n_profile;
        let mut phi = vec![0.0; n];
        let dtheta = PI / (n as f64 - 1.0);
        for i in 1..n {
            let theta = -PI / 2.0 + i as f64 * dtheta;
            let u_mid = self.jet_u(theta - 0.5 * dtheta);
            let dphi_dtheta = -R_EARTH * u_mid * (TWO_OMEGA * (theta - 0.5 * dtheta).sin() + u_mid * (theta - 0.5 * dtheta).tan() / R_EARTH);
            phi[i] = phi[i - 1] + dphi_dtheta * dtheta;
        }
        phi
    }

    fn balanced_phi(&self, theta: f64) -> f64 {
        let n = self.n_profile;
        let dtheta = PI / (n as f64 - 1.0);
        let t = (theta + PI / 2.0) / dtheta;
        let k = (t.floor() as usize).min(n - 2);
        let frac = t - k as f64;
        self.profile[k] * (1.0 - frac) + self.profile[k + 1] * frac
    }
}

impl InitialCondition for GalewskyJet {
    fn validate(&self) -> anyhow::Result<()> {
        Ok(())
    }
    fn state_at(&self, lambda: f64, theta: f64) -> Primitive {
        let u = self.jet_u(theta);
        let alpha = 1.0 / 3.0;
        let beta = 1.0 / 15.0;
        let h_pert = 120.0 * G;
        let pert = h_pert * theta.cos()
            * (-(lambda / alpha).powi(2)).exp()
            * (-((PI / 4.0 - theta) / beta).powi(2)).exp();
        let phi = self.gh0 + self.balanced_phi(theta) + pert;
        Primitive { phi, u, v: 0.0 }
    }
    fn phi_ref(&self) -> f64 {
        self.gh0
    }
}

/// `ic = 8`: Hollingsworth analysis — a balanced resting atmosphere over
/// synthetic, small-scale orography that excites grid-scale
/// computational noise if the Coriolis discretization is unstable.
pub struct Hollingsworth {
    pub phi_ref: f64,
    pub hill_amplitude: f64,
    pub wavenumber: f64,
}

impl Default for Hollingsworth {
    fn default() -> Self {
        Self { phi_ref: 2.94e4, hill_amplitude: 100.0 * G, wavenumber: 16.0 }
    }
}

impl InitialCondition for Hollingsworth {
    fn validate(&self) -> anyhow::Result<()> {
        Ok(())
    }
    fn state_at(&self, _lambda: f64, _theta: f64) -> Primitive {
        Primitive { phi: self.phi_ref, u: 0.0, v: 0.0 }
    }
    fn orography_at(&self, lambda: f64, theta: f64) -> f64 {
        self.hill_amplitude * (self.wavenumber * lambda).sin() * theta.cos().powi(2)
    }
    fn phi_ref(&self) -> f64 {
        self.phi_ref
    }
}

/// `ic = 9`: divergent flow test (`2*Omega = 0`, set by the caller).
pub struct DivergentFlow {
    pub u0: f64,
    pub phi_ref: f64,
}

impl Default for DivergentFlow {
    fn default() -> Self {
        Self { u0: 40.0, phi_ref: 2.94e4 }
    }
}

impl InitialCondition for DivergentFlow {
    fn validate(&self) -> anyhow::Result<()> {
        Ok(())
    }
    fn state_at(&self, lambda: f64, theta: f64) -> Primitive {
        let half = (lambda / 2.0).sin().powi(2);
        let u = -self.u0 * half * (2.0 * theta).sin() * theta.cos();
        let v = 0.5 * self.u0 * lambda.sin() * theta.cos().powi(3);
        Primitive { phi: self.phi_ref, u, v }
    }
    fn phi_ref(&self) -> f64 {
        self.phi_ref
    }
}

/// `ic = 105`: Gaussian-hill advection test under solid-body rotation.
pub struct GaussianHillAdvection {
    background: SolidBodyRotation,
    pub bump_amplitude: f64,
    pub bump_radius: f64,
    pub center: (f64, f64),
}

impl Default for GaussianHillAdvection {
    fn default() -> Self {
        Self {
            background: SolidBodyRotation { u0: 38.61, gh0: 2.94e4, alpha: PI / 4.0 },
            bump_amplitude: 1000.0 * G,
            bump_radius: 1.0 / 3.0,
            center: (0.0, 0.0),
        }
    }
}

impl InitialCondition for GaussianHillAdvection {
    fn validate(&self) -> anyhow::Result<()> {
        self.background.validate()
    }
    fn state_at(&self, lambda: f64, theta: f64) -> Primitive {
        let mut p = self.background.state_at(lambda, theta);
        let d = cartesian_distance(lambda, theta, self.center.0, self.center.1);
        p.phi += self.bump_amplitude * (-(d / self.bump_radius).powi(2)).exp();
        p
    }
    fn phi_ref(&self) -> f64 {
        self.background.phi_ref()
    }
}

/// Tagged choice of initial condition, selected once at startup from the
/// CLI's `ic` argument.
pub enum AnyInitialCondition {
    Resting(Resting),
    SolidBodyRotation(SolidBodyRotation),
    Mountain(Mountain),
    RossbyHaurwitz(RossbyHaurwitz),
    GalewskyJet(Box<GalewskyJet>),
    Hollingsworth(Hollingsworth),
    DivergentFlow(DivergentFlow),
    GaussianHillAdvection(GaussianHillAdvection),
}

impl AnyInitialCondition {
    pub fn for_case(ic: i64) -> Result<Self, Error> {
        match ic {
            1 => Ok(AnyInitialCondition::Resting(Resting::default())),
            2 => Ok(AnyInitialCondition::SolidBodyRotation(SolidBodyRotation::default())),
            5 => Ok(AnyInitialCondition::Mountain(Mountain::default())),
            6 => Ok(AnyInitialCondition::RossbyHaurwitz(RossbyHaurwitz::default())),
            7 => Ok(AnyInitialCondition::GalewskyJet(Box::new(GalewskyJet::default()))),
            8 => Ok(AnyInitialCondition::Hollingsworth(Hollingsworth::default())),
            9 => Ok(AnyInitialCondition::DivergentFlow(DivergentFlow::default())),
            105 => Ok(AnyInitialCondition::GaussianHillAdvection(GaussianHillAdvection::default())),
            other => Err(Error::UnknownInitialCondition(other)),
        }
    }

    /// `2*Omega` for this case; zero only for `ic=9` (§6).
    pub fn two_omega(&self) -> f64 {
        match self {
            AnyInitialCondition::DivergentFlow(_) => 0.0,
            _ => TWO_OMEGA,
        }
    }
}

impl InitialCondition for AnyInitialCondition {
    fn validate(&self) -> anyhow::Result<()> {
        match self {
            AnyInitialCondition::Resting(m) => m.validate(),
            AnyInitialCondition::SolidBodyRotation(m) => m.validate(),
            AnyInitialCondition::Mountain(m) => m.validate(),
            AnyInitialCondition::RossbyHaurwitz(m) => m.validate(),
            AnyInitialCondition::GalewskyJet(m) => m.validate(),
            AnyInitialCondition::Hollingsworth(m) => m.validate(),
            AnyInitialCondition::DivergentFlow(m) => m.validate(),
            AnyInitialCondition::GaussianHillAdvection(m) => m.validate(),
        }
    }
    fn state_at(&self, lambda: f64, theta: f64) -> Primitive {
        match self {
            AnyInitialCondition::Resting(m) => m.state_at(lambda, theta),
            AnyInitialCondition::SolidBodyRotation(m) => m.state_at(lambda, theta),
            AnyInitialCondition::Mountain(m) => m.state_at(lambda, theta),
            AnyInitialCondition::RossbyHaurwitz(m) => m.state_at(lambda, theta),
            AnyInitialCondition::GalewskyJet(m) => m.state_at(lambda, theta),
            AnyInitialCondition::Hollingsworth(m) => m.state_at(lambda, theta),
            AnyInitialCondition::DivergentFlow(m) => m.state_at(lambda, theta),
            AnyInitialCondition::GaussianHillAdvection(m) => m.state_at(lambda, theta),
        }
    }
    fn orography_at(&self, lambda: f64, theta: f64) -> f64 {
        match self {
            AnyInitialCondition::Mountain(m) => m.orography_at(lambda, theta),
            AnyInitialCondition::Hollingsworth(m) => m.orography_at(lambda, theta),
            _ => 0.0,
        }
    }
    fn phi_ref(&self) -> f64 {
        match self {
            AnyInitialCondition::Resting(m) => m.phi_ref(),
            AnyInitialCondition::SolidBodyRotation(m) => m.phi_ref(),
            AnyInitialCondition::Mountain(m) => m.phi_ref(),
            AnyInitialCondition::RossbyHaurwitz(m) => m.phi_ref(),
            AnyInitialCondition::GalewskyJet(m) => m.phi_ref(),
            AnyInitialCondition::Hollingsworth(m) => m.phi_ref(),
            AnyInitialCondition::DivergentFlow(m) => m.phi_ref(),
            AnyInitialCondition::GaussianHillAdvection(m) => m.phi_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_ic_is_an_error() {
        assert!(AnyInitialCondition::for_case(3).is_err());
    }

    #[test]
    fn divergent_flow_has_zero_two_omega() {
        let m = AnyInitialCondition::for_case(9).unwrap();
        assert_eq!(m.two_omega(), 0.0);
        let m2 = AnyInitialCondition::for_case(2).unwrap();
        assert!(m2.two_omega() > 0.0);
    }

    #[test]
    fn solid_body_rotation_is_symmetric_about_alpha_zero() {
        let m = SolidBodyRotation::default();
        let p1 = m.state_at(0.3, 0.2);
        let p2 = m.state_at(0.3, -0.2);
        // with alpha=0 the flow is purely zonal, symmetric about the equator.
        assert!((p1.v - 0.0).abs() < 1e-9);
        assert!((p2.v - 0.0).abs() < 1e-9);
    }

    #[test]
    fn galewsky_jet_vanishes_outside_the_band() {
        let m = GalewskyJet::default();
        assert_eq!(m.jet_u(0.0), 0.0);
        assert!(m.jet_u(0.6) > 0.0);
    }
}
