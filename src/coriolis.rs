//! Three interchangeable, energy-consistent Coriolis discretizations
//! (§4.6), selected once at construction via [`AnyCoriolis`].

use crate::average::{
    phi_to_u, phi_to_v, phi_to_vorticity, u_to_v, u_to_vorticity, v_to_u, v_to_vorticity,
    vorticity_to_u, vorticity_to_v,
};
use crate::grid::{Field2, Grid};
use crate::traits::CoriolisScheme;
use serde::{Deserialize, Serialize};

/// Planetary vorticity `f = 2*omega*sin(theta)` at the u-point latitudes,
/// or the rotated-pole geographic latitude when the mesh is rotated.
fn f_at_phi_rows(grid: &Grid, two_omega: f64) -> Vec<f64> {
    match &grid.rotation {
        None => grid.sin_phi.iter().map(|&s| two_omega * s).collect(),
        Some(rot) => (0..grid.ny)
            .map(|j| two_omega * rot.sin_geo_phi[[j, 0]])
            .collect(),
    }
}

fn f_at_v_rows(grid: &Grid, two_omega: f64) -> Vec<f64> {
    match &grid.rotation {
        None => grid.sin_v.iter().map(|&s| two_omega * s).collect(),
        Some(rot) => (0..=grid.ny)
            .map(|j| two_omega * rot.sin_geo_vort[[j, 0]])
            .collect(),
    }
}

/// Zero the polar v-rows of a v-point Coriolis term (§4.6: "All variants
/// must set fu = 0 at polar v-rows").
fn zero_polar_rows(grid: &Grid, field: &mut Field2) {
    for i in 0..grid.nx {
        field.set(i, 0, 0.0);
        field.set(i, grid.ny, 0.0);
    }
}

/// Quarter-weight averaging: `f*v_bar` at u-points, `f*u_bar` at
/// v-points.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimpleCoriolis;

impl CoriolisScheme for SimpleCoriolis {
    fn apply(&self, grid: &Grid, u: &Field2, v: &Field2, _phi: &Field2, two_omega: f64) -> (Field2, Field2) {
        let f_u = f_at_phi_rows(grid, two_omega);
        let f_v = f_at_v_rows(grid, two_omega);

        let vbar = v_to_u(grid, v);
        let mut cor_u = grid.new_u_field();
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                cor_u.set(i, j, f_u[j] * vbar.get(i, j));
            }
        }

        let ubar = u_to_v(grid, u);
        let mut cor_v = grid.new_v_field();
        for j in 0..=grid.ny {
            for i in 0..grid.nx {
                cor_v.set(i, j, f_v[j] * ubar.get(i, j));
            }
        }
        zero_polar_rows(grid, &mut cor_v);
        (cor_u, cor_v)
    }
}

/// JT-style discretization, preserving Rossby-mode dispersion (§4.6).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct JtCoriolis;

impl CoriolisScheme for JtCoriolis {
    fn apply(&self, grid: &Grid, u: &Field2, v: &Field2, phi: &Field2, two_omega: f64) -> (Field2, Field2) {
        let f_phi = f_at_phi_rows(grid, two_omega);

        // Path for f*v_bar (enters the u-equation).
        let phi_v = phi_to_v(grid, phi);
        let mut q_v = grid.new_v_field();
        for j in 0..=grid.ny {
            for i in 0..grid.nx {
                q_v.set(i, j, phi_v.get(i, j) * v.get(i, j) * grid.cos_v[j]);
            }
        }
        let mut r_phi = grid.new_phi_field();
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                let q_phi = 0.5 * (q_v.get(i, j) + q_v.get(i, j + 1));
                r_phi.set(i, j, f_phi[j] * q_phi / phi.get(i, j));
            }
        }
        let mut cor_u = phi_to_u(grid, &r_phi);
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                let v = cor_u.get(i, j) / grid.cos_phi[j];
                cor_u.set(i, j, v);
            }
        }

        // Analogous path for f*u_bar (enters the v-equation).
        let phi_u = phi_to_u(grid, phi);
        let mut q_u = grid.new_u_field();
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                q_u.set(i, j, phi_u.get(i, j) * u.get(i, j));
            }
        }
        let mut r_phi2 = grid.new_phi_field();
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                let q_phi2 = 0.5 * (q_u.get(i, j) + q_u.get(i + 1, j));
                r_phi2.set(i, j, f_phi[j] * q_phi2 / phi.get(i, j));
            }
        }
        let mut cor_v = phi_to_v(grid, &r_phi2);
        zero_polar_rows(grid, &mut cor_v);
        (cor_u, cor_v)
    }
}

/// Vorticity-point variant: more stable, poorer Rossby dispersion (§4.6).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NewCoriolis;

impl CoriolisScheme for NewCoriolis {
    fn apply(&self, grid: &Grid, u: &Field2, v: &Field2, phi: &Field2, two_omega: f64) -> (Field2, Field2) {
        let f_z = f_at_v_rows(grid, two_omega);

        let phi_z = phi_to_vorticity(grid, phi);
        let u_z = u_to_vorticity(grid, u);
        let v_z = v_to_vorticity(grid, v);

        let mut cor_u_z = grid.new_v_field();
        let mut cor_v_z = grid.new_v_field();
        for j in 0..=grid.ny {
            for i in 0..grid.nx {
                let fz_over_phiz = f_z[j] / phi_z.get(i, j);
                cor_u_z.set(i, j, fz_over_phiz * v_z.get(i, j));
                cor_v_z.set(i, j, fz_over_phiz * u_z.get(i, j));
            }
        }

        let cor_u = vorticity_to_u(grid, &cor_u_z);
        let mut cor_v = vorticity_to_v(grid, &cor_v_z);
        zero_polar_rows(grid, &mut cor_v);
        (cor_u, cor_v)
    }
}

/// Tagged choice of Coriolis discretization, selected once at
/// construction (§4.6, §9).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnyCoriolis {
    Simple(SimpleCoriolis),
    Jt(JtCoriolis),
    New(NewCoriolis),
}

impl AnyCoriolis {
    pub fn from_name(name: &str) -> Result<Self, crate::error::Error> {
        match name {
            "simple" => Ok(AnyCoriolis::Simple(SimpleCoriolis)),
            "jt" => Ok(AnyCoriolis::Jt(JtCoriolis)),
            "new" => Ok(AnyCoriolis::New(NewCoriolis)),
            other => Err(crate::error::Error::UnknownCoriolisMethod(other.to_string())),
        }
    }
}

impl CoriolisScheme for AnyCoriolis {
    fn apply(&self, grid: &Grid, u: &Field2, v: &Field2, phi: &Field2, two_omega: f64) -> (Field2, Field2) {
        match self {
            AnyCoriolis::Simple(c) => c.apply(grid, u, v, phi, two_omega),
            AnyCoriolis::Jt(c) => c.apply(grid, u, v, phi, two_omega),
            AnyCoriolis::New(c) => c.apply(grid, u, v, phi, two_omega),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn all_variants_zero_fv_at_polar_rows() {
        let grid = Grid::new(32, 16, 1.0);
        let mut u = grid.new_u_field();
        let mut v = grid.new_v_field();
        let mut phi = grid.new_phi_field();
        phi.fill(3e4);
        for i in 0..grid.nx {
            u.set(i, 0, 1.3);
            u.set(i, grid.ny - 1, -0.7);
        }
        for i in 0..grid.nx {
            v.set(i, 1, 0.2);
            v.set(i, grid.ny - 1, -0.2);
        }
        for scheme in [
            AnyCoriolis::Simple(SimpleCoriolis),
            AnyCoriolis::Jt(JtCoriolis),
            AnyCoriolis::New(NewCoriolis),
        ] {
            let (_, cor_v) = scheme.apply(&grid, &u, &v, &phi, 1.458e-4);
            for i in 0..grid.nx {
                assert_eq!(cor_v.get(i, 0), 0.0);
                assert_eq!(cor_v.get(i, grid.ny), 0.0);
            }
        }
    }

    #[test]
    fn unknown_method_is_an_error() {
        assert!(AnyCoriolis::from_name("bogus").is_err());
    }
}
