//! Grid geometry: longitude/latitude tables, cell areas, trig tables, and
//! the rotated-pole geolocation used to stress-test pole handling (§4.1).

use ndarray::Array2;
use std::f64::consts::PI;

/// Wrap a longitude column index into `0..nx`, periodic.
#[inline]
pub fn wrap_i(i: isize, nx: usize) -> usize {
    i.rem_euclid(nx as isize) as usize
}

/// Reflect an out-of-range row index across the nearest pole.
///
/// `ny` is the number of valid rows (`0..ny`) for the field being indexed.
/// Returns the reflected `(i, j)` and a sign: `-1.0` for vector components
/// that must flip after crossing the pole, `1.0` otherwise (scalars ignore
/// the sign). In range, `(i, j)` pass through unchanged with sign `1.0`.
#[inline]
pub fn reflect(i: isize, j: isize, nx: usize, ny: usize) -> (usize, usize, f64) {
    let half = (nx / 2) as isize;
    if j >= 0 && j < ny as isize {
        (wrap_i(i, nx), j as usize, 1.0)
    } else if j < 0 {
        let jr = -1 - j;
        (wrap_i(i + half, nx), jr as usize, -1.0)
    } else {
        let over = j - ny as isize;
        let jr = ny as isize - 1 - over;
        (wrap_i(i + half, nx), jr as usize, -1.0)
    }
}

/// A periodic-in-longitude 2D field with `ny` valid rows. Out-of-range row
/// access is resolved with [`reflect`] rather than panicking, so the
/// cubic-Lagrange stencils (§4.4) can walk one row past either pole.
#[derive(Clone, Debug)]
pub struct Field2 {
    nx: usize,
    ny: usize,
    data: Array2<f64>,
}

impl Field2 {
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self { nx, ny, data: Array2::zeros((ny, nx)) }
    }

    pub fn from_fn(nx: usize, ny: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Array2::zeros((ny, nx));
        for j in 0..ny {
            for i in 0..nx {
                data[[j, i]] = f(i, j);
            }
        }
        Self { nx, ny, data }
    }

    pub fn nx(&self) -> usize { self.nx }
    pub fn ny(&self) -> usize { self.ny }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[j, wrap_i(i as isize, self.nx)]]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, v: f64) {
        let i = wrap_i(i as isize, self.nx);
        self.data[[j, i]] = v;
    }

    /// Scalar lookup that tolerates `j` one row beyond either pole, using
    /// pole reflection with no sign change.
    #[inline]
    pub fn at_scalar(&self, i: isize, j: isize) -> f64 {
        let (i, j, _) = reflect(i, j, self.nx, self.ny);
        self.data[[j, i]]
    }

    /// Vector-component lookup: identical to [`Self::at_scalar`] but flips
    /// sign when the lookup crossed a pole, per §4.4.
    #[inline]
    pub fn at_vector(&self, i: isize, j: isize) -> f64 {
        let (i, j, sign) = reflect(i, j, self.nx, self.ny);
        sign * self.data[[j, i]]
    }

    pub fn raw(&self) -> &Array2<f64> { &self.data }
    pub fn raw_mut(&mut self) -> &mut Array2<f64> { &mut self.data }

    pub fn fill(&mut self, v: f64) { self.data.fill(v); }
}

/// Precomputed geographic latitude at a rotated grid's phi- and
/// vorticity-points, used only when the model mesh is rotated relative to
/// the geographic frame (§4.1).
#[derive(Clone, Debug)]
pub struct RotatedPole {
    pub alpha: f64,
    /// geographic sin(latitude) at phi-points, shape (ny, nx)
    pub sin_geo_phi: Array2<f64>,
    /// geographic sin(latitude) at vorticity-points, shape (ny+1, nx)
    pub sin_geo_vort: Array2<f64>,
}

impl RotatedPole {
    fn tabulate(alpha: f64, lons: &[f64], lats: &[f64]) -> Array2<f64> {
        let (sin_a, cos_a) = alpha.sin_cos();
        let mut out = Array2::zeros((lats.len(), lons.len()));
        for (j, &theta) in lats.iter().enumerate() {
            let (sin_t, cos_t) = theta.sin_cos();
            for (i, &lambda) in lons.iter().enumerate() {
                out[[j, i]] = cos_a * sin_t - sin_a * cos_t * lambda.sin();
            }
        }
        out
    }

    pub fn new(alpha: f64, grid: &Grid) -> Self {
        Self {
            alpha,
            sin_geo_phi: Self::tabulate(alpha, &grid.lon_phi, &grid.lat_phi),
            sin_geo_vort: Self::tabulate(alpha, &grid.lon_u, &grid.lat_v),
        }
    }
}

/// Grid geometry: an `nx` (longitude) by `ny` (latitude) staggered C-grid
/// mesh, `nx` typically `2*ny`, `ny` a power of two (§2).
#[derive(Clone, Debug)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub dx: f64,
    pub dy: f64,
    pub radius: f64,

    /// Longitude of phi/v grid lines (cell centers), length `nx`.
    pub lon_phi: Vec<f64>,
    /// Longitude of u grid lines (west edges), length `nx`.
    pub lon_u: Vec<f64>,
    /// Latitude of phi/u grid lines (cell centers), length `ny`.
    pub lat_phi: Vec<f64>,
    /// Latitude of v grid lines (south/north edges), length `ny+1`.
    /// `lat_v[0] = -pi/2`, `lat_v[ny] = +pi/2`.
    pub lat_v: Vec<f64>,

    /// Cell area `A[j] = dx * dy * cos(lat_phi[j])`, length `ny`.
    pub area: Vec<f64>,

    pub cos_phi: Vec<f64>,
    pub sin_phi: Vec<f64>,
    pub cos_v: Vec<f64>,
    pub sin_v: Vec<f64>,

    pub rotation: Option<RotatedPole>,
}

impl Grid {
    pub fn new(nx: usize, ny: usize, radius: f64) -> Self {
        let dx = 2.0 * PI / nx as f64;
        let dy = PI / ny as f64;

        let lon_phi: Vec<f64> = (0..nx).map(|i| (i as f64 + 0.5) * dx).collect();
        let lon_u: Vec<f64> = (0..nx).map(|i| i as f64 * dx).collect();
        let lat_phi: Vec<f64> =
            (0..ny).map(|j| (j as f64 + 0.5 - ny as f64 / 2.0) * dy).collect();
        let lat_v: Vec<f64> = (0..=ny).map(|j| -PI / 2.0 + j as f64 * dy).collect();

        let area: Vec<f64> = lat_phi.iter().map(|&t| dx * dy * t.cos()).collect();
        let cos_phi: Vec<f64> = lat_phi.iter().map(|t| t.cos()).collect();
        let sin_phi: Vec<f64> = lat_phi.iter().map(|t| t.sin()).collect();
        let cos_v: Vec<f64> = lat_v.iter().map(|t| t.cos()).collect();
        let sin_v: Vec<f64> = lat_v.iter().map(|t| t.sin()).collect();

        let mut grid = Self {
            nx, ny, dx, dy, radius,
            lon_phi, lon_u, lat_phi, lat_v,
            area, cos_phi, sin_phi, cos_v, sin_v,
            rotation: None,
        };
        debug_assert!(grid.area.iter().all(|&a| a > 0.0));
        grid.rotation = None;
        grid
    }

    pub fn rotated(nx: usize, ny: usize, radius: f64, alpha: f64) -> Self {
        let mut grid = Self::new(nx, ny, radius);
        grid.rotation = Some(RotatedPole::new(alpha, &grid));
        grid
    }

    /// `Sum_j nx * A[j]` should equal `4*pi` (the invariant in §3).
    pub fn total_area(&self) -> f64 {
        self.nx as f64 * self.area.iter().sum::<f64>()
    }

    pub fn new_phi_field(&self) -> Field2 { Field2::zeros(self.nx, self.ny) }
    pub fn new_u_field(&self) -> Field2 { Field2::zeros(self.nx, self.ny) }
    pub fn new_v_field(&self) -> Field2 { Field2::zeros(self.nx, self.ny + 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_area_is_four_pi() {
        let grid = Grid::new(64, 32, 1.0);
        assert!((grid.total_area() - 4.0 * PI).abs() < 1e-10);
    }

    #[test]
    fn areas_are_positive() {
        let grid = Grid::new(64, 32, 1.0);
        assert!(grid.area.iter().all(|&a| a > 0.0));
    }

    #[test]
    fn reflect_identity_in_range() {
        let (i, j, s) = reflect(3, 5, 16, 8);
        assert_eq!((i, j), (3, 5));
        assert_eq!(s, 1.0);
    }

    #[test]
    fn reflect_across_south_pole_flips_sign_and_shifts_half_turn() {
        let (i, j, s) = reflect(0, -1, 16, 8);
        assert_eq!(i, 8);
        assert_eq!(j, 0);
        assert_eq!(s, -1.0);
    }

    #[test]
    fn reflect_across_north_pole_flips_sign_and_shifts_half_turn() {
        let (i, j, s) = reflect(2, 8, 16, 8);
        assert_eq!(i, 10);
        assert_eq!(j, 7);
        assert_eq!(s, -1.0);
    }

    #[test]
    fn periodicity_of_wrap() {
        assert_eq!(wrap_i(-1, 16), 15);
        assert_eq!(wrap_i(16, 16), 0);
        assert_eq!(wrap_i(17, 16), 1);
    }
}
