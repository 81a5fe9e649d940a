//! Cubed-sphere reference-solution exporter (§6's `dump_ref` flag). This
//! is a one-way path: the native lat-lon state is resampled onto a
//! cubed-sphere target for downstream comparison against other dynamical
//! cores, never read back into the model.

use crate::error::Result;
use crate::grid::Grid;
use crate::interp::{interpolate_scalar, interpolate_vector, PointKind};
use crate::io::{dump_field, RunTag};
use ndarray::Array2;
use std::f64::consts::PI;
use std::path::Path;

/// A panel-major cubed-sphere target: anything that can hand back the
/// `(longitude, latitude)` of every sample point, grouped by panel.
pub trait CubedSphereTarget {
    fn panel_count(&self) -> usize {
        6
    }
    /// Cells per panel edge.
    fn resolution(&self) -> usize;
    /// Geographic `(lambda, theta)` of cell centers on `panel` (0..6),
    /// row-major, shape `resolution * resolution`.
    fn panel_points(&self, panel: usize) -> Vec<(f64, f64)>;
}

/// Standard equiangular gnomonic cubed-sphere grid (Sadourny 1972 panel
/// layout), used as the default low-resolution comparison target.
pub struct EquiangularCubedSphere {
    n: usize,
}

impl EquiangularCubedSphere {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Map a point on the canonical `+x` panel in `[-pi/4, pi/4]^2`
    /// equiangular coordinates to a unit vector, then rotate to the panel
    /// in question.
    fn panel_to_xyz(panel: usize, alpha: f64, beta: f64) -> (f64, f64, f64) {
        let (ta, tb) = (alpha.tan(), beta.tan());
        let norm = (1.0 + ta * ta + tb * tb).sqrt();
        let (x, y, z) = (1.0 / norm, ta / norm, tb / norm);
        match panel {
            0 => (x, y, z),
            1 => (-y, x, z),
            2 => (-x, -y, z),
            3 => (y, -x, z),
            4 => (-z, y, x),
            _ => (z, y, -x),
        }
    }
}

impl CubedSphereTarget for EquiangularCubedSphere {
    fn resolution(&self) -> usize {
        self.n
    }

    fn panel_points(&self, panel: usize) -> Vec<(f64, f64)> {
        let n = self.n;
        let mut out = Vec::with_capacity(n * n);
        for j in 0..n {
            let beta = -PI / 4.0 + (j as f64 + 0.5) * (PI / 2.0) / n as f64;
            for i in 0..n {
                let alpha = -PI / 4.0 + (i as f64 + 0.5) * (PI / 2.0) / n as f64;
                let (x, y, z) = Self::panel_to_xyz(panel, alpha, beta);
                let lambda = y.atan2(x).rem_euclid(2.0 * PI);
                let theta = z.clamp(-1.0, 1.0).asin();
                out.push((lambda, theta));
            }
        }
        out
    }
}

fn sample_panel(
    target: &dyn CubedSphereTarget,
    panel: usize,
    grid: &Grid,
    field: &crate::grid::Field2,
    kind: PointKind,
    is_vector: bool,
) -> Array2<f64> {
    let n = target.resolution();
    let points = target.panel_points(panel);
    let mut out = Array2::zeros((n, n));
    for (idx, &(lambda, theta)) in points.iter().enumerate() {
        let (j, i) = (idx / n, idx % n);
        out[[j, i]] = if is_vector {
            interpolate_vector(field, grid, kind, lambda, theta)
        } else {
            interpolate_scalar(field, grid, kind, lambda, theta)
        };
    }
    out
}

/// Resample `phi`/`u`/`v` onto every panel of `target` and write one dump
/// file per panel per field under `dir`, named `<tag>_cs<panel>_<field>`.
pub fn export_reference(
    dir: &Path,
    tag: &RunTag,
    grid: &Grid,
    phi: &crate::grid::Field2,
    u: &crate::grid::Field2,
    v: &crate::grid::Field2,
    target: &dyn CubedSphereTarget,
) -> Result<()> {
    let n = target.resolution();
    for panel in 0..target.panel_count() {
        let phi_panel = sample_panel(target, panel, grid, phi, PointKind::Phi, false);
        let u_panel = sample_panel(target, panel, grid, u, PointKind::U, true);
        let v_panel = sample_panel(target, panel, grid, v, PointKind::V, true);

        let to_field = |a: Array2<f64>| crate::grid::Field2::from_fn(n, n, |i, j| a[[j, i]]);
        dump_field(dir, tag, &format!("cs{panel}_h"), &to_field(phi_panel))?;
        dump_field(dir, tag, &format!("cs{panel}_u"), &to_field(u_panel))?;
        dump_field(dir, tag, &format!("cs{panel}_v"), &to_field(v_panel))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_points_lie_on_the_unit_sphere() {
        let target = EquiangularCubedSphere::new(4);
        for panel in 0..6 {
            for (lambda, theta) in target.panel_points(panel) {
                assert!(lambda >= 0.0 && lambda < 2.0 * PI + 1e-9);
                assert!(theta.abs() <= PI / 2.0 + 1e-9);
            }
        }
    }

    #[test]
    fn six_panels_cover_distinct_directions() {
        let target = EquiangularCubedSphere::new(2);
        let centers: Vec<(f64, f64)> = (0..6).map(|p| target.panel_points(p)[0]).collect();
        for a in 0..6 {
            for b in (a + 1)..6 {
                let (la, ta) = centers[a];
                let (lb, tb) = centers[b];
                assert!((la - lb).abs() > 1e-6 || (ta - tb).abs() > 1e-6);
            }
        }
    }
}
