//! Full multigrid (FMG) solver for the variable-coefficient Helmholtz
//! equation `nabla^2 phi - nu*phi = r` on the sphere (§4.7).

use crate::grid::{Field2, Grid};
use crate::tridiag::{self, Mode};

/// Relaxation strategy (§4.7). `LineAlternating` is the default: a full
/// periodic tridiagonal solve along odd rows, then even rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelaxMode {
    LineAlternating,
    RedBlack,
    GaussSeidel,
    Union,
}

/// One level of the grid hierarchy: row coefficients `a` (north), `c`
/// (south), `b` (east/west, uniform per row) plus the cos tables used to
/// inject the metric to the next coarser level.
struct Level {
    nx: usize,
    ny: usize,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    cos_phi: Vec<f64>,
    cos_v: Vec<f64>,
}

impl Level {
    fn coefficients(dx: f64, dy: f64, radius: f64, cos_phi: &[f64], cos_v: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let ny = cos_phi.len();
        let mut a: Vec<f64> = (0..ny)
            .map(|j| cos_v[j + 1] / (cos_phi[j] * radius * radius * dy * dy))
            .collect();
        let mut c: Vec<f64> = (0..ny)
            .map(|j| cos_v[j] / (cos_phi[j] * radius * radius * dy * dy))
            .collect();
        let b: Vec<f64> = (0..ny)
            .map(|j| 1.0 / (radius * radius * cos_phi[j] * cos_phi[j] * dx * dx))
            .collect();
        // Boundary rows drop the absent-neighbor coefficient (§4.7).
        c[0] = 0.0;
        a[ny - 1] = 0.0;
        (a, b, c)
    }

    fn finest(grid: &Grid) -> Self {
        let (a, b, c) = Self::coefficients(grid.dx, grid.dy, grid.radius, &grid.cos_phi, &grid.cos_v);
        Level { nx: grid.nx, ny: grid.ny, a, b, c, cos_phi: grid.cos_phi.clone(), cos_v: grid.cos_v.clone() }
    }

    /// Coarsen by injecting the fine level's cos tables at even indices
    /// (§4.7: "full-weighting injection of the metric").
    fn coarsen(fine: &Level, dx: f64, dy: f64, radius: f64) -> Self {
        let nx = fine.nx / 2;
        let ny = fine.ny / 2;
        let cos_phi: Vec<f64> = (0..ny).map(|j| fine.cos_phi[2 * j]).collect();
        let cos_v: Vec<f64> = (0..=ny).map(|j| fine.cos_v[2 * j]).collect();
        let (a, b, c) = Self::coefficients(dx, dy, radius, &cos_phi, &cos_v);
        Level { nx, ny, a, b, c, cos_phi, cos_v }
    }
}

/// Build the grid hierarchy, finest first, `ng = p - 2` levels where
/// `Nx = 2^p` (§4.7), halved until a floor of 4 rows is reached.
fn build_hierarchy(grid: &Grid) -> Vec<Level> {
    let p = grid.nx.trailing_zeros() as i32;
    let ng = (p - 2).max(1) as usize;
    let mut levels = vec![Level::finest(grid)];
    let mut dx = grid.dx;
    let mut dy = grid.dy;
    while levels.len() < ng && levels.last().unwrap().ny >= 4 && levels.last().unwrap().nx >= 4 {
        dx *= 2.0;
        dy *= 2.0;
        let coarse = Level::coarsen(levels.last().unwrap(), dx, dy, grid.radius);
        levels.push(coarse);
    }
    levels
}

/// Direct subsampling ("injection") of every other row and column.
fn inject(field: &Field2, nx: usize, ny: usize) -> Field2 {
    Field2::from_fn(nx, ny, |i, j| field.get(2 * i, 2 * j))
}

/// Separable bilinear prolongation, weights `1/16, 3/16, 9/16` (§4.7).
fn prolong_linear(coarse: &Field2, fine_nx: usize, fine_ny: usize) -> Field2 {
    let coarse_nx = coarse.nx();
    let coarse_ny = coarse.ny();
    Field2::from_fn(fine_nx, fine_ny, |i, j| {
        let ic = i / 2;
        let jc = (j / 2).min(coarse_ny - 1);
        let (i_far, wi_near, wi_far) = if i % 2 == 0 {
            (if ic == 0 { coarse_nx - 1 } else { ic - 1 }, 0.75, 0.25)
        } else {
            ((ic + 1) % coarse_nx, 0.75, 0.25)
        };
        let (j_far, wj_near, wj_far) = if j % 2 == 0 {
            (jc.saturating_sub(1), 0.75, 0.25)
        } else {
            ((jc + 1).min(coarse_ny - 1), 0.75, 0.25)
        };
        wi_near * wj_near * coarse.get(ic, jc)
            + wi_near * wj_far * coarse.get(ic, j_far)
            + wi_far * wj_near * coarse.get(i_far, jc)
            + wi_far * wj_far * coarse.get(i_far, j_far)
    })
}

/// Four-tap "accurate" interpolation kernel for the near sub-point
/// (§4.7); the far sub-point uses the mirrored kernel.
const BICUBIC_TAPS: [f64; 4] = [-0.1318, 0.8439, 0.4575, -0.1696];

fn bicubic_taps(is_far_subpoint: bool) -> [f64; 4] {
    if is_far_subpoint {
        let mut t = BICUBIC_TAPS;
        t.reverse();
        t
    } else {
        BICUBIC_TAPS
    }
}

/// Separable bicubic prolongation (§4.7), applied as a 1D pass along
/// longitude (periodic, 4-point stencil centered one-in from the nearest
/// coarse cell) then along latitude (clamped at the poles).
fn prolong_bicubic(coarse: &Field2, fine_nx: usize, fine_ny: usize) -> Field2 {
    let coarse_nx = coarse.nx();
    let coarse_ny = coarse.ny();

    // Pass 1: double resolution along longitude, keep coarse latitude.
    let mid = Field2::from_fn(fine_nx, coarse_ny, |i, j| {
        let ic = i / 2;
        let taps = bicubic_taps(i % 2 == 1);
        (0..4)
            .map(|k| {
                let idx = (ic as isize - 1 + k as isize).rem_euclid(coarse_nx as isize) as usize;
                taps[k] * coarse.get(idx, j)
            })
            .sum()
    });

    // Pass 2: double resolution along latitude, clamped at the poles.
    Field2::from_fn(fine_nx, fine_ny, |i, j| {
        let jc = (j / 2).min(coarse_ny - 1);
        let taps = bicubic_taps(j % 2 == 1);
        (0..4)
            .map(|k| {
                let idx = (jc as isize - 1 + k as isize).clamp(0, coarse_ny as isize - 1) as usize;
                taps[k] * mid.get(i, idx)
            })
            .sum()
    })
}

fn add_in_place(dst: &mut Field2, src: &Field2) {
    for j in 0..dst.ny() {
        for i in 0..dst.nx() {
            dst.set(i, j, dst.get(i, j) + src.get(i, j));
        }
    }
}

/// Residual `r - (nabla^2 phi - nu*phi)` at every cell of `level`.
fn residual(level: &Level, phi: &Field2, rhs: &Field2, nu: f64) -> Field2 {
    Field2::from_fn(level.nx, level.ny, |i, j| {
        let im1 = if i == 0 { level.nx - 1 } else { i - 1 };
        let south = if j == 0 { phi.get(i, j) } else { phi.get(i, j - 1) };
        let lap = level.a[j] * (phi.get(i, j + 1) - phi.get(i, j))
            - level.c[j] * (phi.get(i, j) - south)
            + level.b[j] * (phi.get(i + 1, j) - 2.0 * phi.get(i, j) + phi.get(im1, j));
        rhs.get(i, j) - (lap - nu * phi.get(i, j))
    })
}

fn row(field: &Field2, nx: usize, j: Option<usize>) -> Vec<f64> {
    match j {
        Some(j) => (0..nx).map(|i| field.get(i, j)).collect(),
        None => vec![0.0; nx],
    }
}

fn relax_rows(level: &Level, phi: &mut Field2, rhs: &Field2, nu: f64, rows: &[usize]) {
    let nx = level.nx;
    for &j in rows {
        let aj = level.a[j];
        let cj = level.c[j];
        let bj = level.b[j];
        let north = row(phi, nx, if j + 1 < level.ny { Some(j + 1) } else { None });
        let south = row(phi, nx, if j > 0 { Some(j - 1) } else { None });
        let r: Vec<f64> = (0..nx)
            .map(|i| rhs.get(i, j) + aj * north[i] + cj * south[i])
            .collect();
        let main = -(2.0 * bj + aj + cj + nu);
        let a_coef = vec![bj; nx];
        let b_coef = vec![main; nx];
        let c_coef = vec![bj; nx];
        let sol = tridiag::solve(&a_coef, &b_coef, &c_coef, &r, Mode::Periodic);
        for i in 0..nx {
            phi.set(i, j, sol[i]);
        }
    }
}

fn relax_point(level: &Level, phi: &mut Field2, rhs: &Field2, nu: f64, i: usize, j: usize) {
    let aj = level.a[j];
    let cj = level.c[j];
    let bj = level.b[j];
    let north = if j + 1 < level.ny { phi.get(i, j + 1) } else { 0.0 };
    let south = if j > 0 { phi.get(i, j - 1) } else { 0.0 };
    let east = phi.get(i + 1, j);
    let west = phi.get(if i == 0 { level.nx - 1 } else { i - 1 }, j);
    let diag = -(2.0 * bj + aj + cj + nu);
    let v = (rhs.get(i, j) - aj * north - cj * south - bj * (east + west)) / diag;
    phi.set(i, j, v);
}

fn relax_n(level: &Level, phi: &mut Field2, rhs: &Field2, nu: f64, mode: RelaxMode, sweeps: usize) {
    for s in 0..sweeps {
        match mode {
            RelaxMode::LineAlternating => {
                let rows: Vec<usize> = if s % 2 == 0 { (0..level.ny).step_by(2).collect() } else { (1..level.ny).step_by(2).collect() };
                relax_rows(level, phi, rhs, nu, &rows);
            }
            RelaxMode::GaussSeidel => {
                for j in 0..level.ny {
                    for i in 0..level.nx {
                        relax_point(level, phi, rhs, nu, i, j);
                    }
                }
            }
            RelaxMode::RedBlack => {
                for color in 0..2 {
                    for j in 0..level.ny {
                        for i in 0..level.nx {
                            if (i + j) % 2 == color {
                                relax_point(level, phi, rhs, nu, i, j);
                            }
                        }
                    }
                }
            }
            RelaxMode::Union => {
                let rows: Vec<usize> = (0..level.ny).collect();
                relax_rows(level, phi, rhs, nu, &rows);
                for color in 0..2 {
                    for j in 0..level.ny {
                        for i in 0..level.nx {
                            if (i + j) % 2 == color {
                                relax_point(level, phi, rhs, nu, i, j);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Solver state: the grid hierarchy plus a V-cycle working buffer for phi
/// and the injected right-hand side at every level (§4.7, §5: scratch
/// arrays are the same size as state, allocated once).
pub struct Multigrid {
    levels: Vec<Level>,
}

impl Multigrid {
    pub fn new(grid: &Grid) -> Self {
        Self { levels: build_hierarchy(grid) }
    }

    fn v_cycle(&self, lv: usize, phi: &mut [Field2], rhs: &mut [Field2], nu: f64, mode: RelaxMode) {
        let coarsest = self.levels.len() - 1;
        if lv == coarsest {
            relax_n(&self.levels[lv], &mut phi[lv], &rhs[lv], nu, mode, 20);
            return;
        }
        relax_n(&self.levels[lv], &mut phi[lv], &rhs[lv], nu, mode, 4);
        let res = residual(&self.levels[lv], &phi[lv], &rhs[lv], nu);
        let res_coarse = inject(&res, self.levels[lv + 1].nx, self.levels[lv + 1].ny);

        let saved_rhs = rhs[lv + 1].clone();
        let saved_phi = phi[lv + 1].clone();
        rhs[lv + 1] = res_coarse;
        phi[lv + 1].fill(0.0);

        self.v_cycle(lv + 1, phi, rhs, nu, mode);

        let correction = prolong_linear(&phi[lv + 1], self.levels[lv].nx, self.levels[lv].ny);
        add_in_place(&mut phi[lv], &correction);
        rhs[lv + 1] = saved_rhs;
        phi[lv + 1] = saved_phi;

        relax_n(&self.levels[lv], &mut phi[lv], &rhs[lv], nu, mode, 4);
    }

    /// Run one full FMG solve: nested iteration from the coarsest grid up
    /// to the finest (bicubic prolongation as the initial guess at each
    /// level, one V-cycle to refine it), then four additional V-cycles
    /// at the finest level to reach the target accuracy (§4.7).
    pub fn solve(&self, rhs0: &Field2, nu: f64, mode: RelaxMode) -> Field2 {
        let n = self.levels.len();
        let mut rhs = vec![rhs0.clone()];
        for lv in 1..n {
            let prev = &rhs[lv - 1];
            rhs.push(inject(prev, self.levels[lv].nx, self.levels[lv].ny));
        }

        let coarsest = n - 1;
        let mut phi: Vec<Field2> = self.levels.iter().map(|l| Field2::zeros(l.nx, l.ny)).collect();
        relax_n(&self.levels[coarsest], &mut phi[coarsest], &rhs[coarsest], nu, mode, 20);

        for lv in (0..coarsest).rev() {
            phi[lv] = prolong_bicubic(&phi[lv + 1], self.levels[lv].nx, self.levels[lv].ny);
            self.v_cycle(lv, &mut phi, &mut rhs, nu, mode);
        }

        for _ in 0..4 {
            self.v_cycle(0, &mut phi, &mut rhs, nu, mode);
        }

        phi.into_iter().next().unwrap()
    }

    pub fn residual_norm(&self, phi: &Field2, rhs: &Field2, nu: f64) -> f64 {
        let res = residual(&self.levels[0], phi, rhs, nu);
        let mut max = 0.0f64;
        for j in 0..self.levels[0].ny {
            for i in 0..self.levels[0].nx {
                max = max.max(res.get(i, j).abs());
            }
        }
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn solves_a_known_helmholtz_problem() {
        let grid = Grid::new(32, 16, 1.0);
        let nu = 0.2;
        let phi_exact = Field2::from_fn(grid.nx, grid.ny, |i, j| {
            (grid.lon_phi[i]).cos() * (grid.lat_phi[j]).sin()
        });
        let mg = Multigrid::new(&grid);
        let level0 = Level::finest(&grid);
        let neg_laplacian = residual(&level0, &phi_exact, &Field2::zeros(grid.nx, grid.ny), 0.0);
        let rhs_for_solve = Field2::from_fn(grid.nx, grid.ny, |i, j| -neg_laplacian.get(i, j) - nu * phi_exact.get(i, j));
        let initial_residual = mg.residual_norm(&Field2::zeros(grid.nx, grid.ny), &rhs_for_solve, nu);
        let phi = mg.solve(&rhs_for_solve, nu, RelaxMode::LineAlternating);
        let final_residual = mg.residual_norm(&phi, &rhs_for_solve, nu);
        assert!(
            final_residual < 1e-2 * initial_residual,
            "FMG did not substantially reduce the residual: {initial_residual} -> {final_residual}"
        );
    }

    #[test]
    fn all_relax_modes_reduce_the_residual() {
        let grid = Grid::new(16, 8, 1.0);
        let level = Level::finest(&grid);
        let rhs = Field2::from_fn(grid.nx, grid.ny, |i, j| (i as f64 * 0.2 + j as f64 * 0.1).sin());
        for mode in [RelaxMode::LineAlternating, RelaxMode::GaussSeidel, RelaxMode::RedBlack, RelaxMode::Union] {
            let mut phi = Field2::zeros(grid.nx, grid.ny);
            let before = residual(&level, &phi, &rhs, 0.1);
            let before_norm: f64 = before.raw().iter().map(|v| v.abs()).fold(0.0, f64::max);
            relax_n(&level, &mut phi, &rhs, 0.1, mode, 10);
            let after = residual(&level, &phi, &rhs, 0.1);
            let after_norm: f64 = after.raw().iter().map(|v| v.abs()).fold(0.0, f64::max);
            assert!(after_norm < before_norm, "{mode:?} did not reduce residual");
        }
    }
}
