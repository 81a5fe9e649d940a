//! Tridiagonal solves shared by SLICE's periodic/bounded parabolic-spline
//! reconstruction and by the multigrid line relaxation (§9: "Tridiagonal
//! solves are reused ... extract as a shared primitive").

/// Boundary handling for [`solve`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Periodic (cyclic) system: `a[0]` multiplies `x[n-1]`, `c[n-1]`
    /// multiplies `x[0]`.
    Periodic,
    /// Dirichlet-bounded system: `a[0]` and `c[n-1]` are ignored.
    Bounded,
}

/// Thomas algorithm for a bounded tridiagonal system `a[j] x[j-1] + b[j]
/// x[j] + c[j] x[j+1] = r[j]`.
fn thomas(a: &[f64], b: &[f64], c: &[f64], r: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut cp = vec![0.0; n];
    let mut rp = vec![0.0; n];
    let mut x = vec![0.0; n];

    cp[0] = c[0] / b[0];
    rp[0] = r[0] / b[0];
    for j in 1..n {
        let m = b[j] - a[j] * cp[j - 1];
        cp[j] = c[j] / m;
        rp[j] = (r[j] - a[j] * rp[j - 1]) / m;
    }
    x[n - 1] = rp[n - 1];
    for j in (0..n - 1).rev() {
        x[j] = rp[j] - cp[j] * x[j + 1];
    }
    x
}

/// Periodic tridiagonal solve via the Sherman-Morrison reduction to two
/// bounded solves (the standard cyclic-tridiagonal trick).
fn periodic(a: &[f64], b: &[f64], c: &[f64], r: &[f64]) -> Vec<f64> {
    let n = b.len();
    if n == 1 {
        return vec![r[0] / (a[0] + b[0] + c[0])];
    }

    let alpha = c[n - 1];
    let beta = a[0];
    let gamma = -b[0];

    let mut bb = b.to_vec();
    bb[0] -= gamma;
    bb[n - 1] -= alpha * beta / gamma;

    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = alpha;

    let x = thomas(a, &bb, c, r);
    let z = thomas(a, &bb, c, &u);

    let fact = (x[0] + beta * x[n - 1] / gamma) / (1.0 + z[0] + beta * z[n - 1] / gamma);

    x.iter().zip(z.iter()).map(|(&xi, &zi)| xi - fact * zi).collect()
}

/// Solve the tridiagonal system `a[j] x[j-1] + b[j] x[j] + c[j] x[j+1] =
/// r[j]` under the given boundary [`Mode`].
pub fn solve(a: &[f64], b: &[f64], c: &[f64], r: &[f64], mode: Mode) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(b.len(), c.len());
    debug_assert_eq!(c.len(), r.len());
    match mode {
        Mode::Bounded => thomas(a, b, c, r),
        Mode::Periodic => periodic(a, b, c, r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(a: &[f64], b: &[f64], c: &[f64], x: &[f64], mode: Mode) -> Vec<f64> {
        let n = x.len();
        let mut r = vec![0.0; n];
        for j in 0..n {
            r[j] = b[j] * x[j];
            if j > 0 {
                r[j] += a[j] * x[j - 1];
            } else if mode == Mode::Periodic {
                r[j] += a[j] * x[n - 1];
            }
            if j + 1 < n {
                r[j] += c[j] * x[j + 1];
            } else if mode == Mode::Periodic {
                r[j] += c[j] * x[0];
            }
        }
        r
    }

    #[test]
    fn bounded_round_trip() {
        let n = 9;
        let a: Vec<f64> = (0..n).map(|j| if j == 0 { 0.0 } else { -1.0 }).collect();
        let b: Vec<f64> = vec![4.0; n];
        let c: Vec<f64> = (0..n).map(|j| if j == n - 1 { 0.0 } else { -1.0 }).collect();
        let x: Vec<f64> = (0..n).map(|j| (j as f64 * 0.37).sin()).collect();

        let r = apply(&a, &b, &c, &x, Mode::Bounded);
        let got = solve(&a, &b, &c, &r, Mode::Bounded);
        for (g, w) in got.iter().zip(x.iter()) {
            assert!((g - w).abs() < 1e-10);
        }
    }

    #[test]
    fn periodic_round_trip() {
        let n = 12;
        let a = vec![-1.0; n];
        let b = vec![4.0; n];
        let c = vec![-1.0; n];
        let x: Vec<f64> = (0..n).map(|j| (j as f64 * 0.91).cos()).collect();

        let r = apply(&a, &b, &c, &x, Mode::Periodic);
        let got = solve(&a, &b, &c, &r, Mode::Periodic);
        for (g, w) in got.iter().zip(x.iter()) {
            assert!((g - w).abs() < 1e-10);
        }
    }
}
