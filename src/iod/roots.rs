//! Real positive roots of the Gauss polynomial x⁸ + a x⁶ + b x³ + c.
//!
//! p'(x) = x² q(x) with q(x) = 8x⁵ + 6a x³ + 3b, and q'(x) = x² (40x² + 18a).
//! q is monotone on both sides of sqrt(-9a/20), so its positive roots are
//! bracketed exactly. They split the positive axis into intervals on which
//! p is monotone: every positive root of p is isolated by a sign change,
//! or sits on a critical point (double root).
use itertools::Itertools;
use log::trace;

use crate::error::Error;

const BISECTION_MAX_ITERATIONS: usize = 200;

const POLISH_MAX_ITERATIONS: usize = 50;
const POLISH_TOLERANCE: f64 = 1.0E-14;

// |p(x)| relative to the polynomial magnitude under which a critical point is a root
const DOUBLE_ROOT_THRESHOLD: f64 = 1.0E-12;

// relative separation under which two roots are the same
const DUPLICATE_THRESHOLD: f64 = 1.0E-6;

/// Bisection of `f` over [lo, hi], knowing f(lo) and f(hi) differ in sign.
fn bisect<F: Fn(f64) -> f64>(f: &F, mut lo: f64, mut hi: f64) -> f64 {
    let mut f_lo = f(lo);
    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        let f_mid = f(mid);
        if f_mid == 0.0 {
            return mid;
        }
        if (f_mid < 0.0) == (f_lo < 0.0) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Roots of `f` isolated by the sorted `breakpoints`.
fn sign_changes<F: Fn(f64) -> f64>(f: &F, breakpoints: &[f64]) -> Vec<f64> {
    let mut roots = breakpoints
        .iter()
        .tuple_windows()
        .filter_map(|(&lo, &hi)| {
            let (f_lo, f_hi) = (f(lo), f(hi));
            if f_lo == 0.0 {
                Some(lo)
            } else if f_hi != 0.0 && (f_lo < 0.0) != (f_hi < 0.0) {
                Some(bisect(f, lo, hi))
            } else {
                None
            }
        })
        .collect::<Vec<_>>();

    if let Some(&last) = breakpoints.last() {
        if f(last) == 0.0 {
            roots.push(last);
        }
    }
    roots
}

/// Gauss polynomial coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GaussPolynomial {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl GaussPolynomial {
    fn eval(&self, x: f64) -> (f64, f64) {
        let x2 = x * x;
        let x3 = x2 * x;
        let x5 = x3 * x2;
        let value = x5 * x3 + self.a * x5 * x + self.b * x3 + self.c;
        let derivative = 8.0 * x5 * x2 + 6.0 * self.a * x5 + 3.0 * self.b * x2;
        (value, derivative)
    }

    /// p'(x) / x²
    fn reduced_derivative(&self, x: f64) -> f64 {
        let x3 = x * x * x;
        8.0 * x3 * x * x + 6.0 * self.a * x3 + 3.0 * self.b
    }

    /// Sum of the absolute values of all terms
    fn magnitude(&self, x: f64) -> f64 {
        let x3 = x * x * x;
        x3 * x3 * x * x + self.a.abs() * x3 * x3 + self.b.abs() * x3 + self.c.abs()
    }

    /// Upper bound of the root moduli (Fujiwara)
    fn root_bound(&self) -> f64 {
        2.0 * self
            .a
            .abs()
            .sqrt()
            .max(self.b.abs().powf(0.2))
            .max((self.c / 2.0).abs().powf(0.125))
    }

    /// Same polynomial, in y = x / scale
    fn scaled(&self, scale: f64) -> Self {
        Self {
            a: self.a / scale.powi(2),
            b: self.b / scale.powi(5),
            c: self.c / scale.powi(8),
        }
    }

    /// Newton-Raphson polishing of a bracketed root. The bracketed value
    /// is kept when Newton wanders away from it.
    fn polish(&self, x0: f64) -> f64 {
        let mut x = x0;
        for _ in 0..POLISH_MAX_ITERATIONS {
            let (value, derivative) = self.eval(x);
            if derivative == 0.0 || !derivative.is_finite() {
                break;
            }
            let dx = value / derivative;
            x -= dx;
            if dx.abs() <= POLISH_TOLERANCE * x.abs() {
                break;
            }
        }
        if x.is_finite() && x > 0.0 && (x - x0).abs() < 1.0E-6 * x0.max(1.0) {
            x
        } else {
            x0
        }
    }

    /// All real positive roots, sorted by increasing value. `scale` is the
    /// expected order of magnitude of the roots, used to condition the problem.
    pub fn positive_roots(&self, scale: f64) -> Result<Vec<f64>, Error> {
        let scaled = self.scaled(scale);
        if !(scaled.a.is_finite() && scaled.b.is_finite() && scaled.c.is_finite()) {
            return Err(Error::IllConditionedGeometry(
                "non finite gauss polynomial coefficients".to_string(),
            ));
        }

        let upper = scaled.root_bound();
        if upper == 0.0 {
            // x⁸ only: the sole root is zero
            return Ok(Vec::new());
        }

        // q is monotone between these points
        let mut monotone = vec![0.0];
        if scaled.a < 0.0 {
            let inflection = (-0.45 * scaled.a).sqrt();
            if inflection < upper {
                monotone.push(inflection);
            }
        }
        monotone.push(upper);

        let critical = sign_changes(&|x| scaled.reduced_derivative(x), &monotone)
            .into_iter()
            .filter(|x| *x > 0.0 && *x < upper)
            .collect::<Vec<_>>();

        let breakpoints = critical
            .iter()
            .copied()
            .chain([0.0, upper])
            .sorted_by(|a, b| a.total_cmp(b))
            .dedup()
            .collect::<Vec<_>>();

        let mut roots = sign_changes(&|x| scaled.eval(x).0, &breakpoints);
        roots.extend(critical.iter().copied().filter(|x| {
            scaled.eval(*x).0.abs() <= DOUBLE_ROOT_THRESHOLD * scaled.magnitude(*x)
        }));

        let roots = roots
            .into_iter()
            .map(|root| scaled.polish(root))
            .filter(|root| *root > 0.0)
            .map(|root| root * scale)
            .sorted_by(|a, b| a.total_cmp(b))
            .dedup_by(|a, b| (a - b).abs() <= DUPLICATE_THRESHOLD * a.abs().max(b.abs()))
            .collect::<Vec<_>>();

        trace!("gauss polynomial: positive roots {:?}", roots);
        Ok(roots)
    }
}
