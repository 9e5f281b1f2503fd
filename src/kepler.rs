//! Kepler equation solvers and universal variable Lagrange coefficients.
use std::f64::consts::{PI, TAU};

use log::trace;
use nalgebra::Vector3;

use crate::{
    cfg::KeplerOpts,
    error::{Error, Solver},
};

/// Wraps an angle into [0, 2π)
pub(crate) fn wrap_two_pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid may round up to TAU itself
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wraps an angle into [-π, π)
pub(crate) fn wrap_pi(angle: f64) -> f64 {
    wrap_two_pi(angle + PI) - PI
}

/// Solves M = E - e sin(E) for the eccentric anomaly E (rad), 0 <= e < 1.
pub fn solve_elliptic(mean_anomaly: f64, e: f64, opts: &KeplerOpts) -> Result<f64, Error> {
    let mean = wrap_two_pi(mean_anomaly);

    let mut ecc = if e < 0.8 { mean } else { PI };
    let mut residual = ecc - e * ecc.sin() - mean;

    for iteration in 0..opts.max_iterations {
        if residual.abs() < opts.tolerance {
            trace!("kepler: converged after {} iterations", iteration);
            return Ok(ecc);
        }
        ecc -= residual / (1.0 - e * ecc.cos());
        residual = ecc - e * ecc.sin() - mean;
    }

    if residual.abs() < opts.tolerance {
        return Ok(ecc);
    }

    Err(Error::ConvergenceError {
        solver: Solver::Kepler,
        iterations: opts.max_iterations,
        residual,
    })
}

/// Solves M = e sinh(H) - H for the hyperbolic anomaly H, e > 1.
pub fn solve_hyperbolic(mean_anomaly: f64, e: f64, opts: &KeplerOpts) -> Result<f64, Error> {
    let scale = mean_anomaly.abs().max(1.0);

    let mut hyp = (mean_anomaly / e).asinh();
    let mut residual = e * hyp.sinh() - hyp - mean_anomaly;

    for _ in 0..opts.max_iterations {
        if residual.abs() < opts.tolerance * scale {
            return Ok(hyp);
        }
        hyp -= residual / (e * hyp.cosh() - 1.0);
        residual = e * hyp.sinh() - hyp - mean_anomaly;
    }

    if residual.abs() < opts.tolerance * scale {
        return Ok(hyp);
    }

    Err(Error::ConvergenceError {
        solver: Solver::Kepler,
        iterations: opts.max_iterations,
        residual,
    })
}

/// Stumpff functions c2(ψ) and c3(ψ).
fn stumpff_c2c3(psi: f64) -> (f64, f64) {
    if psi > 1.0E-6 {
        let sqrt_psi = psi.sqrt();
        let c2 = (1.0 - sqrt_psi.cos()) / psi;
        let c3 = (sqrt_psi - sqrt_psi.sin()) / (psi * sqrt_psi);
        (c2, c3)
    } else if psi < -1.0E-6 {
        let sqrt_neg_psi = (-psi).sqrt();
        let c2 = (1.0 - sqrt_neg_psi.cosh()) / psi;
        let c3 = (sqrt_neg_psi.sinh() - sqrt_neg_psi) / ((-psi) * sqrt_neg_psi);
        (c2, c3)
    } else {
        let c2 = 1.0 / 2.0 - psi / 24.0 + psi * psi / 720.0;
        let c3 = 1.0 / 6.0 - psi / 120.0 + psi * psi / 5040.0;
        (c2, c3)
    }
}

/// Lagrange coefficients mapping (r0, v0) to (r, v) after a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagrangeCoefficients {
    pub f: f64,
    pub g: f64,
    pub fdot: f64,
    pub gdot: f64,
}

impl LagrangeCoefficients {
    /// Applies the coefficients to the initial state
    pub fn apply(&self, r0: &Vector3<f64>, v0: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        (
            self.f * r0 + self.g * v0,
            self.fdot * r0 + self.gdot * v0,
        )
    }
}

/// Universal variable Lagrange coefficients after `dt` seconds, valid for
/// every conic. Newton-Raphson on the universal Kepler equation.
pub fn universal_lagrange(
    r0: &Vector3<f64>,
    v0: &Vector3<f64>,
    dt: f64,
    mu: f64,
    opts: &KeplerOpts,
) -> Result<LagrangeCoefficients, Error> {
    let r0_mag = r0.norm();
    let rdotv = r0.dot(v0);
    let sqrt_mu = mu.sqrt();

    let energy = v0.norm_squared() / 2.0 - mu / r0_mag;
    let alpha = -2.0 * energy / mu;

    let mut chi = if alpha > 1.0E-12 {
        sqrt_mu * dt * alpha
    } else if alpha < -1.0E-12 {
        let a = 1.0 / alpha;
        let sign_dt = dt.signum();
        let ratio = (-2.0 * mu * alpha * dt)
            / (rdotv + sign_dt * (-mu * a).sqrt() * (1.0 - r0_mag * alpha));
        if ratio > 0.0 {
            sign_dt * (-a).sqrt() * ratio.ln()
        } else {
            sqrt_mu * dt / r0_mag
        }
    } else {
        sqrt_mu * dt / r0_mag
    };

    let scale = (sqrt_mu * dt).abs().max(1.0);
    let mut residual = f64::INFINITY;
    let mut converged = false;

    for _ in 0..opts.max_iterations {
        let chi2 = chi * chi;
        let psi = alpha * chi2;
        let (c2, c3) = stumpff_c2c3(psi);

        let r = chi2 * c2 + rdotv / sqrt_mu * chi * (1.0 - psi * c3) + r0_mag * (1.0 - psi * c2);

        residual = r0_mag * chi * (1.0 - psi * c3) + rdotv / sqrt_mu * chi2 * c2 + chi2 * chi * c3
            - sqrt_mu * dt;

        if !residual.is_finite() {
            break;
        }

        if residual.abs() < opts.tolerance * scale {
            converged = true;
            break;
        }

        chi -= residual / r;
    }

    if !converged || !chi.is_finite() {
        return Err(Error::ConvergenceError {
            solver: Solver::UniversalKepler,
            iterations: opts.max_iterations,
            residual,
        });
    }

    let chi2 = chi * chi;
    let psi = alpha * chi2;
    let (c2, c3) = stumpff_c2c3(psi);

    let r_mag = chi2 * c2 + rdotv / sqrt_mu * chi * (1.0 - psi * c3) + r0_mag * (1.0 - psi * c2);

    Ok(LagrangeCoefficients {
        f: 1.0 - chi2 / r0_mag * c2,
        g: dt - chi2 * chi / sqrt_mu * c3,
        fdot: sqrt_mu / (r_mag * r0_mag) * chi * (psi * c3 - 1.0),
        gdot: 1.0 - chi2 / r_mag * c2,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(1.0, 0.1)]
    #[case(3.0, 0.5)]
    #[case(0.1, 0.95)]
    #[case(6.0, 0.999)]
    #[case(-2.0, 0.3)]
    fn elliptic(#[case] mean: f64, #[case] e: f64) {
        let opts = KeplerOpts::default();
        let ecc = solve_elliptic(mean, e, &opts).unwrap();
        let residual = wrap_pi(ecc - e * ecc.sin() - mean);
        assert!(residual.abs() < 1.0E-12, "residual {}", residual);
    }

    #[rstest]
    #[case(0.5, 1.5)]
    #[case(-4.0, 2.0)]
    #[case(250.0, 1.1)]
    fn hyperbolic(#[case] mean: f64, #[case] e: f64) {
        let opts = KeplerOpts::default();
        let hyp = solve_hyperbolic(mean, e, &opts).unwrap();
        let residual = e * hyp.sinh() - hyp - mean;
        assert!(residual.abs() < 1.0E-10 * mean.abs().max(1.0));
    }

    #[test]
    fn starved_budget() {
        let opts = KeplerOpts {
            tolerance: 1.0E-15,
            max_iterations: 1,
        };
        match solve_elliptic(0.1, 0.99, &opts) {
            Err(Error::ConvergenceError {
                solver, iterations, ..
            }) => {
                assert_eq!(solver, Solver::Kepler);
                assert_eq!(iterations, 1);
            },
            other => panic!("expected convergence error, got {:?}", other),
        }
    }

    #[test]
    fn universal_circular_quarter() {
        let mu = 398600.4418;
        let r = 7000.0_f64;
        let v = (mu / r).sqrt();
        let period = TAU * (r.powi(3) / mu).sqrt();

        let r0 = Vector3::new(r, 0.0, 0.0);
        let v0 = Vector3::new(0.0, v, 0.0);

        let coeffs =
            universal_lagrange(&r0, &v0, period / 4.0, mu, &KeplerOpts::default()).unwrap();
        let (r1, v1) = coeffs.apply(&r0, &v0);

        assert!((r1 - Vector3::new(0.0, r, 0.0)).norm() < 1.0E-6);
        assert!((v1 - Vector3::new(-v, 0.0, 0.0)).norm() < 1.0E-9);
    }

    #[rstest]
    #[case(600.0)]
    #[case(-600.0)]
    fn universal_hyperbolic_both_ways(#[case] dt: f64) {
        let mu = 398600.4418;
        let r0 = Vector3::new(7000.0, 0.0, 0.0);
        let v0 = Vector3::new(0.0, 12.0, 0.0);
        let opts = KeplerOpts::default();

        let coeffs = universal_lagrange(&r0, &v0, dt, mu, &opts).unwrap();
        let (r1, v1) = coeffs.apply(&r0, &v0);

        // symmetric about periapsis
        let expected = Vector3::new(5749.451823294934, dt.signum() * 6809.238945097093, 0.0);
        assert!((r1 - expected).norm() < 1.0E-6, "r({})={}", dt, r1);

        let back = universal_lagrange(&r1, &v1, -dt, mu, &opts).unwrap();
        let (r2, v2) = back.apply(&r1, &v1);
        assert!((r2 - r0).norm() < 1.0E-6, "round trip error {}", (r2 - r0).norm());
        assert!((v2 - v0).norm() < 1.0E-9);
    }

    #[test]
    fn angle_wrapping() {
        assert_eq!(wrap_two_pi(0.0), 0.0);
        assert!((wrap_two_pi(-0.5) - (TAU - 0.5)).abs() < 1.0E-15);
        assert!((wrap_two_pi(TAU + 1.0) - 1.0).abs() < 1.0E-15);
        assert!((wrap_pi(1.5 * PI) + 0.5 * PI).abs() < 1.0E-15);
    }
}
