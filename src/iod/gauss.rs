//! Gauss method: three lines of sight reduced to the 8th degree polynomial
//! in the middle geocentric distance, followed by a Newton refinement
//! with exact Lagrange coefficients.
use log::{debug, trace, warn};
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::{
    cfg::{CentralBody, IodOpts, KeplerOpts},
    constants::SPEED_OF_LIGHT_KM_S,
    error::Solver,
    iod::{roots::GaussPolynomial, AnglesObservation, IodSolution},
    kepler::universal_lagrange,
    prelude::{CartesianState, Epoch, Error},
    time::{elapsed_seconds, offset},
};

// f1 g3 - f3 g1 under which the Lagrange system is singular
const MIN_LAGRANGE_DETERMINANT: f64 = 1.0E-9;

// relative finite difference step of the refinement jacobian
const JACOBIAN_STEP: f64 = 1.0E-7;

// line search step under which the refinement has stalled
const MIN_LINE_SEARCH_STEP: f64 = 1.0 / 1024.0;

/// Middle position and velocity, the latter scaled by `scale` (s)
/// so both halves are expressed in km.
fn pack(position: &Vector3<f64>, velocity: &Vector3<f64>, scale: f64) -> Vector6<f64> {
    let v = velocity * scale;
    Vector6::new(position.x, position.y, position.z, v.x, v.y, v.z)
}

/// Reports a Kepler failure met while refining as a refinement failure
fn diverged(e: Error, iterations: usize, residual: f64) -> Error {
    match e {
        Error::ConvergenceError {
            solver: Solver::UniversalKepler,
            ..
        } => Error::ConvergenceError {
            solver: Solver::GaussRefinement,
            iterations,
            residual,
        },
        e => e,
    }
}

/// Slant ranges, positions at the 3 epochs and middle velocity
#[derive(Debug, Clone, Copy)]
struct Estimate {
    ranges: [f64; 3],
    positions: [Vector3<f64>; 3],
    velocity: Vector3<f64>,
}

/// Lagrange coefficients of the first and last epochs, relative to the middle one
#[derive(Debug, Clone, Copy)]
struct Lagrange {
    f1: f64,
    g1: f64,
    f3: f64,
    g3: f64,
}

impl Lagrange {
    /// Truncated series, for a geocentric distance `r2`
    fn series(mu: f64, r2: f64, tau1: f64, tau3: f64) -> Self {
        let u = mu / r2.powi(3);
        Self {
            f1: 1.0 - u * tau1 * tau1 / 2.0,
            g1: tau1 - u * tau1.powi(3) / 6.0,
            f3: 1.0 - u * tau3 * tau3 / 2.0,
            g3: tau3 - u * tau3.powi(3) / 6.0,
        }
    }

    fn determinant(&self) -> f64 {
        self.f1 * self.g3 - self.f3 * self.g1
    }
}

pub(crate) struct GaussSolver<'a> {
    body: &'a CentralBody,
    opts: &'a IodOpts,
    kepler: &'a KeplerOpts,
    epochs: [Epoch; 3],
    /// Inertial unit lines of sight
    los: [Vector3<f64>; 3],
    /// Inertial station positions
    sites: [Vector3<f64>; 3],
    /// ρ̂1 . (ρ̂2 x ρ̂3)
    d0: f64,
    /// d[(i, j)] = Ri . pj with p1 = ρ̂2 x ρ̂3, p2 = ρ̂1 x ρ̂3, p3 = ρ̂1 x ρ̂2
    d: Matrix3<f64>,
}

impl<'a> GaussSolver<'a> {
    pub fn new(
        body: &'a CentralBody,
        opts: &'a IodOpts,
        kepler: &'a KeplerOpts,
        observations: [&AnglesObservation; 3],
    ) -> Result<Self, Error> {
        let epochs = observations.map(|obs| obs.epoch);
        let los = observations.map(|obs| obs.line_of_sight(body));
        let sites = observations.map(|obs| obs.station_position(body));

        let p = [
            los[1].cross(&los[2]),
            los[0].cross(&los[2]),
            los[0].cross(&los[1]),
        ];

        let d0 = los[0].dot(&p[0]);

        if d0.abs() < opts.min_triple_product {
            return Err(Error::IllConditionedGeometry(format!(
                "coplanar lines of sight (triple product {:.3E})",
                d0
            )));
        }

        let d = Matrix3::from_fn(|i, j| sites[i].dot(&p[j]));

        Ok(Self {
            body,
            opts,
            kepler,
            epochs,
            los,
            sites,
            d0,
            d,
        })
    }

    /// (τ1, τ3): first and last epochs relative to the middle one (s),
    /// corrected for the light travel time when requested.
    fn intervals(&self, ranges: &[f64; 3]) -> (f64, f64) {
        let mut tau1 = elapsed_seconds(self.epochs[1], self.epochs[0]);
        let mut tau3 = elapsed_seconds(self.epochs[1], self.epochs[2]);
        if self.opts.light_time {
            tau1 -= (ranges[0] - ranges[1]) / SPEED_OF_LIGHT_KM_S;
            tau3 -= (ranges[2] - ranges[1]) / SPEED_OF_LIGHT_KM_S;
        }
        (tau1, tau3)
    }

    /// Slant ranges satisfying r2 = c1 r1 + c3 r3
    fn ranges(&self, c1: f64, c3: f64) -> [f64; 3] {
        let d = &self.d;
        [
            (-d[(0, 0)] + d[(1, 0)] / c1 - c3 * d[(2, 0)] / c1) / self.d0,
            (-c1 * d[(0, 1)] + d[(1, 1)] - c3 * d[(2, 1)]) / self.d0,
            (-c1 * d[(0, 2)] / c3 + d[(1, 2)] / c3 - d[(2, 2)]) / self.d0,
        ]
    }

    /// Positions and middle velocity, from slant ranges and Lagrange coefficients.
    fn estimate(&self, ranges: [f64; 3], lagrange: &Lagrange) -> Result<Estimate, Error> {
        let det = lagrange.determinant();
        if det.abs() < MIN_LAGRANGE_DETERMINANT {
            return Err(Error::IllConditionedGeometry(format!(
                "singular Lagrange system ({:.3E})",
                det
            )));
        }

        let positions = [0, 1, 2].map(|i| self.sites[i] + ranges[i] * self.los[i]);
        let velocity = (-lagrange.f3 * positions[0] + lagrange.f1 * positions[2]) / det;

        Ok(Estimate {
            ranges,
            positions,
            velocity,
        })
    }

    /// Gauss polynomial in the middle geocentric distance
    fn polynomial(&self, tau1: f64, tau3: f64) -> (GaussPolynomial, f64, f64) {
        let mu = self.body.mu_km3_s2;
        let tau = tau3 - tau1;
        let d = &self.d;

        let a = (-d[(0, 1)] * tau3 / tau + d[(1, 1)] + d[(2, 1)] * tau1 / tau) / self.d0;
        let b = (d[(0, 1)] * (tau3 * tau3 - tau * tau) * tau3 / tau
            + d[(2, 1)] * (tau * tau - tau1 * tau1) * tau1 / tau)
            / 6.0
            / self.d0;
        let e = self.sites[1].dot(&self.los[1]);
        let r2_sq = self.sites[1].norm_squared();

        (
            GaussPolynomial {
                a: -(a * a + 2.0 * a * e + r2_sq),
                b: -2.0 * mu * b * (a + e),
                c: -(mu * b).powi(2),
            },
            a,
            b,
        )
    }

    /// Negative specific energy
    fn is_bound(&self, position: &Vector3<f64>, velocity: &Vector3<f64>) -> bool {
        let energy = velocity.norm_squared() / 2.0 - self.body.mu_km3_s2 / position.norm();
        energy < 0.0
    }

    /// Bound orbit, perigee above the central body, ahead of every station.
    fn is_physical(&self, estimate: &Estimate) -> bool {
        let radius = self.body.equatorial_radius_km;
        let mu = self.body.mu_km3_s2;

        if estimate.ranges.iter().any(|range| *range <= 0.0) {
            return false;
        }

        let r = estimate.positions[1];
        let v = estimate.velocity;
        let energy = v.norm_squared() / 2.0 - mu / r.norm();
        if energy.is_nan() || energy >= 0.0 {
            return false;
        }

        let a = -mu / (2.0 * energy);
        let e_vec = ((v.norm_squared() - mu / r.norm()) * r - r.dot(&v) * v) / mu;
        a * (1.0 - e_vec.norm()) > radius
    }

    /// First estimate from a polynomial root
    fn initial_estimate(&self, root: f64, tau1: f64, tau3: f64) -> Result<Estimate, Error> {
        let mu = self.body.mu_km3_s2;
        let tau = tau3 - tau1;
        let u = mu / (6.0 * root.powi(3));

        let c1 = tau3 / tau * (1.0 + u * (tau * tau - tau3 * tau3));
        let c3 = -tau1 / tau * (1.0 + u * (tau * tau - tau1 * tau1));

        let lagrange = Lagrange::series(mu, root, tau1, tau3);
        self.estimate(self.ranges(c1, c3), &lagrange)
    }

    /// One Gauss pass with exact Lagrange coefficients, from the middle
    /// state packed as (r2, v2 T). Returns the new estimate and its packed state.
    fn gauss_map(
        &self,
        x: &Vector6<f64>,
        tau1: f64,
        tau3: f64,
        scale: f64,
    ) -> Result<(Estimate, Vector6<f64>), Error> {
        let mu = self.body.mu_km3_s2;
        let r2 = x.fixed_rows::<3>(0).into_owned();
        let v2 = x.fixed_rows::<3>(3).into_owned() / scale;

        if !self.is_bound(&r2, &v2) {
            return Err(Error::IllConditionedGeometry(
                "unbound refinement iterate".to_string(),
            ));
        }

        let first = universal_lagrange(&r2, &v2, tau1, mu, self.kepler)?;
        let last = universal_lagrange(&r2, &v2, tau3, mu, self.kepler)?;

        let lagrange = Lagrange {
            f1: first.f,
            g1: first.g,
            f3: last.f,
            g3: last.g,
        };

        let det = lagrange.determinant();
        if det.abs() < MIN_LAGRANGE_DETERMINANT {
            return Err(Error::IllConditionedGeometry(format!(
                "singular Lagrange system ({:.3E})",
                det
            )));
        }

        let ranges = self.ranges(lagrange.g3 / det, -lagrange.g1 / det);
        let estimate = self.estimate(ranges, &lagrange)?;
        let packed = pack(&estimate.positions[1], &estimate.velocity, scale);
        Ok((estimate, packed))
    }

    /// Newton iterations on the fixed point of the exact Gauss pass,
    /// damped by a backtracking line search.
    fn refine(&self, initial: Estimate) -> Result<(Estimate, usize), Error> {
        let (tau1, tau3) = self.intervals(&initial.ranges);
        let scale = tau3 - tau1;

        let mut x = pack(&initial.positions[1], &initial.velocity, scale);
        let mut ranges = initial.ranges;
        let mut residual = f64::INFINITY;

        for iteration in 1..=self.opts.max_iterations {
            let (tau1, tau3) = self.intervals(&ranges);
            let (estimate, mapped) = self
                .gauss_map(&x, tau1, tau3, scale)
                .map_err(|e| diverged(e, iteration, residual))?;
            let f = mapped - x;
            residual = f.amax();

            trace!(
                "gauss refinement #{}: ρ=[{:.6}, {:.6}, {:.6}]km (Δ={:.3E}km)",
                iteration,
                estimate.ranges[0],
                estimate.ranges[1],
                estimate.ranges[2],
                residual
            );

            if !residual.is_finite() {
                break;
            }

            if residual < self.opts.tolerance_km {
                return Ok((estimate, iteration));
            }

            let mut jacobian = Matrix6::<f64>::zeros();
            for j in 0..6 {
                let h = JACOBIAN_STEP * x[j].abs().max(1.0);
                let mut shifted = x;
                shifted[j] += h;
                let (_, mapped) = self
                    .gauss_map(&shifted, tau1, tau3, scale)
                    .map_err(|e| diverged(e, iteration, residual))?;
                jacobian.set_column(j, &((mapped - shifted - f) / h));
            }

            let step = jacobian.lu().solve(&-f).ok_or(Error::ConvergenceError {
                solver: Solver::GaussRefinement,
                iterations: iteration,
                residual,
            })?;

            let norm = f.norm();
            let mut lambda: f64 = 1.0;
            loop {
                let candidate = x + lambda * step;
                if let Ok((estimate, mapped)) = self.gauss_map(&candidate, tau1, tau3, scale) {
                    if (mapped - candidate).norm() < (1.0 - 1.0E-4 * lambda) * norm {
                        x = candidate;
                        ranges = estimate.ranges;
                        break;
                    }
                }
                lambda /= 2.0;
                if lambda < MIN_LINE_SEARCH_STEP {
                    debug!("gauss refinement: stalled at Δ={:.3E}km", residual);
                    return Err(Error::ConvergenceError {
                        solver: Solver::GaussRefinement,
                        iterations: iteration,
                        residual,
                    });
                }
            }
        }

        Err(Error::ConvergenceError {
            solver: Solver::GaussRefinement,
            iterations: self.opts.max_iterations,
            residual,
        })
    }

    pub fn solve(&self) -> Result<IodSolution, Error> {
        let (tau1, tau3) = self.intervals(&[0.0; 3]);
        let (polynomial, a, b) = self.polynomial(tau1, tau3);

        trace!(
            "gauss: τ1={:.3}s τ3={:.3}s A={:.6} B={:.6E} {:?}",
            tau1,
            tau3,
            a,
            b,
            polynomial
        );

        let roots = polynomial.positive_roots(self.body.equatorial_radius_km)?;

        let mut candidates = Vec::with_capacity(roots.len());
        let mut refinement_error = None;

        for root in roots.iter().copied() {
            if root <= self.body.equatorial_radius_km {
                debug!("gauss: rejected root r2={:.3}km (below surface)", root);
                continue;
            }
            let initial = match self.initial_estimate(root, tau1, tau3) {
                Ok(initial)
                    if initial.ranges.iter().all(|range| *range > 0.0)
                        && self.is_bound(&initial.positions[1], &initial.velocity) =>
                {
                    initial
                },
                Ok(_) => {
                    debug!("gauss: rejected root r2={:.3}km", root);
                    continue;
                },
                Err(e) => {
                    debug!("gauss: rejected root r2={:.3}km: {}", root, e);
                    continue;
                },
            };
            match self.refine(initial) {
                Ok((estimate, iterations)) if self.is_physical(&estimate) => {
                    candidates.push((root, estimate, iterations));
                },
                Ok(_) => debug!("gauss: root r2={:.3}km refined to a non physical orbit", root),
                Err(e) => {
                    debug!("gauss: root r2={:.3}km: {}", root, e);
                    refinement_error = Some(e);
                },
            }
        }

        let (root, estimate, iterations) = match candidates.len() {
            0 => {
                return Err(refinement_error.unwrap_or(Error::NoPhysicalSolution {
                    candidates: roots.len(),
                }))
            },
            1 => candidates[0],
            _ => match self.opts.prior_radius_km {
                Some(prior) => {
                    let distance =
                        |estimate: &Estimate| (estimate.positions[1].norm() - prior).abs();
                    let selected = candidates
                        .iter()
                        .min_by(|(_, a, _), (_, b, _)| distance(a).total_cmp(&distance(b)))
                        .copied()
                        .ok_or(Error::NoPhysicalSolution {
                            candidates: roots.len(),
                        })?;
                    debug!(
                        "gauss: r2={:.3}km closest to prior {:.3}km",
                        selected.1.positions[1].norm(),
                        prior
                    );
                    selected
                },
                None => {
                    let physical = candidates.iter().map(|(root, _, _)| *root).collect::<Vec<_>>();
                    warn!("gauss: ambiguous physical roots {:?}", physical);
                    return Err(Error::AmbiguousSolution(physical));
                },
            },
        };

        let epoch = if self.opts.light_time {
            offset(self.epochs[1], -estimate.ranges[1] / SPEED_OF_LIGHT_KM_S)
        } else {
            self.epochs[1]
        };

        Ok(IodSolution {
            state: CartesianState::new(epoch, estimate.positions[1], estimate.velocity),
            candidate_roots_km: candidates.iter().map(|(root, _, _)| *root).collect(),
            selected_root_km: root,
            slant_ranges_km: estimate.ranges,
            iterations,
            rms_residual_rad: None,
        })
    }
}
