//! Gauss-Newton differential correction over all lines of sight.
use log::{debug, trace};
use nalgebra::{DMatrix, DVector, Vector3, Vector6};

use crate::{
    cfg::{CentralBody, IodOpts, KeplerOpts},
    constants::SPEED_OF_LIGHT_KM_S,
    error::Solver,
    iod::AnglesObservation,
    kepler::universal_lagrange,
    prelude::{CartesianState, Error},
    time::elapsed_seconds,
};

// finite difference step, relative to the position and velocity magnitudes
const RELATIVE_PERTURBATION: f64 = 1.0E-7;

struct Measurement {
    /// time offset (s) to the reference epoch
    dt: f64,
    site: Vector3<f64>,
    los: Vector3<f64>,
}

struct Problem<'a> {
    mu: f64,
    light_time: bool,
    kepler: &'a KeplerOpts,
    measurements: Vec<Measurement>,
}

impl Problem<'_> {
    /// Predicted lines of sight, stacked
    fn predict(&self, x: &Vector6<f64>) -> Result<DVector<f64>, Error> {
        let r0 = x.fixed_rows::<3>(0).into_owned();
        let v0 = x.fixed_rows::<3>(3).into_owned();

        let mut predicted = DVector::zeros(3 * self.measurements.len());

        for (i, measurement) in self.measurements.iter().enumerate() {
            let lagrange = universal_lagrange(&r0, &v0, measurement.dt, self.mu, self.kepler)?;
            let (mut r, _) = lagrange.apply(&r0, &v0);

            if self.light_time {
                let delay = (r - measurement.site).norm() / SPEED_OF_LIGHT_KM_S;
                let lagrange =
                    universal_lagrange(&r0, &v0, measurement.dt - delay, self.mu, self.kepler)?;
                r = lagrange.apply(&r0, &v0).0;
            }

            let los = (r - measurement.site).normalize();
            predicted.fixed_rows_mut::<3>(3 * i).copy_from(&los);
        }

        Ok(predicted)
    }

    fn observed(&self) -> DVector<f64> {
        let mut observed = DVector::zeros(3 * self.measurements.len());
        for (i, measurement) in self.measurements.iter().enumerate() {
            observed.fixed_rows_mut::<3>(3 * i).copy_from(&measurement.los);
        }
        observed
    }

    /// Finite difference Jacobian of the predicted lines of sight
    fn jacobian(&self, x: &Vector6<f64>, predicted: &DVector<f64>) -> Result<DMatrix<f64>, Error> {
        let position_step = RELATIVE_PERTURBATION * x.fixed_rows::<3>(0).norm();
        let velocity_step = RELATIVE_PERTURBATION * x.fixed_rows::<3>(3).norm();

        let mut jacobian = DMatrix::zeros(predicted.len(), 6);
        for j in 0..6 {
            let step = if j < 3 { position_step } else { velocity_step };
            let mut perturbed = *x;
            perturbed[j] += step;
            let column = (self.predict(&perturbed)? - predicted) / step;
            jacobian.set_column(j, &column);
        }
        Ok(jacobian)
    }
}

/// Refines `initial` so the predicted lines of sight match all `observations`
/// in the least squares sense, with two body dynamics. Returns the corrected
/// state and the root mean square residual (rad).
pub(crate) fn differential_correction(
    body: &CentralBody,
    opts: &IodOpts,
    kepler: &KeplerOpts,
    observations: &[AnglesObservation],
    initial: &CartesianState,
) -> Result<(CartesianState, f64), Error> {
    let problem = Problem {
        mu: body.mu_km3_s2,
        light_time: opts.light_time,
        kepler,
        measurements: observations
            .iter()
            .map(|obs| Measurement {
                dt: elapsed_seconds(initial.epoch, obs.epoch),
                site: obs.station_position(body),
                los: obs.line_of_sight(body),
            })
            .collect(),
    };

    let observed = problem.observed();
    let rms = |residuals: &DVector<f64>| (residuals.norm_squared() / observations.len() as f64).sqrt();

    let mut x = initial.to_vector6();
    let mut change = f64::INFINITY;

    for iteration in 1..=opts.max_correction_iterations {
        let predicted = problem.predict(&x)?;
        let residuals = &observed - &predicted;
        let jacobian = problem.jacobian(&x, &predicted)?;

        let normal = jacobian.transpose() * &jacobian;
        let rhs = jacobian.transpose() * &residuals;

        // equilibration: positions (km) and velocities (km/s) differ by orders of magnitude
        let scale = normal
            .diagonal()
            .map(|d| if d > 0.0 { 1.0 / d.sqrt() } else { 1.0 });
        let scaled = DMatrix::from_fn(6, 6, |i, j| normal[(i, j)] * scale[i] * scale[j]);

        let correction = scaled
            .cholesky()
            .ok_or_else(|| Error::IllConditionedGeometry("singular normal equations".to_string()))?
            .solve(&rhs.component_mul(&scale))
            .component_mul(&scale);

        let dx = Vector6::from_iterator(correction.iter().copied());
        x += dx;

        change = (dx.fixed_rows::<3>(0).norm() / x.fixed_rows::<3>(0).norm())
            .max(dx.fixed_rows::<3>(3).norm() / x.fixed_rows::<3>(3).norm());

        trace!(
            "differential correction #{}: rms={:.3E}rad Δ={:.3E}",
            iteration,
            rms(&residuals),
            change
        );

        if change < opts.correction_tolerance {
            let residuals = &observed - &problem.predict(&x)?;
            let rms = rms(&residuals);
            debug!(
                "differential correction: converged after {} iterations (rms={:.3E}rad)",
                iteration, rms
            );
            let state = CartesianState::new(
                initial.epoch,
                x.fixed_rows::<3>(0).into_owned(),
                x.fixed_rows::<3>(3).into_owned(),
            );
            return Ok((state, rms));
        }
    }

    Err(Error::ConvergenceError {
        solver: Solver::DifferentialCorrection,
        iterations: opts.max_correction_iterations,
        residual: change,
    })
}
