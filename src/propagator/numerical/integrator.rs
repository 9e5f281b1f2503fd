//! Runge-Kutta integration of the 6 dimensional state vector.
use log::{debug, trace};
use nalgebra::Vector6;

use crate::{
    cfg::{IntegratorKind, IntegratorOpts},
    error::Divergence,
};

type State = Vector6<f64>;

// Dormand-Prince 5(4) tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th order weights (FSAL: also the 7th stage row)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// 5th minus 4th order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const MIN_SHRINK: f64 = 0.2;
const MAX_GROWTH: f64 = 5.0;

/// Integration failure, with the time offset (s) it occured at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Aborted {
    pub t: f64,
    pub cause: Divergence,
}

fn rk4_step<F: Fn(f64, &State) -> State>(f: &F, t: f64, y: &State, h: f64) -> State {
    let k1 = f(t, y);
    let k2 = f(t + h / 2.0, &(y + h / 2.0 * k1));
    let k3 = f(t + h / 2.0, &(y + h / 2.0 * k2));
    let k4 = f(t + h, &(y + h * k3));
    y + h / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4)
}

/// One Dormand-Prince step: 5th order solution and local error estimate.
fn dopri_step<F: Fn(f64, &State) -> State>(f: &F, t: f64, y: &State, h: f64) -> (State, State) {
    let k1 = f(t, y);
    let k2 = f(t + C2 * h, &(y + h * A21 * k1));
    let k3 = f(t + C3 * h, &(y + h * (A31 * k1 + A32 * k2)));
    let k4 = f(t + C4 * h, &(y + h * (A41 * k1 + A42 * k2 + A43 * k3)));
    let k5 = f(
        t + C5 * h,
        &(y + h * (A51 * k1 + A52 * k2 + A53 * k3 + A54 * k4)),
    );
    let k6 = f(
        t + h,
        &(y + h * (A61 * k1 + A62 * k2 + A63 * k3 + A64 * k4 + A65 * k5)),
    );

    let y_new = y + h * (B1 * k1 + B3 * k3 + B4 * k4 + B5 * k5 + B6 * k6);
    let k7 = f(t + h, &y_new);

    let error = h * (E1 * k1 + E3 * k3 + E4 * k4 + E5 * k5 + E6 * k6 + E7 * k7);
    (y_new, error)
}

/// Scaled error norm: <= 1 means the step is accepted.
fn error_norm(opts: &IntegratorOpts, y: &State, y_new: &State, error: &State) -> f64 {
    (0..6)
        .map(|i| {
            let scale = opts.abs_tol + opts.rel_tol * y[i].abs().max(y_new[i].abs());
            (error[i] / scale).abs()
        })
        .fold(0.0, f64::max)
}

/// Integrates `y' = f(t, y)` from t = 0, returning the state at each
/// of the `targets` offsets (s). Targets share one sign and are sorted by
/// increasing magnitude. Each target is reached exactly. `check` is invoked
/// on every accepted step and may abort the integration.
pub(crate) fn integrate<F, C>(
    opts: &IntegratorOpts,
    f: F,
    y0: State,
    targets: &[f64],
    check: C,
) -> Result<Vec<State>, Aborted>
where
    F: Fn(f64, &State) -> State,
    C: Fn(&State) -> Result<(), Divergence>,
{
    let direction = match targets.last() {
        Some(last) if *last < 0.0 => -1.0,
        _ => 1.0,
    };

    let mut t = 0.0_f64;
    let mut y = y0;
    let mut h = opts.initial_step_s.abs().clamp(opts.min_step_s, opts.max_step_s);
    let mut steps = 0_usize;
    let mut rejected = 0_usize;
    let mut outputs = Vec::with_capacity(targets.len());

    for target in targets {
        while (target - t) * direction > 0.0 {
            steps += 1;
            if steps > opts.max_steps {
                return Err(Aborted {
                    t,
                    cause: Divergence::StepBudget {
                        steps: opts.max_steps,
                    },
                });
            }

            let remaining = (target - t).abs();
            let last = h >= remaining;
            let h_try = if last { remaining } else { h };

            let y_new = match opts.kind {
                IntegratorKind::Rk4 => rk4_step(&f, t, &y, direction * h_try),
                IntegratorKind::DormandPrince45 => {
                    let (y_new, error) = dopri_step(&f, t, &y, direction * h_try);
                    let norm = error_norm(opts, &y, &y_new, &error);

                    let factor = if norm == 0.0 {
                        MAX_GROWTH
                    } else {
                        (opts.safety * norm.powf(-0.2)).clamp(MIN_SHRINK, MAX_GROWTH)
                    };

                    if norm > 1.0 || !norm.is_finite() {
                        if h_try <= opts.min_step_s {
                            return Err(Aborted {
                                t,
                                cause: Divergence::StepUnderflow { step_s: h_try },
                            });
                        }
                        rejected += 1;
                        trace!("rejected step h={:.3E}s (err={:.3E})", h_try, norm);
                        h = (h_try * factor).max(opts.min_step_s);
                        continue;
                    }

                    let h_next = (h_try * factor).clamp(opts.min_step_s, opts.max_step_s);
                    // a step shortened to land on the target must not shrink the next one
                    h = if last { h_next.max(h) } else { h_next };
                    y_new
                },
            };

            if !y_new.iter().all(|value| value.is_finite()) {
                return Err(Aborted {
                    t,
                    cause: Divergence::NonFinite,
                });
            }

            t = if last { *target } else { t + direction * h_try };
            y = y_new;

            check(&y).map_err(|cause| Aborted { t, cause })?;
        }
        outputs.push(y);
    }

    debug!(
        "{} integration: {} steps ({} rejected) over {:.3}s",
        opts.kind, steps, rejected, t
    );

    Ok(outputs)
}
