//! Numerical integration of the perturbed equations of motion.
use log::{debug, warn};
use nalgebra::Vector6;

use crate::{
    cfg::{Config, IntegratorOpts},
    elements::Frame,
    ephemeris::Ephemeris,
    error::Divergence,
    prelude::{CartesianState, Epoch, Error},
    propagator::{check_ordering, Propagator},
    time::{elapsed_seconds, offset},
};

mod atmosphere;
mod bodies;
mod forces;
mod integrator;

pub use atmosphere::{Atmosphere, DensityLayer, DensityTable};
pub use bodies::{moon_position, sun_position};
pub use forces::{ForceModel, Perturbation};

use forces::ellipsoidal_altitude;
use integrator::{integrate, Aborted};

/// Propagates a state through the [ForceModel] with a Runge-Kutta
/// integrator. Output epochs are reached exactly, whatever the internal step.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericalPropagator {
    force: ForceModel,
    integrator: IntegratorOpts,
}

impl NumericalPropagator {
    pub fn new(force: ForceModel, integrator: IntegratorOpts) -> Self {
        Self { force, integrator }
    }

    /// Builds a [NumericalPropagator] from a [Config] preset.
    /// Fails with [Error::UnsupportedPerturbation] on invalid force model parameters.
    pub fn from_config(cfg: &Config) -> Result<Self, Error> {
        let force = ForceModel::new(cfg.body, &cfg.perturbations)?;
        if force.perturbations().is_empty() {
            debug!("numerical propagator: two body dynamics");
        } else {
            debug!(
                "numerical propagator: {} with {}",
                cfg.integrator.kind,
                force.perturbations().iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
            );
        }
        Ok(Self::new(force, cfg.integrator))
    }

    pub fn force_model(&self) -> &ForceModel {
        &self.force
    }

    pub fn integrator(&self) -> &IntegratorOpts {
        &self.integrator
    }

    fn decay_check(&self, y: &Vector6<f64>) -> Result<(), Divergence> {
        let r = y.fixed_rows::<3>(0).into_owned();
        let altitude_km = ellipsoidal_altitude(self.force.body(), &r);
        if altitude_km < self.integrator.collision_altitude_km {
            Err(Divergence::Decayed { altitude_km })
        } else {
            Ok(())
        }
    }

    /// Integrates from `t0` towards each offset (s) of `targets`,
    /// all sharing the same sign and sorted by increasing magnitude.
    fn integrate_towards(
        &self,
        t0: Epoch,
        y0: &Vector6<f64>,
        targets: &[f64],
    ) -> Result<Vec<Vector6<f64>>, Error> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let time_dependent = self.force.is_time_dependent();

        integrate(
            &self.integrator,
            |t, y| {
                let epoch = if time_dependent { offset(t0, t) } else { t0 };
                self.force.derivative(epoch, y)
            },
            *y0,
            targets,
            |y| self.decay_check(y),
        )
        .map_err(|Aborted { t, cause }| {
            let epoch = offset(t0, t);
            warn!("{}: integration aborted: {}", epoch, cause);
            Error::DivergentIntegration { epoch, cause }
        })
    }
}

impl Propagator for NumericalPropagator {
    fn ephemeris(&self, initial: &CartesianState, epochs: &[Epoch]) -> Result<Ephemeris, Error> {
        check_ordering(epochs)?;

        let body = self.force.body();
        let t0 = initial.epoch;
        let y0 = initial.to_inertial(body).to_vector6();

        self.decay_check(&y0)
            .map_err(|cause| Error::DivergentIntegration { epoch: t0, cause })?;

        let offsets = epochs
            .iter()
            .map(|epoch| elapsed_seconds(t0, *epoch))
            .collect::<Vec<_>>();

        let split = offsets.partition_point(|dt| *dt < 0.0);

        // backward targets, by increasing magnitude
        let backward = offsets[..split].iter().rev().copied().collect::<Vec<_>>();
        let forward = &offsets[split..];

        let mut backward_states = self.integrate_towards(t0, &y0, &backward)?;
        backward_states.reverse();
        let forward_states = self.integrate_towards(t0, &y0, forward)?;

        let states = epochs
            .iter()
            .zip(backward_states.iter().chain(forward_states.iter()))
            .map(|(epoch, y)| {
                let state = CartesianState::from_vector6(*epoch, Frame::Inertial, y);
                match initial.frame {
                    Frame::Inertial => state,
                    Frame::EarthFixed => state.to_earth_fixed(body),
                }
            })
            .collect();

        Ephemeris::new(states)
    }
}
