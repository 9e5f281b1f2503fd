use log::trace;

use crate::{
    cfg::{CentralBody, Config, ConversionOpts, OrbitRegime, SingularityPolicy},
    elements::{cartesian_to_keplerian, keplerian_to_cartesian},
    ephemeris::Ephemeris,
    prelude::{Anomaly, AnomalyKind, CartesianState, Epoch, Error, Frame, KeplerianElements},
    propagator::{check_ordering, Propagator},
    time::elapsed_seconds,
};

/// Analytical propagation of the unperturbed Keplerian motion.
/// Exact at every output epoch, it serves as reference
/// for the [NumericalPropagator](crate::prelude::NumericalPropagator).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwoBodyPropagator {
    body: CentralBody,
    conversion: ConversionOpts,
}

impl TwoBodyPropagator {
    /// Builds a new [TwoBodyPropagator]. The [ConversionOpts] apply
    /// to element inputs and outputs, and to the Kepler equation solver.
    pub fn new(body: CentralBody, conversion: ConversionOpts) -> Self {
        Self { body, conversion }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.body, cfg.conversion)
    }

    pub fn body(&self) -> &CentralBody {
        &self.body
    }

    /// Advances `elements`, valid at `t0`, to `t1` (either side of `t0`).
    /// The returned elements carry the true anomaly.
    pub fn propagate_elements(
        &self,
        elements: &KeplerianElements,
        t0: Epoch,
        t1: Epoch,
    ) -> Result<KeplerianElements, Error> {
        let dt = elapsed_seconds(t0, t1);

        let mean = elements
            .anomaly
            .to_kind(AnomalyKind::Mean, elements.e, &self.conversion.kepler)?
            .value();

        let advanced = Anomaly::Mean(mean + elements.mean_motion(&self.body) * dt);
        let nu = advanced.to_true(elements.e, &self.conversion.kepler)?;

        trace!(
            "two body: dt={:.3}s M={:.6}° -> ν={:.6}°",
            dt,
            mean.to_degrees(),
            nu.to_degrees()
        );

        Ok(elements.with_anomaly(Anomaly::True(nu)))
    }

    /// Advances `elements`, valid at `t0`, and converts the
    /// result to an inertial [CartesianState] at `t1`.
    pub fn propagate_keplerian(
        &self,
        elements: &KeplerianElements,
        t0: Epoch,
        t1: Epoch,
    ) -> Result<CartesianState, Error> {
        let propagated = self.propagate_elements(elements, t0, t1)?;
        keplerian_to_cartesian(&propagated, t1, &self.body, &self.conversion)
    }

    /// Cartesian states are valid whatever their geometry:
    /// substitution conventions are applied internally.
    fn internal_conversion(&self) -> ConversionOpts {
        self.conversion
            .with_singularity(SingularityPolicy::Substitute)
            .with_regime(OrbitRegime::Any)
    }
}

impl Propagator for TwoBodyPropagator {
    fn propagate(&self, initial: &CartesianState, epoch: Epoch) -> Result<CartesianState, Error> {
        let opts = self.internal_conversion();

        let elements = cartesian_to_keplerian(initial, &self.body, &opts)?;
        let propagated = self.propagate_elements(&elements, initial.epoch, epoch)?;
        let state = keplerian_to_cartesian(&propagated, epoch, &self.body, &opts)?;

        Ok(match initial.frame {
            Frame::Inertial => state,
            Frame::EarthFixed => state.to_earth_fixed(&self.body),
        })
    }

    fn ephemeris(&self, initial: &CartesianState, epochs: &[Epoch]) -> Result<Ephemeris, Error> {
        check_ordering(epochs)?;
        let states = epochs
            .iter()
            .map(|epoch| self.propagate(initial, *epoch))
            .collect::<Result<Vec<_>, Error>>()?;
        Ephemeris::new(states)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::time::offset;

    #[test]
    fn one_period_returns_home() {
        let propagator = TwoBodyPropagator::default();
        let elements =
            KeplerianElements::from_degrees(7000.0, 0.05, 51.6, 30.0, 60.0, Anomaly::true_deg(10.0))
                .unwrap();
        let t0 = Epoch::from_gregorian_utc_at_midnight(2025, 1, 1);
        let period = elements.period(propagator.body()).unwrap();

        let back = propagator
            .propagate_elements(&elements, t0, offset(t0, period))
            .unwrap();
        let nu = back.anomaly.value();
        assert!(crate::elements::angular_distance(nu, 10.0_f64.to_radians()) < 1.0E-9);

        let half = propagator
            .propagate_elements(&elements, t0, offset(t0, -period / 2.0))
            .unwrap();
        assert!(crate::elements::angular_distance(half.anomaly.value(), nu) > 1.0);
    }

    #[test]
    fn unordered_grid() {
        let propagator = TwoBodyPropagator::default();
        let t0 = Epoch::from_gregorian_utc_at_midnight(2025, 1, 1);
        let state = CartesianState::new(
            t0,
            nalgebra::Vector3::new(7000.0, 0.0, 0.0),
            nalgebra::Vector3::new(0.0, 7.5, 1.0),
        );
        let epochs = [offset(t0, 60.0), t0];
        assert_eq!(
            propagator.ephemeris(&state, &epochs),
            Err(Error::UnorderedEpochs)
        );
    }
}
