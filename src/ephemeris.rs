//! Time ordered sequence of states, as produced by the propagators.
use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::{CentralBody, ConversionOpts},
    elements::{cartesian_to_keplerian, Frame},
    frames::SubSatellitePoint,
    prelude::{CartesianState, Epoch, Error, KeplerianElements},
    time::elapsed_seconds,
};

/// Number of neighbouring states used by [Ephemeris::interpolate]
const INTERPOLATION_POINTS: usize = 8;

/// Read only, strictly increasing sequence of [CartesianState]s,
/// all expressed in the same [Frame].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ephemeris {
    states: Vec<CartesianState>,
}

impl Ephemeris {
    /// Builds a new [Ephemeris]. Epochs must be strictly increasing
    /// and all states expressed in the same frame.
    pub fn new(states: Vec<CartesianState>) -> Result<Self, Error> {
        if states
            .iter()
            .tuple_windows()
            .any(|(prev, next)| next.epoch <= prev.epoch)
        {
            return Err(Error::UnorderedEpochs);
        }
        if !states.iter().map(|state| state.frame).all_equal() {
            return Err(Error::InvalidState("mixed reference frames".to_string()));
        }
        Ok(Self { states })
    }

    pub fn states(&self) -> &[CartesianState] {
        &self.states
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartesianState> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first(&self) -> Option<&CartesianState> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&CartesianState> {
        self.states.last()
    }

    pub fn epochs(&self) -> Vec<Epoch> {
        self.states.iter().map(|state| state.epoch).collect()
    }

    /// Reference frame, None when empty.
    pub fn frame(&self) -> Option<Frame> {
        self.states.first().map(|state| state.frame)
    }

    /// Osculating [KeplerianElements] of every state.
    pub fn to_elements(
        &self,
        body: &CentralBody,
        opts: &ConversionOpts,
    ) -> Result<Vec<KeplerianElements>, Error> {
        self.states
            .iter()
            .map(|state| cartesian_to_keplerian(state, body, opts))
            .collect()
    }

    /// Same ephemeris, expressed in the Earth fixed frame.
    pub fn to_earth_fixed(&self, body: &CentralBody) -> Self {
        Self {
            states: self
                .states
                .iter()
                .map(|state| state.to_earth_fixed(body))
                .collect(),
        }
    }

    /// Same ephemeris, expressed in the inertial frame.
    pub fn to_inertial(&self, body: &CentralBody) -> Self {
        Self {
            states: self
                .states
                .iter()
                .map(|state| state.to_inertial(body))
                .collect(),
        }
    }

    /// Sub satellite points.
    pub fn ground_track(&self, body: &CentralBody) -> Vec<SubSatellitePoint> {
        self.states
            .iter()
            .map(|state| SubSatellitePoint::from_state(state, body))
            .collect()
    }

    /// Lagrange interpolation of position and velocity at `epoch`,
    /// from the neighbouring states. `epoch` must lie within the
    /// ephemeris time span.
    pub fn interpolate(&self, epoch: Epoch) -> Result<CartesianState, Error> {
        let (first, last) = match (self.states.first(), self.states.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(Error::OutOfEphemerisRange(epoch)),
        };

        if epoch < first.epoch || epoch > last.epoch {
            return Err(Error::OutOfEphemerisRange(epoch));
        }

        if let Some(state) = self.states.iter().find(|state| state.epoch == epoch) {
            return Ok(*state);
        }

        // first state past the epoch
        let after = self.states.partition_point(|state| state.epoch < epoch);

        let n = INTERPOLATION_POINTS.min(self.states.len());
        let start = after
            .saturating_sub(n / 2)
            .min(self.states.len() - n);

        let window = &self.states[start..start + n];
        let t = elapsed_seconds(first.epoch, epoch);
        let times = window
            .iter()
            .map(|state| elapsed_seconds(first.epoch, state.epoch))
            .collect::<Vec<_>>();

        let (mut position, mut velocity) = (
            nalgebra::Vector3::zeros(),
            nalgebra::Vector3::zeros(),
        );

        for (j, state) in window.iter().enumerate() {
            let weight = times
                .iter()
                .enumerate()
                .filter(|(m, _)| *m != j)
                .fold(1.0, |w, (_, t_m)| w * (t - t_m) / (times[j] - t_m));

            position += weight * state.position_km;
            velocity += weight * state.velocity_km_s;
        }

        Ok(CartesianState {
            epoch,
            position_km: position,
            velocity_km_s: velocity,
            frame: first.frame,
        })
    }
}

impl<'a> IntoIterator for &'a Ephemeris {
    type Item = &'a CartesianState;
    type IntoIter = std::slice::Iter<'a, CartesianState>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::time::offset;
    use nalgebra::Vector3;

    // circular equatorial orbit, sampled analytically
    fn circular(epoch: Epoch, t: f64) -> CartesianState {
        let radius = 7000.0_f64;
        let w = (398600.4418 / radius.powi(3)).sqrt();
        let (s, c) = (w * t).sin_cos();
        CartesianState::new(
            offset(epoch, t),
            Vector3::new(radius * c, radius * s, 0.0),
            Vector3::new(-radius * w * s, radius * w * c, 0.0),
        )
    }

    #[test]
    fn strictly_increasing() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2025, 1, 1);
        let states = vec![circular(t0, 0.0), circular(t0, 60.0), circular(t0, 60.0)];
        assert_eq!(Ephemeris::new(states), Err(Error::UnorderedEpochs));

        let states = vec![circular(t0, 60.0), circular(t0, 0.0)];
        assert_eq!(Ephemeris::new(states), Err(Error::UnorderedEpochs));

        assert!(Ephemeris::new(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn mixed_frames() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2025, 1, 1);
        let body = CentralBody::earth();
        let states = vec![circular(t0, 0.0), circular(t0, 60.0).to_earth_fixed(&body)];
        assert!(matches!(Ephemeris::new(states), Err(Error::InvalidState(_))));
    }

    #[test]
    fn lagrange_interpolation() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2025, 1, 1);
        let states = (0..30).map(|i| circular(t0, i as f64 * 60.0)).collect();
        let ephemeris = Ephemeris::new(states).unwrap();

        for t in [0.0, 30.0, 95.5, 845.0, 1735.0, 1740.0] {
            let interpolated = ephemeris.interpolate(offset(t0, t)).unwrap();
            let expected = circular(t0, t);
            assert!(
                (interpolated.position_km - expected.position_km).norm() < 1.0E-6,
                "t={} err={}",
                t,
                (interpolated.position_km - expected.position_km).norm()
            );
            assert!((interpolated.velocity_km_s - expected.velocity_km_s).norm() < 1.0E-9);
        }

        assert!(matches!(
            ephemeris.interpolate(offset(t0, -1.0)),
            Err(Error::OutOfEphemerisRange(_))
        ));
        assert!(matches!(
            ephemeris.interpolate(offset(t0, 1741.0)),
            Err(Error::OutOfEphemerisRange(_))
        ));
    }
}
