use std::f64::consts::{PI, TAU};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::{CentralBody, KeplerOpts},
    kepler::wrap_two_pi,
    prelude::{Anomaly, AnomalyKind, Error},
};

const INCLINATION_ROUNDING: f64 = 1.0E-12;

/// Classical orbital elements. Angles are stored in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerianElements {
    /// Semi major axis (km), negative for hyperbolic orbits
    pub a: f64,
    /// Eccentricity
    pub e: f64,
    /// Inclination, in [0, π]
    pub i: f64,
    /// Right ascension of the ascending node, in [0, 2π)
    pub raan: f64,
    /// Argument of periapsis, in [0, 2π)
    pub aop: f64,
    /// Position along the orbit
    pub anomaly: Anomaly,
}

impl KeplerianElements {
    /// Builds [KeplerianElements] from angles in radians.
    /// Fails when the elements do not describe an orbit:
    /// a(1-e) must be positive, elliptic orbits need a > 0 and
    /// hyperbolic ones a < 0, parabolic orbits are not supported.
    pub fn new(a: f64, e: f64, i: f64, raan: f64, aop: f64, anomaly: Anomaly) -> Result<Self, Error> {
        if !(a.is_finite()
            && e.is_finite()
            && i.is_finite()
            && raan.is_finite()
            && aop.is_finite()
            && anomaly.value().is_finite())
        {
            return Err(Error::InvalidState("non finite elements".to_string()));
        }
        if e < 0.0 {
            return Err(Error::InvalidState(format!("negative eccentricity {}", e)));
        }
        if (e - 1.0).abs() < 1.0E-10 {
            return Err(Error::InvalidState("parabolic orbit".to_string()));
        }
        if a * (1.0 - e) <= 0.0 {
            return Err(Error::InvalidState(format!(
                "a={} km incompatible with e={}",
                a, e
            )));
        }
        // tolerate the rounding of degree conversions at the boundaries
        if !(-INCLINATION_ROUNDING..=PI + INCLINATION_ROUNDING).contains(&i) {
            return Err(Error::InvalidState(format!(
                "inclination {}° out of [0, 180]",
                i.to_degrees()
            )));
        }

        Ok(Self {
            a,
            e,
            i: i.clamp(0.0, PI),
            raan: wrap_two_pi(raan),
            aop: wrap_two_pi(aop),
            anomaly: anomaly.normalized(e),
        })
    }

    /// Builds [KeplerianElements] from angles in degrees. Use [Anomaly::mean_deg],
    /// [Anomaly::true_deg] or [Anomaly::eccentric_deg] to express the anomaly.
    pub fn from_degrees(
        a: f64,
        e: f64,
        i_deg: f64,
        raan_deg: f64,
        aop_deg: f64,
        anomaly: Anomaly,
    ) -> Result<Self, Error> {
        Self::new(
            a,
            e,
            i_deg.to_radians(),
            raan_deg.to_radians(),
            aop_deg.to_radians(),
            anomaly,
        )
    }

    pub fn inclination_deg(&self) -> f64 {
        self.i.to_degrees()
    }

    pub fn raan_deg(&self) -> f64 {
        self.raan.to_degrees()
    }

    pub fn aop_deg(&self) -> f64 {
        self.aop.to_degrees()
    }

    pub fn is_hyperbolic(&self) -> bool {
        self.e > 1.0
    }

    /// Copies and returns [KeplerianElements] with a new [Anomaly]
    pub fn with_anomaly(&self, anomaly: Anomaly) -> Self {
        let mut s = *self;
        s.anomaly = anomaly.normalized(self.e);
        s
    }

    /// Converts the anomaly to the desired [AnomalyKind]
    pub fn to_anomaly_kind(&self, kind: AnomalyKind, opts: &KeplerOpts) -> Result<Self, Error> {
        Ok(self.with_anomaly(self.anomaly.to_kind(kind, self.e, opts)?))
    }

    /// Mean motion (rad s⁻¹)
    pub fn mean_motion(&self, body: &CentralBody) -> f64 {
        (body.mu_km3_s2 / self.a.abs().powi(3)).sqrt()
    }

    /// Orbital period (s), None for hyperbolic orbits
    pub fn period(&self, body: &CentralBody) -> Option<f64> {
        if self.is_hyperbolic() {
            None
        } else {
            Some(TAU / self.mean_motion(body))
        }
    }

    /// Semi latus rectum (km)
    pub fn semi_latus_rectum(&self) -> f64 {
        self.a * (1.0 - self.e * self.e)
    }

    /// Periapsis radius (km)
    pub fn periapsis_radius(&self) -> f64 {
        self.a * (1.0 - self.e)
    }

    /// Apoapsis radius (km), None for hyperbolic orbits
    pub fn apoapsis_radius(&self) -> Option<f64> {
        if self.is_hyperbolic() {
            None
        } else {
            Some(self.a * (1.0 + self.e))
        }
    }

    /// Specific orbital energy (km² s⁻²)
    pub fn specific_energy(&self, body: &CentralBody) -> f64 {
        -body.mu_km3_s2 / (2.0 * self.a)
    }

    /// Hyperbolic excess velocity (km s⁻¹), None for elliptic orbits
    pub fn hyperbolic_excess_velocity(&self, body: &CentralBody) -> Option<f64> {
        if self.is_hyperbolic() {
            Some((-body.mu_km3_s2 / self.a).sqrt())
        } else {
            None
        }
    }
}

impl std::fmt::Display for KeplerianElements {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let anomaly = match self.anomaly.kind() {
            AnomalyKind::Mean => "M",
            AnomalyKind::True => "ν",
            AnomalyKind::Eccentric => "E",
        };
        write!(
            f,
            "a={:.3}km e={:.6} i={:.4}° Ω={:.4}° ω={:.4}° {}={:.4}°",
            self.a,
            self.e,
            self.inclination_deg(),
            self.raan_deg(),
            self.aop_deg(),
            anomaly,
            self.anomaly.value_deg()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_elements() {
        assert!(KeplerianElements::from_degrees(7000.0, -0.1, 45.0, 0.0, 0.0, Anomaly::True(0.0)).is_err());
        assert!(KeplerianElements::from_degrees(7000.0, 1.0, 45.0, 0.0, 0.0, Anomaly::True(0.0)).is_err());
        assert!(KeplerianElements::from_degrees(7000.0, 1.5, 45.0, 0.0, 0.0, Anomaly::True(0.0)).is_err());
        assert!(KeplerianElements::from_degrees(-7000.0, 0.5, 45.0, 0.0, 0.0, Anomaly::True(0.0)).is_err());
        assert!(KeplerianElements::from_degrees(7000.0, 0.1, 190.0, 0.0, 0.0, Anomaly::True(0.0)).is_err());
        assert!(KeplerianElements::from_degrees(f64::NAN, 0.1, 45.0, 0.0, 0.0, Anomaly::True(0.0)).is_err());
        assert!(KeplerianElements::from_degrees(-7000.0, 1.5, 45.0, 0.0, 0.0, Anomaly::True(0.0)).is_ok());
    }

    #[test]
    fn normalization_and_derived_quantities() {
        let body = CentralBody::earth();
        let elements =
            KeplerianElements::from_degrees(7000.0, 0.1, 98.0, -10.0, 370.0, Anomaly::mean_deg(-90.0))
                .unwrap();

        assert!((elements.raan_deg() - 350.0).abs() < 1.0E-10);
        assert!((elements.aop_deg() - 10.0).abs() < 1.0E-10);
        assert!((elements.anomaly.value_deg() - 270.0).abs() < 1.0E-10);

        assert!((elements.periapsis_radius() - 6300.0).abs() < 1.0E-9);
        assert!((elements.apoapsis_radius().unwrap() - 7700.0).abs() < 1.0E-9);
        let period = elements.period(&body).unwrap();
        assert!((period - 5828.516).abs() < 1.0E-2, "period {}", period);
        assert!(elements.hyperbolic_excess_velocity(&body).is_none());
    }
}
