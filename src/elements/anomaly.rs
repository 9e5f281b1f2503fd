use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::KeplerOpts,
    kepler::{solve_elliptic, solve_hyperbolic, wrap_pi, wrap_two_pi},
    prelude::Error,
};

/// Kind of anomaly, see [Anomaly]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnomalyKind {
    Mean,
    True,
    Eccentric,
}

/// Position along the orbit (rad).
/// For hyperbolic orbits, [Anomaly::Eccentric] holds the hyperbolic
/// anomaly H and [Anomaly::Mean] the hyperbolic mean anomaly.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Anomaly {
    Mean(f64),
    True(f64),
    Eccentric(f64),
}

impl Anomaly {
    /// Mean anomaly, expressed in degrees
    pub fn mean_deg(deg: f64) -> Self {
        Self::Mean(deg.to_radians())
    }

    /// True anomaly, expressed in degrees
    pub fn true_deg(deg: f64) -> Self {
        Self::True(deg.to_radians())
    }

    /// Eccentric anomaly, expressed in degrees
    pub fn eccentric_deg(deg: f64) -> Self {
        Self::Eccentric(deg.to_radians())
    }

    pub fn kind(&self) -> AnomalyKind {
        match self {
            Self::Mean(_) => AnomalyKind::Mean,
            Self::True(_) => AnomalyKind::True,
            Self::Eccentric(_) => AnomalyKind::Eccentric,
        }
    }

    /// Anomaly value (rad)
    pub fn value(&self) -> f64 {
        match self {
            Self::Mean(v) | Self::True(v) | Self::Eccentric(v) => *v,
        }
    }

    /// Anomaly value (deg)
    pub fn value_deg(&self) -> f64 {
        self.value().to_degrees()
    }

    /// Normalizes elliptic anomalies into [0, 2π). Hyperbolic eccentric and
    /// mean anomalies are unbounded and left untouched.
    pub(crate) fn normalized(&self, e: f64) -> Self {
        match self {
            Self::True(v) => Self::True(wrap_two_pi(*v)),
            Self::Mean(v) if e < 1.0 => Self::Mean(wrap_two_pi(*v)),
            Self::Eccentric(v) if e < 1.0 => Self::Eccentric(wrap_two_pi(*v)),
            other => *other,
        }
    }

    /// Converts to the true anomaly (rad) for eccentricity `e`.
    pub fn to_true(&self, e: f64, opts: &KeplerOpts) -> Result<f64, Error> {
        let eccentric = match self {
            Self::True(nu) => return Ok(wrap_two_pi(*nu)),
            Self::Eccentric(ecc) => *ecc,
            Self::Mean(mean) => {
                if e < 1.0 {
                    solve_elliptic(*mean, e, opts)?
                } else {
                    solve_hyperbolic(*mean, e, opts)?
                }
            },
        };

        let nu = if e < 1.0 {
            2.0 * ((1.0 + e).sqrt() * (eccentric / 2.0).sin())
                .atan2((1.0 - e).sqrt() * (eccentric / 2.0).cos())
        } else {
            2.0 * (((e + 1.0) / (e - 1.0)).sqrt() * (eccentric / 2.0).tanh()).atan()
        };

        Ok(wrap_two_pi(nu))
    }

    /// Converts to the desired [AnomalyKind], for eccentricity `e`.
    pub fn to_kind(&self, kind: AnomalyKind, e: f64, opts: &KeplerOpts) -> Result<Self, Error> {
        if self.kind() == kind {
            return Ok(*self);
        }

        let nu = self.to_true(e, opts)?;

        if kind == AnomalyKind::True {
            return Ok(Self::True(nu));
        }

        let (eccentric, mean) = if e < 1.0 {
            let ecc = 2.0 * ((1.0 - e).sqrt() * (nu / 2.0).sin())
                .atan2((1.0 + e).sqrt() * (nu / 2.0).cos());
            let ecc = wrap_two_pi(ecc);
            (ecc, wrap_two_pi(ecc - e * ecc.sin()))
        } else {
            let nu = wrap_pi(nu);
            let half_tan = (nu / 2.0).tan() * ((e - 1.0) / (e + 1.0)).sqrt();
            if half_tan.abs() >= 1.0 {
                return Err(Error::InvalidState(format!(
                    "true anomaly {:.3}° beyond hyperbolic asymptote",
                    nu.to_degrees()
                )));
            }
            let hyp = 2.0 * half_tan.atanh();
            (hyp, e * hyp.sinh() - hyp)
        };

        Ok(match kind {
            AnomalyKind::Eccentric => Self::Eccentric(eccentric),
            _ => Self::Mean(mean),
        })
    }
}

/// Angular distance between two angles (rad), in [0, π]
pub(crate) fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(0.0)]
    #[case(0.1)]
    #[case(0.7)]
    #[case(0.97)]
    fn elliptic_conversions(#[case] e: f64) {
        let opts = KeplerOpts::default();
        for deg in (0..360).step_by(15) {
            let mean = Anomaly::mean_deg(deg as f64);
            let nu = mean.to_kind(AnomalyKind::True, e, &opts).unwrap();
            let ecc = nu.to_kind(AnomalyKind::Eccentric, e, &opts).unwrap();
            let back = ecc.to_kind(AnomalyKind::Mean, e, &opts).unwrap();
            assert!(
                angular_distance(back.value(), mean.value()) < 1.0E-10,
                "e={} M={}° -> {}°",
                e,
                deg,
                back.value_deg()
            );
        }
    }

    #[test]
    fn hyperbolic_conversions() {
        let opts = KeplerOpts::default();
        let e = 1.8;
        for mean in [-5.0, -0.3, 0.0, 0.4, 12.0] {
            let nu = Anomaly::Mean(mean).to_true(e, &opts).unwrap();
            let back = Anomaly::True(nu).to_kind(AnomalyKind::Mean, e, &opts).unwrap();
            assert!((back.value() - mean).abs() < 1.0E-9 * mean.abs().max(1.0));
        }
        // beyond the asymptote
        assert!(Anomaly::true_deg(150.0)
            .to_kind(AnomalyKind::Mean, 1.5, &opts)
            .is_err());
    }

    #[test]
    fn circular_anomalies_coincide() {
        let opts = KeplerOpts::default();
        let nu = Anomaly::mean_deg(123.0).to_true(0.0, &opts).unwrap();
        assert!((nu.to_degrees() - 123.0).abs() < 1.0E-10);
    }
}
