#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{
    EARTH_ANGULAR_VEL_RAD, EARTH_EQUATORIAL_RADIUS_KM, EARTH_FLATTENING,
    EARTH_GRAVITATION_MU_KM3_S2, EARTH_J2, EARTH_J3, EARTH_J4,
};

/// Central body physical constants. Passed explicitly to every
/// computation, so alternate bodies (or altered constants) can be
/// substituted at will.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CentralBody {
    /// Gravitational parameter (km^3 s-2)
    pub mu_km3_s2: f64,
    /// Equatorial radius (km)
    pub equatorial_radius_km: f64,
    /// Flattening
    pub flattening: f64,
    /// Second zonal harmonic
    pub j2: f64,
    /// Third zonal harmonic
    pub j3: f64,
    /// Fourth zonal harmonic
    pub j4: f64,
    /// Rotation rate (rad s-1)
    pub rotation_rate_rad_s: f64,
}

impl Default for CentralBody {
    fn default() -> Self {
        Self::earth()
    }
}

impl CentralBody {
    /// Earth (EGM96 zonal terms)
    pub fn earth() -> Self {
        Self {
            mu_km3_s2: EARTH_GRAVITATION_MU_KM3_S2,
            equatorial_radius_km: EARTH_EQUATORIAL_RADIUS_KM,
            flattening: EARTH_FLATTENING,
            j2: EARTH_J2,
            j3: EARTH_J3,
            j4: EARTH_J4,
            rotation_rate_rad_s: EARTH_ANGULAR_VEL_RAD,
        }
    }

    /// Copies and returns [CentralBody] with updated gravitational parameter
    pub fn with_mu(&self, mu_km3_s2: f64) -> Self {
        let mut s = *self;
        s.mu_km3_s2 = mu_km3_s2;
        s
    }

    /// Copies and returns [CentralBody] with updated zonal harmonics
    pub fn with_zonals(&self, j2: f64, j3: f64, j4: f64) -> Self {
        let mut s = *self;
        s.j2 = j2;
        s.j3 = j3;
        s.j4 = j4;
        s
    }

    /// Angular velocity vector, along +Z.
    pub(crate) fn rotation(&self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(0.0, 0.0, self.rotation_rate_rad_s)
    }
}
