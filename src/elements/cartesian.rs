use nalgebra::{Vector3, Vector6};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::CentralBody,
    frames::{ecef_to_eci, eci_to_ecef},
    prelude::Epoch,
};

/// Reference frame a [CartesianState] is expressed in.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Frame {
    /// Geocentric inertial frame (mean equator and equinox)
    #[default]
    Inertial,
    /// Geocentric frame rotating with the central body
    EarthFixed,
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Inertial => write!(f, "ECI"),
            Self::EarthFixed => write!(f, "ECEF"),
        }
    }
}

/// Position (km) and velocity (km s⁻¹) at a given [Epoch].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CartesianState {
    pub epoch: Epoch,
    pub position_km: Vector3<f64>,
    pub velocity_km_s: Vector3<f64>,
    pub frame: Frame,
}

impl CartesianState {
    /// Builds a new inertial [CartesianState]
    pub fn new(epoch: Epoch, position_km: Vector3<f64>, velocity_km_s: Vector3<f64>) -> Self {
        Self {
            epoch,
            position_km,
            velocity_km_s,
            frame: Frame::Inertial,
        }
    }

    /// Builds a new Earth fixed [CartesianState]
    pub fn earth_fixed(epoch: Epoch, position_km: Vector3<f64>, velocity_km_s: Vector3<f64>) -> Self {
        Self {
            epoch,
            position_km,
            velocity_km_s,
            frame: Frame::EarthFixed,
        }
    }

    pub(crate) fn from_vector6(epoch: Epoch, frame: Frame, y: &Vector6<f64>) -> Self {
        Self {
            epoch,
            frame,
            position_km: y.fixed_rows::<3>(0).into_owned(),
            velocity_km_s: y.fixed_rows::<3>(3).into_owned(),
        }
    }

    pub(crate) fn to_vector6(&self) -> Vector6<f64> {
        let (r, v) = (self.position_km, self.velocity_km_s);
        Vector6::new(r.x, r.y, r.z, v.x, v.y, v.z)
    }

    /// Distance to the central body center (km)
    pub fn radius(&self) -> f64 {
        self.position_km.norm()
    }

    /// Velocity magnitude (km s⁻¹)
    pub fn speed(&self) -> f64 {
        self.velocity_km_s.norm()
    }

    /// Specific orbital energy (km² s⁻²). Only meaningful in the inertial frame.
    pub fn specific_energy(&self, body: &CentralBody) -> f64 {
        self.speed().powi(2) / 2.0 - body.mu_km3_s2 / self.radius()
    }

    /// Specific angular momentum vector (km² s⁻¹)
    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.position_km.cross(&self.velocity_km_s)
    }

    /// Expresses this state in the inertial frame.
    pub fn to_inertial(&self, body: &CentralBody) -> Self {
        match self.frame {
            Frame::Inertial => *self,
            Frame::EarthFixed => {
                let (r, v) = ecef_to_eci(self.epoch, body, &self.position_km, &self.velocity_km_s);
                Self::new(self.epoch, r, v)
            },
        }
    }

    /// Expresses this state in the Earth fixed frame.
    pub fn to_earth_fixed(&self, body: &CentralBody) -> Self {
        match self.frame {
            Frame::EarthFixed => *self,
            Frame::Inertial => {
                let (r, v) = eci_to_ecef(self.epoch, body, &self.position_km, &self.velocity_km_s);
                Self::earth_fixed(self.epoch, r, v)
            },
        }
    }
}

impl std::fmt::Display for CartesianState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (r, v) = (self.position_km, self.velocity_km_s);
        write!(
            f,
            "{} ({}) r=[{:.6}, {:.6}, {:.6}]km v=[{:.9}, {:.9}, {:.9}]km/s",
            self.epoch, self.frame, r.x, r.y, r.z, v.x, v.y, v.z
        )
    }
}
