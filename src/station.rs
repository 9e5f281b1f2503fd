use map_3d::{aer2enu, ecef2aer, enu2uvw, uvw2enu, Ellipsoid};
use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::CentralBody,
    frames::{ecef_to_eci, geodetic_to_ecef},
    kepler::wrap_two_pi,
    prelude::{Epoch, Error},
};

/// Observation site, fixed on the rotating Earth (WGS84).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroundStation {
    /// Readable name, reported in observation records
    pub name: String,
    /// Geodetic latitude (deg)
    pub latitude_deg: f64,
    /// Longitude (deg)
    pub longitude_deg: f64,
    /// Altitude above the ellipsoid (m)
    pub altitude_m: f64,
    /// Targets below this elevation (deg) are not visible.
    /// Without mask, the local horizon applies.
    #[cfg_attr(feature = "serde", serde(default))]
    pub elevation_mask_deg: Option<f64>,
}

impl GroundStation {
    /// Builds a new [GroundStation] from geodetic coordinates.
    pub fn new(
        name: &str,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
    ) -> Result<Self, Error> {
        if !(latitude_deg.is_finite() && longitude_deg.is_finite() && altitude_m.is_finite()) {
            return Err(Error::InvalidState(format!(
                "station \"{}\": non finite coordinates",
                name
            )));
        }
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(Error::InvalidState(format!(
                "station \"{}\": latitude {}° out of [-90, 90]",
                name, latitude_deg
            )));
        }
        if !(-180.0..=360.0).contains(&longitude_deg) {
            return Err(Error::InvalidState(format!(
                "station \"{}\": longitude {}° out of [-180, 360]",
                name, longitude_deg
            )));
        }
        Ok(Self {
            name: name.to_string(),
            latitude_deg,
            longitude_deg,
            altitude_m,
            elevation_mask_deg: None,
        })
    }

    /// Copies and returns [GroundStation] with an elevation mask (deg)
    pub fn with_elevation_mask(&self, mask_deg: f64) -> Self {
        let mut s = self.clone();
        s.elevation_mask_deg = Some(mask_deg);
        s
    }

    /// Elevation (deg) from which targets are visible
    pub fn min_elevation_deg(&self) -> f64 {
        self.elevation_mask_deg.unwrap_or(0.0)
    }

    /// Earth fixed position (km)
    pub fn ecef_km(&self) -> Vector3<f64> {
        geodetic_to_ecef(self.latitude_deg, self.longitude_deg, self.altitude_m)
    }

    /// Inertial position (km) and velocity (km s⁻¹) at `epoch`.
    pub fn inertial_state(&self, epoch: Epoch, body: &CentralBody) -> (Vector3<f64>, Vector3<f64>) {
        ecef_to_eci(epoch, body, &self.ecef_km(), &Vector3::zeros())
    }

    fn geodetic_rad(&self) -> (f64, f64) {
        (
            self.latitude_deg.to_radians(),
            self.longitude_deg.to_radians(),
        )
    }

    /// Earth fixed to local East North Up rotation. Rows are the
    /// East, North and Up unit vectors (Up is the ellipsoid normal).
    pub fn enu_rotation(&self) -> Matrix3<f64> {
        let (lat, lon) = self.geodetic_rad();
        let columns = [Vector3::x(), Vector3::y(), Vector3::z()].map(|axis| {
            let (e, n, u) = uvw2enu(axis.x, axis.y, axis.z, lat, lon);
            Vector3::new(e, n, u)
        });
        Matrix3::from_columns(&columns)
    }

    /// Azimuth (deg, in [0, 360)), elevation (deg) and slant range (km)
    /// of an Earth fixed position (km).
    pub fn azimuth_elevation_range(&self, ecef_km: &Vector3<f64>) -> (f64, f64, f64) {
        let (lat, lon) = self.geodetic_rad();
        let (azimuth, elevation, range) = ecef2aer(
            ecef_km.x * 1.0E3,
            ecef_km.y * 1.0E3,
            ecef_km.z * 1.0E3,
            lat,
            lon,
            self.altitude_m,
            Ellipsoid::WGS84,
        );
        (
            wrap_two_pi(azimuth).to_degrees(),
            elevation.to_degrees(),
            range / 1.0E3,
        )
    }

    /// Earth fixed unit vector pointing at the given azimuth and elevation (deg).
    pub fn line_of_sight_ecef(&self, azimuth_deg: f64, elevation_deg: f64) -> Vector3<f64> {
        let (lat, lon) = self.geodetic_rad();
        let (e, n, u) = aer2enu(azimuth_deg.to_radians(), elevation_deg.to_radians(), 1.0);
        let (x, y, z) = enu2uvw(e, n, u, lat, lon);
        Vector3::new(x, y, z)
    }
}

impl std::fmt::Display for GroundStation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} ({:.4}°, {:.4}°, {:.1}m)",
            self.name, self.latitude_deg, self.longitude_deg, self.altitude_m
        )
    }
}
