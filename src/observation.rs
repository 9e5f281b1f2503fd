//! Topocentric observations of a target from a [GroundStation].
use itertools::{Itertools, MinMaxResult};
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::CentralBody,
    ephemeris::Ephemeris,
    kepler::wrap_two_pi,
    prelude::{CartesianState, Epoch, Error, GroundStation},
    time::elapsed_seconds,
};

/// Slant range (km) under which target and station are considered co-located
const MIN_RANGE_KM: f64 = 1.0E-6;

/// Target seen from a [GroundStation] at a given [Epoch].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationRecord {
    pub epoch: Epoch,
    /// Azimuth (deg), clockwise from North, in [0, 360)
    pub azimuth_deg: f64,
    /// Elevation (deg) above the local horizon, in [-90, 90]
    pub elevation_deg: f64,
    /// Slant range (km)
    pub range_km: f64,
    /// Slant range rate (km s⁻¹), positive when receding
    pub range_rate_km_s: f64,
    /// Topocentric right ascension (deg), in [0, 360)
    pub right_ascension_deg: f64,
    /// Topocentric declination (deg)
    pub declination_deg: f64,
    /// Elevation above the station mask
    pub visible: bool,
    /// Observing station
    pub station: GroundStation,
    /// Target identifier
    pub target: String,
}

impl std::fmt::Display for ObservationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {}: az={:.4}° el={:.4}° range={:.3}km{}",
            self.epoch,
            self.station.name,
            self.target,
            self.azimuth_deg,
            self.elevation_deg,
            self.range_km,
            if self.visible { "" } else { " (not visible)" }
        )
    }
}

/// Computes [ObservationRecord]s of a named target.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationModel {
    body: CentralBody,
    target: String,
}

impl ObservationModel {
    /// Builds a new [ObservationModel] for the designated target, orbiting the Earth.
    pub fn new(target: &str) -> Self {
        Self {
            body: CentralBody::earth(),
            target: target.to_string(),
        }
    }

    /// Copies and returns [ObservationModel] with a different [CentralBody]
    pub fn with_body(&self, body: CentralBody) -> Self {
        let mut s = self.clone();
        s.body = body;
        s
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Observes `state` from `station` at `epoch`, which must match the state epoch.
    /// Fails with [Error::DegenerateGeometry] when the target lies on the station.
    /// Records below the station elevation mask are returned with `visible` unset.
    pub fn compute_observation(
        &self,
        state: &CartesianState,
        station: &GroundStation,
        epoch: Epoch,
    ) -> Result<ObservationRecord, Error> {
        if state.epoch != epoch {
            return Err(Error::InvalidState(format!(
                "state at {} observed at {}",
                state.epoch, epoch
            )));
        }

        let fixed = state.to_earth_fixed(&self.body);
        let rho = fixed.position_km - station.ecef_km();
        let range_km = rho.norm();

        if range_km < MIN_RANGE_KM {
            return Err(Error::DegenerateGeometry);
        }

        let (azimuth_deg, elevation_deg, _) = station.azimuth_elevation_range(&fixed.position_km);

        // station is at rest in the Earth fixed frame
        let range_rate_km_s = rho.dot(&fixed.velocity_km_s) / range_km;

        let inertial = state.to_inertial(&self.body);
        let (station_eci, _) = station.inertial_state(epoch, &self.body);
        let rho_i = inertial.position_km - station_eci;

        let right_ascension_deg = wrap_two_pi(rho_i.y.atan2(rho_i.x)).to_degrees();
        let declination_deg = (rho_i.z / rho_i.norm()).clamp(-1.0, 1.0).asin().to_degrees();

        Ok(ObservationRecord {
            epoch,
            azimuth_deg,
            elevation_deg,
            range_km,
            range_rate_km_s,
            right_ascension_deg,
            declination_deg,
            visible: elevation_deg >= station.min_elevation_deg(),
            station: station.clone(),
            target: self.target.clone(),
        })
    }

    /// Observes every state of the [Ephemeris], visible or not.
    pub fn observe_ephemeris(
        &self,
        ephemeris: &Ephemeris,
        station: &GroundStation,
    ) -> Result<Vec<ObservationRecord>, Error> {
        let records = ephemeris
            .iter()
            .map(|state| self.compute_observation(state, station, state.epoch))
            .collect::<Result<Vec<_>, Error>>()?;

        debug!(
            "{}: {} visible observations of {} out of {}",
            station.name,
            records.iter().filter(|record| record.visible).count(),
            self.target,
            records.len()
        );

        Ok(records)
    }
}

/// Visible records only.
pub fn visible_only(records: &[ObservationRecord]) -> Vec<ObservationRecord> {
    records
        .iter()
        .filter(|record| record.visible)
        .cloned()
        .collect()
}

/// Min, max and mean of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Statistics {
    fn from_values<I: Iterator<Item = f64> + Clone>(values: I) -> Option<Self> {
        let (min, max) = match values.clone().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(value) => (value, value),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        let (sum, count) = values.fold((0.0, 0), |(sum, count), value| (sum + value, count + 1));
        Some(Self {
            min,
            max,
            mean: sum / count as f64,
        })
    }

    /// Same for angles (deg), the mean being the circular mean in [0, 360).
    fn from_angles_deg<I: Iterator<Item = f64> + Clone>(values: I) -> Option<Self> {
        let linear = Self::from_values(values.clone())?;
        let (sin, cos) = values.fold((0.0, 0.0), |(sin, cos), value: f64| {
            let (s, c) = value.to_radians().sin_cos();
            (sin + s, cos + c)
        });
        Some(Self {
            mean: wrap_two_pi(sin.atan2(cos)).to_degrees(),
            ..linear
        })
    }
}

/// Overview of an observation time series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationSummary {
    /// Number of records
    pub count: usize,
    /// Number of visible records
    pub visible: usize,
    pub first_epoch: Epoch,
    pub last_epoch: Epoch,
    /// Time span (s)
    pub span_s: f64,
    pub azimuth_deg: Statistics,
    pub elevation_deg: Statistics,
    pub range_km: Statistics,
}

impl ObservationSummary {
    /// Summarizes `records`, None when empty.
    pub fn from_records(records: &[ObservationRecord]) -> Option<Self> {
        let first = records.first()?;
        let last = records.last()?;
        Some(Self {
            count: records.len(),
            visible: records.iter().filter(|record| record.visible).count(),
            first_epoch: first.epoch,
            last_epoch: last.epoch,
            span_s: elapsed_seconds(first.epoch, last.epoch),
            azimuth_deg: Statistics::from_angles_deg(records.iter().map(|r| r.azimuth_deg))?,
            elevation_deg: Statistics::from_values(records.iter().map(|r| r.elevation_deg))?,
            range_km: Statistics::from_values(records.iter().map(|r| r.range_km))?,
        })
    }
}

/// Continuous visibility window (pass), at the resolution of the
/// observation time series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccessWindow {
    /// First visible epoch
    pub rise: Epoch,
    /// Last visible epoch
    pub set: Epoch,
    /// Epoch of maximal elevation
    pub culmination: Epoch,
    /// Maximal elevation (deg)
    pub max_elevation_deg: f64,
    /// Station name
    pub station: String,
}

impl AccessWindow {
    /// Duration of the pass (s)
    pub fn duration_s(&self) -> f64 {
        elapsed_seconds(self.rise, self.set)
    }
}

/// Splits a time ordered series of one station into [AccessWindow]s.
pub fn access_windows(records: &[ObservationRecord]) -> Vec<AccessWindow> {
    records
        .iter()
        .chunk_by(|record| record.visible)
        .into_iter()
        .filter_map(|(visible, pass)| {
            if !visible {
                return None;
            }
            let pass = pass.collect::<Vec<_>>();
            let rise = pass.first()?;
            let set = pass.last()?;
            let culmination = pass
                .iter()
                .max_by(|a, b| a.elevation_deg.total_cmp(&b.elevation_deg))?;
            Some(AccessWindow {
                rise: rise.epoch,
                set: set.epoch,
                culmination: culmination.epoch,
                max_elevation_deg: culmination.elevation_deg,
                station: rise.station.name.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{frames::geodetic_to_ecef, time::offset};
    use nalgebra::Vector3;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_hms(2025, 6, 1, 3, 0, 0)
    }

    #[test]
    fn co_located_target() {
        let station = GroundStation::new("site", 10.0, 20.0, 0.0).unwrap();
        let state = CartesianState::earth_fixed(epoch(), station.ecef_km(), Vector3::zeros());
        let model = ObservationModel::new("sat");
        assert_eq!(
            model.compute_observation(&state, &station, epoch()),
            Err(Error::DegenerateGeometry)
        );
    }

    #[test]
    fn epoch_mismatch() {
        let station = GroundStation::new("site", 10.0, 20.0, 0.0).unwrap();
        let state =
            CartesianState::earth_fixed(epoch(), Vector3::new(8000.0, 0.0, 0.0), Vector3::zeros());
        let model = ObservationModel::new("sat");
        assert!(matches!(
            model.compute_observation(&state, &station, offset(epoch(), 1.0)),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn cardinal_directions() {
        let station = GroundStation::new("equator", 0.0, 0.0, 0.0).unwrap();
        let model = ObservationModel::new("sat");
        let base = station.ecef_km();

        // (offset, azimuth)
        for (delta, azimuth) in [
            (Vector3::new(0.0, 0.0, 100.0), 0.0),
            (Vector3::new(0.0, 100.0, 0.0), 90.0),
            (Vector3::new(0.0, 0.0, -100.0), 180.0),
            (Vector3::new(0.0, -100.0, 0.0), 270.0),
        ] {
            let state = CartesianState::earth_fixed(epoch(), base + delta, Vector3::zeros());
            let record = model.compute_observation(&state, &station, epoch()).unwrap();
            assert!((record.azimuth_deg - azimuth).abs() < 1.0E-9, "{}", record);
            assert!(record.elevation_deg.abs() < 1.0E-9);
            assert!(record.visible);
            assert!((record.range_km - 100.0).abs() < 1.0E-9);
        }

        let below = CartesianState::earth_fixed(
            epoch(),
            base + Vector3::new(-10.0, 100.0, 0.0),
            Vector3::zeros(),
        );
        let record = model.compute_observation(&below, &station, epoch()).unwrap();
        assert!(record.elevation_deg < 0.0);
        assert!(!record.visible);
    }

    #[test]
    fn topocentric_declination_at_zenith() {
        let station = GroundStation::new("site", 35.0, 139.0, 40.0).unwrap();
        let model = ObservationModel::new("sat");
        let state = CartesianState::earth_fixed(
            epoch(),
            geodetic_to_ecef(35.0, 139.0, 800.0E3),
            Vector3::zeros(),
        );
        let record = model.compute_observation(&state, &station, epoch()).unwrap();
        // geodetic zenith points to the geodetic latitude
        assert!((record.declination_deg - 35.0).abs() < 1.0E-6);
        assert!((record.range_km - 799.96).abs() < 1.0E-6);
    }

    #[test]
    fn azimuth_mean_across_north() {
        let stats = Statistics::from_angles_deg([350.0, 10.0, 355.0, 5.0].into_iter()).unwrap();
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 355.0);
        assert!(stats.mean.min(360.0 - stats.mean) < 1.0E-9, "mean {}", stats.mean);

        let stats = Statistics::from_angles_deg([80.0, 100.0].into_iter()).unwrap();
        assert!((stats.mean - 90.0).abs() < 1.0E-9);

        let stats = Statistics::from_angles_deg([340.0, 350.0].into_iter()).unwrap();
        assert!((stats.mean - 345.0).abs() < 1.0E-9);

        assert!(Statistics::from_angles_deg(std::iter::empty()).is_none());
    }

    #[test]
    fn synthetic_pass() {
        let station = GroundStation::new("equator", 0.0, 0.0, 0.0)
            .unwrap()
            .with_elevation_mask(10.0);
        let model = ObservationModel::new("sat");
        let radius = 7000.0_f64;
        let rate = 0.001_f64;

        // target sweeping the meridian plane, from South to North
        let states = (-60..=60)
            .map(|i| {
                let t = i as f64 * 10.0;
                let theta = rate * t;
                CartesianState::earth_fixed(
                    offset(epoch(), t),
                    radius * Vector3::new(theta.cos(), 0.0, theta.sin()),
                    radius * rate * Vector3::new(-theta.sin(), 0.0, theta.cos()),
                )
            })
            .collect();

        let ephemeris = Ephemeris::new(states).unwrap();
        let records = model.observe_ephemeris(&ephemeris, &station).unwrap();
        assert_eq!(records.len(), 121);

        // culmination at zenith, target moving perpendicular to line of sight
        let zenith = &records[60];
        assert!((zenith.elevation_deg - 90.0).abs() < 1.0E-6);
        assert!(zenith.range_rate_km_s.abs() < 1.0E-9);
        assert!(records[0].range_rate_km_s < 0.0);
        assert!(records[120].range_rate_km_s > 0.0);

        let visible = visible_only(&records);
        assert!(visible.len() < records.len());
        assert!(visible.iter().all(|record| record.elevation_deg >= 10.0));

        let windows = access_windows(&records);
        assert_eq!(windows.len(), 1);
        let pass = &windows[0];
        assert_eq!(pass.culmination, epoch());
        assert!((pass.max_elevation_deg - 90.0).abs() < 1.0E-6);
        assert_eq!(pass.station, "equator");
        assert!(pass.duration_s() > 0.0);
        assert_eq!(pass.rise, visible[0].epoch);

        let summary = ObservationSummary::from_records(&records).unwrap();
        assert_eq!(summary.count, 121);
        assert_eq!(summary.visible, visible.len());
        assert!((summary.span_s - 1200.0).abs() < 1.0E-9);
        assert!((summary.elevation_deg.max - 90.0).abs() < 1.0E-6);
        assert!((summary.range_km.min - (radius - 6378.137)).abs() < 1.0E-6);
        assert!(ObservationSummary::from_records(&[]).is_none());
    }
}
