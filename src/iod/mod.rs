//! Angles only initial orbit determination.
use log::debug;
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::{CentralBody, Config, ConversionOpts, IodOpts, KeplerOpts},
    elements::cartesian_to_keplerian,
    prelude::{CartesianState, Epoch, Error, GroundStation, KeplerianElements, ObservationRecord},
    time::elapsed_seconds,
};

mod correction;
mod gauss;
mod roots;

use correction::differential_correction;
use gauss::GaussSolver;

/// Measured direction of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Angles {
    /// Local horizon angles (deg)
    AzimuthElevation {
        azimuth_deg: f64,
        elevation_deg: f64,
    },
    /// Topocentric equatorial angles (deg)
    RightAscensionDeclination {
        right_ascension_deg: f64,
        declination_deg: f64,
    },
}

/// Angles only observation, from a [GroundStation].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnglesObservation {
    pub epoch: Epoch,
    pub station: GroundStation,
    pub angles: Angles,
}

impl AnglesObservation {
    /// Builds a new [AnglesObservation] from azimuth and elevation (deg)
    pub fn azimuth_elevation(
        epoch: Epoch,
        station: &GroundStation,
        azimuth_deg: f64,
        elevation_deg: f64,
    ) -> Self {
        Self {
            epoch,
            station: station.clone(),
            angles: Angles::AzimuthElevation {
                azimuth_deg,
                elevation_deg,
            },
        }
    }

    /// Builds a new [AnglesObservation] from topocentric right ascension
    /// and declination (deg)
    pub fn right_ascension_declination(
        epoch: Epoch,
        station: &GroundStation,
        right_ascension_deg: f64,
        declination_deg: f64,
    ) -> Self {
        Self {
            epoch,
            station: station.clone(),
            angles: Angles::RightAscensionDeclination {
                right_ascension_deg,
                declination_deg,
            },
        }
    }

    /// Inertial line of sight unit vector
    pub(crate) fn line_of_sight(&self, body: &CentralBody) -> Vector3<f64> {
        match self.angles {
            Angles::AzimuthElevation {
                azimuth_deg,
                elevation_deg,
            } => {
                let ecef = self.station.line_of_sight_ecef(azimuth_deg, elevation_deg);
                let (eci, _) =
                    crate::frames::ecef_to_eci(self.epoch, body, &ecef, &Vector3::zeros());
                eci
            },
            Angles::RightAscensionDeclination {
                right_ascension_deg,
                declination_deg,
            } => {
                let (sin_ra, cos_ra) = right_ascension_deg.to_radians().sin_cos();
                let (sin_dec, cos_dec) = declination_deg.to_radians().sin_cos();
                Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
            },
        }
    }

    /// Inertial station position (km)
    pub(crate) fn station_position(&self, body: &CentralBody) -> Vector3<f64> {
        self.station.inertial_state(self.epoch, body).0
    }
}

impl From<&ObservationRecord> for AnglesObservation {
    fn from(record: &ObservationRecord) -> Self {
        Self::azimuth_elevation(
            record.epoch,
            &record.station,
            record.azimuth_deg,
            record.elevation_deg,
        )
    }
}

/// Determined orbit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IodSolution {
    /// Inertial state at the middle observation epoch
    /// (light time corrected, when requested)
    pub state: CartesianState,
    /// Physically acceptable Gauss polynomial roots (km)
    pub candidate_roots_km: Vec<f64>,
    /// Selected root: geocentric distance (km) at the middle epoch
    pub selected_root_km: f64,
    /// Slant ranges (km) at the first, middle and last epochs
    pub slant_ranges_km: [f64; 3],
    /// Refinement iterations
    pub iterations: usize,
    /// Root mean square of the line of sight residuals (rad),
    /// when more than 3 observations were used.
    pub rms_residual_rad: Option<f64>,
}

impl IodSolution {
    /// Osculating elements of the determined orbit
    pub fn elements(
        &self,
        body: &CentralBody,
        opts: &ConversionOpts,
    ) -> Result<KeplerianElements, Error> {
        cartesian_to_keplerian(&self.state, body, opts)
    }
}

/// Gauss angles only orbit determination, followed by a
/// least squares correction when more than 3 observations are available.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitDetermination {
    body: CentralBody,
    opts: IodOpts,
    kepler: KeplerOpts,
}

impl OrbitDetermination {
    pub fn new(body: CentralBody, opts: IodOpts) -> Self {
        Self {
            body,
            opts,
            kepler: KeplerOpts::default(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            body: cfg.body,
            opts: cfg.iod,
            kepler: cfg.conversion.kepler,
        }
    }

    /// Copies and returns [OrbitDetermination] with updated [IodOpts]
    pub fn with_opts(&self, opts: IodOpts) -> Self {
        let mut s = self.clone();
        s.opts = opts;
        s
    }

    /// Observation time line requirements
    fn check_epochs(&self, observations: &[AnglesObservation]) -> Result<(), Error> {
        if observations.len() < 3 {
            return Err(Error::NotEnoughObservations(observations.len()));
        }
        for pair in observations.windows(2) {
            let dt = elapsed_seconds(pair[0].epoch, pair[1].epoch);
            if dt.abs() < self.opts.min_separation_s {
                return Err(Error::IllConditionedGeometry(format!(
                    "observations {} and {} are {:.3}s apart",
                    pair[0].epoch, pair[1].epoch, dt
                )));
            }
            if dt < 0.0 {
                return Err(Error::UnorderedEpochs);
            }
        }
        Ok(())
    }

    /// Determines the orbit from 3 or more time ordered observations.
    pub fn solve(&self, observations: &[AnglesObservation]) -> Result<IodSolution, Error> {
        self.check_epochs(observations)?;

        let n = observations.len();
        let middle = n / 2;
        let triplet = [
            &observations[0],
            &observations[middle],
            &observations[n - 1],
        ];

        let gauss = GaussSolver::new(&self.body, &self.opts, &self.kepler, triplet)?;
        let mut solution = gauss.solve()?;

        debug!(
            "gauss solution: r2={:.3}km {}",
            solution.selected_root_km, solution.state
        );

        if n > 3 {
            let (state, rms) = differential_correction(
                &self.body,
                &self.opts,
                &self.kepler,
                observations,
                &solution.state,
            )?;
            solution.state = state;
            solution.rms_residual_rad = Some(rms);
        }

        Ok(solution)
    }
}
