#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::Error;

mod body;
mod integrator;
mod perturbation;

pub use body::CentralBody;
pub use integrator::{IntegratorKind, IntegratorOpts};
pub use perturbation::{
    DragParams, OblatenessParams, PerturbationConfig, SrpParams, ThirdBodyParams,
};

/// Handling of undefined orbital angles (near circular and/or
/// near equatorial orbits).
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SingularityPolicy {
    /// Report [Error::DegenerateOrbit]
    #[default]
    Reject,
    /// Substitute the undefined angle by zero and fold it into the
    /// remaining angles: argument of latitude (circular), longitude of
    /// periapsis (equatorial) or true longitude (both).
    Substitute,
}

impl std::fmt::Display for SingularityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Substitute => write!(f, "substitute"),
        }
    }
}

impl std::str::FromStr for SingularityPolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "substitute" => Ok(Self::Substitute),
            _ => Err(Error::UnknownSingularityPolicy(s.to_string())),
        }
    }
}

/// Orbit regimes accepted by Cartesian to Keplerian conversion
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrbitRegime {
    /// Elliptic orbits only, escape trajectories are rejected
    #[default]
    Bound,
    /// Elliptic and hyperbolic orbits
    Any,
}

impl std::fmt::Display for OrbitRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Bound => write!(f, "bound"),
            Self::Any => write!(f, "any"),
        }
    }
}

impl std::str::FromStr for OrbitRegime {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bound" | "elliptic" => Ok(Self::Bound),
            "any" => Ok(Self::Any),
            _ => Err(Error::UnknownOrbitRegime(s.to_string())),
        }
    }
}

fn default_singular_eccentricity() -> f64 {
    1.0E-9
}

fn default_singular_inclination() -> f64 {
    1.0E-9
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConversionOpts {
    #[cfg_attr(feature = "serde", serde(default))]
    pub singularity: SingularityPolicy,
    #[cfg_attr(feature = "serde", serde(default))]
    pub regime: OrbitRegime,
    /// Eccentricity under which the orbit is considered circular
    #[cfg_attr(feature = "serde", serde(default = "default_singular_eccentricity"))]
    pub eccentricity_tolerance: f64,
    /// Inclination (rad) under which (or above π minus which)
    /// the orbit is considered equatorial
    #[cfg_attr(feature = "serde", serde(default = "default_singular_inclination"))]
    pub inclination_tolerance_rad: f64,
    /// Kepler equation solver, for mean anomaly conversions
    #[cfg_attr(feature = "serde", serde(default))]
    pub kepler: KeplerOpts,
}

impl Default for ConversionOpts {
    fn default() -> Self {
        Self {
            singularity: SingularityPolicy::default(),
            regime: OrbitRegime::default(),
            eccentricity_tolerance: default_singular_eccentricity(),
            inclination_tolerance_rad: default_singular_inclination(),
            kepler: KeplerOpts::default(),
        }
    }
}

impl ConversionOpts {
    /// Copies and returns [ConversionOpts] with desired [SingularityPolicy]
    pub fn with_singularity(&self, singularity: SingularityPolicy) -> Self {
        let mut s = *self;
        s.singularity = singularity;
        s
    }

    /// Copies and returns [ConversionOpts] with desired [OrbitRegime]
    pub fn with_regime(&self, regime: OrbitRegime) -> Self {
        let mut s = *self;
        s.regime = regime;
        s
    }
}

fn default_kepler_tolerance() -> f64 {
    1.0E-13
}

fn default_kepler_iterations() -> usize {
    50
}

/// Kepler equation solver settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerOpts {
    /// Residual (rad) under which Newton-Raphson has converged
    #[cfg_attr(feature = "serde", serde(default = "default_kepler_tolerance"))]
    pub tolerance: f64,
    /// Iteration budget
    #[cfg_attr(feature = "serde", serde(default = "default_kepler_iterations"))]
    pub max_iterations: usize,
}

impl Default for KeplerOpts {
    fn default() -> Self {
        Self {
            tolerance: default_kepler_tolerance(),
            max_iterations: default_kepler_iterations(),
        }
    }
}

fn default_iod_iterations() -> usize {
    50
}

fn default_iod_tolerance() -> f64 {
    1.0E-6
}

fn default_min_separation() -> f64 {
    1.0
}

fn default_min_triple_product() -> f64 {
    1.0E-10
}

fn default_correction_iterations() -> usize {
    25
}

fn default_correction_tolerance() -> f64 {
    1.0E-9
}

/// Initial orbit determination settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IodOpts {
    /// Prior geocentric distance (km) at the middle epoch,
    /// used to pick one of several physically acceptable roots.
    #[cfg_attr(feature = "serde", serde(default))]
    pub prior_radius_km: Option<f64>,
    /// Refinement iteration budget
    #[cfg_attr(feature = "serde", serde(default = "default_iod_iterations"))]
    pub max_iterations: usize,
    /// Fixed point residual (km) of the Gauss refinement under which it has converged.
    /// Velocities are scaled by the observation span to be expressed in km.
    #[cfg_attr(feature = "serde", serde(default = "default_iod_tolerance"))]
    pub tolerance_km: f64,
    /// Correct observation epochs for the light travel time
    #[cfg_attr(feature = "serde", serde(default))]
    pub light_time: bool,
    /// Minimal separation (s) between two observation epochs
    #[cfg_attr(feature = "serde", serde(default = "default_min_separation"))]
    pub min_separation_s: f64,
    /// Minimal |ρ̂1 . (ρ̂2 x ρ̂3)|, below which lines of sight are coplanar
    #[cfg_attr(feature = "serde", serde(default = "default_min_triple_product"))]
    pub min_triple_product: f64,
    /// Least squares iteration budget (more than 3 observations)
    #[cfg_attr(feature = "serde", serde(default = "default_correction_iterations"))]
    pub max_correction_iterations: usize,
    /// Least squares relative state correction under which we stop iterating
    #[cfg_attr(feature = "serde", serde(default = "default_correction_tolerance"))]
    pub correction_tolerance: f64,
}

impl Default for IodOpts {
    fn default() -> Self {
        Self {
            prior_radius_km: None,
            max_iterations: default_iod_iterations(),
            tolerance_km: default_iod_tolerance(),
            light_time: false,
            min_separation_s: default_min_separation(),
            min_triple_product: default_min_triple_product(),
            max_correction_iterations: default_correction_iterations(),
            correction_tolerance: default_correction_tolerance(),
        }
    }
}

impl IodOpts {
    /// Copies and returns [IodOpts] with a prior radius estimate
    pub fn with_prior_radius(&self, radius_km: f64) -> Self {
        let mut s = *self;
        s.prior_radius_km = Some(radius_km);
        s
    }

    /// Copies and returns [IodOpts] with light time correction
    pub fn with_light_time(&self, light_time: bool) -> Self {
        let mut s = *self;
        s.light_time = light_time;
        s
    }
}

/// Complete configuration set.
#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Central body constants
    #[cfg_attr(feature = "serde", serde(default))]
    pub body: CentralBody,
    /// Element conversions and Kepler equation solver
    #[cfg_attr(feature = "serde", serde(default))]
    pub conversion: ConversionOpts,
    /// Numerical integration
    #[cfg_attr(feature = "serde", serde(default))]
    pub integrator: IntegratorOpts,
    /// Force model
    #[cfg_attr(feature = "serde", serde(default))]
    pub perturbations: PerturbationConfig,
    /// Initial orbit determination
    #[cfg_attr(feature = "serde", serde(default))]
    pub iod: IodOpts,
}

impl Config {
    /// Unperturbed motion around the Earth.
    pub fn two_body_preset() -> Self {
        Self::default()
    }

    /// Low Earth orbit: J2, drag, Sun and Moon attraction
    /// and radiation pressure on a 0.02 m²/kg cannonball.
    pub fn leo_preset() -> Self {
        let mut s = Self::default();
        s.perturbations = PerturbationConfig::all();
        s
    }

    /// Geostationary and high orbits: zonal harmonics up to J4,
    /// Sun and Moon attraction and radiation pressure.
    pub fn geo_preset() -> Self {
        let mut s = Self::default();
        s.perturbations = PerturbationConfig::none()
            .with_oblateness(4)
            .with_third_body(true, true)
            .with_srp(SrpParams::default());
        s.integrator = s.integrator.with_step_limits(1.0E-3, 900.0);
        s
    }
}
