#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

// private modules
mod cfg;
mod constants;
mod elements;
mod ephemeris;
mod error;
mod frames;
mod iod;
mod kepler;
mod observation;
mod propagator;
mod station;
mod time;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::cfg::{
        CentralBody, Config, ConversionOpts, DragParams, IntegratorKind, IntegratorOpts, IodOpts,
        KeplerOpts, OblatenessParams, OrbitRegime, PerturbationConfig, SingularityPolicy,
        SrpParams, ThirdBodyParams,
    };
    pub use crate::constants::*;
    pub use crate::elements::{
        cartesian_to_keplerian, keplerian_to_cartesian, Anomaly, AnomalyKind, CartesianState,
        Frame, KeplerianElements,
    };
    pub use crate::ephemeris::Ephemeris;
    pub use crate::error::{Divergence, Error, Singularity, Solver};
    pub use crate::frames::{
        ecef_to_eci, ecef_to_geodetic, eci_to_ecef, geodetic_to_ecef, gmst, SubSatellitePoint,
    };
    pub use crate::iod::{Angles, AnglesObservation, IodSolution, OrbitDetermination};
    pub use crate::kepler::{
        solve_elliptic, solve_hyperbolic, universal_lagrange, LagrangeCoefficients,
    };
    pub use crate::observation::{
        access_windows, visible_only, AccessWindow, ObservationModel, ObservationRecord,
        ObservationSummary, Statistics,
    };
    pub use crate::propagator::{
        moon_position, sun_position, Atmosphere, DensityLayer, DensityTable, ForceModel,
        NumericalPropagator, Perturbation, Propagator, TwoBodyPropagator,
    };
    pub use crate::station::GroundStation;
    pub use crate::time::{
        date_to_epoch, date_to_mjd, elapsed_seconds, epoch_to_date, epoch_to_mjd, mjd_to_date,
        mjd_to_epoch, offset, CalendarDate, TimeGrid,
    };
    // re-export
    pub use hifitime::{Duration, Epoch, TimeScale, Unit};
    pub use nalgebra::{Vector3, Vector6};
}

// pub export
pub use error::Error;
