//! Orbital state representations.
mod anomaly;
mod cartesian;
mod conversion;
mod keplerian;

pub use anomaly::{Anomaly, AnomalyKind};
pub use cartesian::{CartesianState, Frame};
pub use conversion::{cartesian_to_keplerian, keplerian_to_cartesian};
pub use keplerian::KeplerianElements;

pub(crate) use anomaly::angular_distance;
