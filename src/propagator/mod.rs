//! Orbit propagators.
use crate::{
    ephemeris::Ephemeris,
    prelude::{CartesianState, Epoch, Error},
    time::TimeGrid,
};

mod numerical;
mod two_body;

pub use numerical::{
    moon_position, sun_position, Atmosphere, DensityLayer, DensityTable, ForceModel,
    NumericalPropagator, Perturbation,
};
pub use two_body::TwoBodyPropagator;

/// Predicts the state of a satellite at other epochs.
/// Output states are expressed in the frame of the initial state.
pub trait Propagator {
    /// States at each of the strictly increasing `epochs`, which
    /// may lie on both sides of the initial epoch.
    fn ephemeris(&self, initial: &CartesianState, epochs: &[Epoch]) -> Result<Ephemeris, Error>;

    /// State at `epoch`
    fn propagate(&self, initial: &CartesianState, epoch: Epoch) -> Result<CartesianState, Error> {
        let ephemeris = self.ephemeris(initial, &[epoch])?;
        ephemeris
            .first()
            .copied()
            .ok_or(Error::OutOfEphemerisRange(epoch))
    }

    /// States on a regular [TimeGrid]
    fn ephemeris_on_grid(&self, initial: &CartesianState, grid: &TimeGrid) -> Result<Ephemeris, Error> {
        self.ephemeris(initial, &grid.epochs())
    }
}

/// Verifies that `epochs` are strictly increasing.
pub(crate) fn check_ordering(epochs: &[Epoch]) -> Result<(), Error> {
    if epochs.windows(2).any(|pair| pair[1] <= pair[0]) {
        Err(Error::UnorderedEpochs)
    } else {
        Ok(())
    }
}
