//! Atmospheric density models, used by the drag perturbation.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::Error;

/// Exponential layer: ρ(h) = ρ₀ exp(-(h - h₀) / H)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DensityLayer {
    /// Layer base altitude h₀ (km)
    pub base_altitude_km: f64,
    /// Density at layer base ρ₀ (kg.m⁻³)
    pub density_kg_m3: f64,
    /// Scale height H (km)
    pub scale_height_km: f64,
}

impl DensityLayer {
    fn density(&self, altitude_km: f64) -> f64 {
        self.density_kg_m3 * (-(altitude_km - self.base_altitude_km) / self.scale_height_km).exp()
    }
}

/// Piecewise exponential density table, sorted by base altitude.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DensityTable {
    pub layers: Vec<DensityLayer>,
}

impl Default for DensityTable {
    fn default() -> Self {
        Self::vallado()
    }
}

impl DensityTable {
    /// Reference exponential atmosphere (Vallado, Fundamentals of Astrodynamics, table 8-4)
    pub fn vallado() -> Self {
        const TABLE: [(f64, f64, f64); 28] = [
            (0.0, 1.225, 7.249),
            (25.0, 3.899E-2, 6.349),
            (30.0, 1.774E-2, 6.682),
            (40.0, 3.972E-3, 7.554),
            (50.0, 1.057E-3, 8.382),
            (60.0, 3.206E-4, 7.714),
            (70.0, 8.770E-5, 6.549),
            (80.0, 1.905E-5, 5.799),
            (90.0, 3.396E-6, 5.382),
            (100.0, 5.297E-7, 5.877),
            (110.0, 9.661E-8, 7.263),
            (120.0, 2.438E-8, 9.473),
            (130.0, 8.484E-9, 12.636),
            (140.0, 3.845E-9, 16.149),
            (150.0, 2.070E-9, 22.523),
            (180.0, 5.464E-10, 29.740),
            (200.0, 2.789E-10, 37.105),
            (250.0, 7.248E-11, 45.546),
            (300.0, 2.418E-11, 53.628),
            (350.0, 9.518E-12, 53.298),
            (400.0, 3.725E-12, 58.515),
            (450.0, 1.585E-12, 60.828),
            (500.0, 6.967E-13, 63.822),
            (600.0, 1.454E-13, 71.835),
            (700.0, 3.614E-14, 88.667),
            (800.0, 1.170E-14, 124.64),
            (900.0, 5.245E-15, 181.05),
            (1000.0, 3.019E-15, 268.00),
        ];
        Self {
            layers: TABLE
                .iter()
                .map(|(h0, rho0, scale)| DensityLayer {
                    base_altitude_km: *h0,
                    density_kg_m3: *rho0,
                    scale_height_km: *scale,
                })
                .collect(),
        }
    }

    fn density(&self, altitude_km: f64) -> f64 {
        let layer = self
            .layers
            .iter()
            .rev()
            .find(|layer| layer.base_altitude_km <= altitude_km)
            .or_else(|| self.layers.first());

        match layer {
            Some(layer) => layer.density(altitude_km.max(layer.base_altitude_km)),
            None => 0.0,
        }
    }
}

/// Atmosphere model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Atmosphere {
    /// Single exponential layer
    Exponential(DensityLayer),
    /// Piecewise exponential table
    Table(DensityTable),
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self::Table(DensityTable::vallado())
    }
}

impl Atmosphere {
    /// Builds a single layer [Atmosphere::Exponential] model.
    pub fn exponential(base_altitude_km: f64, density_kg_m3: f64, scale_height_km: f64) -> Self {
        Self::Exponential(DensityLayer {
            base_altitude_km,
            density_kg_m3,
            scale_height_km,
        })
    }

    /// Density (kg.m⁻³) at given altitude (km). Altitudes below
    /// the model base are clamped to the base.
    pub fn density(&self, altitude_km: f64) -> f64 {
        match self {
            Self::Exponential(layer) => layer.density(altitude_km.max(layer.base_altitude_km)),
            Self::Table(table) => table.density(altitude_km),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let layers = match self {
            Self::Exponential(layer) => std::slice::from_ref(layer),
            Self::Table(table) => table.layers.as_slice(),
        };

        if layers.is_empty() {
            return Err(Error::UnsupportedPerturbation(
                "empty density table".to_string(),
            ));
        }

        for layer in layers {
            if !(layer.scale_height_km > 0.0) {
                return Err(Error::UnsupportedPerturbation(format!(
                    "invalid scale height {} km",
                    layer.scale_height_km
                )));
            }
            if !(layer.density_kg_m3 >= 0.0) {
                return Err(Error::UnsupportedPerturbation(format!(
                    "invalid density {} kg/m3",
                    layer.density_kg_m3
                )));
            }
        }

        if layers
            .windows(2)
            .any(|w| w[1].base_altitude_km <= w[0].base_altitude_km)
        {
            return Err(Error::UnsupportedPerturbation(
                "density table altitudes must be strictly increasing".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vallado_table() {
        let atm = Atmosphere::default();
        assert!(atm.validate().is_ok());

        assert!((atm.density(0.0) - 1.225).abs() < 1.0E-12);
        assert!((atm.density(400.0) - 3.725E-12).abs() < 1.0E-20);

        // monotonic decay
        let mut previous = f64::MAX;
        for h in (0..1500).step_by(10) {
            let rho = atm.density(h as f64);
            assert!(rho < previous, "density should decrease at {} km", h);
            previous = rho;
        }
    }

    #[test]
    fn invalid_models() {
        assert!(Atmosphere::exponential(0.0, 1.225, -8.5).validate().is_err());
        assert!(Atmosphere::exponential(0.0, 1.225, 0.0).validate().is_err());
        assert!(Atmosphere::exponential(0.0, -1.0, 8.5).validate().is_err());
        assert!(Atmosphere::Table(DensityTable { layers: vec![] })
            .validate()
            .is_err());

        let mut table = DensityTable::vallado();
        table.layers.swap(3, 4);
        assert!(Atmosphere::Table(table).validate().is_err());
    }
}
