//! Gas mixtures: per-species moles in a fixed volume at a temperature.
//!
//! A [`GasMix`] is the thermodynamic state of one spatial cell: a map tile
//! or a sealed device reservoir. Pressure is never stored; it is derived
//! from moles, volume and temperature through the ideal gas law every time
//! it is read, so it cannot drift from the underlying state.
//!
//! ```
//! use stationsim_logic::gas::{Gas, GasMix};
//!
//! let mut mix = GasMix::new(2.5, 293.15).unwrap();
//! assert_eq!(mix.pressure(), 0.0);
//! mix.set_moles(Gas::Oxygen, 10.0).unwrap();
//! assert!(mix.pressure() > 0.0);
//! assert!(mix.set_moles(Gas::Oxygen, -1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::physics::GAS_CONSTANT;
use crate::error::GasError;

/// Number of tracked gas species.
pub const GAS_COUNT: usize = 6;

/// Tracked gas species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gas {
    Oxygen,
    Nitrogen,
    CarbonDioxide,
    Plasma,
    NitrousOxide,
    WaterVapor,
}

impl Gas {
    pub const ALL: [Gas; GAS_COUNT] = [
        Gas::Oxygen,
        Gas::Nitrogen,
        Gas::CarbonDioxide,
        Gas::Plasma,
        Gas::NitrousOxide,
        Gas::WaterVapor,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Gas composition and thermodynamic state of one tile or container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasMix {
    moles: [f32; GAS_COUNT],
    /// Volume in m³ (always > 0).
    volume: f32,
    /// Temperature in Kelvin (always > 0).
    temperature: f32,
}

impl GasMix {
    /// An empty mix. Fails on a non-positive volume or temperature.
    pub fn new(volume: f32, temperature: f32) -> Result<Self, GasError> {
        if !(volume.is_finite() && volume > 0.0) {
            return Err(GasError::InvalidVolume(volume));
        }
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(GasError::InvalidTemperature(temperature));
        }
        Ok(Self {
            moles: [0.0; GAS_COUNT],
            volume,
            temperature,
        })
    }

    /// Breathable air (78% N₂, 21% O₂, 1% CO₂) at the given pressure in kPa.
    pub fn air(volume: f32, temperature: f32, pressure_kpa: f32) -> Result<Self, GasError> {
        let mut mix = Self::new(volume, temperature)?;
        let total = moles_for_pressure(pressure_kpa, volume, temperature);
        if !(total.is_finite() && total >= 0.0) {
            return Err(GasError::InvalidGasQuantity {
                gas: Gas::Nitrogen,
                quantity: total,
            });
        }
        mix.moles[Gas::Nitrogen.index()] = total * 0.78;
        mix.moles[Gas::Oxygen.index()] = total * 0.21;
        mix.moles[Gas::CarbonDioxide.index()] = total * 0.01;
        Ok(mix)
    }

    pub fn moles(&self, gas: Gas) -> f32 {
        self.moles[gas.index()]
    }

    pub fn total_moles(&self) -> f32 {
        self.moles.iter().sum()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Pressure in kPa via `P = nRT / V`. Exactly zero for an empty mix.
    pub fn pressure(&self) -> f32 {
        let n = self.total_moles();
        if n <= 0.0 {
            return 0.0;
        }
        (n * GAS_CONSTANT * self.temperature / self.volume / 1000.0).max(0.0)
    }

    /// Fraction of the total moles held by `gas`, zero for an empty mix.
    pub fn ratio(&self, gas: Gas) -> f32 {
        let total = self.total_moles();
        if total <= 0.0 {
            0.0
        } else {
            self.moles(gas) / total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_moles() <= 0.0
    }

    /// Set one species. Negative or non-finite quantities are rejected and
    /// leave the mix untouched.
    pub fn set_moles(&mut self, gas: Gas, quantity: f32) -> Result<(), GasError> {
        if !(quantity.is_finite() && quantity >= 0.0) {
            return Err(GasError::InvalidGasQuantity { gas, quantity });
        }
        self.moles[gas.index()] = quantity;
        Ok(())
    }

    /// Add moles of one species. Negative or non-finite amounts are ignored.
    pub fn add_moles(&mut self, gas: Gas, amount: f32) {
        if amount.is_finite() && amount > 0.0 {
            self.moles[gas.index()] += amount;
        }
    }

    /// Remove moles of one species, saturating at zero. Returns the amount
    /// actually removed.
    pub fn remove_moles(&mut self, gas: Gas, amount: f32) -> f32 {
        if !(amount.is_finite() && amount > 0.0) {
            return 0.0;
        }
        let slot = &mut self.moles[gas.index()];
        let removed = amount.min(*slot);
        *slot = (*slot - removed).max(0.0);
        removed
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), GasError> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(GasError::InvalidTemperature(temperature));
        }
        self.temperature = temperature;
        Ok(())
    }

    /// Empty every species. Volume and temperature are kept.
    pub fn reset(&mut self) {
        self.moles = [0.0; GAS_COUNT];
    }

    /// Fold `incoming` moles at `incoming_temperature` into this mix's
    /// temperature as a mole-weighted average. Call before adding the moles.
    pub(crate) fn blend_temperature(&mut self, incoming: f32, incoming_temperature: f32) {
        let current = self.total_moles();
        let combined = current + incoming;
        if incoming <= 0.0 || combined <= 0.0 {
            return;
        }
        let blended =
            (current * self.temperature + incoming * incoming_temperature) / combined;
        if blended.is_finite() && blended > 0.0 {
            self.temperature = blended;
        }
    }

    /// `n·T / V`, the pressure-proportional quantity the transfer engine
    /// equalizes on.
    pub(crate) fn thermal_density(&self) -> f32 {
        self.total_moles() * self.temperature / self.volume
    }
}

/// Moles needed to reach `pressure_kpa` in the given volume and temperature.
pub fn moles_for_pressure(pressure_kpa: f32, volume: f32, temperature: f32) -> f32 {
    if pressure_kpa <= 0.0 || temperature <= 0.0 {
        return 0.0;
    }
    pressure_kpa * 1000.0 * volume / (GAS_CONSTANT * temperature)
}
