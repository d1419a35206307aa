//! Transfer engine: moving moles between two gas mixes.
//!
//! Every function here is conservative: what leaves one mix arrives in the
//! other, species by species, in proportion to the source's composition.
//! A request larger than the source holds moves exactly what is available
//! and leaves the source empty. Moles never go negative.
//!
//! Per-tick callers bound their requests with [`clamp`] so a single tick
//! cannot overshoot; the engine itself does not cap beyond the source's
//! supply.
//!
//! ```
//! use stationsim_logic::gas::GasMix;
//! use stationsim_logic::transfer::{clamp, transfer_gas};
//!
//! let mut tile = GasMix::air(2.5, 293.15, 101.325).unwrap();
//! let mut tank = GasMix::new(1.0, 293.15).unwrap();
//! let before = tile.total_moles() + tank.total_moles();
//!
//! let moved = transfer_gas(&mut tile, &mut tank, clamp(50.0, 0.0, 8.0));
//! assert!((moved - 8.0).abs() < 1e-3);
//! assert!((tile.total_moles() + tank.total_moles() - before).abs() < 1e-3);
//! ```

use serde::{Deserialize, Serialize};

use crate::gas::{Gas, GasMix};

/// Bound `value` to `[lo, hi]`. NaN maps to `lo`.
///
/// Every per-tick caller uses this one helper so clamping behaves the same
/// everywhere.
pub fn clamp(value: f32, lo: f32, hi: f32) -> f32 {
    if value.is_nan() {
        return lo;
    }
    value.max(lo).min(hi)
}

/// Move `moles` from `source` to `destination`.
///
/// A negative amount reverses the direction: `|moles|` is pulled from
/// `destination` into `source`. Zero and non-finite amounts are no-ops.
/// Returns the signed amount actually moved (positive means
/// source → destination).
pub fn transfer_gas(source: &mut GasMix, destination: &mut GasMix, moles: f32) -> f32 {
    if !moles.is_finite() || moles == 0.0 {
        return 0.0;
    }
    if moles < 0.0 {
        return -move_moles(destination, source, -moles);
    }
    move_moles(source, destination, moles)
}

fn move_moles(from: &mut GasMix, to: &mut GasMix, requested: f32) -> f32 {
    let available = from.total_moles();
    if available <= 0.0 {
        return 0.0;
    }

    let drain_all = requested >= available;
    let fraction = requested / available;

    to.blend_temperature(requested.min(available), from.temperature());

    let mut moved = 0.0;
    for gas in Gas::ALL {
        let held = from.moles(gas);
        let share = if drain_all { held } else { held * fraction };
        let removed = from.remove_moles(gas, share);
        to.add_moles(gas, removed);
        moved += removed;
    }

    log::trace!(
        "moved {:.3} mol (requested {:.3}, available {:.3})",
        moved,
        requested,
        available
    );
    moved
}

/// Moles that must leave `a` for `b` (negative: leave `b` for `a`) so both
/// end at the same pressure, accounting for the temperature blend.
fn equalizing_amount(a: &GasMix, b: &GasMix) -> f32 {
    let diff = a.thermal_density() - b.thermal_density();
    let inverse_volumes = 1.0 / a.volume() + 1.0 / b.volume();
    if diff > 0.0 {
        diff / (a.temperature() * inverse_volumes)
    } else if diff < 0.0 {
        diff / (b.temperature() * inverse_volumes)
    } else {
        0.0
    }
}

/// Move gas from the higher-pressure mix to the lower until both pressures
/// match. Returns the signed amount moved (positive means `a` → `b`).
pub fn equalize(a: &mut GasMix, b: &mut GasMix) -> f32 {
    share(a, b, 1.0)
}

/// Like [`equalize`] but moves only `fraction` (clamped to `[0, 1]`) of the
/// equalizing amount. Used for gradual exchange between neighbouring tiles.
pub fn share(a: &mut GasMix, b: &mut GasMix, fraction: f32) -> f32 {
    let amount = equalizing_amount(a, b) * clamp(fraction, 0.0, 1.0);
    transfer_gas(a, b, amount)
}

/// A transfer with optional clamp bounds applied before moving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Signed moles; negative pulls from destination into source.
    pub moles: f32,
    /// Inclusive `(lo, hi)` bounds applied with [`clamp`].
    pub bounds: Option<(f32, f32)>,
}

impl TransferRequest {
    pub fn new(moles: f32) -> Self {
        Self {
            moles,
            bounds: None,
        }
    }

    pub fn clamped(moles: f32, lo: f32, hi: f32) -> Self {
        Self {
            moles,
            bounds: Some((lo, hi)),
        }
    }

    /// The amount that will be requested from the engine.
    pub fn effective_moles(&self) -> f32 {
        match self.bounds {
            Some((lo, hi)) => clamp(self.moles, lo, hi),
            None => self.moles,
        }
    }

    pub fn execute(&self, source: &mut GasMix, destination: &mut GasMix) -> f32 {
        transfer_gas(source, destination, self.effective_moles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::physics::{ONE_ATMOSPHERE, ROOM_TEMPERATURE, TILE_VOLUME};

    fn air() -> GasMix {
        GasMix::air(TILE_VOLUME, ROOM_TEMPERATURE, ONE_ATMOSPHERE).unwrap()
    }

    fn empty(volume: f32) -> GasMix {
        GasMix::new(volume, ROOM_TEMPERATURE).unwrap()
    }

    fn total(a: &GasMix, b: &GasMix) -> f32 {
        a.total_moles() + b.total_moles()
    }

    #[test]
    fn test_transfer_conserves_mass() {
        for amount in [0.0, 0.5, 8.0, 50.0, 100.0] {
            let mut src = air();
            let mut dst = empty(1.0);
            let before = total(&src, &dst);
            let moved = transfer_gas(&mut src, &mut dst, amount);
            assert!((total(&src, &dst) - before).abs() < 1e-3, "amount {amount}");
            assert!((moved - amount).abs() < 1e-3, "amount {amount}");
        }
    }

    #[test]
    fn test_transfer_capped_at_available() {
        let mut src = empty(1.0);
        src.set_moles(Gas::Oxygen, 3.0).unwrap();
        src.set_moles(Gas::Nitrogen, 1.0).unwrap();
        let mut dst = empty(1.0);

        let moved = transfer_gas(&mut src, &mut dst, 10.0);

        assert_eq!(moved, 4.0);
        assert_eq!(src.total_moles(), 0.0);
        assert_eq!(dst.moles(Gas::Oxygen), 3.0);
        assert_eq!(dst.moles(Gas::Nitrogen), 1.0);
    }

    #[test]
    fn test_zero_transfer_is_noop() {
        let mut src = air();
        let mut dst = empty(1.0);
        let snapshot = (src.clone(), dst.clone());
        assert_eq!(transfer_gas(&mut src, &mut dst, 0.0), 0.0);
        assert_eq!(transfer_gas(&mut src, &mut dst, f32::NAN), 0.0);
        assert_eq!((src, dst), snapshot);
    }

    #[test]
    fn test_empty_source_moves_nothing() {
        let mut src = empty(1.0);
        let mut dst = air();
        assert_eq!(transfer_gas(&mut src, &mut dst, 5.0), 0.0);
        assert_eq!(src.total_moles(), 0.0);
    }

    #[test]
    fn test_negative_transfer_reverses_direction() {
        let mut src = empty(1.0);
        let mut dst = air();
        let dst_before = dst.total_moles();

        let moved = transfer_gas(&mut src, &mut dst, -4.0);

        assert!((moved + 4.0).abs() < 1e-4);
        assert!((src.total_moles() - 4.0).abs() < 1e-4);
        assert!((dst.total_moles() - (dst_before - 4.0)).abs() < 1e-3);
    }

    #[test]
    fn test_transfer_preserves_composition() {
        let mut src = air();
        let mut dst = empty(1.0);
        transfer_gas(&mut src, &mut dst, 10.0);
        assert!((dst.ratio(Gas::Oxygen) - 0.21).abs() < 1e-4);
        assert!((dst.ratio(Gas::Nitrogen) - 0.78).abs() < 1e-4);
        assert!((src.ratio(Gas::Oxygen) - 0.21).abs() < 1e-4);
    }

    #[test]
    fn test_transfer_blends_temperature() {
        let mut hot = GasMix::new(1.0, 400.0).unwrap();
        hot.set_moles(Gas::Nitrogen, 10.0).unwrap();
        let mut cold = GasMix::new(1.0, 200.0).unwrap();
        cold.set_moles(Gas::Nitrogen, 10.0).unwrap();

        transfer_gas(&mut hot, &mut cold, 10.0);

        assert!((cold.temperature() - 300.0).abs() < 1e-3);
        assert_eq!(hot.temperature(), 400.0, "source temperature unchanged");
    }

    #[test]
    fn test_equalize_matches_pressures() {
        let mut a = air();
        let mut b = empty(1.0);
        let before = total(&a, &b);

        let moved = equalize(&mut a, &mut b);

        assert!(moved > 0.0);
        assert!((a.pressure() - b.pressure()).abs() < 0.01);
        assert!((total(&a, &b) - before).abs() < 1e-3);
    }

    #[test]
    fn test_equalize_different_temperatures() {
        let mut a = GasMix::new(2.0, 250.0).unwrap();
        a.set_moles(Gas::Oxygen, 5.0).unwrap();
        let mut b = GasMix::new(1.0, 350.0).unwrap();
        b.set_moles(Gas::Oxygen, 20.0).unwrap();

        let moved = equalize(&mut a, &mut b);

        assert!(moved < 0.0, "b is at higher pressure");
        assert!((a.pressure() - b.pressure()).abs() < 0.05);
    }

    #[test]
    fn test_share_moves_fraction() {
        let mut a = air();
        let mut b = empty(TILE_VOLUME);
        let moved = share(&mut a, &mut b, 0.5);
        // Equal volumes and temperatures: full equalization moves half the moles.
        let full = GasMix::air(TILE_VOLUME, ROOM_TEMPERATURE, ONE_ATMOSPHERE)
            .unwrap()
            .total_moles()
            / 2.0;
        assert!((moved - full * 0.5).abs() < 1e-2);
    }

    #[test]
    fn test_clamp_helper() {
        assert_eq!(clamp(12.0, 0.0, 8.0), 8.0);
        assert_eq!(clamp(-3.0, 0.0, 8.0), 0.0);
        assert_eq!(clamp(4.0, 0.0, 8.0), 4.0);
        assert_eq!(clamp(f32::INFINITY, 0.0, 8.0), 8.0);
        assert_eq!(clamp(f32::NAN, 0.0, 8.0), 0.0);
    }

    #[test]
    fn test_request_applies_bounds() {
        let mut src = air();
        let mut dst = empty(1.0);
        let req = TransferRequest::clamped(40.0, 0.0, 8.0);
        assert_eq!(req.effective_moles(), 8.0);
        let moved = req.execute(&mut src, &mut dst);
        assert!((moved - 8.0).abs() < 1e-3);
        assert_eq!(TransferRequest::new(-2.0).effective_moles(), -2.0);
    }
}
