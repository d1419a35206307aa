//! Tile-level gas storage and neighbour exchange.
//!
//! Every map tile owns one [`GasMix`]. Devices reach the mix on their tile
//! through [`TileGasProvider`] and flag the tile dirty after changing it;
//! [`TileGrid::tick_exchange`] then shares gas between dirty tiles and their
//! open neighbours, a fraction of the equalizing amount per tick. Tiles
//! that stop changing drop out of the dirty set.
//!
//! Sealed tiles (walls, closed doors) neither give nor take gas.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::GasError;
use crate::gas::GasMix;
use crate::transfer::share;

/// Moles below which an exchange no longer keeps a tile awake.
const SETTLE_THRESHOLD: f32 = 1e-3;

/// Grid coordinates of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Host access to per-tile gas.
pub trait TileGasProvider {
    /// Mutable handle to the gas on `pos`, `None` off-map.
    fn tile_gas_mut(&mut self, pos: TilePos) -> Option<&mut GasMix>;
    /// Tell the atmospherics pass that `pos` changed this tick.
    fn mark_dirty(&mut self, pos: TilePos);
}

/// One map cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub gas: GasMix,
    /// Blocks exchange with neighbours.
    pub sealed: bool,
}

/// Rectangular grid of tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    dirty: BTreeSet<usize>,
}

impl TileGrid {
    /// A grid where every tile holds a copy of `gas`.
    pub fn filled(width: u32, height: u32, gas: GasMix) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            tiles: vec![Tile { gas, sealed: false }; count],
            dirty: BTreeSet::new(),
        }
    }

    /// A grid of breathable air sized and conditioned from `config`.
    pub fn from_config(config: &SimConfig) -> Result<Self, GasError> {
        let air = GasMix::air(
            config.tile_volume,
            config.tile_temperature,
            config.tile_pressure,
        )?;
        Ok(Self::filled(config.width, config.height, air))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }

    fn pos_of(&self, idx: usize) -> TilePos {
        let w = self.width as usize;
        TilePos::new((idx % w) as i32, (idx / w) as i32)
    }

    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).map(move |i| &mut self.tiles[i])
    }

    /// Seal or open a tile. Opening wakes it so it rejoins exchange.
    pub fn set_sealed(&mut self, pos: TilePos, sealed: bool) {
        if let Some(i) = self.index(pos) {
            self.tiles[i].sealed = sealed;
            if !sealed {
                self.dirty.insert(i);
            }
        }
    }

    pub fn is_dirty(&self, pos: TilePos) -> bool {
        self.index(pos).is_some_and(|i| self.dirty.contains(&i))
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Sum of moles over every tile.
    pub fn total_moles(&self) -> f32 {
        self.tiles.iter().map(|t| t.gas.total_moles()).sum()
    }

    fn pair_mut(&mut self, a: usize, b: usize) -> (&mut Tile, &mut Tile) {
        debug_assert_ne!(a, b);
        if a < b {
            let (lo, hi) = self.tiles.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.tiles.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    fn neighbours(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let pos = self.pos_of(idx);
        [(1, 0), (0, 1), (-1, 0), (0, -1)]
            .into_iter()
            .filter_map(move |(dx, dy)| self.index(TilePos::new(pos.x + dx, pos.y + dy)))
    }

    /// One atmospherics pass over the dirty set. Returns total moles moved.
    pub fn tick_exchange(&mut self, rate: f32) -> f32 {
        let active = std::mem::take(&mut self.dirty);
        let mut moved_total = 0.0;

        for idx in active {
            if self.tiles[idx].sealed {
                continue;
            }
            let open: Vec<usize> = self
                .neighbours(idx)
                .filter(|&n| !self.tiles[n].sealed)
                .collect();
            for n in open {
                let (here, there) = self.pair_mut(idx, n);
                let moved = share(&mut here.gas, &mut there.gas, rate);
                if moved.abs() > SETTLE_THRESHOLD {
                    self.dirty.insert(idx);
                    self.dirty.insert(n);
                }
                moved_total += moved.abs();
            }
        }

        moved_total
    }
}

impl TileGasProvider for TileGrid {
    fn tile_gas_mut(&mut self, pos: TilePos) -> Option<&mut GasMix> {
        self.tile_mut(pos).map(|t| &mut t.gas)
    }

    fn mark_dirty(&mut self, pos: TilePos) {
        if let Some(i) = self.index(pos) {
            self.dirty.insert(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::Gas;

    fn grid(width: u32, height: u32) -> TileGrid {
        TileGrid::from_config(&SimConfig {
            width,
            height,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_off_map_positions() {
        let mut g = grid(3, 2);
        assert!(g.tile_gas_mut(TilePos::new(-1, 0)).is_none());
        assert!(g.tile_gas_mut(TilePos::new(3, 0)).is_none());
        assert!(g.tile_gas_mut(TilePos::new(2, 1)).is_some());
    }

    #[test]
    fn test_exchange_refills_depleted_tile() {
        let mut g = grid(3, 1);
        let centre = TilePos::new(1, 0);
        g.tile_gas_mut(centre).unwrap().reset();
        g.mark_dirty(centre);
        let before = g.total_moles();

        g.tick_exchange(0.3);

        let centre_moles = g.tile(centre).unwrap().gas.total_moles();
        assert!(centre_moles > 0.0, "neighbours should push gas in");
        assert!((g.total_moles() - before).abs() < 1e-2, "exchange conserves mass");
        assert!(g.is_dirty(TilePos::new(0, 0)), "neighbour wakes up");
    }

    #[test]
    fn test_sealed_tile_does_not_exchange() {
        let mut g = grid(2, 1);
        let wall = TilePos::new(1, 0);
        g.set_sealed(wall, true);
        g.tile_gas_mut(wall).unwrap().reset();
        g.mark_dirty(TilePos::new(0, 0));

        g.tick_exchange(0.3);

        assert_eq!(g.tile(wall).unwrap().gas.total_moles(), 0.0);
    }

    #[test]
    fn test_settled_grid_goes_quiet() {
        let mut g = grid(2, 2);
        g.mark_dirty(TilePos::new(0, 0));
        // All tiles are identical, so nothing moves and nothing stays dirty.
        assert_eq!(g.tick_exchange(0.3), 0.0);
        assert_eq!(g.dirty_count(), 0);
    }

    #[test]
    fn test_repeated_exchange_converges() {
        let mut g = grid(4, 1);
        let corner = TilePos::new(0, 0);
        g.tile_gas_mut(corner)
            .unwrap()
            .add_moles(Gas::Plasma, 100.0);
        g.mark_dirty(corner);

        for _ in 0..200 {
            g.tick_exchange(0.3);
        }

        let p0 = g.tile(corner).unwrap().gas.pressure();
        let p3 = g.tile(TilePos::new(3, 0)).unwrap().gas.pressure();
        assert!((p0 - p3).abs() < 0.5, "pressures {p0} and {p3} should converge");
        assert!(g.tile(TilePos::new(3, 0)).unwrap().gas.moles(Gas::Plasma) > 0.0);
    }
}
