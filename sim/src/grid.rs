//! Tile grid - terrain heights, shared visibility counters and coordinate math.
//!
//! The grid covers a rectangular world region split into square tiles. Each
//! tile stores the terrain height sampled at its center and a visibility
//! counter: the number of vision agents whose footprint currently reveals it.
//!
//! ## Coordinate Spaces
//!
//! - **World space**: `f64` positions as supplied by the host.
//! - **Grid space**: `(world - origin) / tile_size`, continuous, in tiles.
//! - **Tile IJ**: integer tile coordinates, the floor of grid space.
//! - **Global index**: `i * resolution_y + j`. Every buffer handed out by the
//!   grid uses this ordering.

use crate::error::{FogError, MAX_RESOLUTION_SUM};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Integer tile coordinate (global or window-local).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileIJ {
    pub i: i32,
    pub j: i32,
}

impl TileIJ {
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Squared distance between two tile anchors.
    #[inline]
    pub fn distance_sq(self, other: TileIJ) -> i32 {
        let di = self.i - other.i;
        let dj = self.j - other.j;
        di * di + dj * dj
    }
}

impl Add for TileIJ {
    type Output = TileIJ;

    fn add(self, rhs: TileIJ) -> TileIJ {
        TileIJ::new(self.i + rhs.i, self.j + rhs.j)
    }
}

impl Sub for TileIJ {
    type Output = TileIJ;

    fn sub(self, rhs: TileIJ) -> TileIJ {
        TileIJ::new(self.i - rhs.i, self.j - rhs.j)
    }
}

/// Rectangular world region covered by the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Bottom-left corner in world space.
    pub min: (f64, f64),
    /// Top-right corner in world space.
    pub max: (f64, f64),
}

impl GridBounds {
    pub fn new(min: (f64, f64), max: (f64, f64)) -> Self {
        Self { min, max }
    }

    /// Bounds from a center point and half-extents (volume style).
    pub fn from_center_extent(center: (f64, f64), half_extent: (f64, f64)) -> Self {
        Self {
            min: (center.0 - half_extent.0, center.1 - half_extent.1),
            max: (center.0 + half_extent.0, center.1 + half_extent.1),
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.max.0 - self.min.0, self.max.1 - self.min.1)
    }

    pub(crate) fn validate(&self) -> Result<(), FogError> {
        let (width, height) = self.size();
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(FogError::InvalidBounds { width, height });
        }
        Ok(())
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self::new((0.0, 0.0), (10_000.0, 10_000.0))
    }
}

/// Source of terrain heights, queried once per tile center at grid build.
///
/// `None` means no ground was found at that point; such tiles never block
/// line of sight.
pub trait HeightProvider {
    fn height_at(&self, x: f64, y: f64) -> Option<f64>;
}

impl<F> HeightProvider for F
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        self(x, y)
    }
}

/// A single cell in the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain height at the tile center (`-inf` when no ground was found).
    pub height: f32,
    /// Number of agents currently revealing this tile.
    pub visibility_counter: u32,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            height: f32::NEG_INFINITY,
            visibility_counter: 0,
        }
    }
}

impl Tile {
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visibility_counter > 0
    }
}

/// Fixed-shape tile grid shared by every vision agent.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    /// Bottom-left corner of the grid in world space.
    pub origin: (f64, f64),
    /// Edge length of one tile in world units.
    pub tile_size: f32,
    pub resolution_x: i32,
    pub resolution_y: i32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Build a grid over `bounds`, sampling each tile center with `heights`.
    ///
    /// Resolution per axis is `ceil(size / tile_size)`.
    pub fn new<H: HeightProvider + ?Sized>(
        bounds: GridBounds,
        tile_size: f32,
        heights: &H,
    ) -> Result<Self, FogError> {
        let (resolution_x, resolution_y) = Self::resolution_for(&bounds, tile_size)?;

        let mut grid = Self {
            origin: bounds.min,
            tile_size,
            resolution_x,
            resolution_y,
            tiles: vec![Tile::default(); (resolution_x * resolution_y) as usize],
        };

        for i in 0..resolution_x {
            for j in 0..resolution_y {
                let ij = TileIJ::new(i, j);
                let (x, y) = grid.tile_ij_to_center_world(ij);
                let height = heights
                    .height_at(x, y)
                    .map(|h| h as f32)
                    .unwrap_or(f32::NEG_INFINITY);
                let index = grid.global_index(ij) as usize;
                grid.tiles[index].height = height;
            }
        }

        Ok(grid)
    }

    /// Resolution a grid over `bounds` would get, or the configuration error.
    pub fn resolution_for(bounds: &GridBounds, tile_size: f32) -> Result<(i32, i32), FogError> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(FogError::InvalidTileSize(tile_size));
        }
        bounds.validate()?;

        let (width, height) = bounds.size();
        let rx = (width / tile_size as f64).ceil();
        let ry = (height / tile_size as f64).ceil();
        if rx + ry > MAX_RESOLUTION_SUM as f64 {
            return Err(FogError::ResolutionOverflow {
                x: rx.min(i32::MAX as f64) as i32,
                y: ry.min(i32::MAX as f64) as i32,
            });
        }
        Ok((rx as i32, ry as i32))
    }

    /// Convert world coordinates to continuous grid space.
    #[inline]
    pub fn world_to_grid_space(&self, x: f64, y: f64) -> (f32, f32) {
        (
            ((x - self.origin.0) / self.tile_size as f64) as f32,
            ((y - self.origin.1) / self.tile_size as f64) as f32,
        )
    }

    /// Floor grid space to a tile coordinate.
    #[inline]
    pub fn grid_space_to_tile_ij(gx: f32, gy: f32) -> TileIJ {
        TileIJ::new(gx.floor() as i32, gy.floor() as i32)
    }

    /// Tile containing a world position (may be outside the grid).
    #[inline]
    pub fn world_to_tile_ij(&self, x: f64, y: f64) -> TileIJ {
        let (gx, gy) = self.world_to_grid_space(x, y);
        Self::grid_space_to_tile_ij(gx, gy)
    }

    /// World position of a tile's center.
    #[inline]
    pub fn tile_ij_to_center_world(&self, ij: TileIJ) -> (f64, f64) {
        let size = self.tile_size as f64;
        (
            self.origin.0 + size * ij.i as f64 + size / 2.0,
            self.origin.1 + size * ij.j as f64 + size / 2.0,
        )
    }

    #[inline]
    pub fn is_valid(&self, ij: TileIJ) -> bool {
        ij.i >= 0 && ij.j >= 0 && ij.i < self.resolution_x && ij.j < self.resolution_y
    }

    /// Row-major index with X outer and Y inner.
    #[inline]
    pub fn global_index(&self, ij: TileIJ) -> i32 {
        ij.i * self.resolution_y + ij.j
    }

    /// Inverse of [`global_index`](Self::global_index).
    #[inline]
    pub fn tile_ij(&self, global_index: i32) -> TileIJ {
        TileIJ::new(global_index / self.resolution_y, global_index % self.resolution_y)
    }

    /// Grid diagonal in tiles. No two tiles are farther apart than this.
    pub fn diagonal_tiles(&self) -> f32 {
        let (rx, ry) = (self.resolution_x as f32, self.resolution_y as f32);
        (rx * rx + ry * ry).sqrt()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn get(&self, ij: TileIJ) -> Option<&Tile> {
        if self.is_valid(ij) {
            Some(&self.tiles[self.global_index(ij) as usize])
        } else {
            None
        }
    }

    /// Height of a valid tile. Callers check [`is_valid`](Self::is_valid) first.
    #[inline]
    pub(crate) fn height(&self, ij: TileIJ) -> f32 {
        self.tiles[self.global_index(ij) as usize].height
    }

    #[inline]
    pub(crate) fn increment(&mut self, ij: TileIJ) {
        let index = self.global_index(ij) as usize;
        self.tiles[index].visibility_counter += 1;
    }

    #[inline]
    pub(crate) fn decrement(&mut self, ij: TileIJ) {
        let index = self.global_index(ij) as usize;
        let tile = &mut self.tiles[index];
        debug_assert!(
            tile.visibility_counter > 0,
            "visibility counter underflow at {:?}",
            ij
        );
        tile.visibility_counter = tile.visibility_counter.saturating_sub(1);
    }

    /// Whether the tile containing a world point is currently revealed.
    /// Points outside the grid are never visible.
    pub fn is_world_location_visible(&self, x: f64, y: f64) -> bool {
        self.get(self.world_to_tile_ij(x, y))
            .map(Tile::is_visible)
            .unwrap_or(false)
    }

    /// Per-tile visibility in global-index order.
    pub fn visibility_buffer(&self) -> Vec<bool> {
        self.tiles.iter().map(Tile::is_visible).collect()
    }

    /// Write 0xFF for visible tiles and 0 otherwise into a caller-owned buffer.
    ///
    /// Only the first `min(buffer.len(), tile_count)` entries are written.
    pub fn write_visibility_bytes(&self, buffer: &mut [u8]) {
        for (out, tile) in buffer.iter_mut().zip(&self.tiles) {
            *out = if tile.is_visible() { 0xFF } else { 0 };
        }
    }

    pub fn visible_tile_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_visible()).count()
    }

    /// Debug heightmap: heights normalized to `[lowest, highest]` and scaled to a byte.
    pub fn heightmap_bytes(&self, lowest: f32, highest: f32) -> Vec<u8> {
        let range = highest - lowest;
        self.tiles
            .iter()
            .map(|tile| {
                let pct = if range.abs() > f32::EPSILON {
                    (tile.height - lowest) / range
                } else {
                    0.0
                };
                (pct.clamp(0.0, 1.0) * 255.0).round() as u8
            })
            .collect()
    }
}
