//! Occupancy grid - coarse per-cell unit counts for minimap aggregation.
//!
//! Covers the same world bounds as the tile grid at its own resolution.
//! Cells are updated by add/remove/move events only; there is no occlusion.

use crate::error::FogError;
use crate::grid::{GridBounds, TileIJ};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Linear RGBA color used for minimap icons.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgba(0.0, 1.0, 0.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Aggregate minimap data for one coarse cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OccupancyCell {
    pub unit_count: u32,
    /// Color of the most recently added unit.
    pub color: Color,
    pub max_sight_radius: f32,
    pub max_icon_size: f32,
}

/// Coarse grid of unit counts.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyGrid {
    /// Bottom-left corner in world space.
    pub origin: (f64, f64),
    /// World size of one cell per axis.
    pub cell_size: (f64, f64),
    pub resolution_x: i32,
    pub resolution_y: i32,
    cells: Vec<OccupancyCell>,
}

impl OccupancyGrid {
    pub fn new(bounds: GridBounds, resolution: (i32, i32)) -> Result<Self, FogError> {
        bounds.validate()?;
        let (rx, ry) = resolution;
        if rx <= 0 || ry <= 0 {
            return Err(FogError::InvalidMinimapResolution { x: rx, y: ry });
        }
        let (width, height) = bounds.size();
        Ok(Self {
            origin: bounds.min,
            cell_size: (width / rx as f64, height / ry as f64),
            resolution_x: rx,
            resolution_y: ry,
            cells: vec![OccupancyCell::default(); (rx as usize) * (ry as usize)],
        })
    }

    /// Convert world coordinates to cell coordinates (may be off the grid).
    #[inline]
    pub fn world_to_cell(&self, x: f64, y: f64) -> TileIJ {
        TileIJ::new(
            ((x - self.origin.0) / self.cell_size.0).floor() as i32,
            ((y - self.origin.1) / self.cell_size.1).floor() as i32,
        )
    }

    #[inline]
    pub fn is_valid(&self, cell: TileIJ) -> bool {
        cell.i >= 0 && cell.j >= 0 && cell.i < self.resolution_x && cell.j < self.resolution_y
    }

    /// Same ordering as the tile grid: X outer, Y inner.
    #[inline]
    pub fn index(&self, cell: TileIJ) -> usize {
        (cell.i * self.resolution_y + cell.j) as usize
    }

    pub fn get(&self, cell: TileIJ) -> Option<&OccupancyCell> {
        if self.is_valid(cell) {
            Some(&self.cells[self.index(cell)])
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[OccupancyCell] {
        &self.cells
    }

    /// Count a unit in `cell`. Cells off the grid are ignored.
    pub fn add(&mut self, cell: TileIJ, color: Color, sight_radius: f32, icon_size: f32) {
        if !self.is_valid(cell) {
            return;
        }
        let index = self.index(cell);
        let entry = &mut self.cells[index];
        entry.unit_count += 1;
        entry.color = color;
        entry.max_sight_radius = entry.max_sight_radius.max(sight_radius);
        entry.max_icon_size = entry.max_icon_size.max(icon_size);
    }

    /// Uncount a unit from `cell`, clearing the aggregates once it is empty.
    pub fn remove(&mut self, cell: TileIJ) {
        if !self.is_valid(cell) {
            return;
        }
        let index = self.index(cell);
        let entry = &mut self.cells[index];
        debug_assert!(entry.unit_count > 0, "occupancy underflow at {:?}", cell);
        entry.unit_count = entry.unit_count.saturating_sub(1);
        if entry.unit_count == 0 {
            *entry = OccupancyCell::default();
        }
    }

    /// Move a unit between cells. Returns whether anything changed.
    pub fn move_unit(
        &mut self,
        old: TileIJ,
        new: TileIJ,
        color: Color,
        sight_radius: f32,
        icon_size: f32,
    ) -> bool {
        if old == new {
            return false;
        }
        self.remove(old);
        self.add(new, color, sight_radius, icon_size);
        true
    }

    /// Get total unit count.
    pub fn total_count(&self) -> u64 {
        self.cells.iter().map(|c| c.unit_count as u64).sum()
    }

    pub fn snapshot(&self) -> OccupancySnapshot {
        OccupancySnapshot {
            resolution_x: self.resolution_x,
            resolution_y: self.resolution_y,
            origin_x: self.origin.0,
            origin_y: self.origin.1,
            cell_size_x: self.cell_size.0,
            cell_size_y: self.cell_size.1,
            cells: self.cells.clone(),
        }
    }
}

/// Serializable copy of the occupancy grid for minimap consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub resolution_x: i32,
    pub resolution_y: i32,
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_size_x: f64,
    pub cell_size_y: f64,
    /// Flattened cells, X outer and Y inner.
    pub cells: Vec<OccupancyCell>,
}

impl OccupancySnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
