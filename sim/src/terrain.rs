//! Terrain heightfield - a sampled height source for building tile grids.
//!
//! Hosts usually answer height queries from their own collision world; this
//! raster is the stand-in used by the demo, benches and tests, and by hosts
//! that already keep a heightmap around.

use crate::grid::{GridBounds, HeightProvider};
use serde::{Deserialize, Serialize};

/// Grid-based terrain heightmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightField {
    /// Width of the field in cells.
    pub width: usize,
    /// Height of the field in cells.
    pub height: usize,
    /// Size of each cell in world units.
    pub cell_size: f64,
    /// World position of the bottom-left corner of cell (0, 0).
    pub origin_x: f64,
    pub origin_y: f64,
    /// Heights, row-major (`y * width + x`). `None` marks holes with no ground.
    pub heights: Vec<Option<f32>>,
}

impl HeightField {
    /// Create a flat field at height 0 with its bottom-left corner at `origin`.
    pub fn new(width: usize, height: usize, cell_size: f64, origin: (f64, f64)) -> Self {
        Self {
            width,
            height,
            cell_size,
            origin_x: origin.0,
            origin_y: origin.1,
            heights: vec![Some(0.0); width * height],
        }
    }

    /// Create a field with a few hills and a ridge, for demos and benches.
    pub fn new_with_features(width: usize, height: usize, cell_size: f64) -> Self {
        let mut field = Self::new(width, height, cell_size, (0.0, 0.0));

        // North-south ridge with a gap in the middle
        let ridge_x = width / 3;
        for y in 0..height {
            if y.abs_diff(height / 2) > height / 10 {
                field.set(ridge_x, y, Some(400.0));
            }
        }

        field.raise_hill(2 * width / 3, height / 4, width / 12, 300.0);
        field.raise_hill(3 * width / 4, 3 * height / 4, width / 10, 500.0);
        field
    }

    fn cell_index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        self.cell_index(x, y).and_then(|i| self.heights[i])
    }

    pub fn set(&mut self, x: usize, y: usize, value: Option<f32>) {
        if let Some(i) = self.cell_index(x, y) {
            self.heights[i] = value;
        }
    }

    /// Raise a cone-shaped hill of `peak` height and `radius` cells.
    pub fn raise_hill(&mut self, cx: usize, cy: usize, radius: usize, peak: f32) {
        let r = radius.max(1) as f32;
        for dy in 0..=radius * 2 {
            for dx in 0..=radius * 2 {
                let x = cx.saturating_sub(radius) + dx;
                let y = cy.saturating_sub(radius) + dy;
                let dist = ((x as f32 - cx as f32).powi(2) + (y as f32 - cy as f32).powi(2)).sqrt();
                if dist <= r {
                    if let Some(i) = self.cell_index(x, y) {
                        let lift = peak * (1.0 - dist / r);
                        self.heights[i] = self.heights[i].map(|h| h.max(lift));
                    }
                }
            }
        }
    }

    /// World bounds covered by the field.
    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(
            (self.origin_x, self.origin_y),
            (
                self.origin_x + self.width as f64 * self.cell_size,
                self.origin_y + self.height as f64 * self.cell_size,
            ),
        )
    }
}

impl HeightProvider for HeightField {
    /// Nearest-cell lookup; points off the field have no ground.
    fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        let gx = ((x - self.origin_x) / self.cell_size).floor();
        let gy = ((y - self.origin_y) / self.cell_size).floor();
        if gx < 0.0 || gy < 0.0 {
            return None;
        }
        self.get(gx as usize, gy as usize).map(f64::from)
    }
}
