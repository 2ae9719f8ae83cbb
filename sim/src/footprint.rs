//! Per-agent vision footprint - a square window of tile states around the agent.
//!
//! The window is sized so the full disc of the sight radius fits around any
//! origin tile. Its states are the agent's last computed view and are what
//! gets rolled back from the shared counters when the agent moves or leaves.

use crate::grid::{TileGrid, TileIJ};
use serde::{Deserialize, Serialize};

/// Resolution state of one window cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileState {
    /// Not resolved during the current pass.
    #[default]
    Unknown,
    Visible,
    NotVisible,
}

/// Cached local visibility window owned by exactly one agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisionFootprint {
    /// Sight radius measured in tiles.
    pub sight_radius_grid: f32,
    /// Edge length of the window in tiles.
    pub local_resolution: i32,
    /// Global coordinate of local (0, 0).
    pub local_min_corner: TileIJ,
    pub(crate) states: Vec<TileState>,
    /// Global index of the origin tile at the last successful recompute.
    pub cached_origin_global_index: i32,
    pub(crate) has_cache: bool,
}

/// Window edge length for a sight radius given in tiles.
#[inline]
pub fn local_resolution_for(sight_radius_grid: f32) -> i32 {
    ((2.0 * sight_radius_grid).ceil() as i32).saturating_add(1)
}

impl VisionFootprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this footprint currently contributes to the shared counters.
    #[inline]
    pub fn has_cache(&self) -> bool {
        self.has_cache
    }

    pub fn states(&self) -> &[TileState] {
        &self.states
    }

    #[inline]
    pub fn local_index(&self, ij: TileIJ) -> usize {
        (ij.i * self.local_resolution + ij.j) as usize
    }

    #[inline]
    pub fn local_ij(&self, index: usize) -> TileIJ {
        let index = index as i32;
        TileIJ::new(index / self.local_resolution, index % self.local_resolution)
    }

    #[inline]
    pub fn is_local_valid(&self, ij: TileIJ) -> bool {
        ij.i >= 0 && ij.j >= 0 && ij.i < self.local_resolution && ij.j < self.local_resolution
    }

    #[inline]
    pub fn local_to_global(&self, local: TileIJ) -> TileIJ {
        self.local_min_corner + local
    }

    #[inline]
    pub fn global_to_local(&self, global: TileIJ) -> TileIJ {
        global - self.local_min_corner
    }

    /// State of a local cell. Panics if `ij` is outside the window.
    #[inline]
    pub fn state(&self, ij: TileIJ) -> TileState {
        debug_assert!(self.is_local_valid(ij));
        self.states[self.local_index(ij)]
    }

    /// State of the window cell covering a global tile, if inside the window.
    pub fn state_at_global(&self, global: TileIJ) -> Option<TileState> {
        let local = self.global_to_local(global);
        if self.is_local_valid(local) && !self.states.is_empty() {
            Some(self.state(local))
        } else {
            None
        }
    }

    /// Global tiles this footprint adds to the shared counters.
    ///
    /// A cell contributes when it is Visible, lies on the grid and is within
    /// the sight radius of the cached origin. Rollback and apply both use this
    /// predicate so every increment is matched by exactly one decrement.
    pub fn contributed_tiles<'a>(&'a self, grid: &'a TileGrid) -> impl Iterator<Item = TileIJ> + 'a {
        let origin = grid.tile_ij(self.cached_origin_global_index);
        let radius_sq = self.sight_radius_grid * self.sight_radius_grid;
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == TileState::Visible)
            .map(move |(index, _)| self.local_to_global(self.local_ij(index)))
            .filter(move |global| {
                grid.is_valid(*global) && (origin.distance_sq(*global) as f32) <= radius_sq
            })
    }

    /// Size and position the window for a new origin and reset every state.
    ///
    /// The origin cell starts Visible; everything else Unknown. Returns the
    /// origin's local coordinate.
    pub(crate) fn rebind(&mut self, origin_grid: (f32, f32), sight_radius_grid: f32) -> TileIJ {
        let r = sight_radius_grid;
        self.sight_radius_grid = r;
        self.local_resolution = local_resolution_for(r);
        self.local_min_corner = TileGrid::grid_space_to_tile_ij(origin_grid.0 - r, origin_grid.1 - r);

        debug_assert!({
            let max = TileGrid::grid_space_to_tile_ij(origin_grid.0 + r, origin_grid.1 + r);
            let span_i = max.i - self.local_min_corner.i + 1;
            let span_j = max.j - self.local_min_corner.j + 1;
            span_i <= self.local_resolution
                && span_j <= self.local_resolution
                && span_i + 2 > self.local_resolution
                && span_j + 2 > self.local_resolution
        }, "footprint window does not fit the sight disc");

        let side = self.local_resolution.max(0) as usize;
        let cells = side * side;
        self.states.clear();
        self.states.resize(cells, TileState::Unknown);

        let origin_global = TileGrid::grid_space_to_tile_ij(origin_grid.0, origin_grid.1);
        let origin_local = self.global_to_local(origin_global);
        let origin_index = self.local_index(origin_local);
        self.states[origin_index] = TileState::Visible;
        origin_local
    }

    /// Forget the cached window without touching any counters.
    pub(crate) fn invalidate(&mut self) {
        self.has_cache = false;
        self.states.clear();
    }
}
