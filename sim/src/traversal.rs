//! Visibility traversal - spiral enumeration, DDA line of sight, counter protocol.
//!
//! ## Recompute
//!
//! A footprint is recomputed by walking its window in a spiral and, for every
//! unresolved cell inside the sight disc, tracing a grid line from that cell
//! back to the agent. The whole traced prefix shares the ray's outcome, so
//! one ray usually resolves several cells. The spiral starts on the window's
//! outer ring and closes in on the origin, which means long rays run first
//! and the inner cells are mostly resolved by the time the walk reaches them.
//!
//! ## Counter Protocol
//!
//! Recomputing only reads tile heights. Counters are touched by
//! [`apply_footprint`] (increment) and [`reset_cached_visibility`]
//! (decrement), which must be called in matched pairs per footprint.
//! [`update_visibility`] runs the whole sequence for one agent.

use crate::footprint::{local_resolution_for, TileState, VisionFootprint};
use crate::grid::{TileGrid, TileIJ};

/// Spiral walk directions: right, up, left, down.
const DIRECTION_DELTAS: [TileIJ; 4] = [
    TileIJ::new(0, 1),
    TileIJ::new(1, 0),
    TileIJ::new(0, -1),
    TileIJ::new(-1, 0),
];

/// Iterator over every cell of an `n x n` window, each exactly once.
///
/// Runs along the four directions in turn. The first run has length `n`,
/// after that every length is used for two consecutive runs before shrinking
/// by one, and the walk ends after the second run of length 1.
#[derive(Debug, Clone)]
pub struct Spiral {
    current: TileIJ,
    direction: usize,
    step_size: i32,
    left_to_spend: i32,
    clock: bool,
    remaining: usize,
}

impl Spiral {
    pub fn new(resolution: i32) -> Self {
        let resolution = resolution.max(0);
        Self {
            current: TileIJ::new(0, 0) - DIRECTION_DELTAS[0],
            direction: 0,
            step_size: resolution,
            left_to_spend: resolution,
            clock: true,
            remaining: (resolution as usize) * (resolution as usize),
        }
    }
}

impl Iterator for Spiral {
    type Item = TileIJ;

    fn next(&mut self) -> Option<TileIJ> {
        if self.remaining == 0 {
            return None;
        }
        debug_assert!(self.left_to_spend > 0, "spiral run exhausted early");

        self.current = self.current + DIRECTION_DELTAS[self.direction];
        self.left_to_spend -= 1;
        self.remaining -= 1;
        let cell = self.current;

        if self.left_to_spend == 0 {
            if self.clock {
                if self.step_size == 1 {
                    debug_assert_eq!(self.remaining, 0, "spiral ended with cells left");
                    self.remaining = 0;
                    return Some(cell);
                }
                self.step_size -= 1;
            }
            self.clock = !self.clock;
            self.direction = (self.direction + 1) % 4;
            self.left_to_spend = self.step_size;
        }

        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Spiral {}

/// Whether terrain at `obstacle_height` hides what lies behind it.
#[inline]
pub fn is_blocking_vision(observer_height: f32, obstacle_height: f32, threshold: f32) -> bool {
    obstacle_height - observer_height > threshold
}

/// Per-recompute inputs shared by every ray.
struct RayContext<'a> {
    grid: &'a TileGrid,
    origin_local: TileIJ,
    observer_height: f32,
    blocking_threshold: f32,
}

/// Trace from `start` back to the origin and record the outcome on every cell
/// the line passes through.
fn trace_line_of_sight(
    ctx: &RayContext<'_>,
    footprint: &mut VisionFootprint,
    start: TileIJ,
    stack: &mut Vec<usize>,
) {
    let direction = ctx.origin_local - start;
    debug_assert!(direction != TileIJ::new(0, 0), "ray from the origin itself");

    let sign = TileIJ::new(
        if direction.i >= 0 { 1 } else { -1 },
        if direction.j >= 0 { 1 } else { -1 },
    );
    let (di, dj) = (direction.i as f32, direction.j as f32);
    // One axis may be zero; its step length is then infinite and never taken.
    let step_i = (1.0 + (dj / di) * (dj / di)).sqrt();
    let step_j = (1.0 + (di / dj) * (di / dj)).sqrt();
    // Rays start at a tile center, half a step from the first edge.
    let mut next_i = 0.5 * step_i;
    let mut next_j = 0.5 * step_j;

    let max_iterations = direction.i.abs() + direction.j.abs() + 1;
    let mut current = start;
    let mut blocked = false;
    let mut reached = false;

    stack.clear();
    for _ in 0..max_iterations {
        debug_assert!(footprint.is_local_valid(current));
        stack.push(footprint.local_index(current));
        if current == ctx.origin_local {
            reached = true;
            break;
        }

        let height = ctx.grid.height(footprint.local_to_global(current));
        if is_blocking_vision(ctx.observer_height, height, ctx.blocking_threshold) {
            blocked = true;
            break;
        }

        if next_i < next_j {
            next_i += step_i;
            current.i += sign.i;
        } else {
            next_j += step_j;
            current.j += sign.j;
        }
    }
    debug_assert!(blocked || reached, "line of sight walk exceeded {} steps", max_iterations);

    if blocked {
        for index in stack.drain(..).rev() {
            let state = &mut footprint.states[index];
            if *state != TileState::Visible {
                *state = TileState::NotVisible;
            }
        }
    } else {
        for index in stack.drain(..).rev() {
            footprint.states[index] = TileState::Visible;
        }
    }
}

impl VisionFootprint {
    /// Recompute this footprint for an agent at `position` (z is eye height).
    ///
    /// Reads tile heights only. Any previous contribution must have been
    /// rolled back first; the cache flag is cleared here and set again only
    /// when the origin lies on the grid. Returns whether the footprint is now
    /// cached.
    pub fn recompute(
        &mut self,
        grid: &TileGrid,
        position: (f64, f64, f64),
        sight_radius_world: f32,
        blocking_threshold: f32,
    ) -> bool {
        debug_assert!(!self.has_cache, "recompute over a live contribution");
        self.invalidate();

        let (x, y, z) = position;
        let origin_grid = grid.world_to_grid_space(x, y);
        let origin_global = TileGrid::grid_space_to_tile_ij(origin_grid.0, origin_grid.1);

        let finite = origin_grid.0.is_finite() && origin_grid.1.is_finite();
        if !finite || !grid.is_valid(origin_global) {
            tracing::warn!(x, y, "vision agent is outside the grid, skipping");
            return false;
        }

        // A disc wider than the grid diagonal reveals the same tiles as the diagonal
        let sight_radius_grid = sight_radius_world / grid.tile_size;
        if sight_radius_grid.is_nan() {
            tracing::warn!(sight_radius_world, "vision radius is not a number, skipping");
            return false;
        }
        let sight_radius_grid = sight_radius_grid.min(grid.diagonal_tiles());
        if local_resolution_for(sight_radius_grid) <= 0 {
            tracing::warn!(sight_radius_world, "vision window is empty, skipping");
            return false;
        }

        let origin_local = self.rebind(origin_grid, sight_radius_grid);
        self.cached_origin_global_index = grid.global_index(origin_global);

        let ctx = RayContext {
            grid,
            origin_local,
            observer_height: z as f32,
            blocking_threshold,
        };
        let radius_sq = sight_radius_grid * sight_radius_grid;
        let mut stack = Vec::with_capacity(self.local_resolution as usize * 2);

        #[cfg(debug_assertions)]
        let mut visited = vec![false; self.states.len()];

        for local in Spiral::new(self.local_resolution) {
            debug_assert!(self.is_local_valid(local));
            #[cfg(debug_assertions)]
            {
                let index = self.local_index(local);
                assert!(!visited[index], "spiral visited {:?} twice", local);
                visited[index] = true;
            }

            let global = self.local_to_global(local);
            if !grid.is_valid(global) {
                continue;
            }
            if (origin_global.distance_sq(global) as f32) > radius_sq {
                continue;
            }
            if self.state(local) == TileState::Unknown {
                trace_line_of_sight(&ctx, self, local, &mut stack);
            }
            debug_assert_ne!(self.state(local), TileState::Unknown);
        }

        #[cfg(debug_assertions)]
        assert!(visited.iter().all(|v| *v), "spiral skipped a window cell");

        self.has_cache = true;
        true
    }
}

/// Add a cached footprint's Visible tiles to the shared counters.
pub fn apply_footprint(grid: &mut TileGrid, footprint: &VisionFootprint) {
    if !footprint.has_cache() {
        return;
    }
    let tiles: Vec<TileIJ> = footprint.contributed_tiles(grid).collect();
    for ij in tiles {
        grid.increment(ij);
    }
}

/// Remove a footprint's previous contribution from the shared counters.
pub fn reset_cached_visibility(grid: &mut TileGrid, footprint: &mut VisionFootprint) {
    if !footprint.has_cache() {
        return;
    }
    let tiles: Vec<TileIJ> = footprint.contributed_tiles(grid).collect();
    for ij in tiles {
        grid.decrement(ij);
    }
    footprint.has_cache = false;
}

/// Full recompute for one agent: roll back, recompute, apply.
///
/// Agents outside the grid end up with no contribution until their next
/// recompute lands them back on it.
pub fn update_visibility(
    grid: &mut TileGrid,
    footprint: &mut VisionFootprint,
    position: (f64, f64, f64),
    sight_radius_world: f32,
    blocking_threshold: f32,
) {
    reset_cached_visibility(grid, footprint);
    if footprint.recompute(grid, position, sight_radius_world, blocking_threshold) {
        apply_footprint(grid, footprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridBounds;
    use std::collections::HashSet;

    fn flat_grid(size: f64, tile_size: f32) -> TileGrid {
        TileGrid::new(
            GridBounds::new((0.0, 0.0), (size, size)),
            tile_size,
            &|_x: f64, _y: f64| Some(0.0),
        )
        .unwrap()
    }

    fn counters(grid: &TileGrid) -> Vec<u32> {
        grid.tiles().iter().map(|t| t.visibility_counter).collect()
    }

    #[test]
    fn test_spiral_visits_each_cell_once() {
        for n in 0..12 {
            let cells: Vec<TileIJ> = Spiral::new(n).collect();
            assert_eq!(cells.len(), (n * n) as usize);
            let unique: HashSet<TileIJ> = cells.iter().copied().collect();
            assert_eq!(unique.len(), cells.len());
            assert!(cells.iter().all(|c| c.i >= 0 && c.j >= 0 && c.i < n && c.j < n));
        }
    }

    #[test]
    fn test_spiral_order() {
        let cells: Vec<TileIJ> = Spiral::new(3).collect();
        let expected = [
            (0, 0), (0, 1), (0, 2), (1, 2), (2, 2), (2, 1), (2, 0), (1, 0), (1, 1),
        ];
        let expected: Vec<TileIJ> = expected.iter().map(|&(i, j)| TileIJ::new(i, j)).collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn test_blocking_predicate() {
        assert!(is_blocking_vision(0.0, 201.0, 200.0));
        assert!(!is_blocking_vision(0.0, 200.0, 200.0));
        assert!(!is_blocking_vision(0.0, f32::NEG_INFINITY, 0.0));
    }

    #[test]
    fn test_example_scenario() {
        let mut grid = flat_grid(1000.0, 100.0);
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (450.0, 450.0, 0.0), 250.0, 200.0);

        assert!(fp.has_cache());
        let visible = |grid: &TileGrid, i, j| grid.get(TileIJ::new(i, j)).unwrap().is_visible();
        assert!(visible(&grid, 4, 4));
        assert!(visible(&grid, 6, 4));
        assert!(visible(&grid, 4, 2));
        assert!(!visible(&grid, 7, 4));
        assert!(!visible(&grid, 6, 6));
        assert!(grid.is_world_location_visible(450.0, 450.0));
        assert!(!grid.is_world_location_visible(950.0, 950.0));
        // r = 2.5 disc on integer offsets: 21 tiles
        assert_eq!(grid.visible_tile_count(), 21);
    }

    #[test]
    fn test_flat_terrain_reveals_full_disc() {
        let mut grid = flat_grid(40.0, 1.0);
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (20.5, 20.5, 0.0), 7.3, 0.0);

        let origin = TileIJ::new(20, 20);
        let r_sq = 7.3f32 * 7.3;
        for index in 0..grid.tile_count() as i32 {
            let ij = grid.tile_ij(index);
            let inside = (origin.distance_sq(ij) as f32) <= r_sq;
            assert_eq!(grid.get(ij).unwrap().is_visible(), inside, "tile {:?}", ij);
        }
    }

    #[test]
    fn test_single_obstacle_shadow() {
        let wall = |x: f64, y: f64| {
            if (13.0..14.0).contains(&x) && (10.0..11.0).contains(&y) {
                Some(1.0)
            } else {
                Some(0.0)
            }
        };
        let mut grid =
            TileGrid::new(GridBounds::new((0.0, 0.0), (21.0, 21.0)), 1.0, &wall).unwrap();
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (10.5, 10.5, 0.0), 6.0, 0.0);

        let state = |i, j| fp.state_at_global(TileIJ::new(i, j)).unwrap();
        assert_eq!(state(11, 10), TileState::Visible);
        assert_eq!(state(12, 10), TileState::Visible);
        assert_eq!(state(13, 10), TileState::NotVisible);
        assert_eq!(state(14, 10), TileState::NotVisible);
        assert_eq!(state(15, 10), TileState::NotVisible);
        assert_eq!(state(16, 10), TileState::NotVisible);
        // Other directions are unaffected
        assert_eq!(state(5, 10), TileState::Visible);
        assert_eq!(state(10, 16), TileState::Visible);
        assert!(!grid.is_world_location_visible(15.5, 10.5));
        assert!(grid.is_world_location_visible(12.5, 10.5));
    }

    #[test]
    fn test_tall_observer_sees_over_obstacle() {
        let wall = |x: f64, _y: f64| if (13.0..14.0).contains(&x) { Some(5.0) } else { Some(0.0) };
        let mut grid =
            TileGrid::new(GridBounds::new((0.0, 0.0), (21.0, 21.0)), 1.0, &wall).unwrap();
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (10.5, 10.5, 4.0), 6.0, 2.0);
        assert!(grid.is_world_location_visible(15.5, 10.5));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let bumpy = |x: f64, y: f64| Some(((x * 0.3).sin() + (y * 0.2).cos()) * 3.0);
        let mut grid =
            TileGrid::new(GridBounds::new((0.0, 0.0), (50.0, 50.0)), 1.0, &bumpy).unwrap();
        let mut fp = VisionFootprint::new();

        update_visibility(&mut grid, &mut fp, (25.2, 24.9, 1.0), 9.0, 0.5);
        let first_counters = counters(&grid);
        let first_states = fp.states().to_vec();

        update_visibility(&mut grid, &mut fp, (25.2, 24.9, 1.0), 9.0, 0.5);
        assert_eq!(counters(&grid), first_counters);
        assert_eq!(fp.states(), &first_states[..]);
    }

    #[test]
    fn test_reset_round_trip() {
        let mut grid = flat_grid(30.0, 1.0);
        let mut a = VisionFootprint::new();
        let mut b = VisionFootprint::new();
        update_visibility(&mut grid, &mut a, (10.5, 10.5, 0.0), 5.0, 0.0);
        let before = counters(&grid);

        update_visibility(&mut grid, &mut b, (12.5, 11.5, 0.0), 4.0, 0.0);
        assert!(grid.get(TileIJ::new(11, 11)).unwrap().visibility_counter == 2);
        reset_cached_visibility(&mut grid, &mut b);

        assert_eq!(counters(&grid), before);
        assert!(!b.has_cache());
        // A second reset is a no-op
        reset_cached_visibility(&mut grid, &mut b);
        assert_eq!(counters(&grid), before);
    }

    #[test]
    fn test_outside_grid_contributes_nothing() {
        let mut grid = flat_grid(10.0, 1.0);
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (5.5, 5.5, 0.0), 2.0, 0.0);
        assert!(grid.visible_tile_count() > 0);

        update_visibility(&mut grid, &mut fp, (-3.0, 5.5, 0.0), 2.0, 0.0);
        assert!(!fp.has_cache());
        assert_eq!(grid.visible_tile_count(), 0);
    }

    #[test]
    fn test_non_finite_position_is_skipped() {
        let mut grid = flat_grid(10.0, 1.0);
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (5.5, 5.5, 0.0), 2.0, 0.0);

        update_visibility(&mut grid, &mut fp, (f64::NAN, 5.5, 0.0), 2.0, 0.0);
        assert!(!fp.has_cache());
        assert_eq!(grid.visible_tile_count(), 0);

        update_visibility(&mut grid, &mut fp, (5.5, f64::INFINITY, 0.0), 2.0, 0.0);
        assert!(!fp.has_cache());
        assert_eq!(grid.visible_tile_count(), 0);
    }

    #[test]
    fn test_huge_radius_covers_whole_grid() {
        let mut grid = flat_grid(10.0, 1.0);
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (5.5, 5.5, 0.0), 25_000.0, 0.0);

        assert!(fp.has_cache());
        assert_eq!(grid.visible_tile_count(), 100);
        // Window is bounded by the grid diagonal, not the requested radius
        assert!(fp.local_resolution <= local_resolution_for(grid.diagonal_tiles()));

        update_visibility(&mut grid, &mut fp, (0.5, 9.5, 0.0), f32::INFINITY, 0.0);
        assert_eq!(grid.visible_tile_count(), 100);
        assert!(grid.tiles().iter().all(|t| t.visibility_counter == 1));

        reset_cached_visibility(&mut grid, &mut fp);
        assert_eq!(grid.visible_tile_count(), 0);
    }

    #[test]
    fn test_nan_radius_is_skipped() {
        let mut grid = flat_grid(10.0, 1.0);
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (5.5, 5.5, 0.0), f32::NAN, 0.0);
        assert!(!fp.has_cache());
        assert_eq!(grid.visible_tile_count(), 0);
    }

    fn single_bump(bump: TileIJ) -> TileGrid {
        let heights = move |x: f64, y: f64| {
            if x.floor() as i32 == bump.i && y.floor() as i32 == bump.j {
                Some(1.0)
            } else {
                Some(0.0)
            }
        };
        TileGrid::new(GridBounds::new((0.0, 0.0), (21.0, 21.0)), 1.0, &heights).unwrap()
    }

    #[test]
    fn test_diagonal_ray_steps_along_j_on_ties() {
        // (12,12) walks (12,11), (11,11), (11,10) on its way to (10,10)
        let mut grid = single_bump(TileIJ::new(11, 10));
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (10.5, 10.5, 0.0), 3.0, 0.0);

        let state = |i, j| fp.state_at_global(TileIJ::new(i, j)).unwrap();
        assert_eq!(state(12, 12), TileState::NotVisible);
        assert_eq!(state(11, 11), TileState::Visible);
        assert_eq!(state(11, 10), TileState::NotVisible);
    }

    #[test]
    fn test_diagonal_ray_misses_mirrored_blocker() {
        let mut grid = single_bump(TileIJ::new(10, 11));
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (10.5, 10.5, 0.0), 3.0, 0.0);

        assert_eq!(fp.state_at_global(TileIJ::new(12, 12)), Some(TileState::Visible));
        assert!(grid.is_world_location_visible(12.5, 12.5));
    }

    #[test]
    fn test_negative_radius_is_skipped() {
        let mut grid = flat_grid(10.0, 1.0);
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (5.5, 5.5, 0.0), -4.0, 0.0);
        assert!(!fp.has_cache());
        assert_eq!(grid.visible_tile_count(), 0);
    }

    #[test]
    fn test_window_clipped_at_grid_edge() {
        let mut grid = flat_grid(10.0, 1.0);
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (0.5, 0.5, 0.0), 3.0, 0.0);
        // Quarter disc of radius 3 on integer offsets: 11 tiles
        assert_eq!(grid.visible_tile_count(), 11);
        reset_cached_visibility(&mut grid, &mut fp);
        assert_eq!(grid.visible_tile_count(), 0);
    }

    #[test]
    fn test_unknown_ground_never_blocks() {
        let void = |x: f64, _y: f64| if x < 5.0 { Some(0.0) } else { None };
        let mut grid = TileGrid::new(GridBounds::new((0.0, 0.0), (10.0, 10.0)), 1.0, &void)
            .unwrap();
        let mut fp = VisionFootprint::new();
        update_visibility(&mut grid, &mut fp, (7.5, 5.5, -100.0), 2.0, 0.0);
        assert!(grid.is_world_location_visible(9.5, 5.5));
        assert!(grid.is_world_location_visible(7.5, 3.5));
    }
}
