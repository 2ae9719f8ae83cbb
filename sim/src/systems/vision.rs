//! Vision pass - recomputes footprints of agents that crossed a tile.
//!
//! ## Phases
//!
//! 1. **Gather** - O(n) gate checks, then one recompute per gated agent.
//!    Recomputing only reads tile heights, so agents are independent here.
//! 2. **Apply** - sequential. For each new footprint, roll back the agent's
//!    previous contribution and add the new one.
//!
//! Counters are only written in the apply phase by a single writer, so no
//! agent ever observes another agent's half-applied update.
//!
//! ## Parallel Feature
//!
//! When compiled with `--features parallel`, the gather phase runs the
//! recomputes on rayon's thread pool.

use crate::components::*;
use crate::config::FogConfig;
use crate::footprint::VisionFootprint;
use crate::gate::needs_recompute;
use crate::grid::{TileGrid, TileIJ};
use crate::traversal::{apply_footprint, reset_cached_visibility};
use bevy_ecs::prelude::*;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Footprints computed in the gather phase, waiting to be applied.
#[derive(Resource, Default)]
pub struct PendingFootprints(pub Vec<ComputedFootprint>);

/// A freshly computed footprint for one agent.
pub struct ComputedFootprint {
    pub entity: Entity,
    pub tile: TileIJ,
    pub footprint: VisionFootprint,
}

/// Counters describing the most recent vision pass.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct VisionStats {
    /// Agents recomputed in the last pass.
    pub last_pass_recomputes: usize,
    /// Agents recomputed since initialization.
    pub total_recomputes: u64,
}

/// Snapshot of the agent data the gather phase needs.
struct VisionJob {
    entity: Entity,
    tile: TileIJ,
    position: (f64, f64, f64),
    sight_radius: f32,
}

fn compute_job(job: &VisionJob, grid: &TileGrid, blocking_threshold: f32) -> ComputedFootprint {
    let mut footprint = VisionFootprint::new();
    footprint.recompute(grid, job.position, job.sight_radius, blocking_threshold);
    ComputedFootprint {
        entity: job.entity,
        tile: job.tile,
        footprint,
    }
}

/// Vision gather system - computes new footprints without touching counters.
///
/// ## Data Access
/// - Reads: FogConfig, TileGrid, Position, VisionSource, VisionRecord
/// - Writes: PendingFootprints (resource only)
pub fn vision_gather_system(
    config: Res<FogConfig>,
    grid: Res<TileGrid>,
    mut pending: ResMut<PendingFootprints>,
    query: Query<(Entity, &Position, &VisionSource, &VisionRecord)>,
) {
    let grid: &TileGrid = &grid;
    let threshold = config.blocking_threshold;

    let jobs: Vec<VisionJob> = query
        .iter()
        .filter_map(|(entity, pos, source, record)| {
            let tile = grid.world_to_tile_ij(pos.x, pos.y);
            if config.ignore_cache || needs_recompute(record.last_tile, tile) {
                Some(VisionJob {
                    entity,
                    tile,
                    position: pos.as_tuple(),
                    sight_radius: source.sight_radius,
                })
            } else {
                None
            }
        })
        .collect();

    #[cfg(feature = "parallel")]
    {
        pending.0 = jobs
            .par_iter()
            .map(|job| compute_job(job, grid, threshold))
            .collect();
    }

    #[cfg(not(feature = "parallel"))]
    {
        pending.0 = jobs
            .iter()
            .map(|job| compute_job(job, grid, threshold))
            .collect();
    }
}

/// Vision apply system - swaps computed footprints into agent records.
///
/// ## Data Access
/// - Reads: PendingFootprints
/// - Writes: TileGrid counters, VisionRecord, VisionStats
///
/// Must run after `vision_gather_system`, sequentially.
pub fn vision_apply_system(
    mut grid: ResMut<TileGrid>,
    mut pending: ResMut<PendingFootprints>,
    mut stats: ResMut<VisionStats>,
    mut query: Query<(&AgentId, &mut VisionRecord)>,
) {
    let count = pending.0.len();

    for computed in pending.0.drain(..) {
        // Agent despawned between phases
        let Ok((id, mut record)) = query.get_mut(computed.entity) else {
            continue;
        };
        reset_cached_visibility(&mut grid, &mut record.footprint);
        apply_footprint(&mut grid, &computed.footprint);
        tracing::trace!(
            agent = id.0,
            tile_i = computed.tile.i,
            tile_j = computed.tile.j,
            cached = computed.footprint.has_cache(),
            "vision recomputed"
        );
        record.footprint = computed.footprint;
        record.last_tile = Some(computed.tile);
    }

    stats.last_pass_recomputes = count;
    stats.total_recomputes += count as u64;
    if count > 0 {
        tracing::debug!(recomputed = count, "vision pass applied");
    }
}
