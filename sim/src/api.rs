//! Public API for the fog of war engine.
//!
//! `FogWorld` is the engine context a host owns. It holds the ECS world with
//! the tile grid, the occupancy grid and one entity per vision agent, and
//! provides a clean API for:
//! - Initializing and reconfiguring the grids
//! - Registering, moving and removing agents
//! - Stepping the vision and minimap passes
//! - Reading visibility and extracting snapshots
//!
//! ## Stepping
//!
//! Every `step(dt)` runs exactly one vision pass followed by one minimap pass.
//! Agents that stayed inside their tile since the last pass are skipped, so
//! a step over a mostly idle world costs one tile lookup per agent.

use crate::components::*;
use crate::config::{FogConfig, VisionAgentConfig};
use crate::error::FogError;
use crate::footprint::VisionFootprint;
use crate::grid::{HeightProvider, TileGrid};
use crate::occupancy::{OccupancyGrid, OccupancySnapshot};
use crate::systems::*;
use crate::traversal::reset_cached_visibility;
use crate::world::FogSnapshot;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Height source kept for rebuilding the tile grid on reconfiguration.
type BoxedHeights = Box<dyn HeightProvider + Send + Sync>;

/// The engine context.
pub struct FogWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    /// Host agent ids to their entities.
    agents: HashMap<u32, Entity>,
    heights: BoxedHeights,
}

impl FogWorld {
    /// Build the grids for `config`, sampling terrain from `heights`.
    pub fn initialize(
        config: FogConfig,
        heights: impl HeightProvider + Send + Sync + 'static,
    ) -> Result<Self, FogError> {
        let heights: BoxedHeights = Box::new(heights);
        let (grid, occupancy) = build_grids(&config, heights.as_ref())?;

        tracing::info!(
            resolution_x = grid.resolution_x,
            resolution_y = grid.resolution_y,
            tile_size = grid.tile_size,
            minimap_x = occupancy.resolution_x,
            minimap_y = occupancy.resolution_y,
            "fog of war initialized"
        );

        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(grid);
        world.insert_resource(occupancy);
        world.insert_resource(PendingFootprints::default());
        world.insert_resource(VisionStats::default());

        // Apply is the only counter writer and must see every gathered footprint
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                vision_gather_system,
                vision_apply_system,
                minimap_update_system,
            )
                .chain(),
        );

        Ok(Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            agents: HashMap::new(),
            heights,
        })
    }

    /// Register a vision agent. It is picked up by the next `step`.
    pub fn spawn_agent(
        &mut self,
        id: u32,
        position: Position,
        config: VisionAgentConfig,
    ) -> Result<(), FogError> {
        if self.agents.contains_key(&id) {
            return Err(FogError::DuplicateAgent(id));
        }

        let mut entity = self
            .world
            .spawn(VisionAgentBundle::new(id, position, config.sight_radius));
        if let Some(icon) = config.minimap {
            entity.insert(MinimapBundle {
                icon,
                cell: MinimapCell::default(),
            });
        }
        let entity = entity.id();
        self.agents.insert(id, entity);
        tracing::debug!(agent = id, sight_radius = config.sight_radius, "agent spawned");
        Ok(())
    }

    /// Report an agent's new world position (z is eye height).
    pub fn set_agent_position(&mut self, id: u32, x: f64, y: f64, z: f64) -> Result<(), FogError> {
        let entity = self.entity(id)?;
        if let Some(mut pos) = self.world.get_mut::<Position>(entity) {
            *pos = Position::new(x, y, z);
        }
        Ok(())
    }

    /// Change an agent's sight radius. Takes effect on the next `step`.
    ///
    /// The agent is also uncounted from its minimap cell so the next pass
    /// re-adds it with the new radius.
    pub fn set_sight_radius(&mut self, id: u32, sight_radius: f32) -> Result<(), FogError> {
        let entity = self.entity(id)?;
        let mut agent = self.world.entity_mut(entity);
        if let Some(mut source) = agent.get_mut::<VisionSource>() {
            source.sight_radius = sight_radius;
        }
        if let Some(mut record) = agent.get_mut::<VisionRecord>() {
            record.force_recompute();
        }
        let stale_cell = agent
            .get_mut::<MinimapCell>()
            .and_then(|mut cell| cell.last_cell.take());

        if let Some(cell) = stale_cell {
            self.world.resource_mut::<OccupancyGrid>().remove(cell);
        }
        Ok(())
    }

    /// Remove an agent, rolling back its visibility and minimap contribution.
    pub fn remove_agent(&mut self, id: u32) -> Result<(), FogError> {
        let entity = self.agents.remove(&id).ok_or(FogError::UnknownAgent(id))?;

        let mut agent = self.world.entity_mut(entity);
        let record = agent.take::<VisionRecord>();
        let last_cell = agent.get::<MinimapCell>().and_then(|c| c.last_cell);
        agent.despawn();

        if let Some(mut record) = record {
            let mut grid = self.world.resource_mut::<TileGrid>();
            reset_cached_visibility(&mut grid, &mut record.footprint);
        }
        if let Some(cell) = last_cell {
            self.world.resource_mut::<OccupancyGrid>().remove(cell);
        }
        tracing::debug!(agent = id, "agent removed");
        Ok(())
    }

    /// Run one vision pass and one minimap pass.
    pub fn step(&mut self, dt: f32) {
        self.schedule.run(&mut self.world);
        self.tick += 1;
        self.time += dt;
    }

    /// Switch to a new configuration.
    ///
    /// Grids are rebuilt when their shape changes; every agent is recomputed
    /// on the next `step` either way. An invalid configuration leaves the
    /// engine untouched.
    pub fn reconfigure(&mut self, config: FogConfig) -> Result<(), FogError> {
        let current = self.world.resource::<FogConfig>().clone();

        if current.requires_rebuild(&config) {
            let (grid, occupancy) = build_grids(&config, self.heights.as_ref())?;
            tracing::info!(
                resolution_x = grid.resolution_x,
                resolution_y = grid.resolution_y,
                tile_size = grid.tile_size,
                minimap_x = occupancy.resolution_x,
                minimap_y = occupancy.resolution_y,
                "fog of war grids rebuilt"
            );

            // Old contributions die with the old grid
            let mut query = self.world.query::<(&mut VisionRecord, Option<&mut MinimapCell>)>();
            for (mut record, cell) in query.iter_mut(&mut self.world) {
                record.footprint = VisionFootprint::new();
                record.force_recompute();
                if let Some(mut cell) = cell {
                    cell.last_cell = None;
                }
            }
            self.world.insert_resource(grid);
            self.world.insert_resource(occupancy);
        } else {
            tracing::info!(
                blocking_threshold = config.blocking_threshold,
                ignore_cache = config.ignore_cache,
                "fog of war reconfigured"
            );
            let mut query = self.world.query::<&mut VisionRecord>();
            for mut record in query.iter_mut(&mut self.world) {
                record.force_recompute();
            }
        }

        self.world.insert_resource(config);
        Ok(())
    }

    /// Whether the tile containing a world point is revealed by any agent.
    pub fn is_world_location_visible(&self, x: f64, y: f64) -> bool {
        self.grid().is_world_location_visible(x, y)
    }

    /// Per-tile visibility in global-index order.
    pub fn visibility_buffer(&self) -> Vec<bool> {
        self.grid().visibility_buffer()
    }

    /// Write 0xFF/0 visibility bytes into a caller-owned buffer.
    pub fn write_visibility_bytes(&self, buffer: &mut [u8]) {
        self.grid().write_visibility_bytes(buffer);
    }

    /// Get a snapshot of the current visibility state.
    pub fn snapshot(&mut self) -> FogSnapshot {
        FogSnapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    pub fn occupancy_snapshot(&self) -> OccupancySnapshot {
        self.occupancy().snapshot()
    }

    /// Get the tile grid reference.
    pub fn grid(&self) -> &TileGrid {
        self.world.resource::<TileGrid>()
    }

    /// Get the occupancy grid reference.
    pub fn occupancy(&self) -> &OccupancyGrid {
        self.world.resource::<OccupancyGrid>()
    }

    pub fn config(&self) -> &FogConfig {
        self.world.resource::<FogConfig>()
    }

    /// Statistics of the most recent vision pass.
    pub fn vision_stats(&self) -> VisionStats {
        *self.world.resource::<VisionStats>()
    }

    /// Last computed footprint of an agent.
    pub fn agent_footprint(&self, id: u32) -> Option<&VisionFootprint> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<VisionRecord>(entity).map(|r| &r.footprint)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    fn entity(&self, id: u32) -> Result<Entity, FogError> {
        self.agents.get(&id).copied().ok_or(FogError::UnknownAgent(id))
    }
}

fn build_grids(
    config: &FogConfig,
    heights: &(dyn HeightProvider + Send + Sync),
) -> Result<(TileGrid, OccupancyGrid), FogError> {
    // Cheap checks first so a bad minimap resolution never pays for sampling
    let occupancy = OccupancyGrid::new(config.bounds, config.minimap_resolution)?;
    let grid = TileGrid::new(config.bounds, config.tile_size, heights)?;
    Ok((grid, occupancy))
}
