//! Snapshot types.
//!
//! `FogSnapshot` is a serializable view of the engine state that renderers
//! and other downstream consumers read each frame.

use crate::components::*;
use crate::grid::TileGrid;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single vision agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub sight_radius: f32,
    /// Whether the agent currently contributes to the counters.
    pub contributing: bool,
    /// Number of tiles this agent currently reveals.
    pub revealed_tiles: usize,
}

/// Complete visibility snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FogSnapshot {
    /// Current engine tick.
    pub tick: u64,
    /// Elapsed time in seconds.
    pub time: f32,
    pub resolution_x: i32,
    pub resolution_y: i32,
    pub tile_size: f32,
    pub origin_x: f64,
    pub origin_y: f64,
    /// 0xFF for visible tiles, 0 otherwise, in global-index order.
    pub visible: Vec<u8>,
    pub visible_tiles: usize,
    /// All vision agents, sorted by id.
    pub agents: Vec<AgentSnapshot>,
}

impl FogSnapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut query = world.query::<(&AgentId, &Position, &VisionSource, &VisionRecord)>();
        let world: &World = world;
        let grid = world.resource::<TileGrid>();

        let mut agents = Vec::new();
        for (id, pos, source, record) in query.iter(world) {
            let revealed_tiles = if record.footprint.has_cache() {
                record.footprint.contributed_tiles(grid).count()
            } else {
                0
            };
            agents.push(AgentSnapshot {
                id: id.0,
                x: pos.x,
                y: pos.y,
                z: pos.z,
                sight_radius: source.sight_radius,
                contributing: record.footprint.has_cache(),
                revealed_tiles,
            });
        }
        agents.sort_by_key(|a| a.id);

        let mut visible = vec![0u8; grid.tile_count()];
        grid.write_visibility_bytes(&mut visible);

        Self {
            tick,
            time,
            resolution_x: grid.resolution_x,
            resolution_y: grid.resolution_y,
            tile_size: grid.tile_size,
            origin_x: grid.origin.0,
            origin_y: grid.origin.1,
            visible_tiles: grid.visible_tile_count(),
            visible,
            agents,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
