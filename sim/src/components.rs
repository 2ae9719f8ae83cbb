//! ECS components for vision agents.
//!
//! Each agent is one entity. Its footprint and last computed tile live in the
//! `VisionRecord` component, so the record is owned by exactly one agent.

use crate::footprint::VisionFootprint;
use crate::grid::TileIJ;
use crate::occupancy::Color;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World position. `z` is the observer's eye height.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }
}

impl From<(f64, f64, f64)> for Position {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Host-assigned agent identifier.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

// ============================================================================
// VISION COMPONENTS
// ============================================================================

/// Vision parameters of an agent.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VisionSource {
    /// Sight radius in world units.
    pub sight_radius: f32,
}

/// Last computed footprint and the tile it was computed from.
#[derive(Component, Debug, Clone, Default)]
pub struct VisionRecord {
    /// `None` until the first recompute, and after a forced refresh.
    pub last_tile: Option<TileIJ>,
    pub footprint: VisionFootprint,
}

impl VisionRecord {
    /// Make the next vision pass recompute this agent regardless of movement.
    pub fn force_recompute(&mut self) {
        self.last_tile = None;
    }
}

// ============================================================================
// MINIMAP COMPONENTS
// ============================================================================

/// Minimap icon parameters.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimapIcon {
    pub color: Color,
    /// Icon radius in minimap pixels.
    pub icon_size: f32,
}

impl Default for MinimapIcon {
    fn default() -> Self {
        Self {
            color: Color::GREEN,
            icon_size: 0.5,
        }
    }
}

/// Occupancy cell this agent is currently counted in.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MinimapCell {
    pub last_cell: Option<TileIJ>,
}

// ============================================================================
// BUNDLES
// ============================================================================

/// Bundle for spawning a vision agent.
#[derive(Bundle)]
pub struct VisionAgentBundle {
    pub id: AgentId,
    pub position: Position,
    pub source: VisionSource,
    pub record: VisionRecord,
}

impl VisionAgentBundle {
    pub fn new(id: u32, position: Position, sight_radius: f32) -> Self {
        Self {
            id: AgentId(id),
            position,
            source: VisionSource { sight_radius },
            record: VisionRecord::default(),
        }
    }
}

/// Bundle added to agents that appear on the minimap.
#[derive(Bundle, Default)]
pub struct MinimapBundle {
    pub icon: MinimapIcon,
    pub cell: MinimapCell,
}
