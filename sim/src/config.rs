//! Engine and agent configuration.

use crate::components::MinimapIcon;
use crate::grid::GridBounds;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the fog of war engine.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FogConfig {
    /// World region covered by the tile grid.
    pub bounds: GridBounds,
    /// Edge length of one tile in world units.
    pub tile_size: f32,
    /// Terrain must rise more than this above the observer's eye to block sight.
    pub blocking_threshold: f32,
    /// Occupancy grid resolution (cells per axis).
    pub minimap_resolution: (i32, i32),
    /// Recompute every agent on every step, ignoring the movement gate.
    /// For stress testing only.
    pub ignore_cache: bool,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            bounds: GridBounds::default(),
            tile_size: 100.0,
            blocking_threshold: 200.0,
            minimap_resolution: (64, 64),
            ignore_cache: false,
        }
    }
}

impl FogConfig {
    /// Whether switching to `other` changes the shape of either grid.
    pub fn requires_rebuild(&self, other: &FogConfig) -> bool {
        self.bounds != other.bounds
            || self.tile_size != other.tile_size
            || self.minimap_resolution != other.minimap_resolution
    }
}

/// Per-agent configuration supplied at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionAgentConfig {
    /// Sight radius in world units.
    pub sight_radius: f32,
    /// Minimap representation, if the agent should be counted there.
    pub minimap: Option<MinimapIcon>,
}

impl Default for VisionAgentConfig {
    fn default() -> Self {
        Self {
            sight_radius: 1024.0,
            minimap: Some(MinimapIcon::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_rebuild() {
        let base = FogConfig::default();
        let threshold_only = FogConfig {
            blocking_threshold: 50.0,
            ignore_cache: true,
            ..base.clone()
        };
        assert!(!base.requires_rebuild(&threshold_only));

        let finer = FogConfig {
            tile_size: 50.0,
            ..base.clone()
        };
        assert!(base.requires_rebuild(&finer));
    }

    #[test]
    fn test_config_serde() {
        let config = FogConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: FogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
