//! Fog of War - Visibility Core
//!
//! Incremental grid visibility for many moving agents over static terrain.
//! Each agent reveals the tiles in its sight radius that terrain does not
//! occlude; every tile keeps a counter of the agents currently revealing it.
//! Uses `bevy_ecs` for agents and the per-step vision and minimap passes.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod footprint;
pub mod gate;
pub mod grid;
pub mod occupancy;
pub mod systems;
pub mod terrain;
pub mod traversal;
pub mod world;

pub use api::FogWorld;
pub use components::*;
pub use config::{FogConfig, VisionAgentConfig};
pub use error::FogError;
pub use footprint::{TileState, VisionFootprint};
pub use gate::needs_recompute;
pub use grid::{GridBounds, HeightProvider, Tile, TileGrid, TileIJ};
pub use occupancy::{Color, OccupancyCell, OccupancyGrid, OccupancySnapshot};
pub use systems::*;
pub use terrain::HeightField;
pub use traversal::{apply_footprint, reset_cached_visibility, update_visibility, Spiral};
pub use world::{AgentSnapshot, FogSnapshot};
