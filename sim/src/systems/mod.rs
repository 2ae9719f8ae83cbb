//! ECS systems for the fog of war engine.
//!
//! ## Schedule Order
//!
//! One `FogWorld::step` runs the chain below once:
//!
//! 1. `vision_gather_system` - gate checks and footprint recomputes.
//!    Reads tile heights only; parallel under the `parallel` feature.
//! 2. `vision_apply_system` - rolls back old footprints and applies new ones.
//!    Sole writer of the visibility counters.
//! 3. `minimap_update_system` - moves units between occupancy cells.

pub mod minimap;
pub mod vision;

pub use minimap::*;
pub use vision::*;
