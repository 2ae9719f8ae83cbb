//! Minimap occupancy system.
//!
//! Keeps the coarse occupancy grid in sync with agent positions. A unit is
//! only moved between cells when it actually changes cell.

use crate::components::*;
use crate::gate::needs_recompute;
use crate::occupancy::OccupancyGrid;
use bevy_ecs::prelude::*;

/// Minimap update system - counts each iconed agent in its occupancy cell.
///
/// ## Data Access
/// - Reads: Position, MinimapIcon, VisionSource (optional)
/// - Writes: OccupancyGrid, MinimapCell
pub fn minimap_update_system(
    mut occupancy: ResMut<OccupancyGrid>,
    mut query: Query<(&Position, &MinimapIcon, Option<&VisionSource>, &mut MinimapCell)>,
) {
    for (pos, icon, source, mut cell) in query.iter_mut() {
        let current = occupancy.world_to_cell(pos.x, pos.y);
        let sight_radius = source.map(|s| s.sight_radius).unwrap_or(0.0);

        if !needs_recompute(cell.last_cell, current) {
            continue;
        }
        match cell.last_cell {
            None => occupancy.add(current, icon.color, sight_radius, icon.icon_size),
            Some(previous) => {
                occupancy.move_unit(previous, current, icon.color, sight_radius, icon.icon_size);
            }
        }
        cell.last_cell = Some(current);
    }
}
