//! Movement gate - recompute only on tile crossings.
//!
//! Footprints depend on the origin tile, not the exact position inside it, so
//! an agent that moves within a tile keeps its cached contribution. The same
//! predicate gates minimap cell moves against the coarser occupancy grid.

use crate::grid::TileIJ;

/// Whether an agent last seen at `previous` must recompute at `current`.
///
/// `None` means nothing has been computed yet (fresh spawn or a forced
/// refresh after reconfiguration).
#[inline]
pub fn needs_recompute(previous: Option<TileIJ>, current: TileIJ) -> bool {
    previous != Some(current)
}
