//! Error types for grid construction and the agent registry.

/// Largest allowed `resolution_x + resolution_y`.
///
/// Keeps squared tile distances comfortably inside `i32`.
pub const MAX_RESOLUTION_SUM: i32 = 10_000;

/// Errors surfaced by the fog of war core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FogError {
    /// Tile size was zero, negative or not a number.
    #[error("tile size must be positive and finite, got {0}")]
    InvalidTileSize(f32),

    /// Grid bounds were empty or not finite.
    #[error("grid bounds must have a positive finite extent, got {width} x {height}")]
    InvalidBounds { width: f64, height: f64 },

    /// Grid resolution too large for the squared distance arithmetic.
    #[error("grid resolution {x} x {y} exceeds the limit (x + y <= 10000)")]
    ResolutionOverflow { x: i32, y: i32 },

    /// Minimap resolution was not positive in both axes.
    #[error("minimap resolution must be positive, got {x} x {y}")]
    InvalidMinimapResolution { x: i32, y: i32 },

    /// No agent is registered under this id.
    #[error("unknown agent {0}")]
    UnknownAgent(u32),

    /// An agent with this id already exists.
    #[error("agent {0} already exists")]
    DuplicateAgent(u32),
}
