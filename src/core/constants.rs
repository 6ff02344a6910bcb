//! Engine-wide magic numbers for the tiling and display-order pipeline.
//! Keeping them in a single place makes it easier to tweak engine-wide values.

/// Square tile edge length in map pixels for tiled region fetches.
pub const TILE_SIZE: i64 = 512;

/// Zoom multiplier for one zoom step; four steps double the zoom.
pub const ZOOM_STEP: f64 = 1.189_207_115_002_721; // 2^(1/4)

/// Upper bound on the number of visible tiles after any zoom change.
/// `MapViewModel::step_zoom` keeps zooming in until the viewport needs
/// no more than this many tiles.
pub const MAX_VISIBLE_TILES: f64 = 100.0;

/// Samples taken per rectangle edge when projecting the base map's visible
/// border into an overlay's pixel grid. Projections are not affine, so the
/// four corners alone can underestimate the covered area.
pub const BORDER_WALK_SAMPLES: u32 = 16;
