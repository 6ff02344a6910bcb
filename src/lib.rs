//! # terraview
//!
//! A tiled display pipeline for large georeferenced raster maps.
//!
//! Given a viewport (center, zoom, display size) and a stack of heterogeneous
//! map layers, this library decides which tiles or regions are needed,
//! computes their on-screen placement across several coordinate spaces,
//! resolves pixel data on background workers with a generation-based promise
//! cache, and emits an ordered list of display orders for a renderer.

pub mod background;
pub mod core;
pub mod layers;
pub mod rendering;
pub mod terrain;
pub mod tiles;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    coords::{
        BaseMapCoord, BaseMapDelta, DisplayCoord, DisplayCoordCentered, DisplayDelta, LatLon,
        LatLonDelta, MapPixelCoord, MapPixelCoordInt, MapPixelDelta, MapPixelDeltaInt,
    },
    viewmodel::{MapViewModel, OverlaySpec, ViewState},
};

pub use layers::{
    base::{get_region_checked, load_map, map_to_map, DrawableType, GeoDrawable, PixelFormat},
    composite::CompositeMap,
    geotiff::TiffMap,
    gradient::GradientMap,
    gridlines::Gridlines,
    steepness::SteepnessMap,
    track::GpsTrack,
};

pub use rendering::{
    export::render_view_to_buffer,
    orders::{DisplayOrder, MapView, RepaintCallback},
    texture::TextureCache,
    Renderer,
};

pub use tiles::{code::TileCode, pixelbuf::PixelBuf, promise::PixelPromise};

pub use terrain::{calc_terrain_info, meters_per_pixel, TerrainInfo};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("georeference error: {0}")]
    Georeference(String),

    #[error("layer error: {0}")]
    Layer(String),

    #[error("parse error: {0}")]
    ParseError(String),
}

/// Error type alias for convenience
pub type Error = MapError;
