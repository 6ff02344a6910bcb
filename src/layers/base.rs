//! The polymorphic capability set shared by every map layer kind.

use std::path::Path;
use std::sync::Arc;

use crate::core::coords::{LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDeltaInt};
use crate::tiles::pixelbuf::PixelBuf;
use crate::{MapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawableType {
    /// Plain georeferenced raster map.
    Map,
    /// Digital height model; pixel values carry 16-bit signed elevations.
    Dhm,
    Gradient,
    Steepness,
    Composite,
    Gridlines,
    GpsTrack,
    /// Sentinel substituted for a layer that failed to load.
    Error,
}

impl std::fmt::Display for DrawableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawableType::Map => write!(f, "map"),
            DrawableType::Dhm => write!(f, "dhm"),
            DrawableType::Gradient => write!(f, "gradient"),
            DrawableType::Steepness => write!(f, "steepness"),
            DrawableType::Composite => write!(f, "composite"),
            DrawableType::Gridlines => write!(f, "gridlines"),
            DrawableType::GpsTrack => write!(f, "gpstrack"),
            DrawableType::Error => write!(f, "error"),
        }
    }
}

/// How a layer's pixel buffers carry transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Per-pixel alpha channel.
    Rgba,
    /// Opaque RGB; the display order's uniform transparency applies.
    RgbTransparent,
}

/// Common interface over all layer kinds: real rasters, mosaics, derived
/// shadings and vector-like overlays.
///
/// Implementations are logically immutable after construction; internal
/// caches must be protected internally when
/// [`supports_concurrent_get_region`](GeoDrawable::supports_concurrent_get_region)
/// is true. Instances are shared as `Arc<dyn GeoDrawable>` so a layer
/// removed from the overlay list stays valid while in-flight loads finish.
pub trait GeoDrawable: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn size(&self) -> MapPixelDeltaInt {
        MapPixelDeltaInt::new(self.width() as i64, self.height() as i64)
    }

    fn drawable_type(&self) -> DrawableType;

    fn title(&self) -> String;

    fn description(&self) -> String;

    /// The filename (or synthetic token, for composites) this layer was
    /// loaded from. Round-trips through [`load_map`].
    fn fname(&self) -> String;

    fn pixel_format(&self) -> PixelFormat;

    /// Whether `get_region` may be called from multiple threads at once.
    fn supports_concurrent_get_region(&self) -> bool;

    /// Pixel data for a region fully inside the map extent. Callers that
    /// cannot guarantee bounds go through [`get_region_checked`].
    fn get_region(&self, topleft: MapPixelCoordInt, size: MapPixelDeltaInt) -> Result<PixelBuf>;

    /// `None` means the point has no valid geographic mapping, which is a
    /// routine condition, not an error.
    fn pixel_to_latlon(&self, pos: MapPixelCoord) -> Option<LatLon>;

    fn latlon_to_pixel(&self, pos: LatLon) -> Option<MapPixelCoord>;

    /// Whether this layer draws full frames framed to the viewport instead
    /// of fixed tiles.
    fn supports_direct_drawing(&self) -> bool {
        false
    }

    /// Renders a full output frame using the base map as georeferencing
    /// context. Only meaningful for direct-drawing layers; calling it on
    /// anything else is a contract violation.
    fn get_region_direct(
        &self,
        output_size: MapPixelDeltaInt,
        base: &dyn GeoDrawable,
        base_tl: MapPixelCoord,
        base_br: MapPixelCoord,
    ) -> Result<PixelBuf> {
        let _ = (output_size, base, base_tl, base_br);
        panic!("direct draw requested on a layer without direct-draw support");
    }
}

/// Stable identity of a shared drawable, used for tile keys, worker groups
/// and same-map fast paths.
pub fn drawable_id(map: &Arc<dyn GeoDrawable>) -> usize {
    Arc::as_ptr(map) as *const () as usize
}

/// Whether two shared handles refer to the same drawable instance.
pub fn same_drawable(a: &Arc<dyn GeoDrawable>, b: &Arc<dyn GeoDrawable>) -> bool {
    drawable_id(a) == drawable_id(b)
}

/// Converts a pixel position from one map's grid to another's. The only
/// sanctioned path between two maps is through lat/lon, so this fails
/// whenever either projection is undefined at the point. Identity when both
/// handles are the same instance.
pub fn map_to_map(
    pos: MapPixelCoord,
    from: &Arc<dyn GeoDrawable>,
    to: &Arc<dyn GeoDrawable>,
) -> Option<MapPixelCoord> {
    if same_drawable(from, to) {
        return Some(pos);
    }
    let latlon = from.pixel_to_latlon(pos)?;
    to.latlon_to_pixel(latlon)
}

/// Bounds-clamping region fetch: crops the request to the map extent,
/// delegates, and pastes the result into a zero (transparent) buffer of the
/// requested size. Out-of-bounds portions stay zero; a failed delegate read
/// degrades to a fully transparent region rather than an error.
pub fn get_region_checked(
    drawable: &dyn GeoDrawable,
    topleft: MapPixelCoordInt,
    size: MapPixelDeltaInt,
) -> PixelBuf {
    if size.x <= 0 || size.y <= 0 {
        return PixelBuf::empty();
    }
    let extent = drawable.size();
    let x0 = topleft.x.max(0);
    let y0 = topleft.y.max(0);
    let x1 = (topleft.x + size.x).min(extent.x);
    let y1 = (topleft.y + size.y).min(extent.y);

    if x0 >= x1 || y0 >= y1 {
        return PixelBuf::new(size.x as usize, size.y as usize);
    }

    let inner_tl = MapPixelCoordInt::new(x0, y0);
    let inner_size = MapPixelDeltaInt::new(x1 - x0, y1 - y0);
    let inner = match drawable.get_region(inner_tl, inner_size) {
        Ok(buf) => buf,
        Err(e) => {
            log::warn!(
                "region read failed on '{}' at ({}, {}): {}",
                drawable.fname(),
                x0,
                y0,
                e
            );
            return PixelBuf::new(size.x as usize, size.y as usize);
        }
    };

    if inner_tl == topleft && inner_size == size {
        return inner;
    }
    let mut out = PixelBuf::new(size.x as usize, size.y as usize);
    out.paste(&inner, x0 - topleft.x, y0 - topleft.y);
    out
}

/// Sentinel for a layer that failed to load: zero extent, no valid
/// geographic mapping, fully transparent regions. Keeping the failed slot
/// alive as this sentinel means the rest of the pipeline needs no special
/// casing; the layer simply never contributes tiles.
pub struct ErrorMap {
    fname: String,
}

impl ErrorMap {
    pub fn new(fname: &str) -> Self {
        Self {
            fname: fname.to_string(),
        }
    }
}

impl GeoDrawable for ErrorMap {
    fn width(&self) -> u32 {
        0
    }

    fn height(&self) -> u32 {
        0
    }

    fn drawable_type(&self) -> DrawableType {
        DrawableType::Error
    }

    fn title(&self) -> String {
        format!("Failed to load: {}", self.fname)
    }

    fn description(&self) -> String {
        self.title()
    }

    fn fname(&self) -> String {
        self.fname.clone()
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba
    }

    fn supports_concurrent_get_region(&self) -> bool {
        true
    }

    fn get_region(&self, _topleft: MapPixelCoordInt, size: MapPixelDeltaInt) -> Result<PixelBuf> {
        Ok(PixelBuf::new(size.x.max(0) as usize, size.y.max(0) as usize))
    }

    fn pixel_to_latlon(&self, _pos: MapPixelCoord) -> Option<LatLon> {
        None
    }

    fn latlon_to_pixel(&self, _pos: LatLon) -> Option<MapPixelCoord> {
        None
    }
}

/// Loads a map file, dispatching on the filename. Load failures are
/// reported once and substituted with an [`ErrorMap`] so the application
/// can continue with its other layers.
pub fn load_map(fname: &str) -> Arc<dyn GeoDrawable> {
    match try_load_map(fname) {
        Ok(map) => map,
        Err(e) => {
            log::error!("failed to load map '{}': {}", fname, e);
            Arc::new(ErrorMap::new(fname))
        }
    }
}

/// Fallible map loading; callers wanting the sentinel behavior use
/// [`load_map`] instead.
pub fn try_load_map(fname: &str) -> Result<Arc<dyn GeoDrawable>> {
    if fname.starts_with(crate::layers::composite::COMPOSITE_FNAME_PREFIX) {
        let composite = crate::layers::composite::CompositeMap::from_fname(fname)?;
        return Ok(Arc::new(composite));
    }
    if let Some(inner) = fname.strip_prefix(crate::layers::gradient::GRADIENT_FNAME_PREFIX) {
        let source = try_load_map(inner)?;
        return Ok(Arc::new(crate::layers::gradient::GradientMap::new(source)));
    }
    if let Some(inner) = fname.strip_prefix(crate::layers::steepness::STEEPNESS_FNAME_PREFIX) {
        let source = try_load_map(inner)?;
        return Ok(Arc::new(crate::layers::steepness::SteepnessMap::new(source)));
    }
    if fname == crate::layers::gridlines::GRIDLINES_FNAME {
        return Ok(Arc::new(crate::layers::gridlines::Gridlines::new()));
    }
    let extension = Path::new(fname)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("tif") | Some("tiff") => {
            let map = crate::layers::geotiff::TiffMap::open(fname)?;
            Ok(Arc::new(map))
        }
        Some("json") | Some("geojson") => {
            let track = crate::layers::track::GpsTrack::from_file(fname)?;
            Ok(Arc::new(track))
        }
        _ => Err(MapError::UnsupportedFormat(fname.to_string())),
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::FakeMap;
    use super::*;

    #[test]
    fn test_map_to_map_identity() {
        let map: Arc<dyn GeoDrawable> = Arc::new(FakeMap::new(100, 100));
        let p = MapPixelCoord::new(12.5, 30.0);
        let back = map_to_map(p, &map, &map).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_map_to_map_through_latlon() {
        let a: Arc<dyn GeoDrawable> = Arc::new(FakeMap::new(100, 100));
        let b: Arc<dyn GeoDrawable> =
            Arc::new(FakeMap::new(100, 100).at_origin(LatLon::new(47.0, 11.001)));
        // b's origin sits 10 pixels east of a's.
        let p = map_to_map(MapPixelCoord::new(10.0, 0.0), &a, &b).unwrap();
        assert!((p.x - 0.0).abs() < 1e-6);
        assert!((p.y - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_checked_region_fully_inside() {
        let map = FakeMap::new(64, 64);
        let buf = get_region_checked(
            &map,
            MapPixelCoordInt::new(8, 8),
            MapPixelDeltaInt::new(16, 16),
        );
        assert_eq!(buf.width(), 16);
        assert_eq!(buf.height(), 16);
        assert_eq!(buf.get(0, 0), map.fill);
    }

    #[test]
    fn test_checked_region_fully_outside_is_zero() {
        let map = FakeMap::new(64, 64);
        let buf = get_region_checked(
            &map,
            MapPixelCoordInt::new(200, 200),
            MapPixelDeltaInt::new(8, 8),
        );
        assert_eq!(buf.width(), 8);
        assert_eq!(buf.height(), 8);
        assert!(buf.data().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_checked_region_partial_overlap() {
        let map = FakeMap::new(64, 64);
        // 4 pixels hang off the left and top edges.
        let buf = get_region_checked(
            &map,
            MapPixelCoordInt::new(-4, -4),
            MapPixelDeltaInt::new(8, 8),
        );
        assert_eq!(buf.width(), 8);
        assert_eq!(buf.height(), 8);
        assert_eq!(buf.get(0, 0), 0);
        assert_eq!(buf.get(3, 3), 0);
        assert_eq!(buf.get(4, 4), map.fill);
        assert_eq!(buf.get(7, 7), map.fill);
    }

    #[test]
    fn test_error_map_never_contributes() {
        let map = ErrorMap::new("missing.tif");
        assert_eq!(map.width(), 0);
        assert!(map.pixel_to_latlon(MapPixelCoord::new(0.0, 0.0)).is_none());
        assert!(map.latlon_to_pixel(LatLon::new(47.0, 11.0)).is_none());
        let buf = map
            .get_region(MapPixelCoordInt::new(0, 0), MapPixelDeltaInt::new(4, 4))
            .unwrap();
        assert!(buf.data().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_load_map_substitutes_error_sentinel() {
        let map = load_map("/nonexistent/path/foo.tif");
        assert_eq!(map.drawable_type(), DrawableType::Error);
        assert_eq!(map.fname(), "/nonexistent/path/foo.tif");
    }
}
