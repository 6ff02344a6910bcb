//! Strongly-typed 2D coordinates for every space the pipeline touches.
//!
//! Each space gets its own coordinate and delta type so that mixing them is a
//! compile-time error: adding two coordinates is meaningless, adding a delta
//! to a coordinate of the same space is not. Crossing between two *maps*
//! always goes through [`LatLon`] (see `layers::base::map_to_map`) and can
//! fail, because a point may have no valid mapping in the other projection.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

/// Generates coordinate-plus-delta arithmetic for one coordinate space.
/// Coordinate ± delta yields a coordinate; coordinate - coordinate yields
/// the connecting delta.
macro_rules! impl_coord_arithmetic {
    ($coord:ty, $delta:ty) => {
        impl Add<$delta> for $coord {
            type Output = $coord;
            fn add(self, rhs: $delta) -> $coord {
                <$coord>::new(self.x + rhs.x, self.y + rhs.y)
            }
        }

        impl Sub<$delta> for $coord {
            type Output = $coord;
            fn sub(self, rhs: $delta) -> $coord {
                <$coord>::new(self.x - rhs.x, self.y - rhs.y)
            }
        }

        impl Sub for $coord {
            type Output = $delta;
            fn sub(self, rhs: $coord) -> $delta {
                <$delta>::new(self.x - rhs.x, self.y - rhs.y)
            }
        }

        impl AddAssign<$delta> for $coord {
            fn add_assign(&mut self, rhs: $delta) {
                self.x += rhs.x;
                self.y += rhs.y;
            }
        }

        impl SubAssign<$delta> for $coord {
            fn sub_assign(&mut self, rhs: $delta) {
                self.x -= rhs.x;
                self.y -= rhs.y;
            }
        }
    };
}

/// Generates delta-space arithmetic: delta ± delta and scaling by a scalar.
macro_rules! impl_delta_arithmetic {
    ($delta:ty, $scalar:ty) => {
        impl Add for $delta {
            type Output = $delta;
            fn add(self, rhs: $delta) -> $delta {
                <$delta>::new(self.x + rhs.x, self.y + rhs.y)
            }
        }

        impl Sub for $delta {
            type Output = $delta;
            fn sub(self, rhs: $delta) -> $delta {
                <$delta>::new(self.x - rhs.x, self.y - rhs.y)
            }
        }

        impl Mul<$scalar> for $delta {
            type Output = $delta;
            fn mul(self, rhs: $scalar) -> $delta {
                <$delta>::new(self.x * rhs, self.y * rhs)
            }
        }

        impl Div<$scalar> for $delta {
            type Output = $delta;
            fn div(self, rhs: $scalar) -> $delta {
                <$delta>::new(self.x / rhs, self.y / rhs)
            }
        }
    };
}

/// Absolute on-screen pixel position, origin at the top-left of the display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayCoord {
    pub x: f64,
    pub y: f64,
}

impl DisplayCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// On-screen pixel position relative to the display center. This is the
/// space display orders are expressed in; the rendering backend treats +y
/// as pointing down and flips rows on texture upload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayCoordCentered {
    pub x: f64,
    pub y: f64,
}

impl DisplayCoordCentered {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Re-centers an absolute display position around the display midpoint.
    pub fn from_display(pos: DisplayCoord, display_size: DisplayDelta) -> Self {
        Self::new(pos.x - display_size.x / 2.0, pos.y - display_size.y / 2.0)
    }

    /// Back to absolute display coordinates.
    pub fn to_display(self, display_size: DisplayDelta) -> DisplayCoord {
        DisplayCoord::new(self.x + display_size.x / 2.0, self.y + display_size.y / 2.0)
    }
}

/// Difference between two display positions (also used for display sizes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayDelta {
    pub x: f64,
    pub y: f64,
}

impl DisplayDelta {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl_coord_arithmetic!(DisplayCoord, DisplayDelta);
impl_coord_arithmetic!(DisplayCoordCentered, DisplayDelta);
impl_delta_arithmetic!(DisplayDelta, f64);

/// Pixel position within one specific map's native pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPixelCoord {
    pub x: f64,
    pub y: f64,
}

impl MapPixelCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Round to the nearest integer pixel.
    pub fn round(self) -> MapPixelCoordInt {
        MapPixelCoordInt::new(self.x.round() as i64, self.y.round() as i64)
    }
}

impl From<MapPixelCoordInt> for MapPixelCoord {
    fn from(p: MapPixelCoordInt) -> Self {
        Self::new(p.x as f64, p.y as f64)
    }
}

/// Integer pixel position within one specific map's pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapPixelCoordInt {
    pub x: i64,
    pub y: i64,
}

impl MapPixelCoordInt {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Round down to the containing multiple of `tile_size` on both axes.
    /// Uses euclidean division so negative positions floor correctly.
    pub fn tile_floor(self, tile_size: i64) -> Self {
        Self::new(
            self.x.div_euclid(tile_size) * tile_size,
            self.y.div_euclid(tile_size) * tile_size,
        )
    }
}

impl From<MapPixelCoord> for MapPixelCoordInt {
    fn from(p: MapPixelCoord) -> Self {
        p.round()
    }
}

/// Difference between two map pixel positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPixelDelta {
    pub x: f64,
    pub y: f64,
}

impl MapPixelDelta {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Integer difference between two map pixel positions (also tile sizes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapPixelDeltaInt {
    pub x: i64,
    pub y: i64,
}

impl MapPixelDeltaInt {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<MapPixelDeltaInt> for MapPixelDelta {
    fn from(d: MapPixelDeltaInt) -> Self {
        Self::new(d.x as f64, d.y as f64)
    }
}

impl_coord_arithmetic!(MapPixelCoord, MapPixelDelta);
impl_coord_arithmetic!(MapPixelCoordInt, MapPixelDeltaInt);
impl_delta_arithmetic!(MapPixelDelta, f64);
impl_delta_arithmetic!(MapPixelDeltaInt, i64);

/// Pixel position on the *current base map*. A distinct type so that a
/// coordinate from an overlay map cannot be mixed into base-map arithmetic
/// by accident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseMapCoord {
    pub x: f64,
    pub y: f64,
}

impl BaseMapCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The same position as an untagged map pixel coordinate, for calls
    /// into the base map's own `GeoDrawable` interface.
    pub fn as_map_pixel(self) -> MapPixelCoord {
        MapPixelCoord::new(self.x, self.y)
    }

    pub fn clamp(self, min: MapPixelCoord, max: MapPixelCoord) -> Self {
        Self::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }
}

impl From<MapPixelCoord> for BaseMapCoord {
    fn from(p: MapPixelCoord) -> Self {
        Self::new(p.x, p.y)
    }
}

/// Difference between two base-map positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseMapDelta {
    pub x: f64,
    pub y: f64,
}

impl BaseMapDelta {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl_coord_arithmetic!(BaseMapCoord, BaseMapDelta);
impl_delta_arithmetic!(BaseMapDelta, f64);

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether the coordinates lie within the valid geographic ranges.
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lon >= -180.0 && self.lon <= 180.0
    }
}

/// Geographic offset in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLonDelta {
    pub lat: f64,
    pub lon: f64,
}

impl LatLonDelta {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl Add<LatLonDelta> for LatLon {
    type Output = LatLon;
    fn add(self, rhs: LatLonDelta) -> LatLon {
        LatLon::new(self.lat + rhs.lat, self.lon + rhs.lon)
    }
}

impl Sub<LatLonDelta> for LatLon {
    type Output = LatLon;
    fn sub(self, rhs: LatLonDelta) -> LatLon {
        LatLon::new(self.lat - rhs.lat, self.lon - rhs.lon)
    }
}

impl Sub for LatLon {
    type Output = LatLonDelta;
    fn sub(self, rhs: LatLon) -> LatLonDelta {
        LatLonDelta::new(self.lat - rhs.lat, self.lon - rhs.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_delta_round_trip() {
        let a = MapPixelCoord::new(100.25, -31.5);
        let d = MapPixelDelta::new(17.75, 4.5);
        let there_and_back = (a + d) - d;
        assert!((there_and_back.x - a.x).abs() < 1e-12);
        assert!((there_and_back.y - a.y).abs() < 1e-12);

        let other_way = (a - d) + d;
        assert!((other_way.x - a.x).abs() < 1e-12);
        assert!((other_way.y - a.y).abs() < 1e-12);
    }

    #[test]
    fn test_delta_scale_round_trip() {
        let d = DisplayDelta::new(12.5, -3.25);
        for k in [0.5, 2.0, 3.0, 7.5] {
            let scaled = d * k / k;
            assert!((scaled.x - d.x).abs() < 1e-12);
            assert!((scaled.y - d.y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_coord_difference_is_delta() {
        let a = BaseMapCoord::new(10.0, 20.0);
        let b = BaseMapCoord::new(4.0, 26.0);
        let d = a - b;
        assert_eq!(d, BaseMapDelta::new(6.0, -6.0));
        let restored = b + d;
        assert_eq!(restored, a);
    }

    #[test]
    fn test_round_to_nearest() {
        assert_eq!(
            MapPixelCoord::new(10.4, 10.5).round(),
            MapPixelCoordInt::new(10, 11)
        );
        assert_eq!(
            MapPixelCoord::new(-0.5, -1.6).round(),
            MapPixelCoordInt::new(-1, -2)
        );
    }

    #[test]
    fn test_tile_floor() {
        assert_eq!(
            MapPixelCoordInt::new(1000, 512).tile_floor(512),
            MapPixelCoordInt::new(512, 512)
        );
        assert_eq!(
            MapPixelCoordInt::new(-1, 0).tile_floor(512),
            MapPixelCoordInt::new(-512, 0)
        );
    }

    #[test]
    fn test_centered_display_round_trip() {
        let size = DisplayDelta::new(800.0, 600.0);
        let pos = DisplayCoord::new(120.0, 450.0);
        let centered = DisplayCoordCentered::from_display(pos, size);
        assert_eq!(centered, DisplayCoordCentered::new(-280.0, 150.0));
        assert_eq!(centered.to_display(size), pos);
    }

    #[test]
    fn test_latlon_arithmetic() {
        let a = LatLon::new(47.5, 11.25);
        let d = LatLonDelta::new(0.5, -0.25);
        assert_eq!((a + d) - d, a);
        assert!(a.is_valid());
        assert!(!LatLon::new(91.0, 0.0).is_valid());
    }
}
