//! Terrain queries over DHM (elevation) layers.

pub mod bezier;

use crate::core::coords::{LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDelta, MapPixelDeltaInt};
use crate::layers::base::{get_region_checked, GeoDrawable};
use bezier::BezierPatch;

/// Packs a signed 16-bit elevation sample into a pixel. DHM rasters carry
/// elevations, not colors; keeping the raw sample avoids the lossy
/// grayscale truncation a color conversion would cause.
pub const fn pack_elevation(elevation: i16) -> u32 {
    elevation as u16 as u32
}

/// The elevation sample carried by a DHM pixel, in meters.
pub const fn unpack_elevation(pixel: u32) -> i16 {
    pixel as u16 as i16
}

/// Point query result combining elevation and local slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainInfo {
    pub elevation_m: f64,
    /// Compass bearing of the downhill direction, degrees in `[0, 360)`,
    /// 0 = north.
    pub slope_face_deg: f64,
    /// True slope angle in degrees.
    pub steepness_deg: f64,
}

fn haversine_m(a: LatLon, b: LatLon) -> f64 {
    use geo::prelude::HaversineDistance;
    geo::Point::new(a.lon, a.lat).haversine_distance(&geo::Point::new(b.lon, b.lat))
}

/// Ground resolution at a pixel, averaged over one-pixel steps east and
/// south. `None` when the map's projection is undefined at the point.
pub fn meters_per_pixel(map: &dyn GeoDrawable, pos: MapPixelCoordInt) -> Option<f64> {
    let p = MapPixelCoord::from(pos);
    let here = map.pixel_to_latlon(p)?;
    let east = map.pixel_to_latlon(p + MapPixelDelta::new(1.0, 0.0))?;
    let south = map.pixel_to_latlon(p + MapPixelDelta::new(0.0, 1.0))?;
    Some(0.5 * (haversine_m(here, east) + haversine_m(here, south)))
}

/// Reads the 3x3 elevation neighborhood centered on `center` from a DHM.
pub fn elevation_patch(dhm: &dyn GeoDrawable, center: MapPixelCoordInt) -> BezierPatch {
    let region = get_region_checked(
        dhm,
        center - MapPixelDeltaInt::new(1, 1),
        MapPixelDeltaInt::new(3, 3),
    );
    let mut samples = [[0.0; 3]; 3];
    for (y, row) in samples.iter_mut().enumerate() {
        for (x, sample) in row.iter_mut().enumerate() {
            *sample = unpack_elevation(region.get(x, y)) as f64;
        }
    }
    BezierPatch::from_samples(samples)
}

/// Walks every interior pixel of a 1-pixel-padded DHM region and hands the
/// callback the output position, interpolated elevation and the gradient in
/// height units per meter. The derived shading layers share this loop.
pub fn region_gradients<F>(padded: &crate::tiles::pixelbuf::PixelBuf, mpp: f64, mut f: F)
where
    F: FnMut(usize, usize, f64, f64, f64),
{
    let out_w = padded.width().saturating_sub(2);
    let out_h = padded.height().saturating_sub(2);
    for y in 0..out_h {
        for x in 0..out_w {
            let mut samples = [[0.0; 3]; 3];
            for (dy, row) in samples.iter_mut().enumerate() {
                for (dx, sample) in row.iter_mut().enumerate() {
                    *sample = unpack_elevation(padded.get(x + dx, y + dy)) as f64;
                }
            }
            let patch = BezierPatch::from_samples(samples);
            let elevation = patch.value(0.5, 0.5);
            let (du, dv) = patch.derivative(0.5, 0.5);
            f(x, y, elevation, du / (2.0 * mpp), dv / (2.0 * mpp));
        }
    }
}

/// Elevation and slope at a geographic position, estimated from the
/// smooth Bezier fit of the surrounding 3x3 DHM samples. `None` when the
/// position has no valid mapping on the DHM or its ground resolution is
/// undefined there.
pub fn calc_terrain_info(dhm: &dyn GeoDrawable, pos: LatLon) -> Option<TerrainInfo> {
    let pixel = dhm.latlon_to_pixel(pos)?;
    let center = pixel.round();
    let mpp = meters_per_pixel(dhm, center)?;
    if mpp <= 0.0 {
        return None;
    }
    let patch = elevation_patch(dhm, center);

    // Patch parameters span two pixel spacings; the rounded center sits at
    // (0.5, 0.5).
    let u = 0.5 + (pixel.x - center.x as f64) / 2.0;
    let v = 0.5 + (pixel.y - center.y as f64) / 2.0;

    let elevation_m = patch.value(u, v);
    let (du, dv) = patch.derivative(u, v);
    let grad_x = du / (2.0 * mpp);
    let grad_y = dv / (2.0 * mpp);

    let steepness_deg = (grad_x * grad_x + grad_y * grad_y).sqrt().atan().to_degrees();
    let mut slope_face_deg = (-grad_x).atan2(grad_y).to_degrees();
    if slope_face_deg < 0.0 {
        slope_face_deg += 360.0;
    }

    Some(TerrainInfo {
        elevation_m,
        slope_face_deg,
        steepness_deg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::base::testutil::FakeMap;
    use crate::layers::base::{DrawableType, PixelFormat};
    use crate::tiles::pixelbuf::PixelBuf;
    use crate::Result;

    /// DHM whose elevation is a linear ramp `a*x + b*y + c`.
    struct RampDhm {
        geo: FakeMap,
        a: f64,
        b: f64,
        c: f64,
    }

    impl GeoDrawable for RampDhm {
        fn width(&self) -> u32 {
            self.geo.width
        }
        fn height(&self) -> u32 {
            self.geo.height
        }
        fn drawable_type(&self) -> DrawableType {
            DrawableType::Dhm
        }
        fn title(&self) -> String {
            "ramp".into()
        }
        fn description(&self) -> String {
            "ramp dhm".into()
        }
        fn fname(&self) -> String {
            "ramp.tif".into()
        }
        fn pixel_format(&self) -> PixelFormat {
            PixelFormat::Rgba
        }
        fn supports_concurrent_get_region(&self) -> bool {
            true
        }
        fn get_region(
            &self,
            topleft: MapPixelCoordInt,
            size: MapPixelDeltaInt,
        ) -> Result<PixelBuf> {
            let mut buf = PixelBuf::new(size.x as usize, size.y as usize);
            for y in 0..size.y {
                for x in 0..size.x {
                    let elev =
                        self.a * (topleft.x + x) as f64 + self.b * (topleft.y + y) as f64 + self.c;
                    buf.set(x as usize, y as usize, pack_elevation(elev.round() as i16));
                }
            }
            Ok(buf)
        }
        fn pixel_to_latlon(&self, pos: MapPixelCoord) -> Option<LatLon> {
            self.geo.pixel_to_latlon(pos)
        }
        fn latlon_to_pixel(&self, pos: LatLon) -> Option<MapPixelCoord> {
            self.geo.latlon_to_pixel(pos)
        }
    }

    #[test]
    fn test_elevation_pixel_round_trip() {
        for elevation in [-500i16, -1, 0, 1, 2500, 8848] {
            assert_eq!(unpack_elevation(pack_elevation(elevation)), elevation);
        }
    }

    #[test]
    fn test_meters_per_pixel_positive() {
        let map = FakeMap::new(100, 100);
        let mpp = meters_per_pixel(&map, MapPixelCoordInt::new(50, 50)).unwrap();
        // 0.0001 degrees is roughly 11m of latitude.
        assert!(mpp > 5.0 && mpp < 20.0, "unexpected resolution {}", mpp);
    }

    #[test]
    fn test_terrain_info_on_flat_ground() {
        let dhm = RampDhm {
            geo: FakeMap::new(100, 100),
            a: 0.0,
            b: 0.0,
            c: 1500.0,
        };
        let info = calc_terrain_info(&dhm, LatLon::new(46.9975, 11.0025)).unwrap();
        assert!((info.elevation_m - 1500.0).abs() < 1e-6);
        assert!(info.steepness_deg.abs() < 1e-6);
    }

    #[test]
    fn test_terrain_info_slope_faces_downhill() {
        // Elevation rises to the south => downhill faces north (0 deg).
        let dhm = RampDhm {
            geo: FakeMap::new(100, 100),
            a: 0.0,
            b: 5.0,
            c: 1000.0,
        };
        let info = calc_terrain_info(&dhm, LatLon::new(46.9975, 11.0025)).unwrap();
        assert!(info.steepness_deg > 1.0);
        assert!(info.slope_face_deg < 1.0 || info.slope_face_deg > 359.0);
    }
}
