//! Steepness classification derived from a DHM elevation layer.
//!
//! The gradient magnitude is converted to a true slope angle via the
//! ground resolution at the region and bucketed into 19 fixed 5-degree
//! bands. Gentle terrain stays transparent so the classification reads as
//! an overlay on the base map.

use std::sync::Arc;

use crate::core::coords::{LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDeltaInt};
use crate::layers::base::{get_region_checked, DrawableType, GeoDrawable, PixelFormat};
use crate::terrain::{meters_per_pixel, region_gradients};
use crate::tiles::pixelbuf::{rgba, PixelBuf};
use crate::Result;

/// Token prefix for persisting a steepness layer's filename.
pub const STEEPNESS_FNAME_PREFIX: &str = "steepness_map:";

/// Fixed classification colors, one per 5-degree band from 0 to >= 90.
/// The first bands are transparent; slopes relevant to alpine hazard
/// assessment ramp from yellow through red into violet and black.
pub const BAND_COLORS: [u32; 19] = [
    rgba(0, 0, 0, 0),         //  0- 5
    rgba(0, 0, 0, 0),         //  5-10
    rgba(0, 0, 0, 0),         // 10-15
    rgba(0, 0, 0, 0),         // 15-20
    rgba(0, 0, 0, 0),         // 20-25
    rgba(255, 255, 160, 160), // 25-30
    rgba(255, 224, 96, 176),  // 30-35
    rgba(255, 192, 32, 192),  // 35-40
    rgba(255, 128, 0, 208),   // 40-45
    rgba(255, 64, 0, 224),    // 45-50
    rgba(240, 0, 0, 240),     // 50-55
    rgba(208, 0, 48, 255),    // 55-60
    rgba(176, 0, 96, 255),    // 60-65
    rgba(144, 0, 144, 255),   // 65-70
    rgba(112, 0, 176, 255),   // 70-75
    rgba(80, 0, 160, 255),    // 75-80
    rgba(56, 0, 112, 255),    // 80-85
    rgba(32, 0, 64, 255),     // 85-90
    rgba(0, 0, 0, 255),       // >= 90
];

/// Band index for a slope angle in degrees.
pub fn steepness_band(steepness_deg: f64) -> usize {
    ((steepness_deg / 5.0).floor() as i64).clamp(0, 18) as usize
}

pub struct SteepnessMap {
    source: Arc<dyn GeoDrawable>,
}

impl SteepnessMap {
    pub fn new(source: Arc<dyn GeoDrawable>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn GeoDrawable> {
        &self.source
    }
}

impl GeoDrawable for SteepnessMap {
    fn width(&self) -> u32 {
        self.source.width()
    }

    fn height(&self) -> u32 {
        self.source.height()
    }

    fn drawable_type(&self) -> DrawableType {
        DrawableType::Steepness
    }

    fn title(&self) -> String {
        format!("Steepness of {}", self.source.title())
    }

    fn description(&self) -> String {
        format!("Slope classification derived from {}", self.source.fname())
    }

    fn fname(&self) -> String {
        format!("{}{}", STEEPNESS_FNAME_PREFIX, self.source.fname())
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba
    }

    fn supports_concurrent_get_region(&self) -> bool {
        self.source.supports_concurrent_get_region()
    }

    fn get_region(&self, topleft: MapPixelCoordInt, size: MapPixelDeltaInt) -> Result<PixelBuf> {
        let mut out = PixelBuf::new(size.x as usize, size.y as usize);
        let center = topleft + MapPixelDeltaInt::new(size.x / 2, size.y / 2);
        let Some(mpp) = meters_per_pixel(self.source.as_ref(), center) else {
            return Ok(out);
        };
        let padded = get_region_checked(
            self.source.as_ref(),
            topleft - MapPixelDeltaInt::new(1, 1),
            size + MapPixelDeltaInt::new(2, 2),
        );
        region_gradients(&padded, mpp, |x, y, _elevation, grad_x, grad_y| {
            let steepness = (grad_x * grad_x + grad_y * grad_y)
                .sqrt()
                .atan()
                .to_degrees();
            out.set(x, y, BAND_COLORS[steepness_band(steepness)]);
        });
        Ok(out)
    }

    fn pixel_to_latlon(&self, pos: MapPixelCoord) -> Option<LatLon> {
        self.source.pixel_to_latlon(pos)
    }

    fn latlon_to_pixel(&self, pos: LatLon) -> Option<MapPixelCoord> {
        self.source.latlon_to_pixel(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::geotiff::{testutil::simple_georef, TiffMap};
    use crate::tiles::pixelbuf::alpha;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(steepness_band(0.0), 0);
        assert_eq!(steepness_band(4.99), 0);
        assert_eq!(steepness_band(5.0), 1);
        assert_eq!(steepness_band(30.0), 6);
        assert_eq!(steepness_band(89.9), 17);
        assert_eq!(steepness_band(90.0), 18);
        assert_eq!(steepness_band(200.0), 18);
        assert_eq!(BAND_COLORS.len(), 19);
    }

    #[test]
    fn test_flat_dhm_classifies_transparent() {
        let georef = simple_georef(LatLon::new(47.0, 11.0), 0.001);
        let dhm: Arc<dyn GeoDrawable> = Arc::new(TiffMap::from_elevation(
            "dhm.tif",
            16,
            16,
            vec![800i16; 256],
            georef,
        ));
        let steepness = SteepnessMap::new(dhm);
        let buf = steepness
            .get_region(MapPixelCoordInt::new(2, 2), MapPixelDeltaInt::new(8, 8))
            .unwrap();
        assert!(buf.data().iter().all(|&p| alpha(p) == 0));
    }

    #[test]
    fn test_steep_dhm_classifies_opaque_bands() {
        let georef = simple_georef(LatLon::new(47.0, 11.0), 0.001);
        // ~111m per pixel at 0.001 degrees; 200m rise per pixel is over 60 degrees.
        let mut samples = Vec::with_capacity(256);
        for y in 0..16 {
            for _x in 0..16 {
                samples.push((y * 200) as i16);
            }
        }
        let dhm: Arc<dyn GeoDrawable> =
            Arc::new(TiffMap::from_elevation("dhm.tif", 16, 16, samples, georef));
        let steepness = SteepnessMap::new(dhm);
        let buf = steepness
            .get_region(MapPixelCoordInt::new(4, 4), MapPixelDeltaInt::new(4, 4))
            .unwrap();
        assert!(buf.data().iter().all(|&p| alpha(p) > 0));
    }
}
