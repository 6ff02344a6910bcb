//! Gradient shading derived from a DHM elevation layer.
//!
//! A read-only view over its source: georeferencing and extent delegate
//! straight to the DHM, only `get_region` is different. Each output pixel is
//! colored from the smooth Bezier gradient of the surrounding 3x3 elevation
//! samples: hue encodes the downhill direction, saturation the steepness,
//! and the value channel brightens with elevation.

use std::sync::Arc;

use crate::core::coords::{LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDeltaInt};
use crate::layers::base::{get_region_checked, DrawableType, GeoDrawable, PixelFormat};
use crate::terrain::{meters_per_pixel, region_gradients};
use crate::tiles::pixelbuf::{rgba, PixelBuf};
use crate::Result;

/// Token prefix for persisting a gradient layer's filename.
pub const GRADIENT_FNAME_PREFIX: &str = "gradient_map:";

pub struct GradientMap {
    source: Arc<dyn GeoDrawable>,
}

impl GradientMap {
    pub fn new(source: Arc<dyn GeoDrawable>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn GeoDrawable> {
        &self.source
    }
}

/// HSV to packed RGBA; h in degrees, s and v in [0, 1].
pub(crate) fn hsv_color(h: f64, s: f64, v: f64, a: u8) -> u32 {
    let h = h.rem_euclid(360.0) / 60.0;
    let i = h.floor() as u32 % 6;
    let f = h - h.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    let (r, g, b) = match i {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    rgba(
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
        a,
    )
}

fn shade(elevation: f64, grad_x: f64, grad_y: f64) -> u32 {
    let steepness = (grad_x * grad_x + grad_y * grad_y).sqrt().atan().to_degrees();
    let mut aspect = (-grad_x).atan2(grad_y).to_degrees();
    if aspect < 0.0 {
        aspect += 360.0;
    }
    let saturation = (steepness / 60.0).clamp(0.0, 1.0);
    let value = 0.6 + 0.4 * (elevation / 3000.0).clamp(0.0, 1.0);
    hsv_color(aspect, saturation, value, 255)
}

impl GeoDrawable for GradientMap {
    fn width(&self) -> u32 {
        self.source.width()
    }

    fn height(&self) -> u32 {
        self.source.height()
    }

    fn drawable_type(&self) -> DrawableType {
        DrawableType::Gradient
    }

    fn title(&self) -> String {
        format!("Gradient of {}", self.source.title())
    }

    fn description(&self) -> String {
        format!("Gradient shading derived from {}", self.source.fname())
    }

    fn fname(&self) -> String {
        format!("{}{}", GRADIENT_FNAME_PREFIX, self.source.fname())
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
        // Undefined ground resolution means the slope has no physical
        // meaning here; skip the region instead of guessing.
        let Some(mpp) = meters_per_pixel(self.source.as_ref(), center) else {
            return Ok(out);
        };
        let padded = get_region_checked(
            self.source.as_ref(),
            topleft - MapPixelDeltaInt::new(1, 1),
            size + MapPixelDeltaInt::new(2, 2),
        );
        region_gradients(&padded, mpp, |x, y, elevation, grad_x, grad_y| {
            out.set(x, y, shade(elevation, grad_x, grad_y));
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
    use crate::tiles::pixelbuf::alpha;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_color(0.0, 1.0, 1.0, 255), rgba(255, 0, 0, 255));
        assert_eq!(hsv_color(120.0, 1.0, 1.0, 255), rgba(0, 255, 0, 255));
        assert_eq!(hsv_color(240.0, 1.0, 1.0, 255), rgba(0, 0, 255, 255));
        assert_eq!(hsv_color(0.0, 0.0, 1.0, 255), rgba(255, 255, 255, 255));
    }

    #[test]
    fn test_flat_terrain_shades_gray() {
        // Zero gradient => zero saturation => r == g == b.
        let pixel = shade(1500.0, 0.0, 0.0);
        let [r, g, b, a] = pixel.to_le_bytes();
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_higher_terrain_is_brighter() {
        let low = shade(0.0, 0.0, 0.0).to_le_bytes()[0];
        let high = shade(3000.0, 0.0, 0.0).to_le_bytes()[0];
        assert!(high > low);
    }

    #[test]
    fn test_region_size_matches_request() {
        use crate::layers::geotiff::{testutil::simple_georef, TiffMap};
        let georef = simple_georef(LatLon::new(47.0, 11.0), 0.001);
        let dhm: Arc<dyn GeoDrawable> = Arc::new(TiffMap::from_elevation(
            "dhm.tif",
            16,
            16,
            vec![100i16; 256],
            georef,
        ));
        let gradient = GradientMap::new(dhm);
        let buf = gradient
            .get_region(MapPixelCoordInt::new(2, 2), MapPixelDeltaInt::new(8, 8))
            .unwrap();
        assert_eq!(buf.width(), 8);
        assert_eq!(buf.height(), 8);
        // Flat DHM: every pixel opaque and gray.
        assert!(buf.data().iter().all(|&p| alpha(p) == 255));
    }
}
