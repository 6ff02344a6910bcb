//! Coordinate gridlines, drawn directly into the viewport frame.

use crate::core::coords::{LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDeltaInt};
use crate::layers::base::{DrawableType, GeoDrawable, PixelFormat};
use crate::tiles::pixelbuf::{rgba, PixelBuf};
use crate::Result;

/// Token identifying a gridlines overlay in persisted view state.
pub const GRIDLINES_FNAME: &str = "gridlines";

const LINE_COLOR: u32 = rgba(32, 32, 32, 192);

/// Candidate spacings in degrees, coarse to fine (down to 1 minute).
const SPACINGS: [f64; 11] = [
    45.0,
    20.0,
    10.0,
    5.0,
    2.0,
    1.0,
    0.5,
    0.25,
    1.0 / 6.0,
    1.0 / 12.0,
    1.0 / 60.0,
];

/// Points sampled along each gridline; projections bend lines, straight
/// two-point segments would not.
const LINE_SAMPLES: u32 = 64;

#[derive(Default)]
pub struct Gridlines;

impl Gridlines {
    pub fn new() -> Self {
        Self
    }
}

/// Largest spacing that still yields a handful of lines across `span`.
fn pick_spacing(span: f64) -> f64 {
    for &spacing in &SPACINGS {
        if span / spacing >= 3.0 {
            return spacing;
        }
    }
    SPACINGS[SPACINGS.len() - 1]
}

fn draw_polyline(buf: &mut PixelBuf, points: &[Option<(i64, i64)>]) {
    for pair in points.windows(2) {
        if let (Some(a), Some(b)) = (pair[0], pair[1]) {
            buf.draw_line(a.0, a.1, b.0, b.1, LINE_COLOR);
        }
    }
}

impl GeoDrawable for Gridlines {
    fn width(&self) -> u32 {
        0
    }

    fn height(&self) -> u32 {
        0
    }

    fn drawable_type(&self) -> DrawableType {
        DrawableType::Gridlines
    }

    fn title(&self) -> String {
        "Coordinate grid".to_string()
    }

    fn description(&self) -> String {
        "Latitude/longitude gridlines".to_string()
    }

    fn fname(&self) -> String {
        GRIDLINES_FNAME.to_string()
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba
    }

    fn supports_concurrent_get_region(&self) -> bool {
        true
    }

    fn get_region(&self, _topleft: MapPixelCoordInt, _size: MapPixelDeltaInt) -> Result<PixelBuf> {
        panic!("tiled access on a direct-draw layer");
    }

    fn supports_direct_drawing(&self) -> bool {
        true
    }

    fn get_region_direct(
        &self,
        output_size: MapPixelDeltaInt,
        base: &dyn GeoDrawable,
        base_tl: MapPixelCoord,
        base_br: MapPixelCoord,
    ) -> Result<PixelBuf> {
        let mut buf = PixelBuf::new(output_size.x.max(0) as usize, output_size.y.max(0) as usize);
        if buf.is_empty() {
            return Ok(buf);
        }

        // Geographic bounds of the visible rectangle, from a border walk.
        let mut min = LatLon::new(f64::INFINITY, f64::INFINITY);
        let mut max = LatLon::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut any = false;
        for i in 0..=LINE_SAMPLES {
            let t = i as f64 / LINE_SAMPLES as f64;
            for pos in [
                MapPixelCoord::new(base_tl.x + (base_br.x - base_tl.x) * t, base_tl.y),
                MapPixelCoord::new(base_tl.x + (base_br.x - base_tl.x) * t, base_br.y),
                MapPixelCoord::new(base_tl.x, base_tl.y + (base_br.y - base_tl.y) * t),
                MapPixelCoord::new(base_br.x, base_tl.y + (base_br.y - base_tl.y) * t),
            ] {
                if let Some(ll) = base.pixel_to_latlon(pos) {
                    min.lat = min.lat.min(ll.lat);
                    min.lon = min.lon.min(ll.lon);
                    max.lat = max.lat.max(ll.lat);
                    max.lon = max.lon.max(ll.lon);
                    any = true;
                }
            }
        }
        if !any {
            return Ok(buf);
        }

        let span = (max.lat - min.lat).max(max.lon - min.lon);
        let spacing = pick_spacing(span);

        let scale_x = output_size.x as f64 / (base_br.x - base_tl.x);
        let scale_y = output_size.y as f64 / (base_br.y - base_tl.y);
        let project = |ll: LatLon| -> Option<(i64, i64)> {
            let p = base.latlon_to_pixel(ll)?;
            Some((
                ((p.x - base_tl.x) * scale_x).round() as i64,
                ((p.y - base_tl.y) * scale_y).round() as i64,
            ))
        };

        // Lines of constant latitude.
        let mut lat = (min.lat / spacing).floor() * spacing;
        while lat <= max.lat {
            let points: Vec<_> = (0..=LINE_SAMPLES)
                .map(|i| {
                    let lon = min.lon + (max.lon - min.lon) * i as f64 / LINE_SAMPLES as f64;
                    project(LatLon::new(lat, lon))
                })
                .collect();
            draw_polyline(&mut buf, &points);
            lat += spacing;
        }

        // Lines of constant longitude.
        let mut lon = (min.lon / spacing).floor() * spacing;
        while lon <= max.lon {
            let points: Vec<_> = (0..=LINE_SAMPLES)
                .map(|i| {
                    let lat = min.lat + (max.lat - min.lat) * i as f64 / LINE_SAMPLES as f64;
                    project(LatLon::new(lat, lon))
                })
                .collect();
            draw_polyline(&mut buf, &points);
            lon += spacing;
        }

        Ok(buf)
    }

    fn pixel_to_latlon(&self, _pos: MapPixelCoord) -> Option<LatLon> {
        None
    }

    fn latlon_to_pixel(&self, _pos: LatLon) -> Option<MapPixelCoord> {
        None
    }
}
