//! GPS track overlays, drawn directly into the viewport frame.

use std::sync::Arc;

use crate::core::coords::{LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDeltaInt};
use crate::layers::base::{DrawableType, GeoDrawable, PixelFormat};
use crate::tiles::pixelbuf::{rgba, PixelBuf};
use crate::{MapError, Result};

const TRACK_COLOR: u32 = rgba(220, 16, 48, 255);
const WAYPOINT_HALF: i64 = 2;

/// A recorded track: an ordered polyline of geographic positions.
pub struct GpsTrack {
    fname: String,
    points: Vec<LatLon>,
}

impl GpsTrack {
    pub fn new(fname: &str, points: Vec<LatLon>) -> Self {
        Self {
            fname: fname.to_string(),
            points,
        }
    }

    /// Loads a track from a GeoJSON file containing LineString,
    /// MultiLineString or Point geometries.
    pub fn from_file(fname: &str) -> Result<Self> {
        let text = std::fs::read_to_string(fname)?;
        Self::from_geojson(fname, &text)
    }

    /// Parses GeoJSON text; positions are `[lon, lat]` per the format.
    pub fn from_geojson(fname: &str, text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| MapError::ParseError(e.to_string()))?;
        let mut points = Vec::new();
        collect_geometry(&value, &mut points);
        if points.is_empty() {
            return Err(MapError::ParseError(format!(
                "no track geometry in '{}'",
                fname
            )));
        }
        Ok(Self::new(fname, points))
    }

    pub fn points(&self) -> &[LatLon] {
        &self.points
    }
}

fn collect_position(coords: &serde_json::Value, points: &mut Vec<LatLon>) {
    if let (Some(lon), Some(lat)) = (
        coords.get(0).and_then(|v| v.as_f64()),
        coords.get(1).and_then(|v| v.as_f64()),
    ) {
        points.push(LatLon::new(lat, lon));
    }
}

fn collect_geometry(value: &serde_json::Value, points: &mut Vec<LatLon>) {
    match value.get("type").and_then(|t| t.as_str()) {
        Some("FeatureCollection") => {
            if let Some(features) = value.get("features").and_then(|f| f.as_array()) {
                for feature in features {
                    collect_geometry(feature, points);
                }
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry") {
                collect_geometry(geometry, points);
            }
        }
        Some("Point") => {
            if let Some(coords) = value.get("coordinates") {
                collect_position(coords, points);
            }
        }
        Some("LineString") => {
            if let Some(coords) = value.get("coordinates").and_then(|c| c.as_array()) {
                for position in coords {
                    collect_position(position, points);
                }
            }
        }
        Some("MultiLineString") => {
            if let Some(lines) = value.get("coordinates").and_then(|c| c.as_array()) {
                for line in lines.iter().filter_map(|l| l.as_array()) {
                    for position in line {
                        collect_position(position, points);
                    }
                }
            }
        }
        _ => {}
    }
}

impl GeoDrawable for GpsTrack {
    fn width(&self) -> u32 {
        0
    }

    fn height(&self) -> u32 {
        0
    }

    fn drawable_type(&self) -> DrawableType {
        DrawableType::GpsTrack
    }

    fn title(&self) -> String {
        format!("Track {}", self.fname)
    }

    fn description(&self) -> String {
        format!("GPS track with {} points", self.points.len())
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
        let scale_x = output_size.x as f64 / (base_br.x - base_tl.x);
        let scale_y = output_size.y as f64 / (base_br.y - base_tl.y);

        // Points outside the base map's projection are skipped; the track
        // simply breaks there.
        let projected: Vec<Option<(i64, i64)>> = self
            .points
            .iter()
            .map(|&ll| {
                let p = base.latlon_to_pixel(ll)?;
                Some((
                    ((p.x - base_tl.x) * scale_x).round() as i64,
                    ((p.y - base_tl.y) * scale_y).round() as i64,
                ))
            })
            .collect();

        for pair in projected.windows(2) {
            if let (Some(a), Some(b)) = (pair[0], pair[1]) {
                // A thin band instead of a hairline.
                buf.draw_line(a.0, a.1, b.0, b.1, TRACK_COLOR);
                buf.draw_line(a.0 + 1, a.1, b.0 + 1, b.1, TRACK_COLOR);
                buf.draw_line(a.0, a.1 + 1, b.0, b.1 + 1, TRACK_COLOR);
            }
        }
        if let Some(Some(first)) = projected.first() {
            buf.draw_square(first.0, first.1, WAYPOINT_HALF, TRACK_COLOR);
        }
        if let Some(Some(last)) = projected.last() {
            buf.draw_square(last.0, last.1, WAYPOINT_HALF, TRACK_COLOR);
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

/// Convenience for overlay construction sites that hold `Arc`s.
pub fn track_from_points(fname: &str, points: Vec<LatLon>) -> Arc<dyn GeoDrawable> {
    Arc::new(GpsTrack::new(fname, points))
}
