//! Composite maps: an N x M grid of equally-sized sub-maps presented as one
//! logical drawable.
//!
//! Datasets like SRTM ship as adjacent tiles whose edge pixel is shared
//! between neighbors; the `has_overlap_pixel` convention counts that shared
//! pixel only once per junction when laying out the grid.

use std::sync::Arc;

use crate::core::coords::{LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDeltaInt};
use crate::layers::base::{
    get_region_checked, load_map, DrawableType, GeoDrawable, PixelFormat,
};
use crate::tiles::pixelbuf::PixelBuf;
use crate::{MapError, Result};

/// Token prefix identifying a composite map filename.
pub const COMPOSITE_FNAME_PREFIX: &str = "composite_map:";

pub struct CompositeMap {
    fname: String,
    submaps: Vec<Arc<dyn GeoDrawable>>,
    num_x: usize,
    num_y: usize,
    has_overlap_pixel: bool,
    sub_width: u32,
    sub_height: u32,
    width: u32,
    height: u32,
}

impl CompositeMap {
    /// Assembles a composite from `num_x * num_y` sub-maps in row-major
    /// order. All sub-maps must share one size.
    pub fn new(
        num_x: usize,
        num_y: usize,
        submaps: Vec<Arc<dyn GeoDrawable>>,
        has_overlap_pixel: bool,
    ) -> Result<Self> {
        if num_x == 0 || num_y == 0 || submaps.len() != num_x * num_y {
            return Err(MapError::Layer(format!(
                "composite grid {}x{} does not match {} sub-maps",
                num_x,
                num_y,
                submaps.len()
            )));
        }
        let sub_width = submaps[0].width();
        let sub_height = submaps[0].height();
        if sub_width == 0 || sub_height == 0 {
            return Err(MapError::Layer("composite sub-map failed to load".to_string()));
        }
        if submaps
            .iter()
            .any(|m| m.width() != sub_width || m.height() != sub_height)
        {
            return Err(MapError::Layer(
                "composite sub-maps must all have the same size".to_string(),
            ));
        }

        let overlap = if has_overlap_pixel { 1 } else { 0 };
        let width = num_x as u32 * (sub_width - overlap) + overlap;
        let height = num_y as u32 * (sub_height - overlap) + overlap;
        let fname = format_fname(
            num_x,
            num_y,
            has_overlap_pixel,
            &submaps.iter().map(|m| m.fname()).collect::<Vec<_>>(),
        );

        Ok(Self {
            fname,
            submaps,
            num_x,
            num_y,
            has_overlap_pixel,
            sub_width,
            sub_height,
            width,
            height,
        })
    }

    /// Loads a composite from its filename token. Sub-maps that fail to
    /// load become zero-size sentinels, which the size check rejects, so a
    /// broken member fails the whole composite at load time.
    pub fn from_fname(fname: &str) -> Result<Self> {
        let (num_x, num_y, has_overlap_pixel, names) = parse_fname(fname)?;
        let submaps = names.iter().map(|name| load_map(name)).collect();
        Self::new(num_x, num_y, submaps, has_overlap_pixel)
    }

    pub fn num_x(&self) -> usize {
        self.num_x
    }

    pub fn num_y(&self) -> usize {
        self.num_y
    }

    pub fn has_overlap_pixel(&self) -> bool {
        self.has_overlap_pixel
    }

    pub fn submaps(&self) -> &[Arc<dyn GeoDrawable>] {
        &self.submaps
    }

    /// Effective sub-map extent used for offset arithmetic; the shared
    /// edge pixel is counted once per junction.
    fn effective_sub_size(&self) -> (i64, i64) {
        let overlap = if self.has_overlap_pixel { 1 } else { 0 };
        (
            (self.sub_width - overlap) as i64,
            (self.sub_height - overlap) as i64,
        )
    }

    /// Global pixel offset of the sub-map at grid position (col, row).
    fn submap_origin(&self, col: usize, row: usize) -> MapPixelCoordInt {
        let (eff_w, eff_h) = self.effective_sub_size();
        MapPixelCoordInt::new(col as i64 * eff_w, row as i64 * eff_h)
    }

    fn submap_at(&self, col: usize, row: usize) -> &Arc<dyn GeoDrawable> {
        &self.submaps[row * self.num_x + col]
    }

    /// The sub-map owning a global pixel position for georeferencing
    /// queries. Pixels in an overlap zone resolve to the later sub-map.
    fn owner_of(&self, pos: MapPixelCoord) -> (usize, usize) {
        let (eff_w, eff_h) = self.effective_sub_size();
        let col = ((pos.x as i64).div_euclid(eff_w)).clamp(0, self.num_x as i64 - 1) as usize;
        let row = ((pos.y as i64).div_euclid(eff_h)).clamp(0, self.num_y as i64 - 1) as usize;
        (col, row)
    }
}

impl GeoDrawable for CompositeMap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn drawable_type(&self) -> DrawableType {
        DrawableType::Composite
    }

    fn title(&self) -> String {
        format!("Composite {}x{}", self.num_x, self.num_y)
    }

    fn description(&self) -> String {
        format!(
            "{} of {} ({}x{} pixels)",
            self.title(),
            self.submaps[0].title(),
            self.width,
            self.height
        )
    }

    fn fname(&self) -> String {
        self.fname.clone()
    }

    fn pixel_format(&self) -> PixelFormat {
        self.submaps[0].pixel_format()
    }

    fn supports_concurrent_get_region(&self) -> bool {
        self.submaps
            .iter()
            .all(|m| m.supports_concurrent_get_region())
    }

    fn get_region(&self, topleft: MapPixelCoordInt, size: MapPixelDeltaInt) -> Result<PixelBuf> {
        // Fast path: the query sits entirely inside one sub-map.
        let owner = self.owner_of(MapPixelCoord::from(topleft));
        let origin = self.submap_origin(owner.0, owner.1);
        let local_tl = topleft - MapPixelDeltaInt::new(origin.x, origin.y);
        if local_tl.x >= 0
            && local_tl.y >= 0
            && local_tl.x + size.x <= self.sub_width as i64
            && local_tl.y + size.y <= self.sub_height as i64
        {
            return self.submap_at(owner.0, owner.1).get_region(local_tl, size);
        }

        // Stitch every overlapping sub-region into one buffer.
        let mut out = PixelBuf::new(size.x as usize, size.y as usize);
        for row in 0..self.num_y {
            for col in 0..self.num_x {
                let origin = self.submap_origin(col, row);
                let x0 = origin.x.max(topleft.x);
                let y0 = origin.y.max(topleft.y);
                let x1 = (origin.x + self.sub_width as i64).min(topleft.x + size.x);
                let y1 = (origin.y + self.sub_height as i64).min(topleft.y + size.y);
                if x0 >= x1 || y0 >= y1 {
                    continue;
                }
                let part = get_region_checked(
                    self.submap_at(col, row).as_ref(),
                    MapPixelCoordInt::new(x0 - origin.x, y0 - origin.y),
                    MapPixelDeltaInt::new(x1 - x0, y1 - y0),
                );
                out.paste(&part, x0 - topleft.x, y0 - topleft.y);
            }
        }
        Ok(out)
    }

    fn pixel_to_latlon(&self, pos: MapPixelCoord) -> Option<LatLon> {
        let (col, row) = self.owner_of(pos);
        let origin = self.submap_origin(col, row);
        let local = MapPixelCoord::new(pos.x - origin.x as f64, pos.y - origin.y as f64);
        self.submap_at(col, row).pixel_to_latlon(local)
    }

    fn latlon_to_pixel(&self, pos: LatLon) -> Option<MapPixelCoord> {
        let mut fallback = None;
        for row in 0..self.num_y {
            for col in 0..self.num_x {
                let Some(local) = self.submap_at(col, row).latlon_to_pixel(pos) else {
                    continue;
                };
                let origin = self.submap_origin(col, row);
                let global =
                    MapPixelCoord::new(local.x + origin.x as f64, local.y + origin.y as f64);
                let inside = local.x >= 0.0
                    && local.y >= 0.0
                    && local.x <= self.sub_width as f64
                    && local.y <= self.sub_height as f64;
                if inside {
                    return Some(global);
                }
                if fallback.is_none() {
                    fallback = Some(global);
                }
            }
        }
        fallback
    }
}

/// Formats the composite filename token:
/// `composite_map:<num_x>;<num_y>;<clip|noclip>;<enc-fname>;...`
pub fn format_fname(num_x: usize, num_y: usize, has_overlap_pixel: bool, names: &[String]) -> String {
    let mut out = format!(
        "{}{};{};{}",
        COMPOSITE_FNAME_PREFIX,
        num_x,
        num_y,
        if has_overlap_pixel { "clip" } else { "noclip" }
    );
    for name in names {
        out.push(';');
        out.push_str(&percent_encode(name));
    }
    out
}

/// Parses a composite filename token back into its parts. Inverse of
/// [`format_fname`]; the round trip is exact.
pub fn parse_fname(fname: &str) -> Result<(usize, usize, bool, Vec<String>)> {
    let body = fname
        .strip_prefix(COMPOSITE_FNAME_PREFIX)
        .ok_or_else(|| MapError::ParseError(format!("not a composite token: {}", fname)))?;
    let mut fields = body.split(';');
    let num_x = parse_count(fields.next())?;
    let num_y = parse_count(fields.next())?;
    let has_overlap_pixel = match fields.next() {
        Some("clip") => true,
        Some("noclip") => false,
        other => {
            return Err(MapError::ParseError(format!(
                "bad clip flag: {:?}",
                other
            )))
        }
    };
    let names = fields.map(percent_decode).collect::<Result<Vec<_>>>()?;
    if names.len() != num_x * num_y {
        return Err(MapError::ParseError(format!(
            "composite token names {} maps, grid needs {}",
            names.len(),
            num_x * num_y
        )));
    }
    Ok((num_x, num_y, has_overlap_pixel, names))
}

fn parse_count(field: Option<&str>) -> Result<usize> {
    field
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .ok_or_else(|| MapError::ParseError("bad composite grid count".to_string()))
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~' | b'/')
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn percent_decode(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| {
                    MapError::ParseError(format!("bad percent escape in '{}'", input))
                })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| MapError::ParseError(e.to_string()))
}
