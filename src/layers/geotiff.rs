//! GeoTIFF raster maps.
//!
//! The raster is decoded into memory once at load time; georeferencing
//! composes a pixel <-> projected-coordinate transform (one of three
//! tie-point schemes) with a projection step down to lat/lon. Every stage
//! returns `Option`: a point outside the model domain is a routine query
//! result, never an error.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::core::coords::{LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDeltaInt};
use crate::layers::base::{DrawableType, GeoDrawable, PixelFormat};
use crate::terrain::pack_elevation;
use crate::tiles::pixelbuf::{rgba, PixelBuf};
use crate::{MapError, Result};

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;

const KEY_GT_MODEL_TYPE: u64 = 1024;
const KEY_GEOGRAPHIC_TYPE: u64 = 2048;
const KEY_PROJECTED_CS_TYPE: u64 = 3072;

/// Projected coordinate system <-> lat/lon step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Model coordinates already are degrees (lon, lat).
    Geographic,
    /// WGS84 transverse mercator, one UTM zone.
    Utm { zone: u8, north: bool },
}

// WGS84 ellipsoid.
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

impl Projection {
    fn central_meridian_deg(zone: u8) -> f64 {
        zone as f64 * 6.0 - 183.0
    }

    /// Lat/lon to projected model coordinates. `None` outside the
    /// projection's sensible domain.
    pub fn latlon_to_cs(&self, pos: LatLon) -> Option<(f64, f64)> {
        match *self {
            Projection::Geographic => {
                if pos.is_valid() {
                    Some((pos.lon, pos.lat))
                } else {
                    None
                }
            }
            Projection::Utm { zone, north } => {
                let lon0 = Self::central_meridian_deg(zone);
                // Far outside the zone the series diverges.
                if pos.lat.abs() > 84.5 || (pos.lon - lon0).abs() > 20.0 {
                    return None;
                }
                let e2 = WGS84_F * (2.0 - WGS84_F);
                let ep2 = e2 / (1.0 - e2);
                let phi = pos.lat.to_radians();
                let dlam = (pos.lon - lon0).to_radians();

                let sin_phi = phi.sin();
                let cos_phi = phi.cos();
                let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
                let t = (phi.tan()) * (phi.tan());
                let c = ep2 * cos_phi * cos_phi;
                let a = cos_phi * dlam;

                let m = meridian_arc(phi, e2);

                let easting = UTM_FALSE_EASTING
                    + UTM_K0
                        * n
                        * (a
                            + (1.0 - t + c) * a.powi(3) / 6.0
                            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5)
                                / 120.0);
                let mut northing = UTM_K0
                    * (m + n
                        * phi.tan()
                        * (a * a / 2.0
                            + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6)
                                / 720.0));
                if !north {
                    northing += UTM_FALSE_NORTHING_SOUTH;
                }
                Some((easting, northing))
            }
        }
    }

    /// Projected model coordinates back to lat/lon.
    pub fn cs_to_latlon(&self, x: f64, y: f64) -> Option<LatLon> {
        match *self {
            Projection::Geographic => {
                let pos = LatLon::new(y, x);
                if pos.is_valid() {
                    Some(pos)
                } else {
                    None
                }
            }
            Projection::Utm { zone, north } => {
                let e2 = WGS84_F * (2.0 - WGS84_F);
                let ep2 = e2 / (1.0 - e2);
                let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

                let x = x - UTM_FALSE_EASTING;
                let y = if north {
                    y
                } else {
                    y - UTM_FALSE_NORTHING_SOUTH
                };

                let m = y / UTM_K0;
                let mu = m
                    / (WGS84_A
                        * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2.powi(3) / 256.0));
                let phi1 = mu
                    + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
                    + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
                    + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
                    + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

                let sin1 = phi1.sin();
                let cos1 = phi1.cos();
                let c1 = ep2 * cos1 * cos1;
                let t1 = phi1.tan() * phi1.tan();
                let n1 = WGS84_A / (1.0 - e2 * sin1 * sin1).sqrt();
                let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
                let d = x / (n1 * UTM_K0);

                let phi = phi1
                    - (n1 * phi1.tan() / r1)
                        * (d * d / 2.0
                            - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2)
                                * d.powi(4)
                                / 24.0
                            + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                                - 252.0 * ep2
                                - 3.0 * c1 * c1)
                                * d.powi(6)
                                / 720.0);
                let lam = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                    + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                        * d.powi(5)
                        / 120.0)
                    / cos1;

                let pos = LatLon::new(
                    phi.to_degrees(),
                    Self::central_meridian_deg(zone) + lam.to_degrees(),
                );
                if pos.is_valid() {
                    Some(pos)
                } else {
                    None
                }
            }
        }
    }
}

fn meridian_arc(phi: f64, e2: f64) -> f64 {
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2.powi(3) / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e2 * e2 / 32.0 + 45.0 * e2.powi(3) / 1024.0)
                * (2.0 * phi).sin()
            + (15.0 * e2 * e2 / 256.0 + 45.0 * e2.powi(3) / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e2.powi(3) / 3072.0) * (6.0 * phi).sin())
}

/// Pixel <-> projected-coordinate transform; one of the three tie-point
/// schemes GeoTIFF supports.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelCsTransform {
    /// Full affine matrix (ModelTransformation).
    Affine { fwd: [f64; 6] },
    /// Single tiepoint plus per-axis pixel scale.
    TiepointScale {
        tie_raster: (f64, f64),
        tie_model: (f64, f64),
        scale: (f64, f64),
    },
    /// Model coordinates of the four raster corners; forward mapping is
    /// bilinear, the inverse is iterative and undefined outside the quad.
    BilinearQuad {
        /// Corner model coordinates in raster order: top-left, top-right,
        /// bottom-right, bottom-left.
        corners: [(f64, f64); 4],
        width: f64,
        height: f64,
    },
}

impl PixelCsTransform {
    pub fn pixel_to_cs(&self, p: MapPixelCoord) -> Option<(f64, f64)> {
        match self {
            PixelCsTransform::Affine { fwd } => Some((
                fwd[0] * p.x + fwd[1] * p.y + fwd[2],
                fwd[3] * p.x + fwd[4] * p.y + fwd[5],
            )),
            PixelCsTransform::TiepointScale {
                tie_raster,
                tie_model,
                scale,
            } => Some((
                tie_model.0 + (p.x - tie_raster.0) * scale.0,
                tie_model.1 - (p.y - tie_raster.1) * scale.1,
            )),
            PixelCsTransform::BilinearQuad {
                corners,
                width,
                height,
            } => {
                let s = p.x / width;
                let t = p.y / height;
                Some(bilinear(corners, s, t))
            }
        }
    }

    pub fn cs_to_pixel(&self, x: f64, y: f64) -> Option<MapPixelCoord> {
        match self {
            PixelCsTransform::Affine { fwd } => {
                let det = fwd[0] * fwd[4] - fwd[1] * fwd[3];
                if det.abs() < 1e-12 {
                    return None;
                }
                let dx = x - fwd[2];
                let dy = y - fwd[5];
                Some(MapPixelCoord::new(
                    (fwd[4] * dx - fwd[1] * dy) / det,
                    (-fwd[3] * dx + fwd[0] * dy) / det,
                ))
            }
            PixelCsTransform::TiepointScale {
                tie_raster,
                tie_model,
                scale,
            } => {
                if scale.0 == 0.0 || scale.1 == 0.0 {
                    return None;
                }
                Some(MapPixelCoord::new(
                    tie_raster.0 + (x - tie_model.0) / scale.0,
                    tie_raster.1 + (tie_model.1 - y) / scale.1,
                ))
            }
            PixelCsTransform::BilinearQuad {
                corners,
                width,
                height,
            } => {
                // Newton iteration on the bilinear forward map.
                let (mut s, mut t) = (0.5, 0.5);
                for _ in 0..20 {
                    let (fx, fy) = bilinear(corners, s, t);
                    let (ex, ey) = (fx - x, fy - y);
                    if ex.abs() < 1e-9 && ey.abs() < 1e-9 {
                        break;
                    }
                    let (dxs, dys) = bilinear_ds(corners, t);
                    let (dxt, dyt) = bilinear_dt(corners, s);
                    let det = dxs * dyt - dxt * dys;
                    if det.abs() < 1e-18 {
                        return None;
                    }
                    s -= (ex * dyt - ey * dxt) / det;
                    t -= (ey * dxs - ex * dys) / det;
                }
                // Outside the valid quad means undefined, not clamped.
                if !(-0.05..=1.05).contains(&s) || !(-0.05..=1.05).contains(&t) {
                    return None;
                }
                Some(MapPixelCoord::new(s * width, t * height))
            }
        }
    }
}

fn bilinear(corners: &[(f64, f64); 4], s: f64, t: f64) -> (f64, f64) {
    let [tl, tr, br, bl] = *corners;
    (
        (1.0 - s) * (1.0 - t) * tl.0 + s * (1.0 - t) * tr.0 + s * t * br.0 + (1.0 - s) * t * bl.0,
        (1.0 - s) * (1.0 - t) * tl.1 + s * (1.0 - t) * tr.1 + s * t * br.1 + (1.0 - s) * t * bl.1,
    )
}

fn bilinear_ds(corners: &[(f64, f64); 4], t: f64) -> (f64, f64) {
    let [tl, tr, br, bl] = *corners;
    (
        (1.0 - t) * (tr.0 - tl.0) + t * (br.0 - bl.0),
        (1.0 - t) * (tr.1 - tl.1) + t * (br.1 - bl.1),
    )
}

fn bilinear_dt(corners: &[(f64, f64); 4], s: f64) -> (f64, f64) {
    let [tl, tr, br, bl] = *corners;
    (
        (1.0 - s) * (bl.0 - tl.0) + s * (br.0 - tr.0),
        (1.0 - s) * (bl.1 - tl.1) + s * (br.1 - tr.1),
    )
}

/// Composed georeference: pixel <-> model transform plus projection.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    pub transform: PixelCsTransform,
    pub projection: Projection,
}

impl GeoReference {
    pub fn pixel_to_latlon(&self, pos: MapPixelCoord) -> Option<LatLon> {
        let (x, y) = self.transform.pixel_to_cs(pos)?;
        self.projection.cs_to_latlon(x, y)
    }

    pub fn latlon_to_pixel(&self, pos: LatLon) -> Option<MapPixelCoord> {
        let (x, y) = self.projection.latlon_to_cs(pos)?;
        self.transform.cs_to_pixel(x, y)
    }
}

enum RasterData {
    Rgba { pixels: Vec<u32>, has_alpha: bool },
    /// 16-bit signed elevation samples (DHM).
    Elevation(Vec<i16>),
}

/// A georeferenced TIFF raster held in memory.
pub struct TiffMap {
    fname: String,
    title: String,
    width: u32,
    height: u32,
    data: RasterData,
    georef: GeoReference,
}

impl TiffMap {
    pub fn open(fname: &str) -> Result<Self> {
        let file = File::open(fname)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;
        let (width, height) = decoder.dimensions()?;
        let colortype = decoder.colortype()?;

        let georef = read_georeference(&mut decoder, width, height)?;
        let data = decode_raster(&mut decoder, colortype, width, height)?;

        let title = Path::new(fname)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(fname)
            .to_string();

        Ok(Self {
            fname: fname.to_string(),
            title,
            width,
            height,
            data,
            georef,
        })
    }

    /// Builds a map from raw parts; the test suites use this to avoid
    /// on-disk fixtures.
    pub fn from_rgba(
        fname: &str,
        width: u32,
        height: u32,
        pixels: Vec<u32>,
        georef: GeoReference,
    ) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            fname: fname.to_string(),
            title: fname.to_string(),
            width,
            height,
            data: RasterData::Rgba {
                pixels,
                has_alpha: false,
            },
            georef,
        }
    }

    pub fn from_elevation(
        fname: &str,
        width: u32,
        height: u32,
        samples: Vec<i16>,
        georef: GeoReference,
    ) -> Self {
        assert_eq!(samples.len(), (width * height) as usize);
        Self {
            fname: fname.to_string(),
            title: fname.to_string(),
            width,
            height,
            data: RasterData::Elevation(samples),
            georef,
        }
    }

    pub fn georeference(&self) -> &GeoReference {
        &self.georef
    }
}

impl GeoDrawable for TiffMap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn drawable_type(&self) -> DrawableType {
        match self.data {
            RasterData::Rgba { .. } => DrawableType::Map,
            RasterData::Elevation(_) => DrawableType::Dhm,
        }
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn description(&self) -> String {
        format!("{} ({}x{} GeoTIFF)", self.title, self.width, self.height)
    }

    fn fname(&self) -> String {
        self.fname.clone()
    }

    fn pixel_format(&self) -> PixelFormat {
        match self.data {
            RasterData::Rgba { has_alpha: true, .. } => PixelFormat::Rgba,
            _ => PixelFormat::RgbTransparent,
        }
    }

    fn supports_concurrent_get_region(&self) -> bool {
        // The decoded raster is immutable.
        true
    }

    fn get_region(&self, topleft: MapPixelCoordInt, size: MapPixelDeltaInt) -> Result<PixelBuf> {
        assert!(
            topleft.x >= 0
                && topleft.y >= 0
                && topleft.x + size.x <= self.width as i64
                && topleft.y + size.y <= self.height as i64,
            "unclamped region request; use get_region_checked"
        );
        let mut buf = PixelBuf::new(size.x as usize, size.y as usize);
        let stride = self.width as i64;
        for y in 0..size.y {
            for x in 0..size.x {
                let idx = ((topleft.y + y) * stride + topleft.x + x) as usize;
                let pixel = match &self.data {
                    RasterData::Rgba { pixels, .. } => pixels[idx],
                    RasterData::Elevation(samples) => pack_elevation(samples[idx]),
                };
                buf.set(x as usize, y as usize, pixel);
            }
        }
        Ok(buf)
    }

    fn pixel_to_latlon(&self, pos: MapPixelCoord) -> Option<LatLon> {
        self.georef.pixel_to_latlon(pos)
    }

    fn latlon_to_pixel(&self, pos: LatLon) -> Option<MapPixelCoord> {
        self.georef.latlon_to_pixel(pos)
    }
}

fn decode_raster<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    colortype: ColorType,
    width: u32,
    height: u32,
) -> Result<RasterData> {
    let expected = (width * height) as usize;
    let image = decoder.read_image()?;
    match (colortype, image) {
        (ColorType::RGB(8), DecodingResult::U8(data)) => {
            let pixels = data
                .chunks_exact(3)
                .map(|p| rgba(p[0], p[1], p[2], 255))
                .collect::<Vec<_>>();
            check_len(pixels.len(), expected)?;
            Ok(RasterData::Rgba {
                pixels,
                has_alpha: false,
            })
        }
        (ColorType::RGBA(8), DecodingResult::U8(data)) => {
            let pixels = data
                .chunks_exact(4)
                .map(|p| rgba(p[0], p[1], p[2], p[3]))
                .collect::<Vec<_>>();
            check_len(pixels.len(), expected)?;
            Ok(RasterData::Rgba {
                pixels,
                has_alpha: true,
            })
        }
        (ColorType::Gray(8), DecodingResult::U8(data)) => {
            let pixels = data
                .iter()
                .map(|&v| rgba(v, v, v, 255))
                .collect::<Vec<_>>();
            check_len(pixels.len(), expected)?;
            Ok(RasterData::Rgba {
                pixels,
                has_alpha: false,
            })
        }
        // 16-bit grayscale is elevation data; keep the signed samples.
        (ColorType::Gray(16), DecodingResult::I16(data)) => {
            check_len(data.len(), expected)?;
            Ok(RasterData::Elevation(data))
        }
        (ColorType::Gray(16), DecodingResult::U16(data)) => {
            check_len(data.len(), expected)?;
            Ok(RasterData::Elevation(
                data.into_iter().map(|v| v as i16).collect(),
            ))
        }
        (colortype, _) => Err(MapError::UnsupportedFormat(format!(
            "unsupported TIFF sample layout: {:?}",
            colortype
        ))),
    }
}

fn check_len(got: usize, expected: usize) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(MapError::UnsupportedFormat(format!(
            "raster size mismatch: {} pixels, expected {}",
            got, expected
        )))
    }
}

fn read_georeference<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    width: u32,
    height: u32,
) -> Result<GeoReference> {
    let transformation = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TRANSFORMATION))
        .ok();
    let tiepoints = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT))
        .ok();
    let pixel_scale = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE))
        .ok();
    let geo_keys = decoder
        .get_tag_u64_vec(Tag::Unknown(TAG_GEO_KEY_DIRECTORY))
        .ok();

    let transform = pick_transform(transformation, tiepoints, pixel_scale, width, height)?;
    let projection = pick_projection(geo_keys)?;
    Ok(GeoReference {
        transform,
        projection,
    })
}

fn pick_transform(
    transformation: Option<Vec<f64>>,
    tiepoints: Option<Vec<f64>>,
    pixel_scale: Option<Vec<f64>>,
    width: u32,
    height: u32,
) -> Result<PixelCsTransform> {
    if let Some(m) = transformation {
        if m.len() != 16 {
            return Err(MapError::Georeference(
                "model transformation must have 16 entries".to_string(),
            ));
        }
        return Ok(PixelCsTransform::Affine {
            fwd: [m[0], m[1], m[3], m[4], m[5], m[7]],
        });
    }
    if let Some(ties) = tiepoints {
        if ties.len() == 6 {
            let scale = pixel_scale.ok_or_else(|| {
                MapError::Georeference("tiepoint without pixel scale".to_string())
            })?;
            if scale.len() < 2 || scale[0] == 0.0 || scale[1] == 0.0 {
                return Err(MapError::Georeference("degenerate pixel scale".to_string()));
            }
            return Ok(PixelCsTransform::TiepointScale {
                tie_raster: (ties[0], ties[1]),
                tie_model: (ties[3], ties[4]),
                scale: (scale[0], scale[1]),
            });
        }
        if ties.len() == 24 {
            return bilinear_from_tiepoints(&ties, width, height);
        }
        return Err(MapError::Georeference(format!(
            "unsupported tiepoint count: {}",
            ties.len() / 6
        )));
    }
    Err(MapError::Georeference(
        "no georeferencing information".to_string(),
    ))
}

/// Four tiepoints must sit on the raster corners; their model coordinates
/// become the bilinear quad.
fn bilinear_from_tiepoints(ties: &[f64], width: u32, height: u32) -> Result<PixelCsTransform> {
    let (w, h) = (width as f64, height as f64);
    let expected = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let mut corners = [None; 4];
    for tie in ties.chunks_exact(6) {
        let raster = (tie[0], tie[1]);
        let model = (tie[3], tie[4]);
        for (slot, &corner) in expected.iter().enumerate() {
            if (raster.0 - corner.0).abs() < 1.0 && (raster.1 - corner.1).abs() < 1.0 {
                corners[slot] = Some(model);
            }
        }
    }
    match corners {
        [Some(tl), Some(tr), Some(br), Some(bl)] => Ok(PixelCsTransform::BilinearQuad {
            corners: [tl, tr, br, bl],
            width: w,
            height: h,
        }),
        _ => Err(MapError::Georeference(
            "four tiepoints do not cover the raster corners".to_string(),
        )),
    }
}

fn pick_projection(geo_keys: Option<Vec<u64>>) -> Result<Projection> {
    let Some(keys) = geo_keys else {
        log::warn!("no GeoKey directory; assuming geographic coordinates");
        return Ok(Projection::Geographic);
    };
    let mut model_type = None;
    let mut geographic_type = None;
    let mut projected_cs = None;
    for entry in keys[4.min(keys.len())..].chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match key {
            KEY_GT_MODEL_TYPE => model_type = Some(value),
            KEY_GEOGRAPHIC_TYPE => geographic_type = Some(value),
            KEY_PROJECTED_CS_TYPE => projected_cs = Some(value),
            _ => {}
        }
    }
    if let Some(epsg) = projected_cs {
        if (32601..=32660).contains(&epsg) {
            return Ok(Projection::Utm {
                zone: (epsg - 32600) as u8,
                north: true,
            });
        }
        if (32701..=32760).contains(&epsg) {
            return Ok(Projection::Utm {
                zone: (epsg - 32700) as u8,
                north: false,
            });
        }
        return Err(MapError::Georeference(format!(
            "unsupported projected CRS: EPSG:{}",
            epsg
        )));
    }
    if model_type == Some(2) || geographic_type.is_some() {
        return Ok(Projection::Geographic);
    }
    log::warn!("incomplete GeoKey directory; assuming geographic coordinates");
    Ok(Projection::Geographic)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Geographic georeference with `deg` degrees per pixel, pixel (0,0)
    /// at the given top-left lat/lon.
    pub fn simple_georef(top_left: LatLon, deg: f64) -> GeoReference {
        GeoReference {
            transform: PixelCsTransform::TiepointScale {
                tie_raster: (0.0, 0.0),
                tie_model: (top_left.lon, top_left.lat),
                scale: (deg, deg),
            },
            projection: Projection::Geographic,
        }
    }
}
