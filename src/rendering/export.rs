//! Software composition of display orders, for off-screen export.
//!
//! The interactive path hands orders to the GPU backend; exports instead
//! run a fresh, fully synchronous generation pass at 1:1 zoom and flatten
//! the orders on the CPU, so the result never contains a half-resolved
//! placeholder.

use crate::core::viewmodel::MapViewModel;
use crate::layers::base::PixelFormat;
use crate::rendering::orders::{DisplayOrder, MapView};
use crate::tiles::pixelbuf::PixelBuf;

/// Renders a view-model snapshot into a pixel buffer of the given size.
pub fn render_view_to_buffer(model: &MapViewModel, width: u32, height: u32) -> PixelBuf {
    let export_model = model.pinned_for_export(width, height);
    let mut view = MapView::new_sync();
    let orders = view.generate(&export_model).to_vec();
    compose(width, height, &orders)
}

/// Flattens an ordered list of display orders into one buffer. Quads are
/// filled by inverting the affine map spanned by their top-left, top-right
/// and bottom-left corners with nearest-neighbor sampling.
pub fn compose(width: u32, height: u32, orders: &[DisplayOrder]) -> PixelBuf {
    let mut out = PixelBuf::new(width as usize, height as usize);
    let (half_w, half_h) = (width as f64 / 2.0, height as f64 / 2.0);

    for order in orders {
        let pixels = order.promise().get_pixels();
        if pixels.is_empty() {
            continue;
        }
        let corners = order.corners();
        let origin = (corners[0].x + half_w, corners[0].y + half_h);
        let u = (corners[1].x - corners[0].x, corners[1].y - corners[0].y);
        let v = (corners[3].x - corners[0].x, corners[3].y - corners[0].y);
        let det = u.0 * v.1 - u.1 * v.0;
        if det.abs() < 1e-12 {
            continue;
        }

        // Bounding box of the quad, clipped to the output.
        let xs = corners.iter().map(|c| c.x + half_w);
        let ys = corners.iter().map(|c| c.y + half_h);
        let x0 = xs.clone().fold(f64::INFINITY, f64::min).floor().max(0.0) as usize;
        let x1 = (xs.fold(f64::NEG_INFINITY, f64::max).ceil() as i64).clamp(0, width as i64) as usize;
        let y0 = ys.clone().fold(f64::INFINITY, f64::min).floor().max(0.0) as usize;
        let y1 = (ys.fold(f64::NEG_INFINITY, f64::max).ceil() as i64).clamp(0, height as i64) as usize;

        for y in y0..y1 {
            for x in x0..x1 {
                let d = (x as f64 + 0.5 - origin.0, y as f64 + 0.5 - origin.1);
                let s = (d.0 * v.1 - d.1 * v.0) / det;
                let t = (d.1 * u.0 - d.0 * u.1) / det;
                if !(0.0..1.0).contains(&s) || !(0.0..1.0).contains(&t) {
                    continue;
                }
                let src_x = ((s * pixels.width() as f64) as usize).min(pixels.width() - 1);
                let src_y = ((t * pixels.height() as f64) as usize).min(pixels.height() - 1);
                let src = pixels.get(src_x, src_y);
                let blended = blend(
                    out.get(x, y),
                    src,
                    order.promise().pixel_format(),
                    order.transparency(),
                );
                out.set(x, y, blended);
            }
        }
    }
    out
}

/// Source-over blending with either per-pixel alpha or the order's uniform
/// transparency, depending on the layer's pixel format.
fn blend(dst: u32, src: u32, format: PixelFormat, transparency: f64) -> u32 {
    let src_alpha = match format {
        PixelFormat::Rgba => (src >> 24) as u8 as f64 / 255.0,
        PixelFormat::RgbTransparent => 1.0,
    } * (1.0 - transparency.clamp(0.0, 1.0));

    if src_alpha >= 1.0 {
        return src | 0xFF00_0000;
    }
    let [dr, dg, db, da] = dst.to_le_bytes().map(|b| b as f64 / 255.0);
    let [sr, sg, sb, _] = src.to_le_bytes().map(|b| b as f64 / 255.0);

    let out_a = src_alpha + da * (1.0 - src_alpha);
    if out_a <= 0.0 {
        return 0;
    }
    let channel = |s: f64, d: f64| {
        (((s * src_alpha + d * da * (1.0 - src_alpha)) / out_a) * 255.0).round() as u8
    };
    u32::from_le_bytes([
        channel(sr, dr),
        channel(sg, dg),
        channel(sb, db),
        (out_a * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coords::DisplayDelta;
    use crate::layers::base::testutil::FakeMap;
    use crate::layers::base::GeoDrawable;
    use crate::tiles::pixelbuf::rgba;
    use std::sync::Arc;

    #[test]
    fn test_blend_opaque_and_transparent() {
        let red = rgba(255, 0, 0, 255);
        let blue = rgba(0, 0, 255, 255);
        assert_eq!(blend(blue, red, PixelFormat::Rgba, 0.0), red);
        // Fully transparent source leaves the destination alone.
        assert_eq!(blend(blue, rgba(255, 0, 0, 0), PixelFormat::Rgba, 0.0), blue);
        // Half transparency mixes the channels.
        let half = blend(blue, red, PixelFormat::RgbTransparent, 0.5);
        let [r, _, b, a] = half.to_le_bytes();
        assert!(r > 100 && b > 100);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_export_renders_base_map_pixels() {
        let base: Arc<dyn GeoDrawable> = Arc::new(FakeMap::new(64, 64));
        let model = MapViewModel::new(base.clone(), DisplayDelta::new(64.0, 64.0));
        let out = render_view_to_buffer(&model, 64, 64);

        assert_eq!(out.width(), 64);
        assert_eq!(out.height(), 64);
        // The whole output is covered by the map's fill color, opaque.
        let fill = rgba(128, 128, 128, 255);
        assert_eq!(out.get(10, 10), fill | 0xFF00_0000);
        assert_eq!(out.get(63, 63) & 0x00FF_FFFF, fill & 0x00FF_FFFF);
    }

    #[test]
    fn test_export_viewport_larger_than_map_leaves_margin_empty() {
        let base: Arc<dyn GeoDrawable> = Arc::new(FakeMap::new(32, 32));
        let model = MapViewModel::new(base, DisplayDelta::new(64.0, 64.0));
        let out = render_view_to_buffer(&model, 128, 128);
        // Map spans the central 32 pixels; the far corner stays empty.
        assert_eq!(out.get(2, 2), 0);
        assert_ne!(out.get(64, 64), 0);
    }
}
