//! Display-order generation: from a view-model snapshot to an ordered list
//! of textured quads, with a generation-based promise cache in between.
//!
//! One generation is one frame's worth of promises. During a `generate`
//! call the previous generation serves as the lookup source, so an
//! identical tile request reuses the in-flight promise instead of issuing
//! a second load; whatever the new frame did not request is dropped (and
//! its background work abandoned, best effort) when the call returns.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::background::runner::{global_runner, TaskRunner};
use crate::core::constants::{BORDER_WALK_SAMPLES, TILE_SIZE};
use crate::core::coords::{
    BaseMapCoord, BaseMapDelta, DisplayCoordCentered, MapPixelCoord, MapPixelCoordInt,
    MapPixelDeltaInt,
};
use crate::core::viewmodel::{MapViewModel, OverlaySpec};
use crate::layers::base::{map_to_map, same_drawable, GeoDrawable};
use crate::tiles::code::TileCode;
use crate::tiles::promise::{
    PixelPromise, PixelPromiseDirect, PixelPromiseTiled, PixelPromiseTiledAsync,
};

pub use crate::tiles::promise::RepaintCallback;

/// One textured quad for the renderer: four centered-display corners in
/// clockwise order (top-left first), a uniform transparency, and the
/// promise owning the quad's pixels.
#[derive(Clone)]
pub struct DisplayOrder {
    corners: [DisplayCoordCentered; 4],
    transparency: f64,
    promise: Arc<dyn PixelPromise>,
}

impl DisplayOrder {
    pub fn new(
        corners: [DisplayCoordCentered; 4],
        transparency: f64,
        promise: Arc<dyn PixelPromise>,
    ) -> Self {
        Self {
            corners,
            transparency,
            promise,
        }
    }

    pub fn corners(&self) -> &[DisplayCoordCentered; 4] {
        &self.corners
    }

    pub fn top_left(&self) -> DisplayCoordCentered {
        self.corners[0]
    }

    pub fn bottom_right(&self) -> DisplayCoordCentered {
        self.corners[2]
    }

    pub fn transparency(&self) -> f64 {
        self.transparency
    }

    pub fn promise(&self) -> &Arc<dyn PixelPromise> {
        &self.promise
    }
}

type PromiseCache = BTreeMap<TileCode, Arc<dyn PixelPromise>>;

/// Turns view-model snapshots into display orders and owns the promise
/// cache across frames. Lives on the UI/render thread; only the repaint
/// callback is ever touched from background workers.
pub struct MapView {
    orders: Vec<DisplayOrder>,
    promises: PromiseCache,
    repaint: RepaintCallback,
    runner: Arc<TaskRunner>,
    sync_only: bool,
    generated_for: Option<u64>,
}

impl MapView {
    /// A view using the shared background runner. `repaint` is invoked
    /// from worker threads whenever an async tile resolves.
    pub fn new(repaint: RepaintCallback) -> Self {
        Self::with_runner(repaint, global_runner())
    }

    pub fn with_runner(repaint: RepaintCallback, runner: Arc<TaskRunner>) -> Self {
        Self {
            orders: Vec::new(),
            promises: BTreeMap::new(),
            repaint,
            runner,
            sync_only: false,
            generated_for: None,
        }
    }

    /// A view that resolves every tile synchronously, for export passes
    /// that must not return half-resolved promises.
    pub fn new_sync() -> Self {
        let mut view = Self::with_runner(Arc::new(|| {}), global_runner());
        view.sync_only = true;
        view
    }

    /// Whether the model changed since the last `generate`; when false a
    /// cheap [`orders`](Self::orders) redraw suffices.
    pub fn needs_generate(&self, model: &MapViewModel) -> bool {
        self.generated_for != Some(model.change_counter())
    }

    /// The last generated order list, for repaints that change no state.
    pub fn orders(&self) -> &[DisplayOrder] {
        &self.orders
    }

    /// Full repaint: regenerates every display order for the snapshot and
    /// rolls the promise cache forward one generation.
    pub fn generate(&mut self, model: &MapViewModel) -> &[DisplayOrder] {
        // The previous generation stays alive as the lookup source for
        // this whole pass and is dropped at the end of it.
        let mut previous = std::mem::take(&mut self.promises);
        self.orders.clear();

        let half = BaseMapDelta::new(
            model.display_size().x / (2.0 * model.zoom()),
            model.display_size().y / (2.0 * model.zoom()),
        );
        let base_tl = model.center() - half;
        let base_br = model.center() + half;

        self.tiled_orders(
            model,
            model.base_map().clone(),
            MapPixelCoord::new(base_tl.x, base_tl.y),
            MapPixelCoord::new(base_br.x, base_br.y),
            0.0,
            &mut previous,
        );

        for spec in model.overlays().iter().filter(|s| s.enabled()) {
            if spec.map().supports_direct_drawing() {
                self.direct_order(model, spec, base_tl, base_br);
            } else if let Some((tl, br)) =
                overlay_pixel_rect(model.base_map(), spec.map(), base_tl, base_br)
            {
                self.tiled_orders(
                    model,
                    spec.map().clone(),
                    tl,
                    br,
                    spec.transparency(),
                    &mut previous,
                );
            }
        }

        self.generated_for = Some(model.change_counter());
        let dropped = previous.len();
        if dropped > 0 {
            log::debug!("dropping {} stale tile promises", dropped);
        }
        &self.orders
    }

    fn make_promise(&self, code: TileCode) -> Arc<dyn PixelPromise> {
        if !self.sync_only && code.map().supports_concurrent_get_region() {
            Arc::new(PixelPromiseTiledAsync::new(
                code,
                &self.runner,
                self.repaint.clone(),
            ))
        } else {
            Arc::new(PixelPromiseTiled::new(code))
        }
    }

    /// Emits one order per tile of `map` covering the given map-space
    /// rectangle, rounded outward to the tile grid and clipped to the map
    /// extent, in row-major order.
    fn tiled_orders(
        &mut self,
        model: &MapViewModel,
        map: Arc<dyn GeoDrawable>,
        rect_tl: MapPixelCoord,
        rect_br: MapPixelCoord,
        transparency: f64,
        previous: &mut PromiseCache,
    ) {
        let is_base = same_drawable(&map, model.base_map());
        let extent = map.size();

        let start = MapPixelCoordInt::new(rect_tl.x.floor() as i64, rect_tl.y.floor() as i64)
            .tile_floor(TILE_SIZE);
        let x0 = start.x.max(0);
        let y0 = start.y.max(0);
        let x_end = ceil_to_tile(rect_br.x.ceil() as i64).min(ceil_to_tile(extent.x));
        let y_end = ceil_to_tile(rect_br.y.ceil() as i64).min(ceil_to_tile(extent.y));

        let tile_size = MapPixelDeltaInt::new(TILE_SIZE, TILE_SIZE);
        let mut ty = y0;
        while ty < y_end {
            let mut tx = x0;
            while tx < x_end {
                let code = TileCode::new(map.clone(), MapPixelCoordInt::new(tx, ty), tile_size);
                let promise = previous
                    .remove(&code)
                    .unwrap_or_else(|| self.make_promise(code.clone()));
                self.promises.insert(code, promise.clone());

                if let Some(corners) =
                    self.tile_corners(model, &map, is_base, tx, ty)
                {
                    self.orders
                        .push(DisplayOrder::new(corners, transparency, promise));
                }
                tx += TILE_SIZE;
            }
            ty += TILE_SIZE;
        }
    }

    /// The four corner positions of a tile in centered display space,
    /// clockwise from the top-left. `None` when any corner has no valid
    /// mapping into base-map space; such a tile is skipped, not an error.
    fn tile_corners(
        &self,
        model: &MapViewModel,
        map: &Arc<dyn GeoDrawable>,
        is_base: bool,
        tx: i64,
        ty: i64,
    ) -> Option<[DisplayCoordCentered; 4]> {
        let corner_pixels = [
            (tx, ty),
            (tx + TILE_SIZE, ty),
            (tx + TILE_SIZE, ty + TILE_SIZE),
            (tx, ty + TILE_SIZE),
        ];
        let mut corners = [DisplayCoordCentered::new(0.0, 0.0); 4];
        for (corner, &(cx, cy)) in corners.iter_mut().zip(corner_pixels.iter()) {
            let map_pos = MapPixelCoord::new(cx as f64, cy as f64);
            // On the base map the mapping is a direct affine transform;
            // no lat/lon round trip needed.
            let base_pos = if is_base {
                BaseMapCoord::new(map_pos.x, map_pos.y)
            } else {
                BaseMapCoord::from(map_to_map(map_pos, map, model.base_map())?)
            };
            *corner = centered_from_base(model, base_pos);
        }
        Some(corners)
    }

    /// One full-viewport order for a direct-drawing overlay, resolved
    /// synchronously against the base map's georeferencing. Never cached:
    /// there is no stable key for a viewport-framed frame.
    fn direct_order(&mut self, model: &MapViewModel, spec: &OverlaySpec, tl: BaseMapCoord, br: BaseMapCoord) {
        let size = model.display_size();
        let output_size =
            MapPixelDeltaInt::new(size.x.round() as i64, size.y.round() as i64);
        let promise = Arc::new(PixelPromiseDirect::new(
            spec.map().clone(),
            model.base_map().clone(),
            output_size,
            tl.as_map_pixel(),
            br.as_map_pixel(),
        ));
        let (hw, hh) = (size.x / 2.0, size.y / 2.0);
        let corners = [
            DisplayCoordCentered::new(-hw, -hh),
            DisplayCoordCentered::new(hw, -hh),
            DisplayCoordCentered::new(hw, hh),
            DisplayCoordCentered::new(-hw, hh),
        ];
        self.orders
            .push(DisplayOrder::new(corners, spec.transparency(), promise));
    }
}

fn ceil_to_tile(v: i64) -> i64 {
    v.div_euclid(TILE_SIZE) * TILE_SIZE + if v.rem_euclid(TILE_SIZE) == 0 { 0 } else { TILE_SIZE }
}

/// Base-map position to centered display coordinates.
fn centered_from_base(model: &MapViewModel, pos: BaseMapCoord) -> DisplayCoordCentered {
    let delta = pos - model.center();
    DisplayCoordCentered::new(delta.x * model.zoom(), delta.y * model.zoom())
}

/// Projects the base map's visible-rectangle *border* into an overlay's
/// pixel grid and returns the bounding box. The full border is walked, not
/// just the corners: projections are not affine, so an interior border
/// point can map outside the corners' box. `None` when no border sample
/// has a valid mapping, in which case the overlay contributes nothing.
fn overlay_pixel_rect(
    base: &Arc<dyn GeoDrawable>,
    overlay: &Arc<dyn GeoDrawable>,
    tl: BaseMapCoord,
    br: BaseMapCoord,
) -> Option<(MapPixelCoord, MapPixelCoord)> {
    let mut min = MapPixelCoord::new(f64::INFINITY, f64::INFINITY);
    let mut max = MapPixelCoord::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    let mut any = false;
    for i in 0..=BORDER_WALK_SAMPLES {
        let t = i as f64 / BORDER_WALK_SAMPLES as f64;
        let x = tl.x + (br.x - tl.x) * t;
        let y = tl.y + (br.y - tl.y) * t;
        for pos in [
            MapPixelCoord::new(x, tl.y),
            MapPixelCoord::new(x, br.y),
            MapPixelCoord::new(tl.x, y),
            MapPixelCoord::new(br.x, y),
        ] {
            if let Some(p) = map_to_map(pos, base, overlay) {
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
                any = true;
            }
        }
    }
    if any {
        Some((min, max))
    } else {
        None
    }
}
