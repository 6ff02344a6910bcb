//! Pure view state: base map, overlay stack, center, zoom, display size.
//!
//! Mutators preserve two invariants: the center never leaves the base map's
//! pixel extent, and after any zoom change the viewport never needs more
//! than [`MAX_VISIBLE_TILES`] tiles. No I/O happens here.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::constants::{MAX_VISIBLE_TILES, TILE_SIZE, ZOOM_STEP};
use crate::core::coords::{
    BaseMapCoord, BaseMapDelta, DisplayCoord, DisplayCoordCentered, DisplayDelta, MapPixelCoord,
};
use crate::layers::base::{load_map, GeoDrawable};
use crate::{MapError, Result};

/// One overlay layer entry: the map, whether it is drawn, and how
/// transparent it is (0 = opaque, 1 = invisible).
#[derive(Clone)]
pub struct OverlaySpec {
    map: Arc<dyn GeoDrawable>,
    enabled: bool,
    transparency: f64,
}

impl OverlaySpec {
    pub fn new(map: Arc<dyn GeoDrawable>) -> Self {
        Self {
            map,
            enabled: true,
            transparency: 0.5,
        }
    }

    pub fn map(&self) -> &Arc<dyn GeoDrawable> {
        &self.map
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn transparency(&self) -> f64 {
        self.transparency
    }
}

#[derive(Clone)]
pub struct MapViewModel {
    base_map: Arc<dyn GeoDrawable>,
    overlays: Vec<OverlaySpec>,
    center: BaseMapCoord,
    zoom: f64,
    display_size: DisplayDelta,
    change_counter: u64,
}

impl MapViewModel {
    pub fn new(base_map: Arc<dyn GeoDrawable>, display_size: DisplayDelta) -> Self {
        let center = Self::midpoint_of(base_map.as_ref());
        Self {
            base_map,
            overlays: Vec::new(),
            center,
            zoom: 1.0,
            display_size,
            change_counter: 0,
        }
    }

    pub fn base_map(&self) -> &Arc<dyn GeoDrawable> {
        &self.base_map
    }

    pub fn overlays(&self) -> &[OverlaySpec] {
        &self.overlays
    }

    pub fn center(&self) -> BaseMapCoord {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn display_size(&self) -> DisplayDelta {
        self.display_size
    }

    /// Bumped on every mutation; the display-order generator compares it to
    /// decide between a full repaint and a cheap redraw.
    pub fn change_counter(&self) -> u64 {
        self.change_counter
    }

    fn touch(&mut self) {
        self.change_counter += 1;
    }

    fn midpoint_of(map: &dyn GeoDrawable) -> BaseMapCoord {
        BaseMapCoord::new(map.width() as f64 / 2.0, map.height() as f64 / 2.0)
    }

    fn clamp_center(&self, center: BaseMapCoord) -> BaseMapCoord {
        center.clamp(
            MapPixelCoord::new(0.0, 0.0),
            MapPixelCoord::new(self.base_map.width() as f64, self.base_map.height() as f64),
        )
    }

    /// Number of `TILE_SIZE` tiles the current viewport spans.
    pub fn visible_tile_count(&self) -> f64 {
        let tile_px = self.zoom * TILE_SIZE as f64;
        (self.display_size.x / tile_px) * (self.display_size.y / tile_px)
    }

    /// Multiplies zoom until the visible-tile cap holds again. Invoked
    /// after every zoom change, not just once at set-up, so the invariant
    /// survives resizes too.
    fn enforce_tile_cap(&mut self) {
        while self.zoom.is_finite()
            && self.zoom > 0.0
            && self.visible_tile_count() > MAX_VISIBLE_TILES
        {
            self.zoom *= ZOOM_STEP;
        }
    }

    pub fn set_display_size(&mut self, size: DisplayDelta) {
        self.display_size = size;
        self.enforce_tile_cap();
        self.touch();
    }

    /// Zooms by `steps` (four steps double the zoom), then keeps zooming in
    /// while the viewport would need more than the allowed tile count.
    pub fn step_zoom(&mut self, steps: i32) {
        self.zoom *= ZOOM_STEP.powi(steps);
        self.enforce_tile_cap();
        self.touch();
    }

    /// Like [`step_zoom`](Self::step_zoom), but keeps the world location
    /// under `anchor` fixed on screen by translating the center with the
    /// pre/post-zoom difference of the anchor's centered coordinate.
    pub fn step_zoom_at(&mut self, steps: i32, anchor: DisplayCoord) {
        let old_zoom = self.zoom;
        let centered = DisplayCoordCentered::from_display(anchor, self.display_size);
        self.step_zoom(steps);
        let correction = BaseMapDelta::new(
            centered.x / old_zoom - centered.x / self.zoom,
            centered.y / old_zoom - centered.y / self.zoom,
        );
        self.center = self.clamp_center(self.center + correction);
    }

    /// Switches the base map. When `try_preserve_pos` is set, the current
    /// center's lat/lon is mapped through the new map; if that point lies
    /// outside the new map, or either conversion is undefined, the view
    /// falls back to the new map's midpoint at zoom 1.0. Disjoint coverage
    /// between maps is a normal situation, so the fallback is part of the
    /// contract, not an error path.
    pub fn set_base_map(&mut self, new_map: Arc<dyn GeoDrawable>, try_preserve_pos: bool) {
        if try_preserve_pos {
            if let Some(preserved) = self.preserved_center(new_map.as_ref()) {
                self.base_map = new_map;
                self.center = preserved;
                self.touch();
                return;
            }
        }
        self.center = Self::midpoint_of(new_map.as_ref());
        self.base_map = new_map;
        self.zoom = 1.0;
        self.touch();
    }

    fn preserved_center(&self, new_map: &dyn GeoDrawable) -> Option<BaseMapCoord> {
        let latlon = self.base_map.pixel_to_latlon(self.center.as_map_pixel())?;
        let pixel = new_map.latlon_to_pixel(latlon)?;
        let inside = pixel.x >= 0.0
            && pixel.y >= 0.0
            && pixel.x <= new_map.width() as f64
            && pixel.y <= new_map.height() as f64;
        if inside {
            Some(BaseMapCoord::from(pixel))
        } else {
            None
        }
    }

    /// Drags the view by a display-space delta. The center never leaves
    /// the base map's pixel extent.
    pub fn move_center(&mut self, delta: DisplayDelta) {
        let map_delta = BaseMapDelta::new(delta.x / self.zoom, delta.y / self.zoom);
        self.center = self.clamp_center(self.center - map_delta);
        self.touch();
    }

    pub fn set_center(&mut self, center: BaseMapCoord) {
        self.center = self.clamp_center(center);
        self.touch();
    }

    pub fn add_overlay(&mut self, map: Arc<dyn GeoDrawable>) {
        self.overlays.push(OverlaySpec::new(map));
        self.touch();
    }

    pub fn remove_overlay(&mut self, index: usize) {
        self.overlays.remove(index);
        self.touch();
    }

    pub fn set_overlay_enabled(&mut self, index: usize, enabled: bool) {
        self.overlays[index].enabled = enabled;
        self.touch();
    }

    pub fn set_overlay_transparency(&mut self, index: usize, transparency: f64) {
        self.overlays[index].transparency = transparency.clamp(0.0, 1.0);
        self.touch();
    }

    /// Snapshot framed for off-screen export: the output size becomes the
    /// display size and zoom is pinned to 1:1. The interactive tile cap
    /// does not apply to export passes.
    pub fn pinned_for_export(&self, width: u32, height: u32) -> Self {
        let mut model = self.clone();
        model.display_size = DisplayDelta::new(width as f64, height as f64);
        model.zoom = 1.0;
        model.change_counter += 1;
        model
    }

    /// Serializable snapshot for session persistence.
    pub fn view_state(&self) -> ViewState {
        ViewState {
            base_map: self.base_map.fname(),
            center_x: self.center.x,
            center_y: self.center.y,
            zoom: self.zoom,
            overlays: self
                .overlays
                .iter()
                .map(|spec| OverlayState {
                    fname: spec.map.fname(),
                    enabled: spec.enabled,
                    transparency: spec.transparency,
                })
                .collect(),
        }
    }

    /// Rebuilds a view model from a persisted snapshot. Maps that fail to
    /// load come back as error sentinels, so a stale snapshot still
    /// produces a usable view.
    pub fn restore(state: &ViewState, display_size: DisplayDelta) -> Self {
        let base_map = load_map(&state.base_map);
        let mut model = Self::new(base_map, display_size);
        model.zoom = if state.zoom > 0.0 { state.zoom } else { 1.0 };
        model.center = model.clamp_center(BaseMapCoord::new(state.center_x, state.center_y));
        for overlay in &state.overlays {
            let mut spec = OverlaySpec::new(load_map(&overlay.fname));
            spec.enabled = overlay.enabled;
            spec.transparency = overlay.transparency.clamp(0.0, 1.0);
            model.overlays.push(spec);
        }
        model.enforce_tile_cap();
        model.touch();
        model
    }
}

/// Persisted per-overlay state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayState {
    pub fname: String,
    pub enabled: bool,
    pub transparency: f64,
}

/// Persisted view-model state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub base_map: String,
    pub center_x: f64,
    pub center_y: f64,
    pub zoom: f64,
    pub overlays: Vec<OverlayState>,
}

impl ViewState {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MapError::ParseError(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MapError::ParseError(e.to_string()))
    }
}
