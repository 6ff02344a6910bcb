//! Pixel promises: deferred handles decoupling "tile requested" from "tile
//! pixel data ready".
//!
//! The UI/render thread never blocks on tile I/O. Async promises resolve on
//! the background runner and hand back an empty placeholder until then;
//! synchronous promises resolve on first read and are only appropriate for
//! known-fast sources or explicit export passes.

use once_cell::sync::{Lazy, OnceCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::background::runner::TaskRunner;
use crate::core::coords::{MapPixelCoord, MapPixelDeltaInt};
use crate::layers::base::{GeoDrawable, PixelFormat};
use crate::tiles::code::TileCode;
use crate::tiles::pixelbuf::PixelBuf;

/// Invoked when an async promise resolves; must be safe to call from any
/// thread ("repaint requested", not "repaint now").
pub type RepaintCallback = Arc<dyn Fn() + Send + Sync>;

static EMPTY_PIXELS: Lazy<Arc<PixelBuf>> = Lazy::new(|| Arc::new(PixelBuf::empty()));

/// Shared zero-size buffer handed out while pixel data is not ready.
pub fn empty_pixels() -> Arc<PixelBuf> {
    EMPTY_PIXELS.clone()
}

pub trait PixelPromise: Send + Sync {
    /// The resolved pixel data, or the empty placeholder if not yet ready.
    /// Never blocks for async promises; may block (and resolve) for
    /// synchronous ones.
    fn get_pixels(&self) -> Arc<PixelBuf>;

    fn pixel_format(&self) -> PixelFormat;

    /// Cache key for the resolved pixels. `None` until real data exists,
    /// so placeholder buffers can never be cached, and `None` always for
    /// direct-draw promises, which have no stable key.
    fn cache_key(&self) -> Option<&TileCode>;
}

/// Synchronously resolved tile promise. Resolution happens on the first
/// `get_pixels` call, on the calling thread.
pub struct PixelPromiseTiled {
    code: TileCode,
    pixels: OnceCell<Arc<PixelBuf>>,
}

impl PixelPromiseTiled {
    pub fn new(code: TileCode) -> Self {
        Self {
            code,
            pixels: OnceCell::new(),
        }
    }
}

impl PixelPromise for PixelPromiseTiled {
    fn get_pixels(&self) -> Arc<PixelBuf> {
        self.pixels
            .get_or_init(|| Arc::new(self.code.get_tile()))
            .clone()
    }

    fn pixel_format(&self) -> PixelFormat {
        self.code.map().pixel_format()
    }

    fn cache_key(&self) -> Option<&TileCode> {
        self.pixels.get().map(|_| &self.code)
    }
}

struct AsyncTileState {
    pixels: OnceCell<Arc<PixelBuf>>,
    aborted: AtomicBool,
}

/// Tile promise resolved on the background runner, serialized per source
/// map. `get_pixels` polls and never blocks. Dropping the promise sets a
/// best-effort abort flag: a job that has not started becomes a no-op, a
/// running job finishes and its result goes unconsumed.
pub struct PixelPromiseTiledAsync {
    code: TileCode,
    state: Arc<AsyncTileState>,
}

impl PixelPromiseTiledAsync {
    pub fn new(code: TileCode, runner: &TaskRunner, repaint: RepaintCallback) -> Self {
        let state = Arc::new(AsyncTileState {
            pixels: OnceCell::new(),
            aborted: AtomicBool::new(false),
        });
        let job_state = state.clone();
        let job_code = code.clone();
        runner.submit(
            code.map_id(),
            Box::new(move || {
                if job_state.aborted.load(Ordering::Relaxed) {
                    return;
                }
                log::debug!("resolving tile {:?}", job_code);
                let pixels = Arc::new(job_code.get_tile());
                if job_state.pixels.set(pixels).is_ok() {
                    repaint();
                }
            }),
        );
        Self { code, state }
    }

    pub fn is_resolved(&self) -> bool {
        self.state.pixels.get().is_some()
    }
}

impl PixelPromise for PixelPromiseTiledAsync {
    fn get_pixels(&self) -> Arc<PixelBuf> {
        self.state
            .pixels
            .get()
            .cloned()
            .unwrap_or_else(empty_pixels)
    }

    fn pixel_format(&self) -> PixelFormat {
        self.code.map().pixel_format()
    }

    fn cache_key(&self) -> Option<&TileCode> {
        self.state.pixels.get().map(|_| &self.code)
    }
}

impl Drop for PixelPromiseTiledAsync {
    fn drop(&mut self) {
        self.state.aborted.store(true, Ordering::Relaxed);
    }
}

/// Full-frame promise for direct-drawing overlays (tracks, gridlines).
/// Always synchronous, regenerated every frame, never cached.
pub struct PixelPromiseDirect {
    map: Arc<dyn GeoDrawable>,
    base: Arc<dyn GeoDrawable>,
    output_size: MapPixelDeltaInt,
    base_tl: MapPixelCoord,
    base_br: MapPixelCoord,
}

impl PixelPromiseDirect {
    pub fn new(
        map: Arc<dyn GeoDrawable>,
        base: Arc<dyn GeoDrawable>,
        output_size: MapPixelDeltaInt,
        base_tl: MapPixelCoord,
        base_br: MapPixelCoord,
    ) -> Self {
        assert!(
            map.supports_direct_drawing(),
            "direct promise built for a layer without direct-draw support"
        );
        Self {
            map,
            base,
            output_size,
            base_tl,
            base_br,
        }
    }
}

impl PixelPromise for PixelPromiseDirect {
    fn get_pixels(&self) -> Arc<PixelBuf> {
        match self.map.get_region_direct(
            self.output_size,
            self.base.as_ref(),
            self.base_tl,
            self.base_br,
        ) {
            Ok(buf) => Arc::new(buf),
            Err(e) => {
                log::warn!("direct draw failed on '{}': {}", self.map.fname(), e);
                empty_pixels()
            }
        }
    }

    fn pixel_format(&self) -> PixelFormat {
        self.map.pixel_format()
    }

    fn cache_key(&self) -> Option<&TileCode> {
        None
    }
}
