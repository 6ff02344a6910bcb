//! End-to-end scenarios: view model to display orders to composed pixels,
//! the way an application drives the pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use terraview::background::runner::TaskRunner;
use terraview::constants::TILE_SIZE;
use terraview::core::coords::{
    BaseMapCoord, DisplayDelta, LatLon, MapPixelCoord, MapPixelCoordInt, MapPixelDeltaInt,
};
use terraview::{
    render_view_to_buffer, DrawableType, GeoDrawable, GpsTrack, GradientMap, MapView,
    MapViewModel, PixelBuf, PixelFormat, Result, TiffMap,
};

/// Minimal in-memory map with a linear geographic model; stands in for a
/// loaded raster in every scenario below.
struct TestMap {
    width: u32,
    height: u32,
    origin: LatLon,
    degrees_per_pixel: f64,
    concurrent: bool,
    fill: u32,
    region_reads: AtomicUsize,
}

impl TestMap {
    fn new(width: u32, height: u32, origin: LatLon) -> Self {
        Self {
            width,
            height,
            origin,
            degrees_per_pixel: 0.0001,
            concurrent: false,
            fill: 0xFF80_8080,
            region_reads: AtomicUsize::new(0),
        }
    }

    fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }
}

impl GeoDrawable for TestMap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn drawable_type(&self) -> DrawableType {
        DrawableType::Map
    }

    fn title(&self) -> String {
        "test map".to_string()
    }

    fn description(&self) -> String {
        "in-memory test map".to_string()
    }

    fn fname(&self) -> String {
        "test.tif".to_string()
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::RgbTransparent
    }

    fn supports_concurrent_get_region(&self) -> bool {
        self.concurrent
    }

    fn get_region(&self, _topleft: MapPixelCoordInt, size: MapPixelDeltaInt) -> Result<PixelBuf> {
        self.region_reads.fetch_add(1, Ordering::SeqCst);
        let mut buf = PixelBuf::new(size.x as usize, size.y as usize);
        buf.fill(self.fill);
        Ok(buf)
    }

    fn pixel_to_latlon(&self, pos: MapPixelCoord) -> Option<LatLon> {
        Some(LatLon::new(
            self.origin.lat - pos.y * self.degrees_per_pixel,
            self.origin.lon + pos.x * self.degrees_per_pixel,
        ))
    }

    fn latlon_to_pixel(&self, pos: LatLon) -> Option<MapPixelCoord> {
        Some(MapPixelCoord::new(
            (pos.lon - self.origin.lon) / self.degrees_per_pixel,
            (self.origin.lat - pos.lat) / self.degrees_per_pixel,
        ))
    }
}

fn test_view() -> (MapView, Arc<TaskRunner>) {
    let runner = Arc::new(TaskRunner::new());
    (MapView::with_runner(Arc::new(|| {}), runner.clone()), runner)
}

#[test]
fn tiles_cover_the_visible_rectangle() {
    let base: Arc<dyn GeoDrawable> = Arc::new(TestMap::new(1024, 1024, LatLon::new(47.0, 11.0)));
    let model = MapViewModel::new(base, DisplayDelta::new(800.0, 600.0));
    assert_eq!(model.center(), BaseMapCoord::new(512.0, 512.0));
    assert_eq!(model.zoom(), 1.0);

    let (mut view, _runner) = test_view();
    let orders = view.generate(&model);

    // The visible base rectangle at zoom 1 is [112,212]..[912,812]; the
    // emitted tiles must cover it, clipped to the map, each tile exactly
    // 512x512 and aligned to multiples of 512.
    assert!(!orders.is_empty());
    let mut covered_min = (f64::INFINITY, f64::INFINITY);
    let mut covered_max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for order in orders {
        let tl = order.top_left();
        let br = order.bottom_right();
        let width = br.x - tl.x;
        let height = br.y - tl.y;
        assert_eq!(width, TILE_SIZE as f64);
        assert_eq!(height, TILE_SIZE as f64);

        // Back from centered display space to base pixels (zoom 1).
        let base_x = tl.x + 512.0;
        let base_y = tl.y + 512.0;
        assert_eq!(base_x.rem_euclid(TILE_SIZE as f64), 0.0);
        assert_eq!(base_y.rem_euclid(TILE_SIZE as f64), 0.0);

        covered_min.0 = covered_min.0.min(base_x);
        covered_min.1 = covered_min.1.min(base_y);
        covered_max.0 = covered_max.0.max(base_x + width);
        covered_max.1 = covered_max.1.max(base_y + height);
    }
    assert!(covered_min.0 <= 112.0 && covered_min.1 <= 212.0);
    assert!(covered_max.0 >= 912.0 && covered_max.1 >= 812.0);
    assert!(covered_max.0 <= 1024.0 && covered_max.1 <= 1024.0);
}

#[test]
fn switching_to_a_disjoint_base_map_recenters() {
    let alps: Arc<dyn GeoDrawable> = Arc::new(TestMap::new(2048, 2048, LatLon::new(47.0, 11.0)));
    let mut model = MapViewModel::new(alps, DisplayDelta::new(800.0, 600.0));
    model.step_zoom(6);
    let zoomed = model.zoom();
    assert!(zoomed > 1.0);

    // A map on another continent: no geographic overlap at all.
    let andes: Arc<dyn GeoDrawable> = Arc::new(TestMap::new(1000, 600, LatLon::new(-33.0, -70.0)));
    model.set_base_map(andes, true);

    assert_eq!(model.center(), BaseMapCoord::new(500.0, 300.0));
    assert_eq!(model.zoom(), 1.0);
}

#[test]
fn async_tiles_resolve_and_request_a_repaint() {
    let base: Arc<dyn GeoDrawable> =
        Arc::new(TestMap::new(1024, 1024, LatLon::new(47.0, 11.0)).concurrent());
    let model = MapViewModel::new(base, DisplayDelta::new(800.0, 600.0));

    let repaints = Arc::new(AtomicUsize::new(0));
    let counter = repaints.clone();
    let runner = Arc::new(TaskRunner::new());
    let mut view = MapView::with_runner(
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
        runner.clone(),
    );

    let order_count = view.generate(&model).len();
    assert_eq!(order_count, 4);

    // Wait for the background workers to resolve every tile.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let resolved = view
            .orders()
            .iter()
            .filter(|o| !o.promise().get_pixels().is_empty())
            .count();
        if resolved == order_count {
            break;
        }
        assert!(Instant::now() < deadline, "tiles never resolved");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(repaints.load(Ordering::SeqCst), order_count);

    // A redraw consumes the same orders without regeneration.
    assert!(!view.needs_generate(&model));
    assert!(view
        .orders()
        .iter()
        .all(|o| o.promise().cache_key().is_some()));
}

#[test]
fn unchanged_views_reuse_inflight_promises() {
    let base: Arc<dyn GeoDrawable> =
        Arc::new(TestMap::new(4096, 4096, LatLon::new(47.0, 11.0)).concurrent());
    let model = MapViewModel::new(base.clone(), DisplayDelta::new(800.0, 600.0));

    let (mut view, _runner) = test_view();
    let first: Vec<_> = view
        .generate(&model)
        .iter()
        .map(|o| o.promise().clone())
        .collect();
    let second: Vec<_> = view
        .generate(&model)
        .iter()
        .map(|o| o.promise().clone())
        .collect();
    for (a, b) in first.iter().zip(second.iter()) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn export_composes_base_and_overlays_synchronously() {
    let base: Arc<dyn GeoDrawable> = Arc::new(TestMap::new(256, 256, LatLon::new(47.0, 11.0)));
    let mut model = MapViewModel::new(base.clone(), DisplayDelta::new(256.0, 256.0));

    // A track crossing the middle of the map.
    let a = base.pixel_to_latlon(MapPixelCoord::new(0.0, 0.0)).unwrap();
    let b = base.pixel_to_latlon(MapPixelCoord::new(255.0, 255.0)).unwrap();
    let track: Arc<dyn GeoDrawable> = Arc::new(GpsTrack::new("run.json", vec![a, b]));
    model.add_overlay(track);
    model.set_overlay_transparency(0, 0.0);

    let out = render_view_to_buffer(&model, 256, 256);
    assert_eq!(out.width(), 256);
    assert_eq!(out.height(), 256);

    // Base fill everywhere, track color on the diagonal.
    let off_diagonal = out.get(200, 40);
    assert_eq!(off_diagonal & 0x00FF_FFFF, 0x0080_8080);
    let on_diagonal = out.get(128, 128);
    assert_ne!(on_diagonal & 0x00FF_FFFF, 0x0080_8080);
}

#[test]
fn gradient_overlay_over_a_dhm_produces_opaque_shading() {
    use terraview::layers::geotiff::{GeoReference, PixelCsTransform, Projection};

    let georef = GeoReference {
        transform: PixelCsTransform::TiepointScale {
            tie_raster: (0.0, 0.0),
            tie_model: (11.0, 47.0),
            scale: (0.001, 0.001),
        },
        projection: Projection::Geographic,
    };
    // A sloping DHM: elevation rises 50m per pixel southward.
    let mut samples = Vec::new();
    for y in 0..64 {
        for _x in 0..64 {
            samples.push((y * 50) as i16);
        }
    }
    let dhm = Arc::new(TiffMap::from_elevation("dhm.tif", 64, 64, samples, georef));
    assert_eq!(dhm.drawable_type(), DrawableType::Dhm);

    let gradient: Arc<dyn GeoDrawable> = Arc::new(GradientMap::new(dhm.clone()));
    let base: Arc<dyn GeoDrawable> = dhm;
    let mut model = MapViewModel::new(base, DisplayDelta::new(64.0, 64.0));
    model.add_overlay(gradient);
    model.set_overlay_transparency(0, 0.0);

    let out = render_view_to_buffer(&model, 64, 64);
    // Sloped terrain shades with saturated colors, fully opaque.
    let pixel = out.get(32, 32);
    assert_eq!(pixel >> 24, 0xFF);
    let [r, g, b, _] = pixel.to_le_bytes();
    assert!(r != g || g != b, "expected a saturated slope color");
}

#[test]
fn serialized_view_state_round_trips() {
    let base: Arc<dyn GeoDrawable> = Arc::new(TestMap::new(1024, 1024, LatLon::new(47.0, 11.0)));
    let mut model = MapViewModel::new(base, DisplayDelta::new(800.0, 600.0));
    model.step_zoom(4);
    model.move_center(DisplayDelta::new(-120.0, 60.0));

    let json = model.view_state().to_json().unwrap();
    let restored = terraview::ViewState::from_json(&json).unwrap();
    assert_eq!(restored, model.view_state());
    assert_eq!(restored.zoom, model.zoom());
}

#[test]
fn per_map_loads_serialize_on_one_worker() {
    // Two concurrent maps: each gets its own worker; loads for the same
    // map never overlap. The shared log records (map, begin/end) pairs.
    struct LoggingMap {
        inner: TestMap,
        id: usize,
        log: Arc<Mutex<Vec<(usize, &'static str)>>>,
    }

    impl GeoDrawable for LoggingMap {
        fn width(&self) -> u32 {
            self.inner.width
        }
        fn height(&self) -> u32 {
            self.inner.height
        }
        fn drawable_type(&self) -> DrawableType {
            DrawableType::Map
        }
        fn title(&self) -> String {
            self.inner.title()
        }
        fn description(&self) -> String {
            self.inner.description()
        }
        fn fname(&self) -> String {
            format!("logging-{}.tif", self.id)
        }
        fn pixel_format(&self) -> PixelFormat {
            PixelFormat::RgbTransparent
        }
        fn supports_concurrent_get_region(&self) -> bool {
            true
        }
        fn get_region(
            &self,
            topleft: MapPixelCoordInt,
            size: MapPixelDeltaInt,
        ) -> Result<PixelBuf> {
            self.log.lock().unwrap().push((self.id, "begin"));
            std::thread::sleep(Duration::from_millis(5));
            self.log.lock().unwrap().push((self.id, "end"));
            self.inner.get_region(topleft, size)
        }
        fn pixel_to_latlon(&self, pos: MapPixelCoord) -> Option<LatLon> {
            self.inner.pixel_to_latlon(pos)
        }
        fn latlon_to_pixel(&self, pos: LatLon) -> Option<MapPixelCoord> {
            self.inner.latlon_to_pixel(pos)
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let base: Arc<dyn GeoDrawable> = Arc::new(LoggingMap {
        inner: TestMap::new(2048, 2048, LatLon::new(47.0, 11.0)).concurrent(),
        id: 0,
        log: log.clone(),
    });
    let overlay: Arc<dyn GeoDrawable> = Arc::new(LoggingMap {
        inner: TestMap::new(2048, 2048, LatLon::new(47.0, 11.0)).concurrent(),
        id: 1,
        log: log.clone(),
    });

    let mut model = MapViewModel::new(base, DisplayDelta::new(800.0, 600.0));
    model.add_overlay(overlay);

    let runner = Arc::new(TaskRunner::new());
    let mut view = MapView::with_runner(Arc::new(|| {}), runner.clone());
    view.generate(&model);
    runner.shutdown();

    let log = log.lock().unwrap();
    assert!(!log.is_empty());
    // Within each map id, begin/end strictly alternate: FIFO, no overlap.
    for id in [0, 1] {
        let events: Vec<_> = log.iter().filter(|(i, _)| *i == id).collect();
        assert!(events.chunks(2).all(|c| c[0].1 == "begin" && c[1].1 == "end"));
    }
}
