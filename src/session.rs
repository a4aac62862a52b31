// One picker session: positioning, capture loop, settings and the render
// sink, all driven from the host's single event loop.
//
// Drag events and capture ticks go through the same `&mut self`, so the
// scan point read by a tick is never a half-updated target position.

use crate::capture::{CaptureLoop, CaptureSource, LoopState, TickOutcome};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::positioning::{GapPolicy, PositioningEngine};
use crate::render::RenderSink;
use crate::types::{ScanPoint, ScreenBounds};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Shared "picker is running" state, owned by the host and handed in.
#[derive(Clone, Debug, Default)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, running: bool) {
        self.0.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct PickerSession<S: CaptureSource, R: RenderSink> {
    engine: PositioningEngine,
    capture: CaptureLoop<S>,
    sink: R,
    config: CaptureConfig,
    running: RunningFlag,
}

impl<S: CaptureSource, R: RenderSink> PickerSession<S, R> {
    pub fn new(source: S, sink: R, config: CaptureConfig, gap_policy: GapPolicy, running: RunningFlag) -> Self {
        Self {
            engine: PositioningEngine::new(gap_policy),
            capture: CaptureLoop::new(source),
            sink,
            config,
            running,
        }
    }

    /// Lay out the overlays for `bounds` and start capturing.
    /// Calling it again (e.g. after a rotation) restarts with the new bounds.
    pub fn start(&mut self, bounds: ScreenBounds, target_radius: f64, now: Instant) {
        self.engine.initialize(bounds, target_radius, self.config.magnifier_radius());
        self.sink.on_grid_lines_changed(self.config.show_grid_lines);
        self.notify_regions();
        self.capture.start(now);
        self.running.set(true);
        info!("picker session started on {}x{}", bounds.width, bounds.height);
    }

    /// Returns whether the magnifier moved along with the target.
    pub fn drag_target(&mut self, dx: f64, dy: f64) -> bool {
        let before = *self.engine.target();
        let magnifier_moved = self.engine.drag_target(dx, dy);
        if magnifier_moved || *self.engine.target() != before {
            self.notify_regions();
        }
        magnifier_moved
    }

    pub fn fine_tune(&mut self, dx: f64, dy: f64) -> bool {
        let before = *self.engine.target();
        let magnifier_moved = self.engine.fine_tune(dx, dy);
        if magnifier_moved || *self.engine.target() != before {
            self.notify_regions();
        }
        magnifier_moved
    }

    /// Swap in new settings. Delay and crop size apply from the next tick;
    /// a new magnifier size repositions the bubble right away.
    pub fn update_config(&mut self, config: CaptureConfig) {
        let resized = config.magnifier_diameter_px != self.config.magnifier_diameter_px;
        let grid_changed = config.show_grid_lines != self.config.show_grid_lines;
        self.config = config;

        if grid_changed {
            self.sink.on_grid_lines_changed(self.config.show_grid_lines);
        }
        if resized {
            debug!(diameter = self.config.magnifier_diameter_px, "magnifier resized");
            self.engine.set_magnifier_radius(self.config.magnifier_radius());
            self.notify_regions();
        }
    }

    /// Drive the capture loop. Capture loss ends the session.
    pub fn poll(&mut self, now: Instant) -> Result<Option<TickOutcome>, CaptureError> {
        let scan = self.engine.compute_scan_point();
        let result = self.capture.poll(now, scan, &self.config, &mut self.sink);
        if result.is_err() {
            self.running.set(false);
        }
        result
    }

    pub fn stop(&mut self) {
        self.capture.stop();
        if self.running.is_running() {
            info!("picker session stopped");
        }
        self.running.set(false);
    }

    pub fn scan_point(&self) -> ScanPoint {
        self.engine.compute_scan_point()
    }

    pub fn engine(&self) -> &PositioningEngine { &self.engine }
    pub fn config(&self) -> &CaptureConfig { &self.config }
    pub fn sink(&self) -> &R { &self.sink }
    pub fn sink_mut(&mut self) -> &mut R { &mut self.sink }
    pub fn source(&self) -> &S { self.capture.source() }
    pub fn source_mut(&mut self) -> &mut S { self.capture.source_mut() }
    pub fn loop_state(&self) -> LoopState { self.capture.state() }
    pub fn is_running(&self) -> bool { self.running.is_running() }

    fn notify_regions(&mut self) {
        self.sink.on_regions_changed(self.engine.target(), self.engine.magnifier());
    }
}
