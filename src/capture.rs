// Cooperative capture loop.
//
// The host calls `poll(now)` from its own event loop. When a tick is due the
// loop probes the source for the newest frame (never waits for one), samples
// it, hands the frame straight back, publishes the result and schedules the
// next tick `capture_delay_ms` later. At most one frame is held, and only
// for the duration of a tick.

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::render::RenderSink;
use crate::sampler::FrameSampler;
use crate::types::{Frame, ScanPoint};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Platform capture boundary: "give me the latest frame, if any".
pub trait CaptureSource {
    /// Non-blocking. `Ok(None)` just means nothing new is ready yet.
    /// An error is terminal for the session.
    fn try_acquire_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Give a frame back once its pixels have been extracted.
    fn release_frame(&mut self, frame: Frame);
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn try_acquire_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).try_acquire_frame()
    }

    fn release_frame(&mut self, frame: Frame) {
        (**self).release_frame(frame)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Created, not started yet.
    Idle,
    Running,
    /// Cancelled by `stop`.
    Stopped,
    /// The source reported a terminal error; restarting is up to the host.
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A result went to the sink.
    Sampled,
    /// The source had nothing new.
    NoFrame,
    /// A frame arrived but could not be sampled; the last result stays up.
    Skipped,
    /// The loop is not running; nothing was done.
    Inactive,
}

pub struct CaptureLoop<S: CaptureSource> {
    source: S,
    sampler: FrameSampler,
    state: LoopState,
    next_tick: Option<Instant>,
}

impl<S: CaptureSource> CaptureLoop<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            sampler: FrameSampler::new(),
            state: LoopState::Idle,
            next_tick: None,
        }
    }

    /// Begin (or restart) ticking; the first tick is due immediately.
    pub fn start(&mut self, now: Instant) {
        info!("capture loop started");
        self.state = LoopState::Running;
        self.next_tick = Some(now);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.state == LoopState::Running && self.next_tick.is_some_and(|t| now >= t)
    }

    /// Run a tick if one is due. `Ok(None)` when it was not time yet.
    pub fn poll(
        &mut self,
        now: Instant,
        scan: ScanPoint,
        config: &CaptureConfig,
        sink: &mut dyn RenderSink,
    ) -> Result<Option<TickOutcome>, CaptureError> {
        if !self.is_due(now) {
            return Ok(None);
        }
        self.tick(now, scan, config, sink).map(Some)
    }

    /// One capture cycle. Reads `config` fresh, so edits apply here at the earliest.
    pub fn tick(
        &mut self,
        now: Instant,
        scan: ScanPoint,
        config: &CaptureConfig,
        sink: &mut dyn RenderSink,
    ) -> Result<TickOutcome, CaptureError> {
        if self.state != LoopState::Running {
            return Ok(TickOutcome::Inactive);
        }

        let outcome = match self.source.try_acquire_frame() {
            Err(err) => {
                error!("capture stopped: {err}");
                self.state = LoopState::Lost;
                self.next_tick = None;
                self.sampler.release();
                return Err(err);
            }
            Ok(None) => TickOutcome::NoFrame,
            Ok(Some(frame)) => {
                let result = self.sampler.sample(&frame, scan, config.crop_size);
                self.source.release_frame(frame);
                match result {
                    Ok(sample) => {
                        sink.on_sample(sample);
                        TickOutcome::Sampled
                    }
                    Err(err) => {
                        warn!("skipping capture cycle: {err}");
                        TickOutcome::Skipped
                    }
                }
            }
        };

        let next = now + config.capture_delay();
        debug!(?outcome, delay_ms = config.capture_delay_ms, "capture tick");
        self.next_tick = Some(next);
        Ok(outcome)
    }

    /// Cancel the pending tick and drop sampling buffers. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            info!("capture loop stopped");
        }
        if self.state != LoopState::Lost {
            self.state = LoopState::Stopped;
        }
        self.next_tick = None;
        self.sampler.release();
    }

    pub fn state(&self) -> LoopState { self.state }
    pub fn next_tick(&self) -> Option<Instant> { self.next_tick }
    pub fn source(&self) -> &S { &self.source }
    pub fn source_mut(&mut self) -> &mut S { &mut self.source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CircularRegion, SampleResult};
    use std::collections::VecDeque;
    use std::time::Duration;

    #[derive(Default)]
    struct Queue {
        frames: VecDeque<Result<Option<Frame>, CaptureError>>,
        released: usize,
    }

    impl CaptureSource for Queue {
        fn try_acquire_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            self.frames.pop_front().unwrap_or(Ok(None))
        }
        fn release_frame(&mut self, _frame: Frame) {
            self.released += 1;
        }
    }

    #[derive(Default)]
    struct Collect(Vec<SampleResult>);

    impl RenderSink for Collect {
        fn on_sample(&mut self, sample: SampleResult) {
            self.0.push(sample);
        }
        fn on_regions_changed(&mut self, _: &CircularRegion, _: &CircularRegion) {}
    }

    fn frame() -> Frame {
        Frame::from_fn(32, 32, 0, |x, y| [x as u8, y as u8, 0, 255])
    }

    #[test]
    fn test_not_due_before_start() {
        let mut lp = CaptureLoop::new(Queue::default());
        let now = Instant::now();
        let mut sink = Collect::default();
        assert_eq!(lp.state(), LoopState::Idle);
        assert_eq!(lp.poll(now, ScanPoint::default(), &CaptureConfig::default(), &mut sink), Ok(None));
    }

    #[test]
    fn test_tick_samples_and_releases() {
        let mut q = Queue::default();
        q.frames.push_back(Ok(Some(frame())));
        let mut lp = CaptureLoop::new(q);
        let now = Instant::now();
        lp.start(now);
        let mut sink = Collect::default();
        let cfg = CaptureConfig::default();
        let out = lp.poll(now, ScanPoint { x: 3, y: 4 }, &cfg, &mut sink).unwrap();
        assert_eq!(out, Some(TickOutcome::Sampled));
        assert_eq!(lp.source().released, 1);
        assert_eq!(sink.0[0].hex_color, "#030400");
        assert_eq!(lp.next_tick(), Some(now + Duration::from_millis(50)));
        // Not due again until the delay has passed
        assert!(!lp.is_due(now + Duration::from_millis(49)));
        assert!(lp.is_due(now + Duration::from_millis(50)));
    }

    #[test]
    fn test_bad_frame_is_skipped_and_released() {
        let mut q = Queue::default();
        let mut bad = frame();
        bad.pixels.clear();
        q.frames.push_back(Ok(Some(bad)));
        let mut lp = CaptureLoop::new(q);
        let now = Instant::now();
        lp.start(now);
        let mut sink = Collect::default();
        let out = lp.tick(now, ScanPoint::default(), &CaptureConfig::default(), &mut sink);
        assert_eq!(out, Ok(TickOutcome::Skipped));
        assert_eq!(lp.source().released, 1);
        assert!(sink.0.is_empty());
        assert_eq!(lp.state(), LoopState::Running);
    }

    #[test]
    fn test_capture_lost_stops_loop() {
        let mut q = Queue::default();
        q.frames.push_back(Err(CaptureError::CaptureLost("revoked".into())));
        let mut lp = CaptureLoop::new(q);
        let now = Instant::now();
        lp.start(now);
        let mut sink = Collect::default();
        let err = lp.tick(now, ScanPoint::default(), &CaptureConfig::default(), &mut sink);
        assert!(matches!(err, Err(CaptureError::CaptureLost(_))));
        assert_eq!(lp.state(), LoopState::Lost);
        assert_eq!(lp.next_tick(), None);
        // stop() keeps the Lost state
        lp.stop();
        assert_eq!(lp.state(), LoopState::Lost);
    }

    #[test]
    fn test_stop_is_idempotent_and_final() {
        let mut q = Queue::default();
        q.frames.push_back(Ok(Some(frame())));
        let mut lp = CaptureLoop::new(q);
        let now = Instant::now();
        lp.start(now);
        lp.stop();
        lp.stop();
        assert_eq!(lp.state(), LoopState::Stopped);
        let mut sink = Collect::default();
        let out = lp.tick(now, ScanPoint::default(), &CaptureConfig::default(), &mut sink);
        assert_eq!(out, Ok(TickOutcome::Inactive));
        // The queued frame was never touched
        assert_eq!(lp.source().frames.len(), 1);
        assert!(sink.0.is_empty());
    }
}
