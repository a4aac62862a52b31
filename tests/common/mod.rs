//! Shared helpers for integration tests.

#![allow(dead_code)]

use color_loupe::capture::CaptureSource;
use color_loupe::error::CaptureError;
use color_loupe::types::Frame;
use std::collections::VecDeque;

/// Capture source that plays back a fixed script, then reports "no frame".
#[derive(Default)]
pub struct ScriptedSource {
    pub script: VecDeque<Result<Option<Frame>, CaptureError>>,
    pub acquired: usize,
    pub released: usize,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = Result<Option<Frame>, CaptureError>>) -> Self {
        Self { script: steps.into_iter().collect(), acquired: 0, released: 0 }
    }
}

impl CaptureSource for ScriptedSource {
    fn try_acquire_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let step = self.script.pop_front().unwrap_or(Ok(None));
        if matches!(step, Ok(Some(_))) {
            self.acquired += 1;
        }
        step
    }

    fn release_frame(&mut self, _frame: Frame) {
        self.released += 1;
    }
}

/// Every pixel gets a distinct color so misplaced reads show up.
pub fn unique_frame(width: u32, height: u32, padding: usize) -> Frame {
    Frame::from_fn(width, height, padding, |x, y| unique_pixel(x, y))
}

pub fn unique_pixel(x: u32, y: u32) -> [u8; 4] {
    [(x * 5) as u8, (y * 7) as u8, ((x + y) * 3) as u8, 0xFF]
}

/// Tiny deterministic generator for drag sequences.
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next_delta(&mut self, span: f64) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let unit = (self.0 >> 11) as f64 / (1u64 << 53) as f64;
        (unit * 2.0 - 1.0) * span
    }
}
