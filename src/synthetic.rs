// A capture source that paints its own frames: color bands that drift a
// little every frame, rows padded like a real capture buffer.
// Used when no camera is available and by tests that need pixel-exact input.

use crate::capture::CaptureSource;
use crate::error::CaptureError;
use crate::types::Frame;

pub struct PatternSource {
    width: u32,
    height: u32,
    row_padding: usize,
    /// Only every n-th probe has a fresh frame, like a source slower than the loop.
    frame_every: u32,
    probes: u32,
    frame_index: u32,
    released: u32,
}

impl PatternSource {
    pub fn new(width: u32, height: u32, row_padding: usize) -> Self {
        Self {
            width,
            height,
            row_padding,
            frame_every: 1,
            probes: 0,
            frame_index: 0,
            released: 0,
        }
    }

    pub fn with_frame_every(mut self, n: u32) -> Self {
        self.frame_every = n.max(1);
        self
    }

    /// Color of logical pixel (x, y) in frame `index`.
    pub fn pixel(&self, x: u32, y: u32, index: u32) -> [u8; 4] {
        let w = self.width.max(1) as u64;
        let r = ((x as u64 + index as u64 * 2) % w * 255 / w) as u8;
        let g = (y * 255 / self.height.max(1)) as u8;
        let b = ((x / 16 + y / 16) % 2 * 0xC0) as u8;
        [r, g, b, 0xFF]
    }

    pub fn frames_produced(&self) -> u32 {
        self.frame_index
    }

    pub fn frames_released(&self) -> u32 {
        self.released
    }

    fn render(&mut self) -> Frame {
        let index = self.frame_index;
        let frame = Frame::from_fn(self.width, self.height, self.row_padding, |x, y| self.pixel(x, y, index));
        self.frame_index = self.frame_index.wrapping_add(1);
        frame
    }
}

impl CaptureSource for PatternSource {
    fn try_acquire_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.probes = self.probes.wrapping_add(1);
        if self.probes % self.frame_every != 0 {
            return Ok(None);
        }
        Ok(Some(self.render()))
    }

    fn release_frame(&mut self, _frame: Frame) {
        self.released += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_frames_are_padded() {
        let mut src = PatternSource::new(64, 32, 12);
        let frame = src.try_acquire_frame().unwrap().unwrap();
        assert_eq!(frame.row_stride, 64 * 4 + 12);
        assert_eq!(frame.pixels.len(), (64 * 4 + 12) * 32);
        src.release_frame(frame);
        assert_eq!(src.frames_produced(), 1);
        assert_eq!(src.frames_released(), 1);
    }

    #[test]
    fn test_frame_every_skips_probes() {
        let mut src = PatternSource::new(8, 8, 0).with_frame_every(3);
        let got: Vec<bool> = (0..6).map(|_| src.try_acquire_frame().unwrap().is_some()).collect();
        assert_eq!(got, vec![false, false, true, false, false, true]);
    }
}
