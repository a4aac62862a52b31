// Core types shared by the positioning engine, the sampler and the host.

use crate::geometry::Vec2;
use image::RgbaImage;

/// Size of the screen the overlays live on. Fixed for one capture session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenBounds {
    pub width: u32,
    pub height: u32,
}

impl ScreenBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A circle on screen: the target reticle or the magnifier bubble.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircularRegion {
    pub center: Vec2,
    pub radius: f64,
}

impl CircularRegion {
    pub const fn new(center_x: f64, center_y: f64, radius: f64) -> Self {
        Self { center: Vec2::new(center_x, center_y), radius }
    }

    pub fn diameter(&self) -> f64 { self.radius * 2.0 }
    pub fn left(&self) -> f64 { self.center.x - self.radius }
    pub fn top(&self) -> f64 { self.center.y - self.radius }
    pub fn right(&self) -> f64 { self.center.x + self.radius }
    pub fn bottom(&self) -> f64 { self.center.y + self.radius }

    /// True when the whole bounding box is inside `[0,width] x [0,height]`.
    pub fn fits_within(&self, bounds: ScreenBounds) -> bool {
        self.left() >= 0.0
            && self.top() >= 0.0
            && self.right() <= bounds.width as f64
            && self.bottom() <= bounds.height as f64
    }

    /// Whether a point falls inside the circle.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (Vec2::new(x, y) - self.center).length() <= self.radius
    }
}

/// Integer screen coordinate sampled each capture cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanPoint {
    pub x: u32,
    pub y: u32,
}

/// One captured image in RGBA_8888 byte order.
/// Rows may carry padding: `row_stride >= pixel_stride * width`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl Frame {
    /// Build a 4-byte-per-pixel frame, padding every row with `row_padding` zero bytes.
    /// `rgba(x, y)` supplies each logical pixel.
    pub fn from_fn<F>(width: u32, height: u32, row_padding: usize, mut rgba: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        let pixel_stride = 4;
        let row_stride = width as usize * pixel_stride + row_padding;
        let mut pixels = vec![0u8; row_stride * height as usize];
        for y in 0..height {
            let row = y as usize * row_stride;
            for x in 0..width {
                let idx = row + x as usize * pixel_stride;
                pixels[idx..idx + 4].copy_from_slice(&rgba(x, y));
            }
        }
        Self { width, height, pixels, row_stride, pixel_stride }
    }
}

/// What one capture cycle produced for the magnifier.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleResult {
    /// `#RRGGBB`, uppercase, alpha dropped.
    pub hex_color: String,
    /// Square crop of side `crop_size` around the scan point.
    pub crop: RgbaImage,
    /// Coordinates actually used after clamping.
    pub scan_x: u32,
    pub scan_y: u32,
}

impl SampleResult {
    /// Coordinates as shown in the magnifier and copied to the clipboard.
    pub fn coordinates_label(&self) -> String {
        format!("{}, {}", self.scan_x, self.scan_y)
    }
}

/// Window-ready pixels for the demo host.
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the window is (pixels)
    pub height: usize,     // how tall the window is (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }
}
