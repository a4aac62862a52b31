// Turns one raw captured frame into the magnifier's reading:
// the color under the scan point plus a small square crop around it.
//
// Capture buffers often pad every row to an alignment boundary, so rows are
// addressed through `row_stride`, never through `width * pixel_stride`.

use crate::error::SampleError;
use crate::types::{Frame, SampleResult, ScanPoint};
use image::imageops;
use image::{Rgba, RgbaImage};

/// Formats an RGB color as `#RRGGBB`.
#[inline]
pub fn format_hex_color(r: u8, g: u8, b: u8) -> String {
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

/// Row length in pixels including padding columns.
/// `width + (row_stride - pixel_stride * width) / pixel_stride`
pub fn logical_width(frame: &Frame) -> Result<u32, SampleError> {
    if frame.pixel_stride < 3 {
        return Err(SampleError::MalformedFrame(format!(
            "pixel stride {} is too small for RGB",
            frame.pixel_stride
        )));
    }
    let Some(packed) = frame.pixel_stride.checked_mul(frame.width as usize) else {
        return Err(SampleError::MalformedFrame(format!("pixel stride {} overflows a row", frame.pixel_stride)));
    };
    if frame.row_stride < packed {
        return Err(SampleError::MalformedFrame(format!(
            "row stride {} shorter than {} bytes of pixels",
            frame.row_stride, packed
        )));
    }
    let padding = (frame.row_stride - packed) / frame.pixel_stride;
    u32::try_from(padding)
        .ok()
        .and_then(|p| frame.width.checked_add(p))
        .ok_or_else(|| SampleError::MalformedFrame(format!("row stride {} is implausibly large", frame.row_stride)))
}

/// Owns the reusable pixel grid so each cycle avoids a full-frame allocation.
#[derive(Default)]
pub struct FrameSampler {
    grid: Option<RgbaImage>,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self { grid: None }
    }

    /// Read the color at `scan` and a `crop_size` square around it.
    pub fn sample(&mut self, frame: &Frame, scan: ScanPoint, crop_size: u32) -> Result<SampleResult, SampleError> {
        if frame.pixels.is_empty() {
            return Err(SampleError::MissingBuffer);
        }
        if frame.width == 0 || frame.height == 0 {
            return Err(SampleError::MalformedFrame("empty frame dimensions".into()));
        }
        if crop_size == 0 || crop_size >= frame.width.min(frame.height) {
            return Err(SampleError::InvalidCropSize {
                crop_size,
                width: frame.width,
                height: frame.height,
            });
        }

        let lw = logical_width(frame)?;
        // A row stride longer than the whole buffer can't describe real rows.
        if frame.row_stride > frame.pixels.len() {
            return Err(SampleError::MalformedFrame(format!(
                "row stride {} exceeds the {}-byte buffer",
                frame.row_stride,
                frame.pixels.len()
            )));
        }
        let needed = frame
            .row_stride
            .checked_mul(frame.height as usize - 1)
            .and_then(|rows| rows.checked_add(frame.pixel_stride.checked_mul(frame.width as usize)?));
        match needed {
            Some(needed) if frame.pixels.len() >= needed => {}
            Some(needed) => {
                return Err(SampleError::MalformedFrame(format!(
                    "buffer holds {} bytes, need at least {}",
                    frame.pixels.len(),
                    needed
                )));
            }
            None => return Err(SampleError::MalformedFrame("frame layout overflows".into())),
        }

        let grid = self.grid_for(lw, frame.height);
        fill_grid(grid, frame);

        // Clamp into the grid, then read the pixel under the scan point.
        let x = scan.x.min(lw - 1);
        let y = scan.y.min(frame.height - 1);
        let Rgba([r, g, b, _]) = *grid.get_pixel(x, y);

        // Centered crop, shifted back inside the grid instead of shrunk.
        let half = crop_size / 2;
        let crop_x = x.saturating_sub(half).min(lw - crop_size);
        let crop_y = y.saturating_sub(half).min(frame.height - crop_size);
        let crop = imageops::crop_imm(&*grid, crop_x, crop_y, crop_size, crop_size).to_image();

        Ok(SampleResult {
            hex_color: format_hex_color(r, g, b),
            crop,
            scan_x: x,
            scan_y: y,
        })
    }

    /// Drop the cached grid (session stopped or lost).
    pub fn release(&mut self) {
        self.grid = None;
    }

    pub fn grid_dimensions(&self) -> Option<(u32, u32)> {
        self.grid.as_ref().map(|g| g.dimensions())
    }

    fn grid_for(&mut self, width: u32, height: u32) -> &mut RgbaImage {
        let reuse = matches!(&self.grid, Some(g) if g.dimensions() == (width, height));
        if !reuse {
            self.grid = Some(RgbaImage::new(width, height));
        }
        self.grid.get_or_insert_with(|| RgbaImage::new(width, height))
    }
}

/// Copy the raw buffer into the grid, one padded row at a time.
/// Bytes the buffer does not cover (a short final row) read as zero.
fn fill_grid(grid: &mut RgbaImage, frame: &Frame) {
    let (lw, h) = grid.dimensions();
    let src = &frame.pixels;
    let row_bytes = lw as usize * 4;
    let dst: &mut [u8] = &mut **grid;

    if frame.pixel_stride == 4 {
        // Same layout as the grid: plain row copies.
        for y in 0..h as usize {
            let row = src.get(y * frame.row_stride..).unwrap_or(&[]);
            let out = &mut dst[y * row_bytes..(y + 1) * row_bytes];
            let n = row_bytes.min(row.len());
            out[..n].copy_from_slice(&row[..n]);
            out[n..].fill(0);
        }
        return;
    }

    for y in 0..h as usize {
        for x in 0..lw as usize {
            let at = y * frame.row_stride + x * frame.pixel_stride;
            let o = (y * lw as usize + x) * 4;
            if at + 3 <= src.len() {
                dst[o..o + 3].copy_from_slice(&src[at..at + 3]);
                dst[o + 3] = 255;
            } else {
                dst[o..o + 4].fill(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, padding: usize) -> Frame {
        Frame::from_fn(width, height, padding, |x, y| [x as u8, y as u8, 0x80, 0xFF])
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex_color(255, 0, 128), "#FF0080");
        assert_eq!(format_hex_color(0, 0, 0), "#000000");
    }

    #[test]
    fn test_logical_width_counts_padding() {
        assert_eq!(logical_width(&gradient(10, 2, 0)).unwrap(), 10);
        assert_eq!(logical_width(&gradient(10, 2, 16)).unwrap(), 14);
        // 6 bytes of padding only hold one whole extra pixel
        assert_eq!(logical_width(&gradient(10, 2, 6)).unwrap(), 11);
    }

    #[test]
    fn test_sample_reads_pixel_and_drops_alpha() {
        let frame = Frame::from_fn(20, 20, 0, |_, _| [0x12, 0xAB, 0x0F, 0x00]);
        let mut sampler = FrameSampler::new();
        let out = sampler.sample(&frame, ScanPoint { x: 5, y: 5 }, 4).unwrap();
        assert_eq!(out.hex_color, "#12AB0F");
        assert_eq!(out.crop.dimensions(), (4, 4));
    }

    #[test]
    fn test_scan_point_is_clamped() {
        let mut sampler = FrameSampler::new();
        let out = sampler.sample(&gradient(30, 20, 0), ScanPoint { x: 500, y: 500 }, 5).unwrap();
        assert_eq!((out.scan_x, out.scan_y), (29, 19));
        assert_eq!(out.hex_color, "#1D1380");
    }

    #[test]
    fn test_invalid_crop_size() {
        let mut sampler = FrameSampler::new();
        let frame = gradient(30, 20, 0);
        for bad in [0, 20, 25] {
            let err = sampler.sample(&frame, ScanPoint::default(), bad).unwrap_err();
            assert!(matches!(err, SampleError::InvalidCropSize { crop_size, .. } if crop_size == bad));
        }
    }

    #[test]
    fn test_missing_and_malformed_buffers() {
        let mut sampler = FrameSampler::new();
        let mut frame = gradient(10, 10, 0);
        frame.pixels.clear();
        assert_eq!(sampler.sample(&frame, ScanPoint::default(), 3), Err(SampleError::MissingBuffer));

        let mut frame = gradient(10, 10, 0);
        frame.row_stride = 20;
        assert!(matches!(
            sampler.sample(&frame, ScanPoint::default(), 3),
            Err(SampleError::MalformedFrame(_))
        ));

        let mut frame = gradient(10, 10, 0);
        frame.pixels.truncate(100);
        assert!(matches!(
            sampler.sample(&frame, ScanPoint::default(), 3),
            Err(SampleError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_huge_strides_are_malformed_not_a_panic() {
        let mut sampler = FrameSampler::new();
        for (height, row_stride) in [(2, usize::MAX), (3, usize::MAX / 2), (2, 1 << 33)] {
            let frame = Frame { width: 10, height, pixels: vec![0; 100], row_stride, pixel_stride: 4 };
            assert!(
                matches!(sampler.sample(&frame, ScanPoint::default(), 1), Err(SampleError::MalformedFrame(_))),
                "height {height} stride {row_stride}"
            );
        }
        let frame = Frame { width: 10, height: 2, pixels: vec![0; 100], row_stride: 40, pixel_stride: usize::MAX };
        assert!(matches!(sampler.sample(&frame, ScanPoint::default(), 1), Err(SampleError::MalformedFrame(_))));

        // Padding too wide to count in u32 columns
        let frame = Frame { width: 10, height: 1, pixels: vec![0; 100], row_stride: usize::MAX, pixel_stride: 4 };
        assert!(matches!(logical_width(&frame), Err(SampleError::MalformedFrame(_))));
    }

    #[test]
    fn test_grid_is_reused_until_size_changes() {
        let mut sampler = FrameSampler::new();
        sampler.sample(&gradient(16, 8, 16), ScanPoint::default(), 3).unwrap();
        assert_eq!(sampler.grid_dimensions(), Some((20, 8)));
        sampler.sample(&gradient(16, 8, 16), ScanPoint::default(), 3).unwrap();
        assert_eq!(sampler.grid_dimensions(), Some((20, 8)));
        sampler.sample(&gradient(12, 8, 0), ScanPoint::default(), 3).unwrap();
        assert_eq!(sampler.grid_dimensions(), Some((12, 8)));
        sampler.release();
        assert_eq!(sampler.grid_dimensions(), None);
    }

    #[test]
    fn test_three_byte_pixels() {
        let frame = Frame {
            width: 4,
            height: 4,
            pixels: (0..48).map(|i| i as u8).collect(),
            row_stride: 12,
            pixel_stride: 3,
        };
        let mut sampler = FrameSampler::new();
        let out = sampler.sample(&frame, ScanPoint { x: 1, y: 1 }, 2).unwrap();
        // offset = 1 * 12 + 1 * 3 = 15
        assert_eq!(out.hex_color, "#0F1011");
    }
}
