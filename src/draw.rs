// Window + software drawing for the demo host.
// Visual effects provided here:
// 1) A window that shows the captured frame as the "screen".
// 2) The target reticle (three grey rings) over the scan point.
// 3) The magnifier: zoomed crop, grid, centre-pixel box, color bezel, readouts.
// 4) A tiny 5x7 bitmap font for the hex/coordinate labels.

use color_loupe::error::AppError;
use color_loupe::render::{Label, RenderModel};
use color_loupe::types::{CircularRegion, Frame, FrameBuffer};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

const GRID_SHADOW: u32 = 0x40_000000;
const GRID_MAIN: u32 = 0x80_FFFFFF;
const DARK_TEXT: u32 = 0xFF_0F0F10;
const LIGHT_TEXT: u32 = 0xFF_F2F2F4;
const DARK_BORDER: u32 = 0xFF_666666;
const LIGHT_BORDER: u32 = 0xFF_999999;

pub struct Drawer {
    window: Window, // the on-screen window you see
}

impl Drawer {
    /// Create a window sized to the capture feed.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, AppError> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| AppError::WindowInit(e.to_string()))?;
        window.set_target_fps(120);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), AppError> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| AppError::WindowUpdate(e.to_string()))
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Current mouse position in window pixel coordinates (clamped to the window).
    pub fn mouse_pos(&self) -> Option<(f64, f64)> {
        self.window
            .get_mouse_pos(MouseMode::Clamp)
            .map(|(x, y)| (x as f64, y as f64))
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// G flips the magnifier grid.
    pub fn g_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::G, KeyRepeat::No)
    }

    /// 1/2/3 pick the small/medium/large magnifier.
    pub fn size_key_pressed(&self) -> Option<usize> {
        [Key::Key1, Key::Key2, Key::Key3]
            .into_iter()
            .position(|k| self.window.is_key_pressed(k, KeyRepeat::No))
    }

    /// Arrow keys nudge the target one pixel at a time.
    pub fn arrow_delta(&self) -> Option<(f64, f64)> {
        let pressed = |k| self.window.is_key_pressed(k, KeyRepeat::Yes);
        let dx = pressed(Key::Right) as i32 - pressed(Key::Left) as i32;
        let dy = pressed(Key::Down) as i32 - pressed(Key::Up) as i32;
        (dx != 0 || dy != 0).then_some((dx as f64, dy as f64))
    }
}

/* ---------- Software drawing: pixels, lines, rings ---------- */

/// Alpha-blend a 0xAARRGGBB color onto the pixel at (x,y) if inside bounds.
#[inline]
fn blend_pixel(fb: &mut FrameBuffer, x: i32, y: i32, argb: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    let a = argb >> 24;
    if a == 0xFF {
        fb.pixels[idx] = argb & 0x00FF_FFFF;
        return;
    }
    let old = fb.pixels[idx];
    let mix = |shift: u32| {
        let s = (argb >> shift) & 0xFF;
        let d = (old >> shift) & 0xFF;
        ((s * a + d * (255 - a)) / 255) << shift
    };
    fb.pixels[idx] = mix(16) | mix(8) | mix(0);
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        blend_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Fill every pixel whose centre lies between `r_in` and `r_out` from (cx,cy).
fn fill_ring(fb: &mut FrameBuffer, cx: f64, cy: f64, r_in: f64, r_out: f64, color: u32) {
    let (in_sq, out_sq) = (r_in.max(0.0).powi(2), r_out.powi(2));
    let (x0, x1) = ((cx - r_out).floor() as i32, (cx + r_out).ceil() as i32);
    let (y0, y1) = ((cy - r_out).floor() as i32, (cy + r_out).ceil() as i32);
    for y in y0..=y1 {
        let dy = y as f64 + 0.5 - cy;
        for x in x0..=x1 {
            let dx = x as f64 + 0.5 - cx;
            let d = dx * dx + dy * dy;
            if d >= in_sq && d <= out_sq {
                blend_pixel(fb, x, y, color);
            }
        }
    }
}

/// A stroked circle of `width` centred on radius `r`.
fn stroke_circle(fb: &mut FrameBuffer, cx: f64, cy: f64, r: f64, width: f64, color: u32) {
    fill_ring(fb, cx, cy, r - width / 2.0, r + width / 2.0, color);
}

/// Paint a captured frame as the window background.
pub fn blit_frame(fb: &mut FrameBuffer, frame: &Frame) {
    let w = fb.width.min(frame.width as usize);
    let h = fb.height.min(frame.height as usize);
    for y in 0..h {
        for x in 0..w {
            let at = y * frame.row_stride + x * frame.pixel_stride;
            let Some(px) = frame.pixels.get(at..at + 3) else { continue };
            fb.pixels[y * fb.width + x] = (px[0] as u32) << 16 | (px[1] as u32) << 8 | px[2] as u32;
        }
    }
}

/// Target reticle: thin inner ring, thick main ring, medium outer ring.
pub fn draw_target(fb: &mut FrameBuffer, target: &CircularRegion) {
    let size = target.diameter();
    let (cx, cy) = (target.center.x, target.center.y);
    let hole = size * 0.13;
    let thin = size * 0.02;
    let main = size * 0.28;
    let outer = size * 0.05;

    stroke_circle(fb, cx, cy, hole + thin / 2.0, thin, 0xB4_A9A9A9);
    stroke_circle(fb, cx, cy, hole + thin + main / 2.0, main, 0xC8_535353);
    stroke_circle(fb, cx, cy, hole + thin + main + outer / 2.0, outer, 0xE6_A9A9A9);
}

/// Magnifier bubble from the render model.
pub fn draw_magnifier(fb: &mut FrameBuffer, model: &RenderModel) {
    let layout = model.layout();
    let (cx, cy) = (layout.center.x, layout.center.y);
    let (r, g, b) = model.color_rgb();
    let bezel_color = 0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32;
    let text_color = if model.use_dark_text() { DARK_TEXT } else { LIGHT_TEXT };
    let size = model.magnifier().diameter();

    // Zoomed pixels, nearest neighbour, clipped to the inner circle.
    let r_sq = layout.inner_radius * layout.inner_radius;
    let (x0, x1) = ((cx - layout.inner_radius) as i32, (cx + layout.inner_radius) as i32);
    let (y0, y1) = ((cy - layout.inner_radius) as i32, (cy + layout.inner_radius) as i32);
    for y in y0..=y1 {
        let fy = y as f64 + 0.5;
        for x in x0..=x1 {
            let fx = x as f64 + 0.5;
            if (fx - cx).powi(2) + (fy - cy).powi(2) > r_sq {
                continue;
            }
            let color = model
                .crop()
                .and_then(|crop| {
                    let px = ((fx - layout.origin.x) / layout.pixel_size).floor();
                    let py = ((fy - layout.origin.y) / layout.pixel_size).floor();
                    let inside = px >= 0.0 && py >= 0.0 && px < crop.width() as f64 && py < crop.height() as f64;
                    inside.then(|| crop.get_pixel(px as u32, py as u32).0)
                })
                .map(|[r, g, b, _]| 0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
                .unwrap_or(0xFF00_0000);
            blend_pixel(fb, x, y, color);
        }
    }

    if model.crop().is_some() {
        if model.show_grid_lines() {
            // Shadow pass one pixel off, then the light line on top
            for shade in [(GRID_SHADOW, 1), (GRID_MAIN, 0)] {
                for (a, b) in layout.grid_lines() {
                    let (o, color) = (shade.1, shade.0);
                    draw_line(fb, a.x as i32 + o, a.y as i32 + o, b.x as i32 + o, b.y as i32 + o, color);
                }
            }
        }

        // Box around the scanned pixel
        let half = layout.pixel_size / 2.0;
        let (l, t) = ((cx - half) as i32, (cy - half) as i32);
        let (rr, bb) = ((cx + half) as i32, (cy + half) as i32);
        draw_line(fb, l, t, rr, t, text_color);
        draw_line(fb, rr, t, rr, bb, text_color);
        draw_line(fb, rr, bb, l, bb, text_color);
        draw_line(fb, l, bb, l, t, text_color);
    }

    // Bezel in the sampled color, framed by two thin borders each side
    fill_ring(fb, cx, cy, layout.inner_radius, layout.outer_radius, bezel_color);
    let border = (size * 0.005).max(1.0);
    stroke_circle(fb, cx, cy, layout.inner_radius - border, border * 2.0, DARK_BORDER);
    stroke_circle(fb, cx, cy, layout.inner_radius - border / 2.0, border, LIGHT_BORDER);
    stroke_circle(fb, cx, cy, layout.outer_radius + border, border * 2.0, DARK_BORDER);
    stroke_circle(fb, cx, cy, layout.outer_radius + border * 1.5, border, LIGHT_BORDER);

    // Readouts
    let scale = if size >= 250.0 { 2 } else { 1 };
    for label in Label::ALL {
        let text = model.label_text(label);
        let anchor = layout.label_anchor(label);
        let w = text.chars().count() as i32 * 6 * scale;
        let x = anchor.x as i32 - w / 2;
        let y = anchor.y as i32 - 7 * scale / 2;
        draw_text_5x7(fb, x, y, text, text_color, scale);
    }
}

/* ---------- 5x7 bitmap font (hex digits, '#', ',', 'X') ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        // Hex letters and the close mark
        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),

        // Punctuation: space, hash, comma
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '#' => g!(0b01010,0b01010,0b11111,0b01010,0b11111,0b01010,0b01010),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y), each font pixel `scale` screen pixels wide.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32, scale: i32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (ry, rowbits) in rows.iter().enumerate() {
        for rx in 0..5 {
            if (rowbits & (1 << (4 - rx))) == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    blend_pixel(fb, x + rx * scale + sx, y + ry as i32 * scale + sy, color);
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs with 1-pixel spacing.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32, scale: i32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color, scale);
        x += 6 * scale;
    }
}
