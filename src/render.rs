// What the magnifier should show, as plain data.
// The host draws from a `RenderModel`; nothing in here touches a window.

use crate::geometry::Vec2;
use crate::types::{CircularRegion, SampleResult};
use image::RgbaImage;

/// Receives everything the overlays need to redraw.
pub trait RenderSink {
    /// A capture cycle finished. The previous sample is superseded.
    fn on_sample(&mut self, sample: SampleResult);

    /// Target and/or magnifier moved or resized.
    fn on_regions_changed(&mut self, target: &CircularRegion, magnifier: &CircularRegion);

    fn on_grid_lines_changed(&mut self, _show: bool) {}
}

/// Intent raised by a tap on the magnifier bezel. The host decides what to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    CopyHex(String),
    CopyCoordinates(String),
    Close,
}

/// Readouts placed around the bezel ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    Hex,
    Coordinates,
    Close,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Hex, Label::Coordinates, Label::Close];

    /// Position on the ring in degrees (0 = right, 90 = down).
    pub fn angle_deg(self) -> f64 {
        match self {
            Label::Hex => 45.0,
            Label::Coordinates => 135.0,
            Label::Close => -90.0,
        }
    }
}

/// Half-width of the tappable arc around each label.
const LABEL_HIT_DEG: f64 = 25.0;

/// Geometry of one magnifier drawing, derived from its region and crop size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MagnifierLayout {
    pub center: Vec2,
    pub outer_radius: f64,
    pub inner_radius: f64,
    pub bezel_thickness: f64,
    /// Radius of the bezel's mid line, where labels sit.
    pub ring_radius: f64,
    /// On-screen side of one zoomed source pixel.
    pub pixel_size: f64,
    /// Top-left corner of the zoomed crop.
    pub origin: Vec2,
    pub crop_side: u32,
}

impl MagnifierLayout {
    pub fn compute(magnifier: &CircularRegion, crop_side: u32) -> Self {
        let size = magnifier.diameter();
        let bezel_thickness = size * 0.11;
        // small margin so strokes are not clipped by the window edge
        let outer_radius = size / 2.0 * 0.96;
        let inner_radius = outer_radius - bezel_thickness;
        let ring_radius = inner_radius + bezel_thickness / 2.0;

        let visible = inner_radius * 2.0;
        let pixel_size = if crop_side > 1 { visible / (crop_side as f64 - 1.0) } else { visible };
        let total = pixel_size * crop_side as f64;
        // Even crops have no middle pixel; shift so the scan pixel sits at the centre.
        let center_offset = if crop_side % 2 == 0 { pixel_size / 2.0 } else { 0.0 };
        let origin = Vec2::new(
            magnifier.center.x - total / 2.0 - center_offset,
            magnifier.center.y - total / 2.0 - center_offset,
        );

        Self {
            center: magnifier.center,
            outer_radius,
            inner_radius,
            bezel_thickness,
            ring_radius,
            pixel_size,
            origin,
            crop_side,
        }
    }

    /// Grid line segments clipped to the inner circle: verticals then horizontals.
    pub fn grid_lines(&self) -> Vec<(Vec2, Vec2)> {
        let mut lines = Vec::new();
        let r_sq = self.inner_radius * self.inner_radius;
        let end = self.pixel_size * self.crop_side as f64;
        let c = self.center;

        for i in 1..self.crop_side {
            let offset = self.pixel_size * i as f64;
            if offset >= end {
                break;
            }
            let x = self.origin.x + offset;
            let dx = x - c.x;
            if dx * dx < r_sq {
                let half = (r_sq - dx * dx).sqrt();
                lines.push((Vec2::new(x, c.y - half), Vec2::new(x, c.y + half)));
            }
        }
        for i in 1..self.crop_side {
            let y = self.origin.y + self.pixel_size * i as f64;
            let dy = y - c.y;
            if dy * dy < r_sq {
                let half = (r_sq - dy * dy).sqrt();
                lines.push((Vec2::new(c.x - half, y), Vec2::new(c.x + half, y)));
            }
        }
        lines
    }

    /// Where a label is centred on the bezel.
    pub fn label_anchor(&self, label: Label) -> Vec2 {
        self.center + Vec2::from_angle(label.angle_deg().to_radians()) * self.ring_radius
    }

    /// Which label, if any, a screen point lands on.
    pub fn label_at(&self, x: f64, y: f64) -> Option<Label> {
        let rel = Vec2::new(x, y) - self.center;
        let r = rel.length();
        let slack = self.bezel_thickness * 0.5;
        if r < self.inner_radius - slack || r > self.outer_radius + slack {
            return None;
        }
        let angle = rel.angle().to_degrees();
        Label::ALL.into_iter().find(|label| {
            let mut diff = (angle - label.angle_deg()).abs() % 360.0;
            if diff > 180.0 {
                diff = 360.0 - diff;
            }
            diff <= LABEL_HIT_DEG
        })
    }
}

/// Latest state of both overlays plus the last good sample.
pub struct RenderModel {
    sample: Option<SampleResult>,
    hex_color: String,
    coordinates: String,
    show_grid_lines: bool,
    target: CircularRegion,
    magnifier: CircularRegion,
    revision: u64,
}

impl RenderModel {
    pub fn new(show_grid_lines: bool) -> Self {
        Self {
            sample: None,
            hex_color: "#000000".to_string(),
            coordinates: "0, 0".to_string(),
            show_grid_lines,
            target: CircularRegion::new(0.0, 0.0, 0.0),
            magnifier: CircularRegion::new(0.0, 0.0, 0.0),
            revision: 0,
        }
    }

    pub fn crop(&self) -> Option<&RgbaImage> {
        self.sample.as_ref().map(|s| &s.crop)
    }

    pub fn hex_color(&self) -> &str { &self.hex_color }
    pub fn coordinates(&self) -> &str { &self.coordinates }
    pub fn show_grid_lines(&self) -> bool { self.show_grid_lines }
    pub fn target(&self) -> &CircularRegion { &self.target }
    pub fn magnifier(&self) -> &CircularRegion { &self.magnifier }

    /// Bumped on every change; hosts can skip redraws when it is unchanged.
    pub fn revision(&self) -> u64 { self.revision }

    /// Sampled color as RGB. Unparseable strings read as black.
    pub fn color_rgb(&self) -> (u8, u8, u8) {
        parse_hex(&self.hex_color).unwrap_or((0, 0, 0))
    }

    /// Dark labels on light bezels, light labels on dark ones.
    pub fn use_dark_text(&self) -> bool {
        let (r, g, b) = self.color_rgb();
        let luminance = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
        luminance > 0.6
    }

    pub fn layout(&self) -> MagnifierLayout {
        let side = self.crop().map(|c| c.width()).unwrap_or(1);
        MagnifierLayout::compute(&self.magnifier, side)
    }

    /// Translate a tap in screen coordinates into an action.
    pub fn action_at(&self, x: f64, y: f64) -> Option<UserAction> {
        match self.layout().label_at(x, y)? {
            Label::Hex => Some(UserAction::CopyHex(self.hex_color.clone())),
            Label::Coordinates => Some(UserAction::CopyCoordinates(self.coordinates.clone())),
            Label::Close => Some(UserAction::Close),
        }
    }

    /// Text drawn for a label.
    pub fn label_text(&self, label: Label) -> &str {
        match label {
            Label::Hex => &self.hex_color,
            Label::Coordinates => &self.coordinates,
            Label::Close => "X",
        }
    }
}

impl RenderSink for RenderModel {
    fn on_sample(&mut self, sample: SampleResult) {
        self.hex_color = sample.hex_color.clone();
        self.coordinates = sample.coordinates_label();
        // replace-on-write: the old crop is dropped here
        self.sample = Some(sample);
        self.revision += 1;
    }

    fn on_regions_changed(&mut self, target: &CircularRegion, magnifier: &CircularRegion) {
        self.target = *target;
        self.magnifier = *magnifier;
        self.revision += 1;
    }

    fn on_grid_lines_changed(&mut self, show: bool) {
        if self.show_grid_lines != show {
            self.show_grid_lines = show;
            self.revision += 1;
        }
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let v = u32::from_str_radix(digits, 16).ok()?;
    Some(((v >> 16) as u8, (v >> 8) as u8, v as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hex: &str, side: u32) -> SampleResult {
        SampleResult {
            hex_color: hex.to_string(),
            crop: RgbaImage::new(side, side),
            scan_x: 12,
            scan_y: 34,
        }
    }

    fn model_with_magnifier() -> RenderModel {
        let mut model = RenderModel::new(true);
        model.on_regions_changed(
            &CircularRegion::new(500.0, 500.0, 20.0),
            &CircularRegion::new(500.0, 200.0, 150.0),
        );
        model
    }

    #[test]
    fn test_on_sample_replaces_readouts() {
        let mut model = model_with_magnifier();
        let rev = model.revision();
        model.on_sample(sample("#FFFFFF", 12));
        assert_eq!(model.hex_color(), "#FFFFFF");
        assert_eq!(model.coordinates(), "12, 34");
        assert_eq!(model.crop().map(|c| c.dimensions()), Some((12, 12)));
        assert!(model.revision() > rev);

        model.on_sample(sample("#000000", 8));
        assert_eq!(model.crop().map(|c| c.dimensions()), Some((8, 8)));
    }

    #[test]
    fn test_text_color_follows_luminance() {
        let mut model = model_with_magnifier();
        model.on_sample(sample("#FFFFFF", 3));
        assert!(model.use_dark_text());
        model.on_sample(sample("#202020", 3));
        assert!(!model.use_dark_text());
        // Pure red is too dark for dark text
        model.on_sample(sample("#FF0000", 3));
        assert!(!model.use_dark_text());
    }

    #[test]
    fn test_layout_geometry() {
        let layout = MagnifierLayout::compute(&CircularRegion::new(150.0, 150.0, 150.0), 11);
        assert!((layout.outer_radius - 144.0).abs() < 1e-9);
        assert!((layout.bezel_thickness - 33.0).abs() < 1e-9);
        assert!((layout.inner_radius - 111.0).abs() < 1e-9);
        assert!((layout.pixel_size - 22.2).abs() < 1e-9);
        // Odd crop: centre pixel straddles the centre point
        let mid = layout.origin.x + layout.pixel_size * 5.5;
        assert!((mid - 150.0).abs() < 1e-9);
        assert!(!layout.grid_lines().is_empty());
    }

    #[test]
    fn test_grid_lines_stay_inside_circle() {
        let layout = MagnifierLayout::compute(&CircularRegion::new(0.0, 0.0, 100.0), 12);
        for (a, b) in layout.grid_lines() {
            assert!(a.length() <= layout.inner_radius + 1e-9);
            assert!(b.length() <= layout.inner_radius + 1e-9);
        }
    }

    #[test]
    fn test_action_hit_testing() {
        let mut model = model_with_magnifier();
        model.on_sample(sample("#12AB0F", 12));
        let layout = model.layout();

        let hex = layout.label_anchor(Label::Hex);
        assert_eq!(model.action_at(hex.x, hex.y), Some(UserAction::CopyHex("#12AB0F".into())));

        let coords = layout.label_anchor(Label::Coordinates);
        assert_eq!(
            model.action_at(coords.x, coords.y),
            Some(UserAction::CopyCoordinates("12, 34".into()))
        );

        let close = layout.label_anchor(Label::Close);
        assert_eq!(model.action_at(close.x, close.y), Some(UserAction::Close));

        // The zoomed area itself is not a button
        assert_eq!(model.action_at(500.0, 200.0), None);
        // Bezel but between labels (straight right)
        assert_eq!(model.action_at(500.0 + layout.ring_radius, 200.0), None);
    }

    #[test]
    fn test_grid_toggle_bumps_revision_once() {
        let mut model = RenderModel::new(true);
        model.on_grid_lines_changed(true);
        assert_eq!(model.revision(), 0);
        model.on_grid_lines_changed(false);
        assert_eq!(model.revision(), 1);
        assert!(!model.show_grid_lines());
    }
}
