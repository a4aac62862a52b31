// Keeps the target reticle and the magnifier bubble on screen and within a
// fixed edge-to-edge distance band of each other.
//
// Rules applied after every target move:
// 1) Towing: magnifier too far away -> pulled along the same ray until the
//    edge gap equals `max_gap`.
// 2) Collision: magnifier too close -> jump to the first free slot found by
//    `resolve_fit` (Left, Top, Right, Bottom; max gap before min gap).

use crate::error::ConfigError;
use crate::geometry::{Vec2, edge_gap};
use crate::types::{CircularRegion, ScanPoint, ScreenBounds};
use tracing::debug;

/// Allowed band for the distance between the two circle *edges*.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GapPolicy {
    pub min_gap: f64,
    pub max_gap: f64,
}

impl GapPolicy {
    pub fn new(min_gap: f64, max_gap: f64) -> Result<Self, ConfigError> {
        if !(min_gap >= 0.0 && min_gap < max_gap) {
            return Err(ConfigError::InvalidGapPolicy { min_gap, max_gap });
        }
        Ok(Self { min_gap, max_gap })
    }
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self { min_gap: 50.0, max_gap: 100.0 }
    }
}

/// Side of the target a magnifier candidate is placed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Top,
    Right,
    Bottom,
}

impl Direction {
    /// Search order; the first direction that fits wins.
    pub const SEARCH_ORDER: [Direction; 4] =
        [Direction::Left, Direction::Top, Direction::Right, Direction::Bottom];

    fn sign(self) -> f64 {
        match self {
            Direction::Left | Direction::Top => -1.0,
            Direction::Right | Direction::Bottom => 1.0,
        }
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

pub struct PositioningEngine {
    target: CircularRegion,
    magnifier: CircularRegion,
    bounds: ScreenBounds,
    gap_policy: GapPolicy,
}

impl PositioningEngine {
    /// Engine with no screen yet; call `initialize` before use.
    pub fn new(gap_policy: GapPolicy) -> Self {
        Self {
            target: CircularRegion::new(0.0, 0.0, 0.0),
            magnifier: CircularRegion::new(0.0, 0.0, 0.0),
            bounds: ScreenBounds::new(0, 0),
            gap_policy,
        }
    }

    /// Target centred on screen, magnifier right above it at `min_gap`.
    /// If that spot is off-screen the magnifier goes through `resolve_fit`.
    pub fn initialize(&mut self, bounds: ScreenBounds, target_radius: f64, magnifier_radius: f64) {
        self.bounds = bounds;
        let cx = bounds.width as f64 / 2.0;
        let cy = bounds.height as f64 / 2.0;
        self.target = CircularRegion::new(cx, cy, target_radius);

        let above = cy - target_radius - self.gap_policy.min_gap - magnifier_radius;
        self.magnifier = CircularRegion::new(cx, above, magnifier_radius);

        if !self.magnifier.fits_within(bounds) && !self.resolve_fit() {
            // Nothing satisfies the gap band; at least keep the bubble on screen.
            self.magnifier.center = clamp_center(self.magnifier.center, magnifier_radius, bounds);
        }
        debug!(
            target = ?self.target.center,
            magnifier = ?self.magnifier.center,
            "positioning initialized for {}x{}",
            bounds.width,
            bounds.height
        );
    }

    /// Move the target by a drag delta, then re-apply the gap rules.
    /// The target itself is only held on screen. Returns whether the magnifier moved.
    pub fn drag_target(&mut self, dx: f64, dy: f64) -> bool {
        let moved = self.target.center + Vec2::new(dx, dy);
        self.target.center = clamp_center(moved, self.target.radius, self.bounds);
        self.enforce_gap()
    }

    /// Same as `drag_target`; callers feed it already-scaled fine deltas.
    pub fn fine_tune(&mut self, dx: f64, dy: f64) -> bool {
        self.drag_target(dx, dy)
    }

    /// Towing then collision. Returns true iff the magnifier centre changed.
    pub fn enforce_gap(&mut self) -> bool {
        let before = self.magnifier.center;
        let policy = self.gap_policy;

        if self.gap() > policy.max_gap {
            let offset = self.magnifier.center - self.target.center;
            let reach = self.target.radius + self.magnifier.radius + policy.max_gap;
            let towed = self.target.center + Vec2::from_angle(offset.angle()) * reach;
            let candidate = CircularRegion { center: towed, radius: self.magnifier.radius };
            if candidate.fits_within(self.bounds) {
                self.magnifier.center = towed;
            } else {
                debug!("towed magnifier would leave the screen, searching for a slot");
                self.resolve_fit();
            }
        }

        if self.gap() < policy.min_gap {
            self.resolve_fit();
        }

        self.magnifier.center != before
    }

    /// Deterministic slot search around the target.
    /// Returns false (and leaves the magnifier alone) when nothing fits.
    pub fn resolve_fit(&mut self) -> bool {
        let policy = self.gap_policy;
        for gap in [policy.max_gap, policy.min_gap] {
            let reach = self.target.radius + gap + self.magnifier.radius;
            for dir in Direction::SEARCH_ORDER {
                let Some(center) = self.candidate(dir, reach) else { continue };
                let region = CircularRegion { center, radius: self.magnifier.radius };
                if region.fits_within(self.bounds) {
                    debug!(?dir, gap, ?center, "magnifier placed");
                    self.magnifier.center = center;
                    return true;
                }
            }
        }
        debug!("no magnifier slot fits, keeping last position");
        false
    }

    /// Candidate centre on one side of the target at centre distance `reach`.
    /// The cross axis follows the target but is clamped on screen; the main
    /// axis is then solved so the centre distance is still exactly `reach`.
    fn candidate(&self, dir: Direction, reach: f64) -> Option<Vec2> {
        let r = self.magnifier.radius;
        let t = self.target.center;
        let (w, h) = (self.bounds.width as f64, self.bounds.height as f64);

        let (cross_target, cross_limit) = if dir.is_horizontal() { (t.y, h) } else { (t.x, w) };
        if cross_limit < 2.0 * r {
            return None;
        }
        let cross = cross_target.clamp(r, cross_limit - r);
        let off = cross - cross_target;
        if off.abs() >= reach {
            return None;
        }
        let along = (reach * reach - off * off).sqrt() * dir.sign();

        Some(if dir.is_horizontal() {
            Vec2::new(t.x + along, cross)
        } else {
            Vec2::new(cross, t.y + along)
        })
    }

    /// Resize the magnifier and place it again.
    pub fn set_magnifier_radius(&mut self, radius: f64) -> bool {
        let before = self.magnifier;
        self.magnifier.radius = radius;
        if !self.resolve_fit() && !self.magnifier.fits_within(self.bounds) {
            self.magnifier.center = clamp_center(self.magnifier.center, radius, self.bounds);
        }
        self.magnifier != before
    }

    /// Pixel under the target centre, clamped to the screen.
    pub fn compute_scan_point(&self) -> ScanPoint {
        let max_x = self.bounds.width.saturating_sub(1) as f64;
        let max_y = self.bounds.height.saturating_sub(1) as f64;
        ScanPoint {
            x: self.target.center.x.floor().clamp(0.0, max_x) as u32,
            y: self.target.center.y.floor().clamp(0.0, max_y) as u32,
        }
    }

    /// Current edge-to-edge distance between target and magnifier.
    pub fn gap(&self) -> f64 {
        edge_gap(self.target.center, self.target.radius, self.magnifier.center, self.magnifier.radius)
    }

    pub fn target(&self) -> &CircularRegion { &self.target }
    pub fn magnifier(&self) -> &CircularRegion { &self.magnifier }
    pub fn bounds(&self) -> ScreenBounds { self.bounds }
    pub fn gap_policy(&self) -> GapPolicy { self.gap_policy }
}

/// Keep a circle's bounding box on screen; centre it when it is larger than the screen.
fn clamp_center(center: Vec2, radius: f64, bounds: ScreenBounds) -> Vec2 {
    let axis = |v: f64, limit: f64| {
        if limit < 2.0 * radius { limit / 2.0 } else { v.clamp(radius, limit - radius) }
    };
    Vec2::new(axis(center.x, bounds.width as f64), axis(center.y, bounds.height as f64))
}
