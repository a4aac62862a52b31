// Pointer helpers for the host: raw drag deltas and the slowed-down
// fine-tune gesture on the magnifier.

/// Fine-tune moves the target at a tenth of the finger's speed.
pub const FINE_TUNE_FACTOR: f64 = 0.1;

/// Turns pointer positions into per-event deltas while a button is held.
#[derive(Debug, Default)]
pub struct DragTracker {
    last: Option<(f64, f64)>,
}

impl DragTracker {
    /// Feed the current pointer state; returns the delta since the last call
    /// while the drag continues.
    pub fn update(&mut self, pos: Option<(f64, f64)>, pressed: bool) -> Option<(f64, f64)> {
        let (Some((x, y)), true) = (pos, pressed) else {
            self.last = None;
            return None;
        };
        let delta = self.last.map(|(lx, ly)| (x - lx, y - ly));
        self.last = Some((x, y));
        delta.filter(|&(dx, dy)| dx != 0.0 || dy != 0.0)
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }
}

/// Scales deltas down and only lets whole pixels through;
/// the fractional rest carries over to the next event.
#[derive(Debug)]
pub struct FineTuneAccumulator {
    factor: f64,
    acc_x: f64,
    acc_y: f64,
}

impl Default for FineTuneAccumulator {
    fn default() -> Self {
        Self::new(FINE_TUNE_FACTOR)
    }
}

impl FineTuneAccumulator {
    pub fn new(factor: f64) -> Self {
        Self { factor, acc_x: 0.0, acc_y: 0.0 }
    }

    pub fn push(&mut self, dx: f64, dy: f64) -> (f64, f64) {
        self.acc_x += dx * self.factor;
        self.acc_y += dy * self.factor;
        let step_x = self.acc_x.trunc();
        let step_y = self.acc_y.trunc();
        self.acc_x -= step_x;
        self.acc_y -= step_y;
        (step_x, step_y)
    }

    /// New gesture: forget leftovers.
    pub fn reset(&mut self) {
        self.acc_x = 0.0;
        self.acc_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_tracker_deltas() {
        let mut t = DragTracker::default();
        assert_eq!(t.update(Some((10.0, 10.0)), true), None);
        assert_eq!(t.update(Some((15.0, 8.0)), true), Some((5.0, -2.0)));
        assert_eq!(t.update(Some((15.0, 8.0)), true), None);
        assert_eq!(t.update(Some((20.0, 8.0)), false), None);
        assert!(!t.is_dragging());
        // A new press starts fresh
        assert_eq!(t.update(Some((50.0, 50.0)), true), None);
    }

    #[test]
    fn test_fine_tune_accumulates_fractions() {
        let mut acc = FineTuneAccumulator::default();
        assert_eq!(acc.push(4.0, -4.0), (0.0, 0.0));
        assert_eq!(acc.push(4.0, -4.0), (0.0, 0.0));
        // 0.4 + 0.4 + 0.4 crosses one pixel
        assert_eq!(acc.push(4.0, -4.0), (1.0, -1.0));
        acc.reset();
        assert_eq!(acc.push(25.0, 0.0), (2.0, 0.0));
    }
}
