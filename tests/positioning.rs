mod common;

use color_loupe::positioning::{GapPolicy, PositioningEngine};
use color_loupe::types::{ScanPoint, ScreenBounds};
use common::Lcg;
use rstest::rstest;

const EPS: f64 = 1e-6;

fn phone() -> PositioningEngine {
    let mut engine = PositioningEngine::new(GapPolicy::default());
    engine.initialize(ScreenBounds::new(1080, 2400), 40.0, 150.0);
    engine
}

#[test]
fn test_fling_to_top_tows_magnifier_below() {
    let mut engine = phone();
    assert_eq!(engine.magnifier().center.y, 960.0);

    assert!(engine.drag_target(0.0, -2000.0));
    assert_eq!(engine.target().center.x, 540.0);
    assert_eq!(engine.target().center.y, 40.0);
    assert!((engine.magnifier().center.x - 540.0).abs() < EPS);
    assert!((engine.magnifier().center.y - 330.0).abs() < EPS);
    assert!((engine.gap() - 100.0).abs() < EPS);
    assert_eq!(engine.compute_scan_point(), ScanPoint { x: 540, y: 40 });
}

#[test]
fn test_small_drag_inside_band_leaves_magnifier() {
    let mut engine = phone();
    let before = *engine.magnifier();
    // Gap goes from 50 to 70, still inside [50, 100]
    assert!(!engine.drag_target(0.0, 20.0));
    assert_eq!(*engine.magnifier(), before);
}

#[rstest]
#[case(ScreenBounds::new(1080, 2400), 40.0, 150.0, 1)]
#[case(ScreenBounds::new(1080, 2400), 40.0, 250.0, 2)]
#[case(ScreenBounds::new(800, 600), 20.0, 100.0, 3)]
#[case(ScreenBounds::new(2400, 1080), 40.0, 150.0, 4)]
fn test_random_drags_keep_both_circles_on_screen(
    #[case] bounds: ScreenBounds,
    #[case] target_radius: f64,
    #[case] magnifier_radius: f64,
    #[case] seed: u64,
) {
    let mut engine = PositioningEngine::new(GapPolicy::default());
    engine.initialize(bounds, target_radius, magnifier_radius);
    let mut rng = Lcg(seed);

    for _ in 0..500 {
        let before = engine.magnifier().center;
        engine.drag_target(rng.next_delta(300.0), rng.next_delta(300.0));

        assert!(engine.target().fits_within(bounds), "target left the screen: {:?}", engine.target());
        assert!(engine.magnifier().fits_within(bounds), "magnifier left the screen: {:?}", engine.magnifier());

        // Either the band holds or the magnifier stayed where it was.
        let gap = engine.gap();
        let policy = engine.gap_policy();
        let in_band = gap >= policy.min_gap - EPS && gap <= policy.max_gap + EPS;
        assert!(in_band || engine.magnifier().center == before, "gap {gap} outside band after a move");

        let scan = engine.compute_scan_point();
        assert!(scan.x < bounds.width && scan.y < bounds.height);
    }
}

#[test]
fn test_same_drags_give_same_layout() {
    let run = || {
        let mut engine = phone();
        let mut rng = Lcg(42);
        let mut trace = Vec::new();
        for _ in 0..100 {
            engine.drag_target(rng.next_delta(200.0), rng.next_delta(200.0));
            trace.push((engine.target().center, engine.magnifier().center));
        }
        trace
    };
    assert_eq!(run(), run());
}

#[test]
fn test_fine_tune_moves_like_drag() {
    let mut a = phone();
    let mut b = phone();
    a.drag_target(3.0, -2.0);
    b.fine_tune(3.0, -2.0);
    assert_eq!(a.target(), b.target());
    assert_eq!(a.magnifier(), b.magnifier());
}
