// What you SEE:
// • The live camera feed (or a synthetic test pattern) fills the window; it stands in for "the screen".
// • Drag the grey target ring with the left mouse: the magnifier follows, keeping its distance.
// • Drag inside the magnifier for slow fine-tuning.
// • Click the hex / coordinates readout on the bezel to "copy" it (logged), click X or press ESC to quit.
// • G toggles grid lines, 1/2/3 switch magnifier size, arrow keys nudge the target by one pixel.

mod draw;

use clap::Parser;
use color_loupe::capture::CaptureSource;
use color_loupe::config::{CaptureConfig, MagnifierSize, TARGET_DIAMETER_DP};
use color_loupe::error::{AppError, CaptureError};
use color_loupe::input::{DragTracker, FineTuneAccumulator};
use color_loupe::positioning::GapPolicy;
use color_loupe::render::{RenderModel, UserAction};
use color_loupe::session::{PickerSession, RunningFlag};
use color_loupe::synthetic::PatternSource;
use color_loupe::types::{Frame, FrameBuffer, ScreenBounds};
use draw::{Drawer, blit_frame, draw_magnifier, draw_target};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Pointer travel (window pixels) that turns a magnifier tap into a drag.
const TAP_SLOP: f64 = 10.0;

/// Display density used to turn size presets into pixels.
const DENSITY: f64 = 1.0;

/// Live color picker over a camera feed (or a synthetic pattern).
#[derive(Parser, Debug)]
#[command(name = "color-loupe", version)]
struct Args {
    /// Skip the camera and sample the built-in test pattern
    #[arg(long)]
    synthetic: bool,

    /// Camera device index
    #[arg(long = "camera", value_name = "INDEX", default_value_t = 0)]
    camera_index: u32,

    /// TOML settings file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log session events (info level)
    #[arg(short, long)]
    verbose: bool,

    /// Log every tick and placement (debug level)
    #[arg(long)]
    debug: bool,
}

/// Wraps the real source and keeps the last released frame to paint as background.
struct Backdrop {
    inner: Box<dyn CaptureSource>,
    shown: Option<Frame>,
}

impl CaptureSource for Backdrop {
    fn try_acquire_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.inner.try_acquire_frame()
    }

    fn release_frame(&mut self, frame: Frame) {
        if let Some(old) = self.shown.replace(frame) {
            self.inner.release_frame(old);
        }
    }
}

/// Camera if we can get one, otherwise the synthetic pattern.
fn open_source(args: &Args) -> (Box<dyn CaptureSource>, u32, u32) {
    #[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
    {
        if !args.synthetic {
            match color_loupe::camera::CameraSource::open(args.camera_index, 640, 480) {
                Ok(cam) => {
                    let (w, h) = cam.resolution();
                    return (Box::new(cam), w, h);
                }
                Err(e) => warn!("{e}; falling back to the synthetic pattern"),
            }
        }
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        let _ = (args.synthetic, args.camera_index);
        warn!("no camera backend on this platform, using the synthetic pattern");
    }

    (Box::new(PatternSource::new(960, 640, 16).with_frame_every(2)), 960, 640)
}

enum Grab {
    Nothing,
    Target,
    Magnifier { start: (f64, f64), dragged: bool },
}

fn main() -> Result<(), AppError> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else if args.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_writer(std::io::stderr)
        .init();

    /* --- Settings --- */
    let mut config = match &args.config {
        Some(path) => CaptureConfig::load(path)?,
        None => CaptureConfig {
            magnifier_diameter_px: MagnifierSize::Small.diameter_px(DENSITY),
            ..CaptureConfig::default()
        },
    };

    /* --- Capture source + window ---
       Visual: window opens at the capture resolution. */
    let (source, w, h) = open_source(&args);
    let mut drawer = Drawer::new("Color Loupe", w as usize, h as usize)?;
    let mut screen = FrameBuffer::new(w as usize, h as usize);

    /* --- Session: positioning + capture loop + render model --- */
    let running = RunningFlag::new();
    let mut session = PickerSession::new(
        Backdrop { inner: source, shown: None },
        RenderModel::new(config.show_grid_lines),
        config.clone(),
        GapPolicy::default(),
        running.clone(),
    );
    session.start(ScreenBounds::new(w, h), TARGET_DIAMETER_DP * DENSITY / 2.0, Instant::now());

    let mut grab = Grab::Nothing;
    let mut tracker = DragTracker::default();
    let mut fine = FineTuneAccumulator::default();
    let mut outcome = Ok(());

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() && running.is_running() {
        let now = Instant::now();

        /* 1) Settings hotkeys: apply on the next tick / reposition immediately. */
        let mut changed = false;
        if drawer.g_pressed_once() {
            config.show_grid_lines = !config.show_grid_lines;
            changed = true;
        }
        if let Some(i) = drawer.size_key_pressed() {
            let preset = [MagnifierSize::Small, MagnifierSize::Medium, MagnifierSize::Large][i];
            config.magnifier_diameter_px = preset.diameter_px(DENSITY);
            changed = true;
        }
        if changed {
            session.update_config(config.clone());
        }
        if let Some((dx, dy)) = drawer.arrow_delta() {
            session.drag_target(dx, dy);
        }

        /* 2) Pointer: who did the press start on? */
        let pos = drawer.mouse_pos();
        let down = drawer.left_mouse_down();
        if down && !tracker.is_dragging() {
            grab = match pos {
                Some((x, y)) if session.engine().target().contains(x, y) => Grab::Target,
                Some((x, y)) if session.engine().magnifier().contains(x, y) => {
                    fine.reset();
                    Grab::Magnifier { start: (x, y), dragged: false }
                }
                _ => Grab::Nothing,
            };
        }
        if let Some((dx, dy)) = tracker.update(pos, down) {
            match &mut grab {
                Grab::Target => {
                    session.drag_target(dx, dy);
                }
                Grab::Magnifier { start, dragged } => {
                    if let Some((x, y)) = pos {
                        *dragged |= (x - start.0).hypot(y - start.1) > TAP_SLOP;
                    }
                    let (sx, sy) = fine.push(dx, dy);
                    if sx != 0.0 || sy != 0.0 {
                        session.fine_tune(sx, sy);
                    }
                }
                Grab::Nothing => {}
            }
        }
        if !down {
            // Release: an undragged press on the magnifier is a tap.
            if let Grab::Magnifier { start, dragged: false } = grab {
                match session.sink().action_at(start.0, start.1) {
                    Some(UserAction::CopyHex(hex)) => info!("copied color {hex}"),
                    Some(UserAction::CopyCoordinates(c)) => info!("copied coordinates {c}"),
                    Some(UserAction::Close) => break,
                    None => {}
                }
            }
            grab = Grab::Nothing;
        }

        /* 3) Capture tick (no-op until the delay has passed). */
        if let Err(e) = session.poll(now) {
            error!("capture lost, stopping: {e}");
            outcome = Err(AppError::Capture(e));
            break;
        }

        /* 4) Draw: backdrop, target, magnifier. */
        if let Some(frame) = &session.source().shown {
            blit_frame(&mut screen, frame);
        }
        draw_target(&mut screen, session.engine().target());
        draw_magnifier(&mut screen, session.sink());

        /* 5) Present to the window. */
        drawer.present(&screen)?;
    }

    session.stop();
    outcome
}
