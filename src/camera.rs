// Webcam-backed capture source.
// A driver thread owns the camera and keeps dropping the newest decoded frame
// into a one-slot mailbox; the capture loop only ever peeks at that slot, so
// it never blocks on the device. Older unread frames are simply replaced.

use crate::capture::CaptureSource;
use crate::error::CaptureError;
use crate::types::Frame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

/// Consecutive failed grabs before the camera counts as gone.
const MAX_FAILED_GRABS: u32 = 30;

/// Rows are padded to this many bytes, like most capture drivers do.
const ROW_ALIGNMENT: usize = 64;

#[derive(Default)]
struct Mailbox {
    latest: Option<Frame>,
    lost: Option<String>,
    /// Pixel buffer handed back by the loop, reused for the next frame.
    spare: Option<Vec<u8>>,
}

pub struct CameraSource {
    mailbox: Arc<Mutex<Mailbox>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    width: u32,
    height: u32,
}

impl CameraSource {
    /// Open camera `index` near the requested resolution and start the driver thread.
    pub fn open(index: u32, width: u32, height: u32) -> Result<Self, CaptureError> {
        let mailbox = Arc::new(Mutex::new(Mailbox::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, u32), String>>();

        let worker = {
            let mailbox = Arc::clone(&mailbox);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("camera-capture".into())
                .spawn(move || {
                    let mut cam = match open_camera(index, width, height) {
                        Ok(cam) => cam,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    let actual = cam.resolution();
                    let _ = ready_tx.send(Ok((actual.width(), actual.height())));
                    drive(&mut cam, &mailbox, &stop);
                    if let Err(e) = cam.stop_stream() {
                        warn!("camera stream did not stop cleanly: {e}");
                    }
                })
                .map_err(|e| CaptureError::SourceInit(format!("spawn capture thread: {e}")))?
        };

        let (w, h) = match ready_rx.recv() {
            Ok(Ok(res)) => res,
            Ok(Err(msg)) => {
                let _ = worker.join();
                return Err(CaptureError::SourceInit(msg));
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CaptureError::SourceInit("capture thread exited during startup".into()));
            }
        };
        info!("camera {index} streaming at {w}x{h}");

        Ok(Self { mailbox, stop, worker: Some(worker), width: w, height: h })
    }

    /// Report the actual resolution the camera is delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl CaptureSource for CameraSource {
    fn try_acquire_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let mut slot = self
            .mailbox
            .lock()
            .map_err(|_| CaptureError::CaptureLost("camera mailbox poisoned".into()))?;
        if let Some(reason) = &slot.lost {
            return Err(CaptureError::CaptureLost(reason.clone()));
        }
        Ok(slot.latest.take())
    }

    fn release_frame(&mut self, frame: Frame) {
        if let Ok(mut slot) = self.mailbox.lock() {
            slot.spare = Some(frame.pixels);
        }
    }
}

impl Drop for CameraSource {
    /// Never waits on the device: a driver thread stuck in a grab is left
    /// to notice the stop flag and exit on its own.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                let _ = worker.join();
            } else {
                debug!("camera thread busy in a grab, detaching it");
            }
        }
    }
}

fn open_camera(index: u32, width: u32, height: u32) -> Result<Camera, String> {
    // 1) Choose the device (0 = default webcam)
    let idx = CameraIndex::Index(index);

    let fmt = CameraFormat::new(
        Resolution::new(width, height),
        FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
        30,                // target FPS
    );

    // 2) Ask for RGB frames, prioritizing the closest format to our request.
    let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

    // 3) Create the camera (this might fail if no device exists).
    let mut cam = Camera::new(idx, req).map_err(|e| format!("Create camera: {e}"))?;

    // 4) Start streaming frames from the camera.
    cam.open_stream().map_err(|e| format!("Open stream: {e}"))?;
    Ok(cam)
}

/// Driver loop: grab, decode, publish. Runs until asked to stop or the device dies.
fn drive(cam: &mut Camera, mailbox: &Mutex<Mailbox>, stop: &AtomicBool) {
    let mut failures = 0u32;
    while !stop.load(Ordering::SeqCst) {
        // Blocks until the device has a frame; fine, this is the driver's own thread.
        let decoded = cam
            .frame()
            .map_err(|e| format!("Fetch frame: {e}"))
            .and_then(|buf| buf.decode_image::<RgbFormat>().map_err(|e| format!("Decode RGB: {e}")));

        let rgb = match decoded {
            Ok(img) => {
                failures = 0;
                img
            }
            Err(msg) => {
                failures += 1;
                warn!("camera grab failed ({failures}/{MAX_FAILED_GRABS}): {msg}");
                if failures >= MAX_FAILED_GRABS {
                    if let Ok(mut slot) = mailbox.lock() {
                        slot.lost = Some(msg);
                    }
                    return;
                }
                continue;
            }
        };

        let (w, h) = rgb.dimensions();
        let spare = match mailbox.lock() {
            Ok(mut slot) => slot.spare.take(),
            Err(_) => return,
        };
        let frame = pack_rgba(rgb.as_raw(), w, h, spare);
        let Ok(mut slot) = mailbox.lock() else { return };
        if slot.latest.replace(frame).is_some() {
            debug!("unread camera frame replaced");
        }
    }
}

/// Pack tight RGB bytes into padded RGBA rows, reusing `spare` when it fits.
fn pack_rgba(rgb: &[u8], width: u32, height: u32, spare: Option<Vec<u8>>) -> Frame {
    let row_stride = (width as usize * 4).next_multiple_of(ROW_ALIGNMENT);
    let len = row_stride * height as usize;
    let mut pixels = match spare {
        Some(buf) if buf.len() == len => buf,
        _ => vec![0u8; len],
    };

    for (y, src_row) in rgb.chunks_exact(width as usize * 3).take(height as usize).enumerate() {
        let dst_row = &mut pixels[y * row_stride..y * row_stride + width as usize * 4];
        for (dst, src) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(3)) {
            dst[..3].copy_from_slice(src);
            dst[3] = 0xFF;
        }
    }

    Frame { width, height, pixels, row_stride, pixel_stride: 4 }
}
