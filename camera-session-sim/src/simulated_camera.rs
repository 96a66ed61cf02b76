//! Simulated camera hardware.
//!
//! Streams synthetic NV21 preview frames on a dedicated thread and answers
//! still capture requests with generated JPEG pictures. Faults and open
//! failures can be injected to exercise the controller's error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;

use camera_session_core::models::camera_models::{FlashMode, ImageEncoding, PixelFormat, Rotation};
use camera_session_core::models::captured_image::CapturedImage;
use camera_session_core::models::error::CameraError;
use camera_session_core::models::frame::Frame;
use camera_session_core::session::callbacks::HardwareCallbacks;
use camera_session_core::traits::hardware_provider::{CaptureRequest, HardwareSessionProvider};

/// Behaviour of the simulated sensor.
#[derive(Debug, Clone)]
pub struct SimulatedCameraConfig {
    pub width: u32,
    pub height: u32,
    /// Preview frames per second produced by the sensor.
    pub frame_rate: f64,
    /// Rotation reported with every frame and picture.
    pub sensor_rotation: Rotation,
    pub open_delay: Duration,
    /// Base latency of a still capture. Odd request ids take twice as long,
    /// so back-to-back captures complete out of order.
    pub capture_delay: Duration,
}

impl Default for SimulatedCameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_rate: 30.0,
            sensor_rotation: Rotation::Deg90,
            open_delay: Duration::from_millis(50),
            capture_delay: Duration::from_millis(80),
        }
    }
}

/// Opaque handle to one simulated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimulatedHandle(u64);

struct LiveSession {
    running: Arc<AtomicBool>,
    frame_thread: Option<thread::JoinHandle<()>>,
    callbacks: HardwareCallbacks<SimulatedHandle>,
}

struct Shared {
    config: SimulatedCameraConfig,
    next_handle: AtomicU64,
    sessions: Mutex<HashMap<u64, LiveSession>>,
    fail_next_open: AtomicBool,
    fault_requested: AtomicBool,
    flash: Mutex<FlashMode>,
    opens: AtomicU64,
    captures: AtomicU64,
}

/// Camera backend that needs no hardware.
pub struct SimulatedCamera {
    shared: Arc<Shared>,
}

impl SimulatedCamera {
    pub fn new(config: SimulatedCameraConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                next_handle: AtomicU64::new(1),
                sessions: Mutex::new(HashMap::new()),
                fail_next_open: AtomicBool::new(false),
                fault_requested: AtomicBool::new(false),
                flash: Mutex::new(FlashMode::Off),
                opens: AtomicU64::new(0),
                captures: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SimulatedCameraConfig {
        &self.shared.config
    }

    /// Make the next open attempt fail.
    pub fn fail_next_open(&self) {
        self.shared.fail_next_open.store(true, Ordering::SeqCst);
    }

    /// Make the running session report a hardware fault after its next frame.
    pub fn inject_fault(&self) {
        self.shared.fault_requested.store(true, Ordering::SeqCst);
    }

    /// Number of sessions currently held open.
    pub fn live_sessions(&self) -> usize {
        self.shared.sessions.lock().len()
    }

    pub fn open_count(&self) -> u64 {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn capture_count(&self) -> u64 {
        self.shared.captures.load(Ordering::SeqCst)
    }

    pub fn flash(&self) -> FlashMode {
        *self.shared.flash.lock()
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new(SimulatedCameraConfig::default())
    }
}

impl HardwareSessionProvider for SimulatedCamera {
    type Handle = SimulatedHandle;

    fn open_session(&self, callbacks: HardwareCallbacks<SimulatedHandle>) {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let open_callbacks = callbacks.clone();

        let spawned = thread::Builder::new()
            .name("sim-camera-open".into())
            .spawn(move || open_sequence(shared, open_callbacks));

        if let Err(e) = spawned {
            callbacks.open_failed(CameraError::HardwareOpenFailure(format!(
                "failed to spawn open thread: {}",
                e
            )));
        }
    }

    fn close_session(&self, handle: SimulatedHandle) {
        let Some(mut session) = self.shared.sessions.lock().remove(&handle.0) else {
            log::debug!("Close for unknown simulated session {:?}", handle);
            return;
        };
        session.running.store(false, Ordering::SeqCst);

        if let Some(frame_thread) = session.frame_thread.take() {
            // A fault is reported from the frame thread itself.
            if frame_thread.thread().id() != thread::current().id() && frame_thread.join().is_err() {
                log::error!("Simulated frame thread panicked");
            }
        }
        log::info!("Simulated session {:?} closed", handle);
    }

    fn request_capture(&self, handle: &SimulatedHandle, request: CaptureRequest) {
        self.shared.captures.fetch_add(1, Ordering::SeqCst);

        let session = self.shared.sessions.lock().get(&handle.0).map(|s| s.callbacks.clone());
        let Some(callbacks) = session else {
            log::warn!("Capture requested on unknown simulated session {:?}", handle);
            return;
        };

        let config = self.shared.config.clone();
        let capture_callbacks = callbacks.clone();
        let spawned = thread::Builder::new()
            .name("sim-camera-capture".into())
            .spawn(move || {
                let factor = if request.id % 2 == 1 { 2 } else { 1 };
                thread::sleep(config.capture_delay * factor);

                // The sensor finishes an exposure already started, even if the
                // session was closed meanwhile.
                if capture_callbacks.is_stale() {
                    log::debug!("Dropping simulated capture {}: session discarded", request.id);
                    return;
                }
                capture_callbacks.picture_taken(request.id, synthetic_picture(&config, request));
            });

        if let Err(e) = spawned {
            callbacks.picture_taken(
                request.id,
                Err(CameraError::CaptureFailure(format!("failed to spawn capture thread: {}", e))),
            );
        }
    }

    fn set_flash(&self, handle: &SimulatedHandle, mode: FlashMode) -> Result<(), CameraError> {
        if !self.shared.sessions.lock().contains_key(&handle.0) {
            return Err(CameraError::InvalidState(format!("unknown simulated session {:?}", handle)));
        }
        *self.shared.flash.lock() = mode;
        log::debug!("Simulated flash set to {:?}", mode);
        Ok(())
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        let handles: Vec<u64> = self.shared.sessions.lock().keys().copied().collect();
        for id in handles {
            self.close_session(SimulatedHandle(id));
        }
    }
}

fn open_sequence(shared: Arc<Shared>, callbacks: HardwareCallbacks<SimulatedHandle>) {
    thread::sleep(shared.config.open_delay);
    if callbacks.is_stale() {
        log::debug!("Simulated open abandoned (generation {})", callbacks.generation());
        return;
    }
    if shared.fail_next_open.swap(false, Ordering::SeqCst) {
        callbacks.open_failed(CameraError::HardwareOpenFailure("simulated sensor busy".into()));
        return;
    }

    let handle = SimulatedHandle(shared.next_handle.fetch_add(1, Ordering::SeqCst));
    let running = Arc::new(AtomicBool::new(true));
    shared.fault_requested.store(false, Ordering::SeqCst);

    let frame_shared = Arc::clone(&shared);
    let frame_running = Arc::clone(&running);
    let frame_callbacks = callbacks.clone();
    let frame_thread = match thread::Builder::new()
        .name("sim-camera-frames".into())
        .spawn(move || frame_loop(frame_shared, frame_running, frame_callbacks))
    {
        Ok(thread) => thread,
        Err(e) => {
            callbacks.open_failed(CameraError::HardwareOpenFailure(format!(
                "failed to spawn frame thread: {}",
                e
            )));
            return;
        }
    };

    shared.sessions.lock().insert(
        handle.0,
        LiveSession {
            running: Arc::clone(&running),
            frame_thread: Some(frame_thread),
            callbacks: callbacks.clone(),
        },
    );
    log::info!("Simulated session {:?} opened", handle);

    if let Err(orphan) = callbacks.opened(handle) {
        // Controller is gone; nobody will close this session.
        if let Some(session) = shared.sessions.lock().remove(&orphan.0) {
            session.running.store(false, Ordering::SeqCst);
        }
    }
}

fn frame_loop(shared: Arc<Shared>, running: Arc<AtomicBool>, callbacks: HardwareCallbacks<SimulatedHandle>) {
    let config = &shared.config;
    let interval = if config.frame_rate > 0.0 {
        Duration::from_secs_f64(1.0 / config.frame_rate)
    } else {
        Duration::from_millis(33)
    };
    let started = Instant::now();
    let mut sequence = 0u64;

    while running.load(Ordering::SeqCst) && !callbacks.is_stale() {
        let frame = synthetic_frame(config.width, config.height, sequence, started.elapsed())
            .with_rotation(config.sensor_rotation)
            .with_sequence(sequence);
        callbacks.frame(frame);

        if shared.fault_requested.swap(false, Ordering::SeqCst) {
            log::warn!("Injecting simulated hardware fault");
            callbacks.fault(CameraError::HardwareRuntimeFailure("simulated sensor disconnected".into()));
            break;
        }

        sequence += 1;
        thread::sleep(interval);
    }
    log::debug!("Simulated frame loop finished after {} frames", sequence);
}

/// NV21 test pattern: diagonal luma gradient scrolling with `sequence`.
fn synthetic_frame(width: u32, height: u32, sequence: u64, timestamp: Duration) -> Frame {
    let format = PixelFormat::Nv21;
    let mut data = Vec::with_capacity(format.buffer_len(width, height));
    let shift = (sequence * 4) as u32;

    for y in 0..height {
        for x in 0..width {
            data.push(((x + y + shift) % 256) as u8);
        }
    }
    let chroma_width = width.div_ceil(2);
    for cy in 0..height.div_ceil(2) {
        for cx in 0..chroma_width {
            // V then U.
            data.push((96 + (cy * 64 / height.max(1))) as u8);
            data.push((96 + (cx * 64 / width.max(1))) as u8);
        }
    }

    Frame::new(data, format, width, height, timestamp)
}

fn synthetic_picture(config: &SimulatedCameraConfig, request: CaptureRequest) -> Result<CapturedImage, CameraError> {
    let boost: u8 = match request.flash {
        FlashMode::Off => 0,
        _ => 60,
    };
    let pixels = RgbImage::from_fn(config.width, config.height, |x, y| {
        let r = (x * 255 / config.width.max(1)) as u8;
        let g = (y * 255 / config.height.max(1)) as u8;
        Rgb([r.saturating_add(boost), g.saturating_add(boost), 128u8.saturating_add(boost)])
    });

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, 90).encode_image(&pixels)?;

    Ok(CapturedImage::new(
        encoded,
        ImageEncoding::Jpeg,
        config.width,
        config.height,
        config.sensor_rotation,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use camera_session_core::{CameraSessionController, CameraState, ErrorLevel, SessionConfiguration};

    use super::*;
    use crate::permissions::SimulatedPermission;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn fast_camera() -> SimulatedCamera {
        SimulatedCamera::new(SimulatedCameraConfig {
            width: 64,
            height: 48,
            frame_rate: 60.0,
            sensor_rotation: Rotation::Deg90,
            open_delay: Duration::from_millis(5),
            capture_delay: Duration::from_millis(20),
        })
    }

    fn controller(camera: SimulatedCamera) -> CameraSessionController<SimulatedCamera> {
        CameraSessionController::new(camera, SimulatedPermission::granted(), SessionConfiguration::default()).unwrap()
    }

    fn opened_signal(controller: &CameraSessionController<SimulatedCamera>) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        controller.on_camera_opened(move || {
            tx.lock().send(())?;
            Ok(())
        });
        rx
    }

    #[test]
    fn synthetic_frames_are_well_formed() {
        let frame = synthetic_frame(33, 17, 3, Duration::ZERO);
        assert!(frame.is_valid());
        assert_eq!(frame.format(), PixelFormat::Nv21);
    }

    #[test]
    fn synthetic_picture_decodes() {
        let request = CaptureRequest {
            id: 1,
            flash: FlashMode::On,
        };
        let picture = synthetic_picture(fast_camera().config(), request).unwrap();
        let decoded = picture.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
        assert_eq!(picture.orientation(), Rotation::Deg90);
    }

    #[test]
    fn opens_streams_and_closes() {
        let controller = controller(fast_camera());
        let opened = opened_signal(&controller);

        let (frame_tx, frame_rx) = mpsc::channel();
        let frame_tx = Mutex::new(frame_tx);
        controller.on_frame(0.0, move |image| {
            frame_tx.lock().send((image.width(), image.height()))?;
            Ok(())
        });

        controller.start().unwrap();
        opened.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(controller.state(), CameraState::Opened);

        // 64x48 sensor at half scale, rotated upright.
        assert_eq!(frame_rx.recv_timeout(TIMEOUT), Ok((24, 32)));

        controller.stop(false);
        assert_eq!(controller.state(), CameraState::Closed);
        assert_eq!(controller.provider().live_sessions(), 0);
    }

    #[test]
    fn back_to_back_captures_arrive_in_order() {
        let controller = controller(fast_camera());
        let opened = opened_signal(&controller);

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        controller.on_picture_taken(move |image| {
            tx.lock().send((image.width(), image.height()))?;
            Ok(())
        });

        controller.start().unwrap();
        opened.recv_timeout(TIMEOUT).unwrap();

        assert_eq!(controller.capture(), Some(1));
        assert_eq!(controller.capture(), Some(2));

        assert_eq!(rx.recv_timeout(TIMEOUT), Ok((48, 64)));
        assert_eq!(rx.recv_timeout(TIMEOUT), Ok((48, 64)));
        assert_eq!(controller.diagnostics().pictures_delivered, 2);
        assert_eq!(controller.provider().capture_count(), 2);
    }

    #[test]
    fn graceful_stop_delivers_pending_capture() {
        let controller = controller(fast_camera());
        let opened = opened_signal(&controller);

        let (tx, rx) = mpsc::channel();
        let picture_tx = Mutex::new(tx.clone());
        controller.on_picture_taken(move |_| {
            picture_tx.lock().send("picture")?;
            Ok(())
        });
        let error_tx = Mutex::new(tx.clone());
        controller.on_camera_error(move |_, _| {
            error_tx.lock().send("error")?;
            Ok(())
        });
        let closed_tx = Mutex::new(tx);
        controller.on_camera_closed(move || {
            closed_tx.lock().send("closed")?;
            Ok(())
        });

        controller.start().unwrap();
        opened.recv_timeout(TIMEOUT).unwrap();

        assert_eq!(controller.capture(), Some(1));
        controller.stop(true);

        assert_eq!(rx.recv_timeout(TIMEOUT), Ok("picture"));
        assert_eq!(rx.recv_timeout(TIMEOUT), Ok("closed"));
        assert_eq!(controller.state(), CameraState::Closed);
        assert_eq!(controller.diagnostics().pictures_delivered, 1);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn injected_fault_closes_session() {
        let controller = controller(fast_camera());
        let opened = opened_signal(&controller);

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        controller.on_camera_error(move |_, level| {
            tx.lock().send(level)?;
            Ok(())
        });
        let (closed_tx, closed_rx) = mpsc::channel();
        let closed_tx = Mutex::new(closed_tx);
        controller.on_camera_closed(move || {
            closed_tx.lock().send(())?;
            Ok(())
        });

        controller.start().unwrap();
        opened.recv_timeout(TIMEOUT).unwrap();
        controller.provider().inject_fault();

        assert_eq!(rx.recv_timeout(TIMEOUT), Ok(ErrorLevel::Error));
        closed_rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(controller.state(), CameraState::Closed);
        assert_eq!(controller.provider().live_sessions(), 0);
    }

    #[test]
    fn failed_open_can_be_retried() {
        let camera = fast_camera();
        camera.fail_next_open();
        let controller = controller(camera);
        let opened = opened_signal(&controller);

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        controller.on_camera_error(move |error, _| {
            tx.lock().send(error.clone())?;
            Ok(())
        });

        controller.start().unwrap();
        assert!(matches!(
            rx.recv_timeout(TIMEOUT),
            Ok(CameraError::HardwareOpenFailure(_))
        ));
        assert_eq!(controller.state(), CameraState::Closed);

        controller.start().unwrap();
        opened.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(controller.provider().open_count(), 2);
    }

    #[test]
    fn flash_reaches_the_sensor() {
        let controller = controller(fast_camera());
        let opened = opened_signal(&controller);

        controller.start().unwrap();
        opened.recv_timeout(TIMEOUT).unwrap();
        controller.cycle_flash().unwrap();

        assert_eq!(controller.provider().flash(), FlashMode::Auto);
    }

    #[test]
    fn stop_before_open_completes_releases_session() {
        let controller = controller(SimulatedCamera::new(SimulatedCameraConfig {
            open_delay: Duration::from_millis(50),
            ..fast_camera().config().clone()
        }));

        controller.start().unwrap();
        controller.stop(false);
        thread::sleep(Duration::from_millis(150));

        assert_eq!(controller.state(), CameraState::Closed);
        assert_eq!(controller.provider().live_sessions(), 0);
    }
}
