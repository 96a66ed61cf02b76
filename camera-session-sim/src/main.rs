//! Runs one simulated camera session end to end and prints its diagnostics.
//!
//! Usage: `camera-sim-demo [config.json]`. Set `RUST_LOG=debug` for detail.

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use camera_session_core::{CameraSessionController, SerialContext, SessionConfiguration};
use camera_session_sim::{SimulatedCamera, SimulatedPermission};

fn load_configuration() -> Result<SessionConfiguration, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)?;
            Ok(SessionConfiguration::from_json(&json)?)
        }
        None => Ok(SessionConfiguration::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = load_configuration()?;
    let max_frame_rate = config.max_frame_rate;
    let context = Arc::new(SerialContext::new("camera-events")?);
    let controller = CameraSessionController::with_dispatch_context(
        SimulatedCamera::default(),
        SimulatedPermission::granted(),
        config,
        context,
    )?;

    let (opened_tx, opened_rx) = mpsc::channel();
    let opened_tx = Mutex::new(opened_tx);
    controller.on_camera_opened(move || {
        log::info!("Listener: camera opened");
        opened_tx.lock().send(())?;
        Ok(())
    });
    controller.on_camera_closed(|| {
        log::info!("Listener: camera closed");
        Ok(())
    });
    controller.on_camera_error(|error, level| {
        log::warn!("Listener: {:?} {}", level, error);
        Ok(())
    });

    let frames = Arc::new(AtomicUsize::new(0));
    let frame_count = Arc::clone(&frames);
    controller.on_frame(max_frame_rate, move |image| {
        let n = frame_count.fetch_add(1, Ordering::Relaxed);
        log::debug!("Frame {}: {}x{} ({} bytes)", n, image.width(), image.height(), image.data().len());
        Ok(())
    });

    let (picture_tx, picture_rx) = mpsc::channel();
    let picture_tx = Mutex::new(picture_tx);
    controller.on_picture_taken(move |image| {
        log::info!("Picture: {}x{} {:?}", image.width(), image.height(), image.encoding());
        picture_tx.lock().send(image.data().len())?;
        Ok(())
    });

    controller.start()?;
    opened_rx.recv_timeout(Duration::from_secs(5))?;

    thread::sleep(Duration::from_millis(500));
    let flash = controller.cycle_flash()?;
    log::info!("Flash mode now {:?}", flash);

    let requested: Vec<u64> = [controller.capture(), controller.capture()].into_iter().flatten().collect();
    for _ in &requested {
        let bytes = picture_rx.recv_timeout(Duration::from_secs(5))?;
        log::info!("Received picture of {} bytes", bytes);
    }

    controller.stop(true);

    println!("Preview frames delivered: {}", frames.load(Ordering::Relaxed));
    println!("{}", serde_json::to_string_pretty(&controller.diagnostics())?);
    Ok(())
}
