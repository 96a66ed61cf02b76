use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::{Mutex, ReentrantMutex};
use uuid::Uuid;

use crate::events::dispatcher::EventDispatcher;
use crate::events::event::{CameraEvent, EventKind, ListenerResult, SubscriptionHandle};
use crate::models::camera_models::{FlashMode, SessionDiagnostics};
use crate::models::captured_image::CapturedImage;
use crate::models::config::SessionConfiguration;
use crate::models::error::{CameraError, ErrorLevel};
use crate::models::frame::Frame;
use crate::models::state::CameraState;
use crate::processing::capture_sequencer::{CaptureOutcome, CaptureSequencer};
use crate::processing::flash_cycler::{self, FlashModeCycler};
use crate::processing::frame_stats::FrameIntervalStats;
use crate::processing::frame_throttler::FrameThrottler;
use crate::processing::image_transcoder::ImageTranscoder;
use crate::session::callbacks::{CallbackSink, HardwareCallbacks};
use crate::traits::capability_gate::CapabilityGate;
use crate::traits::dispatch_context::{DispatchContext, InlineContext};
use crate::traits::hardware_provider::{CaptureRequest, HardwareSessionProvider};

/// Internal mutable session state, protected by `parking_lot::Mutex`.
///
/// Never held while calling the provider or publishing events.
struct SessionState<H> {
    state: CameraState,
    generation: u64,
    handle: Option<H>,
    flash: FlashModeCycler,
    captures: CaptureSequencer,
    frame_stats: FrameIntervalStats,
    diagnostics: SessionDiagnostics,
    /// A graceful stop released the hardware and is parked in `Closing`
    /// until every pending capture has an outcome.
    awaiting_captures: bool,
}

impl<H> SessionState<H> {
    fn new(initial_flash: FlashMode) -> Self {
        Self {
            state: CameraState::Closed,
            generation: 0,
            handle: None,
            flash: FlashModeCycler::new(initial_flash),
            captures: CaptureSequencer::new(),
            frame_stats: FrameIntervalStats::new(),
            diagnostics: SessionDiagnostics::default(),
            awaiting_captures: false,
        }
    }

    /// Whether an in-flight frame or picture of `generation` may be delivered.
    fn accepts(&self, generation: u64) -> bool {
        self.generation == generation && self.state.accepts_in_flight()
    }
}

struct Inner<P: HardwareSessionProvider> {
    provider: P,
    gate: Box<dyn CapabilityGate>,
    config: SessionConfiguration,
    transcoder: ImageTranscoder,
    dispatcher: EventDispatcher,
    /// Serializes transitions and their event publication. Re-entrant so a
    /// listener may call back into the controller on the same thread.
    transition: ReentrantMutex<()>,
    state: Mutex<SessionState<P::Handle>>,
    throttler: Mutex<FrameThrottler>,
    weak_self: Weak<Inner<P>>,
}

/// Camera session lifecycle coordinator.
///
/// Generic over the hardware backend via `HardwareSessionProvider`. Owns the
/// session state machine, the hardware handle, and the event dispatcher.
///
/// ```text
/// start() ──→ [Provider] ─opened/open_failed─┐
///                  │                          ├→ state machine → EventDispatcher → listeners
///                  ├─frame─→ [FrameThrottler] → [ImageTranscoder] ─┘
///                  └─picture_taken─→ [ImageTranscoder] → [CaptureSequencer] ─┘
/// ```
///
/// All methods take `&self` and may be called from any thread, including from
/// inside a listener. `start()` and `capture()` return immediately; outcomes
/// arrive as events. Dropping the controller destroys the session.
pub struct CameraSessionController<P: HardwareSessionProvider> {
    inner: Arc<Inner<P>>,
}

impl<P: HardwareSessionProvider> CameraSessionController<P> {
    /// Controller that delivers events inline on the publishing thread.
    pub fn new<G>(provider: P, gate: G, config: SessionConfiguration) -> Result<Self, CameraError>
    where
        G: CapabilityGate + 'static,
    {
        Self::with_dispatch_context(provider, gate, config, Arc::new(InlineContext))
    }

    pub fn with_dispatch_context<G>(
        provider: P,
        gate: G,
        config: SessionConfiguration,
        context: Arc<dyn DispatchContext>,
    ) -> Result<Self, CameraError>
    where
        G: CapabilityGate + 'static,
    {
        config.validate().map_err(CameraError::Configuration)?;

        let inner = Arc::new_cyclic(|weak_self| Inner {
            provider,
            gate: Box::new(gate),
            transcoder: ImageTranscoder::from_config(&config),
            dispatcher: EventDispatcher::with_context(context),
            transition: ReentrantMutex::new(()),
            state: Mutex::new(SessionState::new(config.initial_flash)),
            throttler: Mutex::new(FrameThrottler::new(config.max_frame_rate)),
            weak_self: Weak::clone(weak_self),
            config,
        });

        Ok(Self { inner })
    }

    pub fn state(&self) -> CameraState {
        self.inner.state.lock().state
    }

    /// Current session generation. Changes on every start and every close.
    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    pub fn configuration(&self) -> &SessionConfiguration {
        &self.inner.config
    }

    pub fn provider(&self) -> &P {
        &self.inner.provider
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        let state = self.inner.state.lock();
        let as_ms = |d: std::time::Duration| d.as_secs_f64() * 1000.0;

        let mut diagnostics = state.diagnostics.clone();
        diagnostics.frame_interval_min_ms = state.frame_stats.min().map(as_ms);
        diagnostics.frame_interval_max_ms = state.frame_stats.max().map(as_ms);
        diagnostics.frame_interval_avg_ms = state.frame_stats.average().map(as_ms);
        diagnostics.listener_failures = self.inner.dispatcher.listener_failures();
        diagnostics
    }

    /// Open the camera. Transitions: closed → opening.
    ///
    /// A no-op in any other state. Returns `PermissionDenied` without touching
    /// the hardware when the capability gate refuses.
    pub fn start(&self) -> Result<(), CameraError> {
        self.inner.start()
    }

    /// Close the camera. Transitions: opening/opened → closing → closed.
    ///
    /// With `graceful`, frames and pictures already in flight are still
    /// delivered while closing, and the session stays `Closing` until every
    /// pending capture has reported. Without it, in-flight callbacks are
    /// discarded. Either way each capture still pending when the session
    /// closes is reported as a `CaptureFailure` warning before `Closed`.
    ///
    /// `stop(false)` or `destroy()` ends a graceful wait early.
    pub fn stop(&self, graceful: bool) {
        self.inner.stop(graceful);
    }

    /// Stop without grace and release every listener registration.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    /// Request a still picture. Returns the request id, or `None` (and does
    /// nothing) unless the session is opened.
    pub fn capture(&self) -> Option<u64> {
        self.inner.capture()
    }

    pub fn flash(&self) -> FlashMode {
        self.inner.state.lock().flash.current()
    }

    /// Set the flash mode. Only allowed while opening or opened.
    pub fn set_flash(&self, mode: FlashMode) -> Result<(), CameraError> {
        self.inner.set_flash(mode)
    }

    /// Advance flash off → auto → on → off and return the new mode.
    pub fn cycle_flash(&self) -> Result<FlashMode, CameraError> {
        let _transition = self.inner.transition.lock();
        let next = flash_cycler::next(self.flash())?;
        self.inner.set_flash(next)?;
        Ok(next)
    }

    /// Maximum rate frame listeners receive previews at. Zero or negative
    /// forwards every frame.
    pub fn set_max_frame_rate(&self, max_rate: f64) {
        self.inner.throttler.lock().configure(max_rate);
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionHandle
    where
        F: Fn(&CameraEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe(kind, listener)
    }

    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        self.inner.dispatcher.unsubscribe(handle)
    }

    pub fn on_camera_opened<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn() -> ListenerResult + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Opened, move |_| listener())
    }

    pub fn on_camera_closed<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn() -> ListenerResult + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Closed, move |_| listener())
    }

    /// Open and runtime failures are published while the state is still
    /// `Error`, so `start()` called from inside this listener is ignored.
    /// Retry after the listener returns, once the state is `Closed`.
    pub fn on_camera_error<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&CameraError, ErrorLevel) -> ListenerResult + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Error, move |event| match event {
            CameraEvent::Error { error, level } => listener(error, *level),
            _ => Ok(()),
        })
    }

    /// Subscribe to preview frames, throttled to `max_rate` frames per second.
    ///
    /// The throttler is shared, so the most recent subscription's rate wins.
    pub fn on_frame<F>(&self, max_rate: f64, listener: F) -> SubscriptionHandle
    where
        F: Fn(&CapturedImage) -> ListenerResult + Send + Sync + 'static,
    {
        self.set_max_frame_rate(max_rate);
        self.subscribe(EventKind::Frame, move |event| match event {
            CameraEvent::Frame(image) => listener(image),
            _ => Ok(()),
        })
    }

    pub fn on_picture_taken<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&CapturedImage) -> ListenerResult + Send + Sync + 'static,
    {
        self.subscribe(EventKind::PictureTaken, move |event| match event {
            CameraEvent::PictureTaken(image) => listener(image),
            _ => Ok(()),
        })
    }
}

impl<P: HardwareSessionProvider> Drop for CameraSessionController<P> {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}

impl<P: HardwareSessionProvider> Inner<P> {
    fn callbacks(&self, generation: u64) -> HardwareCallbacks<P::Handle> {
        let sink: Weak<dyn CallbackSink<P::Handle>> = self.weak_self.clone();
        HardwareCallbacks::new(generation, sink)
    }

    fn start(&self) -> Result<(), CameraError> {
        let _transition = self.transition.lock();

        let current = self.state.lock().state;
        if !current.is_closed() {
            log::debug!("start() ignored while {:?}", current);
            return Ok(());
        }
        if !self.gate.has_camera_capability() {
            log::warn!("Camera permission denied");
            return Err(CameraError::PermissionDenied);
        }

        let generation = {
            let mut s = self.state.lock();
            s.generation += 1;
            s.state = CameraState::Opening;
            s.captures.clear();
            s.frame_stats.reset();
            s.diagnostics.session_id = Some(Uuid::new_v4().to_string());
            s.generation
        };
        self.throttler.lock().reset();

        log::info!("Opening camera (generation {})", generation);
        self.provider.open_session(self.callbacks(generation));
        Ok(())
    }

    fn stop(&self, graceful: bool) {
        let (generation, handle) = {
            let _transition = self.transition.lock();
            let mut s = self.state.lock();
            if s.awaiting_captures && !graceful {
                drop(s);
                log::info!("Abandoning captures pending since graceful stop");
                self.finish_close();
                return;
            }
            if !s.state.is_active() {
                log::debug!("stop() ignored while {:?}", s.state);
                return;
            }
            s.state = CameraState::Closing;
            if !graceful {
                s.generation += 1;
            }
            (s.generation, s.handle.take())
        };

        log::info!("Closing camera (graceful: {})", graceful);
        // Outside the transition lock: in-flight callbacks may still need it.
        if let Some(handle) = handle {
            self.provider.close_session(handle);
        }

        let _transition = self.transition.lock();
        {
            let mut s = self.state.lock();
            if s.state != CameraState::Closing || s.awaiting_captures {
                return;
            }
            // A destroy() during close_session bumps the generation; nothing
            // of this session can be delivered after that.
            let pending = s.captures.in_flight();
            if graceful && s.generation == generation && pending > 0 {
                log::info!("Waiting for {} pending captures before closing", pending);
                s.awaiting_captures = true;
                return;
            }
        }
        self.finish_close();
    }

    /// Closing → Closed. Every capture still pending gets its outcome first.
    ///
    /// Caller holds the transition lock.
    fn finish_close(&self) {
        let outstanding = {
            let mut s = self.state.lock();
            if s.state != CameraState::Closing {
                return;
            }
            s.generation += 1;
            s.awaiting_captures = false;
            s.captures.abandon()
        };
        self.publish_outcomes(outstanding);

        {
            let mut s = self.state.lock();
            s.state = CameraState::Closed;
            debug_assert!(s.handle.is_none() || s.state.holds_hardware());
        }
        self.throttler.lock().reset();

        log::info!("Camera closed");
        self.dispatcher.publish(CameraEvent::Closed);
    }

    /// Count and publish released capture outcomes, in order.
    fn publish_outcomes(&self, outcomes: Vec<CaptureOutcome>) {
        if outcomes.is_empty() {
            return;
        }
        {
            let mut s = self.state.lock();
            for outcome in &outcomes {
                match outcome {
                    Ok(_) => s.diagnostics.pictures_delivered += 1,
                    Err(CameraError::TranscodeFailure(_)) => s.diagnostics.transcode_failures += 1,
                    Err(_) => s.diagnostics.capture_failures += 1,
                }
            }
        }

        for outcome in outcomes {
            match outcome {
                Ok(image) => self.dispatcher.publish(CameraEvent::PictureTaken(image)),
                Err(e) => {
                    log::warn!("Capture failed: {}", e);
                    self.dispatcher.publish(CameraEvent::Error {
                        error: e,
                        level: ErrorLevel::Warning,
                    });
                }
            }
        }
    }

    fn destroy(&self) {
        {
            let _transition = self.transition.lock();
            let mut s = self.state.lock();
            if s.state == CameraState::Closing {
                // Abandon whatever a graceful stop is still waiting for.
                s.generation += 1;
            }
        }
        self.stop(false);
        self.dispatcher.clear();
    }

    fn capture(&self) -> Option<u64> {
        let _transition = self.transition.lock();
        let (handle, request) = {
            let mut s = self.state.lock();
            if !s.state.is_opened() {
                log::debug!("capture() ignored while {:?}", s.state);
                return None;
            }
            let handle = s.handle.clone()?;
            let id = s.captures.issue();
            s.diagnostics.captures_requested += 1;
            (handle, CaptureRequest { id, flash: s.flash.current() })
        };

        log::debug!("Requesting capture {}", request.id);
        self.provider.request_capture(&handle, request);
        Some(request.id)
    }

    fn set_flash(&self, mode: FlashMode) -> Result<(), CameraError> {
        let _transition = self.transition.lock();
        let handle = {
            let mut s = self.state.lock();
            if !s.state.is_active() {
                return Err(CameraError::InvalidState(format!(
                    "flash can only be set while opening or opened, camera is {:?}",
                    s.state
                )));
            }
            s.flash.set(mode);
            s.handle.clone()
        };

        if let Some(handle) = handle {
            self.push_flash(&handle, mode);
        }
        Ok(())
    }

    fn push_flash(&self, handle: &P::Handle, mode: FlashMode) {
        if let Err(e) = self.provider.set_flash(handle, mode) {
            log::warn!("Failed to apply flash mode {:?}: {}", mode, e);
            self.dispatcher.publish(CameraEvent::Error {
                error: e,
                level: ErrorLevel::Warning,
            });
        }
    }

    /// Orient and rescale a still capture for delivery.
    fn prepare_picture(&self, image: CapturedImage) -> CaptureOutcome {
        let image = if self.config.auto_orient {
            self.transcoder.apply_orientation(&image, image.orientation())?
        } else {
            image
        };
        if (self.config.picture_scale - 1.0).abs() < f32::EPSILON {
            return Ok(image);
        }
        self.transcoder.to_display_image(&image, self.config.picture_scale)
    }

    fn prepare_preview(&self, frame: &Frame) -> Result<CapturedImage, CameraError> {
        let preview = self.transcoder.to_preview_image(frame)?;
        if self.config.auto_orient {
            self.transcoder.apply_orientation(&preview, preview.orientation())
        } else {
            Ok(preview)
        }
    }
}

impl<P: HardwareSessionProvider> CallbackSink<P::Handle> for Inner<P> {
    fn current_generation(&self) -> u64 {
        self.state.lock().generation
    }

    fn on_opened(&self, generation: u64, handle: P::Handle) {
        let transition = self.transition.lock();
        let accepted = {
            let mut s = self.state.lock();
            if s.generation == generation && s.state == CameraState::Opening {
                s.state = CameraState::Opened;
                s.handle = Some(handle.clone());
                s.diagnostics.sessions_opened += 1;
                s.diagnostics.last_opened_at = Some(Utc::now());
                debug_assert!(s.state.holds_hardware());
                Some(s.flash.current())
            } else {
                None
            }
        };

        let Some(flash) = accepted else {
            drop(transition);
            log::debug!("Releasing camera opened for stale generation {}", generation);
            self.provider.close_session(handle);
            return;
        };

        log::info!("Camera opened (generation {})", generation);
        self.dispatcher.publish(CameraEvent::Opened);
        self.push_flash(&handle, flash);
    }

    fn on_open_failed(&self, generation: u64, error: CameraError) {
        let _transition = self.transition.lock();
        {
            let mut s = self.state.lock();
            if s.generation != generation || s.state != CameraState::Opening {
                log::debug!("Discarding open failure for stale generation {}", generation);
                return;
            }
            s.state = CameraState::Error;
            s.generation += 1;
        }

        let error = match error {
            CameraError::PermissionDenied | CameraError::HardwareOpenFailure(_) => error,
            other => CameraError::HardwareOpenFailure(other.to_string()),
        };
        log::error!("Camera open failed: {}", error);
        self.dispatcher.publish(CameraEvent::Error {
            error,
            level: ErrorLevel::Error,
        });

        let mut s = self.state.lock();
        if s.state == CameraState::Error {
            s.state = CameraState::Closed;
        }
    }

    fn on_frame(&self, generation: u64, frame: Frame) {
        {
            let mut s = self.state.lock();
            if !s.accepts(generation) {
                log::debug!("Discarding frame {} of generation {}", frame.sequence(), generation);
                return;
            }
            s.diagnostics.frames_received += 1;
            s.frame_stats.record(frame.timestamp());
        }

        if self.dispatcher.listener_count(EventKind::Frame) == 0 {
            return;
        }
        if !self.throttler.lock().should_forward(frame.timestamp()) {
            self.state.lock().diagnostics.frames_dropped += 1;
            return;
        }

        let result = self.prepare_preview(&frame);

        // Never block the hardware thread on a transition in progress.
        let Some(_transition) = self.transition.try_lock() else {
            log::debug!("Dropping frame {}: transition in progress", frame.sequence());
            self.state.lock().diagnostics.frames_dropped += 1;
            return;
        };
        {
            let mut s = self.state.lock();
            if !s.accepts(generation) {
                return;
            }
            match &result {
                Ok(_) => s.diagnostics.frames_forwarded += 1,
                Err(_) => s.diagnostics.transcode_failures += 1,
            }
        }

        match result {
            Ok(image) => self.dispatcher.publish(CameraEvent::Frame(image)),
            Err(e) => {
                log::warn!("Dropping frame {}: {}", frame.sequence(), e);
                self.dispatcher.publish(CameraEvent::Error {
                    error: e,
                    level: ErrorLevel::Warning,
                });
            }
        }
    }

    fn on_picture(&self, generation: u64, request_id: u64, result: Result<CapturedImage, CameraError>) {
        {
            let s = self.state.lock();
            if !s.accepts(generation) || !s.captures.is_pending(request_id) {
                log::debug!("Discarding picture {} of generation {}", request_id, generation);
                return;
            }
        }

        let outcome = result.and_then(|image| self.prepare_picture(image));

        let _transition = self.transition.lock();
        let ready = {
            let mut s = self.state.lock();
            if !s.accepts(generation) {
                return;
            }
            s.captures.complete(request_id, outcome)
        };
        self.publish_outcomes(ready);

        let drained = {
            let s = self.state.lock();
            s.awaiting_captures && s.captures.in_flight() == 0
        };
        if drained {
            self.finish_close();
        }
    }

    fn on_fault(&self, generation: u64, error: CameraError) {
        let transition = self.transition.lock();
        let (handle, outstanding) = {
            let mut s = self.state.lock();
            if s.generation != generation {
                log::debug!("Discarding fault for stale generation {}", generation);
                return;
            }
            let current = s.state;
            match current {
                CameraState::Opening => {
                    drop(s);
                    drop(transition);
                    self.on_open_failed(generation, error);
                    return;
                }
                CameraState::Opened => {
                    s.state = CameraState::Error;
                    s.generation += 1;
                    (s.handle.take(), s.captures.abandon())
                }
                CameraState::Closing if s.awaiting_captures => {
                    drop(s);
                    log::warn!("Hardware fault while waiting for captures: {}", error);
                    self.finish_close();
                    return;
                }
                other => {
                    log::debug!("Ignoring hardware fault while {:?}: {}", other, error);
                    return;
                }
            }
        };

        let error = match error {
            CameraError::HardwareRuntimeFailure(_) => error,
            other => CameraError::HardwareRuntimeFailure(other.to_string()),
        };
        log::error!("Camera fault: {}", error);
        self.dispatcher.publish(CameraEvent::Error {
            error,
            level: ErrorLevel::Error,
        });
        self.publish_outcomes(outstanding);
        drop(transition);

        if let Some(handle) = handle {
            self.provider.close_session(handle);
        }

        let _transition = self.transition.lock();
        {
            let mut s = self.state.lock();
            if s.state != CameraState::Error {
                return;
            }
            s.state = CameraState::Closed;
        }
        self.throttler.lock().reset();

        log::info!("Camera closed after fault");
        self.dispatcher.publish(CameraEvent::Closed);
    }
}
