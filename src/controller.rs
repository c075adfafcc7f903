//! Sequences capture → generate → display/save for one session.
//!
//! The controller owns the settings, the source image and the single result
//! slot. Callers ask the `can_*` guards before offering an action; actions
//! re-check the same guards and answer with an [`ActionOutcome`]. Errors stop
//! here: they become a status message, a log line and, for capture and
//! generation, the [`ControllerState::Error`] state.
//!
//! Generation is split in three so a GUI holding the controller behind a
//! lock can release it while the request is on the wire:
//! [`GenerationController::begin_generation`] (guards, persistence, request
//! snapshot, busy flag), [`PendingGeneration::execute`] (the only await), and
//! [`GenerationController::complete_generation`] (clears busy, applies the
//! outcome). [`GenerationController::generate`] chains them. Only the
//! completion of the request currently in flight is applied; a caller that
//! drops its [`PendingGeneration`] releases the controller with
//! [`GenerationController::abandon_generation`].

use crate::capture::ViewCapture;
use crate::codec::{self, RawFrame};
use crate::config::ServiceConfig;
use crate::error::{ErrorKind, RenderError};
use crate::export::ResultExporter;
use crate::gemini::{GenerationResult, ImageService};
use crate::models::{GenerationRequest, RenderSettings, SettingsField};
use crate::persistence::{AppSettings, SettingsStore};
use image::DynamicImage;
use std::sync::Arc;
use uuid::Uuid;

pub const STATUS_READY: &str = "Ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Capturing,
    Generating,
    /// Last capture or generation failed. Source and result are as they
    /// were before the attempt.
    Error(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeniedReason {
    Busy,
    NoSource,
    MissingCredentials,
    NoResult,
    /// A completion or abandon arrived for a request that is not in flight.
    NotInFlight,
}

#[derive(Debug)]
pub enum ActionOutcome {
    Completed,
    Denied(DeniedReason),
    Failed(RenderError),
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    StatusChanged(String),
    StateChanged(ControllerState),
    /// Dimensions of the new source, `None` when cleared.
    SourceChanged(Option<(u32, u32)>),
    ResultChanged(Option<(u32, u32)>),
    SettingsChanged(Vec<SettingsField>),
    BusyChanged(bool),
}

pub type Observer = Box<dyn Fn(&ControllerEvent) + Send + Sync>;

/// A generation that passed its guards and is ready to go on the wire.
pub struct PendingGeneration {
    request_id: String,
    request: GenerationRequest,
    service: Arc<dyn ImageService>,
}

/// What [`PendingGeneration::execute`] hands back to the controller. Only
/// `execute` builds one.
pub struct GenerationCompletion {
    request_id: String,
    result: GenerationResult,
}

impl GenerationCompletion {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn result(&self) -> &GenerationResult {
        &self.result
    }
}

impl PendingGeneration {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub async fn execute(self) -> GenerationCompletion {
        let result = self.service.generate(&self.request).await;
        GenerationCompletion {
            request_id: self.request_id,
            result,
        }
    }
}

pub struct GenerationController {
    settings: RenderSettings,
    config: ServiceConfig,
    service: Arc<dyn ImageService>,
    capture: Arc<dyn ViewCapture>,
    store: Arc<dyn SettingsStore>,
    exporter: Arc<dyn ResultExporter>,
    source: Option<DynamicImage>,
    result: Option<DynamicImage>,
    state: ControllerState,
    /// Id of the outstanding request; the busy flag.
    in_flight: Option<String>,
    status: String,
    observers: Vec<Observer>,
}

impl GenerationController {
    /// Starts a session seeded from the persisted record, then from the
    /// environment-provided credentials in `config` where the record is
    /// empty.
    pub fn new(
        config: ServiceConfig,
        service: Arc<dyn ImageService>,
        capture: Arc<dyn ViewCapture>,
        store: Arc<dyn SettingsStore>,
        exporter: Arc<dyn ResultExporter>,
    ) -> Self {
        let mut settings = RenderSettings::new();
        let persisted = store.load();

        if let Some(url) = &config.api_base_url {
            settings.set_api_base_url(url.clone());
        }
        if !persisted.api_key.is_empty() {
            settings.set_api_key(persisted.api_key);
        } else if let Some(key) = &config.api_key {
            settings.set_api_key(key.clone());
        }
        if let Err(e) = settings.set_model(&persisted.model) {
            log::warn!("Ignoring persisted model: {}, keeping {}", e, settings.model());
        }
        settings.take_changes();

        Self {
            settings,
            config,
            service,
            capture,
            store,
            exporter,
            source: None,
            result: None,
            state: ControllerState::Idle,
            in_flight: None,
            status: STATUS_READY.to_string(),
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl Fn(&ControllerEvent) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Mutates the settings and reports what changed to observers.
    pub fn update_settings<R>(&mut self, f: impl FnOnce(&mut RenderSettings) -> R) -> R {
        let out = f(&mut self.settings);
        let changes = self.settings.take_changes();
        if !changes.is_empty() {
            self.notify(ControllerEvent::SettingsChanged(changes));
        }
        out
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn source_image(&self) -> Option<&DynamicImage> {
        self.source.as_ref()
    }

    pub fn result_image(&self) -> Option<&DynamicImage> {
        self.result.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn can_capture(&self) -> bool {
        !self.is_busy()
    }

    pub fn can_generate(&self) -> bool {
        self.generate_denial().is_none()
    }

    pub fn can_clear(&self) -> bool {
        !self.is_busy()
    }

    pub fn can_use_result_as_source(&self) -> bool {
        self.result.is_some()
    }

    pub fn can_save_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn list_views(&self) -> Vec<String> {
        self.capture.list_available_views()
    }

    /// Leaves the error state without touching images or status.
    pub fn acknowledge_error(&mut self) {
        if matches!(self.state, ControllerState::Error(_)) {
            self.set_state(ControllerState::Idle);
        }
    }

    pub fn capture(&mut self) -> ActionOutcome {
        let capture = Arc::clone(&self.capture);
        self.capture_with(|| capture.capture_active_view(), "viewport")
    }

    pub fn capture_view(&mut self, name: &str) -> ActionOutcome {
        let capture = Arc::clone(&self.capture);
        self.capture_with(|| capture.capture_view_by_name(name), name)
    }

    fn capture_with(
        &mut self,
        grab: impl FnOnce() -> Option<RawFrame>,
        label: &str,
    ) -> ActionOutcome {
        if !self.can_capture() {
            return ActionOutcome::Denied(DeniedReason::Busy);
        }

        self.set_state(ControllerState::Capturing);
        self.set_status(format!("Capturing {}...", label));

        let frame = match grab() {
            Some(frame) => frame,
            None => {
                let err = RenderError::Capture(format!("could not capture {}", label));
                return self.capture_failed(err);
            }
        };
        if frame.width == 0 || frame.height == 0 {
            let err = RenderError::Capture(format!(
                "{} produced an empty {}x{} frame",
                label, frame.width, frame.height
            ));
            return self.capture_failed(err);
        }
        let image = match codec::frame_to_image(&frame) {
            Ok(image) => image,
            Err(e) => return self.capture_failed(e.into()),
        };

        let (width, height) = (image.width(), image.height());
        self.source = Some(image);
        self.result = None;
        self.update_settings(|s| s.set_source_dimensions(width, height));
        self.notify(ControllerEvent::SourceChanged(Some((width, height))));
        self.notify(ControllerEvent::ResultChanged(None));

        log::info!("Screenshot captured: {}x{}", width, height);
        self.set_status(format!("Captured: {}x{}", width, height));
        self.set_state(ControllerState::Idle);
        ActionOutcome::Completed
    }

    fn capture_failed(&mut self, err: RenderError) -> ActionOutcome {
        log::error!("Capture error: {}", err);
        self.set_status("Failed to capture viewport");
        self.set_state(ControllerState::Error(err.kind()));
        ActionOutcome::Failed(err)
    }

    fn generate_denial(&self) -> Option<DeniedReason> {
        if self.is_busy() {
            Some(DeniedReason::Busy)
        } else if self.source.is_none() {
            Some(DeniedReason::NoSource)
        } else if !self.settings.has_credentials() {
            Some(DeniedReason::MissingCredentials)
        } else {
            None
        }
    }

    /// Checks the guards, saves `{apiKey, model}`, snapshots the request and
    /// raises the busy flag. A denial or failure is returned as the outcome
    /// to report; busy stays down in that case.
    pub fn begin_generation(&mut self) -> Result<PendingGeneration, ActionOutcome> {
        match self.generate_denial() {
            Some(DeniedReason::Busy) => {
                log::warn!("Generation already in progress, request ignored");
                return Err(ActionOutcome::Denied(DeniedReason::Busy));
            }
            Some(DeniedReason::NoSource) => {
                self.set_status("Please capture a source image first");
                return Err(ActionOutcome::Denied(DeniedReason::NoSource));
            }
            Some(reason) => {
                self.set_status("Please enter the API URL and API key");
                return Err(ActionOutcome::Denied(reason));
            }
            None => {}
        }

        // Saved before the call so a crash mid-request keeps the credentials.
        self.store.save(&AppSettings {
            api_key: self.settings.api_key().to_string(),
            model: self.settings.model().to_string(),
        });

        if self.settings.prompt().trim().is_empty() {
            return Err(self.generation_failed(
                None,
                RenderError::Validation("missing prompt".into()),
            ));
        }

        let request = match GenerationRequest::from_settings(
            &self.settings,
            self.source.as_ref(),
            &self.config,
        )
        .and_then(|request| request.validate().map(|_| request))
        {
            Ok(request) => request,
            Err(e) => return Err(self.generation_failed(None, e)),
        };

        let request_id = Uuid::new_v4().to_string();
        log::info!(
            "[{}] Generating with {} ({})",
            request_id,
            self.settings.model_display_name(),
            request.model
        );

        self.set_in_flight(Some(request_id.clone()));
        self.set_state(ControllerState::Generating);
        self.set_status("Generating...");

        Ok(PendingGeneration {
            request_id,
            request,
            service: Arc::clone(&self.service),
        })
    }

    /// Lowers the busy flag and applies the outcome. A failure leaves the
    /// previous result in place. A completion for any request other than the
    /// one in flight is dropped without touching the controller.
    pub fn complete_generation(&mut self, completion: GenerationCompletion) -> ActionOutcome {
        if self.in_flight.as_deref() != Some(completion.request_id.as_str()) {
            log::warn!(
                "[{}] Ignoring completion of a generation that is not in flight",
                completion.request_id
            );
            return ActionOutcome::Denied(DeniedReason::NotInFlight);
        }
        self.set_in_flight(None);
        match completion.result {
            Ok(image) => {
                let (width, height) = (image.width(), image.height());
                self.result = Some(image);
                log::info!(
                    "[{}] Image generated successfully: {}x{}",
                    completion.request_id,
                    width,
                    height
                );
                self.notify(ControllerEvent::ResultChanged(Some((width, height))));
                self.set_status(format!("Generated: {}x{}", width, height));
                self.set_state(ControllerState::Idle);
                ActionOutcome::Completed
            }
            Err(e) => self.generation_failed(Some(&completion.request_id), e),
        }
    }

    fn generation_failed(&mut self, request_id: Option<&str>, err: RenderError) -> ActionOutcome {
        log::error!(
            "[{}] Generation error: {}",
            request_id.unwrap_or("-"),
            err
        );
        self.set_status(format!("Generation failed - {}", err.summary()));
        self.set_state(ControllerState::Error(err.kind()));
        ActionOutcome::Failed(err)
    }

    /// Gives up on the request in flight, e.g. after its
    /// [`PendingGeneration`] was dropped. A late completion for it is
    /// ignored.
    pub fn abandon_generation(&mut self) -> ActionOutcome {
        let Some(request_id) = self.in_flight.clone() else {
            return ActionOutcome::Denied(DeniedReason::NotInFlight);
        };
        log::warn!("[{}] Generation abandoned", request_id);
        self.set_in_flight(None);
        self.set_status("Generation cancelled");
        self.set_state(ControllerState::Idle);
        ActionOutcome::Completed
    }

    /// Dropping the returned future mid-request abandons the generation.
    pub async fn generate(&mut self) -> ActionOutcome {
        let pending = match self.begin_generation() {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };
        let mut guard = InFlightGuard {
            controller: self,
            armed: true,
        };
        let completion = pending.execute().await;
        guard.armed = false;
        guard.controller.complete_generation(completion)
    }

    pub fn clear(&mut self) -> ActionOutcome {
        if !self.can_clear() {
            return ActionOutcome::Denied(DeniedReason::Busy);
        }
        self.source = None;
        self.result = None;
        self.update_settings(|s| s.set_prompt(""));
        self.notify(ControllerEvent::SourceChanged(None));
        self.notify(ControllerEvent::ResultChanged(None));
        self.set_status(STATUS_READY);
        self.set_state(ControllerState::Idle);
        ActionOutcome::Completed
    }

    pub fn use_result_as_source(&mut self) -> ActionOutcome {
        let Some(image) = self.result.take() else {
            return ActionOutcome::Denied(DeniedReason::NoResult);
        };
        let (width, height) = (image.width(), image.height());
        self.source = Some(image);
        self.update_settings(|s| s.set_source_dimensions(width, height));
        self.notify(ControllerEvent::SourceChanged(Some((width, height))));
        self.notify(ControllerEvent::ResultChanged(None));
        self.set_status("Result copied to source");
        self.set_state(ControllerState::Idle);
        ActionOutcome::Completed
    }

    /// Export problems only change the status line.
    pub fn save_result(&mut self) -> ActionOutcome {
        let Some(image) = self.result.as_ref() else {
            return ActionOutcome::Denied(DeniedReason::NoResult);
        };
        match self.exporter.export(image) {
            Ok(Some(path)) => {
                self.set_status(format!("Saved to: {}", path.display()));
                self.set_state(ControllerState::Idle);
                ActionOutcome::Completed
            }
            Ok(None) => ActionOutcome::Completed,
            Err(e) => {
                log::error!("Save error: {}", e);
                self.set_status(format!("Save error: {}", e));
                ActionOutcome::Failed(e)
            }
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.notify(ControllerEvent::StatusChanged(self.status.clone()));
    }

    fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            self.state = state;
            self.notify(ControllerEvent::StateChanged(state));
        }
    }

    fn set_in_flight(&mut self, request_id: Option<String>) {
        let was_busy = self.is_busy();
        self.in_flight = request_id;
        let busy = self.is_busy();
        if was_busy != busy {
            self.notify(ControllerEvent::BusyChanged(busy));
        }
    }

    fn notify(&self, event: ControllerEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }
}

/// Abandons the generation if `generate()` is dropped before completing.
struct InFlightGuard<'a> {
    controller: &'a mut GenerationController,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.abandon_generation();
        }
    }
}
