//! Scan session: one user, one cycle at a time.
//!
//! The session lock is never held across the classifier call. Every new
//! cycle and every reset bumps `generation`; a classification that returns
//! under an older generation is dropped instead of applied. A cycle whose
//! caller goes away mid-flight is put back to `Idle` by `CycleGuard`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use payguide_core::{
    AcquireSource, CameraFailure, CanonicalLabel, Classifier, FaultKind, ImageBuffer, Language,
    LanguagePack, ScanError, ScanPhase,
};
use payguide_media::{validate_upload, CameraSession, UploadPolicy, UploadedFile};
use payguide_understanding::normalize;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::presenter::Presenter;

/// What the result area currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Display {
    Detecting { message: String },
    Result { label: CanonicalLabel, message: String },
    Error { fault: FaultKind, message: String },
}

/// A completed, presented scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub label: CanonicalLabel,
    pub message: String,
    pub raw_answer: String,
    pub language: Language,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Presented(ScanReport),
    /// The session was reset while the classifier was busy.
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub source: String,
    pub mime_type: String,
    pub bytes: usize,
}

/// Read-only view of the session for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub phase: ScanPhase,
    pub language: Language,
    pub image: Option<ImageSummary>,
    pub display: Option<Display>,
}

#[derive(Debug, Default)]
struct SessionInner {
    phase: ScanPhase,
    language: Language,
    image: Option<ImageBuffer>,
    display: Option<Display>,
    generation: u64,
}

pub struct ScanSession {
    inner: Mutex<SessionInner>,
    camera: Option<Mutex<CameraSession>>,
    classifier: Arc<dyn Classifier>,
    presenter: Presenter,
    upload_policy: UploadPolicy,
    /// Generation of the last cycle dropped before it finished.
    abandoned: AtomicU64,
}

/// Armed for the length of a cycle; dropping it armed means the caller's
/// future was cancelled.
struct CycleGuard<'a> {
    session: &'a ScanSession,
    generation: u64,
    armed: bool,
}

impl<'a> CycleGuard<'a> {
    fn new(session: &'a ScanSession, generation: u64) -> Self {
        Self {
            session,
            generation,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.session.abandoned.store(self.generation, Ordering::SeqCst);
        // If the state lock is busy, the next lock holder settles it.
        let Ok(mut inner) = self.session.inner.try_lock() else {
            return;
        };
        if self.session.settle_abandoned(&mut inner) {
            if let Some(camera) = &self.session.camera {
                if let Ok(mut camera) = camera.try_lock() {
                    camera.release();
                }
            }
        }
    }
}

impl ScanSession {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        presenter: Presenter,
        upload_policy: UploadPolicy,
        language: Language,
    ) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                language,
                ..Default::default()
            }),
            camera: None,
            classifier,
            presenter,
            upload_policy,
            abandoned: AtomicU64::new(0),
        }
    }

    pub fn with_camera(mut self, camera: CameraSession) -> Self {
        self.camera = Some(Mutex::new(camera));
        self
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        self.settle_abandoned(&mut inner);
        SessionSnapshot {
            phase: inner.phase,
            language: inner.language,
            image: inner.image.as_ref().map(|img| ImageSummary {
                source: img.source.clone(),
                mime_type: img.mime_type.clone(),
                bytes: img.len(),
            }),
            display: inner.display.clone(),
        }
    }

    pub async fn language(&self) -> Language {
        self.inner.lock().await.language
    }

    /// UI strings in the active language.
    pub async fn strings(&self) -> LanguagePack {
        let language = self.language().await;
        self.presenter.catalog().strings(language).clone()
    }

    /// Localized text for `error` in the active language.
    pub async fn fault_message(&self, error: &ScanError) -> String {
        let language = self.language().await;
        self.presenter.catalog().fault_message(error.kind(), language).to_string()
    }

    /// Block until spoken feedback has finished.
    pub async fn finish_speaking(&self) {
        self.presenter.finish().await;
    }

    /// Switch the active language. An unknown code leaves it unchanged.
    pub async fn set_language(&self, code: &str) -> Result<Language, ScanError> {
        let language = match Language::from_code(code) {
            Ok(language) => language,
            Err(e) => return Err(self.reject(e).await),
        };
        self.inner.lock().await.language = language;
        info!(language = %language, "Language changed");
        Ok(language)
    }

    /// Validate an uploaded file and run it through the classifier.
    #[instrument(skip(self, file), fields(file = %file.name))]
    pub async fn scan_upload(&self, file: UploadedFile) -> Result<ScanOutcome, ScanError> {
        let generation = self.begin_cycle(AcquireSource::Upload).await?;
        let guard = CycleGuard::new(self, generation);
        let result = match validate_upload(file, &self.upload_policy) {
            Ok(image) => self.classify_acquired(generation, image).await,
            Err(e) => Err(self.fail(generation, e).await),
        };
        guard.disarm();
        result
    }

    /// Report an upload whose body could not be decoded into a file at all.
    ///
    /// Ends the cycle like any other invalid file, unless a cycle is already
    /// running, in which case the caller gets `Busy`.
    pub async fn fail_upload(&self, error: ScanError) -> ScanError {
        match self.begin_cycle(AcquireSource::Upload).await {
            Ok(generation) => self.fail(generation, error).await,
            Err(busy) => busy,
        }
    }

    /// Open the camera preview.
    pub async fn start_camera(&self) -> Result<(), ScanError> {
        let generation = self.begin_cycle(AcquireSource::CameraStarting).await?;
        let guard = CycleGuard::new(self, generation);
        let result = self.open_camera(generation).await;
        guard.disarm();
        result
    }

    async fn open_camera(&self, generation: u64) -> Result<(), ScanError> {
        let Some(camera) = &self.camera else {
            let e = ScanError::CameraUnavailable(CameraFailure::Unsupported);
            return Err(self.fail(generation, e).await);
        };

        let mut camera = camera.lock().await;
        let opened = camera.start().await;
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            camera.release();
            return match opened {
                Ok(()) => {
                    debug!("Camera opened after reset; released");
                    Ok(())
                }
                Err(failure) => {
                    debug!(failure = %failure, "Camera failed after reset");
                    Err(ScanError::CameraUnavailable(failure))
                }
            };
        }
        match opened {
            Ok(()) => {
                inner.phase = ScanPhase::Acquiring(AcquireSource::CameraLive);
                info!("Camera live");
                Ok(())
            }
            Err(failure) => {
                drop(inner);
                Err(self.fail(generation, ScanError::CameraUnavailable(failure)).await)
            }
        }
    }

    /// Grab a frame from the live camera, release it, and classify the frame.
    pub async fn capture(&self) -> Result<ScanOutcome, ScanError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            self.settle_abandoned(&mut inner);
            if inner.phase.is_camera_live() {
                inner.phase = ScanPhase::Classifying;
                inner.generation
            } else if inner.phase.can_begin() {
                drop(inner);
                return Err(self.reject(ScanError::CameraUnavailable(CameraFailure::NoDevice)).await);
            } else {
                drop(inner);
                return Err(self.reject(ScanError::Busy).await);
            }
        };

        let guard = CycleGuard::new(self, generation);
        let frame = match &self.camera {
            Some(camera) => camera.lock().await.capture().await,
            None => Err(ScanError::CameraUnavailable(CameraFailure::Unsupported)),
        };
        let result = match frame {
            Ok(image) => self.classify_acquired(generation, image).await,
            Err(e) => Err(self.fail(generation, e).await),
        };
        guard.disarm();
        result
    }

    /// Back to a clean `Idle`: camera released, result cleared, any
    /// in-flight classification orphaned.
    pub async fn reset(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.phase = ScanPhase::Idle;
            inner.image = None;
            inner.display = None;
        }
        if let Some(camera) = &self.camera {
            camera.lock().await.release();
        }
        self.presenter.stop().await;
        info!("Session reset");
    }

    async fn begin_cycle(&self, source: AcquireSource) -> Result<u64, ScanError> {
        let mut inner = self.inner.lock().await;
        self.settle_abandoned(&mut inner);
        if !inner.phase.can_begin() {
            drop(inner);
            return Err(self.reject(ScanError::Busy).await);
        }
        inner.generation += 1;
        inner.phase = ScanPhase::Acquiring(source);
        inner.image = None;
        inner.display = None;
        debug!(generation = inner.generation, source = ?source, "Cycle started");
        Ok(inner.generation)
    }

    /// Put a cycle whose caller went away back to `Idle`. Returns whether
    /// anything changed.
    fn settle_abandoned(&self, inner: &mut SessionInner) -> bool {
        if inner.phase.can_begin() || inner.generation != self.abandoned.load(Ordering::SeqCst) {
            return false;
        }
        warn!(generation = inner.generation, phase = ?inner.phase, "Scan abandoned mid-cycle; session back to idle");
        inner.phase = ScanPhase::Idle;
        inner.image = None;
        inner.display = None;
        true
    }

    async fn classify_acquired(&self, generation: u64, image: ImageBuffer) -> Result<ScanOutcome, ScanError> {
        let language = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return Ok(ScanOutcome::Discarded);
            }
            let message = self.presenter.catalog().strings(inner.language).detecting.clone();
            inner.phase = ScanPhase::Classifying;
            inner.image = Some(image.clone());
            inner.display = Some(Display::Detecting { message });
            inner.language
        };
        self.presenter.announce_detecting(language).await;

        let answer = self.classifier.classify(&image).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            info!(generation, "Session reset during classification; result discarded");
            return Ok(ScanOutcome::Discarded);
        }
        let answer = match answer {
            Ok(answer) => answer,
            Err(e) => {
                drop(inner);
                return Err(self.fail(generation, e).await);
            }
        };

        inner.phase = ScanPhase::Normalizing;
        let label = normalize(&answer);
        inner.phase = ScanPhase::Presenting;
        let language = inner.language;
        let message = self.presenter.catalog().result_message(label, language).to_string();
        inner.display = Some(Display::Result {
            label,
            message: message.clone(),
        });
        drop(inner);

        info!(label = ?label, answer = %answer, "Scan complete");
        self.presenter.present_result(label, language).await;

        let mut inner = self.inner.lock().await;
        if inner.generation == generation && inner.phase == ScanPhase::Presenting {
            inner.phase = ScanPhase::Idle;
        }

        Ok(ScanOutcome::Presented(ScanReport {
            scan_id: Uuid::new_v4(),
            label,
            message,
            raw_answer: answer,
            language,
            completed_at: Utc::now(),
        }))
    }

    /// End the cycle with `error`: record it, speak it, hand it back.
    async fn fail(&self, generation: u64, error: ScanError) -> ScanError {
        if !error.ends_cycle() {
            return self.reject(error).await;
        }
        let language = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!(error = %error, "Error from a stale cycle ignored");
                return error;
            }
            let message = self
                .presenter
                .catalog()
                .fault_message(error.kind(), inner.language)
                .to_string();
            inner.phase = ScanPhase::Errored;
            inner.display = Some(Display::Error {
                fault: error.kind(),
                message,
            });
            inner.language
        };
        warn!(error = %error, "Scan failed");
        self.presenter.present_fault(&error, language).await;
        error
    }

    /// Refuse a request without touching the current cycle.
    async fn reject(&self, error: ScanError) -> ScanError {
        let language = self.language().await;
        debug!(error = %error, "Request rejected");
        self.presenter.present_fault(&error, language).await;
        error
    }
}
