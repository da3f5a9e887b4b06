//! An interactive session: the form state behind one user.
//!
//! A [`Session`] holds the selected image and the document text, starts runs
//! on the tokio runtime, and publishes a [`SessionSnapshot`] through a
//! `watch` channel whenever anything visible changes. Front ends render the
//! snapshot and never mutate it directly.
//!
//! Only one run is current at a time. Starting a new run aborts the previous
//! task and bumps the snapshot's `generation`; each run's observer carries
//! the generation it was started with and drops its updates once that is no
//! longer current, so a late event from a superseded run can never overwrite
//! a newer one.

use crate::config::FacilitatorConfig;
use crate::error::{FacilitatorError, RunError};
use crate::export;
use crate::model::GenerativeModel;
use crate::orchestrator::{Orchestrator, RunRequest};
use crate::output::RunOutput;
use crate::pipeline::encode::EncodedFile;
use crate::pipeline::input;
use crate::progress::RunObserver;
use crate::status::{AgentStatus, RunState};
use futures::Stream;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt as _;
use tracing::{debug, info, warn};

/// Everything a front end shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Name of the selected image, if any.
    pub image_name: Option<String>,
    pub state: RunState,
    pub structured_data: Option<String>,
    pub final_report: Option<String>,
    /// Inline error message (precondition or run failure).
    pub error: Option<String>,
    /// Incremented every time a run starts.
    pub generation: u64,
}

impl SessionSnapshot {
    pub fn status(&self) -> AgentStatus {
        self.state.status()
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_running()
    }
}

/// Form state plus run management.
pub struct Session {
    orchestrator: Arc<Orchestrator>,
    image: Option<Arc<EncodedFile>>,
    document_text: String,
    state: Arc<watch::Sender<SessionSnapshot>>,
    active: Option<AbortHandle>,
    download_timeout_secs: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("image", &self.image)
            .field("document_len", &self.document_text.len())
            .field("snapshot", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session using the backend selected by `config`.
    pub fn new(config: &FacilitatorConfig) -> Result<Self, FacilitatorError> {
        Ok(Self::from_orchestrator(Orchestrator::new(config)?, config))
    }

    /// Create a session around an explicit backend.
    pub fn with_model(model: Arc<dyn GenerativeModel>, config: &FacilitatorConfig) -> Self {
        Self::from_orchestrator(Orchestrator::with_model(model, config), config)
    }

    fn from_orchestrator(orchestrator: Orchestrator, config: &FacilitatorConfig) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self {
            orchestrator: Arc::new(orchestrator),
            image: None,
            document_text: String::new(),
            state: Arc::new(tx),
            active: None,
            download_timeout_secs: config.download_timeout_secs,
        }
    }

    // ── Inputs ───────────────────────────────────────────────────────────

    /// Load, validate and select an image from a path or URL.
    ///
    /// On error the previous selection is kept.
    pub async fn select_image(&mut self, input: &str) -> Result<&EncodedFile, FacilitatorError> {
        let file = input::resolve_image(input, self.download_timeout_secs).await?;
        Ok(self.set_image(file))
    }

    /// Select an already-encoded image, replacing any previous one.
    pub fn set_image(&mut self, file: EncodedFile) -> &EncodedFile {
        info!("Selected image '{}' ({})", file.name, file.mime_type);
        let name = file.name.clone();
        self.state.send_modify(|s| s.image_name = Some(name));
        self.image.insert(Arc::new(file))
    }

    pub fn image(&self) -> Option<&EncodedFile> {
        self.image.as_deref()
    }

    pub fn set_document_text(&mut self, text: impl Into<String>) {
        self.document_text = text.into();
    }

    pub fn document_text(&self) -> &str {
        &self.document_text
    }

    // ── Runs ─────────────────────────────────────────────────────────────

    /// Start a run with the current inputs.
    ///
    /// Without both inputs the snapshot's `error` is set to the
    /// missing-input message, the status is left alone and
    /// [`FacilitatorError::MissingInput`] is returned. Otherwise error,
    /// structured data and report are cleared, any in-flight run is
    /// superseded, and the new run is spawned.
    pub fn start_run(&mut self) -> Result<RunHandle, FacilitatorError> {
        let request = match RunRequest::new(self.image.clone(), self.document_text.as_str()) {
            Ok(request) => request,
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| s.error = Some(message));
                return Err(e);
            }
        };

        if let Some(previous) = self.active.take() {
            if !previous.is_finished() {
                warn!("Superseding in-flight run");
            }
            previous.abort();
        }

        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            s.state = RunState::Idle;
            s.error = None;
            s.structured_data = None;
            s.final_report = None;
            generation = s.generation;
        });
        debug!("Starting run #{}", generation);

        let observer = SessionObserver {
            state: Arc::clone(&self.state),
            generation,
        };
        let orchestrator = Arc::clone(&self.orchestrator);
        let join = tokio::spawn(async move { orchestrator.run(&request, &observer).await });
        self.active = Some(join.abort_handle());

        Ok(RunHandle {
            join,
            generation,
            state: Arc::clone(&self.state),
        })
    }

    /// True while the current run is between `RetrievingData` and
    /// `SavingReport`.
    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// The display status, starting with the current one.
    ///
    /// Intermediate values may be skipped if the consumer is slower than the
    /// run; the latest value is always delivered.
    pub fn status_stream(&self) -> impl Stream<Item = AgentStatus> + Send + 'static {
        WatchStream::new(self.state.subscribe()).map(|s| s.status())
    }

    /// Save the current final report. See [`export::write_report`].
    pub async fn export_report(&self, target: impl AsRef<Path>) -> Result<PathBuf, FacilitatorError> {
        let report = self
            .state
            .borrow()
            .final_report
            .clone()
            .ok_or(FacilitatorError::NoReport)?;
        export::write_report(target, &report).await
    }
}

/// Applies one run's events to the session snapshot.
struct SessionObserver {
    state: Arc<watch::Sender<SessionSnapshot>>,
    generation: u64,
}

impl SessionObserver {
    fn apply(&self, update: impl FnOnce(&mut SessionSnapshot)) {
        self.state.send_if_modified(|s| {
            if s.generation != self.generation {
                debug!("Dropping update from superseded run #{}", self.generation);
                return false;
            }
            update(s);
            true
        });
    }
}

impl RunObserver for SessionObserver {
    fn on_status(&self, status: AgentStatus) {
        self.apply(|s| {
            s.state = match status {
                AgentStatus::Done => RunState::Succeeded,
                other => RunState::Running(other),
            }
        });
    }

    fn on_structured_data(&self, structured: &str) {
        self.apply(|s| s.structured_data = Some(structured.to_string()));
    }

    fn on_final_report(&self, report: &str) {
        self.apply(|s| s.final_report = Some(report.to_string()));
    }

    fn on_run_failed(&self, error: &RunError) {
        let message = error.to_string();
        self.apply(|s| {
            s.state = RunState::Failed(message.clone());
            s.error = Some(message);
        });
    }
}

/// Awaitable handle to a spawned run.
#[derive(Debug)]
pub struct RunHandle {
    join: JoinHandle<Result<RunOutput, RunError>>,
    generation: u64,
    state: Arc<watch::Sender<SessionSnapshot>>,
}

impl RunHandle {
    /// Which run this is (matches [`SessionSnapshot::generation`]).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel the run. Its handle then resolves to [`RunError::Superseded`]
    /// and, unless a newer run has started, the session returns to `Idle`.
    pub fn abort(&self) {
        self.join.abort();
        self.settle(RunState::Idle, None);
    }

    /// Wait for the run to finish.
    pub async fn wait(mut self) -> Result<RunOutput, RunError> {
        match (&mut self.join).await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                // An event already in flight when the task was cancelled may
                // have landed after `abort`.
                self.settle(RunState::Idle, None);
                Err(RunError::Superseded)
            }
            Err(e) => {
                let error = RunError::Aborted(e.to_string());
                let message = error.to_string();
                self.settle(RunState::Failed(message.clone()), Some(message));
                Err(error)
            }
        }
    }

    /// End this run's part of the snapshot, if it is still the current run
    /// and has not already finished.
    fn settle(&self, state: RunState, error: Option<String>) {
        let generation = self.generation;
        self.state.send_if_modified(|s| {
            if s.generation != generation || !s.is_busy() {
                return false;
            }
            debug!("Run #{} ended without completing", generation);
            s.state = state;
            s.error = error;
            true
        });
    }
}
