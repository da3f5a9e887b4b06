//! Observer trait for per-run pipeline events.
//!
//! Inject an [`Arc<dyn RunObserver>`] via
//! [`crate::config::FacilitatorConfigBuilder::progress_callback`] to receive
//! events as a run moves through its stages. The [`crate::session::Session`]
//! uses the same trait internally to keep its form state current.
//!
//! # Example
//!
//! ```rust
//! use medical_facilitator::{AgentStatus, FacilitatorConfig, RunObserver};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StatusLog(Mutex<Vec<AgentStatus>>);
//!
//! impl RunObserver for StatusLog {
//!     fn on_status(&self, status: AgentStatus) {
//!         self.0.lock().unwrap().push(status);
//!     }
//! }
//!
//! let config = FacilitatorConfig::builder()
//!     .api_key("k")
//!     .progress_callback(Arc::new(StatusLog::default()) as Arc<dyn RunObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::RunError;
use crate::output::RunOutput;
use crate::status::AgentStatus;
use std::sync::Arc;

/// Called by the orchestrator as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one run arrive strictly in order, but
/// the observer may be invoked from a spawned task, hence `Send + Sync`.
pub trait RunObserver: Send + Sync {
    /// The run entered a new status. Never called with `Idle`; failures are
    /// reported through [`RunObserver::on_run_failed`].
    fn on_status(&self, status: AgentStatus) {
        let _ = status;
    }

    /// The extraction stage produced its structured text.
    fn on_structured_data(&self, structured: &str) {
        let _ = structured;
    }

    /// The synthesis stage produced the final report.
    fn on_final_report(&self, report: &str) {
        let _ = report;
    }

    /// The run stopped on an error; the run is now back to `Idle`.
    fn on_run_failed(&self, error: &RunError) {
        let _ = error;
    }

    /// The run reached `Done`.
    fn on_run_complete(&self, output: &RunOutput) {
        let _ = output;
    }
}

/// A no-op implementation for callers that don't need run events.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::FacilitatorConfig`].
pub type ProgressCallback = Arc<dyn RunObserver>;

/// Fans each event out to two observers, in order.
pub(crate) struct Tee<'a> {
    pub first: &'a dyn RunObserver,
    pub second: Option<&'a dyn RunObserver>,
}

impl RunObserver for Tee<'_> {
    fn on_status(&self, status: AgentStatus) {
        self.first.on_status(status);
        if let Some(o) = self.second {
            o.on_status(status);
        }
    }

    fn on_structured_data(&self, structured: &str) {
        self.first.on_structured_data(structured);
        if let Some(o) = self.second {
            o.on_structured_data(structured);
        }
    }

    fn on_final_report(&self, report: &str) {
        self.first.on_final_report(report);
        if let Some(o) = self.second {
            o.on_final_report(report);
        }
    }

    fn on_run_failed(&self, error: &RunError) {
        self.first.on_run_failed(error);
        if let Some(o) = self.second {
            o.on_run_failed(error);
        }
    }

    fn on_run_complete(&self, output: &RunOutput) {
        self.first.on_run_complete(output);
        if let Some(o) = self.second {
            o.on_run_complete(output);
        }
    }
}
