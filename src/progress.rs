//! Run reporting: stage callbacks while a render is in flight, and the
//! progress record persisted next to the artifact once it succeeds.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its states.
//!
//! # Why callbacks instead of channels?
//!
//! Callers can forward events to a broadcast channel, a metrics sink or a log
//! line without the library knowing how the host application communicates.
//! The trait is `Send + Sync` so one callback can serve many concurrent runs;
//! every event carries the run's request id to tell them apart.
//!
//! # Example
//!
//! ```rust
//! use edgequake_page2pdf::{PipelineConfig, PipelineProgressCallback, PipelineStage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct StageCounter(AtomicUsize);
//!
//! impl PipelineProgressCallback for StageCounter {
//!     fn on_stage(&self, _request_id: &str, _stage: PipelineStage) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(StageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::StatusClass;
use crate::pipeline::cost::CostMetrics;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Pipeline states, in the order a successful run visits them.
///
/// [`NavigationFailed`](Self::NavigationFailed) and
/// [`ErrorThreshold`](Self::ErrorThreshold) are terminal: a run that enters
/// either stops there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    Validating,
    PageAcquired,
    Navigating,
    NavigationFailed,
    ErrorThreshold,
    Rendering,
    Encrypting,
    Uploading,
    MetricsComputed,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Validating => "validating",
            PipelineStage::PageAcquired => "page-acquired",
            PipelineStage::Navigating => "navigating",
            PipelineStage::NavigationFailed => "navigation-failed",
            PipelineStage::ErrorThreshold => "error-threshold",
            PipelineStage::Rendering => "rendering",
            PipelineStage::Encrypting => "encrypting",
            PipelineStage::Uploading => "uploading",
            PipelineStage::MetricsComputed => "metrics-computed",
            PipelineStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called on entry to each state.
    fn on_stage(&self, request_id: &str, stage: PipelineStage) {
        let _ = (request_id, stage);
    }

    /// Called once per run that produced a response (any class).
    ///
    /// Runs that end in an infrastructure `Err` do not get this call.
    fn on_complete(&self, request_id: &str, status: StatusClass) {
        let _ = (request_id, status);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

// ── Persisted record ─────────────────────────────────────────────────────

/// Side document written to `{pathPrefix}/progress.json` after a successful run.
///
/// The request echo comes from [`crate::request::RenderRequest::redacted`], so
/// passwords never appear in clear.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub request_id: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub request: serde_json::Value,
    pub result: ProgressResult,
    pub security: SecurityOutcome,
    pub cost: CostMetrics,
}

/// Outcome summary inside a [`ProgressRecord`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResult {
    pub bucket: String,
    pub key: String,
    pub url: String,
    pub size_bytes: usize,
    pub had_page_errors: bool,
    pub page_error_count: usize,
    pub console_message_count: usize,
}

/// Whether protection was asked for and whether it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecurityOutcome {
    pub requested: bool,
    pub applied: bool,
}
