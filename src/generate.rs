//! The render pipeline: one request in, one [`RenderResponse`] out.
//!
//! ## State machine
//!
//! ```text
//! Validating ─▶ PageAcquired ─▶ Navigating ─┬─▶ (NavigationFailed)   502
//!     │                                     ├─▶ (ErrorThreshold)     422
//!     ▼                                     └─▶ Rendering
//! (invalid url) 400                               │
//!                                                 ▼
//!                    Done ◀─ MetricsComputed ◀─ Uploading ◀─ Encrypting
//! ```
//!
//! ## Why page-content failures are responses, not errors
//!
//! A target that 404s or throws in its own scripts is a perfectly ordinary
//! outcome for a render service; the caller needs the diagnostic logs, not a
//! stack trace. Only infrastructure failures (no page from the renderer, the
//! page driver dying mid-render, the object store refusing a put) are
//! returned as `Err`, for the outer handler to turn into a server error.
//!
//! Whatever happens after a page is acquired, it is closed exactly once
//! before [`PdfPipeline::run`] returns.

use crate::clock::{self, Clock};
use crate::config::PipelineConfig;
use crate::error::Page2PdfError;
use crate::output::{RenderResponse, RunMetrics, StatusClass, SuccessBody};
use crate::pipeline::collector::{ErrorCollector, PageLogs};
use crate::pipeline::{cost, encrypt, validate};
use crate::progress::{PipelineStage, ProgressRecord, ProgressResult, SecurityOutcome};
use crate::renderer::{NavigateOptions, NavigationResponse, Page, PdfOptions, Renderer};
use crate::request::RenderRequest;
use crate::storage::{self, UploadSink, JSON_CONTENT_TYPE, PDF_CONTENT_TYPE};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs render requests against a renderer, an upload sink and a clock.
///
/// Cheap to share: wrap it in an `Arc` and call [`run`](Self::run) from as
/// many tasks as you like. Runs share nothing but the collaborators.
pub struct PdfPipeline {
    config: PipelineConfig,
    renderer: Arc<dyn Renderer>,
    sink: Arc<dyn UploadSink>,
    clock: Arc<dyn Clock>,
}

/// How navigation ended when it did not produce a usable document.
enum NavigationFailure {
    Status(NavigationResponse),
    NoResponse,
    Errored(Page2PdfError),
    TimedOut(u64),
}

impl NavigationFailure {
    fn message(&self) -> String {
        match self {
            NavigationFailure::Status(r) => {
                format!("Target page responded with {} {}", r.status, r.status_text)
            }
            NavigationFailure::NoResponse => "Target page produced no response".to_string(),
            NavigationFailure::Errored(e) => format!("Navigation failed: {e}"),
            NavigationFailure::TimedOut(ms) => format!("Navigation timed out after {ms}ms"),
        }
    }
}

impl PdfPipeline {
    pub fn new(
        config: PipelineConfig,
        renderer: Arc<dyn Renderer>,
        sink: Arc<dyn UploadSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            renderer,
            sink,
            clock,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render `request` end to end.
    ///
    /// # Returns
    /// `Ok(RenderResponse)` for every page-content outcome, including an
    /// invalid URL, a failed navigation and page errors under
    /// `failOnPageErrors`.
    ///
    /// # Errors
    /// Infrastructure failures only: the renderer could not open a page, a
    /// page operation other than navigation failed, or an upload failed.
    pub async fn run(&self, request: &RenderRequest) -> Result<RenderResponse, Page2PdfError> {
        let started = self.clock.now();
        let request_id = uuid::Uuid::new_v4().to_string();
        info!("[{}] Render requested: {}", request_id, request.page_url);

        // ── Validating ───────────────────────────────────────────────────
        self.stage(&request_id, PipelineStage::Validating);
        if !validate::is_valid_target(&request.page_url) {
            warn!("[{}] Rejected pageUrl: {}", request_id, request.page_url);
            let response = RenderResponse::failure(
                StatusClass::BadRequest,
                "pageUrl must be an absolute http or https URL",
            );
            return Ok(self.finish(&request_id, response));
        }

        // ── PageAcquired ─────────────────────────────────────────────────
        let page = self.renderer.new_page().await?;
        self.stage(&request_id, PipelineStage::PageAcquired);

        let outcome = self
            .render_on_page(page.as_ref(), request, &request_id, started)
            .await;

        if let Err(e) = page.close().await {
            warn!("[{}] Failed to close page: {}", request_id, e);
        }

        let response = outcome?;
        Ok(self.finish(&request_id, response))
    }

    /// Everything between page acquisition and release.
    async fn render_on_page(
        &self,
        page: &dyn Page,
        request: &RenderRequest,
        request_id: &str,
        started: DateTime<Utc>,
    ) -> Result<RenderResponse, Page2PdfError> {
        let opts = &request.pdf_options;
        let collector = ErrorCollector::attach(page);
        page.inject_before_load(&request.input_props).await?;

        // ── Navigating ───────────────────────────────────────────────────
        self.stage(request_id, PipelineStage::Navigating);
        let nav_options = NavigateOptions {
            wait_until: opts.wait_until,
            timeout_ms: opts.navigation_timeout_ms,
        };
        debug!(
            "[{}] Navigating (waitUntil={}, timeout={}ms)",
            request_id,
            nav_options.wait_until.as_str(),
            nav_options.timeout_ms
        );
        let navigation = tokio::time::timeout(
            Duration::from_millis(opts.navigation_timeout_ms),
            page.navigate(&request.page_url, &nav_options),
        )
        .await;

        let failure = match navigation {
            Ok(Ok(Some(response))) if response.ok => None,
            Ok(Ok(Some(response))) => Some(NavigationFailure::Status(response)),
            Ok(Ok(None)) => Some(NavigationFailure::NoResponse),
            Ok(Err(e)) => Some(NavigationFailure::Errored(e)),
            Err(_) => Some(NavigationFailure::TimedOut(opts.navigation_timeout_ms)),
        };
        if let Some(failure) = failure {
            self.stage(request_id, PipelineStage::NavigationFailed);
            return Ok(navigation_failed(request_id, failure, collector.snapshot()));
        }

        if opts.extra_wait_ms > 0 {
            debug!("[{}] Waiting {}ms after load", request_id, opts.extra_wait_ms);
            tokio::time::sleep(Duration::from_millis(opts.extra_wait_ms)).await;
        }

        // ── ErrorThreshold ───────────────────────────────────────────────
        let logs = collector.snapshot();
        let count = logs.error_log.len();
        if opts.fail_on_page_errors && count > 0 {
            self.stage(request_id, PipelineStage::ErrorThreshold);
            warn!(
                "[{}] Page reported {} error(s); failing as requested",
                request_id, count
            );
            let response = RenderResponse::failure(
                StatusClass::Unprocessable,
                format!("Page reported {count} error(s) during load"),
            )
            .with_failure(|b| {
                b.page_errors = Some(logs.error_log);
                b.console_log = Some(logs.console_log);
            });
            return Ok(response);
        }

        // ── Rendering ────────────────────────────────────────────────────
        self.stage(request_id, PipelineStage::Rendering);
        let pdf_options = PdfOptions {
            format: opts.paper_format,
            print_background: opts.print_background,
            landscape: opts.landscape,
            margins: opts.margins.clone(),
        };
        let pdf = page.rasterize(&pdf_options).await?;
        info!("[{}] Rasterised {} bytes", request_id, pdf.len());

        // ── Encrypting ───────────────────────────────────────────────────
        self.stage(request_id, PipelineStage::Encrypting);
        let requested = request.security.is_requested();
        let (pdf, applied) = if requested {
            self.protect(pdf, request, request_id).await
        } else {
            (pdf, false)
        };
        let security = SecurityOutcome { requested, applied };

        // ── Uploading ────────────────────────────────────────────────────
        self.stage(request_id, PipelineStage::Uploading);
        let target = request
            .storage_target
            .resolve(&self.config.default_bucket, started.timestamp_millis());
        let key = target.artifact_key();
        let url = storage::object_url(&target.bucket, &key);
        let size_bytes = pdf.len();
        let returned_pdf = self.config.return_pdf.then(|| pdf.clone());

        if self.config.skip_upload {
            debug!("[{}] Upload skipped for {}", request_id, url);
        } else {
            self.sink
                .put(&target.bucket, &key, pdf, PDF_CONTENT_TYPE)
                .await?;
            info!("[{}] Uploaded {}", request_id, url);
        }

        // ── MetricsComputed ──────────────────────────────────────────────
        self.stage(request_id, PipelineStage::MetricsComputed);
        let duration_ms = clock::elapsed_ms(started, self.clock.now());
        let cost = cost::estimate(
            duration_ms,
            self.config.memory_mb,
            self.config.disk_mb,
            &self.config.region,
        );

        // ── Done ─────────────────────────────────────────────────────────
        self.stage(request_id, PipelineStage::Done);
        let record = ProgressRecord {
            request_id: request_id.to_string(),
            timestamp: self.clock.now().to_rfc3339(),
            request: request.redacted(),
            result: ProgressResult {
                bucket: target.bucket.clone(),
                key: key.clone(),
                url: url.clone(),
                size_bytes,
                had_page_errors: !logs.error_log.is_empty(),
                page_error_count: logs.error_log.len(),
                console_message_count: logs.console_log.len(),
            },
            security,
            cost: cost.clone(),
        };
        if !self.config.skip_upload {
            let body = serde_json::to_vec_pretty(&record)?;
            self.sink
                .put(&target.bucket, &target.progress_key(), body, JSON_CONTENT_TYPE)
                .await?;
        }

        info!(
            "[{}] Done: {} in {}ms, est. ${:.7}",
            request_id, key, duration_ms, cost.estimated_cost_usd
        );

        let (page_errors, console_log) = if opts.include_console_logs {
            (Some(logs.error_log), Some(logs.console_log))
        } else {
            (None, None)
        };
        let body = SuccessBody {
            message: "PDF generated successfully".to_string(),
            request_id: request_id.to_string(),
            bucket: target.bucket,
            key,
            url,
            security,
            metrics: RunMetrics {
                duration_ms,
                total_cost_usd: cost.estimated_cost_usd,
            },
            page_errors,
            console_log,
        };
        Ok(RenderResponse::success(body, returned_pdf))
    }

    /// Apply password protection off the async runtime.
    ///
    /// Never fails: any problem yields the unprotected bytes.
    async fn protect(&self, pdf: Vec<u8>, request: &RenderRequest, request_id: &str) -> (Vec<u8>, bool) {
        let user = request.security.password.clone();
        let owner = request.security.owner_password.clone();
        let fallback = pdf.clone();
        let result = tokio::task::spawn_blocking(move || {
            encrypt::protect(pdf, user.as_deref(), owner.as_deref())
        })
        .await;
        match result {
            Ok(protected) => {
                if protected.applied {
                    debug!("[{}] Password protection applied", request_id);
                }
                (protected.bytes, protected.applied)
            }
            Err(e) => {
                warn!("[{}] Encryption task failed: {}", request_id, e);
                (fallback, false)
            }
        }
    }

    fn stage(&self, request_id: &str, stage: PipelineStage) {
        debug!("[{}] → {}", request_id, stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage(request_id, stage);
        }
    }

    fn finish(&self, request_id: &str, response: RenderResponse) -> RenderResponse {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_complete(request_id, response.status);
        }
        response
    }
}

fn navigation_failed(request_id: &str, failure: NavigationFailure, logs: PageLogs) -> RenderResponse {
    let message = failure.message();
    warn!("[{}] {}", request_id, message);
    RenderResponse::failure(StatusClass::UpstreamFailure, message).with_failure(|b| {
        if let NavigationFailure::Status(r) = &failure {
            b.status = Some(r.status);
            b.status_text = Some(r.status_text.clone());
        }
        b.page_errors = Some(logs.error_log);
    })
}
