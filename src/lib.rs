//! # edgequake-page2pdf
//!
//! Render web pages to PDF on demand: inject caller data into the page,
//! capture its console and runtime errors, optionally password-protect the
//! result, upload it next to a JSON progress record and report what the run
//! cost.
//!
//! ## Why this crate?
//!
//! Driving a headless browser is the easy part. The hard part is everything
//! around it: deciding when a page "failed", never leaking a browser tab,
//! keeping encryption from sinking an otherwise good render, and giving the
//! caller enough diagnostics to fix their page. This crate owns that
//! orchestration and leaves the browser and the object store behind two
//! small traits.
//!
//! ## Pipeline Overview
//!
//! ```text
//! RenderRequest
//!  │
//!  ├─ 1. Validate  absolute http(s) URL or 400
//!  ├─ 2. Acquire   new page, attach error collector, inject inputProps
//!  ├─ 3. Navigate  waitUntil + timeout; failure → 502 with error log
//!  ├─ 4. Check     failOnPageErrors + errors → 422 with both logs
//!  ├─ 5. Render    page → PDF bytes
//!  ├─ 6. Encrypt   best effort (spawn_blocking)
//!  ├─ 7. Upload    {pathPrefix}/{fileName}
//!  ├─ 8. Cost      duration × memory/disk × regional rates
//!  └─ 9. Record    {pathPrefix}/progress.json
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_page2pdf::{
//!     MemoryUploadSink, PdfPipeline, PipelineConfig, RenderRequest, Renderer, SystemClock,
//! };
//! use std::sync::Arc;
//!
//! async fn render(renderer: Arc<dyn Renderer>) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::from_env()?;
//!     let pipeline = PdfPipeline::new(
//!         config,
//!         renderer,
//!         Arc::new(MemoryUploadSink::new()),
//!         Arc::new(SystemClock),
//!     );
//!     let request = RenderRequest::from_json(r#"{"pageUrl":"https://example.com"}"#)?;
//!     let response = pipeline.run(&request).await?;
//!     println!("{}", response.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `page2pdf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-page2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clock;
pub mod config;
pub mod error;
pub mod generate;
pub mod handler;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod renderer;
pub mod request;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use clock::{Clock, SystemClock};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{EncryptError, Page2PdfError};
pub use generate::PdfPipeline;
pub use handler::{handle, Invocation};
pub use output::{FailureBody, RenderResponse, ResponseBody, RunMetrics, StatusClass, SuccessBody};
pub use pipeline::collector::{ErrorCollector, ErrorLogEntry, LogKind, PageLogs};
pub use pipeline::cost::{estimate, CostBreakdown, CostMetrics};
pub use pipeline::encrypt::{protect, Protected};
pub use pipeline::validate::is_valid_target;
pub use progress::{
    NoopProgressCallback, PipelineProgressCallback, PipelineStage, ProgressCallback,
    ProgressRecord, ProgressResult, SecurityOutcome,
};
pub use renderer::{
    ConsoleLevel, ConsoleMessage, NavigateOptions, NavigationResponse, Page, PageEvent,
    PageEventHandler, PageEventKind, PdfOptions, Renderer, RuntimeError, SourceLocation,
};
pub use request::{
    InputProps, Margins, PaperFormat, RenderOptions, RenderRequest, SecurityConfig,
    StorageConfig, WaitUntil,
};
pub use storage::{FsUploadSink, HttpUploadSink, MemoryUploadSink, StoredObject, UploadSink};
