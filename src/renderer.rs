//! Renderer capability: the headless browser seen through the narrow
//! interface the pipeline needs.
//!
//! The crate does not ship a browser. Callers plug in an adapter for
//! Chromium, WebKit or a remote rendering service by implementing
//! [`Renderer`] and [`Page`]. Tests plug in an in-memory stub.
//!
//! Each run owns exactly one [`Page`]; the pipeline guarantees
//! [`Page::close`] is called once on every exit path.

use crate::error::Page2PdfError;
use crate::request::{InputProps, Margins, PaperFormat, WaitUntil};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Hands out fresh pages.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a new page.
    ///
    /// # Errors
    /// Infrastructure failure (browser gone, pool exhausted). Propagated to
    /// the caller unchanged.
    async fn new_page(&self) -> Result<Box<dyn Page>, Page2PdfError>;
}

/// One browser page, used for a single render.
#[async_trait]
pub trait Page: Send + Sync {
    /// Subscribe to one kind of diagnostic event for the page's lifetime.
    fn on_event(&self, kind: PageEventKind, handler: PageEventHandler);

    /// Expose `props` to every script that runs once navigation starts.
    async fn inject_before_load(&self, props: &InputProps) -> Result<(), Page2PdfError>;

    /// Navigate to `url`.
    ///
    /// `Ok(None)` means the navigation produced no main-document response
    /// (e.g. same-document navigation). `Err` covers DNS failures, aborted
    /// loads and driver-side timeouts; the pipeline treats both like a
    /// non-success status.
    async fn navigate(
        &self,
        url: &str,
        options: &NavigateOptions,
    ) -> Result<Option<NavigationResponse>, Page2PdfError>;

    /// Print the current document to PDF bytes.
    async fn rasterize(&self, options: &PdfOptions) -> Result<Vec<u8>, Page2PdfError>;

    /// Release the page and its browser resources.
    async fn close(&self) -> Result<(), Page2PdfError>;
}

/// Callback registered through [`Page::on_event`].
pub type PageEventHandler = Arc<dyn Fn(&PageEvent) + Send + Sync>;

/// Event stream a handler subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageEventKind {
    Console,
    PageError,
}

/// Something the page reported while loading or running.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// A `console.*` call.
    Console(ConsoleMessage),
    /// An uncaught exception or unhandled rejection.
    PageError(RuntimeError),
}

impl PageEvent {
    pub fn kind(&self) -> PageEventKind {
        match self {
            PageEvent::Console(_) => PageEventKind::Console,
            PageEvent::PageError(_) => PageEventKind::PageError,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub text: String,
    pub location: Option<SourceLocation>,
}

/// Console severity, matching the browser's message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Debug,
    Info,
    Warning,
    Error,
}

impl ConsoleLevel {
    pub fn is_error(&self) -> bool {
        matches!(self, ConsoleLevel::Error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub stack: Option<String>,
}

/// Where a console message originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub url: String,
    pub line: u32,
    pub column: u32,
}

/// Arguments to [`Page::navigate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateOptions {
    pub wait_until: WaitUntil,
    pub timeout_ms: u64,
}

/// Main-document response of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
}

impl NavigationResponse {
    /// A response with `ok` derived from the status code (2xx).
    pub fn from_status(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            status_text: status_text.into(),
        }
    }
}

/// Arguments to [`Page::rasterize`].
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub format: PaperFormat,
    pub print_background: bool,
    pub landscape: bool,
    pub margins: Option<Margins>,
}

impl PdfOptions {
    /// Paper width and height in inches after applying orientation.
    pub fn page_size_inches(&self) -> (f64, f64) {
        let (w, h) = self.format.size_inches();
        if self.landscape {
            (h, w)
        } else {
            (w, h)
        }
    }
}
