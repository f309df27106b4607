//! Error types for the edgequake-page2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Page2PdfError`]: **Fatal**: infrastructure the pipeline depends on is
//!   unavailable (renderer cannot open a page, object store rejects a put).
//!   Returned as `Err(Page2PdfError)` from [`crate::generate::PdfPipeline::run`]
//!   and turned into a generic server error by [`crate::handler::handle`].
//!
//! * [`EncryptError`]: **Non-fatal**: password protection could not be
//!   applied. It never leaves [`crate::pipeline::encrypt`]; the caller only
//!   sees `applied = false` on the result.
//!
//! Problems with the *page content* (bad URL, failed navigation, runtime
//! errors on the page) are neither: they are ordinary terminal responses with
//! their own [`crate::output::StatusClass`].

use thiserror::Error;

/// All fatal errors returned by the edgequake-page2pdf library.
#[derive(Debug, Error)]
pub enum Page2PdfError {
    // ── Renderer errors ───────────────────────────────────────────────────
    /// The renderer could not hand out a page (browser crashed, pool exhausted).
    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),

    /// A page operation other than navigation failed.
    #[error("Page operation '{operation}' failed: {detail}")]
    PageOperation {
        operation: &'static str,
        detail: String,
    },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The upload sink rejected or failed to store an object.
    #[error("Upload of '{bucket}/{key}' failed: {detail}")]
    UploadFailed {
        bucket: String,
        key: String,
        detail: String,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The request body could not be turned into a render request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A record could not be serialised to JSON.
    #[error("Serialisation failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Page2PdfError {
    /// Shorthand for a failed page operation.
    pub fn page(operation: &'static str, detail: impl std::fmt::Display) -> Self {
        Page2PdfError::PageOperation {
            operation,
            detail: detail.to_string(),
        }
    }
}

/// Why password protection was not applied.
///
/// Logged and swallowed by the encryptor; the pipeline carries on with the
/// unprotected bytes.
#[derive(Debug, Error)]
pub enum EncryptError {
    /// Input is not a PDF lopdf can parse.
    #[error("could not parse PDF: {0}")]
    Parse(String),

    /// The document already carries an encryption dictionary.
    #[error("document is already encrypted")]
    AlreadyEncrypted,

    /// Key derivation or object encryption failed.
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Writing the protected document back out failed.
    #[error("could not serialise protected PDF: {0}")]
    Write(String),

    /// The encryption routine panicked.
    #[error("encryption panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_failed_display() {
        let e = Page2PdfError::UploadFailed {
            bucket: "reports".into(),
            key: "pdfs/a.pdf".into(),
            detail: "connection reset".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("reports/pdfs/a.pdf"), "got: {msg}");
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn page_operation_helper() {
        let e = Page2PdfError::page("rasterize", "target closed");
        assert_eq!(
            e.to_string(),
            "Page operation 'rasterize' failed: target closed"
        );
    }

    #[test]
    fn serde_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: Page2PdfError = err.into();
        assert!(matches!(e, Page2PdfError::Serialization(_)));
    }

    #[test]
    fn encrypt_error_display() {
        assert_eq!(
            EncryptError::AlreadyEncrypted.to_string(),
            "document is already encrypted"
        );
    }
}
