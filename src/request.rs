//! Render request types and JSON parsing.
//!
//! A [`RenderRequest`] is the sole input of one pipeline run. It is parsed
//! from the caller's camelCase JSON body by [`RenderRequest::from_json`],
//! which fills in every documented default so the pipeline never has to ask
//! "was this set?". The one default it cannot fill is the bucket, which comes
//! from process-wide configuration and is resolved by
//! [`StorageConfig::resolve`] at run time.
//!
//! URL validity is deliberately *not* checked here: rejecting a bad
//! `pageUrl` is the first state of the pipeline, so the parser accepts any
//! string and the pipeline answers with a client error.

use crate::error::Page2PdfError;
use serde::{Deserialize, Serialize};

/// Arbitrary caller data exposed to the page before it loads.
pub type InputProps = serde_json::Map<String, serde_json::Value>;

/// Default navigation timeout in milliseconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default key prefix for stored artifacts.
pub const DEFAULT_PATH_PREFIX: &str = "pdfs";

/// One caller-submitted page-to-PDF job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Absolute `http`/`https` URL of the page to render.
    pub page_url: String,

    /// Data injected into the page's execution context before navigation.
    #[serde(default)]
    pub input_props: InputProps,

    #[serde(default)]
    pub pdf_options: RenderOptions,

    #[serde(default)]
    pub storage_target: StorageConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

impl RenderRequest {
    /// Build a request for `page_url` with every option at its default.
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            input_props: InputProps::new(),
            pdf_options: RenderOptions::default(),
            storage_target: StorageConfig::default(),
            security: SecurityConfig::default(),
        }
    }

    /// Parse and normalise a JSON request body.
    ///
    /// # Errors
    /// [`Page2PdfError::InvalidRequest`] when the body is not valid JSON, a
    /// field has the wrong type, or a numeric constraint is violated.
    pub fn from_json(body: &str) -> Result<Self, Page2PdfError> {
        let request: RenderRequest = serde_json::from_str(body)
            .map_err(|e| Page2PdfError::InvalidRequest(e.to_string()))?;
        request.normalised()
    }

    /// Apply constraints that serde cannot express.
    fn normalised(mut self) -> Result<Self, Page2PdfError> {
        if self.pdf_options.navigation_timeout_ms == 0 {
            return Err(Page2PdfError::InvalidRequest(
                "navigationTimeoutMs must be greater than 0".into(),
            ));
        }
        self.security.password = non_empty(self.security.password.take());
        self.security.owner_password = non_empty(self.security.owner_password.take());
        Ok(self)
    }

    /// A copy safe to log or persist: passwords replaced by a placeholder.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "pageUrl": self.page_url,
            "inputProps": self.input_props,
            "pdfOptions": self.pdf_options,
            "storageTarget": self.storage_target,
            "security": self.security.redacted(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Page load and rasterisation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Navigation lifecycle event that counts as "loaded".
    pub wait_until: WaitUntil,

    /// Upper bound for the navigation step. Must be > 0. Default: 30 000.
    pub navigation_timeout_ms: u64,

    /// Fixed delay after a successful navigation. Default: 0.
    pub extra_wait_ms: u64,

    /// Abort with an unprocessable response when the page logs errors.
    pub fail_on_page_errors: bool,

    /// Echo console and error logs in the success response.
    pub include_console_logs: bool,

    pub paper_format: PaperFormat,

    /// Default: true.
    pub print_background: bool,

    pub landscape: bool,

    pub margins: Option<Margins>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            wait_until: WaitUntil::default(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            extra_wait_ms: 0,
            fail_on_page_errors: false,
            include_console_logs: false,
            paper_format: PaperFormat::default(),
            print_background: true,
            landscape: false,
            margins: None,
        }
    }
}

/// When navigation is considered finished.
///
/// Wire names follow the conventions headless-browser drivers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitUntil {
    /// The `load` event fired.
    #[serde(rename = "load")]
    Load,
    /// The `DOMContentLoaded` event fired.
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// No network connections for 500 ms. (default)
    #[default]
    #[serde(rename = "networkidle0")]
    NetworkIdleQuiet,
    /// At most two network connections for 500 ms.
    #[serde(rename = "networkidle2")]
    NetworkIdleAlmostQuiet,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdleQuiet => "networkidle0",
            WaitUntil::NetworkIdleAlmostQuiet => "networkidle2",
        }
    }
}

/// Paper size for the rasterised PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperFormat {
    #[default]
    #[serde(alias = "a4")]
    A4,
    #[serde(alias = "letter")]
    Letter,
    #[serde(alias = "legal")]
    Legal,
    #[serde(alias = "tabloid")]
    Tabloid,
    #[serde(alias = "a3")]
    A3,
    #[serde(alias = "a5")]
    A5,
}

impl PaperFormat {
    /// Paper width and height in inches, portrait orientation.
    pub fn size_inches(&self) -> (f64, f64) {
        match self {
            PaperFormat::A4 => (8.27, 11.7),
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::A3 => (11.7, 16.54),
            PaperFormat::A5 => (5.83, 8.27),
        }
    }
}

/// Page margins as CSS length strings (`"1cm"`, `"0.5in"`, `"20px"`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: Option<String>,
    pub right: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
}

/// Where the artifact goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Target bucket. Falls back to the process-wide default.
    pub bucket: Option<String>,
    /// Key prefix. Default: `"pdfs"`.
    pub path_prefix: String,
    /// Object name. Default: `"page-<unix millis>.pdf"`.
    pub file_name: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            file_name: None,
        }
    }
}

impl StorageConfig {
    /// Fill the remaining defaults from process config and the run's start time.
    pub fn resolve(&self, default_bucket: &str, started_at_ms: i64) -> ResolvedStorage {
        let bucket = self
            .bucket
            .clone()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| default_bucket.to_string());
        let file_name = self
            .file_name
            .clone()
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| format!("page-{started_at_ms}.pdf"));
        ResolvedStorage {
            bucket,
            path_prefix: self.path_prefix.clone(),
            file_name,
        }
    }
}

/// A [`StorageConfig`] with every default applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStorage {
    pub bucket: String,
    pub path_prefix: String,
    pub file_name: String,
}

impl ResolvedStorage {
    /// `{pathPrefix}/{fileName}`; a bare file name when the prefix is empty.
    pub fn artifact_key(&self) -> String {
        self.sibling_key(&self.file_name)
    }

    /// `{pathPrefix}/progress.json`.
    pub fn progress_key(&self) -> String {
        self.sibling_key("progress.json")
    }

    fn sibling_key(&self, name: &str) -> String {
        let prefix = self.path_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    }
}

/// Optional password protection for the artifact.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    /// Password required to open the document.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Password granting full permissions. Falls back to `password`.
    #[serde(skip_serializing)]
    pub owner_password: Option<String>,
}

impl SecurityConfig {
    /// Whether any protection was asked for.
    pub fn is_requested(&self) -> bool {
        self.password.is_some() || self.owner_password.is_some()
    }

    /// Booleans only; the secret values never leave this struct.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "passwordProtected": self.password.is_some(),
            "ownerPasswordSet": self.owner_password.is_some(),
        })
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "owner_password",
                &self.owner_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_body_gets_defaults() {
        let req = RenderRequest::from_json(r#"{"pageUrl":"https://example.com"}"#).unwrap();
        assert_eq!(req.page_url, "https://example.com");
        assert!(req.input_props.is_empty());
        assert_eq!(req.pdf_options, RenderOptions::default());
        assert_eq!(req.pdf_options.navigation_timeout_ms, 30_000);
        assert!(req.pdf_options.print_background);
        assert!(!req.pdf_options.landscape);
        assert_eq!(req.pdf_options.wait_until, WaitUntil::NetworkIdleQuiet);
        assert_eq!(req.storage_target.path_prefix, "pdfs");
        assert!(!req.security.is_requested());
    }

    #[test]
    fn full_body_parses() {
        let body = r#"{
            "pageUrl": "https://example.com/report",
            "inputProps": {"customer": "ACME", "total": 42},
            "pdfOptions": {
                "waitUntil": "domcontentloaded",
                "navigationTimeoutMs": 5000,
                "extraWaitMs": 250,
                "failOnPageErrors": true,
                "includeConsoleLogs": true,
                "paperFormat": "letter",
                "printBackground": false,
                "landscape": true,
                "margins": {"top": "1cm", "bottom": "2cm"}
            },
            "storageTarget": {"bucket": "reports", "pathPrefix": "acme", "fileName": "q3.pdf"},
            "security": {"password": "open", "ownerPassword": "admin"}
        }"#;
        let req = RenderRequest::from_json(body).unwrap();
        assert_eq!(req.input_props["customer"], "ACME");
        let o = &req.pdf_options;
        assert_eq!(o.wait_until, WaitUntil::DomContentLoaded);
        assert_eq!(o.navigation_timeout_ms, 5000);
        assert_eq!(o.extra_wait_ms, 250);
        assert!(o.fail_on_page_errors && o.include_console_logs && o.landscape);
        assert!(!o.print_background);
        assert_eq!(o.paper_format, PaperFormat::Letter);
        let m = o.margins.as_ref().unwrap();
        assert_eq!(m.top.as_deref(), Some("1cm"));
        assert_eq!(m.left, None);
        assert_eq!(req.storage_target.file_name.as_deref(), Some("q3.pdf"));
        assert!(req.security.is_requested());
    }

    #[test]
    fn zero_timeout_rejected() {
        let body = r#"{"pageUrl":"https://x.io","pdfOptions":{"navigationTimeoutMs":0}}"#;
        let err = RenderRequest::from_json(body).unwrap_err();
        assert!(matches!(err, Page2PdfError::InvalidRequest(_)));
    }

    #[test]
    fn missing_url_rejected() {
        assert!(RenderRequest::from_json(r#"{"inputProps":{}}"#).is_err());
        assert!(RenderRequest::from_json("not json").is_err());
    }

    #[test]
    fn empty_passwords_count_as_absent() {
        let body = r#"{"pageUrl":"https://x.io","security":{"password":"","ownerPassword":""}}"#;
        let req = RenderRequest::from_json(body).unwrap();
        assert!(!req.security.is_requested());
    }

    #[test]
    fn storage_resolution_and_keys() {
        let storage = StorageConfig::default().resolve("default-bucket", 1_700_000_000_000);
        assert_eq!(storage.bucket, "default-bucket");
        assert_eq!(storage.file_name, "page-1700000000000.pdf");
        assert_eq!(storage.artifact_key(), "pdfs/page-1700000000000.pdf");
        assert_eq!(storage.progress_key(), "pdfs/progress.json");

        let custom = StorageConfig {
            bucket: Some("mine".into()),
            path_prefix: "a/b/".into(),
            file_name: Some("x.pdf".into()),
        }
        .resolve("default-bucket", 0);
        assert_eq!(custom.bucket, "mine");
        assert_eq!(custom.artifact_key(), "a/b/x.pdf");

        let bare = StorageConfig {
            path_prefix: String::new(),
            ..StorageConfig::default()
        }
        .resolve("b", 7);
        assert_eq!(bare.artifact_key(), "page-7.pdf");
    }

    #[test]
    fn redaction_hides_passwords() {
        let mut req = RenderRequest::new("https://example.com");
        req.security.password = Some("hunter2".into());
        let json = req.redacted().to_string();
        assert!(!json.contains("hunter2"), "leaked: {json}");
        assert!(json.contains("\"passwordProtected\":true"));
        assert!(!format!("{:?}", req.security).contains("hunter2"));
        assert!(!serde_json::to_string(&req).unwrap().contains("hunter2"));
    }
}
