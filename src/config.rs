//! Process-wide configuration for the render pipeline.
//!
//! Everything the pipeline would otherwise pull from the environment (default
//! bucket, region, upload-skip flag, reserved memory/disk) lives in
//! [`PipelineConfig`] and is handed to [`crate::generate::PdfPipeline::new`].
//! The pipeline itself never reads environment variables.
//!
//! [`PipelineConfig::from_env`] is a thin layer over the builder for
//! deployed functions.

use crate::error::Page2PdfError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Bucket used when a request names none.
pub const DEFAULT_BUCKET: &str = "page2pdf-output";
/// Memory figure fed to the cost estimate when none is configured.
pub const DEFAULT_MEMORY_MB: u64 = 2048;
/// Ephemeral disk figure fed to the cost estimate when none is configured.
pub const DEFAULT_DISK_MB: u64 = 512;

// ── Environment variable names ───────────────────────────────────────────

pub const ENV_BUCKET: &str = "PAGE2PDF_BUCKET";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_SKIP_UPLOAD: &str = "PAGE2PDF_SKIP_UPLOAD";
pub const ENV_RETURN_PDF: &str = "PAGE2PDF_RETURN_PDF";
pub const ENV_MEMORY_MB: &str = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE";
pub const ENV_DISK_MB: &str = "PAGE2PDF_EPHEMERAL_STORAGE_MB";
pub const ENV_DEBUG: &str = "PAGE2PDF_DEBUG";
pub const ENV_API_KEY: &str = "PAGE2PDF_API_KEY";

/// Configuration shared by every run of a [`crate::generate::PdfPipeline`].
///
/// # Example
/// ```rust
/// use edgequake_page2pdf::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .default_bucket("reports")
///     .region("eu-west-1")
///     .skip_upload(true)
///     .build()
///     .unwrap();
/// assert!(config.skip_upload);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Bucket used when the request's storage target names none.
    /// Default: `"page2pdf-output"`.
    pub default_bucket: String,

    /// Region whose prices feed the cost estimate. Default: `"us-east-1"`.
    pub region: String,

    /// Skip both uploads but otherwise behave as if they succeeded. Default: false.
    ///
    /// Meant for local runs with no object store. Combine with
    /// [`return_pdf`](Self::return_pdf) to get the artifact back directly.
    pub skip_upload: bool,

    /// Attach the raw PDF bytes to successful responses. Default: false.
    pub return_pdf: bool,

    /// Memory reserved for the function, in MB. Default: 2048.
    pub memory_mb: u64,

    /// Ephemeral disk reserved for the function, in MB. Default: 512.
    pub disk_mb: u64,

    /// Include error detail in server-error responses. Default: false.
    pub debug: bool,

    /// Static key callers must present. `None` disables the check.
    pub api_key: Option<String>,

    /// Optional stage-event callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_bucket: DEFAULT_BUCKET.to_string(),
            region: crate::pipeline::cost::DEFAULT_REGION.to_string(),
            skip_upload: false,
            return_pdf: false,
            memory_mb: DEFAULT_MEMORY_MB,
            disk_mb: DEFAULT_DISK_MB,
            debug: false,
            api_key: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("default_bucket", &self.default_bucket)
            .field("region", &self.region)
            .field("skip_upload", &self.skip_upload)
            .field("return_pdf", &self.return_pdf)
            .field("memory_mb", &self.memory_mb)
            .field("disk_mb", &self.disk_mb)
            .field("debug", &self.debug)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from the process environment.
    ///
    /// Unset variables keep their defaults; set-but-malformed numbers are an
    /// error rather than being silently ignored.
    pub fn from_env() -> Result<Self, Page2PdfError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Page2PdfError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut builder = Self::builder();

        if let Some(bucket) = get(ENV_BUCKET) {
            builder = builder.default_bucket(bucket);
        }
        if let Some(region) = get(ENV_REGION) {
            builder = builder.region(region);
        }
        if let Some(v) = get(ENV_SKIP_UPLOAD) {
            builder = builder.skip_upload(parse_flag(&v));
        }
        if let Some(v) = get(ENV_RETURN_PDF) {
            builder = builder.return_pdf(parse_flag(&v));
        }
        if let Some(v) = get(ENV_MEMORY_MB) {
            builder = builder.memory_mb(parse_mb(ENV_MEMORY_MB, &v)?);
        }
        if let Some(v) = get(ENV_DISK_MB) {
            builder = builder.disk_mb(parse_mb(ENV_DISK_MB, &v)?);
        }
        if let Some(v) = get(ENV_DEBUG) {
            builder = builder.debug(parse_flag(&v));
        }
        if let Some(key) = get(ENV_API_KEY) {
            builder = builder.api_key(key);
        }
        builder.build()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_mb(name: &str, value: &str) -> Result<u64, Page2PdfError> {
    value.parse::<u64>().map_err(|_| {
        Page2PdfError::InvalidConfig(format!("{name} must be a whole number of MB, got '{value}'"))
    })
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.default_bucket = bucket.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = region.into();
        self
    }

    pub fn skip_upload(mut self, v: bool) -> Self {
        self.config.skip_upload = v;
        self
    }

    pub fn return_pdf(mut self, v: bool) -> Self {
        self.config.return_pdf = v;
        self
    }

    pub fn memory_mb(mut self, mb: u64) -> Self {
        self.config.memory_mb = mb;
        self
    }

    pub fn disk_mb(mut self, mb: u64) -> Self {
        self.config.disk_mb = mb;
        self
    }

    pub fn debug(mut self, v: bool) -> Self {
        self.config.debug = v;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Page2PdfError> {
        let c = &self.config;
        if c.default_bucket.trim().is_empty() {
            return Err(Page2PdfError::InvalidConfig(
                "Default bucket must not be empty".into(),
            ));
        }
        if c.region.trim().is_empty() {
            return Err(Page2PdfError::InvalidConfig("Region must not be empty".into()));
        }
        if c.memory_mb == 0 {
            return Err(Page2PdfError::InvalidConfig(
                "Memory must be ≥ 1 MB".into(),
            ));
        }
        if matches!(c.api_key.as_deref(), Some(k) if k.is_empty()) {
            return Err(Page2PdfError::InvalidConfig(
                "API key, when set, must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.default_bucket, "page2pdf-output");
        assert_eq!(c.region, "us-east-1");
        assert_eq!(c.memory_mb, 2048);
        assert_eq!(c.disk_mb, 512);
        assert!(!c.skip_upload && !c.return_pdf && !c.debug);
        assert!(c.api_key.is_none());
    }

    #[test]
    fn builder_validates() {
        assert!(PipelineConfig::builder().default_bucket("  ").build().is_err());
        assert!(PipelineConfig::builder().region("").build().is_err());
        assert!(PipelineConfig::builder().memory_mb(0).build().is_err());
        assert!(PipelineConfig::builder().api_key("").build().is_err());
        assert!(PipelineConfig::builder().disk_mb(0).build().is_ok());
    }

    #[test]
    fn from_lookup_reads_every_variable() {
        let c = PipelineConfig::from_lookup(lookup(&[
            (ENV_BUCKET, "reports"),
            (ENV_REGION, "eu-west-2"),
            (ENV_SKIP_UPLOAD, "TRUE"),
            (ENV_RETURN_PDF, "yes"),
            (ENV_MEMORY_MB, "3008"),
            (ENV_DISK_MB, "1024"),
            (ENV_DEBUG, "on"),
            (ENV_API_KEY, "s3cret"),
        ]))
        .unwrap();
        assert_eq!(c.default_bucket, "reports");
        assert_eq!(c.region, "eu-west-2");
        assert!(c.skip_upload && c.return_pdf && c.debug);
        assert_eq!(c.memory_mb, 3008);
        assert_eq!(c.disk_mb, 1024);
        assert_eq!(c.api_key.as_deref(), Some("s3cret"));
    }

    #[test]
    fn from_lookup_empty_keeps_defaults() {
        let c = PipelineConfig::from_lookup(lookup(&[(ENV_BUCKET, ""), (ENV_API_KEY, "  ")])).unwrap();
        assert_eq!(c.default_bucket, DEFAULT_BUCKET);
        assert!(c.api_key.is_none());
    }

    #[test]
    fn flags_other_than_truthy_are_false() {
        let c = PipelineConfig::from_lookup(lookup(&[(ENV_SKIP_UPLOAD, "0"), (ENV_DEBUG, "nope")])).unwrap();
        assert!(!c.skip_upload);
        assert!(!c.debug);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[(ENV_MEMORY_MB, "lots")])).unwrap_err();
        assert!(matches!(err, Page2PdfError::InvalidConfig(_)));
        assert!(err.to_string().contains(ENV_MEMORY_MB));
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = PipelineConfig::builder().api_key("hunter2").build().unwrap();
        let s = format!("{c:?}");
        assert!(!s.contains("hunter2"));
        assert!(s.contains("<redacted>"));
    }
}
