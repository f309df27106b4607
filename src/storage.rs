//! Upload sinks: where artifacts and progress records end up.
//!
//! The pipeline talks to storage only through [`UploadSink::put`]. Three
//! implementations ship with the crate:
//!
//! | Sink | Use |
//! |------|-----|
//! | [`MemoryUploadSink`] | tests, dry runs; records every put in order |
//! | [`FsUploadSink`] | local development; `{root}/{bucket}/{key}` on disk |
//! | [`HttpUploadSink`] | any S3-compatible endpoint accepting path-style `PUT` |

use crate::error::Page2PdfError;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// Content type of rendered artifacts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Content type of progress records.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Object-store write capability.
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Store `body` under `bucket/key`.
    ///
    /// # Errors
    /// [`Page2PdfError::UploadFailed`] on transport or store failure.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), Page2PdfError>;
}

/// `s3://{bucket}/{key}`, the location reported to callers.
pub fn object_url(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

// ── In-memory sink ───────────────────────────────────────────────────────

/// One recorded put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Keeps every put in memory, in call order.
#[derive(Debug, Default)]
pub struct MemoryUploadSink {
    objects: Mutex<Vec<StoredObject>>,
}

impl MemoryUploadSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all puts so far.
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UploadSink for MemoryUploadSink {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), Page2PdfError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| Page2PdfError::Internal(format!("upload log poisoned: {e}")))?;
        objects.push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

// ── Filesystem sink ──────────────────────────────────────────────────────

/// Writes objects below a root directory, one sub-directory per bucket.
///
/// Every put goes through its own [`tempfile::NamedTempFile`] in the target
/// directory and is persisted by rename, so concurrent puts to the same key
/// never share a temp file. The last rename wins.
#[derive(Debug, Clone)]
pub struct FsUploadSink {
    root: PathBuf,
}

impl FsUploadSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where `bucket/key` lands on disk. Always below the root.
    ///
    /// # Errors
    /// [`Page2PdfError::UploadFailed`] when the bucket is not a single plain
    /// directory name (empty, absolute, `.`/`..`, or containing a separator).
    pub fn path_for(&self, bucket: &str, key: &str) -> Result<PathBuf, Page2PdfError> {
        if !is_plain_segment(bucket) || bucket.contains(['/', '\\']) {
            return Err(Page2PdfError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                detail: "bucket must be a single directory name".into(),
            });
        }
        let mut path = self.root.join(bucket);
        for segment in key.split(['/', '\\']).filter(|s| is_plain_segment(s)) {
            path.push(segment);
        }
        Ok(path)
    }
}

fn is_plain_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !Path::new(s).has_root()
}

#[async_trait]
impl UploadSink for FsUploadSink {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), Page2PdfError> {
        let path = self.path_for(bucket, key)?;
        let fail = |detail: String| Page2PdfError::UploadFailed {
            bucket: bucket.to_string(),
            key: key.to_string(),
            detail,
        };
        let parent = match path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return Err(fail(format!("{} has no parent", path.display()))),
        };

        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| fail(format!("create {}: {e}", parent.display())))?;

        let size = body.len();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_and_persist(&parent, &target, &body))
            .await
            .map_err(|e| fail(format!("write task: {e}")))?
            .map_err(fail)?;

        debug!("Stored {} bytes at {}", size, path.display());
        Ok(())
    }
}

/// Write to a fresh temp file beside `target`, then rename over it.
fn write_and_persist(dir: &Path, target: &Path, body: &[u8]) -> Result<(), String> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| format!("temp file in {}: {e}", dir.display()))?;
    tmp.write_all(body)
        .map_err(|e| format!("write {}: {e}", tmp.path().display()))?;
    tmp.persist(target)
        .map_err(|e| format!("rename to {}: {}", target.display(), e.error))?;
    Ok(())
}

// ── HTTP sink ────────────────────────────────────────────────────────────

/// Path-style `PUT {endpoint}/{bucket}/{key}` against an S3-compatible gateway.
#[derive(Debug, Clone)]
pub struct HttpUploadSink {
    client: reqwest::Client,
    endpoint: url::Url,
    bearer_token: Option<String>,
}

impl HttpUploadSink {
    /// Create a sink with a per-request timeout.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, Page2PdfError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| Page2PdfError::InvalidConfig(format!("upload endpoint '{endpoint}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Page2PdfError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            bearer_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every put.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Target URL of `bucket/key`; each key segment is percent-encoded.
    pub fn object_endpoint(&self, bucket: &str, key: &str) -> Result<url::Url, Page2PdfError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Page2PdfError::InvalidConfig(format!(
                    "upload endpoint '{}' cannot be a base URL",
                    self.endpoint
                ))
            })?;
            segments.pop_if_empty().push(bucket);
            for segment in key.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl UploadSink for HttpUploadSink {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), Page2PdfError> {
        let url = self.object_endpoint(bucket, key)?;
        let fail = |detail: String| Page2PdfError::UploadFailed {
            bucket: bucket.to_string(),
            key: key.to_string(),
            detail,
        };
        let size = body.len();

        let mut request = self
            .client
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        if let Some(ref token) = self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                fail(format!("timed out: {e}"))
            } else {
                fail(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }

        info!("Uploaded {} bytes to {}", size, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemoryUploadSink::new();
        assert!(sink.is_empty());
        tokio_test::block_on(async {
            sink.put("b", "k1", b"one".to_vec(), PDF_CONTENT_TYPE)
                .await
                .unwrap();
            sink.put("b", "k2", b"two".to_vec(), JSON_CONTENT_TYPE)
                .await
                .unwrap();
        });
        let objects = sink.objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "k1");
        assert_eq!(objects[1].content_type, "application/json");
    }

    #[tokio::test]
    async fn fs_sink_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsUploadSink::new(dir.path());
        sink.put("bucket", "pdfs/out.pdf", b"%PDF-1.7".to_vec(), PDF_CONTENT_TYPE)
            .await
            .unwrap();

        let pdfs = dir.path().join("bucket").join("pdfs");
        assert_eq!(std::fs::read(pdfs.join("out.pdf")).unwrap(), b"%PDF-1.7");
        let leftovers: Vec<_> = std::fs::read_dir(&pdfs).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn fs_sink_ignores_parent_segments_in_keys() {
        let sink = FsUploadSink::new("/data");
        assert_eq!(
            sink.path_for("b", "../../etc/passwd").unwrap(),
            PathBuf::from("/data/b/etc/passwd")
        );
        assert_eq!(
            sink.path_for("b", "/abs/./x.pdf").unwrap(),
            PathBuf::from("/data/b/abs/x.pdf")
        );
    }

    #[test]
    fn fs_sink_keeps_writes_below_root() {
        let sink = FsUploadSink::new("/data/out");
        for bucket in ["/tmp/x", "../../etc", "..", ".", "", "a/b", "a\\b"] {
            let err = sink.path_for(bucket, "pdfs/x.pdf").unwrap_err();
            assert!(
                matches!(err, Page2PdfError::UploadFailed { .. }),
                "bucket {bucket:?} should be rejected"
            );
        }
        assert!(sink
            .path_for("reports", "pdfs/x.pdf")
            .unwrap()
            .starts_with("/data/out"));
    }

    #[tokio::test]
    async fn fs_sink_rejects_escaping_bucket_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let sink = FsUploadSink::new(&root);
        let outside = dir.path().join("outside");
        let err = sink
            .put(
                outside.to_str().unwrap(),
                "x.pdf",
                b"%PDF".to_vec(),
                PDF_CONTENT_TYPE,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Page2PdfError::UploadFailed { .. }));
        assert!(!outside.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fs_sink_concurrent_puts_to_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let sink = std::sync::Arc::new(FsUploadSink::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..32u8 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                sink.put("b", "pdfs/progress.json", vec![i; 256], JSON_CONTENT_TYPE)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pdfs = dir.path().join("b").join("pdfs");
        let body = std::fs::read(pdfs.join("progress.json")).unwrap();
        assert_eq!(body.len(), 256);
        assert!(body.iter().all(|b| *b == body[0]));
        assert_eq!(std::fs::read_dir(&pdfs).unwrap().count(), 1);
    }

    #[test]
    fn http_sink_builds_path_style_urls() {
        let sink = HttpUploadSink::new("http://localhost:9000/", 5).unwrap();
        let url = sink.object_endpoint("reports", "pdfs/q3 final.pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/reports/pdfs/q3%20final.pdf"
        );
    }

    #[test]
    fn http_sink_rejects_bad_endpoint() {
        assert!(matches!(
            HttpUploadSink::new("not a url", 5),
            Err(Page2PdfError::InvalidConfig(_))
        ));
    }

    #[test]
    fn object_url_format() {
        assert_eq!(object_url("b", "pdfs/x.pdf"), "s3://b/pdfs/x.pdf");
    }
}
