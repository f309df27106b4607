//! Outer boundary: turns a raw invocation into a pipeline run.
//!
//! Transport adapters (an HTTP server, a function-event shim) build an
//! [`Invocation`] from whatever they received and hand it to [`handle`],
//! which always produces a [`RenderResponse`]. Infrastructure errors from the
//! pipeline become an opaque server error here, with the underlying message
//! attached only when the config's `debug` flag is on.

use crate::generate::PdfPipeline;
use crate::output::{RenderResponse, StatusClass};
use crate::request::RenderRequest;
use base64::Engine;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

/// A transport-neutral request.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// HTTP method as received (`"POST"`, `"OPTIONS"`, ...).
    pub method: String,
    /// Value of the caller's API key header, if any.
    pub api_key: Option<String>,
    pub body: Option<String>,
    /// `body` is base64 (function gateways do this for binary-safe payloads).
    pub body_is_base64: bool,
}

impl Invocation {
    /// A `POST` carrying `body`.
    pub fn post(body: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Authenticate, parse and run one invocation.
pub async fn handle(pipeline: &PdfPipeline, invocation: Invocation) -> RenderResponse {
    if !invocation.method.eq_ignore_ascii_case("POST") {
        return RenderResponse::failure(
            StatusClass::MethodNotAllowed,
            format!("Method {} not allowed; use POST", invocation.method),
        );
    }

    if let Some(expected) = pipeline.config().api_key.as_deref() {
        let presented = invocation.api_key.as_deref().unwrap_or("");
        if !keys_match(expected, presented) {
            warn!("Rejected invocation with missing or invalid API key");
            return RenderResponse::failure(StatusClass::Unauthorized, "Invalid or missing API key");
        }
    }

    let body = match decode_body(&invocation) {
        Ok(body) => body,
        Err(message) => return RenderResponse::failure(StatusClass::BadRequest, message),
    };
    let request = match RenderRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => return RenderResponse::failure(StatusClass::BadRequest, e.to_string()),
    };

    match pipeline.run(&request).await {
        Ok(response) => response,
        Err(e) => {
            error!("Render failed: {}", e);
            let debug = pipeline.config().debug;
            RenderResponse::failure(StatusClass::ServerError, "PDF generation failed").with_failure(
                |b| {
                    if debug {
                        b.detail = Some(e.to_string());
                    }
                },
            )
        }
    }
}

fn keys_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

fn decode_body(invocation: &Invocation) -> Result<String, String> {
    let raw = match invocation.body.as_deref() {
        Some(body) if !body.trim().is_empty() => body,
        _ => return Err("Request body is required".to_string()),
    };
    if !invocation.body_is_base64 {
        return Ok(raw.to_string());
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| format!("Request body is not valid base64: {e}"))?;
    String::from_utf8(bytes).map_err(|_| "Request body is not valid UTF-8".to_string())
}
