//! Response types returned by the pipeline and the outer handler.
//!
//! A [`RenderResponse`] is transport-agnostic: a [`StatusClass`], a JSON body
//! and, for local runs, the raw PDF bytes. Adapters for HTTP or function
//! events map the class with [`StatusClass::http_status`] and serialise the
//! body with [`RenderResponse::to_json`].

use crate::pipeline::collector::ErrorLogEntry;
use crate::progress::SecurityOutcome;
use base64::Engine;
use serde::Serialize;

/// Outcome class of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusClass {
    Success,
    BadRequest,
    Unauthorized,
    MethodNotAllowed,
    /// The target page failed to load, returned a non-success status or timed out.
    UpstreamFailure,
    /// The page loaded but reported runtime errors and the request asked to fail on them.
    Unprocessable,
    ServerError,
}

impl StatusClass {
    pub fn http_status(&self) -> u16 {
        match self {
            StatusClass::Success => 200,
            StatusClass::BadRequest => 400,
            StatusClass::Unauthorized => 401,
            StatusClass::MethodNotAllowed => 405,
            StatusClass::UpstreamFailure => 502,
            StatusClass::Unprocessable => 422,
            StatusClass::ServerError => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusClass::Success)
    }

    /// Short label used as the `error` field of failure bodies.
    pub fn label(&self) -> &'static str {
        match self {
            StatusClass::Success => "OK",
            StatusClass::BadRequest => "Bad Request",
            StatusClass::Unauthorized => "Unauthorized",
            StatusClass::MethodNotAllowed => "Method Not Allowed",
            StatusClass::UpstreamFailure => "Bad Gateway",
            StatusClass::Unprocessable => "Unprocessable Entity",
            StatusClass::ServerError => "Internal Server Error",
        }
    }
}

/// Result of one invocation.
#[derive(Debug, Clone)]
pub struct RenderResponse {
    pub status: StatusClass,
    pub body: ResponseBody,
    /// Raw artifact, only when the config asks for it.
    pub pdf: Option<Vec<u8>>,
}

/// Payload of a [`RenderResponse`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Success(Box<SuccessBody>),
    Failure(FailureBody),
}

/// Payload of a successful render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody {
    pub message: String,
    pub request_id: String,
    pub bucket: String,
    pub key: String,
    pub url: String,
    pub security: SecurityOutcome,
    pub metrics: RunMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_errors: Option<Vec<ErrorLogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_log: Option<Vec<ErrorLogEntry>>,
}

/// Cost summary inside a [`SuccessBody`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub duration_ms: u64,
    #[serde(rename = "totalCostUSD")]
    pub total_cost_usd: f64,
}

/// Payload of every non-success class.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureBody {
    pub error: String,
    pub message: String,
    /// Upstream HTTP status, when the target answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_errors: Option<Vec<ErrorLogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_log: Option<Vec<ErrorLogEntry>>,
    /// Internal error text, only in debug mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RenderResponse {
    pub fn success(body: SuccessBody, pdf: Option<Vec<u8>>) -> Self {
        Self {
            status: StatusClass::Success,
            body: ResponseBody::Success(Box::new(body)),
            pdf,
        }
    }

    /// A failure of class `status` with a bare message; extend via [`with_failure`](Self::with_failure).
    pub fn failure(status: StatusClass, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Failure(FailureBody {
                error: status.label().to_string(),
                message: message.into(),
                ..FailureBody::default()
            }),
            pdf: None,
        }
    }

    /// Edit the failure body in place. No-op on success responses.
    pub fn with_failure(mut self, edit: impl FnOnce(&mut FailureBody)) -> Self {
        if let ResponseBody::Failure(body) = &mut self.body {
            edit(body);
        }
        self
    }

    pub fn success_body(&self) -> Option<&SuccessBody> {
        match &self.body {
            ResponseBody::Success(body) => Some(body),
            ResponseBody::Failure(_) => None,
        }
    }

    pub fn failure_body(&self) -> Option<&FailureBody> {
        match &self.body {
            ResponseBody::Failure(body) => Some(body),
            ResponseBody::Success(_) => None,
        }
    }

    /// JSON payload; raw bytes, if any, are added as base64 under `pdfBase64`.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(&self.body)?;
        if let (Some(pdf), Some(map)) = (&self.pdf, value.as_object_mut()) {
            map.insert(
                "pdfBase64".to_string(),
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(pdf)),
            );
        }
        Ok(value)
    }
}
