use serde::Deserialize;
use thiserror::Error;

/// Errors returned by control-plane calls.
#[derive(Debug, Clone, Error)]
pub enum ArmError {
    #[error("HTTP client creation failed: {0}")]
    ClientCreation(String),

    #[error("Request failed: {url} - {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Request timeout after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    /// ARM answered with a non-success status.
    #[error("Azure API error during {operation}: {code} (HTTP {status_code}) - {message}{}", request_suffix(.request_id))]
    AzureApi {
        operation: String,
        status_code: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// The response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn request_suffix(request_id: &Option<String>) -> String {
    request_id
        .as_ref()
        .map(|id| format!(" [Request ID: {id}]"))
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ArmError {
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        ArmError::InvalidResponse(reason.into())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ArmError::AzureApi { status_code: 401, .. })
    }

    pub(crate) fn from_transport(url: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ArmError::Timeout {
                url: url.to_string(),
                seconds: timeout_secs,
            }
        } else {
            ArmError::RequestFailed {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Builds an [`ArmError::AzureApi`] from a failed response, pulling the
    /// ARM error code/message out of the body when there is one.
    pub(crate) async fn from_response(response: reqwest::Response, operation: &str) -> Self {
        let status_code = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-ms-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let text = response.text().await.unwrap_or_default();

        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => (
                envelope
                    .error
                    .code
                    .unwrap_or_else(|| "Unknown".to_string()),
                envelope.error.message.unwrap_or_default(),
            ),
            Err(_) => ("Unknown".to_string(), text),
        };

        ArmError::AzureApi {
            operation: operation.to_string(),
            status_code,
            code,
            message,
            request_id,
        }
    }
}
