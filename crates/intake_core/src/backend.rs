use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use shared::{
    domain::ProfileId,
    error::{ApiError, ErrorEnvelope},
    protocol::{
        CalculationResult, ConfirmProfileRequest, ConfirmProfileResponse, CreateProfileResponse,
        FinancialProfile, UploadResponse,
    },
};
use thiserror::Error;

use crate::document::DocumentUpload;

/// The four backend calls the intake flow depends on.
#[async_trait]
pub trait IntakeBackend: Send + Sync {
    async fn upload_document(&self, document: &DocumentUpload) -> Result<UploadResponse, BackendError>;

    async fn confirm_profile(
        &self,
        request: &ConfirmProfileRequest,
    ) -> Result<ConfirmProfileResponse, BackendError>;

    async fn create_profile(
        &self,
        profile: &FinancialProfile,
    ) -> Result<CreateProfileResponse, BackendError>;

    async fn calculate(&self, profile_id: &ProfileId) -> Result<CalculationResult, BackendError>;
}

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The server answered with the structured error envelope.
    #[error("server rejected the request ({status}): {}", .error.message)]
    Api { status: StatusCode, error: ApiError },
    /// Any other non-success answer.
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Classifies a non-success body. Only the `{"error": {...}}` envelope is
    /// structured; FastAPI `detail` payloads, bare JSON strings and plain text
    /// are kept as a message.
    pub fn from_error_body(status: StatusCode, body: &[u8]) -> Self {
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
            return BackendError::Api {
                status,
                error: envelope.error,
            };
        }

        let message = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map.get("detail").and_then(detail_message),
            Ok(Value::String(text)) => Some(text),
            _ => None,
        }
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

        let message = if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            message
        };
        BackendError::Status { status, message }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            BackendError::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Timeout | BackendError::Network(_))
    }
}

fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
