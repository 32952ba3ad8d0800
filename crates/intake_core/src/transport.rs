use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::ProfileId,
    protocol::{
        CalculateRequest, CalculationResult, ConfirmProfileRequest, ConfirmProfileResponse,
        CreateProfileResponse, FinancialProfile, UploadResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    backend::{BackendError, IntakeBackend},
    config::ClientSettings,
    document::DocumentUpload,
};

/// `IntakeBackend` over the REST API.
#[derive(Debug, Clone)]
pub struct HttpIntakeBackend {
    http: Client,
    base_url: Url,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl HttpIntakeBackend {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        upload_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut base_url =
            Url::parse(base_url.trim()).with_context(|| format!("invalid api url '{base_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            request_timeout,
            upload_timeout,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        Self::new(
            &settings.api_base_url,
            settings.request_timeout(),
            settings.upload_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Malformed(format!("invalid endpoint '{path}': {e}")))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        route: &'static str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().await.map_err(transport_error)?;
        read_json(route, response).await
    }
}

#[async_trait]
impl IntakeBackend for HttpIntakeBackend {
    async fn upload_document(&self, document: &DocumentUpload) -> Result<UploadResponse, BackendError> {
        let part = multipart::Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(document.kind.mime_type())
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);
        debug!(bytes = document.size(), "intake: uploading document");

        let request = self
            .http
            .post(self.endpoint("api/upload")?)
            .timeout(self.upload_timeout)
            .multipart(form);
        self.execute("api/upload", request).await
    }

    async fn confirm_profile(
        &self,
        request: &ConfirmProfileRequest,
    ) -> Result<ConfirmProfileResponse, BackendError> {
        let request = self
            .http
            .put(self.endpoint("api/profile/confirm")?)
            .timeout(self.request_timeout)
            .json(request);
        self.execute("api/profile/confirm", request).await
    }

    async fn create_profile(
        &self,
        profile: &FinancialProfile,
    ) -> Result<CreateProfileResponse, BackendError> {
        let request = self
            .http
            .post(self.endpoint("api/profile")?)
            .timeout(self.request_timeout)
            .json(profile);
        self.execute("api/profile", request).await
    }

    async fn calculate(&self, profile_id: &ProfileId) -> Result<CalculationResult, BackendError> {
        let request = self
            .http
            .post(self.endpoint("api/calculate")?)
            .timeout(self.request_timeout)
            .json(&CalculateRequest {
                profile_id: profile_id.clone(),
            });
        self.execute("api/calculate", request).await
    }
}

async fn read_json<T: DeserializeOwned>(
    route: &'static str,
    response: Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;
    if !status.is_success() {
        warn!(route, status = status.as_u16(), "intake: backend returned an error");
        return Err(BackendError::from_error_body(status, &body));
    }
    serde_json::from_slice(&body)
        .map_err(|e| BackendError::Malformed(format!("{route} response: {e}")))
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Network(err.to_string())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
