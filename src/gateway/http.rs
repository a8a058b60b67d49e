use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::schemas::{
    find_duplicate_task_id, AnalysisEnvelope, AnalysisResult, Task, TokenResponse, UserProfile,
};
use super::{
    AnalysisGateway, AnalysisTarget, AuthGateway, PROFILE_PATH, TASKS_PATH, TOKEN_PATH,
};
use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::Credential;
use crate::upload::AudioFile;

/// reqwest-backed client for the meeting analysis backend.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: &str, request_timeout: Duration, upload_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            upload_timeout,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            &config.base_url,
            config.request_timeout(),
            config.upload_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send and read the whole body. Transport errors and timeouts come back
    /// as `Err(detail)` for logging; the caller picks the error kind.
    async fn execute(request: RequestBuilder) -> Result<(StatusCode, String), String> {
        let response = request.send().await.map_err(describe_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(describe_transport_error)?;
        Ok((status, body))
    }

    async fn get_authorized<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: &Credential,
    ) -> ClientResult<T> {
        let request = self
            .client
            .get(self.url(path))
            .bearer_auth(credential.token())
            .timeout(self.request_timeout);

        let (status, body) = Self::execute(request).await.map_err(|detail| {
            warn!("GET {} failed: {}", path, detail);
            ClientError::AuthExpired
        })?;

        if !status.is_success() {
            warn!("GET {} rejected with status {}", path, status);
            return Err(ClientError::AuthExpired);
        }

        parse_body(&body).map_err(|detail| {
            warn!("GET {} returned an unexpected payload: {}", path, detail);
            ClientError::AuthExpired
        })
    }
}

fn describe_transport_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, String> {
    serde_json::from_str(body).map_err(|e| e.to_string())
}

/// `/process-meeting/` has no fixed payload: results are optional.
fn parse_meeting_body(body: &str) -> Result<Option<AnalysisResult>, String> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = parse_body(body)?;
    if value.get("results").is_none() {
        return Ok(None);
    }

    let envelope: AnalysisEnvelope = serde_json::from_value(value).map_err(|e| e.to_string())?;
    Ok(Some(envelope.results))
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn authenticate(&self, username: &str, password: &str) -> ClientResult<String> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::validation(
                "Username and password are required.",
            ));
        }

        let request = self
            .client
            .post(self.url(TOKEN_PATH))
            .form(&[("username", username), ("password", password)])
            .timeout(self.request_timeout);

        let (status, body) = Self::execute(request).await.map_err(|detail| {
            warn!("Token request failed: {}", detail);
            ClientError::InvalidCredentials
        })?;

        if !status.is_success() {
            info!("Token exchange rejected with status {}", status);
            return Err(ClientError::InvalidCredentials);
        }

        let token: TokenResponse = parse_body(&body).map_err(|detail| {
            warn!("Token response had an unexpected shape: {}", detail);
            ClientError::InvalidCredentials
        })?;

        if token.access_token.trim().is_empty() {
            warn!("Token response carried an empty access token");
            return Err(ClientError::InvalidCredentials);
        }

        Ok(token.access_token)
    }

    async fn fetch_profile(&self, credential: &Credential) -> ClientResult<UserProfile> {
        self.get_authorized(PROFILE_PATH, credential).await
    }

    async fn fetch_tasks(&self, credential: &Credential) -> ClientResult<Vec<Task>> {
        let tasks: Vec<Task> = self.get_authorized(TASKS_PATH, credential).await?;

        if let Some(id) = find_duplicate_task_id(&tasks) {
            warn!("Task list contained duplicate id {}", id);
            return Err(ClientError::AuthExpired);
        }

        debug!("Fetched {} tasks", tasks.len());
        Ok(tasks)
    }
}

#[async_trait]
impl AnalysisGateway for HttpGateway {
    async fn analyze(
        &self,
        file: AudioFile,
        target: &AnalysisTarget,
    ) -> ClientResult<Option<AnalysisResult>> {
        let path = target.path();
        let file_name = file.file_name().to_string();
        let mime_type = file.mime_type().to_string();
        info!(
            "Uploading {} ({} bytes) to {}",
            file_name,
            file.len(),
            path
        );

        let part = Part::bytes(file.into_bytes())
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| {
                warn!("Invalid MIME type {}: {}", mime_type, e);
                ClientError::UploadFailed
            })?;
        let form = Form::new().part("file", part);

        let mut request = self
            .client
            .post(self.url(path))
            .multipart(form)
            .timeout(self.upload_timeout);

        if let AnalysisTarget::Meeting(credential) = target {
            request = request.bearer_auth(credential.token());
        }

        let (status, body) = Self::execute(request).await.map_err(|detail| {
            warn!("Upload to {} failed: {}", path, detail);
            ClientError::UploadFailed
        })?;

        if !status.is_success() {
            warn!("Upload to {} failed with status {}: {}", path, status, body);
            return Err(ClientError::UploadFailed);
        }

        let parsed = match target {
            AnalysisTarget::Stateless => {
                parse_body::<AnalysisEnvelope>(&body).map(|envelope| Some(envelope.results))
            }
            AnalysisTarget::Meeting(_) => parse_meeting_body(&body),
        };

        parsed.map_err(|detail| {
            warn!("Analysis response from {} had an unexpected shape: {}", path, detail);
            ClientError::UploadFailed
        })
    }
}
