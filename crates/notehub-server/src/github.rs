//! GitHub repository used as blob store through the contents API.
//!
//! Each upload is a commit creating `path` on the configured branch; the
//! file is then publicly readable from `raw.githubusercontent.com`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use notehub_shared::constants::APP_NAME;

use crate::blob_store::{BlobError, BlobStore};
use crate::config::GitHubConfig;

const API_BASE: &str = "https://api.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct RepoInfo {
    full_name: String,
}

pub struct GitHubBlobStore {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubBlobStore {
    pub fn new(config: GitHubConfig) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BlobError::Request(e.to_string()))?;

        info!(
            owner = %config.owner,
            repo = %config.repo,
            branch = %config.branch,
            "GitHub blob store initialized"
        );

        Ok(Self { client, config })
    }

    fn repo_url(&self) -> String {
        format!("{API_BASE}/repos/{}/{}", self.config.owner, self.config.repo)
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/contents/{path}", self.repo_url())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(ACCEPT, "application/vnd.github+json")
    }
}

/// Whether an error answer means the API quota is used up. GitHub signals
/// this with 403 or 429 and either an exhausted `x-ratelimit-remaining`
/// header or a "rate limit" message.
fn is_quota_exhausted(status: StatusCode, headers: &HeaderMap, message: &str) -> bool {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    let remaining_zero = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false);
    remaining_zero || message.to_ascii_lowercase().contains("rate limit")
}

async fn error_from_response(response: reqwest::Response) -> BlobError {
    let status = response.status();
    let headers = response.headers().clone();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    if is_quota_exhausted(status, &headers, &message) {
        warn!(status = status.as_u16(), "GitHub rate limit hit");
        return BlobError::QuotaExhausted;
    }

    BlobError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl BlobStore for GitHubBlobStore {
    async fn put(&self, path: &str, data: &[u8], message: &str) -> Result<String, BlobError> {
        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(data),
            branch: &self.config.branch,
        };

        debug!(path, size = data.len(), "Uploading to GitHub");

        let response = self
            .authorized(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| BlobError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        info!(path, "GitHub upload successful");
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{RAW_BASE}/{}/{}/{}/{path}",
            self.config.owner, self.config.repo, self.config.branch
        )
    }

    async fn read(&self, _path: &str) -> Result<Vec<u8>, BlobError> {
        // Files are served by GitHub itself.
        Err(BlobError::Unsupported)
    }

    async fn probe(&self) -> Result<String, BlobError> {
        let response = self
            .authorized(self.client.get(self.repo_url()))
            .send()
            .await
            .map_err(|e| BlobError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let repo: RepoInfo = response
            .json()
            .await
            .map_err(|e| BlobError::Request(e.to_string()))?;
        Ok(repo.full_name)
    }
}
