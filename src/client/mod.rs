//! Typed client for the studio API and the external generation endpoint.
//!
//! The controllers in [`crate::editor`] and [`crate::chat`] only see the
//! [`StudioApi`] and [`Generator`] traits; [`StudioClient`] is the HTTP
//! implementation of both.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{
    Capture, CaptureCreated, FewShotExample, GenerateOutcome, GenerateRequest, GenerateResponse,
    PendingImage,
};

// ============================================================================
// Traits
// ============================================================================

/// Studio asset endpoints as seen by the editor controllers.
#[async_trait]
pub trait StudioApi: Send + Sync {
    async fn system_prompt(&self) -> Result<String, AppError>;
    async fn save_system_prompt(&self, content: &str) -> Result<(), AppError>;
    async fn examples(&self) -> Result<Vec<FewShotExample>, AppError>;
    async fn save_examples(&self, examples: &[FewShotExample]) -> Result<(), AppError>;
    async fn captures(&self) -> Result<Vec<Capture>, AppError>;
    async fn upload_capture(&self, image: &PendingImage) -> Result<CaptureCreated, AppError>;
    async fn delete_capture(&self, name: &str) -> Result<(), AppError>;
    /// Download an arbitrary URL so it can be stored as a capture.
    async fn fetch_image(&self, url: &str) -> Result<PendingImage, AppError>;
}

/// The external component generation service.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateOutcome, AppError>;
}

// ============================================================================
// Helpers
// ============================================================================

fn network_err(e: impl std::fmt::Display) -> AppError {
    AppError::Network(e.to_string())
}

/// Turn a non-2xx response into `Rejected`, carrying the server's `{error}` text if any.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_default();
    Err(AppError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Last non-empty path segment of a URL, or `download`.
fn url_filename(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()?
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| "download".to_string())
}

/// Build a `data:` URL from raw bytes.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    use base64::Engine;
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct SystemPromptBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct UploadBody<'a> {
    data: String,
    filename: &'a str,
}

#[derive(Deserialize)]
struct SystemPromptResponse {
    content: String,
}

// ============================================================================
// StudioClient
// ============================================================================

/// HTTP client for a running studio server.
#[derive(Clone)]
pub struct StudioClient {
    http: reqwest::Client,
    base_url: String,
}

impl StudioClient {
    /// Client with a 30-second request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let resp = req.send().await.map_err(network_err)?;
        check(resp).await?.json().await.map_err(network_err)
    }

    async fn send_ok(&self, req: reqwest::RequestBuilder) -> Result<(), AppError> {
        let resp = req.send().await.map_err(network_err)?;
        check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl StudioApi for StudioClient {
    /// `GET /api/prompts/system`
    async fn system_prompt(&self) -> Result<String, AppError> {
        let resp: SystemPromptResponse = self
            .send_json(self.request(reqwest::Method::GET, "/api/prompts/system"))
            .await?;
        Ok(resp.content)
    }

    /// `PUT /api/prompts/system`
    async fn save_system_prompt(&self, content: &str) -> Result<(), AppError> {
        self.send_ok(
            self.request(reqwest::Method::PUT, "/api/prompts/system")
                .json(&SystemPromptBody { content }),
        )
        .await
    }

    async fn examples(&self) -> Result<Vec<FewShotExample>, AppError> {
        self.send_json(self.request(reqwest::Method::GET, "/api/prompts/examples"))
            .await
    }

    /// `PUT /api/prompts/examples` with the list pretty-printed, as it is stored on disk.
    async fn save_examples(&self, examples: &[FewShotExample]) -> Result<(), AppError> {
        let body = serde_json::to_string_pretty(examples)?;
        self.send_ok(
            self.request(reqwest::Method::PUT, "/api/prompts/examples")
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
        )
        .await
    }

    async fn captures(&self) -> Result<Vec<Capture>, AppError> {
        self.send_json(self.request(reqwest::Method::GET, "/api/captures"))
            .await
    }

    async fn upload_capture(&self, image: &PendingImage) -> Result<CaptureCreated, AppError> {
        let body = UploadBody {
            data: to_data_url(&image.mime, &image.bytes),
            filename: &image.filename,
        };
        self.send_json(self.request(reqwest::Method::POST, "/api/captures").json(&body))
            .await
    }

    async fn delete_capture(&self, name: &str) -> Result<(), AppError> {
        let path = format!("/api/captures/{}", urlencoding::encode(name));
        self.send_ok(self.request(reqwest::Method::DELETE, &path))
            .await
    }

    async fn fetch_image(&self, url: &str) -> Result<PendingImage, AppError> {
        let resp = self.http.get(url).send().await.map_err(network_err)?;
        let resp = check(resp).await?;

        let mime = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_string())
            .unwrap_or_default();
        let bytes = resp.bytes().await.map_err(network_err)?.to_vec();

        let filename = url_filename(url);
        Ok(PendingImage {
            filename,
            mime,
            bytes,
        })
    }
}

#[async_trait]
impl Generator for StudioClient {
    /// `POST /api/generate`. Error bodies are still decoded; they carry `{error, details}`.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateOutcome, AppError> {
        let resp = self
            .request(reqwest::Method::POST, "/api/generate")
            .json(request)
            .send()
            .await
            .map_err(network_err)?;
        let status = resp.status();
        let text = resp.text().await.map_err(network_err)?;

        match serde_json::from_str::<GenerateResponse>(&text) {
            Ok(body) => Ok(body.into()),
            Err(_) if !status.is_success() => Err(AppError::Rejected {
                status: status.as_u16(),
                message: String::new(),
            }),
            Err(e) => Err(network_err(format!("Unreadable generation response: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_data_url() {
        assert_eq!(to_data_url("image/png", &[0, 0, 0]), "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(url_filename("https://cdn.test/img/logo.webp?v=2"), "logo.webp");
        assert_eq!(url_filename("https://cdn.test/"), "download");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = StudioClient::new("http://127.0.0.1:5173/").unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:5173");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is closed on test hosts.
        let client = StudioClient::new("http://127.0.0.1:9").unwrap();
        let err = client.captures().await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
