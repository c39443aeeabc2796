use std::time::Duration;

use queue_logging::queue_debug;
use serde_json::Value;
use url::Url;

use crate::{FailureKind, FetchError};

const STATUS_PATH: &[&str] = &["request", "api", "status"];
const ACTIVE_DOWNLOADS_PATH: &[&str] = &["request", "api", "downloads", "active"];
const DOWNLOAD_PATH: &[&str] = &["request", "api", "download"];
const CLEAR_PATH: &[&str] = &["request", "api", "queue", "clear"];

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8084".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// The download server's queue endpoints.
#[async_trait::async_trait]
pub trait DownloadApi: Send + Sync {
    async fn fetch_status(&self) -> Result<Value, FetchError>;
    async fn fetch_active_downloads(&self) -> Result<Value, FetchError>;
    async fn submit_download(&self, id: &str) -> Result<(), FetchError>;
    async fn cancel_download(&self, id: &str) -> Result<(), FetchError>;
    async fn clear_completed(&self) -> Result<(), FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDownloadApi {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestDownloadApi {
    pub fn new(settings: ApiSettings) -> Result<Self, FetchError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot carry a path", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, base })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                FetchError::new(FailureKind::InvalidUrl, "base url cannot carry a path")
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        queue_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        decode_body(&body)
    }

    async fn send_action(&self, request: reqwest::RequestBuilder) -> Result<(), FetchError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ))
        }
    }
}

#[async_trait::async_trait]
impl DownloadApi for ReqwestDownloadApi {
    async fn fetch_status(&self) -> Result<Value, FetchError> {
        let url = self.endpoint(STATUS_PATH.iter().copied())?;
        self.get_json(url).await
    }

    async fn fetch_active_downloads(&self) -> Result<Value, FetchError> {
        let url = self.endpoint(ACTIVE_DOWNLOADS_PATH.iter().copied())?;
        self.get_json(url).await
    }

    async fn submit_download(&self, id: &str) -> Result<(), FetchError> {
        let mut url = self.endpoint(DOWNLOAD_PATH.iter().copied())?;
        url.query_pairs_mut().append_pair("id", id);
        queue_debug!("GET {}", url);
        self.send_action(self.client.get(url)).await
    }

    async fn cancel_download(&self, id: &str) -> Result<(), FetchError> {
        let url = self.endpoint(DOWNLOAD_PATH.iter().copied().chain([id, "cancel"]))?;
        queue_debug!("DELETE {}", url);
        self.send_action(self.client.delete(url)).await
    }

    async fn clear_completed(&self) -> Result<(), FetchError> {
        let url = self.endpoint(CLEAR_PATH.iter().copied())?;
        queue_debug!("DELETE {}", url);
        self.send_action(self.client.delete(url)).await
    }
}

/// An empty body (204 and friends) reads as JSON `null`.
fn decode_body(body: &[u8]) -> Result<Value, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|err| FetchError::new(FailureKind::Malformed, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
