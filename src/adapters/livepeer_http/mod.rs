// Livepeer HTTP adapter - Remote transcoding through the Livepeer API

pub mod multipart;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::domain::model::{RenditionProfile, RenditionSet, Session, TranscodedSegmentSet};
use crate::error::{TranscodeError, TranscodeResult};
use crate::ports::TranscodePort;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_API_HOST: &str = "livepeer.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const CONTENT_DURATION: &str = "Content-Duration";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for the Livepeer API
#[derive(Debug, Clone)]
pub struct LivepeerConfig {
    /// Host name (`livepeer.com`) or full base URL (`http://127.0.0.1:8080`)
    pub api_host: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl LivepeerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            api_key: api_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Base URL of the API, `https://` unless a scheme is given
    pub fn api_base(&self) -> String {
        let host = self.api_host.trim_end_matches('/');
        if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BroadcasterInfo {
    address: String,
}

#[derive(Debug, Serialize)]
struct CreateStreamRequest<'a> {
    name: &'a str,
    record: bool,
    #[serde(skip_serializing_if = "is_empty")]
    presets: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    profiles: &'a [RenditionProfile],
}

fn is_empty<T>(list: &&[T]) -> bool {
    list.is_empty()
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// [`TranscodePort`] backed by the Livepeer REST API and a broadcaster node
pub struct LivepeerHttpAdapter {
    client: Client,
    config: LivepeerConfig,
    api_base: String,
    broadcaster: OnceCell<String>,
}

impl LivepeerHttpAdapter {
    pub fn new(config: LivepeerConfig) -> TranscodeResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(TranscodeError::configuration("Livepeer API key is required"));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TranscodeError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base(),
            config,
            broadcaster: OnceCell::new(),
        })
    }

    fn describe(&self, e: reqwest::Error) -> String {
        if e.is_timeout() {
            format!(
                "request timed out after {}s",
                self.config.request_timeout.as_secs()
            )
        } else {
            e.to_string()
        }
    }

    /// Fail on a non-success status, keeping the response body for the message
    async fn check_status(response: Response) -> Result<Response, String> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(format!("{} {}", status, body.trim()))
    }

    /// Ingest node for pushes, discovered once
    async fn broadcaster(&self) -> Result<&str, String> {
        self.broadcaster
            .get_or_try_init(|| async {
                let url = format!("{}/api/broadcaster", self.api_base);
                let response = self
                    .client
                    .get(&url)
                    .bearer_auth(&self.config.api_key)
                    .send()
                    .await
                    .map_err(|e| self.describe(e))?;
                let response = Self::check_status(response).await?;
                let nodes: Vec<BroadcasterInfo> = response
                    .json()
                    .await
                    .map_err(|e| format!("invalid broadcaster list: {}", e))?;

                let chosen = nodes
                    .into_iter()
                    .next()
                    .map(|node| node.address.trim_end_matches('/').to_string())
                    .ok_or_else(|| "no broadcasters available".to_string())?;
                info!("Using broadcaster {}", chosen);
                Ok::<String, String>(chosen)
            })
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl TranscodePort for LivepeerHttpAdapter {
    async fn create_session(&self, name: &str, renditions: &RenditionSet) -> TranscodeResult<Session> {
        let (presets, profiles): (&[String], &[RenditionProfile]) = match renditions {
            RenditionSet::Presets(presets) => (presets.as_slice(), &[][..]),
            RenditionSet::Profiles(profiles) => (&[][..], profiles.as_slice()),
        };
        let request = CreateStreamRequest {
            name,
            record: false,
            presets,
            profiles,
        };

        let url = format!("{}/api/stream", self.api_base);
        debug!(url = %url, renditions = renditions.len(), "Creating stream {}", name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranscodeError::session(format!("create stream: {}", self.describe(e))))?;
        let response = Self::check_status(response)
            .await
            .map_err(|e| TranscodeError::session(format!("create stream: {}", e)))?;
        let stream: StreamResponse = response
            .json()
            .await
            .map_err(|e| TranscodeError::session(format!("invalid create stream response: {}", e)))?;

        if stream.id.is_empty() {
            return Err(TranscodeError::session("create stream returned an empty id"));
        }

        info!("Created stream {} ({})", stream.id, name);
        Ok(Session {
            id: stream.id,
            name: stream.name.unwrap_or_else(|| name.to_string()),
            rendition_count: renditions.len(),
        })
    }

    async fn push_segment(
        &self,
        session: &Session,
        seq_no: u64,
        duration: Duration,
        payload: Bytes,
    ) -> TranscodeResult<TranscodedSegmentSet> {
        let push_error = |message: String| TranscodeError::Push { seq_no, message };

        let broadcaster = self.broadcaster().await.map_err(push_error)?;
        let url = format!("{}/live/{}/{}.ts", broadcaster, session.id, seq_no);
        let size = payload.len();

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "multipart/mixed")
            .header(CONTENT_DURATION, duration.as_millis().to_string())
            .body(payload)
            .send()
            .await
            .map_err(|e| push_error(self.describe(e)))?;
        let response = Self::check_status(response).await.map_err(push_error)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let boundary = multipart::boundary(&content_type)
            .ok_or_else(|| push_error(format!("expected multipart response, got '{}'", content_type)))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| push_error(self.describe(e)))?;
        let parts = multipart::parse(&body, &boundary)
            .map_err(|e| push_error(format!("malformed multipart response: {}", e)))?;

        debug!(
            seq_no,
            bytes = size,
            renditions = parts.len(),
            "Transcoded segment of {}ms",
            duration.as_millis()
        );

        TranscodedSegmentSet::new(
            parts.into_iter().map(|part| part.body).collect(),
            session.rendition_count,
            seq_no,
        )
    }

    async fn delete_session(&self, session: &Session) -> TranscodeResult<()> {
        let url = format!("{}/api/stream/{}", self.api_base, session.id);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| TranscodeError::session(format!("delete stream: {}", self.describe(e))))?;

        if let Err(e) = Self::check_status(response).await {
            warn!("Deleting stream {} failed: {}", session.id, e);
            return Err(TranscodeError::session(format!("delete stream: {}", e)));
        }

        info!("Deleted stream {}", session.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base() {
        let mut config = LivepeerConfig::new("key");
        assert_eq!(config.api_base(), "https://livepeer.com");

        config.api_host = "http://127.0.0.1:9000/".to_string();
        assert_eq!(config.api_base(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_missing_key_rejected() {
        let config = LivepeerConfig::new("  ");
        assert!(matches!(
            LivepeerHttpAdapter::new(config),
            Err(TranscodeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_create_request_body() {
        let presets = vec!["P240p30fps16x9".to_string()];
        let request = CreateStreamRequest {
            name: "tod_x",
            record: false,
            presets: &presets,
            profiles: &[],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["name"], "tod_x");
        assert_eq!(json["record"], false);
        assert_eq!(json["presets"][0], "P240p30fps16x9");
        assert!(json.get("profiles").is_none());
    }
}
