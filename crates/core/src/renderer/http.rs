//! HTTP image renderer client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::RendererConfig;

use super::{ImageRenderer, RenderRequest, RenderedImage, RendererError, Symbology};

/// Body of `POST {url}/render`.
#[derive(Debug, Serialize)]
struct RenderBody<'a> {
    payload: &'a str,
    symbology: Symbology,
    width: u32,
    height: u32,
}

/// Renderer reached over HTTP.
///
/// Sends the payload and target size as JSON and expects the image bytes
/// back, typed by the response `Content-Type`.
pub struct HttpImageRenderer {
    client: Client,
    base_url: String,
}

impl HttpImageRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self, RendererError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| RendererError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn render_url(&self) -> String {
        format!("{}/render", self.base_url)
    }
}

#[async_trait]
impl ImageRenderer for HttpImageRenderer {
    fn name(&self) -> &str {
        "http"
    }

    async fn render(&self, request: RenderRequest) -> Result<RenderedImage, RendererError> {
        let body = RenderBody {
            payload: &request.payload,
            symbology: request.symbology,
            width: request.width(),
            height: request.height(),
        };

        debug!(
            ticket_id = %request.ticket_id,
            symbology = request.symbology.as_str(),
            "Requesting render"
        );

        let response = self
            .client
            .post(self.render_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RendererError::Timeout
                } else if e.is_connect() {
                    RendererError::ConnectionFailed(e.to_string())
                } else {
                    RendererError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_client_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(RendererError::Rejected(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }
        if !status.is_success() {
            return Err(RendererError::ApiError(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(|e| RendererError::ApiError(format!("Failed to read body: {}", e)))?;

        Ok(RenderedImage {
            content_type,
            data: data.to_vec(),
        })
    }
}
