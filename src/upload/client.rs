use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{info, warn};

use super::messages::{ServiceErrorBody, Transcript};
use super::UploadService;
use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::session::Artifact;

/// Transcription service reached over HTTP
///
/// `POST {endpoint}?name=<session name>` with the raw artifact bytes as the
/// body and the artifact's MIME type as `Content-Type`. A 2xx answer carries
/// `{"transcript": "..."}`.
pub struct HttpUploadService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploadService {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        info!("Upload service: {}", config.endpoint);

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait::async_trait]
impl UploadService for HttpUploadService {
    async fn submit(&self, name: &str, artifact: &Artifact) -> Result<Transcript, UploadError> {
        info!(
            "Uploading recording {} ({} bytes, {}) to {}",
            artifact.id(),
            artifact.len(),
            artifact.mime_type(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("name", name)])
            .header(CONTENT_TYPE, artifact.mime_type())
            .body(artifact.bytes().to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ServiceErrorBody>(&body)
                .ok()
                .and_then(ServiceErrorBody::into_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });

            warn!("Transcription service rejected upload: {} ({})", message, status);
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let transcript = serde_json::from_slice::<Transcript>(&body)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        info!("Transcript received ({} chars)", transcript.transcript.len());
        Ok(transcript)
    }

    fn name(&self) -> &str {
        "http"
    }
}
