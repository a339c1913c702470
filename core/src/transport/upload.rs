//! Image Upload Channel
//!
//! One multipart POST per image. The request carries two form fields:
//! `file` (the image bytes with file name and media type) and `message`
//! (the user's text, possibly empty).

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::image::ImageAttachment;
use crate::messages::Metrics;

/// Errors from the upload request
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request could not be made or the body could not be read
    #[error("Upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Upload failed with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for logging
        body: String,
    },

    /// The backend answered 2xx but reported an error in the body
    #[error("Upload rejected: {0}")]
    Rejected(String),

    /// The body had neither an analysis nor an error
    #[error("Upload response carried no analysis")]
    MissingAnalysis,
}

/// A successful upload result
#[derive(Clone, Debug, PartialEq)]
pub struct UploadReply {
    /// The backend's description of the image
    pub analysis: String,
    /// Reply statistics
    pub metrics: Option<Metrics>,
}

/// Response body of the upload endpoint
#[derive(Debug, Default, Deserialize)]
struct UploadBody {
    analysis: Option<String>,
    metrics: Option<Metrics>,
    error: Option<String>,
}

impl UploadBody {
    fn into_reply(self) -> Result<UploadReply, UploadError> {
        match (self.analysis, self.error) {
            (Some(analysis), _) => Ok(UploadReply {
                analysis,
                metrics: self.metrics,
            }),
            (None, Some(error)) => Err(UploadError::Rejected(error)),
            (None, None) => Err(UploadError::MissingAnalysis),
        }
    }
}

/// Sends an image and optional text for analysis
#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Upload one image with the user's text
    async fn upload(
        &self,
        image: &ImageAttachment,
        message: &str,
    ) -> Result<UploadReply, UploadError>;
}

/// reqwest-backed uploader
#[derive(Clone, Debug)]
pub struct HttpImageUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpImageUploader {
    /// Create an uploader posting to `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create an uploader with a preconfigured client
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// The endpoint this uploader posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImageUploader for HttpImageUploader {
    async fn upload(
        &self,
        image: &ImageAttachment,
        message: &str,
    ) -> Result<UploadReply, UploadError> {
        let file_part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.media_type)?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("message", message.trim().to_string());

        tracing::debug!(
            endpoint = %self.endpoint,
            file = %image.file_name,
            bytes = image.size(),
            "Uploading image"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Image upload failed");
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: UploadBody = response.json().await?;
        body.into_reply()
    }
}
