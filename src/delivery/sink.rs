use crate::errors::{CourierError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;

/// Destination for a retrieved artifact. Consumes the open stream; the
/// retrieval core never inspects the result beyond error propagation.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn store(&self, artifact: File, name: &str) -> Result<()>;
}

/// Uploads the artifact as a streaming multipart POST.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    auth_header: Option<String>,
}

impl HttpSink {
    pub fn new(endpoint: String, auth_header: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            auth_header,
        }
    }
}

#[async_trait]
impl ArtifactSink for HttpSink {
    async fn store(&self, artifact: File, name: &str) -> Result<()> {
        let body = Body::wrap_stream(ReaderStream::new(artifact));
        let part = Part::stream(body)
            .file_name(name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| CourierError::UploadFailed(e.to_string()))?;
        let form = Form::new().part("file", part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CourierError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CourierError::UploadFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        info!(name, "artifact uploaded");
        Ok(())
    }
}
