use crate::errors::{CourierError, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Outcome report for a failed attempt: what was being fetched, what the
/// error said, and its diagnostic trace. Sent exactly once per failure.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub subject: String,
    pub message: String,
    pub trace: String,
}

impl FailureReport {
    pub fn from_error(error: &CourierError, friendly_name: &str) -> Self {
        Self {
            subject: format!("Failed to get {}", friendly_name),
            message: error.to_string(),
            trace: format!("{:?}", error),
        }
    }
}

/// Outbound notification channel. This is the sole failure-visible surface;
/// the courier runs unattended.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn success(&self, subject: &str, body: &str) -> Result<()>;
    async fn failure(&self, report: &FailureReport) -> Result<()>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    event: &'a str,
    subject: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a str>,
    timestamp: i64,
}

/// Posts outcome notifications as JSON to a configured webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, auth_header: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            auth_header,
        }
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<()> {
        let mut request = self.client.post(&self.url).json(payload);
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CourierError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CourierError::NotificationFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn success(&self, subject: &str, body: &str) -> Result<()> {
        self.post(&WebhookPayload {
            event: "success",
            subject,
            body,
            trace: None,
            timestamp: chrono::Utc::now().timestamp(),
        })
        .await?;

        info!(subject, "success notification sent");
        Ok(())
    }

    async fn failure(&self, report: &FailureReport) -> Result<()> {
        self.post(&WebhookPayload {
            event: "failure",
            subject: &report.subject,
            body: &report.message,
            trace: Some(&report.trace),
            timestamp: chrono::Utc::now().timestamp(),
        })
        .await?;

        info!(subject = %report.subject, "failure notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn failure_payload_carries_message_and_trace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("Authorization", "Bearer hook-token"))
            .and(body_partial_json(serde_json::json!({
                "event": "failure",
                "subject": "Failed to get AR Aging Detail",
                "body": "No export link matching \"pdf\" in the reports menu",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(
            format!("{}/hook", server.uri()),
            Some("Bearer hook-token".to_string()),
        );

        let report =
            FailureReport::from_error(&CourierError::ExportLinkNotFound, "AR Aging Detail");
        assert!(report.trace.contains("ExportLinkNotFound"));

        notifier.failure(&report).await.unwrap();
    }

    #[tokio::test]
    async fn success_payload_has_no_trace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "event": "success",
                "subject": "AR Aging Detail Available",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), None);
        notifier
            .success("AR Aging Detail Available", "AR Aging Detail Available for 2026/01/01")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_webhook_is_a_notification_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), None);
        let err = notifier.success("s", "b").await.unwrap_err();
        assert!(matches!(err, CourierError::NotificationFailed(_)));
    }
}
