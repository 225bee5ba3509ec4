//! Out-of-band alert notification.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::error::{AlertError, AlertResult};

/// Telegram Bot API root.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// HTTP request timeout for a single notification call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends alert text and an optional image somewhere a human will see it.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, text: &str, image: Option<&Path>) -> AlertResult<()>;
}

/// Logs alerts instead of delivering them. Used when no credentials are set.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, text: &str, image: Option<&Path>) -> AlertResult<()> {
        info!(
            image = image.map(|p| p.display().to_string()),
            "[NOTIFIER] {}", text
        );
        Ok(())
    }
}

/// Telegram bot notifier: `sendMessage` with the text, then `sendPhoto`
/// with the snapshot when one exists.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> AlertResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: TELEGRAM_API_URL.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    /// Point at another Bot API server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn send_message(&self, text: &str) -> AlertResult<()> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;
        check_status(response.status())
    }

    async fn send_photo(&self, path: &Path) -> AlertResult<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "alert.png".to_string());
        let photo = Part::bytes(bytes).file_name(file_name).mime_str("image/png")?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("photo", photo);

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        check_status(response.status())
    }
}

fn check_status(status: reqwest::StatusCode) -> AlertResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AlertError::HttpStatus(status.as_u16()))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, text: &str, image: Option<&Path>) -> AlertResult<()> {
        self.send_message(text).await?;
        if let Some(path) = image.filter(|p| p.exists()) {
            self.send_photo(path).await?;
        }
        debug!(chat_id = %self.chat_id, "Telegram alert sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer) -> TelegramNotifier {
        TelegramNotifier::new("TOKEN", "42")
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_text_only_alert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(serde_json::json!({"chat_id": "42", "text": "hello"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendPhoto"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        notifier(&server).send("hello", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_alert_with_photo() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendPhoto"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("alert.png");
        std::fs::write(&photo, b"\x89PNG fake").unwrap();

        notifier(&server).send("alarm", Some(&photo)).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = notifier(&server).send("alarm", None).await.unwrap_err();
        assert!(matches!(err, AlertError::HttpStatus(401)));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        LogNotifier.send("alarm", None).await.unwrap();
    }
}
