use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email API rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Transactional email provider. Returns the provider's message id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError>;
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Resend `POST /emails` client.
#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
    api_url: String,
    from: String,
}

impl ResendMailer {
    pub fn new(client: Client, api_key: String, api_url: String, from: String) -> Self {
        Self {
            client,
            api_key,
            api_url,
            from,
        }
    }
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        let parsed: Option<ResendResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|r| r.message)
                .unwrap_or_else(|| "Failed to send email".to_string());
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(parsed.and_then(|r| r.id).unwrap_or_default())
    }
}
