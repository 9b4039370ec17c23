//! Messaging sink — outbound intents and the WhatsApp Cloud API client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::ChannelError;

/// Maximum options per interactive message; callers split larger sets.
pub const MAX_CHOICE_OPTIONS: usize = 3;

/// Provider limit on a button title.
pub const MAX_BUTTON_TITLE_LEN: usize = 20;

/// One quick-reply option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// An outbound message the engine wants sent. Produced by the flow engine
/// and dispatched by its caller after the session has been persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundIntent {
    Text {
        body: String,
    },
    Choice {
        body: String,
        options: Vec<ChoiceOption>,
    },
    Document {
        link: String,
        filename: String,
    },
}

/// Build choice intents, splitting past the per-message option limit.
/// Follow-up messages use `more_label` as their body.
pub fn choice_intents(
    body: &str,
    options: Vec<ChoiceOption>,
    more_label: &str,
) -> Vec<OutboundIntent> {
    let mut intents = Vec::new();
    for (i, chunk) in options.chunks(MAX_CHOICE_OPTIONS).enumerate() {
        intents.push(OutboundIntent::Choice {
            body: if i == 0 { body } else { more_label }.to_string(),
            options: chunk.to_vec(),
        });
    }
    intents
}

/// Delivery mechanism for outbound messages.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, user_id: &str, body: &str) -> Result<(), ChannelError>;

    /// Send a body with up to [`MAX_CHOICE_OPTIONS`] quick-reply options.
    async fn send_choice(
        &self,
        user_id: &str,
        body: &str,
        options: &[ChoiceOption],
    ) -> Result<(), ChannelError>;

    async fn send_document(
        &self,
        user_id: &str,
        link: &str,
        filename: &str,
    ) -> Result<(), ChannelError>;
}

/// Hand a turn's intents to the messenger, in order. Send failures are
/// logged and do not stop the remaining intents — losing one outbound
/// message must not stall the conversation.
pub async fn dispatch(messenger: &dyn Messenger, user_id: &str, intents: &[OutboundIntent]) {
    for intent in intents {
        let result = match intent {
            OutboundIntent::Text { body } => messenger.send_text(user_id, body).await,
            OutboundIntent::Choice { body, options } => {
                messenger.send_choice(user_id, body, options).await
            }
            OutboundIntent::Document { link, filename } => {
                messenger.send_document(user_id, link, filename).await
            }
        };
        if let Err(e) = result {
            tracing::warn!(user_id, error = %e, "Outbound send failed");
        }
    }
}

/// Meta WhatsApp Cloud API client.
///
/// When no access token / phone number id is configured the client runs in
/// dry-run mode: payloads are logged instead of posted.
pub struct WhatsAppClient {
    client: reqwest::Client,
    token: Option<SecretString>,
    base_url: Option<String>,
}

impl WhatsAppClient {
    pub fn new(token: Option<SecretString>, phone_number_id: Option<String>) -> Self {
        Self::with_api_version(token, phone_number_id, "v24.0")
    }

    pub fn with_api_version(
        token: Option<SecretString>,
        phone_number_id: Option<String>,
        api_version: &str,
    ) -> Self {
        let base_url = phone_number_id
            .map(|id| format!("https://graph.facebook.com/{api_version}/{id}/messages"));
        Self {
            client: reqwest::Client::new(),
            token,
            base_url,
        }
    }

    pub fn enabled(&self) -> bool {
        self.token.is_some() && self.base_url.is_some()
    }

    async fn post(&self, user_id: &str, kind: &'static str, payload: Value) -> Result<(), ChannelError> {
        let (Some(token), Some(base_url)) = (&self.token, &self.base_url) else {
            tracing::info!(kind, payload = %payload, "[dry-run] outbound message");
            return Ok(());
        };
        let response = self
            .client
            .post(base_url)
            .bearer_auth(token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                kind,
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                kind,
                user_id: user_id.to_string(),
                reason: format!("status={status} body={body}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for WhatsAppClient {
    async fn send_text(&self, user_id: &str, body: &str) -> Result<(), ChannelError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": user_id,
            "type": "text",
            "text": {"body": body},
        });
        self.post(user_id, "text", payload).await
    }

    async fn send_choice(
        &self,
        user_id: &str,
        body: &str,
        options: &[ChoiceOption],
    ) -> Result<(), ChannelError> {
        let buttons: Vec<Value> = options
            .iter()
            .take(MAX_CHOICE_OPTIONS)
            .map(|option| {
                let title: String = option.label.chars().take(MAX_BUTTON_TITLE_LEN).collect();
                json!({"type": "reply", "reply": {"id": option.id, "title": title}})
            })
            .collect();
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": user_id,
            "type": "interactive",
            "interactive": {
                "type": "button",
                "body": {"text": body},
                "action": {"buttons": buttons},
            },
        });
        self.post(user_id, "choice", payload).await
    }

    async fn send_document(
        &self,
        user_id: &str,
        link: &str,
        filename: &str,
    ) -> Result<(), ChannelError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": user_id,
            "type": "document",
            "document": {"link": link, "filename": filename},
        });
        self.post(user_id, "document", payload).await
    }
}
