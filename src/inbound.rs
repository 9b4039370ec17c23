//! Input classification — raw inbound events, button identifiers, and
//! free-text intent triage.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// A normalized inbound event from the messaging provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: String,
    pub message_id: Option<String>,
    /// Free text, or the label of a pressed button.
    pub text: Option<String>,
    /// Identifier of a pressed interactive button, if any.
    pub reply_id: Option<String>,
    pub has_image: bool,
    pub has_document: bool,
}

impl InboundEvent {
    pub fn text_message(user_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn button(
        user_id: impl Into<String>,
        reply_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            text: Some(label.into()),
            reply_id: Some(reply_id.into()),
            ..Default::default()
        }
    }

    pub fn image(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            has_image: true,
            ..Default::default()
        }
    }

    /// Lowercased, trimmed text payload.
    pub fn normalized_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
    }

    /// The typed button action, if the reply id belongs to the fixed set.
    pub fn action(&self) -> Option<ButtonAction> {
        self.reply_id.as_deref().and_then(ButtonAction::parse)
    }

    /// Extract one event from a provider `messages[]` entry.
    pub fn from_webhook_message(message: &Value) -> Option<Self> {
        let user_id = message.get("from")?.as_str()?.to_string();
        let text = extract_text(message);
        let reply_id = message
            .pointer("/interactive/button_reply/id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self {
            user_id,
            message_id: message
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string),
            text,
            reply_id,
            has_image: message.get("image").is_some(),
            has_document: message.get("document").is_some(),
        })
    }
}

/// Free text and/or the selected option's title from a raw message.
fn extract_text(message: &Value) -> Option<String> {
    if let Some(body) = message.pointer("/text/body").and_then(Value::as_str) {
        if !body.is_empty() {
            return Some(body.to_string());
        }
    }
    if let Some(text) = message.pointer("/button/text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    for path in ["/interactive/button_reply/title", "/interactive/list_reply/title"] {
        if let Some(title) = message.pointer(path).and_then(Value::as_str) {
            return Some(title.to_string());
        }
    }
    None
}

/// Flatten a provider webhook body into events, in arrival order.
pub fn extract_events(body: &Value) -> Vec<InboundEvent> {
    let mut events = Vec::new();
    let entries = body.get("entry").and_then(Value::as_array);
    for entry in entries.into_iter().flatten() {
        let changes = entry.get("changes").and_then(Value::as_array);
        for change in changes.into_iter().flatten() {
            let messages = change.pointer("/value/messages").and_then(Value::as_array);
            for message in messages.into_iter().flatten() {
                if let Some(event) = InboundEvent::from_webhook_message(message) {
                    events.push(event);
                }
            }
        }
    }
    events
}

/// Typed parse of the fixed interactive option-id namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    LangEn,
    LangHi,
    GetLoan,
    Support,
    ConnectAgent,
    DownloadApp,
    SendEmail,
    Employment(usize),
    Purpose(usize),
    ConsentYes,
    ConsentNo,
    OfferSelect(String),
    OfferView(String),
    KycComplete,
    NachComplete,
    AgreeYes,
    AgreeNo,
    PostView,
    PostDownload,
    PostRepay,
    PostSupport,
}

impl ButtonAction {
    pub fn parse(id: &str) -> Option<Self> {
        let action = match id {
            "lang_en" => Self::LangEn,
            "lang_hi" => Self::LangHi,
            "intent_get_loan" => Self::GetLoan,
            "intent_support" => Self::Support,
            "connect_agent" => Self::ConnectAgent,
            "download_app" => Self::DownloadApp,
            "send_email" => Self::SendEmail,
            "consent_yes" => Self::ConsentYes,
            "consent_no" => Self::ConsentNo,
            "kyc_complete" => Self::KycComplete,
            "nach_complete" => Self::NachComplete,
            "agree_yes" => Self::AgreeYes,
            "agree_no" => Self::AgreeNo,
            "post_view" => Self::PostView,
            "post_download" => Self::PostDownload,
            "post_repay" => Self::PostRepay,
            "post_support" => Self::PostSupport,
            _ => {
                if let Some(rest) = id.strip_prefix("emp_") {
                    return rest.parse().ok().map(Self::Employment);
                }
                if let Some(rest) = id.strip_prefix("purpose_") {
                    return rest.parse().ok().map(Self::Purpose);
                }
                if let Some(rest) = id.strip_prefix("offer_select_") {
                    return Some(Self::OfferSelect(rest.to_string()));
                }
                if let Some(rest) = id.strip_prefix("offer_view_") {
                    return Some(Self::OfferView(rest.to_string()));
                }
                return None;
            }
        };
        Some(action)
    }
}

/// Free-text intents recognized outside an active journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Apply,
}

fn apply_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(apply|loan|finance|start|continue)\b").unwrap())
}

/// Triage normalized free text for a start-application intent.
pub fn detect_intent(text: &str) -> Option<Intent> {
    if apply_regex().is_match(text) {
        return Some(Intent::Apply);
    }
    None
}

/// Whether normalized text is an explicit support trigger.
pub fn is_support_keyword(text: &str) -> bool {
    matches!(text, "support" | "help")
}
