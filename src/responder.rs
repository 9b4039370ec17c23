//! Generative support responder — optional collaborator for grounded
//! free-text support answers.
//!
//! The support handler treats this seam as best-effort: `Ok(None)` or an
//! error both degrade to the static knowledge base.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::ResponderError;
use crate::lang::Language;

/// Answers a customer question in the given language, grounded on the
/// provided context text. Returns `None` when no answer is available.
#[async_trait]
pub trait SupportResponder: Send + Sync {
    async fn answer(
        &self,
        question: &str,
        language: Language,
        context: &str,
    ) -> Result<Option<String>, ResponderError>;
}

/// Anthropic Messages API responder.
pub struct AnthropicResponder {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl AnthropicResponder {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        }
    }

    fn prompt(question: &str, language: Language, context: &str) -> String {
        let language_name = match language {
            Language::En => "English",
            Language::Hi => "Hindi",
        };
        format!(
            "You are Lumo Finance's bilingual support assistant. Answer concisely \
             in {language_name}. If unsure, acknowledge and suggest connecting to an agent.\n\n\
             Context:\n{context}\n\nCustomer question:\n{question}\n\nAnswer:"
        )
    }
}

#[async_trait]
impl SupportResponder for AnthropicResponder {
    async fn answer(
        &self,
        question: &str,
        language: Language,
        context: &str,
    ) -> Result<Option<String>, ResponderError> {
        let payload = json!({
            "model": self.model,
            "max_tokens": 400,
            "temperature": 0.0,
            "messages": [{"role": "user", "content": Self::prompt(question, language, context)}],
        });
        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ResponderError::RequestFailed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(ResponderError::RequestFailed(format!("status={status}")));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| ResponderError::InvalidResponse(e.to_string()))?;
        let text = body
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_answer_language() {
        let en = AnthropicResponder::prompt("How do I repay?", Language::En, "{}");
        assert!(en.contains("in English"));
        let hi = AnthropicResponder::prompt("How do I repay?", Language::Hi, "{}");
        assert!(hi.contains("in Hindi"));
        assert!(hi.contains("How do I repay?"));
    }
}
