//! Persisted conversation state — journey, step cursor, collected answers.
//!
//! Serialized as a nested document on the user profile; must round-trip
//! without losing the cursor or any collected answer so a process restart
//! resumes exactly where the conversation left off.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lang::Language;
use crate::session::fields::OnboardingField;

/// Current serialization layout version.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SESSION_SCHEMA_VERSION
}

/// Coarse conversation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Journey {
    Onboarding,
    Support,
    Completed,
}

impl std::fmt::Display for Journey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Onboarding => "onboarding",
            Self::Support => "support",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// The single step awaiting the user's next input.
///
/// One enum covers both the data-collection fields and the post-offer
/// checkpoints, so at most one step can ever be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Field(OnboardingField),
    AwaitingOfferSelection,
    Kyc,
    Selfie,
    BankDetails,
    Nach,
    Agreement,
}

/// Typed answers collected during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_to_credit_check: Option<bool>,
}

/// Persisted session state, embedded in the user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey: Option<Journey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    #[serde(default)]
    pub answers: Answers,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            schema_version: SESSION_SCHEMA_VERSION,
            language: None,
            journey: None,
            step: None,
            answers: Answers::default(),
        }
    }
}

impl SessionState {
    /// The active data-collection field, if the cursor is on one.
    pub fn current_field(&self) -> Option<OnboardingField> {
        match self.step {
            Some(Step::Field(field)) => Some(field),
            _ => None,
        }
    }

    /// Advance the field cursor.
    ///
    /// No cursor set → the first field. On the last field → the cursor is
    /// cleared, signalling sequence completion. Checkpoint steps are not part
    /// of the field sequence and also clear the cursor.
    pub fn advance_field(&mut self) -> Option<OnboardingField> {
        let next = match self.step {
            None => Some(OnboardingField::first()),
            Some(Step::Field(field)) => field.next(),
            Some(_) => None,
        };
        self.step = next.map(Step::Field);
        next
    }

    /// Clear the cursor and all collected answers.
    pub fn reset(&mut self, keep_language: bool) {
        if !keep_language {
            self.language = None;
        }
        self.journey = None;
        self.step = None;
        self.answers = Answers::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn advance_from_empty_starts_at_first_field() {
        let mut session = SessionState::default();
        assert_eq!(session.current_field(), None);
        assert_eq!(session.advance_field(), Some(OnboardingField::FullName));
        assert_eq!(session.current_field(), Some(OnboardingField::FullName));
    }

    #[test]
    fn advance_visits_every_field_once_then_clears() {
        let mut session = SessionState::default();
        let mut visited = Vec::new();
        while let Some(field) = session.advance_field() {
            visited.push(field);
        }
        assert_eq!(visited, OnboardingField::ALL);
        assert_eq!(session.step, None);
    }

    #[test]
    fn advance_from_checkpoint_clears_cursor() {
        let mut session = SessionState {
            step: Some(Step::Kyc),
            ..Default::default()
        };
        assert_eq!(session.advance_field(), None);
        assert_eq!(session.step, None);
    }

    #[test]
    fn reset_clears_answers_and_journey() {
        let mut session = SessionState {
            language: Some(Language::Hi),
            journey: Some(Journey::Onboarding),
            step: Some(Step::Field(OnboardingField::Purpose)),
            ..Default::default()
        };
        session.answers.full_name = Some("Asha Rao".into());

        session.reset(true);
        assert_eq!(session.language, Some(Language::Hi));
        assert_eq!(session.journey, None);
        assert_eq!(session.step, None);
        assert_eq!(session.answers, Answers::default());

        session.language = Some(Language::Hi);
        session.reset(false);
        assert_eq!(session.language, None);
    }

    #[test]
    fn serde_roundtrip_preserves_cursor_and_answers() {
        let mut session = SessionState {
            language: Some(Language::En),
            journey: Some(Journey::Onboarding),
            step: Some(Step::Field(OnboardingField::MonthlyIncome)),
            ..Default::default()
        };
        session.answers.full_name = Some("Asha Rao".into());
        session.answers.date_of_birth = NaiveDate::from_ymd_opt(1995, 12, 31);
        session.answers.age = Some(28);
        session.answers.employment_status = Some("Salaried".into());
        session.answers.monthly_income = Some(dec!(45000));

        let json = serde_json::to_string(&session).unwrap();
        let parsed: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn checkpoint_steps_roundtrip() {
        for step in [
            Step::AwaitingOfferSelection,
            Step::Kyc,
            Step::Selfie,
            Step::BankDetails,
            Step::Nach,
            Step::Agreement,
        ] {
            let json = serde_json::to_string(&step).unwrap();
            let parsed: Step = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, step);
        }
    }

    #[test]
    fn missing_schema_version_defaults_to_current() {
        let parsed: SessionState = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.schema_version, SESSION_SCHEMA_VERSION);
        assert_eq!(parsed, SessionState::default());
    }
}
