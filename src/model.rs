//! Domain models — user profile, loan application, decision, offers,
//! loan record, and audit events.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::lang::Language;
use crate::session::{Answers, SessionState};

/// Program-wide cap on a single requested loan amount.
pub const PROGRAM_MAX_AMOUNT: Decimal = dec!(500000);

/// Eligibility ceiling applied when deriving a decision from income.
pub const PROGRAM_CEILING: Decimal = dec!(150000);

/// Post-offer checkpoint completion flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoints {
    #[serde(default)]
    pub kyc: bool,
    #[serde(default)]
    pub selfie: bool,
    #[serde(default)]
    pub bank: bool,
    #[serde(default)]
    pub nach: bool,
    #[serde(default)]
    pub agreement: bool,
}

/// Captured payment-instrument details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub ifsc: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisbursementStatus {
    Disbursed,
    Rejected,
}

/// Outcome of the final checks, recorded on the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disbursement {
    pub status: DisbursementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Record of the most recent agent handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub question: String,
    pub queue: String,
    pub at: DateTime<Utc>,
}

/// One user, keyed by phone number. The identifier is immutable and
/// globally unique; the profile is created on first contact and mutated on
/// every state-changing step, never deleted by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default)]
    pub is_existing: bool,
    pub status: String,
    pub stage: String,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub session: SessionState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offers: Vec<Offer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_offer: Option<Offer>,
    #[serde(default)]
    pub checkpoints: Checkpoints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disbursement: Option<Disbursement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_application: Option<LoanApplication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_escalation: Option<Escalation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token; bumped by the profile store on every
    /// successful save. A save against a stale version is rejected.
    #[serde(default)]
    pub version: u64,
}

impl UserProfile {
    pub fn new(phone: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            phone: phone.into(),
            language: None,
            is_existing: false,
            status: "prospect".to_string(),
            stage: "discovery".to_string(),
            last_activity: now,
            session: SessionState::default(),
            offers: Vec::new(),
            chosen_offer: None,
            checkpoints: Checkpoints::default(),
            bank_details: None,
            disbursement: None,
            last_application: None,
            last_escalation: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Record activity on the profile.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.last_activity = now;
        self.updated_at = now;
    }

    /// Find a pending offer by identifier.
    pub fn find_offer(&self, offer_id: &str) -> Option<&Offer> {
        self.offers.iter().find(|o| o.offer_id == offer_id)
    }
}

/// A validated, immutable snapshot of the applicant's facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub application_id: Uuid,
    pub customer_phone: String,
    pub full_name: String,
    pub age: u8,
    pub employment_status: String,
    pub monthly_income: Decimal,
    pub requested_amount: Decimal,
    pub purpose: String,
    pub consent_to_credit_check: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl LoanApplication {
    /// Build a validated application. The requested amount is capped at
    /// [`PROGRAM_MAX_AMOUNT`] rather than rejected.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        customer_phone: impl Into<String>,
        full_name: impl Into<String>,
        age: u8,
        employment_status: &str,
        monthly_income: Decimal,
        requested_amount: Decimal,
        purpose: &str,
        consent_to_credit_check: bool,
        date_of_birth: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        let full_name = full_name.into();
        if full_name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !(18..=75).contains(&age) {
            return Err(ValidationError::AgeOutOfRange { age: age as i32 });
        }
        if monthly_income <= Decimal::ZERO || requested_amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidNumber);
        }
        if !consent_to_credit_check {
            return Err(ValidationError::ConsentRequired);
        }
        Ok(Self {
            application_id: Uuid::new_v4(),
            customer_phone: customer_phone.into(),
            full_name: full_name.trim().to_string(),
            age,
            employment_status: crate::validate::title_case(employment_status),
            monthly_income,
            requested_amount: requested_amount.min(PROGRAM_MAX_AMOUNT),
            purpose: crate::validate::capitalize(purpose),
            consent_to_credit_check,
            date_of_birth,
        })
    }

    /// Build from the session's collected answers, substituting defaults for
    /// any optional field that was not captured. `requested` overrides the
    /// derived default amount (used at disbursement time with the chosen
    /// offer's principal).
    pub fn from_answers(
        customer_phone: &str,
        answers: &Answers,
        requested: Option<Decimal>,
    ) -> Result<Self, ValidationError> {
        let full_name = answers
            .full_name
            .clone()
            .ok_or(ValidationError::EmptyName)?;
        let monthly_income = answers.monthly_income.unwrap_or(dec!(20000));
        let requested_amount = requested.unwrap_or_else(|| monthly_income * dec!(2));
        Self::new(
            customer_phone,
            full_name,
            answers.age.unwrap_or(30),
            answers.employment_status.as_deref().unwrap_or("Other"),
            monthly_income,
            requested_amount,
            answers.purpose.as_deref().unwrap_or("Personal"),
            answers.consent_to_credit_check.unwrap_or(true),
            answers.date_of_birth,
        )
    }

    /// Whether two applications agree on all applicant facts. The
    /// disbursement-time rebuild must agree with the onboarding-time snapshot
    /// on everything except the requested amount.
    pub fn is_consistent_with(&self, other: &Self) -> bool {
        self.full_name == other.full_name
            && self.age == other.age
            && self.employment_status == other.employment_status
            && self.monthly_income == other.monthly_income
            && self.purpose == other.purpose
    }
}

/// Outcome of evaluating a [`LoanApplication`]. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub approved: bool,
    pub reference_id: String,
    pub offer_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apr: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_term_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One concrete principal/tenor/rate alternative derived from an approved
/// decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: String,
    pub amount: Decimal,
    pub tenure_months: u32,
    pub apr: Decimal,
    pub roi: Decimal,
    pub processing_fee: Decimal,
    pub monthly_emi: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Approved,
    Declined,
}

/// Durable record of a user's latest decision plus application facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub phone: String,
    pub reference_id: String,
    pub status: LoanStatus,
    pub offer_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apr: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_term_months: Option<u32>,
    pub purpose: String,
    pub requested_amount: Decimal,
    pub monthly_income: Decimal,
    pub employment_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_emi_due: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_url: Option<String>,
    /// Accumulated repayment-schedule entries, carried forward on update.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emi_schedule: Vec<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanRecord {
    /// Build the record for an upsert, carrying forward the prior record's
    /// creation time and repayment schedule.
    pub fn from_decision(
        phone: &str,
        decision: &Decision,
        application: &LoanApplication,
        existing: Option<&LoanRecord>,
    ) -> Self {
        let now = Utc::now();
        Self {
            phone: phone.to_string(),
            reference_id: decision.reference_id.clone(),
            status: if decision.approved {
                LoanStatus::Approved
            } else {
                LoanStatus::Declined
            },
            offer_amount: decision.offer_amount,
            apr: decision.apr,
            max_term_months: decision.max_term_months,
            purpose: application.purpose.clone(),
            requested_amount: application.requested_amount,
            monthly_income: application.monthly_income,
            employment_status: application.employment_status.clone(),
            reason: if decision.approved {
                None
            } else {
                decision.reason.clone()
            },
            next_emi_due: decision
                .approved
                .then(|| application.monthly_income * dec!(0.4)),
            documents_url: existing.and_then(|r| r.documents_url.clone()),
            emi_schedule: existing.map(|r| r.emi_schedule.clone()).unwrap_or_default(),
            created_at: existing.map(|r| r.created_at).unwrap_or(now),
            updated_at: now,
        }
    }
}

/// Direction of an audited interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
    System,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
            Self::System => "system",
        };
        write!(f, "{s}")
    }
}

/// An immutable audit entry. Never mutated or deleted by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: Uuid,
    pub phone: String,
    pub direction: Direction,
    pub category: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(
        phone: &str,
        direction: Direction,
        category: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            direction,
            category: category.to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers() -> Answers {
        Answers {
            full_name: Some("Asha Rao".into()),
            date_of_birth: NaiveDate::from_ymd_opt(1995, 12, 31),
            age: Some(28),
            employment_status: Some("Salaried".into()),
            monthly_income: Some(dec!(45000)),
            purpose: Some("Education".into()),
            consent_to_credit_check: Some(true),
        }
    }

    #[test]
    fn application_from_answers_uses_collected_values() {
        let app = LoanApplication::from_answers("919000000001", &answers(), None).unwrap();
        assert_eq!(app.full_name, "Asha Rao");
        assert_eq!(app.age, 28);
        assert_eq!(app.employment_status, "Salaried");
        assert_eq!(app.monthly_income, dec!(45000));
        assert_eq!(app.requested_amount, dec!(90000));
        assert_eq!(app.purpose, "Education");
        assert!(app.consent_to_credit_check);
    }

    #[test]
    fn application_defaults_for_absent_optionals() {
        let sparse = Answers {
            full_name: Some("Asha Rao".into()),
            ..Default::default()
        };
        let app = LoanApplication::from_answers("919000000001", &sparse, None).unwrap();
        assert_eq!(app.age, 30);
        assert_eq!(app.employment_status, "Other");
        assert_eq!(app.monthly_income, dec!(20000));
        assert_eq!(app.requested_amount, dec!(40000));
        assert_eq!(app.purpose, "Personal");
    }

    #[test]
    fn application_requires_a_name() {
        let no_name = Answers::default();
        assert_eq!(
            LoanApplication::from_answers("919000000001", &no_name, None),
            Err(ValidationError::EmptyName)
        );
    }

    #[test]
    fn application_caps_requested_amount() {
        let app =
            LoanApplication::from_answers("919000000001", &answers(), Some(dec!(900000))).unwrap();
        assert_eq!(app.requested_amount, PROGRAM_MAX_AMOUNT);
    }

    #[test]
    fn application_normalizes_employment_and_purpose() {
        let app = LoanApplication::new(
            "919000000001",
            "Asha Rao",
            28,
            "self-employed",
            dec!(45000),
            dec!(90000),
            "home renovation",
            true,
            None,
        )
        .unwrap();
        assert_eq!(app.employment_status, "Self-Employed");
        assert_eq!(app.purpose, "Home renovation");
    }

    #[test]
    fn rebuilt_application_is_consistent_when_answers_unchanged() {
        let first = LoanApplication::from_answers("919000000001", &answers(), None).unwrap();
        let second =
            LoanApplication::from_answers("919000000001", &answers(), Some(dec!(103500))).unwrap();
        assert!(second.is_consistent_with(&first));

        let mut drifted = answers();
        drifted.monthly_income = Some(dec!(99000));
        let third = LoanApplication::from_answers("919000000001", &drifted, None).unwrap();
        assert!(!third.is_consistent_with(&first));
    }

    #[test]
    fn loan_record_carries_forward_history_on_update() {
        let app = LoanApplication::from_answers("919000000001", &answers(), None).unwrap();
        let decision = Decision {
            approved: true,
            reference_id: "REF-A1B2C3D4".into(),
            offer_amount: dec!(150000),
            apr: Some(dec!(18.0)),
            max_term_months: Some(12),
            reason: None,
        };
        let first = LoanRecord::from_decision("919000000001", &decision, &app, None);
        assert_eq!(first.status, LoanStatus::Approved);
        assert_eq!(first.next_emi_due, Some(dec!(18000)));

        let mut prior = first.clone();
        prior.emi_schedule = vec![serde_json::json!({"month": 1, "paid": true})];
        let updated = LoanRecord::from_decision("919000000001", &decision, &app, Some(&prior));
        assert_eq!(updated.created_at, prior.created_at);
        assert_eq!(updated.emi_schedule, prior.emi_schedule);
    }

    #[test]
    fn declined_record_keeps_reason_and_no_emi() {
        let app = LoanApplication::from_answers("919000000001", &answers(), None).unwrap();
        let decision = Decision {
            approved: false,
            reference_id: "REF-00000000".into(),
            offer_amount: Decimal::ZERO,
            apr: None,
            max_term_months: None,
            reason: Some("Income below minimum threshold".into()),
        };
        let record = LoanRecord::from_decision("919000000001", &decision, &app, None);
        assert_eq!(record.status, LoanStatus::Declined);
        assert_eq!(record.reason.as_deref(), Some("Income below minimum threshold"));
        assert_eq!(record.next_emi_due, None);
    }

    #[test]
    fn profile_serde_roundtrip() {
        let mut profile = UserProfile::new("919000000001");
        profile.language = Some(Language::Hi);
        profile.session.language = Some(Language::Hi);
        profile.session.journey = Some(crate::session::Journey::Onboarding);
        profile.session.step = Some(crate::session::Step::BankDetails);
        profile.checkpoints.kyc = true;
        profile.bank_details = Some(BankDetails {
            ifsc: "HDFC0001234".into(),
            account_number: "50100012345678".into(),
        });
        profile.version = 4;

        let json = serde_json::to_string(&profile).unwrap();
        let parsed: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }
}
