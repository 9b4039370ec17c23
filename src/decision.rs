//! Credit decision seam.
//!
//! The evaluator is a pure, synchronous collaborator from the engine's
//! perspective. The bundled [`LocalPolicy`] is a deterministic placeholder
//! that preserves the decision contract's shape (approved flag, ceiling,
//! terms, reference id) for local runs and tests; a real decision backend
//! plugs in behind the same trait.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::error::DecisionError;
use crate::model::{Decision, LoanApplication, PROGRAM_CEILING};

/// Evaluates a loan application into a decision.
pub trait DecisionEvaluator: Send + Sync {
    fn evaluate(&self, application: &LoanApplication) -> Result<Decision, DecisionError>;
}

/// Generate a unique decision reference.
pub fn new_reference_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("REF-{}", hex[..8].to_uppercase())
}

/// Deterministic local policy rules.
pub struct LocalPolicy {
    min_monthly_income: Decimal,
}

impl Default for LocalPolicy {
    fn default() -> Self {
        Self {
            min_monthly_income: dec!(10000),
        }
    }
}

impl DecisionEvaluator for LocalPolicy {
    fn evaluate(&self, application: &LoanApplication) -> Result<Decision, DecisionError> {
        if application.monthly_income < self.min_monthly_income {
            return Ok(Decision {
                approved: false,
                reference_id: new_reference_id(),
                offer_amount: Decimal::ZERO,
                apr: None,
                max_term_months: None,
                reason: Some("Income below minimum threshold".to_string()),
            });
        }
        let ceiling = (application.monthly_income * dec!(10)).min(PROGRAM_CEILING);
        Ok(Decision {
            approved: true,
            reference_id: new_reference_id(),
            offer_amount: ceiling,
            apr: Some(dec!(18.0)),
            max_term_months: Some(12),
            reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Answers;

    fn application(income: Decimal) -> LoanApplication {
        let answers = Answers {
            full_name: Some("Asha Rao".into()),
            monthly_income: Some(income),
            ..Default::default()
        };
        LoanApplication::from_answers("919000000001", &answers, None).unwrap()
    }

    #[test]
    fn approves_with_income_derived_ceiling() {
        let decision = LocalPolicy::default()
            .evaluate(&application(dec!(12000)))
            .unwrap();
        assert!(decision.approved);
        assert_eq!(decision.offer_amount, dec!(120000));
        assert!(decision.reference_id.starts_with("REF-"));
    }

    #[test]
    fn ceiling_is_capped_by_the_program() {
        let decision = LocalPolicy::default()
            .evaluate(&application(dec!(90000)))
            .unwrap();
        assert_eq!(decision.offer_amount, PROGRAM_CEILING);
    }

    #[test]
    fn declines_below_minimum_income_with_reason() {
        let decision = LocalPolicy::default()
            .evaluate(&application(dec!(8000)))
            .unwrap();
        assert!(!decision.approved);
        assert!(decision.reason.is_some());
        assert_eq!(decision.offer_amount, Decimal::ZERO);
    }

    #[test]
    fn reference_ids_are_unique_per_decision() {
        let policy = LocalPolicy::default();
        let a = policy.evaluate(&application(dec!(20000))).unwrap();
        let b = policy.evaluate(&application(dec!(20000))).unwrap();
        assert_ne!(a.reference_id, b.reference_id);
    }
}
