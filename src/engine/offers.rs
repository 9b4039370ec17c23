//! Offer derivation and the disbursement orchestration.
//!
//! Offers are derived deterministically from an approved decision: three
//! tiers over a base amount of `min(monthly_income × 10, program ceiling) ×
//! 0.6`, each with its own tenor/APR/fee schedule and an amortized
//! installment.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde_json::json;

use crate::error::Error;
use crate::lang::{LanguagePack, format_inr, render};
use crate::messaging::ChoiceOption;
use crate::model::{
    Disbursement, DisbursementStatus, Direction, LoanApplication, Offer, PROGRAM_CEILING,
    UserProfile,
};
use crate::session::Step;

use super::{FlowEngine, Turn};

/// One fixed markup tier.
struct OfferTier {
    id: &'static str,
    multiplier: Decimal,
    tenure_months: u32,
    apr: Decimal,
    processing_fee: Decimal,
    roi: Decimal,
}

const OFFER_TIERS: [OfferTier; 3] = [
    OfferTier {
        id: "OFFER1",
        multiplier: dec!(1.0),
        tenure_months: 6,
        apr: dec!(18.0),
        processing_fee: dec!(3.0),
        roi: dec!(16.5),
    },
    OfferTier {
        id: "OFFER2",
        multiplier: dec!(1.15),
        tenure_months: 9,
        apr: dec!(21.0),
        processing_fee: dec!(2.5),
        roi: dec!(18.0),
    },
    OfferTier {
        id: "OFFER3",
        multiplier: dec!(1.35),
        tenure_months: 12,
        apr: dec!(24.0),
        processing_fee: dec!(2.0),
        roi: dec!(20.0),
    },
];

/// Base principal the tiers scale from.
pub fn base_amount(monthly_income: Decimal) -> Decimal {
    ((monthly_income * dec!(10)).min(PROGRAM_CEILING) * dec!(0.6)).trunc()
}

/// Amortized monthly installment, rounded up to the next rupee. A zero rate
/// divides the principal evenly over the tenor.
pub fn monthly_installment(principal: Decimal, apr: Decimal, months: u32) -> Decimal {
    let r = apr / dec!(100) / dec!(12);
    if r.is_zero() {
        return principal / Decimal::from(months);
    }
    let growth = (Decimal::ONE + r).powi(months as i64);
    (principal * r * growth / (growth - Decimal::ONE)).ceil()
}

/// Derive the presented offer set from an approved application.
pub fn derive_offers(application: &LoanApplication) -> Vec<Offer> {
    let base = base_amount(application.monthly_income);
    OFFER_TIERS
        .iter()
        .map(|tier| {
            let amount = (base * tier.multiplier).trunc();
            Offer {
                offer_id: tier.id.to_string(),
                amount,
                tenure_months: tier.tenure_months,
                apr: tier.apr,
                roi: tier.roi,
                processing_fee: tier.processing_fee,
                monthly_emi: monthly_installment(amount, tier.apr, tier.tenure_months),
            }
        })
        .collect()
}

impl FlowEngine {
    /// Onboarding sequence exhausted: build the application, get a decision,
    /// and either stop with the rejection or present the offer set.
    pub(super) fn complete_onboarding(
        &self,
        profile: &mut UserProfile,
        pack: &'static LanguagePack,
        turn: &mut Turn,
    ) -> Result<(), Error> {
        let application = match LoanApplication::from_answers(
            &profile.phone,
            &profile.session.answers,
            None,
        ) {
            Ok(app) => app,
            Err(e) => {
                tracing::warn!(phone = %profile.phone, error = %e, "Could not build application");
                turn.text(pack.restart_hint);
                return Ok(());
            }
        };

        turn.text(pack.decision_submit);
        // A failed evaluation aborts the turn: no fabricated approval.
        let decision = self.decision.evaluate(&application)?;

        if !decision.approved {
            let reason = decision.reason.as_deref().unwrap_or("policy");
            turn.text(render(pack.decision_rejected, &[("reason", reason)]));
            turn.audit(
                Direction::System,
                "decision_rejected",
                json!({"reference_id": decision.reference_id, "reason": reason}),
            );
            profile.last_application = Some(application);
            return Ok(());
        }

        profile.offers = derive_offers(&application);
        profile.chosen_offer = None;
        profile.last_application = Some(application);
        profile.stage = "awaiting_offer_selection".to_string();
        profile.session.step = Some(Step::AwaitingOfferSelection);
        self.present_offers(profile, pack, turn);
        Ok(())
    }

    /// Present the stored offer set in a single message with one selection
    /// control per offer.
    pub(super) fn present_offers(
        &self,
        profile: &UserProfile,
        pack: &'static LanguagePack,
        turn: &mut Turn,
    ) {
        let mut lines = vec![pack.decision_approved_intro.to_string(), String::new()];
        let mut buttons = Vec::new();
        for (idx, offer) in profile.offers.iter().enumerate() {
            let n = idx + 1;
            lines.push(format!(
                "⭐ *Offer {n}*\n\
                 • Amount: ₹{}\n\
                 • Tenure: {} months\n\
                 • APR: {:.2}%\n\
                 • ROI: {:.2}%\n\
                 • Processing fee: {:.2}%\n\
                 • EMI: ₹{}\n",
                format_inr(offer.amount),
                offer.tenure_months,
                offer.apr,
                offer.roi,
                offer.processing_fee,
                format_inr(offer.monthly_emi),
            ));
            buttons.push(ChoiceOption::new(
                format!("offer_select_{}", offer.offer_id),
                format!("{} {n}", pack.offer_button_accept),
            ));
        }
        turn.choice(lines.join("\n").trim().to_string(), buttons);
        turn.text(pack.offers_prompt);
    }

    /// Bank details captured: re-run the decision with the chosen amount and
    /// either disburse or push back.
    pub(super) async fn run_final_checks_and_disburse(
        &self,
        profile: &mut UserProfile,
        pack: &'static LanguagePack,
        turn: &mut Turn,
    ) -> Result<(), Error> {
        let chosen = profile.chosen_offer.clone();
        let requested = chosen.as_ref().map(|offer| offer.amount);
        let application = match LoanApplication::from_answers(
            &profile.phone,
            &profile.session.answers,
            requested,
        ) {
            Ok(app) => app,
            Err(e) => {
                tracing::warn!(phone = %profile.phone, error = %e, "Could not rebuild application");
                turn.text(pack.restart_hint);
                return Ok(());
            }
        };

        if let Some(previous) = &profile.last_application {
            if !application.is_consistent_with(previous) {
                tracing::warn!(
                    phone = %profile.phone,
                    "Disbursement-time application disagrees with onboarding-time facts"
                );
                turn.audit(
                    Direction::System,
                    "inconsistent_application",
                    json!({
                        "onboarding_application_id": previous.application_id,
                        "disbursement_application_id": application.application_id,
                    }),
                );
            }
        }

        let decision = self.decision.evaluate(&application)?;

        if !decision.approved {
            let reason = decision.reason.as_deref().unwrap_or("internal policy");
            turn.text(render(pack.final_reject, &[("reason", reason)]));
            profile.disbursement = Some(Disbursement {
                status: DisbursementStatus::Rejected,
                amount: None,
                reference: Some(decision.reference_id.clone()),
            });
            turn.audit(Direction::System, "final_reject", json!({"reason": reason}));
            return Ok(());
        }

        let disbursed_amount = match &chosen {
            Some(offer) => {
                if offer.amount > decision.offer_amount {
                    // The selection no longer fits the fresh ceiling: ask for
                    // a different offer, leave the step at bank details.
                    turn.text(pack.over_ceiling);
                    self.present_offers(profile, pack, turn);
                    return Ok(());
                }
                offer.amount
            }
            None => decision.offer_amount,
        };

        // The loan record is the durable fact; failing to write it means the
        // disbursement did not happen and the step must not advance.
        self.loans
            .upsert(&profile.phone, &decision, &application)
            .await?;

        profile.disbursement = Some(Disbursement {
            status: DisbursementStatus::Disbursed,
            amount: Some(disbursed_amount),
            reference: Some(decision.reference_id.clone()),
        });
        profile.last_application = Some(application);
        profile.stage = "disbursed".to_string();

        turn.text(render(
            pack.final_approval,
            &[
                ("amount", &format_inr(disbursed_amount)),
                ("ref", &decision.reference_id),
            ],
        ));
        turn.audit(
            Direction::Outbound,
            "disbursed",
            json!({
                "amount": disbursed_amount.to_string(),
                "reference": decision.reference_id,
            }),
        );

        turn.choice(
            pack.nach_prompt.to_string(),
            vec![ChoiceOption::new("nach_complete", pack.nach_button)],
        );
        profile.session.step = Some(Step::Nach);
        Ok(())
    }
}
