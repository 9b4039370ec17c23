//! Support routing — keyword shortcuts, grounded answers, knowledge base,
//! and escalation.

use serde_json::json;

use crate::error::Error;
use crate::lang::{Language, LanguagePack, render};
use crate::messaging::ChoiceOption;
use crate::model::{Direction, UserProfile};

use super::{FlowEngine, Turn};

struct KbEntry {
    question: &'static str,
    answer: &'static str,
}

/// Small static knowledge base scanned by literal substring match.
const SUPPORT_KB: [KbEntry; 2] = [
    KbEntry {
        question: "How can I pay my EMI?",
        answer: "You can pay via the Lumo app, netbanking or UPI. Reply PAY LINK for a payment link.",
    },
    KbEntry {
        question: "How do I check my loan status?",
        answer: "Open the Lumo app > My Loans, or ask me to show loan details.",
    },
];

impl FlowEngine {
    /// Route a support-journey message: shortcuts first, then the optional
    /// generative responder, then the knowledge base, then escalation.
    pub(super) async fn handle_support_text(
        &self,
        profile: &UserProfile,
        pack: &'static LanguagePack,
        language: Language,
        raw_text: &str,
        turn: &mut Turn,
    ) -> Result<(), Error> {
        let normalized = raw_text.trim().to_lowercase();

        if normalized == pack.download_app.to_lowercase() || normalized == "download app" {
            turn.text(render(
                pack.download_app_answer,
                &[("url", &self.config.app_download_url)],
            ));
            return Ok(());
        }
        if normalized == pack.send_email.to_lowercase() || normalized == "send email" {
            turn.text(render(
                pack.send_email_answer,
                &[("email", &self.config.support_email)],
            ));
            return Ok(());
        }

        let context = self.loan_context(profile).await;

        if let Some(responder) = &self.responder {
            match responder.answer(raw_text, language, &context).await {
                Ok(Some(answer)) => {
                    turn.text(answer);
                    turn.choice(
                        pack.support_closing.to_string(),
                        vec![ChoiceOption::new("connect_agent", pack.connect_agent)],
                    );
                    turn.audit(
                        Direction::Outbound,
                        "support_answer",
                        json!({"source": "responder", "question": raw_text}),
                    );
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => {
                    // Degrade to the knowledge base without surfacing.
                    tracing::warn!(phone = %profile.phone, error = %e, "Support responder failed");
                }
            }
        }

        for entry in &SUPPORT_KB {
            if normalized.contains(&entry.question.to_lowercase()) {
                turn.text(entry.answer);
                turn.choice(
                    pack.support_closing.to_string(),
                    vec![ChoiceOption::new("connect_agent", pack.connect_agent)],
                );
                turn.audit(
                    Direction::Outbound,
                    "support_answer",
                    json!({"source": "kb", "question": raw_text}),
                );
                return Ok(());
            }
        }

        turn.text(pack.support_no_match);
        turn.choice(
            pack.support_closing.to_string(),
            vec![
                ChoiceOption::new("connect_agent", pack.connect_agent),
                ChoiceOption::new("send_email", pack.send_email),
            ],
        );
        turn.audit(
            Direction::System,
            "support_escalation",
            json!({"reason": "no_match", "question": raw_text}),
        );
        Ok(())
    }

    /// Grounding context for the responder: the loan record if present,
    /// falling back to the profile's disbursement state.
    async fn loan_context(&self, profile: &UserProfile) -> String {
        match self.loans.get(&profile.phone).await {
            Ok(Some(record)) => serde_json::to_string(&record).unwrap_or_default(),
            Ok(None) => profile
                .disbursement
                .as_ref()
                .and_then(|d| serde_json::to_string(d).ok())
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!(phone = %profile.phone, error = %e, "Loan context lookup failed");
                String::new()
            }
        }
    }
}
