//! Session/flow engine — the conversational state machine.
//!
//! Consumes one classified inbound event plus the persisted profile and
//! produces outbound message intents, audit entries, and a mutated profile.
//! The engine's caller persists the profile first (optimistic version
//! check), then dispatches intents and audits — so a retried or concurrent
//! delivery always observes post-transition state and a re-applied event
//! never double-sends.

pub mod offers;
mod support;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::decision::DecisionEvaluator;
use crate::error::{Result, StoreError, ValidationError};
use crate::inbound::{ButtonAction, InboundEvent, Intent, detect_intent, is_support_keyword};
use crate::lang::{self, Language, LanguagePack, format_inr, render};
use crate::messaging::{self, ChoiceOption, Messenger, OutboundIntent};
use crate::model::{Direction, Escalation, UserProfile};
use crate::responder::SupportResponder;
use crate::session::{Journey, OnboardingField, Step};
use crate::stores::{AuditStore, LoanStore, ProfileStore};
use crate::validate;

/// How often one event is re-applied after a stale-write rejection before
/// giving up.
const MAX_SAVE_ATTEMPTS: usize = 3;

/// Engine-level settings (links and labels handed out in replies).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_language: Language,
    pub handoff_queue: String,
    pub app_download_url: String,
    pub support_email: String,
    pub agreement_url: String,
    pub statement_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_language: Language::En,
            handoff_queue: "lumo-finance-support".to_string(),
            app_download_url: "https://lumo.finance/app".to_string(),
            support_email: "care@lumo.finance".to_string(),
            agreement_url: "https://lumo.finance/docs/agreement.pdf".to_string(),
            statement_url: "https://lumo.finance/docs/statement.pdf".to_string(),
        }
    }
}

/// Everything one handled event wants to emit, buffered until the session
/// has been persisted.
#[derive(Debug, Default)]
pub struct Turn {
    pub intents: Vec<OutboundIntent>,
    pub audits: Vec<(Direction, String, serde_json::Value)>,
}

impl Turn {
    pub fn text(&mut self, body: impl Into<String>) {
        self.intents.push(OutboundIntent::Text { body: body.into() });
    }

    pub fn choice(&mut self, body: impl Into<String>, options: Vec<ChoiceOption>) {
        self.intents.push(OutboundIntent::Choice {
            body: body.into(),
            options,
        });
    }

    pub fn document(&mut self, link: impl Into<String>, filename: impl Into<String>) {
        self.intents.push(OutboundIntent::Document {
            link: link.into(),
            filename: filename.into(),
        });
    }

    pub fn audit(&mut self, direction: Direction, category: &str, payload: serde_json::Value) {
        self.audits.push((direction, category.to_string(), payload));
    }
}

/// The state machine proper, with its collaborators injected.
pub struct FlowEngine {
    profiles: Arc<dyn ProfileStore>,
    loans: Arc<dyn LoanStore>,
    audit: Arc<dyn AuditStore>,
    messenger: Arc<dyn Messenger>,
    decision: Arc<dyn DecisionEvaluator>,
    responder: Option<Arc<dyn SupportResponder>>,
    config: EngineConfig,
}

impl FlowEngine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        loans: Arc<dyn LoanStore>,
        audit: Arc<dyn AuditStore>,
        messenger: Arc<dyn Messenger>,
        decision: Arc<dyn DecisionEvaluator>,
        responder: Option<Arc<dyn SupportResponder>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            profiles,
            loans,
            audit,
            messenger,
            decision,
            responder,
            config,
        }
    }

    /// Handle one inbound event end to end: load the profile, apply the
    /// transition, persist with the version guard, then dispatch the
    /// buffered sends and audits.
    pub async fn handle_event(&self, event: &InboundEvent) -> Result<()> {
        if event.user_id.is_empty() {
            return Ok(());
        }
        self.record_inbound(event).await;

        let mut attempt = 0;
        loop {
            let mut profile = self
                .profiles
                .get(&event.user_id)
                .await?
                .unwrap_or_else(|| UserProfile::new(&event.user_id));
            profile.touch();

            let mut turn = Turn::default();
            self.apply(&mut profile, event, &mut turn).await?;

            match self.profiles.save(&mut profile).await {
                Ok(()) => {
                    self.flush(&event.user_id, turn).await;
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) if attempt + 1 < MAX_SAVE_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(
                        user_id = %event.user_id,
                        attempt,
                        "Session changed underneath this event; re-applying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn record_inbound(&self, event: &InboundEvent) {
        let payload = json!({
            "message_id": event.message_id,
            "text": event.text,
            "reply_id": event.reply_id,
            "has_image": event.has_image,
            "has_document": event.has_document,
        });
        if let Err(e) = self
            .audit
            .append(&event.user_id, Direction::Inbound, "message", payload)
            .await
        {
            tracing::warn!(user_id = %event.user_id, error = %e, "Failed to record inbound interaction");
        }
    }

    /// Audit writes are best-effort; send failures are logged by the
    /// dispatcher. Neither stalls the conversation.
    async fn flush(&self, user_id: &str, turn: Turn) {
        for (direction, category, payload) in turn.audits {
            if let Err(e) = self.audit.append(user_id, direction, &category, payload).await {
                tracing::warn!(user_id, category, error = %e, "Failed to record interaction");
            }
        }
        messaging::dispatch(self.messenger.as_ref(), user_id, &turn.intents).await;
    }

    /// Transition rules, first match wins.
    async fn apply(
        &self,
        profile: &mut UserProfile,
        event: &InboundEvent,
        turn: &mut Turn,
    ) -> Result<()> {
        let normalized = event.normalized_text();
        let action = event.action();

        // 1. Explicit language change: clear language, journey, and answers.
        if normalized.as_deref() == Some("language") {
            profile.session.reset(false);
            self.prompt_language(turn);
            return Ok(());
        }

        // 2. Language selection (button or numeric shorthand).
        let selected = match (&action, normalized.as_deref()) {
            (Some(ButtonAction::LangEn), _) | (_, Some("1")) => Some(Language::En),
            (Some(ButtonAction::LangHi), _) | (_, Some("2")) => Some(Language::Hi),
            _ => None,
        };
        if let Some(language) = selected {
            profile.session.language = Some(language);
            profile.language = Some(language);
            self.main_menu(lang::pack(Some(language)), turn);
            return Ok(());
        }

        // 3. No language yet: adopt the stored or default one and prompt.
        if profile.session.language.is_none() {
            let language = profile.language.unwrap_or(self.config.default_language);
            profile.session.language = Some(language);
            turn.text(lang::pack(Some(language)).welcome);
            self.prompt_language(turn);
            return Ok(());
        }

        let language = profile.session.language.unwrap_or(self.config.default_language);
        let pack = lang::pack(Some(language));

        // 4. Support triggers, reachable from any journey.
        if matches!(action, Some(ButtonAction::Support))
            || normalized.as_deref().is_some_and(is_support_keyword)
        {
            profile.session.journey = Some(Journey::Support);
            profile.session.step = None;
            let body = if profile.is_existing {
                pack.support_prompt_existing
            } else {
                pack.support_prompt_new
            };
            turn.choice(
                body,
                vec![
                    ChoiceOption::new("download_app", pack.download_app),
                    ChoiceOption::new("send_email", pack.send_email),
                    ChoiceOption::new("connect_agent", pack.connect_agent),
                ],
            );
            return Ok(());
        }
        if matches!(
            action,
            Some(ButtonAction::ConnectAgent) | Some(ButtonAction::PostSupport)
        ) {
            self.escalate(profile, pack, "Agent connection requested", turn);
            return Ok(());
        }

        // 5. Start the application.
        let wants_loan = matches!(action, Some(ButtonAction::GetLoan))
            || (profile.session.journey.is_none()
                && normalized
                    .as_deref()
                    .and_then(detect_intent)
                    == Some(Intent::Apply));
        if wants_loan {
            profile.session.journey = Some(Journey::Onboarding);
            profile.session.step = Some(Step::Field(OnboardingField::first()));
            profile.stage = "onboarding".to_string();
            turn.text(pack.ask_name);
            return Ok(());
        }

        // 6. Onboarding journey.
        if profile.session.journey == Some(Journey::Onboarding) {
            return self
                .handle_onboarding(profile, pack, event, &action, turn)
                .await;
        }

        // 7. Support journey free text (button labels arrive as text too).
        if profile.session.journey == Some(Journey::Support) {
            if let Some(raw) = event.text.as_deref() {
                return self
                    .handle_support_text(profile, pack, language, raw, turn)
                    .await;
            }
        }

        // 8. Post-completion menu actions.
        match &action {
            Some(ButtonAction::PostView) => {
                let record = match self.loans.get(&profile.phone).await {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!(phone = %profile.phone, error = %e, "Loan lookup failed");
                        None
                    }
                };
                let details = record
                    .and_then(|r| serde_json::to_string_pretty(&r).ok())
                    .unwrap_or_else(|| "{}".to_string());
                turn.text(format!("{}\n{details}", pack.loan_details_intro));
                return Ok(());
            }
            Some(ButtonAction::PostDownload) => {
                turn.document(self.config.statement_url.clone(), "Loan_Details.pdf");
                return Ok(());
            }
            Some(ButtonAction::PostRepay) => {
                turn.text(pack.repay_answer);
                return Ok(());
            }
            _ => {}
        }

        // 9. Nothing matched: re-present the menu, never drop the event.
        self.main_menu(pack, turn);
        Ok(())
    }

    async fn handle_onboarding(
        &self,
        profile: &mut UserProfile,
        pack: &'static LanguagePack,
        event: &InboundEvent,
        action: &Option<ButtonAction>,
        turn: &mut Turn,
    ) -> Result<()> {
        // Checkpoint and offer buttons first. Each checkpoint button only
        // acts while its checkpoint is the active step, so a duplicated or
        // late delivery cannot advance the flow twice.
        match action {
            Some(ButtonAction::KycComplete) if profile.session.step == Some(Step::Kyc) => {
                profile.checkpoints.kyc = true;
                turn.text(pack.kyc_completed);
                profile.session.step = Some(Step::Selfie);
                turn.text(pack.ask_selfie);
                return Ok(());
            }
            Some(ButtonAction::NachComplete) if profile.session.step == Some(Step::Nach) => {
                profile.checkpoints.nach = true;
                turn.text(pack.nach_done);
                profile.session.step = Some(Step::Agreement);
                turn.text(pack.agreement_prompt);
                turn.document(self.config.agreement_url.clone(), "Loan_Agreement.pdf");
                turn.choice(
                    pack.agreement_sent,
                    vec![
                        ChoiceOption::new("agree_yes", pack.confirm_agree),
                        ChoiceOption::new("agree_no", pack.confirm_disagree),
                    ],
                );
                return Ok(());
            }
            Some(ButtonAction::AgreeYes) if profile.session.step == Some(Step::Agreement) => {
                profile.checkpoints.agreement = true;
                turn.text(pack.agreement_signed);
                profile.session.journey = Some(Journey::Completed);
                profile.session.step = None;
                profile.stage = "completed".to_string();
                profile.is_existing = true;
                self.post_loan_menu(pack, turn);
                return Ok(());
            }
            Some(ButtonAction::AgreeNo) if profile.session.step == Some(Step::Agreement) => {
                // Halts the flow in place: no automatic retry or reset.
                profile.checkpoints.agreement = false;
                turn.text(pack.agreement_declined);
                return Ok(());
            }
            Some(ButtonAction::OfferSelect(offer_id)) => {
                let Some(offer) = profile.find_offer(offer_id).cloned() else {
                    turn.text(pack.invalid_choice);
                    return Ok(());
                };
                profile.chosen_offer = Some(offer.clone());
                profile.stage = "kyc".to_string();
                turn.text(render(
                    pack.offer_selected,
                    &[
                        ("amount", &format_inr(offer.amount)),
                        ("tenure", &offer.tenure_months.to_string()),
                        ("apr", &offer.apr.to_string()),
                    ],
                ));
                turn.choice(
                    pack.ask_kyc,
                    vec![ChoiceOption::new("kyc_complete", pack.kyc_button)],
                );
                profile.session.step = Some(Step::Kyc);
                return Ok(());
            }
            Some(ButtonAction::OfferView(offer_id)) => {
                let Some(offer) = profile.find_offer(offer_id).cloned() else {
                    turn.text(pack.invalid_choice);
                    return Ok(());
                };
                turn.text(render(
                    pack.offer_details,
                    &[
                        ("amount", &format_inr(offer.amount)),
                        ("tenure", &offer.tenure_months.to_string()),
                        ("apr", &offer.apr.to_string()),
                        ("fee", &offer.processing_fee.to_string()),
                        ("emi", &format_inr(offer.monthly_emi)),
                    ],
                ));
                turn.choice(
                    pack.choose_prompt,
                    vec![
                        ChoiceOption::new(
                            format!("offer_select_{}", offer.offer_id),
                            pack.offer_button_accept,
                        ),
                        ChoiceOption::new("connect_agent", pack.connect_agent),
                    ],
                );
                return Ok(());
            }
            _ => {}
        }

        // Biometric checkpoint completes on an image attachment.
        if profile.session.step == Some(Step::Selfie) && event.has_image {
            profile.checkpoints.selfie = true;
            turn.text(pack.selfie_received);
            profile.session.step = Some(Step::BankDetails);
            turn.text(pack.ask_bank);
            return Ok(());
        }

        // Payment-instrument capture: two raw lines, IFSC then account.
        if profile.session.step == Some(Step::BankDetails) {
            if let Some(raw) = event.text.as_deref() {
                return match validate::parse_bank_details(raw) {
                    Ok(details) => {
                        profile.bank_details = Some(details);
                        profile.checkpoints.bank = true;
                        turn.text(pack.bank_details_received);
                        self.run_final_checks_and_disburse(profile, pack, turn).await
                    }
                    Err(_) => {
                        turn.text(pack.invalid_bank);
                        turn.text(pack.ask_bank);
                        Ok(())
                    }
                };
            }
        }

        // Journey active but no step: back to the menu.
        let Some(step) = profile.session.step else {
            self.main_menu(pack, turn);
            return Ok(());
        };

        // Enumerated-field buttons, honored only while their field is the
        // active step — a duplicated delivery cannot skip a field.
        match action {
            Some(ButtonAction::Employment(index))
                if step == Step::Field(OnboardingField::Employment) =>
            {
                let selected = validate::pick_option(&pack.employment_options, *index);
                profile.session.answers.employment_status = Some(selected.to_string());
                return self.advance_or_complete(profile, pack, turn);
            }
            Some(ButtonAction::Purpose(index))
                if step == Step::Field(OnboardingField::Purpose) =>
            {
                let selected = validate::pick_option(&pack.purpose_options, *index);
                profile.session.answers.purpose = Some(selected.to_string());
                return self.advance_or_complete(profile, pack, turn);
            }
            Some(ButtonAction::ConsentYes) if step == Step::Field(OnboardingField::Consent) => {
                profile.session.answers.consent_to_credit_check = Some(true);
                return self.advance_or_complete(profile, pack, turn);
            }
            Some(ButtonAction::ConsentNo) if step == Step::Field(OnboardingField::Consent) => {
                turn.text(pack.consent_required);
                return Ok(());
            }
            _ => {}
        }

        if let Some(raw) = event.text.as_deref() {
            return self.handle_typed_input(profile, pack, step, raw, turn);
        }

        // Unusable payload for this step (e.g. a stray attachment):
        // re-prompt rather than dropping the event.
        self.reprompt_step(profile, pack, step, turn);
        Ok(())
    }

    /// Free text routed to the validator for the active data field. A
    /// validation failure re-prompts without advancing the cursor.
    fn handle_typed_input(
        &self,
        profile: &mut UserProfile,
        pack: &'static LanguagePack,
        step: Step,
        raw: &str,
        turn: &mut Turn,
    ) -> Result<()> {
        let field = match step {
            Step::Field(field) => field,
            checkpoint => {
                self.reprompt_step(profile, pack, checkpoint, turn);
                return Ok(());
            }
        };
        let answers = &mut profile.session.answers;
        match field {
            OnboardingField::FullName => match validate::parse_name(raw) {
                Ok(name) => {
                    answers.full_name = Some(name);
                    return self.advance_or_complete(profile, pack, turn);
                }
                Err(_) => turn.text(pack.invalid_name),
            },
            OnboardingField::DateOfBirth => {
                match validate::parse_date_of_birth(raw, Utc::now().date_naive()) {
                    Ok((dob, age)) => {
                        answers.date_of_birth = Some(dob);
                        answers.age = Some(age);
                        return self.advance_or_complete(profile, pack, turn);
                    }
                    Err(ValidationError::AgeOutOfRange { .. }) => turn.text(pack.age_out_of_range),
                    Err(_) => turn.text(pack.invalid_dob),
                }
            }
            OnboardingField::Employment => {
                answers.employment_status = Some(validate::title_case(raw));
                return self.advance_or_complete(profile, pack, turn);
            }
            OnboardingField::MonthlyIncome => match validate::parse_income(raw) {
                Ok(amount) => {
                    answers.monthly_income = Some(amount);
                    return self.advance_or_complete(profile, pack, turn);
                }
                Err(_) => turn.text(pack.invalid_number),
            },
            OnboardingField::Purpose => {
                answers.purpose = Some(validate::capitalize(raw));
                return self.advance_or_complete(profile, pack, turn);
            }
            OnboardingField::Consent => match validate::parse_consent(raw) {
                Some(true) => {
                    answers.consent_to_credit_check = Some(true);
                    return self.advance_or_complete(profile, pack, turn);
                }
                // Declined or unrecognized: consent not given, ask again.
                _ => turn.text(pack.consent_required),
            },
        }
        Ok(())
    }

    /// Advance the field cursor; an exhausted sequence triggers decisioning.
    fn advance_or_complete(
        &self,
        profile: &mut UserProfile,
        pack: &'static LanguagePack,
        turn: &mut Turn,
    ) -> Result<()> {
        match profile.session.advance_field() {
            Some(next) => {
                self.prompt_for_field(pack, next, turn);
                Ok(())
            }
            None => self.complete_onboarding(profile, pack, turn),
        }
    }

    fn prompt_for_field(&self, pack: &'static LanguagePack, field: OnboardingField, turn: &mut Turn) {
        match field {
            OnboardingField::FullName => turn.text(pack.ask_name),
            OnboardingField::DateOfBirth => turn.text(pack.ask_dob),
            OnboardingField::Employment => {
                let options = pack
                    .employment_options
                    .iter()
                    .enumerate()
                    .map(|(i, label)| ChoiceOption::new(format!("emp_{i}"), *label))
                    .collect();
                turn.choice(pack.ask_employment, options);
            }
            OnboardingField::MonthlyIncome => turn.text(pack.ask_salary),
            OnboardingField::Purpose => {
                let options: Vec<ChoiceOption> = pack
                    .purpose_options
                    .iter()
                    .enumerate()
                    .map(|(i, label)| ChoiceOption::new(format!("purpose_{i}"), *label))
                    .collect();
                turn.intents.extend(messaging::choice_intents(
                    pack.ask_purpose,
                    options,
                    pack.more_options,
                ));
            }
            OnboardingField::Consent => {
                turn.choice(
                    pack.ask_consent,
                    vec![
                        ChoiceOption::new("consent_yes", pack.consent_yes),
                        ChoiceOption::new("consent_no", pack.consent_no),
                    ],
                );
            }
        }
    }

    /// Re-issue the prompt for whichever step is active.
    fn reprompt_step(
        &self,
        profile: &UserProfile,
        pack: &'static LanguagePack,
        step: Step,
        turn: &mut Turn,
    ) {
        match step {
            Step::Field(field) => self.prompt_for_field(pack, field, turn),
            Step::AwaitingOfferSelection => self.present_offers(profile, pack, turn),
            Step::Kyc => turn.choice(
                pack.ask_kyc,
                vec![ChoiceOption::new("kyc_complete", pack.kyc_button)],
            ),
            Step::Selfie => turn.text(pack.ask_selfie),
            Step::BankDetails => turn.text(pack.ask_bank),
            Step::Nach => turn.choice(
                pack.nach_prompt,
                vec![ChoiceOption::new("nach_complete", pack.nach_button)],
            ),
            Step::Agreement => turn.choice(
                pack.agreement_sent,
                vec![
                    ChoiceOption::new("agree_yes", pack.confirm_agree),
                    ChoiceOption::new("agree_no", pack.confirm_disagree),
                ],
            ),
        }
    }

    fn escalate(
        &self,
        profile: &mut UserProfile,
        pack: &'static LanguagePack,
        question: &str,
        turn: &mut Turn,
    ) {
        turn.text(pack.support_handoff);
        profile.last_escalation = Some(Escalation {
            question: question.to_string(),
            queue: self.config.handoff_queue.clone(),
            at: Utc::now(),
        });
        turn.audit(
            Direction::System,
            "agent_handoff",
            json!({"question": question, "queue": self.config.handoff_queue}),
        );
        turn.text(pack.support_escalation_ack);
        // Escalation resolves the support journey; the menu is reachable again.
        profile.session.journey = None;
        profile.session.step = None;
    }

    fn prompt_language(&self, turn: &mut Turn) {
        let en = lang::pack(Some(Language::En));
        turn.choice(
            en.language_prompt,
            vec![
                ChoiceOption::new("lang_en", en.language_option_en),
                ChoiceOption::new("lang_hi", en.language_option_hi),
            ],
        );
    }

    fn main_menu(&self, pack: &'static LanguagePack, turn: &mut Turn) {
        turn.choice(
            pack.main_menu_intro,
            vec![
                ChoiceOption::new("intent_get_loan", pack.get_loan),
                ChoiceOption::new("intent_support", pack.support),
            ],
        );
    }

    fn post_loan_menu(&self, pack: &'static LanguagePack, turn: &mut Turn) {
        turn.choice(
            pack.post_menu_intro,
            vec![
                ChoiceOption::new("post_view", pack.post_view_details),
                ChoiceOption::new("post_download", pack.post_download_pdf),
                ChoiceOption::new("post_repay", pack.post_repay),
            ],
        );
        turn.choice(
            pack.post_need_help,
            vec![ChoiceOption::new("post_support", pack.support)],
        );
        turn.audit(Direction::Outbound, "post_loan_menu", json!({}));
    }
}
