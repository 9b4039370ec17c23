//! Language packs — bilingual (English/Hindi) user-facing copy.
//!
//! Pure lookup, no state. Templates carry `{placeholder}` markers filled by
//! [`render`]; option lists are fixed per language and addressed by index.

use serde::{Deserialize, Serialize};

/// Supported conversation languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
}

impl Default for Language {
    fn default() -> Self {
        Self::En
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::Hi => write!(f, "hi"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "hi" | "hindi" => Ok(Self::Hi),
            _ => Err(()),
        }
    }
}

/// The full set of user-facing prompt templates for one language.
pub struct LanguagePack {
    pub welcome: &'static str,
    pub language_prompt: &'static str,
    pub language_option_en: &'static str,
    pub language_option_hi: &'static str,
    pub main_menu_intro: &'static str,
    pub get_loan: &'static str,
    pub support: &'static str,
    pub support_prompt_existing: &'static str,
    pub support_prompt_new: &'static str,
    pub support_closing: &'static str,
    pub support_handoff: &'static str,
    pub support_escalation_ack: &'static str,
    pub support_no_match: &'static str,
    pub ask_name: &'static str,
    pub invalid_name: &'static str,
    pub ask_dob: &'static str,
    pub invalid_dob: &'static str,
    pub age_out_of_range: &'static str,
    pub ask_employment: &'static str,
    pub employment_options: [&'static str; 3],
    pub ask_salary: &'static str,
    pub invalid_number: &'static str,
    pub ask_purpose: &'static str,
    pub purpose_options: [&'static str; 6],
    pub more_options: &'static str,
    pub ask_consent: &'static str,
    pub consent_yes: &'static str,
    pub consent_no: &'static str,
    pub consent_required: &'static str,
    pub decision_submit: &'static str,
    pub decision_rejected: &'static str,
    pub decision_approved_intro: &'static str,
    pub offers_prompt: &'static str,
    pub offer_button_accept: &'static str,
    pub offer_selected: &'static str,
    pub offer_details: &'static str,
    pub choose_prompt: &'static str,
    pub ask_kyc: &'static str,
    pub kyc_button: &'static str,
    pub kyc_completed: &'static str,
    pub ask_selfie: &'static str,
    pub selfie_received: &'static str,
    pub ask_bank: &'static str,
    pub invalid_bank: &'static str,
    pub bank_details_received: &'static str,
    pub over_ceiling: &'static str,
    pub final_approval: &'static str,
    pub final_reject: &'static str,
    pub nach_prompt: &'static str,
    pub nach_button: &'static str,
    pub nach_done: &'static str,
    pub agreement_prompt: &'static str,
    pub agreement_sent: &'static str,
    pub agreement_signed: &'static str,
    pub agreement_declined: &'static str,
    pub confirm_agree: &'static str,
    pub confirm_disagree: &'static str,
    pub download_app: &'static str,
    pub send_email: &'static str,
    pub connect_agent: &'static str,
    pub post_menu_intro: &'static str,
    pub post_need_help: &'static str,
    pub post_view_details: &'static str,
    pub post_download_pdf: &'static str,
    pub post_repay: &'static str,
    pub loan_details_intro: &'static str,
    pub repay_answer: &'static str,
    pub download_app_answer: &'static str,
    pub send_email_answer: &'static str,
    pub invalid_choice: &'static str,
    pub restart_hint: &'static str,
}

static EN: LanguagePack = LanguagePack {
    welcome: "👋 Welcome to Lumo Finance — I am your Personal Loan assistant.",
    language_prompt: "Please choose your preferred language.",
    language_option_en: "English",
    language_option_hi: "हिंदी",
    main_menu_intro: "Get a loan up to ₹5,00,000 in under 5 minutes. Apply Now!",
    get_loan: "Get Loan",
    support: "Support",
    support_prompt_existing: "Tell me briefly how I can help or choose an option below.",
    support_prompt_new: "Tell me briefly how I can help you?",
    support_closing: "If you need further help, connect to an agent.",
    support_handoff: "Connecting you to a Lumo specialist now.",
    support_escalation_ack: "A Lumo specialist has been notified and will reach out shortly.",
    support_no_match: "I couldn't find a precise answer. Do you want to connect to a Lumo specialist?",
    ask_name: "Please share your full name (as per PAN)",
    invalid_name: "Please share a non-empty name.",
    ask_dob: "Please enter your date of birth in DD-MM-YYYY format\ne.g. 31-12-1995",
    invalid_dob: "Invalid date. Please provide in DD-MM-YYYY format\ne.g. 31-12-1995",
    age_out_of_range: "Applicant must be between 18 and 75 years old.",
    ask_employment: "Select your Employment type",
    employment_options: ["Salaried", "Self-Employed", "Others"],
    ask_salary: "What's your Monthly Income in INR\nOnly enter Numbers",
    invalid_number: "Please enter numbers only (e.g. 45000)",
    ask_purpose: "What will this loan help you with?",
    purpose_options: ["Personal", "Education", "Medical", "Home", "Travel", "Others"],
    more_options: "More options",
    ask_consent: "I authorize Lumo Finance to process my information and pull credit bureau records.",
    consent_yes: "Yes",
    consent_no: "No",
    consent_required: "Consent is required to proceed with credit evaluation.",
    decision_submit: "Processing your loan application...",
    decision_rejected: "We're sorry!\nYour profile is rejected due to {reason}. Please come back later.",
    decision_approved_intro: "🎉 You're eligible for a loan. Below are few curated offers for you",
    offers_prompt: "Select an offer to proceed or type Support for help",
    offer_button_accept: "Accept",
    offer_selected: "You selected:\n₹{amount}\n{tenure} months\nAPR {apr}%",
    offer_details: "Offer Details:\nAmount: ₹{amount}\nTenure: {tenure} months\nAPR: {apr}%\nProcessing fee: {fee}%\nEMI: ₹{emi}",
    choose_prompt: "Choose:",
    ask_kyc: "Complete KYC to proceed. Tap Complete KYC.",
    kyc_button: "Complete KYC",
    kyc_completed: "KYC is successfully completed. Moving to Selfie now.",
    ask_selfie: "Please take a selfie now using the camera and send it here.",
    selfie_received: "Looking good, smarty!",
    ask_bank: "Please provide bank details in the format:\n<IFSC>\n<account_number>",
    invalid_bank: "I need two lines: your IFSC code, then your account number.",
    bank_details_received: "Bank details received. Submitting your application.",
    over_ceiling: "Selected amount exceeds eligible amount. Please select a different offer.",
    final_approval: "✅ Loan approved!\nAmount: ₹{amount}.\nLoan ID: {ref}",
    final_reject: "We're unable to disburse the loan because: {reason}. Please contact Support.",
    nach_prompt: "Complete NACH (mandate) to enable auto-debit. Tap Complete NACH.",
    nach_button: "Complete NACH",
    nach_done: "Auto-debit successfully setup.",
    agreement_prompt: "Please review and agree to the Customer Agreement to proceed.",
    agreement_sent: "Read the Agreement carefully and tap Agree to sign and continue.",
    agreement_signed: "🎉 Congratulations! Everything's done and your amount will be credited to your account soon.",
    agreement_declined: "You did not agree to the terms. Application cannot proceed.",
    confirm_agree: "Agree",
    confirm_disagree: "Not Agree",
    download_app: "Download App",
    send_email: "Mail Us",
    connect_agent: "Connect to Agent",
    post_menu_intro: "Choose an option",
    post_need_help: "Need help?",
    post_view_details: "View Loan Details",
    post_download_pdf: "Download Loan PDF",
    post_repay: "Repay Loan",
    loan_details_intro: "Loan details:",
    repay_answer: "To repay, visit the Lumo app or reply PAY LINK to get a payment link.",
    download_app_answer: "Download the Lumo Finance app from Play Store / App Store: {url}",
    send_email_answer: "Drop us a line at {email} and we'll get back at the earliest.",
    invalid_choice: "Please choose from the available options.",
    restart_hint: "There was a problem with your details. Please restart by typing 'Get Loan'.",
};

static HI: LanguagePack = LanguagePack {
    welcome: "👋 लूमो फाइनेंस में आपका स्वागत है — आपका पर्सनल लोन असिस्टेंट।",
    language_prompt: "कृपया अपनी पसंदीदा भाषा चुनें:",
    language_option_en: "English",
    language_option_hi: "हिंदी",
    main_menu_intro: "आप 5 मिनट में ₹5,00,000 तक का लोन प्राप्त कर सकते हैं। आप क्या करना चाहेंगे?",
    get_loan: "लोन लें",
    support: "सपोर्ट",
    support_prompt_existing: "कृपया बताएं कि आपको किस प्रकार मदद चाहिए या नीचे से विकल्प चुनें।",
    support_prompt_new: "आवेदन से पहले, आप मुझसे सवाल कर सकते हैं या मदद ले सकते हैं। कैसे मदद करूँ?",
    support_closing: "यदि आपको और सहायता चाहिए तो एजेंट से कनेक्ट करें।",
    support_handoff: "मैं आपको लूमो विशेषज्ञ से जोड़ रहा हूँ।",
    support_escalation_ack: "लूमो विशेषज्ञ को सूचित कर दिया गया है, वे जल्द ही संपर्क करेंगे।",
    support_no_match: "मुझे सटीक उत्तर नहीं मिला। क्या आप लूमो विशेषज्ञ से जुड़ना चाहेंगे?",
    ask_name: "कृपया अपना पूरा नाम लिखें (आधिकारिक आईडी के अनुसार)।",
    invalid_name: "कृपया खाली नाम न भेजें।",
    ask_dob: "कृपया अपनी जन्मतिथि DD-MM-YYYY फॉर्मेट में दें (उदा. 31-12-1990)।",
    invalid_dob: "अमान्य तिथि फॉर्मेट। कृपया DD-MM-YYYY (उदा. 31-12-1990) में दें।",
    age_out_of_range: "आवेदक की आयु 18 से 75 वर्ष के बीच होनी चाहिए।",
    ask_employment: "अपना रोजगार प्रकार चुनें:",
    employment_options: [
        "नौकरीपेशा (Salaried)",
        "स्वरोज़गार (Self-Employed)",
        "अन्य (Other)",
    ],
    ask_salary: "कृपया अपनी औसत मासिक आय ₹ में लिखें (सिर्फ अंक).",
    invalid_number: "कृपया केवल संख्याएँ भेजें (उदा. 45000)।",
    ask_purpose: "इस लोन का मुख्य उद्देश्य क्या है? विकल्प चुनें या लिखें।",
    purpose_options: ["Personal", "Education", "Medical", "Home", "Travel", "Other"],
    more_options: "अन्य विकल्प",
    ask_consent: "क्या आप लूमो को अपने विवरण प्रोसेस करने और क्रेडिट ब्यूरो जांच करने की सहमति देते हैं? (Yes / No)",
    consent_yes: "Yes",
    consent_no: "No",
    consent_required: "आगे बढ़ने के लिए सहमति आवश्यक है।",
    decision_submit: "आपकी जानकारी जाँच के लिए भेज रहा हूँ...",
    decision_rejected: "क्षमा करें — हम अभी लोन स्वीकृत नहीं कर पाए क्योंकि: {reason}. कृपया Support का उपयोग करें।",
    decision_approved_intro: "🎉 आप प्रावधानिक रूप से पात्र हैं। उपलब्ध ऑफ़र नीचे हैं:",
    offers_prompt: "किसी ऑफ़र का चयन करें या Support चुनें।",
    offer_button_accept: "स्वीकार करें",
    offer_selected: "आपने चुना:\n₹{amount}\n{tenure} महीने\nAPR {apr}%",
    offer_details: "ऑफ़र विवरण:\nराशि: ₹{amount}\nअवधि: {tenure} महीने\nAPR: {apr}%\nप्रोसेसिंग शुल्क: {fee}%\nEMI: ₹{emi}",
    choose_prompt: "चुनें:",
    ask_kyc: "कृपया KYC पूरा करें। Complete KYC दबाएँ।",
    kyc_button: "Complete KYC",
    kyc_completed: "KYC पूरा हो गया। कृपया अपनी सेल्फ़ी भेजें।",
    ask_selfie: "कृपया अब कैमरा का उपयोग कर सेल्फ़ी लें और भेजें।",
    selfie_received: "सेल्फ़ी प्राप्त हो गई।",
    ask_bank: "कृपया बैंक विवरण दें\n<IFSC>\n<account_number>",
    invalid_bank: "दो पंक्तियाँ चाहिए: IFSC कोड, फिर खाता संख्या।",
    bank_details_received: "बैंक विवरण प्राप्त। अंतिम जाँच कर रहा हूँ...",
    over_ceiling: "चुनी गई राशि पात्र राशि से अधिक है। कृपया कोई अन्य ऑफ़र चुनें।",
    final_approval: "✅ लोन स्वीकृत और जारी किया गया! राशि: ₹{amount}. संदर्भ: {ref}",
    final_reject: "हम लोन जारी नहीं कर पा रहे हैं क्योंकि: {reason}. कृपया Support से संपर्क करें।",
    nach_prompt: "NACH (मंडेट) पूरा करें। Complete NACH दबाएँ।",
    nach_button: "Complete NACH",
    nach_done: "ऑटो-डेबिट सेटअप पूरा हो गया।",
    agreement_prompt: "कृपया ग्राहक समझौते पढ़ें और सहमति दें।",
    agreement_sent: "समझौता भेजा गया। Agree दबाएँ।",
    agreement_signed: "धन्यवाद — समझौता स्वीकार कर लिया गया।",
    agreement_declined: "आपने शर्तें स्वीकार नहीं कीं। आवेदन आगे नहीं बढ़ सकता।",
    confirm_agree: "Agree",
    confirm_disagree: "Not Agree",
    download_app: "एप डाउनलोड करें",
    send_email: "ईमेल भेजें",
    connect_agent: "एजेंट से कनेक्ट करें",
    post_menu_intro: "एक विकल्प चुनें:",
    post_need_help: "मदद चाहिए?",
    post_view_details: "लोन विवरण देखें",
    post_download_pdf: "लोन पीडीएफ डाउनलोड करें",
    post_repay: "लोन चुका दें",
    loan_details_intro: "लोन विवरण:",
    repay_answer: "चुकाने के लिए लूमो ऐप खोलें या PAY LINK लिखकर भुगतान लिंक प्राप्त करें।",
    download_app_answer: "Play Store / App Store से लूमो फाइनेंस ऐप डाउनलोड करें: {url}",
    send_email_answer: "हमें {email} पर लिखें, हम जल्द से जल्द जवाब देंगे।",
    invalid_choice: "कृपया उपलब्ध विकल्पों में से चुनें।",
    restart_hint: "आपके विवरण में समस्या आई। कृपया 'Get Loan' लिखकर दोबारा शुरू करें।",
};

/// Resolve the pack for a language; `None` falls back to English.
pub fn pack(language: Option<Language>) -> &'static LanguagePack {
    match language.unwrap_or_default() {
        Language::En => &EN,
        Language::Hi => &HI,
    }
}

/// Fill `{key}` placeholders in a template.
pub fn render(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in pairs {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Format a rupee amount with thousands separators and no decimals.
pub fn format_inr(amount: rust_decimal::Decimal) -> String {
    let rounded = amount.round_dp(0).trunc();
    let digits = rounded.abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pack_falls_back_to_english() {
        assert_eq!(pack(None).get_loan, "Get Loan");
        assert_eq!(pack(Some(Language::En)).get_loan, "Get Loan");
        assert_eq!(pack(Some(Language::Hi)).get_loan, "लोन लें");
    }

    #[test]
    fn language_parse_and_display_roundtrip() {
        for lang in [Language::En, Language::Hi] {
            let parsed: Language = lang.to_string().parse().unwrap();
            assert_eq!(parsed, lang);
        }
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn display_matches_serde() {
        for lang in [Language::En, Language::Hi] {
            let json = serde_json::to_string(&lang).unwrap();
            assert_eq!(json, format!("\"{lang}\""));
        }
    }

    #[test]
    fn render_fills_placeholders() {
        let out = render("Amount: ₹{amount}, ref {ref}", &[("amount", "60,000"), ("ref", "REF-1")]);
        assert_eq!(out, "Amount: ₹60,000, ref REF-1");
    }

    #[test]
    fn inr_formatting_groups_thousands() {
        assert_eq!(format_inr(dec!(500)), "500");
        assert_eq!(format_inr(dec!(60000)), "60,000");
        assert_eq!(format_inr(dec!(1500000)), "1,500,000");
        assert_eq!(format_inr(dec!(90000.49)), "90,000");
    }
}
