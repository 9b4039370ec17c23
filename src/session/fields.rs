//! Field sequencer — the fixed order of onboarding data-collection fields.

use serde::{Deserialize, Serialize};

/// One data-collection field of the onboarding sequence.
///
/// Progresses linearly: FullName → DateOfBirth → Employment → MonthlyIncome →
/// Purpose → Consent. After Consent the sequence is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingField {
    FullName,
    DateOfBirth,
    Employment,
    MonthlyIncome,
    Purpose,
    Consent,
}

impl OnboardingField {
    /// All fields in sequence order.
    pub const ALL: [OnboardingField; 6] = [
        Self::FullName,
        Self::DateOfBirth,
        Self::Employment,
        Self::MonthlyIncome,
        Self::Purpose,
        Self::Consent,
    ];

    /// The first field of the sequence.
    pub fn first() -> Self {
        Self::FullName
    }

    /// The field immediately following `self`, or `None` after the last.
    pub fn next(&self) -> Option<Self> {
        use OnboardingField::*;
        match self {
            FullName => Some(DateOfBirth),
            DateOfBirth => Some(Employment),
            Employment => Some(MonthlyIncome),
            MonthlyIncome => Some(Purpose),
            Purpose => Some(Consent),
            Consent => None,
        }
    }

    /// Whether this is the last field of the sequence.
    pub fn is_last(&self) -> bool {
        matches!(self, Self::Consent)
    }
}

impl std::fmt::Display for OnboardingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FullName => "full_name",
            Self::DateOfBirth => "date_of_birth",
            Self::Employment => "employment",
            Self::MonthlyIncome => "monthly_income",
            Self::Purpose => "purpose",
            Self::Consent => "consent",
        };
        write!(f, "{s}")
    }
}
