use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical recommendation derived from the upstream verdict token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalizedVerdict {
    Interview,
    Hold,
    Reject,
    Unknown,
}

impl NormalizedVerdict {
    /// Maps a free-form verdict through the fixed synonym table.
    /// Casing and surrounding whitespace are ignored; the score is never consulted.
    pub fn from_verdict(verdict: &str) -> Self {
        match verdict.trim().to_lowercase().as_str() {
            "interview" | "proceed" | "yes" => Self::Interview,
            "hold" | "maybe" | "pending" => Self::Hold,
            "reject" | "no" | "pass" => Self::Reject,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interview => "Interview",
            Self::Hold => "Hold",
            Self::Reject => "Reject",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for NormalizedVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for NormalizedVerdict {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Interview" => Ok(Self::Interview),
            "Hold" => Ok(Self::Hold),
            "Reject" => Ok(Self::Reject),
            "Unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown normalized verdict: {}", other)),
        }
    }
}

/// The single shape every downstream component consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalScreeningResult {
    pub overall_score: u8,
    pub verdict: String,
    #[serde(rename = "normalizedVerdict")]
    pub normalized_verdict: NormalizedVerdict,
    /// Always on the 0-100 scale.
    pub confidence: f64,
    pub summary: String,
    pub matched_skills: Vec<String>,
    pub years_relevant_experience: f64,
    pub short_reason: String,
    pub recommended_next_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_draft: Option<String>,
}

impl CanonicalScreeningResult {
    /// Placeholder returned to submissions that tripped the honeypot field.
    pub fn bot_hold() -> Self {
        let reason = "Application received and under review.".to_string();
        Self {
            overall_score: 0,
            verdict: "Hold".to_string(),
            normalized_verdict: NormalizedVerdict::Hold,
            confidence: 0.0,
            summary: reason.clone(),
            matched_skills: vec![],
            years_relevant_experience: 0.0,
            short_reason: reason,
            recommended_next_steps: vec!["We will contact you if there's a match.".to_string()],
            calendar_link: None,
            email_draft: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    Interview,
    Rejection,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interview => "interview",
            Self::Rejection => "rejection",
        }
    }

    /// Column holding the durable sent flag for this kind.
    pub fn flag_column(&self) -> &'static str {
        match self {
            Self::Interview => "interview_email_sent",
            Self::Rejection => "rejection_email_sent",
        }
    }
}
