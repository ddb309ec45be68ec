use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::screening::{CanonicalScreeningResult, EmailKind, NormalizedVerdict};

pub const DEFAULT_ROLE: &str = "Unspecified Role";
const MAX_ROLE_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub score: i32,
    pub verdict: String,
    #[sqlx(try_from = "String")]
    pub normalized_verdict: NormalizedVerdict,
    pub confidence: f64,
    pub summary: String,
    pub matched_skills: Vec<String>,
    pub years_relevant_experience: f64,
    pub short_reason: String,
    pub recommended_next_steps: Vec<String>,
    pub calendar_link: Option<String>,
    pub email_draft: Option<String>,
    pub interview_email_sent: bool,
    pub rejection_email_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl CandidateRecord {
    pub fn email_sent(&self, kind: EmailKind) -> bool {
        match kind {
            EmailKind::Interview => self.interview_email_sent,
            EmailKind::Rejection => self.rejection_email_sent,
        }
    }

    /// Rebuilds the canonical result this row was projected from.
    pub fn to_result(&self) -> CanonicalScreeningResult {
        CanonicalScreeningResult {
            overall_score: self.score.clamp(0, 100) as u8,
            verdict: self.verdict.clone(),
            normalized_verdict: self.normalized_verdict,
            confidence: self.confidence,
            summary: self.summary.clone(),
            matched_skills: self.matched_skills.clone(),
            years_relevant_experience: self.years_relevant_experience,
            short_reason: self.short_reason.clone(),
            recommended_next_steps: self.recommended_next_steps.clone(),
            calendar_link: self.calendar_link.clone(),
            email_draft: self.email_draft.clone(),
        }
    }
}

/// Insert payload for a freshly scored submission.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub name: String,
    pub email: String,
    pub role: String,
    pub result: CanonicalScreeningResult,
}

impl NewCandidate {
    pub fn new(name: &str, email: &str, job_description: &str, result: CanonicalScreeningResult) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            role: role_from_job_description(job_description),
            result,
        }
    }
}

/// First non-empty line of the job description, capped at 100 characters.
pub fn role_from_job_description(job_description: &str) -> String {
    job_description
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(MAX_ROLE_CHARS).collect::<String>())
        .map(|role| role.trim_end().to_string())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateFilter {
    pub role: Option<String>,
    pub min_score: Option<i32>,
}

impl CandidateFilter {
    pub fn matches(&self, record: &CandidateRecord) -> bool {
        let role_ok = self
            .role
            .as_deref()
            .filter(|r| !r.is_empty())
            .map_or(true, |r| record.role == r);
        let score_ok = self.min_score.map_or(true, |min| record.score >= min);
        role_ok && score_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_first_non_empty_line() {
        let jd = "\n   \n  Senior Rust Engineer  \nWe build things.";
        assert_eq!(role_from_job_description(jd), "Senior Rust Engineer");
    }

    #[test]
    fn role_is_truncated_to_100_chars() {
        let jd = "x".repeat(250);
        assert_eq!(role_from_job_description(&jd).chars().count(), 100);
    }

    #[test]
    fn role_defaults_when_blank() {
        assert_eq!(role_from_job_description("  \n\t\n"), DEFAULT_ROLE);
        assert_eq!(role_from_job_description(""), DEFAULT_ROLE);
    }
}
