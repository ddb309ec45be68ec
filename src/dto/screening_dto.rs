use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::screening::{CanonicalScreeningResult, EmailKind, NormalizedVerdict};

/// Multipart field names the scoring workflow expects verbatim.
pub mod fields {
    pub const RESUME: &str = "Resume_PDF_only_";
    pub const EMAIL: &str = "Email Address";
    pub const FULL_NAME: &str = "Full Name";
    pub const JOB_DESCRIPTION: &str = "job_description";
    pub const HONEYPOT: &str = "website";
}

#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub enum RawResume {
    /// Multipart upload; `None` when the file field was absent.
    Upload(Option<ResumeFile>),
    /// JSON submissions carry already-extracted text.
    Text(String),
}

/// Submission exactly as received, before any rule has been applied.
#[derive(Debug, Clone)]
pub struct RawSubmission {
    pub full_name: String,
    pub email: String,
    pub job_description: String,
    pub honeypot: String,
    pub resume: RawResume,
}

#[derive(Debug, Clone)]
pub enum ResumeSource {
    Pdf(ResumeFile),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct SubmissionInput {
    pub full_name: String,
    pub email: String,
    pub job_description: String,
    pub resume: ResumeSource,
}

/// JSON body accepted by the submission endpoint. Both the camelCase keys and
/// the form-style keys are understood.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonSubmission {
    #[serde(default, rename = "fullName", alias = "Full Name")]
    pub full_name: Option<String>,
    #[serde(default, alias = "Email Address")]
    pub email: Option<String>,
    #[serde(default, rename = "jobDescription", alias = "job_description")]
    pub job_description: Option<String>,
    #[serde(default, rename = "resumeText")]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl From<JsonSubmission> for RawSubmission {
    fn from(body: JsonSubmission) -> Self {
        Self {
            full_name: body.full_name.unwrap_or_default(),
            email: body.email.unwrap_or_default(),
            job_description: body.job_description.unwrap_or_default(),
            honeypot: body.website.unwrap_or_default(),
            resume: RawResume::Text(body.resume_text.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningResponse {
    #[serde(flatten)]
    pub result: CanonicalScreeningResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<Uuid>,
}

/// Subset of the canonical result the email templates need.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmailResultPayload {
    #[validate(range(min = 0, max = 100))]
    pub overall_score: i32,
    pub verdict: String,
    #[serde(rename = "normalizedVerdict")]
    pub normalized_verdict: NormalizedVerdict,
    pub short_reason: String,
    #[serde(default)]
    pub recommended_next_steps: Vec<String>,
}

impl From<&CanonicalScreeningResult> for EmailResultPayload {
    fn from(result: &CanonicalScreeningResult) -> Self {
        Self {
            overall_score: result.overall_score as i32,
            verdict: result.verdict.clone(),
            normalized_verdict: result.normalized_verdict,
            short_reason: result.short_reason.clone(),
            recommended_next_steps: result.recommended_next_steps.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmailDispatchRequest {
    #[validate(length(min = 1, max = 200))]
    pub candidate_name: String,
    #[validate(email, length(max = 320))]
    pub candidate_email: String,
    #[serde(default)]
    pub candidate_id: Option<Uuid>,
    #[validate(nested)]
    pub result: EmailResultPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailDispatchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    pub email_type: Option<EmailKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_submission_accepts_both_key_styles() {
        let camel: JsonSubmission = serde_json::from_value(json!({
            "fullName": "Ada",
            "email": "ada@example.org",
            "jobDescription": "Engineer",
            "resumeText": "text"
        }))
        .unwrap();
        let form: JsonSubmission = serde_json::from_value(json!({
            "Full Name": "Ada",
            "Email Address": "ada@example.org",
            "job_description": "Engineer"
        }))
        .unwrap();
        assert_eq!(camel.full_name.as_deref(), Some("Ada"));
        assert_eq!(form.full_name.as_deref(), Some("Ada"));
        assert_eq!(form.email.as_deref(), Some("ada@example.org"));
        assert_eq!(form.job_description.as_deref(), Some("Engineer"));
        assert!(form.resume_text.is_none());
    }

    #[test]
    fn dispatch_request_validation() {
        let mut req: EmailDispatchRequest = serde_json::from_value(json!({
            "candidateName": "Ada",
            "candidateEmail": "ada@example.org",
            "result": {
                "overall_score": 80,
                "verdict": "Interview",
                "normalizedVerdict": "Interview",
                "short_reason": "Great",
                "recommended_next_steps": ["Call"]
            }
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        req.candidate_email = "nope".into();
        req.result.overall_score = 130;
        let errors = req.validate().unwrap_err();
        let fields = errors.errors();
        assert!(fields.contains_key("candidate_email"));
        assert!(fields.contains_key("result"));
    }
}
