use std::sync::OnceLock;

use regex::Regex;
use validator::Validate;

use crate::dto::screening_dto::{RawResume, RawSubmission, ResumeSource, SubmissionInput};

pub const MAX_NAME_CHARS: usize = 200;
pub const MAX_EMAIL_CHARS: usize = 320;
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 10_000;
pub const PDF_MIME: &str = "application/pdf";

const MIB: usize = 1024 * 1024;

const PLACEHOLDER_EMAILS: [&str; 3] = ["fallback@email.com", "test@test.com", "example@example.com"];

pub fn validate<T: Validate>(val: &T) -> Result<(), validator::ValidationErrors> {
    val.validate()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionRejection {
    #[error("Missing required fields: Full Name, Email Address, or job_description")]
    MissingFields,

    #[error("Invalid email address format")]
    InvalidEmail,

    #[error("Please use a real email address")]
    PlaceholderEmail,

    #[error("Input exceeds maximum allowed length")]
    InputTooLong,

    #[error("Please upload a PDF resume")]
    MissingResume,

    #[error("Please upload a PDF resume only")]
    InvalidFileType,

    #[error("Resume file too large. Maximum size is {}.", size_limit(.max_bytes))]
    FileTooLarge { max_bytes: usize },
}

/// Byte limit shown in megabytes, with one decimal when not a whole number.
fn size_limit(max_bytes: &usize) -> String {
    if max_bytes % MIB == 0 {
        format!("{}MB", max_bytes / MIB)
    } else {
        format!("{:.1}MB", *max_bytes as f64 / MIB as f64)
    }
}

impl SubmissionRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::InvalidEmail => "invalid_email",
            Self::PlaceholderEmail => "placeholder_email",
            Self::InputTooLong => "input_too_long",
            Self::MissingResume => "missing_resume",
            Self::InvalidFileType => "invalid_file_type",
            Self::FileTooLarge { .. } => "file_too_large",
        }
    }
}

#[derive(Debug, Clone)]
pub enum CheckedSubmission {
    /// The honeypot field was filled in.
    Bot,
    Accepted(SubmissionInput),
}

// something@something.tld with no whitespace; length is checked separately.
fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

fn is_plausible_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

fn is_pdf_name(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn is_pdf_mime(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(PDF_MIME))
}

/// Applies the submission rules in order, stopping at the first failure.
pub fn check_submission(
    raw: RawSubmission,
    max_resume_bytes: usize,
) -> Result<CheckedSubmission, SubmissionRejection> {
    if !raw.honeypot.trim().is_empty() {
        return Ok(CheckedSubmission::Bot);
    }

    let full_name = raw.full_name.trim();
    let email = raw.email.trim();
    let job_description = raw.job_description.trim();

    if full_name.is_empty() || email.is_empty() || job_description.is_empty() {
        return Err(SubmissionRejection::MissingFields);
    }

    if !is_plausible_email(email) {
        return Err(SubmissionRejection::InvalidEmail);
    }
    if PLACEHOLDER_EMAILS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(email))
    {
        return Err(SubmissionRejection::PlaceholderEmail);
    }

    if full_name.chars().count() > MAX_NAME_CHARS
        || email.chars().count() > MAX_EMAIL_CHARS
        || job_description.chars().count() > MAX_JOB_DESCRIPTION_CHARS
    {
        return Err(SubmissionRejection::InputTooLong);
    }

    let resume = match raw.resume {
        RawResume::Text(text) => ResumeSource::Text(text),
        RawResume::Upload(None) => return Err(SubmissionRejection::MissingResume),
        RawResume::Upload(Some(file)) => {
            if file.bytes.is_empty() {
                return Err(SubmissionRejection::MissingResume);
            }
            if !is_pdf_name(&file.file_name) || !is_pdf_mime(file.content_type.as_deref()) {
                return Err(SubmissionRejection::InvalidFileType);
            }
            if file.bytes.len() > max_resume_bytes {
                return Err(SubmissionRejection::FileTooLarge {
                    max_bytes: max_resume_bytes,
                });
            }
            ResumeSource::Pdf(file)
        }
    };

    Ok(CheckedSubmission::Accepted(SubmissionInput {
        full_name: full_name.to_string(),
        email: email.to_string(),
        job_description: job_description.to_string(),
        resume,
    }))
}
