use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::config::Config;
use crate::dto::screening_dto::{fields, ResumeSource, SubmissionInput};
use crate::models::screening::{CanonicalScreeningResult, NormalizedVerdict};
use crate::services::normalizer::{
    check_webhook_contract, normalize, ConfidenceScale, NormalizeError, Producer,
    UNEXPECTED_FORMAT_MESSAGE,
};
use crate::utils::text::{extract_pdf_text, redact_email};
use crate::utils::validation::PDF_MIME;

pub const SCREENING_TOOL_NAME: &str = "suggest_screening_result";

const SYSTEM_PROMPT: &str = r#"You are an expert HR recruiter and resume screening specialist. Your task is to analyze resumes against job descriptions and provide structured assessments.

When analyzing, consider:
- Skills match (technical and soft skills)
- Years of relevant experience
- Education and certifications
- Career progression
- Red flags (gaps, job hopping, etc.)

Be fair, objective, and focus on job-relevant qualifications."#;

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("AI fallback is not configured (AI_API_KEY missing)")]
    AiNotConfigured,

    #[error("AI gateway rate limit exceeded")]
    AiRateLimited,

    #[error("AI credits exhausted")]
    AiCreditsExhausted,

    #[error("AI gateway returned {status}: {body}")]
    AiStatus { status: u16, body: String },

    #[error("AI gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI returned unexpected response format: {0}")]
    MalformedToolCall(String),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl ScoringError {
    /// Message safe to show the submitter. Upstream detail stays in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AiRateLimited => "Temporary processing error - please try again in a few moments.",
            Self::AiCreditsExhausted => "Service temporarily unavailable. Please try again later.",
            Self::MalformedToolCall(_) | Self::Normalize(NormalizeError::Schema(_)) => {
                UNEXPECTED_FORMAT_MESSAGE
            }
            _ => "An error occurred processing your submission.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Webhook,
    AiFallback,
}

#[derive(Debug, Clone)]
pub struct ScoredSubmission {
    pub result: CanonicalScreeningResult,
    pub source: ScoreSource,
}

#[derive(Clone)]
pub struct ScoringService {
    client: Client,
    webhook_url: Option<String>,
    webhook_confidence_scale: ConfidenceScale,
    ai_gateway_url: String,
    ai_api_key: Option<String>,
    ai_model: String,
    calendar_base_url: String,
}

impl ScoringService {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            webhook_url: config.scoring_webhook_url.clone(),
            webhook_confidence_scale: config.webhook_confidence_scale,
            ai_gateway_url: config.ai_gateway_url.clone(),
            ai_api_key: config.ai_api_key.clone(),
            ai_model: config.ai_model.clone(),
            calendar_base_url: config.calendar_base_url.clone(),
        }
    }

    /// Primary webhook first for uploads; anything it gets wrong falls
    /// through to the AI call.
    pub async fn score(&self, input: &SubmissionInput) -> Result<ScoredSubmission, ScoringError> {
        if let (Some(url), ResumeSource::Pdf(_)) = (self.webhook_url.as_deref(), &input.resume) {
            if let Some(result) = self.try_primary(url, input).await {
                return Ok(ScoredSubmission {
                    result,
                    source: ScoreSource::Webhook,
                });
            }
            tracing::info!("falling back to AI scoring");
        }

        let result = self.score_with_ai(input).await?;
        Ok(ScoredSubmission {
            result,
            source: ScoreSource::AiFallback,
        })
    }

    async fn try_primary(&self, url: &str, input: &SubmissionInput) -> Option<CanonicalScreeningResult> {
        let ResumeSource::Pdf(file) = &input.resume else {
            return None;
        };

        let part = match Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(PDF_MIME)
        {
            Ok(part) => part,
            Err(e) => {
                tracing::error!(error = %e, "could not build webhook upload");
                return None;
            }
        };
        let form = Form::new()
            .part(fields::RESUME, part)
            .text(fields::EMAIL, input.email.clone())
            .text(fields::FULL_NAME, input.full_name.clone())
            .text(fields::JOB_DESCRIPTION, input.job_description.clone());

        tracing::info!(to = %redact_email(&input.email), "calling scoring webhook");
        let res = match self.client.post(url).multipart(form).send().await {
            Ok(res) => res,
            Err(e) => {
                tracing::error!(error = %e, "scoring webhook failed");
                return None;
            }
        };

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %text, "scoring webhook error");
            return None;
        }

        let payload: JsonValue = match res.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "scoring webhook returned non-JSON body");
                return None;
            }
        };

        if let Err(e) = check_webhook_contract(&payload) {
            tracing::warn!(error = %e, "webhook response missing required fields");
            return None;
        }

        let producer = Producer::Webhook {
            confidence_scale: self.webhook_confidence_scale,
        };
        match normalize(&payload, producer) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(error = %e, "webhook response failed normalization");
                None
            }
        }
    }

    async fn score_with_ai(&self, input: &SubmissionInput) -> Result<CanonicalScreeningResult, ScoringError> {
        let api_key = self.ai_api_key.as_deref().ok_or(ScoringError::AiNotConfigured)?;

        let resume_text = match &input.resume {
            ResumeSource::Pdf(file) => extract_pdf_text(&file.file_name, &file.bytes),
            ResumeSource::Text(text) => text.clone(),
        };

        let user_prompt = format!(
            "Analyze this candidate's resume against the job description.\n\n\
             CANDIDATE: {} ({})\n\n\
             JOB DESCRIPTION:\n{}\n\n\
             RESUME CONTENT:\n{}\n\n\
             Provide your analysis using the {} function.",
            input.full_name, input.email, input.job_description, resume_text, SCREENING_TOOL_NAME
        );

        let payload = json!({
            "model": self.ai_model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "tools": [screening_tool()],
            "tool_choice": {"type": "function", "function": {"name": SCREENING_TOOL_NAME}}
        });

        tracing::info!(model = %self.ai_model, "calling AI gateway");
        let res = self
            .client
            .post(&self.ai_gateway_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "AI gateway error");
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => ScoringError::AiRateLimited,
                StatusCode::PAYMENT_REQUIRED => ScoringError::AiCreditsExhausted,
                other => ScoringError::AiStatus {
                    status: other.as_u16(),
                    body,
                },
            });
        }

        let body: JsonValue = res.json().await?;
        let arguments = extract_tool_arguments(&body)?;
        let mut result = normalize(&arguments, Producer::AiTool)?;

        if result.calendar_link.is_none() && result.normalized_verdict == NormalizedVerdict::Interview {
            result.calendar_link = calendar_link(&self.calendar_base_url, &input.full_name);
        }
        if result.email_draft.is_none() {
            result.email_draft = Some(draft_email(
                &input.full_name,
                result.normalized_verdict,
                &result.short_reason,
            ));
        }
        Ok(result)
    }
}

fn screening_tool() -> JsonValue {
    json!({
        "type": "function",
        "function": {
            "name": SCREENING_TOOL_NAME,
            "description": "Return structured resume screening results",
            "parameters": {
                "type": "object",
                "properties": {
                    "overall_score": {"type": "integer", "minimum": 0, "maximum": 100, "description": "Overall match score from 0-100"},
                    "verdict": {"type": "string", "enum": ["Interview", "Hold", "Reject"], "description": "Recommended action"},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1, "description": "Confidence level from 0 to 1"},
                    "matched_skills": {"type": "array", "items": {"type": "string"}, "description": "List of skills that match the job requirements"},
                    "years_relevant_experience": {"type": "number", "description": "Estimated years of relevant experience"},
                    "short_reason": {"type": "string", "description": "Brief explanation of the assessment (2-3 sentences)"},
                    "recommended_next_steps": {"type": "string", "description": "Suggested next steps for this candidate"},
                    "calendar_link": {"type": "string", "description": "Simulated calendar booking link for interview"},
                    "email_draft": {"type": "string", "description": "Draft email to send to the candidate based on the verdict"}
                },
                "required": [
                    "overall_score",
                    "verdict",
                    "confidence",
                    "matched_skills",
                    "years_relevant_experience",
                    "short_reason",
                    "recommended_next_steps"
                ],
                "additionalProperties": false
            }
        }
    })
}

/// Pulls the arguments of the first tool call. Providers send them either as
/// a JSON-encoded string or as an object.
pub fn extract_tool_arguments(body: &JsonValue) -> Result<JsonValue, ScoringError> {
    let function = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("tool_calls"))
        .and_then(|t| t.get(0))
        .and_then(|t| t.get("function"))
        .ok_or_else(|| ScoringError::MalformedToolCall("no tool call in response".to_string()))?;

    let name = function.get("name").and_then(|n| n.as_str()).unwrap_or_default();
    if name != SCREENING_TOOL_NAME {
        return Err(ScoringError::MalformedToolCall(format!(
            "unexpected tool '{}'",
            name
        )));
    }

    match function.get("arguments") {
        Some(JsonValue::String(raw)) => serde_json::from_str(raw)
            .map_err(|e| ScoringError::MalformedToolCall(format!("arguments are not JSON: {}", e))),
        Some(obj @ JsonValue::Object(_)) => Ok(obj.clone()),
        _ => Err(ScoringError::MalformedToolCall("missing arguments".to_string())),
    }
}

pub fn name_slug(full_name: &str) -> String {
    full_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

pub fn calendar_link(base: &str, full_name: &str) -> Option<String> {
    let mut url = url::Url::parse(base).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(&name_slug(full_name));
    Some(url.to_string())
}

pub fn draft_email(full_name: &str, verdict: NormalizedVerdict, reason: &str) -> String {
    let first_name = full_name.split_whitespace().next().unwrap_or(full_name);
    match verdict {
        NormalizedVerdict::Interview => format!(
            "Dear {},\n\n\
             Thank you for your application. We were impressed with your qualifications and would like to invite you for an interview.\n\n\
             {}\n\n\
             Please use the calendar link provided to schedule a time that works for you.\n\n\
             Best regards,\nHiring Team",
            first_name, reason
        ),
        NormalizedVerdict::Hold => format!(
            "Dear {},\n\n\
             Thank you for your application. Your profile is currently under review, and we will be in touch soon with an update.\n\n\
             Best regards,\nHiring Team",
            first_name
        ),
        _ => format!(
            "Dear {},\n\n\
             Thank you for taking the time to apply. After careful consideration, we have decided to move forward with other candidates whose experience more closely aligns with our current needs.\n\n\
             We encourage you to apply for future opportunities that match your qualifications.\n\n\
             Best regards,\nHiring Team",
            first_name
        ),
    }
}
