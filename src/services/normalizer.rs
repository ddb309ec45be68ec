//! Maps the upstream scoring payloads onto [`CanonicalScreeningResult`].
//!
//! Two producers feed this module and they disagree on shape: the workflow
//! webhook may send next steps as a string or a list and reports confidence on
//! whatever scale it was configured with, while the AI tool call always uses a
//! 0-1 confidence. Callers name the producer explicitly; nothing here guesses
//! the shape from which fields happen to be present.

use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

use crate::models::screening::{CanonicalScreeningResult, NormalizedVerdict};

pub const UNEXPECTED_FORMAT_MESSAGE: &str =
    "The screening service returned an unexpected response format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceScale {
    /// 0.0 ..= 1.0
    Fraction,
    /// 0 ..= 100
    Percent,
}

impl ConfidenceScale {
    fn max(self) -> f64 {
        match self {
            Self::Fraction => 1.0,
            Self::Percent => 100.0,
        }
    }

    pub fn to_percent(self, value: f64) -> f64 {
        let pct = match self {
            Self::Fraction => value * 100.0,
            Self::Percent => value,
        };
        (pct.clamp(0.0, 100.0) * 100.0).round() / 100.0
    }
}

impl FromStr for ConfidenceScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fraction" => Ok(Self::Fraction),
            "percent" => Ok(Self::Percent),
            other => Err(format!("expected 'fraction' or 'percent', got '{}'", other)),
        }
    }
}

/// Which integration produced the payload being normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    Webhook { confidence_scale: ConfidenceScale },
    AiTool,
}

impl Producer {
    pub fn confidence_scale(&self) -> ConfidenceScale {
        match self {
            Self::Webhook { confidence_scale } => *confidence_scale,
            Self::AiTool => ConfidenceScale::Fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextSteps {
    One(String),
    Many(Vec<String>),
}

impl NextSteps {
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::One(step) => vec![step],
            Self::Many(steps) => steps,
        }
    }
}

/// Workflow webhook shape (V1).
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub overall_score: f64,
    pub verdict: String,
    pub confidence: Option<f64>,
    pub summary: Option<String>,
    pub matched_skills: Option<Vec<String>>,
    pub years_relevant_experience: Option<f64>,
    pub short_reason: String,
    pub recommended_next_steps: NextSteps,
    pub calendar_link: Option<String>,
    pub email_draft: Option<String>,
}

/// AI tool-call arguments shape (V2).
#[derive(Debug, Clone, PartialEq)]
pub struct AiToolResponse {
    pub overall_score: f64,
    pub verdict: String,
    pub confidence: f64,
    pub matched_skills: Vec<String>,
    pub years_relevant_experience: f64,
    pub short_reason: String,
    pub recommended_next_steps: NextSteps,
    pub calendar_link: Option<String>,
    pub email_draft: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Webhook {
        body: WebhookResponse,
        confidence_scale: ConfidenceScale,
    },
    AiTool(AiToolResponse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub violations: Vec<FieldViolation>,
}

impl SchemaMismatch {
    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "Invalid response format: {}", parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    /// The payload carried a top-level `error` key.
    #[error("Upstream reported an error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Schema(SchemaMismatch),
}

/// Collects every violation instead of stopping at the first one.
struct FieldReader<'a> {
    obj: &'a Map<String, JsonValue>,
    violations: Vec<FieldViolation>,
}

impl<'a> FieldReader<'a> {
    fn new(obj: &'a Map<String, JsonValue>) -> Self {
        Self {
            obj,
            violations: Vec::new(),
        }
    }

    fn violation(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            path: path.into(),
            message: message.into(),
        });
    }

    /// `null` counts as absent.
    fn present(&self, key: &str) -> Option<&'a JsonValue> {
        self.obj.get(key).filter(|v| !v.is_null())
    }

    fn number(&mut self, key: &str, required: bool) -> Option<f64> {
        match self.present(key) {
            Some(v) => match v.as_f64() {
                Some(n) => Some(n),
                None => {
                    self.violation(key, format!("expected number, received {}", type_name(v)));
                    None
                }
            },
            None => {
                if required {
                    self.violation(key, "required number is missing");
                }
                None
            }
        }
    }

    fn string(&mut self, key: &str, required: bool) -> Option<String> {
        match self.present(key) {
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(v) => {
                self.violation(key, format!("expected string, received {}", type_name(v)));
                None
            }
            None => {
                if required {
                    self.violation(key, "required string is missing");
                }
                None
            }
        }
    }

    fn string_list(&mut self, key: &str, required: bool) -> Option<Vec<String>> {
        match self.present(key) {
            Some(JsonValue::Array(items)) => self.string_items(key, items),
            Some(v) => {
                self.violation(key, format!("expected array, received {}", type_name(v)));
                None
            }
            None => {
                if required {
                    self.violation(key, "required array is missing");
                }
                None
            }
        }
    }

    fn string_items(&mut self, key: &str, items: &[JsonValue]) -> Option<Vec<String>> {
        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (idx, item) in items.iter().enumerate() {
            match item {
                JsonValue::String(s) => out.push(s.clone()),
                other => {
                    ok = false;
                    self.violation(
                        format!("{}.{}", key, idx),
                        format!("expected string, received {}", type_name(other)),
                    );
                }
            }
        }
        ok.then_some(out)
    }

    fn next_steps(&mut self, key: &str) -> Option<NextSteps> {
        match self.present(key) {
            Some(JsonValue::String(s)) => Some(NextSteps::One(s.clone())),
            Some(JsonValue::Array(items)) => self.string_items(key, items).map(NextSteps::Many),
            Some(v) => {
                self.violation(
                    key,
                    format!("expected string or array of strings, received {}", type_name(v)),
                );
                None
            }
            None => {
                self.violation(key, "required field is missing");
                None
            }
        }
    }

    fn check_range(&mut self, key: &str, value: Option<f64>, min: f64, max: f64) {
        if let Some(n) = value {
            if n < min || n > max {
                self.violation(key, format!("must be between {} and {}, got {}", min, max, n));
            }
        }
    }

    fn check_non_negative(&mut self, key: &str, value: Option<f64>) {
        if let Some(n) = value {
            if n < 0.0 {
                self.violation(key, format!("must not be negative, got {}", n));
            }
        }
    }

    fn check_not_blank(&mut self, key: &str, value: Option<&String>) {
        if value.is_some_and(|s| s.trim().is_empty()) {
            self.violation(key, "must not be empty");
        }
    }

    fn check_url(&mut self, key: &str, value: Option<&String>) {
        if let Some(raw) = value.filter(|s| !s.trim().is_empty()) {
            if url::Url::parse(raw.trim()).is_err() {
                self.violation(key, "expected an absolute URL");
            }
        }
    }

    fn finish(self) -> Result<(), SchemaMismatch> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaMismatch {
                violations: self.violations,
            })
        }
    }
}

fn type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn single_violation(path: &str, message: String) -> NormalizeError {
    NormalizeError::Schema(SchemaMismatch {
        violations: vec![FieldViolation {
            path: path.to_string(),
            message,
        }],
    })
}

/// Unwraps array-wrapped payloads, short-circuits on an `error` key and
/// returns the result object.
fn result_object(payload: &JsonValue) -> Result<&Map<String, JsonValue>, NormalizeError> {
    let inner = match payload {
        JsonValue::Array(items) => items
            .first()
            .ok_or_else(|| single_violation("$", "expected a result object, received an empty array".into()))?,
        other => other,
    };
    let obj = inner
        .as_object()
        .ok_or_else(|| single_violation("$", format!("expected object, received {}", type_name(inner))))?;

    if let Some(err) = obj.get("error").filter(|v| !v.is_null()) {
        let message = match err {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(NormalizeError::Upstream(message));
    }
    Ok(obj)
}

/// Resolves a payload into the tagged union for the given producer.
pub fn parse_raw(payload: &JsonValue, producer: Producer) -> Result<RawResponse, NormalizeError> {
    let obj = result_object(payload)?;
    let mut r = FieldReader::new(obj);
    let scale = producer.confidence_scale();

    let overall_score = r.number("overall_score", true);
    r.check_range("overall_score", overall_score, 0.0, 100.0);
    let verdict = r.string("verdict", true);
    let short_reason = r.string("short_reason", true);
    r.check_not_blank("short_reason", short_reason.as_ref());
    let next_steps = r.next_steps("recommended_next_steps");

    let required_extras = matches!(producer, Producer::AiTool);
    let confidence = r.number("confidence", required_extras);
    r.check_range("confidence", confidence, 0.0, scale.max());
    let matched_skills = r.string_list("matched_skills", required_extras);
    let years = r.number("years_relevant_experience", required_extras);
    r.check_non_negative("years_relevant_experience", years);
    let summary = match producer {
        Producer::Webhook { .. } => r.string("summary", false),
        Producer::AiTool => None,
    };
    let calendar_link = r.string("calendar_link", false);
    r.check_url("calendar_link", calendar_link.as_ref());
    let email_draft = r.string("email_draft", false);

    r.finish().map_err(NormalizeError::Schema)?;

    // finish() succeeded, so every required field above is Some.
    let (Some(overall_score), Some(verdict), Some(short_reason), Some(recommended_next_steps)) =
        (overall_score, verdict, short_reason, next_steps)
    else {
        return Err(single_violation("$", "required fields missing".into()));
    };

    let raw = match producer {
        Producer::Webhook { confidence_scale } => RawResponse::Webhook {
            body: WebhookResponse {
                overall_score,
                verdict,
                confidence,
                summary,
                matched_skills,
                years_relevant_experience: years,
                short_reason,
                recommended_next_steps,
                calendar_link,
                email_draft,
            },
            confidence_scale,
        },
        Producer::AiTool => RawResponse::AiTool(AiToolResponse {
            overall_score,
            verdict,
            confidence: confidence.unwrap_or_default(),
            matched_skills: matched_skills.unwrap_or_default(),
            years_relevant_experience: years.unwrap_or_default(),
            short_reason,
            recommended_next_steps,
            calendar_link,
            email_draft,
        }),
    };
    Ok(raw)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn score_to_int(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

impl RawResponse {
    pub fn into_canonical(self) -> CanonicalScreeningResult {
        match self {
            RawResponse::Webhook {
                body,
                confidence_scale,
            } => CanonicalScreeningResult {
                overall_score: score_to_int(body.overall_score),
                normalized_verdict: NormalizedVerdict::from_verdict(&body.verdict),
                verdict: body.verdict,
                confidence: confidence_scale.to_percent(body.confidence.unwrap_or(0.0)),
                summary: non_blank(body.summary).unwrap_or_else(|| body.short_reason.clone()),
                matched_skills: body.matched_skills.unwrap_or_default(),
                years_relevant_experience: body.years_relevant_experience.unwrap_or(0.0),
                short_reason: body.short_reason,
                recommended_next_steps: body.recommended_next_steps.into_list(),
                calendar_link: non_blank(body.calendar_link),
                email_draft: non_blank(body.email_draft),
            },
            RawResponse::AiTool(body) => CanonicalScreeningResult {
                overall_score: score_to_int(body.overall_score),
                normalized_verdict: NormalizedVerdict::from_verdict(&body.verdict),
                verdict: body.verdict,
                confidence: ConfidenceScale::Fraction.to_percent(body.confidence),
                summary: body.short_reason.clone(),
                matched_skills: body.matched_skills,
                years_relevant_experience: body.years_relevant_experience,
                short_reason: body.short_reason,
                recommended_next_steps: body.recommended_next_steps.into_list(),
                calendar_link: non_blank(body.calendar_link),
                email_draft: non_blank(body.email_draft),
            },
        }
    }
}

/// Total parse-and-normalize entry point. Never panics.
pub fn normalize(
    payload: &JsonValue,
    producer: Producer,
) -> Result<CanonicalScreeningResult, NormalizeError> {
    parse_raw(payload, producer).map(RawResponse::into_canonical)
}

/// Fields the workflow webhook must send, with their exact types, before its
/// answer is accepted instead of falling back to the AI call.
pub fn check_webhook_contract(payload: &JsonValue) -> Result<(), NormalizeError> {
    let obj = result_object(payload)?;
    let mut r = FieldReader::new(obj);
    r.number("overall_score", true);
    r.string("verdict", true);
    r.number("confidence", true);
    r.string_list("matched_skills", true);
    r.number("years_relevant_experience", true);
    r.string("short_reason", true);
    r.string("recommended_next_steps", true);
    r.finish().map_err(NormalizeError::Schema)
}
