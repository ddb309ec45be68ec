use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use askama::Template;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::dto::screening_dto::EmailResultPayload;
use crate::models::candidate::CandidateRecord;
use crate::models::screening::{EmailKind, NormalizedVerdict};
use crate::services::candidate_service::CandidateStore;
use crate::services::email_service::{EmailError, EmailSender, OutgoingEmail};
use crate::utils::text::redact_email;

pub const INTERVIEW_SCORE_THRESHOLD: i32 = 70;
pub const REJECTION_SCORE_THRESHOLD: i32 = 40;

const INTERVIEW_SUBJECT: &str = "Great news! You've been selected for an interview";
const REJECTION_SUBJECT: &str = "Application Status Update";

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    Send(#[from] EmailError),

    #[error("candidate store failure: {0}")]
    Store(String),

    #[error("candidate {0} not found")]
    CandidateNotFound(Uuid),

    #[error("email template failed to render: {0}")]
    Render(#[from] askama::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    Sent { kind: EmailKind, email_id: String },
    /// Email delivery is not configured.
    Skipped { kind: EmailKind },
    AlreadySent { kind: EmailKind },
    NotEligible,
}

/// Interview when the verdict says so or the score reaches 70; otherwise a
/// rejection when the verdict says so or the score is under 40. The interview
/// check runs first, so a "Reject" verdict with a score of 75 gets an
/// interview email.
pub fn decide(verdict: NormalizedVerdict, overall_score: i32) -> Option<EmailKind> {
    if verdict == NormalizedVerdict::Interview || overall_score >= INTERVIEW_SCORE_THRESHOLD {
        Some(EmailKind::Interview)
    } else if verdict == NormalizedVerdict::Reject || overall_score < REJECTION_SCORE_THRESHOLD {
        Some(EmailKind::Rejection)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: &'static str,
    pub html: String,
}

#[derive(Template)]
#[template(path = "email/interview.html")]
struct InterviewEmail<'a> {
    name: &'a str,
    score: i32,
    reason: &'a str,
    steps: &'a [String],
}

#[derive(Template)]
#[template(path = "email/rejection.html")]
struct RejectionEmail<'a> {
    name: &'a str,
    reason: &'a str,
    steps: &'a [String],
}

/// Renders the email for `kind`. Every interpolated value is HTML-escaped.
pub fn render(
    kind: EmailKind,
    candidate_name: &str,
    result: &EmailResultPayload,
) -> Result<RenderedEmail, askama::Error> {
    let rendered = match kind {
        EmailKind::Interview => RenderedEmail {
            subject: INTERVIEW_SUBJECT,
            html: InterviewEmail {
                name: candidate_name,
                score: result.overall_score,
                reason: &result.short_reason,
                steps: &result.recommended_next_steps,
            }
            .render()?,
        },
        EmailKind::Rejection => RenderedEmail {
            subject: REJECTION_SUBJECT,
            html: RejectionEmail {
                name: candidate_name,
                reason: &result.short_reason,
                steps: &result.recommended_next_steps,
            }
            .render()?,
        },
    };
    Ok(rendered)
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn CandidateStore>,
    mailer: Option<Arc<dyn EmailSender>>,
    sent_guard: Arc<Mutex<HashSet<String>>>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn CandidateStore>, mailer: Option<Arc<dyn EmailSender>>) -> Self {
        Self {
            store,
            mailer,
            sent_guard: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Sends the email a stored candidate is due, at most once.
    pub async fn notify_candidate(&self, id: Uuid) -> Result<NotifyOutcome, NotificationError> {
        let record = self
            .store
            .get(id)
            .await
            .map_err(|e| NotificationError::Store(e.to_string()))?
            .ok_or(NotificationError::CandidateNotFound(id))?;
        let payload = EmailResultPayload::from(&record.to_result());
        self.deliver(Some(&record), &record.name, &record.email, &payload)
            .await
    }

    /// Sends for an ad-hoc result. With `candidate_id` the stored sent flags
    /// are honored and updated.
    pub async fn notify_payload(
        &self,
        candidate_id: Option<Uuid>,
        candidate_name: &str,
        candidate_email: &str,
        payload: &EmailResultPayload,
    ) -> Result<NotifyOutcome, NotificationError> {
        let record = match candidate_id {
            Some(id) => Some(
                self.store
                    .get(id)
                    .await
                    .map_err(|e| NotificationError::Store(e.to_string()))?
                    .ok_or(NotificationError::CandidateNotFound(id))?,
            ),
            None => None,
        };
        self.deliver(record.as_ref(), candidate_name, candidate_email, payload)
            .await
    }

    async fn deliver(
        &self,
        record: Option<&CandidateRecord>,
        candidate_name: &str,
        candidate_email: &str,
        payload: &EmailResultPayload,
    ) -> Result<NotifyOutcome, NotificationError> {
        // Recomputed from the raw verdict; the caller's own classification is not trusted.
        let verdict = NormalizedVerdict::from_verdict(&payload.verdict);
        let Some(kind) = decide(verdict, payload.overall_score) else {
            return Ok(NotifyOutcome::NotEligible);
        };

        if record.is_some_and(|r| r.email_sent(kind)) {
            return Ok(NotifyOutcome::AlreadySent { kind });
        }

        let Some(mailer) = self.mailer.as_ref() else {
            tracing::info!(kind = kind.as_str(), "email sending is disabled, skipping");
            return Ok(NotifyOutcome::Skipped { kind });
        };

        let rendered = render(kind, candidate_name, payload)?;

        let guard_key = format!(
            "{}:{}",
            record
                .map(|r| r.id.to_string())
                .unwrap_or_else(|| candidate_email.to_lowercase()),
            kind.as_str()
        );
        if !self.claim(&guard_key) {
            return Ok(NotifyOutcome::AlreadySent { kind });
        }

        // A send that finished between our read and the claim has set the flag by now.
        if let Some(r) = record {
            let fresh = match self.store.get(r.id).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    self.release(&guard_key);
                    return Err(NotificationError::Store(e.to_string()));
                }
            };
            if fresh.is_some_and(|f| f.email_sent(kind)) {
                self.release(&guard_key);
                return Ok(NotifyOutcome::AlreadySent { kind });
            }
        }

        let email = OutgoingEmail {
            to: candidate_email.to_string(),
            subject: rendered.subject.to_string(),
            html: rendered.html,
        };

        tracing::info!(
            kind = kind.as_str(),
            to = %redact_email(candidate_email),
            "sending candidate email"
        );
        let email_id = match mailer.send(&email).await {
            Ok(id) => id,
            Err(e) => {
                self.release(&guard_key);
                return Err(e.into());
            }
        };

        // Once the durable flag is set it owns idempotency and the in-memory
        // entry can go. Without a record, or if the flag write failed, the
        // entry stays.
        if let Some(r) = record {
            match self.store.mark_email_sent(r.id, kind).await {
                Ok(set) => {
                    if !set {
                        tracing::warn!(candidate_id = %r.id, kind = kind.as_str(), "sent flag was already set");
                    }
                    self.release(&guard_key);
                }
                Err(e) => tracing::error!(candidate_id = %r.id, error = %e, "failed to record sent flag"),
            }
        }

        Ok(NotifyOutcome::Sent { kind, email_id })
    }

    fn claim(&self, key: &str) -> bool {
        self.sent_guard
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string())
    }

    fn release(&self, key: &str) {
        self.sent_guard
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

/// Handle for queueing notifications onto the background worker.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Uuid>,
}

impl NotificationQueue {
    /// Never blocks; returns false when the queue is full or the worker is gone.
    pub fn enqueue(&self, candidate_id: Uuid) -> bool {
        match self.tx.try_send(candidate_id) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(candidate_id = %candidate_id, error = %e, "could not queue notification");
                false
            }
        }
    }
}

/// Spawns the detached worker that sends notifications after the submission
/// response has gone out. Failures are logged here and nowhere else.
pub fn spawn_notification_worker(service: NotificationService, capacity: usize) -> NotificationQueue {
    let (tx, mut rx) = mpsc::channel::<Uuid>(capacity.max(1));
    tokio::spawn(async move {
        while let Some(candidate_id) = rx.recv().await {
            match service.notify_candidate(candidate_id).await {
                Ok(outcome) => {
                    tracing::info!(candidate_id = %candidate_id, ?outcome, "notification processed")
                }
                Err(e) => {
                    tracing::error!(candidate_id = %candidate_id, error = %e, "notification failed")
                }
            }
        }
        tracing::debug!("notification worker stopped");
    });
    NotificationQueue { tx }
}
