use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::candidate::{CandidateFilter, CandidateRecord, NewCandidate};
use crate::models::screening::EmailKind;

/// Persistence for scored candidates.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateRecord>;

    async fn get(&self, id: Uuid) -> Result<Option<CandidateRecord>>;

    /// Newest first.
    async fn list(&self, filter: &CandidateFilter) -> Result<Vec<CandidateRecord>>;

    /// Flips the flag for `kind` from false to true. Returns false when it was
    /// already set (or the candidate does not exist).
    async fn mark_email_sent(&self, id: Uuid, kind: EmailKind) -> Result<bool>;
}

fn new_record(candidate: NewCandidate) -> CandidateRecord {
    let NewCandidate {
        name,
        email,
        role,
        result,
    } = candidate;
    CandidateRecord {
        id: Uuid::new_v4(),
        name,
        email,
        role,
        score: result.overall_score as i32,
        verdict: result.verdict,
        normalized_verdict: result.normalized_verdict,
        confidence: result.confidence,
        summary: result.summary,
        matched_skills: result.matched_skills,
        years_relevant_experience: result.years_relevant_experience,
        short_reason: result.short_reason,
        recommended_next_steps: result.recommended_next_steps,
        calendar_link: result.calendar_link,
        email_draft: result.email_draft,
        interview_email_sent: false,
        rejection_email_sent: false,
        created_at: Utc::now(),
    }
}

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CANDIDATE_COLUMNS: &str = "id, name, email, role, score, verdict, normalized_verdict, confidence, summary, \
     matched_skills, years_relevant_experience, short_reason, recommended_next_steps, \
     calendar_link, email_draft, interview_email_sent, rejection_email_sent, created_at";

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateRecord> {
        let record = new_record(candidate);
        let sql = format!(
            r#"
            INSERT INTO candidates ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {cols}
            "#,
            cols = CANDIDATE_COLUMNS
        );
        let row = sqlx::query_as::<_, CandidateRecord>(&sql)
            .bind(record.id)
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.role)
            .bind(record.score)
            .bind(&record.verdict)
            .bind(record.normalized_verdict.as_str())
            .bind(record.confidence)
            .bind(&record.summary)
            .bind(&record.matched_skills)
            .bind(record.years_relevant_experience)
            .bind(&record.short_reason)
            .bind(&record.recommended_next_steps)
            .bind(&record.calendar_link)
            .bind(&record.email_draft)
            .bind(record.interview_email_sent)
            .bind(record.rejection_email_sent)
            .bind(record.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CandidateRecord>> {
        let sql = format!("SELECT {} FROM candidates WHERE id = $1", CANDIDATE_COLUMNS);
        let row = sqlx::query_as::<_, CandidateRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self, filter: &CandidateFilter) -> Result<Vec<CandidateRecord>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM candidates
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::int IS NULL OR score >= $2)
            ORDER BY created_at DESC
            "#,
            CANDIDATE_COLUMNS
        );
        let role = filter.role.as_deref().filter(|r| !r.is_empty());
        let rows = sqlx::query_as::<_, CandidateRecord>(&sql)
            .bind(role)
            .bind(filter.min_score)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn mark_email_sent(&self, id: Uuid, kind: EmailKind) -> Result<bool> {
        let column = kind.flag_column();
        let sql = format!(
            "UPDATE candidates SET {col} = TRUE WHERE id = $1 AND {col} = FALSE",
            col = column
        );
        let res = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() == 1)
    }
}

/// Store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryCandidateStore {
    rows: Mutex<Vec<CandidateRecord>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<CandidateRecord>>> {
        self.rows
            .lock()
            .map_err(|_| Error::Internal("candidate store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateRecord> {
        let record = new_record(candidate);
        self.lock()?.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CandidateRecord>> {
        Ok(self.lock()?.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, filter: &CandidateFilter) -> Result<Vec<CandidateRecord>> {
        let mut rows: Vec<CandidateRecord> = self
            .lock()?
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_email_sent(&self, id: Uuid, kind: EmailKind) -> Result<bool> {
        let mut rows = self.lock()?;
        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        let flag = match kind {
            EmailKind::Interview => &mut row.interview_email_sent,
            EmailKind::Rejection => &mut row.rejection_email_sent,
        };
        if *flag {
            return Ok(false);
        }
        *flag = true;
        Ok(true)
    }
}
