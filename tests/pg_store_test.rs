use resume_screener::database::pool::{create_pool, run_migrations};
use resume_screener::models::candidate::{CandidateFilter, NewCandidate};
use resume_screener::models::screening::{CanonicalScreeningResult, EmailKind, NormalizedVerdict};
use resume_screener::services::candidate_service::{CandidateStore, PgCandidateStore};

async fn store() -> Option<PgCandidateStore> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };
    let pool = create_pool(&url).await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    Some(PgCandidateStore::new(pool))
}

#[tokio::test]
async fn postgres_round_trip_and_flags() {
    let Some(store) = store().await else {
        return;
    };

    let role = format!("Pg Role {}", uuid::Uuid::new_v4());
    let result = CanonicalScreeningResult {
        overall_score: 73,
        verdict: "Proceed".into(),
        normalized_verdict: NormalizedVerdict::Interview,
        confidence: 91.25,
        summary: "Summary".into(),
        matched_skills: vec!["Rust".into(), "SQL".into()],
        years_relevant_experience: 4.5,
        short_reason: "Reason".into(),
        recommended_next_steps: vec!["Phone screen".into(), "Onsite".into()],
        calendar_link: Some("https://calendly.com/interview/ada".into()),
        email_draft: Some("Dear Ada".into()),
    };

    let inserted = store
        .insert(NewCandidate::new("Ada", "ada@lovelace.dev", &role, result.clone()))
        .await
        .expect("insert");
    let reread = store.get(inserted.id).await.expect("get").expect("row");
    assert_eq!(reread.to_result(), result);
    assert_eq!(reread.role, role);

    assert!(store.mark_email_sent(inserted.id, EmailKind::Interview).await.unwrap());
    assert!(!store.mark_email_sent(inserted.id, EmailKind::Interview).await.unwrap());

    let filter = CandidateFilter {
        role: Some(role.clone()),
        min_score: Some(70),
    };
    let rows = store.list(&filter).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].interview_email_sent);
    assert!(!rows[0].rejection_email_sent);
}
