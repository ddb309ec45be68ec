use std::net::SocketAddr;
use std::sync::Arc;

use resume_screener::{
    build_http_client,
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    routes,
    services::candidate_service::{CandidateStore, MemoryCandidateStore, PgCandidateStore},
    AppState,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    init_config()?;
    let config = get_config();

    let store: Arc<dyn CandidateStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("Connected to Postgres, migrations applied");
            Arc::new(PgCandidateStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, candidates are kept in memory only");
            Arc::new(MemoryCandidateStore::new())
        }
    };

    if config.scoring_webhook_url.is_none() {
        info!("SCORING_WEBHOOK_URL not set, uploads go straight to the AI fallback");
    }
    if config.ai_api_key.is_none() {
        tracing::warn!("AI_API_KEY not set, scoring fails whenever the webhook cannot answer");
    }

    let http_client = build_http_client(config)?;
    let app_state = AppState::new(config, store, http_client);

    let app = routes::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
