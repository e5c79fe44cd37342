use anyhow::{anyhow, Context};
use shuttle_market::orchestration::spawn_finalizer;
use shuttle_market::{
    api, config::Config, db::init_db, AuctionService, Clock, HttpSessionResolver, PartnerService,
    PartnerSettings, Repository, RewardTable, SessionResolver, StaticSessionResolver, SystemClock,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let repo = Arc::new(Repository::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sessions: Arc<dyn SessionResolver> = match &config.auth_service_url {
        Some(url) => {
            tracing::info!(auth_service_url = %url, "Resolving sessions via auth service");
            Arc::new(HttpSessionResolver::new(url.clone()))
        }
        None => {
            let resolver = StaticSessionResolver::from_spec(&config.static_sessions)
                .map_err(|e| anyhow!("Invalid STATIC_SESSIONS: {}", e))?;
            tracing::warn!(sessions = resolver.len(), "AUTH_SERVICE_URL not set, using static sessions");
            Arc::new(resolver)
        }
    };

    let partners = PartnerService::new(
        repo.clone(),
        clock.clone(),
        RewardTable::default(),
        PartnerSettings::from_config(&config),
    );
    let auctions = AuctionService::new(
        repo.clone(),
        clock.clone(),
        config.amount_rules(),
        config.conflict_retries,
    );

    if config.finalize_interval_ms > 0 {
        spawn_finalizer(
            auctions.clone(),
            Duration::from_millis(config.finalize_interval_ms),
        );
    }

    let app = api::create_router(api::AppState::new(repo, partners, auctions, sessions, clock));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
