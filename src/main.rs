use anyhow::Result;
use clap::Parser;
use pawmeet_jobs::handlers::{self, AppState};
use pawmeet_jobs::mailer::HttpMailClient;
use pawmeet_jobs::reengage::ReengagementRules;
use pawmeet_jobs::{config, db};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/pawmeet.db", cfg.app.data_dir));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let mailer = HttpMailClient::new(
        cfg.mailer.api_token.clone(),
        cfg.mailer.from_address.clone(),
    );
    let state = AppState {
        pool,
        mailer: Arc::new(mailer),
        rules: ReengagementRules::from_days(
            cfg.engine.dormancy_days,
            cfg.engine.nudge_cooldown_days,
        ),
        trigger_token: cfg.app.trigger_token.clone(),
        run_timeout: Duration::from_secs(cfg.engine.run_timeout_seconds),
    };

    let app = handlers::router(state);
    let listener = tokio::net::TcpListener::bind(&cfg.app.bind_addr).await?;
    info!(addr = %cfg.app.bind_addr, "serving trigger endpoints");
    axum::serve(listener, app).await?;

    Ok(())
}
