use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use b2d_ventures_backend::app::create_app;
use b2d_ventures_backend::config::{AppConfig, StorageBackend};
use b2d_ventures_backend::external::calendar::{CalendarProvider, GoogleCalendar};
use b2d_ventures_backend::external::identity::GoogleIdentity;
use b2d_ventures_backend::external::notifier::{LogNotifier, Notifier, SmtpNotifier};
use b2d_ventures_backend::logging::{init_logging, LoggingConfig};
use b2d_ventures_backend::services::auth_service::{AdminAllowList, TokenKeys};
use b2d_ventures_backend::services::throttle::Throttles;
use b2d_ventures_backend::state::AppState;
use b2d_ventures_backend::store::{MemoryStore, PgStore, Store};

const THROTTLE_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config.database_url.as_deref().context("DATABASE_URL is not set")?;
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await
                .context("failed to connect to Postgres")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!("Using Postgres storage");
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            tracing::info!("Sending email through {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpNotifier::new(smtp).context("failed to build SMTP transport")?)
        }
        None => {
            tracing::info!("SMTP disabled; outgoing email is logged only");
            Arc::new(LogNotifier)
        }
    };

    let calendar: Option<Arc<dyn CalendarProvider>> = if config.calendar_enabled {
        tracing::info!("Calendar integration enabled");
        Some(Arc::new(GoogleCalendar::new()))
    } else {
        None
    };

    let throttles = Throttles::new(config.dataroom_throttle_secs, config.meeting_throttle_secs);
    let sweeper = throttles.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(THROTTLE_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sweeper.cleanup_expired(chrono::Utc::now());
            tracing::debug!("Throttle sweep done, {} entries live", sweeper.len());
        }
    });

    let state = AppState {
        store,
        notifier,
        identity: Arc::new(GoogleIdentity::new(&config.google)),
        calendar,
        tokens: TokenKeys::new(&config.jwt_secret, config.jwt_ttl_hours),
        admins: AdminAllowList::new(&config.admin_emails),
        throttles,
        fee_rate: config.platform_fee_rate.clone(),
    };
    let app = create_app(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("B2D Ventures backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
