use anyhow::Result;
use courier_chats::{CommentService, ConversationService, MessageService, UserService};
use courier_config::AppConfig;
use courier_database::initialize_database;
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use courier_config::LoggingConfig;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// Install the global subscriber. `RUST_LOG` takes precedence over the
    /// configured filter.
    pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Every service wired to one migrated pool.
#[derive(Clone)]
pub struct CourierServices {
    pub db_pool: SqlitePool,
    pub users: UserService,
    pub conversations: ConversationService,
    pub messages: MessageService,
    pub comments: CommentService,
}

impl CourierServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;

        let messages =
            MessageService::new(db_pool.clone()).with_default_sort(config.store.default_sort);

        info!(
            default_sort = %config.store.default_sort,
            "courier services ready"
        );

        Ok(Self {
            users: UserService::new(db_pool.clone()),
            conversations: ConversationService::new(db_pool.clone()),
            comments: CommentService::new(db_pool.clone()),
            messages,
            db_pool,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
