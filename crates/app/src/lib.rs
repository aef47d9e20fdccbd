//! Duet application composition root
//!
//! Chooses the storage backend, wires the messaging core and the reminder
//! sweep around it, and composes the domain routers into one application.

use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use duet_auth::{AuthBackend, AuthConfig};
use duet_common::Config;
use duet_messaging::{
    ConversationStore, InMemoryConversationStore, InMemoryPairDirectory, MessagingSettings,
    MessagingState, PairDirectory, PgConversationStore, PgPairDirectory,
};
use duet_reminders::{
    InMemoryReminderSource, InMemoryWatermarkStore, PgReminderSource, PgWatermarkStore,
    ReminderSource, ReminderSweep, WatermarkStore,
};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Storage handles shared by the domains
#[derive(Clone)]
pub struct Storage {
    pub pairs: Arc<dyn PairDirectory>,
    pub messages: Arc<dyn ConversationStore>,
    pub reminders: Arc<dyn ReminderSource>,
    pub watermarks: Arc<dyn WatermarkStore>,
}

impl Storage {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            pairs: Arc::new(PgPairDirectory::new(pool.clone())),
            messages: Arc::new(PgConversationStore::new(pool.clone())),
            reminders: Arc::new(PgReminderSource::new(pool.clone())),
            watermarks: Arc::new(PgWatermarkStore::new(pool)),
        }
    }

    /// In-memory storage around an existing pair directory
    pub fn in_memory(pairs: InMemoryPairDirectory) -> Self {
        Self {
            pairs: Arc::new(pairs),
            messages: Arc::new(InMemoryConversationStore::new()),
            reminders: Arc::new(InMemoryReminderSource::new()),
            watermarks: Arc::new(InMemoryWatermarkStore::new()),
        }
    }
}

/// Composed application: HTTP router plus the background sweep
pub struct Application {
    pub router: Router,
    pub messaging: MessagingState,
    pub sweep: ReminderSweep,
}

/// Connect storage according to configuration
pub async fn connect_storage(config: &Config) -> Result<Storage, anyhow::Error> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Database connection failed: {}", e))?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            tracing::info!("Database connection established");
            Ok(Storage::postgres(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Ok(Storage::in_memory(InMemoryPairDirectory::new()))
        }
    }
}

/// Create the main application from configuration and storage
pub fn create_app(config: &Config, storage: Storage) -> Application {
    let auth = AuthBackend::new(AuthConfig::from(config));

    let messaging = MessagingState::new(
        auth,
        Arc::clone(&storage.pairs),
        Arc::clone(&storage.messages),
        MessagingSettings::from(config),
    );

    let sweep = ReminderSweep::new(
        storage.reminders,
        storage.watermarks,
        storage.pairs,
        messaging.registry.clone(),
        config.reminder_sweep_interval(),
    );

    let router = Router::new()
        .route("/health", axum::routing::get(health_check))
        .route(
            "/",
            axum::routing::get(|| async { "Duet API v0.0.1-SNAPSHOT" }),
        )
        .merge(duet_messaging::routes().with_state(messaging.clone()));

    Application {
        router,
        messaging,
        sweep,
    }
}

/// CORS policy: listed origins, or permissive when none are configured
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
