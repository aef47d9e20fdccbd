//! Messaging domain state and auth backend integration

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use duet_auth::AuthBackend;
use duet_common::Config;

use crate::repository::{ConversationStore, PairDirectory};
use crate::service::{
    ConnectionRegistry, DeliveryRouter, PairLocks, SeenReconciler, SessionGateway,
};

/// Tunables for the realtime path
#[derive(Debug, Clone, Copy)]
pub struct MessagingSettings {
    /// Socket closed after this long without an inbound frame
    pub idle_timeout: Duration,
    /// Page size used when replaying history on connect
    pub replay_page_size: i64,
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            replay_page_size: crate::repository::log::DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<&Config> for MessagingSettings {
    fn from(config: &Config) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            replay_page_size: config.backfill_page_size,
        }
    }
}

/// Application state for the Messaging domain
#[derive(Clone)]
pub struct MessagingState {
    pub pairs: Arc<dyn PairDirectory>,
    pub store: Arc<dyn ConversationStore>,
    pub registry: ConnectionRegistry,
    pub router: DeliveryRouter,
    pub seen: SeenReconciler,
    pub gateway: SessionGateway,
    pub auth: AuthBackend,
    pub settings: MessagingSettings,
}

impl MessagingState {
    /// Wire the realtime core around the given storage
    pub fn new(
        auth: AuthBackend,
        pairs: Arc<dyn PairDirectory>,
        store: Arc<dyn ConversationStore>,
        settings: MessagingSettings,
    ) -> Self {
        let registry = ConnectionRegistry::new(Arc::clone(&pairs));
        let locks = PairLocks::new();
        let router = DeliveryRouter::new(
            Arc::clone(&pairs),
            Arc::clone(&store),
            registry.clone(),
            locks.clone(),
        );
        let seen = SeenReconciler::new(
            Arc::clone(&pairs),
            Arc::clone(&store),
            registry.clone(),
            locks.clone(),
        );
        let gateway = SessionGateway::new(
            auth.clone(),
            Arc::clone(&store),
            registry.clone(),
            router.clone(),
            seen.clone(),
            locks,
        )
        .with_replay_page_size(settings.replay_page_size);

        Self {
            pairs,
            store,
            registry,
            router,
            seen,
            gateway,
            auth,
            settings,
        }
    }
}

impl FromRef<MessagingState> for AuthBackend {
    fn from_ref(state: &MessagingState) -> Self {
        state.auth.clone()
    }
}
