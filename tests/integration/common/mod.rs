//! Common test utilities and fixtures for integration tests
//!
//! Builds the full application around in-memory storage so scenarios run
//! without a database. Sockets are stood in for by channel-backed
//! `ConnectionHandle`s, which is exactly what the socket adapter drives.

#![allow(dead_code)]

use std::env;
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use duet_app::{Application, Storage};
use duet_auth::DuetClaims;
use duet_common::Config;
use duet_messaging::{
    ConnectOptions, ConnectionHandle, ConversationStore, InMemoryConversationStore,
    InMemoryPairDirectory, Message, MessagingState, NewMessage, Outbound, Pair, PairCode,
    Participant, ServerEvent, Session,
};
use duet_reminders::{InMemoryReminderSource, InMemoryWatermarkStore, ReminderSweep};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Test environment configuration
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub jwt_secret: String,
    pub database_url: Option<String>,
}

impl TestConfig {
    pub fn from_env() -> Self {
        INIT.call_once(|| {
            dotenvy::from_filename(".env.test").ok();
            dotenvy::dotenv().ok();
        });

        Self {
            jwt_secret: env::var("TEST_JWT_SECRET")
                .unwrap_or_else(|_| "test_secret_key_for_testing_only".to_string()),
            database_url: env::var("TEST_DATABASE_URL").ok(),
        }
    }

    pub fn app_config(&self) -> Config {
        Config {
            database_url: None,
            jwt_secret: self.jwt_secret.clone(),
            jwt_issuer: None,
            jwt_audience: None,
            idle_timeout_secs: 60,
            reminder_sweep_interval_secs: 60,
            backfill_page_size: 100,
            cors_allowed_origins: None,
            rust_log: "duet=debug".to_string(),
            port: 0,
        }
    }
}

/// In-memory conversation store whose page reads take `delay`
pub struct SlowPagesStore {
    inner: Arc<InMemoryConversationStore>,
    delay: Duration,
}

#[async_trait]
impl ConversationStore for SlowPagesStore {
    async fn append(&self, message: NewMessage) -> duet_common::Result<Message> {
        self.inner.append(message).await
    }

    async fn mark_seen(
        &self,
        pair_id: &PairCode,
        up_to: i64,
        seen_by: Uuid,
    ) -> duet_common::Result<Vec<Message>> {
        self.inner.mark_seen(pair_id, up_to, seen_by).await
    }

    async fn list_page(
        &self,
        pair_id: &PairCode,
        after: i64,
        limit: i64,
    ) -> duet_common::Result<Vec<Message>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.list_page(pair_id, after, limit).await
    }

    async fn latest_peer_sequence(
        &self,
        pair_id: &PairCode,
        requester: Uuid,
    ) -> duet_common::Result<Option<i64>> {
        self.inner.latest_peer_sequence(pair_id, requester).await
    }
}

/// Test application wired on in-memory storage
pub struct TestApp {
    pub config: TestConfig,
    pub router: Router,
    pub messaging: MessagingState,
    pub sweep: ReminderSweep,
    pub directory: Arc<InMemoryPairDirectory>,
    pub messages: Arc<InMemoryConversationStore>,
    pub reminders: Arc<InMemoryReminderSource>,
    pub watermarks: Arc<InMemoryWatermarkStore>,
    pub pair: Pair,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_page_delay(Duration::ZERO)
    }

    /// Application whose history reads are slowed by `delay`
    pub fn with_page_delay(delay: Duration) -> Self {
        let config = TestConfig::from_env();

        let directory = Arc::new(InMemoryPairDirectory::new());
        let messages = Arc::new(InMemoryConversationStore::new());
        let reminders = Arc::new(InMemoryReminderSource::new());
        let watermarks = Arc::new(InMemoryWatermarkStore::new());

        let pair = test_pair();
        directory.insert(pair.clone());

        let storage = Storage {
            pairs: directory.clone(),
            messages: Arc::new(SlowPagesStore {
                inner: messages.clone(),
                delay,
            }),
            reminders: reminders.clone(),
            watermarks: watermarks.clone(),
        };

        let Application {
            router,
            messaging,
            sweep,
        } = duet_app::create_app(&config.app_config(), storage);

        Self {
            config,
            router,
            messaging,
            sweep,
            directory,
            messages,
            reminders,
            watermarks,
            pair,
        }
    }

    pub fn alex(&self) -> &Participant {
        &self.pair.participant_a
    }

    pub fn jordan(&self) -> &Participant {
        &self.pair.participant_b
    }

    pub fn token(&self, who: &Participant) -> String {
        create_test_jwt(who, &self.config.jwt_secret)
    }

    /// Open a session for `who` on the test pair
    pub async fn connect(&self, who: &Participant) -> TestClient {
        self.connect_with(who, ConnectOptions::default()).await
    }

    pub async fn connect_with(&self, who: &Participant, options: ConnectOptions) -> TestClient {
        let (handle, rx) = ConnectionHandle::channel();
        let session = self
            .messaging
            .gateway
            .connect(self.pair.id.as_str(), &self.token(who), handle, options)
            .await
            .unwrap();
        TestClient { session, rx }
    }

    /// Messages currently persisted for the test pair, in sequence order
    pub fn stored(&self) -> Vec<duet_messaging::Message> {
        self.messages.messages(&self.pair.id)
    }
}

/// A connected session plus the events its socket would have written
pub struct TestClient {
    pub session: Session,
    pub rx: UnboundedReceiver<Outbound>,
}

impl TestClient {
    pub async fn send_text(&mut self, content: &str) {
        let frame = serde_json::json!({"type": "text", "content": content}).to_string();
        self.session.handle_text(&frame).await.unwrap();
    }

    pub async fn mark_seen(&mut self) {
        self.session
            .handle_text(r#"{"type":"mark_seen"}"#)
            .await
            .unwrap();
    }

    /// Drain everything queued so far
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut items = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }

    /// Drain and keep only events
    pub fn events(&mut self) -> Vec<ServerEvent> {
        self.drain()
            .into_iter()
            .filter_map(|item| match item {
                Outbound::Event(event) => Some(event),
                Outbound::Close(_) => None,
            })
            .collect()
    }
}

pub fn test_pair() -> Pair {
    Pair::new(
        PairCode::parse("DUET42").unwrap(),
        Participant::new(Uuid::new_v4(), "Alex", "alex@duet.test"),
        Participant::new(Uuid::new_v4(), "Jordan", "jordan@duet.test"),
    )
    .unwrap()
}

/// Create a test JWT for a participant, shaped like the login service's
pub fn create_test_jwt(who: &Participant, secret: &str) -> String {
    use jsonwebtoken::{Algorithm, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as u64;
    let claims = DuetClaims {
        sub: who.user_id.to_string(),
        email: Some(who.email.clone()),
        name: Some(who.display_name.clone()),
        iat: now,
        exp: now + 3600,
        aud: None,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .unwrap()
}

/// Build an authenticated request
pub fn authed_request(method: Method, uri: &str, jwt: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", jwt));

    match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&b).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Parse a response body as JSON
pub async fn parse_body(response: axum::http::Response<Body>) -> Result<Value> {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}
