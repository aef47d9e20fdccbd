//! Conversation REST handlers
//!
//! Backfill is the reconciliation path for clients that were offline. The
//! send and seen endpoints are fallbacks for clients without a live socket;
//! they run through the same router and reconciler as socket frames.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use duet_common::{BackfillQuery, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::MessagingState;
use crate::domain::entities::{ContentKind, Pair, PairCode};
use crate::domain::errors::DeliveryError;
use crate::domain::protocol::MessageEvent;
use crate::service::resolve_pair;
use duet_auth::AuthUser;

/// Request for sending a message without a socket
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Content kind; defaults to text
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ContentKind,

    /// Text body or media URI
    #[validate(length(max = 16384))]
    pub content: String,
}

fn default_kind() -> ContentKind {
    ContentKind::Text
}

/// One page of the conversation log
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<MessageEvent>,
    /// Pass as `since` to fetch the next page
    pub next_since: i64,
    pub has_more: bool,
}

/// Result of a mark-seen request
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkSeenResponse {
    pub updated: usize,
    pub message_ids: Vec<Uuid>,
}

/// Resolve the pair from the path and check the caller belongs to it
async fn member_pair(
    state: &MessagingState,
    raw_pair_id: &str,
    participant_id: Uuid,
) -> std::result::Result<Pair, DeliveryError> {
    let pair_id = PairCode::parse(raw_pair_id)?;
    let pair = resolve_pair(state.pairs.as_ref(), &pair_id).await?;
    pair.require_member(participant_id)?;
    Ok(pair)
}

/// List messages after a sequence number
///
/// **GET /v1/pairs/{pair_id}/messages?since=&limit=**
pub async fn list_messages(
    AuthUser(auth): AuthUser,
    State(state): State<MessagingState>,
    Path(pair_id): Path<String>,
    Query(query): Query<BackfillQuery>,
) -> Result<Json<MessagePage>> {
    let pair = member_pair(&state, &pair_id, auth.participant_id).await?;

    let limit = query.limit();
    let page = state.store.list_page(&pair.id, query.since(), limit).await?;

    let next_since = page.last().map(|m| m.sequence).unwrap_or(query.since());
    let has_more = page.len() as i64 == limit;

    tracing::debug!(
        pair_id = %pair.id,
        participant_id = %auth.participant_id,
        since = query.since(),
        count = page.len(),
        "Backfill page served"
    );

    Ok(Json(MessagePage {
        messages: page.iter().map(MessageEvent::historical).collect(),
        next_since,
        has_more,
    }))
}

/// Send a message without a live socket
///
/// **POST /v1/pairs/{pair_id}/messages**
pub async fn send_message(
    AuthUser(auth): AuthUser,
    State(state): State<MessagingState>,
    Path(pair_id): Path<String>,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageEvent>)> {
    let pair_id = PairCode::parse(pair_id).map_err(duet_common::Error::from)?;

    let message = state
        .router
        .send(&pair_id, auth.participant_id, req.kind, req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageEvent::live(&message))))
}

/// Mark everything the peer has sent as seen
///
/// **POST /v1/pairs/{pair_id}/seen**
pub async fn mark_seen(
    AuthUser(auth): AuthUser,
    State(state): State<MessagingState>,
    Path(pair_id): Path<String>,
) -> Result<Json<MarkSeenResponse>> {
    let pair_id = PairCode::parse(pair_id).map_err(duet_common::Error::from)?;

    let changed = state
        .seen
        .handle_mark_seen(&pair_id, auth.participant_id)
        .await?;

    Ok(Json(MarkSeenResponse {
        updated: changed.len(),
        message_ids: changed.iter().map(|m| m.id).collect(),
    }))
}
