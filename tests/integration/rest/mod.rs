//! REST backfill and fallback endpoints

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use duet_messaging::{MAX_PAYLOAD_LENGTH, Participant, ServerEvent};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::{authed_request, parse_body, TestApp};

mod test_list_messages {
    use super::*;

    #[tokio::test]
    async fn test_backfill_returns_messages_after_since() {
        let app = TestApp::new();
        let mut alex = app.connect(app.alex()).await;
        for text in ["a", "b", "c"] {
            alex.send_text(text).await;
        }

        let jwt = app.token(app.jordan());
        let req = authed_request(Method::GET, "/v1/pairs/DUET42/messages?since=1", &jwt, None);
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = parse_body(resp).await.unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["sequence"], 2);
        assert_eq!(messages[0]["content"], "b");
        assert_eq!(messages[0]["senderEmail"], "alex@duet.test");
        assert_eq!(messages[0]["isHistorical"], true);
        assert_eq!(messages[1]["sequence"], 3);
        assert_eq!(body["next_since"], 3);
        assert_eq!(body["has_more"], false);
    }

    #[tokio::test]
    async fn test_backfill_pagination() {
        let app = TestApp::new();
        let mut alex = app.connect(app.alex()).await;
        for i in 1..=5 {
            alex.send_text(&format!("m{}", i)).await;
        }
        let jwt = app.token(app.alex());

        let req = authed_request(Method::GET, "/v1/pairs/DUET42/messages?limit=2", &jwt, None);
        let body = parse_body(app.router.clone().oneshot(req).await.unwrap())
            .await
            .unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["next_since"], 2);
        assert_eq!(body["has_more"], true);

        let req = authed_request(
            Method::GET,
            "/v1/pairs/DUET42/messages?since=4&limit=2",
            &jwt,
            None,
        );
        let body = parse_body(app.router.clone().oneshot(req).await.unwrap())
            .await
            .unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["next_since"], 5);
        assert_eq!(body["has_more"], false);
    }

    #[tokio::test]
    async fn test_backfill_requires_token() {
        let app = TestApp::new();
        let req = Request::builder()
            .uri("/v1/pairs/DUET42/messages")
            .body(Body::empty())
            .unwrap();

        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_backfill_rejects_outsider() {
        let app = TestApp::new();
        let outsider = Participant::new(Uuid::new_v4(), "Sam", "sam@duet.test");
        let jwt = app.token(&outsider);

        let req = authed_request(Method::GET, "/v1/pairs/DUET42/messages", &jwt, None);
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let body = parse_body(resp).await.unwrap();
        assert!(body["error"]["code"].is_string());
    }

    #[tokio::test]
    async fn test_backfill_unknown_pair() {
        let app = TestApp::new();
        let jwt = app.token(app.alex());

        let req = authed_request(Method::GET, "/v1/pairs/ELSEWHERE/messages", &jwt, None);
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

mod test_send_message {
    use super::*;

    #[tokio::test]
    async fn test_rest_send_persists_and_pushes_to_live_peer() {
        let app = TestApp::new();
        let mut jordan = app.connect(app.jordan()).await;
        let jwt = app.token(app.alex());

        let req = authed_request(
            Method::POST,
            "/v1/pairs/DUET42/messages",
            &jwt,
            Some(json!({"content": "sent without a socket"})),
        );
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = parse_body(resp).await.unwrap();
        assert_eq!(body["sequence"], 1);
        assert_eq!(body["kind"], "text");
        assert_eq!(body["content"], "sent without a socket");

        assert_eq!(app.stored().len(), 1);
        assert!(matches!(
            jordan.events().as_slice(),
            [ServerEvent::Message(m)] if m.sequence == 1 && m.content == "sent without a socket"
        ));
    }

    #[tokio::test]
    async fn test_rest_and_socket_sends_share_one_sequence() {
        let app = TestApp::new();
        let mut alex = app.connect(app.alex()).await;
        alex.send_text("over the socket").await;

        let jwt = app.token(app.jordan());
        let req = authed_request(
            Method::POST,
            "/v1/pairs/DUET42/messages",
            &jwt,
            Some(json!({"type": "audio", "content": "https://cdn.duet.test/a/1.m4a"})),
        );
        let body = parse_body(app.router.clone().oneshot(req).await.unwrap())
            .await
            .unwrap();

        assert_eq!(body["sequence"], 2);
        assert_eq!(body["kind"], "audio");
    }

    #[tokio::test]
    async fn test_rest_send_rejects_blank_text() {
        let app = TestApp::new();
        let jwt = app.token(app.alex());

        let req = authed_request(
            Method::POST,
            "/v1/pairs/DUET42/messages",
            &jwt,
            Some(json!({"type": "text", "content": "   "})),
        );
        let resp = app.router.clone().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(app.stored().is_empty());
    }

    #[tokio::test]
    async fn test_rest_send_enforces_payload_limit() {
        let app = TestApp::new();
        let jwt = app.token(app.alex());
        let send = |content: String| {
            authed_request(
                Method::POST,
                "/v1/pairs/DUET42/messages",
                &jwt,
                Some(json!({ "content": content })),
            )
        };

        let oversized = "x".repeat(MAX_PAYLOAD_LENGTH + 1);
        let resp = app.router.clone().oneshot(send(oversized)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(app.stored().is_empty());

        let at_limit = "x".repeat(MAX_PAYLOAD_LENGTH);
        let resp = app.router.clone().oneshot(send(at_limit)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(app.stored().len(), 1);
    }
}

mod test_mark_seen {
    use super::*;

    #[tokio::test]
    async fn test_rest_mark_seen_notifies_sender_once() {
        let app = TestApp::new();
        let mut alex = app.connect(app.alex()).await;
        alex.send_text("one").await;
        alex.send_text("two").await;
        alex.drain();

        let jwt = app.token(app.jordan());

        let req = authed_request(Method::POST, "/v1/pairs/DUET42/seen", &jwt, None);
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await.unwrap();
        assert_eq!(body["updated"], 2);
        assert_eq!(body["message_ids"].as_array().unwrap().len(), 2);

        let updates = alex
            .events()
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::SeenUpdate { .. }))
            .count();
        assert_eq!(updates, 2);

        let req = authed_request(Method::POST, "/v1/pairs/DUET42/seen", &jwt, None);
        let body = parse_body(app.router.clone().oneshot(req).await.unwrap())
            .await
            .unwrap();
        assert_eq!(body["updated"], 0);
        assert!(alex.events().is_empty());
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
