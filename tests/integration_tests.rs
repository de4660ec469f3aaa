use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceExt;

use voicedesk::config::AppConfig;
use voicedesk::db;
use voicedesk::handlers;
use voicedesk::services::voice::VoiceProvider;
use voicedesk::state::AppState;
use voicedesk::store::sqlite::SqliteStore;

// ── Mock Providers ──

struct MockVoice {
    registered: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockVoice {
    fn new() -> Self {
        Self {
            registered: Arc::new(Mutex::new(vec![])),
        }
    }
}

#[async_trait]
impl VoiceProvider for MockVoice {
    async fn register_prompt(
        &self,
        business_phone: &str,
        system_prompt: &str,
    ) -> anyhow::Result<()> {
        self.registered
            .lock()
            .unwrap()
            .push((business_phone.to_string(), system_prompt.to_string()));
        Ok(())
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        jwt_secret: "test-secret".to_string(),
        token_ttl_hours: 1,
        airtable_api_key: "".to_string(),
        airtable_base_id: "".to_string(),
        airtable_url: "".to_string(),
        vapi_api_key: "".to_string(),
        vapi_url: "".to_string(),
    }
}

fn test_state() -> Arc<AppState> {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        store: Box::new(SqliteStore::new(conn)),
        voice: Box::new(MockVoice::new()),
        config,
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/webhook/call", post(handlers::webhook::call_webhook))
        .route(
            "/api/reservations",
            get(handlers::reservations::list_reservations)
                .post(handlers::reservations::create_reservation),
        )
        .route(
            "/api/reservations/:id",
            get(handlers::reservations::get_reservation),
        )
        .route(
            "/api/reservations/:id/cancel",
            post(handlers::reservations::cancel_reservation),
        )
        .route("/api/pending", get(handlers::pending::list_pending))
        .route(
            "/api/pending/:id/promote",
            post(handlers::pending::promote_pending),
        )
        .route("/api/calls", get(handlers::calls::list_calls))
        .route("/api/dashboard/stats", get(handlers::dashboard::stats))
        .route(
            "/api/admin/users/:id/activate",
            post(handlers::admin::activate_user),
        )
        .route(
            "/api/admin/businesses",
            post(handlers::admin::create_business),
        )
        .with_state(state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_json_request(
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Signup, admin-activate, attach a business, and login. Returns the bearer
/// token for the new business.
async fn onboard_business(state: &Arc<AppState>, email: &str, phone: &str) -> String {
    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            serde_json::json!({
                "email": email,
                "password": "hunter2222",
                "business_name": "Mario's",
                "full_name": "Mario Rossi",
                "phone": "+15550001111",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user_id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(authed_json_request(
            "POST",
            &format!("/api/admin/users/{user_id}/activate"),
            "test-token",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state.clone())
        .oneshot(authed_json_request(
            "POST",
            "/api/admin/businesses",
            "test-token",
            serde_json::json!({
                "name": "Mario's Trattoria",
                "phone": phone,
                "owner_id": user_id,
                "business_type": "restaurant",
                "greeting": "Thanks for calling Mario's!",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/auth/login",
            serde_json::json!({ "email": email, "password": "hunter2222" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["token"].as_str().unwrap().to_string()
}

fn call_report(call_id: &str, number: &str, transcript: &str) -> Request<Body> {
    json_request(
        "POST",
        "/webhook/call",
        serde_json::json!({
            "message": {
                "type": "end-of-call-report",
                "call": { "id": call_id, "phoneNumber": { "number": number } },
                "transcript": transcript,
                "summary": "caller conversation",
            }
        }),
    )
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let res = test_app(test_state())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Auth ──

#[tokio::test]
async fn test_signup_rejects_bad_input() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            serde_json::json!({
                "email": "not-an-email",
                "password": "hunter2222",
                "business_name": "X",
                "full_name": "X",
                "phone": "1",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            serde_json::json!({
                "email": "a@b.com",
                "password": "short",
                "business_name": "X",
                "full_name": "X",
                "phone": "1",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let state = test_state();
    let body = serde_json::json!({
        "email": "dup@example.com",
        "password": "hunter2222",
        "business_name": "X",
        "full_name": "X",
        "phone": "1",
    });

    let res = test_app(state.clone())
        .oneshot(json_request("POST", "/auth/signup", body.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = test_app(state.clone())
        .oneshot(json_request("POST", "/auth/signup", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_blocked_until_activated() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            serde_json::json!({
                "email": "pending@example.com",
                "password": "hunter2222",
                "business_name": "X",
                "full_name": "X",
                "phone": "1",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/auth/login",
            serde_json::json!({ "email": "pending@example.com", "password": "hunter2222" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let state = test_state();
    onboard_business(&state, "owner@example.com", "+15551230000").await;

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/auth/login",
            serde_json::json!({ "email": "owner@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_onboard_and_login() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/reservations", &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_protected_endpoints_require_token() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/reservations")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = test_app(state.clone())
        .oneshot(authed_json_request(
            "POST",
            "/api/admin/users/u1/activate",
            "wrong-token",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ── Webhook ──

#[tokio::test]
async fn test_call_report_creates_reservation() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    let res = test_app(state.clone())
        .oneshot(call_report(
            "call-1",
            "+15551230000",
            "Hi, my name is Alice Smith. I'd like a table for four people tomorrow at 7pm. It's a birthday.",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["outcome"], "reservation_created");

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/reservations", &token))
        .await
        .unwrap();
    let reservations = body_json(res).await;
    let list = reservations.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["guest_name"], "Alice Smith");
    assert_eq!(list[0]["time"], "19:00");
    assert_eq!(list[0]["guests"], 4);
    assert_eq!(list[0]["special_requests"], "birthday");
    assert_eq!(list[0]["status"], "confirmed");

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/calls", &token))
        .await
        .unwrap();
    let calls = body_json(res).await;
    assert_eq!(calls.as_array().unwrap().len(), 1);
    assert_eq!(calls[0]["intent"], "new_reservation");
}

#[tokio::test]
async fn test_call_report_replay_is_idempotent() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    let transcript = "my name is Alice, table for two people tomorrow at 7pm";
    let res = test_app(state.clone())
        .oneshot(call_report("call-1", "+15551230000", transcript))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state.clone())
        .oneshot(call_report("call-1", "+15551230000", transcript))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["duplicate"], true);

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/reservations", &token))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/calls", &token))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ambiguous_call_is_staged() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    // bare "7" is not an unambiguous time
    let res = test_app(state.clone())
        .oneshot(call_report(
            "call-2",
            "+15551230000",
            "my name is Bob, table for two people tomorrow at 7",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["outcome"], "staged_for_review");

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/reservations", &token))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/pending", &token))
        .await
        .unwrap();
    let pending = body_json(res).await;
    let list = pending.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["reason"], "time missing");
    assert_eq!(list[0]["payload"]["guest_name"], "Bob");
}

#[tokio::test]
async fn test_inquiry_call_logs_without_staging() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    let res = test_app(state.clone())
        .oneshot(call_report(
            "call-3",
            "+15551230000",
            "what are your opening hours?",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["outcome"], "no_reservation");

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/pending", &token))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/calls", &token))
        .await
        .unwrap();
    let calls = body_json(res).await;
    assert_eq!(calls[0]["intent"], "hours_inquiry");
}

#[tokio::test]
async fn test_call_report_unknown_business() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(call_report("call-4", "+19998887777", "hello"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assistant_request_returns_prompt() {
    let state = test_state();
    onboard_business(&state, "owner@example.com", "+15551230000").await;

    let res = test_app(state.clone())
        .oneshot(json_request(
            "POST",
            "/webhook/call",
            serde_json::json!({
                "message": {
                    "type": "assistant-request",
                    "call": { "id": "call-5", "phoneNumber": { "number": "+15551230000" } },
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    let prompt = json["assistant"]["model"]["systemPrompt"].as_str().unwrap();
    assert!(prompt.contains("Mario's Trattoria"));
    assert_eq!(json["assistant"]["firstMessage"], "Thanks for calling Mario's!");
}

// ── Reservations ──

#[tokio::test]
async fn test_create_and_get_reservation() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    let res = test_app(state.clone())
        .oneshot(authed_json_request(
            "POST",
            "/api/reservations",
            &token,
            serde_json::json!({
                "guest_name": "Carol",
                "guest_phone": "5552223333",
                "date": "2026-09-15",
                "time": "19:30",
                "guests": 3,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = body_json(res).await;
    let id = created["id"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(authed_get(&format!("/api/reservations/{id}"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched = body_json(res).await;
    assert_eq!(fetched["guest_name"], "Carol");
    assert_eq!(fetched["date"], "2026-09-15");
    assert_eq!(fetched["time"], "19:30");
    assert_eq!(fetched["guests"], 3);
}

#[tokio::test]
async fn test_create_reservation_validation() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    for body in [
        serde_json::json!({ "guest_name": "", "date": "2026-09-15", "time": "19:30", "guests": 2 }),
        serde_json::json!({ "guest_name": "A", "date": "15/09/2026", "time": "19:30", "guests": 2 }),
        serde_json::json!({ "guest_name": "A", "date": "2026-09-15", "time": "7pm", "guests": 2 }),
        serde_json::json!({ "guest_name": "A", "date": "2026-09-15", "time": "19:30", "guests": 0 }),
        serde_json::json!({ "guest_name": "A", "date": "2026-09-15", "time": "19:30", "guests": 51 }),
    ] {
        let res = test_app(state.clone())
            .oneshot(authed_json_request("POST", "/api/reservations", &token, body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_cancel_twice_conflicts() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    let res = test_app(state.clone())
        .oneshot(authed_json_request(
            "POST",
            "/api/reservations",
            &token,
            serde_json::json!({
                "guest_name": "Dave",
                "date": "2026-09-15",
                "time": "18:00",
                "guests": 2,
            }),
        ))
        .await
        .unwrap();
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(authed_json_request(
            "POST",
            &format!("/api/reservations/{id}/cancel"),
            &token,
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "cancelled");

    let res = test_app(state.clone())
        .oneshot(authed_json_request(
            "POST",
            &format!("/api/reservations/{id}/cancel"),
            &token,
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_status_filter() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    for name in ["A", "B"] {
        let res = test_app(state.clone())
            .oneshot(authed_json_request(
                "POST",
                "/api/reservations",
                &token,
                serde_json::json!({
                    "guest_name": name,
                    "date": "2026-09-15",
                    "time": "18:00",
                    "guests": 2,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/reservations?status=cancelled", &token))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/reservations?status=nonsense", &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Pending review ──

#[tokio::test]
async fn test_promote_pending_reservation() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    let res = test_app(state.clone())
        .oneshot(call_report(
            "call-6",
            "+15551230000",
            "my name is Eve, table for two people tomorrow at 7",
        ))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["outcome"], "staged_for_review");

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/pending", &token))
        .await
        .unwrap();
    let pending = body_json(res).await;
    let pending_id = pending[0]["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(authed_json_request(
            "POST",
            &format!("/api/pending/{pending_id}/promote"),
            &token,
            serde_json::json!({
                "guest_name": "Eve",
                "date": "2026-09-20",
                "time": "19:00",
                "guests": 2,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/reservations", &token))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);

    // the staged record survives promotion as an audit trail
    let res = test_app(state.clone())
        .oneshot(authed_get("/api/pending", &token))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);
}

// ── Dashboard ──

#[tokio::test]
async fn test_dashboard_stats() {
    let state = test_state();
    let token = onboard_business(&state, "owner@example.com", "+15551230000").await;

    let transcripts = [
        ("call-a", "my name is Alice, table for two people tomorrow at 7pm"),
        ("call-b", "my name is Bob, table for two people tomorrow at 7"),
        ("call-c", "what are your opening hours?"),
    ];
    for (call_id, transcript) in transcripts {
        let res = test_app(state.clone())
            .oneshot(call_report(call_id, "+15551230000", transcript))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = test_app(state.clone())
        .oneshot(authed_get("/api/dashboard/stats", &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let stats = body_json(res).await;
    assert_eq!(stats["total_calls"], 3);
    assert_eq!(stats["reservations_created"], 1);
    assert_eq!(stats["staged_for_review"], 1);
    assert_eq!(stats["missed_calls"], 1);
    assert_eq!(stats["intent_breakdown"]["new_reservation"], 2);
    assert_eq!(stats["intent_breakdown"]["hours_inquiry"], 1);
    let by_hour: i64 = stats["calls_by_hour"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .sum();
    assert_eq!(by_hour, 3);
}
