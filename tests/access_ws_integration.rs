//! Integration tests for the access WebSocket + REST surface.
//!
//! Each test spins up an Axum server on a random port, connects via
//! tokio-tungstenite / reqwest, and exercises the real WS / REST contract.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use mentorhub::access::{AccessHub, access_routes};
use mentorhub::onboarding::{OnboardingManager, OnboardingRouteState, onboarding_routes};
use mentorhub::profile::{LibSqlStore, Profile, ProfileStore, Role};
use mentorhub::session::IdentityId;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port, return (port, hub, store).
async fn start_server() -> (u16, Arc<AccessHub>, Arc<LibSqlStore>) {
    let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
    let hub = AccessHub::new(Arc::clone(&store) as Arc<dyn ProfileStore>);
    let manager = Arc::new(OnboardingManager::new(
        Arc::clone(&store) as Arc<dyn ProfileStore>
    ));

    let app = access_routes(
        Arc::clone(&hub),
        Arc::clone(&store) as Arc<dyn ProfileStore>,
    )
    .merge(onboarding_routes(OnboardingRouteState {
        manager,
        hub: Arc::clone(&hub),
    }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, hub, store)
}

/// Seed a profile with the given role, returning its identity.
async fn seed_profile(store: &Arc<LibSqlStore>, role: Role) -> IdentityId {
    let profile = Profile::new(IdentityId::new(), role);
    store.insert_profile(&profile).await.unwrap();
    profile.identity
}

/// Parse a WS text frame into a serde_json::Value.
fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

// ── WebSocket Tests ──────────────────────────────────────────────────

#[tokio::test]
async fn ws_connect_receives_initial_sync() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, _store) = start_server().await;

        let (mut ws, _resp) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .expect("WS connect failed");

        // First message is a sync with the current resolution (still loading:
        // the identity provider hasn't settled).
        let msg = ws.next().await.unwrap().unwrap();
        let json = parse_ws_json(&msg);

        assert_eq!(json["type"], "sync");
        assert_eq!(json["resolution"]["surface"], "loading");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_receives_update_on_sign_in() {
    timeout(TEST_TIMEOUT, async {
        let (port, hub, store) = start_server().await;
        let identity = seed_profile(&store, Role::Admin).await;

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();

        // Consume the initial sync.
        let _ = ws.next().await.unwrap().unwrap();

        hub.sign_in(identity).await;

        let msg = ws.next().await.unwrap().unwrap();
        let json = parse_ws_json(&msg);

        assert_eq!(json["type"], "access_update");
        assert_eq!(json["resolution"]["surface"], "main_app");
        assert_eq!(json["resolution"]["role"], "admin");
        let routes = json["resolution"]["routes"].as_array().unwrap();
        assert!(routes.iter().any(|r| r == "users"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_observes_onboarding_progress_and_sign_out() {
    timeout(TEST_TIMEOUT, async {
        let (port, hub, store) = start_server().await;
        let identity = seed_profile(&store, Role::Mentee).await;

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        hub.sign_in(identity).await;
        let json = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(json["resolution"]["surface"], "account_setup");

        // Account setup completes over REST; the WS client sees the move.
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/onboarding/account-setup"))
            .json(&serde_json::json!({"display_name": "Kit"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let json = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(json["type"], "access_update");
        assert_eq!(json["resolution"]["surface"], "onboarding");
        assert_eq!(json["resolution"]["step"], "welcome");

        hub.sign_out().await;
        let json = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(json["resolution"]["surface"], "unauthenticated");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn multiple_ws_clients_receive_broadcasts() {
    timeout(TEST_TIMEOUT, async {
        let (port, hub, store) = start_server().await;
        let identity = seed_profile(&store, Role::Admin).await;

        let (mut ws1, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();
        let (mut ws2, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();

        // Consume initial syncs.
        let _ = ws1.next().await.unwrap().unwrap();
        let _ = ws2.next().await.unwrap().unwrap();

        hub.sign_in(identity).await;

        let json1 = parse_ws_json(&ws1.next().await.unwrap().unwrap());
        let json2 = parse_ws_json(&ws2.next().await.unwrap().unwrap());
        assert_eq!(json1["type"], "access_update");
        assert_eq!(json2["type"], "access_update");
        assert_eq!(json1["resolution"]["surface"], "main_app");
        assert_eq!(json2["resolution"]["surface"], "main_app");
    })
    .await
    .expect("test timed out");
}

// ── REST Endpoint Tests ──────────────────────────────────────────────

#[tokio::test]
async fn rest_health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, _store) = start_server().await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "mentorhub-access");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_sign_in_without_profile_resolves_account_setup() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, _store) = start_server().await;

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/session/sign-in"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["resolution"]["surface"], "account_setup");
        assert!(body["identity"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_onboarding_walk_reaches_main_app() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, store) = start_server().await;
        let identity = seed_profile(&store, Role::Mentee).await;

        let client = reqwest::Client::new();
        client
            .post(format!("http://127.0.0.1:{port}/api/session/sign-in"))
            .json(&serde_json::json!({"identity": identity}))
            .send()
            .await
            .unwrap();

        // account_setup → welcome
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/onboarding/account-setup"))
            .json(&serde_json::json!({"display_name": "Noor"}))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["outcome"], "applied");
        assert_eq!(body["step"], "welcome");

        // welcome → ... → readiness_check
        for expected in [
            "profile_setup",
            "goal_setting",
            "tool_setup",
            "group_assignment",
            "readiness_check",
        ] {
            let resp = client
                .post(format!("http://127.0.0.1:{port}/api/onboarding/advance"))
                .send()
                .await
                .unwrap();
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["outcome"], "applied");
            assert_eq!(body["step"], expected, "steps must not be skipped");
        }

        // Step back once and forward again.
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/onboarding/retreat"))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["step"], "group_assignment");
        client
            .post(format!("http://127.0.0.1:{port}/api/onboarding/advance"))
            .send()
            .await
            .unwrap();

        // Terminal transition.
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/onboarding/complete"))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["outcome"], "applied");
        assert_eq!(body["step"], "completed");

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/api/access/state"))
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["surface"], "main_app");
        assert_eq!(body["role"], "mentee");

        let status: Value = reqwest::get(format!(
            "http://127.0.0.1:{port}/api/onboarding/status"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(status["step"], "completed");
        assert_eq!(status["is_onboarding_complete"], true);
        assert_eq!(status["display_name"], "Noor");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_onboarding_requires_sign_in() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, _store) = start_server().await;

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/onboarding/advance"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_route_gate_redirects_while_onboarding() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, store) = start_server().await;
        let identity = seed_profile(&store, Role::Mentee).await;

        let client = reqwest::Client::new();
        client
            .post(format!("http://127.0.0.1:{port}/api/session/sign-in"))
            .json(&serde_json::json!({"identity": identity}))
            .send()
            .await
            .unwrap();

        let resp = reqwest::get(format!(
            "http://127.0.0.1:{port}/api/access/routes/dashboard"
        ))
        .await
        .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["decision"]["gate"], "redirect");
        assert_eq!(body["decision"]["to"]["surface"], "account_setup");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_unknown_route_family_returns_400() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, _store) = start_server().await;

        let resp = reqwest::get(format!(
            "http://127.0.0.1:{port}/api/access/routes/billing"
        ))
        .await
        .unwrap();
        assert_eq!(resp.status(), 400);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_preview_set_and_exit() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, store) = start_server().await;
        let identity = seed_profile(&store, Role::Admin).await;

        let client = reqwest::Client::new();
        client
            .post(format!("http://127.0.0.1:{port}/api/session/sign-in"))
            .json(&serde_json::json!({"identity": identity}))
            .send()
            .await
            .unwrap();

        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/preview"))
            .json(&serde_json::json!({"role": "mentor"}))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["applied"], true);
        assert_eq!(body["resolution"]["role"], "mentor");

        // Scenario D over the wire: mentor-kit reachable, users not.
        let gate_body: Value = reqwest::get(format!(
            "http://127.0.0.1:{port}/api/access/routes/mentor-kit"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(gate_body["decision"]["gate"], "allow");

        let gate_body: Value = reqwest::get(format!(
            "http://127.0.0.1:{port}/api/access/routes/users"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(gate_body["decision"]["gate"], "redirect");

        let resp = client
            .delete(format!("http://127.0.0.1:{port}/api/preview"))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["role"], "admin");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_preview_is_a_noop_for_non_admin() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, store) = start_server().await;
        let identity = seed_profile(&store, Role::Mentor).await;
        store
            .set_onboarding(identity, mentorhub::onboarding::OnboardingStep::Completed, true)
            .await
            .unwrap();

        let client = reqwest::Client::new();
        client
            .post(format!("http://127.0.0.1:{port}/api/session/sign-in"))
            .json(&serde_json::json!({"identity": identity}))
            .send()
            .await
            .unwrap();

        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/preview"))
            .json(&serde_json::json!({"role": "mentee"}))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["applied"], false);
        assert_eq!(body["resolution"]["role"], "mentor");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_admin_endpoints_enforce_real_role() {
    timeout(TEST_TIMEOUT, async {
        let (port, _hub, store) = start_server().await;
        let admin = seed_profile(&store, Role::Admin).await;
        let mentee = seed_profile(&store, Role::Mentee).await;

        let client = reqwest::Client::new();

        // Signed in as the mentee: forbidden.
        client
            .post(format!("http://127.0.0.1:{port}/api/session/sign-in"))
            .json(&serde_json::json!({"identity": mentee}))
            .send()
            .await
            .unwrap();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/admin/role"))
            .json(&serde_json::json!({"identity": mentee, "role": "admin"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);

        // Signed in as the admin: allowed, even while previewing.
        client
            .post(format!("http://127.0.0.1:{port}/api/session/sign-in"))
            .json(&serde_json::json!({"identity": admin}))
            .send()
            .await
            .unwrap();
        client
            .post(format!("http://127.0.0.1:{port}/api/preview"))
            .json(&serde_json::json!({"role": "mentee"}))
            .send()
            .await
            .unwrap();

        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/admin/role"))
            .json(&serde_json::json!({"identity": mentee, "role": "mentor"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let group = uuid::Uuid::new_v4();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/admin/group"))
            .json(&serde_json::json!({"identity": mentee, "group_id": group}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let profile = store.get_profile(mentee).await.unwrap().unwrap();
        assert_eq!(profile.role, Role::Mentor);
        assert_eq!(profile.group_id, Some(group));

        // Unknown identity: 404.
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/admin/role"))
            .json(&serde_json::json!({"identity": uuid::Uuid::new_v4(), "role": "mentor"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    })
    .await
    .expect("test timed out");
}
