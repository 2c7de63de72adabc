//! End-to-end transition flows against in-memory adapters.
//!
//! Covers the state machine, its post-commit side effects (audit, push,
//! realtime, stored notification) and the HTTP surface in front of it.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use labtrack::adapters::auth::MockSessionValidator;
use labtrack::adapters::http::{api_router, AuthState, NotificationAppState, SampleAppState};
use labtrack::adapters::memory::{
    InMemoryAuditLogger, InMemoryDeviceTokenRepository, InMemoryNotificationRepository,
    InMemoryResultReader, InMemorySampleRepository,
};
use labtrack::adapters::push::SandboxPushProvider;
use labtrack::adapters::websocket::{RealtimeHub, ServerMessage, WebSocketState};
use labtrack::application::{
    DeviceTokenRegistry, DispatchConfig, GetSampleHandler, InboxConfig, NotificationDispatcher,
    NotificationInbox, RegisterDeviceCommand, SampleStateMachine, SideEffectConfig,
    SideEffectRunner, TransitionSampleCommand, NOTIFICATION_EVENT,
};
use labtrack::domain::audit::AuditRecord;
use labtrack::domain::foundation::{ClientId, ClientPrincipal, SampleId, UserId};
use labtrack::domain::notification::{DeviceInfo, Platform};
use labtrack::domain::sample::{Actor, Sample, SampleOwner, SampleState, TransitionError};
use labtrack::ports::SampleRepository;

const STAFF_TOKEN: &str = "staff-token";
const CLIENT_TOKEN: &str = "client-token";
const OTHER_CLIENT_TOKEN: &str = "other-client-token";

struct Lab {
    samples: Arc<InMemorySampleRepository>,
    results: Arc<InMemoryResultReader>,
    audit: Arc<InMemoryAuditLogger>,
    notifications: Arc<InMemoryNotificationRepository>,
    push: Arc<SandboxPushProvider>,
    hub: Arc<RealtimeHub>,
    registry: Arc<DeviceTokenRegistry>,
    inbox: Arc<NotificationInbox>,
    runner: Arc<SideEffectRunner>,
    machine: Arc<SampleStateMachine>,
}

impl Lab {
    fn new() -> Self {
        let samples = Arc::new(InMemorySampleRepository::new());
        let results = Arc::new(InMemoryResultReader::new());
        let audit = Arc::new(InMemoryAuditLogger::new());
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let push = Arc::new(SandboxPushProvider::new());
        let hub = Arc::new(RealtimeHub::new(notifications.clone(), 5, 16));
        let registry = Arc::new(DeviceTokenRegistry::new(Arc::new(
            InMemoryDeviceTokenRepository::new(),
        )));
        let inbox = Arc::new(NotificationInbox::new(
            notifications.clone(),
            InboxConfig::default(),
        ));
        let runner = SideEffectRunner::start(SideEffectConfig::default());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            notifications.clone(),
            registry.clone(),
            push.clone(),
            hub.clone(),
            DispatchConfig::default(),
        ));
        let machine = Arc::new(SampleStateMachine::new(
            samples.clone(),
            results.clone(),
            audit.clone(),
            dispatcher,
            runner.clone(),
        ));

        Self {
            samples,
            results,
            audit,
            notifications,
            push,
            hub,
            registry,
            inbox,
            runner,
            machine,
        }
    }

    async fn seed(&self, id: &str, client: &str, analyses: &[&str]) -> SampleId {
        let sample = Sample::register(
            SampleId::new(id).unwrap(),
            SampleOwner::new(Some(ClientId::new(client).unwrap()), None).unwrap(),
            analyses.iter().map(|a| a.to_string()).collect(),
            admin(),
        );
        self.samples.save(&sample).await.unwrap();
        sample.id().clone()
    }

    async fn move_to(&self, id: &SampleId, target: SampleState) -> Result<Sample, TransitionError> {
        self.machine
            .transition(TransitionSampleCommand {
                sample_id: id.clone(),
                target,
                actor: admin(),
                observations: None,
            })
            .await
    }

    /// Waits for queued side effects to finish.
    async fn settle(&self) {
        self.runner.shutdown(Duration::from_secs(5)).await;
    }

    fn router(&self) -> Router {
        let sessions: AuthState = Arc::new(
            MockSessionValidator::new()
                .with_staff(STAFF_TOKEN, "lab-1")
                .with_client(CLIENT_TOKEN, "c-1", None)
                .with_client(OTHER_CLIENT_TOKEN, "c-2", None),
        );
        api_router(
            SampleAppState {
                state_machine: self.machine.clone(),
                samples: Arc::new(GetSampleHandler::new(self.samples.clone())),
            },
            NotificationAppState {
                registry: self.registry.clone(),
                inbox: self.inbox.clone(),
            },
            WebSocketState {
                hub: self.hub.clone(),
                inbox: self.inbox.clone(),
                sessions: sessions.clone(),
            },
            sessions,
        )
    }
}

fn admin() -> Actor {
    Actor {
        id: UserId::new("lab-1").unwrap(),
        name: "Ana Ruiz".into(),
        document: None,
    }
}

fn client(id: &str) -> ClientPrincipal {
    ClientPrincipal {
        client_id: ClientId::new(id).unwrap(),
        document: None,
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ════════════════════════════════════════════════════════════════════════════
// State machine scenarios
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn received_sample_moves_into_analysis() {
    let lab = Lab::new();
    let id = lab.seed("S1", "c-1", &["ph"]).await;

    let sample = lab.move_to(&id, SampleState::InAnalysis).await.unwrap();

    assert_eq!(sample.state(), SampleState::InAnalysis);
    assert_eq!(sample.history().len(), 2);
}

#[tokio::test]
async fn finalizing_without_results_fails_precondition() {
    let lab = Lab::new();
    let id = lab.seed("S2", "c-1", &["ph"]).await;

    let err = lab.move_to(&id, SampleState::Finalized).await.unwrap_err();

    assert!(matches!(err, TransitionError::Precondition(_)));
    let stored = lab.samples.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.state(), SampleState::Received);
    assert_eq!(stored.history().len(), 1);
}

#[tokio::test]
async fn sample_with_results_is_finalized() {
    let lab = Lab::new();
    let id = lab.seed("S3", "c-1", &["ph"]).await;
    lab.move_to(&id, SampleState::InAnalysis).await.unwrap();
    lab.results.add_result(&id).await;

    let sample = lab.move_to(&id, SampleState::Finalized).await.unwrap();

    assert_eq!(sample.state(), SampleState::Finalized);
}

#[tokio::test]
async fn quotation_is_accepted_only_once() {
    let lab = Lab::new();
    let id = lab.seed("S4", "c-1", &["ph", "lead"]).await;
    lab.move_to(&id, SampleState::InQuotation).await.unwrap();

    let accepted = lab.move_to(&id, SampleState::Accepted).await.unwrap();
    assert_eq!(accepted.state(), SampleState::Accepted);

    let err = lab.move_to(&id, SampleState::Accepted).await.unwrap_err();
    assert!(matches!(err, TransitionError::Precondition(_)));
}

#[tokio::test]
async fn committed_transition_fans_out_to_every_channel() {
    let lab = Lab::new();
    let id = lab.seed("S5", "c-1", &["ph"]).await;
    lab.registry
        .register(RegisterDeviceCommand {
            owner: client("c-1"),
            token: "android-device-0001".to_string(),
            platform: Platform::Android,
            device_info: DeviceInfo::default(),
        })
        .await
        .unwrap();
    let (_connection, mut live) = lab.hub.connect(&client("c-1")).await;
    // connected + pending_notifications
    live.recv().await.unwrap();
    live.recv().await.unwrap();

    lab.move_to(&id, SampleState::InAnalysis).await.unwrap();
    lab.settle().await;

    let audit = lab.audit.records().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditRecord::SAMPLE_STATE_CHANGED);

    assert_eq!(lab.push.calls().await, vec![vec!["android-device-0001".to_string()]]);
    assert_eq!(lab.notifications.len().await, 1);

    match live.recv().await.unwrap() {
        ServerMessage::Event(event) => assert_eq!(event.event, NOTIFICATION_EVENT),
        other => panic!("expected notification event, got {:?}", other),
    }
}

#[tokio::test]
async fn rejected_transition_has_no_side_effects() {
    let lab = Lab::new();
    let id = lab.seed("S6", "c-1", &["ph"]).await;

    lab.move_to(&id, SampleState::Finalized).await.unwrap_err();
    lab.settle().await;

    assert!(lab.audit.records().await.is_empty());
    assert!(lab.notifications.is_empty().await);
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP surface
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn staff_transitions_sample_over_http() {
    let lab = Lab::new();
    lab.seed("S7", "c-1", &["ph"]).await;

    let response = lab
        .router()
        .oneshot(request(
            Method::PUT,
            "/samples/S7/state",
            Some(STAFF_TOKEN),
            Some(json!({ "state": "in_analysis", "observations": "Started" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["state"]["code"], "in_analysis");
    assert_eq!(body["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unmet_precondition_is_bad_request() {
    let lab = Lab::new();
    lab.seed("S8", "c-1", &["ph"]).await;

    let response = lab
        .router()
        .oneshot(request(
            Method::PUT,
            "/samples/S8/state",
            Some(STAFF_TOKEN),
            Some(json!({ "state": "finalized" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "PRECONDITION_FAILED");
}

#[tokio::test]
async fn clients_cannot_transition_samples() {
    let lab = Lab::new();
    lab.seed("S9", "c-1", &["ph"]).await;

    let response = lab
        .router()
        .oneshot(request(
            Method::PUT,
            "/samples/S9/state",
            Some(CLIENT_TOKEN),
            Some(json!({ "state": "in_analysis" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let lab = Lab::new();
    lab.seed("S10", "c-1", &["ph"]).await;

    let response = lab
        .router()
        .oneshot(request(Method::GET, "/samples/S10", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn clients_only_see_their_own_samples() {
    let lab = Lab::new();
    lab.seed("S11", "c-1", &["ph"]).await;
    let app = lab.router();

    let own = app
        .clone()
        .oneshot(request(Method::GET, "/samples/S11", Some(CLIENT_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);
    let body = json_body(own).await;
    assert_eq!(body["state"]["code"], "received");

    let other = app
        .oneshot(request(Method::GET, "/samples/S11", Some(OTHER_CLIENT_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn client_reads_notification_after_transition() {
    let lab = Lab::new();
    let id = lab.seed("S12", "c-1", &["ph"]).await;
    let app = lab.router();

    let registered = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/notifications/devices",
            Some(CLIENT_TOKEN),
            Some(json!({ "token": "ios-device-token-0001", "platform": "ios" })),
        ))
        .await
        .unwrap();
    assert_eq!(registered.status(), StatusCode::CREATED);

    lab.move_to(&id, SampleState::InAnalysis).await.unwrap();
    lab.settle().await;

    let listed = app
        .clone()
        .oneshot(request(Method::GET, "/notifications", Some(CLIENT_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let body = json_body(listed).await;
    assert_eq!(body["count"], 1);
    let notification_id = body["notifications"][0]["id"].as_str().unwrap().to_string();

    let read = app
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/notifications/{}/read", notification_id),
            Some(CLIENT_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(read.status(), StatusCode::OK);

    let summary = app
        .oneshot(request(Method::GET, "/notifications/summary", Some(CLIENT_TOKEN), None))
        .await
        .unwrap();
    let body = json_body(summary).await;
    assert_eq!(body["total"], 0);
}

async fn register_over_http(app: &Router, token: &str, body: Value) {
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/notifications/devices", Some(token), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn client_cannot_log_out_another_clients_device() {
    let lab = Lab::new();
    let app = lab.router();
    register_over_http(
        &app,
        CLIENT_TOKEN,
        json!({ "token": "c1-android-token-01", "platform": "android" }),
    )
    .await;

    let foreign = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/notifications/devices/deactivate",
            Some(OTHER_CLIENT_TOKEN),
            Some(json!({ "token": "c1-android-token-01" })),
        ))
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::NO_CONTENT);
    let active = lab.registry.active_tokens_for(&client("c-1").refs()).await.unwrap();
    assert_eq!(active.len(), 1);

    let own = app
        .oneshot(request(
            Method::POST,
            "/notifications/devices/deactivate",
            Some(CLIENT_TOKEN),
            Some(json!({ "token": "c1-android-token-01" })),
        ))
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::NO_CONTENT);
    let active = lab.registry.active_tokens_for(&client("c-1").refs()).await.unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn client_lists_own_device_tokens() {
    let lab = Lab::new();
    let app = lab.router();
    register_over_http(
        &app,
        CLIENT_TOKEN,
        json!({ "token": "c1-android-token-01", "platform": "android" }),
    )
    .await;
    register_over_http(
        &app,
        CLIENT_TOKEN,
        json!({
            "token": "c1-ios-device-token-02",
            "platform": "ios",
            "device_info": { "device_name": "iPhone 15" }
        }),
    )
    .await;
    register_over_http(
        &app,
        OTHER_CLIENT_TOKEN,
        json!({ "token": "c2-web-push-token-01", "platform": "web" }),
    )
    .await;
    lab.registry
        .logout(&client("c-1"), "c1-android-token-01")
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/notifications/devices", Some(CLIENT_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    assert_eq!(body["client_id"], "c-1");
    assert_eq!(body["total"], 2);
    assert_eq!(body["active"], 1);
    assert_eq!(body["inactive"], 1);
    assert_eq!(body["platforms"]["android"], json!({ "total": 1, "active": 0 }));
    assert_eq!(body["platforms"]["ios"], json!({ "total": 1, "active": 1 }));
    assert!(body["platforms"].get("web").is_none());

    let devices = body["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
    for device in devices {
        let preview = device["token_preview"].as_str().unwrap();
        assert!(preview.ends_with("..."));
        assert!(!preview.contains("token-0"));
    }
    let ios = devices.iter().find(|d| d["platform"] == "ios").unwrap();
    assert_eq!(ios["device_info"]["device_name"], "iPhone 15");

    let staff = app
        .oneshot(request(Method::GET, "/notifications/devices", Some(STAFF_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(staff.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn realtime_stats_are_staff_only() {
    let lab = Lab::new();
    let app = lab.router();

    let staff = app
        .clone()
        .oneshot(request(Method::GET, "/ws/stats", Some(STAFF_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(staff.status(), StatusCode::OK);
    assert_eq!(json_body(staff).await, json!({ "connections": 0, "rooms": 0 }));

    let client = app
        .clone()
        .oneshot(request(Method::GET, "/ws/stats", Some(CLIENT_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(client.status(), StatusCode::FORBIDDEN);

    let anonymous = app
        .oneshot(request(Method::GET, "/ws/stats", None, None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}
