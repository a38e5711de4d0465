use super::*;
use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use shared::{
    domain::ActivityDetails,
    protocol::{AcceptedReply, ErrorReply},
};
use tokio::{net::TcpListener, sync::oneshot};

#[derive(Clone)]
struct ServerState {
    directory: Arc<Mutex<Directory>>,
}

async fn handle_list_activities(State(state): State<ServerState>) -> Json<Directory> {
    Json(state.directory.lock().await.clone())
}

async fn handle_signup(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<AcceptedReply>, (StatusCode, Json<ErrorReply>)> {
    let email = params.get("email").cloned().unwrap_or_default();
    let mut directory = state.directory.lock().await;
    let Some(details) = directory.get_mut(&name) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorReply {
                detail: "Activity not found".to_string(),
            }),
        ));
    };
    if details.participants.contains(&email) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorReply {
                detail: "Student is already signed up".to_string(),
            }),
        ));
    }
    details.participants.push(email.clone());
    Ok(Json(AcceptedReply {
        message: format!("Signed up {email} for {name}"),
    }))
}

async fn handle_unregister(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<AcceptedReply>, (StatusCode, Json<ErrorReply>)> {
    let email = params.get("email").cloned().unwrap_or_default();
    let mut directory = state.directory.lock().await;
    let Some(details) = directory.get_mut(&name) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorReply {
                detail: "Activity not found".to_string(),
            }),
        ));
    };
    let Some(index) = details.participants.iter().position(|p| p == &email) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorReply {
                detail: "Student is not signed up for this activity".to_string(),
            }),
        ));
    };
    details.participants.remove(index);
    Ok(Json(AcceptedReply {
        message: format!("Unregistered {email} from {name}"),
    }))
}

async fn spawn_activities_server(directory: Directory) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = ServerState {
        directory: Arc::new(Mutex::new(directory)),
    };
    let app = Router::new()
        .route("/activities", get(handle_list_activities))
        .route("/activities/:name/signup", post(handle_signup))
        .route("/activities/:name/participants", delete(handle_unregister))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn sample_directory() -> Directory {
    let mut directory = Directory::new();
    directory.insert(
        "Chess Club".to_string(),
        ActivityDetails {
            description: "Learn strategies and play tournaments".to_string(),
            schedule: "Fridays, 3:30 PM - 5:00 PM".to_string(),
            max_participants: 10,
            participants: vec!["a@x.com".to_string()],
        },
    );
    directory
}

fn http_client(server_url: &str) -> Arc<DirectoryClient> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let api = HttpActivitiesApi::new(server_url).expect("api");
    DirectoryClient::new(Arc::new(api))
}

#[tokio::test]
async fn reload_replaces_snapshot_and_emits_event() {
    let server_url = spawn_activities_server(sample_directory()).await;
    let client = http_client(&server_url);
    let mut events = client.subscribe_events();

    client.reload_directory().await.expect("reload");

    let directory = client.directory().await;
    assert_eq!(directory.get("Chess Club").map(|d| d.spots_left()), Some(9));

    match events.recv().await.expect("event") {
        ClientEvent::DirectoryReplaced { directory } => {
            assert!(directory.contains_key("Chess Club"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn accepted_signup_refreshes_with_new_participant() {
    let server_url = spawn_activities_server(sample_directory()).await;
    let client = http_client(&server_url);
    let mut events = client.subscribe_events();

    let message = client
        .sign_up("Chess Club", "new@x.com")
        .await
        .expect("signup");
    assert_eq!(message, "Signed up new@x.com for Chess Club");

    let directory = client.directory().await;
    assert!(directory["Chess Club"]
        .participants
        .contains(&"new@x.com".to_string()));

    match events.recv().await.expect("banner") {
        ClientEvent::BannerRaised(banner) => {
            assert_eq!(banner.kind, BannerKind::Success);
            assert_eq!(banner.ttl, SIGNUP_BANNER_TTL);
            assert_eq!(banner.text, "Signed up new@x.com for Chess Club");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match events.recv().await.expect("refresh") {
        ClientEvent::DirectoryReplaced { directory } => {
            assert!(directory["Chess Club"]
                .participants
                .contains(&"new@x.com".to_string()));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_signup_keeps_previous_directory_and_surfaces_detail() {
    let server_url = spawn_activities_server(sample_directory()).await;
    let client = http_client(&server_url);
    client.reload_directory().await.expect("initial load");
    let before = client.directory().await;
    let mut events = client.subscribe_events();

    let err = client
        .sign_up("Chess Club", "a@x.com")
        .await
        .expect_err("duplicate must be rejected");
    assert!(matches!(err, ApiError::Rejected { status: 400, .. }));

    match events.recv().await.expect("banner") {
        ClientEvent::BannerRaised(banner) => {
            assert_eq!(banner.kind, BannerKind::Error);
            assert_eq!(banner.text, "Student is already signed up");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    // No refresh after a rejected mutation; the previous snapshot stays.
    assert!(events.try_recv().is_err());
    assert_eq!(client.directory().await, before);
}

#[tokio::test]
async fn accepted_unregister_removes_participant() {
    let server_url = spawn_activities_server(sample_directory()).await;
    let client = http_client(&server_url);
    let mut events = client.subscribe_events();

    let message = client
        .unregister("Chess Club", "a@x.com")
        .await
        .expect("unregister");
    assert_eq!(message, "Unregistered a@x.com from Chess Club");

    let directory = client.directory().await;
    assert!(directory["Chess Club"].participants.is_empty());

    match events.recv().await.expect("banner") {
        ClientEvent::BannerRaised(banner) => {
            assert_eq!(banner.kind, BannerKind::Success);
            assert_eq!(banner.ttl, UNREGISTER_BANNER_TTL);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn transport_failure_raises_generic_banner() {
    // Nothing listens on the discard port; the request fails before any
    // server detail exists.
    let client = http_client("http://127.0.0.1:9");
    let mut events = client.subscribe_events();

    let err = client
        .sign_up("Chess Club", "a@x.com")
        .await
        .expect_err("unreachable server");
    assert!(matches!(err, ApiError::Transport { .. }));

    match events.recv().await.expect("banner") {
        ClientEvent::BannerRaised(banner) => {
            assert_eq!(banner.kind, BannerKind::Error);
            assert_eq!(banner.text, "Failed to sign up. Please try again.");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn rejection_without_detail_uses_fallback_text() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/activities/:name/signup",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = http_client(&format!("http://{addr}"));
    let mut events = client.subscribe_events();

    let err = client
        .sign_up("Chess Club", "a@x.com")
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        ApiError::Rejected {
            status: 500,
            detail: None
        }
    ));

    match events.recv().await.expect("banner") {
        ClientEvent::BannerRaised(banner) => {
            assert_eq!(banner.text, "An error occurred");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_directory_body_is_classified_and_surfaces_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route("/activities", get(|| async { "not json" }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = http_client(&format!("http://{addr}"));
    let mut events = client.subscribe_events();

    let err = client.reload_directory().await.expect_err("must fail");
    assert!(matches!(err, ApiError::Body { .. }));

    match events.recv().await.expect("event") {
        ClientEvent::DirectoryUnavailable => {}
        other => panic!("unexpected event: {other:?}"),
    }
}

struct GatedDirectoryApi {
    release_first: Mutex<Option<oneshot::Receiver<()>>>,
    first: Directory,
    second: Directory,
    calls: Mutex<u32>,
}

#[async_trait]
impl ActivitiesApi for GatedDirectoryApi {
    async fn fetch_directory(&self) -> Result<Directory, ApiError> {
        let call = {
            let mut calls = self.calls.lock().await;
            *calls += 1;
            *calls
        };
        if call == 1 {
            let gate = self.release_first.lock().await.take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(self.first.clone())
        } else {
            Ok(self.second.clone())
        }
    }

    async fn sign_up(&self, _activity: &str, _email: &str) -> Result<AcceptedReply, ApiError> {
        unreachable!("not exercised by this double")
    }

    async fn unregister(&self, _activity: &str, _email: &str) -> Result<AcceptedReply, ApiError> {
        unreachable!("not exercised by this double")
    }
}

#[tokio::test]
async fn stale_reload_result_is_dropped() {
    let (release_tx, release_rx) = oneshot::channel();
    let first = sample_directory();
    let mut second = Directory::new();
    second.insert(
        "Art Workshop".to_string(),
        ActivityDetails {
            description: "Painting and drawing".to_string(),
            schedule: "Tuesdays".to_string(),
            max_participants: 15,
            participants: vec![],
        },
    );

    let api = Arc::new(GatedDirectoryApi {
        release_first: Mutex::new(Some(release_rx)),
        first,
        second: second.clone(),
        calls: Mutex::new(0),
    });
    let client = DirectoryClient::new(api.clone());
    let mut events = client.subscribe_events();

    let slow = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.reload_directory().await })
    };
    // Let the slow reload reach the API before starting the newer one.
    while *api.calls.lock().await == 0 {
        tokio::task::yield_now().await;
    }

    client.reload_directory().await.expect("fresh reload");
    release_tx.send(()).expect("release slow fetch");
    slow.await.expect("join").expect("slow reload completes");

    assert_eq!(client.directory().await, second);
    match events.recv().await.expect("event") {
        ClientEvent::DirectoryReplaced { directory } => assert_eq!(directory, second),
        other => panic!("unexpected event: {other:?}"),
    }
    // The stale result neither replaced the snapshot nor emitted an event.
    assert!(events.try_recv().is_err());
}
