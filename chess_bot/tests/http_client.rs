//! Integration tests for the HTTP client against an in-process server.

use axum::body::Body;
use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chess_bot::net::{ApiError, ChatRoom, GameApi, GameEvent, HttpApiClient, PlayerColor};
use futures_util::{StreamExt, stream};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOKEN: &str = "test-token";

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockState {
    fn record(&self, entry: String) {
        self.requests.lock().unwrap().push(entry);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer test-token")
}

async fn account(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "No such token").into_response();
    }
    Json(json!({ "id": "mybot", "username": "MyBot" })).into_response()
}

async fn challenges() -> Json<serde_json::Value> {
    Json(json!({
        "in": [{ "id": "c1", "challenger": { "id": "alice", "rating": 1600 } }],
        "out": []
    }))
}

async fn decline(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    state.record(format!(
        "decline {} {}",
        id,
        form.get("reason").cloned().unwrap_or_default()
    ));
    Json(json!({ "ok": true }))
}

async fn playing() -> Json<serde_json::Value> {
    Json(json!({ "nowPlaying": [{ "gameId": "g1", "color": "black", "fen": "startpos" }] }))
}

async fn submit_move(
    State(state): State<MockState>,
    Path((id, uci)): Path<(String, String)>,
) -> Response {
    state.record(format!("move {} {}", id, uci));
    if uci == "e2e5" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Not your turn, or game already over" })),
        )
            .into_response();
    }
    Json(json!({ "ok": true })).into_response()
}

async fn chat(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    state.record(format!(
        "chat {} {} {}",
        id,
        form.get("room").cloned().unwrap_or_default(),
        form.get("text").cloned().unwrap_or_default()
    ));
    Json(json!({ "ok": true }))
}

async fn snapshot(Path(id): Path<String>) -> Response {
    if id != "g1" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({ "fen": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1", "moves": "e2e4" }))
        .into_response()
}

const GAME_FULL: &str = r#"{"type":"gameFull","id":"g1","white":{"id":"alice"},"black":{"id":"mybot"},"initialFen":"startpos","state":{"type":"gameState","moves":"","status":"started"}}"#;

async fn game_stream(Path(id): Path<String>) -> Response {
    if id == "stalled" {
        // One event, then the connection stays open without another byte
        let first = stream::once(async { Ok::<_, Infallible>(format!("{}\n", GAME_FULL)) });
        return Body::from_stream(first.chain(stream::pending())).into_response();
    }

    [
        GAME_FULL,
        "",
        r#"{"type":"gameState","moves":"e2e4","status":"started"}"#,
        "{broken",
        r#"{"type":"chatLine","username":"alice","text":"hi","room":"player"}"#,
        "",
    ]
    .join("\n")
    .into_response()
}

async fn start_server() -> (HttpApiClient, MockState) {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/account", get(account))
        .route("/api/challenge", get(challenges))
        .route("/api/challenge/{id}/decline", post(decline))
        .route("/api/account/playing", get(playing))
        .route("/api/bot/game/stream/{id}", get(game_stream))
        .route("/api/bot/game/{id}", get(snapshot))
        .route("/api/bot/game/{id}/move/{uci}", post(submit_move))
        .route("/api/bot/game/{id}/chat", post(chat))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = HttpApiClient::new(format!("http://{}", addr), TOKEN).unwrap();
    (client, state)
}

#[tokio::test]
async fn test_account_uses_bearer_token() {
    let (client, _) = start_server().await;
    let account = client.account().await.unwrap();
    assert_eq!(account.id, "mybot");

    let anonymous = HttpApiClient::new(client.base_url(), "wrong").unwrap();
    let err = anonymous.account().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_lists_challenges_and_playing_games() {
    let (client, _) = start_server().await;

    let challenges = client.pending_challenges().await.unwrap();
    assert_eq!(challenges.len(), 1);
    assert_eq!(challenges[0]["id"], "c1");

    let playing = client.playing_games().await.unwrap();
    assert_eq!(playing[0].game_id, "g1");
    assert_eq!(playing[0].color, Some(PlayerColor::Black));
}

#[tokio::test]
async fn test_mutating_calls_send_forms() {
    let (client, state) = start_server().await;

    client.decline_challenge("c1", "timeControl").await.unwrap();
    client.submit_move("g1", "e2e4").await.unwrap();
    client
        .post_chat("g1", ChatRoom::Player, "Available commands: !help")
        .await
        .unwrap();

    assert_eq!(
        state.requests(),
        vec![
            "decline c1 timeControl",
            "move g1 e2e4",
            "chat g1 player Available commands: !help"
        ]
    );
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let (client, _) = start_server().await;

    let err = client.submit_move("g1", "e2e5").await.unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Not your turn"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = client.game_snapshot("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_snapshot_and_stream() {
    let (client, _) = start_server().await;

    let snapshot = client.game_snapshot("g1").await.unwrap();
    assert_eq!(snapshot.move_list(), Some(vec!["e2e4".to_string()]));

    let events: Vec<GameEvent> = client.stream_game("g1").await.unwrap().collect().await;
    assert_eq!(events.len(), 3);
    match &events[0] {
        GameEvent::GameFull(full) => assert_eq!(full.color_of("mybot"), Some(PlayerColor::Black)),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(events[1], GameEvent::GameState(_)));
    assert!(matches!(events[2], GameEvent::ChatLine(_)));
}

#[tokio::test]
async fn test_silent_stream_ends_after_read_timeout() {
    let (client, _) = start_server().await;
    let client = client
        .with_read_timeout(Duration::from_millis(200))
        .unwrap();

    let mut events = client.stream_game("stalled").await.unwrap();
    let first = events.next().await;
    assert!(matches!(first, Some(GameEvent::GameFull(_))));

    let next = tokio::time::timeout(Duration::from_secs(10), events.next())
        .await
        .expect("stream should end once the connection goes quiet");
    assert!(next.is_none());
}
