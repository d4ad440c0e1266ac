//! HTTP client for the game server.

use super::errors::{ApiError, Result};
use super::messages::{
    Account, ChallengeListResponse, ChatRoom, GameSnapshot, PlayingGame, PlayingResponse,
};
use super::stream::{EventStream, decode_events};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Default per-request timeout for mutating calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for establishing a connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest silence tolerated between two reads of a response body.
///
/// The server writes a keep-alive line every few seconds on game streams,
/// so a stream silent for this long is dead.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote operations the agent performs.
///
/// Every call is a single attempt; retries are the caller's decision.
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Fetch the authenticated account
    async fn account(&self) -> Result<Account>;

    /// List incoming challenges as raw records
    async fn pending_challenges(&self) -> Result<Vec<Value>>;

    /// Accept a challenge
    async fn accept_challenge(&self, challenge_id: &str) -> Result<()>;

    /// Decline a challenge with a server reason key
    async fn decline_challenge(&self, challenge_id: &str, reason: &str) -> Result<()>;

    /// List games currently being played
    async fn playing_games(&self) -> Result<Vec<PlayingGame>>;

    /// Open the event stream of a game
    async fn stream_game(&self, game_id: &str) -> Result<EventStream>;

    /// Fetch the authoritative snapshot of a game
    async fn game_snapshot(&self, game_id: &str) -> Result<GameSnapshot>;

    /// Submit a move in UCI notation
    async fn submit_move(&self, game_id: &str, uci: &str) -> Result<()>;

    /// Post a chat message
    async fn post_chat(&self, game_id: &str, room: ChatRoom, text: &str) -> Result<()>;
}

/// Bearer-authenticated HTTP implementation of [`GameApi`]
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Server root, e.g. `https://lichess.org`
    /// * `token` - Bearer token of the bot account
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: build_client(DEFAULT_READ_TIMEOUT)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Override the read timeout, which ends a game stream gone silent
    pub fn with_read_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Override the per-request timeout of non-streaming calls
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .timeout(self.request_timeout)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .timeout(self.request_timeout)
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = Self::send(self.get(path)).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn build_client(read_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(read_timeout)
        .build()
        .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success response into [`ApiError::Status`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl GameApi for HttpApiClient {
    async fn account(&self) -> Result<Account> {
        self.get_json("account").await
    }

    async fn pending_challenges(&self) -> Result<Vec<Value>> {
        let list: ChallengeListResponse = self.get_json("challenge").await?;
        Ok(list.incoming)
    }

    async fn accept_challenge(&self, challenge_id: &str) -> Result<()> {
        Self::send(self.post(&format!("challenge/{}/accept", challenge_id))).await?;
        Ok(())
    }

    async fn decline_challenge(&self, challenge_id: &str, reason: &str) -> Result<()> {
        let request = self
            .post(&format!("challenge/{}/decline", challenge_id))
            .form(&[("reason", reason)]);
        Self::send(request).await?;
        Ok(())
    }

    async fn playing_games(&self) -> Result<Vec<PlayingGame>> {
        let playing: PlayingResponse = self.get_json("account/playing").await?;
        Ok(playing.now_playing)
    }

    async fn stream_game(&self, game_id: &str) -> Result<EventStream> {
        // No total timeout: the stream stays open for the whole game.
        // A silent connection still ends through the read timeout.
        let request = self
            .client
            .get(self.url(&format!("bot/game/stream/{}", game_id)))
            .bearer_auth(&self.token);
        let response = Self::send(request).await?;
        Ok(decode_events(response.bytes_stream()))
    }

    async fn game_snapshot(&self, game_id: &str) -> Result<GameSnapshot> {
        self.get_json(&format!("bot/game/{}", game_id)).await
    }

    async fn submit_move(&self, game_id: &str, uci: &str) -> Result<()> {
        Self::send(self.post(&format!("bot/game/{}/move/{}", game_id, uci))).await?;
        Ok(())
    }

    async fn post_chat(&self, game_id: &str, room: ChatRoom, text: &str) -> Result<()> {
        let request = self
            .post(&format!("bot/game/{}/chat", game_id))
            .form(&[("room", room.as_str()), ("text", text)]);
        Self::send(request).await?;
        Ok(())
    }
}
