//! Wire types exchanged with the game server.
//!
//! Responses are decoded with `serde`; unknown fields are ignored so the
//! server can add fields without breaking the agent. Stream records are kept
//! as raw JSON until [`GameEvent::from_record`] classifies them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Game status values that mean the game is still running
pub const LIVE_STATUSES: [&str; 2] = ["created", "started"];

/// Side a player is assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    /// The other side
    pub fn opponent(self) -> Self {
        match self {
            PlayerColor::White => PlayerColor::Black,
            PlayerColor::Black => PlayerColor::White,
        }
    }

    /// Parse the server's `"white"` / `"black"` strings
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "white" => Some(PlayerColor::White),
            "black" => Some(PlayerColor::Black),
            _ => None,
        }
    }
}

impl From<PlayerColor> for chess::Color {
    fn from(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => chess::Color::White,
            PlayerColor::Black => chess::Color::Black,
        }
    }
}

impl From<chess::Color> for PlayerColor {
    fn from(color: chess::Color) -> Self {
        match color {
            chess::Color::White => PlayerColor::White,
            chess::Color::Black => PlayerColor::Black,
        }
    }
}

impl std::fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerColor::White => write!(f, "white"),
            PlayerColor::Black => write!(f, "black"),
        }
    }
}

/// Authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    /// Lowercase account ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub username: String,
}

/// Entry of the "currently playing" list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayingGame {
    /// Game ID
    pub game_id: String,

    /// Side the agent plays, when reported
    #[serde(default)]
    pub color: Option<PlayerColor>,

    /// Current position, when reported
    #[serde(default)]
    pub fen: Option<String>,
}

/// `GET /api/account/playing` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayingResponse {
    #[serde(default)]
    pub now_playing: Vec<PlayingGame>,
}

/// `GET /api/challenge` response
///
/// Challenges stay raw so one malformed record is declined on its own
/// instead of failing the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeListResponse {
    #[serde(default, rename = "in")]
    pub incoming: Vec<Value>,
}

/// Authoritative game snapshot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameSnapshot {
    /// Current position
    pub fen: String,

    /// Space-separated UCI moves that produced the position, when provided
    #[serde(default)]
    pub moves: Option<String>,
}

impl GameSnapshot {
    /// Move list as separate UCI strings
    pub fn move_list(&self) -> Option<Vec<String>> {
        self.moves.as_deref().map(split_moves)
    }
}

/// Player entry of a `gameFull` event
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlayerInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rating: Option<u32>,
}

/// Mutable game state, sent standalone or inside `gameFull`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameState {
    /// Space-separated UCI moves since the initial position
    #[serde(default)]
    pub moves: String,

    /// Game status, e.g. `started`, `mate`, `resign`
    #[serde(default)]
    pub status: Option<String>,

    /// Winner color once the game is over
    #[serde(default)]
    pub winner: Option<PlayerColor>,
}

impl GameState {
    /// Move list as separate UCI strings
    pub fn move_list(&self) -> Vec<String> {
        split_moves(&self.moves)
    }

    /// Whether the status says the game has ended
    pub fn is_over(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| !LIVE_STATUSES.contains(&status))
    }
}

/// Full game description, the first record of a game stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFull {
    pub id: String,

    /// Starting position, `startpos` for the standard one
    #[serde(default = "default_initial_fen")]
    pub initial_fen: String,

    #[serde(default)]
    pub white: PlayerInfo,

    #[serde(default)]
    pub black: PlayerInfo,

    #[serde(default)]
    pub state: GameState,
}

impl GameFull {
    /// Color of the given account in this game
    pub fn color_of(&self, account_id: &str) -> Option<PlayerColor> {
        let matches = |player: &PlayerInfo| {
            player
                .id
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(account_id))
        };

        if matches(&self.white) {
            Some(PlayerColor::White)
        } else if matches(&self.black) {
            Some(PlayerColor::Black)
        } else {
            None
        }
    }
}

fn default_initial_fen() -> String {
    "startpos".to_string()
}

/// Chat room of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRoom {
    Player,
    Spectator,
}

impl ChatRoom {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRoom::Player => "player",
            ChatRoom::Spectator => "spectator",
        }
    }
}

/// Chat message seen on a game stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatLine {
    pub username: String,
    pub text: String,
    #[serde(default)]
    pub room: Option<ChatRoom>,
}

/// Event decoded from a game stream record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Initial description of the game
    GameFull(Box<GameFull>),

    /// Move list update
    GameState(GameState),

    /// Chat message
    ChatLine(ChatLine),

    /// `gameFinish`, `aborted` or `resign`
    Terminal {
        kind: String,
        status: Option<String>,
        winner: Option<PlayerColor>,
    },

    /// Any other record, carrying its `type`
    Unknown(String),
}

impl GameEvent {
    /// Event types that end a game
    pub const TERMINAL_TYPES: [&'static str; 3] = ["gameFinish", "aborted", "resign"];

    /// Classify a raw stream record.
    ///
    /// Returns `None` when the record has no `type` or its payload does not
    /// decode for the declared type.
    pub fn from_record(record: Value) -> Option<Self> {
        let kind = record.get("type")?.as_str()?.to_string();

        match kind.as_str() {
            "gameFull" => serde_json::from_value(record)
                .ok()
                .map(|full| GameEvent::GameFull(Box::new(full))),
            "gameState" => serde_json::from_value(record).ok().map(GameEvent::GameState),
            "chatLine" => serde_json::from_value(record).ok().map(GameEvent::ChatLine),
            k if Self::TERMINAL_TYPES.contains(&k) => {
                let status = record
                    .get("status")
                    .and_then(status_name)
                    .map(str::to_string);
                let winner = record
                    .get("winner")
                    .and_then(Value::as_str)
                    .and_then(PlayerColor::from_name);
                Some(GameEvent::Terminal {
                    kind,
                    status,
                    winner,
                })
            }
            _ => Some(GameEvent::Unknown(kind)),
        }
    }
}

/// Status is a plain string in game states and `{ "name": .. }` in finish events
fn status_name(value: &Value) -> Option<&str> {
    value
        .as_str()
        .or_else(|| value.get("name").and_then(Value::as_str))
}

fn split_moves(moves: &str) -> Vec<String> {
    moves.split_whitespace().map(str::to_string).collect()
}
