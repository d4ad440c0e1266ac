//! Shared fakes for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chess::{Board, MoveGen};
use chess_bot::clock::RecordingClock;
use chess_bot::engine::{
    EngineError, EngineLauncher, EngineParams, EngineProcess, EngineSupervisor, MoveRequest,
};
use chess_bot::net::{
    Account, ApiError, ChatRoom, EventStream, GameApi, GameSnapshot, PlayingGame, decode_events,
};
use chess_bot::session::{MoveSubmitter, SessionContext};
use chess_bot::RetryPolicy;
use futures_util::stream;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Fake remote API
// ============================================================================

/// One recorded API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Account,
    Challenges,
    Accept(String),
    Decline(String, String),
    Playing,
    Stream(String),
    Snapshot(String),
    Move(String, String),
    Chat(String, ChatRoom, String),
}

/// Scripted in-memory [`GameApi`]
#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    challenges: Mutex<Option<Result<Vec<Value>, ApiError>>>,
    playing: Mutex<Option<Result<Vec<PlayingGame>, ApiError>>>,
    snapshots: Mutex<HashMap<String, Result<GameSnapshot, ApiError>>>,
    move_results: Mutex<VecDeque<Result<(), ApiError>>>,
    streams: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    pub fn set_challenges(&self, result: Result<Vec<Value>, ApiError>) {
        *self.challenges.lock().unwrap() = Some(result);
    }

    pub fn set_playing(&self, result: Result<Vec<PlayingGame>, ApiError>) {
        *self.playing.lock().unwrap() = Some(result);
    }

    pub fn set_snapshot(&self, game_id: &str, result: Result<GameSnapshot, ApiError>) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(game_id.to_string(), result);
    }

    /// Queue results for successive move submissions; `Ok` once exhausted
    pub fn push_move_results(&self, results: Vec<Result<(), ApiError>>) {
        self.move_results.lock().unwrap().extend(results);
    }

    /// Stream for `game_id` that yields `lines` then closes.
    ///
    /// Games without a scripted stream get one that never yields.
    pub fn set_stream(&self, game_id: &str, lines: &[Value]) {
        let chunks = lines
            .iter()
            .map(|line| format!("{}\n\n", line).into_bytes())
            .collect();
        self.streams
            .lock()
            .unwrap()
            .insert(game_id.to_string(), chunks);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn network_error() -> ApiError {
    ApiError::Network("connection reset".to_string())
}

pub fn status_error(status: u16) -> ApiError {
    ApiError::Status {
        status,
        body: "{\"error\":\"rejected\"}".to_string(),
    }
}

#[async_trait]
impl GameApi for FakeApi {
    async fn account(&self) -> Result<Account, ApiError> {
        self.record(Call::Account);
        Ok(Account {
            id: "mybot".to_string(),
            username: "MyBot".to_string(),
        })
    }

    async fn pending_challenges(&self) -> Result<Vec<Value>, ApiError> {
        self.record(Call::Challenges);
        self.challenges
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn accept_challenge(&self, challenge_id: &str) -> Result<(), ApiError> {
        self.record(Call::Accept(challenge_id.to_string()));
        Ok(())
    }

    async fn decline_challenge(&self, challenge_id: &str, reason: &str) -> Result<(), ApiError> {
        self.record(Call::Decline(challenge_id.to_string(), reason.to_string()));
        Ok(())
    }

    async fn playing_games(&self) -> Result<Vec<PlayingGame>, ApiError> {
        self.record(Call::Playing);
        self.playing
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn stream_game(&self, game_id: &str) -> Result<EventStream, ApiError> {
        self.record(Call::Stream(game_id.to_string()));
        let scripted = self.streams.lock().unwrap().get(game_id).cloned();
        let events = match scripted {
            Some(chunks) => decode_events(stream::iter(
                chunks.into_iter().map(Ok::<Vec<u8>, std::io::Error>),
            )),
            None => decode_events(stream::pending::<Result<Vec<u8>, std::io::Error>>()),
        };
        Ok(events)
    }

    async fn game_snapshot(&self, game_id: &str) -> Result<GameSnapshot, ApiError> {
        self.record(Call::Snapshot(game_id.to_string()));
        self.snapshots
            .lock()
            .unwrap()
            .get(game_id)
            .cloned()
            .unwrap_or_else(|| Err(status_error(404)))
    }

    async fn submit_move(&self, game_id: &str, uci: &str) -> Result<(), ApiError> {
        self.record(Call::Move(game_id.to_string(), uci.to_string()));
        self.move_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn post_chat(&self, game_id: &str, room: ChatRoom, text: &str) -> Result<(), ApiError> {
        self.record(Call::Chat(game_id.to_string(), room, text.to_string()));
        Ok(())
    }
}

// ============================================================================
// Fake engine
// ============================================================================

/// What the fake engine answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// First legal move in generator order
    FirstLegal,
    /// This exact UCI string
    Fixed(String),
    /// No move
    Nothing,
}

/// Shared script and counters for fake engine processes
#[derive(Debug)]
pub struct EngineScript {
    pub reply: Mutex<Reply>,
    pub delay: Mutex<Duration>,
    pub launches: AtomicU32,
    pub configures: AtomicU32,
    pub searches: AtomicU32,
    /// Searches currently running, and the most ever seen at once
    pub in_flight: AtomicU32,
    pub max_in_flight: AtomicU32,
    pub quits: AtomicU32,
    /// Processes launched at or before this number are dead
    pub dead_through: AtomicU32,
    pub fail_launch: AtomicBool,
}

impl Default for EngineScript {
    fn default() -> Self {
        Self {
            reply: Mutex::new(Reply::FirstLegal),
            delay: Mutex::new(Duration::ZERO),
            launches: AtomicU32::new(0),
            configures: AtomicU32::new(0),
            searches: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
            quits: AtomicU32::new(0),
            dead_through: AtomicU32::new(0),
            fail_launch: AtomicBool::new(false),
        }
    }
}

impl EngineScript {
    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Kill every process launched so far
    pub fn crash(&self) {
        self.dead_through
            .store(self.launches.load(Ordering::SeqCst), Ordering::SeqCst);
    }

    pub fn launches(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> u32 {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Counts a running search until dropped, including by a timeout
struct InFlight<'a>(&'a EngineScript);

impl<'a> InFlight<'a> {
    fn enter(script: &'a EngineScript) -> Self {
        let now = script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        script.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(script)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeEngine {
    number: u32,
    script: Arc<EngineScript>,
}

impl FakeEngine {
    fn is_dead(&self) -> bool {
        self.number <= self.script.dead_through.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineProcess for FakeEngine {
    async fn configure(&mut self, _params: &EngineParams) -> Result<(), EngineError> {
        if self.is_dead() {
            return Err(EngineError::Terminated);
        }
        self.script.configures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn best_move(
        &mut self,
        fen: &str,
        _think_time: Duration,
    ) -> Result<Option<String>, EngineError> {
        if self.is_dead() {
            return Err(EngineError::Terminated);
        }
        self.script.searches.fetch_add(1, Ordering::SeqCst);
        let _running = InFlight::enter(&self.script);

        let delay = *self.script.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = self.script.reply.lock().unwrap().clone();
        Ok(match reply {
            Reply::FirstLegal => {
                let board = Board::from_str(fen).map_err(|e| EngineError::Protocol(e.to_string()))?;
                MoveGen::new_legal(&board).next().map(|mv| mv.to_string())
            }
            Reply::Fixed(uci) => Some(uci),
            Reply::Nothing => None,
        })
    }

    async fn quit(&mut self) -> Result<(), EngineError> {
        self.script.quits.fetch_add(1, Ordering::SeqCst);
        if self.is_dead() {
            return Err(EngineError::Terminated);
        }
        Ok(())
    }
}

pub struct FakeLauncher {
    pub script: Arc<EngineScript>,
}

#[async_trait]
impl EngineLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn EngineProcess>, EngineError> {
        if self.script.fail_launch.load(Ordering::SeqCst) {
            return Err(EngineError::Launch("scripted launch failure".to_string()));
        }
        let number = self.script.launches.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(FakeEngine {
            number,
            script: self.script.clone(),
        }))
    }
}

/// Supervisor over fake engines that never waits between restarts
pub async fn fake_supervisor() -> (Arc<EngineSupervisor>, Arc<EngineScript>) {
    let script = Arc::new(EngineScript::default());
    let launcher = Arc::new(FakeLauncher {
        script: script.clone(),
    });
    let supervisor = EngineSupervisor::start(launcher, EngineParams::default())
        .await
        .unwrap()
        .with_clock(Arc::new(RecordingClock::new()));
    (Arc::new(supervisor), script)
}

// ============================================================================
// Session wiring
// ============================================================================

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub script: Arc<EngineScript>,
    pub clock: Arc<RecordingClock>,
    pub ctx: Arc<SessionContext>,
    pub fatal_rx: mpsc::UnboundedReceiver<EngineError>,
}

pub async fn harness() -> Harness {
    let api = FakeApi::new();
    let (engine, script) = fake_supervisor().await;
    let clock = Arc::new(RecordingClock::new());
    let submitter = MoveSubmitter::new(api.clone(), RetryPolicy::default()).with_clock(clock.clone());
    let (fatal, fatal_rx) = mpsc::unbounded_channel();

    let ctx = Arc::new(SessionContext {
        api: api.clone(),
        engine,
        submitter: Arc::new(submitter),
        move_request: MoveRequest::default(),
        account_id: Some("mybot".to_string()),
        fatal,
    });

    Harness {
        api,
        script,
        clock,
        ctx,
        fatal_rx,
    }
}

pub fn playing_game(game_id: &str) -> PlayingGame {
    PlayingGame {
        game_id: game_id.to_string(),
        color: None,
        fen: None,
    }
}

/// Wait until `condition` holds, polling the runtime in between
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
