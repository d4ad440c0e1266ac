//! Per-game session state machine.

use super::board::{LocalBoard, SyncOutcome};
use super::registry::SessionRegistry;
use super::submitter::SubmitOutcome;
use super::{SessionContext, SessionError};
use crate::engine::ComputeError;
use crate::net::{ChatRoom, GameEvent, GameFull, GameState, PlayerColor, PlayingGame};
use chess::{BoardStatus, ChessMove};
use futures_util::StreamExt;
use std::sync::Arc;

/// Server account whose chat messages are announcements
pub const SYSTEM_ACCOUNT: &str = "lichess";

/// Reply to `!help`
pub const HELP_REPLY: &str = "Available commands: !help";

/// Message posted after a game lost while the session followed it
pub const FAREWELL_MESSAGE: &str = "Good game! Want a rematch?";

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for `gameFull`
    WaitingInitial,
    /// Following the game
    Active,
    /// Local history diverged; waiting for a snapshot
    Resyncing,
    /// Game over
    Finished,
}

/// What happened when the session checked whether to move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Opponent to move, or no move possible
    NotMyTurn,
    /// Move computed, submitted and applied locally
    Played(ChessMove),
    /// Move computed but the server did not take it
    NotDelivered(SubmitOutcome),
    /// No move this round
    Skipped(ComputeError),
}

/// One game followed from its event stream
pub struct GameSession {
    game_id: String,
    ctx: Arc<SessionContext>,
    /// Color from the playing list, used when `gameFull` does not name the bot
    listed_color: Option<PlayerColor>,
    color: Option<PlayerColor>,
    board: Option<LocalBoard>,
    state: SessionState,
}

impl GameSession {
    pub fn new(game: PlayingGame, ctx: Arc<SessionContext>) -> Self {
        Self {
            game_id: game.game_id,
            ctx,
            listed_color: game.color,
            color: None,
            board: None,
            state: SessionState::WaitingInitial,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn color(&self) -> Option<PlayerColor> {
        self.color
    }

    pub fn board(&self) -> Option<&LocalBoard> {
        self.board.as_ref()
    }

    /// Follow the game stream until the game ends or the stream closes,
    /// then remove this session from the registry.
    pub async fn run(mut self, registry: Arc<SessionRegistry>, seq: u64) {
        match self.ctx.api.stream_game(&self.game_id).await {
            Ok(mut events) => {
                while let Some(event) = events.next().await {
                    if let Err(e) = self.handle_event(event).await {
                        log::error!("[{}] {}", self.game_id, e);
                        if let SessionError::Fatal(err) = e {
                            let _ = self.ctx.fatal.send(err);
                        }
                        break;
                    }
                    if self.state == SessionState::Finished {
                        break;
                    }
                }
                if self.state != SessionState::Finished {
                    log::info!("[{}] Game stream closed", self.game_id);
                }
            }
            Err(e) => log::warn!("[{}] Failed to open game stream: {}", self.game_id, e),
        }

        registry.remove(&self.game_id, seq).await;
    }

    /// Apply one stream event.
    ///
    /// Only an engine that cannot be restarted yields an error; the caller
    /// stops the session and reports it as fatal.
    pub async fn handle_event(&mut self, event: GameEvent) -> Result<(), SessionError> {
        match event {
            GameEvent::GameFull(full) => self.on_game_full(*full).await,
            GameEvent::GameState(state) => self.on_game_state(state).await,
            GameEvent::ChatLine(line) => {
                if line.username.eq_ignore_ascii_case(SYSTEM_ACCOUNT) {
                    return Ok(());
                }
                log::info!("[{}] Chat {}: {}", self.game_id, line.username, line.text);
                if line.text.trim().eq_ignore_ascii_case("!help") {
                    self.chat(line.room.unwrap_or(ChatRoom::Player), HELP_REPLY)
                        .await;
                }
                Ok(())
            }
            GameEvent::Terminal {
                kind,
                status,
                winner,
            } => {
                log::info!(
                    "[{}] Game ended: {} ({})",
                    self.game_id,
                    kind,
                    status.as_deref().unwrap_or("unknown")
                );
                self.finish(winner).await;
                Ok(())
            }
            GameEvent::Unknown(kind) => {
                log::debug!("[{}] Ignoring event {}", self.game_id, kind);
                Ok(())
            }
        }
    }

    async fn on_game_full(&mut self, full: GameFull) -> Result<(), SessionError> {
        if self.state != SessionState::WaitingInitial {
            log::warn!(
                "[{}] Ignoring gameFull in state {:?}",
                self.game_id,
                self.state
            );
            return Ok(());
        }

        self.color = self
            .ctx
            .account_id
            .as_deref()
            .and_then(|id| full.color_of(id))
            .or(self.listed_color);
        match self.color {
            Some(color) => log::info!("[{}] Playing as {}", self.game_id, color),
            None => log::warn!("[{}] Could not determine our color", self.game_id),
        }

        if full.state.is_over() {
            self.finish(full.state.winner).await;
            return Ok(());
        }

        match LocalBoard::from_fen(&full.initial_fen) {
            Ok(board) => {
                self.board = Some(board);
                self.state = SessionState::Active;
                self.synchronize(&full.state).await
            }
            Err(e) => {
                log::warn!("[{}] {}, loading snapshot", self.game_id, e);
                self.resync(&full.state.move_list()).await;
                Ok(())
            }
        }
    }

    async fn on_game_state(&mut self, state: GameState) -> Result<(), SessionError> {
        match self.state {
            SessionState::WaitingInitial | SessionState::Finished => {
                log::debug!(
                    "[{}] Ignoring gameState in state {:?}",
                    self.game_id,
                    self.state
                );
                return Ok(());
            }
            SessionState::Resyncing => {
                if !self.resync(&state.move_list()).await {
                    return Ok(());
                }
            }
            SessionState::Active => {}
        }

        if state.is_over() {
            log::info!(
                "[{}] Game over: {}",
                self.game_id,
                state.status.as_deref().unwrap_or("unknown")
            );
            self.finish(state.winner).await;
            return Ok(());
        }

        self.synchronize(&state).await
    }

    /// Align the board with the server list, then move if it is our turn
    async fn synchronize(&mut self, state: &GameState) -> Result<(), SessionError> {
        let server = state.move_list();
        let Some(board) = self.board.as_mut() else {
            self.resync(&server).await;
            return Ok(());
        };

        match board.sync(&server) {
            SyncOutcome::Applied(count) => {
                if count > 0 {
                    log::debug!("[{}] Applied {} server moves", self.game_id, count);
                }
                self.play_turn().await?;
            }
            SyncOutcome::Diverged => {
                log::warn!(
                    "[{}] Move history diverged from the server, reloading",
                    self.game_id
                );
                self.resync(&server).await;
            }
            SyncOutcome::Illegal(mv) => {
                log::warn!(
                    "[{}] Server move {} is illegal locally, reloading",
                    self.game_id,
                    mv
                );
                self.resync(&server).await;
            }
        }
        Ok(())
    }

    /// Rebuild the board from the server snapshot.
    ///
    /// Returns whether the session is active again.
    async fn resync(&mut self, server_moves: &[String]) -> bool {
        self.state = SessionState::Resyncing;
        self.board = None;

        let snapshot = match self.ctx.api.game_snapshot(&self.game_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("[{}] Failed to fetch snapshot: {}", self.game_id, e);
                return false;
            }
        };

        match LocalBoard::from_snapshot(&snapshot, server_moves) {
            Ok(board) => {
                log::info!("[{}] Board reloaded from {}", self.game_id, snapshot.fen);
                self.board = Some(board);
                self.state = SessionState::Active;
                true
            }
            Err(e) => {
                log::warn!("[{}] Snapshot unusable: {}", self.game_id, e);
                false
            }
        }
    }

    /// Compute and submit a move when it is our turn.
    ///
    /// The move is applied locally only once the server accepted it.
    pub async fn play_turn(&mut self) -> Result<TurnOutcome, SessionError> {
        let (Some(board), Some(color)) = (self.board.as_ref(), self.color) else {
            return Ok(TurnOutcome::NotMyTurn);
        };
        if !board.is_turn(color) || board.position().status() != BoardStatus::Ongoing {
            return Ok(TurnOutcome::NotMyTurn);
        }

        let position = *board.position();
        let result = self
            .ctx
            .engine
            .compute_move(&position, self.ctx.move_request)
            .await;

        let mv = match result {
            Ok(mv) => mv,
            Err(err) => {
                log::warn!("[{}] No move this round: {}", self.game_id, err);
                if let Some(generation) = err.dead_generation() {
                    self.ctx.engine.recover(generation).await?;
                }
                return Ok(TurnOutcome::Skipped(err));
            }
        };

        let uci = mv.to_string();
        let outcome = self.ctx.submitter.submit(&self.game_id, &uci).await;
        if !outcome.is_delivered() {
            log::warn!("[{}] Move {} not delivered: {:?}", self.game_id, uci, outcome);
            return Ok(TurnOutcome::NotDelivered(outcome));
        }

        if let Some(Err(e)) = self.board.as_mut().map(|board| board.apply_move(mv)) {
            log::warn!("[{}] Submitted move not applied locally: {}", self.game_id, e);
        }
        Ok(TurnOutcome::Played(mv))
    }

    /// Mark the game over. The farewell goes out only for a loss seen
    /// live, not for a game that was already over when the session opened.
    async fn finish(&mut self, winner: Option<PlayerColor>) {
        let was_live = matches!(
            self.state,
            SessionState::Active | SessionState::Resyncing
        );
        self.state = SessionState::Finished;
        if !was_live {
            return;
        }
        if let (Some(winner), Some(color)) = (winner, self.color) {
            if winner != color {
                self.chat(ChatRoom::Player, FAREWELL_MESSAGE).await;
            }
        }
    }

    async fn chat(&self, room: ChatRoom, text: &str) {
        if let Err(e) = self.ctx.api.post_chat(&self.game_id, room, text).await {
            log::warn!("[{}] Failed to post chat: {}", self.game_id, e);
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("game_id", &self.game_id)
            .field("color", &self.color)
            .field("state", &self.state)
            .field("board", &self.board)
            .finish_non_exhaustive()
    }
}
