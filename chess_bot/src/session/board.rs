//! Local board replica and move-history synchronization.

use super::SessionError;
use crate::engine::parse_uci_move;
use crate::net::{GameSnapshot, PlayerColor};
use chess::{Board, ChessMove, Color};
use std::str::FromStr;

/// Result of aligning the local history with the server's
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local history was a prefix; this many new moves were applied
    Applied(usize),

    /// Server history is shorter or disagrees with the local one
    Diverged,

    /// A new server move could not be applied
    Illegal(String),
}

/// Board position plus the UCI moves applied to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBoard {
    position: Board,
    moves: Vec<String>,
    /// Side to move before the first entry of `moves`
    initial_side: Color,
}

impl LocalBoard {
    /// Board at `fen`, or the standard position for `startpos`
    pub fn from_fen(fen: &str) -> Result<Self, SessionError> {
        let position = parse_fen(fen)?;
        Ok(Self {
            position,
            moves: Vec::new(),
            initial_side: position.side_to_move(),
        })
    }

    /// Board rebuilt from an authoritative snapshot.
    ///
    /// The history becomes the snapshot's move list, or `fallback` when the
    /// snapshot has none, so later server lists stay prefix-comparable.
    pub fn from_snapshot(
        snapshot: &GameSnapshot,
        fallback: &[String],
    ) -> Result<Self, SessionError> {
        let position = parse_fen(&snapshot.fen)?;
        let moves = snapshot.move_list().unwrap_or_else(|| fallback.to_vec());
        let initial_side = if moves.len() % 2 == 0 {
            position.side_to_move()
        } else {
            !position.side_to_move()
        };

        Ok(Self {
            position,
            moves,
            initial_side,
        })
    }

    /// Apply one UCI move
    pub fn apply(&mut self, uci: &str) -> Result<ChessMove, SessionError> {
        let mv = parse_uci_move(uci).ok_or_else(|| SessionError::IllegalMove(uci.to_string()))?;
        self.apply_move(mv)?;
        Ok(mv)
    }

    /// Apply an already parsed move
    pub fn apply_move(&mut self, mv: ChessMove) -> Result<(), SessionError> {
        if !self.position.legal(mv) {
            return Err(SessionError::IllegalMove(mv.to_string()));
        }
        self.position = self.position.make_move_new(mv);
        self.moves.push(mv.to_string());
        Ok(())
    }

    /// Bring the local history up to the server's list.
    ///
    /// On [`SyncOutcome::Illegal`] the moves before the illegal one remain
    /// applied; callers discard the board and reload it.
    pub fn sync(&mut self, server: &[String]) -> SyncOutcome {
        let local = self.moves.len();
        if server.len() < local || server[..local] != self.moves[..] {
            return SyncOutcome::Diverged;
        }

        for uci in &server[local..] {
            if self.apply(uci).is_err() {
                return SyncOutcome::Illegal(uci.clone());
            }
        }
        SyncOutcome::Applied(server.len() - local)
    }

    /// Side to move, from the starting side and the ply count
    pub fn side_to_move(&self) -> Color {
        if self.moves.len() % 2 == 0 {
            self.initial_side
        } else {
            !self.initial_side
        }
    }

    /// Whether `color` is to move
    pub fn is_turn(&self, color: PlayerColor) -> bool {
        self.side_to_move() == Color::from(color)
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }
}

fn parse_fen(fen: &str) -> Result<Board, SessionError> {
    if fen == "startpos" {
        return Ok(Board::default());
    }
    Board::from_str(fen).map_err(|_| SessionError::InvalidFen(fen.to_string()))
}
