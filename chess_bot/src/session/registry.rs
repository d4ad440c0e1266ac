//! Registry of running game sessions.

use crate::net::PlayingGame;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Running session task
#[derive(Debug)]
struct SessionHandle {
    /// Spawn sequence number, distinguishes successive sessions of one game
    seq: u64,
    task: JoinHandle<()>,
}

/// Games touched by one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub spawned: Vec<String>,
    pub removed: Vec<String>,
}

/// Map of game ID to running session, at most one per game
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    next_seq: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align the registry with the server's playing list.
    ///
    /// Under one lock: sessions whose game left the list are aborted and
    /// removed, and `spawn` is called once for every listed game without a
    /// session. `spawn` receives the game and the sequence number the new
    /// session must pass to [`SessionRegistry::remove`].
    pub async fn reconcile<F>(&self, playing: &[PlayingGame], mut spawn: F) -> ReconcileReport
    where
        F: FnMut(PlayingGame, u64) -> JoinHandle<()>,
    {
        let mut sessions = self.sessions.lock().await;
        let mut report = ReconcileReport::default();

        let live: HashSet<&str> = playing.iter().map(|g| g.game_id.as_str()).collect();
        let stale: Vec<String> = sessions
            .keys()
            .filter(|id| !live.contains(id.as_str()))
            .cloned()
            .collect();

        for game_id in stale {
            if let Some(handle) = sessions.remove(&game_id) {
                handle.task.abort();
                log::info!("[{}] Game no longer playing, session stopped", game_id);
                report.removed.push(game_id);
            }
        }

        for game in playing {
            if sessions.contains_key(&game.game_id) {
                continue;
            }

            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            let game_id = game.game_id.clone();
            let task = spawn(game.clone(), seq);
            log::info!("[{}] Session started", game_id);
            sessions.insert(game_id.clone(), SessionHandle { seq, task });
            report.spawned.push(game_id);
        }

        report
    }

    /// Remove a finished session, unless a newer one replaced it
    ///
    /// # Returns
    ///
    /// * `bool` - Whether an entry was removed
    pub async fn remove(&self, game_id: &str, seq: u64) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(game_id) {
            Some(handle) if handle.seq == seq => {
                sessions.remove(game_id);
                log::info!("[{}] Session finished", game_id);
                true
            }
            _ => false,
        }
    }

    pub async fn contains(&self, game_id: &str) -> bool {
        self.sessions.lock().await.contains_key(game_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// IDs of games with a session, sorted
    pub async fn game_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Abort every session
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.lock().await;
        for (game_id, handle) in sessions.drain() {
            handle.task.abort();
            log::debug!("[{}] Session aborted on shutdown", game_id);
        }
    }
}
