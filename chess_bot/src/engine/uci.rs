//! UCI engine process over stdin/stdout.

use super::errors::EngineError;
use super::models::EngineParams;
use async_trait::async_trait;
use chess::{ChessMove, Piece, Square};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Timeout for handshake and `isready` round trips
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Time a process gets to exit after `quit` before it is killed
pub const QUIT_GRACE: Duration = Duration::from_secs(2);

/// A running move-computation process
#[async_trait]
pub trait EngineProcess: Send {
    /// Apply strength parameters
    async fn configure(&mut self, params: &EngineParams) -> Result<(), EngineError>;

    /// Search the position and return the best move in UCI notation.
    ///
    /// `Ok(None)` means the engine found no move.
    async fn best_move(
        &mut self,
        fen: &str,
        think_time: Duration,
    ) -> Result<Option<String>, EngineError>;

    /// Stop the process
    async fn quit(&mut self) -> Result<(), EngineError>;
}

/// Starts engine processes
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn EngineProcess>, EngineError>;
}

/// Extract the move from a `bestmove` line
pub fn parse_best_move(line: &str) -> Option<String> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("bestmove") {
        return None;
    }
    match parts.next() {
        Some("(none)") | Some("0000") | None => None,
        Some(mv) => Some(mv.to_string()),
    }
}

/// Parse a UCI move such as `e2e4` or `e7e8q`
pub fn parse_uci_move(uci: &str) -> Option<ChessMove> {
    let uci = uci.trim();
    if !(4..=5).contains(&uci.len()) || !uci.is_ascii() {
        return None;
    }

    let from = Square::from_str(&uci[0..2]).ok()?;
    let to = Square::from_str(&uci[2..4]).ok()?;
    let promotion = match uci.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return None,
    };

    Some(ChessMove::new(from, to, promotion))
}

/// UCI engine child process
#[derive(Debug)]
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// A `go` was sent and its `bestmove` not read yet
    searching: bool,
}

impl UciEngine {
    /// Spawn the executable and complete the `uci`/`uciok` handshake.
    ///
    /// # Arguments
    ///
    /// * `path` - Engine executable
    /// * `args` - Extra command-line arguments
    pub async fn spawn(path: &Path, args: &[String]) -> Result<Self, EngineError> {
        if !path.exists() {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }

        let mut command = Command::new(path);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // Keep terminal signals meant for the agent away from the engine
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| EngineError::Launch(format!("{}: {}", path.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Launch("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Launch("stdout not captured".to_string()))?;

        let mut engine = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            searching: false,
        };

        engine.send("uci").await?;
        engine.expect("uci", "uciok", HANDSHAKE_TIMEOUT).await?;
        log::info!("Engine {} completed UCI handshake", path.display());

        Ok(engine)
    }

    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        log::trace!("engine <- {}", command);
        let line = format!("{}\n", command);
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|_| EngineError::Terminated)?;
        self.stdin.flush().await.map_err(|_| EngineError::Terminated)
    }

    /// Read lines until one starts with `prefix`
    async fn read_until(&mut self, prefix: &str) -> Result<String, EngineError> {
        loop {
            match self.stdout.next_line().await {
                Ok(Some(line)) => {
                    log::trace!("engine -> {}", line);
                    if line.starts_with(prefix) {
                        return Ok(line);
                    }
                }
                Ok(None) => return Err(EngineError::Terminated),
                Err(e) => return Err(EngineError::Protocol(e.to_string())),
            }
        }
    }

    async fn expect(
        &mut self,
        command: &str,
        prefix: &str,
        timeout: Duration,
    ) -> Result<String, EngineError> {
        tokio::time::timeout(timeout, self.read_until(prefix))
            .await
            .map_err(|_| EngineError::Unresponsive {
                command: command.to_string(),
                timeout,
            })?
    }

    async fn sync_ready(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;
        self.expect("isready", "readyok", HANDSHAKE_TIMEOUT).await?;
        Ok(())
    }

    /// Finish a search whose caller gave up, discarding its result
    async fn drain_search(&mut self) -> Result<(), EngineError> {
        self.send("stop").await?;
        let late = self.expect("stop", "bestmove", HANDSHAKE_TIMEOUT).await?;
        log::debug!("Discarded late engine result: {}", late);
        self.searching = false;
        Ok(())
    }
}

#[async_trait]
impl EngineProcess for UciEngine {
    async fn configure(&mut self, params: &EngineParams) -> Result<(), EngineError> {
        if self.searching {
            self.drain_search().await?;
        }
        for (name, value) in params.uci_options() {
            self.send(&format!("setoption name {} value {}", name, value))
                .await?;
        }
        self.sync_ready().await
    }

    async fn best_move(
        &mut self,
        fen: &str,
        think_time: Duration,
    ) -> Result<Option<String>, EngineError> {
        if self.searching {
            self.drain_search().await?;
        }

        self.send(&format!("position fen {}", fen)).await?;
        self.send(&format!("go movetime {}", think_time.as_millis()))
            .await?;
        self.searching = true;

        // Bounded by the caller; a dropped call leaves `searching` set
        let line = self.read_until("bestmove").await?;
        self.searching = false;
        Ok(parse_best_move(&line))
    }

    async fn quit(&mut self) -> Result<(), EngineError> {
        if let Err(e) = self.send("quit").await {
            log::debug!("Engine quit command failed: {}", e);
        }

        match tokio::time::timeout(QUIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                log::info!("Engine exited with {}", status);
                Ok(())
            }
            Ok(Err(e)) => Err(EngineError::Protocol(e.to_string())),
            Err(_) => {
                log::warn!("Engine ignored quit, killing it");
                self.child
                    .kill()
                    .await
                    .map_err(|e| EngineError::Protocol(e.to_string()))
            }
        }
    }
}

/// Launches [`UciEngine`] processes from a fixed executable
#[derive(Debug, Clone)]
pub struct UciLauncher {
    path: PathBuf,
    args: Vec<String>,
}

impl UciLauncher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }

    /// Pass extra arguments to the executable
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EngineLauncher for UciLauncher {
    async fn launch(&self) -> Result<Box<dyn EngineProcess>, EngineError> {
        let engine = UciEngine::spawn(&self.path, &self.args).await?;
        Ok(Box::new(engine))
    }
}
