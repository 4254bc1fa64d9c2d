use crate::uci::{format_uci_move, parse_uci_message, UciError, UciMessage};
use crate::{EngineAdapter, EngineError, EngineEvent, GoParams};
use async_trait::async_trait;
use cozy_chess::Move;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;

/// Stockfish accepts skill levels in this range.
pub const MAX_SKILL_LEVEL: u32 = 20;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a search that overran gets to answer `stop`.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    event_rx: mpsc::Receiver<EngineEvent>,
    moves: Vec<Move>,
    search: GoParams,
    move_timeout: Duration,
}

/// Configuration for one engine process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Executable to run. Searched for in common locations when unset.
    pub path: Option<PathBuf>,
    /// `Threads` option. Stockfish's own default when unset.
    pub threads: Option<u32>,
    /// `Hash` option in MB. Stockfish's own default when unset.
    pub hash_mb: Option<u32>,
    pub search: GoParams,
    /// How long to wait for `bestmove` after `go`.
    pub move_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            threads: None,
            hash_mb: None,
            search: GoParams {
                movetime: None,
                depth: Some(10),
            },
            move_timeout: Duration::from_secs(30),
        }
    }
}

impl StockfishEngine {
    /// Spawn a Stockfish process and complete the UCI handshake.
    #[tracing::instrument(level = "info")]
    pub async fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        let path = find_stockfish_path(config.path.as_deref()).ok_or(EngineError::NotFound)?;
        tracing::info!("Found Stockfish at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn Stockfish: {}", e);
                EngineError::Spawn(e)
            })?;

        let stdin = process.stdin.take().ok_or(UciError::NoStdin)?;
        let stdout = process.stdout.take().ok_or(UciError::NoStdout)?;

        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(32);

        // Output reader task
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("Stockfish stdout EOF - engine closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);

                        let event = match parse_uci_message(trimmed) {
                            Ok(UciMessage::UciOk) | Ok(UciMessage::ReadyOk) => EngineEvent::Ready,
                            Ok(UciMessage::BestMove { mv, .. }) => {
                                tracing::debug!("Received bestmove: {:?}", mv);
                                EngineEvent::BestMove(mv)
                            }
                            Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
                            Ok(msg) => {
                                tracing::trace!("Ignoring UCI message: {:?}", msg);
                                continue;
                            }
                            Err(e) => {
                                tracing::trace!("Failed to parse UCI message: {}", e);
                                continue;
                            }
                        };

                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from Stockfish stdout: {}", e);
                        break;
                    }
                }
            }
            tracing::info!("Output reader task exiting");
        });

        let mut engine = Self {
            process,
            stdin,
            event_rx,
            moves: Vec::new(),
            search: config.search,
            move_timeout: config.move_timeout,
        };

        engine.send("uci").await?;
        engine.wait_ready(HANDSHAKE_TIMEOUT, "uciok").await?;

        if let Some(threads) = config.threads {
            let threads = threads.clamp(1, 16);
            tracing::info!("Setting Threads to {}", threads);
            engine.set_option("Threads", threads).await?;
        }
        if let Some(hash_mb) = config.hash_mb {
            let hash_mb = hash_mb.clamp(1, 2048);
            tracing::info!("Setting Hash to {} MB", hash_mb);
            engine.set_option("Hash", hash_mb).await?;
        }

        engine.send("ucinewgame").await?;
        engine.sync().await?;

        tracing::info!("Stockfish engine spawned and initialized successfully");
        Ok(engine)
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        tracing::trace!("UCI >> {}", cmd);
        self.stdin.write_all(cmd.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn set_option(&mut self, name: &str, value: impl std::fmt::Display) -> Result<(), EngineError> {
        self.send(&format!("setoption name {} value {}", name, value))
            .await
    }

    /// `isready` round trip, so earlier commands have taken effect.
    async fn sync(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;
        self.wait_ready(HANDSHAKE_TIMEOUT, "readyok").await
    }

    async fn wait_ready(&mut self, timeout: Duration, what: &'static str) -> Result<(), EngineError> {
        let event_rx = &mut self.event_rx;
        tokio::time::timeout(timeout, async {
            while let Some(event) = event_rx.recv().await {
                if matches!(event, EngineEvent::Ready) {
                    return Ok(());
                }
            }
            Err(EngineError::Closed)
        })
        .await
        .map_err(|_| {
            tracing::error!("Timeout waiting for {}", what);
            EngineError::Timeout(timeout, what)
        })?
    }

    async fn wait_best_move(&mut self) -> Result<Option<Move>, EngineError> {
        let timeout = self.move_timeout;
        match tokio::time::timeout(timeout, next_best_move(&mut self.event_rx)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("No bestmove within {:?}, stopping the search", timeout);
                self.abandon_search().await;
                Err(EngineError::Timeout(timeout, "bestmove"))
            }
        }
    }

    /// Stop a search that overran and consume its `bestmove`, so it is not
    /// taken as the answer to the next `go`.
    async fn abandon_search(&mut self) {
        if let Err(e) = self.send("stop").await {
            tracing::warn!("Failed to send stop: {}", e);
            return;
        }
        match tokio::time::timeout(STOP_TIMEOUT, next_best_move(&mut self.event_rx)).await {
            Ok(Ok(mv)) => tracing::debug!("Discarded bestmove {:?} of the stopped search", mv),
            Ok(Err(e)) => tracing::warn!("Engine gone while stopping the search: {}", e),
            Err(_) => tracing::warn!("Engine did not answer stop within {:?}", STOP_TIMEOUT),
        }
    }

    /// Drop whatever the engine said since the last exchange.
    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            tracing::debug!("Dropping stale engine event: {:?}", event);
        }
    }

    /// Moves played since the last reset.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Shutdown the engine
    pub async fn shutdown(mut self) {
        let _ = self.send("quit").await;
        let _ = tokio::time::timeout(Duration::from_secs(1), self.process.wait()).await;
        let _ = self.process.kill().await;
    }
}

#[async_trait]
impl EngineAdapter for StockfishEngine {
    async fn reset_position(&mut self) -> Result<(), EngineError> {
        self.moves.clear();
        self.send("ucinewgame").await?;
        self.send("position startpos").await?;
        self.sync().await
    }

    async fn apply_moves(&mut self, moves: &[Move]) -> Result<(), EngineError> {
        self.moves.extend_from_slice(moves);
        let cmd = position_command(&self.moves);
        self.send(&cmd).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn best_move(&mut self) -> Result<Move, EngineError> {
        self.drain_events();
        let cmd = position_command(&self.moves);
        self.send(&cmd).await?;
        let cmd = go_command(&self.search);
        self.send(&cmd).await?;

        let mv = self.wait_best_move().await?.ok_or(EngineError::NoLegalMove)?;
        tracing::info!("Engine chose {}", format_uci_move(&mv));
        Ok(mv)
    }

    async fn set_skill(&mut self, level: u32) -> Result<(), EngineError> {
        let clamped = level.min(MAX_SKILL_LEVEL);
        if clamped != level {
            tracing::warn!(
                "Skill level {} above {}, using {}",
                level,
                MAX_SKILL_LEVEL,
                clamped
            );
        }
        tracing::info!("Setting skill level to {}", clamped);
        self.set_option("Skill Level", clamped).await?;
        self.sync().await
    }
}

async fn next_best_move(
    event_rx: &mut mpsc::Receiver<EngineEvent>,
) -> Result<Option<Move>, EngineError> {
    while let Some(event) = event_rx.recv().await {
        match event {
            EngineEvent::BestMove(mv) => return Ok(mv),
            EngineEvent::Info(info) => tracing::trace!("Engine info: {:?}", info),
            EngineEvent::Ready => {}
        }
    }
    Err(EngineError::Closed)
}

/// `position startpos [moves ...]`
pub fn position_command(moves: &[Move]) -> String {
    let mut cmd = "position startpos".to_string();
    if !moves.is_empty() {
        cmd.push_str(" moves");
        for mv in moves {
            cmd.push(' ');
            cmd.push_str(&format_uci_move(mv));
        }
    }
    cmd
}

pub fn go_command(params: &GoParams) -> String {
    if let Some(movetime) = params.movetime {
        format!("go movetime {}", movetime)
    } else if let Some(depth) = params.depth {
        format!("go depth {}", depth)
    } else {
        "go movetime 1000".to_string()
    }
}

/// Find the Stockfish executable, preferring `explicit` when given.
pub fn find_stockfish_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    for path_str in paths {
        let path = Path::new(path_str);
        if path.exists() || path_str == "stockfish" {
            if std::process::Command::new(path_str)
                .arg("--help")
                .output()
                .is_ok()
            {
                return Some(PathBuf::from(path_str));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::parse_uci_move;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable `sh` script that speaks just enough UCI. Every
    /// command it reads is appended to `commands.log` in the same directory.
    /// `on_go` runs for each `go`, with `$n` counting them from 1.
    fn fake_engine(dir: &TempDir, on_go: &str) -> PathBuf {
        let log = dir.path().join("commands.log");
        let script = format!(
            "#!/bin/sh\n\
             n=0\n\
             while read -r line; do\n\
             echo \"$line\" >> '{log}'\n\
             case \"$line\" in\n\
             uci) echo uciok ;;\n\
             isready) echo readyok ;;\n\
             go*) n=$((n+1)); {on_go} ;;\n\
             quit) exit 0 ;;\n\
             esac\n\
             done\n",
            log = log.display(),
            on_go = on_go,
        );
        let path = dir.path().join("fake-stockfish");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn commands(dir: &TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("commands.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_position_command() {
        assert_eq!(position_command(&[]), "position startpos");
        let moves = [
            parse_uci_move("e2e4").unwrap(),
            parse_uci_move("e7e5").unwrap(),
        ];
        assert_eq!(
            position_command(&moves),
            "position startpos moves e2e4 e7e5"
        );
    }

    #[test]
    fn test_go_command() {
        assert_eq!(go_command(&GoParams::default()), "go movetime 1000");
        let depth = GoParams {
            movetime: None,
            depth: Some(12),
        };
        assert_eq!(go_command(&depth), "go depth 12");
        let both = GoParams {
            movetime: Some(250),
            depth: Some(12),
        };
        assert_eq!(go_command(&both), "go movetime 250");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let missing = Path::new("/nonexistent/stockfish");
        assert_eq!(find_stockfish_path(Some(missing)), None);
    }

    #[tokio::test]
    async fn test_spawn_sets_threads_and_hash() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig {
            path: Some(fake_engine(&dir, "echo 'bestmove e2e4'")),
            threads: Some(2),
            hash_mb: Some(64),
            ..EngineConfig::default()
        };
        let engine = StockfishEngine::spawn(config).await.unwrap();
        engine.shutdown().await;

        let sent = commands(&dir);
        assert!(sent.contains(&"setoption name Threads value 2".to_string()));
        assert!(sent.contains(&"setoption name Hash value 64".to_string()));
    }

    #[tokio::test]
    async fn test_late_bestmove_is_not_reused() {
        let dir = TempDir::new().unwrap();
        // The first search answers long after the timeout and ignores stop.
        let on_go = "if [ $n -eq 1 ]; then (sleep 2; echo 'bestmove e2e4') & \
                     else echo 'bestmove d2d4'; fi";
        let config = EngineConfig {
            path: Some(fake_engine(&dir, on_go)),
            move_timeout: Duration::from_secs(1),
            ..EngineConfig::default()
        };
        let mut engine = StockfishEngine::spawn(config).await.unwrap();

        assert!(matches!(
            engine.best_move().await,
            Err(EngineError::Timeout(_, "bestmove"))
        ));
        let mv = engine.best_move().await.unwrap();
        assert_eq!(mv, parse_uci_move("d2d4").unwrap());
        engine.shutdown().await;

        assert!(commands(&dir).contains(&"stop".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let config = EngineConfig {
            path: Some(PathBuf::from("/nonexistent/stockfish")),
            ..EngineConfig::default()
        };
        assert!(matches!(
            StockfishEngine::spawn(config).await,
            Err(EngineError::NotFound)
        ));
    }
}
