//! chessbridge - connects a chess move-input board to Stockfish.
//!
//! Opens the GPIO lines to the board, starts one Stockfish process per side,
//! and serves frames until interrupted. Every tunable has a `CHESSBRIDGE_*`
//! environment variable (see [`chessbridge::config`]); the flags below take
//! precedence.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chess_codec::FrameLayout;
use chess_link::{BitLink, SysfsLines};
use chessbridge::{config, run, GameCoordinator};
use clap::{Parser, ValueEnum};
use engine::{EngineConfig, EnginePair, GoParams, StockfishEngine};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "chessbridge", about = "Bridge a chess move-input board to a UCI engine")]
struct Cli {
    /// Frame layout spoken by the board.
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Stockfish executable. Searched for in the usual places when omitted.
    #[arg(long)]
    stockfish: Option<PathBuf>,

    /// Search depth per engine move.
    #[arg(long)]
    depth: Option<u8>,

    /// Root of the sysfs GPIO tree.
    #[arg(long)]
    gpio_root: Option<PathBuf>,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// Two-bit promotion field (16-bit inbound frames).
    V1,
    /// Three-bit promotion field (17-bit inbound frames).
    V2,
}

impl From<LayoutArg> for FrameLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::V1 => FrameLayout::V1,
            LayoutArg::V2 => FrameLayout::V2,
        }
    }
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let (non_blocking, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();
    Ok(Some(guard))
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    let layout = cli.layout.map(FrameLayout::from).unwrap_or_else(config::get_layout);
    tracing::info!(
        "Starting chessbridge (layout v{}, {}-bit inbound frames)",
        layout.version,
        layout.inbound_width()
    );

    let gpio_root = cli.gpio_root.unwrap_or_else(config::get_gpio_root);
    let pins = config::get_pin_map();
    tracing::debug!("Pins: {:?}", pins);
    let lines = SysfsLines::open(&gpio_root, pins)
        .with_context(|| format!("opening GPIO lines under {}", gpio_root.display()))?;
    let mut link = BitLink::new(lines, config::get_link_timing());

    let engine_config = EngineConfig {
        path: cli.stockfish.or_else(config::get_stockfish_path),
        threads: Some(config::get_engine_threads()),
        hash_mb: config::get_engine_hash_mb(),
        search: GoParams {
            movetime: None,
            depth: Some(cli.depth.unwrap_or_else(config::get_search_depth)),
        },
        move_timeout: config::get_move_timeout(),
    };
    let white = StockfishEngine::spawn(engine_config.clone())
        .await
        .context("starting engine for white")?;
    let black = StockfishEngine::spawn(engine_config)
        .await
        .context("starting engine for black")?;
    let mut coordinator = GameCoordinator::new(layout, EnginePair::new(white, black));

    let result = run(&mut link, &mut coordinator, shutdown_signal()).await;

    // Release the lines before waiting on the engines.
    drop(link);
    for engine in coordinator.into_engines().into_engines() {
        engine.shutdown().await;
    }

    result.context("link to the board failed")?;
    tracing::info!("chessbridge stopped");
    Ok(())
}
