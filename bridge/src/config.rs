//! Configuration for the bridge runtime.
//!
//! Every value has a compile-time default and can be overridden with a
//! `CHESSBRIDGE_*` environment variable. Command-line flags in `main` take
//! precedence over both.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chess_codec::FrameLayout;
use chess_link::sysfs::DEFAULT_GPIO_ROOT;
use chess_link::{InputLine, LinkTiming, OutputLine, PinMap};

/// Default Stockfish search depth per move.
const DEFAULT_SEARCH_DEPTH: u8 = 10;

/// Default Stockfish `Threads` per engine process.
const DEFAULT_ENGINE_THREADS: u32 = 2;

/// Default time to wait for the engine's `bestmove` (in seconds).
const DEFAULT_MOVE_TIMEOUT_SECS: u64 = 30;

/// Default time to wait for the board to start a frame (in milliseconds).
const DEFAULT_ARM_TIMEOUT_MS: u64 = 5000;

/// Default time to wait for each clock edge inside a frame (in milliseconds).
const DEFAULT_BIT_TIMEOUT_MS: u64 = 1000;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1;
const DEFAULT_SETTLE_DELAY_MS: u64 = 1;
const DEFAULT_PREAMBLE_PERIOD_MS: u64 = 10;

/// Parse `value`, falling back to `default` when it is missing or malformed.
fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    parse_or(std::env::var(name).ok(), default)
}

fn env_millis(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_or(name, default_ms))
}

/// Name of the variable overriding the pin for a line role, e.g.
/// `CHESSBRIDGE_PIN_VALID_IN`.
fn pin_var(role: &str) -> String {
    format!("CHESSBRIDGE_PIN_{}", role.to_uppercase().replace('-', "_"))
}

/// Get the frame layout spoken by the board.
///
/// Priority:
/// 1. `CHESSBRIDGE_LAYOUT` env variable (`1` or `2`) if set and known
/// 2. [`FrameLayout::V1`] as fallback
pub fn get_layout() -> FrameLayout {
    std::env::var("CHESSBRIDGE_LAYOUT")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .and_then(FrameLayout::from_version)
        .unwrap_or_default()
}

/// Get the sysfs GPIO root.
///
/// Priority:
/// 1. `CHESSBRIDGE_GPIO_ROOT` env variable if set
/// 2. `/sys/class/gpio` as fallback
pub fn get_gpio_root() -> PathBuf {
    if let Ok(path) = std::env::var("CHESSBRIDGE_GPIO_ROOT") {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_GPIO_ROOT)
}

/// Get the GPIO number for every line role. Each role reads its own
/// `CHESSBRIDGE_PIN_<ROLE>` variable and keeps the [`PinMap::default`] pin
/// otherwise.
pub fn get_pin_map() -> PinMap {
    let defaults = PinMap::default();
    let input = |line: InputLine| env_or(&pin_var(line.as_str()), defaults.input(line));
    let output = |line: OutputLine| env_or(&pin_var(line.as_str()), defaults.output(line));

    PinMap {
        clock: input(InputLine::Clock),
        valid_in: input(InputLine::ValidIn),
        data_in: input(InputLine::DataIn),
        ready_in: input(InputLine::ReadyIn),
        overwrite: input(InputLine::Overwrite),
        ready_out: output(OutputLine::ReadyOut),
        valid_out: output(OutputLine::ValidOut),
        data_out: output(OutputLine::DataOut),
    }
}

/// Get handshake timing.
///
/// Reads `CHESSBRIDGE_ARM_TIMEOUT_MS`, `CHESSBRIDGE_BIT_TIMEOUT_MS`,
/// `CHESSBRIDGE_POLL_INTERVAL_MS`, `CHESSBRIDGE_SETTLE_DELAY_MS` and
/// `CHESSBRIDGE_PREAMBLE_PERIOD_MS`. Bring-up waits forever unless
/// `CHESSBRIDGE_BRINGUP_TIMEOUT_SECS` is set.
pub fn get_link_timing() -> LinkTiming {
    LinkTiming {
        poll_interval: env_millis("CHESSBRIDGE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
        settle_delay: env_millis("CHESSBRIDGE_SETTLE_DELAY_MS", DEFAULT_SETTLE_DELAY_MS),
        arm_timeout: env_millis("CHESSBRIDGE_ARM_TIMEOUT_MS", DEFAULT_ARM_TIMEOUT_MS),
        bit_timeout: env_millis("CHESSBRIDGE_BIT_TIMEOUT_MS", DEFAULT_BIT_TIMEOUT_MS),
        preamble_bit_period: env_millis(
            "CHESSBRIDGE_PREAMBLE_PERIOD_MS",
            DEFAULT_PREAMBLE_PERIOD_MS,
        ),
        bringup_timeout: std::env::var("CHESSBRIDGE_BRINGUP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs),
    }
}

/// Get an explicit Stockfish executable, if configured.
///
/// Reads `CHESSBRIDGE_STOCKFISH_PATH`. When unset the engine searches the
/// usual install locations.
pub fn get_stockfish_path() -> Option<PathBuf> {
    std::env::var("CHESSBRIDGE_STOCKFISH_PATH")
        .ok()
        .map(PathBuf::from)
}

/// Get the search depth for engine moves.
///
/// Priority:
/// 1. `CHESSBRIDGE_DEPTH` env variable if set (falls back to default if the
///    value cannot be parsed as a `u8`)
/// 2. `10` as fallback
pub fn get_search_depth() -> u8 {
    env_or("CHESSBRIDGE_DEPTH", DEFAULT_SEARCH_DEPTH)
}

/// Get the `Threads` option for each engine process.
///
/// Reads `CHESSBRIDGE_THREADS`, default 2.
pub fn get_engine_threads() -> u32 {
    env_or("CHESSBRIDGE_THREADS", DEFAULT_ENGINE_THREADS)
}

/// Get the `Hash` option (in MB) for each engine process, if configured.
///
/// Reads `CHESSBRIDGE_HASH_MB`. When unset Stockfish keeps its own default.
pub fn get_engine_hash_mb() -> Option<u32> {
    std::env::var("CHESSBRIDGE_HASH_MB")
        .ok()
        .and_then(|v| v.trim().parse().ok())
}

/// Get how long to wait for the engine's move.
///
/// Reads `CHESSBRIDGE_MOVE_TIMEOUT_SECS`, default 30 seconds.
pub fn get_move_timeout() -> Duration {
    Duration::from_secs(env_or(
        "CHESSBRIDGE_MOVE_TIMEOUT_SECS",
        DEFAULT_MOVE_TIMEOUT_SECS,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or() {
        assert_eq!(parse_or(Some("42".to_string()), 7u8), 42);
        assert_eq!(parse_or(Some(" 3 ".to_string()), 7u8), 3);
        assert_eq!(parse_or(Some("nope".to_string()), 7u8), 7);
        assert_eq!(parse_or(Some("300".to_string()), 7u8), 7);
        assert_eq!(parse_or(None, 7u8), 7);
    }

    #[test]
    fn test_pin_var() {
        assert_eq!(pin_var("clock"), "CHESSBRIDGE_PIN_CLOCK");
        assert_eq!(pin_var("valid-in"), "CHESSBRIDGE_PIN_VALID_IN");
    }

    #[test]
    fn test_get_gpio_root() {
        let root = get_gpio_root();
        match std::env::var("CHESSBRIDGE_GPIO_ROOT") {
            Ok(val) => assert_eq!(root, PathBuf::from(val)),
            Err(_) => assert_eq!(root, PathBuf::from(DEFAULT_GPIO_ROOT)),
        }
    }

    #[test]
    fn test_get_layout_default() {
        if std::env::var("CHESSBRIDGE_LAYOUT").is_err() {
            assert_eq!(get_layout(), FrameLayout::V1);
        }
    }

    #[test]
    fn test_get_pin_map_is_valid() {
        let pins = get_pin_map();
        if pins == PinMap::default() {
            assert!(pins.validate().is_ok());
        }
    }

    #[test]
    fn test_get_search_depth_default() {
        if std::env::var("CHESSBRIDGE_DEPTH").is_err() {
            assert_eq!(get_search_depth(), DEFAULT_SEARCH_DEPTH);
        }
    }

    #[test]
    fn test_get_engine_options_default() {
        if std::env::var("CHESSBRIDGE_THREADS").is_err() {
            assert_eq!(get_engine_threads(), DEFAULT_ENGINE_THREADS);
        }
        if std::env::var("CHESSBRIDGE_HASH_MB").is_err() {
            assert_eq!(get_engine_hash_mb(), None);
        }
    }

    #[test]
    fn test_get_link_timing_default() {
        let timing = get_link_timing();
        if std::env::var("CHESSBRIDGE_ARM_TIMEOUT_MS").is_err() {
            assert_eq!(timing.arm_timeout, LinkTiming::default().arm_timeout);
        }
        if std::env::var("CHESSBRIDGE_BRINGUP_TIMEOUT_SECS").is_err() {
            assert_eq!(timing.bringup_timeout, None);
        }
    }
}
