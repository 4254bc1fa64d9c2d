//! Edge detection by polling.
//!
//! Time comes from `tokio::time`, so tests running on a paused clock see
//! synthetic edges without any real delay.

use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::LinkError;
use crate::lines::{Edge, InputLine, Level, SignalLines};

/// Wait until `line` makes the `edge` transition, or until `deadline`.
///
/// Only transitions observed after the call count; a line that is already
/// high does not satisfy a rising-edge wait.
pub async fn wait_for_edge<L: SignalLines + ?Sized>(
    lines: &mut L,
    line: InputLine,
    edge: Edge,
    deadline: Instant,
    poll: Duration,
) -> Result<(), LinkError> {
    let mut previous = lines.read(line)?;
    loop {
        if Instant::now() >= deadline {
            return Err(LinkError::EdgeTimeout { line, edge });
        }
        sleep(poll).await;
        let current = lines.read(line)?;
        if edge.between(previous, current) {
            return Ok(());
        }
        previous = current;
    }
}

/// Like [`wait_for_edge`], but also report the level `qualifier` had on the
/// last poll before the edge.
pub async fn wait_for_qualified_edge<L: SignalLines + ?Sized>(
    lines: &mut L,
    line: InputLine,
    edge: Edge,
    qualifier: InputLine,
    deadline: Instant,
    poll: Duration,
) -> Result<Level, LinkError> {
    let mut previous = lines.read(line)?;
    let mut qualified = lines.read(qualifier)?;
    loop {
        if Instant::now() >= deadline {
            return Err(LinkError::EdgeTimeout { line, edge });
        }
        sleep(poll).await;
        let current = lines.read(line)?;
        if edge.between(previous, current) {
            return Ok(qualified);
        }
        previous = current;
        qualified = lines.read(qualifier)?;
    }
}
