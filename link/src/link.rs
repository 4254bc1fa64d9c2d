use crate::lines::SignalLines;
use crate::timing::LinkTiming;

/// Receiver handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverState {
    #[default]
    Idle,
    /// `ready` asserted, waiting for a rising edge with `valid` high.
    Armed,
    Receiving {
        bits: u8,
    },
    Complete,
}

/// Transmitter handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransmitterState {
    #[default]
    Idle,
    Sending {
        bit: u8,
    },
    Done,
}

/// Everything the link remembers between operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkState {
    pub receiver: ReceiverState,
    pub transmitter: TransmitterState,
    pub brought_up: bool,
}

/// One end of the board link.
///
/// Owns the signal lines for its whole lifetime and drives every owned line
/// low when dropped, whatever state the handshake was left in.
pub struct BitLink<L: SignalLines> {
    pub(crate) lines: L,
    pub(crate) timing: LinkTiming,
    pub(crate) state: LinkState,
}

impl<L: SignalLines> BitLink<L> {
    pub fn new(lines: L, timing: LinkTiming) -> Self {
        Self {
            lines,
            timing,
            state: LinkState::default(),
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }
}

impl<L: SignalLines> Drop for BitLink<L> {
    fn drop(&mut self) {
        match self.lines.release() {
            Ok(()) => tracing::debug!("Signal lines released"),
            Err(e) => tracing::error!("Failed to release signal lines: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::{Level, OutputLine};
    use crate::sim::SimLines;

    #[test]
    fn test_drop_releases_every_output() {
        let mut lines = SimLines::new();
        for line in OutputLine::ALL {
            lines.write(line, Level::High).unwrap();
        }

        let link = BitLink::new(lines.clone(), LinkTiming::default());
        assert_eq!(link.state(), &LinkState::default());
        drop(link);

        for line in OutputLine::ALL {
            assert_eq!(lines.output(line), Level::Low, "{} still driven", line);
        }
    }
}
