use std::fmt;
use std::time::Duration;

use chess_codec::DecodeError;
use thiserror::Error;

use crate::lines::{Edge, InputLine};

/// Where in the handshake a link operation was when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStage {
    /// Receiver waiting for the peer to raise `valid`.
    Armed,
    /// Receiver part way through a frame.
    Receiving,
    /// Transmitter waiting for the peer to raise `ready`.
    AwaitingReady,
    /// Transmitter part way through a frame.
    Sending,
}

impl fmt::Display for LinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Armed => "armed",
            Self::Receiving => "receiving",
            Self::AwaitingReady => "awaiting ready",
            Self::Sending => "sending",
        })
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    /// No qualifying clock edge arrived in time. The frame was abandoned.
    #[error("Synchronization lost while {stage} after {bits} bits")]
    SyncLost { stage: LinkStage, bits: u8 },

    #[error("Timed out waiting for {edge:?} edge on {line}")]
    EdgeTimeout { line: InputLine, edge: Edge },

    #[error("Peer did not acknowledge bring-up within {0:?}")]
    BringUpTimeout(Duration),

    #[error("Link used before bring-up completed")]
    NotBroughtUp,

    #[error("GPIO {pin} I/O error: {source}")]
    Gpio {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("GPIO {0} did not appear after export")]
    Export(u32),

    #[error("Pin {pin} assigned to both {first} and {second}")]
    PinConflict {
        pin: u32,
        first: &'static str,
        second: &'static str,
    },

    #[error("Received bits do not form a frame: {0}")]
    Frame(#[from] DecodeError),

    #[error("Simulated line bus is poisoned")]
    Poisoned,
}

impl LinkError {
    /// Faults that only cost the current frame. Anything else means the lines
    /// themselves are unusable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SyncLost { .. } | Self::EdgeTimeout { .. } | Self::Frame(_)
        )
    }
}
