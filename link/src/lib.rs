//! Bit-serial valid/ready/clock link to the move-input board.
//!
//! The peer drives the clock. Every transfer is gated by a handshake: the
//! sender raises `valid`, the receiver raises `ready`, and the first rising
//! clock edge that sees both starts the frame. Bits are sampled on rising edges
//! and changed on falling edges.
//!
//! Signal levels "at an edge" are the levels observed on the last poll before
//! the edge was seen, so a line the other side changes in reaction to the edge
//! does not qualify it.

pub mod bringup;
pub mod edge;
pub mod error;
pub mod lines;
pub mod link;
pub mod receiver;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod sysfs;
pub mod timing;
pub mod transmitter;

pub use error::{LinkError, LinkStage};
pub use lines::{Edge, InputLine, Level, OutputLine, SignalLines};
pub use link::{BitLink, LinkState, ReceiverState, TransmitterState};
pub use sysfs::{PinMap, SysfsLines};
pub use timing::LinkTiming;
