//! In-process stand-in for the board side of the link.
//!
//! [`SimLines`] is a shared set of line levels; [`SimulatedPeer`] drives the
//! peer's half of them (clock, valid, data, ready, overwrite) following the
//! same handshake the board firmware uses. Run the peer concurrently with a
//! [`crate::BitLink`] on a paused tokio clock to exercise whole transfers
//! without real delays.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chess_codec::{DecodeError, Frame};
use tokio::time::sleep;

use crate::error::LinkError;
use crate::lines::{InputLine, Level, OutputLine, SignalLines};

#[derive(Debug, Default)]
struct Bus {
    clock: Level,
    valid_in: Level,
    data_in: Level,
    ready_in: Level,
    overwrite: Level,
    ready_out: Level,
    valid_out: Level,
    data_out: Level,
}

impl Bus {
    fn input(&mut self, line: InputLine) -> &mut Level {
        match line {
            InputLine::Clock => &mut self.clock,
            InputLine::ValidIn => &mut self.valid_in,
            InputLine::DataIn => &mut self.data_in,
            InputLine::ReadyIn => &mut self.ready_in,
            InputLine::Overwrite => &mut self.overwrite,
        }
    }

    fn output(&mut self, line: OutputLine) -> &mut Level {
        match line {
            OutputLine::ReadyOut => &mut self.ready_out,
            OutputLine::ValidOut => &mut self.valid_out,
            OutputLine::DataOut => &mut self.data_out,
        }
    }
}

/// Shared line levels. Clones see the same bus.
#[derive(Debug, Clone, Default)]
pub struct SimLines {
    bus: Arc<Mutex<Bus>>,
}

impl SimLines {
    pub fn new() -> Self {
        Self::default()
    }

    fn bus(&self) -> MutexGuard<'_, Bus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive a peer-owned line.
    pub fn set_input(&self, line: InputLine, level: Level) {
        *self.bus().input(line) = level;
    }

    pub fn input(&self, line: InputLine) -> Level {
        *self.bus().input(line)
    }

    /// Level this node is driving on `line`.
    pub fn output(&self, line: OutputLine) -> Level {
        *self.bus().output(line)
    }
}

impl SignalLines for SimLines {
    fn read(&mut self, line: InputLine) -> Result<Level, LinkError> {
        let mut bus = self.bus.lock().map_err(|_| LinkError::Poisoned)?;
        Ok(*bus.input(line))
    }

    fn write(&mut self, line: OutputLine, level: Level) -> Result<(), LinkError> {
        let mut bus = self.bus.lock().map_err(|_| LinkError::Poisoned)?;
        *bus.output(line) = level;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("Link never raised {0} within {1} clock cycles")]
    NoHandshake(OutputLine, u32),

    #[error(transparent)]
    Frame(#[from] DecodeError),
}

/// The board side of the link, clocking every transfer.
#[derive(Debug, Clone)]
pub struct SimulatedPeer {
    lines: SimLines,
    half_period: Duration,
    settle: Duration,
    max_cycles: u32,
}

impl SimulatedPeer {
    pub fn new(lines: SimLines) -> Self {
        Self {
            lines,
            half_period: Duration::from_millis(10),
            settle: Duration::from_millis(1),
            max_cycles: 1000,
        }
    }

    pub fn with_half_period(mut self, half_period: Duration) -> Self {
        self.half_period = half_period;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn lines(&self) -> &SimLines {
        &self.lines
    }

    /// Run the clock with nothing to say.
    pub async fn idle_cycles(&self, cycles: u32) {
        for _ in 0..cycles {
            sleep(self.half_period).await;
            self.lines.set_input(InputLine::Clock, Level::High);
            sleep(self.half_period).await;
            self.lines.set_input(InputLine::Clock, Level::Low);
        }
    }

    /// Send a whole frame once the link is listening.
    pub async fn send(&self, frame: Frame) -> Result<(), PeerError> {
        self.send_bits(frame, frame.width()).await
    }

    /// Start sending `frame` but stop the clock after `stop_after` bits, as a
    /// board that lost power mid-frame would.
    pub async fn send_truncated(&self, frame: Frame, stop_after: u8) -> Result<(), PeerError> {
        self.send_bits(frame, stop_after).await
    }

    async fn send_bits(&self, frame: Frame, stop_after: u8) -> Result<(), PeerError> {
        let lines = &self.lines;
        lines.set_input(InputLine::DataIn, Level::from(frame.bit(0).unwrap_or(false)));
        lines.set_input(InputLine::ValidIn, Level::High);

        let mut counted: u8 = 0;
        for _ in 0..self.max_cycles {
            sleep(self.half_period).await;
            lines.set_input(InputLine::Clock, Level::High);
            if counted > 0 || lines.output(OutputLine::ReadyOut).is_high() {
                counted += 1;
            }

            sleep(self.half_period).await;
            lines.set_input(InputLine::Clock, Level::Low);
            if counted == frame.width() {
                lines.set_input(InputLine::ValidIn, Level::Low);
                lines.set_input(InputLine::DataIn, Level::Low);
                return Ok(());
            }
            if counted == stop_after {
                return Ok(());
            }
            if counted > 0 {
                let bit = frame.bit(counted).unwrap_or(false);
                lines.set_input(InputLine::DataIn, Level::from(bit));
            }
        }

        lines.set_input(InputLine::ValidIn, Level::Low);
        Err(PeerError::NoHandshake(OutputLine::ReadyOut, self.max_cycles))
    }

    /// Listen for a frame of `width` bits from the link.
    pub async fn receive(&self, width: u8) -> Result<Frame, PeerError> {
        let bits = self.receive_bits(width).await?;
        Ok(Frame::from_bits(&bits)?)
    }

    /// Start listening but stop the clock after sampling `stop_after` bits.
    pub async fn receive_truncated(&self, stop_after: u8) -> Result<(), PeerError> {
        self.receive_bits(stop_after).await.map(|_| ())
    }

    async fn receive_bits(&self, count: u8) -> Result<Vec<bool>, PeerError> {
        let lines = &self.lines;
        lines.set_input(InputLine::ReadyIn, Level::High);

        let mut bits = Vec::with_capacity(usize::from(count));
        let mut started = false;
        for _ in 0..self.max_cycles {
            sleep(self.half_period).await;
            lines.set_input(InputLine::Clock, Level::High);
            if !started && lines.output(OutputLine::ValidOut).is_high() {
                started = true;
                lines.set_input(InputLine::ReadyIn, Level::Low);
            }

            if started {
                sleep(self.settle).await;
                bits.push(lines.output(OutputLine::DataOut).is_high());
                sleep(self.half_period.saturating_sub(self.settle)).await;
            } else {
                sleep(self.half_period).await;
            }
            lines.set_input(InputLine::Clock, Level::Low);

            if bits.len() == usize::from(count) {
                return Ok(bits);
            }
        }

        lines.set_input(InputLine::ReadyIn, Level::Low);
        Err(PeerError::NoHandshake(OutputLine::ValidOut, self.max_cycles))
    }

    /// Watch the bring-up preamble and raise `overwrite` after `toggles`
    /// level changes on `data`. Returns how many changes were seen.
    pub async fn acknowledge_preamble(&self, toggles: u32) -> u32 {
        let mut previous = self.lines.output(OutputLine::DataOut);
        let mut seen = 0;
        while seen < toggles {
            sleep(Duration::from_millis(1)).await;
            let current = self.lines.output(OutputLine::DataOut);
            if current != previous {
                seen += 1;
                previous = current;
            }
        }
        self.lines.set_input(InputLine::Overwrite, Level::High);
        seen
    }
}
