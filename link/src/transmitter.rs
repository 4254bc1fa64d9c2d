use chess_codec::Frame;
use tokio::time::Instant;

use crate::edge::{wait_for_edge, wait_for_qualified_edge};
use crate::error::{LinkError, LinkStage};
use crate::lines::{Edge, InputLine, Level, OutputLine, SignalLines};
use crate::link::{BitLink, TransmitterState};
use crate::receiver::sync_lost;

impl<L: SignalLines> BitLink<L> {
    /// Send `frame` to the peer.
    ///
    /// Raises `valid` with the first bit on `data`, then waits for a rising
    /// edge at which the peer's `ready` is high. That edge samples bit 0; each
    /// later bit is driven on the falling edge that follows the previous
    /// sample. `valid` and `data` are back low on return, success or not.
    pub async fn transmit(&mut self, frame: &Frame) -> Result<(), LinkError> {
        if !self.state.brought_up {
            return Err(LinkError::NotBroughtUp);
        }
        if frame.width() == 0 {
            return Ok(());
        }

        self.state.transmitter = TransmitterState::Sending { bit: 0 };
        let result = self.transmit_bits(frame).await;
        let valid = self.lines.write(OutputLine::ValidOut, Level::Low);
        let data = self.lines.write(OutputLine::DataOut, Level::Low);

        match result {
            Ok(()) => {
                valid?;
                data?;
                self.state.transmitter = TransmitterState::Done;
                tracing::debug!("Sent frame {}", frame);
                Ok(())
            }
            Err(e) => {
                self.state.transmitter = TransmitterState::Idle;
                Err(e)
            }
        }
    }

    async fn transmit_bits(&mut self, frame: &Frame) -> Result<(), LinkError> {
        let poll = self.timing.poll_interval;
        let width = frame.width();

        self.drive_bit(frame, 0)?;
        self.lines.write(OutputLine::ValidOut, Level::High)?;

        let deadline = Instant::now() + self.timing.arm_timeout;
        loop {
            let ready = wait_for_qualified_edge(
                &mut self.lines,
                InputLine::Clock,
                Edge::Rising,
                InputLine::ReadyIn,
                deadline,
                poll,
            )
            .await
            .map_err(|e| sync_lost(e, LinkStage::AwaitingReady, 0))?;
            if ready.is_high() {
                break;
            }
        }

        for index in 1..width {
            let deadline = Instant::now() + self.timing.bit_timeout;
            wait_for_edge(&mut self.lines, InputLine::Clock, Edge::Falling, deadline, poll)
                .await
                .map_err(|e| sync_lost(e, LinkStage::Sending, index))?;

            self.drive_bit(frame, index)?;
            self.state.transmitter = TransmitterState::Sending { bit: index };

            let deadline = Instant::now() + self.timing.bit_timeout;
            wait_for_edge(&mut self.lines, InputLine::Clock, Edge::Rising, deadline, poll)
                .await
                .map_err(|e| sync_lost(e, LinkStage::Sending, index))?;
        }

        // Hold the last bit through the peer's sampling window.
        let deadline = Instant::now() + self.timing.bit_timeout;
        wait_for_edge(&mut self.lines, InputLine::Clock, Edge::Falling, deadline, poll)
            .await
            .map_err(|e| sync_lost(e, LinkStage::Sending, width))?;

        Ok(())
    }

    fn drive_bit(&mut self, frame: &Frame, index: u8) -> Result<(), LinkError> {
        let bit = frame.bit(index).unwrap_or(false);
        tracing::trace!("Driving bit {} = {}", index, u8::from(bit));
        self.lines.write(OutputLine::DataOut, Level::from(bit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimLines, SimulatedPeer};
    use crate::timing::LinkTiming;

    fn linked(lines: &SimLines) -> BitLink<SimLines> {
        let mut link = BitLink::new(lines.clone(), LinkTiming::default());
        link.state.brought_up = true;
        link
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_full_frame() {
        let lines = SimLines::new();
        let peer = SimulatedPeer::new(lines.clone());
        let mut link = linked(&lines);
        let frame = Frame::new(14, 0b10_1100_0111_0001).unwrap();

        let (sent, received) = tokio::join!(link.transmit(&frame), peer.receive(14));
        sent.unwrap();
        assert_eq!(received.unwrap(), frame);
        assert_eq!(link.state().transmitter, TransmitterState::Done);
        assert_eq!(lines.output(OutputLine::ValidOut), Level::Low);
        assert_eq!(lines.output(OutputLine::DataOut), Level::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_waits_for_ready() {
        let lines = SimLines::new();
        let peer = SimulatedPeer::new(lines.clone());
        let mut link = linked(&lines);
        let frame = Frame::new(14, 0x2AAA).unwrap();

        // A cold line: the clock runs but the peer is not listening yet.
        let listen_later = async {
            peer.idle_cycles(4).await;
            peer.receive(14).await
        };
        let (sent, received) = tokio::join!(link.transmit(&frame), listen_later);
        sent.unwrap();
        assert_eq!(received.unwrap(), frame);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_times_out_without_peer() {
        let lines = SimLines::new();
        let mut link = linked(&lines);
        let frame = Frame::new(14, 1).unwrap();

        let err = link.transmit(&frame).await.unwrap_err();
        assert!(matches!(
            err,
            LinkError::SyncLost {
                stage: LinkStage::AwaitingReady,
                bits: 0
            }
        ));
        assert_eq!(link.state().transmitter, TransmitterState::Idle);
        assert_eq!(lines.output(OutputLine::ValidOut), Level::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_loses_sync_mid_frame() {
        let lines = SimLines::new();
        let peer = SimulatedPeer::new(lines.clone());
        let mut link = linked(&lines);
        let frame = Frame::new(14, 0x1F0F).unwrap();

        let (sent, stopped) = tokio::join!(link.transmit(&frame), peer.receive_truncated(5));
        stopped.unwrap();
        assert!(matches!(
            sent,
            Err(LinkError::SyncLost {
                stage: LinkStage::Sending,
                bits: 5
            })
        ));
        assert_eq!(link.state().transmitter, TransmitterState::Idle);
        assert_eq!(lines.output(OutputLine::ValidOut), Level::Low);
        assert_eq!(lines.output(OutputLine::DataOut), Level::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_requires_bring_up() {
        let lines = SimLines::new();
        let mut link = BitLink::new(lines, LinkTiming::default());
        let frame = Frame::new(14, 1).unwrap();
        assert!(matches!(
            link.transmit(&frame).await,
            Err(LinkError::NotBroughtUp)
        ));
    }
}
