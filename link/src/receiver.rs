use chess_codec::Frame;
use tokio::time::{sleep, Instant};

use crate::edge::{wait_for_edge, wait_for_qualified_edge};
use crate::error::{LinkError, LinkStage};
use crate::lines::{Edge, InputLine, Level, OutputLine, SignalLines};
use crate::link::{BitLink, ReceiverState};

impl<L: SignalLines> BitLink<L> {
    /// Receive one frame of `width` bits.
    ///
    /// Arms the receiver (`ready` high) and waits up to `arm_timeout` for the
    /// peer to start a frame. On any timeout the partial frame is dropped, the
    /// receiver returns to idle and [`LinkError::SyncLost`] is returned.
    pub async fn receive(&mut self, width: u8) -> Result<Frame, LinkError> {
        if !self.state.brought_up {
            return Err(LinkError::NotBroughtUp);
        }

        self.lines.write(OutputLine::ReadyOut, Level::High)?;
        self.state.receiver = ReceiverState::Armed;

        let result = self.receive_armed(width).await;
        let released = self.lines.write(OutputLine::ReadyOut, Level::Low);

        match result {
            Ok(frame) => {
                released?;
                self.state.receiver = ReceiverState::Complete;
                tracing::debug!("Received frame {}", frame);
                Ok(frame)
            }
            Err(e) => {
                self.state.receiver = ReceiverState::Idle;
                Err(e)
            }
        }
    }

    async fn receive_armed(&mut self, width: u8) -> Result<Frame, LinkError> {
        let poll = self.timing.poll_interval;
        let deadline = Instant::now() + self.timing.arm_timeout;

        loop {
            let valid = wait_for_qualified_edge(
                &mut self.lines,
                InputLine::Clock,
                Edge::Rising,
                InputLine::ValidIn,
                deadline,
                poll,
            )
            .await
            .map_err(|e| sync_lost(e, LinkStage::Armed, 0))?;
            if valid.is_high() {
                break;
            }
        }

        // Back-pressure the peer for the rest of the frame.
        self.lines.write(OutputLine::ReadyOut, Level::Low)?;
        self.state.receiver = ReceiverState::Receiving { bits: 0 };

        let mut frame = Frame::default();
        loop {
            sleep(self.timing.settle_delay).await;
            let bit = self.lines.read(InputLine::DataIn)?.is_high();
            frame.push(bit)?;
            let received = frame.width();
            self.state.receiver = ReceiverState::Receiving { bits: received };
            tracing::trace!("Sampled bit {} = {}", received - 1, u8::from(bit));

            if received == width {
                break;
            }

            let deadline = Instant::now() + self.timing.bit_timeout;
            wait_for_edge(&mut self.lines, InputLine::Clock, Edge::Rising, deadline, poll)
                .await
                .map_err(|e| sync_lost(e, LinkStage::Receiving, received))?;
        }

        Ok(frame)
    }
}

pub(crate) fn sync_lost(err: LinkError, stage: LinkStage, bits: u8) -> LinkError {
    match err {
        LinkError::EdgeTimeout { .. } => LinkError::SyncLost { stage, bits },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::link::LinkState;
    use crate::sim::{SimLines, SimulatedPeer};
    use crate::timing::LinkTiming;

    fn linked(lines: &SimLines) -> BitLink<SimLines> {
        let mut link = BitLink::new(lines.clone(), LinkTiming::default());
        link.state.brought_up = true;
        link
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_full_frame() {
        let lines = SimLines::new();
        let peer = SimulatedPeer::new(lines.clone());
        let mut link = linked(&lines);
        let frame = Frame::new(16, 0b1001_0110_0011_1010).unwrap();

        let (received, sent) = tokio::join!(link.receive(16), peer.send(frame));
        sent.unwrap();
        assert_eq!(received.unwrap(), frame);
        assert_eq!(link.state().receiver, ReceiverState::Complete);
        assert_eq!(lines.output(OutputLine::ReadyOut), Level::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_ignores_edges_without_valid() {
        let lines = SimLines::new();
        let peer = SimulatedPeer::new(lines.clone());
        let mut link = linked(&lines);
        let frame = Frame::new(16, 0xBEEF).unwrap();

        let send_later = async {
            peer.idle_cycles(5).await;
            peer.send(frame).await
        };
        let (received, sent) = tokio::join!(link.receive(16), send_later);
        sent.unwrap();
        assert_eq!(received.unwrap(), frame);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_mid_frame_reports_sync_lost() {
        let lines = SimLines::new();
        let peer = SimulatedPeer::new(lines.clone());
        let mut link = linked(&lines);
        let frame = Frame::new(16, 0xFFFF).unwrap();

        let (received, _) = tokio::join!(link.receive(16), peer.send_truncated(frame, 5));
        match received {
            Err(LinkError::SyncLost {
                stage: LinkStage::Receiving,
                bits: 5,
            }) => {}
            other => panic!("expected sync loss mid-frame, got {:?}", other),
        }
        assert_eq!(link.state().receiver, ReceiverState::Idle);
        assert_eq!(lines.output(OutputLine::ReadyOut), Level::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_while_armed() {
        let lines = SimLines::new();
        let mut link = linked(&lines);
        let start = Instant::now();

        let err = link.receive(16).await.unwrap_err();
        assert!(matches!(
            err,
            LinkError::SyncLost {
                stage: LinkStage::Armed,
                bits: 0
            }
        ));
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(link.state().receiver, ReceiverState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_requires_bring_up() {
        let lines = SimLines::new();
        let mut link = BitLink::new(lines, LinkTiming::default());
        assert!(matches!(
            link.receive(16).await,
            Err(LinkError::NotBroughtUp)
        ));
        assert_eq!(link.state(), &LinkState::default());
    }
}
