use tokio::time::{sleep, Instant};

use crate::error::LinkError;
use crate::lines::{InputLine, Level, OutputLine, SignalLines};
use crate::link::BitLink;

impl<L: SignalLines> BitLink<L> {
    /// Run the one-time bring-up sequence.
    ///
    /// Drives an alternating 1/0 preamble on `data` until the peer raises
    /// `overwrite` to say it has locked on. Neither side shares a time
    /// reference at cold start, so ordinary frames are refused until this has
    /// succeeded once. Later calls return immediately.
    pub async fn bring_up(&mut self) -> Result<(), LinkError> {
        if self.state.brought_up {
            return Ok(());
        }

        tracing::info!("Starting link bring-up");
        let started = Instant::now();
        let mut level = Level::High;
        let mut preamble_bits: u64 = 0;

        let result = loop {
            if self.lines.read(InputLine::Overwrite)?.is_high() {
                break Ok(());
            }
            if let Some(timeout) = self.timing.bringup_timeout {
                if started.elapsed() >= timeout {
                    break Err(LinkError::BringUpTimeout(timeout));
                }
            }
            self.lines.write(OutputLine::DataOut, level)?;
            preamble_bits += 1;
            sleep(self.timing.preamble_bit_period).await;
            level = !level;
        };

        self.lines.write(OutputLine::DataOut, Level::Low)?;
        result?;

        self.state.brought_up = true;
        tracing::info!(
            "Link bring-up complete after {} preamble bits ({:?})",
            preamble_bits,
            started.elapsed()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sim::{SimLines, SimulatedPeer};
    use crate::timing::LinkTiming;

    #[tokio::test(start_paused = true)]
    async fn test_bring_up_waits_for_overwrite() {
        let lines = SimLines::new();
        let peer = SimulatedPeer::new(lines.clone());
        let mut link = BitLink::new(lines.clone(), LinkTiming::default());

        let (result, toggles) = tokio::join!(link.bring_up(), peer.acknowledge_preamble(6));
        result.unwrap();
        assert!(toggles >= 6);
        assert!(link.state().brought_up);
        assert_eq!(lines.output(OutputLine::DataOut), Level::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bring_up_runs_once() {
        let lines = SimLines::new();
        lines.set_input(InputLine::Overwrite, Level::High);
        let mut link = BitLink::new(lines.clone(), LinkTiming::default());
        link.bring_up().await.unwrap();

        lines.set_input(InputLine::Overwrite, Level::Low);
        let start = Instant::now();
        link.bring_up().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bring_up_timeout() {
        let lines = SimLines::new();
        let timing = LinkTiming {
            bringup_timeout: Some(Duration::from_millis(200)),
            ..LinkTiming::default()
        };
        let mut link = BitLink::new(lines.clone(), timing);

        let err = link.bring_up().await.unwrap_err();
        assert!(matches!(err, LinkError::BringUpTimeout(_)));
        assert!(!link.state().brought_up);
        assert_eq!(lines.output(OutputLine::DataOut), Level::Low);
    }
}
