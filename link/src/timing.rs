use std::time::Duration;

/// Polling and timeout parameters for the link.
///
/// The peer's clock half-period must be comfortably longer than
/// `poll_interval + settle_delay`, and the peer must hold `valid`/`ready` for
/// at least one `poll_interval` before the edge they qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    /// How often line levels are sampled while waiting for an edge.
    pub poll_interval: Duration,
    /// Delay after a rising edge before `data` is sampled.
    pub settle_delay: Duration,
    /// How long an armed receiver (or a transmitter waiting for `ready`)
    /// waits for the peer before giving up.
    pub arm_timeout: Duration,
    /// How long to wait for each clock edge once a frame is under way.
    pub bit_timeout: Duration,
    /// Duration of one preamble bit during bring-up.
    pub preamble_bit_period: Duration,
    /// Give up on bring-up after this long. `None` waits forever.
    pub bringup_timeout: Option<Duration>,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            settle_delay: Duration::from_millis(1),
            arm_timeout: Duration::from_secs(5),
            bit_timeout: Duration::from_secs(1),
            preamble_bit_period: Duration::from_millis(10),
            bringup_timeout: None,
        }
    }
}
