use std::fmt;
use std::ops::Not;

use crate::error::LinkError;

/// Logic level of a signal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(bit: bool) -> Self {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// Whether going from `before` to `after` is this edge.
    pub fn between(self, before: Level, after: Level) -> bool {
        match self {
            Edge::Rising => before == Level::Low && after == Level::High,
            Edge::Falling => before == Level::High && after == Level::Low,
        }
    }
}

/// Lines driven by the peer. This node only ever reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputLine {
    Clock,
    ValidIn,
    DataIn,
    ReadyIn,
    Overwrite,
}

impl InputLine {
    pub const ALL: [InputLine; 5] = [
        InputLine::Clock,
        InputLine::ValidIn,
        InputLine::DataIn,
        InputLine::ReadyIn,
        InputLine::Overwrite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::ValidIn => "valid-in",
            Self::DataIn => "data-in",
            Self::ReadyIn => "ready-in",
            Self::Overwrite => "overwrite",
        }
    }
}

/// Lines driven by this node. The peer only ever reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputLine {
    ReadyOut,
    ValidOut,
    DataOut,
}

impl OutputLine {
    pub const ALL: [OutputLine; 3] = [
        OutputLine::ReadyOut,
        OutputLine::ValidOut,
        OutputLine::DataOut,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadyOut => "ready-out",
            Self::ValidOut => "valid-out",
            Self::DataOut => "data-out",
        }
    }
}

impl fmt::Display for InputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw access to the eight signal lines.
///
/// Implementations only need level reads and writes; all timing lives in the
/// link itself.
pub trait SignalLines {
    fn read(&mut self, line: InputLine) -> Result<Level, LinkError>;

    fn write(&mut self, line: OutputLine, level: Level) -> Result<(), LinkError>;

    /// Drive every owned line back to its idle (low) level.
    ///
    /// Attempts every line even if an earlier write fails and reports the
    /// first failure.
    fn release(&mut self) -> Result<(), LinkError> {
        let mut first_err = None;
        for line in OutputLine::ALL {
            if let Err(e) = self.write(line, Level::Low) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
