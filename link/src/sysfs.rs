//! Linux sysfs GPIO backend.
//!
//! Each line maps to one GPIO number under `/sys/class/gpio` (or any other
//! root, for tests). Pins are exported and given their direction on open;
//! outputs start low.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LinkError;
use crate::lines::{InputLine, Level, OutputLine, SignalLines};

pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// GPIO number for every line role. This is deployment configuration, not
/// part of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    pub clock: u32,
    pub valid_in: u32,
    pub ready_out: u32,
    pub data_in: u32,
    pub valid_out: u32,
    pub ready_in: u32,
    pub data_out: u32,
    pub overwrite: u32,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            clock: 17,
            valid_in: 27,
            ready_out: 22,
            data_in: 10,
            valid_out: 9,
            ready_in: 11,
            data_out: 5,
            overwrite: 6,
        }
    }
}

impl PinMap {
    pub fn input(&self, line: InputLine) -> u32 {
        match line {
            InputLine::Clock => self.clock,
            InputLine::ValidIn => self.valid_in,
            InputLine::DataIn => self.data_in,
            InputLine::ReadyIn => self.ready_in,
            InputLine::Overwrite => self.overwrite,
        }
    }

    pub fn output(&self, line: OutputLine) -> u32 {
        match line {
            OutputLine::ReadyOut => self.ready_out,
            OutputLine::ValidOut => self.valid_out,
            OutputLine::DataOut => self.data_out,
        }
    }

    /// Every `(role, pin)` pair, inputs first.
    pub fn assignments(&self) -> Vec<(&'static str, u32)> {
        InputLine::ALL
            .iter()
            .map(|l| (l.as_str(), self.input(*l)))
            .chain(OutputLine::ALL.iter().map(|l| (l.as_str(), self.output(*l))))
            .collect()
    }

    /// Reject maps that give one pin two roles.
    pub fn validate(&self) -> Result<(), LinkError> {
        let assignments = self.assignments();
        for (i, &(first, pin)) in assignments.iter().enumerate() {
            if let Some(&(second, _)) = assignments[i + 1..].iter().find(|&&(_, p)| p == pin) {
                return Err(LinkError::PinConflict { pin, first, second });
            }
        }
        Ok(())
    }
}

/// Signal lines backed by sysfs GPIO value files.
pub struct SysfsLines {
    root: PathBuf,
    pins: PinMap,
}

impl SysfsLines {
    /// Export every pin in `pins` under `root` and set its direction.
    pub fn open(root: impl AsRef<Path>, pins: PinMap) -> Result<Self, LinkError> {
        pins.validate()?;
        let lines = Self {
            root: root.as_ref().to_path_buf(),
            pins,
        };

        for line in InputLine::ALL {
            lines.export(pins.input(line), "in")?;
        }
        for line in OutputLine::ALL {
            let pin = pins.output(line);
            lines.export(pin, "out")?;
            lines.write_value(pin, Level::Low)?;
        }

        tracing::info!("Opened GPIO lines under {}", lines.root.display());
        Ok(lines)
    }

    pub fn pins(&self) -> &PinMap {
        &self.pins
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    fn export(&self, pin: u32, direction: &str) -> Result<(), LinkError> {
        let dir = self.pin_dir(pin);
        if !dir.exists() {
            tracing::debug!("Exporting GPIO {}", pin);
            fs::write(self.root.join("export"), pin.to_string())
                .map_err(|source| LinkError::Gpio { pin, source })?;
            if !dir.exists() {
                return Err(LinkError::Export(pin));
            }
        }
        fs::write(dir.join("direction"), direction)
            .map_err(|source| LinkError::Gpio { pin, source })?;
        tracing::debug!("GPIO {} set to {}", pin, direction);
        Ok(())
    }

    fn write_value(&self, pin: u32, level: Level) -> Result<(), LinkError> {
        let value = if level.is_high() { "1" } else { "0" };
        fs::write(self.pin_dir(pin).join("value"), value)
            .map_err(|source| LinkError::Gpio { pin, source })
    }
}

impl SignalLines for SysfsLines {
    fn read(&mut self, line: InputLine) -> Result<Level, LinkError> {
        let pin = self.pins.input(line);
        let raw = fs::read_to_string(self.pin_dir(pin).join("value"))
            .map_err(|source| LinkError::Gpio { pin, source })?;
        Ok(Level::from(raw.trim() == "1"))
    }

    fn write(&mut self, line: OutputLine, level: Level) -> Result<(), LinkError> {
        self.write_value(self.pins.output(line), level)
    }
}
