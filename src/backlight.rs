//! Sysfs backlight control

use crate::UsbMouseError;
use log::info;
use std::path::{Path, PathBuf};

pub const DEFAULT_BRIGHTNESS_PATH: &str = "/sys/class/backlight/intel_backlight/brightness";

/// Brightness units removed per step
pub const STEP: i64 = 100;

pub struct Backlight {
    path: PathBuf,
}

impl Backlight {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Current brightness as reported by sysfs
    pub fn current(&self) -> Result<i64, UsbMouseError> {
        let raw = std::fs::read_to_string(&self.path)?;
        raw.trim()
            .parse()
            .map_err(|_| UsbMouseError::MalformedBrightness(raw))
    }

    /// Lower brightness by one step, unless the current value is 1
    ///
    /// Returns the value written, or `None` when left unchanged. No lower
    /// clamp is applied beyond the value 1 guard.
    pub fn step_down(&self) -> Result<Option<i64>, UsbMouseError> {
        let current = self.current()?;
        if current == 1 {
            return Ok(None);
        }

        let next = current - STEP;
        std::fs::write(&self.path, format!("{}\n", next))?;
        info!("brightness lowered from {} to {}", current, next);
        Ok(Some(next))
    }
}
