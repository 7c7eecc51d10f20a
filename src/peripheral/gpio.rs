use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::OutputPin;

/// A GPIO line driven through the Linux sysfs interface
pub struct SysfsPin {
    value_path: PathBuf,
    active_low: bool,
}

impl SysfsPin {
    /// Export `gpio` under `root` if needed and configure it as an output.
    pub fn open(root: &Path, gpio: u32, active_low: bool) -> Result<Self> {
        let pin_dir = root.join(format!("gpio{}", gpio));
        if !pin_dir.exists() {
            let export = root.join("export");
            std::fs::write(&export, gpio.to_string())
                .with_context(|| format!("Failed to export GPIO {} via {}", gpio, export.display()))?;
        }

        let direction = pin_dir.join("direction");
        std::fs::write(&direction, "out")
            .with_context(|| format!("Failed to set direction: {}", direction.display()))?;

        Ok(Self {
            value_path: pin_dir.join("value"),
            active_low,
        })
    }
}

impl OutputPin for SysfsPin {
    fn set_level(&self, on: bool) -> Result<()> {
        let high = on != self.active_low;
        std::fs::write(&self.value_path, if high { "1" } else { "0" })
            .with_context(|| format!("Failed to write {}", self.value_path.display()))
    }
}
