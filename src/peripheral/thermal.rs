use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::TemperatureSensor;

/// CPU temperature from a kernel thermal zone (millidegrees Celsius)
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    /// Open the zone, failing unless it can be read right away.
    pub fn open(path: &Path) -> Result<Self> {
        let zone = Self {
            path: path.to_path_buf(),
        };
        zone.read_celsius()?;
        Ok(zone)
    }
}

impl TemperatureSensor for ThermalZone {
    fn read_celsius(&self) -> Result<f32> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let millidegrees: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("Unexpected thermal reading: {:?}", raw.trim()))?;
        Ok(millidegrees as f32 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_millidegrees() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "48500").unwrap();
        let zone = ThermalZone::open(file.path()).unwrap();
        assert_eq!(zone.read_celsius().unwrap(), 48.5);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hot").unwrap();
        assert!(ThermalZone::open(file.path()).is_err());
    }

    #[test]
    fn test_missing_zone_fails() {
        assert!(ThermalZone::open(Path::new("/nonexistent/thermal/temp")).is_err());
    }
}
