pub mod gpio;
pub mod thermal;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PeripheralConfig;
use crate::peripheral::gpio::SysfsPin;
use crate::peripheral::thermal::ThermalZone;

/// Reply for `cpu temp` when no sensor can be read
pub const TEMPERATURE_UNAVAILABLE: &str = "cannot read cpu temperature.";

/// A digital output driving the LED. `true` means lit.
pub trait OutputPin: Send + Sync {
    fn set_level(&self, on: bool) -> Result<()>;
}

pub trait TemperatureSensor: Send + Sync {
    fn read_celsius(&self) -> Result<f32>;
}

/// The blink task currently running, if any
struct BlinkTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// LED and CPU temperature access, safe to use with or without hardware.
///
/// A missing pin turns the LED operations into no-ops and a missing sensor
/// makes `read_temperature` answer with [`TEMPERATURE_UNAVAILABLE`].
pub struct PeripheralController {
    led: Option<Arc<dyn OutputPin>>,
    sensor: Option<Box<dyn TemperatureSensor>>,
    period: Duration,
    blink: Mutex<Option<BlinkTask>>,
}

impl PeripheralController {
    pub fn new(
        led: Option<Arc<dyn OutputPin>>,
        sensor: Option<Box<dyn TemperatureSensor>>,
        period: Duration,
    ) -> Self {
        Self {
            led,
            sensor,
            period,
            blink: Mutex::new(None),
        }
    }

    /// Controller with no hardware attached
    #[cfg(test)]
    pub fn degraded(period: Duration) -> Self {
        Self::new(None, None, period)
    }

    /// Probe the sysfs LED line and thermal zone, degrading whatever is absent.
    pub fn from_config(config: &PeripheralConfig, blink_period: Duration) -> Self {
        let led: Option<Arc<dyn OutputPin>> =
            match SysfsPin::open(&config.gpio_root, config.led_gpio, config.active_low) {
                Ok(pin) => {
                    info!("LED attached on GPIO {}", config.led_gpio);
                    Some(Arc::new(pin))
                }
                Err(e) => {
                    warn!("LED unavailable, running without it: {:#}", e);
                    None
                }
            };

        let sensor: Option<Box<dyn TemperatureSensor>> =
            match ThermalZone::open(&config.thermal_zone) {
                Ok(zone) => Some(Box::new(zone)),
                Err(e) => {
                    warn!("CPU temperature unavailable: {:#}", e);
                    None
                }
            };

        Self::new(led, sensor, blink_period)
    }

    pub fn has_led(&self) -> bool {
        self.led.is_some()
    }

    pub async fn turn_on(&self) {
        self.set_steady(true).await;
    }

    pub async fn turn_off(&self) {
        self.set_steady(false).await;
    }

    /// Start toggling the LED in the background until another LED command arrives.
    pub async fn blink_start(&self) {
        let Some(pin) = &self.led else {
            debug!("blink ignored: no LED");
            return;
        };

        let mut slot = self.blink.lock().await;
        if let Some(task) = slot.take() {
            self.stop(task).await;
        }

        let (cancel, cancelled) = watch::channel(false);
        let handle = tokio::spawn(flash(pin.clone(), self.period / 2, cancelled));
        *slot = Some(BlinkTask { cancel, handle });
    }

    #[cfg(test)]
    pub async fn is_blinking(&self) -> bool {
        self.blink
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Current CPU temperature such as `48.3C`, or the unavailable sentinel.
    pub fn read_temperature(&self) -> String {
        let Some(sensor) = &self.sensor else {
            return TEMPERATURE_UNAVAILABLE.to_string();
        };
        match sensor.read_celsius() {
            Ok(celsius) => format!("{:.1}C", celsius),
            Err(e) => {
                warn!("Failed to read CPU temperature: {:#}", e);
                TEMPERATURE_UNAVAILABLE.to_string()
            }
        }
    }

    async fn set_steady(&self, on: bool) {
        let Some(pin) = &self.led else {
            debug!("led {} ignored: no LED", if on { "on" } else { "off" });
            return;
        };

        // Hold the slot so no blink can start between the join and the write.
        let mut slot = self.blink.lock().await;
        if let Some(task) = slot.take() {
            self.stop(task).await;
        }
        if let Err(e) = pin.set_level(on) {
            warn!("Failed to set LED level: {:#}", e);
        }
    }

    /// Cancel a blink task and wait up to two periods for it to exit.
    async fn stop(&self, mut task: BlinkTask) {
        let _ = task.cancel.send(true);
        if tokio::time::timeout(self.period * 2, &mut task.handle)
            .await
            .is_err()
        {
            warn!("Blink task did not stop in time, aborting it");
            task.handle.abort();
        }
    }
}

async fn flash(
    pin: Arc<dyn OutputPin>,
    half_period: Duration,
    mut cancelled: watch::Receiver<bool>,
) {
    loop {
        for level in [true, false] {
            tokio::select! {
                _ = cancelled.changed() => return,
                _ = tokio::time::sleep(half_period) => {}
            }
            if let Err(e) = pin.set_level(level) {
                warn!("Blink stopped, LED write failed: {:#}", e);
                return;
            }
        }
    }
}
