//! Observer broadcast. `ObserverBroadcaster` fans every record out to an ordered,
//! de-duplicated set of subscribers. A failing observer (panic or error) is isolated and
//! logged so the remaining subscribers still see the record.

use crate::record::{SensorRecord, SensorType};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};

pub trait Observer: Send + Sync {
    fn notify(&self, record: &SensorRecord) -> Result<(), String>;
}

#[derive(Default)]
pub struct ObserverBroadcaster {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl ObserverBroadcaster {
    pub fn new() -> Self {
        ObserverBroadcaster { observers: RwLock::new(Vec::new()) }
    }

    /// Set-like de-dup: attaching the same `Arc` twice is a no-op.
    pub fn attach(&self, observer: Arc<dyn Observer>) {
        let mut list = self.observers.write().expect("observer list poisoned");
        if !list.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            list.push(observer);
        }
    }

    pub fn detach(&self, observer: &Arc<dyn Observer>) {
        let mut list = self.observers.write().expect("observer list poisoned");
        list.retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Invokes every observer in attach order against a copy-on-read snapshot, so a
    /// concurrent `attach`/`detach` never blocks or races with an in-flight notification.
    pub fn notify(&self, record: &SensorRecord) {
        let snapshot: Vec<Arc<dyn Observer>> = self.observers.read().expect("observer list poisoned").clone();
        for observer in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(record)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::error!(error = %err, "observer returned an error"),
                Err(_) => tracing::error!("observer panicked during notify"),
            }
        }
    }
}

pub struct TemperatureMonitor {
    warning: f64,
    critical: f64,
}

impl TemperatureMonitor {
    pub fn new(warning: f64, critical: f64) -> Self {
        TemperatureMonitor { warning, critical }
    }
}

impl Observer for TemperatureMonitor {
    fn notify(&self, record: &SensorRecord) -> Result<(), String> {
        if record.sensor_type != SensorType::Temp {
            return Ok(());
        }
        if record.temperature > self.critical {
            tracing::warn!(serial = %record.serial, temperature = record.temperature, "critical temperature");
        } else if record.temperature > self.warning {
            tracing::warn!(serial = %record.serial, temperature = record.temperature, "elevated temperature");
        }
        Ok(())
    }
}

pub struct BatteryMonitor {
    low: f64,
}

impl BatteryMonitor {
    pub fn new(low: f64) -> Self {
        BatteryMonitor { low }
    }
}

impl Observer for BatteryMonitor {
    fn notify(&self, record: &SensorRecord) -> Result<(), String> {
        match record.battery_ratio() {
            Some(ratio) if ratio < self.low => {
                tracing::warn!(serial = %record.serial, ratio, "low battery");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
struct StatsState {
    count: usize,
}

/// User-supplied statistics collector; exposes a running count of notified records.
#[derive(Default)]
pub struct StatsCollector {
    state: Mutex<StatsState>,
}

impl StatsCollector {
    pub fn new() -> Self {
        StatsCollector::default()
    }

    pub fn count(&self) -> usize {
        self.state.lock().expect("stats collector mutex poisoned").count
    }
}

impl Observer for StatsCollector {
    fn notify(&self, _record: &SensorRecord) -> Result<(), String> {
        self.state.lock().expect("stats collector mutex poisoned").count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingObserver;
    impl Observer for FailingObserver {
        fn notify(&self, _record: &SensorRecord) -> Result<(), String> {
            Err("boom".to_string())
        }
    }

    struct PanickingObserver;
    impl Observer for PanickingObserver {
        fn notify(&self, _record: &SensorRecord) -> Result<(), String> {
            panic!("kaboom");
        }
    }

    #[test]
    fn attach_is_idempotent() {
        let broadcaster = ObserverBroadcaster::new();
        let stats: Arc<dyn Observer> = Arc::new(StatsCollector::new());
        broadcaster.attach(stats.clone());
        broadcaster.attach(stats.clone());
        broadcaster.notify(&SensorRecord::default());
        assert_eq!(broadcaster.observers.read().unwrap().len(), 1);
    }

    #[test]
    fn failing_and_panicking_observers_do_not_block_the_rest() {
        let broadcaster = ObserverBroadcaster::new();
        let collector = Arc::new(StatsCollector::new());
        broadcaster.attach(Arc::new(FailingObserver));
        broadcaster.attach(Arc::new(PanickingObserver));
        broadcaster.attach(collector.clone() as Arc<dyn Observer>);

        broadcaster.notify(&SensorRecord::default());
        assert_eq!(collector.count(), 1);
    }

    #[test]
    fn temperature_monitor_ignores_non_temp_records() {
        let monitor = TemperatureMonitor::new(25.0, 30.0);
        let r = SensorRecord {
            sensor_type: SensorType::Humidity,
            temperature: 999.0,
            ..Default::default()
        };
        assert!(monitor.notify(&r).is_ok());
    }

    #[test]
    fn battery_monitor_ignores_records_without_battery_data() {
        let monitor = BatteryMonitor::new(0.2);
        assert!(monitor.notify(&SensorRecord::default()).is_ok());
    }
}
