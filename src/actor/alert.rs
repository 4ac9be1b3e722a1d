//! `AlertActor`: watches ingested records against per-type thresholds and keeps
//! an ordered, newline-joinable alert log. At most one alert per dimension per record.

use super::ActorHandle;
use crate::record::SensorRecord;
use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    pub temp_high: f64,
    pub temp_low: f64,
    pub hum_high: f64,
    pub hum_low: f64,
    pub battery_low: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        AlertThresholds { temp_high: 30.0, temp_low: 10.0, hum_high: 80.0, hum_low: 20.0, battery_low: 30.0 }
    }
}

pub enum AlertMsg {
    Ingest(SensorRecord),
    Status { reply: oneshot::Sender<String> },
    Shutdown,
}

struct AlertState {
    thresholds: AlertThresholds,
    log: Vec<String>,
}

impl AlertState {
    fn new(thresholds: AlertThresholds) -> Self {
        AlertState { thresholds, log: Vec::new() }
    }

    fn ingest(&mut self, record: &SensorRecord) {
        let t = &self.thresholds;
        let now = Local::now().format("%H:%M:%S");

        if record.temperature > 0.0 {
            if record.temperature > t.temp_high {
                self.log.push(format!(
                    "[{now}] HIGH TEMP ALERT: Sensor {} reported {:.1}°C (threshold: {}°C)",
                    record.serial, record.temperature, t.temp_high
                ));
            } else if record.temperature < t.temp_low {
                self.log.push(format!(
                    "[{now}] LOW TEMP ALERT: Sensor {} reported {:.1}°C (threshold: {}°C)",
                    record.serial, record.temperature, t.temp_low
                ));
            }
        }

        if record.humidity > 0.0 {
            if record.humidity > t.hum_high {
                self.log.push(format!(
                    "[{now}] HIGH HUMIDITY ALERT: Sensor {} reported {:.1}% (threshold: {}%)",
                    record.serial, record.humidity, t.hum_high
                ));
            } else if record.humidity < t.hum_low {
                self.log.push(format!(
                    "[{now}] LOW HUMIDITY ALERT: Sensor {} reported {:.1}% (threshold: {}%)",
                    record.serial, record.humidity, t.hum_low
                ));
            }
        }

        if let Some(percent) = record.battery_percent() {
            if percent < t.battery_low {
                self.log.push(format!(
                    "[{now}] LOW BATTERY ALERT: Sensor {} battery at {:.1}% (threshold: {}%)",
                    record.serial, percent, t.battery_low
                ));
            }
        }
    }
}

pub fn spawn(mailbox_bound: usize, thresholds: AlertThresholds) -> (ActorHandle<AlertMsg>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(mailbox_bound);
    let handle = ActorHandle::new(tx);

    let join = tokio::spawn(async move {
        let mut state = AlertState::new(thresholds);
        while let Some(msg) = rx.recv().await {
            match msg {
                AlertMsg::Ingest(record) => {
                    let before = state.log.len();
                    state.ingest(&record);
                    for alert in &state.log[before..] {
                        tracing::info!(%alert, "alert raised");
                    }
                }
                AlertMsg::Status { reply } => {
                    let _ = reply.send(state.log.join("\n"));
                }
                AlertMsg::Shutdown => break,
            }
        }
    });

    (handle, join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::query;
    use crate::record::SensorType;

    #[tokio::test]
    async fn high_temp_and_low_battery_both_fire() {
        let (handle, join) = spawn(16, AlertThresholds::default());
        let record = SensorRecord {
            serial: "333".into(),
            sensor_type: SensorType::Temp,
            temperature: 31.5,
            battery_level: 25.0,
            battery_max: 100.0,
            ..Default::default()
        };
        handle.send_msg(AlertMsg::Ingest(record)).await.unwrap();

        let (tx, rx) = oneshot::channel();
        let log = query(handle.send_msg(AlertMsg::Status { reply: tx }), rx, std::time::Duration::from_secs(5)).await.unwrap();
        assert!(log.contains("HIGH TEMP ALERT: Sensor 333 reported 31.5°C (threshold: 30°C)"));
        assert!(log.contains("LOW BATTERY ALERT: Sensor 333 battery at 25.0% (threshold: 30%)"));

        handle.send_msg(AlertMsg::Shutdown).await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn no_alert_for_values_within_range() {
        let (handle, join) = spawn(16, AlertThresholds::default());
        let record = SensorRecord {
            serial: "111".into(),
            sensor_type: SensorType::Temp,
            temperature: 24.5,
            battery_level: 80.0,
            battery_max: 100.0,
            ..Default::default()
        };
        handle.send_msg(AlertMsg::Ingest(record)).await.unwrap();

        let (tx, rx) = oneshot::channel();
        let log = query(handle.send_msg(AlertMsg::Status { reply: tx }), rx, std::time::Duration::from_secs(5)).await.unwrap();
        assert_eq!(log, "");

        handle.send_msg(AlertMsg::Shutdown).await.unwrap();
        join.await.unwrap();
    }
}
