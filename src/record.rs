//! Canonical sensor record produced by the parser set.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Temp,
    Humidity,
    Battery,
    Unknown,
}

impl SensorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temp => "temp",
            SensorType::Humidity => "humidity",
            SensorType::Battery => "battery",
            SensorType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for SensorType {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "temp" | "temperature" => SensorType::Temp,
            "humidity" | "hum" => SensorType::Humidity,
            "battery" | "bat" => SensorType::Battery,
            _ => SensorType::Unknown,
        }
    }
}

/// Canonical, normalized sensor observation. Produced exclusively by the parser set;
/// every other component treats this as immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRecord {
    pub serial: String,
    #[serde(rename = "type")]
    pub sensor_type: SensorType,
    pub temperature: f64,
    pub humidity: f64,
    pub battery_level: f64,
    pub battery_max: f64,
    pub battery_min: f64,
    pub state: String,
    pub manufacturer: String,
    pub error: String,
    pub voltage: f64,
    pub timestamp: DateTime<Utc>,
}

impl Default for SensorRecord {
    fn default() -> Self {
        SensorRecord {
            serial: String::new(),
            sensor_type: SensorType::Unknown,
            temperature: 0.0,
            humidity: 0.0,
            battery_level: 0.0,
            battery_max: 0.0,
            battery_min: 0.0,
            state: String::new(),
            manufacturer: String::new(),
            error: String::new(),
            voltage: 0.0,
            timestamp: Utc::now(),
        }
    }
}

impl SensorRecord {
    pub fn battery_ratio(&self) -> Option<f64> {
        if self.battery_level > 0.0 && self.battery_max > 0.0 {
            Some(self.battery_level / self.battery_max)
        } else {
            None
        }
    }

    pub fn battery_percent(&self) -> Option<f64> {
        self.battery_ratio().map(|r| r * 100.0)
    }

    /// Applies the normalization invariants: unit correction for raw
    /// temperature/humidity, state lower-casing, and synthetic serial assignment.
    pub fn normalize(mut self) -> Self {
        if self.temperature > 100.0 {
            self.temperature = round2(self.temperature / 100.0);
        }
        if self.humidity > 100.0 {
            self.humidity = round2(self.humidity / 10.0);
        }
        self.state = self.state.to_ascii_lowercase();

        if self.serial.is_empty() && !self.manufacturer.is_empty() {
            self.serial = format!("Unknown-{}", random_hex8());
        }
        self
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn random_hex8() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 4] = rng.random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_raw_temperature_over_100() {
        let r = SensorRecord {
            temperature: 2450.0,
            ..Default::default()
        }
        .normalize();
        assert_eq!(r.temperature, 24.5);
    }

    #[test]
    fn normalizes_raw_humidity_over_100() {
        let r = SensorRecord {
            humidity: 455.0,
            ..Default::default()
        }
        .normalize();
        assert_eq!(r.humidity, 45.5);
    }

    #[test]
    fn leaves_small_values_untouched() {
        let r = SensorRecord {
            temperature: 24.5,
            humidity: 45.0,
            ..Default::default()
        }
        .normalize();
        assert_eq!(r.temperature, 24.5);
        assert_eq!(r.humidity, 45.0);
    }

    #[test]
    fn lowercases_state() {
        let r = SensorRecord {
            state: "OK".to_string(),
            ..Default::default()
        }
        .normalize();
        assert_eq!(r.state, "ok");
    }

    #[test]
    fn assigns_synthetic_serial_when_empty_with_manufacturer() {
        let r = SensorRecord {
            manufacturer: "Qualcomm".to_string(),
            ..Default::default()
        }
        .normalize();
        assert!(r.serial.starts_with("Unknown-"));
        assert_eq!(r.serial.len(), "Unknown-".len() + 8);
    }

    #[test]
    fn leaves_serial_empty_without_manufacturer() {
        let r = SensorRecord::default().normalize();
        assert!(r.serial.is_empty());
    }

    #[test]
    fn battery_ratio_requires_both_positive() {
        let mut r = SensorRecord::default();
        assert_eq!(r.battery_ratio(), None);
        r.battery_level = 80.0;
        assert_eq!(r.battery_ratio(), None);
        r.battery_max = 100.0;
        assert_eq!(r.battery_ratio(), Some(0.8));
        assert_eq!(r.battery_percent(), Some(80.0));
    }
}
