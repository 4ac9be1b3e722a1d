//! Per-type stateful analyzers. Each analyzer accumulates records of interest and
//! produces a plain-text report on demand; `AnalyzerManager` dispatches records by type and
//! always additionally feeds a registered `"battery"` analyzer regardless of record type.

use crate::record::{SensorRecord, SensorType};
use std::collections::HashMap;

pub trait Analyzer: Send {
    fn ingest(&mut self, record: &SensorRecord);
    fn report(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct AnalyzerThresholds {
    pub temp_warning: f64,
    pub temp_critical: f64,
    pub hum_low: f64,
    pub hum_high: f64,
    pub battery_low: f64,
}

impl Default for AnalyzerThresholds {
    fn default() -> Self {
        AnalyzerThresholds {
            temp_warning: 25.0,
            temp_critical: 30.0,
            hum_low: 30.0,
            hum_high: 70.0,
            battery_low: 0.2,
        }
    }
}

pub type AnalyzerFactory = Box<dyn Fn(&AnalyzerThresholds) -> Box<dyn Analyzer> + Send + Sync>;

pub struct TemperatureAnalyzer {
    warning: f64,
    critical: f64,
    readings: Vec<f64>,
}

impl TemperatureAnalyzer {
    pub fn new(thresholds: &AnalyzerThresholds) -> Self {
        TemperatureAnalyzer {
            warning: thresholds.temp_warning,
            critical: thresholds.temp_critical,
            readings: Vec::new(),
        }
    }
}

impl Analyzer for TemperatureAnalyzer {
    fn ingest(&mut self, record: &SensorRecord) {
        if record.temperature > 0.0 {
            self.readings.push(record.temperature);
        }
    }

    fn report(&self) -> String {
        if self.readings.is_empty() {
            return "Temperature: no data".to_string();
        }
        let mean = self.readings.iter().sum::<f64>() / self.readings.len() as f64;
        let min = self.readings.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self.readings.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let status = if max > self.critical {
            "CRITICAL"
        } else if max > self.warning {
            "Warning"
        } else {
            "Normal"
        };
        format!(
            "Mean: {:.2}°C, Minimum: {:.2}°C, Maximum: {:.2}°C, Status: {}",
            mean, min, max, status
        )
    }
}

pub struct HumidityAnalyzer {
    low: f64,
    high: f64,
    readings: Vec<f64>,
}

impl HumidityAnalyzer {
    pub fn new(thresholds: &AnalyzerThresholds) -> Self {
        HumidityAnalyzer {
            low: thresholds.hum_low,
            high: thresholds.hum_high,
            readings: Vec::new(),
        }
    }
}

impl Analyzer for HumidityAnalyzer {
    fn ingest(&mut self, record: &SensorRecord) {
        if record.humidity > 0.0 {
            self.readings.push(record.humidity);
        }
    }

    fn report(&self) -> String {
        if self.readings.is_empty() {
            return "Humidity: no data".to_string();
        }
        let mean = self.readings.iter().sum::<f64>() / self.readings.len() as f64;
        let min = self.readings.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self.readings.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let status = if min < self.low {
            "Too Dry"
        } else if max > self.high {
            "Too Humid"
        } else {
            "Normal"
        };
        format!(
            "Mean: {:.2}%, Minimum: {:.2}%, Maximum: {:.2}%, Status: {}",
            mean, min, max, status
        )
    }
}

pub struct BatteryAnalyzer {
    low: f64,
    ratios: Vec<(String, f64)>,
}

impl BatteryAnalyzer {
    pub fn new(thresholds: &AnalyzerThresholds) -> Self {
        BatteryAnalyzer {
            low: thresholds.battery_low,
            ratios: Vec::new(),
        }
    }
}

impl Analyzer for BatteryAnalyzer {
    fn ingest(&mut self, record: &SensorRecord) {
        if let Some(ratio) = record.battery_ratio() {
            self.ratios.push((record.serial.clone(), ratio));
        }
    }

    fn report(&self) -> String {
        if self.ratios.is_empty() {
            return "Battery: no data".to_string();
        }
        let mean = self.ratios.iter().map(|(_, r)| r).sum::<f64>() / self.ratios.len() as f64;
        let low: Vec<&str> = self
            .ratios
            .iter()
            .filter(|(_, r)| *r < self.low)
            .map(|(serial, _)| serial.as_str())
            .collect();
        if low.is_empty() {
            format!("Mean charge: {:.1}%, no sensors below threshold", mean * 100.0)
        } else {
            format!("Mean charge: {:.1}%, low sensors: {}", mean * 100.0, low.join(", "))
        }
    }
}

/// Factories registered by label, keyed the same way as `SensorType::as_str()` so a
/// record's type routes straight to its analyzer.
pub fn default_factories() -> Vec<(&'static str, AnalyzerFactory)> {
    vec![
        ("temp", Box::new(|t: &AnalyzerThresholds| Box::new(TemperatureAnalyzer::new(t)) as Box<dyn Analyzer>)),
        ("humidity", Box::new(|t: &AnalyzerThresholds| Box::new(HumidityAnalyzer::new(t)) as Box<dyn Analyzer>)),
        ("battery", Box::new(|t: &AnalyzerThresholds| Box::new(BatteryAnalyzer::new(t)) as Box<dyn Analyzer>)),
    ]
}

pub struct AnalyzerManager {
    analyzers: HashMap<String, Box<dyn Analyzer>>,
}

impl Default for AnalyzerManager {
    fn default() -> Self {
        Self::new(&AnalyzerThresholds::default(), default_factories())
    }
}

impl AnalyzerManager {
    pub fn new(thresholds: &AnalyzerThresholds, factories: Vec<(&'static str, AnalyzerFactory)>) -> Self {
        let analyzers = factories
            .into_iter()
            .map(|(label, factory)| (label.to_string(), factory(thresholds)))
            .collect();
        AnalyzerManager { analyzers }
    }

    /// Dispatches to the analyzer matching `record.sensor_type`, plus the battery
    /// analyzer unconditionally, regardless of `record.sensor_type` (a battery-typed
    /// record is ingested by the type-matched branch and the battery branch both).
    pub fn analyze_data(&mut self, record: &SensorRecord) {
        if let Some(analyzer) = self.analyzers.get_mut(record.sensor_type.as_str()) {
            analyzer.ingest(record);
        }
        if let Some(battery) = self.analyzers.get_mut("battery") {
            battery.ingest(record);
        }
    }

    pub fn results_all(&self) -> HashMap<String, String> {
        self.analyzers.iter().map(|(label, a)| (label.clone(), a.report())).collect()
    }
}
