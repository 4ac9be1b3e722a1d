//! Layered configuration. `PipelineConfig::default()` hard-codes every threshold
//! named in this crate; `PipelineConfig::load` overlays a RON file on top, field by
//! field, mirroring the reference workspace's "defaults first, file overlays, never
//! hard-fail on a missing config" convention.

use crate::errors::{Result, SensorPipelineError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub analyzer_temp_warning: f64,
    pub analyzer_temp_critical: f64,
    pub analyzer_hum_low: f64,
    pub analyzer_hum_high: f64,
    pub analyzer_battery_low_ratio: f64,

    pub alert_temp_high: f64,
    pub alert_temp_low: f64,
    pub alert_hum_high: f64,
    pub alert_hum_low: f64,
    pub alert_battery_low_percent: f64,

    pub actor_mailbox_bound: usize,
    pub actor_request_timeout_secs: u64,
    pub pool_parallelism: Option<usize>,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            analyzer_temp_warning: 25.0,
            analyzer_temp_critical: 30.0,
            analyzer_hum_low: 30.0,
            analyzer_hum_high: 70.0,
            analyzer_battery_low_ratio: 0.2,

            alert_temp_high: 30.0,
            alert_temp_low: 10.0,
            alert_hum_high: 80.0,
            alert_hum_low: 20.0,
            alert_battery_low_percent: 30.0,

            actor_mailbox_bound: 64,
            actor_request_timeout_secs: 5,
            pool_parallelism: None,
            queue_capacity: 100,
        }
    }
}

impl PipelineConfig {
    /// Overlays a RON file on top of the defaults. A missing file is not an error: the
    /// defaults are returned unchanged and a warning is logged.
    pub fn load(path: &Path) -> Result<PipelineConfig> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                return Ok(PipelineConfig::default());
            }
            Err(e) => return Err(SensorPipelineError::Io(e)),
        };

        ron::from_str(&contents).map_err(|e| SensorPipelineError::Config(e.to_string()))
    }
}
