//! Pipeline coordinator. `process_record` is the single entry point that every
//! execution mode (sequential, worker pool, streaming queue) funnels through. A failure
//! at any step past parsing is caught, logged with the raw line, and does not prevent
//! subsequent records from being processed.

use crate::actor::alert::AlertThresholds;
use crate::actor::subsystem::ActorSubsystem;
use crate::analyzer::{AnalyzerManager, AnalyzerThresholds};
use crate::composite::CompositeManager;
use crate::config::PipelineConfig;
use crate::observer::ObserverBroadcaster;
use crate::parser::{default_parsers, LineParser};
use crate::record::SensorType;
use crate::registry::TypeRegistry;
use crate::sinks::{DisplayItem, SinkRegistry};
use std::sync::Mutex;

pub struct PipelineCoordinator {
    parsers: Vec<Box<dyn LineParser>>,
    composite: Mutex<CompositeManager>,
    registry: TypeRegistry,
    analyzers: Mutex<AnalyzerManager>,
    actors: ActorSubsystem,
    sinks: SinkRegistry,
    observers: ObserverBroadcaster,
}

impl PipelineCoordinator {
    pub fn new(config: &PipelineConfig, sinks: SinkRegistry) -> Self {
        let analyzer_thresholds = AnalyzerThresholds {
            temp_warning: config.analyzer_temp_warning,
            temp_critical: config.analyzer_temp_critical,
            hum_low: config.analyzer_hum_low,
            hum_high: config.analyzer_hum_high,
            battery_low: config.analyzer_battery_low_ratio,
        };
        let alert_thresholds = AlertThresholds {
            temp_high: config.alert_temp_high,
            temp_low: config.alert_temp_low,
            hum_high: config.alert_hum_high,
            hum_low: config.alert_hum_low,
            battery_low: config.alert_battery_low_percent,
        };

        PipelineCoordinator {
            parsers: default_parsers(),
            composite: Mutex::new(CompositeManager::default()),
            registry: TypeRegistry::new(),
            analyzers: Mutex::new(AnalyzerManager::new(&analyzer_thresholds, crate::analyzer::default_factories())),
            actors: ActorSubsystem::spawn(
                config.actor_mailbox_bound,
                alert_thresholds,
                std::time::Duration::from_secs(config.actor_request_timeout_secs),
            ),
            sinks,
            observers: ObserverBroadcaster::new(),
        }
    }

    pub fn observers(&self) -> &ObserverBroadcaster {
        &self.observers
    }

    /// Runs the full 8-step flow for one raw line. Safe to call concurrently.
    pub async fn process_record(&self, raw: &str) {
        let parser = match self.parsers.iter().find(|p| p.can_parse(raw)) {
            Some(p) => p,
            None => {
                tracing::debug!(line = %raw, "no parser claimed line, dropping");
                return;
            }
        };

        let record = parser.parse(raw);

        {
            let mut composite = self.composite.lock().expect("composite mutex poisoned");
            composite.add_record(&record);
        }

        if !record.serial.is_empty() && record.sensor_type != SensorType::Unknown {
            self.registry.register(&record.serial, record.sensor_type);
        }

        {
            let mut analyzers = self.analyzers.lock().expect("analyzer mutex poisoned");
            analyzers.analyze_data(&record);
        }

        if let Err(e) = self.actors.send(record.clone()).await {
            tracing::error!(line = %raw, error = %e, "actor subsystem send failed");
        }

        self.sinks.display(DisplayItem::Record(&record));
        self.observers.notify(&record);
    }

    pub fn composite(&self) -> &Mutex<CompositeManager> {
        &self.composite
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn analyzers(&self) -> &Mutex<AnalyzerManager> {
        &self.analyzers
    }

    pub fn actors(&self) -> &ActorSubsystem {
        &self.actors
    }

    pub async fn shutdown(self) -> crate::errors::Result<()> {
        self.actors.shutdown().await
    }
}
