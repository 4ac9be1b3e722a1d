//! Composite visitors. Each visitor accumulates a text report across a
//! traversal; `CompositeManager::apply_visitor` resets it, walks the tree, and
//! returns the final `result()`.

use crate::composite::{GroupView, LeafView, Visitor};

/// Classifies every leaf with data by its aggregated battery level.
pub struct HealthVisitor {
    critical: Vec<String>,
    warning: Vec<String>,
    healthy_count: usize,
}

impl Default for HealthVisitor {
    fn default() -> Self {
        HealthVisitor { critical: Vec::new(), warning: Vec::new(), healthy_count: 0 }
    }
}

impl Visitor for HealthVisitor {
    fn visit_leaf(&mut self, leaf: &LeafView) {
        if leaf.stats.data_point_count == 0 {
            return;
        }
        if leaf.stats.battery_level < 30.0 {
            self.critical.push(leaf.name.clone());
        } else if leaf.stats.battery_level < 50.0 {
            self.warning.push(leaf.name.clone());
        } else {
            self.healthy_count += 1;
        }
    }

    fn visit_group(&mut self, _group: &GroupView) {}

    fn reset(&mut self) {
        self.critical.clear();
        self.warning.clear();
        self.healthy_count = 0;
    }

    fn result(&self) -> String {
        let mut out = format!(
            "healthy={} warning={} critical={}",
            self.healthy_count,
            self.warning.len(),
            self.critical.len()
        );
        if !self.critical.is_empty() {
            out.push_str(&format!("\ncritical: {}", self.critical.join(", ")));
        }
        if !self.warning.is_empty() {
            out.push_str(&format!("\nwarning: {}", self.warning.join(", ")));
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnomalyThresholds {
    pub temp_low: f64,
    pub temp_high: f64,
    pub hum_low: f64,
    pub hum_high: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        AnomalyThresholds { temp_low: 15.0, temp_high: 30.0, hum_low: 30.0, hum_high: 70.0 }
    }
}

/// Reports, for every leaf with data, any temperature or humidity mean outside the
/// configured range. Ignores groups.
pub struct AnomalyVisitor {
    thresholds: AnomalyThresholds,
    anomalies: Vec<String>,
}

impl Default for AnomalyVisitor {
    fn default() -> Self {
        Self::new(AnomalyThresholds::default())
    }
}

impl AnomalyVisitor {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        AnomalyVisitor { thresholds, anomalies: Vec::new() }
    }
}

impl Visitor for AnomalyVisitor {
    fn visit_leaf(&mut self, leaf: &LeafView) {
        if leaf.stats.data_point_count == 0 {
            return;
        }
        let t = &self.thresholds;
        if leaf.stats.temperature > 0.0 {
            if leaf.stats.temperature > t.temp_high {
                self.anomalies.push(format!("{}: temperature {:.1}°C above {:.1}°C", leaf.serial, leaf.stats.temperature, t.temp_high));
            } else if leaf.stats.temperature < t.temp_low {
                self.anomalies.push(format!("{}: temperature {:.1}°C below {:.1}°C", leaf.serial, leaf.stats.temperature, t.temp_low));
            }
        }
        if leaf.stats.humidity > 0.0 {
            if leaf.stats.humidity > t.hum_high {
                self.anomalies.push(format!("{}: humidity {:.1}% above {:.1}%", leaf.serial, leaf.stats.humidity, t.hum_high));
            } else if leaf.stats.humidity < t.hum_low {
                self.anomalies.push(format!("{}: humidity {:.1}% below {:.1}%", leaf.serial, leaf.stats.humidity, t.hum_low));
            }
        }
    }

    fn visit_group(&mut self, _group: &GroupView) {}

    fn reset(&mut self) {
        self.anomalies.clear();
    }

    fn result(&self) -> String {
        if self.anomalies.is_empty() {
            "no anomalies found".to_string()
        } else {
            self.anomalies.join("\n")
        }
    }
}
