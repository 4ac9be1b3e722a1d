//! Hierarchical aggregation tree. A process-singleton `root` group fans every
//! record out to a leaf (one per serial) and, where the record carries a known type,
//! additionally into a type-group. Leaves are shared (`Arc<Mutex<LeafState>>`) so the
//! same physical sensor can be a child of several groups without duplicating its history.

use crate::record::{SensorRecord, SensorType};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

pub const ROOT_KEY: &str = "root";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedStats {
    pub data_point_count: usize,
    pub temperature: f64,
    pub humidity: f64,
    pub battery_level: f64,
}

pub struct LeafState {
    pub serial: String,
    pub name: String,
    pub sensor_type: SensorType,
    pub history: Vec<SensorRecord>,
}

impl LeafState {
    fn new(serial: String) -> Self {
        LeafState {
            name: serial.clone(),
            serial,
            sensor_type: SensorType::Unknown,
            history: Vec::new(),
        }
    }

    fn stats(&self) -> AggregatedStats {
        let temps: Vec<f64> = self.history.iter().map(|r| r.temperature).filter(|t| *t > 0.0).collect();
        let hums: Vec<f64> = self.history.iter().map(|r| r.humidity).filter(|h| *h > 0.0).collect();
        let batt: Vec<f64> = self.history.iter().filter_map(|r| r.battery_percent()).collect();

        AggregatedStats {
            data_point_count: self.history.len(),
            temperature: mean(&temps),
            humidity: mean(&hums),
            battery_level: mean(&batt),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub type LeafHandle = Arc<Mutex<LeafState>>;

pub enum CompositeNode {
    Leaf(LeafHandle),
    Group(GroupNode),
}

impl CompositeNode {
    fn stats(&self) -> AggregatedStats {
        match self {
            CompositeNode::Leaf(l) => l.lock().expect("leaf mutex poisoned").stats(),
            CompositeNode::Group(g) => g.stats(),
        }
    }

    fn serial_identity(&self) -> Option<String> {
        match self {
            CompositeNode::Leaf(l) => Some(l.lock().expect("leaf mutex poisoned").serial.clone()),
            CompositeNode::Group(_) => None,
        }
    }
}

pub struct GroupNode {
    pub name: String,
    pub sensor_type: SensorType,
    pub children: Vec<CompositeNode>,
}

impl GroupNode {
    fn new(name: impl Into<String>, sensor_type: SensorType) -> Self {
        GroupNode {
            name: name.into(),
            sensor_type,
            children: Vec::new(),
        }
    }

    /// Identity-based de-dup: a leaf with the same serial is never inserted twice.
    fn insert_leaf(&mut self, leaf: LeafHandle) {
        let serial = leaf.lock().expect("leaf mutex poisoned").serial.clone();
        let already_present = self
            .children
            .iter()
            .any(|c| c.serial_identity().as_deref() == Some(serial.as_str()));
        if !already_present {
            self.children.push(CompositeNode::Leaf(leaf));
        }
    }

    fn find_group_mut(&mut self, name: &str) -> Option<&mut GroupNode> {
        self.children.iter_mut().find_map(|c| match c {
            CompositeNode::Group(g) if g.name == name => Some(g),
            _ => None,
        })
    }

    fn stats(&self) -> AggregatedStats {
        let child_stats: Vec<AggregatedStats> = self.children.iter().map(|c| c.stats()).collect();
        let data_point_count = child_stats.iter().map(|s| s.data_point_count).sum();

        AggregatedStats {
            data_point_count,
            temperature: contributing_mean(&child_stats, |s| s.temperature),
            humidity: contributing_mean(&child_stats, |s| s.humidity),
            battery_level: contributing_mean(&child_stats, |s| s.battery_level),
        }
    }
}

/// Mean over children whose own value is >0; zero-contributing children are excluded
/// from the denominator.
fn contributing_mean(stats: &[AggregatedStats], f: impl Fn(&AggregatedStats) -> f64) -> f64 {
    let values: Vec<f64> = stats.iter().map(&f).filter(|v| *v > 0.0).collect();
    mean(&values)
}

fn type_group_name(t: SensorType) -> Option<&'static str> {
    match t {
        SensorType::Temp => Some("Temperature Sensors"),
        SensorType::Humidity => Some("Humidity Sensors"),
        _ => None,
    }
}

/// Derives a manufacturer tag from a sensor serial. The default `PrefixTableResolver`
/// implements a fixed prefix table; swap in another implementation to
/// change the mapping without touching `CompositeManager`.
pub trait ManufacturerResolver: Send + Sync {
    fn resolve(&self, serial: &str) -> String;
}

pub struct PrefixTableResolver;

impl ManufacturerResolver for PrefixTableResolver {
    fn resolve(&self, serial: &str) -> String {
        match serial.chars().next() {
            Some('1') => "Qualcomm",
            Some('2') => "Texas Instruments",
            Some('3') => "NXP",
            Some('9') => "Infineon",
            _ => "Unknown",
        }
        .to_string()
    }
}

/// Read-only view of a leaf, handed to visitors so they cannot mutate the tree.
pub struct LeafView {
    pub serial: String,
    pub name: String,
    pub sensor_type: SensorType,
    pub stats: AggregatedStats,
}

/// Read-only view of a group, handed to visitors so they cannot mutate the tree.
pub struct GroupView {
    pub name: String,
    pub sensor_type: SensorType,
    pub stats: AggregatedStats,
}

pub trait Visitor {
    fn visit_leaf(&mut self, leaf: &LeafView);
    fn visit_group(&mut self, group: &GroupView);
    fn reset(&mut self);
    fn result(&self) -> String;
}

pub struct CompositeManager {
    root: GroupNode,
    leaves_by_serial: HashMap<String, LeafHandle>,
    manufacturer_resolver: Box<dyn ManufacturerResolver>,
}

impl Default for CompositeManager {
    fn default() -> Self {
        Self::new(Box::new(PrefixTableResolver))
    }
}

impl CompositeManager {
    pub fn new(manufacturer_resolver: Box<dyn ManufacturerResolver>) -> Self {
        let mut root = GroupNode::new("All Sensors", SensorType::Unknown);
        root.children.push(CompositeNode::Group(GroupNode::new("Temperature Sensors", SensorType::Temp)));
        root.children.push(CompositeNode::Group(GroupNode::new("Humidity Sensors", SensorType::Humidity)));

        CompositeManager {
            root,
            leaves_by_serial: HashMap::new(),
            manufacturer_resolver,
        }
    }

    pub fn add_record(&mut self, record: &SensorRecord) {
        if record.serial.is_empty() {
            return;
        }

        let leaf = self
            .leaves_by_serial
            .entry(record.serial.clone())
            .or_insert_with(|| {
                let handle: LeafHandle = Arc::new(Mutex::new(LeafState::new(record.serial.clone())));
                handle
            })
            .clone();

        // first time we see this serial, it also becomes a direct child of root
        self.root.insert_leaf(leaf.clone());

        {
            let mut state = leaf.lock().expect("leaf mutex poisoned");
            if record.sensor_type != SensorType::Unknown {
                state.sensor_type = record.sensor_type;
            }
            state.history.push(record.clone());
        }

        if let Some(group_name) = type_group_name(record.sensor_type) {
            if let Some(group) = self.root.find_group_mut(group_name) {
                group.insert_leaf(leaf);
            }
        }
    }

    pub fn get_group_stats(&self, key: &str) -> Option<AggregatedStats> {
        if key == ROOT_KEY {
            return Some(self.root.stats());
        }
        self.root.children.iter().find_map(|c| match c {
            CompositeNode::Group(g) if g.name == key => Some(g.stats()),
            _ => None,
        })
    }

    pub fn root_sensor_count(&self) -> usize {
        self.leaves_by_serial.len()
    }

    /// Partitions existing leaves into manufacturer groups, creating each group the
    /// first time it is needed and reusing it afterwards.
    pub fn organize_by_manufacturer(&mut self) {
        let leaves: Vec<LeafHandle> = self.leaves_by_serial.values().cloned().collect();
        for leaf in leaves {
            let serial = leaf.lock().expect("leaf mutex poisoned").serial.clone();
            let manufacturer = self.manufacturer_resolver.resolve(&serial);
            let group_name = format!("Manufacturer: {}", manufacturer);

            if self.root.find_group_mut(&group_name).is_none() {
                self.root.children.push(CompositeNode::Group(GroupNode::new(group_name.clone(), SensorType::Unknown)));
            }
            let group = self.root.find_group_mut(&group_name).expect("group just inserted");
            group.insert_leaf(leaf);
        }
    }

    pub fn display(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        write_node_group(out, &self.root, 0)
    }

    pub fn apply_visitor(&self, v: &mut dyn Visitor) -> String {
        v.reset();
        visit_group(&self.root, v);
        v.result()
    }
}

fn write_node_group(out: &mut dyn std::fmt::Write, group: &GroupNode, depth: usize) -> std::fmt::Result {
    let stats = group.stats();
    writeln!(
        out,
        "{}{} [{}] - points={} temp={:.2} hum={:.2} bat={:.2}",
        "  ".repeat(depth),
        group.name,
        group.sensor_type,
        stats.data_point_count,
        stats.temperature,
        stats.humidity,
        stats.battery_level
    )?;
    for child in &group.children {
        match child {
            CompositeNode::Leaf(leaf) => write_node_leaf(out, leaf, depth + 1)?,
            CompositeNode::Group(g) => write_node_group(out, g, depth + 1)?,
        }
    }
    Ok(())
}

fn write_node_leaf(out: &mut dyn std::fmt::Write, leaf: &LeafHandle, depth: usize) -> std::fmt::Result {
    let state = leaf.lock().expect("leaf mutex poisoned");
    let stats = state.stats();
    writeln!(
        out,
        "{}{} ({}) [{}] - points={} temp={:.2} hum={:.2} bat={:.2}",
        "  ".repeat(depth),
        state.name,
        state.serial,
        state.sensor_type,
        stats.data_point_count,
        stats.temperature,
        stats.humidity,
        stats.battery_level
    )
}

fn visit_group(group: &GroupNode, v: &mut dyn Visitor) {
    v.visit_group(&GroupView {
        name: group.name.clone(),
        sensor_type: group.sensor_type,
        stats: group.stats(),
    });
    for child in &group.children {
        match child {
            CompositeNode::Leaf(leaf) => {
                let state = leaf.lock().expect("leaf mutex poisoned");
                v.visit_leaf(&LeafView {
                    serial: state.serial.clone(),
                    name: state.name.clone(),
                    sensor_type: state.sensor_type,
                    stats: state.stats(),
                });
            }
            CompositeNode::Group(g) => visit_group(g, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SensorRecord;

    fn temp_record(serial: &str, temperature: f64) -> SensorRecord {
        SensorRecord {
            serial: serial.to_string(),
            sensor_type: SensorType::Temp,
            temperature,
            ..Default::default()
        }
    }

    #[test]
    fn empty_serial_is_a_noop() {
        let mut mgr = CompositeManager::default();
        mgr.add_record(&SensorRecord::default());
        assert_eq!(mgr.root_sensor_count(), 0);
    }

    #[test]
    fn composite_totality_across_distinct_serials() {
        let mut mgr = CompositeManager::default();
        for i in 0..5 {
            mgr.add_record(&temp_record(&i.to_string(), 20.0 + i as f64));
        }
        assert_eq!(mgr.root_sensor_count(), 5);
        assert_eq!(mgr.get_group_stats(ROOT_KEY).unwrap().data_point_count, 5);
    }

    #[test]
    fn leaf_joins_matching_type_group() {
        let mut mgr = CompositeManager::default();
        mgr.add_record(&temp_record("111", 24.5));
        let stats = mgr.get_group_stats("Temperature Sensors").unwrap();
        assert_eq!(stats.data_point_count, 1);
        assert_eq!(stats.temperature, 24.5);
    }

    #[test]
    fn repeated_records_for_same_serial_accumulate_in_one_leaf() {
        let mut mgr = CompositeManager::default();
        mgr.add_record(&temp_record("111", 20.0));
        mgr.add_record(&temp_record("111", 30.0));
        assert_eq!(mgr.root_sensor_count(), 1);
        let stats = mgr.get_group_stats(ROOT_KEY).unwrap();
        assert_eq!(stats.data_point_count, 2);
        assert_eq!(stats.temperature, 25.0);
    }

    #[test]
    fn organize_by_manufacturer_splits_by_prefix() {
        let mut mgr = CompositeManager::default();
        mgr.add_record(&temp_record("111", 24.5));
        mgr.add_record(&temp_record("333", 31.5));
        mgr.organize_by_manufacturer();

        let qualcomm = mgr.get_group_stats("Manufacturer: Qualcomm").unwrap();
        assert_eq!(qualcomm.data_point_count, 1);
        let nxp = mgr.get_group_stats("Manufacturer: NXP").unwrap();
        assert_eq!(nxp.data_point_count, 1);
    }

    #[test]
    fn visitor_produces_equal_output_across_repeated_runs() {
        struct Counter {
            leaves: usize,
        }
        impl Visitor for Counter {
            fn visit_leaf(&mut self, _leaf: &LeafView) {
                self.leaves += 1;
            }
            fn visit_group(&mut self, _group: &GroupView) {}
            fn reset(&mut self) {
                self.leaves = 0;
            }
            fn result(&self) -> String {
                format!("leaves={}", self.leaves)
            }
        }

        let mut mgr = CompositeManager::default();
        mgr.add_record(&temp_record("111", 24.5));
        mgr.add_record(&temp_record("222", 26.0));

        let mut v = Counter { leaves: 0 };
        let r1 = mgr.apply_visitor(&mut v);
        let r2 = mgr.apply_visitor(&mut v);
        assert_eq!(r1, r2);
        assert_eq!(r1, "leaves=2");
    }

    #[test]
    fn battery_percent_reported_at_leaf() {
        let mut mgr = CompositeManager::default();
        mgr.add_record(&SensorRecord {
            serial: "111".into(),
            sensor_type: SensorType::Temp,
            battery_level: 80.0,
            battery_max: 100.0,
            ..Default::default()
        });
        let stats = mgr.get_group_stats(ROOT_KEY).unwrap();
        assert_eq!(stats.battery_level, 80.0);
    }
}
