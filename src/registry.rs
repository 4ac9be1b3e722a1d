//! Process-wide `serial -> type` map. A single mutex guards the internal map;
//! reads return owned copies, never references into internal state.

use crate::record::SensorType;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

pub struct TypeRegistry {
    inner: Mutex<HashMap<String, SensorType>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent; overwrites the stored type on conflict.
    pub fn register(&self, serial: &str, sensor_type: SensorType) {
        let mut map = self.inner.lock().expect("type registry mutex poisoned");
        map.insert(serial.to_string(), sensor_type);
    }

    pub fn get(&self, serial: &str) -> SensorType {
        let map = self.inner.lock().expect("type registry mutex poisoned");
        map.get(serial).copied().unwrap_or(SensorType::Unknown)
    }

    pub fn snapshot(&self) -> HashMap<String, SensorType> {
        let map = self.inner.lock().expect("type registry mutex poisoned");
        map.clone()
    }

    pub fn count(&self) -> usize {
        let map = self.inner.lock().expect("type registry mutex poisoned");
        map.len()
    }
}

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// Process-singleton accessor. Prefer constructing a `TypeRegistry` explicitly and
/// injecting it into the coordinator; this is kept around only so tests that need a
/// process-wide instance have somewhere stable to reach for one.
pub fn global() -> &'static TypeRegistry {
    GLOBAL.get_or_init(TypeRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_overwrites_on_conflict() {
        let reg = TypeRegistry::new();
        reg.register("111", SensorType::Temp);
        reg.register("111", SensorType::Humidity);
        assert_eq!(reg.get("111"), SensorType::Humidity);
    }

    #[test]
    fn unknown_serial_returns_unknown() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.get("nope"), SensorType::Unknown);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let reg = TypeRegistry::new();
        reg.register("111", SensorType::Temp);
        let snap = reg.snapshot();
        reg.register("222", SensorType::Battery);
        assert_eq!(snap.len(), 1);
        assert_eq!(reg.count(), 2);
    }
}
