//! Device registry — observability only (spec.md §3 "DeviceInfo").
//!
//! Registration and status updates mutate this map but never influence
//! scheduling; an implementer may omit it without affecting correctness.
//! Carried here because it's present in the original Go coordinator
//! (`examples/original_source/src/device.go`) and SPEC_FULL.md keeps it as
//! a supplemented, non-excluded feature.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct DeviceRecord {
    pub device_id: String,
    pub available_ram: i64,
    pub cpu_usage: i32,
    pub internet_speed: i64,
    pub is_charging: bool,
}

#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, device_id: String) {
        let mut devices = self.devices.write().unwrap();
        devices
            .entry(device_id.clone())
            .or_insert(DeviceRecord {
                device_id,
                ..Default::default()
            });
    }

    /// Returns `false` if `device_id` was never registered — callers map
    /// that to `{updated: false, "Device not registered."}` per
    /// `examples/original_source/src/device.go`.
    pub fn update_status(
        &self,
        device_id: &str,
        available_ram: i64,
        cpu_usage: i32,
        internet_speed: i64,
        is_charging: bool,
    ) -> bool {
        let mut devices = self.devices.write().unwrap();
        match devices.get_mut(device_id) {
            Some(record) => {
                record.available_ram = available_ram;
                record.cpu_usage = cpu_usage;
                record.internet_speed = internet_speed;
                record.is_charging = is_charging;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn get(&self, device_id: &str) -> Option<DeviceRecord> {
        self.devices.read().unwrap().get(device_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_update() {
        let registry = DeviceRegistry::new();
        registry.register("dev1".into());
        assert!(registry.update_status("dev1", 1024, 42, 100, true));
        let record = registry.get("dev1").unwrap();
        assert_eq!(record.cpu_usage, 42);
        assert!(record.is_charging);
    }

    #[test]
    fn update_unknown_device_fails() {
        let registry = DeviceRegistry::new();
        assert!(!registry.update_status("ghost", 0, 0, 0, false));
    }
}
