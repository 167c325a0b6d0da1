//! In-memory cloud manager for tests and demos.
//!
//! The fake records every command batch instead of talking to the
//! cloud. It never mutates device status on its own; tests model cloud
//! pushes by calling [`TuyaDevice::set_status`] directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::cloud::{DeviceManager, DpCommand, TuyaDevice};
use crate::dp::{DpCode, DpType};
use crate::error::TuyaError;

/// Cloud manager backed by an in-memory device table.
pub struct FakeDeviceManager {
    devices: DashMap<String, Arc<TuyaDevice>>,
    sent: Mutex<Vec<(String, Vec<DpCommand>)>>,
    fail: AtomicBool,
}

impl FakeDeviceManager {
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Add a device to the account.
    pub fn insert(&self, device: TuyaDevice) -> Arc<TuyaDevice> {
        let device = Arc::new(device);
        self.devices.insert(device.id.clone(), device.clone());
        device
    }

    /// Every command batch sent so far, oldest first.
    pub fn sent_commands(&self) -> Vec<(String, Vec<DpCommand>)> {
        self.sent.lock().clone()
    }

    /// The most recent command batch.
    pub fn last_sent(&self) -> Option<(String, Vec<DpCommand>)> {
        self.sent.lock().last().cloned()
    }

    /// Make every subsequent send fail with a request error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Default for FakeDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceManager for FakeDeviceManager {
    fn device_ids(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.key().clone()).collect()
    }

    fn device(&self, device_id: &str) -> Option<Arc<TuyaDevice>> {
        self.devices.get(device_id).map(|d| d.value().clone())
    }

    async fn send_commands(
        &self,
        device_id: &str,
        commands: Vec<DpCommand>,
    ) -> Result<(), TuyaError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TuyaError::Request("injected failure".to_string()));
        }
        if !self.devices.contains_key(device_id) {
            return Err(TuyaError::DeviceNotFound(device_id.to_string()));
        }
        self.sent.lock().push((device_id.to_string(), commands));
        Ok(())
    }
}

/// A tracker device with the full capability set, reporting standby at
/// 75% battery.
pub fn demo_tracker(id: &str, name: &str) -> TuyaDevice {
    TuyaDevice::new(id, name, "tracker", "demo-tracker")
        .with_function(DpCode::Power, DpType::Boolean, "")
        .with_function(DpCode::PowerGo, DpType::Boolean, "")
        .with_function(DpCode::Pause, DpType::Boolean, "")
        .with_function(DpCode::SwitchCharge, DpType::Boolean, "")
        .with_function(
            DpCode::Trmode,
            DpType::Enum,
            r#"{"range":["normal","eco","precise"]}"#,
        )
        .with_status_range(DpCode::Finddev, DpType::Boolean, "")
        .with_status_range(
            DpCode::Status,
            DpType::Enum,
            r#"{"range":["standby","sleep","tracking","finding","charging","charge_done","goto_charge","malfunction"]}"#,
        )
        .with_status_range(
            DpCode::ElectricityLeft,
            DpType::Integer,
            r#"{"min":0,"max":100,"scale":0,"step":1,"unit":"%"}"#,
        )
        .with_status(DpCode::Status, "standby")
        .with_status(DpCode::ElectricityLeft, 75)
}
