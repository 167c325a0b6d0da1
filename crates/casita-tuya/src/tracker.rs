//! Tracker entity adapting one cloud device.
//!
//! Capabilities are probed once at construction from the device's
//! capability tables; the read side is recomputed from the live status
//! map on every call. Commands go through the device manager, and a
//! refresh is only requested when the policy asks for one; by default
//! the cloud pushes status changes itself.

use std::sync::Arc;

use async_trait::async_trait;
use casita_core::{Entity, EntityState, RefreshHandle, RefreshPolicy};
use serde_json::{Map, Value};

use crate::cloud::{DeviceManager, DpCommand, TuyaDevice};
use crate::dp::{DpCode, EnumTypeData, IntegerTypeData};
use crate::error::TuyaError;

/// Mode value that sends the device back to its charger.
pub const MODE_RETURN_HOME: &str = "chargego";

/// Unique id for a tracker device.
pub fn tracker_uid(device_id: &str) -> String {
    format!("tuya.{device_id}")
}

bitflags::bitflags! {
    /// Capabilities a tracker advertises after probing its device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TrackerFeature: u32 {
        /// Raw commands can be sent.
        const SEND_COMMAND = 1 << 0;
        /// Working can be paused.
        const PAUSE = 1 << 1;
        /// The device can be sent back to its charger.
        const RETURN_HOME = 1 << 2;
        /// The find-device beeper can be triggered.
        const LOCATE = 1 << 3;
        /// The device reports a working state.
        const STATE = 1 << 4;
        /// The device reports a status string.
        const STATUS = 1 << 5;
        /// The device can be switched on.
        const TURN_ON = 1 << 6;
        /// The device can be switched off.
        const TURN_OFF = 1 << 7;
        /// Working can be started.
        const START = 1 << 8;
        /// Working can be stopped.
        const STOP = 1 << 9;
        /// The tracking aggressiveness can be set.
        const TRACKING_MODE = 1 << 10;
        /// The battery level is reported.
        const BATTERY = 1 << 11;
    }
}

fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Map a reported status string onto the hub state vocabulary.
fn status_state(status: &str) -> Option<EntityState> {
    match status {
        "standby" | "sleep" => Some(EntityState::Idle),
        "tracking" | "finding" => Some(EntityState::On),
        "charging" | "charge_done" => Some(EntityState::Docked),
        "goto_charge" => Some(EntityState::Returning),
        "paused" => Some(EntityState::Paused),
        "malfunction" => Some(EntityState::Error),
        _ => None,
    }
}

/// Hub entity for one Tuya tracker device.
pub struct TrackerEntity {
    device: Arc<TuyaDevice>,
    manager: Arc<dyn DeviceManager>,
    uid: String,
    features: TrackerFeature,
    battery: Option<IntegerTypeData>,
    tracking_modes: Option<EnumTypeData>,
    refresh: RefreshHandle,
    policy: RefreshPolicy,
}

impl TrackerEntity {
    /// Wrap a device, probing its capability tables once.
    pub fn new(
        device: Arc<TuyaDevice>,
        manager: Arc<dyn DeviceManager>,
        refresh: RefreshHandle,
        policy: RefreshPolicy,
    ) -> Self {
        let mut features = TrackerFeature::SEND_COMMAND;

        if device.find_dpcode(DpCode::Pause, true) {
            features |= TrackerFeature::PAUSE;
        }

        if device.find_dpcode(DpCode::SwitchCharge, true) {
            features |= TrackerFeature::RETURN_HOME;
        } else if device
            .find_enum(DpCode::Mode, true)
            .is_some_and(|modes| modes.range.iter().any(|mode| mode == MODE_RETURN_HOME))
        {
            features |= TrackerFeature::RETURN_HOME;
        }

        if device.find_dpcode(DpCode::Finddev, false) {
            features |= TrackerFeature::LOCATE;
        }

        if device.find_dpcode(DpCode::Status, true) {
            features |= TrackerFeature::STATE | TrackerFeature::STATUS;
        }

        if device.find_dpcode(DpCode::Power, true) {
            features |= TrackerFeature::TURN_ON | TrackerFeature::TURN_OFF;
        }

        if device.find_dpcode(DpCode::PowerGo, true) {
            features |= TrackerFeature::START | TrackerFeature::STOP;
        }

        let tracking_modes = device.find_enum(DpCode::Trmode, true);
        if tracking_modes.is_some() {
            features |= TrackerFeature::TRACKING_MODE;
        }

        let battery = device.find_integer(DpCode::ElectricityLeft, false);
        if battery.is_some() {
            features |= TrackerFeature::BATTERY;
        }

        Self {
            uid: tracker_uid(&device.id),
            device,
            manager,
            features,
            battery,
            tracking_modes,
            refresh,
            policy,
        }
    }

    /// Capabilities probed at construction.
    pub fn features(&self) -> TrackerFeature {
        self.features
    }

    /// Scaled battery percentage, when the device declares and reports
    /// one. A reported zero is a valid level.
    pub fn battery_level(&self) -> Option<i64> {
        let battery = self.battery.as_ref()?;
        let raw = self.device.status(DpCode::ElectricityLeft.as_str())?;
        let raw = raw.as_f64()?;
        Some(battery.scale_value(raw).round() as i64)
    }

    /// Currently reported tracking mode.
    pub fn tracking_mode(&self) -> Option<String> {
        self.device
            .status(DpCode::Trmode.as_str())
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Tracking modes the device accepts.
    pub fn tracking_modes(&self) -> Option<Vec<String>> {
        self.tracking_modes.as_ref().map(|modes| modes.range.clone())
    }

    fn maybe_refresh(&self) {
        if self.policy.on_write() {
            self.refresh.request(self.uid.as_str());
        }
    }

    async fn send(&self, commands: Vec<DpCommand>) -> Result<(), TuyaError> {
        self.manager.send_commands(&self.device.id, commands).await?;
        self.maybe_refresh();
        Ok(())
    }

    /// Switch the device on.
    pub async fn turn_on(&self) -> Result<(), TuyaError> {
        self.send(vec![DpCommand::new(DpCode::Power, true)]).await
    }

    /// Switch the device off.
    pub async fn turn_off(&self) -> Result<(), TuyaError> {
        self.send(vec![DpCommand::new(DpCode::Power, false)]).await
    }

    /// Start working.
    pub async fn start(&self) -> Result<(), TuyaError> {
        self.send(vec![DpCommand::new(DpCode::PowerGo, true)]).await
    }

    /// Stop working.
    pub async fn stop(&self) -> Result<(), TuyaError> {
        self.send(vec![DpCommand::new(DpCode::PowerGo, false)]).await
    }

    /// Pause working. The device models this as a stop.
    pub async fn pause(&self) -> Result<(), TuyaError> {
        self.send(vec![DpCommand::new(DpCode::PowerGo, false)]).await
    }

    /// Send the device back to its charger.
    pub async fn return_to_base(&self) -> Result<(), TuyaError> {
        self.send(vec![
            DpCommand::new(DpCode::SwitchCharge, true),
            DpCommand::new(DpCode::Mode, MODE_RETURN_HOME),
        ])
        .await
    }

    /// Trigger the find-device beeper.
    pub async fn locate(&self) -> Result<(), TuyaError> {
        self.send(vec![DpCommand::new(DpCode::Finddev, true)]).await
    }

    /// Set the tracking aggressiveness mode.
    pub async fn set_tracking_mode(&self, mode: &str) -> Result<(), TuyaError> {
        self.send(vec![DpCommand::new(DpCode::Trmode, mode)]).await
    }

    /// Send a raw command. The first parameter becomes the value; an
    /// empty parameter list is rejected before anything is sent.
    pub async fn send_raw_command(&self, code: &str, params: &[Value]) -> Result<(), TuyaError> {
        let value = params.first().ok_or_else(|| {
            TuyaError::InvalidCommand("params cannot be omitted for tracker commands".to_string())
        })?;
        self.send(vec![DpCommand {
            code: code.to_string(),
            value: value.clone(),
        }])
        .await
    }
}

#[async_trait]
impl Entity for TrackerEntity {
    fn unique_id(&self) -> &str {
        &self.uid
    }

    fn name(&self) -> String {
        self.device.name.clone()
    }

    fn state(&self) -> Option<EntityState> {
        let status = self
            .device
            .status(DpCode::Status.as_str())
            .filter(value_truthy);
        let paused = self
            .device
            .status(DpCode::Pause.as_str())
            .is_some_and(|value| value_truthy(&value));

        if paused && status.is_none() {
            return Some(EntityState::Paused);
        }
        status_state(status?.as_str()?)
    }

    fn attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        if let Some(level) = self.battery_level() {
            attrs.insert("battery_level".to_string(), Value::from(level));
        }
        if let Some(mode) = self.tracking_mode() {
            attrs.insert("tracking_mode".to_string(), Value::from(mode));
        }
        if let Some(modes) = self.tracking_modes() {
            attrs.insert("tracking_modes".to_string(), Value::from(modes));
        }
        attrs
    }

    fn available(&self) -> bool {
        self.device.online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dp::DpType;
    use crate::testing::FakeDeviceManager;
    use serde_json::json;

    fn full_device() -> TuyaDevice {
        TuyaDevice::new("dev-1", "Collar", "tracker", "pt-1")
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
                r#"{"range":["standby","tracking","charging","goto_charge"]}"#,
            )
            .with_status_range(
                DpCode::ElectricityLeft,
                DpType::Integer,
                r#"{"min":0,"max":100,"scale":0,"step":1,"unit":"%"}"#,
            )
    }

    fn tracker_for(device: TuyaDevice) -> (TrackerEntity, Arc<FakeDeviceManager>) {
        let manager = Arc::new(FakeDeviceManager::new());
        let device = manager.insert(device);
        let tracker = TrackerEntity::new(
            device,
            manager.clone(),
            RefreshHandle::new(),
            RefreshPolicy::PushOnly,
        );
        (tracker, manager)
    }

    #[test]
    fn test_probe_full_device() {
        let (tracker, _) = tracker_for(full_device());
        let features = tracker.features();

        assert!(features.contains(TrackerFeature::SEND_COMMAND));
        assert!(features.contains(TrackerFeature::PAUSE));
        assert!(features.contains(TrackerFeature::RETURN_HOME));
        assert!(features.contains(TrackerFeature::LOCATE));
        assert!(features.contains(TrackerFeature::STATE | TrackerFeature::STATUS));
        assert!(features.contains(TrackerFeature::TURN_ON | TrackerFeature::TURN_OFF));
        assert!(features.contains(TrackerFeature::START | TrackerFeature::STOP));
        assert!(features.contains(TrackerFeature::TRACKING_MODE));
        assert!(features.contains(TrackerFeature::BATTERY));
    }

    #[test]
    fn test_probe_bare_device() {
        let (tracker, _) =
            tracker_for(TuyaDevice::new("dev-2", "Basic", "tracker", "pt-2"));
        assert_eq!(tracker.features(), TrackerFeature::SEND_COMMAND);
        assert_eq!(tracker.battery_level(), None);
    }

    #[test]
    fn test_probe_partial_device() {
        let device = TuyaDevice::new("dev-6", "Switch", "tracker", "pt-6")
            .with_function(DpCode::Power, DpType::Boolean, "")
            .with_status_range(
                DpCode::Status,
                DpType::Enum,
                r#"{"range":["standby","tracking"]}"#,
            );
        let (tracker, _) = tracker_for(device);
        assert_eq!(
            tracker.features(),
            TrackerFeature::SEND_COMMAND
                | TrackerFeature::TURN_ON
                | TrackerFeature::TURN_OFF
                | TrackerFeature::STATE
                | TrackerFeature::STATUS
        );
    }

    #[test]
    fn test_return_home_via_mode_range() {
        let device = TuyaDevice::new("dev-3", "Collar", "tracker", "pt-3").with_function(
            DpCode::Mode,
            DpType::Enum,
            r#"{"range":["standby","chargego"]}"#,
        );
        let (tracker, _) = tracker_for(device);
        assert!(tracker.features().contains(TrackerFeature::RETURN_HOME));

        let device = TuyaDevice::new("dev-4", "Collar", "tracker", "pt-4").with_function(
            DpCode::Mode,
            DpType::Enum,
            r#"{"range":["standby"]}"#,
        );
        let (tracker, _) = tracker_for(device);
        assert!(!tracker.features().contains(TrackerFeature::RETURN_HOME));
    }

    #[test]
    fn test_state_mapping() {
        let (tracker, manager) = tracker_for(full_device());
        let device = manager.device("dev-1").unwrap();

        assert_eq!(tracker.state(), None);

        device.set_status("status", "tracking");
        assert_eq!(tracker.state(), Some(EntityState::On));

        device.set_status("status", "charging");
        assert_eq!(tracker.state(), Some(EntityState::Docked));

        device.set_status("status", "goto_charge");
        assert_eq!(tracker.state(), Some(EntityState::Returning));

        device.set_status("status", "malfunction");
        assert_eq!(tracker.state(), Some(EntityState::Error));

        device.set_status("status", "warp_drive");
        assert_eq!(tracker.state(), None);
    }

    #[test]
    fn test_pause_flag_wins_only_without_status() {
        let (tracker, manager) = tracker_for(full_device());
        let device = manager.device("dev-1").unwrap();

        device.set_status("pause", true);
        assert_eq!(tracker.state(), Some(EntityState::Paused));

        // An empty status string does not defeat the pause flag
        device.set_status("status", "");
        assert_eq!(tracker.state(), Some(EntityState::Paused));

        device.set_status("status", "tracking");
        assert_eq!(tracker.state(), Some(EntityState::On));
    }

    #[test]
    fn test_battery_scaling_and_zero() {
        let (tracker, manager) = tracker_for(full_device());
        let device = manager.device("dev-1").unwrap();

        assert_eq!(tracker.battery_level(), None);

        device.set_status("electricity_left", 75);
        assert_eq!(tracker.battery_level(), Some(75));

        device.set_status("electricity_left", 0);
        assert_eq!(tracker.battery_level(), Some(0));
    }

    #[test]
    fn test_battery_scaled_descriptor() {
        let device = TuyaDevice::new("dev-5", "Collar", "tracker", "pt-5")
            .with_status_range(
                DpCode::ElectricityLeft,
                DpType::Integer,
                r#"{"min":0,"max":1000,"scale":1,"step":1}"#,
            )
            .with_status(DpCode::ElectricityLeft, 755);
        let (tracker, _) = tracker_for(device);
        assert_eq!(tracker.battery_level(), Some(76));
    }

    #[test]
    fn test_attributes() {
        let (tracker, manager) = tracker_for(full_device());
        let device = manager.device("dev-1").unwrap();
        device.set_status("electricity_left", 40);
        device.set_status("trmode", "eco");

        let attrs = tracker.attributes();
        assert_eq!(attrs["battery_level"], 40);
        assert_eq!(attrs["tracking_mode"], "eco");
        assert_eq!(attrs["tracking_modes"], json!(["normal", "eco", "precise"]));
    }

    #[tokio::test]
    async fn test_commands_map_to_data_points() {
        let (tracker, manager) = tracker_for(full_device());

        tracker.turn_on().await.unwrap();
        assert_eq!(
            manager.last_sent().unwrap(),
            ("dev-1".to_string(), vec![DpCommand::new("power", true)])
        );

        tracker.pause().await.unwrap();
        assert_eq!(
            manager.last_sent().unwrap().1,
            vec![DpCommand::new("power_go", false)]
        );

        tracker.return_to_base().await.unwrap();
        assert_eq!(
            manager.last_sent().unwrap().1,
            vec![
                DpCommand::new("switch_charge", true),
                DpCommand::new("mode", "chargego"),
            ]
        );

        tracker.locate().await.unwrap();
        assert_eq!(
            manager.last_sent().unwrap().1,
            vec![DpCommand::new("finddev", true)]
        );

        tracker.set_tracking_mode("precise").await.unwrap();
        assert_eq!(
            manager.last_sent().unwrap().1,
            vec![DpCommand::new("trmode", "precise")]
        );
    }

    #[tokio::test]
    async fn test_raw_command_requires_params() {
        let (tracker, manager) = tracker_for(full_device());

        let err = tracker.send_raw_command("beep", &[]).await.unwrap_err();
        assert!(matches!(err, TuyaError::InvalidCommand(_)));
        assert!(manager.last_sent().is_none());

        tracker
            .send_raw_command("beep", &[json!(3), json!("ignored")])
            .await
            .unwrap();
        assert_eq!(
            manager.last_sent().unwrap().1,
            vec![DpCommand::new("beep", 3)]
        );
    }

    #[tokio::test]
    async fn test_refresh_policy_override() {
        let manager = Arc::new(FakeDeviceManager::new());
        let device = manager.insert(full_device());
        let refresh = RefreshHandle::new();
        let tracker = TrackerEntity::new(
            device,
            manager.clone(),
            refresh.clone(),
            RefreshPolicy::OnWrite,
        );
        let mut requests = refresh.subscribe();

        tracker.start().await.unwrap();
        assert_eq!(requests.try_recv().unwrap().as_str(), "tuya.dev-1");
    }

    #[test]
    fn test_availability_follows_online_flag() {
        let (tracker, manager) = tracker_for(full_device());
        let device = manager.device("dev-1").unwrap();

        assert!(tracker.available());
        device.set_online(false);
        assert!(!tracker.available());
    }
}
