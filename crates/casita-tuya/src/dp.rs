//! Data point codes and descriptor value types.
//!
//! Tuya devices expose their capabilities as data points. Each data
//! point has a code, a type, and for enum and integer types a JSON
//! descriptor describing the accepted values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data point codes the tracker category uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DpCode {
    /// Pause flag.
    Pause,
    /// Start charging switch.
    SwitchCharge,
    /// Working mode.
    Mode,
    /// Trigger the find-device beeper.
    Finddev,
    /// Reported working status.
    Status,
    /// Main power switch.
    Power,
    /// Start or stop working.
    PowerGo,
    /// Tracking aggressiveness mode.
    Trmode,
    /// Remaining battery percentage.
    ElectricityLeft,
}

impl DpCode {
    /// Wire form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            DpCode::Pause => "pause",
            DpCode::SwitchCharge => "switch_charge",
            DpCode::Mode => "mode",
            DpCode::Finddev => "finddev",
            DpCode::Status => "status",
            DpCode::Power => "power",
            DpCode::PowerGo => "power_go",
            DpCode::Trmode => "trmode",
            DpCode::ElectricityLeft => "electricity_left",
        }
    }
}

impl fmt::Display for DpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DpCode> for String {
    fn from(code: DpCode) -> Self {
        code.as_str().to_string()
    }
}

/// Declared type of a data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DpType {
    Boolean,
    Enum,
    Integer,
    Json,
    Raw,
    String,
}

/// Parsed descriptor of an integer data point.
///
/// `scale` is a power-of-ten divisor: a raw value of `255` with scale
/// `1` reads as `25.5`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntegerTypeData {
    pub min: i64,
    pub max: i64,
    pub scale: f64,
    pub step: f64,
    #[serde(default)]
    pub unit: String,
}

impl IntegerTypeData {
    /// Parse from the descriptor's `values` JSON. `None` when the JSON
    /// is malformed or not an integer descriptor.
    pub fn from_json(values: &str) -> Option<Self> {
        serde_json::from_str(values).ok()
    }

    /// Apply the scale divisor to a raw value.
    pub fn scale_value(&self, value: f64) -> f64 {
        value / 10f64.powf(self.scale)
    }
}

/// Parsed descriptor of an enum data point.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnumTypeData {
    pub range: Vec<String>,
}

impl EnumTypeData {
    /// Parse from the descriptor's `values` JSON. `None` when the JSON
    /// is malformed or not an enum descriptor.
    pub fn from_json(values: &str) -> Option<Self> {
        serde_json::from_str(values).ok()
    }
}
