//! Cloud-owned device objects and the manager contract.
//!
//! A [`TuyaDevice`] mirrors what the cloud reports for one device: the
//! identity fields, the online flag, the live status map, and the two
//! capability tables (`function` for writable data points,
//! `status_range` for readable ones). The cloud layer owns these
//! objects and mutates them on push updates; adapters only read.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::dp::{DpCode, DpType, EnumTypeData, IntegerTypeData};
use crate::error::TuyaError;

/// Capability descriptor for one data point.
#[derive(Debug, Clone)]
pub struct DpDescriptor {
    /// Declared type of the data point.
    pub dp_type: DpType,
    /// Raw JSON describing accepted values, empty for booleans.
    pub values: String,
}

/// One command in a cloud batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DpCommand {
    /// Data point code. A plain string so raw commands can target codes
    /// outside [`DpCode`].
    pub code: String,
    /// Value to write.
    pub value: Value,
}

impl DpCommand {
    pub fn new(code: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

/// Cloud view of one device.
pub struct TuyaDevice {
    /// Cloud device id.
    pub id: String,
    /// User-assigned device name.
    pub name: String,
    /// Cloud category, `"tracker"` for the devices this crate adapts.
    pub category: String,
    /// Product model id.
    pub product_id: String,
    online: AtomicBool,
    status: RwLock<HashMap<String, Value>>,
    function: HashMap<String, DpDescriptor>,
    status_range: HashMap<String, DpDescriptor>,
}

impl TuyaDevice {
    /// Device with empty capability tables and no status.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            product_id: product_id.into(),
            online: AtomicBool::new(true),
            status: RwLock::new(HashMap::new()),
            function: HashMap::new(),
            status_range: HashMap::new(),
        }
    }

    /// Declare a writable data point.
    pub fn with_function(mut self, code: DpCode, dp_type: DpType, values: &str) -> Self {
        self.function.insert(
            code.as_str().to_string(),
            DpDescriptor {
                dp_type,
                values: values.to_string(),
            },
        );
        self
    }

    /// Declare a readable data point.
    pub fn with_status_range(mut self, code: DpCode, dp_type: DpType, values: &str) -> Self {
        self.status_range.insert(
            code.as_str().to_string(),
            DpDescriptor {
                dp_type,
                values: values.to_string(),
            },
        );
        self
    }

    /// Seed a status value.
    pub fn with_status(self, code: DpCode, value: impl Into<Value>) -> Self {
        self.status.write().insert(code.as_str().to_string(), value.into());
        self
    }

    /// Whether the cloud reports the device online.
    pub fn online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Update the online flag. Called by the cloud layer on push.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Current status value for a data point code.
    pub fn status(&self, code: &str) -> Option<Value> {
        self.status.read().get(code).cloned()
    }

    /// Update a status value. Called by the cloud layer on push.
    pub fn set_status(&self, code: &str, value: impl Into<Value>) {
        self.status.write().insert(code.to_string(), value.into());
    }

    fn sources(&self, prefer_function: bool) -> [&HashMap<String, DpDescriptor>; 2] {
        if prefer_function {
            [&self.function, &self.status_range]
        } else {
            [&self.status_range, &self.function]
        }
    }

    /// Whether either capability table declares the code.
    pub fn find_dpcode(&self, code: DpCode, prefer_function: bool) -> bool {
        self.sources(prefer_function)
            .iter()
            .any(|source| source.contains_key(code.as_str()))
    }

    /// Parsed enum descriptor for the code.
    ///
    /// Sources are searched in preference order; a descriptor of the
    /// wrong type or with malformed values falls through to the next
    /// source.
    pub fn find_enum(&self, code: DpCode, prefer_function: bool) -> Option<EnumTypeData> {
        for source in self.sources(prefer_function) {
            let Some(descriptor) = source.get(code.as_str()) else {
                continue;
            };
            if descriptor.dp_type != DpType::Enum {
                continue;
            }
            if let Some(parsed) = EnumTypeData::from_json(&descriptor.values) {
                return Some(parsed);
            }
        }
        None
    }

    /// Parsed integer descriptor for the code. Same source order and
    /// fall-through as [`TuyaDevice::find_enum`].
    pub fn find_integer(&self, code: DpCode, prefer_function: bool) -> Option<IntegerTypeData> {
        for source in self.sources(prefer_function) {
            let Some(descriptor) = source.get(code.as_str()) else {
                continue;
            };
            if descriptor.dp_type != DpType::Integer {
                continue;
            }
            if let Some(parsed) = IntegerTypeData::from_json(&descriptor.values) {
                return Some(parsed);
            }
        }
        None
    }
}

/// The cloud connection owning the device objects.
#[async_trait]
pub trait DeviceManager: Send + Sync {
    /// Ids of every device the cloud account knows.
    fn device_ids(&self) -> Vec<String>;

    /// The device object for an id.
    fn device(&self, device_id: &str) -> Option<Arc<TuyaDevice>>;

    /// Send a command batch to a device.
    async fn send_commands(
        &self,
        device_id: &str,
        commands: Vec<DpCommand>,
    ) -> Result<(), TuyaError>;
}
