//! Tuya cloud tracker integration.
//!
//! Adapts pet and item tracker devices from a Tuya cloud account into
//! hub entities. Each entity probes its device's capability tables once
//! at construction and reads state straight from the cloud-pushed
//! status map afterwards; commands become data-point batches sent back
//! through the device manager.
//!
//! [`discovery`] keeps the entity set in sync with the account;
//! [`testing`] provides an in-memory cloud manager for tests and demos.

pub mod cloud;
pub mod discovery;
pub mod dp;
pub mod error;
pub mod testing;
pub mod tracker;

pub use cloud::{DeviceManager, DpCommand, DpDescriptor, TuyaDevice};
pub use discovery::{
    setup_entry, EntryUnload, DISCOVERY_SIGNAL, TRACKER_CATEGORY, UPDATE_SIGNAL,
};
pub use dp::{DpCode, DpType, EnumTypeData, IntegerTypeData};
pub use error::TuyaError;
pub use tracker::{tracker_uid, TrackerEntity, TrackerFeature, MODE_RETURN_HOME};
