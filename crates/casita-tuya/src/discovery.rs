//! Discovery bridge: turns cloud device announcements into registered
//! tracker entities.
//!
//! One eager pass adapts every tracker the manager already knows, then
//! two background tasks keep the platform in sync: new-device signals
//! grow the entity set, update signals trigger a refresh of already
//! adapted devices. Devices of other categories are left for other
//! bridges.

use std::sync::Arc;

use casita_core::{Platform, RefreshPolicy, SharedEntity};
use tokio::task::JoinHandle;

use crate::cloud::DeviceManager;
use crate::tracker::{tracker_uid, TrackerEntity};

/// Signal announcing newly discovered device ids.
pub const DISCOVERY_SIGNAL: &str = "tuya_discovery_new";

/// Signal announcing status pushes for known device ids.
pub const UPDATE_SIGNAL: &str = "tuya_entry_update";

/// Cloud category handled by this bridge.
pub const TRACKER_CATEGORY: &str = "tracker";

/// Handle on the background tasks of one set-up entry.
///
/// Dropping it stops the bridge.
pub struct EntryUnload {
    tasks: Vec<JoinHandle<()>>,
}

impl EntryUnload {
    /// Stop listening for discovery and update signals.
    pub fn unload(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for EntryUnload {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Wire the tracker bridge into a platform.
///
/// Subscriptions are taken before the eager pass, so a device announced
/// while the pass runs is buffered rather than lost.
pub async fn setup_entry(
    platform: &Arc<Platform>,
    manager: Arc<dyn DeviceManager>,
    policy: RefreshPolicy,
) -> EntryUnload {
    let dispatcher = platform.dispatcher();
    let mut discovered = dispatcher.subscribe(DISCOVERY_SIGNAL);
    let mut updated = dispatcher.subscribe(UPDATE_SIGNAL);

    add_new_trackers(platform, &manager, policy, &manager.device_ids()).await;

    let discovery_platform = platform.clone();
    let discovery_manager = manager.clone();
    let discovery = tokio::spawn(async move {
        while let Some((payload, _)) = discovered.recv().await {
            let Some(ids) = payload.ids() else { continue };
            add_new_trackers(&discovery_platform, &discovery_manager, policy, ids).await;
        }
    });

    let update_platform = platform.clone();
    let updates = tokio::spawn(async move {
        let refresh = update_platform.refresh_handle();
        while let Some((payload, _)) = updated.recv().await {
            let Some(ids) = payload.ids() else { continue };
            for id in ids {
                let uid = tracker_uid(id);
                // Updates for devices other bridges own are not ours
                if update_platform.entity(&uid).is_some() {
                    refresh.request(uid.as_str());
                }
            }
        }
    });

    EntryUnload {
        tasks: vec![discovery, updates],
    }
}

/// Adapt and register every id that is a tracker and not yet present.
async fn add_new_trackers(
    platform: &Arc<Platform>,
    manager: &Arc<dyn DeviceManager>,
    policy: RefreshPolicy,
    ids: &[String],
) {
    let mut entities: Vec<SharedEntity> = Vec::new();
    for id in ids {
        let Some(device) = manager.device(id) else {
            tracing::warn!(device = %id, "announced device unknown to the cloud manager");
            continue;
        };
        if device.category != TRACKER_CATEGORY {
            continue;
        }
        if platform.entity(&tracker_uid(id)).is_some() {
            continue;
        }
        entities.push(Arc::new(TrackerEntity::new(
            device,
            manager.clone(),
            platform.refresh_handle(),
            policy,
        )) as SharedEntity);
    }
    platform.add_entities(entities).await;
}
