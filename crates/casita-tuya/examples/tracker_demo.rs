//! Tuya Tracker Example
//!
//! Demonstrates the tracker bridge against the in-memory cloud manager:
//! 1. Eager adaptation of trackers the account already knows
//! 2. Discovery signals growing the entity set at runtime
//! 3. Cloud status pushes read straight through the entities
//! 4. Commands turned into data-point batches

use std::sync::Arc;

use casita_core::{Platform, RefreshPolicy, SignalPayload, SIGNAL_ENTITY_ADDED};
use casita_tuya::testing::{demo_tracker, FakeDeviceManager};
use casita_tuya::{
    setup_entry, DeviceManager, TrackerEntity, DISCOVERY_SIGNAL, UPDATE_SIGNAL,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Casita Tuya Tracker Demo ===\n");

    let manager = Arc::new(FakeDeviceManager::new());
    manager.insert(demo_tracker("collar-1", "Dog Collar"));

    let platform = Arc::new(Platform::new("tracker"));
    let mut refreshes = platform.subscribe_refresh();

    // === Example 1: Eager pass ===
    println!("--- Example 1: Adapt known trackers ---");
    let _unload = setup_entry(
        &platform,
        manager.clone() as Arc<dyn DeviceManager>,
        RefreshPolicy::PushOnly,
    )
    .await;
    print_entities(&platform);

    // === Example 2: Runtime discovery ===
    println!("--- Example 2: Discover a second tracker ---");
    let mut added = platform.dispatcher().subscribe(SIGNAL_ENTITY_ADDED);
    manager.insert(demo_tracker("collar-2", "Cat Collar"));
    platform
        .dispatcher()
        .send(
            DISCOVERY_SIGNAL,
            SignalPayload::Ids(vec!["collar-2".to_string()]),
        )
        .await;
    let _ = added.recv().await;
    print_entities(&platform);

    // === Example 3: Cloud status push ===
    println!("--- Example 3: Cloud pushes a status change ---");
    let device = manager.device("collar-1").unwrap();
    device.set_status("status", "tracking");
    device.set_status("electricity_left", 62);
    platform
        .dispatcher()
        .send(
            UPDATE_SIGNAL,
            SignalPayload::Ids(vec!["collar-1".to_string()]),
        )
        .await;
    if let Some(id) = refreshes.recv().await {
        let entity = platform.entity(id.as_str()).unwrap();
        println!(
            "refreshed {id}: state={:?} attrs={}",
            entity.state(),
            serde_json::Value::Object(entity.attributes())
        );
    }
    println!();

    // === Example 4: Commands ===
    println!("--- Example 4: Send commands ---");
    let tracker = TrackerEntity::new(
        manager.device("collar-1").unwrap(),
        manager.clone() as Arc<dyn DeviceManager>,
        platform.refresh_handle(),
        RefreshPolicy::PushOnly,
    );
    tracker.locate().await?;
    tracker.set_tracking_mode("precise").await?;
    tracker.return_to_base().await?;
    for (device_id, commands) in manager.sent_commands() {
        println!("sent to {device_id}: {commands:?}");
    }

    println!("\nDone.");
    Ok(())
}

fn print_entities(platform: &Platform) {
    let mut ids = platform.entity_ids();
    ids.sort();
    for id in &ids {
        let entity = platform.entity(id).unwrap();
        println!(
            "entity {id}: state={:?} attrs={}",
            entity.state(),
            serde_json::Value::Object(entity.attributes())
        );
    }
    println!();
}
