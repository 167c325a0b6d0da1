//! Snapcast Platform Example
//!
//! Demonstrates the media player adapters against the in-memory server:
//! 1. One-shot platform setup with services registered up front
//! 2. Group and client entities reading live server state
//! 3. Regrouping clients through the join / unjoin services
//! 4. Refresh requests flowing after writes

use std::sync::Arc;

use casita_core::{Platform, ServiceCall};
use casita_snapcast::control::GroupHandle;
use casita_snapcast::testing::{FakeConnector, FakeServer};
use casita_snapcast::{
    setup_platform, SnapcastConfig, ATTR_LATENCY, ATTR_MASTER, SERVICE_JOIN, SERVICE_SET_LATENCY,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Casita Snapcast Demo ===\n");

    let server = FakeServer::new()
        .with_stream("spotify", "Spotify")
        .with_stream("radio", "Radio")
        .with_group("g1", "Living Room", "spotify")
        .with_group("g2", "Bedroom", "radio")
        .with_client("g1", "c1", "Living Room Speaker")
        .with_client("g2", "c2", "Bedroom Speaker");

    let platform = Arc::new(Platform::new("media_player"));
    let mut refreshes = platform.subscribe_refresh();

    // === Example 1: Platform setup ===
    println!("--- Example 1: Platform setup ---");
    setup_platform(
        &platform,
        Arc::new(FakeConnector::ok(&server)),
        SnapcastConfig::new("demo-host"),
    )
    .await?;

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

    // === Example 2: Regrouping ===
    println!("--- Example 2: Join bedroom speaker to living room ---");
    platform
        .call_service(
            ServiceCall::new(SERVICE_JOIN, "snapcast_client_demo-host:1705_c2")
                .with_arg(ATTR_MASTER, "snapcast_client_demo-host:1705_c1"),
        )
        .await?;
    println!("group g1 now has clients: {:?}\n", server.group("g1").clients());

    // === Example 3: Latency write with refresh ===
    println!("--- Example 3: Set latency ---");
    platform
        .call_service(
            ServiceCall::new(SERVICE_SET_LATENCY, "snapcast_client_demo-host:1705_c1")
                .with_arg(ATTR_LATENCY, 30),
        )
        .await?;
    while let Some(id) = refreshes.try_recv() {
        println!("refresh requested for {id}");
    }

    println!("\nDone.");
    Ok(())
}
