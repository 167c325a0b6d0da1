//! End-to-end tests for the Snapcast platform.
//!
//! Tests include:
//! - Regrouping through the join and unjoin services
//! - Kind checks on client-only services
//! - Latency, snapshot and restore service flows
//! - Refresh requests following service writes

use std::sync::Arc;
use std::time::Duration;

use casita_core::{EntityState, HubError, Platform, ServiceCall};
use casita_snapcast::control::{ClientHandle, GroupHandle};
use casita_snapcast::testing::{FakeConnector, FakeServer};
use casita_snapcast::{
    setup_platform, SnapcastConfig, SnapcastPlayers, ATTR_LATENCY, ATTR_MASTER, DATA_KEY,
    SERVICE_JOIN, SERVICE_RESTORE, SERVICE_SET_LATENCY, SERVICE_SNAPSHOT, SERVICE_UNJOIN,
};
use tokio::time::timeout;

const GROUP_UID: &str = "snapcast_group_host:1705_g1";
const CLIENT_ONE: &str = "snapcast_client_host:1705_c1";
const CLIENT_TWO: &str = "snapcast_client_host:1705_c2";

fn fixture() -> FakeServer {
    FakeServer::new()
        .with_stream("spotify", "Spotify")
        .with_stream("radio", "Radio")
        .with_group("g1", "Living Room", "spotify")
        .with_group("g2", "Bedroom", "radio")
        .with_client("g1", "c1", "Living Room Speaker")
        .with_client("g2", "c2", "Bedroom Speaker")
}

async fn setup(server: &FakeServer) -> Arc<Platform> {
    let platform = Arc::new(Platform::new("media_player"));
    setup_platform(
        &platform,
        Arc::new(FakeConnector::ok(server)),
        SnapcastConfig::new("host"),
    )
    .await
    .unwrap();
    platform
}

#[tokio::test]
async fn test_join_moves_client_into_master_group() {
    let server = fixture();
    let platform = setup(&server).await;

    platform
        .call_service(ServiceCall::new(SERVICE_JOIN, CLIENT_TWO).with_arg(ATTR_MASTER, CLIENT_ONE))
        .await
        .unwrap();

    let mut members = server.group("g1").clients();
    members.sort();
    assert_eq!(members, ["c1".to_string(), "c2".to_string()]);
    assert!(server.group("g2").clients().is_empty());
    assert_eq!(server.client("c2").group().identifier(), "g1");
}

#[tokio::test]
async fn test_join_rejects_group_target() {
    let server = fixture();
    let platform = setup(&server).await;

    let err = platform
        .call_service(ServiceCall::new(SERVICE_JOIN, GROUP_UID).with_arg(ATTR_MASTER, CLIENT_ONE))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HubError::WrongEntityKind { expected: "client", .. }
    ));
}

#[tokio::test]
async fn test_join_rejects_group_master() {
    let server = fixture();
    let platform = setup(&server).await;

    let err = platform
        .call_service(ServiceCall::new(SERVICE_JOIN, CLIENT_TWO).with_arg(ATTR_MASTER, GROUP_UID))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HubError::WrongEntityKind { expected: "client", .. }
    ));
}

#[tokio::test]
async fn test_join_unknown_master() {
    let server = fixture();
    let platform = setup(&server).await;

    let err = platform
        .call_service(
            ServiceCall::new(SERVICE_JOIN, CLIENT_TWO)
                .with_arg(ATTR_MASTER, "snapcast_client_host:1705_ghost"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::EntityNotFound(_)));
}

#[tokio::test]
async fn test_join_requires_master_argument() {
    let server = fixture();
    let platform = setup(&server).await;

    let err = platform
        .call_service(ServiceCall::new(SERVICE_JOIN, CLIENT_TWO))
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::MissingArgument(name) if name == "master"));
    assert_eq!(server.group("g1").clients(), ["c1".to_string()]);
}

#[tokio::test]
async fn test_unjoin_detaches_client() {
    let server = fixture();
    let platform = setup(&server).await;

    // Put both clients into g1 first
    platform
        .call_service(ServiceCall::new(SERVICE_JOIN, CLIENT_TWO).with_arg(ATTR_MASTER, CLIENT_ONE))
        .await
        .unwrap();

    platform
        .call_service(ServiceCall::new(SERVICE_UNJOIN, CLIENT_TWO))
        .await
        .unwrap();

    assert_eq!(server.group("g1").clients(), ["c1".to_string()]);
    assert_ne!(server.client("c2").group().identifier(), "g1");
}

#[tokio::test]
async fn test_set_latency_flow() {
    let server = fixture();
    let platform = setup(&server).await;

    let err = platform
        .call_service(ServiceCall::new(SERVICE_SET_LATENCY, CLIENT_ONE).with_arg(ATTR_LATENCY, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::InvalidArgument(_)));
    assert_eq!(server.client("c1").latency(), None);

    platform
        .call_service(ServiceCall::new(SERVICE_SET_LATENCY, CLIENT_ONE).with_arg(ATTR_LATENCY, 30))
        .await
        .unwrap();
    assert_eq!(server.client("c1").latency(), Some(30));

    let entity = platform.entity(CLIENT_ONE).unwrap();
    assert_eq!(entity.attributes()["latency"], 30);
}

#[tokio::test]
async fn test_set_latency_rejects_group() {
    let server = fixture();
    let platform = setup(&server).await;

    let err = platform
        .call_service(ServiceCall::new(SERVICE_SET_LATENCY, GROUP_UID).with_arg(ATTR_LATENCY, 30))
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::WrongEntityKind { .. }));
}

#[tokio::test]
async fn test_snapshot_restore_round_trip() {
    let server = fixture();
    let platform = setup(&server).await;

    server.client("c1").set_volume(40).await.unwrap();
    platform
        .call_service(ServiceCall::new(SERVICE_SNAPSHOT, CLIENT_ONE))
        .await
        .unwrap();

    server.client("c1").set_volume(90).await.unwrap();
    server.client("c1").set_muted(true).await.unwrap();

    platform
        .call_service(ServiceCall::new(SERVICE_RESTORE, CLIENT_ONE))
        .await
        .unwrap();

    assert_eq!(server.client("c1").volume(), 40);
    assert!(!server.client("c1").muted());
}

#[tokio::test]
async fn test_service_write_requests_refresh() {
    let server = fixture();
    let platform = setup(&server).await;
    let mut requests = platform.subscribe_refresh();

    platform
        .call_service(ServiceCall::new(SERVICE_SET_LATENCY, CLIENT_ONE).with_arg(ATTR_LATENCY, 25))
        .await
        .unwrap();

    let id = timeout(Duration::from_millis(100), requests.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(id.as_str(), CLIENT_ONE);
}

#[tokio::test]
async fn test_entities_read_live_state() {
    let server = fixture();
    let platform = setup(&server).await;

    let group = platform.entity(GROUP_UID).unwrap();
    assert_eq!(group.state(), Some(EntityState::Idle));

    server.group("g1").set_stream_status("playing");
    assert_eq!(group.state(), Some(EntityState::Playing));

    let client = platform.entity(CLIENT_ONE).unwrap();
    assert_eq!(client.state(), Some(EntityState::On));
    server.client("c1").set_connected(false);
    assert_eq!(client.state(), Some(EntityState::Off));
}

#[tokio::test]
async fn test_added_entities_have_callbacks_installed() {
    let server = fixture();
    let platform = setup(&server).await;

    assert!(server.group("g1").has_callback());
    assert!(server.client("c1").has_callback());

    platform.remove_entity(CLIENT_ONE).await.unwrap();
    assert!(!server.client("c1").has_callback());
    assert!(server.group("g1").has_callback());
}

#[tokio::test]
async fn test_player_registry_find() {
    let server = fixture();
    let platform = setup(&server).await;

    let players = platform.data().get::<SnapcastPlayers>(DATA_KEY).unwrap();
    assert_eq!(players.len(), 4);
    assert!(players.find(GROUP_UID).is_some());
    assert!(players.find(CLIENT_TWO).is_some());
    assert!(players.find("bogus").is_none());
    assert!(players.find(GROUP_UID).unwrap().as_client().is_none());
    assert!(players.find(CLIENT_ONE).unwrap().as_client().is_some());
}
