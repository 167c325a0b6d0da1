//! Integration tests for the platform registry.
//!
//! Tests include:
//! - Entity registration with lifecycle hooks and signals
//! - Service registration, validation and dispatch
//! - Refresh requests flowing from handlers to subscribers
//! - Runtime data store usage from service handlers

use async_trait::async_trait;
use casita_core::{
    ArgKind, DataStore, Entity, EntityState, HubError, Platform, ServiceCall, ServiceSchema,
    SIGNAL_ENTITY_ADDED,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

struct FakePlayer {
    id: String,
    volume: AtomicI64,
}

impl FakePlayer {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            volume: AtomicI64::new(50),
        })
    }
}

#[async_trait]
impl Entity for FakePlayer {
    fn unique_id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> String {
        format!("player {}", self.id)
    }

    fn state(&self) -> Option<EntityState> {
        Some(EntityState::Playing)
    }

    fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut attrs = serde_json::Map::new();
        attrs.insert(
            "volume".to_string(),
            self.volume.load(Ordering::SeqCst).into(),
        );
        attrs
    }
}

#[tokio::test]
async fn test_entity_batch_signal_carries_all_ids() {
    let platform = Platform::new("media_player");
    let mut rx = platform.dispatcher().subscribe(SIGNAL_ENTITY_ADDED);

    platform
        .add_entities(vec![FakePlayer::new("a"), FakePlayer::new("b")])
        .await;

    let (payload, _) = timeout(Duration::from_millis(100), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let mut ids = payload.ids().unwrap().to_vec();
    ids.sort();
    assert_eq!(ids, ["a".to_string(), "b".to_string()]);
    assert_eq!(platform.entity_count(), 2);
}

#[tokio::test]
async fn test_service_handler_resolves_entity_through_store() {
    let platform = Arc::new(Platform::new("media_player"));
    let player = FakePlayer::new("a");
    platform.data().insert("players", Arc::new(player.clone()));
    platform.add_entities(vec![player.clone()]).await;

    let data = platform.clone();
    platform.register_entity_service(
        "set_volume",
        ServiceSchema::new().with_required("level", ArgKind::Fraction),
        move |call| {
            let data = data.clone();
            async move {
                let target: Arc<Arc<FakePlayer>> = data
                    .data()
                    .get("players")
                    .ok_or_else(|| HubError::Integration("players missing".to_string()))?;
                let level = call
                    .arg("level")
                    .and_then(serde_json::Value::as_f64)
                    .ok_or_else(|| HubError::MissingArgument("level".to_string()))?;
                target.volume.store((level * 100.0) as i64, Ordering::SeqCst);
                data.refresh_handle().request(call.target);
                Ok(())
            }
        },
    );

    let mut refreshes = platform.subscribe_refresh();
    platform
        .call_service(ServiceCall::new("set_volume", "a").with_arg("level", 0.25))
        .await
        .unwrap();

    assert_eq!(player.volume.load(Ordering::SeqCst), 25);
    let refreshed = timeout(Duration::from_millis(100), refreshes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.as_str(), "a");
}

#[tokio::test]
async fn test_service_rejects_out_of_range_fraction() {
    let platform = Platform::new("media_player");
    platform.register_entity_service(
        "set_volume",
        ServiceSchema::new().with_required("level", ArgKind::Fraction),
        |_call| async { Ok(()) },
    );

    let err = platform
        .call_service(ServiceCall::new("set_volume", "a").with_arg("level", 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_store_is_scoped_per_key() {
    let store = DataStore::new();
    store.insert("snapcast", Arc::new(vec!["g1".to_string()]));
    store.insert("tuya", Arc::new(42u64));

    assert_eq!(store.len(), 2);
    assert_eq!(
        *store.get::<Vec<String>>("snapcast").unwrap(),
        vec!["g1".to_string()]
    );
    assert_eq!(*store.get::<u64>("tuya").unwrap(), 42);
    assert!(store.get::<u64>("snapcast").is_none());
}

#[tokio::test]
async fn test_attributes_follow_live_state() {
    let platform = Platform::new("media_player");
    let player = FakePlayer::new("a");
    platform.add_entities(vec![player.clone()]).await;

    let entity = platform.entity("a").unwrap();
    assert_eq!(entity.attributes()["volume"], 50);

    player.volume.store(80, Ordering::SeqCst);
    assert_eq!(entity.attributes()["volume"], 80);
}
