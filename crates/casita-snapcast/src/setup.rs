//! One-shot Snapcast platform bootstrap.
//!
//! Service registration happens before the server connection attempt,
//! matching the contract that entity services exist even while the
//! server is still unreachable. Handlers resolve their target through
//! the platform data store, so they stay valid across reconnects.

use std::sync::Arc;

use casita_core::{ArgKind, EntityId, HubError, Platform, Result, ServiceSchema};

use crate::config::SnapcastConfig;
use crate::control::ServerConnector;
use crate::media_player::{ClientMediaPlayer, GroupMediaPlayer, SnapcastPlayer};

/// Data store key for the player registry.
pub const DATA_KEY: &str = "snapcast";

/// Record the player state for a later restore.
pub const SERVICE_SNAPSHOT: &str = "snapshot";
/// Apply the last recorded snapshot.
pub const SERVICE_RESTORE: &str = "restore";
/// Move a client into the master client's group.
pub const SERVICE_JOIN: &str = "join";
/// Move a client out of its group.
pub const SERVICE_UNJOIN: &str = "unjoin";
/// Set a client's playback latency.
pub const SERVICE_SET_LATENCY: &str = "set_latency";

/// Entity id of the master client for `join`.
pub const ATTR_MASTER: &str = "master";
/// Latency in milliseconds for `set_latency`.
pub const ATTR_LATENCY: &str = "latency";

/// All players built for one server, stored under [`DATA_KEY`].
pub struct SnapcastPlayers {
    players: Vec<SnapcastPlayer>,
}

impl SnapcastPlayers {
    fn new(players: Vec<SnapcastPlayer>) -> Self {
        Self { players }
    }

    /// Look up a player by unique id.
    pub fn find(&self, unique_id: &str) -> Option<SnapcastPlayer> {
        self.players
            .iter()
            .find(|player| player.unique_id() == unique_id)
            .cloned()
    }

    /// Iterate over all players.
    pub fn iter(&self) -> impl Iterator<Item = &SnapcastPlayer> {
        self.players.iter()
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no players were built.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

fn players(platform: &Platform) -> Result<Arc<SnapcastPlayers>> {
    platform
        .data()
        .get::<SnapcastPlayers>(DATA_KEY)
        .ok_or_else(|| HubError::Integration("snapcast platform is not set up".to_string()))
}

fn find_player(platform: &Platform, target: &EntityId) -> Result<SnapcastPlayer> {
    players(platform)?
        .find(target.as_str())
        .ok_or_else(|| HubError::EntityNotFound(target.to_string()))
}

fn find_client(platform: &Platform, target: &str) -> Result<Arc<ClientMediaPlayer>> {
    match find_player(platform, &EntityId::from(target))? {
        SnapcastPlayer::Client(client) => Ok(client),
        SnapcastPlayer::Group(_) => Err(HubError::WrongEntityKind {
            entity_id: target.to_string(),
            expected: "client",
        }),
    }
}

fn register_services(platform: &Arc<Platform>) {
    let resolver = platform.clone();
    platform.register_entity_service(SERVICE_SNAPSHOT, ServiceSchema::new(), move |call| {
        let resolver = resolver.clone();
        async move {
            find_player(&resolver, &call.target)?.snapshot();
            Ok(())
        }
    });

    let resolver = platform.clone();
    platform.register_entity_service(SERVICE_RESTORE, ServiceSchema::new(), move |call| {
        let resolver = resolver.clone();
        async move {
            find_player(&resolver, &call.target)?.restore().await?;
            Ok(())
        }
    });

    let resolver = platform.clone();
    platform.register_entity_service(
        SERVICE_JOIN,
        ServiceSchema::new().with_required(ATTR_MASTER, ArgKind::EntityId),
        move |call| {
            let resolver = resolver.clone();
            async move {
                let client = find_client(&resolver, call.target.as_str())?;
                let master = find_client(&resolver, call.str_arg(ATTR_MASTER)?)?;
                client.join(&master).await?;
                Ok(())
            }
        },
    );

    let resolver = platform.clone();
    platform.register_entity_service(SERVICE_UNJOIN, ServiceSchema::new(), move |call| {
        let resolver = resolver.clone();
        async move {
            let client = find_client(&resolver, call.target.as_str())?;
            client.unjoin().await?;
            Ok(())
        }
    });

    let resolver = platform.clone();
    platform.register_entity_service(
        SERVICE_SET_LATENCY,
        ServiceSchema::new().with_required(ATTR_LATENCY, ArgKind::PositiveInt),
        move |call| {
            let resolver = resolver.clone();
            async move {
                let client = find_client(&resolver, call.target.as_str())?;
                let latency = call.u64_arg(ATTR_LATENCY)? as i64;
                client.set_latency(latency).await?;
                Ok(())
            }
        },
    );
}

/// Connect to one Snapcast server and register a player per group and
/// per client.
pub async fn setup_platform(
    platform: &Arc<Platform>,
    connector: Arc<dyn ServerConnector>,
    config: SnapcastConfig,
) -> Result<()> {
    register_services(platform);

    let server = match connector
        .connect(&config.host, config.port, config.reconnect)
        .await
    {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(
                host = %config.host,
                port = config.port,
                error = %err,
                "snapcast server connection failed"
            );
            return Err(HubError::SetupFailed(format!(
                "snapcast server {}: {err}",
                config.server_id()
            )));
        }
    };

    // The host:port part keeps ids apart when several servers are set up
    let server_id = config.server_id();
    let refresh = platform.refresh_handle();
    let policy = config.refresh_policy;

    let mut players = Vec::new();
    for group in server.groups() {
        players.push(SnapcastPlayer::Group(Arc::new(GroupMediaPlayer::new(
            group,
            &server_id,
            refresh.clone(),
            policy,
        ))));
    }
    for client in server.clients() {
        players.push(SnapcastPlayer::Client(Arc::new(ClientMediaPlayer::new(
            client,
            &server_id,
            refresh.clone(),
            policy,
        ))));
    }

    let players = Arc::new(SnapcastPlayers::new(players));
    platform.data().insert(DATA_KEY, players.clone());

    let entities = players.iter().map(SnapcastPlayer::entity).collect();
    platform.add_entities(entities).await;

    tracing::info!(
        server = %server_id,
        players = players.len(),
        streams = server.streams_by_name().len(),
        "snapcast platform ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, FakeServer};

    fn fixture() -> FakeServer {
        FakeServer::new()
            .with_stream("spotify", "Spotify")
            .with_group("g1", "Living Room", "spotify")
            .with_client("g1", "aa:bb", "Kitchen")
    }

    #[tokio::test]
    async fn test_setup_builds_group_and_client_players() {
        let platform = Arc::new(Platform::new("media_player"));
        let server = fixture();
        let connector = Arc::new(FakeConnector::ok(&server));

        setup_platform(&platform, connector.clone(), SnapcastConfig::new("host"))
            .await
            .unwrap();

        assert_eq!(platform.entity_count(), 2);
        assert!(platform.entity("snapcast_group_host:1705_g1").is_some());
        assert!(platform.entity("snapcast_client_host:1705_aa:bb").is_some());
        assert_eq!(connector.connections(), [("host".to_string(), 1705, true)]);

        let players = platform
            .data()
            .get::<SnapcastPlayers>(DATA_KEY)
            .unwrap();
        assert_eq!(players.len(), 2);
    }

    #[tokio::test]
    async fn test_services_exist_even_when_server_unreachable() {
        let platform = Arc::new(Platform::new("media_player"));
        let connector = Arc::new(FakeConnector::unreachable());

        let err = setup_platform(&platform, connector, SnapcastConfig::new("down"))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::SetupFailed(_)));

        for service in [
            SERVICE_SNAPSHOT,
            SERVICE_RESTORE,
            SERVICE_JOIN,
            SERVICE_UNJOIN,
            SERVICE_SET_LATENCY,
        ] {
            assert!(platform.has_service(service), "missing service {service}");
        }
        assert_eq!(platform.entity_count(), 0);
    }

    #[tokio::test]
    async fn test_handlers_report_missing_setup() {
        let platform = Arc::new(Platform::new("media_player"));
        register_services(&platform);

        let err = platform
            .call_service(casita_core::ServiceCall::new(SERVICE_SNAPSHOT, "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Integration(_)));
    }
}
