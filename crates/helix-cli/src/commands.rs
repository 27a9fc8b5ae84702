use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use helix_client::InMemoryClient;
use helix_config::load_participant_config;
use helix_participant::Participant;
use helix_spectator::SpectatorConnection;
use tracing::info;

use crate::dummy_statemodel::DummyStateModelFactory;

/// Joins the cluster, registers the demo master/slave state model, and
/// blocks until interrupted. Coordination addresses from the config are
/// logged but not dialed: no real coordination-service client ships here
/// (see helix-client), so the demo runs against an in-process double seeded
/// fresh on every invocation.
pub async fn run_participant(config_path: &Path) -> Result<()> {
    let config = load_participant_config(config_path)
        .with_context(|| format!("loading participant config from {}", config_path.display()))?;

    info!(
        cluster_id = %config.cluster_id,
        participant_id = %config.participant_id,
        addresses = ?config.coordination_service_addresses,
        "starting demo participant (in-memory coordination double)"
    );

    let client = InMemoryClient::new(format!("{}-session", config.participant_id));
    let participant = Participant::new(
        config.cluster_id,
        config.host,
        config.port,
        Some(config.participant_id),
        client,
    );
    participant.register_state_model_factory("MasterSlave", Arc::new(DummyStateModelFactory::default()));

    Participant::connect(&participant).await.context("connecting participant")?;
    info!("participant connected, press ctrl-c to disconnect");

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    participant.disconnect().await;
    Ok(())
}

/// Watches one resource's external view and prints its partition → state
/// map every time it changes, until interrupted.
pub async fn run_spectate(config_path: &Path, resource: &str) -> Result<()> {
    let config = load_participant_config(config_path)
        .with_context(|| format!("loading participant config from {}", config_path.display()))?;

    let client = InMemoryClient::new("spectator-session");
    let connection = SpectatorConnection::new(config.cluster_id, client);
    SpectatorConnection::connect(&connection).await;

    let spectator = SpectatorConnection::spectate(&connection, resource)
        .await
        .context("connection reported not connected")?;

    info!(resource, "watching external view, press ctrl-c to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
                let online = spectator.get_participants("ONLINE", None).await;
                info!(resource, online = online.len(), "current ONLINE participants");
            }
        }
    }

    connection.disconnect();
    Ok(())
}
