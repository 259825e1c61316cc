//! Ties bootstrap and the realtime channel together for `signage-player run`.

use std::sync::Arc;

use anyhow::{Result, bail};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bootstrap::{BootstrapState, PlayerBootstrap};
use crate::config::Config;
use crate::realtime::{RealtimeClient, ReconnectPolicy};
use crate::server::HttpPairingApi;
use crate::store::{PlayerCredentials, PlayerStore};

pub async fn run(config: &Config, store: PlayerStore, shutdown: CancellationToken) -> Result<()> {
    let api = HttpPairingApi::new(config)?;
    let bootstrap = PlayerBootstrap::new(api, store, config.poll_interval());

    let mut states = bootstrap.subscribe();
    let display = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            show_state(&state);
            if state.is_terminal() {
                break;
            }
        }
    });

    let state = bootstrap.run(shutdown.clone()).await;
    // closes the watch channel so the display task ends even when cancelled
    drop(bootstrap);
    let _ = display.await;

    match state {
        BootstrapState::Paired(credentials) => {
            run_realtime(config, credentials, shutdown).await;
            Ok(())
        }
        BootstrapState::Error(reason) => bail!("Pairing failed: {reason}"),
        _ => Ok(()),
    }
}

fn show_state(state: &BootstrapState) {
    match state {
        BootstrapState::Initializing => {}
        BootstrapState::Pairing { pairing_code, .. } => {
            println!("Pairing code: {pairing_code}");
            println!("Enter this code in the signage admin to link this screen.");
        }
        BootstrapState::Paired(credentials) => match &credentials.screen_name {
            Some(name) => println!("Paired as \"{name}\""),
            None => println!("Paired"),
        },
        BootstrapState::Error(reason) => eprintln!("Pairing failed: {reason}"),
    }
}

async fn run_realtime(
    config: &Config,
    credentials: PlayerCredentials,
    shutdown: CancellationToken,
) {
    let Some(screen_id) = credentials.screen_id else {
        warn!("stored credentials carry no screen id, realtime channel disabled");
        shutdown.cancelled().await;
        return;
    };

    let client = Arc::new(RealtimeClient::new(
        config.ws_url(),
        screen_id,
        Some(credentials.auth_token),
        ReconnectPolicy::default(),
    ));
    let mut events = client.subscribe();

    let runner = {
        let client = client.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { client.run(shutdown).await })
    };

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Ok(envelope) => {
                    info!(kind = %envelope.kind, payload = ?envelope.payload, "realtime event")
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "realtime events dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Err(e) = runner.await {
        warn!("realtime task ended abnormally: {e}");
    }
}
