use std::sync::Arc;

use crate::{config::AppConfig, pairing::PairingCoordinator, realtime::RealtimeHub};

#[derive(Clone)]
pub struct AppState {
    pub pairing: Arc<PairingCoordinator>,
    pub config: Arc<AppConfig>,
    pub realtime: Arc<RealtimeHub>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let pairing = PairingCoordinator::new(
            &config.token_secret,
            config.pairing_ttl,
            config.paired_retention,
        );
        AppState {
            pairing: Arc::new(pairing),
            config: Arc::new(config),
            realtime: Arc::new(RealtimeHub::new()),
        }
    }
}
