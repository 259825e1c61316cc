//! Turns anonymous devices into authenticated screens.
//!
//! A device asks for a pairing code, an administrator links that code to a
//! screen record, and the device collects the minted auth token by polling.
//! Requests move `pending -> paired` and never back.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use signage_shared::{
    pairing::{
        CompletedPairing, InitiatePairingResponse, PairedScreen, PairingStatus, PendingPairing,
    },
    screen::ScreenId,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::auth::screen_token::issue_screen_token;
use crate::models::pairing_request::{PairingRequestDoc, PairingState};

/// No 0/O or 1/I, codes get typed in from across the room.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("pairing code not found: {0}")]
    NotFound(String),

    #[error("pairing code already used: {0}")]
    Conflict(String),

    #[error("could not allocate a free pairing code")]
    CodeSpaceExhausted,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type PairingResult<T> = Result<T, PairingError>;

#[derive(Default)]
struct PairingTable {
    by_device: HashMap<String, PairingRequestDoc>,
    /// pairing code -> device id, for every request still in `by_device`
    by_code: HashMap<String, String>,
}

impl PairingTable {
    fn insert(&mut self, request: PairingRequestDoc) {
        if let Some(old) = self.by_device.remove(&request.device_id) {
            self.by_code.remove(&old.pairing_code);
        }
        self.by_code
            .insert(request.pairing_code.clone(), request.device_id.clone());
        self.by_device.insert(request.device_id.clone(), request);
    }

    fn remove(&mut self, device_id: &str) {
        if let Some(old) = self.by_device.remove(device_id) {
            self.by_code.remove(&old.pairing_code);
        }
    }

    fn generate_code(&self) -> PairingResult<String> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code: String = (0..CODE_LENGTH)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !self.by_code.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(PairingError::CodeSpaceExhausted)
    }
}

pub struct PairingCoordinator {
    table: RwLock<PairingTable>,
    token_secret: String,
    pairing_ttl: chrono::Duration,
    paired_retention: chrono::Duration,
}

impl PairingCoordinator {
    pub fn new(token_secret: &str, pairing_ttl: Duration, paired_retention: Duration) -> Self {
        PairingCoordinator {
            table: RwLock::new(PairingTable::default()),
            token_secret: token_secret.to_string(),
            pairing_ttl: to_chrono(pairing_ttl),
            paired_retention: to_chrono(paired_retention),
        }
    }

    pub async fn initiate_pairing(&self, device_id: &str) -> PairingResult<InitiatePairingResponse> {
        self.initiate_pairing_at(device_id, Utc::now()).await
    }

    /// Hands out the device's pending code, minting one if there is none.
    ///
    /// A live pending request is reused so a code already on screen stays
    /// valid. Expired or already paired requests are replaced.
    pub async fn initiate_pairing_at(
        &self,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> PairingResult<InitiatePairingResponse> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(PairingError::InvalidInput(
                "device hardware id must not be empty".to_string(),
            ));
        }

        let mut table = self.table.write().await;

        if let Some(existing) = table.by_device.get(device_id) {
            if existing.is_pending() && !self.is_expired(existing, now) {
                debug!(%device_id, "reusing pending pairing code");
                return Ok(InitiatePairingResponse {
                    pairing_code: existing.pairing_code.clone(),
                    expires_in: self.remaining_secs(existing, now),
                });
            }
        }

        let code = table.generate_code()?;
        let request = PairingRequestDoc::pending(device_id, code.clone(), now);
        let expires_in = self.remaining_secs(&request, now);
        table.insert(request);

        info!(%device_id, "issued pairing code");
        Ok(InitiatePairingResponse {
            pairing_code: code,
            expires_in,
        })
    }

    /// Unknown devices read as `pending` so a polling player never has to
    /// tell "not yet" from "never heard of you".
    pub async fn pairing_status(&self, device_id: &str) -> PairingStatus {
        let table = self.table.read().await;
        table
            .by_device
            .get(device_id.trim())
            .map(PairingRequestDoc::status)
            .unwrap_or(PairingStatus::Pending)
    }

    pub async fn complete_pairing(
        &self,
        pairing_code: &str,
        screen_id: ScreenId,
        playlist_id: Option<String>,
        name: Option<String>,
    ) -> PairingResult<CompletedPairing> {
        self.complete_pairing_at(pairing_code, screen_id, playlist_id, name, Utc::now())
            .await
    }

    pub async fn complete_pairing_at(
        &self,
        pairing_code: &str,
        screen_id: ScreenId,
        playlist_id: Option<String>,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> PairingResult<CompletedPairing> {
        if screen_id.is_empty() {
            return Err(PairingError::InvalidInput(
                "screen id must not be empty".to_string(),
            ));
        }
        let code = normalize_code(pairing_code);

        let mut table = self.table.write().await;

        let device_id = table
            .by_code
            .get(&code)
            .cloned()
            .ok_or_else(|| PairingError::NotFound(code.clone()))?;
        let Some(request) = table.by_device.get(&device_id) else {
            return Err(PairingError::NotFound(code));
        };

        if !request.is_pending() {
            return Err(PairingError::Conflict(code));
        }
        if self.is_expired(request, now) {
            return Err(PairingError::NotFound(code));
        }

        let auth_token = issue_screen_token(&screen_id, &self.token_secret)
            .map_err(|e| PairingError::Internal(e.to_string()))?;

        if let Some(request) = table.by_device.get_mut(&device_id) {
            request.state = PairingState::Paired {
                screen: PairedScreen {
                    auth_token,
                    screen_id: screen_id.clone(),
                    playlist_id,
                    name,
                },
                paired_at: now,
            };
        }

        info!(%device_id, %screen_id, "pairing completed");
        Ok(CompletedPairing {
            device_id,
            screen_id,
        })
    }

    pub async fn pending_requests(&self) -> Vec<PendingPairing> {
        self.pending_requests_at(Utc::now()).await
    }

    pub async fn pending_requests_at(&self, now: DateTime<Utc>) -> Vec<PendingPairing> {
        let table = self.table.read().await;
        let mut pending: Vec<&PairingRequestDoc> = table
            .by_device
            .values()
            .filter(|r| r.is_pending() && !self.is_expired(r, now))
            .collect();
        pending.sort_by_key(|r| r.created_at);
        pending.into_iter().map(PendingPairing::from).collect()
    }

    /// Drops expired pending requests and paired requests past retention.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut table = self.table.write().await;
        let expired: Vec<String> = table
            .by_device
            .values()
            .filter(|r| self.is_expired(r, now))
            .map(|r| r.device_id.clone())
            .collect();
        for device_id in &expired {
            table.remove(device_id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "purged expired pairing requests");
        }
        expired.len()
    }

    fn is_expired(&self, request: &PairingRequestDoc, now: DateTime<Utc>) -> bool {
        request.is_expired(now, self.pairing_ttl, self.paired_retention)
    }

    fn remaining_secs(&self, request: &PairingRequestDoc, now: DateTime<Utc>) -> u64 {
        // rounded up so a live code never reports zero seconds left
        let left = self.pairing_ttl - (now - request.created_at);
        (left.num_milliseconds().max(0) as u64).div_ceil(1000)
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}
