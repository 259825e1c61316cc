use chrono::{DateTime, Utc};
use signage_shared::pairing::{PairedScreen, PairingStatus, PendingPairing};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingState {
    Pending,
    Paired {
        screen: PairedScreen,
        paired_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct PairingRequestDoc {
    pub device_id: String,
    /// Upper-case code shown on the display
    pub pairing_code: String,
    /// Time when the entry was created
    pub created_at: DateTime<Utc>,
    pub state: PairingState,
}

impl PairingRequestDoc {
    pub fn pending(device_id: &str, pairing_code: String, now: DateTime<Utc>) -> Self {
        PairingRequestDoc {
            device_id: device_id.to_string(),
            pairing_code,
            created_at: now,
            state: PairingState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, PairingState::Pending)
    }

    /// Pending requests stop accepting completion after `ttl`; paired ones are
    /// kept for `retention` so the device can still collect its token.
    pub fn is_expired(
        &self,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
        retention: chrono::Duration,
    ) -> bool {
        match &self.state {
            PairingState::Pending => now - self.created_at >= ttl,
            PairingState::Paired { paired_at, .. } => now - *paired_at >= retention,
        }
    }

    pub fn status(&self) -> PairingStatus {
        match &self.state {
            PairingState::Pending => PairingStatus::Pending,
            PairingState::Paired { screen, .. } => PairingStatus::Paired(screen.clone()),
        }
    }
}

impl From<&PairingRequestDoc> for PendingPairing {
    fn from(request: &PairingRequestDoc) -> Self {
        PendingPairing {
            device_id: request.device_id.clone(),
            pairing_code: request.pairing_code.clone(),
            created_at: request.created_at.to_rfc3339(),
        }
    }
}
