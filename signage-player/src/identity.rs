use anyhow::Result;
use tracing::info;

use crate::store::PlayerStore;

/// Returns the persisted device id, generating and storing one on first use.
pub fn ensure_device_id(store: &PlayerStore) -> Result<String> {
    let state = store.load()?;
    if let Some(id) = state.device_hardware_id.filter(|id| !id.is_empty()) {
        return Ok(id);
    }

    let id = uuid::Uuid::new_v4().to_string();
    store.update(|s| s.device_hardware_id = Some(id.clone()))?;
    info!(device_id = %id, "generated new device identity");
    Ok(id)
}
