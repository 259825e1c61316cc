use serde::{Deserialize, Serialize};

use crate::screen::ScreenId;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePairingBody {
    pub device_hardware_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePairingResponse {
    pub pairing_code: String,
    /// Seconds until the code stops being accepted
    #[serde(default)]
    pub expires_in: u64,
}

/// Credentials handed to a device once an administrator linked it to a screen.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PairedScreen {
    pub auth_token: String,
    pub screen_id: ScreenId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of `GET /api/screens/pairing-status/{deviceId}`.
///
/// Serialized as `{"status":"pending"}` or
/// `{"status":"paired","authToken":..,"screenId":..}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PairingStatus {
    Pending,
    Paired(PairedScreen),
}

impl PairingStatus {
    pub fn is_paired(&self) -> bool {
        matches!(self, PairingStatus::Paired(_))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompletePairingBody {
    pub pairing_code: String,
    pub screen_id: ScreenId,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPairing {
    pub device_id: String,
    pub screen_id: ScreenId,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PendingPairing {
    pub device_id: String,
    pub pairing_code: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pending_status_wire_shape() {
        let value = serde_json::to_value(PairingStatus::Pending).unwrap();
        assert_eq!(value, json!({ "status": "pending" }));
    }

    #[test]
    fn test_paired_status_wire_shape() {
        let status = PairingStatus::Paired(PairedScreen {
            auth_token: "tok".to_string(),
            screen_id: ScreenId::from(7),
            playlist_id: Some("pl-1".to_string()),
            name: None,
        });
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "paired",
                "authToken": "tok",
                "screenId": "7",
                "playlistId": "pl-1"
            })
        );
    }

    #[test]
    fn test_paired_status_accepts_numeric_screen_id() {
        let status: PairingStatus = serde_json::from_value(json!({
            "status": "paired",
            "authToken": "tok",
            "screenId": 7,
            "name": "Lobby"
        }))
        .unwrap();
        match status {
            PairingStatus::Paired(screen) => {
                assert_eq!(screen.screen_id, ScreenId::from("7"));
                assert_eq!(screen.name.as_deref(), Some("Lobby"));
                assert!(screen.playlist_id.is_none());
            }
            PairingStatus::Pending => panic!("expected paired"),
        }
    }

    #[test]
    fn test_initiate_body_uses_hardware_id_key() {
        let body: InitiatePairingBody =
            serde_json::from_value(json!({ "deviceHardwareId": "abc" })).unwrap();
        assert_eq!(body.device_hardware_id, "abc");
    }
}
