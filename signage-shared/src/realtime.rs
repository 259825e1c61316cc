use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::screen::ScreenId;

pub const IDENTIFY_SCREEN: &str = "identify_screen";
pub const ERROR: &str = "error";

/// A realtime frame: `{type, payload?, id?}`.
///
/// `identify_screen` historically carries `screenId` (and optionally
/// `authToken`) next to `type` rather than inside `payload`; both layouts are
/// accepted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_id: Option<ScreenId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// Claim sent by a player right after its socket opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyScreen {
    pub screen_id: ScreenId,
    pub auth_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyPayload {
    screen_id: ScreenId,
    #[serde(default)]
    auth_token: Option<String>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Option<Value>) -> Self {
        Envelope {
            kind: kind.into(),
            payload,
            id: None,
            screen_id: None,
            auth_token: None,
        }
    }

    pub fn identify(screen_id: ScreenId, auth_token: Option<String>) -> Self {
        Envelope {
            kind: IDENTIFY_SCREEN.to_string(),
            payload: None,
            id: None,
            screen_id: Some(screen_id),
            auth_token,
        }
    }

    pub fn error(message: &str) -> Self {
        Envelope::new(ERROR, Some(serde_json::json!({ "message": message })))
    }

    /// Returns the identify claim if this is a well-formed `identify_screen`.
    pub fn as_identify(&self) -> Option<IdentifyScreen> {
        if self.kind != IDENTIFY_SCREEN {
            return None;
        }
        if let Some(screen_id) = &self.screen_id {
            return Some(IdentifyScreen {
                screen_id: screen_id.clone(),
                auth_token: self.auth_token.clone(),
            });
        }
        let payload: IdentifyPayload = serde_json::from_value(self.payload.clone()?).ok()?;
        Some(IdentifyScreen {
            screen_id: payload.screen_id,
            auth_token: payload.auth_token.or_else(|| self.auth_token.clone()),
        })
    }
}
