use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a screen record.
///
/// The admin surface hands out numeric ids while players persist them as
/// strings, so both `42` and `"42"` deserialize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScreenId(String);

impl ScreenId {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScreenId {
    fn from(value: &str) -> Self {
        ScreenId(value.to_string())
    }
}

impl From<String> for ScreenId {
    fn from(value: String) -> Self {
        ScreenId(value)
    }
}

impl From<i64> for ScreenId {
    fn from(value: i64) -> Self {
        ScreenId(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ScreenId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Uint(u64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => ScreenId(n.to_string()),
            Raw::Uint(n) => ScreenId(n.to_string()),
            Raw::Str(s) => ScreenId(s),
        })
    }
}
