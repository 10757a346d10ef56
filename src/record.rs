/// Data structures shared by the page monitor, the background bridge and the popup
use serde::{Deserialize, Serialize};

/// A partial view of the durable record in `chrome.storage.sync`.
///
/// Reads return whichever keys exist; writes only touch the keys that are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shorts_watched: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reset: Option<String>,
}

impl StoredRecord {
    pub const KEYS: [&'static str; 3] = ["shortsWatched", "limit", "lastReset"];

    pub fn watched(count: u32) -> StoredRecord {
        StoredRecord {
            shorts_watched: Some(count),
            ..StoredRecord::default()
        }
    }

    pub fn with_limit(limit: u32) -> StoredRecord {
        StoredRecord {
            limit: Some(limit),
            ..StoredRecord::default()
        }
    }

    pub fn reset_at(stamp: String) -> StoredRecord {
        StoredRecord {
            shorts_watched: Some(0),
            last_reset: Some(stamp),
            ..StoredRecord::default()
        }
    }

    pub fn watched_or_default(&self) -> u32 {
        self.shorts_watched.unwrap_or(0)
    }

    /// Copy every key set in `patch` over this record.
    pub fn merge(&mut self, patch: StoredRecord) {
        if patch.shorts_watched.is_some() {
            self.shorts_watched = patch.shorts_watched;
        }
        if patch.limit.is_some() {
            self.limit = patch.limit;
        }
        if patch.last_reset.is_some() {
            self.last_reset = patch.last_reset;
        }
    }
}

/// Messages exchanged over `chrome.runtime` / `chrome.tabs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    UpdateShortsWatched { count: u32 },
    GetLimit,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Ack { success: bool },
    Limit { limit: u32 },
}

impl Response {
    pub fn ack() -> Response {
        Response::Ack { success: true }
    }
}
