//! Shared wire shapes used by both events and API responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sender information attached to message events.
///
/// Works for both private and group messages; the group-only fields are
/// absent on private messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sender {
    /// The sender's QQ number.
    #[serde(default)]
    pub user_id: i64,
    /// The sender's nickname.
    #[serde(default)]
    pub nickname: String,
    /// The sender's sex (male, female, unknown).
    #[serde(default)]
    pub sex: String,
    /// The sender's age.
    #[serde(default)]
    pub age: i64,
    /// Group card (group messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    /// Group member level (group messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Group role: owner, admin or member (group messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Special title (group messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Area (group messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

/// Anonymous sender info on group messages; absent for named senders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anonymous {
    /// Anonymous user id.
    pub id: i64,
    /// Anonymous display name.
    pub name: String,
    /// Flag to pass back when banning this anonymous user.
    pub flag: String,
}

/// File info carried by upload and offline-file notices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// File id (offline files have none).
    #[serde(default)]
    pub id: String,
    /// File name.
    pub name: String,
    /// File size in bytes.
    pub size: i64,
    /// Bus id, required when deleting the file.
    #[serde(default)]
    pub busid: i64,
    /// Download URL (offline files only).
    #[serde(default)]
    pub url: String,
}

/// A client device, as reported by client-status notices and
/// `get_online_clients`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client app id.
    pub app_id: i64,
    /// Device name.
    pub device_name: String,
    /// Device kind.
    pub device_kind: String,
}

/// Gateway runtime status, as carried by heartbeats and `get_status`.
///
/// Gateways disagree on the exact statistics they report, so everything past
/// the online flags is kept as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeStatus {
    /// Whether the account is online.
    #[serde(default)]
    pub online: Option<bool>,
    /// Whether the gateway considers itself healthy.
    #[serde(default)]
    pub good: Option<bool>,
    /// Implementation-specific statistics.
    #[serde(flatten)]
    pub extra: Value,
}
