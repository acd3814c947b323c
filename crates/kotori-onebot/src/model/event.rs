//! Typed event structs, one per fully-resolved classifier path.
//!
//! Every event frame carries `post_type`; the secondary classifier field
//! depends on its value (`meta_event_type`, `message_type`, `request_type`
//! or `notice_type`), and `notice_type = "notify"` adds a tertiary
//! `sub_type`. The dispatcher resolves that chain first and then decodes the
//! frame into one of these leaf structs.
//!
//! ```text
//! post_type
//! ├── meta_event  → LifecycleEvent | HeartbeatEvent
//! ├── message     → PrivateMessageEvent | GroupMessageEvent
//! ├── request     → FriendRequestEvent | GroupRequestEvent
//! └── notice      → GroupUploadEvent | GroupAdminEvent | … | ClientStatusEvent
//!     └── notify  → PokeEvent | LuckyKingEvent | HonorEvent
//! ```

use serde::{Deserialize, Serialize};

use crate::model::types::{Anonymous, ClientInfo, FileInfo, RuntimeStatus, Sender};

// ============================================================================
// Meta events
// ============================================================================

/// Gateway lifecycle meta event (enable, disable, connect).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Unix timestamp when the event occurred.
    pub time: i64,
    /// Bot's QQ number.
    pub self_id: i64,
    /// Sub-type: "enable", "disable" or "connect".
    #[serde(default)]
    pub sub_type: String,
}

/// Gateway heartbeat meta event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    pub time: i64,
    pub self_id: i64,
    /// Runtime status snapshot.
    #[serde(default)]
    pub status: RuntimeStatus,
    /// Milliseconds until the next heartbeat.
    #[serde(default)]
    pub interval: i64,
}

// ============================================================================
// Message events
// ============================================================================

/// A private message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessageEvent {
    pub time: i64,
    pub self_id: i64,
    /// Sub-type: "friend", "group" (temp session) or "group_self".
    #[serde(default)]
    pub sub_type: String,
    /// Message id, needed for recall/reply.
    pub message_id: i64,
    /// Sender's QQ number.
    pub user_id: i64,
    /// Receiver's QQ number.
    #[serde(default)]
    pub target_id: i64,
    /// Temp session source, when `sub_type` is "group".
    #[serde(default)]
    pub temp_source: Option<i64>,
    /// Message content, CQ codes inline.
    #[serde(default)]
    pub message: String,
    /// Raw message content.
    #[serde(default)]
    pub raw_message: String,
    /// Font id, usually 0.
    #[serde(default)]
    pub font: i64,
    /// Sender info.
    #[serde(default)]
    pub sender: Sender,
}

/// A group message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessageEvent {
    pub time: i64,
    pub self_id: i64,
    /// Sub-type: "normal", "anonymous" or "notice".
    #[serde(default)]
    pub sub_type: String,
    pub message_id: i64,
    /// Group number.
    pub group_id: i64,
    /// Sender's QQ number.
    pub user_id: i64,
    /// Anonymous sender info, absent for named senders.
    #[serde(default)]
    pub anonymous: Option<Anonymous>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub raw_message: String,
    /// Message sequence number.
    #[serde(default)]
    pub message_seq: i64,
    #[serde(default)]
    pub font: i64,
    #[serde(default)]
    pub sender: Sender,
}

// ============================================================================
// Request events
// ============================================================================

/// A friend-add request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestEvent {
    pub time: i64,
    pub self_id: i64,
    /// Requester's QQ number.
    pub user_id: i64,
    /// Verification message.
    #[serde(default)]
    pub comment: String,
    /// Flag to pass back to `set_friend_add_request`.
    pub flag: String,
}

/// A group-join request or invite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRequestEvent {
    pub time: i64,
    pub self_id: i64,
    /// Sub-type: "add" (join request) or "invite".
    #[serde(default)]
    pub sub_type: String,
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub comment: String,
    /// Flag to pass back to `set_group_add_request`.
    pub flag: String,
}

// ============================================================================
// Notice events
// ============================================================================

/// A file was uploaded to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupUploadEvent {
    pub time: i64,
    pub self_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub file: FileInfo,
}

/// A group admin was set or unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupAdminEvent {
    pub time: i64,
    pub self_id: i64,
    /// Sub-type: "set" or "unset".
    #[serde(default)]
    pub sub_type: String,
    pub group_id: i64,
    pub user_id: i64,
}

/// A group member was banned or unbanned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupBanEvent {
    pub time: i64,
    pub self_id: i64,
    /// Sub-type: "ban" or "lift_ban".
    #[serde(default)]
    pub sub_type: String,
    pub group_id: i64,
    /// Operator's QQ number.
    pub operator_id: i64,
    /// Banned member's QQ number.
    pub user_id: i64,
    /// Ban duration in seconds.
    #[serde(default)]
    pub duration: i64,
}

/// A group member's card changed.
///
/// Not delivered promptly; the card is only checked when a message arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCardEvent {
    pub time: i64,
    pub self_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    /// New card.
    #[serde(default)]
    pub card_new: String,
    /// Previous card.
    #[serde(default)]
    pub card_old: String,
}

/// A member left or was removed from a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDecreaseEvent {
    pub time: i64,
    pub self_id: i64,
    /// Sub-type: "leave", "kick" or "kick_me".
    #[serde(default)]
    pub sub_type: String,
    pub group_id: i64,
    /// Operator (same as `user_id` for voluntary leaves).
    pub operator_id: i64,
    /// The member who left.
    pub user_id: i64,
}

/// A member joined a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupIncreaseEvent {
    pub time: i64,
    pub self_id: i64,
    /// Sub-type: "approve" or "invite".
    #[serde(default)]
    pub sub_type: String,
    pub group_id: i64,
    pub operator_id: i64,
    /// The member who joined.
    pub user_id: i64,
}

/// A group message was recalled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecallEvent {
    pub time: i64,
    pub self_id: i64,
    pub group_id: i64,
    /// Original sender.
    pub user_id: i64,
    /// Who recalled it.
    pub operator_id: i64,
    pub message_id: i64,
}

/// A friend was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendAddEvent {
    pub time: i64,
    pub self_id: i64,
    /// The new friend's QQ number.
    pub user_id: i64,
}

/// A friend recalled a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRecallEvent {
    pub time: i64,
    pub self_id: i64,
    pub user_id: i64,
    pub message_id: i64,
}

/// Someone poked someone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PokeEvent {
    pub time: i64,
    pub self_id: i64,
    /// Group number; absent for private pokes.
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Who poked.
    #[serde(default)]
    pub user_id: i64,
    /// Also who poked, as some gateways report it.
    #[serde(default)]
    pub sender_id: i64,
    /// Who was poked.
    pub target_id: i64,
}

/// A red-packet lucky king was drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuckyKingEvent {
    pub time: i64,
    pub self_id: i64,
    pub group_id: i64,
    /// Red packet sender.
    pub user_id: i64,
    /// The lucky king.
    pub target_id: i64,
}

/// A group member honor changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HonorEvent {
    pub time: i64,
    pub self_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    /// Honor type: "talkative", "performer" or "emotion".
    #[serde(default)]
    pub honor_type: String,
}

/// A message was marked as, or removed from, group essence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssenceEvent {
    pub time: i64,
    pub self_id: i64,
    /// Sub-type: "add" or "delete".
    #[serde(default)]
    pub sub_type: String,
    pub group_id: i64,
    /// Original message sender.
    pub sender_id: i64,
    pub operator_id: i64,
    pub message_id: i64,
}

/// An offline file was received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineFileEvent {
    pub time: i64,
    pub self_id: i64,
    pub user_id: i64,
    pub file: FileInfo,
}

/// Another client of the same account went on or offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStatusEvent {
    pub time: i64,
    pub self_id: i64,
    pub client: ClientInfo,
    pub online: bool,
}
