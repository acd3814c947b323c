//! Response payloads and request building blocks for the gateway API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::types::Sender;

/// Response of `get_login_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    pub nickname: String,
}

/// Response of `get_stranger_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct StrangerInfo {
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub age: i64,
    /// The user's qid, when set.
    #[serde(default)]
    pub qid: String,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub login_days: i64,
}

/// One entry of `get_friend_list`.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendInfo {
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub remark: String,
}

/// Response of `get_group_info`; also one entry of `get_group_list`.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupInfo {
    pub group_id: i64,
    pub group_name: String,
    #[serde(default)]
    pub group_memo: String,
    #[serde(default)]
    pub group_create_time: u32,
    #[serde(default)]
    pub group_level: u32,
    #[serde(default)]
    pub member_count: i32,
    #[serde(default)]
    pub max_member_count: i32,
}

/// Response of `get_group_member_info`; also one entry of
/// `get_group_member_list` (where some per-member fields come back empty).
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMemberInfo {
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub card: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub age: i64,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub join_time: i64,
    #[serde(default)]
    pub last_sent_time: i64,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub unfriendly: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_expire_time: i64,
    #[serde(default)]
    pub card_changeable: bool,
    /// When the member's current ban lifts, 0 if not banned.
    #[serde(default)]
    pub shut_up_timestamp: i64,
}

/// Response of `get_group_honor_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupHonorInfo {
    pub group_id: i64,
    #[serde(default)]
    pub current_talkative: Option<CurrentTalkative>,
    #[serde(default)]
    pub talkative_list: Vec<GroupHonorMember>,
    #[serde(default)]
    pub performer_list: Vec<GroupHonorMember>,
    #[serde(default)]
    pub legend_list: Vec<GroupHonorMember>,
    #[serde(default)]
    pub strong_newbie_list: Vec<GroupHonorMember>,
    #[serde(default)]
    pub emotion_list: Vec<GroupHonorMember>,
}

/// The current talkative member in a group honor response.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentTalkative {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub day_count: i64,
}

/// One member in a group honor list.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupHonorMember {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub description: String,
}

/// Response of `get_image`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub filename: String,
    pub url: String,
}

/// Response of `get_version_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub app_name: String,
    pub app_version: String,
    pub protocol_version: String,
    /// Implementation-specific version details.
    #[serde(flatten)]
    pub extra: Value,
}

/// Response of `get_msg`.
#[derive(Debug, Clone, Deserialize)]
pub struct MsgInfo {
    pub message_id: i64,
    #[serde(default)]
    pub real_id: i64,
    /// Whether this was a group message.
    #[serde(default)]
    pub group: bool,
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub sender: Sender,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub message: String,
}

/// One entry of `get_essence_msg_list`.
#[derive(Debug, Clone, Deserialize)]
pub struct EssenceMessage {
    pub sender_id: i64,
    #[serde(default)]
    pub sender_nick: String,
    #[serde(default)]
    pub sender_time: i64,
    pub operator_id: i64,
    #[serde(default)]
    pub operator_nick: String,
    #[serde(default)]
    pub operator_time: i64,
    pub message_id: i64,
}

/// One node of a forward message, the request side of `send_forward_msg`.
///
/// Serializes as `{"type": "node", "data": {...}}` where the data either
/// references an existing message by id or carries fabricated content.
#[derive(Debug, Clone, Serialize)]
pub struct ForwardNode {
    #[serde(rename = "type")]
    kind: &'static str,
    data: ForwardNodeData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum ForwardNodeData {
    Reference {
        id: i64,
    },
    Custom {
        name: String,
        uin: i64,
        content: String,
    },
}

impl ForwardNode {
    /// A node forwarding an existing message.
    pub fn reference(message_id: i64) -> Self {
        Self {
            kind: "node",
            data: ForwardNodeData::Reference { id: message_id },
        }
    }

    /// A fabricated node with an arbitrary sender and content.
    pub fn custom(name: impl Into<String>, uin: i64, content: impl Into<String>) -> Self {
        Self {
            kind: "node",
            data: ForwardNodeData::Custom {
                name: name.into(),
                uin,
                content: content.into(),
            },
        }
    }
}
