//! Typed gateway API client.
//!
//! Requests are `{"action": ..., "params": {...}}` frames; the gateway
//! answers each one with an envelope carrying `data`, `retcode`, `status`
//! and, only on failure, `msg`/`wording`. The wire has no correlation id,
//! so calls are single-flight: a fair async mutex holds the channel from
//! send until the matching response is read, and concurrent callers queue
//! in FIFO order behind it.
//!
//! A timed-out call breaks that pairing for good: the late response could
//! still arrive and would be read as the next call's answer. The channel is
//! therefore poisoned on timeout and every later call fails with
//! [`TransportError::ConnectionClosed`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use kotori_core::{ApiError, ApiResult, Channel, TransportError};

use crate::model::api::{
    EssenceMessage, ForwardNode, FriendInfo, GroupHonorInfo, GroupInfo, GroupMemberInfo, ImageInfo,
    LoginInfo, MsgInfo, StrangerInfo, VersionInfo,
};
use crate::model::types::{ClientInfo, RuntimeStatus};

/// How long to wait for a response before giving up on a call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct ApiRequest<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "params_is_empty")]
    params: Value,
}

fn params_is_empty(params: &Value) -> bool {
    params.as_object().is_none_or(|map| map.is_empty())
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
    /// Present only when the call failed.
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    wording: Option<String>,
}

struct Gate {
    channel: Box<dyn Channel>,
    /// Set once a call has timed out. Its response may still arrive later,
    /// and without a correlation id that frame would pair with the next
    /// request, so the channel is unusable from that point on.
    poisoned: bool,
}

struct Inner {
    gate: Mutex<Gate>,
    timeout: Duration,
}

/// Handle to the gateway's request-response channel.
///
/// Cheap to clone; all clones share the underlying channel and serialize
/// their calls over it.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(channel: impl Channel + 'static) -> Self {
        Self::with_timeout(channel, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(channel: impl Channel + 'static, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                gate: Mutex::new(Gate {
                    channel: Box::new(channel),
                    poisoned: false,
                }),
                timeout,
            }),
        }
    }

    /// Sends one action frame and reads its response envelope.
    ///
    /// Failure is signalled by the presence of `msg`, not by `status` or
    /// `retcode`; those are only logged.
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        let frame = serde_json::to_vec(&ApiRequest { action, params })?;
        debug!(action = %action, "calling gateway api");

        let mut gate = self.inner.gate.lock().await;
        if gate.poisoned {
            return Err(TransportError::closed("api channel lost response pairing").into());
        }
        gate.channel.send(frame).await.map_err(ApiError::Transport)?;
        let reply = match tokio::time::timeout(self.inner.timeout, gate.channel.recv()).await {
            Ok(received) => received?,
            Err(_) => {
                gate.poisoned = true;
                warn!(action = %action, "api call timed out, channel is now unusable");
                return Err(TransportError::Timeout.into());
            }
        };
        drop(gate);

        let envelope: Envelope = serde_json::from_slice(&reply)?;
        if let Some(code) = envelope.msg {
            warn!(
                action = %action,
                status = %envelope.status,
                retcode = envelope.retcode,
                "gateway rejected api call"
            );
            return Err(ApiError::Remote {
                code,
                message: envelope.wording.unwrap_or_default(),
            });
        }
        Ok(envelope.data)
    }
}

/// Declares a typed wrapper around [`ApiClient::call`].
///
/// Argument names double as wire parameter keys. Three forms:
/// no return value, deserialize the whole `data` object, or pull a single
/// field out of it (`take "field"`).
macro_rules! impl_api {
    ($(#[$doc:meta])* $name:ident($action:literal $(, $arg:ident : $ty:ty)* $(,)?)) => {
        $(#[$doc])*
        pub async fn $name(&self $(, $arg: $ty)*) -> ApiResult<()> {
            self.call($action, serde_json::json!({ $( (stringify!($arg)): $arg ),* }))
                .await?;
            Ok(())
        }
    };
    ($(#[$doc:meta])* $name:ident($action:literal $(, $arg:ident : $ty:ty)* $(,)?) -> $ret:ty, take $field:literal) => {
        $(#[$doc])*
        pub async fn $name(&self $(, $arg: $ty)*) -> ApiResult<$ret> {
            let mut data = self
                .call($action, serde_json::json!({ $( (stringify!($arg)): $arg ),* }))
                .await?;
            match data.get_mut($field) {
                Some(value) => Ok(serde_json::from_value(value.take())?),
                None => Err(ApiError::Decode(format!(
                    "response to `{}` is missing field `{}`",
                    $action, $field
                ))),
            }
        }
    };
    ($(#[$doc:meta])* $name:ident($action:literal $(, $arg:ident : $ty:ty)* $(,)?) -> $ret:ty) => {
        $(#[$doc])*
        pub async fn $name(&self $(, $arg: $ty)*) -> ApiResult<$ret> {
            let data = self
                .call($action, serde_json::json!({ $( (stringify!($arg)): $arg ),* }))
                .await?;
            Ok(serde_json::from_value(data)?)
        }
    };
}

impl ApiClient {
    impl_api! {
        /// Sends a private message, returning its message id.
        send_private_msg("send_private_msg", user_id: i64, message: &str, auto_escape: bool) -> i64, take "message_id"
    }
    impl_api! {
        /// Sends a group message, returning its message id.
        send_group_msg("send_group_msg", group_id: i64, message: &str, auto_escape: bool) -> i64, take "message_id"
    }
    impl_api! {
        /// Sends a message to either target; the gateway picks the id field
        /// matching `message_type` ("private" or "group").
        send_msg("send_msg", message_type: &str, user_id: i64, group_id: i64, message: &str) -> i64, take "message_id"
    }
    impl_api! {
        /// Forwards a batch of nodes to a group as one combined message.
        send_group_forward_msg("send_group_forward_msg", group_id: i64, messages: &[ForwardNode]) -> i64, take "message_id"
    }
    impl_api! {
        /// Recalls a message.
        delete_msg("delete_msg", message_id: i64)
    }
    impl_api! {
        /// Fetches a message by id.
        get_msg("get_msg", message_id: i64) -> MsgInfo
    }

    impl_api! {
        /// Kicks a member out of a group.
        set_group_kick("set_group_kick", group_id: i64, user_id: i64, reject_add_request: bool)
    }
    impl_api! {
        /// Bans a member for `duration` seconds; 0 lifts the ban.
        set_group_ban("set_group_ban", group_id: i64, user_id: i64, duration: i64)
    }
    impl_api! {
        /// Bans an anonymous sender using the flag from its message event.
        set_group_anonymous_ban("set_group_anonymous_ban", group_id: i64, flag: &str, duration: i64)
    }
    impl_api! {
        /// Mutes or unmutes the whole group.
        set_group_whole_ban("set_group_whole_ban", group_id: i64, enable: bool)
    }
    impl_api! {
        /// Grants or revokes group admin.
        set_group_admin("set_group_admin", group_id: i64, user_id: i64, enable: bool)
    }
    impl_api! {
        /// Sets a member's group card; an empty card clears it.
        set_group_card("set_group_card", group_id: i64, user_id: i64, card: &str)
    }
    impl_api! {
        /// Renames a group.
        set_group_name("set_group_name", group_id: i64, group_name: &str)
    }
    impl_api! {
        /// Leaves a group, dismissing it when `is_dismiss` and we own it.
        set_group_leave("set_group_leave", group_id: i64, is_dismiss: bool)
    }
    impl_api! {
        /// Sets a member's special title for `duration` seconds (-1 keeps it
        /// forever).
        set_group_special_title("set_group_special_title", group_id: i64, user_id: i64, special_title: &str, duration: i64)
    }
    impl_api! {
        /// Performs the daily group sign-in.
        send_group_sign("send_group_sign", group_id: i64)
    }

    impl_api! {
        /// Answers a friend-add request.
        set_friend_add_request("set_friend_add_request", flag: &str, approve: bool, remark: &str)
    }
    impl_api! {
        /// Answers a group-join request or invite; `reason` only applies to
        /// rejections.
        set_group_add_request("set_group_add_request", flag: &str, sub_type: &str, approve: bool, reason: &str)
    }

    impl_api! {
        /// Fetches the logged-in account's own info.
        get_login_info("get_login_info") -> LoginInfo
    }
    impl_api! {
        get_stranger_info("get_stranger_info", user_id: i64, no_cache: bool) -> StrangerInfo
    }
    impl_api! {
        get_friend_list("get_friend_list") -> Vec<FriendInfo>
    }
    impl_api! {
        /// Deletes a friend.
        delete_friend("delete_friend", user_id: i64)
    }
    impl_api! {
        get_group_info("get_group_info", group_id: i64, no_cache: bool) -> GroupInfo
    }
    impl_api! {
        get_group_list("get_group_list") -> Vec<GroupInfo>
    }
    impl_api! {
        get_group_member_info("get_group_member_info", group_id: i64, user_id: i64, no_cache: bool) -> GroupMemberInfo
    }
    impl_api! {
        get_group_member_list("get_group_member_list", group_id: i64) -> Vec<GroupMemberInfo>
    }

    impl_api! {
        /// Resolves an image file name from a CQ code to its cached info.
        get_image("get_image", file: &str) -> ImageInfo
    }
    impl_api! {
        /// Whether the gateway can send images.
        can_send_image("can_send_image") -> bool, take "yes"
    }
    impl_api! {
        /// Whether the gateway can send voice records.
        can_send_record("can_send_record") -> bool, take "yes"
    }
    impl_api! {
        get_status("get_status") -> RuntimeStatus
    }
    impl_api! {
        get_version_info("get_version_info") -> VersionInfo
    }
    impl_api! {
        /// Lists the other clients logged in to the same account.
        get_online_clients("get_online_clients", no_cache: bool) -> Vec<ClientInfo>, take "clients"
    }

    impl_api! {
        /// Marks a message as group essence.
        set_essence_msg("set_essence_msg", message_id: i64)
    }
    impl_api! {
        /// Removes a message from group essence.
        delete_essence_msg("delete_essence_msg", message_id: i64)
    }
    impl_api! {
        get_essence_msg_list("get_essence_msg_list", group_id: i64) -> Vec<EssenceMessage>
    }

    /// Fetches a group's honor rankings. `kind` selects one of "talkative",
    /// "performer", "legend", "strong_newbie", "emotion" or "all".
    ///
    /// Written out by hand because the wire parameter is named `type`.
    pub async fn get_group_honor_info(&self, group_id: i64, kind: &str) -> ApiResult<GroupHonorInfo> {
        let data = self
            .call(
                "get_group_honor_info",
                serde_json::json!({"group_id": group_id, "type": kind}),
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kotori_core::MemoryChannel;

    async fn recv_json(gateway: &mut MemoryChannel) -> Value {
        let frame = gateway.recv().await.unwrap();
        serde_json::from_slice(&frame).unwrap()
    }

    #[tokio::test]
    async fn unwraps_data_and_omits_empty_params() {
        let (client_end, mut gateway) = MemoryChannel::pair();
        let api = ApiClient::new(client_end);

        let server = tokio::spawn(async move {
            let request = recv_json(&mut gateway).await;
            assert_eq!(request["action"], "get_login_info");
            assert!(request.get("params").is_none());
            let reply = serde_json::json!({
                "status": "ok",
                "retcode": 0,
                "data": {"user_id": 10001, "nickname": "koi"}
            });
            gateway.send(serde_json::to_vec(&reply).unwrap()).await.unwrap();
        });

        let info = api.get_login_info().await.unwrap();
        assert_eq!(info.user_id, 10001);
        assert_eq!(info.nickname, "koi");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn failure_is_signalled_by_msg_presence() {
        let (client_end, mut gateway) = MemoryChannel::pair();
        let api = ApiClient::new(client_end);

        let server = tokio::spawn(async move {
            recv_json(&mut gateway).await;
            let reply = serde_json::json!({
                "status": "failed",
                "retcode": 1404,
                "msg": "E1",
                "wording": "not found"
            });
            gateway.send(serde_json::to_vec(&reply).unwrap()).await.unwrap();
        });

        let err = api.delete_msg(99).await.unwrap_err();
        match err {
            ApiError::Remote { code, message } => {
                assert_eq!(code, "E1");
                assert_eq!(message, "not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn params_carry_arguments_under_their_wire_keys() {
        let (client_end, mut gateway) = MemoryChannel::pair();
        let api = ApiClient::new(client_end);

        let server = tokio::spawn(async move {
            let request = recv_json(&mut gateway).await;
            assert_eq!(request["action"], "set_group_ban");
            assert_eq!(
                request["params"],
                serde_json::json!({"group_id": 7, "user_id": 8, "duration": 600})
            );
            let reply = serde_json::json!({"status": "ok", "retcode": 0, "data": null});
            gateway.send(serde_json::to_vec(&reply).unwrap()).await.unwrap();
        });

        api.set_group_ban(7, 8, 600).await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_calls_stay_in_lockstep() {
        let (client_end, mut gateway) = MemoryChannel::pair();
        let api = ApiClient::new(client_end);

        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let request = recv_json(&mut gateway).await;
                // Delay the answer so the second caller has time to pile up
                // behind the lock.
                tokio::time::sleep(Duration::from_millis(20)).await;
                let id = &request["params"]["message_id"];
                let reply = serde_json::json!({
                    "status": "ok",
                    "retcode": 0,
                    "data": {"message_id": id, "time": 0, "message": ""}
                });
                gateway.send(serde_json::to_vec(&reply).unwrap()).await.unwrap();
            }
        });

        let a = api.clone();
        let first = tokio::spawn(async move { a.get_msg(1).await.unwrap() });
        let b = api.clone();
        let second = tokio::spawn(async move { b.get_msg(2).await.unwrap() });

        let (first, second) = (first.await.unwrap(), second.await.unwrap());
        assert_eq!(first.message_id, 1);
        assert_eq!(second.message_id, 2);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn a_silent_gateway_times_the_call_out() {
        let (client_end, _gateway) = MemoryChannel::pair();
        let api = ApiClient::with_timeout(client_end, Duration::from_millis(10));

        let err = api.get_status().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport(TransportError::Timeout)
        ));
    }

    #[tokio::test]
    async fn a_late_response_never_pairs_with_a_later_call() {
        let (client_end, mut gateway) = MemoryChannel::pair();
        let api = ApiClient::with_timeout(client_end, Duration::from_millis(10));

        // First call gets no answer in time.
        let err = api.get_msg(1).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Timeout)));

        // Its response shows up afterwards and sits queued on the channel.
        let stale = serde_json::json!({
            "status": "ok",
            "retcode": 0,
            "data": {"message_id": 1, "time": 0, "message": ""}
        });
        gateway.send(serde_json::to_vec(&stale).unwrap()).await.unwrap();

        // The stale frame must not be read as the second call's answer;
        // the channel has lost pairing and refuses further calls.
        let err = api.get_msg(2).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport(TransportError::ConnectionClosed { .. })
        ));
    }
}
