//! Pushed-event loop: classify, decode, hand off.
//!
//! Frames from the event channel are routed by their classifier chain
//! (`post_type`, then the matching secondary field, then `sub_type` for
//! "notify" notices) before any payload decoding happens. Frames whose
//! chain resolves to no known path still reach the handler through
//! [`EventHandler::on_unknown`] with their raw bytes, with one historical
//! exception: a "notify" notice with an unrecognized `sub_type` is dropped
//! outright.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use kotori_core::{Channel, TransportError};

use crate::api::ApiClient;
use crate::model::event::{
    ClientStatusEvent, EssenceEvent, FriendAddEvent, FriendRecallEvent, FriendRequestEvent,
    GroupAdminEvent, GroupBanEvent, GroupCardEvent, GroupDecreaseEvent, GroupIncreaseEvent,
    GroupMessageEvent, GroupRecallEvent, GroupRequestEvent, GroupUploadEvent, HeartbeatEvent,
    HonorEvent, LifecycleEvent, LuckyKingEvent, OfflineFileEvent, PokeEvent, PrivateMessageEvent,
};

/// Default cap on concurrently running handler invocations.
const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Classifier fields shared by every event frame.
#[derive(Debug, Default, Deserialize)]
struct Header {
    #[serde(default)]
    post_type: String,
    #[serde(default)]
    meta_event_type: String,
    #[serde(default)]
    message_type: String,
    #[serde(default)]
    request_type: String,
    #[serde(default)]
    notice_type: String,
    #[serde(default)]
    sub_type: Option<String>,
}

/// A fully resolved classifier path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Lifecycle,
    Heartbeat,
    PrivateMessage,
    GroupMessage,
    FriendRequest,
    GroupRequest,
    GroupUpload,
    GroupAdmin,
    GroupBan,
    GroupCard,
    GroupDecrease,
    GroupIncrease,
    GroupRecall,
    FriendAdd,
    FriendRecall,
    Poke,
    LuckyKing,
    Honor,
    Essence,
    OfflineFile,
    ClientStatus,
    /// Recognized nowhere; delivered raw.
    Unknown,
    /// Discarded without delivery.
    Drop,
}

fn classify(header: &Header) -> Route {
    match header.post_type.as_str() {
        "meta_event" => match header.meta_event_type.as_str() {
            "lifecycle" => Route::Lifecycle,
            "heartbeat" => Route::Heartbeat,
            _ => Route::Unknown,
        },
        "message" => match header.message_type.as_str() {
            "private" => Route::PrivateMessage,
            "group" => Route::GroupMessage,
            _ => Route::Unknown,
        },
        "request" => match header.request_type.as_str() {
            "friend" => Route::FriendRequest,
            "group" => Route::GroupRequest,
            _ => Route::Unknown,
        },
        "notice" => match header.notice_type.as_str() {
            "group_upload" => Route::GroupUpload,
            "group_admin" => Route::GroupAdmin,
            "group_ban" => Route::GroupBan,
            "group_card" => Route::GroupCard,
            "group_decrease" => Route::GroupDecrease,
            "group_increase" => Route::GroupIncrease,
            "group_recall" => Route::GroupRecall,
            "friend_add" => Route::FriendAdd,
            "friend_recall" => Route::FriendRecall,
            "essence" => Route::Essence,
            "offline_file" => Route::OfflineFile,
            "client_status" => Route::ClientStatus,
            "notify" => match header.sub_type.as_deref().unwrap_or("") {
                "poke" => Route::Poke,
                "lucky_king" => Route::LuckyKing,
                "honor" => Route::Honor,
                _ => Route::Drop,
            },
            _ => Route::Unknown,
        },
        _ => Route::Unknown,
    }
}

/// Receiver of classified events.
///
/// Every method defaults to a no-op, so implementations only override the
/// paths they care about. Each invocation gets its own [`ApiClient`] clone
/// for replying.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_lifecycle(&self, _api: ApiClient, _event: LifecycleEvent) {}
    async fn on_heartbeat(&self, _api: ApiClient, _event: HeartbeatEvent) {}

    async fn on_private_message(&self, _api: ApiClient, _event: PrivateMessageEvent) {}
    async fn on_group_message(&self, _api: ApiClient, _event: GroupMessageEvent) {}

    async fn on_friend_request(&self, _api: ApiClient, _event: FriendRequestEvent) {}
    async fn on_group_request(&self, _api: ApiClient, _event: GroupRequestEvent) {}

    async fn on_group_upload(&self, _api: ApiClient, _event: GroupUploadEvent) {}
    async fn on_group_admin(&self, _api: ApiClient, _event: GroupAdminEvent) {}
    async fn on_group_ban(&self, _api: ApiClient, _event: GroupBanEvent) {}
    async fn on_group_card(&self, _api: ApiClient, _event: GroupCardEvent) {}
    async fn on_group_decrease(&self, _api: ApiClient, _event: GroupDecreaseEvent) {}
    async fn on_group_increase(&self, _api: ApiClient, _event: GroupIncreaseEvent) {}
    async fn on_group_recall(&self, _api: ApiClient, _event: GroupRecallEvent) {}
    async fn on_friend_add(&self, _api: ApiClient, _event: FriendAddEvent) {}
    async fn on_friend_recall(&self, _api: ApiClient, _event: FriendRecallEvent) {}
    async fn on_poke(&self, _api: ApiClient, _event: PokeEvent) {}
    async fn on_lucky_king(&self, _api: ApiClient, _event: LuckyKingEvent) {}
    async fn on_honor(&self, _api: ApiClient, _event: HonorEvent) {}
    async fn on_essence(&self, _api: ApiClient, _event: EssenceEvent) {}
    async fn on_offline_file(&self, _api: ApiClient, _event: OfflineFileEvent) {}
    async fn on_client_status(&self, _api: ApiClient, _event: ClientStatusEvent) {}

    /// Called with the raw frame when no classifier path matches, or when
    /// the frame is not valid JSON at all.
    async fn on_unknown(&self, _api: ApiClient, _raw: Vec<u8>) {}
}

macro_rules! deliver {
    ($api:expr, $handler:expr, $frame:expr, $ty:ty, $method:ident) => {
        match serde_json::from_slice::<$ty>(&$frame) {
            Ok(event) => $handler.$method($api, event).await,
            Err(error) => warn!(
                handler = stringify!($method),
                %error,
                "failed to decode event payload"
            ),
        }
    };
}

async fn dispatch_frame(api: ApiClient, handler: Arc<dyn EventHandler>, frame: Vec<u8>) {
    let header: Header = match serde_json::from_slice(&frame) {
        Ok(header) => header,
        Err(error) => {
            debug!(%error, "event frame is not valid json");
            handler.on_unknown(api, frame).await;
            return;
        }
    };
    match classify(&header) {
        Route::Lifecycle => deliver!(api, handler, frame, LifecycleEvent, on_lifecycle),
        Route::Heartbeat => deliver!(api, handler, frame, HeartbeatEvent, on_heartbeat),
        Route::PrivateMessage => {
            deliver!(api, handler, frame, PrivateMessageEvent, on_private_message)
        }
        Route::GroupMessage => deliver!(api, handler, frame, GroupMessageEvent, on_group_message),
        Route::FriendRequest => {
            deliver!(api, handler, frame, FriendRequestEvent, on_friend_request)
        }
        Route::GroupRequest => deliver!(api, handler, frame, GroupRequestEvent, on_group_request),
        Route::GroupUpload => deliver!(api, handler, frame, GroupUploadEvent, on_group_upload),
        Route::GroupAdmin => deliver!(api, handler, frame, GroupAdminEvent, on_group_admin),
        Route::GroupBan => deliver!(api, handler, frame, GroupBanEvent, on_group_ban),
        Route::GroupCard => deliver!(api, handler, frame, GroupCardEvent, on_group_card),
        Route::GroupDecrease => {
            deliver!(api, handler, frame, GroupDecreaseEvent, on_group_decrease)
        }
        Route::GroupIncrease => {
            deliver!(api, handler, frame, GroupIncreaseEvent, on_group_increase)
        }
        Route::GroupRecall => deliver!(api, handler, frame, GroupRecallEvent, on_group_recall),
        Route::FriendAdd => deliver!(api, handler, frame, FriendAddEvent, on_friend_add),
        Route::FriendRecall => deliver!(api, handler, frame, FriendRecallEvent, on_friend_recall),
        Route::Poke => deliver!(api, handler, frame, PokeEvent, on_poke),
        Route::LuckyKing => deliver!(api, handler, frame, LuckyKingEvent, on_lucky_king),
        Route::Honor => deliver!(api, handler, frame, HonorEvent, on_honor),
        Route::Essence => deliver!(api, handler, frame, EssenceEvent, on_essence),
        Route::OfflineFile => deliver!(api, handler, frame, OfflineFileEvent, on_offline_file),
        Route::ClientStatus => {
            deliver!(api, handler, frame, ClientStatusEvent, on_client_status)
        }
        Route::Unknown => handler.on_unknown(api, frame).await,
        Route::Drop => debug!(
            notice_type = %header.notice_type,
            sub_type = header.sub_type.as_deref().unwrap_or(""),
            "dropping unrecognized notify notice"
        ),
    }
}

/// Pulls frames off the event channel and fans them out to the handler.
pub struct Dispatcher {
    api: ApiClient,
    handler: Arc<dyn EventHandler>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(api: ApiClient, handler: Arc<dyn EventHandler>) -> Self {
        Self::with_max_concurrency(api, handler, DEFAULT_MAX_CONCURRENCY)
    }

    /// Caps how many handler invocations may run at once. Further frames
    /// are still read but wait for a permit before spawning.
    pub fn with_max_concurrency(
        api: ApiClient,
        handler: Arc<dyn EventHandler>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            api,
            handler,
            permits: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    /// Runs until the channel fails, then waits for in-flight handler
    /// invocations to finish and returns the channel error.
    pub async fn run(self, mut channel: impl Channel) -> TransportError {
        let mut tasks = JoinSet::new();
        let error = loop {
            let frame = match channel.recv().await {
                Ok(frame) => frame,
                Err(error) => break error,
            };
            while tasks.try_join_next().is_some() {}
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break TransportError::closed("dispatcher permits closed"),
            };
            let api = self.api.clone();
            let handler = Arc::clone(&self.handler);
            tasks.spawn(async move {
                let _permit = permit;
                dispatch_frame(api, handler, frame).await;
            });
        };
        while tasks.join_next().await.is_some() {}
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use kotori_core::MemoryChannel;

    fn route_of(frame: serde_json::Value) -> Route {
        let header: Header = serde_json::from_value(frame).unwrap();
        classify(&header)
    }

    #[test]
    fn classifier_resolves_every_known_path() {
        use serde_json::json;

        let cases = [
            (json!({"post_type": "meta_event", "meta_event_type": "lifecycle"}), Route::Lifecycle),
            (json!({"post_type": "meta_event", "meta_event_type": "heartbeat"}), Route::Heartbeat),
            (json!({"post_type": "message", "message_type": "private", "sub_type": "friend"}), Route::PrivateMessage),
            (json!({"post_type": "message", "message_type": "group", "sub_type": "normal"}), Route::GroupMessage),
            (json!({"post_type": "request", "request_type": "friend"}), Route::FriendRequest),
            (json!({"post_type": "request", "request_type": "group", "sub_type": "invite"}), Route::GroupRequest),
            (json!({"post_type": "notice", "notice_type": "group_upload"}), Route::GroupUpload),
            (json!({"post_type": "notice", "notice_type": "group_admin", "sub_type": "set"}), Route::GroupAdmin),
            (json!({"post_type": "notice", "notice_type": "group_ban", "sub_type": "ban"}), Route::GroupBan),
            (json!({"post_type": "notice", "notice_type": "group_card"}), Route::GroupCard),
            (json!({"post_type": "notice", "notice_type": "group_decrease", "sub_type": "kick"}), Route::GroupDecrease),
            (json!({"post_type": "notice", "notice_type": "group_increase", "sub_type": "approve"}), Route::GroupIncrease),
            (json!({"post_type": "notice", "notice_type": "group_recall"}), Route::GroupRecall),
            (json!({"post_type": "notice", "notice_type": "friend_add"}), Route::FriendAdd),
            (json!({"post_type": "notice", "notice_type": "friend_recall"}), Route::FriendRecall),
            (json!({"post_type": "notice", "notice_type": "notify", "sub_type": "poke"}), Route::Poke),
            (json!({"post_type": "notice", "notice_type": "notify", "sub_type": "lucky_king"}), Route::LuckyKing),
            (json!({"post_type": "notice", "notice_type": "notify", "sub_type": "honor"}), Route::Honor),
            (json!({"post_type": "notice", "notice_type": "essence", "sub_type": "add"}), Route::Essence),
            (json!({"post_type": "notice", "notice_type": "offline_file"}), Route::OfflineFile),
            (json!({"post_type": "notice", "notice_type": "client_status"}), Route::ClientStatus),
        ];
        for (frame, expected) in cases {
            let route = route_of(frame.clone());
            assert_eq!(route, expected, "frame {frame}");
        }
    }

    #[test]
    fn unrecognized_frames_split_between_unknown_and_drop() {
        use serde_json::json;

        // Unrecognized anywhere but under "notify": delivered raw.
        assert_eq!(route_of(json!({"post_type": "surprise"})), Route::Unknown);
        assert_eq!(route_of(json!({})), Route::Unknown);
        assert_eq!(
            route_of(json!({"post_type": "message", "message_type": "channel"})),
            Route::Unknown
        );
        assert_eq!(
            route_of(json!({"post_type": "notice", "notice_type": "group_rename"})),
            Route::Unknown
        );
        // Unrecognized "notify" sub-types: discarded.
        assert_eq!(
            route_of(json!({"post_type": "notice", "notice_type": "notify", "sub_type": "title"})),
            Route::Drop
        );
        assert_eq!(
            route_of(json!({"post_type": "notice", "notice_type": "notify"})),
            Route::Drop
        );
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn on_private_message(&self, _api: ApiClient, event: PrivateMessageEvent) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("private:{}", event.message));
        }

        async fn on_poke(&self, _api: ApiClient, event: PokeEvent) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("poke:{}", event.target_id));
        }

        async fn on_unknown(&self, _api: ApiClient, raw: Vec<u8>) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("unknown:{}", String::from_utf8_lossy(&raw)));
        }
    }

    fn idle_api() -> ApiClient {
        let (client_end, gateway) = MemoryChannel::pair();
        // Keep the far end alive for the duration of the test.
        std::mem::forget(gateway);
        ApiClient::new(client_end)
    }

    #[tokio::test]
    async fn frames_reach_the_matching_handler_or_on_unknown() {
        let (event_end, mut gateway) = MemoryChannel::pair();
        let recorder = Arc::new(Recorder::default());
        let dispatcher =
            Dispatcher::with_max_concurrency(idle_api(), recorder.clone(), 1);

        let frames: Vec<Vec<u8>> = vec![
            br#"{"post_type":"message","message_type":"private","sub_type":"friend","time":1,"self_id":1,"message_id":1,"user_id":2,"message":"hi","raw_message":"hi","font":0,"sender":{"user_id":2,"nickname":"a","sex":"unknown","age":0}}"#.to_vec(),
            br#"{"post_type":"notice","notice_type":"notify","sub_type":"poke","time":1,"self_id":1,"user_id":2,"target_id":3}"#.to_vec(),
            // Unrecognized notify sub-type, dropped without delivery.
            br#"{"post_type":"notice","notice_type":"notify","sub_type":"title","time":1,"self_id":1}"#.to_vec(),
            // Missing post_type, delivered raw.
            br#"{"time":1,"self_id":1}"#.to_vec(),
            // Not JSON at all, delivered raw.
            b"not json".to_vec(),
        ];
        for frame in frames {
            gateway.send(frame).await.unwrap();
        }
        drop(gateway);

        let error = dispatcher.run(event_end).await;
        assert!(matches!(error, TransportError::ConnectionClosed { .. }));

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "private:hi".to_string(),
                "poke:3".to_string(),
                "unknown:{\"time\":1,\"self_id\":1}".to_string(),
                "unknown:not json".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn a_broken_payload_does_not_stop_the_loop() {
        let (event_end, mut gateway) = MemoryChannel::pair();
        let recorder = Arc::new(Recorder::default());
        let dispatcher =
            Dispatcher::with_max_concurrency(idle_api(), recorder.clone(), 1);

        // Classifies as a private message but the payload does not decode:
        // message_id carries the wrong type.
        gateway
            .send(br#"{"post_type":"message","message_type":"private","message_id":"oops"}"#.to_vec())
            .await
            .unwrap();
        gateway
            .send(br#"{"post_type":"message","message_type":"private","time":1,"self_id":1,"message_id":2,"user_id":2,"message":"still here"}"#.to_vec())
            .await
            .unwrap();
        drop(gateway);

        dispatcher.run(event_end).await;
        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["private:still here".to_string()]);
    }
}
