//! Client-side implementation of the OneBot v11 gateway protocol.
//!
//! The gateway exposes two WebSocket endpoints: `/api`, a request-response
//! channel driven by [`ApiClient`], and `/event`, a server-push channel
//! consumed by [`Dispatcher`]. Inline message markup ("CQ codes") lives in
//! [`cqcode`].

pub mod api;
pub mod cqcode;
pub mod dispatcher;
pub mod model;

pub use api::ApiClient;
pub use dispatcher::{Dispatcher, EventHandler};
