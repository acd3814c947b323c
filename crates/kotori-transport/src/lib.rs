//! # Kotori Transport
//!
//! Concrete transports for the kotori OneBot client. Currently a single
//! client-mode WebSocket channel, [`WsChannel`], which the binary opens twice
//! against a gateway: once for the `/api` endpoint and once for `/event`.

pub mod ws;

pub use ws::WsChannel;
