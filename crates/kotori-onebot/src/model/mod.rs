//! Wire data model for the OneBot v11 protocol.
//!
//! - [`types`] — small shared shapes (senders, file info, runtime status).
//! - [`event`] — the typed event structs the dispatcher decodes into.
//! - [`api`] — result structs for the typed API surface.

pub mod api;
pub mod event;
pub mod types;
