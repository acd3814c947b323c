//! # Kotori Core
//!
//! Shared building blocks for the kotori OneBot v11 client:
//!
//! - **Errors**: the [`TransportError`]/[`ApiError`] taxonomy used across the
//!   workspace.
//! - **Channel abstraction**: the [`Channel`] trait every transport
//!   implements, plus an in-memory [`MemoryChannel`] for tests.
//!
//! The protocol logic itself (API client, event dispatcher, markup codec)
//! lives in `kotori-onebot`; concrete transports live in `kotori-transport`.

pub mod channel;
pub mod error;

pub use channel::{Channel, MemoryChannel};
pub use error::{ApiError, ApiResult, TransportError, TransportResult};
