//! Relay server for a shared whiteboard.
//!
//! Participants connect over TCP and exchange length-prefixed JSON frames. The
//! relay keeps the session's drawing history, replays it to every newcomer as
//! an `init` message, and forwards each incoming stroke or clear to all other
//! participants in the order it was recorded.

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod drawing_log;
pub mod error;
pub mod registry;
pub mod server;
pub mod shared_types;

pub use client::RelayClient;
pub use config::RelayConfig;
pub use connection::{ConnectionHandle, ConnectionOptions};
pub use drawing_log::DrawingLog;
pub use error::{Closed, CodecError, RelayError, Result};
pub use registry::SessionRegistry;
pub use server::{RelayHandle, RelayServer};
pub use shared_types::{DrawingEvent, Message, Stroke};
