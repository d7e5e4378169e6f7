//! Live task updates over STOMP on a WebSocket.

pub mod frame;
pub mod listener;

pub use listener::{ListenerHandle, ListenerState, LiveConfig, LiveUpdateListener};
