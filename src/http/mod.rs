//! HTTP control API and live observer WebSocket.

pub mod server;
