//! Domain models shared across the pipeline and its transports.

pub mod chat;
pub mod live;
pub mod status;
