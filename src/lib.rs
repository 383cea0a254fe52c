#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod http;
pub mod ipc;
pub mod models;
pub mod monitor;
pub mod pipeline;
pub mod respond;
pub mod source;
pub mod speech;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
