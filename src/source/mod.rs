//! Chat source: subprocess lifecycle and output parsing.
//!
//! The supervisor spawns the external chat-tailing program, restarts it
//! with backoff when it exits, and feeds both of its output streams through
//! [`codec::ChatLineCodec`] and [`parser::parse_line`] into the intake queue.

pub mod codec;
pub mod parser;
pub mod reader;
pub mod spawner;
pub mod supervisor;
