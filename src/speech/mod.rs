//! Spoken announcements and live observer fan-out.

pub mod announcer;
pub mod command;
pub mod observers;
