//! Reply generation: canned template pools with optional model enhancement.

pub mod backend;
pub mod generator;
pub mod pools;
