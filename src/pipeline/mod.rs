//! Comment intake and sequential processing.
//!
//! - `intake`: deduplicating FIFO and processed-id history.
//! - `state`: explicit shared state with the `Idle`/`Busy` flag.
//! - `processor`: fixed-cadence, single-flight queue drain.

pub mod intake;
pub mod processor;
pub mod state;
