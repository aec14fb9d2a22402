//! Task queue for render-thread execution
//!
//! Allows background threads (resource fetches, update checks) to hand work
//! back to the host's render thread. Tasks are processed each frame by the
//! frame driver, before modules update.

pub mod queue;

pub use queue::*;
