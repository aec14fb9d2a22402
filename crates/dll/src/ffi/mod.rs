//! FFI boundary with the host process
//!
//! The loader calls `DllMain`, which starts the worker thread. Nothing else
//! runs under the loader lock.

pub mod exports;
