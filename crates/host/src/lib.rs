//! GWToolbox Host - External Collaborator Contracts
//!
//! The toolbox runs inside a process it does not own. Everything it needs
//! from that process goes through two traits defined here:
//!
//! - [`GameApi`] - the reverse-engineered game-memory layer (window handle,
//!   render device, map/agent state, camera, chat, cursor fix)
//! - [`Platform`] - the operating system (key state, window procedures,
//!   tick counter, message boxes)
//!
//! The injected DLL provides the real implementations; tests provide mocks.
//!
//! # Thread Safety
//!
//! Both traits are `Send + Sync` because the worker thread and the host's
//! render thread hold the same instances. Implementations must not assume
//! which of the two is calling.

pub mod api;
pub mod error;
pub mod platform;

pub use api::{CameraMove, ChatHooks, GameApi};
pub use error::HostError;
pub use platform::Platform;
