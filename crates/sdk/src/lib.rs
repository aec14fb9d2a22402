//! GWToolbox SDK - Host Type Definitions
//!
//! This crate contains the plain data types shared between the injected
//! toolbox, the host collaborators and externally-built plugins. It has no
//! dependencies so plugins can link it cheaply.
//!
//! # Modules
//!
//! - [`interfaces`] - Opaque host types (render device, window handle)
//! - [`messages`] - Window message and virtual-key constants
//! - [`versions`] - Plugin ABI version and exported symbol names

pub mod interfaces;
pub mod messages;
pub mod versions;

pub use interfaces::*;
pub use messages::WindowMessage;
pub use versions::PLUGIN_ABI_VERSION;
