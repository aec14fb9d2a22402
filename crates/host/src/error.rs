//! Error types for host collaborator calls

/// Error type for host operations
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The game-memory layer could not locate everything it needs
    #[error("Initialize failed at finding all addresses: {0}")]
    InitializeFailed(String),

    /// A host object the caller needs is not available yet
    #[error("Host object not available: {0}")]
    Unavailable(&'static str),

    /// The host returned a null pointer
    #[error("Null pointer from host: {0}")]
    NullPointer(&'static str),

    /// An OS call failed
    #[error("{call} failed with error code {code}")]
    Os { call: &'static str, code: u32 },
}
