use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Memory unavailable: {0}")]
    MemoryUnavailable(String),

    #[error("Failed to access process memory at address {address:#x}: {message}")]
    MemoryAccess { address: u64, message: String },

    #[error("Degraded string at address {address:#x}: {markers} markers in {length} units")]
    DecodeDegraded {
        address: u64,
        markers: usize,
        length: usize,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Decision provider failure: {0}")]
    DecisionProvider(String),

    #[error("Unknown player: {0}")]
    UnknownPlayer(u8),

    #[error("Game not ready: {0}")]
    NotReady(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Failures that clear up on their own; callers skip the cycle and retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::MemoryUnavailable(_)
                | Error::MemoryAccess { .. }
                | Error::DecodeDegraded { .. }
                | Error::NotReady(_)
        )
    }

    /// Build-time defects that must stop startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}
