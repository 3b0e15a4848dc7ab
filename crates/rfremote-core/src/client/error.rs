use thiserror::Error;

use crate::resolver::ResolveError;
use crate::suite::DiscoveryError;

/// Errors that can occur on the client side of a remote run.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No test suites found in the given paths")]
    NoSuitesFound,

    #[error("Suite discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Dependency resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Cannot determine absolute path: {0}")]
    Path(#[source] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Agent returned fault: {status} - {message}")]
    Fault { status: u16, message: String },

    #[error("Invalid agent address: '{0}'")]
    InvalidAddress(String),
}
