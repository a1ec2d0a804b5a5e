//! Unit Registry Service Error Hierarchy
//!
//! Defines the error types of the registry service, grouped by the layer
//! that raises them: infrastructure, configuration, registry, dispatch.
//! Every variant maps onto exactly one wire [`ErrorCode`] (see [`Error::code`]).

use std::net::SocketAddr;
use std::time::Duration;

use config::ConfigError;

use crate::control::ErrorCode;
use crate::registry::UnitId;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (network, serialization, io)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failures reported by the unit registry itself
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Malformed or unknown control requests
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A failure response received from a remote service
    #[error("Request rejected ({code:?}): {message}")]
    Rejected { code: ErrorCode, message: String },

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Detach/query referenced an id that is not attached
    #[error("Unit {unit_id} is not attached")]
    NotFound { unit_id: UnitId },

    /// No storage or id left for a new unit
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Teardown refused while units remain attached
    #[error("Registry busy: {attached} unit(s) still attached")]
    Busy { attached: usize },

    /// Registry has already been drained and released
    #[error("Registry is closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unsupported command code {code}")]
    UnsupportedCommand { code: u32 },

    #[error("Command {command} requires a unit argument")]
    MissingArgument { command: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Could not reach the control channel endpoint
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Round trip did not complete in time
    #[error("Request timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Peer announced a frame above the configured limit
    #[error("Frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// Peer closed the connection mid-exchange
    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("{0}")]
    SignalSendFailed(String),
}

// Serialization is classified separately (shared by server and client paths)
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Node failed to start: {0}")]
    NodeStartFailed(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl Error {
    /// Wire-level code reported to control channel callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Registry(RegistryError::NotFound { .. }) => ErrorCode::NotFound,
            Error::Registry(RegistryError::ResourceExhausted(_)) => ErrorCode::ResourceExhausted,
            Error::Registry(RegistryError::Busy { .. }) => ErrorCode::Busy,
            Error::Registry(RegistryError::Closed) => ErrorCode::Unavailable,
            Error::Dispatch(DispatchError::UnsupportedCommand { .. }) => ErrorCode::UnsupportedCommand,
            Error::Dispatch(DispatchError::MissingArgument { .. }) => ErrorCode::InvalidArgument,
            Error::System(SystemError::Serialization(_)) => ErrorCode::InvalidArgument,
            Error::Rejected { code, .. } => *code,
            Error::System(_) | Error::Config(_) | Error::Fatal(_) => ErrorCode::Internal,
        }
    }
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        SerializationError::Bincode(e).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::Io(e))
    }
}

impl From<prometheus::Error> for Error {
    fn from(e: prometheus::Error) -> Self {
        Error::System(SystemError::Metrics(e.to_string()))
    }
}
