//! Control channel messages.
//!
//! A request travels as a [`RawCommand`]: a numeric command code plus an
//! optional unit argument, the shape a front end can produce without knowing
//! the typed API. The dispatcher turns it into a [`Request`]; anything it
//! cannot turn into one is answered with a failure [`Response`].

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::registry::UnitId;
use crate::DispatchError;
use crate::Error;

pub const CMD_ATTACH: u32 = 1;
pub const CMD_DETACH: u32 = 2;
pub const CMD_QUERY: u32 = 3;
pub const CMD_LIST: u32 = 4;
pub const CMD_SHUTDOWN: u32 = 5;

/// Untyped request as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommand {
    pub code: u32,
    pub unit: Option<UnitId>,
}

/// A well-formed request, one arm per command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Attach,
    Detach(UnitId),
    Query(UnitId),
    List,
    Shutdown,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Attach => "ATTACH",
            Request::Detach(_) => "DETACH",
            Request::Query(_) => "QUERY",
            Request::List => "LIST",
            Request::Shutdown => "SHUTDOWN",
        }
    }
}

impl TryFrom<RawCommand> for Request {
    type Error = DispatchError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let unit = |command: &'static str| raw.unit.ok_or(DispatchError::MissingArgument { command });

        match raw.code {
            CMD_ATTACH => Ok(Request::Attach),
            CMD_DETACH => Ok(Request::Detach(unit("DETACH")?)),
            CMD_QUERY => Ok(Request::Query(unit("QUERY")?)),
            CMD_LIST => Ok(Request::List),
            CMD_SHUTDOWN => Ok(Request::Shutdown),
            code => Err(DispatchError::UnsupportedCommand { code }),
        }
    }
}

impl From<Request> for RawCommand {
    fn from(request: Request) -> Self {
        let (code, unit) = match request {
            Request::Attach => (CMD_ATTACH, None),
            Request::Detach(unit) => (CMD_DETACH, Some(unit)),
            Request::Query(unit) => (CMD_QUERY, Some(unit)),
            Request::List => (CMD_LIST, None),
            Request::Shutdown => (CMD_SHUTDOWN, None),
        };
        RawCommand { code, unit }
    }
}

/// Failure codes visible to control channel callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    UnsupportedCommand,
    InvalidArgument,
    Busy,
    ResourceExhausted,
    /// Registry already drained and torn down
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NotFound",
            ErrorCode::UnsupportedCommand => "UnsupportedCommand",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::Busy => "Busy",
            ErrorCode::ResourceExhausted => "ResourceExhausted",
            ErrorCode::Unavailable => "Unavailable",
            ErrorCode::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outcome per request; there are no partial results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Success without payload (DETACH, QUERY, SHUTDOWN)
    Done,
    /// Newly allocated unit id (ATTACH)
    Attached(UnitId),
    /// Attached ids, most recent first (LIST)
    Units(Vec<UnitId>),
    Failed { code: ErrorCode, message: String },
}

impl Response {
    pub fn from_error(error: &Error) -> Self {
        Response::Failed {
            code: error.code(),
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Failed { .. })
    }

    /// Metrics label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            Response::Failed { code, .. } => code.as_str(),
            _ => "ok",
        }
    }
}
