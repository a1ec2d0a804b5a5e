use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use super::read_frame;
use super::write_frame;
use super::RawCommand;
use super::Request;
use super::Response;
use crate::registry::UnitId;
use crate::ControlConfig;
use crate::Error;
use crate::NetworkError;
use crate::Result;

/// Client side of the control channel.
///
/// Every call is one request/response exchange bounded by the configured
/// timeout. Failure responses surface as [`Error::Rejected`].
///
/// A timed-out or failed exchange may leave a late reply in the socket, so
/// the client is then marked broken and every later call fails with
/// `ConnectionClosed`. Reconnect to continue.
pub struct ControlClient {
    stream: TcpStream,
    timeout: Duration,
    max_frame_bytes: usize,
    broken: bool,
}

impl ControlClient {
    pub async fn connect(
        addr: SocketAddr,
        request_timeout: Duration,
    ) -> Result<Self> {
        let stream = match timeout(request_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(NetworkError::Connect { addr, source }.into()),
            Err(_) => {
                return Err(NetworkError::Timeout {
                    duration: request_timeout,
                }
                .into())
            }
        };
        stream.set_nodelay(true)?;
        debug!(%addr, "connected to control channel");

        Ok(Self {
            stream,
            timeout: request_timeout,
            max_frame_bytes: ControlConfig::default().max_frame_bytes,
            broken: false,
        })
    }

    pub fn with_max_frame_bytes(
        mut self,
        max_frame_bytes: usize,
    ) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Sends a raw command and returns the response as received, failure
    /// responses included.
    pub async fn send(
        &mut self,
        command: RawCommand,
    ) -> Result<Response> {
        if self.broken {
            return Err(NetworkError::ConnectionClosed.into());
        }

        let max = self.max_frame_bytes;
        let stream = &mut self.stream;
        let exchange = async move {
            write_frame(stream, &command, max).await?;
            read_frame::<_, Response>(stream, max)
                .await?
                .ok_or_else(|| Error::from(NetworkError::ConnectionClosed))
        };

        let result = match timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout { duration: self.timeout }.into()),
        };
        if let Err(e) = &result {
            warn!("control exchange failed, dropping connection state: {}", e);
            self.broken = true;
        }
        result
    }

    async fn call(
        &mut self,
        request: Request,
    ) -> Result<Response> {
        match self.send(request.into()).await? {
            Response::Failed { code, message } => Err(Error::Rejected { code, message }),
            response => Ok(response),
        }
    }

    pub async fn attach(&mut self) -> Result<UnitId> {
        match self.call(Request::Attach).await? {
            Response::Attached(unit) => Ok(unit),
            other => Err(self.unexpected("ATTACH", other)),
        }
    }

    pub async fn detach(
        &mut self,
        unit: UnitId,
    ) -> Result<()> {
        let response = self.call(Request::Detach(unit)).await?;
        self.expect_done("DETACH", response)
    }

    pub async fn query(
        &mut self,
        unit: UnitId,
    ) -> Result<()> {
        let response = self.call(Request::Query(unit)).await?;
        self.expect_done("QUERY", response)
    }

    pub async fn list(&mut self) -> Result<Vec<UnitId>> {
        match self.call(Request::List).await? {
            Response::Units(units) => Ok(units),
            other => Err(self.unexpected("LIST", other)),
        }
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        let response = self.call(Request::Shutdown).await?;
        self.expect_done("SHUTDOWN", response)
    }

    fn expect_done(
        &mut self,
        command: &str,
        response: Response,
    ) -> Result<()> {
        match response {
            Response::Done => Ok(()),
            other => Err(self.unexpected(command, other)),
        }
    }

    /// A reply of the wrong kind means request and response streams are out
    /// of step; the connection is not reused.
    fn unexpected(
        &mut self,
        command: &str,
        response: Response,
    ) -> Error {
        self.broken = true;
        Error::Fatal(format!("unexpected response to {command}: {response:?}"))
    }
}
