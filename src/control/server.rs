use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::debug;
use tracing::warn;

use super::read_frame;
use super::write_frame;
use super::RawCommand;
use super::Response;
use crate::CommandDispatcher;
use crate::Error;
use crate::NetworkError;
use crate::SystemError;
use crate::UnitStore;

/// Serves one control connection until the peer hangs up.
///
/// A frame that cannot be decoded into a [`RawCommand`] is answered with an
/// `InvalidArgument` failure, after which the connection is dropped: framing
/// can no longer be trusted.
pub(crate) async fn serve_connection<S>(
    mut stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<CommandDispatcher<S>>,
    max_frame_bytes: usize,
) where
    S: UnitStore,
{
    debug!(%peer, "control connection opened");

    loop {
        let command = match read_frame::<_, RawCommand>(&mut stream, max_frame_bytes).await {
            Ok(Some(command)) => command,
            Ok(None) => break,
            Err(e @ Error::System(SystemError::Serialization(_)))
            | Err(e @ Error::System(SystemError::Network(NetworkError::FrameTooLarge { .. }))) => {
                warn!(%peer, "rejecting malformed request: {}", e);
                let response = Response::Failed {
                    code: crate::ErrorCode::InvalidArgument,
                    message: e.to_string(),
                };
                if let Err(e) = write_frame(&mut stream, &response, max_frame_bytes).await {
                    debug!(%peer, "failed to write rejection: {}", e);
                }
                break;
            }
            Err(e) => {
                debug!(%peer, "control connection failed: {}", e);
                break;
            }
        };

        let response = dispatcher.dispatch(command);
        match write_frame(&mut stream, &response, max_frame_bytes).await {
            Ok(()) => {}
            Err(e @ Error::System(SystemError::Network(NetworkError::FrameTooLarge { .. }))) => {
                // Nothing was written yet, so the caller can still be told
                warn!(%peer, "response does not fit in a frame: {}", e);
                let failure = Response::from_error(&Error::Fatal(e.to_string()));
                if let Err(e) = write_frame(&mut stream, &failure, max_frame_bytes).await {
                    debug!(%peer, "failed to write oversize failure: {}", e);
                    break;
                }
            }
            Err(e) => {
                warn!(%peer, "failed to write response: {}", e);
                break;
            }
        }
    }

    debug!(%peer, "control connection closed");
}
