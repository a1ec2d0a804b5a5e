//! Length-prefixed framing: a big-endian `u32` payload length followed by a
//! bincode payload. Both directions enforce the same size limit.

use std::io;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::NetworkError;
use crate::Result;

pub async fn write_frame<W, T>(
    writer: &mut W,
    message: &T,
    max_frame_bytes: usize,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(message)?;
    if payload.len() > max_frame_bytes {
        return Err(NetworkError::FrameTooLarge {
            len: payload.len(),
            max: max_frame_bytes,
        }
        .into());
    }

    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means the peer closed cleanly between frames.
pub async fn read_frame<R, T>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if len > max_frame_bytes {
        return Err(NetworkError::FrameTooLarge {
            len,
            max: max_frame_bytes,
        }
        .into());
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => NetworkError::ConnectionClosed.into(),
        _ => crate::Error::from(e),
    })?;

    Ok(Some(bincode::deserialize(&payload)?))
}
