//! Length-prefixed framing for the control channel.
//!
//! Every message on the wire is a single frame:
//!
//! ```text
//! +--------+--------+---------------------------+
//! | len hi | len lo |  len bytes of payload     |
//! +--------+--------+---------------------------+
//! ```
//!
//! The length is an unsigned 16-bit big-endian integer, so a payload carries
//! at most 65,535 bytes. Nothing else in the crate touches the transport
//! except through [`read_frame`] and [`write_frame`].

use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 2;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Write `payload` as one frame.
///
/// Payloads longer than [`MAX_PAYLOAD`] are rejected with
/// `ErrorKind::InvalidInput` before any byte reaches the channel.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let len = u16::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "frame payload of {} bytes exceeds the {MAX_PAYLOAD} byte limit",
                payload.len()
            ),
        )
    })?;

    let mut frame = BytesMut::with_capacity(HEADER_LEN + payload.len());
    frame.put_u16(len);
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await
}

/// Read one frame and return its payload.
///
/// A zero-length frame yields an empty payload without touching the channel
/// again, since a zero-byte read is indistinguishable from end of stream.
/// The payload read loops until every declared byte has arrived; a channel
/// that closes early surfaces as `ErrorKind::UnexpectedEof`.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let len = reader.read_u16().await? as usize;
    if len == 0 {
        return Ok(Bytes::new());
    }

    let mut payload = BytesMut::zeroed(len);
    reader.read_exact(&mut payload).await?;
    Ok(payload.freeze())
}
