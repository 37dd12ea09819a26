// Length-prefixed JSON framing for the whiteboard wire protocol.
//
// A frame is a 10-byte ASCII decimal length, left-justified and padded with
// spaces, followed by exactly that many bytes of UTF-8 JSON. Encoding produces
// a shared `Bytes` so one broadcast serializes the message once no matter how
// many peers receive it.

use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{error::CodecError, shared_types::Message};

/// Width of the ASCII length header.
pub const HEADER_LEN: usize = 10;

/// Largest payload length that can be written in a 10-digit header.
pub const MAX_HEADER_VALUE: u64 = 9_999_999_999;

/// Default cap on a single frame read from the wire (16 MiB). The relay only
/// receives single events; clients receive `init` replays and can raise the
/// cap with [`RelayClient::connect_with_limit`](crate::RelayClient::connect_with_limit).
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 16 * 1024 * 1024;

/// Render the length header for a payload of `len` bytes.
pub fn encode_header(len: u64) -> Result<[u8; HEADER_LEN], CodecError> {
    if len > MAX_HEADER_VALUE {
        return Err(CodecError::PayloadTooLarge(len));
    }
    let text = format!("{:<width$}", len, width = HEADER_LEN);
    let mut header = [b' '; HEADER_LEN];
    header.copy_from_slice(text.as_bytes());
    Ok(header)
}

/// Parse a length header. Surrounding ASCII whitespace is ignored; the value
/// must be a positive integer.
pub fn parse_header(header: &[u8]) -> Result<u64, CodecError> {
    let invalid = || CodecError::InvalidHeader(String::from_utf8_lossy(header).into_owned());
    let text = std::str::from_utf8(header).map_err(|_| invalid())?;
    let digits = text.trim_matches(|c: char| c.is_ascii_whitespace());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let len: u64 = digits.parse().map_err(|_| invalid())?;
    if len == 0 {
        return Err(CodecError::EmptyFrame);
    }
    Ok(len)
}

/// Serialize a message into a complete frame.
pub fn encode(msg: &Message) -> Result<Bytes, CodecError> {
    let payload = serde_json::to_vec(msg)?;
    let header = encode_header(payload.len() as u64)?;

    let mut frame = BytesMut::with_capacity(HEADER_LEN + payload.len());
    frame.put_slice(&header);
    frame.put_slice(&payload);
    Ok(frame.freeze())
}

/// Decode one message from exactly one frame held in memory.
///
/// The buffer must end where the header says the payload ends: missing bytes
/// are `Truncated`, extra bytes are `TrailingBytes`.
pub fn decode(frame: &[u8]) -> Result<Message, CodecError> {
    if frame.len() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    let (header, payload) = frame.split_at(HEADER_LEN);
    let len = parse_header(header)?;
    let actual = payload.len() as u64;
    if actual < len {
        return Err(CodecError::Truncated);
    }
    if actual > len {
        return Err(CodecError::TrailingBytes(actual - len));
    }
    Ok(serde_json::from_slice(payload)?)
}

/// Read the next message from a byte stream.
///
/// Partial reads are accumulated until a whole frame is available. Returns
/// `Ok(None)` when the stream closes cleanly on a frame boundary and
/// `CodecError::Truncated` when it closes anywhere else.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_frame_bytes: u64,
) -> Result<Option<Message>, CodecError> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(CodecError::Truncated)
            };
        }
        filled += n;
    }

    let len = parse_header(&header)?;
    if len > max_frame_bytes {
        return Err(CodecError::FrameTooLarge {
            len,
            max: max_frame_bytes,
        });
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::Truncated
        } else {
            CodecError::Io(e)
        }
    })?;

    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Encode and write one message, flushing the writer.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &Message,
) -> Result<(), CodecError> {
    let frame = encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
