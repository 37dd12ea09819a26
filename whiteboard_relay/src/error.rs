use std::io;
use thiserror::Error;

/// Failures while turning bytes into messages or messages into frames.
///
/// Every decode-side variant is terminal for the connection that produced it.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("stream closed in the middle of a frame")]
    Truncated,

    #[error("invalid length header {0:?}")]
    InvalidHeader(String),

    #[error("{0} bytes follow the end of the frame")]
    TrailingBytes(u64),

    #[error("length header announced an empty frame")]
    EmptyFrame,

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u64, max: u64 },

    #[error("payload of {0} bytes does not fit the length header")]
    PayloadTooLarge(u64),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Returned by a connection handle once its peer can no longer be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("connection closed")]
pub struct Closed;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, RelayError>;
