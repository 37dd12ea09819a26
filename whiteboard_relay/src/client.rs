use tokio::net::{
    TcpStream, ToSocketAddrs,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::{
    codec::{self, DEFAULT_MAX_FRAME_BYTES},
    error::{RelayError, Result},
    shared_types::{DrawingEvent, Message},
};

/// Network side of a drawing client.
///
/// The relay always opens with an `init` replay, which `connect` consumes and
/// keeps in [`history`](Self::history); everything after that arrives through
/// [`recv`](Self::recv).
pub struct RelayClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    history: Vec<DrawingEvent>,
    max_frame_bytes: u64,
}

impl RelayClient {
    /// Connect with the default frame cap of [`DEFAULT_MAX_FRAME_BYTES`].
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::connect_with_limit(addr, DEFAULT_MAX_FRAME_BYTES).await
    }

    /// Connect, refusing any frame (the `init` replay included) larger than
    /// `max_frame_bytes`.
    pub async fn connect_with_limit<A: ToSocketAddrs>(
        addr: A,
        max_frame_bytes: u64,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (mut reader, writer) = stream.into_split();

        let history = match codec::read_message(&mut reader, max_frame_bytes).await? {
            Some(Message::Init(events)) => events,
            Some(Message::Drawing(_)) => {
                return Err(RelayError::Protocol(
                    "relay sent a drawing before init".to_string(),
                ));
            }
            None => {
                return Err(RelayError::Protocol(
                    "relay closed the connection before init".to_string(),
                ));
            }
        };

        Ok(Self {
            reader,
            writer,
            history,
            max_frame_bytes,
        })
    }

    /// Events replayed by the relay when this client connected.
    pub fn history(&self) -> &[DrawingEvent] {
        &self.history
    }

    pub async fn send(&mut self, event: DrawingEvent) -> Result<()> {
        codec::write_message(&mut self.writer, &Message::Drawing(event)).await?;
        Ok(())
    }

    /// Next message from the relay, or `None` once it hangs up.
    pub async fn recv(&mut self) -> Result<Option<Message>> {
        Ok(codec::read_message(&mut self.reader, self.max_frame_bytes).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use tokio::{io::AsyncWriteExt, net::TcpListener};

    /// Accept one connection and write `bytes` to it.
    async fn fake_relay(bytes: Vec<u8>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // The client may hang up before everything is written.
            let _ = stream.write_all(&bytes).await;
            // Hold the socket open until the client gives up.
            let mut sink = Vec::new();
            let _ = tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut sink).await;
        });
        addr
    }

    #[tokio::test]
    async fn oversized_init_header_is_refused() {
        let addr = fake_relay(b"9999999999".to_vec()).await;
        let err = RelayClient::connect(addr).await.err().unwrap();
        assert!(matches!(
            err,
            RelayError::Codec(CodecError::FrameTooLarge {
                len: 9_999_999_999,
                max: DEFAULT_MAX_FRAME_BYTES,
            })
        ));
    }

    #[tokio::test]
    async fn raised_limit_admits_a_large_replay() {
        let events: Vec<DrawingEvent> = (0..64)
            .map(|i| DrawingEvent::line((i, i), (i, i), "x".repeat(1024), 1))
            .collect();
        let frame = codec::encode(&Message::Init(events.clone())).unwrap();
        let len = frame.len() as u64;

        let addr = fake_relay(frame.to_vec()).await;
        let err = RelayClient::connect_with_limit(addr, 1024).await.err().unwrap();
        assert!(matches!(
            err,
            RelayError::Codec(CodecError::FrameTooLarge { max: 1024, .. })
        ));

        let addr = fake_relay(frame.to_vec()).await;
        let client = RelayClient::connect_with_limit(addr, len).await.unwrap();
        assert_eq!(client.history(), events.as_slice());
    }

    #[tokio::test]
    async fn drawing_before_init_is_a_protocol_error() {
        let frame = codec::encode(&Message::Drawing(DrawingEvent::Clear)).unwrap();
        let addr = fake_relay(frame.to_vec()).await;
        let err = RelayClient::connect(addr).await.err().unwrap();
        assert!(matches!(err, RelayError::Protocol(_)));
    }
}
