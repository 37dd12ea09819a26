use bytes::Bytes;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{
        Notify,
        mpsc::{self, error::TrySendError},
    },
    time::timeout,
};
use tracing::{debug, warn};

use crate::{codec, error::Closed, shared_types::Message};

pub type ConnectionId = String;

/// Per-connection write limits.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    /// Frames that may wait for a slow peer before it is dropped.
    pub queue_capacity: usize,
    /// Upper bound on a single socket write.
    pub send_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// The relay's side of one connected peer.
///
/// Cloning is cheap: every clone feeds the same bounded outbound queue, and the
/// queue is drained by a single [`OutboundWriter`], so frames handed to `send`
/// from different tasks are written whole and in enqueue order. `send` never
/// waits on the socket: a full queue means the peer has fallen too far behind
/// and is reported as [`Closed`].
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
    outbound: mpsc::Sender<Bytes>,
    shutdown: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Encode and queue a message for this peer.
    pub fn send(&self, msg: &Message) -> Result<(), Closed> {
        let frame = codec::encode(msg).map_err(|e| {
            warn!(id = %self.id, "could not encode message: {e}");
            Closed
        })?;
        self.send_frame(frame)
    }

    /// Queue an already encoded frame for this peer.
    pub fn send_frame(&self, frame: Bytes) -> Result<(), Closed> {
        match self.outbound.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(id = %self.id, peer = %self.peer, "outbound queue full, peer is too slow");
                Err(Closed)
            }
            Err(TrySendError::Closed(_)) => Err(Closed),
        }
    }

    /// Ask the task serving this connection to tear it down.
    pub fn close(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves once [`close`](Self::close) has been called on any clone.
    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Drains a connection's outbound queue into its socket.
pub struct OutboundWriter<W> {
    id: ConnectionId,
    frames: mpsc::Receiver<Bytes>,
    writer: W,
    send_timeout: Duration,
}

/// Pair a socket write half with a fresh handle and the writer that serves it.
pub fn open<W>(
    id: ConnectionId,
    peer: SocketAddr,
    writer: W,
    options: ConnectionOptions,
) -> (ConnectionHandle, OutboundWriter<W>)
where
    W: AsyncWrite + Unpin,
{
    let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
    let handle = ConnectionHandle {
        id: id.clone(),
        peer,
        outbound: tx,
        shutdown: Arc::new(Notify::new()),
    };
    let writer = OutboundWriter {
        id,
        frames: rx,
        writer,
        send_timeout: options.send_timeout,
    };
    (handle, writer)
}

impl<W: AsyncWrite + Unpin> OutboundWriter<W> {
    /// Write queued frames until every handle is dropped or the socket fails.
    /// A write that outlasts the send timeout counts as a failure.
    pub async fn run(mut self) {
        while let Some(frame) = self.frames.recv().await {
            match timeout(self.send_timeout, self.writer.write_all(&frame)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(id = %self.id, "write failed: {e}");
                    break;
                }
                Err(_) => {
                    warn!(id = %self.id, "write stalled for {:?}", self.send_timeout);
                    break;
                }
            }
        }
        // Refuse further frames before the socket goes away.
        self.frames.close();
        let _ = self.writer.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_types::DrawingEvent;
    use tokio::io::AsyncReadExt;

    fn peer() -> SocketAddr {
        "127.0.0.1:5000".parse().unwrap()
    }

    #[tokio::test]
    async fn writer_delivers_frames_in_queue_order() {
        let (local, mut remote) = tokio::io::duplex(4096);
        let (handle, writer) = open("a".into(), peer(), local, ConnectionOptions::default());
        let task = tokio::spawn(writer.run());

        let first = Message::Drawing(DrawingEvent::line((0, 0), (1, 1), "red", 1));
        let second = Message::Drawing(DrawingEvent::Clear);
        handle.send(&first).unwrap();
        handle.send(&second).unwrap();
        drop(handle);
        task.await.unwrap();

        let mut received = Vec::new();
        remote.read_to_end(&mut received).await.unwrap();
        let mut expected = codec::encode(&first).unwrap().to_vec();
        expected.extend_from_slice(&codec::encode(&second).unwrap());
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn full_queue_reports_closed() {
        let (local, _remote) = tokio::io::duplex(64);
        let options = ConnectionOptions {
            queue_capacity: 1,
            ..ConnectionOptions::default()
        };
        // Writer is never started, so the queue cannot drain.
        let (handle, _writer) = open("slow".into(), peer(), local, options);

        let msg = Message::Drawing(DrawingEvent::Clear);
        assert_eq!(handle.send(&msg), Ok(()));
        assert_eq!(handle.send(&msg), Err(Closed));
    }

    #[tokio::test]
    async fn send_after_writer_exit_reports_closed() {
        let (local, remote) = tokio::io::duplex(64);
        let (handle, writer) = open("gone".into(), peer(), local, ConnectionOptions::default());
        drop(remote);

        let task = tokio::spawn(writer.run());
        let msg = Message::Drawing(DrawingEvent::Clear);
        // First frame fails on the broken pipe and stops the writer.
        let _ = handle.send(&msg);
        task.await.unwrap();

        assert!(handle.is_closed());
        assert_eq!(handle.send(&msg), Err(Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_times_out() {
        // A tiny pipe that nobody reads fills after a few bytes.
        let (local, _remote) = tokio::io::duplex(8);
        let options = ConnectionOptions {
            queue_capacity: 4,
            send_timeout: Duration::from_millis(50),
        };
        let (handle, writer) = open("stuck".into(), peer(), local, options);
        let task = tokio::spawn(writer.run());

        handle
            .send(&Message::Drawing(DrawingEvent::line((0, 0), (9, 9), "blue", 3)))
            .unwrap();
        task.await.unwrap();
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn close_wakes_the_waiter() {
        let (local, _remote) = tokio::io::duplex(64);
        let (handle, _writer) = open("c".into(), peer(), local, ConnectionOptions::default());
        let other = handle.clone();
        other.close();
        tokio::time::timeout(Duration::from_secs(1), handle.closed())
            .await
            .unwrap();
    }
}
