use nanoid::nanoid;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::AsyncRead,
    net::{TcpListener, TcpStream},
    sync::Mutex,
};
use tracing::{debug, info, warn};

use crate::{
    codec,
    config::RelayConfig,
    connection::{self, ConnectionHandle, ConnectionOptions},
    drawing_log::DrawingLog,
    error::{Closed, RelayError, Result},
    registry::SessionRegistry,
    shared_types::{DrawingEvent, Message},
};

/// The drawing history and the peers it is broadcast to.
///
/// Both live behind one lock so that appending an event and fanning it out is
/// a single step: every peer sees events in log order, and a newcomer's replay
/// agrees with what the others have already drawn.
#[derive(Debug, Default)]
struct Board {
    log: DrawingLog,
    sessions: SessionRegistry,
}

#[derive(Debug, Default)]
struct Shared {
    board: Mutex<Board>,
}

impl Shared {
    /// Replay history to a newcomer and register it, as one step.
    ///
    /// Holding the lock across both means no event can land between the
    /// snapshot and registration and be missed by the newcomer.
    async fn admit(&self, handle: ConnectionHandle) -> std::result::Result<usize, Closed> {
        let mut board = self.board.lock().await;
        if board.sessions.contains(handle.id()) {
            warn!(id = %handle.id(), "connection id already registered");
            return Err(Closed);
        }
        let history = board.log.snapshot();
        let replayed = history.len();
        handle.send(&Message::Init(history))?;
        if !board.sessions.add(handle) {
            return Err(Closed);
        }
        Ok(replayed)
    }

    /// Record an event and forward it to every peer except its origin.
    async fn apply(&self, origin: &ConnectionHandle, event: DrawingEvent) {
        let frame = match codec::encode(&Message::Drawing(event.clone())) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(id = %origin.id(), "dropping event that cannot be re-encoded: {e}");
                return;
            }
        };

        let mut board = self.board.lock().await;
        board.log.apply(event);
        let dead = board
            .sessions
            .for_each_except(origin.id(), |peer| peer.send_frame(frame.clone()));

        for id in dead {
            if let Some(peer) = board.sessions.remove(&id) {
                warn!(id = %id, peer = %peer.peer(), "dropping unresponsive peer");
                peer.close();
            }
        }
    }

    async fn depart(&self, handle: &ConnectionHandle) {
        self.board.lock().await.sessions.remove(handle.id());
    }
}

/// Read-only view of a running relay.
#[derive(Clone, Debug)]
pub struct RelayHandle {
    shared: Arc<Shared>,
}

impl RelayHandle {
    /// The events a connection accepted right now would be replayed.
    pub async fn history(&self) -> Vec<DrawingEvent> {
        self.shared.board.lock().await.log.snapshot()
    }

    pub async fn session_count(&self) -> usize {
        self.shared.board.lock().await.sessions.len()
    }
}

pub struct RelayServer {
    listener: TcpListener,
    shared: Arc<Shared>,
    options: ConnectionOptions,
    max_frame_bytes: u64,
}

impl RelayServer {
    /// Bind the listening socket. Failure here is fatal for the process.
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| RelayError::Bind {
                addr: config.bind_addr(),
                source,
            })?;

        Ok(Self {
            listener,
            shared: Arc::new(Shared::default()),
            options: config.connection_options(),
            max_frame_bytes: config.max_frame_bytes,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            shared: self.shared.clone(),
        }
    }

    /// Accept connections forever, one task per connection.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let shared = self.shared.clone();
                    let options = self.options;
                    let max_frame_bytes = self.max_frame_bytes;
                    tokio::spawn(async move {
                        handle_connection(stream, peer, shared, options, max_frame_bytes).await;
                    });
                }
                Err(e) => {
                    // Usually descriptor exhaustion; back off instead of spinning.
                    warn!("accept failed: {e}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

/// The full lifecycle of a single peer: replay, register, relay, tear down.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
    options: ConnectionOptions,
    max_frame_bytes: u64,
) {
    let id = nanoid!(10);
    info!(id = %id, peer = %peer, "connected");

    if let Err(e) = stream.set_nodelay(true) {
        debug!(id = %id, "could not disable Nagle: {e}");
    }

    let (reader, writer) = stream.into_split();
    let (handle, outbound) = connection::open(id.clone(), peer, writer, options);

    // Task that owns the socket's write half.
    let mut send_task = tokio::spawn(outbound.run());

    match shared.admit(handle.clone()).await {
        Ok(replayed) => debug!(id = %id, replayed, "sent init"),
        Err(Closed) => {
            warn!(id = %id, peer = %peer, "could not send init, abandoning connection");
            send_task.abort();
            return;
        }
    }

    // Task that decodes and applies everything this peer draws.
    let mut recv_task = tokio::spawn(read_loop(
        reader,
        handle.clone(),
        shared.clone(),
        max_frame_bytes,
    ));

    // Whichever side ends first takes the other down with it.
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
        _ = handle.closed() => {
            recv_task.abort();
            send_task.abort();
        }
    };

    shared.depart(&handle).await;
    info!(id = %id, peer = %peer, "disconnected");
}

async fn read_loop<R>(
    mut reader: R,
    handle: ConnectionHandle,
    shared: Arc<Shared>,
    max_frame_bytes: u64,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match codec::read_message(&mut reader, max_frame_bytes).await {
            Ok(Some(Message::Drawing(event))) => {
                debug!(id = %handle.id(), ?event, "drawing");
                shared.apply(&handle, event).await;
            }
            Ok(Some(Message::Init(_))) => {
                warn!(id = %handle.id(), "ignoring init sent by a client");
            }
            Ok(None) => break,
            Err(e) => {
                warn!(id = %handle.id(), "closing connection: {e}");
                break;
            }
        }
    }
}
