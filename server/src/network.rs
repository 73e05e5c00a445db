//! TCP connection server: socket acceptance, slot assignment, the
//! fixed-rate tick driver and state fan-out.
//!
//! One task accepts connections, one task per connection decodes inbound
//! messages, one task advances the simulation at the update rate, and one
//! task drains the outbound queue onto every connected socket. The
//! simulation and the slot table are guarded by separate locks so
//! connection churn and physics never block each other, and no lock is
//! ever held across network I/O on the simulation side.

use crate::game::Game;
use crate::slots::SlotTable;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    decode_header, PlayerJoin, PlayerMove, PlayerReady, ProtocolError, HEADER_SIZE,
    MSG_PLAYER_MOVE, MSG_PLAYER_READY,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::interval;

/// Outbound queue depth in frames. Bounded so a stalled broadcaster applies
/// backpressure to the producers instead of growing without limit; state
/// frames are never dropped.
const BROADCAST_QUEUE_CAPACITY: usize = 100;

/// The authoritative game server: owns the listener, the simulation and the
/// connection slots.
pub struct Server {
    listener: TcpListener,
    game: Arc<Mutex<Game>>,
    slots: Arc<Mutex<SlotTable>>,
    update_rate: Duration,
    broadcast_tx: mpsc::Sender<Vec<u8>>,
    broadcast_rx: mpsc::Receiver<Vec<u8>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Binds the listening socket and builds the server around a fresh
    /// game. Bind failure is the one unrecoverable error; everything after
    /// this point is contained per connection.
    pub async fn new(
        addr: &str,
        update_rate: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_QUEUE_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(1);

        let game = Game::new(update_rate, StdRng::from_entropy());

        Ok(Server {
            listener,
            game: Arc::new(Mutex::new(game)),
            slots: Arc::new(Mutex::new(SlotTable::new())),
            update_rate,
            broadcast_tx,
            broadcast_rx,
            shutdown_tx,
        })
    }

    /// Address the listener actually bound to (useful when binding port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle that triggers the shutdown sequence from outside `run`:
    /// stops the accept loop, the tick driver, the broadcaster and every
    /// read loop, then closes all live connections.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Runs the server until the shutdown signal fires.
    pub async fn run(&mut self) {
        self.spawn_tick_driver();
        self.spawn_broadcaster();

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!("Server started");

        loop {
            tokio::select! {
                result = self.listener.accept() => match result {
                    Ok((stream, addr)) => self.spawn_connection_handler(stream, addr),
                    // Transient accept errors must not kill the server.
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                _ = shutdown_rx.recv() => break,
            }
        }

        info!("Server shutting down");
        self.slots.lock().await.close_all().await;
    }

    /// Spawns the task that advances the simulation once per update period
    /// and queues a state snapshot for broadcast. This is the only writer
    /// of simulation time.
    fn spawn_tick_driver(&self) {
        let game = Arc::clone(&self.game);
        let broadcast_tx = self.broadcast_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let update_rate = self.update_rate;

        tokio::spawn(async move {
            let mut ticker = interval(update_rate);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot = {
                            let mut game = game.lock().await;
                            game.update();
                            game.snapshot()
                        };

                        // Encoding happens outside the simulation lock. A
                        // full queue blocks this send until the broadcaster
                        // catches up; frames are not dropped.
                        if broadcast_tx.send(snapshot.encode()).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    /// Spawns the sole consumer of the outbound queue, fanning every frame
    /// out to all connected sockets in FIFO order.
    fn spawn_broadcaster(&mut self) {
        let slots = Arc::clone(&self.slots);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut broadcast_rx = std::mem::replace(&mut self.broadcast_rx, mpsc::channel(1).1);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = broadcast_rx.recv() => match frame {
                        Some(frame) => slots.lock().await.broadcast(&frame).await,
                        None => break,
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    /// Spawns the per-connection handler: slot handshake, then the read
    /// loop until the peer disconnects or errors.
    fn spawn_connection_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let game = Arc::clone(&self.game);
        let slots = Arc::clone(&self.slots);
        let broadcast_tx = self.broadcast_tx.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("New client connected: {}", addr);
            let (reader, writer) = stream.into_split();

            let player_id = match slots.lock().await.assign(writer) {
                Some(player_id) => player_id,
                None => {
                    // Both slots taken: close immediately, nothing sent.
                    info!("Connection refused, game is full: {}", addr);
                    return;
                }
            };

            // The client learns its id before its read loop starts.
            let join = PlayerJoin { player_id }.encode();
            if let Err(e) = slots.lock().await.send_to(player_id, &join).await {
                error!("Failed to send join message to player {}: {}", player_id, e);
                slots.lock().await.release(player_id);
                return;
            }

            info!("Player {} joined from {}", player_id, addr);

            read_loop(reader, player_id, &game, &broadcast_tx, shutdown_rx).await;

            slots.lock().await.release(player_id);
            info!("Player {} disconnected: {}", player_id, addr);
        });
    }
}

/// Decodes and applies inbound messages until the peer disconnects, a
/// protocol error occurs, or the server shuts down. Every error here is
/// fatal to this connection only.
async fn read_loop(
    mut reader: OwnedReadHalf,
    player_id: u8,
    game: &Arc<Mutex<Game>>,
    broadcast_tx: &mpsc::Sender<Vec<u8>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut header_buf = [0u8; HEADER_SIZE];

    loop {
        tokio::select! {
            result = reader.read_exact(&mut header_buf) => {
                if let Err(e) = result {
                    if e.kind() == io::ErrorKind::UnexpectedEof {
                        debug!("Player {} closed the connection", player_id);
                    } else {
                        error!("Read error from player {}: {}", player_id, e);
                    }
                    return;
                }

                let header = match decode_header(&header_buf) {
                    Ok(header) => header,
                    Err(e) => {
                        error!("Failed to decode header from player {}: {}", player_id, e);
                        return;
                    }
                };

                let mut payload = vec![0u8; header.length as usize];
                if let Err(e) = reader.read_exact(&mut payload).await {
                    error!("Failed to read message body from player {}: {}", player_id, e);
                    return;
                }

                if let Err(e) =
                    handle_message(player_id, header.msg_type, &payload, game, broadcast_tx).await
                {
                    error!("Protocol error from player {}: {}", player_id, e);
                    return;
                }
            }
            _ = shutdown_rx.recv() => return,
        }
    }
}

/// Applies one decoded client message to the simulation.
///
/// A message whose embedded player id does not match the sending
/// connection's assigned id is logged and dropped: the connection stays
/// open and the paddle does not move. A PlayerReady is re-broadcast verbatim
/// to all clients after it is applied.
async fn handle_message(
    player_id: u8,
    msg_type: u8,
    payload: &[u8],
    game: &Arc<Mutex<Game>>,
    broadcast_tx: &mpsc::Sender<Vec<u8>>,
) -> Result<(), ProtocolError> {
    match msg_type {
        MSG_PLAYER_MOVE => {
            let msg = PlayerMove::decode(payload)?;
            if msg.player_id != player_id {
                warn!(
                    "Player {} tried to move player {}'s paddle",
                    player_id, msg.player_id
                );
                return Ok(());
            }
            game.lock().await.move_paddle(msg.player_id, msg.direction);
        }
        MSG_PLAYER_READY => {
            let msg = PlayerReady::decode(payload)?;
            if msg.player_id != player_id {
                warn!(
                    "Player {} tried to set player {}'s ready state",
                    player_id, msg.player_id
                );
                return Ok(());
            }
            game.lock().await.set_player_ready(msg.player_id, msg.ready == 1);
            // Relay the ready signal to both clients.
            let _ = broadcast_tx.send(msg.encode()).await;
        }
        other => return Err(ProtocolError::UnknownMessageType(other)),
    }

    Ok(())
}
