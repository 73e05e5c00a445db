//! Player-slot bookkeeping: which live connection currently owns player id
//! 1 or 2.
//!
//! The table holds the write half of each accepted connection so the
//! broadcaster can fan frames out to every socket. The server guards the
//! table with its own lock, separate from the simulation lock, so connection
//! churn never stalls the physics tick.

use log::error;
use std::collections::HashMap;
use std::io;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;

/// Maps player ids to connection write handles. At most two entries; a
/// given id maps to at most one connection at a time.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: HashMap<u8, OwnedWriteHalf>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Claims the lowest free player id (1, then 2) for `writer`. Returns
    /// None when both slots are taken, in which case the writer is dropped
    /// and the caller rejects the connection without sending anything.
    pub fn assign(&mut self, writer: OwnedWriteHalf) -> Option<u8> {
        let player_id = [1u8, 2].into_iter().find(|id| !self.slots.contains_key(id))?;
        self.slots.insert(player_id, writer);
        Some(player_id)
    }

    /// Frees a player's slot. Returns true if it was occupied.
    pub fn release(&mut self, player_id: u8) -> bool {
        self.slots.remove(&player_id).is_some()
    }

    /// Writes a frame to a single player's connection.
    pub async fn send_to(&mut self, player_id: u8, frame: &[u8]) -> io::Result<()> {
        match self.slots.get_mut(&player_id) {
            Some(writer) => writer.write_all(frame).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("no connection for player {}", player_id),
            )),
        }
    }

    /// Writes a frame to every live connection. A failing peer is logged
    /// and skipped; the remaining peers still receive the frame.
    pub async fn broadcast(&mut self, frame: &[u8]) {
        for (player_id, writer) in self.slots.iter_mut() {
            if let Err(e) = writer.write_all(frame).await {
                error!("Failed to send to player {}: {}", player_id, e);
            }
        }
    }

    /// Shuts down and drops every live connection. Safe to call more than
    /// once.
    pub async fn close_all(&mut self) {
        for writer in self.slots.values_mut() {
            let _ = writer.shutdown().await;
        }
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
