//! # Pong Game Server Library
//!
//! Authoritative server for a two-player networked pong match. The server
//! owns the single source of truth for ball, paddle and score state,
//! advances the physics on a fixed tick, and streams the resulting state to
//! both clients over a length-prefixed binary protocol (see the `shared`
//! crate for the wire format).
//!
//! ## Architecture
//!
//! Four kinds of tasks cooperate over two independently locked resources:
//!
//! - **Accept loop**: takes connections off the listener and hands each to
//!   its own handler task. Accept errors are logged and never stop the loop.
//! - **Read loops** (one per connection): decode inbound frames and apply
//!   them to the simulation. Any read or decode error ends that connection
//!   only; its player slot is released for the next client.
//! - **Tick driver**: the sole writer of simulation time. Once per update
//!   period it advances the physics and queues a state snapshot.
//! - **Broadcaster**: the sole consumer of the bounded outbound queue,
//!   writing each frame to every connected socket in FIFO order.
//!
//! The simulation aggregate ([`game::Game`]) and the connection slot table
//! ([`slots::SlotTable`]) each sit behind their own mutex so connection
//! churn never stalls the physics tick. No simulation lock is ever held
//! across network I/O.
//!
//! ## Lifecycle
//!
//! The game is created stopped, with paddles centered and scores at zero.
//! The first two clients to connect become players 1 and 2 (a third is
//! refused outright). Play begins the moment both players have signalled
//! ready, and continues until the process shuts down; scoring is unbounded
//! and never pauses the match.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 60 Hz tick rate.
//!     let mut server = Server::new("127.0.0.1:9090", Duration::from_millis(16)).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod slots;
