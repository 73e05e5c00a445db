//! Minimal headless client for poking a running server: connects, reports
//! the assigned player id, flags itself ready, then chases the ball and
//! prints a state line once a second.
//!
//! Run two of these against one server to watch a full match from the
//! terminal:
//!
//! ```text
//! cargo run --bin probe_client -- 127.0.0.1:9090
//! ```

use shared::{
    decode_header, GameState, PlayerJoin, PlayerMove, PlayerReady, HEADER_SIZE, MSG_GAME_STATE,
    MSG_PLAYER_JOIN, MSG_PLAYER_READY, PADDLE_HEIGHT, UPDATE_FREQUENCY,
};
use std::error::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9090".to_string());

    println!("Connecting to {}", addr);
    let mut stream = TcpStream::connect(&addr).await?;

    // Snapshots may already be streaming before the join frame arrives.
    let player_id = loop {
        let (msg_type, payload) = read_frame(&mut stream).await?;
        if msg_type == MSG_PLAYER_JOIN {
            break PlayerJoin::decode(&payload)?.player_id;
        }
    };
    println!("Assigned player id {}", player_id);

    stream
        .write_all(&PlayerReady { player_id, ready: 1 }.encode())
        .await?;
    println!("Ready signal sent, waiting for the game to start");

    let mut frames = 0u32;
    loop {
        let (msg_type, payload) = read_frame(&mut stream).await?;
        match msg_type {
            MSG_GAME_STATE => {
                let state = GameState::decode(&payload)?;
                frames += 1;
                if frames % UPDATE_FREQUENCY == 0 {
                    println!(
                        "ball ({:6.1}, {:6.1})  p1 {:5.1} [{}]  p2 {:5.1} [{}]  running={}",
                        state.ball_x,
                        state.ball_y,
                        state.player1_y,
                        state.player1_score,
                        state.player2_y,
                        state.player2_score,
                        state.is_running,
                    );
                }

                if state.is_running == 1 {
                    let my_y = if player_id == 1 {
                        state.player1_y
                    } else {
                        state.player2_y
                    };
                    let direction = if state.ball_y < my_y + PADDLE_HEIGHT / 2.0 {
                        -1
                    } else {
                        1
                    };
                    stream
                        .write_all(&PlayerMove { player_id, direction }.encode())
                        .await?;
                }
            }
            MSG_PLAYER_READY => {
                let ready = PlayerReady::decode(&payload)?;
                println!("Player {} ready = {}", ready.player_id, ready.ready);
            }
            other => println!("Unexpected message type {}", other),
        }
    }
}

async fn read_frame(stream: &mut TcpStream) -> Result<(u8, Vec<u8>), Box<dyn Error>> {
    let mut header_buf = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header_buf).await?;
    let header = decode_header(&header_buf)?;

    let mut payload = vec![0u8; header.length as usize];
    stream.read_exact(&mut payload).await?;
    Ok((header.msg_type, payload))
}
