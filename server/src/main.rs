use clap::Parser;
use log::{error, info};
use server::network::Server;
use std::time::Duration;

/// Authoritative two-player pong server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to bind the listener to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Port to listen on
    #[clap(short, long, default_value_t = 9090, env = "PORT")]
    port: u16,
    /// Simulation ticks per second
    #[clap(short, long, default_value_t = shared::UPDATE_FREQUENCY)]
    tick_rate: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let update_rate = Duration::from_secs(1) / args.tick_rate.max(1);

    // Bind failure is the one fatal startup error.
    let mut server = Server::new(&address, update_rate).await?;
    let shutdown = server.shutdown_handle();

    let mut server_task = tokio::spawn(async move { server.run().await });

    tokio::select! {
        result = &mut server_task => {
            if let Err(e) = result {
                error!("Server task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            let _ = shutdown.send(());
            let _ = server_task.await;
        }
    }

    Ok(())
}
