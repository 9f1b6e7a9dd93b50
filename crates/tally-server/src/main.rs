//! Planning poker server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tally-server
//! cargo run --bin tally-server -- --host 0.0.0.0 --port 3000 --log-level debug
//! ```

mod logger;

use std::time::Duration;

use clap::Parser;
use tally::prelude::*;

use crate::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tally-server")]
#[command(about = "Real-time planning poker server over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Close connections that send nothing for this many seconds
    #[arg(long, default_value = "30")]
    idle_timeout_secs: u64,

    /// Keep rooms alive after their last participant leaves
    #[arg(long)]
    keep_empty_rooms: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn builder(&self) -> TallyServerBuilder {
        TallyServer::builder()
            .bind(format!("{}:{}", self.host, self.port))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .room_config(RoomConfig {
                reap_empty_rooms: !self.keep_empty_rooms,
                ..RoomConfig::default()
            })
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger(&args.log_level);

    let server = match args.builder().build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
