use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use zkv::{KvServer, ServerConfig};

/// In-memory key-value server
#[derive(Parser, Debug)]
#[command(name = "zkv-server")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 1234)]
    port: u16,

    /// Close connections idle for this many milliseconds
    #[arg(long, default_value_t = 5000)]
    idle_timeout_ms: u64,

    /// Largest request or response payload in bytes
    #[arg(long, default_value_t = 32 << 20)]
    max_message_size: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig::builder()
        .host(args.host)
        .port(args.port)
        .idle_timeout(Duration::from_millis(args.idle_timeout_ms))
        .max_message_size(args.max_message_size)
        .build();

    let addr = config.addr();
    let mut server = KvServer::new(config).with_context(|| format!("failed to bind {}", addr))?;
    if let Err(e) = server.run() {
        log::error!("Server error: {}", e);
        return Err(e).context("event loop failed");
    }
    Ok(())
}
