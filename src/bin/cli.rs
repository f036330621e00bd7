use anyhow::Context;
use clap::Parser;
use zkv::client::Client;

#[derive(Parser, Debug)]
#[command(name = "zkv-cli")]
#[command(about = "Send a single command to a zkv server")]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 1234)]
    port: u16,

    /// Command name followed by its arguments
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut client = Client::connect(&addr).with_context(|| format!("failed to connect to {}", addr))?;
    log::debug!("Connected to {}", addr);

    let response = client.call(&args.command).context("request failed")?;
    print!("{}", response);
    Ok(())
}
