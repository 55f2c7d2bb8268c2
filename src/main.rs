use std::path::PathBuf;

use clap::{Parser, Subcommand};
use signal_hook::consts::signal;
use signal_hook::iterator::exfiltrator::SignalOnly;
use signal_hook::iterator::SignalsInfo;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct HostProxy {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the proxy server
    Start {
        /// Path to the config file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let hostproxy = HostProxy::parse();
    if let Some(Command::Start { config }) = hostproxy.command {
        start(config).await?
    }
    Ok(())
}

async fn start(config: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    hostproxy::load_config(&config, true).await?;
    hostproxy::serve().await?;
    let mut signals =
        SignalsInfo::<SignalOnly>::new([signal::SIGTERM, signal::SIGINT, signal::SIGHUP])?;
    for signal in &mut signals {
        match signal {
            signal::SIGTERM | signal::SIGINT => break,
            signal::SIGHUP => hostproxy::force_update_config(&config).await?,
            _ => (),
        }
    }
    log::info!("exit_hostproxy");
    Ok(())
}
