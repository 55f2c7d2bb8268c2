pub mod conn;
pub mod executor;
pub mod http;
pub mod worker;

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Once};
use std::time::Duration;

use structured_logger::json::new_writer;
use tokio::sync::{broadcast, OnceCell, RwLock};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_UPSTREAM_PORT: u16 = 80;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 180;
const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_READ_BUFFER_SIZE: usize = 4096;
const DEFAULT_STAGING_INITIAL_SIZE: usize = 4096;
const DEFAULT_STAGING_MAX_SIZE: usize = 64 * 1024;

static PROGRAM: OnceCell<Arc<RwLock<Program>>> = OnceCell::const_new();

fn program() -> Arc<RwLock<Program>> {
    Arc::clone(PROGRAM.get().unwrap())
}

pub async fn load_config(
    path: impl AsRef<Path>,
    first_load: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string(&path)?;
    let config: Config = serde_yaml::from_str(&config_str)?;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        structured_logger::Builder::with_level("INFO")
            .with_target_writer("hostproxy*", new_writer(io::stderr()))
            .init();
    });
    log::info!(config:serde = config; "load_config");
    let np = Program::from_config(config)?;
    if first_load {
        if let Err(e) = PROGRAM.set(Arc::new(RwLock::new(np))) {
            log::error!(error = e.to_string(); "load_config_error");
            std::process::exit(2);
        }
    } else {
        let p = program();
        let mut guard = p.write().await;
        // Send shutdown signal to existing tasks before updating config
        if let Err(e) = guard.shutdown_tx.send(()) {
            log::warn!(error = e.to_string(); "no_active_connections_for_shutdown_signal");
        }
        *guard = np;
    }
    Ok(())
}

pub async fn force_update_config(path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
    load_config(path, false).await
}

struct Program {
    settings: Arc<Settings>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Program {
    fn from_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let settings = Settings::from_config(&config)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            settings: Arc::new(settings),
            shutdown_tx,
        })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Config {
    /// Port the proxy listens on for downstream connections
    port: Option<u16>,
    /// Port dialed on upstream hosts whose authority carries no port
    upstream_port: Option<u16>,
    read_timeout_secs: Option<u64>,
    write_timeout_secs: Option<u64>,
    read_buffer_size: Option<usize>,
    staging_initial_size: Option<usize>,
    staging_max_size: Option<usize>,
}

/// Resolved runtime parameters shared by every connection accepted while
/// the current program generation is live.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub upstream_port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub read_buffer_size: usize,
    pub staging_initial_size: usize,
    pub staging_max_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream_port: DEFAULT_UPSTREAM_PORT,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            staging_initial_size: DEFAULT_STAGING_INITIAL_SIZE,
            staging_max_size: DEFAULT_STAGING_MAX_SIZE,
        }
    }
}

impl Settings {
    fn from_config(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Settings::default();
        let settings = Settings {
            port: config.port.unwrap_or(defaults.port),
            upstream_port: config.upstream_port.unwrap_or(defaults.upstream_port),
            read_timeout: config
                .read_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout),
            write_timeout: config
                .write_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.write_timeout),
            read_buffer_size: config.read_buffer_size.unwrap_or(defaults.read_buffer_size),
            staging_initial_size: config
                .staging_initial_size
                .unwrap_or(defaults.staging_initial_size),
            staging_max_size: config.staging_max_size.unwrap_or(defaults.staging_max_size),
        };
        if settings.read_timeout.is_zero() || settings.write_timeout.is_zero() {
            return Err("read_timeout_secs and write_timeout_secs must be positive".into());
        }
        if settings.read_buffer_size == 0 {
            return Err("read_buffer_size must be positive".into());
        }
        if settings.staging_max_size < settings.staging_initial_size {
            return Err("staging_max_size must be at least staging_initial_size".into());
        }
        Ok(settings)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(
        #[source]
        #[from]
        io::Error,
    ),

    #[error("Scan error: {0}")]
    Scan(
        #[source]
        #[from]
        http::ScanError,
    ),

    #[error("Header too large")]
    HeaderTooLarge,

    #[error("Missing Host header")]
    MissingHost,

    #[error("Connection closed")]
    Closed,
}

use tokio::net::TcpListener;

/// Bind the downstream listener and start accepting connections.
pub async fn serve() -> Result<(), Error> {
    let port = {
        let p = program();
        let guard = p.read().await;
        guard.settings.port
    };
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    log::info!(port = port, debug = cfg!(debug_assertions); "start_hostproxy");
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    tokio::spawn(async move {
                        executor::execute(stream).await;
                    });
                }
                #[cfg_attr(not(debug_assertions), allow(unused))]
                Err(e) => {
                    #[cfg(debug_assertions)]
                    log::error!(error = e.to_string(); "accept_error")
                }
            }
        }
    });
    Ok(())
}
