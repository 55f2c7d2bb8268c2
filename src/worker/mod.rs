use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};

use crate::conn::{self, Reader, Writer};
use crate::http::{self, Scanner};
use crate::{Error, Settings};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Downstream error: {0}")]
    Downstream(Error),
    #[error("Upstream error: {0}")]
    Upstream(Error),
}

/// Where the bytes of the current message are going. While amassing they
/// collect in the staging buffer until the destination is known; in transit
/// they stream straight through to the resolved authority.
enum Phase {
    Amassing,
    Transit(String),
}

/// Forwards one downstream connection. Requests are scanned for their Host
/// header, routed to per-authority upstream connections, and relayed byte
/// for byte; responses flow back through a relay task per upstream.
pub struct Worker<S> {
    downstream: Reader<S>,
    downstream_writer: Arc<Mutex<Writer<S>>>,
    scanner: Scanner,
    staging: Staging,
    connector: Connector<S>,
}

impl<S> Worker<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static,
{
    pub fn new(stream: S, settings: Arc<Settings>) -> Self {
        let (reader, writer) = conn::split(
            stream,
            settings.read_timeout,
            settings.write_timeout,
            settings.read_buffer_size,
        );
        let downstream_writer = Arc::new(Mutex::new(writer));
        let (shutdown_tx, _) = broadcast::channel(1);
        Worker {
            downstream: reader,
            downstream_writer: Arc::clone(&downstream_writer),
            scanner: Scanner::new(),
            staging: Staging::new(settings.staging_initial_size, settings.staging_max_size),
            connector: Connector {
                conns: HashMap::new(),
                downstream: downstream_writer,
                shutdown_tx,
                settings,
            },
        }
    }

    /// Drives the connection until the downstream closes or a fatal error
    /// occurs. A clean close surfaces as `Downstream(Closed)`.
    pub async fn run(&mut self) -> Result<(), ProxyError> {
        let mut phase = Phase::Amassing;
        loop {
            let data = self
                .downstream
                .read()
                .await
                .map_err(ProxyError::Downstream)?;
            phase = match phase {
                Phase::Amassing => self.amass(data).await?,
                Phase::Transit(authority) => self.transit(authority, data).await?,
            };
        }
    }

    /// Closes every upstream connection and then the downstream socket.
    pub async fn shutdown(&mut self) {
        self.connector.close().await;
        self.downstream_writer.lock().await.close().await;
    }

    async fn amass(&mut self, data: Bytes) -> Result<Phase, ProxyError> {
        let end = self
            .scanner
            .scan(&data)
            .map_err(|e| ProxyError::Downstream(e.into()))?;
        if let Some(end) = end {
            // The whole message is delimited. Route it, and hand anything
            // past its end back to the reader for the next round.
            let authority = self.resolve_authority()?;
            self.forward(&authority, &data[..end])
                .await
                .map_err(ProxyError::Upstream)?;
            if end < data.len() {
                self.downstream.unread(data.slice(end..));
            }
            return Ok(Phase::Amassing);
        }
        if self.scanner.host().is_some() {
            // Destination known before the message is complete; flush what
            // was staged and stream the remainder through.
            let authority = self.resolve_authority()?;
            self.forward(&authority, &data)
                .await
                .map_err(ProxyError::Upstream)?;
            return Ok(Phase::Transit(authority));
        }
        if self.scanner.headers_done() {
            // The header section ended without ever naming a Host.
            return Err(ProxyError::Downstream(Error::MissingHost));
        }
        self.staging.append(&data).map_err(ProxyError::Downstream)?;
        Ok(Phase::Amassing)
    }

    async fn transit(&mut self, authority: String, data: Bytes) -> Result<Phase, ProxyError> {
        let end = self
            .scanner
            .scan(&data)
            .map_err(|e| ProxyError::Downstream(e.into()))?;
        match end {
            Some(end) => {
                self.connector
                    .send(&authority, &data[..end])
                    .await
                    .map_err(ProxyError::Upstream)?;
                if end < data.len() {
                    self.downstream.unread(data.slice(end..));
                }
                Ok(Phase::Amassing)
            }
            None => {
                self.connector
                    .send(&authority, &data)
                    .await
                    .map_err(ProxyError::Upstream)?;
                Ok(Phase::Transit(authority))
            }
        }
    }

    /// Sends the staged bytes, if any, followed by `data`.
    async fn forward(&mut self, authority: &str, data: &[u8]) -> Result<(), Error> {
        let staged = self.staging.take();
        if !staged.is_empty() {
            self.connector.send(authority, &staged).await?;
        }
        self.connector.send(authority, data).await
    }

    fn resolve_authority(&self) -> Result<String, ProxyError> {
        match self.scanner.host() {
            Some(host) => {
                // Routing strips the `www.` prefix; the forwarded bytes
                // keep it.
                let host = String::from_utf8_lossy(host);
                Ok(http::strip_www(&host).to_string())
            }
            None => Err(ProxyError::Downstream(Error::MissingHost)),
        }
    }
}

/// Bytes held back while the destination of the current message is still
/// unknown. Growth is capped; a head that exceeds the cap without naming a
/// Host is refused.
struct Staging {
    buf: BytesMut,
    max: usize,
}

impl Staging {
    fn new(initial: usize, max: usize) -> Self {
        Staging {
            buf: BytesMut::with_capacity(initial),
            max,
        }
    }

    fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.buf.len() + data.len() > self.max {
            return Err(Error::HeaderTooLarge);
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

/// Per-connection cache of upstream write halves, keyed by authority. Each
/// dial also spawns a relay task that copies upstream bytes back to the
/// shared downstream writer until shutdown.
struct Connector<S> {
    conns: HashMap<String, Writer<TcpStream>>,
    downstream: Arc<Mutex<Writer<S>>>,
    shutdown_tx: broadcast::Sender<()>,
    settings: Arc<Settings>,
}

impl<S> Connector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static,
{
    async fn send(&mut self, authority: &str, data: &[u8]) -> Result<(), Error> {
        let conn = match self.conns.entry(authority.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let writer = Self::connect(
                    &self.downstream,
                    &self.shutdown_tx,
                    &self.settings,
                    authority,
                )
                .await?;
                entry.insert(writer)
            }
        };
        conn.write(data).await
    }

    async fn connect(
        downstream: &Arc<Mutex<Writer<S>>>,
        shutdown_tx: &broadcast::Sender<()>,
        settings: &Settings,
        authority: &str,
    ) -> Result<Writer<TcpStream>, Error> {
        let address = http::dial_address(authority, settings.upstream_port);
        let stream = TcpStream::connect(address.as_ref()).await?;
        let (reader, writer) = conn::split(
            stream,
            settings.read_timeout,
            settings.write_timeout,
            settings.read_buffer_size,
        );
        #[cfg(debug_assertions)]
        log::info!(authority = authority, address = address.as_ref(); "dial_upstream");
        tokio::spawn(relay(
            reader,
            Arc::clone(downstream),
            shutdown_tx.subscribe(),
        ));
        Ok(writer)
    }

    async fn close(&mut self) {
        let _ = self.shutdown_tx.send(());
        for (_, mut writer) in self.conns.drain() {
            writer.close().await;
        }
    }
}

/// Copies one upstream's bytes back to the downstream writer until the
/// upstream closes, an error occurs, or the connection shuts down.
async fn relay<S>(
    mut upstream: Reader<TcpStream>,
    downstream: Arc<Mutex<Writer<S>>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    S: AsyncWrite + Send + 'static,
{
    tokio::select! {
        _ = shutdown_rx.recv() => {}
        res = copy_back(&mut upstream, &downstream) => match res {
            Ok(()) | Err(Error::Closed) => {}
            #[cfg_attr(not(debug_assertions), allow(unused))]
            Err(e) => {
                #[cfg(debug_assertions)]
                log::warn!(error = e.to_string(); "relay_error")
            }
        },
    }
    #[cfg(debug_assertions)]
    log::info!("relay_closed");
}

async fn copy_back<S: AsyncWrite>(
    upstream: &mut Reader<TcpStream>,
    downstream: &Mutex<Writer<S>>,
) -> Result<(), Error> {
    loop {
        let data = upstream.read().await?;
        downstream.lock().await.write(&data).await?;
    }
}
