//! In-memory key/value store speaking the Redis wire protocol.
//!
//! # Design
//! - One accept loop task; each connection runs in a `JoinSet` owned by that
//!   loop, so aborting the loop tears every connection down with it.
//! - Tests seed data in-process through [`MemoryStore::set`] and read it back
//!   over TCP with a real client.
//! - Nothing is persisted and there is no expiry.

mod command;
mod keyspace;
mod protocol;

use std::net::SocketAddr;
use std::sync::Arc;

use testbed_config::MemoryStoreConfig;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use self::command::execute;
use self::keyspace::Keyspace;
use self::protocol::{ProtocolError, Reply, read_command};
use crate::error::HarnessError;

/// Running store bound to a local TCP port.
#[derive(Debug)]
pub struct MemoryStore {
    addr: SocketAddr,
    keyspace: Arc<Keyspace>,
    server: Option<JoinHandle<()>>,
}

impl MemoryStore {
    /// Bind the listener and start serving.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Bind`] when the configured address cannot be bound.
    pub async fn start(config: &MemoryStoreConfig) -> Result<Self, HarnessError> {
        let bind_error = |source| HarnessError::Bind {
            addr: config.bind,
            source,
        };
        let listener = TcpListener::bind(config.bind).await.map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?;
        let keyspace = Arc::new(Keyspace::default());
        let server = tokio::spawn(accept_loop(listener, Arc::clone(&keyspace)));
        info!(%addr, "memory store listening");
        Ok(Self {
            addr,
            keyspace,
            server: Some(server),
        })
    }

    /// `host:port` clients should connect to.
    #[must_use]
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Bound socket address.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Seed or overwrite a key.
    pub fn set(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        self.keyspace.set(key.as_ref(), value.as_ref());
    }

    /// Current value of a key.
    #[must_use]
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.keyspace.get(key.as_ref())
    }

    /// Remove a key, returning whether it existed.
    pub fn del(&self, key: impl AsRef<[u8]>) -> bool {
        self.keyspace.remove(key.as_ref())
    }

    /// Whether the accept loop is still running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.server.is_some()
    }

    /// Stop accepting and drop every open connection. Safe to call repeatedly.
    pub async fn shutdown(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
            let _ = server.await;
            info!(addr = %self.addr, "memory store stopped");
        }
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

async fn accept_loop(listener: TcpListener, keyspace: Arc<Keyspace>) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(stream, peer, Arc::clone(&keyspace)));
                }
                Err(err) => warn!(error = %err, "memory store accept failed"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, keyspace: Arc<Keyspace>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut out = Vec::new();

    loop {
        let (reply, close) = match read_command(&mut reader).await {
            Ok(Some(args)) if args.is_empty() => continue,
            Ok(Some(args)) => {
                debug!(%peer, command = %String::from_utf8_lossy(&args[0]), "memory store command");
                (execute(&args, &keyspace), false)
            }
            Ok(None) => break,
            Err(ProtocolError::Malformed(reason)) => {
                debug!(%peer, reason, "closing connection after protocol error");
                (Reply::Error(format!("ERR Protocol error: {reason}")), true)
            }
            Err(err @ ProtocolError::Io(_)) => {
                debug!(%peer, error = %err, "memory store connection failed");
                break;
            }
        };

        out.clear();
        reply.encode(&mut out);
        if let Err(err) = write_half.write_all(&out).await {
            debug!(%peer, error = %err, "failed to write reply");
            break;
        }
        if close {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt};

    async fn roundtrip(stream: &mut TcpStream, request: &[u8]) -> anyhow::Result<String> {
        stream.write_all(request).await?;
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        if let Some(len) = line.strip_prefix('$').and_then(|len| len.trim().parse::<usize>().ok()) {
            let mut payload = vec![0; len + 2];
            reader.read_exact(&mut payload).await?;
            line.push_str(&String::from_utf8_lossy(&payload));
        }
        Ok(line)
    }

    #[tokio::test]
    async fn seeded_values_are_served_over_tcp() -> anyhow::Result<()> {
        testbed_telemetry::init_test_logging();
        let mut store = MemoryStore::start(&MemoryStoreConfig::default()).await?;
        store.set("test-key", "test-val");

        let mut stream = TcpStream::connect(store.socket_addr()).await?;
        let reply = roundtrip(&mut stream, b"*2\r\n$3\r\nGET\r\n$8\r\ntest-key\r\n").await?;
        assert_eq!(reply, "$8\r\ntest-val\r\n");

        let reply = roundtrip(&mut stream, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n").await?;
        assert_eq!(reply, "+OK\r\n");
        assert_eq!(store.get("k"), Some(b"v".to_vec()));

        let reply = roundtrip(&mut stream, b"PING\r\n").await?;
        assert_eq!(reply, "+PONG\r\n");

        store.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn protocol_errors_close_only_that_connection() -> anyhow::Result<()> {
        let store = MemoryStore::start(&MemoryStoreConfig::default()).await?;
        store.set("test-key", "test-val");

        let mut broken = TcpStream::connect(store.socket_addr()).await?;
        let reply = roundtrip(&mut broken, b"*1\r\n:1\r\n").await?;
        assert!(reply.starts_with("-ERR Protocol error"));
        let mut rest = Vec::new();
        broken.read_to_end(&mut rest).await?;
        assert!(rest.is_empty());

        let mut healthy = TcpStream::connect(store.socket_addr()).await?;
        let reply = roundtrip(&mut healthy, b"GET test-key\r\n").await?;
        assert_eq!(reply, "$8\r\ntest-val\r\n");
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_stops_listening() -> anyhow::Result<()> {
        let mut store = MemoryStore::start(&MemoryStoreConfig::default()).await?;
        let addr = store.socket_addr();
        assert!(store.is_running());

        store.shutdown().await;
        store.shutdown().await;
        assert!(!store.is_running());
        assert!(TcpStream::connect(addr).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn direct_access_sees_the_same_data() -> anyhow::Result<()> {
        let store = MemoryStore::start(&MemoryStoreConfig::default()).await?;
        assert_eq!(store.get("missing"), None);
        store.set(b"bin\x00key".as_slice(), [0_u8, 1, 2]);
        assert_eq!(store.get(b"bin\x00key".as_slice()), Some(vec![0, 1, 2]));
        assert!(store.del(b"bin\x00key".as_slice()));
        assert!(!store.del(b"bin\x00key".as_slice()));
        Ok(())
    }

    #[tokio::test]
    async fn bind_failures_are_reported() -> anyhow::Result<()> {
        let first = MemoryStore::start(&MemoryStoreConfig::default()).await?;
        let taken = MemoryStoreConfig {
            bind: first.socket_addr(),
        };
        let err = MemoryStore::start(&taken).await.expect_err("port already bound");
        assert!(matches!(err, HarnessError::Bind { .. }));
        Ok(())
    }
}
