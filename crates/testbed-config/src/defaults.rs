//! Baseline values for harness configuration.
//!
//! # Design
//! - Match the stock `postgres` image conventions so no extra env is needed.
//! - Keep the readiness window short; a stuck container should fail fast.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub(crate) const POSTGRES_IMAGE: &str = "postgres";
pub(crate) const POSTGRES_TAG: &str = "15.2-alpine";
pub(crate) const POSTGRES_USER: &str = "postgres";
pub(crate) const POSTGRES_PASSWORD: &str = "postgres";
pub(crate) const POSTGRES_DB: &str = "postgres";
/// The entrypoint starts a temporary server for init scripts, then the real one.
pub(crate) const READY_MESSAGE: &str = "database system is ready to accept connections";
pub(crate) const READY_OCCURRENCES: usize = 2;
pub(crate) const READY_TIMEOUT_MS: u64 = 5_000;
pub(crate) const STORE_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
pub(crate) const RESPONDER_BODY: &str = "dummy data";
pub(crate) const RESPONDER_STATUS: u16 = 200;
