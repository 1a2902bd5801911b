//! Business logic reading a key from a Redis-compatible store.

use redis::AsyncCommands;
use tracing::{debug, instrument};

use crate::error::{CallError, CallResult, Service};

const TEST_KEY: &str = "test-key";

/// Read `test-key` from the store at `addr` (`host:port`).
///
/// # Errors
///
/// See [`fetch_key`].
pub async fn redis_client_call(addr: &str) -> CallResult<String> {
    fetch_key(addr, TEST_KEY).await
}

/// Open a client to `redis://{addr}` and `GET key`.
///
/// # Errors
///
/// - [`CallError::Connection`] when the store cannot be reached.
/// - [`CallError::NoData`] when the key does not exist.
/// - [`CallError::Driver`] when the command fails or the value is not UTF-8.
#[instrument(level = "debug", skip_all, fields(addr = %addr, key = %key))]
pub async fn fetch_key(addr: &str, key: &str) -> CallResult<String> {
    let client = redis::Client::open(format!("redis://{addr}"))
        .map_err(|err| CallError::connection(Service::Store, err))?;
    let mut connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|err| CallError::connection(Service::Store, err))?;

    let value: Option<String> = connection
        .get(key)
        .await
        .map_err(|err| CallError::driver("get", err))?;
    debug!(found = value.is_some(), "store lookup finished");
    value.ok_or(CallError::NoData { operation: "get" })
}
