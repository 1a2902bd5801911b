use anyhow::{Context, Result};
use redis::AsyncCommands;
use testbed_clients::{fetch_key, redis_client_call};
use testbed_config::{MemoryStoreConfig, TestbedConfig};
use testbed_support::MemoryStore;

#[tokio::test]
async fn redis_client_call_reads_the_seeded_key() -> Result<()> {
    testbed_telemetry::init_test_logging();
    let config = TestbedConfig::from_env().context("invalid TESTBED_* overrides")?;
    let store = MemoryStore::start(&config.store).await?;
    if config.store.bind.port() != 0 {
        assert_eq!(store.socket_addr(), config.store.bind);
    }
    store.set("test-key", "test-val");

    let val = redis_client_call(&store.addr()).await?;

    assert_eq!(val, "test-val");
    Ok(())
}

#[tokio::test]
async fn missing_key_is_no_data() -> Result<()> {
    let store = MemoryStore::start(&MemoryStoreConfig::default()).await?;

    let err = fetch_key(&store.addr(), "absent")
        .await
        .expect_err("key was never written");

    assert!(err.is_no_data());
    Ok(())
}

#[tokio::test]
async fn writes_over_the_wire_are_visible_in_process() -> Result<()> {
    let store = MemoryStore::start(&MemoryStoreConfig::default()).await?;
    let client = redis::Client::open(format!("redis://{}", store.addr()))?;
    let mut connection = client.get_multiplexed_async_connection().await?;

    let () = connection.set("greeting", "hello").await?;
    let deleted: usize = connection.del("greeting").await?;
    assert_eq!(deleted, 1);
    let () = connection.set("greeting", "hello again").await?;

    assert_eq!(store.get("greeting"), Some(b"hello again".to_vec()));
    assert_eq!(fetch_key(&store.addr(), "greeting").await?, "hello again");
    Ok(())
}

#[tokio::test]
async fn stopped_store_surfaces_a_connection_error() -> Result<()> {
    let mut store = MemoryStore::start(&MemoryStoreConfig::default()).await?;
    let addr = store.addr();
    store.shutdown().await;

    let err = redis_client_call(&addr)
        .await
        .expect_err("store has been shut down");

    assert!(err.is_connection());
    Ok(())
}
