//! Disposable `PostgreSQL` instances backed by a container runtime.
//!
//! # Design
//! - `acquire` blocks until the readiness log line has been seen the configured
//!   number of times, bounded by the configured timeout. No retries.
//! - `release` is explicit and idempotent. A failed release is fatal through
//!   [`PostgresHarness::release_or_abort`]: a leaked container corrupts later runs.
//! - Dropping an unreleased harness falls back to the container handle's own
//!   removal and never aborts.

use std::path::Path;

use testbed_config::validate::validate_postgres;
use testbed_config::{LogSource, PostgresHarnessConfig, ReadinessConfig};
use testcontainers::core::wait::LogWaitStrategy;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage, ImageExt};
use tracing::{debug, error, info, warn};

use crate::error::HarnessError;
use crate::runtime::{ProbeFailure, RuntimeEndpoint, probe_runtime};

const POSTGRES_PORT: u16 = 5432;
const INIT_DIR: &str = "/docker-entrypoint-initdb.d";

/// Handle to a running, ready database container.
pub struct PostgresHarness {
    container: Option<ContainerAsync<GenericImage>>,
    connection_string: String,
    image: String,
}

impl PostgresHarness {
    /// Start a container and wait until it is ready to accept connections.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::Config`] when the configuration is invalid.
    /// - [`HarnessError::RuntimeUnavailable`] when no container runtime is reachable.
    /// - [`HarnessError::Provisioning`] when the container fails to start or the
    ///   readiness condition is not met within the timeout.
    /// - [`HarnessError::PortLookup`] when the mapped address cannot be resolved.
    pub async fn acquire(config: &PostgresHarnessConfig) -> Result<Self, HarnessError> {
        acquire_with_runtime(config, probe_runtime()).await
    }

    /// Connection string of the form
    /// `postgres://<user>:<pass>@<host>:<port>/<db>?sslmode=disable`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Released`] once the container has been released.
    pub fn connection_info(&self) -> Result<&str, HarnessError> {
        if self.container.is_none() {
            return Err(HarnessError::Released);
        }
        Ok(&self.connection_string)
    }

    /// `image:tag` the container was started from.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Whether [`Self::release`] has already run.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.container.is_none()
    }

    /// Remove the container. Calling this again after it returned is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Teardown`] when the runtime fails to remove the
    /// container.
    pub async fn release(&mut self) -> Result<(), HarnessError> {
        let Some(container) = self.container.take() else {
            return Ok(());
        };
        let container_id = container.id().to_string();
        container
            .rm()
            .await
            .map_err(|source| HarnessError::Teardown { source })?;
        info!(image = %self.image, %container_id, "postgres container removed");
        Ok(())
    }

    /// Release the container, aborting the whole process if that fails.
    pub async fn release_or_abort(&mut self) {
        if let Err(err) = self.release().await {
            error!(
                image = %self.image,
                error = %err,
                source = ?std::error::Error::source(&err),
                "container teardown failed; aborting to avoid leaking it"
            );
            std::process::abort();
        }
    }
}

impl Drop for PostgresHarness {
    fn drop(&mut self) {
        if let Some(container) = &self.container {
            warn!(
                image = %self.image,
                container_id = container.id(),
                "postgres harness dropped without release"
            );
        }
    }
}

/// Run `test` against a fresh container and always release it afterwards.
///
/// The body borrows the harness. Its result is returned once the container
/// has been removed, whether it succeeded or failed.
///
/// # Errors
///
/// Returns acquisition failures converted into `E`, or the body's own error.
pub async fn with_postgres<F, T, E>(config: &PostgresHarnessConfig, test: F) -> Result<T, E>
where
    F: AsyncFnOnce(&PostgresHarness) -> Result<T, E>,
    E: From<HarnessError>,
{
    let mut harness = PostgresHarness::acquire(config).await?;
    let outcome = test(&harness).await;
    harness.release_or_abort().await;
    outcome
}

async fn acquire_with_runtime(
    config: &PostgresHarnessConfig,
    runtime: Result<RuntimeEndpoint, ProbeFailure>,
) -> Result<PostgresHarness, HarnessError> {
    validate_postgres(config)?;
    let endpoint = runtime?;
    debug!(%endpoint, "container runtime found");

    let image = config.image_ref();
    info!(
        %image,
        init_scripts = config.init_scripts.len(),
        timeout_ms = config.readiness.timeout_ms,
        "starting postgres container"
    );
    let container = build_request(config)
        .start()
        .await
        .map_err(|source| HarnessError::Provisioning {
            image: image.clone(),
            source,
        })?;

    let host = container
        .get_host()
        .await
        .map_err(|source| HarnessError::PortLookup { source })?;
    let port = container
        .get_host_port_ipv4(POSTGRES_PORT.tcp())
        .await
        .map_err(|source| HarnessError::PortLookup { source })?;
    info!(%image, container_id = container.id(), %host, port, "postgres container ready");

    Ok(PostgresHarness {
        connection_string: config.connection_url(&host.to_string(), port)?,
        container: Some(container),
        image,
    })
}

fn build_request(config: &PostgresHarnessConfig) -> ContainerRequest<GenericImage> {
    let mut request = GenericImage::new(config.image.as_str(), config.tag.as_str())
        .with_exposed_port(POSTGRES_PORT.tcp())
        .with_wait_for(readiness_condition(&config.readiness))
        .with_env_var("POSTGRES_USER", config.user.as_str())
        .with_env_var("POSTGRES_PASSWORD", config.password.as_str())
        .with_env_var("POSTGRES_DB", config.database.as_str())
        .with_startup_timeout(config.readiness.timeout());
    for (index, script) in config.init_scripts.iter().enumerate() {
        request = request.with_copy_to(init_script_target(index, script), script.clone());
    }
    request
}

fn readiness_condition(readiness: &ReadinessConfig) -> WaitFor {
    let message = readiness.message.as_str();
    let strategy = match readiness.source {
        LogSource::Stdout => LogWaitStrategy::stdout(message),
        LogSource::Stderr => LogWaitStrategy::stderr(message),
        LogSource::Either => LogWaitStrategy::stdout_or_stderr(message),
    };
    WaitFor::log(strategy.with_times(readiness.occurrences))
}

// The entrypoint runs scripts in lexical order; the prefix keeps configured order.
fn init_script_target(index: usize, script: &Path) -> String {
    let name = script
        .file_name()
        .map_or_else(|| "init.sh".into(), |name| name.to_string_lossy());
    format!("{INIT_DIR}/{index:02}-{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbed_config::ConfigError;

    #[tokio::test]
    async fn missing_runtime_is_reported_before_starting() {
        let probe = Err(ProbeFailure::HostSocketMissing {
            path: "/definitely/missing.sock".into(),
        });
        let result = acquire_with_runtime(&PostgresHarnessConfig::default(), probe).await;
        assert!(matches!(
            result,
            Err(HarnessError::RuntimeUnavailable {
                source: ProbeFailure::HostSocketMissing { .. }
            })
        ));
    }

    #[tokio::test]
    async fn invalid_configuration_is_rejected_first() {
        let config = PostgresHarnessConfig {
            tag: String::new(),
            ..PostgresHarnessConfig::default()
        };
        let result = acquire_with_runtime(&config, Ok(RuntimeEndpoint::DefaultSocket)).await;
        assert!(matches!(
            result,
            Err(HarnessError::Config {
                source: ConfigError::InvalidField {
                    field: "postgres.tag",
                    ..
                }
            })
        ));
    }

    #[test]
    fn init_scripts_keep_configured_order() {
        assert_eq!(
            init_script_target(0, Path::new("testdata/init-db.sh")),
            "/docker-entrypoint-initdb.d/00-init-db.sh"
        );
        assert_eq!(
            init_script_target(11, Path::new("seed.sql")),
            "/docker-entrypoint-initdb.d/11-seed.sql"
        );
        assert_eq!(
            init_script_target(3, Path::new("/")),
            "/docker-entrypoint-initdb.d/03-init.sh"
        );
    }
}
