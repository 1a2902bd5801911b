//! Serde models describing each harness.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};

/// Container log stream inspected for the readiness message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    /// Only the container's standard output.
    Stdout,
    /// Only the container's standard error.
    Stderr,
    /// Either stream; occurrences are counted across both.
    #[default]
    Either,
}

/// Condition that marks a freshly started container as usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Log line to wait for.
    pub message: String,
    /// How many times the log line must appear.
    pub occurrences: usize,
    /// Upper bound on the whole wait, in milliseconds.
    pub timeout_ms: u64,
    /// Stream the log line is expected on.
    pub source: LogSource,
}

impl ReadinessConfig {
    /// Readiness window as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            message: defaults::READY_MESSAGE.to_string(),
            occurrences: defaults::READY_OCCURRENCES,
            timeout_ms: defaults::READY_TIMEOUT_MS,
            source: LogSource::default(),
        }
    }
}

/// Disposable `PostgreSQL` container settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresHarnessConfig {
    /// Image repository, e.g. `postgres`.
    pub image: String,
    /// Image tag, e.g. `15.2-alpine`.
    pub tag: String,
    /// Superuser created by the image entrypoint.
    pub user: String,
    /// Password for [`Self::user`].
    pub password: String,
    /// Database created by the image entrypoint.
    pub database: String,
    /// Host scripts copied into `/docker-entrypoint-initdb.d/`, run in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_scripts: Vec<PathBuf>,
    /// When the container counts as ready.
    pub readiness: ReadinessConfig,
}

impl PostgresHarnessConfig {
    /// Append an initialisation script.
    #[must_use]
    pub fn with_init_script(mut self, path: impl AsRef<Path>) -> Self {
        self.init_scripts.push(path.as_ref().to_path_buf());
        self
    }

    /// Replace the readiness condition.
    #[must_use]
    pub fn with_readiness(mut self, readiness: ReadinessConfig) -> Self {
        self.readiness = readiness;
        self
    }

    /// `image:tag` reference used in logs and errors.
    #[must_use]
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// Connection string for a server reachable at `host:port`.
    ///
    /// Credentials and the database name are percent-encoded, so reserved
    /// characters in them cannot change where the URL points.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when `host` is not a valid URL host.
    pub fn connection_url(&self, host: &str, port: u16) -> ConfigResult<String> {
        let invalid_host = || ConfigError::invalid("postgres.host", host, "not a valid URL host");
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let mut url = Url::parse(&format!("postgres://{authority}")).map_err(|_| invalid_host())?;
        url.set_username(&self.user).map_err(|()| invalid_host())?;
        url.set_password(Some(&self.password))
            .map_err(|()| invalid_host())?;
        url.path_segments_mut()
            .map_err(|()| invalid_host())?
            .push(&self.database);
        url.set_query(Some("sslmode=disable"));
        Ok(url.into())
    }
}

impl Default for PostgresHarnessConfig {
    fn default() -> Self {
        Self {
            image: defaults::POSTGRES_IMAGE.to_string(),
            tag: defaults::POSTGRES_TAG.to_string(),
            user: defaults::POSTGRES_USER.to_string(),
            password: defaults::POSTGRES_PASSWORD.to_string(),
            database: defaults::POSTGRES_DB.to_string(),
            init_scripts: Vec::new(),
            readiness: ReadinessConfig::default(),
        }
    }
}

/// In-memory key/value store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// Listener address; port `0` picks a free one.
    pub bind: SocketAddr,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            bind: defaults::STORE_BIND,
        }
    }
}

/// Canned HTTP response settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockResponderConfig {
    /// Body returned for every request.
    pub body: String,
    /// Status code returned for every request.
    pub status: u16,
}

impl MockResponderConfig {
    /// Responder returning `body` with the default status.
    #[must_use]
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }
}

impl Default for MockResponderConfig {
    fn default() -> Self {
        Self {
            body: defaults::RESPONDER_BODY.to_string(),
            status: defaults::RESPONDER_STATUS,
        }
    }
}
