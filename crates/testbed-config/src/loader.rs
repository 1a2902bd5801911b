//! Environment-driven configuration loading.
//!
//! # Design
//! - Start from defaults, then apply `TESTBED_*` overrides one field at a time.
//! - Accept an injected lookup so tests never mutate the process environment.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{MemoryStoreConfig, MockResponderConfig, PostgresHarnessConfig};
use crate::validate::{validate_postgres, validate_responder};

const ENV_POSTGRES_IMAGE: &str = "TESTBED_POSTGRES_IMAGE";
const ENV_POSTGRES_TAG: &str = "TESTBED_POSTGRES_TAG";
const ENV_POSTGRES_USER: &str = "TESTBED_POSTGRES_USER";
const ENV_POSTGRES_PASSWORD: &str = "TESTBED_POSTGRES_PASSWORD";
const ENV_POSTGRES_DB: &str = "TESTBED_POSTGRES_DB";
const ENV_READY_TIMEOUT_MS: &str = "TESTBED_READY_TIMEOUT_MS";
const ENV_READY_OCCURRENCES: &str = "TESTBED_READY_OCCURRENCES";
const ENV_STORE_BIND: &str = "TESTBED_STORE_BIND";
const ENV_RESPONDER_BODY: &str = "TESTBED_RESPONDER_BODY";
const ENV_RESPONDER_STATUS: &str = "TESTBED_RESPONDER_STATUS";

/// Configuration for all three harnesses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestbedConfig {
    /// Container-backed database settings.
    pub postgres: PostgresHarnessConfig,
    /// In-memory store settings.
    pub store: MemoryStoreConfig,
    /// HTTP responder settings.
    pub responder: MockResponderConfig,
}

impl TestbedConfig {
    /// Load defaults overridden by the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override cannot be parsed or the merged
    /// configuration fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load defaults overridden by values produced by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override cannot be parsed or the merged
    /// configuration fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let postgres = &mut config.postgres;

        override_string(&lookup, ENV_POSTGRES_IMAGE, &mut postgres.image);
        override_string(&lookup, ENV_POSTGRES_TAG, &mut postgres.tag);
        override_string(&lookup, ENV_POSTGRES_USER, &mut postgres.user);
        override_string(&lookup, ENV_POSTGRES_PASSWORD, &mut postgres.password);
        override_string(&lookup, ENV_POSTGRES_DB, &mut postgres.database);
        override_parsed(
            &lookup,
            ENV_READY_TIMEOUT_MS,
            "readiness.timeout_ms",
            "must be an integer number of milliseconds",
            &mut postgres.readiness.timeout_ms,
        )?;
        override_parsed(
            &lookup,
            ENV_READY_OCCURRENCES,
            "readiness.occurrences",
            "must be a positive integer",
            &mut postgres.readiness.occurrences,
        )?;
        override_parsed(
            &lookup,
            ENV_STORE_BIND,
            "store.bind",
            "must be a socket address such as 127.0.0.1:6379",
            &mut config.store.bind,
        )?;
        override_string(&lookup, ENV_RESPONDER_BODY, &mut config.responder.body);
        override_parsed(
            &lookup,
            ENV_RESPONDER_STATUS,
            "responder.status",
            "must be an HTTP status code",
            &mut config.responder.status,
        )?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_postgres(&self.postgres)?;
        validate_responder(&self.responder)
    }
}

fn override_string<F>(lookup: &F, key: &str, target: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        debug!(key, "applying configuration override");
        *target = value;
    }
}

fn override_parsed<F, T>(
    lookup: &F,
    key: &str,
    field: &'static str,
    reason: &'static str,
    target: &mut T,
) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    debug!(key, "applying configuration override");
    *target = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, raw.clone(), reason))?;
    Ok(())
}
