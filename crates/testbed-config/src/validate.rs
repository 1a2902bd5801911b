//! Field checks applied to every loaded configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::model::{MockResponderConfig, PostgresHarnessConfig, ReadinessConfig};

/// Validate the container settings, including that init scripts exist on disk.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the first offending field.
pub fn validate_postgres(config: &PostgresHarnessConfig) -> ConfigResult<()> {
    ensure_present("postgres.image", &config.image)?;
    ensure_present("postgres.tag", &config.tag)?;
    ensure_present("postgres.user", &config.user)?;
    ensure_present("postgres.password", &config.password)?;
    ensure_present("postgres.database", &config.database)?;
    for script in &config.init_scripts {
        if !script.is_file() {
            return Err(ConfigError::invalid(
                "postgres.init_scripts",
                script.display().to_string(),
                "script file not found",
            ));
        }
    }
    validate_readiness(&config.readiness)
}

/// Validate the readiness condition.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the message is blank or the
/// occurrence count or timeout is zero.
pub fn validate_readiness(readiness: &ReadinessConfig) -> ConfigResult<()> {
    ensure_present("readiness.message", &readiness.message)?;
    if readiness.occurrences == 0 {
        return Err(ConfigError::invalid(
            "readiness.occurrences",
            "0",
            "must be at least 1",
        ));
    }
    if readiness.timeout_ms == 0 {
        return Err(ConfigError::invalid(
            "readiness.timeout_ms",
            "0",
            "must be greater than zero",
        ));
    }
    Ok(())
}

/// Validate the canned HTTP response.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the status is outside `100..=599`.
pub fn validate_responder(config: &MockResponderConfig) -> ConfigResult<()> {
    if !(100..=599).contains(&config.status) {
        return Err(ConfigError::invalid(
            "responder.status",
            config.status.to_string(),
            "must be a valid HTTP status code",
        ));
    }
    Ok(())
}

fn ensure_present(field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            value: None,
            reason: "must not be empty",
        });
    }
    Ok(())
}
