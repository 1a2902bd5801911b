//! Error taxonomy shared by the client calls.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

/// External service a call talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Downstream HTTP dependency.
    Http,
    /// Redis-compatible key/value store.
    Store,
    /// `PostgreSQL` database.
    Database,
}

impl Display for Service {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Http => "http service",
            Self::Store => "key/value store",
            Self::Database => "database",
        })
    }
}

/// Underlying client library error, passed through unchanged.
#[derive(Debug, Error)]
pub enum DriverError {
    /// HTTP client error.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// Redis client error.
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    /// SQL driver error.
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Failures surfaced by a business-logic call.
#[derive(Debug, Error)]
pub enum CallError {
    /// The client could not reach the service.
    #[error("failed to connect to {service}")]
    Connection {
        /// Service that was unreachable.
        service: Service,
        /// Source driver error.
        source: DriverError,
    },
    /// The call succeeded but produced no value.
    #[error("{operation} returned no data")]
    NoData {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The service was reached but the operation failed.
    #[error("{operation} failed")]
    Driver {
        /// Operation identifier.
        operation: &'static str,
        /// Source driver error.
        source: DriverError,
    },
}

impl CallError {
    pub(crate) fn connection(service: Service, source: impl Into<DriverError>) -> Self {
        Self::Connection {
            service,
            source: source.into(),
        }
    }

    pub(crate) fn driver(operation: &'static str, source: impl Into<DriverError>) -> Self {
        Self::Driver {
            operation,
            source: source.into(),
        }
    }

    /// Whether the call failed because the service could not be reached.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Whether the call succeeded but returned nothing.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }
}

/// Convenience alias for call results.
pub type CallResult<T> = Result<T, CallError>;
