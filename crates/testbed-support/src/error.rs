//! Error types for harness provisioning and teardown.

use std::io;
use std::net::SocketAddr;

use testbed_config::ConfigError;
use testcontainers::TestcontainersError;
use thiserror::Error;

use crate::runtime::ProbeFailure;

/// Failures raised while acquiring or releasing a managed process.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No container runtime could be reached on this host.
    #[error("no container runtime is reachable")]
    RuntimeUnavailable {
        /// Which check failed.
        #[from]
        source: ProbeFailure,
    },
    /// The container could not be started or never became ready.
    #[error("failed to provision container {image}")]
    Provisioning {
        /// `image:tag` that was requested.
        image: String,
        /// Source runtime error.
        source: TestcontainersError,
    },
    /// The started container's host or mapped port could not be resolved.
    #[error("failed to resolve container address")]
    PortLookup {
        /// Source runtime error.
        source: TestcontainersError,
    },
    /// The harness was used after it had been released.
    #[error("harness has already been released")]
    Released,
    /// Removing the container failed; the process may have leaked.
    #[error("failed to remove container")]
    Teardown {
        /// Source runtime error.
        source: TestcontainersError,
    },
    /// A listener could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Source IO error.
        source: io::Error,
    },
    /// The harness configuration was rejected.
    #[error("invalid harness configuration")]
    Config {
        /// Source validation error.
        #[from]
        source: ConfigError,
    },
}

impl HarnessError {
    /// Whether the error means the environment could not be made ready.
    #[must_use]
    pub const fn is_provisioning(&self) -> bool {
        matches!(self, Self::Provisioning { .. } | Self::PortLookup { .. })
    }
}
