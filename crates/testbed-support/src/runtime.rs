//! Container runtime discovery for the database harness.
//!
//! A `DOCKER_HOST` setting is authoritative: a `unix://` socket must exist,
//! anything else is trusted without dialling it. Without one, the default
//! socket or a working `docker info` counts as a reachable runtime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// Where a reachable container runtime was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEndpoint {
    /// Unix socket named by `DOCKER_HOST`.
    HostSocket(PathBuf),
    /// Non-socket `DOCKER_HOST`, such as `tcp://10.0.0.5:2375`.
    Remote(String),
    /// The default daemon socket.
    DefaultSocket,
    /// No socket was found but `docker info` succeeded.
    Cli,
}

impl fmt::Display for RuntimeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostSocket(path) => write!(f, "unix://{}", path.display()),
            Self::Remote(host) => f.write_str(host),
            Self::DefaultSocket => write!(f, "unix://{DEFAULT_SOCKET}"),
            Self::Cli => f.write_str("docker cli"),
        }
    }
}

/// Why no container runtime could be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// `DOCKER_HOST` names a Unix socket that does not exist.
    #[error("DOCKER_HOST socket {} does not exist", .path.display())]
    HostSocketMissing {
        /// Socket path taken from `DOCKER_HOST`.
        path: PathBuf,
    },
    /// The default socket is absent and the CLI could not reach a daemon.
    #[error("{} is missing and `docker info` failed: {detail}", .socket.display())]
    NoDaemon {
        /// Default socket path that was checked.
        socket: PathBuf,
        /// Exit status or spawn error of `docker info`.
        detail: String,
    },
}

/// Locate a container runtime for this process.
///
/// # Errors
///
/// Returns the [`ProbeFailure`] describing the last check that failed.
pub fn probe_runtime() -> Result<RuntimeEndpoint, ProbeFailure> {
    probe_with(
        std::env::var("DOCKER_HOST").ok(),
        Path::new(DEFAULT_SOCKET),
        docker_info,
    )
}

/// Returns `true` if a container runtime is reachable for container-backed tests.
#[must_use]
pub fn docker_available() -> bool {
    probe_runtime().is_ok()
}

fn probe_with<C>(
    docker_host: Option<String>,
    default_socket: &Path,
    cli: C,
) -> Result<RuntimeEndpoint, ProbeFailure>
where
    C: FnOnce() -> Result<(), String>,
{
    if let Some(host) = docker_host {
        return match host.strip_prefix("unix://") {
            Some(path) if Path::new(path).exists() => Ok(RuntimeEndpoint::HostSocket(path.into())),
            Some(path) => Err(ProbeFailure::HostSocketMissing { path: path.into() }),
            None => Ok(RuntimeEndpoint::Remote(host)),
        };
    }
    if default_socket.exists() {
        return Ok(RuntimeEndpoint::DefaultSocket);
    }
    cli()
        .map(|()| RuntimeEndpoint::Cli)
        .map_err(|detail| ProbeFailure::NoDaemon {
            socket: default_socket.to_path_buf(),
            detail,
        })
}

fn docker_info() -> Result<(), String> {
    match Command::new("docker").arg("info").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(format!("exited with {}", output.status)),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING: &str = "/definitely/missing.sock";

    fn existing_path() -> &'static Path {
        Path::new(env!("CARGO_MANIFEST_DIR"))
    }

    fn cli_unreachable() -> Result<(), String> {
        Err("exited with exit status: 1".into())
    }

    #[test]
    fn missing_docker_host_socket_names_the_path() {
        let err = probe_with(
            Some(format!("unix://{MISSING}")),
            existing_path(),
            || Ok(()),
        )
        .expect_err("socket does not exist");
        assert_eq!(
            err,
            ProbeFailure::HostSocketMissing {
                path: PathBuf::from(MISSING)
            }
        );
        assert_eq!(
            err.to_string(),
            "DOCKER_HOST socket /definitely/missing.sock does not exist"
        );
    }

    #[test]
    fn docker_host_wins_over_the_default_socket() {
        let socket = format!("unix://{}", existing_path().display());
        assert_eq!(
            probe_with(Some(socket), Path::new(MISSING), cli_unreachable),
            Ok(RuntimeEndpoint::HostSocket(existing_path().to_path_buf()))
        );
        assert_eq!(
            probe_with(
                Some("tcp://127.0.0.1:2375".into()),
                Path::new(MISSING),
                cli_unreachable
            ),
            Ok(RuntimeEndpoint::Remote("tcp://127.0.0.1:2375".into()))
        );
    }

    #[test]
    fn default_socket_then_cli_are_tried() {
        assert_eq!(
            probe_with(None, existing_path(), cli_unreachable),
            Ok(RuntimeEndpoint::DefaultSocket)
        );
        assert_eq!(
            probe_with(None, Path::new(MISSING), || Ok(())),
            Ok(RuntimeEndpoint::Cli)
        );
    }

    #[test]
    fn failed_cli_reports_socket_and_detail() {
        let err = probe_with(None, Path::new(MISSING), cli_unreachable)
            .expect_err("nothing is reachable");
        assert_eq!(
            err.to_string(),
            "/definitely/missing.sock is missing and `docker info` failed: \
             exited with exit status: 1"
        );
    }

    #[test]
    fn availability_follows_the_probe() {
        assert_eq!(docker_available(), probe_runtime().is_ok());
    }
}
