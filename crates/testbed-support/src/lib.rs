#![forbid(unsafe_code)]
#![deny(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Managed external processes for integration tests.
//! Layout: runtime.rs (container runtime discovery), container.rs (disposable Postgres),
//! memory_store/ (RESP-speaking in-memory store), http_mock.rs (canned HTTP responder).

pub mod container;
pub mod error;
pub mod http_mock;
pub mod memory_store;
pub mod runtime;

pub use container::{PostgresHarness, with_postgres};
pub use error::HarnessError;
pub use runtime::{ProbeFailure, RuntimeEndpoint, docker_available, probe_runtime};
pub use http_mock::MockResponder;
pub use memory_store::MemoryStore;
