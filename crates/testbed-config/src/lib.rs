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

//! Typed configuration for the testbed harnesses.
//!
//! Layout: `defaults.rs` (baseline values), `model.rs` (serde models),
//! `loader.rs` (`TESTBED_*` environment overrides), `validate.rs` (field checks).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::TestbedConfig;
pub use model::{
    LogSource, MemoryStoreConfig, MockResponderConfig, PostgresHarnessConfig, ReadinessConfig,
};
