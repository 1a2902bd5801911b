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

//! Single-call business logic used to exercise each testbed harness.
//!
//! Every call opens its own connection, performs one unit of work, and
//! returns the value or the underlying driver error untouched.

pub mod database;
pub mod error;
pub mod http;
pub mod store;

pub use database::{db_client_call, insert_and_read_back, read_first_name};
pub use error::{CallError, CallResult, DriverError, Service};
pub use http::http_client_call;
pub use store::{fetch_key, redis_client_call};
