#![forbid(unsafe_code)]
#![warn(
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
#![allow(clippy::redundant_pub_crate)]

//! Command line interface to a running Vulcan proxy's control plane.
//!
//! Layout:
//! - `global.rs`: position-independent `-vulcan` option pre-pass
//! - `tree.rs`: `(noun, verb)` command tree and flag parsing
//! - `schema.rs`: declared flag schemas with presence tracking
//! - `mapper.rs`: location option flags to nested option records
//! - `policy.rs`: registry of policy kinds exposed as extra nouns
//! - `client.rs`: errors, the control-plane interface, and its HTTP client
//! - `commands/`: command handlers grouped by object
//! - `output.rs`: renderers for table and JSON output
//! - `cli.rs`: the dispatcher behind `run()`
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod global;
pub(crate) mod mapper;
pub(crate) mod output;
pub(crate) mod policy;
pub(crate) mod schema;
pub(crate) mod telemetry;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod tree;

pub use cli::run;
