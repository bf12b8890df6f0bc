//! Portfolio backend library modules.
//!
//! The crate is organised around a hexagonal boundary: `domain` holds the
//! mutation pipeline, principal resolution, reference synchronization, and
//! the ports they speak through; `inbound` and `outbound` hold the thin
//! adapters; `server` assembles a runtime from configuration.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use domain::TraceId;
pub use middleware::Trace;
