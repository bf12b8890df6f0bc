//! Outbound adapters implementing the domain's driven ports.

pub mod identity;
pub mod mongo;
pub mod queue;
pub mod search;
