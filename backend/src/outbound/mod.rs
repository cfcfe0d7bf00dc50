//! Outbound adapters implementing the conquest store port.
//!
//! - **redis**: the production store, one Redis command per port call
//! - **memory**: a process-local store with the same semantics
//!
//! Adapters are thin translators between the port's vocabulary and the
//! backing store. They contain no game rules.

pub mod memory;
pub mod redis;
