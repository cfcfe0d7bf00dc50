//! Field conquest: a territory-claiming game over a shared grid of one million
//! fields, played through four independent channels.
//!
//! The crate follows a hexagonal layout:
//! - [`domain`]: value types, game components and the driving/driven ports.
//! - [`outbound`]: store adapters (Redis and in-memory).
//! - [`inbound`]: channel adapters translating requests into port calls.
//! - [`config`]: runtime settings.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
