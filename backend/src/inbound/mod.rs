//! Inbound adapters that translate external requests into driving-port calls
//! while keeping transport details at the edge.
//!
//! The command line is the only channel shipped here; the four game channels
//! (web service, REST, GraphQL, gRPC) sit alongside it as further adapters
//! over the same ports.

pub mod cli;
