//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod conquest_command;
mod conquest_query;
mod conquest_store;

#[cfg(test)]
pub use conquest_command::MockConquestCommand;
pub use conquest_command::ConquestCommand;
#[cfg(test)]
pub use conquest_query::MockConquestQuery;
pub use conquest_query::ConquestQuery;
#[cfg(test)]
pub use conquest_store::MockConquestStore;
pub use conquest_store::{BitRange, ConquestStore, RankedMember, StoreError};
