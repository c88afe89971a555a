//! Infrastructure layer: storage, configuration, seeding and the services
//! that run the membership rules against stored state.

pub mod config;
pub mod pending;
pub mod seed;
pub mod services;
pub mod store;

pub use config::{BootstrapAdmin, GuildhallConfig};
pub use seed::{SeedReport, seed};
pub use services::Services;
pub use store::{Directory, DirectoryTx, InMemoryDirectory, StoreError, in_transaction};

#[cfg(test)]
mod test_support;
