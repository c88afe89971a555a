//! Service wiring for the HTTP layer.

use std::sync::Arc;

use guildhall_auth::Argon2PasswordHasher;
use guildhall_core::DomainResult;
use guildhall_infra::{GuildhallConfig, InMemoryDirectory, Services, seed};

/// The services every handler receives through an `Extension`.
pub type AppServices = Services<Arc<InMemoryDirectory>>;

/// Seed a fresh in-memory directory and wire the services over it.
pub fn build_services(config: &GuildhallConfig) -> DomainResult<AppServices> {
    let directory = Arc::new(InMemoryDirectory::new());
    seed(&directory, config.bootstrap_admin.as_ref(), &Argon2PasswordHasher)?;
    Ok(Services::new(directory, config))
}
