//! Abstract data-access interface and its in-memory implementation.

mod in_memory;
mod r#trait;

pub use in_memory::InMemoryDirectory;
pub use r#trait::{Directory, DirectoryTx, StoreError, in_transaction};
