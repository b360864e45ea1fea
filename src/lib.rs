mod config;

pub use config::*;
pub use helm_core::*;
#[cfg(feature = "memory")]
pub use helm_memory;
#[cfg(feature = "sqlite")]
pub use helm_sqlite;
