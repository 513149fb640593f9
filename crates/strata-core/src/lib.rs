pub mod config;
pub mod error;
pub mod version;

pub use config::{DatabaseConfig, MigrationsConfig, StrataConfig};
pub use error::{Result, StrataError};
pub use version::{Target, VersionId, BASE_VERSION};
