// All formatting functionality is in reportfmt-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod config_locator;

// Re-export core types for convenience
pub use reportfmt_core::*;

pub use config_locator::{load_config, user_config_path, ConfigSource};
