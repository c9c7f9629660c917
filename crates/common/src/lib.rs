//! NetVerify Common Library
//!
//! Result vocabulary shared by the engine, the built-in checks and the CLI.

pub mod types;

// Re-export commonly used types
pub use types::*;

/// NetVerify version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default directory for user configuration
pub fn default_home_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".netverify")
}

/// Default CLI configuration file
pub fn default_config_path() -> std::path::PathBuf {
    default_home_path().join("config.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
