//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{ConfigLocation, default_config_path, default_log_path, locate_config, path_has_symlink_ancestor};
pub use types::{Config, LogLevel, QuicklinkConfig, UserEntry};
pub use xml::{LoadResult, create_template_config, load_config_from_xml_path, load_config_from_xml_str, load_or_init};

/// Environment variable naming an explicit config file (or directory holding config.xml).
pub const CONFIG_ENV: &str = "CLOUD_QUICKLINK_CONFIG";
pub const APP_DIR: &str = "cloud_quicklink";
pub const CONFIG_FILE_NAME: &str = "config.xml";
pub const LOG_FILE_NAME: &str = "cloud_quicklink.log";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
