//! Configuration: types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{LogLevel, TransferConfig};
pub use validate::{MAX_PROGRESS_INTERVAL, ensure_destination_root};
pub use xml::{create_template_config, load_config, load_config_from_xml_path, parse_config_xml};

/// Environment variable naming an alternate config file or directory.
pub const CONFIG_ENV_VAR: &str = "FXFER_CONFIG";
