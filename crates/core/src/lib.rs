pub mod config;
pub mod config_loader;

pub use config::{ConfigError, HedgeConfig, DEFAULT_WS_URL};
pub use config_loader::ConfigLoader;
