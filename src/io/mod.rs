pub mod config_io;
pub mod files;

pub use config_io::{ConfigError, load_config};
pub use files::atomic_write;
