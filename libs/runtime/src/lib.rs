//! Process-level plumbing: layered configuration and logging.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, AuthConfig, CacheConfig, CliArgs, JobsConfig, LoggingConfig, PaginationConfig,
    Section, ServerConfig,
};
pub use logging::{init_logging_from_config, rotated_log_files};
