use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Application configuration: typed global sections plus a per-module bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub home_dir: String, // will be normalized to absolute path
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub timeout_sec: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    pub entity_ttl_secs: u64,
    pub collection_ttl_secs: u64,
    /// Upper bound on cached payloads; the least recently used one is evicted.
    pub max_entries: usize,
    /// Period of the expired-entry sweep.
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct PaginationConfig {
    pub items_per_page: u64,
    pub maximum_items_per_page: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AuthConfig {
    /// HS256 secret. The bearer gate is only mounted when this is set.
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct JobsConfig {
    pub enabled: bool,
    /// Blacklisted tokens are kept this many days past their expiration.
    pub token_retention_days: u32,
    pub upload_logs: bool,
    /// How many of the newest rotated log files one upload hands over.
    pub log_upload_count: usize,
    /// Where the archive shipper copies log files (relative to home_dir).
    pub archive_dir: String,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    pub file: String,          // "logs/burger.log"
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>, // How many rotated files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Empty => $HOME/.backend_burger
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            timeout_sec: 0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entity_ttl_secs: 60 * 60,
            collection_ttl_secs: 5 * 60,
            max_entries: 10_000,
            purge_interval_secs: 60,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            items_per_page: 20,
            maximum_items_per_page: 100,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_retention_days: 0,
            upload_logs: true,
            log_upload_count: 7,
            archive_dir: "logs/archive".to_string(),
        }
    }
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/backend_burger.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(7),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: Some(default_logging_config()),
            cache: CacheConfig::default(),
            pagination: PaginationConfig::default(),
            auth: AuthConfig::default(),
            jobs: JobsConfig::default(),
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    /// Also normalizes `server.home_dir` into an absolute path and creates the directory.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.is_file() {
            anyhow::bail!("config file not found: {}", path.display());
        }

        // Logging stays None unless YAML/ENV provides it.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            // Example: APP__SERVER__PORT=8000 maps to server.port
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .context("Failed to extract config from figment")?;

        normalize_home_dir_inplace(&mut config.server)
            .context("Failed to resolve server.home_dir")?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file or fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.server)
                    .context("Failed to resolve server.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let p = &self.pagination;
        if p.items_per_page == 0 || p.items_per_page > p.maximum_items_per_page {
            anyhow::bail!(
                "pagination.items_per_page must be in 1..={}, got {}",
                p.maximum_items_per_page,
                p.items_per_page
            );
        }
        if self.cache.entity_ttl_secs == 0 || self.cache.collection_ttl_secs == 0 {
            anyhow::bail!("cache TTLs must be positive");
        }
        if self.cache.max_entries == 0 || self.cache.purge_interval_secs == 0 {
            anyhow::bail!("cache.max_entries and cache.purge_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }

    pub fn home_dir(&self) -> &Path {
        Path::new(&self.server.home_dir)
    }
}

/// Command line arguments relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
}

const DEFAULT_SUBDIR: &str = ".backend_burger";

/// Expand `~`, make absolute and create the directory.
fn resolve_home_dir(raw: Option<&str>) -> Result<PathBuf> {
    let user_home = dirs::home_dir().context("cannot determine the user's home directory")?;

    let path = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => user_home.join(DEFAULT_SUBDIR),
        Some("~") => user_home,
        Some(s) => match s.strip_prefix("~/") {
            Some(rest) => user_home.join(rest),
            None => PathBuf::from(s),
        },
    };
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("cannot read the current directory")?
            .join(path)
    };

    std::fs::create_dir_all(&path)
        .with_context(|| format!("cannot create home_dir {}", path.display()))?;
    Ok(path)
}

fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let resolved = resolve_home_dir(Some(&server.home_dir))?;
    server.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.home_dir, "");

        assert_eq!(config.cache.entity_ttl_secs, 3600);
        assert_eq!(config.cache.collection_ttl_secs, 300);
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.cache.purge_interval_secs, 60);
        assert_eq!(config.pagination.items_per_page, 20);
        assert_eq!(config.pagination.maximum_items_per_page, 100);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.jobs.log_upload_count, 7);

        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "info");
    }

    #[test]
    fn test_load_layered_reads_sections() {
        let tmp = tempdir().unwrap();
        let home = tmp.path().join("home");
        let cfg_path = tmp.path().join("cfg.yaml");

        let yaml = format!(
            r#"
server:
  home_dir: "{}"
  host: "0.0.0.0"
  port: 9090
  timeout_sec: 30

cache:
  collection_ttl_secs: 60

pagination:
  items_per_page: 10
  maximum_items_per_page: 50

auth:
  jwt_secret: "s3cret"

logging:
  default:
    console_level: debug
    file: "logs/default.log"
"#,
            home.to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(home.is_dir());
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.timeout_sec, 30);
        // unspecified keys keep their defaults
        assert_eq!(config.cache.entity_ttl_secs, 3600);
        assert_eq!(config.cache.collection_ttl_secs, 60);
        assert_eq!(config.pagination.items_per_page, 10);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.logging.as_ref().unwrap()["default"].file, "logs/default.log");
    }

    #[test]
    fn test_minimal_yaml_leaves_logging_unset() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let home = tmp.path().join("minimal");
        fs::write(
            &cfg_path,
            format!(
                "server:\n  home_dir: \"{}\"\n  host: localhost\n  port: 8080\n",
                home.to_string_lossy().replace('\\', "/")
            ),
        )
        .unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert!(Path::new(&config.server.home_dir).is_absolute());
        assert!(config.logging.is_none());
        assert_eq!(config.pagination, PaginationConfig::default());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_invalid_pagination_is_rejected() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let home = tmp.path().join("bad");
        fs::write(
            &cfg_path,
            format!(
                "server:\n  home_dir: \"{}\"\n  host: localhost\n  port: 8080\npagination:\n  items_per_page: 500\n",
                home.to_string_lossy().replace('\\', "/")
            ),
        )
        .unwrap();

        let err = AppConfig::load_layered(&cfg_path).unwrap_err();
        assert!(err.to_string().contains("items_per_page"));
    }

    #[test]
    fn test_unbounded_cache_is_rejected() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let home = tmp.path().join("home");
        fs::write(
            &cfg_path,
            format!(
                "server:\n  home_dir: \"{}\"\n  host: localhost\n  port: 8080\ncache:\n  max_entries: 0\n",
                home.to_string_lossy().replace('\\', "/")
            ),
        )
        .unwrap();

        let err = AppConfig::load_layered(&cfg_path).unwrap_err();
        assert!(err.to_string().contains("max_entries"));
    }

    #[test]
    fn test_cli_verbose_levels_matrix() {
        for (verbose, expected) in [(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")] {
            let mut config = AppConfig::default();
            config.apply_cli_overrides(&CliArgs {
                port: Some(3000),
                verbose,
                ..CliArgs::default()
            });
            assert_eq!(config.server.port, 3000);
            assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, expected);
        }
    }

    #[test]
    fn test_to_yaml_roundtrip_basic() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("pagination:"));
        let back: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.server.port, config.server.port);
        assert_eq!(back.cache, config.cache);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = AppConfig::load_layered(tmp.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_missing_required_server_field() {
        let invalid = "server:\n  home_dir: \"/tmp\"\n  port: 8000\n";
        assert!(serde_yaml::from_str::<AppConfig>(invalid).is_err());
    }
}
