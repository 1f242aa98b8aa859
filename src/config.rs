use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "murmur", about = "A small social feed server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used when building links to stored media.
    pub public_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
    pub max_upload_kb: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of issued bearer tokens. Zero means tokens never expire.
    pub token_hours: u64,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub default_page_size: u32,
    /// Optional cap on caller supplied page sizes. Unbounded when unset.
    pub max_page_size: Option<u32>,
    pub case_sensitive_search: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_url: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_upload_kb: 20480,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_hours: 720,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: None,
            case_sensitive_search: false,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("murmur.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("storage"));
        }
        if config.server.public_url.is_none() {
            config.server.public_url = Some(format!("http://localhost:{}", config.server.port));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".murmur")
        })
    }

    /// Build a config rooted entirely inside `data_dir`, ignoring any file on disk.
    pub fn for_data_dir(data_dir: &std::path::Path) -> Self {
        let mut config = Config::default();
        config.database.path = Some(data_dir.join("murmur.db"));
        config.storage.path = Some(data_dir.join("storage"));
        config.server.public_url = Some(format!("http://localhost:{}", config.server.port));
        config
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("murmur.db"))
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("storage"))
    }

    pub fn public_url(&self) -> String {
        self.server
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.server.port))
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.storage.max_upload_kb as usize).saturating_mul(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_for(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_hours, 720);
        assert_eq!(config.feed.default_page_size, 10);
        assert!(config.feed.max_page_size.is_none());
        assert!(!config.feed.case_sensitive_search);
        assert_eq!(config.storage.max_upload_kb, 20480);
        assert!(config.database.path.is_none());
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_for(Some(PathBuf::from("/tmp/test-murmur")));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-murmur"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_murmur() {
        let dir = Config::data_dir(&cli_for(None));
        assert!(dir.ends_with(".murmur"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_for(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("murmur.db"));
        assert_eq!(config.storage_path(), tmp.path().join("storage"));
        assert_eq!(config.public_url(), "http://localhost:3000");
    }

    #[test]
    fn load_applies_cli_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: None,
            host: Some("127.0.0.1".to_string()),
            port: Some(8080),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.public_url(), "http://localhost:8080");
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
public_url = "https://feed.example.com"

[auth]
token_hours = 24

[feed]
default_page_size = 25
max_page_size = 100
case_sensitive_search = true
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.public_url(), "https://feed.example.com");
        assert_eq!(config.auth.token_hours, 24);
        assert_eq!(config.feed.default_page_size, 25);
        assert_eq!(config.feed.max_page_size, Some(100));
        assert!(config.feed.case_sensitive_search);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn for_data_dir_roots_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::for_data_dir(tmp.path());
        assert_eq!(config.db_path(), tmp.path().join("murmur.db"));
        assert_eq!(config.storage_path(), tmp.path().join("storage"));
        assert_eq!(config.max_upload_bytes(), 20480 * 1024);
    }
}
