use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scribe", about = "A markdown blogging server")]
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
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret used to sign access tokens. Required; may come from the
    /// SCRIBE_JWT_SECRET environment variable instead of the config file.
    pub jwt_secret: Option<String>,
    /// Secret used to sign refresh tokens. Required; env var
    /// SCRIBE_JWT_REFRESH_SECRET takes precedence.
    pub jwt_refresh_secret: Option<String>,
    pub access_token_minutes: u64,
    pub refresh_token_days: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_refresh_secret: None,
            access_token_minutes: 15,
            refresh_token_days: 30,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
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

        // Environment overrides for secrets
        if let Ok(secret) = std::env::var("SCRIBE_JWT_SECRET") {
            config.auth.jwt_secret = Some(secret);
        }
        if let Ok(secret) = std::env::var("SCRIBE_JWT_REFRESH_SECRET") {
            config.auth.jwt_refresh_secret = Some(secret);
        }

        // Secrets are required external input; refusing to start without
        // them beats signing tokens with a default.
        if config.auth.jwt_secret.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!(
                "JWT secret is not configured (set SCRIBE_JWT_SECRET or [auth] jwt_secret)"
            );
        }
        if config
            .auth
            .jwt_refresh_secret
            .as_deref()
            .unwrap_or("")
            .is_empty()
        {
            anyhow::bail!(
                "JWT refresh secret is not configured (set SCRIBE_JWT_REFRESH_SECRET or [auth] jwt_refresh_secret)"
            );
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("scribe.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not determine home directory")
                .join(".scribe")
        })
    }

    pub fn db_path(&self) -> &PathBuf {
        self.database.path.as_ref().unwrap()
    }

    pub fn jwt_secret(&self) -> &str {
        self.auth.jwt_secret.as_deref().unwrap_or_default()
    }

    pub fn jwt_refresh_secret(&self) -> &str {
        self.auth.jwt_refresh_secret.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_data_dir(dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(dir),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.environment, "development");
        assert_eq!(config.auth.access_token_minutes, 15);
        assert_eq!(config.auth.refresh_token_days, 30);
        assert!(config.auth.jwt_secret.is_none());
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with_data_dir(PathBuf::from("/tmp/test-scribe"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-scribe"));
    }

    #[test]
    fn load_fails_without_secrets() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = cli_with_data_dir(tmp.path().to_path_buf());
        // No config file, no env secrets set in the test process
        if std::env::var("SCRIBE_JWT_SECRET").is_err() {
            assert!(Config::load(&cli).is_err());
        }
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000
environment = "production"

[auth]
jwt_secret = "access-secret"
jwt_refresh_secret = "refresh-secret"
access_token_minutes = 5

[cors]
allowed_origins = ["https://blog.example.com"]
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
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.environment, "production");
        assert_eq!(config.auth.access_token_minutes, 5);
        assert_eq!(config.jwt_secret(), "access-secret");
        assert_eq!(config.jwt_refresh_secret(), "refresh-secret");
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://blog.example.com".to_string()]
        );
        assert_eq!(config.db_path(), &tmp.path().join("scribe.db"));
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

[auth]
jwt_secret = "a"
jwt_refresh_secret = "b"
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
}
