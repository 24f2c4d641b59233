use crate::database::Database;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File as ConfigFile, FileFormat};
use eyre::{eyre, Context, Result};
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::time::Duration;

const EXAMPLE_CONFIG: &str = include_str!("../config.toml");

pub const CREDENTIALS_KEY: &str = "tally.settings";

const LEASE_MARGIN_SECS: u64 = 5;

/// Local client settings, read from `config.toml` and `TALLY_*` environment variables.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Settings {
    pub db_path: String,
    pub reference_offset_minutes: i32,
    pub request_timeout_secs: u64,
    pub probe_timeout_ms: u64,
    pub flush_lease_secs: i64,
    pub watch_interval_secs: u64,
}

impl Settings {
    pub fn build_default() -> Result<ConfigBuilder<DefaultState>> {
        let data_dir = tally_common::utils::data_dir();
        let db_path = data_dir.join("tally.db");

        Ok(Config::builder()
            .set_default("db_path", db_path.to_str())?
            .set_default("reference_offset_minutes", crate::datetime::DEFAULT_OFFSET_MINUTES)?
            .set_default("request_timeout_secs", 30)?
            .set_default("probe_timeout_ms", 1500)?
            .set_default("flush_lease_secs", 120)?
            .set_default("watch_interval_secs", 15)?
            .add_source(
                Environment::with_prefix("tally")
                    .prefix_separator("_")
                    .separator("__"),
            ))
    }

    pub fn new() -> Result<Self> {
        let config_dir = tally_common::utils::config_dir();
        let data_dir = tally_common::utils::data_dir();

        create_dir_all(&config_dir)
            .wrap_err_with(|| format!("Failed to create dir {config_dir:?}"))?;
        create_dir_all(&data_dir).wrap_err_with(|| format!("Failed to create dir {data_dir:?}"))?;

        let config_file = config_dir.join("config.toml");

        let mut config_builder = Self::build_default()?;
        config_builder = if config_file.exists() {
            config_builder.add_source(ConfigFile::from(config_file.as_path()).format(FileFormat::Toml))
        } else {
            let mut file = File::create(&config_file).wrap_err("Failed to create config file")?;
            file.write_all(EXAMPLE_CONFIG.as_bytes())
                .wrap_err("Failed to write default config file")?;
            config_builder
        };

        let mut settings: Settings = config_builder
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize {}", e))?;

        settings.db_path = expand_shell(&settings.db_path)?;

        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Never shorter than one request plus a margin, since the lease is only
    /// renewed between requests.
    pub fn flush_lease(&self) -> time::Duration {
        let floor = self.request_timeout_secs.saturating_add(LEASE_MARGIN_SECS);
        let floor = i64::try_from(floor).unwrap_or(i64::MAX);
        time::Duration::seconds(self.flush_lease_secs.max(floor))
    }
}

fn expand_shell(value: &str) -> Result<String> {
    Ok(shellexpand::full(value)?.to_string())
}

/// Backend credentials. Persisted in the local store rather than `config.toml`
/// because the user edits them through the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub backend_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub dashboard_url: String,
}

impl Credentials {
    pub fn new(backend_url: &str, api_token: &str, dashboard_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim().to_string(),
            api_token: api_token.trim().to_string(),
            dashboard_url: dashboard_url.trim().to_string(),
        }
    }

    /// Without both a URL and a token every network operation is disabled.
    pub fn is_complete(&self) -> bool {
        !self.backend_url.is_empty() && !self.api_token.is_empty()
    }

    pub async fn load(db: &Database) -> Result<Self> {
        Ok(db.get_json(CREDENTIALS_KEY).await?.unwrap_or_default())
    }

    pub async fn save(&self, db: &Database) -> Result<()> {
        db.put_json(CREDENTIALS_KEY, self).await
    }

    /// Token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        let count = self.api_token.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.api_token.chars().skip(count - 4).collect();
        format!("{}{tail}", "*".repeat(count - 4))
    }
}
