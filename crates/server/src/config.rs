//! Server configuration.
//!
//! Process-level settings (listen address, data directory, log format,
//! metrics) come from CLI flags or `CAMPUS__LEDGER__*` environment variables
//! via clap. Ledger settings (referral and session tuning) come from an
//! optional TOML file merged with the same environment prefix, using `__` for
//! nesting:
//!
//! ```bash
//! CAMPUS__LEDGER__REFERRAL__PREMIUM_UNLOCK_THRESHOLD=5 \
//! CAMPUS__LEDGER__SESSION__TOKEN_TTL=30days \
//! campus-ledger --listen 0.0.0.0:8080 --data /var/lib/campus-ledger
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use campus_ledger_types::config::{ConfigError as LedgerConfigError, ReferralConfig, SessionConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

/// Environment variable prefix shared by clap and the config loader.
pub const ENV_PREFIX: &str = "CAMPUS__LEDGER";

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(name = "campus-ledger", version, about = "Campus referral ledger and session service")]
pub struct Cli {
    /// Optional subcommand; starts the server when omitted.
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Server settings.
    #[command(flatten)]
    pub config: Config,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Configuration utilities.
    Config {
        /// What to print.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommand actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the JSON schema of the ledger settings file.
    Schema,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// One JSON object per line.
    Json,
    /// JSON when stdout is not a terminal, text otherwise.
    #[default]
    Auto,
}

/// Process-level server settings.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Address the HTTP API listens on.
    #[arg(long = "listen", env = "CAMPUS__LEDGER__LISTEN", default_value = "127.0.0.1:8080")]
    pub listen_addr: SocketAddr,

    /// Data directory holding the ledger database. Ephemeral when unset.
    #[arg(long = "data", env = "CAMPUS__LEDGER__DATA")]
    pub data_dir: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "CAMPUS__LEDGER__LOG_FORMAT", value_enum, default_value_t = LogFormat::Auto)]
    pub log_format: LogFormat,

    /// Address for the Prometheus exporter. Disabled when unset.
    #[arg(long = "metrics", env = "CAMPUS__LEDGER__METRICS")]
    pub metrics_addr: Option<SocketAddr>,

    /// TOML file with ledger settings.
    #[arg(long = "config", env = "CAMPUS__LEDGER__CONFIG")]
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Whether no data directory was configured.
    pub fn is_ephemeral(&self) -> bool {
        self.data_dir.is_none()
    }

    /// Whether the listener only accepts loopback connections.
    pub fn is_localhost_only(&self) -> bool {
        self.listen_addr.ip().is_loopback()
    }

    /// Returns the data directory, creating it if needed.
    ///
    /// Without a configured directory, a per-process directory under the
    /// system temp dir is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir().join(format!("campus-ledger-{}", std::process::id())),
        };
        std::fs::create_dir_all(&dir)
            .context(DataDirSnafu { path: dir.display().to_string() })?;
        Ok(dir)
    }

    /// Deletes `dir` when running ephemeral; a persistent directory is kept.
    ///
    /// Failures are logged, not returned.
    pub fn remove_ephemeral_data(&self, dir: &Path) {
        if !self.is_ephemeral() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(dir) {
            tracing::warn!(error = %e, data_dir = %dir.display(), "Failed to remove ephemeral data");
        }
    }
}

/// Ledger settings loaded from file and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerSettings {
    /// Referral ledger tuning.
    #[serde(default)]
    pub referral: ReferralConfig,
    /// Session manager and expiry sweep tuning.
    #[serde(default)]
    pub session: SessionConfig,
}

impl LedgerSettings {
    /// Loads settings from `path` (if given) and `CAMPUS__LEDGER__*`
    /// environment variables, then validates them.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a value is
    /// out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        // Single underscores in field names are preserved
        // (CAMPUS__LEDGER__SESSION__TOKEN_TTL → session.token_ttl).
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
        );

        let settings: Self = builder
            .build()
            .context(LoadSnafu)?
            .try_deserialize()
            .context(LoadSnafu)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates both sections.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.referral.validate().context(InvalidSnafu)?;
        self.session.validate().context(InvalidSnafu)?;
        Ok(())
    }
}

/// Renders the JSON schema of [`LedgerSettings`].
pub fn generate_config_schema() -> String {
    let schema = schemars::schema_for!(LedgerSettings);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Configuration error.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// The settings file or environment could not be read or parsed.
    #[snafu(display("failed to load config: {source}"))]
    Load { source: config::ConfigError },

    /// A setting is out of range.
    #[snafu(display("{source}"))]
    Invalid { source: LedgerConfigError },

    /// The data directory could not be created.
    #[snafu(display("failed to create data directory {path}: {source}"))]
    DataDir { path: String, source: std::io::Error },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["campus-ledger"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert!(cli.config.is_ephemeral());
        assert!(cli.config.is_localhost_only());
        assert_eq!(cli.config.log_format, LogFormat::Auto);
        assert!(cli.config.metrics_addr.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "campus-ledger",
            "--listen",
            "0.0.0.0:9000",
            "--data",
            "/tmp/ledger",
            "--log-format",
            "json",
            "--metrics",
            "127.0.0.1:9100",
        ])
        .unwrap();
        assert!(!cli.config.is_localhost_only());
        assert!(!cli.config.is_ephemeral());
        assert_eq!(cli.config.log_format, LogFormat::Json);
        assert_eq!(cli.config.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    }

    #[test]
    fn test_cli_config_schema_subcommand() {
        let cli = Cli::try_parse_from(["campus-ledger", "config", "schema"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(CliCommand::Config { action: ConfigAction::Schema })
        ));
    }

    #[test]
    fn test_load_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(
            &path,
            "[referral]\npremium_unlock_threshold = 5\n\n[session]\ntoken_ttl = \"30days\"\n",
        )
        .unwrap();

        let settings = LedgerSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.referral.premium_unlock_threshold, 5);
        assert_eq!(settings.referral.code_length, 8);
        assert_eq!(settings.session.token_ttl, Duration::from_secs(30 * 24 * 60 * 60));
        assert_eq!(settings.session.sweep_batch_size, 1000);
    }

    #[test]
    fn test_load_settings_rejects_zero_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(&path, "[referral]\npremium_unlock_threshold = 0\n").unwrap();

        let err = LedgerSettings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("premium_unlock_threshold"));
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = LedgerSettings::load(Some(Path::new("/nonexistent/ledger.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_resolve_data_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/data");
        let cli = Cli::try_parse_from(["campus-ledger", "--data", target.to_str().unwrap()]).unwrap();

        let resolved = cli.config.resolve_data_dir().unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn test_remove_ephemeral_data_only_when_ephemeral() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("ledger.redb"), b"x").unwrap();

        let persistent =
            Cli::try_parse_from(["campus-ledger", "--data", data.to_str().unwrap()]).unwrap();
        persistent.config.remove_ephemeral_data(&data);
        assert!(data.join("ledger.redb").exists());

        let ephemeral = Cli::try_parse_from(["campus-ledger"]).unwrap();
        ephemeral.config.remove_ephemeral_data(&data);
        assert!(!data.exists());

        // Already gone: logged, not a panic.
        ephemeral.config.remove_ephemeral_data(&data);
    }

    #[test]
    fn test_schema_mentions_sections() {
        let schema = generate_config_schema();
        assert!(schema.contains("referral"));
        assert!(schema.contains("premium_unlock_threshold"));
        assert!(schema.contains("token_ttl"));
    }
}
