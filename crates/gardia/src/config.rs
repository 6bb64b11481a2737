//! Configuration management for gardia.
//!
//! This module provides configuration loading and validation using figment,
//! supporting a YAML config file, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use gardia_mesh::{DEFAULT_BAUD_RATE, MAX_TEXT_PAYLOAD};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::compact::{AlertTypes, MIN_PRACTICAL_LIMIT};
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Environment variable prefix. Nested keys are separated by `__`, as in
/// `GARDIA_WEB__PORT=9090`.
const ENV_PREFIX: &str = "GARDIA_";

/// Release date reported by `/version`.
pub const BUILD_DATE: &str = "2025-07-16";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `GARDIA_`)
/// 2. YAML config file, `config.yaml` in the working directory by default
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application identity.
    pub app: AppConfig,
    /// Web server configuration.
    pub web: WebConfig,
    /// Admin console configuration.
    pub admin: AdminConfig,
    /// Radio link configuration.
    pub meshtastic: MeshtasticConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Incident-type labels and their on-air codes.
    pub alert_types: AlertTypes,
    /// Logos shown on the intake form.
    pub logos: LogosConfig,
}

/// Application identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display name.
    pub name: String,
    /// Version shown on the form and reported by `/version`.
    pub version: String,
    /// Release date reported by `/version`.
    pub build_date: String,
}

/// Web server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Debug-level logging, request traces included, when no `-v`/`-q`
    /// flag is given.
    pub debug: bool,
    /// Directory holding `index.html`.
    pub template_dir: PathBuf,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
}

/// Admin console configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/admin` routes.
    pub enabled: bool,
    /// Admin login.
    pub username: String,
    /// Admin password.
    pub password: String,
    /// Session lifetime in seconds.
    pub session_timeout: u64,
}

/// Radio link configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshtasticConfig {
    /// Serial device of the node.
    pub device: String,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Channel index the alerts are sent on.
    pub channel_index: u32,
    /// Channel name shown on the form.
    pub channel_name: String,
    /// Payload budget in bytes.
    pub max_message_length: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when no `-v`/`-q` flag is given.
    pub level: String,
    /// Log every submitted field instead of a one-line summary.
    pub log_all_data: bool,
}

/// Logos shown above the intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogosConfig {
    /// Render the logos section.
    pub enabled: bool,
    /// First logo.
    pub logo1: LogoConfig,
    /// Second logo.
    pub logo2: LogoConfig,
    /// Third logo.
    pub logo3: LogoConfig,
}

/// One logo, looked up in the static directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoConfig {
    /// File name inside `web.static_dir`.
    pub file: String,
    /// Alternative text.
    pub alt: String,
    /// Optional link target; empty for none.
    pub link: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Emergency Meshtastic Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_date: BUILD_DATE.to_string(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            debug: false,
            template_dir: PathBuf::from("./templates"),
            static_dir: PathBuf::from("./static"),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            username: "admin".to_string(),
            password: "admin123".to_string(),
            session_timeout: 3600,
        }
    }
}

impl Default for MeshtasticConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            channel_index: 1,
            channel_name: "Fr-Emcom".to_string(),
            max_message_length: 200,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            log_all_data: true,
        }
    }
}

impl Default for LogosConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            logo1: LogoConfig::numbered(1),
            logo2: LogoConfig::numbered(2),
            logo3: LogoConfig::numbered(3),
        }
    }
}

impl LogoConfig {
    fn numbered(n: u8) -> Self {
        Self {
            file: format!("logo{n}.png"),
            alt: format!("Logo {n}"),
            link: String::new(),
        }
    }
}

impl LogosConfig {
    /// The three logos with their 1-based position.
    #[must_use]
    pub fn entries(&self) -> [(u8, &LogoConfig); 3] {
        [(1, &self.logo1), (2, &self.logo2), (3, &self.logo3)]
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults and environment variables
    /// still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML text over the defaults, without touching the
    /// environment or the file system.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is empty, not valid YAML, or describes an
    /// invalid configuration.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(Error::config_validation("configuration is empty"));
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::string(content))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.web.port == 0 {
            return Err(Error::config_validation("web.port must be greater than 0"));
        }

        if self.admin.enabled && self.admin.session_timeout == 0 {
            return Err(Error::config_validation(
                "admin.session_timeout must be greater than 0",
            ));
        }

        if self.alert_types.is_empty() {
            return Err(Error::config_validation(
                "alert_types must contain at least one entry",
            ));
        }

        let limit = self.meshtastic.max_message_length;
        if limit == 0 {
            return Err(Error::config_validation(
                "meshtastic.max_message_length must be greater than 0",
            ));
        }
        if limit > MAX_TEXT_PAYLOAD {
            return Err(Error::config_validation(format!(
                "meshtastic.max_message_length ({limit}) exceeds the mesh packet payload ({MAX_TEXT_PAYLOAD})"
            )));
        }
        if limit < MIN_PRACTICAL_LIMIT {
            warn!(
                "meshtastic.max_message_length is {} bytes; below {} payloads may be cut into invalid JSON",
                limit, MIN_PRACTICAL_LIMIT
            );
        }

        Ok(())
    }

    /// Render this configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the default configuration to `path`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_default(path: &Path) -> Result<()> {
        let content = Config::default().to_yaml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::ConfigWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write_file(path, &content)?;
        info!("Default configuration written to {}", path.display());
        Ok(())
    }

    /// Replace the file at `path` with `content`, first copying any existing
    /// file to `<path>.bak`. The content is written as UTF-8 with `\n` line
    /// endings.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup copy or the write fails.
    pub fn save_with_backup(path: &Path, content: &str) -> Result<()> {
        if path.exists() {
            let backup = backup_path(path);
            std::fs::copy(path, &backup).map_err(|source| Error::ConfigWrite {
                path: backup.clone(),
                source,
            })?;
            info!("Previous configuration saved to {}", backup.display());
        }
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
        write_file(path, normalized.trim())?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Payload budget of the radio link.
    #[must_use]
    pub fn message_limit(&self) -> usize {
        self.meshtastic.max_message_length
    }

    /// Admin session lifetime.
    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.admin.session_timeout)
    }

    /// Path of the form template.
    #[must_use]
    pub fn template_path(&self) -> PathBuf {
        self.web.template_dir.join("index.html")
    }

    /// `host:port` the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}

/// Backup location for `path`: the same name with `.bak` appended.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let mut bytes = content.as_bytes().to_vec();
    if !content.ends_with('\n') {
        bytes.push(b'\n');
    }
    std::fs::write(path, bytes).map_err(|source| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 8080);
        assert!(config.admin.enabled);
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.admin.session_timeout, 3600);
        assert_eq!(config.meshtastic.device, "/dev/ttyUSB0");
        assert_eq!(config.meshtastic.baud_rate, 115_200);
        assert_eq!(config.meshtastic.channel_index, 1);
        assert_eq!(config.meshtastic.channel_name, "Fr-Emcom");
        assert_eq!(config.meshtastic.max_message_length, 200);
        assert_eq!(config.logging.level, "INFO");
        assert!(config.logging.log_all_data);
        assert_eq!(config.alert_types, AlertTypes::default());
    }

    #[test]
    fn test_default_logos() {
        let logos = LogosConfig::default();

        assert!(logos.enabled);
        let files: Vec<_> = logos.entries().iter().map(|(_, l)| l.file.clone()).collect();
        assert_eq!(files, vec!["logo1.png", "logo2.png", "logo3.png"]);
        assert_eq!(logos.logo2.alt, "Logo 2");
        assert!(logos.logo3.link.is_empty());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.web.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("web.port"));
    }

    #[test]
    fn test_validate_zero_session_timeout() {
        let mut config = Config::default();
        config.admin.session_timeout = 0;
        assert!(config.validate().is_err());

        config.admin.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_alert_types() {
        let mut config = Config::default();
        config.alert_types = AlertTypes::from_pairs(Vec::<(String, u32)>::new());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("alert_types"));
    }

    #[test]
    fn test_validate_message_length_bounds() {
        let mut config = Config::default();
        config.meshtastic.max_message_length = 0;
        assert!(config.validate().is_err());

        config.meshtastic.max_message_length = MAX_TEXT_PAYLOAD + 1;
        assert!(config.validate().is_err());

        // Below the practical floor is accepted with a warning.
        config.meshtastic.max_message_length = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.yaml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "web:\n  port: 9090\nmeshtastic:\n  channel_index: 2\n  channel_name: Local\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.meshtastic.channel_index, 2);
        assert_eq!(config.meshtastic.channel_name, "Local");
        assert_eq!(config.meshtastic.max_message_length, 200);
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "web:\n  port: [not a port\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
    }

    #[test]
    fn test_from_yaml_str_alert_types() {
        let yaml = "alert_types:\n  Incendie: 1\n  Inondation: 4\n  Autre: 3\n";
        let config = Config::from_yaml_str(yaml).unwrap();

        assert_eq!(config.alert_types.code_for("Inondation"), 4);
        // Maps merge over the defaults, so built-in labels remain.
        assert_eq!(config.alert_types.code_for("Secours à Personnes"), 2);
        assert_eq!(config.alert_types.len(), 4);
    }

    #[test]
    fn test_from_yaml_str_empty() {
        assert!(Config::from_yaml_str("  \n").is_err());
    }

    #[test]
    fn test_from_yaml_str_invalid_values() {
        let yaml = "meshtastic:\n  max_message_length: 0\n";
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        Config::write_default(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Secours à Personnes"));

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.meshtastic, MeshtasticConfig::default());
        assert_eq!(config.alert_types, AlertTypes::default());
    }

    #[test]
    fn test_save_with_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "web:\n  port: 8080\n").unwrap();

        Config::save_with_backup(&path, "web:\r\n  port: 9000\r\n").unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved, "web:\n  port: 9000\n");
        let backup = std::fs::read_to_string(backup_path(&path)).unwrap();
        assert_eq!(backup, "web:\n  port: 8080\n");
    }

    #[test]
    fn test_save_without_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        Config::save_with_backup(&path, "web:\n  port: 9000").unwrap();
        assert!(path.exists());
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/etc/gardia/config.yaml")),
            PathBuf::from("/etc/gardia/config.yaml.bak")
        );
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(Config::default_config_path(), PathBuf::from("config.yaml"));
    }

    #[test]
    fn test_derived_values() {
        let config = Config::default();

        assert_eq!(config.message_limit(), 200);
        assert_eq!(config.session_timeout(), Duration::from_secs(3600));
        assert_eq!(config.template_path(), PathBuf::from("./templates/index.html"));
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("max_message_length"));
        assert!(json.contains("session_timeout"));
    }
}
