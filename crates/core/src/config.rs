use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub helpdesk: HelpdeskConfig,
    pub secrets: SecretsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct HelpdeskConfig {
    /// Subdomain of the helpdesk tenant, i.e. `{subdomain}.zendesk.com`.
    pub subdomain: String,
    /// Agent identity used for token authentication (`{auth_email}/token`).
    pub auth_email: String,
    /// Name of the secret holding the helpdesk API token.
    pub token_secret_id: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SecretsConfig {
    pub provider: SecretProvider,
    pub project_id: Option<String>,
    pub version: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretProvider {
    Google,
    Env,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub helpdesk_subdomain: Option<String>,
    pub helpdesk_auth_email: Option<String>,
    pub helpdesk_token_secret_id: Option<String>,
    pub secret_provider: Option<SecretProvider>,
    pub secret_project_id: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            helpdesk: HelpdeskConfig {
                subdomain: "harborpoint".to_string(),
                auth_email: "servicedesk@harborpoint.health".to_string(),
                token_secret_id: "helpdesk-api-token".to_string(),
                timeout_secs: 20,
            },
            secrets: SecretsConfig {
                provider: SecretProvider::Env,
                project_id: None,
                version: "latest".to_string(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for SecretProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "env" => Ok(Self::Env),
            other => Err(ConfigError::Validation(format!(
                "unsupported secret provider `{other}` (expected google|env)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("deskbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(helpdesk) = patch.helpdesk {
            if let Some(subdomain) = helpdesk.subdomain {
                self.helpdesk.subdomain = subdomain;
            }
            if let Some(auth_email) = helpdesk.auth_email {
                self.helpdesk.auth_email = auth_email;
            }
            if let Some(token_secret_id) = helpdesk.token_secret_id {
                self.helpdesk.token_secret_id = token_secret_id;
            }
            if let Some(timeout_secs) = helpdesk.timeout_secs {
                self.helpdesk.timeout_secs = timeout_secs;
            }
        }

        if let Some(secrets) = patch.secrets {
            if let Some(provider) = secrets.provider {
                self.secrets.provider = provider;
            }
            if let Some(project_id) = secrets.project_id {
                self.secrets.project_id = Some(project_id);
            }
            if let Some(version) = secrets.version {
                self.secrets.version = version;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DESKBOT_HELPDESK_SUBDOMAIN") {
            self.helpdesk.subdomain = value;
        }
        if let Some(value) = read_env("DESKBOT_HELPDESK_AUTH_EMAIL") {
            self.helpdesk.auth_email = value;
        }
        if let Some(value) = read_env("DESKBOT_HELPDESK_TOKEN_SECRET_ID") {
            self.helpdesk.token_secret_id = value;
        }
        if let Some(value) = read_env("DESKBOT_HELPDESK_TIMEOUT_SECS") {
            self.helpdesk.timeout_secs = parse_u64("DESKBOT_HELPDESK_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DESKBOT_SECRETS_PROVIDER") {
            self.secrets.provider = value.parse()?;
        }
        if let Some(value) = read_env("DESKBOT_SECRETS_PROJECT_ID") {
            self.secrets.project_id = Some(value);
        }
        if let Some(value) = read_env("DESKBOT_SECRETS_VERSION") {
            self.secrets.version = value;
        }

        if let Some(value) = read_env("DESKBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DESKBOT_SERVER_PORT") {
            self.server.port = parse_u16("DESKBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("DESKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("DESKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("DESKBOT_LOGGING_LEVEL").or_else(|| read_env("DESKBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DESKBOT_LOGGING_FORMAT").or_else(|| read_env("DESKBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(subdomain) = overrides.helpdesk_subdomain {
            self.helpdesk.subdomain = subdomain;
        }
        if let Some(auth_email) = overrides.helpdesk_auth_email {
            self.helpdesk.auth_email = auth_email;
        }
        if let Some(token_secret_id) = overrides.helpdesk_token_secret_id {
            self.helpdesk.token_secret_id = token_secret_id;
        }
        if let Some(provider) = overrides.secret_provider {
            self.secrets.provider = provider;
        }
        if let Some(project_id) = overrides.secret_project_id {
            self.secrets.project_id = Some(project_id);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_helpdesk(&self.helpdesk)?;
        validate_secrets(&self.secrets)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("deskbot.toml"), PathBuf::from("config/deskbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_helpdesk(helpdesk: &HelpdeskConfig) -> Result<(), ConfigError> {
    let subdomain = helpdesk.subdomain.trim();
    if subdomain.is_empty()
        || !subdomain.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
    {
        return Err(ConfigError::Validation(
            "helpdesk.subdomain must be a non-empty tenant name (letters, digits, hyphens)"
                .to_string(),
        ));
    }

    if !helpdesk.auth_email.contains('@') {
        return Err(ConfigError::Validation(
            "helpdesk.auth_email must be the agent email used for token auth".to_string(),
        ));
    }

    if helpdesk.token_secret_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "helpdesk.token_secret_id must name the secret holding the API token".to_string(),
        ));
    }

    if helpdesk.timeout_secs == 0 || helpdesk.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "helpdesk.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_secrets(secrets: &SecretsConfig) -> Result<(), ConfigError> {
    if secrets.provider == SecretProvider::Google {
        let missing =
            secrets.project_id.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "secrets.project_id is required when secrets.provider is `google`".to_string(),
            ));
        }
    }

    if secrets.version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "secrets.version must be a version id or `latest`".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    helpdesk: Option<HelpdeskPatch>,
    secrets: Option<SecretsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct HelpdeskPatch {
    subdomain: Option<String>,
    auth_email: Option<String>,
    token_secret_id: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SecretsPatch {
    provider: Option<SecretProvider>,
    project_id: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, SecretProvider};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.helpdesk.timeout_secs == 20, "default helpdesk timeout should be 20s")?;
        ensure(
            config.secrets.provider == SecretProvider::Env,
            "default secret provider should be env",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_HELPDESK_SUBDOMAIN", "tenant-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("deskbot.toml");
            fs::write(
                &path,
                r#"
[helpdesk]
subdomain = "${TEST_HELPDESK_SUBDOMAIN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.helpdesk.subdomain == "tenant-from-env",
                "subdomain should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_HELPDESK_SUBDOMAIN"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DESKBOT_HELPDESK_SUBDOMAIN", "from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("deskbot.toml");
            fs::write(
                &path,
                r#"
[helpdesk]
subdomain = "from-file"
auth_email = "agent@from-file.example"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.helpdesk.subdomain == "from-env", "env subdomain should win over file")?;
            ensure(
                config.helpdesk.auth_email == "agent@from-file.example",
                "file auth_email should win over defaults",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should win over file")
        })();

        clear_vars(&["DESKBOT_HELPDESK_SUBDOMAIN"]);
        result
    }

    #[test]
    fn google_provider_requires_project_id() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                secret_provider: Some(SecretProvider::Google),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("secrets.project_id")
        );
        ensure(has_message, "validation failure should mention secrets.project_id")
    }

    #[test]
    fn invalid_timeout_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DESKBOT_HELPDESK_TIMEOUT_SECS", "soon");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "DESKBOT_HELPDESK_TIMEOUT_SECS"),
                "error should name the offending env var",
            )
        })();

        clear_vars(&["DESKBOT_HELPDESK_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DESKBOT_LOG_LEVEL", "warn");
        env::set_var("DESKBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["DESKBOT_LOG_LEVEL", "DESKBOT_LOG_FORMAT"]);
        result
    }
}
