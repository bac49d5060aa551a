use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHARE_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHARE_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHARE";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Unprefixed variables the service has always honoured. They override
/// every other source.
#[derive(Debug, Clone, Default)]
pub struct ConventionalEnv {
    pub port: Option<String>,
    pub db_user: Option<String>,
    pub db_pass: Option<String>,
    pub service_account: Option<String>,
}

impl ConventionalEnv {
    pub fn from_process() -> Self {
        // Blank values count as unset.
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        Self {
            port: var("PORT"),
            db_user: var("DB_USER"),
            db_pass: var("DB_PASS"),
            service_account: var("FIREBASE_SERVICE_ACCOUNT"),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// `BOOKSHARE__*` variables and the conventional variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment, &ConventionalEnv::from_process())
    }

    /// Load from an explicit config directory and environment name.
    pub fn load_from(
        config_dir: &Path,
        environment: &str,
        conventional: &ConventionalEnv,
    ) -> anyhow::Result<Self> {
        let parsed_environment = match environment {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("server.port", conventional.port.clone())?
            .set_override_option("database.user", conventional.db_user.clone())?
            .set_override_option("database.password", conventional.db_pass.clone())?
            .set_override_option(
                "auth.service_account_path",
                conventional.service_account.clone(),
            )?;

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "DatabaseSettings::default_books_collection")]
    pub books_collection: String,
    #[serde(default = "DatabaseSettings::default_comments_collection")]
    pub comments_collection: String,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_name() -> String {
        "bookshare".to_string()
    }

    fn default_books_collection() -> String {
        "books".to_string()
    }

    fn default_comments_collection() -> String {
        "comment".to_string()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            name: Self::default_name(),
            user: None,
            password: None,
            books_collection: Self::default_books_collection(),
            comments_collection: Self::default_comments_collection(),
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("books_collection", &self.books_collection)
            .field("comments_collection", &self.comments_collection)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,tower_http=info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Which identity provider verifies bearer tokens.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Firebase,
    Static,
}

#[derive(Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub provider: AuthProvider,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub service_account_path: Option<String>,
    #[serde(default = "AuthSettings::default_jwks_url")]
    pub jwks_url: String,
    #[serde(default = "AuthSettings::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Token table for the `static` provider.
    #[serde(default)]
    pub static_tokens: Vec<StaticToken>,
}

/// One entry of the `static` provider's token table.
#[derive(Clone, Deserialize)]
pub struct StaticToken {
    pub token: String,
    pub email: String,
}

impl AuthSettings {
    fn default_jwks_url() -> String {
        bookshare_authz::firebase::GOOGLE_JWKS_URL.to_string()
    }

    fn default_timeout_ms() -> u64 {
        5000
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            provider: AuthProvider::default(),
            project_id: None,
            service_account_path: None,
            jwks_url: Self::default_jwks_url(),
            timeout_ms: Self::default_timeout_ms(),
            static_tokens: Vec::new(),
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("provider", &self.provider)
            .field("project_id", &self.project_id)
            .field("service_account_path", &self.service_account_path)
            .field("jwks_url", &self.jwks_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("static_tokens", &self.static_tokens.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn defaults_match_the_service_conventions() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.books_collection, "books");
        assert_eq!(settings.database.comments_collection, "comment");
        assert_eq!(settings.auth.provider, AuthProvider::Firebase);
    }

    #[test]
    fn environment_file_overlays_base_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.toml"),
            "[server]\nport = 4000\n\n[database]\nname = \"shelf\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("staging.toml"), "[database]\nname = \"shelf-staging\"\n")
            .unwrap();

        let settings =
            Settings::load_from(dir.path(), "staging", &ConventionalEnv::default()).unwrap();
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.server.port, 4000);
        assert_eq!(settings.database.name, "shelf-staging");
    }

    #[test]
    fn conventional_variables_win() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.toml"), "[server]\nport = 4000\n").unwrap();

        let conventional = ConventionalEnv {
            port: Some("5050".to_string()),
            db_user: Some("reader".to_string()),
            db_pass: Some("s3cret".to_string()),
            service_account: Some("/etc/bookshare/sa.json".to_string()),
        };
        let settings = Settings::load_from(dir.path(), "local", &conventional).unwrap();

        assert_eq!(settings.server.port, 5050);
        assert_eq!(settings.database.user.as_deref(), Some("reader"));
        assert_eq!(settings.database.password.as_deref(), Some("s3cret"));
        assert_eq!(
            settings.auth.service_account_path.as_deref(),
            Some("/etc/bookshare/sa.json")
        );
    }

    #[test]
    fn static_tokens_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.toml"),
            "[auth]\nprovider = \"static\"\n\n[[auth.static_tokens]]\ntoken = \"Dev-Token\"\nemail = \"dev@example.com\"\n",
        )
        .unwrap();

        let settings =
            Settings::load_from(dir.path(), "local", &ConventionalEnv::default()).unwrap();
        assert_eq!(settings.auth.provider, AuthProvider::Static);
        assert_eq!(settings.auth.static_tokens.len(), 1);
        assert_eq!(settings.auth.static_tokens[0].token, "Dev-Token");
        assert_eq!(settings.auth.static_tokens[0].email, "dev@example.com");
    }

    #[test]
    fn unsupported_environment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from(dir.path(), "qa", &ConventionalEnv::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported environment 'qa'"));
    }

    #[test]
    fn debug_output_redacts_password() {
        let database = DatabaseSettings {
            password: Some("s3cret".to_string()),
            ..DatabaseSettings::default()
        };
        let rendered = format!("{database:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
