//! Application configuration loaded from `REGRU__` environment variables.
//!
//! Sources are layered explicitly:
//! 1. an optional env-file (`.env` by default) supplies defaults
//! 2. the process environment overrides them
//!
//! Only keys starting with `REGRU__` (any case) are considered. The prefix is
//! stripped, the rest is lowercased and `__` separates nested levels:
//! - `REGRU__ENVIRONMENT=prod` sets `environment`
//! - `REGRU__DATABASE__ENGINE=postgres` sets `database.engine`
//! - `REGRU__DATABASE={"engine": "postgres", ...}` sets the whole section
//!
//! A section given as a JSON object is merged first, so nested keys from the
//! same source override its entries.
//!
//! Unknown keys are ignored. Every required field is checked before the
//! configuration is returned, and all failures are reported together.

use std::path::Path;

use figment::{providers::Serialized, Figment};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{ConfigError, FieldError};
use crate::secret::Secret;

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "REGRU__";

/// Separator between nested configuration levels
pub const ENV_NESTED_DELIMITER: &str = "__";

/// Env-file read by [`AppConfiguration::load`]
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Settings paths that hold a nested section rather than a single value
const SECTIONS: &[&str] = &["database"];

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSettings {
    pub engine: String,
    pub name: String,
    pub user: String,
    pub password: Secret,
    pub host: String,
    pub port: String,
}

impl DatabaseSettings {
    /// URL scheme for the configured engine.
    ///
    /// Accepts plain names (`postgres`, `sqlite3`) as well as dotted backend
    /// paths such as `django.db.backends.postgresql`.
    pub fn scheme(&self) -> String {
        let engine = self
            .engine
            .rsplit('.')
            .next()
            .unwrap_or(&self.engine)
            .to_ascii_lowercase();

        match engine.as_str() {
            "postgres" | "postgresql" | "postgresql_psycopg2" => "postgres".to_string(),
            "mysql" => "mysql".to_string(),
            "sqlite" | "sqlite3" => "sqlite".to_string(),
            _ => engine,
        }
    }

    /// Connection URL for the database driver. Contains the password.
    ///
    /// User, password and database name are percent-encoded.
    pub fn connection_url(&self) -> Result<Secret, ConfigError> {
        let scheme = self.scheme();
        if scheme == "sqlite" {
            return Ok(Secret::new(format!("sqlite://{}?mode=rwc", self.name)));
        }

        let invalid = |reason: String| ConfigError::ConnectionUrl { reason };
        let base = if self.port.is_empty() {
            format!("{}://{}", scheme, self.host)
        } else {
            format!("{}://{}:{}", scheme, self.host, self.port)
        };

        let mut url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.set_path(&self.name);
        url.set_username(&self.user)
            .map_err(|()| invalid("URL cannot carry credentials".to_string()))?;
        url.set_password(Some(self.password.expose_secret()))
            .map_err(|()| invalid("URL cannot carry credentials".to_string()))?;

        Ok(Secret::new(String::from(url)))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfiguration {
    pub environment: String,
    pub secret_key: Secret,
    pub database: DatabaseSettings,
}

impl AppConfiguration {
    /// Load configuration from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Some(Path::new(DEFAULT_ENV_FILE)))
    }

    /// Load configuration from an optional env-file and the process environment.
    ///
    /// A missing env-file is skipped; an unreadable one is an error.
    pub fn load_from(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_vars = match env_file {
            Some(path) => read_env_file(path)?,
            None => Vec::new(),
        };

        let config = Self::from_sources(file_vars, process_vars())?;
        tracing::debug!(environment = %config.environment, "Configuration loaded");
        Ok(config)
    }

    /// Build configuration from explicit variable sources.
    ///
    /// `file_vars` act as defaults and `process_vars` override them.
    pub fn from_sources(
        file_vars: impl IntoIterator<Item = (String, String)>,
        process_vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let raw: RawConfiguration = Figment::new()
            .merge(layer(file_vars))
            .merge(layer(process_vars))
            .extract()?;

        raw.into_configuration()
    }
}

/// Process environment, skipping entries that are not valid unicode.
fn process_vars() -> Vec<(String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let env_file_error = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => {
            tracing::debug!(path = %path.display(), "No env file found, skipping");
            return Ok(Vec::new());
        }
        Err(e) => return Err(env_file_error(e)),
    };

    iter.collect::<Result<Vec<_>, _>>().map_err(env_file_error)
}

/// Turn `REGRU__`-prefixed variables into one nested figment layer.
///
/// JSON objects given for a whole section go in first, so that nested keys
/// from the same source win over them.
fn layer(vars: impl IntoIterator<Item = (String, String)>) -> Figment {
    let (sections, values): (Vec<_>, Vec<_>) = vars
        .into_iter()
        .filter_map(|(key, value)| settings_path(&key).map(|path| (path, value)))
        .partition(|(path, _)| SECTIONS.contains(&path.as_str()));

    let figment = sections
        .into_iter()
        .fold(Figment::new(), |figment, (path, value)| match section_object(&value) {
            Some(object) => figment.merge(Serialized::default(&path, object)),
            None => figment.merge(Serialized::default(&path, value)),
        });

    values.into_iter().fold(figment, |figment, (path, value)| {
        figment.merge(Serialized::default(&path, value))
    })
}

/// Parse a section value as a JSON object.
///
/// Keys are lowercased and scalars become strings, matching what the
/// equivalent nested variables would produce. `null` entries are dropped.
fn section_object(value: &str) -> Option<Map<String, Value>> {
    let object = match serde_json::from_str::<Value>(value).ok()? {
        Value::Object(object) => object,
        _ => return None,
    };

    let normalized = object
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::Bool(b) => Value::String(b.to_string()),
                Value::Number(n) => Value::String(n.to_string()),
                other => other,
            };
            Some((key.to_lowercase(), value))
        })
        .collect();

    Some(normalized)
}

/// Map a variable name to a dotted settings path, or `None` if it is not ours.
fn settings_path(key: &str) -> Option<String> {
    let prefix = key.get(..ENV_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(ENV_PREFIX) {
        return None;
    }

    let segments: Vec<String> = key[ENV_PREFIX.len()..]
        .split(ENV_NESTED_DELIMITER)
        .map(str::to_lowercase)
        .collect();

    if segments.iter().any(|s| s.is_empty() || s.contains('.')) {
        return None;
    }

    Some(segments.join("."))
}

// =============================================================================
// Raw (unvalidated) shape
// =============================================================================

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct RawDatabaseSettings {
    #[validate(required)]
    engine: Option<String>,
    #[validate(required)]
    name: Option<String>,
    #[validate(required)]
    user: Option<String>,
    #[validate(required)]
    password: Option<String>,
    #[validate(required)]
    host: Option<String>,
    #[validate(required)]
    port: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct RawConfiguration {
    #[validate(required)]
    environment: Option<String>,
    #[validate(required)]
    secret_key: Option<String>,
    #[validate(nested)]
    database: RawDatabaseSettings,
}

impl RawConfiguration {
    fn into_configuration(self) -> Result<AppConfiguration, ConfigError> {
        if let Err(errors) = self.validate() {
            let mut fields = Vec::new();
            collect_field_errors(None, &errors, &mut fields);
            fields.sort_by(|a, b| a.field.cmp(&b.field));
            return Err(ConfigError::Invalid { fields });
        }

        let db = self.database;
        Ok(AppConfiguration {
            environment: required("environment", self.environment)?,
            secret_key: required("secret_key", self.secret_key)?.into(),
            database: DatabaseSettings {
                engine: required("database.engine", db.engine)?,
                name: required("database.name", db.name)?,
                user: required("database.user", db.user)?,
                password: required("database.password", db.password)?.into(),
                host: required("database.host", db.host)?,
                port: required("database.port", db.port)?,
            },
        })
    }
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::Invalid {
        fields: vec![FieldError::new(field, "required")],
    })
}

/// Flatten nested validation errors into dotted field paths.
fn collect_field_errors(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldError::new(path.clone(), e.code.to_string())));
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(Some(&path), nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(Some(&format!("{}[{}]", path, index)), nested, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> Vec<(String, String)> {
        vars(&[
            ("REGRU__environment", "prod"),
            ("REGRU__secret_key", "abc"),
            ("REGRU__database__engine", "postgres"),
            ("REGRU__database__name", "db"),
            ("REGRU__database__user", "u"),
            ("REGRU__database__password", "p"),
            ("REGRU__database__host", "localhost"),
            ("REGRU__database__port", "5432"),
        ])
    }

    fn without(env: Vec<(String, String)>, key: &str) -> Vec<(String, String)> {
        env.into_iter().filter(|(k, _)| k != key).collect()
    }

    #[test]
    fn test_loads_nested_database_settings() {
        let config = AppConfiguration::from_sources(Vec::new(), full_env()).unwrap();

        assert_eq!(config.environment, "prod");
        assert_eq!(config.secret_key.expose_secret(), "abc");
        assert_eq!(config.database.engine, "postgres");
        assert_eq!(config.database.name, "db");
        assert_eq!(config.database.user, "u");
        assert_eq!(config.database.password.expose_secret(), "p");
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, "5432");
    }

    #[test]
    fn test_missing_user_is_named() {
        let env = without(full_env(), "REGRU__database__user");
        let err = AppConfiguration::from_sources(Vec::new(), env).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.names_field("database.user"));
        assert_eq!(err.fields().len(), 1);
        assert!(err.to_string().contains("database.user"));
    }

    #[test]
    fn test_all_missing_fields_reported_together() {
        let err = AppConfiguration::from_sources(Vec::new(), Vec::new()).unwrap_err();

        let fields: Vec<&str> = err.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "database.engine",
                "database.host",
                "database.name",
                "database.password",
                "database.port",
                "database.user",
                "environment",
                "secret_key",
            ]
        );
        assert!(err.fields().iter().all(|f| f.code == "required"));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut env = without(full_env(), "REGRU__environment");
        env = without(env, "REGRU__database__engine");
        env.extend(vars(&[
            ("regru__ENVIRONMENT", "staging"),
            ("Regru__Database__Engine", "mysql"),
        ]));

        let config = AppConfiguration::from_sources(Vec::new(), env).unwrap();
        assert_eq!(config.environment, "staging");
        assert_eq!(config.database.engine, "mysql");
    }

    #[test]
    fn test_values_keep_their_case() {
        let mut env = without(full_env(), "REGRU__secret_key");
        env.extend(vars(&[("REGRU__SECRET_KEY", "MiXeD-Case")]));

        let config = AppConfiguration::from_sources(Vec::new(), env).unwrap();
        assert_eq!(config.secret_key.expose_secret(), "MiXeD-Case");
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let mut env = full_env();
        env.extend(vars(&[
            ("REGRU__debug", "true"),
            ("REGRU__database__options", "sslmode=require"),
            ("HOME", "/root"),
        ]));

        let config = AppConfiguration::from_sources(Vec::new(), env).unwrap();
        assert_eq!(config.database.engine, "postgres");
    }

    #[test]
    fn test_unprefixed_vars_are_ignored() {
        let env = vars(&[("environment", "prod"), ("ENVIRONMENT", "prod")]);
        let err = AppConfiguration::from_sources(Vec::new(), env).unwrap_err();
        assert!(err.names_field("environment"));
    }

    #[test]
    fn test_numeric_looking_values_stay_strings() {
        let mut env = without(full_env(), "REGRU__database__port");
        env.extend(vars(&[("REGRU__database__port", "05432")]));

        let config = AppConfiguration::from_sources(Vec::new(), env).unwrap();
        assert_eq!(config.database.port, "05432");
    }

    #[test]
    fn test_file_values_are_defaults() {
        let file = vars(&[
            ("REGRU__database__engine", "sqlite"),
            ("REGRU__database__user", "file-user"),
        ]);
        let env = without(full_env(), "REGRU__database__user");

        let config = AppConfiguration::from_sources(file, env).unwrap();
        assert_eq!(config.database.engine, "postgres");
        assert_eq!(config.database.user, "file-user");
    }

    #[test]
    fn test_conflicting_shape_is_malformed() {
        let mut env = full_env();
        env.extend(vars(&[("REGRU__secret_key__inner", "x")]));

        let err = AppConfiguration::from_sources(Vec::new(), env).unwrap_err();
        assert!(matches!(err, ConfigError::Extract { .. }));
        assert!(err.names_field("secret_key"));
    }

    #[test]
    fn test_database_section_from_json() {
        let mut env = full_env()
            .into_iter()
            .filter(|(k, _)| !k.starts_with("REGRU__database__"))
            .collect::<Vec<_>>();
        env.extend(vars(&[(
            "REGRU__DATABASE",
            r#"{"ENGINE": "postgres", "name": "db", "user": "json-user",
                "password": "p", "host": "localhost", "port": 5432}"#,
        )]));

        let config = AppConfiguration::from_sources(Vec::new(), env).unwrap();
        assert_eq!(config.database.engine, "postgres");
        assert_eq!(config.database.user, "json-user");
        assert_eq!(config.database.port, "5432");
    }

    #[test]
    fn test_nested_keys_override_json_section() {
        let mut env = without(full_env(), "REGRU__database__host");
        env.insert(
            0,
            (
                "REGRU__database".to_string(),
                r#"{"user": "json-user", "host": "json-host"}"#.to_string(),
            ),
        );

        let config = AppConfiguration::from_sources(Vec::new(), env).unwrap();
        assert_eq!(config.database.user, "u");
        assert_eq!(config.database.host, "json-host");
    }

    #[test]
    fn test_malformed_section_does_not_leak_values() {
        let mut env = full_env()
            .into_iter()
            .filter(|(k, _)| !k.starts_with("REGRU__database__"))
            .collect::<Vec<_>>();
        env.extend(vars(&[(
            "REGRU__DATABASE",
            r#"{"engine": "postgres", "password": "hunter2""#,
        )]));

        let err = AppConfiguration::from_sources(Vec::new(), env).unwrap_err();
        assert!(matches!(err, ConfigError::Extract { .. }));
        assert!(err.names_field("database"));
        assert!(!err.to_string().contains("hunter2"));
        assert!(!format!("{:?}", err).contains("hunter2"));
    }

    #[test]
    fn test_renderings_hide_secrets() {
        let mut env = without(full_env(), "REGRU__secret_key");
        env = without(env, "REGRU__database__password");
        env.extend(vars(&[
            ("REGRU__secret_key", "s3cr3t-key-value"),
            ("REGRU__database__password", "db-pa55word"),
        ]));
        let config = AppConfiguration::from_sources(Vec::new(), env).unwrap();

        for rendered in [
            format!("{:?}", config),
            format!("{:#?}", config),
            serde_json::to_string(&config).unwrap(),
        ] {
            assert!(!rendered.contains("s3cr3t-key-value"));
            assert!(!rendered.contains("db-pa55word"));
            assert!(rendered.contains("postgres"));
        }
    }

    #[test]
    fn test_settings_path() {
        assert_eq!(settings_path("REGRU__environment").as_deref(), Some("environment"));
        assert_eq!(
            settings_path("REGRU__DATABASE__HOST").as_deref(),
            Some("database.host")
        );
        assert_eq!(settings_path("REGRU_environment"), None);
        assert_eq!(settings_path("REGRU__"), None);
        assert_eq!(settings_path("REGRU__database__"), None);
        assert_eq!(settings_path("PATH"), None);
        assert_eq!(settings_path("ÄÖ"), None);
    }

    #[test]
    fn test_connection_url() {
        let config = AppConfiguration::from_sources(Vec::new(), full_env()).unwrap();
        assert_eq!(
            config.database.connection_url().unwrap().expose_secret(),
            "postgres://u:p@localhost:5432/db"
        );

        let mut django = config.database.clone();
        django.engine = "django.db.backends.postgresql".to_string();
        assert_eq!(django.scheme(), "postgres");

        let mut sqlite = config.database.clone();
        sqlite.engine = "sqlite3".to_string();
        sqlite.name = "app.sqlite3".to_string();
        assert_eq!(
            sqlite.connection_url().unwrap().expose_secret(),
            "sqlite://app.sqlite3?mode=rwc"
        );
    }

    #[test]
    fn test_connection_url_encodes_credentials() {
        let config = AppConfiguration::from_sources(Vec::new(), full_env()).unwrap();
        let mut settings = config.database;
        settings.user = "app:user".to_string();
        settings.password = Secret::new("p@ss/w#rd?");

        let raw = settings.connection_url().unwrap();
        let url = Url::parse(raw.expose_secret()).unwrap();

        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(5432));
        assert_eq!(url.path(), "/db");
        assert_eq!(url.username(), "app%3Auser");
        assert_eq!(url.password(), Some("p%40ss%2Fw%23rd%3F"));
    }

    #[test]
    fn test_connection_url_requires_host() {
        let config = AppConfiguration::from_sources(Vec::new(), full_env()).unwrap();
        let mut settings = config.database;
        settings.host = String::new();
        settings.password = Secret::new("hunter2");

        let err = settings.connection_url().unwrap_err();
        assert!(matches!(err, ConfigError::ConnectionUrl { .. }));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_load_layers_env_file_under_process_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".env",
                "REGRU__environment=from-file\nREGRU__database__user=file-user\n",
            )?;
            for (key, value) in without(full_env(), "REGRU__database__user") {
                jail.set_env(key, value);
            }

            let config = AppConfiguration::load().map_err(|e| e.to_string())?;
            assert_eq!(config.environment, "prod");
            assert_eq!(config.database.user, "file-user");
            assert_eq!(config.database.engine, "postgres");
            Ok(())
        });
    }

    #[test]
    fn test_load_without_env_file() {
        Jail::expect_with(|jail| {
            for (key, value) in full_env() {
                jail.set_env(key, value);
            }

            let config = AppConfiguration::load_from(Some(Path::new("missing.env")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.database.engine, "postgres");
            Ok(())
        });
    }

    #[test]
    fn test_unparsable_env_file_is_an_error() {
        Jail::expect_with(|jail| {
            jail.create_file("broken.env", "this is not an env line\n")?;
            for (key, value) in full_env() {
                jail.set_env(key, value);
            }

            let result = AppConfiguration::load_from(Some(Path::new("broken.env")));
            assert!(matches!(result, Err(ConfigError::EnvFile { .. })));
            Ok(())
        });
    }
}
