//! Server configuration
//!
//! Values are layered: built-in defaults, then an optional config file, then
//! environment variables (`PORT`, `DATABASE_URL`, `JWT_SECRET_KEY`, ...).
//! Environment keys map to fields by lower-casing, so `DB_MAX_CONNECTIONS`
//! fills `db_max_connections`.

use anyhow::{bail, ensure};
use auth_identity::{IdentityConfig, DEFAULT_BCRYPT_COST};
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use database_layer::DatabaseConfig;
use serde::Deserialize;

/// bcrypt accepts work factors in this range.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Minimum HS256 secret length accepted in production.
const MIN_PRODUCTION_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub db_sslmode: String,
    pub db_timezone: String,
    pub db_max_connections: u32,
    pub jwt_secret_key: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    /// Comma-separated list of allowed browser origins.
    pub cors_allowed_origins: String,
    pub run_migrations: bool,
    pub seed_on_startup: bool,
    pub bootstrap_admin_username: Option<String>,
    pub bootstrap_admin_password: Option<String>,
    pub dentacare_env: String,
}

impl AppConfig {
    /// Load configuration from defaults, `config_file` (if it exists) and the environment.
    pub fn load(config_file: &str) -> Result<Self, ConfigError> {
        Self::defaults(Config::builder())?
            .add_source(File::with_name(config_file).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Register the built-in defaults on a builder.
    pub fn defaults(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let db = DatabaseConfig::default();
        let identity = IdentityConfig::default();
        builder
            .set_default("port", 8080_i64)?
            .set_default("db_host", db.host)?
            .set_default("db_port", i64::from(db.port))?
            .set_default("db_user", db.user)?
            .set_default("db_password", db.password)?
            .set_default("db_name", db.name)?
            .set_default("db_sslmode", db.ssl_mode)?
            .set_default("db_timezone", db.timezone)?
            .set_default("db_max_connections", i64::from(db.max_connections))?
            .set_default("jwt_secret_key", identity.jwt_secret)?
            .set_default("jwt_expiry_hours", identity.jwt_expiry_hours)?
            .set_default("bcrypt_cost", i64::from(DEFAULT_BCRYPT_COST))?
            .set_default("cors_allowed_origins", "http://localhost:3000")?
            .set_default("run_migrations", true)?
            .set_default("seed_on_startup", true)?
            .set_default("dentacare_env", "development")
    }

    pub fn is_production(&self) -> bool {
        self.dentacare_env.eq_ignore_ascii_case("production")
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone().filter(|url| !url.trim().is_empty()),
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            name: self.db_name.clone(),
            ssl_mode: self.db_sslmode.clone(),
            timezone: self.db_timezone.clone(),
            max_connections: self.db_max_connections,
            ..DatabaseConfig::default()
        }
    }

    pub fn identity(&self) -> IdentityConfig {
        IdentityConfig {
            jwt_secret: self.jwt_secret_key.clone(),
            jwt_expiry_hours: self.jwt_expiry_hours,
            bcrypt_cost: self.bcrypt_cost,
            ..IdentityConfig::default()
        }
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The bootstrap administrator, when both username and password are set.
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        let username = self.bootstrap_admin_username.as_deref().map(str::trim)?;
        let password = self.bootstrap_admin_password.as_deref()?;
        (!username.is_empty() && !password.is_empty()).then_some((username, password))
    }

    /// Reject settings the server must not start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.jwt_secret_key.trim().is_empty(), "JWT_SECRET_KEY must not be empty");
        if self.is_production() && self.jwt_secret_key.len() < MIN_PRODUCTION_SECRET_BYTES {
            bail!(
                "JWT_SECRET_KEY must be at least {} bytes in production",
                MIN_PRODUCTION_SECRET_BYTES
            );
        }
        ensure!(
            BCRYPT_COST_RANGE.contains(&self.bcrypt_cost),
            "BCRYPT_COST must be between {} and {}, got {}",
            BCRYPT_COST_RANGE.start(),
            BCRYPT_COST_RANGE.end(),
            self.bcrypt_cost
        );
        ensure!(self.jwt_expiry_hours > 0, "JWT_EXPIRY_HOURS must be positive");
        ensure!(self.db_max_connections > 0, "DB_MAX_CONNECTIONS must be positive");
        Ok(())
    }
}
