use clap::{Parser, ValueEnum};
use std::borrow::Cow;
use std::net::SocketAddr;

/// Error raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Database configuration with `Cow` for flexible string handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig<'a> {
    pub host: Cow<'a, str>,
    pub port: u16,
    pub database: Cow<'a, str>,
    pub user: Cow<'a, str>,
    pub password: Cow<'a, str>,
    pub max_connections: u32,
    /// Full connection string; wins over the individual parts when set.
    pub url: Option<Cow<'a, str>>,
}

impl<'a> DbConfig<'a> {
    pub fn new(
        host: impl Into<Cow<'a, str>>,
        port: u16,
        database: impl Into<Cow<'a, str>>,
        user: impl Into<Cow<'a, str>>,
        password: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            max_connections: 10,
            url: None,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_url(mut self, url: impl Into<Cow<'a, str>>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// PostgreSQL connection string; borrowed when an explicit URL is configured.
    pub fn connection_string(&self) -> Cow<'_, str> {
        match &self.url {
            Some(url) => Cow::Borrowed(url.as_ref()),
            None => Cow::Owned(format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            )),
        }
    }

    /// Read `DB_HOST`, `DB_PORT`, `DB_USERNAME`, `DB_PASSWORD`, `DB_DATABASE`,
    /// `DB_MAX_CONNECTIONS` and `DATABASE_URL`, falling back to defaults.
    pub fn from_env() -> Result<DbConfig<'static>, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<DbConfig<'static>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = DbConfig::default();

        let port = match lookup("DB_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: "DB_PORT",
                value: raw,
            })?,
            None => defaults.port,
        };
        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: "DB_MAX_CONNECTIONS",
                value: raw,
            })?,
            None => defaults.max_connections,
        };

        let config = DbConfig::new(
            lookup("DB_HOST").map_or(defaults.host, Cow::Owned),
            port,
            lookup("DB_DATABASE").map_or(defaults.database, Cow::Owned),
            lookup("DB_USERNAME").map_or(defaults.user, Cow::Owned),
            lookup("DB_PASSWORD").map_or(defaults.password, Cow::Owned),
        )
        .with_max_connections(max_connections);

        Ok(match lookup("DATABASE_URL") {
            Some(url) => config.with_url(url),
            None => config,
        })
    }
}

impl<'a> Default for DbConfig<'a> {
    fn default() -> Self {
        Self {
            host: Cow::Borrowed("localhost"),
            port: 5432,
            database: Cow::Borrowed("pflege_app"),
            user: Cow::Borrowed("postgres"),
            password: Cow::Borrowed("postgres"),
            max_connections: 10,
            url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum StoreKind {
    /// PostgreSQL via `DB_*` / `DATABASE_URL`
    Postgres,
    /// Process-local maps, lost on exit
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "care-server")]
#[command(about = "Care ward REST backend: patients, care tasks and notifications")]
#[command(version)]
pub struct Args {
    /// Address to listen on [default: $CARE_BIND_ADDR or 0.0.0.0:3000]
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Storage backend
    #[arg(short, long, value_enum, default_value = "postgres")]
    pub store: StoreKind,

    /// Do not apply embedded migrations on startup
    #[arg(long)]
    pub skip_migrations: bool,
}

impl Args {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        if let Some(addr) = self.bind {
            return Ok(addr);
        }
        let raw = std::env::var("CARE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        raw.parse().map_err(|_| ConfigError::InvalidVar {
            name: "CARE_BIND_ADDR",
            value: raw,
        })
    }
}
