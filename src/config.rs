use chrono::Duration;
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const SECONDS_IN_DAY: i64 = 60 * 60 * 24;

// ============================================================================
// File layout
// ============================================================================

/// The YAML file as written by the user. Every value is optional here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
  pub odoo: OdooSection,
  pub user: UserSection,
  pub cache: CacheSection,
  pub losses: LossesConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OdooSection {
  pub server: Option<String>,
  pub database: Option<String>,
  pub username: Option<String>,
  pub password: Option<String>,
  pub transport: Option<TransportKind>,
  pub debug: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserSection {
  /// IANA zone name, e.g. "Europe/Paris"
  pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheSection {
  pub enabled: Option<bool>,
  pub path: Option<PathBuf>,
  /// Seconds before a dated result expires; unset keeps it forever
  pub transactional_ttl: Option<i64>,
  /// Seconds before master data expires (default: one day)
  pub master_ttl: Option<i64>,
}

/// Where inventory losses are booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LossesConfig {
  pub picking_type_id: i64,
  pub location_dest_id: i64,
}

impl Default for LossesConfig {
  fn default() -> Self {
    Self {
      picking_type_id: 14,
      location_dest_id: 5,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// `EnvFilter` directive used when `RUST_LOG` is not set
  pub level: Option<String>,
  /// Also write logs to this file
  pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
  /// `/jsonrpc` with the password sent on every call
  #[default]
  #[serde(rename = "jsonrpc")]
  #[value(name = "jsonrpc")]
  JsonRpc,
  /// `/web/session/authenticate` then cookie-authenticated `call_kw`
  Web,
}

// ============================================================================
// Resolved configuration
// ============================================================================

#[derive(Clone)]
pub struct OdooConfig {
  pub server: String,
  pub database: String,
  pub username: String,
  pub password: String,
  pub transport: TransportKind,
  pub debug: bool,
}

impl fmt::Debug for OdooConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OdooConfig")
      .field("server", &self.server)
      .field("database", &self.database)
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .field("transport", &self.transport)
      .field("debug", &self.debug)
      .finish()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
  pub enabled: bool,
  /// `None` uses the default location under the user cache directory
  pub path: Option<PathBuf>,
  /// Skip lookups but keep writing
  pub refresh: bool,
  pub transactional_ttl: Option<Duration>,
  pub master_ttl: Option<Duration>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      refresh: false,
      transactional_ttl: None,
      master_ttl: Some(Duration::seconds(SECONDS_IN_DAY)),
    }
  }
}

impl CacheConfig {
  /// The cache section merged with the command-line flags.
  pub fn resolve(section: CacheSection, overrides: &Overrides) -> Result<Self> {
    let defaults = Self::default();
    Ok(Self {
      enabled: !overrides.no_cache && section.enabled.unwrap_or(defaults.enabled),
      path: section.path,
      refresh: overrides.refresh,
      transactional_ttl: ttl(section.transactional_ttl, "transactional_ttl")?
        .or(defaults.transactional_ttl),
      master_ttl: match section.master_ttl {
        Some(_) => ttl(section.master_ttl, "master_ttl")?,
        None => defaults.master_ttl,
      },
    })
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  pub odoo: OdooConfig,
  pub timezone: Tz,
  pub cache: CacheConfig,
  pub losses: LossesConfig,
  pub logging: LoggingConfig,
}

/// Values given on the command line; they win over the environment and the file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Overrides {
  /// Path to config file (default: ./ostash.yaml, then $XDG_CONFIG_HOME/ostash/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// Odoo server URL
  #[arg(long, global = true)]
  pub server: Option<String>,

  #[arg(long, global = true)]
  pub database: Option<String>,

  #[arg(long, global = true)]
  pub username: Option<String>,

  /// IANA time zone used to interpret dates (e.g. Europe/Paris)
  #[arg(long, global = true)]
  pub timezone: Option<String>,

  #[arg(long, value_enum, global = true)]
  pub transport: Option<TransportKind>,

  /// Verbose logging
  #[arg(long, global = true)]
  pub debug: bool,

  /// Bypass the local cache entirely
  #[arg(long, global = true)]
  pub no_cache: bool,

  /// Re-fetch everything and overwrite cached entries
  #[arg(long, global = true)]
  pub refresh: bool,
}

impl Config {
  /// Load configuration from file and environment.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ostash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ostash/config.yaml
  ///
  /// No file at all is fine as long as the environment supplies the rest.
  pub fn load(overrides: &Overrides) -> Result<Self> {
    Self::resolve(Self::load_file(overrides)?, |name| std::env::var(name).ok(), overrides)
  }

  /// Read the config file without resolving it; cache maintenance needs no credentials.
  pub fn load_file(overrides: &Overrides) -> Result<FileConfig> {
    match &overrides.config {
      Some(p) if p.exists() => Self::load_from_path(p),
      Some(p) => Err(Error::Config(format!("Config file not found: {}", p.display()))),
      None => match Self::find_config_file() {
        Some(p) => Self::load_from_path(&p),
        None => Ok(FileConfig::default()),
      },
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("ostash.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ostash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

    serde_yaml::from_str(&contents)
      .map_err(|e| Error::Config(format!("Failed to parse config file {}: {}", path.display(), e)))
  }

  /// Merge the three sources: overrides, then environment, then file.
  pub fn resolve(
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
    overrides: &Overrides,
  ) -> Result<Self> {
    let env_or = |names: &[&str]| names.iter().find_map(|name| env(name).filter(|v| !v.is_empty()));

    let server = overrides.server.clone().or_else(|| env_or(&["ODOO_SERVER"])).or(file.odoo.server);
    let database = overrides
      .database
      .clone()
      .or_else(|| env_or(&["ODOO_DATABASE", "ODOO_DB"]))
      .or(file.odoo.database);
    let username = overrides
      .username
      .clone()
      .or_else(|| env_or(&["ODOO_USERNAME"]))
      .or(file.odoo.username);
    let password = env_or(&["ODOO_SECRET"]).or(file.odoo.password);

    let missing: Vec<&str> = [
      ("server", &server),
      ("database", &database),
      ("username", &username),
      ("password", &password),
    ]
    .into_iter()
    .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
    .map(|(name, _)| name)
    .collect();

    let (Some(server), Some(database), Some(username), Some(password), true) =
      (server, database, username, password, missing.is_empty())
    else {
      return Err(Error::Config(format!(
        "Missing required parameters: {}. \
         Please provide them either through the config file, the environment or as parameters.",
        missing.join(", ")
      )));
    };

    let timezone = match overrides
      .timezone
      .clone()
      .or_else(|| env_or(&["ODOO_TIMEZONE"]))
      .or(file.user.timezone)
    {
      Some(name) => name
        .parse::<Tz>()
        .map_err(|e| Error::Config(format!("Unknown time zone '{}': {}", name, e)))?,
      None => Tz::UTC,
    };

    let odoo = OdooConfig {
      server: server.trim_end_matches('/').to_string(),
      database,
      username,
      password,
      transport: overrides.transport.or(file.odoo.transport).unwrap_or_default(),
      debug: overrides.debug || file.odoo.debug.unwrap_or(false),
    };

    Ok(Self {
      odoo,
      timezone,
      cache: CacheConfig::resolve(file.cache, overrides)?,
      losses: file.losses,
      logging: file.logging,
    })
  }
}

/// A TTL in seconds; `0` means no expiry.
fn ttl(seconds: Option<i64>, name: &str) -> Result<Option<Duration>> {
  match seconds {
    None | Some(0) => Ok(None),
    Some(s) if s < 0 => Err(Error::Config(format!("cache.{} must not be negative", name))),
    Some(s) => Duration::try_seconds(s)
      .map(Some)
      .ok_or_else(|| Error::Config(format!("cache.{} is too large: {}", name, s))),
  }
}
