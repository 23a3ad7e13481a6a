//! Error types for the ERP access layer.

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Configuration error: {0}")]
  Config(String),

  /// The server refused the credentials. Never retried.
  #[error("Failed to authenticate to {server}: {reason}")]
  Auth { server: String, reason: String },

  /// Application-level fault raised by the server while executing a call.
  #[error("Odoo fault {code}: {message}")]
  Fault { code: i64, message: String },

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  /// The server answered with something that is not a JSON-RPC envelope.
  #[error("Unexpected response: {0}")]
  Protocol(String),

  /// A record did not match the schema expected for its model.
  #[error("Failed to decode {model} records: {source}")]
  Decode {
    model: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Invalid date '{0}'")]
  InvalidDate(String),

  #[error("Cache error: {0}")]
  Cache(#[from] rusqlite::Error),

  #[error("Cache lock poisoned")]
  LockPoisoned,

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Invalid URL: {0}")]
  Url(#[from] url::ParseError),
}

impl Error {
  /// True for faults reported by the remote server, as opposed to local or transport failures.
  pub fn is_fault(&self) -> bool {
    matches!(self, Error::Fault { .. })
  }
}

pub type Result<T> = std::result::Result<T, Error>;
