//! A lazily authenticated session against one Odoo database.

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::transport::{Credentials, JsonRpcTransport, RemoteCall, Transport, WebSessionTransport};
use crate::config::{OdooConfig, TransportKind};
use crate::error::{Error, Result};

/// Holds the transport, the credentials and, once authenticated, the user id.
///
/// Authentication happens on the first call and is never repeated: an expired
/// session is not re-established.
pub struct Connection {
  transport: Box<dyn Transport>,
  credentials: Credentials,
  uid: OnceCell<i64>,
}

impl Connection {
  pub fn new(transport: impl Transport + 'static, credentials: Credentials) -> Self {
    Self {
      transport: Box::new(transport),
      credentials,
      uid: OnceCell::new(),
    }
  }

  /// Build a connection over the transport selected in the configuration.
  pub fn from_config(config: &OdooConfig) -> Result<Self> {
    let credentials = Credentials {
      database: config.database.clone(),
      username: config.username.clone(),
      password: config.password.clone(),
    };

    Ok(match config.transport {
      TransportKind::JsonRpc => Self::new(JsonRpcTransport::new(&config.server)?, credentials),
      TransportKind::Web => Self::new(WebSessionTransport::new(&config.server)?, credentials),
    })
  }

  pub fn is_authenticated(&self) -> bool {
    self.uid.initialized()
  }

  /// The session's user id, authenticating on first use.
  pub async fn uid(&self) -> Result<i64> {
    let uid = self
      .uid
      .get_or_try_init(|| async {
        info!(
          "Connecting to Odoo server {} {}...",
          self.transport.server(),
          self.credentials.database
        );
        self.transport.authenticate(&self.credentials).await
      })
      .await?;
    Ok(*uid)
  }

  /// Run one remote call. Faults are logged with their code and message, then returned.
  pub async fn call(&self, call: &RemoteCall) -> Result<Value> {
    let uid = self.uid().await?;

    match self.transport.execute_kw(&self.credentials, uid, call).await {
      Err(Error::Fault { code, message }) => {
        error!(
          code,
          model = %call.model,
          method = %call.method,
          "Odoo error occurred: {}",
          message
        );
        Err(Error::Fault { code, message })
      }
      other => other,
    }
  }
}
