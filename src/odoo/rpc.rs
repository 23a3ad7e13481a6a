//! JSON-RPC 2.0 envelopes as spoken by Odoo.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Serialize, Debug)]
pub struct Request<P> {
  jsonrpc: &'static str,
  method: &'static str,
  id: u32,
  params: P,
}

impl<P> Request<P> {
  pub fn new(id: u32, params: P) -> Self {
    Request {
      jsonrpc: "2.0",
      method: "call",
      id,
      params,
    }
  }
}

/// Parameters for the `/jsonrpc` endpoint, which dispatches on a service name.
#[derive(Serialize, Debug)]
pub struct ServiceParams<'a> {
  pub service: &'a str,
  pub method: &'a str,
  pub args: Value,
}

#[derive(Deserialize, Debug)]
pub struct RpcError {
  pub code: i64,
  pub message: String,
  #[serde(default)]
  pub data: Option<RpcErrorData>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RpcErrorData {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub message: String,
}

impl From<RpcError> for Error {
  fn from(err: RpcError) -> Self {
    // The top-level message is a generic "Odoo Server Error"; data carries the real one.
    let message = match err.data {
      Some(data) if !data.message.is_empty() => {
        if data.name.is_empty() {
          data.message
        } else {
          format!("{}: {}", data.name, data.message)
        }
      }
      _ => err.message,
    };
    Error::Fault {
      code: err.code,
      message,
    }
  }
}

/// Split a response envelope into its result, or the fault it reports.
///
/// `result` may legitimately be `null`, so presence of the key is what counts.
pub fn into_result(mut envelope: Map<String, Value>) -> Result<Value> {
  if let Some(error) = envelope.remove("error") {
    let error: RpcError = serde_json::from_value(error)
      .map_err(|e| Error::Protocol(format!("malformed error object: {}", e)))?;
    return Err(error.into());
  }

  envelope
    .remove("result")
    .ok_or_else(|| Error::Protocol(format!("unknown JSON-RPC response: {}", Value::Object(envelope))))
}
