//! HTTP transports for the two JSON surfaces exposed by Odoo.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;
use url::Url;

use super::rpc::{self, Request, ServiceParams};
use crate::error::{Error, Result};

/// Login material for one database.
#[derive(Clone)]
pub struct Credentials {
  pub database: String,
  pub username: String,
  pub password: String,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("database", &self.database)
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// One object-RPC invocation: `model.method(*args, **kwargs)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
  pub model: String,
  pub method: String,
  pub args: Vec<Value>,
  pub kwargs: Map<String, Value>,
}

impl RemoteCall {
  pub fn new(model: impl Into<String>, method: impl Into<String>) -> Self {
    Self {
      model: model.into(),
      method: method.into(),
      args: Vec::new(),
      kwargs: Map::new(),
    }
  }

  pub fn arg(mut self, value: impl Into<Value>) -> Self {
    self.args.push(value.into());
    self
  }

  pub fn kwarg(mut self, name: &str, value: impl Into<Value>) -> Self {
    self.kwargs.insert(name.to_string(), value.into());
    self
  }
}

/// A surface able to authenticate and run `execute_kw`-style calls.
#[async_trait]
pub trait Transport: Send + Sync {
  /// Server base URL, for messages.
  fn server(&self) -> &str;

  /// Authenticate and return the user id. Any refusal is an `Error::Auth`.
  async fn authenticate(&self, credentials: &Credentials) -> Result<i64>;

  async fn execute_kw(&self, credentials: &Credentials, uid: i64, call: &RemoteCall) -> Result<Value>;
}

/// Shared HTTP plumbing: base URL, client and request ids.
struct Endpoint {
  base: Url,
  http: reqwest::Client,
  next_id: AtomicU32,
}

impl Endpoint {
  fn new(server: &str, http: reqwest::Client) -> Result<Self> {
    // A trailing slash makes `join` append to the path instead of replacing its last segment.
    let base = Url::parse(&format!("{}/", server.trim_end_matches('/')))?;
    Ok(Self {
      base,
      http,
      next_id: AtomicU32::new(1),
    })
  }

  async fn post<P: Serialize>(&self, path: &str, params: P) -> Result<Value> {
    let url = self.base.join(path)?;
    let request = Request::new(self.next_id.fetch_add(1, Ordering::Relaxed), params);

    let envelope: Map<String, Value> = self
      .http
      .post(url)
      .json(&request)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    trace!(path, response = ?envelope, "Odoo response");
    rpc::into_result(envelope)
  }

  fn server(&self) -> &str {
    self.base.as_str().trim_end_matches('/')
  }
}

fn auth_error(server: &str, reason: impl Into<String>) -> Error {
  Error::Auth {
    server: server.to_string(),
    reason: reason.into(),
  }
}

/// The `/jsonrpc` surface: `common.authenticate` and `object.execute_kw`.
pub struct JsonRpcTransport {
  endpoint: Endpoint,
}

impl JsonRpcTransport {
  pub fn new(server: &str) -> Result<Self> {
    Ok(Self {
      endpoint: Endpoint::new(server, reqwest::Client::new())?,
    })
  }
}

#[async_trait]
impl Transport for JsonRpcTransport {
  fn server(&self) -> &str {
    self.endpoint.server()
  }

  async fn authenticate(&self, credentials: &Credentials) -> Result<i64> {
    let params = ServiceParams {
      service: "common",
      method: "authenticate",
      args: json!([
        credentials.database,
        credentials.username,
        credentials.password,
        {}
      ]),
    };

    let result = match self.endpoint.post("jsonrpc", params).await {
      Ok(result) => result,
      Err(Error::Fault { message, .. }) => return Err(auth_error(self.server(), message)),
      Err(e) => return Err(e),
    };

    // Refused credentials come back as `false`, not as a fault.
    match result.as_i64() {
      Some(uid) if uid > 0 => Ok(uid),
      _ => Err(auth_error(self.server(), "invalid credentials")),
    }
  }

  async fn execute_kw(&self, credentials: &Credentials, uid: i64, call: &RemoteCall) -> Result<Value> {
    let params = ServiceParams {
      service: "object",
      method: "execute_kw",
      args: json!([
        credentials.database,
        uid,
        credentials.password,
        call.model,
        call.method,
        call.args,
        call.kwargs
      ]),
    };

    self.endpoint.post("jsonrpc", params).await
  }
}

/// The web-client surface: a cookie session opened by `/web/session/authenticate`,
/// then `/web/dataset/call_kw`.
pub struct WebSessionTransport {
  endpoint: Endpoint,
}

impl WebSessionTransport {
  pub fn new(server: &str) -> Result<Self> {
    let http = reqwest::Client::builder().cookie_store(true).build()?;
    Ok(Self {
      endpoint: Endpoint::new(server, http)?,
    })
  }
}

#[async_trait]
impl Transport for WebSessionTransport {
  fn server(&self) -> &str {
    self.endpoint.server()
  }

  async fn authenticate(&self, credentials: &Credentials) -> Result<i64> {
    let params = json!({
      "db": credentials.database,
      "login": credentials.username,
      "password": credentials.password,
    });

    let result = match self.endpoint.post("web/session/authenticate", params).await {
      Ok(result) => result,
      Err(Error::Fault { message, .. }) => return Err(auth_error(self.server(), message)),
      Err(e) => return Err(e),
    };

    match result.get("uid").and_then(Value::as_i64) {
      Some(uid) if uid > 0 => Ok(uid),
      _ => Err(auth_error(self.server(), "no uid in session response")),
    }
  }

  async fn execute_kw(&self, _credentials: &Credentials, uid: i64, call: &RemoteCall) -> Result<Value> {
    let params = json!({
      "model": call.model,
      "method": call.method,
      "args": call.args,
      "kwargs": call.kwargs,
      "context": {"uid": uid},
    });

    self.endpoint.post("web/dataset/call_kw", params).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::{Matcher, Server};

  fn credentials() -> Credentials {
    Credentials {
      database: "coop".to_string(),
      username: "reports".to_string(),
      password: "secret".to_string(),
    }
  }

  #[test]
  fn test_credentials_debug_hides_password() {
    let printed = format!("{:?}", credentials());
    assert!(!printed.contains("secret"));
    assert!(printed.contains("reports"));
  }

  #[test]
  fn test_remote_call_builder() {
    let call = RemoteCall::new("res.partner", "search_read")
      .arg(json!([["is_member", "=", true]]))
      .kwarg("fields", json!(["name"]));
    assert_eq!(call.args.len(), 1);
    assert_eq!(call.kwargs.get("fields"), Some(&json!(["name"])));
  }

  #[tokio::test]
  async fn test_jsonrpc_authenticate() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("POST", "/jsonrpc")
      .match_body(Matcher::PartialJson(json!({
        "method": "call",
        "params": {
          "service": "common",
          "method": "authenticate",
          "args": ["coop", "reports", "secret", {}]
        }
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"jsonrpc": "2.0", "id": 1, "result": 7}"#)
      .create_async()
      .await;

    let transport = JsonRpcTransport::new(&server.url()).unwrap();
    let uid = transport.authenticate(&credentials()).await.unwrap();

    assert_eq!(uid, 7);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_jsonrpc_refused_login_is_auth_error() {
    let mut server = Server::new_async().await;
    server
      .mock("POST", "/jsonrpc")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"jsonrpc": "2.0", "id": 1, "result": false}"#)
      .create_async()
      .await;

    let transport = JsonRpcTransport::new(&server.url()).unwrap();
    let err = transport.authenticate(&credentials()).await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
  }

  #[tokio::test]
  async fn test_jsonrpc_execute_kw_payload() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("POST", "/jsonrpc")
      .match_body(Matcher::PartialJson(json!({
        "params": {
          "service": "object",
          "method": "execute_kw",
          "args": [
            "coop", 7, "secret", "product.label", "search_read",
            [[]],
            {"fields": ["code", "name"]}
          ]
        }
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"jsonrpc": "2.0", "id": 2, "result": [{"id": 1, "code": "AB", "name": "Bio"}]}"#)
      .create_async()
      .await;

    let transport = JsonRpcTransport::new(&server.url()).unwrap();
    let call = RemoteCall::new("product.label", "search_read")
      .arg(json!([]))
      .kwarg("fields", json!(["code", "name"]));
    let result = transport.execute_kw(&credentials(), 7, &call).await.unwrap();

    assert_eq!(result[0]["name"], "Bio");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_jsonrpc_fault_surfaces_as_fault() {
    let mut server = Server::new_async().await;
    server
      .mock("POST", "/jsonrpc")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(
        r#"{"jsonrpc": "2.0", "id": 2, "error": {"code": 200, "message": "Odoo Server Error",
            "data": {"name": "builtins.ValueError", "message": "Invalid field 'nope'"}}}"#,
      )
      .create_async()
      .await;

    let transport = JsonRpcTransport::new(&server.url()).unwrap();
    let call = RemoteCall::new("res.partner", "search_read").arg(json!([]));
    let err = transport.execute_kw(&credentials(), 7, &call).await.unwrap_err();

    assert!(err.is_fault());
  }

  #[tokio::test]
  async fn test_web_session_authenticate_and_call() {
    let mut server = Server::new_async().await;
    let auth = server
      .mock("POST", "/web/session/authenticate")
      .match_body(Matcher::PartialJson(json!({
        "params": {"db": "coop", "login": "reports", "password": "secret"}
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_header("set-cookie", "session_id=abc; Path=/")
      .with_body(r#"{"jsonrpc": "2.0", "id": 1, "result": {"uid": 9, "db": "coop"}}"#)
      .create_async()
      .await;
    let call_kw = server
      .mock("POST", "/web/dataset/call_kw")
      .match_body(Matcher::PartialJson(json!({
        "params": {"model": "uom.uom", "method": "search_read", "context": {"uid": 9}}
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"jsonrpc": "2.0", "id": 2, "result": []}"#)
      .create_async()
      .await;

    let transport = WebSessionTransport::new(&server.url()).unwrap();
    let uid = transport.authenticate(&credentials()).await.unwrap();
    assert_eq!(uid, 9);

    let call = RemoteCall::new("uom.uom", "search_read").arg(json!([]));
    let result = transport.execute_kw(&credentials(), uid, &call).await.unwrap();
    assert_eq!(result, json!([]));

    auth.assert_async().await;
    call_kw.assert_async().await;
  }

  #[tokio::test]
  async fn test_web_session_without_uid_is_auth_error() {
    let mut server = Server::new_async().await;
    server
      .mock("POST", "/web/session/authenticate")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"jsonrpc": "2.0", "id": 1, "result": {"uid": false}}"#)
      .create_async()
      .await;

    let transport = WebSessionTransport::new(&server.url()).unwrap();
    let err = transport.authenticate(&credentials()).await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
  }

  #[test]
  fn test_server_keeps_sub_path() {
    let transport = JsonRpcTransport::new("https://erp.example.org/odoo/").unwrap();
    assert_eq!(transport.server(), "https://erp.example.org/odoo");
  }
}
