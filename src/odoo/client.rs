use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::connection::Connection;
use super::dates::{to_odoo_datetime, DateWindow};
use super::domain::Domain;
use super::entities::{DatedEntity, MasterEntity};
use super::normalize::Record;
use super::transport::RemoteCall;
use super::types::Batch;
use crate::error::{Error, Result};

/// Odoo API client wrapper
#[derive(Clone)]
pub struct OdooClient {
  conn: Arc<Connection>,
}

impl OdooClient {
  pub fn new(conn: Connection) -> Self {
    Self { conn: Arc::new(conn) }
  }

  /// Call any model method.
  pub async fn execute_kw(&self, call: &RemoteCall) -> Result<Value> {
    self.conn.call(call).await
  }

  /// `search_read` returning untyped records
  pub async fn search_read(&self, model: &str, domain: &Domain, fields: &[&str]) -> Result<Vec<Record>> {
    self.search_read_as(model, domain, fields).await
  }

  /// `search_read` decoded into `T`; a record that does not fit fails the whole call.
  pub async fn search_read_as<T: DeserializeOwned>(
    &self,
    model: &str,
    domain: &Domain,
    fields: &[&str],
  ) -> Result<Vec<T>> {
    let call = RemoteCall::new(model, "search_read")
      .arg(domain.to_value())
      .kwarg("fields", json!(fields));

    let value = self.execute_kw(&call).await?;
    serde_json::from_value(value).map_err(|source| Error::Decode {
      model: model.to_string(),
      source,
    })
  }

  /// Headers in `window` and, if asked, their detail rows.
  ///
  /// Detail rows are requested one header at a time, in header order.
  pub async fn fetch_dated<E: DatedEntity>(
    &self,
    entity: &E,
    window: &DateWindow,
    include_detail: bool,
  ) -> Result<Batch<E::Header, E::Detail>> {
    debug!(
      "{} {} - {}",
      E::NAMESPACE,
      to_odoo_datetime(window.utc_start),
      to_odoo_datetime(window.utc_end)
    );

    let headers: Vec<E::Header> = self
      .search_read_as::<E::ApiHeader>(E::MODEL, &entity.filter(window), E::FIELDS)
      .await?
      .into_iter()
      .map(E::header)
      .collect();

    let mut details = Vec::new();
    if include_detail {
      for header in &headers {
        let Some(query) = E::detail_query(header) else {
          continue;
        };
        let rows = self
          .search_read_as::<E::ApiDetail>(query.model, &Domain::ids(&query.ids), query.fields)
          .await?;
        details.extend(rows.into_iter().map(|row| E::detail(row, header)));
      }
    }

    Ok(Batch::new(headers, details))
  }

  pub async fn fetch_master<M: MasterEntity>(&self, entity: &M) -> Result<Vec<M::Record>> {
    debug!("Getting the list of all {}...", M::MODEL);
    let rows = self
      .search_read_as::<M::Api>(M::MODEL, &entity.filter(), M::FIELDS)
      .await?;
    Ok(rows.into_iter().map(M::Record::from).collect())
  }
}
