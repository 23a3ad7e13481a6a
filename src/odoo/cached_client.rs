//! Cached Odoo client that wraps OdooClient with transparent caching.

use chrono::Duration;
use chrono_tz::Tz;

use crate::cache::{CacheKey, CacheLayer, CacheResult};
use crate::config::{CacheConfig, Config, LossesConfig};
use crate::error::Result;

use super::client::OdooClient;
use super::connection::Connection;
use super::dates::DateWindow;
use super::domain::Domain;
use super::entities::*;
use super::normalize::Record;
use super::types::*;

/// Odoo client with transparent caching support.
///
/// Dated accessors are keyed by namespace, local window with offsets, detail
/// flag and entity settings; master-data accessors by namespace alone.
#[derive(Clone)]
pub struct CachedOdooClient {
  inner: OdooClient,
  cache: CacheLayer,
  timezone: Tz,
  losses: ProductLosses,
  transactional_ttl: Option<Duration>,
  master_ttl: Option<Duration>,
}

impl CachedOdooClient {
  /// Create a client from the resolved configuration. Nothing is sent until the first call.
  pub fn new(config: &Config) -> Result<Self> {
    let inner = OdooClient::new(Connection::from_config(&config.odoo)?);
    let cache = CacheLayer::open(&config.cache)?;

    Ok(
      Self::from_parts(inner, cache, config.timezone)
        .with_ttls(config.cache.transactional_ttl, config.cache.master_ttl)
        .with_losses(config.losses),
    )
  }

  /// Assemble from an existing client and cache, with default TTLs and loss locations.
  pub fn from_parts(inner: OdooClient, cache: CacheLayer, timezone: Tz) -> Self {
    let defaults = CacheConfig::default();
    Self {
      inner,
      cache,
      timezone,
      losses: ProductLosses::default(),
      transactional_ttl: defaults.transactional_ttl,
      master_ttl: defaults.master_ttl,
    }
  }

  pub fn with_ttls(mut self, transactional: Option<Duration>, master: Option<Duration>) -> Self {
    self.transactional_ttl = transactional;
    self.master_ttl = master;
    self
  }

  pub fn with_losses(mut self, losses: LossesConfig) -> Self {
    self.losses = ProductLosses {
      picking_type_id: losses.picking_type_id,
      location_dest_id: losses.location_dest_id,
    };
    self
  }

  pub fn timezone(&self) -> Tz {
    self.timezone
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  /// The loss entity with the configured operation type and location.
  pub fn losses(&self) -> ProductLosses {
    self.losses
  }

  /// Normalize user-supplied bounds in the configured zone.
  pub fn window(&self, start: &str, end: Option<&str>) -> Result<DateWindow> {
    DateWindow::parse(start, end, self.timezone)
  }

  // ==========================================================================
  // Generic accessors
  // ==========================================================================

  /// Fetch a dated entity with caching.
  pub async fn fetch<E: DatedEntity>(
    &self,
    entity: &E,
    window: &DateWindow,
    include_detail: bool,
  ) -> Result<CacheResult<Batch<E::Header, E::Detail>>> {
    let (start, end) = window.key_bounds()?;
    let mut key = CacheKey::new(E::NAMESPACE)
      .with_range(start, end)
      .with_detail(include_detail);
    if let Some(scope) = entity.key_scope() {
      key = key.with_scope(scope);
    }

    self
      .cache
      .get_or_compute(&key, self.transactional_ttl, || {
        self.inner.fetch_dated(entity, window, include_detail)
      })
      .await
  }

  /// Fetch month by month, each month cached under its own key.
  ///
  /// Re-running an export after the current month moved on only refetches
  /// the months that were empty or invalidated.
  pub async fn fetch_monthly<E: DatedEntity>(
    &self,
    entity: &E,
    window: &DateWindow,
    include_detail: bool,
  ) -> Result<Batch<E::Header, E::Detail>> {
    let mut all = Batch::new(Vec::new(), Vec::new());
    for month in window.split_months(self.timezone)? {
      let batch = self.fetch(entity, &month, include_detail).await?.data;
      all.headers.extend(batch.headers);
      all.details.extend(batch.details);
    }
    Ok(all)
  }

  /// Fetch a master-data table with caching.
  pub async fn master<M: MasterEntity>(&self, entity: &M) -> Result<CacheResult<Vec<M::Record>>> {
    let key = CacheKey::new(M::NAMESPACE);
    self
      .cache
      .get_or_compute(&key, self.master_ttl, || self.inner.fetch_master(entity))
      .await
  }

  // ==========================================================================
  // Transactions
  // ==========================================================================

  pub async fn get_pos_orders(
    &self,
    start: &str,
    end: Option<&str>,
    include_order_lines: bool,
  ) -> Result<Batch<PosOrder, PosOrderLine>> {
    let window = self.window(start, end)?;
    Ok(self.fetch(&PosOrders, &window, include_order_lines).await?.data)
  }

  pub async fn get_purchase_orders(
    &self,
    start: &str,
    end: Option<&str>,
    include_order_lines: bool,
  ) -> Result<Batch<PurchaseOrder, PurchaseOrderLine>> {
    let window = self.window(start, end)?;
    Ok(self.fetch(&PurchaseOrders, &window, include_order_lines).await?.data)
  }

  pub async fn get_account_invoices(
    &self,
    start: &str,
    end: Option<&str>,
    include_invoice_lines: bool,
  ) -> Result<Batch<AccountInvoice, AccountInvoiceLine>> {
    let window = self.window(start, end)?;
    Ok(self.fetch(&AccountInvoices, &window, include_invoice_lines).await?.data)
  }

  pub async fn get_account_move_lines(&self, start: &str, end: Option<&str>) -> Result<Vec<AccountMoveLine>> {
    let window = self.window(start, end)?;
    Ok(self.fetch(&AccountMoveLines, &window, false).await?.data.headers)
  }

  pub async fn get_product_losses(&self, start: &str, end: Option<&str>) -> Result<Vec<ProductLoss>> {
    let window = self.window(start, end)?;
    Ok(self.fetch(&self.losses, &window, false).await?.data.headers)
  }

  // ==========================================================================
  // Master data
  // ==========================================================================

  /// Every product, archived ones included.
  pub async fn get_all_products(&self) -> Result<Vec<Product>> {
    Ok(self.master(&Products).await?.data)
  }

  pub async fn get_all_members(&self) -> Result<Vec<Member>> {
    Ok(self.master(&Members).await?.data)
  }

  pub async fn get_all_suppliers(&self) -> Result<Vec<Supplier>> {
    Ok(self.master(&Suppliers).await?.data)
  }

  pub async fn get_all_categories(&self) -> Result<Vec<Category>> {
    Ok(self.master(&Categories).await?.data)
  }

  pub async fn get_all_labels(&self) -> Result<Vec<Label>> {
    Ok(self.master(&Labels).await?.data)
  }

  pub async fn get_all_taxes(&self) -> Result<Vec<TaxRate>> {
    Ok(self.master(&TaxRates).await?.data)
  }

  pub async fn get_all_accounts(&self) -> Result<Vec<Account>> {
    Ok(self.master(&Accounts).await?.data)
  }

  pub async fn get_all_locations(&self) -> Result<Vec<Location>> {
    Ok(self.master(&Locations).await?.data)
  }

  pub async fn get_all_uoms(&self) -> Result<Vec<Uom>> {
    Ok(self.master(&Uoms).await?.data)
  }

  pub async fn get_all_journals(&self) -> Result<Vec<Journal>> {
    Ok(self.master(&Journals).await?.data)
  }

  // ==========================================================================
  // Uncached and maintenance
  // ==========================================================================

  /// Ad-hoc `search_read` (not cached - arbitrary model and fields).
  pub async fn search_read(&self, model: &str, domain: &Domain, fields: &[&str]) -> Result<Vec<Record>> {
    self.inner.search_read(model, domain, fields).await
  }

  /// Delete every cached entry whose key starts with `prefix`.
  pub fn invalidate(&self, prefix: &str) -> Result<usize> {
    self.cache.invalidate(prefix)
  }

  /// Delete every expired entry.
  pub fn sweep(&self) -> Result<usize> {
    self.cache.sweep()
  }

  pub fn cache_keys(&self, prefix: &str) -> Result<Vec<String>> {
    self.cache.keys(prefix)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, SqliteStorage};
  use crate::error::Error;
  use crate::odoo::transport::{Credentials, RemoteCall, Transport};
  use async_trait::async_trait;
  use serde_json::{json, Value};
  use std::collections::HashMap;
  use std::sync::{Arc, Mutex};

  /// Answers `search_read` per model and records every call.
  #[derive(Default)]
  struct ScriptedTransport {
    responses: HashMap<String, Value>,
    faults: HashMap<String, (i64, String)>,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
  }

  impl ScriptedTransport {
    fn respond(mut self, model: &str, rows: Value) -> Self {
      self.responses.insert(model.to_string(), rows);
      self
    }

    fn fault(mut self, model: &str, code: i64, message: &str) -> Self {
      self.faults.insert(model.to_string(), (code, message.to_string()));
      self
    }
  }

  #[async_trait]
  impl Transport for ScriptedTransport {
    fn server(&self) -> &str {
      "http://erp.test"
    }

    async fn authenticate(&self, _credentials: &Credentials) -> Result<i64> {
      Ok(2)
    }

    async fn execute_kw(&self, _credentials: &Credentials, _uid: i64, call: &RemoteCall) -> Result<Value> {
      self.calls.lock().unwrap().push(call.clone());
      if let Some((code, message)) = self.faults.get(&call.model) {
        return Err(Error::Fault {
          code: *code,
          message: message.clone(),
        });
      }
      Ok(self.responses.get(&call.model).cloned().unwrap_or_else(|| json!([])))
    }
  }

  struct Harness {
    client: CachedOdooClient,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
  }

  impl Harness {
    fn new(transport: ScriptedTransport) -> Self {
      Self::with_cache(transport, CacheLayer::new(SqliteStorage::open_in_memory().unwrap()))
    }

    fn with_cache(transport: ScriptedTransport, cache: CacheLayer) -> Self {
      let calls = transport.calls.clone();
      let credentials = Credentials {
        database: "coop".to_string(),
        username: "reports".to_string(),
        password: "secret".to_string(),
      };
      let inner = OdooClient::new(Connection::new(transport, credentials));
      Self {
        client: CachedOdooClient::from_parts(inner, cache, chrono_tz::Europe::Paris),
        calls,
      }
    }

    fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }

    fn models(&self) -> Vec<String> {
      self.calls.lock().unwrap().iter().map(|c| c.model.clone()).collect()
    }
  }

  fn pos_transport() -> ScriptedTransport {
    ScriptedTransport::default()
      .respond(
        "pos.order",
        json!([
          {"id": 1, "date_order": "2025-07-14 08:00:00", "partner_id": [7, "Alice"],
           "amount_total": 10.0, "state": "done", "lines": [11]},
          {"id": 2, "date_order": "2025-07-14 09:00:00", "partner_id": false,
           "amount_total": 4.5, "state": "paid", "lines": [21, 22]}
        ]),
      )
      .respond(
        "pos.order.line",
        json!([
          {"id": 11, "product_id": [55, "Pommes"], "price_subtotal_incl": 10.0, "qty": 2, "discount": 0}
        ]),
      )
  }

  #[tokio::test]
  async fn test_orders_with_lines_then_cache_hit() {
    let h = Harness::new(pos_transport());

    let batch = h.client.get_pos_orders("2025-07-14", None, true).await.unwrap();
    assert_eq!(batch.headers.len(), 2);
    assert_eq!(batch.headers[1].partner_id, None);
    // One request for the orders, then one per order
    assert_eq!(h.models(), vec!["pos.order", "pos.order.line", "pos.order.line"]);
    assert!(batch.details.iter().all(|l| l.product_name.as_deref() == Some("Pommes")));

    let again = h.client.get_pos_orders("2025-07-14", None, true).await.unwrap();
    assert_eq!(again, batch);
    assert_eq!(h.call_count(), 3);
  }

  #[tokio::test]
  async fn test_query_uses_utc_bounds_and_closed_states() {
    let h = Harness::new(pos_transport());
    h.client.get_pos_orders("2025-07-14", None, false).await.unwrap();

    let calls = h.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "search_read");
    assert_eq!(
      calls[0].args[0],
      json!([
        "&",
        "&",
        ["date_order", ">=", "2025-07-13 22:00:00"],
        ["date_order", "<=", "2025-07-14 21:59:59"],
        ["state", "in", ["done", "paid", "invoiced"]]
      ])
    );
  }

  #[tokio::test]
  async fn test_detail_flag_is_part_of_the_key() {
    let h = Harness::new(pos_transport());

    h.client.get_pos_orders("2025-07-14", None, false).await.unwrap();
    h.client.get_pos_orders("2025-07-14", None, true).await.unwrap();
    assert_eq!(h.call_count(), 4);

    let keys = h.client.cache_keys("get_pos_orders").unwrap();
    assert_eq!(keys.len(), 2);
  }

  #[tokio::test]
  async fn test_explicit_end_equal_to_start_shares_the_entry() {
    let h = Harness::new(pos_transport());
    h.client.get_pos_orders("2025-07-14", None, false).await.unwrap();
    h.client.get_pos_orders("2025-07-14", Some("2025-07-14"), false).await.unwrap();
    assert_eq!(h.call_count(), 1);
  }

  #[tokio::test]
  async fn test_empty_result_is_not_cached() {
    let h = Harness::new(ScriptedTransport::default());

    let batch = h.client.get_purchase_orders("2025-07-14", None, true).await.unwrap();
    assert!(batch.headers.is_empty());
    h.client.get_purchase_orders("2025-07-14", None, true).await.unwrap();

    assert_eq!(h.call_count(), 2);
    assert!(h.client.cache_keys("").unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_fault_is_an_error_not_an_empty_result() {
    let h = Harness::new(ScriptedTransport::default().fault("pos.order", 200, "Access Denied"));

    let err = h.client.get_pos_orders("2025-07-14", None, true).await.unwrap_err();
    assert!(matches!(err, Error::Fault { code: 200, .. }));
    assert!(h.client.cache_keys("").unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_schema_violation_names_the_model() {
    let h = Harness::new(ScriptedTransport::default().respond(
      "account.move.line",
      json!([{"id": 1, "date": 20250714}]),
    ));

    let err = h.client.get_account_move_lines("2025-07-14", None).await.unwrap_err();
    match err {
      Error::Decode { model, .. } => assert_eq!(model, "account.move.line"),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_invalidate_by_month_prefix() {
    let h = Harness::new(pos_transport());
    h.client.get_pos_orders("2025-07-01", Some("2025-07-31"), false).await.unwrap();
    h.client.get_pos_orders("2025-07-14", None, false).await.unwrap();
    h.client.get_pos_orders("2025-08-01", None, false).await.unwrap();

    assert_eq!(h.client.invalidate("get_pos_orders:2025-07").unwrap(), 2);
    assert_eq!(h.client.cache_keys("get_pos_orders").unwrap().len(), 1);

    h.client.get_pos_orders("2025-07-14", None, false).await.unwrap();
    assert_eq!(h.call_count(), 4);
  }

  #[tokio::test]
  async fn test_refresh_refetches_and_overwrites() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let h = Harness::with_cache(pos_transport(), CacheLayer::new(storage.clone()));
    h.client.get_pos_orders("2025-07-14", None, false).await.unwrap();

    let refreshing = Harness::with_cache(pos_transport(), CacheLayer::new(storage).with_refresh(true));
    refreshing.client.get_pos_orders("2025-07-14", None, false).await.unwrap();
    assert_eq!(refreshing.call_count(), 1);
    assert_eq!(refreshing.client.cache_keys("get_pos_orders").unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_losses_use_configured_locations() {
    let h = Harness::new(ScriptedTransport::default().respond(
      "stock.move",
      json!([{"id": 3, "date_expected": "2025-07-14 10:00:00", "name": "Casse",
              "location_id": [12, "Stock"], "product_id": [55, "Pommes"],
              "product_qty": 1.0, "price_unit": 2.0}]),
    ));
    let client = h.client.clone().with_losses(LossesConfig {
      picking_type_id: 30,
      location_dest_id: 8,
    });

    let losses = client.get_product_losses("2025-07-14", None).await.unwrap();
    assert_eq!(losses[0].stock_location_id, Some(12));

    let calls = h.calls.lock().unwrap();
    let domain = calls[0].args[0].as_array().unwrap().clone();
    assert!(domain.contains(&json!(["picking_type_id", "=", 30])));
    assert!(domain.contains(&json!(["location_dest_id", "=", 8])));
  }

  #[tokio::test]
  async fn test_loss_settings_are_part_of_the_key() {
    let h = Harness::new(ScriptedTransport::default().respond(
      "stock.move",
      json!([{"id": 3, "date_expected": "2025-07-14 10:00:00", "name": "Casse",
              "location_id": [12, "Stock"], "product_id": [55, "Pommes"],
              "product_qty": 1.0, "price_unit": 2.0}]),
    ));
    h.client.get_product_losses("2025-07-14", None).await.unwrap();

    let moved = h.client.clone().with_losses(LossesConfig {
      picking_type_id: 30,
      location_dest_id: 8,
    });
    moved.get_product_losses("2025-07-14", None).await.unwrap();
    moved.get_product_losses("2025-07-14", None).await.unwrap();

    assert_eq!(h.call_count(), 2);
    let keys = h.client.cache_keys("get_product_losses:2025-07-14").unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().any(|k| k.ends_with(":type=30,dest=8")));
  }

  #[tokio::test]
  async fn test_dst_overlap_windows_do_not_share_an_entry() {
    let h = Harness::new(pos_transport());
    let summer = h.client.window("2025-10-26T00:30:00Z", Some("2025-10-26T00:45:00Z")).unwrap();
    let winter = h.client.window("2025-10-26T01:30:00Z", Some("2025-10-26T01:45:00Z")).unwrap();

    h.client.fetch(&PosOrders, &summer, false).await.unwrap();
    let second = h.client.fetch(&PosOrders, &winter, false).await.unwrap();

    assert_eq!(second.source, CacheSource::Network);
    assert_eq!(h.call_count(), 2);
    assert_eq!(h.client.cache_keys("get_pos_orders:2025-10-26").unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_monthly_fetch_keeps_time_bounds() {
    let h = Harness::new(pos_transport());
    let window = h.client.window("2025-07-01 18:00:00", Some("2025-07-02 06:00:00")).unwrap();
    h.client.fetch_monthly(&PosOrders, &window, false).await.unwrap();

    let calls = h.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let domain = calls[0].args[0].as_array().unwrap().clone();
    assert!(domain.contains(&json!(["date_order", ">=", "2025-07-01 16:00:00"])));
    assert!(domain.contains(&json!(["date_order", "<=", "2025-07-02 04:00:00"])));
  }

  #[tokio::test]
  async fn test_master_data_is_cached_by_namespace() {
    let h = Harness::new(ScriptedTransport::default().respond(
      "product.category",
      json!([{"id": 4, "display_name": "All / Vrac", "parent_id": [1, "All"]}]),
    ));

    let first = h.client.master(&Categories).await.unwrap();
    assert_eq!(first.source, CacheSource::Network);
    let second = h.client.master(&Categories).await.unwrap();
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data[0].name, "All / Vrac");

    assert_eq!(h.call_count(), 1);
    assert_eq!(h.client.cache_keys("").unwrap(), vec!["get_all_categories".to_string()]);
  }

  #[tokio::test]
  async fn test_monthly_split_caches_each_month() {
    let h = Harness::new(pos_transport());
    let window = h.client.window("2025-06-20", Some("2025-07-10")).unwrap();

    let batch = h.client.fetch_monthly(&PosOrders, &window, false).await.unwrap();
    // The scripted server answers the same two orders for every month
    assert_eq!(batch.headers.len(), 4);
    assert_eq!(h.client.cache_keys("get_pos_orders:2025-06").unwrap().len(), 1);
    assert_eq!(h.client.cache_keys("get_pos_orders:2025-07").unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_disabled_cache_always_calls() {
    let h = Harness::with_cache(pos_transport(), CacheLayer::disabled());
    h.client.get_pos_orders("2025-07-14", None, false).await.unwrap();
    h.client.get_pos_orders("2025-07-14", None, false).await.unwrap();
    assert_eq!(h.call_count(), 2);
  }
}
