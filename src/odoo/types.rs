//! Normalized records handed to report code and stored in the cache.
//!
//! Relations are split into `*_id` / `*_name` columns, dates are parsed,
//! and `false` sentinels are `None`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::Cacheable;

/// Header rows and their detail rows, fetched together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch<H, D> {
  pub headers: Vec<H>,
  pub details: Vec<D>,
}

impl<H, D> Batch<H, D> {
  pub fn new(headers: Vec<H>, details: Vec<D>) -> Self {
    Self { headers, details }
  }
}

impl<H, D> Cacheable for Batch<H, D>
where
  H: Serialize + for<'de> Deserialize<'de>,
  D: Serialize + for<'de> Deserialize<'de>,
{
  /// Only the headers count: a window with orders but no lines is still data.
  fn is_empty_result(&self) -> bool {
    self.headers.is_empty()
  }
}

/// Detail type of entities that have no detail rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoDetail {}

// ============================================================================
// Transactions
// ============================================================================

/// Point-of-sale order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosOrder {
  pub id: i64,
  pub date_order: DateTime<Utc>,
  pub partner_id: Option<i64>,
  pub partner_name: Option<String>,
  pub amount_total: f64,
  pub state: String,
  pub lines: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosOrderLine {
  pub id: i64,
  pub order_id: i64,
  pub date_order: DateTime<Utc>,
  pub product_id: Option<i64>,
  pub product_name: Option<String>,
  pub price_subtotal_incl: f64,
  pub qty: f64,
  pub discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
  pub id: i64,
  pub date_order: DateTime<Utc>,
  pub display_name: String,
  pub partner_id: Option<i64>,
  pub partner_name: Option<String>,
  pub amount_total: f64,
  pub amount_untaxed: f64,
  pub invoice_status: Option<String>,
  pub state: String,
  pub order_line: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
  pub id: i64,
  pub order_id: i64,
  pub date_order: DateTime<Utc>,
  pub product_id: Option<i64>,
  pub product_name: Option<String>,
  pub price_subtotal: f64,
  pub price_tax: f64,
  pub price_total: f64,
  pub price_unit: f64,
  pub product_qty: f64,
  pub product_uom_qty: f64,
  pub qty_invoiced: f64,
  pub qty_received: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInvoice {
  pub id: i64,
  pub number: Option<String>,
  pub date_invoice: Option<NaiveDate>,
  pub partner_id: Option<i64>,
  pub partner_name: Option<String>,
  pub invoice_type: String,
  pub state: String,
  pub amount_untaxed: f64,
  pub amount_tax: f64,
  pub amount_total: f64,
  pub residual: f64,
  pub journal_id: Option<i64>,
  pub invoice_line_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInvoiceLine {
  pub id: i64,
  pub account_invoice_id: i64,
  pub product_id: Option<i64>,
  pub product_name: Option<String>,
  pub account_id: Option<i64>,
  pub name: String,
  pub quantity: f64,
  pub price_unit: f64,
  pub discount: f64,
  pub price_subtotal: f64,
  pub price_total: f64,
}

/// Journal item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMoveLine {
  pub id: i64,
  pub date: NaiveDate,
  pub move_id: Option<i64>,
  pub journal_id: Option<i64>,
  pub account_id: Option<i64>,
  pub partner_id: Option<i64>,
  pub name: Option<String>,
  pub debit: f64,
  pub credit: f64,
  pub balance: f64,
}

/// Stock move into the inventory-loss location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLoss {
  pub id: i64,
  pub date_expected: DateTime<Utc>,
  pub name: String,
  pub stock_location_id: Option<i64>,
  pub product_id: Option<i64>,
  pub product_name: Option<String>,
  pub product_qty: f64,
  pub price_unit: f64,
}

// ============================================================================
// Master data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub rack_code: Option<String>,
  pub delisted: bool,
  pub create_date: DateTime<Utc>,
  pub theoritical_price: f64,
  pub active: bool,
  pub sale_ok: bool,
  pub categ_id: Option<i64>,
  pub categ_name: Option<String>,
  pub product_template_id: Option<i64>,
  pub label_ids: Vec<i64>,
  pub barcode: Option<String>,
  pub default_code: Option<String>,
}

/// Cooperative member (a `res.partner` flagged as member)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
  pub id: i64,
  pub name: String,
  pub city: Option<String>,
  pub street: Option<String>,
  pub street2: Option<String>,
  pub gender: Option<String>,
  pub age: Option<i64>,
  pub is_squadleader: bool,
  pub shift_type: Option<String>,
  pub is_exempted: bool,
  pub working_state: Option<String>,
  pub is_unsubscribed: bool,
  pub is_worker_member: bool,
  pub customer: bool,
  pub supplier: bool,
  pub cooperative_state: Option<String>,
  pub create_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
  pub id: i64,
  pub name: String,
  pub reference: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub city: Option<String>,
  pub zip: Option<String>,
  pub create_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub id: i64,
  pub name: String,
  pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
  pub id: i64,
  pub code: Option<String>,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
  pub id: i64,
  pub name: String,
  pub amount: f64,
  pub amount_type: String,
  pub type_tax_use: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
  pub id: i64,
  pub code: String,
  pub name: String,
  pub user_type_id: Option<i64>,
  pub user_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub id: i64,
  pub name: String,
  pub comment: Option<String>,
}

/// Unit of measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uom {
  pub id: i64,
  pub name: String,
  pub category_id: Option<i64>,
  pub category_name: Option<String>,
  pub factor: f64,
  pub uom_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
  pub id: i64,
  pub code: String,
  pub name: String,
}
