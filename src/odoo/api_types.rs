//! Serde-deserializable types matching `search_read` payloads.
//!
//! Kept apart from the records in [`super::types`] so the ORM quirks
//! (`[id, label]` relations, `false` for empty) stay out of report code.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::normalize::{
  false_as_empty, false_as_none, odoo_date, odoo_date_opt, odoo_datetime, relation_id, zero_as_none,
  Many2One,
};
use super::rack::RackCode;
use super::types::*;

// ============================================================================
// Point of sale
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiPosOrder {
  pub id: i64,
  #[serde(deserialize_with = "odoo_datetime")]
  pub date_order: DateTime<Utc>,
  #[serde(default)]
  pub partner_id: Many2One,
  #[serde(default)]
  pub amount_total: f64,
  pub state: String,
  #[serde(default)]
  pub lines: Vec<i64>,
}

impl From<ApiPosOrder> for PosOrder {
  fn from(api: ApiPosOrder) -> Self {
    let (partner_id, partner_name) = api.partner_id.into_parts();
    Self {
      id: api.id,
      date_order: api.date_order,
      partner_id,
      partner_name,
      amount_total: api.amount_total,
      state: api.state,
      lines: api.lines,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiPosOrderLine {
  pub id: i64,
  #[serde(default)]
  pub product_id: Many2One,
  #[serde(default)]
  pub price_subtotal_incl: f64,
  #[serde(default)]
  pub qty: f64,
  #[serde(default)]
  pub discount: f64,
}

impl ApiPosOrderLine {
  /// Lines carry their order's id and date so they can be reported alone.
  pub fn into_line(self, order: &PosOrder) -> PosOrderLine {
    let (product_id, product_name) = self.product_id.into_parts();
    PosOrderLine {
      id: self.id,
      order_id: order.id,
      date_order: order.date_order,
      product_id,
      product_name,
      price_subtotal_incl: self.price_subtotal_incl,
      qty: self.qty,
      discount: self.discount,
    }
  }
}

// ============================================================================
// Purchases
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiPurchaseOrder {
  pub id: i64,
  #[serde(deserialize_with = "odoo_datetime")]
  pub date_order: DateTime<Utc>,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub display_name: String,
  #[serde(default)]
  pub partner_id: Many2One,
  #[serde(default)]
  pub amount_total: f64,
  #[serde(default)]
  pub amount_untaxed: f64,
  #[serde(default, deserialize_with = "false_as_none")]
  pub invoice_status: Option<String>,
  pub state: String,
  #[serde(default)]
  pub order_line: Vec<i64>,
}

impl From<ApiPurchaseOrder> for PurchaseOrder {
  fn from(api: ApiPurchaseOrder) -> Self {
    let (partner_id, partner_name) = api.partner_id.into_parts();
    Self {
      id: api.id,
      date_order: api.date_order,
      display_name: api.display_name,
      partner_id,
      partner_name,
      amount_total: api.amount_total,
      amount_untaxed: api.amount_untaxed,
      invoice_status: api.invoice_status,
      state: api.state,
      order_line: api.order_line,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiPurchaseOrderLine {
  pub id: i64,
  #[serde(default)]
  pub product_id: Many2One,
  #[serde(default)]
  pub price_subtotal: f64,
  #[serde(default)]
  pub price_tax: f64,
  #[serde(default)]
  pub price_total: f64,
  #[serde(default)]
  pub price_unit: f64,
  #[serde(default)]
  pub product_qty: f64,
  #[serde(default)]
  pub product_uom_qty: f64,
  #[serde(default)]
  pub qty_invoiced: f64,
  #[serde(default)]
  pub qty_received: f64,
}

impl ApiPurchaseOrderLine {
  pub fn into_line(self, order: &PurchaseOrder) -> PurchaseOrderLine {
    let (product_id, product_name) = self.product_id.into_parts();
    PurchaseOrderLine {
      id: self.id,
      order_id: order.id,
      date_order: order.date_order,
      product_id,
      product_name,
      price_subtotal: self.price_subtotal,
      price_tax: self.price_tax,
      price_total: self.price_total,
      price_unit: self.price_unit,
      product_qty: self.product_qty,
      product_uom_qty: self.product_uom_qty,
      qty_invoiced: self.qty_invoiced,
      qty_received: self.qty_received,
    }
  }
}

// ============================================================================
// Accounting
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiAccountInvoice {
  pub id: i64,
  #[serde(default, deserialize_with = "false_as_none")]
  pub number: Option<String>,
  #[serde(default, deserialize_with = "odoo_date_opt")]
  pub date_invoice: Option<NaiveDate>,
  #[serde(default)]
  pub partner_id: Many2One,
  #[serde(rename = "type")]
  pub invoice_type: String,
  pub state: String,
  #[serde(default)]
  pub amount_untaxed: f64,
  #[serde(default)]
  pub amount_tax: f64,
  #[serde(default)]
  pub amount_total: f64,
  #[serde(default)]
  pub residual: f64,
  #[serde(default, deserialize_with = "relation_id")]
  pub journal_id: Option<i64>,
  #[serde(default)]
  pub invoice_line_ids: Vec<i64>,
}

impl From<ApiAccountInvoice> for AccountInvoice {
  fn from(api: ApiAccountInvoice) -> Self {
    let (partner_id, partner_name) = api.partner_id.into_parts();
    Self {
      id: api.id,
      number: api.number,
      date_invoice: api.date_invoice,
      partner_id,
      partner_name,
      invoice_type: api.invoice_type,
      state: api.state,
      amount_untaxed: api.amount_untaxed,
      amount_tax: api.amount_tax,
      amount_total: api.amount_total,
      residual: api.residual,
      journal_id: api.journal_id,
      invoice_line_ids: api.invoice_line_ids,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiAccountInvoiceLine {
  pub id: i64,
  #[serde(default)]
  pub invoice_id: Many2One,
  #[serde(default)]
  pub product_id: Many2One,
  #[serde(default, deserialize_with = "relation_id")]
  pub account_id: Option<i64>,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub name: String,
  #[serde(default)]
  pub quantity: f64,
  #[serde(default)]
  pub price_unit: f64,
  #[serde(default)]
  pub discount: f64,
  #[serde(default)]
  pub price_subtotal: f64,
  #[serde(default)]
  pub price_total: f64,
}

impl ApiAccountInvoiceLine {
  pub fn into_line(self, invoice: &AccountInvoice) -> AccountInvoiceLine {
    let (product_id, product_name) = self.product_id.into_parts();
    AccountInvoiceLine {
      id: self.id,
      account_invoice_id: self.invoice_id.id().unwrap_or(invoice.id),
      product_id,
      product_name,
      account_id: self.account_id,
      name: self.name,
      quantity: self.quantity,
      price_unit: self.price_unit,
      discount: self.discount,
      price_subtotal: self.price_subtotal,
      price_total: self.price_total,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiAccountMoveLine {
  pub id: i64,
  #[serde(deserialize_with = "odoo_date")]
  pub date: NaiveDate,
  #[serde(default, deserialize_with = "relation_id")]
  pub move_id: Option<i64>,
  #[serde(default, deserialize_with = "relation_id")]
  pub journal_id: Option<i64>,
  #[serde(default, deserialize_with = "relation_id")]
  pub account_id: Option<i64>,
  #[serde(default, deserialize_with = "relation_id")]
  pub partner_id: Option<i64>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub name: Option<String>,
  #[serde(default)]
  pub debit: f64,
  #[serde(default)]
  pub credit: f64,
  #[serde(default)]
  pub balance: f64,
}

impl From<ApiAccountMoveLine> for AccountMoveLine {
  fn from(api: ApiAccountMoveLine) -> Self {
    Self {
      id: api.id,
      date: api.date,
      move_id: api.move_id,
      journal_id: api.journal_id,
      account_id: api.account_id,
      partner_id: api.partner_id,
      name: api.name,
      debit: api.debit,
      credit: api.credit,
      balance: api.balance,
    }
  }
}

// ============================================================================
// Stock
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiStockMove {
  pub id: i64,
  #[serde(deserialize_with = "odoo_datetime")]
  pub date_expected: DateTime<Utc>,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub name: String,
  #[serde(default, deserialize_with = "relation_id")]
  pub location_id: Option<i64>,
  #[serde(default)]
  pub product_id: Many2One,
  #[serde(default)]
  pub product_qty: f64,
  #[serde(default)]
  pub price_unit: f64,
}

impl From<ApiStockMove> for ProductLoss {
  fn from(api: ApiStockMove) -> Self {
    let (product_id, product_name) = api.product_id.into_parts();
    Self {
      id: api.id,
      date_expected: api.date_expected,
      name: api.name,
      stock_location_id: api.location_id,
      product_id,
      product_name,
      product_qty: api.product_qty,
      price_unit: api.price_unit,
    }
  }
}

// ============================================================================
// Master data
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProduct {
  pub id: i64,
  pub name: String,
  #[serde(default, deserialize_with = "false_as_none")]
  pub rack_location: Option<String>,
  #[serde(deserialize_with = "odoo_datetime")]
  pub create_date: DateTime<Utc>,
  #[serde(default)]
  pub theoritical_price: f64,
  #[serde(default)]
  pub active: bool,
  #[serde(default)]
  pub sale_ok: bool,
  #[serde(default)]
  pub categ_id: Many2One,
  #[serde(default, deserialize_with = "relation_id")]
  pub product_tmpl_id: Option<i64>,
  #[serde(default)]
  pub label_ids: Vec<i64>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub barcode: Option<String>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub default_code: Option<String>,
}

impl From<ApiProduct> for Product {
  fn from(api: ApiProduct) -> Self {
    let rack = RackCode::from_field(api.rack_location.as_deref());
    let (categ_id, categ_name) = api.categ_id.into_parts();
    Self {
      id: api.id,
      name: api.name,
      rack_code: rack.code,
      delisted: rack.delisted,
      create_date: api.create_date,
      theoritical_price: api.theoritical_price,
      active: api.active,
      sale_ok: api.sale_ok,
      categ_id,
      categ_name,
      product_template_id: api.product_tmpl_id,
      label_ids: api.label_ids,
      barcode: api.barcode,
      default_code: api.default_code,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiMember {
  pub id: i64,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub name: String,
  #[serde(default, deserialize_with = "false_as_none")]
  pub city: Option<String>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub street: Option<String>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub street2: Option<String>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub gender: Option<String>,
  #[serde(default, deserialize_with = "zero_as_none")]
  pub age: Option<i64>,
  #[serde(default)]
  pub is_squadleader: bool,
  #[serde(default, deserialize_with = "false_as_none")]
  pub shift_type: Option<String>,
  #[serde(default)]
  pub is_exempted: bool,
  #[serde(default, deserialize_with = "false_as_none")]
  pub working_state: Option<String>,
  #[serde(default)]
  pub is_unsubscribed: bool,
  #[serde(default)]
  pub is_worker_member: bool,
  #[serde(default)]
  pub customer: bool,
  #[serde(default)]
  pub supplier: bool,
  #[serde(default, deserialize_with = "false_as_none")]
  pub cooperative_state: Option<String>,
  #[serde(deserialize_with = "odoo_datetime")]
  pub create_date: DateTime<Utc>,
}

impl From<ApiMember> for Member {
  fn from(api: ApiMember) -> Self {
    Self {
      id: api.id,
      name: api.name,
      city: api.city,
      street: api.street,
      street2: api.street2,
      gender: api.gender,
      age: api.age,
      is_squadleader: api.is_squadleader,
      shift_type: api.shift_type,
      is_exempted: api.is_exempted,
      working_state: api.working_state,
      is_unsubscribed: api.is_unsubscribed,
      is_worker_member: api.is_worker_member,
      customer: api.customer,
      supplier: api.supplier,
      cooperative_state: api.cooperative_state,
      create_date: api.create_date,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiSupplier {
  pub id: i64,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub name: String,
  #[serde(rename = "ref", default, deserialize_with = "false_as_none")]
  pub reference: Option<String>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub email: Option<String>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub phone: Option<String>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub city: Option<String>,
  #[serde(default, deserialize_with = "false_as_none")]
  pub zip: Option<String>,
  #[serde(deserialize_with = "odoo_datetime")]
  pub create_date: DateTime<Utc>,
}

impl From<ApiSupplier> for Supplier {
  fn from(api: ApiSupplier) -> Self {
    Self {
      id: api.id,
      name: api.name,
      reference: api.reference,
      email: api.email,
      phone: api.phone,
      city: api.city,
      zip: api.zip,
      create_date: api.create_date,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiCategory {
  pub id: i64,
  /// Full path such as "All / Food / Fruits"
  pub display_name: String,
  #[serde(default, deserialize_with = "relation_id")]
  pub parent_id: Option<i64>,
}

impl From<ApiCategory> for Category {
  fn from(api: ApiCategory) -> Self {
    Self {
      id: api.id,
      name: api.display_name,
      parent_id: api.parent_id,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiLabel {
  pub id: i64,
  #[serde(default, deserialize_with = "false_as_none")]
  pub code: Option<String>,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub name: String,
}

impl From<ApiLabel> for Label {
  fn from(api: ApiLabel) -> Self {
    Self {
      id: api.id,
      code: api.code,
      name: api.name,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiTax {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub amount: f64,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub amount_type: String,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub type_tax_use: String,
}

impl From<ApiTax> for TaxRate {
  fn from(api: ApiTax) -> Self {
    Self {
      id: api.id,
      name: api.name,
      amount: api.amount,
      amount_type: api.amount_type,
      type_tax_use: api.type_tax_use,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiAccount {
  pub id: i64,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub code: String,
  pub name: String,
  #[serde(default)]
  pub user_type_id: Many2One,
}

impl From<ApiAccount> for Account {
  fn from(api: ApiAccount) -> Self {
    let (user_type_id, user_type) = api.user_type_id.into_parts();
    Self {
      id: api.id,
      code: api.code,
      name: api.name,
      user_type_id,
      user_type,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiLocation {
  pub id: i64,
  pub name: String,
  // Some databases store 0 in this text column
  #[serde(default, deserialize_with = "zero_as_none")]
  pub comment: Option<String>,
}

impl From<ApiLocation> for Location {
  fn from(api: ApiLocation) -> Self {
    Self {
      id: api.id,
      name: api.name,
      comment: api.comment,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiUom {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub category_id: Many2One,
  #[serde(default)]
  pub factor: f64,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub uom_type: String,
}

impl From<ApiUom> for Uom {
  fn from(api: ApiUom) -> Self {
    let (category_id, category_name) = api.category_id.into_parts();
    Self {
      id: api.id,
      name: api.name,
      category_id,
      category_name,
      factor: api.factor,
      uom_type: api.uom_type,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiJournal {
  pub id: i64,
  #[serde(default, deserialize_with = "false_as_empty")]
  pub code: String,
  pub name: String,
}

impl From<ApiJournal> for Journal {
  fn from(api: ApiJournal) -> Self {
    Self {
      id: api.id,
      code: api.code,
      name: api.name,
    }
  }
}
