//! What to ask the server for, per entity.
//!
//! A [`DatedEntity`] is a transactional model filtered on a date window, with
//! optional detail lines fetched per header. A [`MasterEntity`] is a reference
//! table read in full.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::api_types::*;
use super::dates::DateWindow;
use super::domain::{Domain, Operator};
use super::types::*;

/// How the date column of a model is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
  /// `fields.Date`: compared on local calendar days
  Date,
  /// `fields.Datetime`: stored in UTC, compared on instants
  DateTime,
}

/// The detail rows to read for one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailQuery {
  pub model: &'static str,
  pub fields: &'static [&'static str],
  pub ids: Vec<i64>,
}

pub trait DatedEntity: Send + Sync {
  type ApiHeader: DeserializeOwned + Send;
  type Header: Serialize + DeserializeOwned + Send + Sync;
  type ApiDetail: DeserializeOwned + Send;
  type Detail: Serialize + DeserializeOwned + Send + Sync;

  /// Cache namespace, also the leading component of every key.
  const NAMESPACE: &'static str;
  const MODEL: &'static str;
  const DATE_FIELD: &'static str;
  const DATE_KIND: DateField;
  const FIELDS: &'static [&'static str];

  /// Filter for `window`; entities add their own restrictions on top.
  fn filter(&self, window: &DateWindow) -> Domain {
    date_filter(Self::DATE_FIELD, Self::DATE_KIND, window)
  }

  /// Settings that change `filter`, appended to cache keys.
  fn key_scope(&self) -> Option<String> {
    None
  }

  fn header(api: Self::ApiHeader) -> Self::Header;

  /// `None` for entities without detail rows, or a header without lines.
  fn detail_query(header: &Self::Header) -> Option<DetailQuery>;

  fn detail(api: Self::ApiDetail, header: &Self::Header) -> Self::Detail;
}

pub trait MasterEntity: Send + Sync {
  type Api: DeserializeOwned + Send;
  type Record: Serialize + DeserializeOwned + From<Self::Api> + Send + Sync;

  const NAMESPACE: &'static str;
  const MODEL: &'static str;
  const FIELDS: &'static [&'static str];

  fn filter(&self) -> Domain {
    Domain::all()
  }
}

pub fn date_filter(field: &str, kind: DateField, window: &DateWindow) -> Domain {
  match kind {
    DateField::Date => window.date_domain(field),
    DateField::DateTime => window.datetime_domain(field),
  }
}

fn lines_of(model: &'static str, fields: &'static [&'static str], ids: &[i64]) -> Option<DetailQuery> {
  (!ids.is_empty()).then(|| DetailQuery {
    model,
    fields,
    ids: ids.to_vec(),
  })
}

// ============================================================================
// Dated entities
// ============================================================================

/// Closed point-of-sale orders and their lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosOrders;

impl DatedEntity for PosOrders {
  type ApiHeader = ApiPosOrder;
  type Header = PosOrder;
  type ApiDetail = ApiPosOrderLine;
  type Detail = PosOrderLine;

  const NAMESPACE: &'static str = "get_pos_orders";
  const MODEL: &'static str = "pos.order";
  const DATE_FIELD: &'static str = "date_order";
  const DATE_KIND: DateField = DateField::DateTime;
  const FIELDS: &'static [&'static str] = &["date_order", "partner_id", "amount_total", "state", "lines"];

  fn filter(&self, window: &DateWindow) -> Domain {
    date_filter(Self::DATE_FIELD, Self::DATE_KIND, window).and_also(Domain::term(
      "state",
      Operator::In,
      vec!["done", "paid", "invoiced"],
    ))
  }

  fn header(api: ApiPosOrder) -> PosOrder {
    api.into()
  }

  fn detail_query(header: &PosOrder) -> Option<DetailQuery> {
    lines_of(
      "pos.order.line",
      &["product_id", "price_subtotal_incl", "qty", "discount"],
      &header.lines,
    )
  }

  fn detail(api: ApiPosOrderLine, header: &PosOrder) -> PosOrderLine {
    api.into_line(header)
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseOrders;

impl DatedEntity for PurchaseOrders {
  type ApiHeader = ApiPurchaseOrder;
  type Header = PurchaseOrder;
  type ApiDetail = ApiPurchaseOrderLine;
  type Detail = PurchaseOrderLine;

  const NAMESPACE: &'static str = "get_purchase_orders";
  const MODEL: &'static str = "purchase.order";
  const DATE_FIELD: &'static str = "date_order";
  const DATE_KIND: DateField = DateField::DateTime;
  const FIELDS: &'static [&'static str] = &[
    "date_order",
    "display_name",
    "partner_id",
    "amount_total",
    "amount_untaxed",
    "invoice_status",
    "state",
    "order_line",
  ];

  fn header(api: ApiPurchaseOrder) -> PurchaseOrder {
    api.into()
  }

  fn detail_query(header: &PurchaseOrder) -> Option<DetailQuery> {
    lines_of(
      "purchase.order.line",
      &[
        "product_id",
        "price_subtotal",
        "price_tax",
        "price_total",
        "price_unit",
        "product_qty",
        "product_uom_qty",
        "qty_invoiced",
        "qty_received",
      ],
      &header.order_line,
    )
  }

  fn detail(api: ApiPurchaseOrderLine, header: &PurchaseOrder) -> PurchaseOrderLine {
    api.into_line(header)
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountInvoices;

impl DatedEntity for AccountInvoices {
  type ApiHeader = ApiAccountInvoice;
  type Header = AccountInvoice;
  type ApiDetail = ApiAccountInvoiceLine;
  type Detail = AccountInvoiceLine;

  const NAMESPACE: &'static str = "get_account_invoices";
  const MODEL: &'static str = "account.invoice";
  const DATE_FIELD: &'static str = "date_invoice";
  const DATE_KIND: DateField = DateField::Date;
  const FIELDS: &'static [&'static str] = &[
    "number",
    "date_invoice",
    "partner_id",
    "type",
    "state",
    "amount_untaxed",
    "amount_tax",
    "amount_total",
    "residual",
    "journal_id",
    "invoice_line_ids",
  ];

  fn header(api: ApiAccountInvoice) -> AccountInvoice {
    api.into()
  }

  fn detail_query(header: &AccountInvoice) -> Option<DetailQuery> {
    lines_of(
      "account.invoice.line",
      &[
        "invoice_id",
        "product_id",
        "account_id",
        "name",
        "quantity",
        "price_unit",
        "discount",
        "price_subtotal",
        "price_total",
      ],
      &header.invoice_line_ids,
    )
  }

  fn detail(api: ApiAccountInvoiceLine, header: &AccountInvoice) -> AccountInvoiceLine {
    api.into_line(header)
  }
}

/// Journal items; they have no detail rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountMoveLines;

impl DatedEntity for AccountMoveLines {
  type ApiHeader = ApiAccountMoveLine;
  type Header = AccountMoveLine;
  type ApiDetail = NoDetail;
  type Detail = NoDetail;

  const NAMESPACE: &'static str = "get_account_move_lines";
  const MODEL: &'static str = "account.move.line";
  const DATE_FIELD: &'static str = "date";
  const DATE_KIND: DateField = DateField::Date;
  const FIELDS: &'static [&'static str] = &[
    "date",
    "move_id",
    "journal_id",
    "account_id",
    "partner_id",
    "name",
    "debit",
    "credit",
    "balance",
  ];

  fn header(api: ApiAccountMoveLine) -> AccountMoveLine {
    api.into()
  }

  fn detail_query(_header: &AccountMoveLine) -> Option<DetailQuery> {
    None
  }

  fn detail(api: NoDetail, _header: &AccountMoveLine) -> NoDetail {
    match api {}
  }
}

/// Stock moves of the inventory-loss operation type into the loss location.
#[derive(Debug, Clone, Copy)]
pub struct ProductLosses {
  pub picking_type_id: i64,
  pub location_dest_id: i64,
}

impl Default for ProductLosses {
  fn default() -> Self {
    Self {
      picking_type_id: 14,
      location_dest_id: 5,
    }
  }
}

impl DatedEntity for ProductLosses {
  type ApiHeader = ApiStockMove;
  type Header = ProductLoss;
  type ApiDetail = NoDetail;
  type Detail = NoDetail;

  const NAMESPACE: &'static str = "get_product_losses";
  const MODEL: &'static str = "stock.move";
  const DATE_FIELD: &'static str = "date_expected";
  const DATE_KIND: DateField = DateField::DateTime;
  const FIELDS: &'static [&'static str] = &[
    "date_expected",
    "name",
    "location_id",
    "product_id",
    "product_qty",
    "price_unit",
  ];

  fn filter(&self, window: &DateWindow) -> Domain {
    Domain::and([
      Domain::eq("picking_type_id", self.picking_type_id),
      Domain::eq("location_dest_id", self.location_dest_id),
      date_filter(Self::DATE_FIELD, Self::DATE_KIND, window),
    ])
  }

  fn key_scope(&self) -> Option<String> {
    Some(format!("type={},dest={}", self.picking_type_id, self.location_dest_id))
  }

  fn header(api: ApiStockMove) -> ProductLoss {
    api.into()
  }

  fn detail_query(_header: &ProductLoss) -> Option<DetailQuery> {
    None
  }

  fn detail(api: NoDetail, _header: &ProductLoss) -> NoDetail {
    match api {}
  }
}

// ============================================================================
// Master data
// ============================================================================

/// Every product variant, archived ones included.
#[derive(Debug, Clone, Copy, Default)]
pub struct Products;

impl MasterEntity for Products {
  type Api = ApiProduct;
  type Record = Product;

  const NAMESPACE: &'static str = "get_all_products";
  const MODEL: &'static str = "product.product";
  const FIELDS: &'static [&'static str] = &[
    "name",
    "rack_location",
    "create_date",
    "theoritical_price",
    "active",
    "sale_ok",
    "categ_id",
    "product_tmpl_id",
    "label_ids",
    "barcode",
    "default_code",
  ];

  fn filter(&self) -> Domain {
    Domain::or([Domain::eq("active", true), Domain::eq("active", false)])
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Members;

impl MasterEntity for Members {
  type Api = ApiMember;
  type Record = Member;

  const NAMESPACE: &'static str = "get_all_members";
  const MODEL: &'static str = "res.partner";
  const FIELDS: &'static [&'static str] = &[
    "name",
    "city",
    "street",
    "street2",
    "gender",
    "age",
    "is_squadleader",
    "shift_type",
    "is_exempted",
    "working_state",
    "is_unsubscribed",
    "is_worker_member",
    "customer",
    "supplier",
    "cooperative_state",
    "create_date",
  ];

  fn filter(&self) -> Domain {
    Domain::eq("is_member", true)
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Suppliers;

impl MasterEntity for Suppliers {
  type Api = ApiSupplier;
  type Record = Supplier;

  const NAMESPACE: &'static str = "get_all_suppliers";
  const MODEL: &'static str = "res.partner";
  const FIELDS: &'static [&'static str] = &["name", "ref", "email", "phone", "city", "zip", "create_date"];

  fn filter(&self) -> Domain {
    Domain::eq("supplier", true)
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Categories;

impl MasterEntity for Categories {
  type Api = ApiCategory;
  type Record = Category;

  const NAMESPACE: &'static str = "get_all_categories";
  const MODEL: &'static str = "product.category";
  const FIELDS: &'static [&'static str] = &["display_name", "parent_id"];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Labels;

impl MasterEntity for Labels {
  type Api = ApiLabel;
  type Record = Label;

  const NAMESPACE: &'static str = "get_all_labels";
  const MODEL: &'static str = "product.label";
  const FIELDS: &'static [&'static str] = &["code", "name"];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaxRates;

impl MasterEntity for TaxRates {
  type Api = ApiTax;
  type Record = TaxRate;

  const NAMESPACE: &'static str = "get_all_taxes";
  const MODEL: &'static str = "account.tax";
  const FIELDS: &'static [&'static str] = &["name", "amount", "amount_type", "type_tax_use"];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Accounts;

impl MasterEntity for Accounts {
  type Api = ApiAccount;
  type Record = Account;

  const NAMESPACE: &'static str = "get_all_accounts";
  const MODEL: &'static str = "account.account";
  const FIELDS: &'static [&'static str] = &["code", "name", "user_type_id"];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Locations;

impl MasterEntity for Locations {
  type Api = ApiLocation;
  type Record = Location;

  const NAMESPACE: &'static str = "get_all_locations";
  const MODEL: &'static str = "stock.location";
  const FIELDS: &'static [&'static str] = &["name", "comment"];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Uoms;

impl MasterEntity for Uoms {
  type Api = ApiUom;
  type Record = Uom;

  const NAMESPACE: &'static str = "get_all_uoms";
  const MODEL: &'static str = "uom.uom";
  const FIELDS: &'static [&'static str] = &["name", "category_id", "factor", "uom_type"];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Journals;

impl MasterEntity for Journals {
  type Api = ApiJournal;
  type Record = Journal;

  const NAMESPACE: &'static str = "get_all_journals";
  const MODEL: &'static str = "account.journal";
  const FIELDS: &'static [&'static str] = &["code", "name"];
}
