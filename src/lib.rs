//! Cached, normalizing read access to an Odoo ERP for reporting scripts.
//!
//! [`odoo::CachedOdooClient`] is the entry point: it fetches point-of-sale,
//! purchase, accounting and stock data by date window, plus master data,
//! and memoizes the normalized results in a local SQLite file.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod odoo;

pub use error::{Error, Result};
