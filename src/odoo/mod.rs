//! Access to an Odoo ERP: transports, normalization and the cached client.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod connection;
pub mod dates;
pub mod domain;
pub mod entities;
pub mod normalize;
pub mod rack;
pub mod rpc;
pub mod transport;
pub mod types;

pub use cached_client::CachedOdooClient;
pub use client::OdooClient;
pub use connection::Connection;
pub use dates::{DateBound, DateWindow};
pub use domain::{Domain, Operator};
pub use normalize::{Many2One, Record};
pub use rack::RackCode;
pub use transport::{Credentials, JsonRpcTransport, RemoteCall, Transport, WebSessionTransport};
