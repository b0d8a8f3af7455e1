//! ABC inventory classification and price optimization over sales CSVs.
//!
//! The loader turns a sales export into a typed [`types::SalesTable`]. The
//! report path classifies products by cumulative revenue share, derives the
//! quantity and margin at each product's lowest and highest unit price, and
//! joins both into the combined detail sheet. The optimizer path fits a
//! demand curve for one product and grid-searches the most profitable price.

pub mod charts;
pub mod config;
pub mod error;
pub mod loader;
pub mod optimizer;
pub mod output;
pub mod regression;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{ReportError, Result};
