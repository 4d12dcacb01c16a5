//! Keeps a local history of foreign-exchange quotes fetched from showapi.
//!
//! Callers are expected to go through [`Ratekeeper`]: `initialize` once, then
//! `update` on every scheduled run and `find`/`find_latest` to read back.

pub mod conf;
pub mod db;
pub mod error;
pub mod model;
pub mod provider;
mod rates;
pub mod repository;
pub mod service;


pub use conf::Conf;
pub use error::{Error, Result};
pub use model::{Prices, RateQuote};
pub use rates::{Ratekeeper, DEFAULT_CODES};
pub use service::UpdateReport;
