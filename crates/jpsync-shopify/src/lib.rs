pub mod catalog;
pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use catalog::Catalog;
pub use client::{CatalogConfig, ShopifyClient};
pub use error::CatalogError;
pub use retry::MAX_ATTEMPTS;
