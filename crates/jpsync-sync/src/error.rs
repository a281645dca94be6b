use jpsync_scraper::VendorError;
use jpsync_shopify::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("a {job} job is already running for {vendor}")]
    AlreadyRunning { job: String, vendor: String },

    #[error("job cancelled")]
    Cancelled,

    #[error("vendor error: {0}")]
    Vendor(#[from] VendorError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("catalog unreachable after {consecutive} consecutive transient failures: {last}")]
    CatalogUnreachable {
        consecutive: u32,
        #[source]
        last: CatalogError,
    },

    #[error("translator setup failed: {0}")]
    Translate(#[from] TranslateError),
}
