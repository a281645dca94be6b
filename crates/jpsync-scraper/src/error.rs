use thiserror::Error;

#[derive(Debug, Error)]
pub enum VendorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("vendor GraphQL error from {url}: {message}")]
    GraphQl { url: String, message: String },

    #[error("malformed source for product {source_product_id}: {reason}")]
    MalformedSource {
        source_product_id: String,
        reason: String,
    },

    #[error("unknown category `{category}` for vendor {vendor}")]
    UnknownCategory { vendor: String, category: String },

    #[error("pagination limit reached for category `{category}`: stopped after {max_pages} pages")]
    PaginationLimit { category: String, max_pages: u32 },

    #[error("browser session error: {reason}")]
    Browser { reason: String },
}

impl VendorError {
    /// Transient failures are worth another attempt after a back-off:
    /// 429, 5xx, timeouts and connection failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            VendorError::RateLimited { .. } => true,
            VendorError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            VendorError::UnexpectedStatus { status, .. } => *status >= 500,
            VendorError::Deserialize { .. }
            | VendorError::NotFound { .. }
            | VendorError::GraphQl { .. }
            | VendorError::MalformedSource { .. }
            | VendorError::UnknownCategory { .. }
            | VendorError::PaginationLimit { .. }
            | VendorError::Browser { .. } => false,
        }
    }
}
