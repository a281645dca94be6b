use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog rate limited (retry after {retry_after_ms}ms)")]
    RateLimited { retry_after_ms: u64 },

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("catalog GraphQL error in {operation}: {message}")]
    GraphQl { operation: String, message: String },

    #[error("catalog rejected {operation} for {handle}: {message}")]
    UserErrors {
        operation: String,
        handle: String,
        message: String,
    },

    #[error("variant {variant_id} has no inventory item")]
    MissingInventoryItem { variant_id: i64 },

    #[error("no active inventory location found")]
    NoLocation,

    #[error("catalog client configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    /// Transient failures are retried with back-off: 429, 5xx, timeouts and
    /// connection failures. Everything else is permanent for this product.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::RateLimited { .. } => true,
            CatalogError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            CatalogError::UnexpectedStatus { status, .. } => *status >= 500,
            CatalogError::GraphQl { message, .. } => {
                message.to_ascii_uppercase().contains("THROTTLED")
            }
            CatalogError::Deserialize { .. }
            | CatalogError::UserErrors { .. }
            | CatalogError::MissingInventoryItem { .. }
            | CatalogError::NoLocation
            | CatalogError::Config(_) => false,
        }
    }
}
