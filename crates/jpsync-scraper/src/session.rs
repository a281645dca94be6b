//! Outbound HTTP session towards one vendor site.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use jpsync_core::{AppConfig, Vendor};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::VendorError;
use crate::rate_limit::retry_with_backoff;

/// Knobs for a [`VendorSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// Minimum spacing between two detail-page fetches.
    pub detail_spacing: Duration,
    /// Spacing between listing pages of the same category.
    pub page_spacing: Duration,
}

impl SessionConfig {
    #[must_use]
    pub fn from_app_config(cfg: &AppConfig, vendor: Vendor) -> Self {
        Self {
            timeout: cfg.request_timeout(),
            user_agent: cfg.user_agent.clone(),
            max_retries: cfg.max_retries,
            backoff_base_ms: cfg.retry_backoff_base_ms,
            detail_spacing: vendor.detail_spacing(cfg.detail_delay()),
            page_spacing: Duration::from_millis(300),
        }
    }
}

/// HTTP client with a browser profile, `Accept-Language: ja`, bounded
/// retries and detail-fetch pacing.
pub struct VendorSession {
    client: Client,
    max_retries: u32,
    backoff_base_ms: u64,
    detail_spacing: Duration,
    page_spacing: Duration,
    next_detail_at: Mutex<Option<Instant>>,
}

impl VendorSession {
    /// # Errors
    ///
    /// Returns [`VendorError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(cfg: &SessionConfig) -> Result<Self, VendorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ja,en;q=0.9"));

        let client = Client::builder()
            .timeout(cfg.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&cfg.user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            max_retries: cfg.max_retries,
            backoff_base_ms: cfg.backoff_base_ms,
            detail_spacing: cfg.detail_spacing,
            page_spacing: cfg.page_spacing,
            next_detail_at: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Waits until the detail spacing since the previous detail fetch has
    /// elapsed. Callers invoke this right before each detail request.
    pub async fn pace_detail(&self) {
        let wait = {
            let now = Instant::now();
            let mut slot = self
                .next_detail_at
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let start = match *slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *slot = Some(start + self.detail_spacing);
            start.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Sleeps for the listing-page spacing.
    pub async fn pace_page(&self) {
        if !self.page_spacing.is_zero() {
            tokio::time::sleep(self.page_spacing).await;
        }
    }

    /// GETs `url` and returns the body text, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`VendorError::NotFound`] on 404 (not retried).
    /// - [`VendorError::RateLimited`] on 429 after retries are exhausted.
    /// - [`VendorError::UnexpectedStatus`] for any other non-2xx.
    /// - [`VendorError::Http`] on transport failure.
    pub async fn get_text(&self, url: &str) -> Result<String, VendorError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.get(url).send().await?;
            let response = check_status(response, url)?;
            Ok(response.text().await?)
        })
        .await
    }

    /// GETs `url` and deserializes the JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_text`], plus [`VendorError::Deserialize`].
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, VendorError> {
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            let response = check_status(response, url)?;
            Ok(response.text().await?)
        })
        .await?;
        serde_json::from_str(&body).map_err(|source| VendorError::Deserialize {
            context: url.to_owned(),
            source,
        })
    }

    /// POSTs a GraphQL document and returns its `data` member.
    ///
    /// # Errors
    ///
    /// [`VendorError::GraphQl`] when the response carries `errors` and no
    /// `data`; otherwise the same as [`Self::get_json`].
    pub async fn post_graphql<T: DeserializeOwned>(
        &self,
        url: &str,
        extra_headers: &HeaderMap,
        query: &str,
    ) -> Result<T, VendorError> {
        let payload = serde_json::json!({ "query": query });
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let payload = &payload;
            async move {
                let response = self
                    .client
                    .post(url)
                    .headers(extra_headers.clone())
                    .header(ACCEPT, "application/json")
                    .json(payload)
                    .send()
                    .await?;
                let response = check_status(response, url)?;
                Ok(response.text().await?)
            }
        })
        .await?;

        let envelope: GraphQlEnvelope<T> =
            serde_json::from_str(&body).map_err(|source| VendorError::Deserialize {
                context: url.to_owned(),
                source,
            })?;
        match (envelope.data, envelope.errors) {
            (Some(data), errors) => {
                if let Some(errors) = errors.filter(|e| !e.is_empty()) {
                    tracing::warn!(url, errors = %first_message(&errors), "vendor GraphQL returned partial errors");
                }
                Ok(data)
            }
            (None, errors) => Err(VendorError::GraphQl {
                url: url.to_owned(),
                message: errors
                    .as_deref()
                    .map_or_else(|| "response has no data".to_owned(), first_message),
            }),
        }
    }
}

#[derive(serde::Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    errors: Option<Vec<serde_json::Value>>,
}

fn first_message(errors: &[serde_json::Value]) -> String {
    errors
        .first()
        .and_then(|e| e.get("message"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown error")
        .to_owned()
}

/// Maps a response status to the vendor error taxonomy.
///
/// # Errors
///
/// Returns the matching [`VendorError`] for 404, 429 and other non-2xx statuses.
pub(crate) fn check_status(response: Response, url: &str) -> Result<Response, VendorError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(VendorError::RateLimited {
            domain: response.url().host_str().unwrap_or_default().to_owned(),
            retry_after_secs,
        });
    }
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Err(VendorError::NotFound {
            url: url.to_owned(),
        });
    }
    if !status.is_success() {
        return Err(VendorError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }
    Ok(response)
}
