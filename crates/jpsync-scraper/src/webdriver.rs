//! Minimal W3C WebDriver client used for vendors whose pages only render
//! after client-side scripts run.
//!
//! Speaks the plain HTTP protocol to a running driver (chromedriver,
//! geckodriver or a Selenium grid) at `WEBDRIVER_URL`. One session is
//! opened per vendor run and closed by [`WebDriverSession::close`]; `Drop`
//! schedules the delete if a caller forgot.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::VendorError;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: Option<String>,
    render_wait: Duration,
}

impl WebDriverSession {
    /// Opens a headless Chrome session.
    ///
    /// # Errors
    ///
    /// [`VendorError::Browser`] when the driver refuses the session, or
    /// [`VendorError::Http`] when it is unreachable.
    pub async fn start(
        base_url: &str,
        user_agent: &str,
        timeout: Duration,
        render_wait: Duration,
    ) -> Result<Self, VendorError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_owned();
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": [
                            "--headless=new",
                            "--disable-gpu",
                            "--no-sandbox",
                            "--lang=ja-JP",
                            format!("--user-agent={user_agent}"),
                        ]
                    }
                }
            }
        });

        let response = client
            .post(format!("{base_url}/session"))
            .json(&capabilities)
            .send()
            .await?;
        let body: Envelope<NewSession> = decode(response, "new session").await?;
        tracing::info!(session_id = %body.value.session_id, "webdriver session opened");

        Ok(Self {
            client,
            base_url,
            session_id: Some(body.value.session_id),
            render_wait,
        })
    }

    fn session_url(&self, suffix: &str) -> Result<String, VendorError> {
        let id = self.session_id.as_deref().ok_or_else(|| VendorError::Browser {
            reason: "session already closed".to_owned(),
        })?;
        Ok(format!("{}/session/{id}{suffix}", self.base_url))
    }

    /// Navigates to `url`, waits for scripts to settle, and returns the
    /// rendered DOM as HTML.
    ///
    /// # Errors
    ///
    /// [`VendorError::Browser`] on driver-reported failures (navigation
    /// timeout, crashed tab).
    pub async fn page_source(&self, url: &str) -> Result<String, VendorError> {
        let response = self
            .client
            .post(self.session_url("/url")?)
            .json(&json!({ "url": url }))
            .send()
            .await?;
        let _: Envelope<Value> = decode(response, "navigate").await?;

        if !self.render_wait.is_zero() {
            tokio::time::sleep(self.render_wait).await;
        }

        let response = self.client.get(self.session_url("/source")?).send().await?;
        let body: Envelope<String> = decode(response, "page source").await?;
        Ok(body.value)
    }

    /// Deletes the session. Safe to call more than once.
    pub async fn close(&mut self) {
        let Some(id) = self.session_id.take() else {
            return;
        };
        let url = format!("{}/session/{id}", self.base_url);
        match self.client.delete(&url).send().await {
            Ok(_) => tracing::info!(session_id = %id, "webdriver session closed"),
            Err(e) => tracing::warn!(session_id = %id, error = %e, "webdriver session close failed"),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session_id.is_some()
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        let Some(id) = self.session_id.take() else {
            return;
        };
        let url = format!("{}/session/{id}", self.base_url);
        let client = self.client.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = client.delete(&url).send().await;
            });
        } else {
            tracing::warn!(session_id = %id, "webdriver session leaked: no runtime to close it");
        }
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    action: &str,
) -> Result<T, VendorError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| {
                v.pointer("/value/message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or(text);
        return Err(VendorError::Browser {
            reason: format!("{action} failed with HTTP {}: {message}", status.as_u16()),
        });
    }
    serde_json::from_str(&text).map_err(|source| VendorError::Deserialize {
        context: format!("webdriver {action}"),
        source,
    })
}
