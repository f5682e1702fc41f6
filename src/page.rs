//! Page Abstraction
//!
//! A Chrome tab carrying the override script, with just enough API to
//! navigate and observe what page scripts see.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use crate::cdp::Session;
use crate::error::{Error, Result};
use crate::stealth::{probe_expression, SignalReport};

/// A browser page with the signal overrides installed
pub struct Page {
    session: Session,
}

impl Page {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Get the underlying CDP session
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn target_id(&self) -> &str {
        self.session.target_id()
    }

    /// Navigate to a URL and wait for the document to load
    pub async fn goto(&self, url: &str) -> Result<()> {
        let result = self.session.navigate(url).await?;
        if let Some(error) = result.error_text {
            return Err(Error::Navigation(format!("{}: {}", url, error)));
        }
        self.wait_for_load(30_000).await
    }

    /// Poll `document.readyState` until it is "complete"
    pub async fn wait_for_load(&self, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            // Errors here mean the context is mid-navigation; keep polling
            if let Ok(state) = self.evaluate::<String>("document.readyState").await {
                if state == "complete" {
                    return Ok(());
                }
            }

            if Instant::now() > deadline {
                return Err(Error::Timeout(format!(
                    "Document did not finish loading within {}ms",
                    timeout_ms
                )));
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Evaluate JavaScript and deserialize the result
    pub async fn evaluate<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let result = self.session.evaluate(expression).await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::CdpSimple(format!(
                "JavaScript error: {} at {}:{}",
                exception.text, exception.line_number, exception.column_number
            )));
        }

        match result.result.value {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(Error::CdpSimple(format!(
                "No value returned from evaluate ({})",
                result.result.r#type
            ))),
        }
    }

    /// Get page HTML content
    pub async fn content(&self) -> Result<String> {
        self.evaluate("document.documentElement.outerHTML").await
    }

    /// Read the overridden signals as a page script sees them
    pub async fn signals(&self) -> Result<SignalReport> {
        self.evaluate(&probe_expression()).await
    }

    /// Fail unless every observable signal carries its spoofed value
    pub async fn verify_signals(&self) -> Result<SignalReport> {
        let report = self.signals().await?;
        if !report.webgl_available {
            tracing::warn!("No WebGL context in page; WebGL overrides not observed");
        }
        report.verify()?;
        Ok(report)
    }
}
