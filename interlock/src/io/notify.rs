//! Best-effort webhook notification for override events.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::types::FatigueReading;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON body POSTed to the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct OverrideEvent<'a> {
    pub event: &'static str,
    pub action: &'a str,
    pub reason: &'a str,
    pub fatigue: FatigueReading,
    pub timestamp: DateTime<Utc>,
}

impl<'a> OverrideEvent<'a> {
    pub fn new(
        action: &'a str,
        reason: &'a str,
        fatigue: FatigueReading,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event: "override",
            action,
            reason,
            fatigue,
            timestamp,
        }
    }
}

/// POST `event` to `url`, logging instead of failing.
pub fn notify_override(url: Option<&str>, event: &OverrideEvent<'_>) {
    let Some(url) = url else {
        return;
    };
    if let Err(err) = post_event(url, event) {
        warn!(err = %format!("{err:#}"), "override webhook failed");
    }
}

#[instrument(skip_all, fields(url = %url))]
fn post_event(url: &str, event: &OverrideEvent<'_>) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(WEBHOOK_TIMEOUT)
        .build()
        .context("build webhook client")?;
    let response = client
        .post(url)
        .json(event)
        .send()
        .context("send override webhook")?;
    let status = response.status();
    response
        .error_for_status()
        .with_context(|| format!("webhook responded {status}"))?;
    debug!(%status, "override webhook delivered");
    Ok(())
}
