//! Prometheus reload signal
//!
//! The reload is fire-and-forget: the request runs on a detached thread, its
//! outcome is only logged, and the reconciliation loop never waits for it.

use crate::error::CycleError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Notifies the dependent service that the published configuration changed.
pub trait ReloadSignal {
    /// Start a reload. An `Err` means the reload could not even be initiated.
    fn signal(&self) -> Result<(), CycleError>;
}

/// Build the `/-/reload` endpoint for a Prometheus server.
pub fn reload_url(scheme: &str, hostname: &str, port: u16) -> Result<String> {
    let raw = format!("{scheme}://{hostname}:{port}/-/reload");
    reqwest::Url::parse(&raw).with_context(|| format!("Invalid Prometheus reload URL: {raw}"))?;
    Ok(raw)
}

/// Sends `POST /-/reload` with an empty body.
pub struct HttpReloader {
    url: String,
    client: Client,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl HttpReloader {
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { url, client, in_flight: Mutex::new(None) })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Block until the most recent reload request has finished.
    pub fn wait_idle(&self) {
        let handle = self.in_flight.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("Reload request thread panicked");
            }
        }
    }
}

impl ReloadSignal for HttpReloader {
    fn signal(&self) -> Result<(), CycleError> {
        let client = self.client.clone();
        let url = self.url.clone();

        let handle = thread::Builder::new()
            .name("reload".to_string())
            .spawn(move || match send_reload(&client, &url) {
                Ok(status) => tracing::info!(%url, %status, "Prometheus reload requested"),
                Err(err) => tracing::warn!("{}", err),
            })
            .map_err(|err| CycleError::Signal { url: self.url.clone(), reason: err.to_string() })?;

        // Earlier requests stay detached; only the latest one is tracked.
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = Some(handle);
        }
        Ok(())
    }
}

fn send_reload(client: &Client, url: &str) -> Result<StatusCode, CycleError> {
    let response = client
        .post(url)
        .send()
        .map_err(|err| CycleError::Signal { url: url.to_string(), reason: err.to_string() })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CycleError::Signal {
            url: url.to_string(),
            reason: format!("server answered {status}"),
        });
    }
    Ok(status)
}
