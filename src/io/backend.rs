//! HTTPS client for the backend API
//!
//! Three calls: activate (unauthenticated, one-time), heartbeat and scan
//! (both carrying the API key in the `x-api-key` header). Only HTTP 200
//! counts as success; any other status is a rejection and retried the same
//! way as a transport failure.

use crate::domain::RfidEvent;
use crate::infra::Identity;
use crate::io::sysinfo::{self, SystemInfo};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend rejected request: http {0}")]
    Rejected(u16),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Registration payload: best-effort system info plus the current time
#[derive(Debug, Serialize)]
pub struct ActivationRequest {
    #[serde(flatten)]
    pub system: SystemInfo,
    pub timestamp: u64,
}

impl ActivationRequest {
    pub fn gather() -> Self {
        Self { system: sysinfo::collect(), timestamp: crate::domain::unix_now() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanRequest<'a> {
    detected_tags: &'a [RfidEvent],
}

/// Backend operations the runtime loops depend on. Trait-shaped so loop
/// logic is testable against scripted implementations.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn activate(&self, request: &ActivationRequest) -> Result<(), BackendError>;
    async fn heartbeat(&self) -> Result<(), BackendError>;
    async fn post_events(&self, events: &[RfidEvent]) -> Result<(), BackendError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    identity: Arc<Identity>,
}

impl HttpBackend {
    pub fn new(identity: Arc<Identity>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, identity })
    }

    fn check(response: reqwest::Response) -> Result<(), BackendError> {
        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(BackendError::Rejected(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn activate(&self, request: &ActivationRequest) -> Result<(), BackendError> {
        let config = self.identity.current();
        let url = format!(
            "{}/rfid/device/{}/activate",
            config.base_url(),
            config.device_serial
        );
        let response = self.client.post(&url).json(request).send().await?;
        Self::check(response)
    }

    async fn heartbeat(&self) -> Result<(), BackendError> {
        let config = self.identity.current();
        let url = format!("{}/rfid/heartbeat", config.base_url());
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &config.api_key)
            .send()
            .await?;
        Self::check(response)
    }

    async fn post_events(&self, events: &[RfidEvent]) -> Result<(), BackendError> {
        let config = self.identity.current();
        let url = format!("{}/rfid/scan", config.base_url());
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &config.api_key)
            .json(&ScanRequest { detected_tags: events })
            .send()
            .await?;
        Self::check(response)
    }
}
