// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission storage.
//!
//! Two backends sit behind [`SubmissionStore`]: InfluxDB 1.x over its HTTP
//! API, and a process-local store for tests and local runs.

pub mod influx;
pub mod memory;

use crate::config::{StoreBackend, StoreConfig};
use crate::validator::ValidatedFields;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

pub use influx::InfluxStore;
pub use memory::MemoryStore;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid store URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Store query failed: {0}")]
    Query(String),
}

/// One accepted survey entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub ip: IpAddr,
    pub received_at: DateTime<Utc>,
}

impl Submission {
    /// Stamp validated fields with the client address and the current time.
    pub fn new(fields: ValidatedFields, ip: IpAddr) -> Self {
        Self {
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            latitude: fields.latitude,
            longitude: fields.longitude,
            accuracy: fields.accuracy,
            ip,
            received_at: Utc::now(),
        }
    }
}

/// Backend-agnostic submission store.
#[derive(Debug, Clone)]
pub enum SubmissionStore {
    Influx(InfluxStore),
    Memory(MemoryStore),
}

impl SubmissionStore {
    /// Build the store selected by configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.backend {
            StoreBackend::Influx => Ok(Self::Influx(InfluxStore::new(config)?)),
            StoreBackend::Memory => Ok(Self::Memory(MemoryStore::new())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Influx(_) => "influx",
            Self::Memory(_) => "memory",
        }
    }

    /// Whether `email` already has an entry newer than `window`.
    pub async fn has_recent_entry(&self, email: &str, window: Duration) -> Result<bool, StoreError> {
        match self {
            Self::Influx(store) => store.has_recent_entry(email, window).await,
            Self::Memory(store) => Ok(store.has_recent_entry(email, window).await),
        }
    }

    /// Drop entries that can no longer match a duplicate check.
    ///
    /// InfluxDB expiry is left to the database's retention policy.
    pub async fn cleanup(&self, window: Duration) -> usize {
        match self {
            Self::Influx(_) => 0,
            Self::Memory(store) => store.cleanup(window).await,
        }
    }

    /// Persist one submission.
    pub async fn write(&self, submission: &Submission) -> Result<(), StoreError> {
        match self {
            Self::Influx(store) => store.write(submission).await,
            Self::Memory(store) => {
                store.write(submission.clone()).await;
                Ok(())
            }
        }
    }
}
