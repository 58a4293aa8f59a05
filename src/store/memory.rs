// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Process-local submission store.
//!
//! Meant for tests and local runs: entries live only as long as the process.
//! Entries older than the dedup window can be dropped with
//! [`MemoryStore::cleanup`].

use super::Submission;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<Vec<Submission>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn has_recent_entry(&self, email: &str, window: Duration) -> bool {
        let cutoff = cutoff(window);
        let entries = self.entries.read().await;
        entries.iter().any(|entry| {
            entry.email == email && cutoff.map_or(true, |cutoff| entry.received_at > cutoff)
        })
    }

    pub async fn write(&self, submission: Submission) {
        self.entries.write().await.push(submission);
    }

    /// Drop entries older than `window`. Returns how many were removed.
    pub async fn cleanup(&self, window: Duration) -> usize {
        let Some(cutoff) = cutoff(window) else {
            return 0;
        };

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.received_at > cutoff);
        before - entries.len()
    }

    /// Number of stored submissions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of every stored submission, oldest first.
    pub async fn entries(&self) -> Vec<Submission> {
        self.entries.read().await.clone()
    }
}

fn cutoff(window: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| Utc::now().checked_sub_signed(w))
}
