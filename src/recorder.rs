// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission recorder.
//!
//! Enforces one entry per e-mail per dedup window, then persists the entry.
//! The check and the write are two separate store calls; concurrent
//! submissions for the same address may both pass the check.

use crate::store::{StoreError, Submission, SubmissionStore};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Recorder error types.
///
/// The display text is shown to the visitor; store details stay in the source.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Please limit yourself to one entry per day")]
    Duplicate,

    #[error("There was an error determining your e-mail eligibility")]
    Eligibility(#[source] StoreError),

    #[error("Cannot write to database")]
    Write(#[source] StoreError),
}

/// Dedup-then-write front for a [`SubmissionStore`].
#[derive(Debug, Clone)]
pub struct SubmissionRecorder {
    store: SubmissionStore,
    window: Duration,
}

impl SubmissionRecorder {
    pub fn new(store: SubmissionStore, window: Duration) -> Self {
        Self { store, window }
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    /// Prune stored entries older than the dedup window.
    pub async fn cleanup(&self) {
        let removed = self.store.cleanup(self.window).await;
        if removed > 0 {
            debug!(removed, backend = self.store.backend_name(), "Pruned stale submissions");
        }
    }

    /// Record a submission unless its e-mail was seen inside the window.
    pub async fn record(&self, submission: &Submission) -> Result<(), RecordError> {
        let seen = self
            .store
            .has_recent_entry(&submission.email, self.window)
            .await
            .map_err(|err| {
                warn!(email = %submission.email, error = %err, "Duplicate check failed");
                RecordError::Eligibility(err)
            })?;

        if seen {
            debug!(email = %submission.email, window_secs = self.window.as_secs(), "Duplicate submission");
            return Err(RecordError::Duplicate);
        }

        self.store.write(submission).await.map_err(|err| {
            warn!(email = %submission.email, error = %err, "Submission write failed");
            RecordError::Write(err)
        })?;

        info!(
            email = %submission.email,
            ip = %submission.ip,
            backend = self.store.backend_name(),
            "Submission recorded"
        );
        Ok(())
    }
}
