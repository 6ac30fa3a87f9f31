//! In-memory session inbox.
//!
//! Holds every email processed during the session together with its
//! detection and status. Nothing is persisted.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{DetectionError, DetectionService};
use crate::annotate::{annotate, Segment};
use crate::config::ResolvedConfig;
use crate::domain::{batch_key, Detection, Email, Status, StatusThresholds};

/// What to do with a batch when the detection request fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the emails out of the inbox
    #[default]
    Drop,
    /// Add the emails without a detection (rendered unannotated)
    KeepUnannotated,
}

/// Errors from submitting a batch
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Refusing to submit an empty batch")]
    EmptyBatch,

    #[error("Batch {batch_key} is already being processed")]
    AlreadyInFlight { batch_key: String },

    #[error(transparent)]
    Detection(#[from] DetectionError),
}

/// A processed email
#[derive(Debug, Clone, Serialize)]
pub struct InboxEntry {
    /// Session-local identifier
    pub id: Uuid,

    pub email: Email,

    /// `None` when the service had no result for this email
    pub detection: Option<Detection>,

    /// `None` when there is no detection or no final confidence
    pub status: Option<Status>,

    pub processed_at: DateTime<Utc>,
}

impl InboxEntry {
    /// Annotated segments of the body
    pub fn segments(&self) -> Vec<Segment> {
        annotate(&self.email.body, self.detection.as_ref())
    }
}

/// Entry counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub phishing: usize,
    pub flagged: usize,
    pub cleared: usize,
    /// Entries without a status
    pub unscored: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.phishing + self.flagged + self.cleared + self.unscored
    }
}

/// Tracks batches currently being processed
#[derive(Debug, Default)]
pub struct InFlightGuard {
    keys: Mutex<HashSet<String>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if it is already claimed
    ///
    /// The claim is released when the returned ticket is dropped.
    pub fn try_acquire(&self, key: &str) -> Option<InFlightTicket<'_>> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(InFlightTicket {
            guard: self,
            key: key.to_string(),
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Claim on an in-flight batch; releases on drop
#[derive(Debug)]
pub struct InFlightTicket<'a> {
    guard: &'a InFlightGuard,
    key: String,
}

impl Drop for InFlightTicket<'_> {
    fn drop(&mut self) {
        self.guard
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Session inbox
#[derive(Debug)]
pub struct Inbox {
    thresholds: StatusThresholds,
    failure_policy: FailurePolicy,
    entries: Mutex<Vec<InboxEntry>>,
    in_flight: InFlightGuard,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new(StatusThresholds::default(), FailurePolicy::default())
    }
}

impl Inbox {
    pub fn new(thresholds: StatusThresholds, failure_policy: FailurePolicy) -> Self {
        Self {
            thresholds,
            failure_policy,
            entries: Mutex::new(Vec::new()),
            in_flight: InFlightGuard::new(),
        }
    }

    /// Create from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.thresholds, config.failure_policy)
    }

    pub fn thresholds(&self) -> &StatusThresholds {
        &self.thresholds
    }

    /// Submit a batch to `service` and record the results
    ///
    /// Returns the ids of the new entries, in batch order. A batch identical
    /// to one still being processed is rejected rather than sent twice.
    pub async fn submit(
        &self,
        service: &dyn DetectionService,
        emails: Vec<Email>,
    ) -> Result<Vec<Uuid>, InboxError> {
        if emails.is_empty() {
            return Err(InboxError::EmptyBatch);
        }

        let key = batch_key(&emails);
        let _ticket = self
            .in_flight
            .try_acquire(&key)
            .ok_or_else(|| InboxError::AlreadyInFlight {
                batch_key: key.clone(),
            })?;

        info!(
            service = service.name(),
            count = emails.len(),
            "Processing email batch"
        );

        let detections = match service.process_emails(&emails).await {
            Ok(detections) => detections,
            Err(err) => {
                warn!(service = service.name(), error = %err, "Detection request failed");
                if self.failure_policy == FailurePolicy::KeepUnannotated {
                    self.record(emails, Vec::new());
                }
                return Err(err.into());
            }
        };

        let ids = self.record(emails, detections);
        info!(count = ids.len(), "Email batch processed");
        Ok(ids)
    }

    /// Whether a batch with these emails is currently being processed
    pub fn is_in_flight(&self, emails: &[Email]) -> bool {
        self.in_flight.is_in_flight(&batch_key(emails))
    }

    fn record(&self, emails: Vec<Email>, detections: Vec<Option<Detection>>) -> Vec<Uuid> {
        let processed_at = Utc::now();
        let mut detections = detections.into_iter();

        let new_entries: Vec<InboxEntry> = emails
            .into_iter()
            .map(|email| {
                let detection = detections.next().flatten();
                let status = detection
                    .as_ref()
                    .and_then(|d| d.status(&self.thresholds));
                InboxEntry {
                    id: Uuid::new_v4(),
                    email,
                    detection,
                    status,
                    processed_at,
                }
            })
            .collect();

        let ids = new_entries.iter().map(|entry| entry.id).collect();
        self.lock_entries().extend(new_entries);
        ids
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<InboxEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all entries in arrival order
    pub fn entries(&self) -> Vec<InboxEntry> {
        self.lock_entries().clone()
    }

    pub fn get(&self, id: Uuid) -> Option<InboxEntry> {
        self.lock_entries().iter().find(|entry| entry.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Count entries per status
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.lock_entries().iter() {
            match entry.status {
                Some(Status::Phishing) => counts.phishing += 1,
                Some(Status::Flagged) => counts.flagged += 1,
                Some(Status::Cleared) => counts.cleared += 1,
                None => counts.unscored += 1,
            }
        }
        counts
    }

    /// Annotated body of an entry
    pub fn annotate(&self, id: Uuid) -> Option<Vec<Segment>> {
        self.get(id).map(|entry| entry.segments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_ticket_releases_on_drop() {
        let guard = InFlightGuard::new();

        let ticket = guard.try_acquire("batch").unwrap();
        assert!(guard.is_in_flight("batch"));
        assert!(guard.try_acquire("batch").is_none());
        assert!(guard.try_acquire("other").is_some());

        drop(ticket);
        assert!(!guard.is_in_flight("batch"));
        assert!(guard.try_acquire("batch").is_some());
    }

    #[test]
    fn test_status_counts_total() {
        let counts = StatusCounts {
            phishing: 2,
            flagged: 1,
            cleared: 3,
            unscored: 1,
        };
        assert_eq!(counts.total(), 7);
    }

    #[test]
    fn test_failure_policy_serde() {
        let policy: FailurePolicy = serde_yaml::from_str("keep_unannotated").unwrap();
        assert_eq!(policy, FailurePolicy::KeepUnannotated);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Drop);
    }
}
