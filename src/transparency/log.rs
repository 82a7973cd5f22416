//! Transparency log.
//!
//! Counts what the agent processed so a technician can see what was
//! recorded. Only aggregate counts are kept; no sample values or positions.

use crate::core::session::SampleCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Processing statistics for the agent.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Samples offered to a session
    samples_received: AtomicU64,
    /// Samples that passed the movement filter
    samples_accepted: AtomicU64,
    /// Samples filtered out as stationary
    samples_stationary: AtomicU64,
    /// Non-finite or out-of-order samples
    samples_rejected: AtomicU64,
    /// Timer heartbeats
    ticks: AtomicU64,
    /// Sessions stopped and sealed
    sessions_sealed: AtomicU64,
    /// Reports written to disk
    reports_exported: AtomicU64,
    /// Log start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            samples_received: AtomicU64::new(0),
            samples_accepted: AtomicU64::new(0),
            samples_stationary: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            sessions_sealed: AtomicU64::new(0),
            reports_exported: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads from and saves to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!(error = %e, "could not load previous transparency stats");
        }

        log
    }

    /// Record rejected input lines that never reached a session.
    pub fn record_samples_rejected(&self, count: u64) {
        self.samples_rejected.fetch_add(count, Ordering::Relaxed);
    }

    /// Fold the final counters of a sealed session into the log.
    pub fn record_session_sealed(&self, counts: &SampleCounts, ticks: u64) {
        self.samples_received
            .fetch_add(counts.received, Ordering::Relaxed);
        self.samples_accepted
            .fetch_add(counts.accepted, Ordering::Relaxed);
        self.samples_stationary
            .fetch_add(counts.stationary, Ordering::Relaxed);
        self.samples_rejected.fetch_add(
            counts.invalid + counts.out_of_order,
            Ordering::Relaxed,
        );
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
        self.sessions_sealed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report_exported(&self) {
        self.reports_exported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            samples_stationary: self.samples_stationary.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            sessions_sealed: self.sessions_sealed.load(Ordering::Relaxed),
            reports_exported: self.reports_exported.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Processing Statistics:\n\
             - Samples received: {}\n\
             - Samples accepted as movement: {}\n\
             - Samples filtered as stationary: {}\n\
             - Samples rejected: {}\n\
             - Timer ticks: {}\n\
             - Sessions sealed: {}\n\
             - Reports exported: {}\n\
             - Log age: {} seconds\n\
             \n\
             Data Retained:\n\
             - Relative trajectory only, no absolute location\n\
             - Reports stay on this device until shared",
            stats.samples_received,
            stats.samples_accepted,
            stats.samples_stationary,
            stats.samples_rejected,
            stats.ticks,
            stats.sessions_sealed,
            stats.reports_exported,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                samples_received: stats.samples_received,
                samples_accepted: stats.samples_accepted,
                samples_stationary: stats.samples_stationary,
                samples_rejected: stats.samples_rejected,
                ticks: stats.ticks,
                sessions_sealed: stats.sessions_sealed,
                reports_exported: stats.reports_exported,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content)
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

                self.samples_received
                    .store(persisted.samples_received, Ordering::Relaxed);
                self.samples_accepted
                    .store(persisted.samples_accepted, Ordering::Relaxed);
                self.samples_stationary
                    .store(persisted.samples_stationary, Ordering::Relaxed);
                self.samples_rejected
                    .store(persisted.samples_rejected, Ordering::Relaxed);
                self.ticks.store(persisted.ticks, Ordering::Relaxed);
                self.sessions_sealed
                    .store(persisted.sessions_sealed, Ordering::Relaxed);
                self.reports_exported
                    .store(persisted.reports_exported, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.samples_received.store(0, Ordering::Relaxed);
        self.samples_accepted.store(0, Ordering::Relaxed);
        self.samples_stationary.store(0, Ordering::Relaxed);
        self.samples_rejected.store(0, Ordering::Relaxed);
        self.ticks.store(0, Ordering::Relaxed);
        self.sessions_sealed.store(0, Ordering::Relaxed);
        self.reports_exported.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub samples_received: u64,
    pub samples_accepted: u64,
    pub samples_stationary: u64,
    pub samples_rejected: u64,
    pub ticks: u64,
    pub sessions_sealed: u64,
    pub reports_exported: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_received: u64,
    samples_accepted: u64,
    samples_stationary: u64,
    samples_rejected: u64,
    ticks: u64,
    sessions_sealed: u64,
    reports_exported: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
