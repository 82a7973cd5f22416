//! Maintenance report assembly.
//!
//! Joins a sealed session with the job it belongs to and derives the zone
//! and confidence labels exactly once. The report is what gets handed to
//! the persistence/sharing collaborator.

use crate::core::classifier::{
    ConfidenceEstimator, ConfidenceLabel, ZoneClassifier, ZoneLabel, ZoneRules,
};
use crate::core::session::{SampleCounts, SealedSession};
use crate::core::trajectory::{TrajectoryPoint, TrajectoryStats};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "shaftsense-agent";

/// Fault code used when the job doesn't specify one.
pub const DEFAULT_FAULT_CODE: &str = "0021";

/// Errors from report serialization and storage.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The job a session was recorded for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceJob {
    pub elevator_id: String,
    pub floor: String,
    pub fault_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
}

impl MaintenanceJob {
    pub fn new(elevator_id: impl Into<String>, floor: impl Into<String>) -> Self {
        Self {
            elevator_id: elevator_id.into(),
            floor: floor.into(),
            fault_code: DEFAULT_FAULT_CODE.to_string(),
            technician: None,
        }
    }

    pub fn with_fault_code(mut self, fault_code: impl Into<String>) -> Self {
        self.fault_code = fault_code.into();
        self
    }

    pub fn with_technician(mut self, technician: impl Into<String>) -> Self {
        self.technician = Some(technician.into());
        self
    }
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
    pub device: String,
}

/// A sealed, classified maintenance session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub report_version: String,
    pub report_id: String,
    pub session_id: String,
    pub producer: ReportProducer,
    pub elevator_id: String,
    pub floor: String,
    pub fault_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_time_secs: u64,
    pub stationary_time_secs: u64,
    pub inferred_zone: ZoneLabel,
    pub confidence: ConfidenceLabel,
    pub sample_count: usize,
    pub filter_threshold: f64,
    pub counts: SampleCounts,
    pub stats: TrajectoryStats,
    pub trajectory: Vec<TrajectoryPoint>,
}

impl MaintenanceReport {
    /// Share text for the report, with the date rendered in `tz`.
    pub fn summary(&self, tz: Tz) -> String {
        const RULE: &str = "━━━━━━━━━━━━━━━━━";
        format!(
            "Maintenance Report\n\
             {RULE}\n\
             Elevator: {}\n\
             Floor: {}\n\
             Fault Code: {}\n\
             Total Time: {}\n\
             Stationary Time: {}\n\
             Movement Samples: {}\n\
             Inferred Zone: {}\n\
             Confidence: {}\n\
             Technician: {}\n\
             Date: {}\n\
             {RULE}",
            self.elevator_id,
            self.floor,
            self.fault_code,
            format_duration(self.total_time_secs),
            format_duration(self.stationary_time_secs),
            self.sample_count,
            self.inferred_zone,
            self.confidence,
            self.technician.as_deref().unwrap_or("-"),
            self.end_time.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z"),
        )
    }
}

/// Render whole seconds as `Xm Ys`.
pub fn format_duration(total_seconds: u64) -> String {
    format!("{}m {}s", total_seconds / 60, total_seconds % 60)
}

fn datetime_from_ms(ms: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms as i64)
        .single()
        .unwrap_or_default()
}

/// Builder for maintenance reports.
pub struct ReportBuilder {
    instance_id: Uuid,
    device: String,
    classifier: ZoneClassifier,
    estimator: ConfidenceEstimator,
}

impl ReportBuilder {
    /// Create a builder with canonical rules and a unique instance ID.
    pub fn new() -> Self {
        let device = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            instance_id: Uuid::new_v4(),
            device,
            classifier: ZoneClassifier::default(),
            estimator: ConfidenceEstimator::default(),
        }
    }

    pub fn with_rules(mut self, rules: ZoneRules) -> Self {
        self.classifier = ZoneClassifier::new(rules);
        self
    }

    pub fn with_confidence(mut self, estimator: ConfidenceEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a report from a sealed session.
    pub fn build(&self, job: &MaintenanceJob, sealed: &SealedSession) -> MaintenanceReport {
        let inferred_zone = sealed.classify(&self.classifier);
        let confidence = sealed.confidence(&self.estimator);

        MaintenanceReport {
            report_version: REPORT_VERSION.to_string(),
            report_id: format!("r_{}", Uuid::new_v4().simple()),
            session_id: sealed.session_id.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: self.instance_id.to_string(),
                device: self.device.clone(),
            },
            elevator_id: job.elevator_id.clone(),
            floor: job.floor.clone(),
            fault_code: job.fault_code.clone(),
            technician: job.technician.clone(),
            start_time: datetime_from_ms(sealed.started_at_ms),
            end_time: datetime_from_ms(sealed.ended_at_ms),
            total_time_secs: sealed.duration_seconds,
            stationary_time_secs: sealed.stationary_seconds(),
            inferred_zone,
            confidence,
            sample_count: sealed.sample_count(),
            filter_threshold: sealed.filter_threshold,
            counts: sealed.counts,
            stats: sealed.stats(),
            trajectory: sealed.trajectory.clone(),
        }
    }

    /// Build and serialize a report to JSON.
    pub fn build_json(
        &self,
        job: &MaintenanceJob,
        sealed: &SealedSession,
    ) -> Result<String, ReportError> {
        let report = self.build(job, sealed);
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Output format for combined exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Jsonl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "jsonl" => Ok(ExportFormat::Jsonl),
            other => Err(format!("unknown export format '{other}' (expected json or jsonl)")),
        }
    }
}

/// Write one report to `dir` as `report_<session start>_<elevator>_<report id>.json`.
///
/// Existing files are never replaced; a name collision is an `AlreadyExists` error.
pub fn write_report(dir: &Path, report: &MaintenanceReport) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)?;

    let elevator: String = report
        .elevator_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let path = dir.join(format!(
        "report_{}_{}_{}.json",
        report.start_time.format("%Y%m%d_%H%M%S"),
        elevator,
        report.report_id
    ));

    let json = serde_json::to_string_pretty(report)?;
    let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    file.write_all(json.as_bytes())?;
    Ok(path)
}

/// Read one report file.
pub fn read_report(path: &Path) -> Result<MaintenanceReport, ReportError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read every `report_*.json` file in `dir`, oldest first.
///
/// Files that don't parse as reports are skipped.
pub fn read_reports(dir: &Path) -> Result<Vec<MaintenanceReport>, ReportError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().map(|e| e == "json").unwrap_or(false)
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("report_"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut reports = Vec::new();
    for path in paths {
        match read_report(&path) {
            Ok(report) => reports.push(report),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable report"),
        }
    }
    reports.sort_by_key(|r| r.start_time);
    Ok(reports)
}

/// Write a combined export of `reports` to `path`.
pub fn write_combined(
    path: &Path,
    reports: &[MaintenanceReport],
    format: ExportFormat,
) -> Result<(), ReportError> {
    let content = match format {
        ExportFormat::Json => serde_json::to_string_pretty(reports)?,
        ExportFormat::Jsonl => {
            let lines = reports
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            lines.join("\n")
        }
    };
    std::fs::write(path, content)?;
    Ok(())
}
