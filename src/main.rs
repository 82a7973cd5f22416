//! ShaftSense Agent CLI
//!
//! Motion capture and work-zone inference for elevator field service.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crossbeam_channel::{select, tick};
use shaftsense_agent::{
    collector::{read_readings, Collector, CollectorConfig},
    config::Config,
    core::{
        report::{read_report, read_reports, write_combined, write_report},
        format_duration, replay, start_session, ExportFormat, MaintenanceJob, MonotonicClock,
        ReportBuilder, SessionConfig, SessionError, TrackingMode, TrajectoryStats, ZoneClassifier,
        ZoneRules,
    },
    transparency::create_shared_log_with_persistence,
    TransparencyLog, DATA_DECLARATION, VERSION,
};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shaftsense")]
#[command(author = "ShaftSense")]
#[command(version = VERSION)]
#[command(about = "Motion capture and work-zone inference for elevator maintenance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a live maintenance session from a sample feed
    Track {
        /// JSON Lines sample feed, or `-` for stdin
        #[arg(long, short, default_value = "-")]
        input: String,

        #[command(flatten)]
        job: JobArgs,

        /// Replay recorded gaps between readings instead of reading at full speed
        #[arg(long)]
        realtime: bool,
    },

    /// Run a recorded feed through the engine offline
    Replay {
        /// JSON Lines sample feed
        #[arg(long, short)]
        input: PathBuf,

        #[command(flatten)]
        job: JobArgs,

        /// Zone rule set (defaults to the configured rules)
        #[arg(long, value_enum)]
        rules: Option<RulesArg>,

        /// Directory to write the report to
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Re-derive the zone of a stored report
    Classify {
        /// Report file
        #[arg(long)]
        report: PathBuf,

        /// Zone rule set
        #[arg(long, value_enum, default_value = "gated")]
        rules: RulesArg,
    },

    /// Pause the running session
    Pause,

    /// Resume the running session
    Resume,

    /// Show configuration and cumulative statistics
    Status,

    /// Combine stored reports into one export
    Export {
        /// Output directory for the export
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: ExportFormat,
    },

    /// Show configuration
    Config,
}

/// Job details and engine overrides shared by `track` and `replay`.
#[derive(Args)]
struct JobArgs {
    /// Elevator identifier
    #[arg(long)]
    elevator: String,

    /// Floor the work is done from
    #[arg(long)]
    floor: String,

    /// Fault code (defaults to the configured code)
    #[arg(long)]
    fault_code: Option<String>,

    /// Technician name
    #[arg(long)]
    technician: Option<String>,

    /// Tracking mode (active or passive)
    #[arg(long)]
    mode: Option<TrackingMode>,

    /// Explicit movement threshold, overrides the mode
    #[arg(long)]
    threshold: Option<f64>,
}

impl JobArgs {
    fn session_config(&self, config: &Config) -> SessionConfig {
        let mut session = config.session_config();
        if let Some(mode) = self.mode {
            session.filter_threshold = mode.threshold();
        }
        if let Some(threshold) = self.threshold {
            session.filter_threshold = threshold;
        }
        session
    }

    fn job(&self, config: &Config) -> MaintenanceJob {
        let mut job = MaintenanceJob::new(&self.elevator, &self.floor).with_fault_code(
            self.fault_code
                .clone()
                .unwrap_or_else(|| config.default_fault_code.clone()),
        );
        if let Some(ref technician) = self.technician {
            job = job.with_technician(technician);
        }
        job
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RulesArg {
    /// Ten-point floor with duration gates
    Gated,
    /// Trajectory statistics only
    TrajectoryOnly,
}

impl RulesArg {
    fn rules(self) -> ZoneRules {
        match self {
            RulesArg::Gated => ZoneRules::duration_gated(),
            RulesArg::TrajectoryOnly => ZoneRules::trajectory_only(),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Track {
            input,
            job,
            realtime,
        } => cmd_track(&input, &job, realtime),
        Commands::Replay {
            input,
            job,
            rules,
            output,
        } => cmd_replay(&input, &job, rules, output),
        Commands::Classify { report, rules } => cmd_classify(&report, rules),
        Commands::Pause => cmd_set_paused(true),
        Commands::Resume => cmd_set_paused(false),
        Commands::Status => cmd_status(),
        Commands::Export { output, format } => cmd_export(output, format),
        Commands::Config => cmd_config(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| format!("failed to load {}", Config::config_path().display()))
}

fn open_feed(input: &str) -> Result<Box<dyn BufRead + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("failed to open feed {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn cmd_track(input: &str, job_args: &JobArgs, realtime: bool) -> Result<()> {
    println!("ShaftSense Agent v{VERSION}");
    println!();

    let config = load_config()?;
    if let Err(e) = config.ensure_directories() {
        tracing::warn!(error = %e, "could not create directories");
    }
    let tz = config.tz()?;
    let session_config = job_args.session_config(&config);
    let job = job_args.job(&config);

    println!("Starting tracking...");
    println!("  Elevator: {}", job.elevator_id);
    println!("  Floor: {}", job.floor);
    println!("  Movement threshold: {}", session_config.filter_threshold);
    println!("  Tick interval: {}ms", session_config.tick_interval_ms);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let transparency_log =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));

    let mut collector = Collector::new(CollectorConfig {
        realtime,
        nominal_interval: config.sample_interval,
        ..CollectorConfig::default()
    });

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl+C handler")?;

    let mut session = start_session(session_config, MonotonicClock::shared())?;
    println!("Session ID: {}", session.id());

    // `shaftsense pause/resume` edits the config file; a running session polls it.
    if config.paused {
        session.pause();
        println!("Tracking is currently paused.");
        println!("Run `shaftsense resume` to continue.");
        println!();
    }

    collector.start(open_feed(input)?)?;

    let samples = collector.receiver().clone();
    let heartbeat = tick(Duration::from_millis(u64::from(session_config.tick_interval_ms)));
    let config_poll = tick(Duration::from_secs(1));

    while running.load(Ordering::SeqCst) {
        select! {
            recv(samples) -> msg => match msg {
                Ok(timed) => match session.push_sample(timed.sample, timed.timestamp_ms) {
                    Ok(_) => {}
                    // Samples arriving while paused are dropped.
                    Err(SessionError::SessionNotRunning { .. }) => {}
                    Err(e) => tracing::warn!(error = %e, "sample rejected"),
                },
                Err(_) => {
                    tracing::info!("sample feed ended");
                    break;
                }
            },
            recv(heartbeat) -> _ => {
                if let Ok(secs) = session.tick() {
                    if secs > 0 && secs % 10 == 0 {
                        println!(
                            "[{}] {} elapsed, {} movement samples, {:?}",
                            Local::now().format("%H:%M:%S"),
                            format_duration(secs),
                            session.trajectory().len(),
                            session.movement_state()
                        );
                    }
                }
            },
            recv(config_poll) -> _ => {
                if let Ok(cfg) = Config::load() {
                    if cfg.paused && session.pause() {
                        println!();
                        println!("Pausing tracking...");
                    } else if !cfg.paused && session.resume() {
                        println!();
                        println!("Resuming tracking...");
                    }
                }
            },
        }
    }

    println!();
    println!("Stopping tracking...");
    collector.stop();

    let sealed = session.stop();
    transparency_log.record_session_sealed(&sealed.counts, sealed.ticks);
    transparency_log.record_samples_rejected(collector.malformed_lines());

    let builder = ReportBuilder::new()
        .with_rules(config.zone_rules.clone())
        .with_confidence(config.confidence);
    let report = builder.build(&job, &sealed);

    println!();
    println!("{}", report.summary(tz));

    match write_report(&config.export_path, &report) {
        Ok(path) => {
            println!("Exported report to {path:?}");
            transparency_log.record_report_exported();
        }
        Err(e) => eprintln!("Error writing report: {e}"),
    }

    if let Err(e) = transparency_log.save() {
        tracing::warn!(error = %e, "could not save transparency log");
    }

    println!();
    println!("{}", transparency_log.summary());
    Ok(())
}

fn cmd_replay(
    input: &Path,
    job_args: &JobArgs,
    rules: Option<RulesArg>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config()?;
    let tz = config.tz()?;
    let session_config = job_args.session_config(&config);
    let job = job_args.job(&config);

    let file = File::open(input).with_context(|| format!("failed to open feed {input:?}"))?;
    let batch = read_readings(BufReader::new(file))?;
    if batch.malformed > 0 {
        println!("Skipped {} malformed line(s)", batch.malformed);
    }

    // Session time follows the recorded timestamps.
    let sealed = replay(&batch.samples, session_config)?;
    let rules = rules.map(RulesArg::rules).unwrap_or_else(|| config.zone_rules.clone());
    let report = ReportBuilder::new()
        .with_rules(rules)
        .with_confidence(config.confidence)
        .build(&job, &sealed);

    println!("{}", report.summary(tz));
    println!(
        "Samples: {} received, {} accepted, {} stationary, {} rejected",
        sealed.counts.received,
        sealed.counts.accepted,
        sealed.counts.stationary,
        sealed.counts.invalid + sealed.counts.out_of_order
    );

    if let Some(dir) = output {
        let path = write_report(&dir, &report)?;
        println!("Wrote report to {path:?}");
    }
    Ok(())
}

fn cmd_classify(path: &Path, rules: RulesArg) -> Result<()> {
    let report = read_report(path).with_context(|| format!("failed to read report {path:?}"))?;
    let classifier = ZoneClassifier::new(rules.rules());
    let zone = classifier.classify(&report.trajectory, report.total_time_secs);
    let stats = TrajectoryStats::compute(&report.trajectory);

    println!("Report: {}", report.report_id);
    println!("  Elevator: {} (floor {})", report.elevator_id, report.floor);
    println!("  Duration: {}", format_duration(report.total_time_secs));
    println!("  Movement samples: {}", stats.point_count);
    if let Some(mean_z) = stats.mean_z {
        println!("  Mean z: {mean_z:.3}");
    }
    println!("  Stored zone: {}", report.inferred_zone);
    println!("  Re-derived zone ({rules:?}): {zone}");
    Ok(())
}

fn cmd_set_paused(paused: bool) -> Result<()> {
    let mut config = load_config()?;
    config.paused = paused;
    config.save().context("failed to save config")?;
    if paused {
        println!("Tracking paused. Use 'shaftsense resume' to continue.");
    } else {
        println!("Tracking resumed.");
    }
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = load_config()?;

    println!("ShaftSense Agent Status");
    println!("=======================");
    println!();
    println!("Configuration:");
    println!("  Tracking mode: {}", config.tracking_mode);
    println!("  Movement threshold: {}", config.effective_threshold());
    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!("  Minimum points: {}", config.zone_rules.min_points);
    println!("  Timezone: {}", config.timezone);
    println!("  Paused: {}", config.paused);
    println!();

    let stats_path = config.data_path.join("transparency.json");
    if stats_path.exists() {
        let stats = TransparencyLog::with_persistence(stats_path).stats();
        println!("Cumulative Statistics:");
        println!("  Samples received: {}", stats.samples_received);
        println!("  Samples accepted: {}", stats.samples_accepted);
        println!("  Samples stationary: {}", stats.samples_stationary);
        println!("  Samples rejected: {}", stats.samples_rejected);
        println!("  Sessions sealed: {}", stats.sessions_sealed);
        println!("  Reports exported: {}", stats.reports_exported);
    } else {
        println!("No previous session data found.");
    }

    println!("{DATA_DECLARATION}");
    Ok(())
}

fn cmd_export(output: Option<PathBuf>, format: ExportFormat) -> Result<()> {
    let config = load_config()?;

    if !config.export_path.exists() {
        println!("No reports found in {:?}", config.export_path);
        println!("Run 'shaftsense track' to record a session.");
        return Ok(());
    }

    let reports = read_reports(&config.export_path)
        .with_context(|| format!("failed to read reports from {:?}", config.export_path))?;
    if reports.is_empty() {
        println!("No reports found in {:?}", config.export_path);
        println!("Run 'shaftsense track' to record a session.");
        return Ok(());
    }

    println!("Found {} report(s)", reports.len());

    let export_dir = output.unwrap_or_else(|| config.export_path.clone());
    std::fs::create_dir_all(&export_dir)
        .with_context(|| format!("failed to create {export_dir:?}"))?;
    let output_path = export_dir.join(format!(
        "export_{}.{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    ));

    write_combined(&output_path, &reports, format)
        .with_context(|| format!("failed to write {output_path:?}"))?;
    println!("Exported to {output_path:?}");
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = load_config()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
