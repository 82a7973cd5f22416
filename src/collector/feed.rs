//! Line-oriented sample feed.
//!
//! Reads JSON Lines accelerometer readings from any `BufRead` source (a
//! recorded session file, a pipe from the phone bridge, stdin) on a
//! background thread and delivers them through a bounded channel.

use crate::collector::types::{SensorReading, TimedSample};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long `stop` waits for a blocked reader before detaching it.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Poll slice used while pacing or waiting on a full channel.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Configuration for the feed collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Replay recorded gaps between readings instead of reading as fast as possible
    pub realtime: bool,
    /// Gap used for pacing when a reading's timestamp doesn't advance
    pub nominal_interval: Duration,
    /// Capacity of the sample channel
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            realtime: false,
            nominal_interval: Duration::from_millis(200),
            channel_capacity: 10_000,
        }
    }
}

/// Errors that can occur during sample collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Collector is already running")]
    AlreadyRunning,
    #[error("Failed to spawn feed reader: {0}")]
    Spawn(std::io::Error),
    #[error("Failed to read feed: {0}")]
    Io(#[from] std::io::Error),
}

/// Collects samples from a line-oriented source on a background thread.
pub struct FeedCollector {
    config: CollectorConfig,
    sender: Option<Sender<TimedSample>>,
    receiver: Receiver<TimedSample>,
    running: Arc<AtomicBool>,
    malformed: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl FeedCollector {
    /// Create a new collector. Nothing is read until `start` is called.
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(config.channel_capacity.max(1));
        Self {
            config,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            malformed: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    /// Start reading samples from `source`.
    ///
    /// The reader thread owns the only sender, so the receiver reports
    /// `Disconnected` once the source is exhausted or the collector stops.
    pub fn start<R>(&mut self, source: R) -> Result<(), CollectorError>
    where
        R: BufRead + Send + 'static,
    {
        if self.running.load(Ordering::SeqCst) || self.handle.is_some() {
            return Err(CollectorError::AlreadyRunning);
        }

        let sender = match self.sender.take() {
            Some(sender) => sender,
            None => {
                let (sender, receiver) = bounded(self.config.channel_capacity.max(1));
                self.receiver = receiver;
                sender
            }
        };

        // Each reader gets its own flag; a detached reader never touches a later one.
        let running = Arc::new(AtomicBool::new(true));
        self.running = Arc::clone(&running);
        let malformed = Arc::clone(&self.malformed);
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("shaftsense-feed".to_string())
            .spawn(move || {
                read_loop(source, &sender, &running, &malformed, &config);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CollectorError::Spawn(e)
            })?;

        self.handle = Some(handle);
        tracing::debug!(realtime = self.config.realtime, "feed collector started");
        Ok(())
    }

    /// Stop reading and release the source.
    ///
    /// Safe to call more than once. A reader blocked inside the source (e.g.
    /// an idle stdin) is detached after a short grace period; it can no
    /// longer deliver anything because the flag is already cleared.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + STOP_GRACE;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    tracing::warn!("feed reader thread panicked");
                }
            } else {
                tracing::warn!("feed source still blocked after stop; detaching reader");
            }
        }
    }

    /// Check if the collector is currently reading.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for timed samples.
    pub fn receiver(&self) -> &Receiver<TimedSample> {
        &self.receiver
    }

    /// Number of feed lines that could not be parsed.
    pub fn malformed_lines(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

impl Drop for FeedCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop<R: BufRead>(
    source: R,
    sender: &Sender<TimedSample>,
    running: &AtomicBool,
    malformed: &AtomicU64,
    config: &CollectorConfig,
) {
    let mut last_t: Option<u64> = None;

    for (index, line) in source.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "feed read failed; closing feed");
                return;
            }
        };

        let reading = match parse_line(&line) {
            Some(Ok(reading)) => reading,
            Some(Err(e)) => {
                malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(line = index + 1, error = %e, "skipping malformed feed line");
                continue;
            }
            None => continue,
        };

        if config.realtime {
            let gap = match last_t {
                Some(prev) if reading.t > prev => Duration::from_millis(reading.t - prev),
                Some(_) => config.nominal_interval,
                None => Duration::ZERO,
            };
            if !paced_sleep(gap, running) {
                return;
            }
        }
        last_t = Some(reading.t);

        let mut item = TimedSample::from(reading);
        loop {
            match sender.send_timeout(item, POLL_SLICE) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(back)) => {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    item = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
}

/// Parse one feed line. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Option<Result<SensorReading, serde_json::Error>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    Some(serde_json::from_str(trimmed))
}

/// Sleep for `total`, waking early if `running` is cleared. Returns whether
/// the collector is still running.
fn paced_sleep(total: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(POLL_SLICE));
    }
}

/// Samples read synchronously from a source.
#[derive(Debug, Clone, Default)]
pub struct FeedBatch {
    pub samples: Vec<TimedSample>,
    pub malformed: u64,
}

/// Read every reading from `reader` on the calling thread.
///
/// Malformed lines are skipped and counted; I/O errors are returned.
pub fn read_readings<R: BufRead>(reader: R) -> Result<FeedBatch, CollectorError> {
    let mut batch = FeedBatch::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Some(Ok(reading)) => batch.samples.push(reading.into()),
            Some(Err(e)) => {
                batch.malformed += 1;
                tracing::warn!(line = index + 1, error = %e, "skipping malformed feed line");
            }
            None => {}
        }
    }
    Ok(batch)
}
