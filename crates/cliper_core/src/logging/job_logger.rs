//! Per-job log file.
//!
//! Each job run gets its own logger that:
//! - Writes timestamped lines to `{run_dir}/{job_id}.log`
//! - Mirrors every line into `tracing`
//! - Filters progress lines in compact mode

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, MessagePrefix};
use crate::events::Event;

/// Per-job logger writing to a dedicated file.
pub struct JobLogger {
    job_id: String,
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    config: LogConfig,
    /// Last progress percentage written (compact mode filtering).
    last_progress: Mutex<Option<u32>>,
}

impl JobLogger {
    /// Open (append) the log file for a job inside `log_dir`.
    pub fn new(
        job_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
    ) -> std::io::Result<Self> {
        let job_id = job_id.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_id)));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            job_id,
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            config,
            last_progress: Mutex::new(None),
        })
    }

    /// A logger that only forwards to `tracing`.
    pub fn detached(job_id: impl Into<String>, config: LogConfig) -> Self {
        Self {
            job_id: job_id.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            config,
            last_progress: Mutex::new(None),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Path of the log file, if one is open.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        match level {
            LogLevel::Trace => tracing::trace!(job_id = %self.job_id, "{}", message),
            LogLevel::Debug => tracing::debug!(job_id = %self.job_id, "{}", message),
            LogLevel::Info => tracing::info!(job_id = %self.job_id, "{}", message),
            LogLevel::Warn => tracing::warn!(job_id = %self.job_id, "{}", message),
            LogLevel::Error => tracing::error!(job_id = %self.job_id, "{}", message),
        }

        let formatted = self.format_message(message);
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log a progress count (filtered in compact mode).
    ///
    /// Returns true if the line was written.
    pub fn progress(&self, current: u64, total: u64, label: &str) -> bool {
        let percent = if total == 0 {
            100
        } else {
            ((current.min(total) * 100) / total) as u32
        };

        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);
            let current_step = (percent / step) * step;
            if let Some(prev) = *last {
                if current_step <= (prev / step) * step && percent < 100 {
                    return false;
                }
            }
            *last = Some(percent);
        }

        self.log(
            LogLevel::Info,
            &format!("Progress: {}% ({}/{}) {}", percent, current, total, label),
        );
        true
    }

    /// Mirror a runner event into the log file.
    pub fn record(&self, event: &Event) {
        match event {
            Event::JobStatus(e) => match &e.error {
                Some(err) => self.log(LogLevel::Info, &format!("Job {}: {}", e.state, err)),
                None => self.log(LogLevel::Info, &format!("Job {}", e.state)),
            },
            Event::Progress(e) => {
                self.progress(e.current, e.total, &e.label);
            }
            Event::Log(e) => {
                let message = match &e.video_id {
                    Some(video_id) => format!("[{}] {}", video_id, e.message),
                    None => e.message.clone(),
                };
                self.log(e.level, &MessagePrefix::for_level(e.level).format(&message));
            }
            Event::State(e) => {
                let fields = serde_json::Value::Object(e.updates.clone());
                self.debug(&format!("[{}] state updated: {}", e.video_id, fields));
            }
        }
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and close the file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
