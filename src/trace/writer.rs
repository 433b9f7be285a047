//! JSONL step writer with daily file rotation.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};

use super::{Step, StepRecorder};
use crate::{AppError, Result};

/// Step log for a single calendar day.
struct DayFile {
    date: NaiveDate,
    out: BufWriter<File>,
}

impl DayFile {
    fn open(dir: &Path, date: NaiveDate) -> Result<Self> {
        let path = day_file_path(dir, date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                AppError::Trace(format!("failed to open step log {}: {e}", path.display()))
            })?;
        Ok(Self {
            date,
            out: BufWriter::new(file),
        })
    }

    /// Append one line and flush so a crash loses at most the current step.
    fn append(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}")
            .and_then(|()| self.out.flush())
            .map_err(|e| AppError::Trace(format!("step log {} write failed: {e}", self.date)))
    }
}

/// Path of the step log for `date` under `dir`.
#[must_use]
pub fn day_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("steps-{date}.jsonl"))
}

/// A daily-rotating JSONL step writer.
///
/// Appends one JSON object per line to `<dir>/steps-YYYY-MM-DD.jsonl`,
/// switching files when a step is recorded on a new date.
pub struct JsonlStepWriter {
    dir: PathBuf,
    current: Mutex<Option<DayFile>>,
}

impl JsonlStepWriter {
    /// Construct a writer that stores steps in `dir`.
    ///
    /// Creates `dir` and all parent directories if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Trace`] if the directory cannot be created.
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Trace(format!(
                "failed to create step log directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self {
            dir,
            current: Mutex::new(None),
        })
    }

    /// Record `step` in the log for `date`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Trace`] if the step cannot be serialized or the
    /// day's file cannot be opened or written.
    pub fn record_on(&self, step: &Step, date: NaiveDate) -> Result<()> {
        let line = serde_json::to_string(step)
            .map_err(|e| AppError::Trace(format!("failed to serialize step {}: {e}", step.id)))?;

        let mut current = self
            .current
            .lock()
            .map_err(|_| AppError::Trace("step writer mutex poisoned".into()))?;

        let day = match current.take() {
            Some(day) if day.date == date => day,
            _ => DayFile::open(&self.dir, date)?,
        };
        current.insert(day).append(&line)
    }
}

impl StepRecorder for JsonlStepWriter {
    fn record(&self, step: &Step) -> Result<()> {
        self.record_on(step, Utc::now().date_naive())
    }
}
