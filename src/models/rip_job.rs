// Rip job data models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::makemkv::ProgressSample;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RipJobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RipJobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RipJobStatus::Succeeded | RipJobStatus::Failed | RipJobStatus::Cancelled
        )
    }
}

/// What the caller asks for when submitting a rip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RipRequest {
    pub drive_index: i64,
    pub title_index: i64,
    pub output_dir: PathBuf,
}

impl RipRequest {
    pub fn new(drive_index: i64, title_index: i64, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            drive_index,
            title_index,
            output_dir: output_dir.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RipJob {
    pub id: JobId,
    pub drive_index: u32,
    pub title_index: u32,
    pub output_dir: PathBuf,
    pub status: RipJobStatus,
    pub progress_percent: u8, // 0-100
    pub current_operation: Option<String>,
    pub diagnostic: Option<String>,
    pub exit_code: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) cancel_requested: bool,
}

impl RipJob {
    pub fn new(id: JobId, drive_index: u32, title_index: u32, output_dir: PathBuf) -> Self {
        Self {
            id,
            drive_index,
            title_index,
            output_dir,
            status: RipJobStatus::Pending,
            progress_percent: 0,
            current_operation: None,
            diagnostic: None,
            exit_code: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            cancel_requested: false,
        }
    }

    /// Apply a decoded progress sample. Samples below the highest percent seen
    /// so far are discarded. Returns true when the percent moved.
    pub fn apply_progress(&mut self, sample: &ProgressSample) -> bool {
        if self.status != RipJobStatus::Running {
            return false;
        }

        if let Some(label) = &sample.label {
            self.current_operation = Some(label.clone());
        }

        if sample.percent > self.progress_percent {
            self.progress_percent = sample.percent.min(100);
            true
        } else {
            false
        }
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = RipJobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Move to a terminal state. Terminal states never change again.
    pub(crate) fn finish(&mut self, status: RipJobStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }

        self.status = status;
        self.ended_at = Some(Utc::now());
        if status == RipJobStatus::Succeeded {
            self.progress_percent = 100;
        }
        true
    }
}
