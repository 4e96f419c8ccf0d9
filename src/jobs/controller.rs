// Rip job controller
// Owns the job table, runs one task per job and applies the lifecycle rules:
// Pending -> Running -> Succeeded | Failed | Cancelled, Pending -> Cancelled | Failed

use super::drive_lock::{DriveGuard, DriveLocks};
use crate::error::{Result, RipError};
use crate::makemkv::build_rip_command_with;
use crate::models::{JobId, RipJob, RipJobStatus, RipRequest, RipperConfig};
use crate::process_manager::{run_rip_worker, spawn_rip_worker, WorkerExit, WorkerMessage};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

const EVENT_CAPACITY: usize = 256;
const MESSAGE_CAPACITY: usize = 100;

/// What a cancel call did
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// The job had not started; it is now Cancelled and nothing was spawned
    Cancelled,
    /// The job is running; it is being stopped and will end Cancelled
    Requested,
    /// The job was already terminal (or already being cancelled); nothing changed
    AlreadyFinished,
}

/// Lifecycle notifications, for callers that want push updates
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RipEvent {
    Started {
        job_id: JobId,
    },
    Progress {
        job_id: JobId,
        percent: u8,
        operation: Option<String>,
    },
    Finished {
        job_id: JobId,
        status: RipJobStatus,
        diagnostic: Option<String>,
    },
}

struct JobEntry {
    record: Mutex<RipJob>,
    drive: Mutex<Option<DriveGuard>>,
    cancel: watch::Sender<bool>,
    finished: watch::Sender<bool>,
}

struct Inner {
    config: RipperConfig,
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
    drives: Arc<DriveLocks>,
    events: broadcast::Sender<RipEvent>,
}

impl Inner {
    /// Move a job to its terminal state, release its drive and notify waiters.
    /// Called with the job record locked.
    fn complete(&self, entry: &JobEntry, job: &mut RipJob, status: RipJobStatus) {
        if !job.finish(status) {
            return;
        }

        entry.drive.lock().take();

        match status {
            RipJobStatus::Failed => warn!(
                "Rip job {} failed: {}",
                job.id,
                job.diagnostic.as_deref().unwrap_or("no diagnostic")
            ),
            _ => info!("Rip job {} finished: {:?}", job.id, status),
        }

        let _ = self.events.send(RipEvent::Finished {
            job_id: job.id,
            status,
            diagnostic: job.diagnostic.clone(),
        });
        entry.finished.send_replace(true);
    }
}

#[derive(Clone)]
pub struct RipJobController {
    inner: Arc<Inner>,
}

impl RipJobController {
    pub fn new(config: RipperConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                jobs: RwLock::new(HashMap::new()),
                drives: DriveLocks::new(),
                events,
            }),
        }
    }

    fn entry(&self, job_id: JobId) -> Result<Arc<JobEntry>> {
        self.inner
            .jobs
            .read()
            .get(&job_id)
            .cloned()
            .ok_or(RipError::JobNotFound(job_id))
    }

    /// Submit a rip and start it in the background.
    ///
    /// Invalid indices are rejected before any job exists. A drive already
    /// holding an unfinished job rejects the submission with `DriveBusy`.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: RipRequest) -> Result<JobId> {
        let args = build_rip_command_with(
            &self.inner.config.makemkvcon_path,
            request.drive_index,
            request.title_index,
            &request.output_dir,
        )?;
        // both indices were validated by the builder
        let drive = request.drive_index as u32;
        let title = request.title_index as u32;

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| RipError::NoRuntime)?;

        let job_id = JobId::new();
        let guard = self.inner.drives.try_acquire(drive, job_id)?;

        let entry = Arc::new(JobEntry {
            record: Mutex::new(RipJob::new(job_id, drive, title, request.output_dir)),
            drive: Mutex::new(Some(guard)),
            cancel: watch::channel(false).0,
            finished: watch::channel(false).0,
        });

        self.inner.jobs.write().insert(job_id, Arc::clone(&entry));
        info!("Submitted rip job {}: drive {} title {}", job_id, drive, title);

        runtime.spawn(run_job(Arc::clone(&self.inner), entry, args));
        Ok(job_id)
    }

    /// Snapshot of a job
    pub fn get(&self, job_id: JobId) -> Option<RipJob> {
        let entry = self.inner.jobs.read().get(&job_id).cloned()?;
        let job = entry.record.lock().clone();
        Some(job)
    }

    /// Snapshots of every job, oldest first
    pub fn list(&self) -> Vec<RipJob> {
        let entries: Vec<Arc<JobEntry>> = self.inner.jobs.read().values().cloned().collect();
        let mut jobs: Vec<RipJob> = entries.iter().map(|e| e.record.lock().clone()).collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Cancel a job. Returns immediately; a running job reaches Cancelled
    /// once its process is gone, at most the grace period plus a forced kill
    /// later. Cancelling a finished job is a no-op.
    pub fn cancel(&self, job_id: JobId) -> Result<CancelOutcome> {
        let entry = self.entry(job_id)?;
        let mut job = entry.record.lock();

        let outcome = match job.status {
            RipJobStatus::Pending => {
                self.inner.complete(&entry, &mut job, RipJobStatus::Cancelled);
                CancelOutcome::Cancelled
            }
            RipJobStatus::Running if !job.cancel_requested => {
                job.cancel_requested = true;
                info!("Cancelling rip job {}", job_id);
                CancelOutcome::Requested
            }
            _ => {
                debug!("Cancel of rip job {} ignored ({:?})", job_id, job.status);
                CancelOutcome::AlreadyFinished
            }
        };

        if outcome != CancelOutcome::AlreadyFinished {
            entry.cancel.send_replace(true);
        }
        Ok(outcome)
    }

    /// Wait until the job is terminal and return its final snapshot
    pub async fn wait(&self, job_id: JobId) -> Result<RipJob> {
        let entry = self.entry(job_id)?;
        let mut finished = entry.finished.subscribe();
        let _ = finished.wait_for(|done| *done).await;

        let job = entry.record.lock().clone();
        Ok(job)
    }

    /// Drop a finished job from the table
    pub fn remove(&self, job_id: JobId) -> Result<RipJob> {
        let mut jobs = self.inner.jobs.write();
        let entry = jobs.get(&job_id).ok_or(RipError::JobNotFound(job_id))?;

        let job = entry.record.lock().clone();
        if !job.status.is_terminal() {
            return Err(RipError::JobActive(job_id));
        }

        jobs.remove(&job_id);
        debug!("Removed rip job {}", job_id);
        Ok(job)
    }

    /// Job currently holding `drive`, if any
    pub fn active_job_for_drive(&self, drive: u32) -> Option<JobId> {
        self.inner.drives.holder(drive)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RipEvent> {
        self.inner.events.subscribe()
    }
}

/// Body of one job: spawn, stream progress, finalize
async fn run_job(inner: Arc<Inner>, entry: Arc<JobEntry>, args: Vec<OsString>) {
    // Spawn under the record lock so a concurrent cancel either sees Pending
    // and prevents the spawn, or sees Running and stops the process. Readers
    // of this job wait at most as long as the spawn itself.
    let child = {
        let mut job = entry.record.lock();
        if job.status.is_terminal() {
            debug!("Rip job {} ended before it started", job.id);
            return;
        }

        match spawn_rip_worker(&args) {
            Ok(child) => {
                job.mark_running();
                child
            }
            Err(e) => {
                job.diagnostic = Some(e.to_string());
                inner.complete(&entry, &mut job, RipJobStatus::Failed);
                return;
            }
        }
    };

    let job_id = entry.record.lock().id;
    let _ = inner.events.send(RipEvent::Started { job_id });

    // Progress consumer: applies samples in emission order under the
    // monotonic guard
    let (tx, mut rx) = mpsc::channel::<WorkerMessage>(MESSAGE_CAPACITY);
    let progress_entry = Arc::clone(&entry);
    let progress_events = inner.events.clone();
    let progress_handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                WorkerMessage::Progress(sample) => {
                    let update = {
                        let mut job = progress_entry.record.lock();
                        job.apply_progress(&sample)
                            .then(|| (job.progress_percent, job.current_operation.clone()))
                    };
                    if let Some((percent, operation)) = update {
                        let _ = progress_events.send(RipEvent::Progress {
                            job_id,
                            percent,
                            operation,
                        });
                    }
                }
                WorkerMessage::Diagnostic(text) => {
                    debug!("[makemkvcon {}] {}", job_id, text);
                    progress_entry.record.lock().diagnostic = Some(text);
                }
            }
        }
    });

    let exit = run_rip_worker(
        child,
        entry.cancel.subscribe(),
        inner.config.cancel_grace_period(),
        tx,
    )
    .await;

    let _ = progress_handle.await;

    let mut job = entry.record.lock();
    let status = match exit {
        Ok(WorkerExit::Exited(status)) => {
            job.exit_code = status.code();
            if status.success() {
                RipJobStatus::Succeeded
            } else {
                if job.diagnostic.is_none() {
                    job.diagnostic = Some(format!("makemkvcon exited with {}", status));
                }
                RipJobStatus::Failed
            }
        }
        Ok(WorkerExit::Cancelled) => RipJobStatus::Cancelled,
        Err(e) => {
            job.diagnostic = Some(format!("Lost track of makemkvcon: {}", e));
            RipJobStatus::Failed
        }
    };

    // An accepted cancel wins over a natural exit that raced it
    let status = if job.cancel_requested {
        RipJobStatus::Cancelled
    } else {
        status
    };

    inner.complete(&entry, &mut job, status);
}
