// Rip operations exposed to the API layer
use crate::disc::{classify_tracks, list_drives, scan_disc};
use crate::error::{Result, RipError};
use crate::jobs::{CancelOutcome, RipEvent, RipJobController};
use crate::models::{DiscRecord, DriveInfo, JobId, RipJob, RipRequest, RipperConfig, Track};
use log::debug;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Entry point for the API layer: scanning, classification and rip jobs
/// behind one already-resolved configuration
#[derive(Clone)]
pub struct Ripper {
    config: RipperConfig,
    jobs: RipJobController,
}

impl Ripper {
    pub fn new(config: RipperConfig) -> Self {
        let jobs = RipJobController::new(config.clone());
        Self { config, jobs }
    }

    pub fn config(&self) -> &RipperConfig {
        &self.config
    }

    /// Scan the disc in `device` and classify its tracks
    pub async fn scan(&self, device: &str) -> Result<DiscRecord> {
        scan_disc(&self.config, device).await
    }

    pub async fn list_drives(&self) -> Result<Vec<DriveInfo>> {
        list_drives(&self.config).await
    }

    pub fn classify(&self, tracks: Vec<Track>) -> Vec<Track> {
        classify_tracks(tracks, &self.config.classifier)
    }

    pub fn submit_rip(
        &self,
        drive_index: i64,
        title_index: i64,
        output_dir: impl Into<PathBuf>,
    ) -> Result<JobId> {
        let request = RipRequest::new(drive_index, title_index, output_dir);
        debug!("Rip requested: {:?}", request);
        self.jobs.submit(request)
    }

    pub fn get_job(&self, job_id: JobId) -> Result<RipJob> {
        self.jobs.get(job_id).ok_or(RipError::JobNotFound(job_id))
    }

    pub fn list_jobs(&self) -> Vec<RipJob> {
        self.jobs.list()
    }

    pub fn cancel_job(&self, job_id: JobId) -> Result<CancelOutcome> {
        self.jobs.cancel(job_id)
    }

    pub async fn wait_job(&self, job_id: JobId) -> Result<RipJob> {
        self.jobs.wait(job_id).await
    }

    /// Forget a finished job
    pub fn delete_job(&self, job_id: JobId) -> Result<()> {
        self.jobs.remove(job_id).map(|_| ())
    }

    pub fn active_job_for_drive(&self, drive_index: u32) -> Option<JobId> {
        self.jobs.active_job_for_drive(drive_index)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RipEvent> {
        self.jobs.subscribe()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::{RipJobStatus, TrackClass};
    use crate::test_support::{fake_tool, SPAWN_LOCK};

    // Answers `info` with a two-title disc and `mkv` with a short rip
    const TOOL: &str = r#"case "$3" in
info)
cat <<'EOF'
DRV:0,2,999,12,"BD-RE drive","TEST_MOVIE","/dev/sr0"
CINFO:1,6209,"Blu-ray disc"
CINFO:32,0,"TEST_MOVIE"
TINFO:0,9,0,"0:02:05"
TINFO:0,11,0,"262254592"
TINFO:1,9,0,"1:39:56"
TINFO:1,11,0,"11397666816"
EOF
;;
*)
echo 'PRGV:0,500,1000'
echo 'PRGV:0,1000,1000'
;;
esac
"#;

    #[tokio::test]
    async fn test_scan_then_rip_main_feature() {
        let _guard = SPAWN_LOCK.lock();
        let (dir, config) = fake_tool(TOOL);
        let ripper = Ripper::new(config);

        let disc = ripper.scan("/dev/sr0").await.unwrap();
        let main = disc.main_track().unwrap();
        assert_eq!(main.title_id, 1);
        assert_eq!(main.size_bytes, 11_397_666_816);

        let output_dir = dir.path().join("Test Movie (2024)");
        let job_id = ripper
            .submit_rip(0, i64::from(main.title_id), &output_dir)
            .unwrap();
        let job = ripper.wait_job(job_id).await.unwrap();

        assert_eq!(job.status, RipJobStatus::Succeeded);
        assert_eq!(job.title_index, 1);
        assert_eq!(job.output_dir, output_dir);
        assert_eq!(ripper.list_jobs().len(), 1);

        ripper.delete_job(job_id).unwrap();
        assert!(matches!(ripper.get_job(job_id), Err(RipError::JobNotFound(_))));
    }

    #[test]
    fn test_reclassify_with_configured_policy() {
        let mut config = RipperConfig::default();
        config.classifier.extra_max_ratio = None;
        config.classifier.extra_name_keywords.clear();
        let ripper = Ripper::new(config);

        let mut tracks = vec![Track::new(0), Track::new(1)];
        tracks[1].size_bytes = 10;
        let classified = ripper.classify(tracks);
        assert_eq!(classified[0].classification, TrackClass::Unknown);
        assert_eq!(classified[1].classification, TrackClass::Main);
    }
}
