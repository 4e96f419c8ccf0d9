// Disc scanning
// Runs makemkvcon in info mode and turns its output into a classified DiscRecord

use super::classifier::classify_tracks;
use crate::error::{Result, RipError};
use crate::makemkv::{
    build_scan_command, message_text, parse_drive_list, parse_record, parse_scan_output,
};
use crate::models::{DiscRecord, DriveInfo, RipperConfig};
use log::{debug, info, warn};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

// Asking for a drive index that cannot exist makes the tool list every
// drive and exit without opening a disc
const DRIVE_LIST_SOURCE: &str = "disc:9999";

struct InfoOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl InfoOutput {
    /// Best description of why the run failed
    fn failure_message(&self) -> String {
        self.stdout
            .lines()
            .rev()
            .find_map(message_text)
            .or_else(|| {
                self.stderr
                    .lines()
                    .rev()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(String::from)
            })
            .unwrap_or_else(|| format!("makemkvcon exited with {}", self.status))
    }
}

async fn run_info(config: &RipperConfig, device: &str) -> Result<InfoOutput> {
    let args = build_scan_command(&config.makemkvcon_path, device);
    debug!("Running scan: {:?}", args);

    let mut cmd = Command::new(&args[0]);
    cmd.args(&args[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| RipError::Spawn {
        program: config.makemkvcon_path.clone(),
        source,
    })?;

    let output = tokio::time::timeout(config.scan_timeout(), child.wait_with_output())
        .await
        .map_err(|_| RipError::ScanTimeout {
            device: device.to_string(),
            timeout: config.scan_timeout(),
        })??;

    Ok(InfoOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Scan the disc in `device` (a device path, drive index or source selector)
/// and classify its tracks
pub async fn scan_disc(config: &RipperConfig, device: &str) -> Result<DiscRecord> {
    let output = run_info(config, device).await?;

    if !output.status.success() {
        return Err(RipError::ScanFailed {
            device: device.to_string(),
            message: output.failure_message(),
        });
    }

    let mut disc = parse_scan_output(&output.stdout);

    if disc.device_path.is_empty() {
        disc.device_path = device.to_string();
    }
    if disc.tracks.is_empty() {
        warn!("Scan of {} found no titles", device);
    }

    disc.tracks = classify_tracks(disc.tracks, &config.classifier);

    info!(
        "Scanned {} ({:?} \"{}\"): {} titles",
        disc.device_path,
        disc.disc_type,
        disc.volume_name,
        disc.tracks.len()
    );
    Ok(disc)
}

/// List the optical drives the tool can see. The listing run exits non-zero
/// because the requested drive does not exist, so a failed exit only counts
/// when the tool printed no drive records at all.
pub async fn list_drives(config: &RipperConfig) -> Result<Vec<DriveInfo>> {
    let output = run_info(config, DRIVE_LIST_SOURCE).await?;

    let listed = output
        .stdout
        .lines()
        .filter_map(parse_record)
        .any(|record| record.tag == "DRV");
    if !listed && !output.status.success() {
        return Err(RipError::ScanFailed {
            device: DRIVE_LIST_SOURCE.to_string(),
            message: output.failure_message(),
        });
    }

    let drives = parse_drive_list(&output.stdout);

    debug!("Found {} drives", drives.len());
    Ok(drives)
}
