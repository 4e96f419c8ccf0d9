// Argument vectors for makemkvcon invocations
// The vectors are passed straight to process spawning, never through a shell

use crate::error::{Result, RipError};
use std::ffi::OsString;
use std::path::Path;

pub const DEFAULT_PROGRAM: &str = "makemkvcon";

const ROBOT_FLAG: &str = "-r";
const PROGRESS_FLAG: &str = "--progress=-same";
const CACHE_FLAG: &str = "--cache=1";
const RIP_SUBCOMMAND: &str = "mkv";
const INFO_SUBCOMMAND: &str = "info";
const DRIVE_PREFIX: &str = "disc:";

fn check_index(kind: &'static str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| RipError::InvalidIndex { kind, value })
}

/// Build the rip argv with the default program name
pub fn build_rip_command(drive_index: i64, title_index: i64, destination: &Path) -> Result<Vec<OsString>> {
    build_rip_command_with(DEFAULT_PROGRAM, drive_index, title_index, destination)
}

/// Build `program -r --progress=-same mkv disc:<drive> <title> <destination>`.
/// Negative indices are rejected. Whether the drive or title exists is left
/// to the tool at run time.
pub fn build_rip_command_with(
    program: &str,
    drive_index: i64,
    title_index: i64,
    destination: &Path,
) -> Result<Vec<OsString>> {
    let drive = check_index("drive", drive_index)?;
    let title = check_index("title", title_index)?;

    Ok(vec![
        OsString::from(program),
        OsString::from(ROBOT_FLAG),
        OsString::from(PROGRESS_FLAG),
        OsString::from(RIP_SUBCOMMAND),
        OsString::from(format!("{}{}", DRIVE_PREFIX, drive)),
        OsString::from(title.to_string()),
        destination.as_os_str().to_os_string(),
    ])
}

/// Turn a caller-supplied device into a source selector: `disc:N`, `dev:PATH`
/// and `file:PATH` pass through, a bare number is a drive index and anything
/// else is a device path.
pub fn source_selector(device: &str) -> String {
    let device = device.trim();

    if ["disc:", "dev:", "file:"].iter().any(|p| device.starts_with(p)) {
        device.to_string()
    } else if !device.is_empty() && device.chars().all(|c| c.is_ascii_digit()) {
        format!("{}{}", DRIVE_PREFIX, device)
    } else {
        format!("dev:{}", device)
    }
}

/// Build `program -r --cache=1 info <source>`
pub fn build_scan_command(program: &str, device: &str) -> Vec<OsString> {
    vec![
        OsString::from(program),
        OsString::from(ROBOT_FLAG),
        OsString::from(CACHE_FLAG),
        OsString::from(INFO_SUBCOMMAND),
        OsString::from(source_selector(device)),
    ]
}
