// Test helpers: a fake makemkvcon written as a shell script
use crate::models::RipperConfig;
use parking_lot::Mutex;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

/// Held by every test that spawns a process. Writing a script while another
/// thread forks can leave the script open in the child and fail exec with
/// ETXTBSY.
pub static SPAWN_LOCK: Mutex<()> = Mutex::new(());

/// Write `body` as an executable `makemkvcon` shell script and return a
/// config pointing at it. The script sees the real argv in "$@".
pub fn fake_tool(body: &str) -> (TempDir, RipperConfig) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("makemkvcon");
    write_script(&path, body);

    let config = RipperConfig {
        makemkvcon_path: path.to_string_lossy().to_string(),
        cancel_grace_period_ms: 300,
        scan_timeout_secs: 30,
        ..RipperConfig::default()
    };
    (dir, config)
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}
