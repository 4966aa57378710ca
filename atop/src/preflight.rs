//! Pre-flight checks for atop
//!
//! Validates the host and device before any streamer is started.
//! Provides clear, actionable error messages when requirements aren't met.

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::shell::ShellExecutor;

/// Host binaries atop shells out to
const REQUIRED_BINARIES: [&str; 1] = ["adb"];

/// Run all pre-flight checks and return the serial of the connected device
pub fn run_preflight_checks(host: &dyn ShellExecutor) -> Result<String> {
    check_required_binaries(host)?;
    let serial = check_single_device(host)?;
    check_adb_root(host)?;
    info!("Found device: {serial}");
    Ok(serial)
}

/// Check that every required binary is on the PATH
fn check_required_binaries(host: &dyn ShellExecutor) -> Result<()> {
    let mut missing = Vec::new();
    for bin in REQUIRED_BINARIES {
        let found = host.execute(&format!("which {bin}")).context("Failed to run `which`")?;
        if found.is_empty() {
            missing.push(bin);
        }
    }

    if !missing.is_empty() {
        bail!(
            "Following required binaries not found: {}\n\n\
             Install the Android platform tools and make sure they are on your PATH.",
            missing.join(", ")
        );
    }
    Ok(())
}

/// Check that exactly one authorized device is connected
fn check_single_device(host: &dyn ShellExecutor) -> Result<String> {
    // Always a header line followed by one line per device
    let devices = host.execute("adb devices").context("Failed to list adb devices")?;
    let entries: Vec<&String> = devices.iter().skip(1).filter(|l| !l.trim().is_empty()).collect();

    let entry = match entries.as_slice() {
        [] => bail!("No devices connected"),
        [entry] => *entry,
        _ => bail!(
            "atop expects only a single connected Android device, found {}",
            entries.len()
        ),
    };

    let mut fields = entry.split_whitespace();
    let serial = fields.next().unwrap_or_default().to_string();
    let status = fields.next().unwrap_or_default();

    if status == "unauthorized" {
        bail!(
            "Permission denied: please allow adb access to your device\n\n\
             Enable USB debugging and accept the authorization prompt on the device."
        );
    }
    Ok(serial)
}

fn in_adb_root(host: &dyn ShellExecutor) -> Result<bool> {
    let out = host.execute("adb shell whoami").context("Failed to query adb user")?;
    Ok(out.first().is_some_and(|user| user.trim() == "root"))
}

/// Check that adbd runs as root, restarting it as root once if not
fn check_adb_root(host: &dyn ShellExecutor) -> Result<()> {
    if in_adb_root(host)? {
        return Ok(());
    }

    warn!("atop requires adb in root...restarting as root");
    host.execute("adb root").context("Failed to run `adb root`")?;

    if !in_adb_root(host)? {
        bail!(
            "Failed to restart adb in root: permission denied\n\n\
             atop reads debugfs and the kernel log, which requires a rootable (userdebug) build."
        );
    }
    Ok(())
}
