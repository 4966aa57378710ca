//! Device-side logging switches
//!
//! The instrumented drivers only emit IOCTL/TIME/INFO lines while their
//! debugfs switches are on, and the NNAPI runtime only logs driver timings
//! while `debug.nn.vlog` is set. Both are guards: turning logging on returns a
//! value that turns it back off when dropped.

use log::{info, warn};
use std::sync::Arc;

use crate::domain::AtopError;
use crate::shell::ShellExecutor;

/// `(debugfs switch, value that enables it)`
const KERNEL_LOG_SWITCHES: [(&str, &str); 4] = [
    ("/sys/kernel/debug/adsprpc/global", "1"),
    ("/sys/kernel/debug/camera_sync/logging_enabled", "1"),
    ("/sys/kernel/debug/cam_sensor/logging_enabled", "1"),
    ("/sys/kernel/debug/kgsl/kgsl-3d0/log_level_perf", "6"),
];

pub const DRIVER_LOG_PROP: &str = "debug.nn.vlog";

/// Value of a system property; empty when unset.
///
/// # Errors
/// Shell failures.
pub fn getprop(shell: &dyn ShellExecutor, prop: &str) -> Result<String, AtopError> {
    let out = shell.execute(&format!("getprop {prop}"))?;
    Ok(out.into_iter().next().map(|v| v.trim().to_string()).unwrap_or_default())
}

/// # Errors
/// Shell failures.
pub fn setprop(shell: &dyn ShellExecutor, prop: &str, value: &str) -> Result<(), AtopError> {
    shell.execute(&format!("setprop {prop} {value}"))?;
    Ok(())
}

fn write_switches(shell: &dyn ShellExecutor, enable: bool) -> Result<(), AtopError> {
    for (path, on) in KERNEL_LOG_SWITCHES {
        let value = if enable { on } else { "0" };
        shell.execute(&format!("echo {value} >> {path}"))?;
    }
    Ok(())
}

// =============================================================================
// KERNEL
// =============================================================================

/// DSP, GPU and camera driver logging, on while this value lives.
pub struct KernelLogging {
    shell: Arc<dyn ShellExecutor>,
    enabled: bool,
}

impl KernelLogging {
    /// # Errors
    /// Shell failures.
    pub fn enable(shell: Arc<dyn ShellExecutor>) -> Result<Self, AtopError> {
        info!("Enabling kernel logging");
        write_switches(shell.as_ref(), true)?;
        Ok(Self {
            shell,
            enabled: true,
        })
    }

    /// Turn the switches off now rather than on drop.
    ///
    /// # Errors
    /// Shell failures.
    pub fn disable(&mut self) -> Result<(), AtopError> {
        if self.enabled {
            info!("Disabling kernel logging");
            write_switches(self.shell.as_ref(), false)?;
            self.enabled = false;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for KernelLogging {
    fn drop(&mut self) {
        if let Err(e) = self.disable() {
            warn!("Failed to disable kernel logging: {e}");
        }
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// NNAPI driver timing logs (`debug.nn.vlog`), restored to the original
/// value on drop.
pub struct DriverLogging {
    shell: Arc<dyn ShellExecutor>,
    original: String,
    restored: bool,
}

impl DriverLogging {
    /// # Errors
    /// Shell failures.
    pub fn enable(shell: Arc<dyn ShellExecutor>) -> Result<Self, AtopError> {
        let original = getprop(shell.as_ref(), DRIVER_LOG_PROP)?;
        info!("Setting {DRIVER_LOG_PROP} from {original:?} to 1");
        setprop(shell.as_ref(), DRIVER_LOG_PROP, "1")?;
        Ok(Self {
            shell,
            original,
            restored: false,
        })
    }

    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// # Errors
    /// Shell failures.
    pub fn restore(&mut self) -> Result<(), AtopError> {
        if !self.restored {
            let value = if self.original.is_empty() { "0" } else { self.original.as_str() };
            setprop(self.shell.as_ref(), DRIVER_LOG_PROP, value)?;
            self.restored = true;
        }
        Ok(())
    }
}

impl Drop for DriverLogging {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("Failed to restore {DRIVER_LOG_PROP}: {e}");
        }
    }
}
