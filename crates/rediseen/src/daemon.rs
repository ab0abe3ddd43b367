//! Background start and stop through a PID file

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// `<tmp>/rediseen.pid`
pub fn default_pid_file() -> PathBuf {
    std::env::temp_dir().join("rediseen.pid")
}

/// Writes `pid` as decimal text.
pub fn save_pid(path: &Path, pid: u32) -> Result<()> {
    std::fs::write(path, pid.to_string())
        .with_context(|| format!("failed to write PID file {}", path.display()))
}

/// Reads a positive PID back from `path`.
pub fn read_pid(path: &Path) -> Result<i32> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("no PID file found at {}", path.display()))?;
    contents
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|pid| *pid > 0)
        .with_context(|| format!("PID file {} does not hold a PID", path.display()))
}

/// Arguments for the background child: ours minus the daemon flag.
pub fn child_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .filter(|a| a != "-d" && a != "--daemon")
        .collect()
}

/// Re-launches this executable in the background and records its PID.
pub fn spawn_detached(pid_file: &Path) -> Result<u32> {
    if pid_file.exists() {
        bail!(
            "PID file {} already exists. Is rediseen already running?",
            pid_file.display()
        );
    }

    let exe = std::env::current_exe().context("unable to locate current executable")?;
    let child = Command::new(exe)
        .args(child_args(std::env::args().skip(1)))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to start background process")?;

    let pid = child.id();
    save_pid(pid_file, pid)?;
    info!(pid, pid_file = %pid_file.display(), "started in background");
    Ok(pid)
}

/// Removes the PID file and sends SIGTERM to the recorded process.
pub fn stop(pid_file: &Path) -> Result<i32> {
    let pid = read_pid(pid_file)?;
    if let Err(e) = std::fs::remove_file(pid_file) {
        warn!("Failed to remove PID file {}: {}", pid_file.display(), e);
    }

    let ret = unsafe { libc::kill(pid, libc::SIGTERM) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        bail!("failed to stop process {}: {}", pid, err);
    }
    info!(pid, "sent SIGTERM");
    Ok(pid)
}
