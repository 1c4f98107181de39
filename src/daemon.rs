//! Watcher process management: pidfile handling and unix signals

use std::fs::{self, File};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{error, info};

/// Get the path for the pidfile
pub fn pidfile_path() -> Result<PathBuf> {
    let uid = nix::unistd::getuid();

    // Try XDG_RUNTIME_DIR first (modern Linux)
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join("clipkeep.pid"));
    }

    // Try /var/run/user/<uid>/ (systemd systems)
    let var_run_user = PathBuf::from(format!("/var/run/user/{}", uid));
    if var_run_user.exists() {
        return Ok(var_run_user.join("clipkeep.pid"));
    }

    // Fallback to ~/.local/run/
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    let local_run = home.join(".local").join("run");

    fs::create_dir_all(&local_run).context("Failed to create ~/.local/run directory")?;

    Ok(local_run.join("clipkeep.pid"))
}

/// Write PID to pidfile
pub fn write_pidfile(pid: u32) -> Result<()> {
    let pidfile = pidfile_path()?;

    if let Some(parent) = pidfile.parent() {
        fs::create_dir_all(parent).context("Failed to create pidfile directory")?;
    }

    let mut file = File::create(&pidfile)
        .with_context(|| format!("Failed to create pidfile: {}", pidfile.display()))?;

    write!(file, "{}", pid)?;

    // Owner read/write only
    let metadata = file.metadata()?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(0o600);
    fs::set_permissions(&pidfile, permissions)?;

    info!(pid, path = %pidfile.display(), "wrote pidfile");
    Ok(())
}

/// Read PID from pidfile
pub fn read_pidfile() -> Result<Option<u32>> {
    let pidfile = pidfile_path()?;

    if !pidfile.exists() {
        return Ok(None);
    }

    let mut contents = String::new();
    File::open(&pidfile)?.read_to_string(&mut contents)?;

    let pid = contents
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid PID in pidfile: {}", contents))?;

    Ok(Some(pid))
}

/// Remove pidfile
pub fn remove_pidfile() -> Result<()> {
    let pidfile = pidfile_path()?;

    if pidfile.exists() {
        fs::remove_file(&pidfile)
            .with_context(|| format!("Failed to remove pidfile: {}", pidfile.display()))?;
        info!(path = %pidfile.display(), "removed pidfile");
    }

    Ok(())
}

/// Check if a process with the given PID is running
pub fn is_process_running(pid: u32) -> bool {
    // Signal 0 probes for existence without delivering anything
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Check if a watcher is already running, cleaning up stale pidfiles
pub fn is_watcher_running() -> Result<bool> {
    match read_pidfile()? {
        Some(pid) => {
            if is_process_running(pid) {
                Ok(true)
            } else {
                info!(pid, "found stale pidfile, removing");
                remove_pidfile()?;
                Ok(false)
            }
        }
        None => Ok(false),
    }
}

/// Stop the running watcher
pub fn stop_watcher() -> Result<()> {
    match read_pidfile()? {
        Some(pid) => {
            if is_process_running(pid) {
                info!(pid, "sending SIGTERM to watcher");
                signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM)?;

                // Give it a moment to shut down cooperatively
                for _ in 0..10 {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                    if !is_process_running(pid) {
                        info!("watcher stopped");
                        return Ok(());
                    }
                }

                error!("watcher did not stop gracefully, sending SIGKILL");
                signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL)?;
                std::thread::sleep(std::time::Duration::from_millis(100));

                if is_process_running(pid) {
                    return Err(anyhow!("Failed to stop watcher"));
                }

                remove_pidfile()?;
                info!("watcher forcefully stopped");
                Ok(())
            } else {
                info!("watcher is not running (stale pidfile)");
                remove_pidfile()?;
                Ok(())
            }
        }
        None => {
            info!("watcher is not running (no pidfile)");
            Ok(())
        }
    }
}

/// Forward SIGTERM to the cooperative shutdown channel
pub fn spawn_signal_listener(shutdown: tokio::sync::watch::Sender<bool>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        sigterm.recv().await;
        info!("received SIGTERM, shutting down");
        let _ = shutdown.send(true);
    });

    Ok(())
}
