use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// PID file guarding one monitor instance per peer.
///
/// A hung instance recorded in the file is killed before this process
/// records itself. The file is removed when the guard is dropped.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
}

impl PidLock {
    pub fn path_for(dir: &Path, peer_addr: &str, peer_port: &str) -> PathBuf {
        dir.join(format!("azure-ha_{peer_addr}_{peer_port}.pid"))
    }

    pub fn acquire(path: PathBuf) -> io::Result<Self> {
        let own_pid = std::process::id();
        log::debug!("PID file: {}, PID: {own_pid}", path.display());

        if let Some(stale_pid) = read_pid(&path) {
            if stale_pid != own_pid && kill(stale_pid) {
                log::warn!("Killed the last hung instance of this monitor (PID {stale_pid})");
            }
        }

        fs::write(&path, own_pid.to_string())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::error!("Failed to remove PID file {}: {e}", self.path.display());
            }
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(target_family = "unix")]
fn kill(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    unsafe { libc::kill(pid, libc::SIGKILL) == 0 }
}

#[cfg(not(target_family = "unix"))]
fn kill(_pid: u32) -> bool {
    false
}
