//! Single instance lock per resource, held through a Unix socket.
//!
//! Two daemons serving the same resource path on one host would fight over the
//! pin and the topics, so the second one refuses to start. The OS releases the
//! socket when the process dies, so a crash never leaves a stale lock behind.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another daemon already serves {0}")]
    AlreadyRunning(String),

    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as the daemon runs; the socket file is removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Lock the resource at `resource_path` in the runtime directory.
    pub fn acquire(resource_path: &str) -> Result<Self, InstanceLockError> {
        Self::acquire_in(&runtime_dir(), resource_path)
    }

    pub fn acquire_in(dir: &Path, resource_path: &str) -> Result<Self, InstanceLockError> {
        let path = socket_path_in(dir, resource_path);

        // A socket nobody answers on was left by a killed process
        if path.exists() {
            match UnixStream::connect(&path) {
                Ok(_) => return Err(InstanceLockError::AlreadyRunning(resource_path.to_string())),
                Err(_) => {
                    let _ = std::fs::remove_file(&path);
                }
            }
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(resource_path.to_string()))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// `XDG_RUNTIME_DIR` when set, else `/tmp`.
pub fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Socket file for a resource path: `/a/ledKitchen` -> `smarthome-a-ledKitchen.sock`.
pub fn socket_path_in(dir: &Path, resource_path: &str) -> PathBuf {
    let name: String = resource_path
        .trim_start_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    dir.join(format!("smarthome-{}.sock", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_name_from_resource_path() {
        assert_eq!(
            socket_path_in(Path::new("/run/user/1000"), "/a/ledKitchen"),
            PathBuf::from("/run/user/1000/smarthome-a-ledKitchen.sock")
        );
        assert_eq!(
            socket_path_in(Path::new("/tmp"), "/a/fan 2"),
            PathBuf::from("/tmp/smarthome-a-fan-2.sock")
        );
    }

    #[test]
    fn test_second_instance_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let lock = InstanceLock::acquire_in(dir.path(), "/a/led").unwrap();
        assert!(lock.path().exists());

        assert!(matches!(
            InstanceLock::acquire_in(dir.path(), "/a/led"),
            Err(InstanceLockError::AlreadyRunning(path)) if path == "/a/led"
        ));
        // other resources are independent
        let _fan = InstanceLock::acquire_in(dir.path(), "/a/fan").unwrap();

        drop(lock);
        assert!(InstanceLock::acquire_in(dir.path(), "/a/led").is_ok());
    }

    #[test]
    fn test_stale_socket_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path_in(dir.path(), "/a/button");
        // bound then dropped without cleanup: the file stays, nobody listens
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        assert!(InstanceLock::acquire_in(dir.path(), "/a/button").is_ok());
    }
}
