//! Socket listener for the control endpoint.
//!
//! Binds the Unix socket, then accepts connections on a background task and
//! hands each one to its own connection task.

use std::fs;
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::connection::handle_connection;
use crate::error::ControlError;
use crate::registry::Registry;

/// Owner-only access to the socket file.
const SOCKET_MODE: u32 = 0o600;

/// Handle to a running accept loop.
///
/// Closing the handle, or dropping it, stops the loop and closes the
/// listening socket. Connections already accepted keep running until their
/// peers disconnect.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: watch::Sender<bool>,
}

impl ListenerHandle {
    pub(crate) fn close(self) {
        let _ = self.shutdown.send(true);
    }
}

/// Bind a listening socket at `path`, replacing a stale socket file.
///
/// Must only be called once the path is known not to be served by a live
/// instance. Anything at `path` that is not a socket is left alone.
pub(crate) fn bind(path: &Path) -> Result<UnixListener, ControlError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.file_type().is_socket() => {
            return Err(ControlError::NotSocket {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => remove_socket(path).map_err(|source| ControlError::Cleanup {
            path: path.to_path_buf(),
            source,
        })?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ControlError::Metadata {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let listener = UnixListener::bind(path).map_err(|source| ControlError::Bind {
        path: path.to_path_buf(),
        source,
    })?;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(SOCKET_MODE)) {
        warn!(path = %path.display(), error = %e, "Couldn't restrict socket permissions");
    }

    Ok(listener)
}

/// Remove the socket file at `path`; a missing file is not an error.
pub(crate) fn remove_socket(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Start accepting connections on a background task.
pub(crate) fn spawn(listener: UnixListener, registry: Arc<Registry>, id: u64) -> ListenerHandle {
    let (shutdown, signal) = watch::channel(false);
    tokio::spawn(accept_loop(listener, registry, signal, id));
    ListenerHandle { shutdown }
}

async fn accept_loop(
    listener: UnixListener,
    registry: Arc<Registry>,
    mut shutdown: watch::Receiver<bool>,
    id: u64,
) {
    debug!(id, "Accepting connections");

    loop {
        tokio::select! {
            // Fires on an explicit close and when the handle is dropped.
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        handle_connection(stream, registry, id).await;
                    });
                }
                Err(e) => {
                    error!(id, error = %e, "Error accepting connection");
                    break;
                }
            },
        }
    }

    info!(id, "Command listener closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{read_frame, write_frame};
    use tokio::net::UnixStream;

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        {
            let _stale = std::os::unix::net::UnixListener::bind(&path).unwrap();
        }
        assert!(path.exists());

        let _listener = bind(&path).unwrap();
        UnixStream::connect(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_refuses_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-socket");
        fs::write(&path, b"keep me").unwrap();

        let err = bind(&path).unwrap_err();
        assert!(matches!(err, ControlError::NotSocket { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_bind_restricts_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctl.sock");
        let _listener = bind(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, SOCKET_MODE);
    }

    #[tokio::test]
    async fn test_accept_loop_serves_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctl.sock");
        let handle = spawn(bind(&path).unwrap(), Arc::new(Registry::with_builtins()), 1);

        let mut first = UnixStream::connect(&path).await.unwrap();
        let mut second = UnixStream::connect(&path).await.unwrap();
        write_frame(&mut first, b"ping").await.unwrap();
        write_frame(&mut second, b"ping").await.unwrap();
        assert_eq!(&read_frame(&mut first).await.unwrap()[..], b"pong");
        assert_eq!(&read_frame(&mut second).await.unwrap()[..], b"pong");

        handle.close();

        // Already accepted connections outlive the listener.
        write_frame(&mut first, b"ping").await.unwrap();
        assert_eq!(&read_frame(&mut first).await.unwrap()[..], b"pong");
    }

    #[test]
    fn test_remove_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        remove_socket(&dir.path().join("missing.sock")).unwrap();
    }
}
