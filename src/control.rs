//! The control object embedded by a host program.
//!
//! A [`Control`] owns one socket path, the registry of commands served on it,
//! and the listener while it runs:
//!
//! ```no_run
//! # async fn run() -> Result<(), sockctl::ControlError> {
//! use sockctl::{Control, Handler};
//!
//! let mut control = Control::new("/tmp/myapp.sock");
//! control.register(Handler::new("greet", "say hello", |args| {
//!     format!("hello {}", args.join(" "))
//! }))?;
//! control.start().await?;
//! // ... the host runs, callers connect and issue commands ...
//! control.stop();
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::ControlError;
use crate::listener::{self, ListenerHandle};
use crate::probe::probe;
use crate::registry::{Handler, Registry};

/// Source of the per-instance id attached to log events.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A control endpoint bound to one socket path.
#[derive(Debug)]
pub struct Control {
    id: u64,
    path: PathBuf,
    registry: Arc<Registry>,
    listener: Option<ListenerHandle>,
}

impl Control {
    /// Create a stopped control object for `path`, holding the built-in
    /// commands.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            path: path.into(),
            registry: Arc::new(Registry::with_builtins()),
            listener: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// Add a command. Only allowed while stopped.
    pub fn register(&mut self, handler: Handler) -> Result<(), ControlError> {
        self.register_many([handler])
    }

    /// Add several commands at once; see [`Registry::register_many`].
    pub fn register_many<I>(&mut self, handlers: I) -> Result<(), ControlError>
    where
        I: IntoIterator<Item = Handler>,
    {
        if self.is_running() {
            return Err(ControlError::Serving);
        }
        // Connections left over from an earlier run may still share the old
        // registry; they keep their copy.
        Arc::make_mut(&mut self.registry).register_many(handlers)?;
        Ok(())
    }

    /// Start serving commands on the socket path.
    ///
    /// Fails with [`ControlError::AlreadyRunning`] when a live instance
    /// answers on the path. A socket file nobody answers on is removed and
    /// replaced. The accept loop runs on a spawned task, so this must be
    /// called from within a Tokio runtime.
    pub async fn start(&mut self) -> Result<(), ControlError> {
        info!(id = self.id, path = %self.path.display(), "Starting command listener");

        if self.is_running() {
            return Err(ControlError::AlreadyRunning {
                pid: std::process::id().to_string(),
            });
        }

        if let Some(pid) = probe(&self.path).await {
            error!(id = self.id, pid = %pid, "Command listener already running");
            return Err(ControlError::AlreadyRunning { pid });
        }

        let socket = listener::bind(&self.path).inspect_err(|e| {
            error!(
                id = self.id,
                path = %self.path.display(),
                error = %e,
                "Couldn't listen on socket"
            );
        })?;

        self.listener = Some(listener::spawn(socket, Arc::clone(&self.registry), self.id));
        Ok(())
    }

    /// Stop accepting connections and remove the socket file.
    ///
    /// Connections already accepted run until their peers disconnect. Does
    /// nothing if the listener is not running.
    pub fn stop(&mut self) {
        let Some(handle) = self.listener.take() else {
            return;
        };

        info!(id = self.id, "Stopping command listener");
        handle.close();
        if let Err(e) = listener::remove_socket(&self.path) {
            warn!(id = self.id, path = %self.path.display(), error = %e, "Couldn't remove socket");
        }
    }
}

impl Drop for Control {
    fn drop(&mut self) {
        self.stop();
    }
}
