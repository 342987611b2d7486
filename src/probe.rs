//! Liveness check for an instance already serving a control path.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::Client;

/// How long to wait for an existing instance to answer before treating it
/// as gone.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Ask whoever is serving `path` for its process id.
///
/// Returns `None` when nothing accepts the connection, or when the peer does
/// not answer within [`PROBE_TIMEOUT`]. An unresponsive peer is treated as
/// not running so a new instance can take its place.
pub async fn probe(path: &Path) -> Option<String> {
    probe_within(path, PROBE_TIMEOUT).await
}

pub(crate) async fn probe_within(path: &Path, timeout: Duration) -> Option<String> {
    let mut client = match Client::connect(path).await {
        Ok(client) => client,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No existing command listener");
            return None;
        }
    };

    match tokio::time::timeout(timeout, client.send(["pid"])).await {
        Ok(Ok(pid)) => Some(pid),
        Ok(Err(e)) => {
            debug!(path = %path.display(), error = %e, "Existing command listener hung up");
            None
        }
        Err(_) => {
            warn!(path = %path.display(), "Timed out checking PID of existing service");
            None
        }
    }
}
