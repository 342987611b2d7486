//! Per-connection command loop.
//!
//! Each accepted connection gets its own task running [`handle_connection`]:
//! read a request frame, dispatch it through the registry, write the reply
//! frame, repeat. The loop ends when the peer disconnects or any frame
//! operation fails; only that connection is affected.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::frame::{read_frame, write_frame, MAX_PAYLOAD};
use crate::registry::Registry;

/// Separator between the fields of a request payload.
pub const FIELD_SEPARATOR: char = '\0';

/// Serve requests on `stream` until it closes or errors.
///
/// Handlers are synchronous and may block, so each one runs on the blocking
/// pool; a slow handler holds up only its own connection.
pub(crate) async fn handle_connection<S>(mut stream: S, registry: Arc<Registry>, id: u64)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!(id, "New connection");

    loop {
        let request = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!(id, "Connection closed by client");
                break;
            }
            Err(e) => {
                warn!(id, error = %e, "Error reading from connection");
                break;
            }
        };

        let reply = match run_blocking(&registry, request).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(id, error = %e, "Command handler failed");
                break;
            }
        };
        debug!(id, reply = %reply, "Responding");

        if let Err(e) = write_frame(&mut stream, reply.as_bytes()).await {
            warn!(id, error = %e, "Error writing to connection");
            break;
        }
    }

    info!(id, "Connection closed");
}

async fn run_blocking(
    registry: &Arc<Registry>,
    request: Bytes,
) -> Result<String, tokio::task::JoinError> {
    let registry = Arc::clone(registry);
    tokio::task::spawn_blocking(move || dispatch(&registry, &request)).await
}

/// Answer one request payload.
///
/// Field 0 is the command name, the remaining fields are its arguments. An
/// unknown name is answered with an `ERROR:` reply rather than failing, so
/// the connection stays usable.
pub fn dispatch(registry: &Registry, payload: &[u8]) -> String {
    let request = String::from_utf8_lossy(payload);
    let mut fields = request.split(FIELD_SEPARATOR);
    // split always yields at least one field, even for an empty payload
    let name = fields.next().unwrap_or_default();
    let args: Vec<String> = fields.map(str::to_string).collect();

    debug!(command = name, ?args, "Got command");

    let reply = match registry.lookup(name) {
        Some(handler) => handler.run(registry, &args),
        None => format!("ERROR: unknown command: '{name}'."),
    };

    if reply.len() > MAX_PAYLOAD {
        warn!(command = name, len = reply.len(), "Reply does not fit in a frame");
        return format!("ERROR: reply too large: {} bytes.", reply.len());
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Handler;
    use tokio::io::duplex;

    fn registry() -> Registry {
        let mut registry = Registry::with_builtins();
        registry
            .register_many([
                Handler::new("foo", "", |args| args.join(" ")),
                Handler::new("count", "", |args| args.len().to_string()),
                Handler::new("huge", "", |_| "x".repeat(MAX_PAYLOAD + 1)),
            ])
            .unwrap();
        registry
    }

    #[test]
    fn test_dispatch_builtin() {
        assert_eq!(dispatch(&registry(), b"ping"), "pong");
    }

    #[test]
    fn test_dispatch_arguments() {
        let registry = registry();
        assert_eq!(dispatch(&registry, b"foo\0bar\0baz"), "bar baz");
        assert_eq!(dispatch(&registry, b"count"), "0");
        assert_eq!(dispatch(&registry, b"count\0"), "1");
        assert_eq!(dispatch(&registry, b"count\0\0"), "2");
    }

    #[test]
    fn test_dispatch_unknown() {
        let registry = registry();
        assert_eq!(dispatch(&registry, b"xyz"), "ERROR: unknown command: 'xyz'.");
        assert_eq!(dispatch(&registry, b""), "ERROR: unknown command: ''.");
        assert_eq!(
            dispatch(&registry, b"Ping\0x"),
            "ERROR: unknown command: 'Ping'."
        );
    }

    #[test]
    fn test_dispatch_oversized_reply() {
        let reply = dispatch(&registry(), b"huge");
        assert!(reply.starts_with("ERROR: reply too large"));
    }

    #[tokio::test]
    async fn test_connection_serves_in_order() {
        let registry = Arc::new(registry());
        let (mut client, server) = duplex(1024);

        let serve = handle_connection(server, registry, 1);
        let drive = async move {
            write_frame(&mut client, b"xyz").await.unwrap();
            write_frame(&mut client, b"foo\0a\0b").await.unwrap();
            write_frame(&mut client, b"ping").await.unwrap();

            let replies = [
                read_frame(&mut client).await.unwrap(),
                read_frame(&mut client).await.unwrap(),
                read_frame(&mut client).await.unwrap(),
            ];
            drop(client);
            replies
        };

        let ((), replies) = tokio::join!(serve, drive);
        assert_eq!(&replies[0][..], b"ERROR: unknown command: 'xyz'.");
        assert_eq!(&replies[1][..], b"a b");
        assert_eq!(&replies[2][..], b"pong");
    }

    #[tokio::test]
    async fn test_connection_ends_on_truncated_frame() {
        let registry = Arc::new(registry());
        let (mut client, server) = duplex(64);

        let drive = async move {
            use tokio::io::AsyncWriteExt;
            client.write_all(&[0x00, 0x10, b'p']).await.unwrap();
        };

        // Returns once the client half is dropped mid-frame.
        tokio::join!(handle_connection(server, registry, 1), drive);
    }

    #[tokio::test]
    async fn test_connection_ends_when_handler_panics() {
        let mut registry = registry();
        registry
            .register(Handler::new("boom", "", |_| panic!("handler bug")))
            .unwrap();
        let (mut client, server) = duplex(64);

        let drive = async move {
            write_frame(&mut client, b"boom").await.unwrap();
            read_frame(&mut client).await.unwrap_err().kind()
        };

        let ((), kind) = tokio::join!(handle_connection(server, Arc::new(registry), 1), drive);
        assert_eq!(kind, io::ErrorKind::UnexpectedEof);
    }
}
