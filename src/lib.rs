//! sockctl: an embeddable control socket.
//!
//! A host process opens a Unix socket through which operators and scripts
//! send short text commands and receive text replies, without exposing a
//! network port.
//!
//! Features:
//! - Length-prefixed framing (16-bit big-endian length, then payload)
//! - Built-in `ping`, `pid` and `help` commands
//! - Host-registered commands with positional arguments
//! - One task per connection; requests on a connection are answered in order
//! - Refuses to start when a live instance already serves the socket path
//!
//! Logging goes through `tracing` and is discarded unless the host installs
//! a subscriber.

mod client;
mod commands;
mod connection;
mod control;
mod error;
pub mod frame;
mod listener;
mod probe;
mod registry;

pub use client::{encode_request, Client};
pub use connection::{dispatch, FIELD_SEPARATOR};
pub use control::Control;
pub use error::{ControlError, RegistryError};
pub use probe::{probe, PROBE_TIMEOUT};
pub use registry::{Handler, HandlerFn, Registry};
