//! Client side of the control protocol.

use std::io;
use std::path::Path;

use bytes::Bytes;
use tokio::net::UnixStream;

use crate::connection::FIELD_SEPARATOR;
use crate::frame::{read_frame, write_frame};

/// A connection to a control endpoint.
///
/// Requests are answered strictly in order, one reply per request.
#[derive(Debug)]
pub struct Client {
    stream: UnixStream,
}

impl Client {
    /// Connect to the control socket at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> io::Result<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self { stream })
    }

    /// Send a command and its arguments, returning the reply text.
    ///
    /// Reply bytes that are not valid UTF-8 are replaced rather than
    /// rejected.
    pub async fn send<I, S>(&mut self, fields: I) -> io::Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reply = self.request(encode_request(fields).as_bytes()).await?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /// Send a raw request payload and return the raw reply payload.
    pub async fn request(&mut self, payload: &[u8]) -> io::Result<Bytes> {
        write_frame(&mut self.stream, payload).await?;
        read_frame(&mut self.stream).await
    }
}

/// Join request fields with the field separator.
pub fn encode_request<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut request = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            request.push(FIELD_SEPARATOR);
        }
        request.push_str(field.as_ref());
    }
    request
}
