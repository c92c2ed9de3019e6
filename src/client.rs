//! Client API object for talking to a running server.
//!
//! [`Client`] speaks the framed wire protocol over a plain blocking
//! `TcpStream`, reconnecting lazily after a network failure, and offers the
//! typed helpers downstream code actually wants (`get`, `set`, `append`,
//! `remove`, `keys`, `delete`, `pop`) on top of the raw [`Client::query`].
//! Error responses from the server surface as
//! [`ApocryphaError::Client`](crate::error::ApocryphaError).

use std::io::{Read, Write};
use std::net::TcpStream;

use crate::error::{ApocryphaError, Result};

pub const DEFAULT_PORT: u16 = 9999;

pub struct Client {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

impl Client {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: None,
        }
    }

    pub fn localhost(port: u16) -> Self {
        Self::new("127.0.0.1", port)
    }

    /// Sends raw query tokens and returns the response lines.
    pub fn query<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<Vec<String>> {
        let body = match self.round_trip(tokens) {
            Ok(body) => body,
            Err(error) => {
                // force a reconnect on the next query
                self.stream = None;
                return Err(error);
            }
        };
        if let Some(message) = body.strip_prefix("error: ") {
            return Err(ApocryphaError::Client(message.trim_end().to_owned()));
        }
        Ok(body
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Retrieves a value as JSON; an absent key reads as an empty object.
    pub fn get(&mut self, keys: &[&str]) -> Result<serde_json::Value> {
        let mut tokens = keys.to_vec();
        tokens.push("--edit");
        let text = self.query(&tokens)?.concat();
        serde_json::from_str(&text)
            .map_err(|e| ApocryphaError::Protocol(format!("malformed response: {e}")))
    }

    /// Stores any JSON-serializable value at the given key path.
    pub fn set(&mut self, keys: &[&str], value: &serde_json::Value) -> Result<()> {
        let text = value.to_string();
        let mut tokens = keys.to_vec();
        tokens.push("--set");
        tokens.push(&text);
        self.query(&tokens).map(|_| ())
    }

    pub fn keys(&mut self, keys: &[&str]) -> Result<Vec<String>> {
        let mut tokens = keys.to_vec();
        tokens.push("--keys");
        self.query(&tokens)
    }

    pub fn delete(&mut self, keys: &[&str]) -> Result<()> {
        let mut tokens = keys.to_vec();
        tokens.push("--del");
        self.query(&tokens).map(|_| ())
    }

    /// Appends values to a list; appending to a string makes a list of both.
    pub fn append(&mut self, keys: &[&str], values: &[&str]) -> Result<()> {
        let mut tokens = keys.to_vec();
        tokens.push("+");
        tokens.extend_from_slice(values);
        self.query(&tokens).map(|_| ())
    }

    /// Removes values from a list; every value must be present.
    pub fn remove(&mut self, keys: &[&str], values: &[&str]) -> Result<()> {
        let mut tokens = keys.to_vec();
        tokens.push("-");
        tokens.extend_from_slice(values);
        self.query(&tokens).map(|_| ())
    }

    /// Displays and removes the tail of the value at the given key path.
    pub fn pop(&mut self, keys: &[&str]) -> Result<Option<String>> {
        let mut tokens = keys.to_vec();
        tokens.push("--pop");
        Ok(self.query(&tokens)?.into_iter().next())
    }

    fn round_trip<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<String> {
        let mut payload = String::new();
        for token in tokens {
            payload.push_str(token.as_ref());
            payload.push('\n');
        }
        let stream = self.connection()?;
        write_frame(stream, payload.as_bytes())?;
        read_frame(stream)
    }

    fn connection(&mut self) -> Result<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = TcpStream::connect((self.host.as_str(), self.port))
                .map_err(|e| ApocryphaError::Protocol(format!("could not connect: {e}")))?;
            self.stream = Some(stream);
        }
        match self.stream.as_mut() {
            Some(stream) => Ok(stream),
            None => Err(ApocryphaError::Internal("connection vanished".to_owned())),
        }
    }
}

fn write_frame(stream: &mut TcpStream, body: &[u8]) -> Result<()> {
    let length = body.len() as u32;
    stream
        .write_all(&length.to_be_bytes())
        .and_then(|_| stream.write_all(body))
        .map_err(|e| ApocryphaError::Protocol(e.to_string()))
}

fn read_frame(stream: &mut TcpStream) -> Result<String> {
    let mut length_bytes = [0u8; 4];
    stream
        .read_exact(&mut length_bytes)
        .map_err(|e| ApocryphaError::Protocol(e.to_string()))?;
    let length = u32::from_be_bytes(length_bytes) as usize;
    let mut body = vec![0u8; length];
    stream
        .read_exact(&mut body)
        .map_err(|e| ApocryphaError::Protocol(e.to_string()))?;
    String::from_utf8(body)
        .map_err(|_| ApocryphaError::Protocol("response body is not valid utf-8".to_owned()))
}
