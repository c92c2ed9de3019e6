//! Line-framed TCP server.
//!
//! A request is a 4-byte big-endian length followed by that many bytes of
//! UTF-8: the query tokens joined by `\n`. The response uses the same
//! framing; an empty body is a valid response. Socket I/O and framing happen
//! outside the store's lock; the lock is held only for the evaluation
//! itself, inside [`Store::execute`].
//!
//! Protocol violations (oversize length, bad UTF-8, truncated frames) close
//! the connection without a response. A client that disconnects while the
//! response is being written loses the response silently; its mutation, if
//! any, stands.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{ApocryphaError, Result};
use crate::store::Store;

/// Frames longer than this are rejected as a protocol error.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Accepts connections forever, one task per client.
pub async fn serve(listener: TcpListener, store: Arc<Store>) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!(%error, "accept failed");
                continue;
            }
        };
        debug!(%peer, "client connected");
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            match handle_connection(stream, store).await {
                Ok(()) => debug!(%peer, "client disconnected"),
                Err(error) => warn!(%peer, %error, "connection closed"),
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, store: Arc<Store>) -> Result<()> {
    loop {
        let payload = match read_frame(&mut stream).await? {
            Some(payload) => payload,
            None => return Ok(()),
        };
        let tokens = parse_tokens(&payload);
        let started = Instant::now();
        // the engine is synchronous
        let store_for_query = Arc::clone(&store);
        let query_tokens = tokens.clone();
        let response = tokio::task::spawn_blocking(move || store_for_query.execute(&query_tokens))
            .await
            .map_err(|error| ApocryphaError::Internal(error.to_string()))?;
        info!(
            micros = started.elapsed().as_micros() as u64,
            cached = store.cache_len().unwrap_or(0),
            query = %shown(&tokens),
            "query complete"
        );
        write_frame(&mut stream, response.as_bytes()).await?;
    }
}

/// Splits a request body into tokens, dropping empty elements.
pub fn parse_tokens(payload: &str) -> Vec<String> {
    payload
        .split('\n')
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

async fn read_frame(stream: &mut TcpStream) -> Result<Option<String>> {
    let mut length_bytes = [0u8; 4];
    match stream.read_exact(&mut length_bytes).await {
        Ok(_) => (),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(ApocryphaError::Protocol(e.to_string())),
    }
    let length = u32::from_be_bytes(length_bytes) as usize;
    if length > MAX_FRAME_LEN {
        return Err(ApocryphaError::Protocol(format!(
            "frame of {length} bytes exceeds the limit"
        )));
    }
    let mut body = vec![0u8; length];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|e| ApocryphaError::Protocol(e.to_string()))?;
    String::from_utf8(body)
        .map(Some)
        .map_err(|_| ApocryphaError::Protocol("request body is not valid utf-8".to_owned()))
}

async fn write_frame(stream: &mut TcpStream, body: &[u8]) -> Result<()> {
    let length = body.len() as u32;
    stream
        .write_all(&length.to_be_bytes())
        .await
        .map_err(|e| ApocryphaError::Protocol(e.to_string()))?;
    stream
        .write_all(body)
        .await
        .map_err(|e| ApocryphaError::Protocol(e.to_string()))
}

fn shown(tokens: &[String]) -> String {
    let rendered = format!("{tokens:?}");
    rendered.chars().take(72).collect()
}
