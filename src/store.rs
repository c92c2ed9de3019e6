//! The shared store bundle and its lock discipline.
//!
//! A [`Store`] owns the document and the query cache behind one exclusive
//! lock. Every query, read or write, holds the lock for its entire
//! evaluation, which linearizes all queries and makes the cache contract
//! sound: a hit can only be served while no write has cleared the cache
//! since the entry was inserted.
//!
//! The server injects a handle to this bundle rather than reaching for
//! globals; the serialization discipline is the lock, not globality. The
//! persistence loop contends for the same lock only briefly, to snapshot the
//! root and clear the dirty flag; disk I/O happens elsewhere.

use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::cache::QueryCache;
use crate::document::Document;
use crate::error::{ApocryphaError, Result};
use crate::query::{self, Engine, Query};

pub struct Store {
    state: Mutex<State>,
}

struct State {
    document: Document,
    cache: QueryCache,
}

impl Store {
    pub fn new(document: Document, cache_capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                document,
                cache: QueryCache::new(cache_capacity),
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| ApocryphaError::Lock(e.to_string()))
    }

    /// Evaluates one query and returns the raw response body: output lines
    /// joined by `\n` with a trailing `\n`, the empty string for empty
    /// output, or a one-line `error: …` rendering of the failure.
    pub fn execute(&self, tokens: &[String]) -> String {
        match self.query_lines(tokens) {
            Ok(lines) if lines.is_empty() => String::new(),
            Ok(lines) => {
                let mut body = lines.join("\n");
                body.push('\n');
                body
            }
            Err(error @ ApocryphaError::Client(_)) => error.to_string(),
            Err(error) => {
                warn!(%error, "query failed");
                "error: internal".to_owned()
            }
        }
    }

    /// Evaluates one query and returns its output lines.
    ///
    /// Pure reads are served from the cache when possible and inserted on a
    /// miss; write verbs clear the cache whether they succeed or not.
    pub fn query_lines(&self, tokens: &[String]) -> Result<Vec<String>> {
        let tokens = query::canonicalize(tokens);
        let mut state = self.state()?;
        let parsed = Query::parse(&tokens)?;
        if parsed.verb.is_pure_read() {
            if let Some(hit) = state.cache.get(&tokens) {
                return Ok(hit.to_vec());
            }
        }
        let outcome = Engine::new(&mut state.document).evaluate(&parsed);
        match outcome {
            Ok(evaluation) => {
                if parsed.verb.is_pure_read() {
                    state.cache.insert(tokens, evaluation.lines.clone());
                } else {
                    state.cache.clear();
                }
                Ok(evaluation.lines)
            }
            Err(error) => {
                if !parsed.verb.is_pure_read() {
                    state.cache.clear();
                }
                Err(error)
            }
        }
    }

    pub fn generation(&self) -> Result<u64> {
        Ok(self.state()?.document.generation())
    }

    pub fn is_dirty(&self) -> Result<bool> {
        Ok(self.state()?.document.dirty())
    }

    pub fn cache_len(&self) -> Result<usize> {
        Ok(self.state()?.cache.len())
    }

    pub fn mark_dirty(&self) -> Result<()> {
        self.state()?.document.mark_dirty();
        Ok(())
    }

    /// Serializes the root under the lock and clears the dirty flag,
    /// returning `None` when there is nothing to flush. The caller performs
    /// the actual disk write without holding the lock.
    pub fn snapshot_if_dirty(&self) -> Result<Option<Vec<u8>>> {
        let mut state = self.state()?;
        if !state.document.dirty() {
            return Ok(None);
        }
        let bytes = serde_json::to_vec(state.document.root())
            .map_err(|e| ApocryphaError::Internal(e.to_string()))?;
        state.document.clear_dirty();
        Ok(Some(bytes))
    }
}
