//! Memoization of pure-read query output.
//!
//! The cache maps a canonical token sequence (aliases already expanded) to
//! the output lines the engine produced for it. Only pure-read queries are
//! inserted, and every write-verb query clears the whole cache. Full
//! invalidation on write is the entire consistency argument, so the eviction
//! policy below only bounds memory and is free to stay simple.

use std::collections::{HashMap, VecDeque};

use crate::datum::KeyHasher;

pub const DEFAULT_CAPACITY: usize = 1024;

pub struct QueryCache {
    kept: HashMap<Vec<String>, Vec<String>, KeyHasher>,
    arrival: VecDeque<Vec<String>>,
    capacity: usize,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            kept: HashMap::default(),
            arrival: VecDeque::new(),
            capacity,
        }
    }

    pub fn get(&self, key: &[String]) -> Option<&[String]> {
        self.kept.get(key).map(Vec::as_slice)
    }

    /// Remembers the output for a key, evicting the oldest entry once the
    /// configured capacity is exceeded.
    pub fn insert(&mut self, key: Vec<String>, output: Vec<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.kept.insert(key.clone(), output).is_none() {
            self.arrival.push_back(key);
            if self.arrival.len() > self.capacity {
                if let Some(oldest) = self.arrival.pop_front() {
                    self.kept.remove(&oldest);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.kept.clear();
        self.arrival.clear();
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}
