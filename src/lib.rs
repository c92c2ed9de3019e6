//! Apocrypha – an in-memory, schema-less document store keyed by paths
//! through nested mappings.
//!
//! Clients connect over TCP, send a small token-based query language that
//! traverses and mutates a single JSON document root, and receive textual
//! results. The store is read-heavy by design: the whole document lives in
//! memory, pure reads are memoized in a query cache, and writes are batched
//! to disk once per flush interval by a write-behind loop.
//!
//! ## Modules
//! * [`datum`] – The [`datum::Datum`] value (string, list of strings, or
//!   insertion-ordered mapping) and its renderings.
//! * [`document`] – The owning root mapping with its dirty flag and write
//!   generation; read and write path walks; invariant normalization.
//! * [`query`] – The token-based query language: parsing, verb dispatch and
//!   the [`query::Engine`] evaluating one query at a time.
//! * [`cache`] – The bounded pure-read query cache, cleared whole by every
//!   write.
//! * [`store`] – The [`store::Store`] bundle holding document and cache
//!   behind one exclusive lock; every query is atomic under it.
//! * [`persist`] – Snapshot loading and the write-behind [`persist::Flusher`]
//!   (temp file + fsync + atomic rename, at most once per interval).
//! * [`server`] – The length-prefixed TCP server.
//! * [`client`] – A blocking client API object speaking the wire protocol.
//! * [`error`] – The crate-wide error taxonomy.
//!
//! ## Consistency
//! A single process-wide lock serializes every query, read or write, for the
//! whole of its evaluation. This yields per-query atomicity and one total
//! order observed by all clients. The cache is sound because any write
//! clears it entirely before the write is acknowledged.
//!
//! ## Quick Start
//! ```
//! use apocrypha::datum::Mapping;
//! use apocrypha::document::Document;
//! use apocrypha::store::Store;
//!
//! let store = Store::new(Document::new(Mapping::new()), 1024);
//! let assign: Vec<String> = ["fruit", "=", "apple"].iter().map(|t| t.to_string()).collect();
//! assert_eq!(store.execute(&assign), "");
//! let index = vec!["fruit".to_string()];
//! assert_eq!(store.execute(&index), "apple\n");
//! ```
//!
//! ## License
//! Dual licensed under Apache-2.0 and MIT.

pub mod cache;
pub mod client;
pub mod datum;
pub mod document;
pub mod error;
pub mod persist;
pub mod query;
pub mod server;
pub mod store;
