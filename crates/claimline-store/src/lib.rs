//! Claimline Storage Layer
//!
//! Implementations of the storage and messaging collaborators defined in
//! `claimline-domain`.
//!
//! # Architecture
//!
//! - [`SqliteKvStore`]: JSON documents in SQLite, with conditional creates
//!   and transactional field-level updates
//! - [`MemoryObjectStore`] / [`FsObjectStore`]: blob storage keyed by path
//!   prefixes, with metadata and modification times
//! - [`MemoryEventBus`] / [`LogEventBus`]: notification sinks
//! - [`MemoryParameterStore`] / [`DirParameterStore`]: prompt templates
//!
//! # Examples
//!
//! ```no_run
//! use claimline_store::SqliteKvStore;
//! use claimline_domain::traits::{KeyValueStore, PutOutcome};
//!
//! let store = SqliteKvStore::in_memory().unwrap();
//! let doc = serde_json::json!({ "claim_id": "..." });
//! let outcome = store.put_if_absent("MAPPING#CLM-1", doc.as_object().unwrap().clone()).unwrap();
//! assert_eq!(outcome, PutOutcome::Created);
//! ```

#![warn(missing_docs)]

mod bus;
mod error;
mod objects;
mod params;
mod sqlite;

pub use bus::{LogEventBus, MemoryEventBus, PublishedEvent};
pub use error::StoreError;
pub use objects::{FsObjectStore, MemoryObjectStore};
pub use params::{DirParameterStore, MemoryParameterStore};
pub use sqlite::SqliteKvStore;
