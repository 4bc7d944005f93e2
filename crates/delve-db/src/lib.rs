//! Durable storage for Delve player records.
//!
//! One JSON document per player, written whole on every save. Storage is
//! reached through the [`StorageBackend`] trait so the server can run
//! against `Dragonfly` in production and an in-process map in development
//! and tests.
//!
//! # Architecture
//!
//! ```text
//! PersistenceGateway
//!     |
//!     +-- RecordStore ---- load: get -> migrate
//!         |                save: serialize -> set
//!         |
//!         +-- with_retry (RetryBudget: attempts | deadline)
//!             |
//!             +-- StorageBackend
//!                 |-- DragonflyBackend  (fred)
//!                 +-- MemoryBackend     (tests, local dev)
//! ```
//!
//! # Modules
//!
//! - [`backend`] -- The storage trait
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) backend
//! - [`memory`] -- In-process backend with failure injection
//! - [`retry`] -- Attempt- and deadline-bounded retry
//! - [`migration`] -- Schema upgrade and lenient decode of stored records
//! - [`record_store`] -- Player record load/save
//! - [`error`] -- Shared error types

pub mod backend;
pub mod dragonfly;
pub mod error;
pub mod memory;
pub mod migration;
pub mod record_store;
pub mod retry;

// Re-export primary types for convenience.
pub use backend::StorageBackend;
pub use dragonfly::DragonflyBackend;
pub use error::{MigrationError, StorageError};
pub use memory::MemoryBackend;
pub use migration::{Migrated, UNSORTED_ORE_KIND, migrate};
pub use record_store::{DEFAULT_KEY_PREFIX, LoadedRecord, RecordOrigin, RecordStore};
pub use retry::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryBudget, RetryPolicy, with_retry};
