//! Session orchestration and persistence for the Delve server.
//!
//! This crate ties the economy and structure crates to durable storage:
//! a [`PersistenceGateway`] turns stored records into live
//! [`PlayerSession`]s on join and folds them back into records on autosave,
//! leave, and shutdown.
//!
//! # Modules
//!
//! - [`config`] -- `delve.yaml` loading and typed configuration
//! - [`clock`] -- Wall-clock seconds for accrual timers
//! - [`hooks`] -- Best-effort event hooks and the injected capability set
//! - [`session`] -- One player's live state and gameplay operations
//! - [`session_store`] -- Live sessions keyed by player
//! - [`gateway`] -- Join, collect, save, leave, autosave, shutdown flush
//! - [`shutdown`] -- Process-wide shutdown signal
//! - [`error`] -- Shared error types

pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hooks;
pub mod session;
pub mod session_store;
pub mod shutdown;

// Re-export primary types for convenience.
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    BackendKind, ConfigError, InventoryConfig, LoggingConfig, PersistenceConfig, ServerConfig,
    StorageConfig,
};
pub use error::{ActionError, GatewayError};
pub use gateway::{JoinOrigin, Joined, PersistenceGateway, SaveOutcome, SaveSummary};
pub use hooks::{Capabilities, EventHooks, NoopHooks};
pub use session::{HatchOutcome, MiningOutcome, PlayerSession};
pub use session_store::{PlayerSessionStore, SessionHandle};
pub use shutdown::ShutdownSignal;
