//! Incubator and pen state machines for the Delve player economy.
//!
//! Structures hold exactly one inventory item and run a time-based state
//! machine over it. Time is always passed in explicitly as Unix seconds, so
//! every state is a pure function of its persisted fields and the clock.
//!
//! # Modules
//!
//! - [`catalog`] -- Species pools, hatch durations, income tables ([`Catalog`])
//! - [`engine`] -- Per-player [`StructureEngine`]: ownership and transactional moves
//! - [`error`] -- Error types for structure operations ([`StructureError`])
//! - [`incubator`] -- Incubation countdown, speed-up, and unit creation
//! - [`pen`] -- Computed income accrual

pub mod catalog;
pub mod engine;
pub mod error;
pub mod incubator;
pub mod pen;

pub use catalog::{Catalog, DEFAULT_FALLBACK_SPECIES, DEFAULT_HATCH_SECONDS, SpeciesDef};
pub use engine::{Released, RemovedUnit, StructureEngine};
pub use error::StructureError;
