//! Best-effort notifications to optional collaborators.
//!
//! Tutorial progress, UI refreshes, and analytics want to hear about
//! economy changes, but none of them is authoritative: a hook runs after
//! the state change has been applied and cannot veto it. The server wires
//! its collaborators into a [`Capabilities`] set once at startup; anything
//! not wired gets [`NoopHooks`].

use std::fmt;
use std::sync::Arc;

use delve_economy::OreAdded;
use delve_types::{EggDescriptor, IncubatorState, PenState, PlayerId, StructureId, UnitDescriptor};

use crate::clock::{Clock, SystemClock};

/// Receiver for session events. Every method defaults to doing nothing.
pub trait EventHooks: Send + Sync {
    /// A session was created. `unsaved_baseline` is set when the stored
    /// record could not be loaded.
    fn session_started(&self, _player: PlayerId, _unsaved_baseline: bool) {}

    /// A session was discarded after its leave sequence.
    fn session_ended(&self, _player: PlayerId) {}

    /// An ore went into the backpack.
    fn ore_added(&self, _player: PlayerId, _kind: &str, _added: &OreAdded) {}

    /// An ore kind was mined for the first time.
    fn ore_discovered(&self, _player: PlayerId, _kind: &str) {}

    /// A mining hit was dropped because the backpack is full.
    fn backpack_full(&self, _player: PlayerId, _capacity: u32) {}

    /// The backpack was sold.
    fn sold(&self, _player: PlayerId, _amount: u64, _currency: u64) {}

    /// An egg was added to inventory.
    fn egg_granted(&self, _player: PlayerId, _egg: &EggDescriptor) {}

    /// An egg started incubating.
    fn egg_placed(&self, _player: PlayerId, _state: &IncubatorState) {}

    /// An egg hatched into a unit.
    fn hatched(
        &self,
        _player: PlayerId,
        _structure: StructureId,
        _unit: &UnitDescriptor,
        _first_discovery: bool,
    ) {
    }

    /// A unit was placed in a pen.
    fn unit_placed(&self, _player: PlayerId, _state: &PenState) {}

    /// Pen income was paid into currency.
    fn income_collected(
        &self,
        _player: PlayerId,
        _structure: StructureId,
        _amount: u64,
        _currency: u64,
    ) {
    }

    /// A save attempt finished.
    fn record_saved(&self, _player: PlayerId, _ok: bool) {}
}

/// Hooks that ignore every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl EventHooks for NoopHooks {}

/// Collaborators injected into sessions and the gateway at startup.
#[derive(Clone)]
pub struct Capabilities {
    /// Event receiver.
    pub hooks: Arc<dyn EventHooks>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Fixed RNG seed for hatch rolls; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Capabilities {
    /// Replace the event receiver.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn EventHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed hatch rolls deterministically.
    #[must_use]
    pub const fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Current Unix time in seconds.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            hooks: Arc::new(NoopHooks),
            clock: Arc::new(SystemClock),
            rng_seed: None,
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("now", &self.clock.now())
            .field("rng_seed", &self.rng_seed)
            .finish_non_exhaustive()
    }
}
