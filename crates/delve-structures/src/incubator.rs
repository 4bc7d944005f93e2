//! Incubator timing: `Empty -> Occupied -> Ready -> Empty`.
//!
//! An incubator is ready once `hatch_duration_seconds` have elapsed since
//! `start_time`. Readiness is derived from the clock every time it is asked
//! for, never stored, so a restored state resumes its countdown exactly.

use delve_types::{EggDescriptor, IncubatorState, StructureId, UnitDescriptor, UnitId};

use crate::error::{StructureError, overflow};

/// Occupy an incubator with `egg`, starting the countdown at `now`.
pub fn start(
    structure_id: StructureId,
    egg: EggDescriptor,
    hatch_duration_seconds: u64,
    now: i64,
) -> IncubatorState {
    IncubatorState {
        structure_id,
        egg_id: egg.id,
        egg,
        start_time: now,
        hatch_duration_seconds,
    }
}

/// Seconds elapsed since incubation started, clamped at zero when the
/// clock reads earlier than the start.
pub fn elapsed(state: &IncubatorState, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(state.start_time)).unwrap_or(0)
}

/// `max(0, HatchDuration - (now - StartTime))`.
pub fn time_remaining(state: &IncubatorState, now: i64) -> u64 {
    state
        .hatch_duration_seconds
        .saturating_sub(elapsed(state, now))
}

/// Whether the egg can hatch at `now`.
pub fn is_ready(state: &IncubatorState, now: i64) -> bool {
    time_remaining(state, now) == 0
}

/// Rewind `start_time` so the egg is ready at `now`.
///
/// # Errors
///
/// Returns [`StructureError::ArithmeticOverflow`] if the rewound start time
/// does not fit in an `i64`.
pub fn speed_up(state: &mut IncubatorState, now: i64) -> Result<(), StructureError> {
    let duration =
        i64::try_from(state.hatch_duration_seconds).map_err(|_e| overflow("hatch duration"))?;
    state.start_time = now
        .checked_sub(duration)
        .ok_or_else(|| overflow("speed-up start time"))?;
    Ok(())
}

/// Build the level-1 unit a completed hatch produces.
pub fn hatch_unit(egg: &EggDescriptor, species_id: String, now: i64) -> UnitDescriptor {
    UnitDescriptor {
        id: UnitId::new(),
        species_id,
        rarity: egg.rarity,
        variant: egg.variant,
        level: 1,
        hatched_at: now,
    }
}

#[cfg(test)]
mod tests {
    use delve_types::{EggId, Rarity, Variant};

    use super::*;

    fn egg() -> EggDescriptor {
        EggDescriptor {
            id: EggId::new(),
            rarity: Rarity::Common,
            variant: Variant::Rainbow,
            acquired_at: 0,
        }
    }

    #[test]
    fn countdown_reaches_zero_at_duration() {
        let state = start(StructureId::new(), egg(), 30, 0);
        assert_eq!(time_remaining(&state, 0), 30);
        assert_eq!(time_remaining(&state, 29), 1);
        assert!(!is_ready(&state, 29));
        assert!(is_ready(&state, 30));
        assert_eq!(time_remaining(&state, 31), 0);
    }

    #[test]
    fn clock_before_start_counts_as_no_progress() {
        let state = start(StructureId::new(), egg(), 30, 100);
        assert_eq!(time_remaining(&state, 50), 30);
    }

    #[test]
    fn speed_up_makes_ready_immediately() {
        let mut state = start(StructureId::new(), egg(), 600, 10);
        assert!(!is_ready(&state, 11));
        assert!(speed_up(&mut state, 11).is_ok());
        assert!(is_ready(&state, 11));
        assert_eq!(state.start_time, -589);
    }

    #[test]
    fn hatched_unit_inherits_egg_traits() {
        let source = egg();
        let unit = hatch_unit(&source, String::from("beetle"), 42);
        assert_eq!(unit.level, 1);
        assert_eq!(unit.variant, Variant::Rainbow);
        assert_eq!(unit.rarity, Rarity::Common);
        assert_eq!(unit.hatched_at, 42);
    }
}
