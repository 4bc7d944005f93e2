//! Pen accrual: income is computed from elapsed time, never ticked.
//!
//! `Accrued(now) = floor(IncomePerSecond x (now - LastCollectTime))`.
//! Because the only input besides the clock is the persisted
//! `last_collect_time`, accrual is restart-safe.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use delve_types::{PenState, StructureId, UnitDescriptor};

use crate::catalog::Catalog;
use crate::error::{StructureError, overflow};

/// Occupy a pen with `unit` at `now`.
pub fn place(structure_id: StructureId, unit: UnitDescriptor, now: i64) -> PenState {
    PenState {
        structure_id,
        unit_id: unit.id,
        unit,
        placed_time: now,
        last_collect_time: now,
    }
}

/// Seconds since the last collection, clamped at zero.
pub fn seconds_since_collect(state: &PenState, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(state.last_collect_time)).unwrap_or(0)
}

/// Income per second of the pen's unit.
///
/// # Errors
///
/// Returns [`StructureError::ArithmeticOverflow`] on decimal overflow.
pub fn income_per_second(state: &PenState, catalog: &Catalog) -> Result<Decimal, StructureError> {
    catalog
        .income_per_second(&state.unit)
        .ok_or_else(|| overflow("income per second"))
}

/// Whole currency accrued since the last collection.
///
/// # Errors
///
/// Returns [`StructureError::ArithmeticOverflow`] if the amount does not fit
/// in a `u64`.
pub fn accrued(state: &PenState, catalog: &Catalog, now: i64) -> Result<u64, StructureError> {
    let rate = income_per_second(state, catalog)?;
    let elapsed = Decimal::from(seconds_since_collect(state, now));
    rate.checked_mul(elapsed)
        .ok_or_else(|| overflow("accrued income"))?
        .floor()
        .to_u64()
        .ok_or_else(|| overflow("accrued income to u64"))
}
