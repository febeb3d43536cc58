//! Error taxonomy for the pool engine.
//!
//! Two classes with very different meanings:
//! - [`PoolError`] precondition variants reject one operation with no state
//!   change; the reason strings are stable so callers can assert on *why*
//!   an operation failed.
//! - [`Invariant`] means the conservation guarantee itself is broken. That
//!   is a defect in the engine, not a recoverable condition, and the caller
//!   must abort rather than retry.

use thiserror::Error;

/// Why an operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("unknown entry {0}")]
    UnknownEntry(u64),
    #[error("entry {id} is locked until {accept_after}")]
    EntryLocked { id: u64, accept_after: i64 },
    #[error("entry amount exceeds recorded entry liquidity")]
    EntryLiquidityMismatch,
    #[error("entry lock period must not be negative")]
    NegativeLockPeriod,
    #[error("unknown line {0}")]
    UnknownLine(u64),
    #[error("line {0} is paused")]
    LinePaused(u64),
    #[error("invalid line parameters")]
    InvalidLineParams,
    #[error("unknown position {0}")]
    UnknownPosition(u64),
    #[error("unknown event {0}")]
    UnknownEvent(u64),
    #[error("event {0} already exists")]
    DuplicateEvent(u64),
    #[error("event {0} is already resolved")]
    EventAlreadyResolved(u64),
    #[error("event {0} is not resolved")]
    EventNotResolved(u64),
    #[error("unknown claim for event {event_id} and position {position_id}")]
    UnknownClaim { event_id: u64, position_id: u64 },
    #[error("duplicate claim for event {event_id} and position {position_id}")]
    DuplicateClaim { event_id: u64, position_id: u64 },
    #[error("claim shares exceed position shares")]
    SharesExceedPosition,
    #[error("no event capacity available")]
    NoCapacity,
    #[error("pool has no shares")]
    NoShares,
    #[error("pool has shares but no liquidity")]
    NoLiquidity,
    #[error("invariant violated: {0}")]
    Invariant(#[from] Invariant),
}

impl PoolError {
    /// True when the failure indicates a broken conservation guarantee
    /// rather than a rejected operation.
    pub fn is_invariant(&self) -> bool {
        matches!(self, PoolError::Invariant(_))
    }
}

/// Fatal conservation breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Invariant {
    #[error("pool balance went negative")]
    NegativeBalance,
    #[error("active liquidity went negative")]
    NegativeActiveLiquidity,
    #[error("withdrawable liquidity went negative")]
    NegativeWithdrawable,
    #[error("total shares went negative")]
    NegativeTotalShares,
    #[error("position shares went negative")]
    NegativePositionShares,
    #[error("locked shares exceed event total shares")]
    LockedSharesExceeded,
    #[error("event schedule moved backwards")]
    ScheduleRegression,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
}
