//! Accounting core of a pooled-liquidity market maker.
//!
//! Liquidity providers deposit into a shared pool; the pool commits a slice
//! of its liquidity to each new prediction-market event and distributes the
//! event's result back across providers proportional to the shares they held
//! when the event was created.
//!
//! The engine guarantees:
//! 1. Conservation - `balance * precision` always backs the free, entry and
//!    withdrawable reserves; the pool never promises more than it holds.
//! 2. Solvency-preserving rounding - irreducible dust always settles toward
//!    the pool, never toward a provider.
//! 3. Atomicity - every operation validates before mutating; a rejected
//!    operation leaves the state byte-identical.
//! 4. Exposure ordering - a position is only exposed to events created
//!    strictly after it joined, ordered by the pool-wide counter.
//!
//! The engine is single-threaded and purely sequential by contract: it never
//! performs I/O, never reads a clock, and expects the caller to serialize
//! operations and supply logical time explicitly.

#![forbid(unsafe_code)]

pub mod error;
pub mod math;
pub mod state;

mod claims;
mod lifecycle;
mod scheduler;
mod settlement;

pub use error::{Invariant, PoolError};
pub use state::{Claim, ClaimKey, Entry, Event, Line, Payment, PoolModel, Position};
