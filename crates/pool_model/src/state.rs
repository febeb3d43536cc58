//! Ledger entities and the pool state snapshot.
//!
//! All entities live in owned, id-addressed collections on [`PoolModel`];
//! mutation always goes through the operation methods, never through shared
//! references. The whole model serializes to JSON and round-trips every
//! field, including the optional event `result`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Invariant, PoolError};
use crate::math::{self, mul, mul_div_floor, PRECISION};

/// A recurring event template. Spawns events on a `bets_period` cadence;
/// its capacity contributes to the pool-wide `max_events` while unpaused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub measure_period: i64,
    pub bets_period: i64,
    pub last_bets_close_time: i64,
    pub max_events: u64,
    pub is_paused: bool,
    pub min_betting_period: i64,
}

impl Line {
    /// Catch-up scheduling: advance the close time by whole `bets_period`
    /// multiples until it is at or past `now`, then push one more period if
    /// the remaining betting window would be too short. Late invocation must
    /// not drift the cadence.
    pub fn advance_close_time(&mut self, now: i64) -> Result<(), Invariant> {
        let periods = if now < self.last_bets_close_time {
            1
        } else {
            (now - self.last_bets_close_time) / self.bets_period + 1
        };
        self.last_bets_close_time += self.bets_period * periods;

        let time_to_close = self.last_bets_close_time - now;
        if time_to_close < 0 {
            return Err(Invariant::ScheduleRegression);
        }
        if time_to_close < self.min_betting_period {
            self.last_bets_close_time += self.bets_period;
        }
        Ok(())
    }

    /// Time from `now` until the event spawned at the current close time
    /// would be measured.
    pub fn duration(&self, now: i64) -> i64 {
        self.measure_period + self.last_bets_close_time - now
    }
}

/// One market round with a snapshot of the pool shares that funded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Global counter value at creation; orders this event against positions.
    pub created_counter: u64,
    /// Pool `total_shares` divided evenly across capacity slots at creation.
    pub shares: i128,
    /// Pool `total_shares` at creation.
    pub total_shares: i128,
    /// Shares already claimed by exiting providers, pending resolution.
    pub locked_shares: i128,
    /// Final settlement amount; set exactly once by `pay_reward`.
    pub result: Option<i128>,
    /// Liquidity committed at creation, in base units.
    pub provided: i128,
}

impl Event {
    /// F-scaled portion of the final result attributable to `shares`, floored.
    /// Zero while unresolved.
    pub fn result_for_shares_f(&self, shares: i128, precision: i128) -> Result<i128, Invariant> {
        let result = self.result.unwrap_or(0);
        mul_div_floor(mul(result, shares)?, precision, self.total_shares)
    }

    /// F-scaled portion of the committed liquidity attributable to `shares`,
    /// floored.
    pub fn provided_for_shares_f(&self, shares: i128, precision: i128) -> Result<i128, Invariant> {
        mul_div_floor(mul(self.provided, shares)?, precision, self.total_shares)
    }
}

/// An approved, share-holding stake owned by one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub provider: String,
    pub shares: i128,
    /// Counter value when the position joined; events created at or before
    /// this value never expose the position.
    pub added_counter: u64,
}

/// A deposit pending its time lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub provider: String,
    pub amount: i128,
    pub accept_after: i64,
}

/// Shares a withdrawing position has committed to a still-open event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub provider: String,
    pub shares: i128,
}

/// Composite identity of one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimKey {
    pub event_id: u64,
    pub position_id: u64,
}

/// A transfer instruction for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub provider: String,
    pub amount: i128,
}

/// The pool state snapshot. One consistent snapshot goes into every
/// operation; the mutated snapshot plus zero or more [`Payment`]s come out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolModel {
    pub lines: BTreeMap<u64, Line>,
    pub events: BTreeMap<u64, Event>,
    pub active_events: BTreeSet<u64>,
    pub positions: BTreeMap<u64, Position>,
    pub entries: BTreeMap<u64, Entry>,
    #[serde(with = "claim_map")]
    pub claims: BTreeMap<ClaimKey, Claim>,

    /// Total proportional ownership units currently outstanding.
    pub total_shares: i128,
    /// F-scaled value committed to open events.
    pub active_liquidity_f: i128,
    /// F-scaled value owed against resolved claims, not yet paid.
    pub withdrawable_liquidity_f: i128,
    /// Base-unit custodial total.
    pub balance: i128,
    /// Duration-weighted contribution consumed by incentive accounting.
    pub liquidity_units: i128,

    /// Logical clock ordering positions against events.
    pub counter: u64,
    /// Pool-wide capacity slots contributed by unpaused lines.
    pub max_events: u64,
    pub entry_lock_period: i64,
    pub precision: i128,
    /// Caller-supplied logical time of the last time-dependent operation.
    pub now: i64,

    pub next_entry_id: u64,
    pub next_position_id: u64,
    pub next_line_id: u64,
}

impl PoolModel {
    pub fn new(precision: i128, entry_lock_period: i64) -> Self {
        PoolModel {
            lines: BTreeMap::new(),
            events: BTreeMap::new(),
            active_events: BTreeSet::new(),
            positions: BTreeMap::new(),
            entries: BTreeMap::new(),
            claims: BTreeMap::new(),
            total_shares: 0,
            active_liquidity_f: 0,
            withdrawable_liquidity_f: 0,
            balance: 0,
            liquidity_units: 0,
            counter: 0,
            max_events: 0,
            entry_lock_period,
            precision,
            now: 0,
            next_entry_id: 0,
            next_position_id: 0,
            next_line_id: 0,
        }
    }

    /// F-scaled sum of all pending entry amounts. Entry capital is held in
    /// custody but does not buy shares until approved.
    pub fn entry_liquidity_f(&self) -> Result<i128, Invariant> {
        let mut total = 0i128;
        for entry in self.entries.values() {
            total = total
                .checked_add(mul(entry.amount, self.precision)?)
                .ok_or(Invariant::Overflow)?;
        }
        Ok(total)
    }

    /// F-scaled value not reserved for entries or resolved claims.
    pub fn free_liquidity_f(&self) -> Result<i128, Invariant> {
        Ok(mul(self.balance, self.precision)?
            - self.withdrawable_liquidity_f
            - self.entry_liquidity_f()?)
    }

    /// F-scaled total pool value: free plus committed to open events.
    pub fn total_liquidity_f(&self) -> Result<i128, Invariant> {
        Ok(self.free_liquidity_f()? + self.active_liquidity_f)
    }

    /// Shares minted for a deposit of `amount`. The first deposit into an
    /// empty pool mints 1:1; later deposits mint pro rata against the
    /// current total value, floored.
    pub fn deposit_shares(&self, amount: i128) -> Result<i128, PoolError> {
        if self.total_shares == 0 {
            return Ok(amount);
        }
        let total_liquidity_f = self.total_liquidity_f()?;
        if total_liquidity_f <= 0 {
            return Err(PoolError::NoLiquidity);
        }
        let scaled = mul(mul(amount, self.precision)?, self.total_shares)?;
        Ok(math::floor_div(scaled, total_liquidity_f)?)
    }
}

impl Default for PoolModel {
    fn default() -> Self {
        PoolModel::new(PRECISION, 0)
    }
}

/// JSON maps need string keys, so the claims map serializes as a sequence
/// of `(key, claim)` pairs.
mod claim_map {
    use std::collections::BTreeMap;

    use serde::de::Deserializer;
    use serde::ser::Serializer;
    use serde::Deserialize;

    use super::{Claim, ClaimKey};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<ClaimKey, Claim>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ClaimKey, Claim>, D::Error> {
        let pairs = Vec::<(ClaimKey, Claim)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
