//! Line registration, capacity bookkeeping, event creation and resolution.

use crate::error::{Invariant, PoolError};
use crate::math::{floor_div, mul};
use crate::state::{Event, Line, PoolModel};

impl PoolModel {
    /// Register a new line. Unpaused capacity joins the pool-wide
    /// `max_events` immediately.
    pub fn add_line(&mut self, line: Line) -> Result<u64, PoolError> {
        if line.bets_period <= 0 || line.max_events == 0 || line.min_betting_period < 0 {
            return Err(PoolError::InvalidLineParams);
        }
        let line_id = self.next_line_id;
        if !line.is_paused {
            self.max_events += line.max_events;
        }
        self.lines.insert(line_id, line);
        self.next_line_id += 1;
        Ok(line_id)
    }

    /// Toggle a line's pause flag, moving its capacity out of or back into
    /// the pool-wide total. Returns the new pause state. Zero remaining
    /// capacity is a legal degenerate state; `create_event` rejects until
    /// some line is unpaused again.
    pub fn trigger_pause_line(&mut self, line_id: u64) -> Result<bool, PoolError> {
        let line = self
            .lines
            .get_mut(&line_id)
            .ok_or(PoolError::UnknownLine(line_id))?;
        if line.is_paused {
            self.max_events += line.max_events;
        } else {
            self.max_events -= line.max_events;
        }
        line.is_paused = !line.is_paused;
        Ok(line.is_paused)
    }

    /// Liquidity the next event would receive, in base units: an even split
    /// of total value across capacity slots, capped by what is actually free.
    pub fn next_event_liquidity(&self) -> Result<i128, PoolError> {
        if self.max_events == 0 {
            return Err(PoolError::NoCapacity);
        }
        let max_liquidity_f = floor_div(self.total_liquidity_f()?, self.max_events as i128)?;
        let liquidity_f = max_liquidity_f.min(self.free_liquidity_f()?);
        Ok(floor_div(liquidity_f, self.precision)?)
    }

    /// Spin up one event on `line_id`, committing an even slice of pool
    /// liquidity and shares to it. At most `max_events` events may be live
    /// at once; a full pool rejects until one resolves.
    ///
    /// The line's close time advances by whole `bets_period` multiples so a
    /// late call cannot drift the cadence. The returned counter stamp makes
    /// the event visible only to positions opened before this call.
    pub fn create_event(
        &mut self,
        line_id: u64,
        next_event_id: u64,
        now: i64,
    ) -> Result<u64, PoolError> {
        if self.events.contains_key(&next_event_id) {
            return Err(PoolError::DuplicateEvent(next_event_id));
        }
        let line = self
            .lines
            .get(&line_id)
            .ok_or(PoolError::UnknownLine(line_id))?;
        if line.is_paused {
            return Err(PoolError::LinePaused(line_id));
        }
        if self.active_events.len() as u64 >= self.max_events {
            return Err(PoolError::NoCapacity);
        }
        if self.total_shares <= 0 {
            return Err(PoolError::NoShares);
        }
        if self.free_liquidity_f()? < 0 {
            return Err(Invariant::NegativeBalance.into());
        }

        let shares = floor_div(self.total_shares, self.max_events as i128)?;
        let provided = self.next_event_liquidity()?;
        let provided_f = mul(provided, self.precision)?;

        let mut updated_line = line.clone();
        updated_line.advance_close_time(now)?;
        let duration = updated_line.duration(now);
        if duration < 0 {
            return Err(Invariant::ScheduleRegression.into());
        }
        let liquidity_units = floor_div(mul(duration as i128, provided)?, self.total_shares)?;

        self.events.insert(
            next_event_id,
            Event {
                created_counter: self.counter,
                shares,
                total_shares: self.total_shares,
                locked_shares: 0,
                result: None,
                provided,
            },
        );
        self.active_events.insert(next_event_id);
        self.lines.insert(line_id, updated_line);
        self.counter += 1;
        self.active_liquidity_f += provided_f;
        self.liquidity_units += liquidity_units;
        self.balance -= provided;
        self.now = now;
        Ok(next_event_id)
    }

    /// Settle an event with its final result.
    ///
    /// The portion of the result owned by already-locked shares moves into
    /// the withdrawable reserve; the unlocked remainder of the committed
    /// liquidity is released from the active pool. The event leaves the
    /// active set and its result can never be set again.
    pub fn pay_reward(&mut self, event_id: u64, amount: i128) -> Result<(), PoolError> {
        if amount < 0 {
            return Err(PoolError::NonPositiveAmount);
        }
        let mut event = self
            .events
            .get(&event_id)
            .cloned()
            .ok_or(PoolError::UnknownEvent(event_id))?;
        if event.result.is_some() {
            return Err(PoolError::EventAlreadyResolved(event_id));
        }

        event.result = Some(amount);
        let locked_f = event.result_for_shares_f(event.locked_shares, self.precision)?;
        let left_shares = event.total_shares - event.locked_shares;
        let released_f = event.provided_for_shares_f(left_shares, self.precision)?;
        if self.active_liquidity_f < released_f {
            return Err(Invariant::NegativeActiveLiquidity.into());
        }

        self.events.insert(event_id, event);
        self.active_events.remove(&event_id);
        self.withdrawable_liquidity_f += locked_f;
        self.active_liquidity_f -= released_f;
        self.balance += amount;
        Ok(())
    }
}
