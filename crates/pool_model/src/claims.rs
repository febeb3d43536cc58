//! Claim & lock engine.
//!
//! A withdrawing position cannot simply take a pro-rata cut of current
//! liquidity: part of that value is still committed to events created after
//! the position joined, and their outcomes are unknown. The exit therefore
//! splits in two: the unexposed part pays out immediately, and the exposed
//! fraction locks into each impacted event as a claim, settled after
//! `pay_reward`.

use crate::error::{Invariant, PoolError};
use crate::math::{floor_div, mul, mul_div_ceil};
use crate::state::{Claim, ClaimKey, Payment, PoolModel};

impl PoolModel {
    /// Active events the position is still economically exposed to: those
    /// created strictly after the position joined.
    pub fn impacted_event_ids(&self, position_id: u64) -> Result<Vec<u64>, PoolError> {
        let position = self
            .positions
            .get(&position_id)
            .ok_or(PoolError::UnknownPosition(position_id))?;
        let mut impacted = Vec::new();
        for &event_id in &self.active_events {
            let event = self
                .events
                .get(&event_id)
                .ok_or(PoolError::UnknownEvent(event_id))?;
            if event.created_counter > position.added_counter {
                impacted.push(event_id);
            }
        }
        Ok(impacted)
    }

    /// Immediately payable portion of claiming `shares` from a position, in
    /// base units.
    ///
    /// The pro-rata value of the claimed shares, minus the fraction still
    /// tied to each impacted event's unresolved outcome. Locked fractions
    /// round up so the dust of the split stays with the pool; when capacity
    /// was reconfigured between events the fractions can briefly sum past
    /// the whole, so the payable part clamps at zero.
    pub fn claim_payout(&self, position_id: u64, shares: i128) -> Result<i128, PoolError> {
        let total_liquidity_f = self.total_liquidity_f()?;
        let provider_liquidity_f = floor_div(mul(total_liquidity_f, shares)?, self.total_shares)?;

        let mut locked_liquidity_f = 0i128;
        for event_id in self.impacted_event_ids(position_id)? {
            let event = self
                .events
                .get(&event_id)
                .ok_or(PoolError::UnknownEvent(event_id))?;
            locked_liquidity_f +=
                mul_div_ceil(provider_liquidity_f, event.shares, event.total_shares)?;
        }

        let expected_f = (provider_liquidity_f - locked_liquidity_f).max(0);
        Ok(floor_div(expected_f, self.precision)?)
    }

    /// Burn `shares` from a position, paying out the unexposed value and
    /// locking the exposed fraction into every impacted event.
    ///
    /// Claiming zero shares is a no-op that leaves the state byte-identical.
    pub fn claim_liquidity(&mut self, position_id: u64, shares: i128) -> Result<Payment, PoolError> {
        let position = self
            .positions
            .get(&position_id)
            .ok_or(PoolError::UnknownPosition(position_id))?;
        let provider = position.provider.clone();
        if shares == 0 {
            return Ok(Payment { provider, amount: 0 });
        }
        if shares < 0 {
            return Err(PoolError::NonPositiveAmount);
        }
        if shares > position.shares {
            return Err(PoolError::SharesExceedPosition);
        }
        if shares > self.total_shares {
            return Err(Invariant::NegativeTotalShares.into());
        }

        let payout = self.claim_payout(position_id, shares)?;
        let impacted = self.impacted_event_ids(position_id)?;

        // Validate every lock before mutating anything.
        let mut active_debit_f = 0i128;
        for &event_id in &impacted {
            let event = self
                .events
                .get(&event_id)
                .ok_or(PoolError::UnknownEvent(event_id))?;
            if event.locked_shares + shares > event.total_shares {
                return Err(Invariant::LockedSharesExceeded.into());
            }
            let key = ClaimKey { event_id, position_id };
            let already = self.claims.get(&key).map(|c| c.shares).unwrap_or(0);
            if already + shares > event.total_shares {
                return Err(Invariant::LockedSharesExceeded.into());
            }
            active_debit_f += event.provided_for_shares_f(shares, self.precision)?;
        }
        if self.active_liquidity_f < active_debit_f {
            return Err(Invariant::NegativeActiveLiquidity.into());
        }
        if self.balance < payout {
            return Err(Invariant::NegativeBalance.into());
        }

        for event_id in impacted {
            let key = ClaimKey { event_id, position_id };
            let claim = self.claims.entry(key).or_insert_with(|| Claim {
                provider: provider.clone(),
                shares: 0,
            });
            claim.shares += shares;
            if let Some(event) = self.events.get_mut(&event_id) {
                event.locked_shares += shares;
            }
        }
        if let Some(position) = self.positions.get_mut(&position_id) {
            position.shares -= shares;
        }
        self.active_liquidity_f -= active_debit_f;
        self.total_shares -= shares;
        self.balance -= payout;

        Ok(Payment { provider, amount: payout })
    }
}
