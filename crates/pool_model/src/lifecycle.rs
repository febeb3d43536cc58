//! Entry and position lifecycle: deposit, time-locked approval, cancel.
//!
//! Custody begins at deposit: the amount joins `balance` immediately, but
//! sits in the entry reserve and buys no shares until the lock elapses and
//! the entry is approved.

use crate::error::PoolError;
use crate::math::mul;
use crate::state::{Entry, Payment, PoolModel, Position};

impl PoolModel {
    /// Deposit `amount` into the pool as a pending, time-locked entry.
    pub fn deposit_liquidity(
        &mut self,
        provider: &str,
        amount: i128,
        now: i64,
    ) -> Result<u64, PoolError> {
        if amount <= 0 {
            return Err(PoolError::NonPositiveAmount);
        }
        self.now = now;
        let entry_id = self.next_entry_id;
        self.entries.insert(
            entry_id,
            Entry {
                provider: provider.to_string(),
                amount,
                accept_after: now + self.entry_lock_period,
            },
        );
        self.next_entry_id += 1;
        self.balance += amount;
        Ok(entry_id)
    }

    /// Convert a matured entry into a share-holding position.
    ///
    /// Shares are priced against the pool value *excluding* all pending
    /// entries, so unapproved deposits never dilute existing positions. The
    /// new position is stamped with the pre-increment counter; that stamp
    /// decides which later events expose it.
    pub fn approve_liquidity(&mut self, entry_id: u64, now: i64) -> Result<u64, PoolError> {
        let entry = self
            .entries
            .get(&entry_id)
            .ok_or(PoolError::UnknownEntry(entry_id))?;
        if now < entry.accept_after {
            return Err(PoolError::EntryLocked {
                id: entry_id,
                accept_after: entry.accept_after,
            });
        }
        if mul(entry.amount, self.precision)? > self.entry_liquidity_f()? {
            return Err(PoolError::EntryLiquidityMismatch);
        }

        let shares = self.deposit_shares(entry.amount)?;
        let entry = self
            .entries
            .remove(&entry_id)
            .ok_or(PoolError::UnknownEntry(entry_id))?;

        self.now = now;
        let position_id = self.next_position_id;
        self.positions.insert(
            position_id,
            Position {
                provider: entry.provider,
                shares,
                added_counter: self.counter,
            },
        );
        self.next_position_id += 1;
        self.total_shares += shares;
        self.counter += 1;
        Ok(position_id)
    }

    /// Remove an unapproved entry and refund its amount to the provider.
    /// Ownership is checked at the boundary, not here.
    pub fn cancel_liquidity(&mut self, entry_id: u64) -> Result<Payment, PoolError> {
        let entry = self
            .entries
            .remove(&entry_id)
            .ok_or(PoolError::UnknownEntry(entry_id))?;
        self.balance -= entry.amount;
        Ok(Payment {
            provider: entry.provider,
            amount: entry.amount,
        })
    }

    /// Unconditional transfer into the pool, e.g. a reward top-up.
    pub fn default(&mut self, amount: i128) -> Result<(), PoolError> {
        if amount <= 0 {
            return Err(PoolError::NonPositiveAmount);
        }
        self.balance += amount;
        Ok(())
    }

    /// Change the lock applied to future deposits. Entries already pending
    /// keep the `accept_after` they were created with.
    pub fn set_entry_lock_period(&mut self, period: i64) -> Result<(), PoolError> {
        if period < 0 {
            return Err(PoolError::NegativeLockPeriod);
        }
        self.entry_lock_period = period;
        Ok(())
    }
}
