//! Settlement of resolved claims and withdrawal of the proceeds.

use std::collections::BTreeMap;

use crate::error::{Invariant, PoolError};
use crate::math::floor_div;
use crate::state::{ClaimKey, PoolModel};

impl PoolModel {
    /// F-scaled entitlement per provider for the given claims. Every claim
    /// must reference a resolved event; each key may appear once.
    fn withdraw_payouts_f(
        &self,
        claim_keys: &[ClaimKey],
    ) -> Result<BTreeMap<String, i128>, PoolError> {
        let mut payouts_f: BTreeMap<String, i128> = BTreeMap::new();
        let mut seen = std::collections::BTreeSet::new();
        for &key in claim_keys {
            if !seen.insert(key) {
                return Err(PoolError::DuplicateClaim {
                    event_id: key.event_id,
                    position_id: key.position_id,
                });
            }
            let claim = self.claims.get(&key).ok_or(PoolError::UnknownClaim {
                event_id: key.event_id,
                position_id: key.position_id,
            })?;
            let event = self
                .events
                .get(&key.event_id)
                .ok_or(PoolError::UnknownEvent(key.event_id))?;
            if event.result.is_none() {
                return Err(PoolError::EventNotResolved(key.event_id));
            }
            *payouts_f.entry(claim.provider.clone()).or_default() +=
                event.result_for_shares_f(claim.shares, self.precision)?;
        }
        Ok(payouts_f)
    }

    /// Base-unit payout per provider for the given claims: each claim's
    /// pro-rata share of its event's final result, F-amounts summed per
    /// provider and floored once.
    pub fn withdraw_payouts(
        &self,
        claim_keys: &[ClaimKey],
    ) -> Result<BTreeMap<String, i128>, PoolError> {
        let payouts_f = self.withdraw_payouts_f(claim_keys)?;
        let mut payouts = BTreeMap::new();
        for (provider, payout_f) in payouts_f {
            payouts.insert(provider, floor_div(payout_f, self.precision)?);
        }
        Ok(payouts)
    }

    /// Consume the given claims and release their value.
    ///
    /// The withdrawable reserve drops by the full F-scaled entitlement while
    /// the balance drops only by the floored payout, so rounding dust stays
    /// in the pool.
    pub fn withdraw_liquidity(
        &mut self,
        claim_keys: &[ClaimKey],
    ) -> Result<BTreeMap<String, i128>, PoolError> {
        let payouts_f = self.withdraw_payouts_f(claim_keys)?;
        let payouts = self.withdraw_payouts(claim_keys)?;

        let mut total_f = 0i128;
        for payout_f in payouts_f.values() {
            total_f += payout_f;
        }
        let mut total = 0i128;
        for payout in payouts.values() {
            total += payout;
        }
        if self.withdrawable_liquidity_f < total_f {
            return Err(Invariant::NegativeWithdrawable.into());
        }
        if self.balance < total {
            return Err(Invariant::NegativeBalance.into());
        }

        for key in claim_keys {
            self.claims.remove(key);
        }
        self.withdrawable_liquidity_f -= total_f;
        self.balance -= total;
        Ok(payouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Line;

    fn settled_pool() -> (PoolModel, ClaimKey) {
        let mut pool = <PoolModel as Default>::default();
        pool.add_line(Line {
            measure_period: 3600,
            bets_period: 3600,
            last_bets_close_time: 0,
            max_events: 1,
            is_paused: false,
            min_betting_period: 0,
        })
        .unwrap();
        let entry_id = pool.deposit_liquidity("alice", 100, 0).unwrap();
        let position_id = pool.approve_liquidity(entry_id, 0).unwrap();
        pool.create_event(0, 0, 0).unwrap();
        pool.claim_liquidity(position_id, 40).unwrap();
        pool.pay_reward(0, 60).unwrap();
        (pool, ClaimKey { event_id: 0, position_id })
    }

    #[test]
    fn withdraw_pays_pro_rata_of_result() {
        let (mut pool, key) = settled_pool();
        // 60 result, 40 of 100 shares locked: floor(60 * 40 / 100) = 24.
        let payouts = pool.withdraw_liquidity(&[key]).unwrap();
        assert_eq!(payouts["alice"], 24);
        assert!(pool.claims.is_empty());
        assert_eq!(pool.withdrawable_liquidity_f, 0);
        assert_eq!(pool.balance, 36);
    }

    #[test]
    fn withdraw_requires_resolution() {
        let mut pool = <PoolModel as Default>::default();
        pool.add_line(Line {
            measure_period: 3600,
            bets_period: 3600,
            last_bets_close_time: 0,
            max_events: 1,
            is_paused: false,
            min_betting_period: 0,
        })
        .unwrap();
        let entry_id = pool.deposit_liquidity("alice", 100, 0).unwrap();
        let position_id = pool.approve_liquidity(entry_id, 0).unwrap();
        pool.create_event(0, 0, 0).unwrap();
        pool.claim_liquidity(position_id, 40).unwrap();

        let key = ClaimKey { event_id: 0, position_id };
        let before = pool.clone();
        assert_eq!(
            pool.withdraw_liquidity(&[key]),
            Err(PoolError::EventNotResolved(0))
        );
        assert_eq!(pool, before);
    }

    #[test]
    fn withdraw_rejects_unknown_and_duplicate_keys() {
        let (mut pool, key) = settled_pool();
        let missing = ClaimKey { event_id: 0, position_id: 42 };
        assert_eq!(
            pool.withdraw_liquidity(&[missing]),
            Err(PoolError::UnknownClaim { event_id: 0, position_id: 42 })
        );
        assert_eq!(
            pool.withdraw_liquidity(&[key, key]),
            Err(PoolError::DuplicateClaim { event_id: 0, position_id: key.position_id })
        );
        // Still withdrawable after the rejections.
        assert_eq!(pool.withdraw_liquidity(&[key]).unwrap()["alice"], 24);
    }

    #[test]
    fn same_provider_claims_sum_before_flooring() {
        let mut pool = <PoolModel as Default>::default();
        for _ in 0..2 {
            pool.add_line(Line {
                measure_period: 3600,
                bets_period: 3600,
                last_bets_close_time: 0,
                max_events: 1,
                is_paused: false,
                min_betting_period: 0,
            })
            .unwrap();
        }
        let entry_id = pool.deposit_liquidity("alice", 100, 0).unwrap();
        let position_id = pool.approve_liquidity(entry_id, 0).unwrap();
        pool.create_event(0, 0, 0).unwrap();
        pool.create_event(1, 1, 0).unwrap();
        pool.claim_liquidity(position_id, 100).unwrap();
        // Full exit locks all 100 shares into both events; each resolved
        // result is owed to alice in full.
        pool.pay_reward(0, 51).unwrap();
        pool.pay_reward(1, 51).unwrap();

        let keys = [
            ClaimKey { event_id: 0, position_id },
            ClaimKey { event_id: 1, position_id },
        ];
        let payouts = pool.withdraw_liquidity(&keys).unwrap();
        // Each claim is worth exactly 51: one payment of 102, not two of 51.
        assert_eq!(payouts["alice"], 102);
    }

    #[test]
    fn rounding_dust_stays_in_the_pool() {
        let mut pool = <PoolModel as Default>::default();
        pool.add_line(Line {
            measure_period: 3600,
            bets_period: 3600,
            last_bets_close_time: 0,
            max_events: 1,
            is_paused: false,
            min_betting_period: 0,
        })
        .unwrap();
        let entry_id = pool.deposit_liquidity("alice", 100, 0).unwrap();
        let position_id = pool.approve_liquidity(entry_id, 0).unwrap();
        pool.create_event(0, 0, 0).unwrap();
        pool.claim_liquidity(position_id, 30).unwrap();
        // 50 * 30 / 100 = 15 exactly; use 55 to get 16.5.
        pool.pay_reward(0, 55).unwrap();

        let key = ClaimKey { event_id: 0, position_id };
        let payouts = pool.withdraw_liquidity(&[key]).unwrap();
        assert_eq!(payouts["alice"], 16);
        // The half unit never leaves the pool.
        assert_eq!(pool.withdrawable_liquidity_f, 0);
        assert_eq!(pool.balance, 55 - 16);
    }
}
