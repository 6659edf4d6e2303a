/*!
 * Token Bank
 * Per-UE token buckets sharing an overflow bank, for token-bank fair queueing
 *
 * Each UE's bucket fills at its maximum bit rate. Tokens that overflow the
 * bucket are deposited in the shared bank and credited to the UE's counter;
 * sending more than the bucket holds borrows from the bank and debits it.
 */

use crate::core::Rnti;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

const TTIS_PER_SECOND: u64 = 1000;

/// Bank limits, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenBankConfig {
    /// Lowest counter a UE may borrow down to
    pub debt_limit: i64,
    /// Most a UE may borrow from the bank in one TTI
    pub credit_limit: u64,
    /// Bucket capacity of every UE
    pub token_pool_size: u64,
}

impl Default for TokenBankConfig {
    fn default() -> Self {
        Self {
            debt_limit: -625_000,
            credit_limit: 625_000,
            token_pool_size: 1,
        }
    }
}

/// Token state of one UE
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBucket {
    /// Generation rate in bytes/s (0 = not rate limited)
    pub rate: u64,
    pub pool: u64,
    /// Deposited (positive) or borrowed (negative) tokens
    pub counter: i64,
}

impl TokenBucket {
    #[inline]
    fn per_tti(&self) -> u64 {
        self.rate / TTIS_PER_SECOND
    }
}

#[derive(Debug, Clone)]
pub struct TokenBank {
    config: TokenBankConfig,
    buckets: BTreeMap<Rnti, TokenBucket>,
    bank: u64,
}

impl TokenBank {
    pub fn new(config: TokenBankConfig) -> Self {
        Self {
            config,
            buckets: BTreeMap::new(),
            bank: 0,
        }
    }

    /// Create or re-rate the bucket of a UE from its maximum bit rate (bit/s)
    pub fn set_rate(&mut self, rnti: Rnti, mbr_bps: u64) {
        self.buckets.entry(rnti).or_default().rate = mbr_bps / 8;
    }

    pub fn remove_ue(&mut self, rnti: Rnti) {
        self.buckets.remove(&rnti);
    }

    pub fn bucket(&self, rnti: Rnti) -> Option<&TokenBucket> {
        self.buckets.get(&rnti)
    }

    #[inline]
    pub fn bank_size(&self) -> u64 {
        self.bank
    }

    /// One TTI of token generation
    pub fn refill(&mut self) {
        let max_pool = self.config.token_pool_size;
        for bucket in self.buckets.values_mut() {
            let generated = bucket.per_tti();
            let room = max_pool.saturating_sub(bucket.pool);
            if generated > room {
                let overflow = generated - room;
                bucket.pool = max_pool;
                bucket.counter += overflow as i64;
                self.bank += overflow;
            } else {
                bucket.pool += generated;
            }
        }
    }

    /// Ranking value: deposited tokens relative to the generation rate
    pub fn metric(&self, rnti: Rnti) -> f64 {
        match self.buckets.get(&rnti) {
            Some(bucket) if bucket.rate > 0 => bucket.counter as f64 / bucket.rate as f64,
            _ => 0.0,
        }
    }

    /// Bytes the UE may send this TTI: its pool plus what it may borrow
    pub fn budget(&self, rnti: Rnti) -> u32 {
        let Some(bucket) = self.buckets.get(&rnti) else {
            return u32::MAX;
        };
        if bucket.rate == 0 {
            return u32::MAX;
        }
        let credit = if self.bank > 0 {
            let headroom = (bucket.counter - self.config.debt_limit).max(0) as u64;
            headroom.min(self.config.credit_limit).min(self.bank)
        } else {
            0
        };
        (credit + bucket.pool).min(u32::MAX as u64) as u32
    }

    /// Charge sent bytes: the pool first, then the bank
    pub fn consume(&mut self, rnti: Rnti, bytes: u32) {
        let Some(bucket) = self.buckets.get_mut(&rnti) else {
            return;
        };
        if bucket.rate == 0 {
            return;
        }
        let bytes = bytes as u64;
        if bytes <= bucket.pool {
            bucket.pool -= bytes;
            return;
        }
        let borrowed = bytes - bucket.pool;
        bucket.pool = 0;
        bucket.counter -= borrowed as i64;
        self.bank = self.bank.saturating_sub(borrowed);
        trace!(rnti, borrowed, bank = self.bank, "tokens borrowed from bank");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_is_deposited() {
        let mut bank = TokenBank::new(TokenBankConfig::default());
        bank.set_rate(1, 8_000_000);
        bank.refill();
        let bucket = bank.bucket(1).unwrap();
        assert_eq!(bucket.pool, 1);
        assert_eq!(bucket.counter, 999);
        assert_eq!(bank.bank_size(), 999);
        assert_eq!(bank.budget(1), 1000);
    }

    #[test]
    fn test_borrowing_debits_counter_and_bank() {
        let mut bank = TokenBank::new(TokenBankConfig::default());
        bank.set_rate(1, 8_000_000);
        bank.set_rate(2, 8_000_000);
        bank.refill();
        bank.consume(1, 501);
        assert_eq!(bank.bucket(1).unwrap().counter, 499);
        assert_eq!(bank.bank_size(), 1498);
        assert!(bank.metric(2) > bank.metric(1));
    }

    #[test]
    fn test_unrated_ue_is_unlimited() {
        let mut bank = TokenBank::new(TokenBankConfig::default());
        bank.set_rate(4, 0);
        bank.refill();
        assert_eq!(bank.budget(4), u32::MAX);
        bank.consume(4, 10_000);
        assert_eq!(bank.bucket(4).unwrap().counter, 0);
        assert_eq!(bank.metric(4), 0.0);
    }
}
