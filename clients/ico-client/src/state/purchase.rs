//! Purchase Record (`PurchaseAccount`)
//!
//! One record per buyer at PDA `["purchase", buyer]`. Created by a buy,
//! flipped to distributed by the admin's distribute call, never deleted.
//!
//! # Memory Layout (89 bytes)
//!
//! ```text
//! [0..8]    discriminator
//! [8..40]   buyer           Pubkey
//! [40..48]  amount          u64
//! [48]      is_distributed  bool
//! [49..57]  timestamp       i64
//! [57..89]  sale            Pubkey (the parent IcoAccount)
//! ```

use crate::state::{AccountSchema, SchemaTag};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;
use std::collections::{BTreeMap, HashSet};

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PurchaseRecord {
    pub buyer: Pubkey,
    /// Tokens bought, base units
    pub amount: u64,
    pub is_distributed: bool,
    /// Unix seconds
    pub timestamp: i64,
    /// The parent `IcoAccount` (`ico` in the program)
    pub sale: Pubkey,
}

impl PurchaseRecord {
    /// Byte offset of `buyer`, for memcmp scans.
    pub const BUYER_OFFSET: usize = 8;
    pub const LEN: usize = 8 + 32 + 8 + 1 + 8 + 32;
}

impl AccountSchema for PurchaseRecord {
    const NAME: &'static str = "PurchaseAccount";
    const TAG: SchemaTag = SchemaTag::Purchase;
    const SPACE: Option<usize> = Some(PurchaseRecord::LEN);
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Totals over a set of purchase records, as the admin analytics view shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurchaseSummary {
    pub purchases: usize,
    pub unique_buyers: usize,
    pub total_amount: u128,
    pub distributed_amount: u128,
    pub pending: usize,
}

impl PurchaseSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a PurchaseRecord>,
    {
        let mut summary = PurchaseSummary::default();
        let mut buyers = HashSet::new();

        for record in records {
            summary.purchases += 1;
            summary.total_amount += record.amount as u128;
            if record.is_distributed {
                summary.distributed_amount += record.amount as u128;
            } else {
                summary.pending += 1;
            }
            buyers.insert(record.buyer);
        }

        summary.unique_buyers = buyers.len();
        summary
    }

    /// Amount bought but not yet distributed.
    pub fn pending_amount(&self) -> u128 {
        self.total_amount - self.distributed_amount
    }
}

/// One step of the cumulative sales series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CumulativePoint {
    pub timestamp: i64,
    pub amount: u64,
    /// Sum of `amount` up to and including this purchase
    pub cumulative: u128,
}

/// Purchases in time order with a running total.
///
/// Ties keep their input order.
pub fn cumulative_by_time<'a, I>(records: I) -> Vec<CumulativePoint>
where
    I: IntoIterator<Item = &'a PurchaseRecord>,
{
    let mut ordered: Vec<&PurchaseRecord> = records.into_iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    let mut cumulative = 0u128;
    ordered
        .into_iter()
        .map(|r| {
            cumulative += r.amount as u128;
            CumulativePoint {
                timestamp: r.timestamp,
                amount: r.amount,
                cumulative,
            }
        })
        .collect()
}

/// Total bought per buyer, ordered by buyer key.
pub fn totals_by_buyer<'a, I>(records: I) -> Vec<(Pubkey, u128)>
where
    I: IntoIterator<Item = &'a PurchaseRecord>,
{
    let mut totals: BTreeMap<Pubkey, u128> = BTreeMap::new();
    for record in records {
        *totals.entry(record.buyer).or_default() += record.amount as u128;
    }
    totals.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(buyer: Pubkey, amount: u64, is_distributed: bool) -> PurchaseRecord {
        PurchaseRecord {
            buyer,
            amount,
            is_distributed,
            timestamp: 1_700_000_123,
            sale: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_fixture_decodes_exactly() {
        let original = record(Pubkey::new_unique(), 500, false);
        let bytes = original.encode().unwrap();

        assert_eq!(bytes.len(), PurchaseRecord::LEN);
        assert_eq!(&bytes[8..40], original.buyer.as_ref());
        assert_eq!(PurchaseRecord::decode(&bytes).unwrap(), original);
    }

    #[test]
    fn test_invalid_distributed_flag() {
        let mut bytes = record(Pubkey::new_unique(), 1, false).encode().unwrap();
        bytes[48] = 9;
        assert!(PurchaseRecord::decode(&bytes).is_err());
    }

    #[test]
    fn test_summary() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let records = vec![
            record(alice, 100, true),
            record(alice, 50, false),
            record(bob, u64::MAX, false),
        ];

        let summary = PurchaseSummary::from_records(&records);

        assert_eq!(summary.purchases, 3);
        assert_eq!(summary.unique_buyers, 2);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.distributed_amount, 100);
        assert_eq!(summary.total_amount, 150 + u64::MAX as u128);
        assert_eq!(summary.pending_amount(), 50 + u64::MAX as u128);
    }

    #[test]
    fn test_cumulative_series_sorted_by_time() {
        let buyer = Pubkey::new_unique();
        let at = |amount: u64, timestamp: i64| PurchaseRecord {
            timestamp,
            ..record(buyer, amount, false)
        };
        let records = vec![at(30, 300), at(10, 100), at(20, 200), at(5, 200)];

        let series = cumulative_by_time(&records);

        let times: Vec<i64> = series.iter().map(|p| p.timestamp).collect();
        assert_eq!(times, vec![100, 200, 200, 300]);
        let running: Vec<u128> = series.iter().map(|p| p.cumulative).collect();
        assert_eq!(running, vec![10, 30, 35, 65]);
        assert!(cumulative_by_time(&Vec::<PurchaseRecord>::new()).is_empty());
    }

    #[test]
    fn test_totals_by_buyer() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let records = vec![
            record(alice, 100, true),
            record(bob, 7, false),
            record(alice, u64::MAX, false),
        ];

        let totals = totals_by_buyer(&records);

        assert_eq!(totals.len(), 2);
        let alice_total = totals.iter().find(|(k, _)| *k == alice).unwrap().1;
        assert_eq!(alice_total, 100 + u64::MAX as u128);
        assert!(totals.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
