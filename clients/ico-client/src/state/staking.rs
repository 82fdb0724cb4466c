//! Staking Program Accounts
//!
//! | Account | Address | Size |
//! |---------|---------|------|
//! | [`StakingPool`] | PDA `["staking_account"]` | 104 bytes |
//! | [`StakerInfo`] | PDA `["staker_info", pool, owner]` | 24 bytes |
//! | [`StakeRecord`] | fresh keypair per stake | 73 bytes |
//!
//! Stake records have no derivable address. They are found with a program
//! scan filtered on data size and on the owner bytes at offset 8.

use crate::state::{AccountSchema, SchemaTag};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

// =============================================================================
// STAKING POOL
// =============================================================================

/// Pool-wide staking parameters set by the admin.
///
/// ```text
/// [8..40]   admin           Pubkey
/// [40..72]  token_mint      Pubkey
/// [72..80]  lockup_period   i64 (seconds)
/// [80..88]  low_tier_fee    f64 (percent)
/// [88..96]  mid_tier_fee    f64 (percent)
/// [96..104] high_tier_fee   f64 (percent)
/// ```
#[derive(Clone, Debug, Default, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct StakingPool {
    pub admin: Pubkey,
    pub token_mint: Pubkey,
    pub lockup_period: i64,
    pub low_tier_fee: f64,
    pub mid_tier_fee: f64,
    pub high_tier_fee: f64,
}

impl StakingPool {
    pub const LEN: usize = 8 + 32 + 32 + 8 + 8 * 3;
}

impl AccountSchema for StakingPool {
    const NAME: &'static str = "StakingAccount";
    const TAG: SchemaTag = SchemaTag::StakingPool;
    const SPACE: Option<usize> = Some(StakingPool::LEN);
}

// =============================================================================
// STAKE TIER
// =============================================================================

/// Reward bracket assigned by the program when a stake is made.
///
/// Stored as its number (1, 2 or 3); any other byte fails to decode.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
pub enum StakeTier {
    One = 1,
    Two = 2,
    Three = 3,
}

impl StakeTier {
    pub fn number(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// STAKE RECORD
// =============================================================================

/// One stake position.
///
/// ```text
/// [8..40]   owner            Pubkey   <- memcmp offset for "my stakes"
/// [40..48]  amount           u64
/// [48]      tier             u8 (1..=3)
/// [49..57]  stake_timestamp  i64
/// [57..65]  end_timestamp    i64
/// [65..73]  spin_count       u64
/// ```
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StakeRecord {
    pub owner: Pubkey,
    /// Reduced or zeroed by unstaking
    pub amount: u64,
    pub tier: StakeTier,
    pub stake_timestamp: i64,
    pub end_timestamp: i64,
    pub spin_count: u64,
}

impl StakeRecord {
    pub const OWNER_OFFSET: usize = 8;
    pub const LEN: usize = 8 + 32 + 8 + 1 + 8 + 8 + 8;

    /// Lockup still running at unix time `now`.
    pub fn is_locked_at(&self, now: i64) -> bool {
        now < self.end_timestamp
    }

    /// Fully unstaked.
    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

impl AccountSchema for StakeRecord {
    const NAME: &'static str = "StakeRecord";
    const TAG: SchemaTag = SchemaTag::StakeRecord;
    const SPACE: Option<usize> = Some(StakeRecord::LEN);
}

// =============================================================================
// STAKER INFO
// =============================================================================

/// Per-owner aggregate updated by stake and unstake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StakerInfo {
    pub total_staked: u64,
    pub spin_count: u64,
}

impl StakerInfo {
    pub const LEN: usize = 8 + 8 + 8;
}

impl AccountSchema for StakerInfo {
    const NAME: &'static str = "StakerInfo";
    const TAG: SchemaTag = SchemaTag::StakerInfo;
    const SPACE: Option<usize> = Some(StakerInfo::LEN);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stake(owner: Pubkey) -> StakeRecord {
        StakeRecord {
            owner,
            amount: 2_000_000_000,
            tier: StakeTier::Two,
            stake_timestamp: 1_700_000_000,
            end_timestamp: 1_700_000_000 + 90 * 86_400,
            spin_count: 4,
        }
    }

    #[test]
    fn test_stake_record_layout() {
        let owner = Pubkey::new_unique();
        let record = stake(owner);
        let bytes = record.encode().unwrap();

        assert_eq!(bytes.len(), StakeRecord::LEN);
        let at = StakeRecord::OWNER_OFFSET;
        assert_eq!(&bytes[at..at + 32], owner.as_ref());
        assert_eq!(bytes[48], 2);
        assert_eq!(StakeRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_tier_out_of_range() {
        let mut bytes = stake(Pubkey::new_unique()).encode().unwrap();

        bytes[48] = 0;
        assert!(StakeRecord::decode(&bytes).is_err());
        bytes[48] = 4;
        assert!(StakeRecord::decode(&bytes).is_err());
        bytes[48] = 3;
        assert_eq!(StakeRecord::decode(&bytes).unwrap().tier, StakeTier::Three);
    }

    #[test]
    fn test_lockup() {
        let record = stake(Pubkey::new_unique());
        assert!(record.is_locked_at(record.end_timestamp - 1));
        assert!(!record.is_locked_at(record.end_timestamp));
        assert!(!record.is_empty());
    }

    #[test]
    fn test_pool_fees_survive() {
        let pool = StakingPool {
            admin: Pubkey::new_unique(),
            token_mint: Pubkey::new_unique(),
            lockup_period: 30 * 86_400,
            low_tier_fee: 2.5,
            mid_tier_fee: 1.75,
            high_tier_fee: 0.5,
        };
        let bytes = pool.encode().unwrap();

        assert_eq!(bytes.len(), StakingPool::LEN);
        assert_eq!(StakingPool::decode(&bytes).unwrap(), pool);
    }

    #[test]
    fn test_nan_fee_cannot_be_encoded() {
        let pool = StakingPool {
            low_tier_fee: f64::NAN,
            ..StakingPool::default()
        };
        assert!(matches!(
            pool.encode(),
            Err(crate::ClientError::Encode { what: "StakingAccount", .. })
        ));
    }

    #[test]
    fn test_staker_info_size() {
        let info = StakerInfo {
            total_staked: 10,
            spin_count: 1,
        };
        assert_eq!(info.encode().unwrap().len(), StakerInfo::LEN);
    }
}
