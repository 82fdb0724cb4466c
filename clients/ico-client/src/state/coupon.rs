//! Coupon
//!
//! Admin-created promotion codes held by the staking program. Coupons have
//! no registered seed; they are listed with a program scan.
//!
//! Redemption rules (who may use a coupon, how the bonus applies) live in the
//! program. This client only reads them back.

use crate::state::{AccountSchema, SchemaTag};
use borsh::{BorshDeserialize, BorshSerialize};

/// How a coupon's `bonus_value` is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
pub enum BonusType {
    Percentage = 0,
    FixedAmount = 1,
    SpinBonus = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
pub enum CouponCategory {
    NewUser = 0,
    Referral = 1,
    LoyaltyReward = 2,
    SeasonalPromo = 3,
    Exclusive = 4,
}

/// A promotion code.
///
/// ```text
/// code              String (u32 len + UTF-8)
/// bonus_type        u8
/// bonus_value       f64
/// duration          i64 (seconds)
/// min_stake_amount  u64 (base units)
/// max_uses          u64
/// category          u8
/// ```
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct Coupon {
    pub code: String,
    pub bonus_type: BonusType,
    pub bonus_value: f64,
    pub duration: i64,
    pub min_stake_amount: u64,
    pub max_uses: u64,
    pub category: CouponCategory,
}

impl AccountSchema for Coupon {
    const NAME: &'static str = "Coupon";
    const TAG: SchemaTag = SchemaTag::Coupon;
    const SPACE: Option<usize> = None;
}
