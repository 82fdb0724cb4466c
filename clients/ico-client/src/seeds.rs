//! Seed Registry
//!
//! The byte-string seeds both programs use for their program-derived
//! addresses. Every derivation in this crate goes through [`seed_for`] so call
//! sites can never drift apart.
//!
//! | Purpose | Seed | Program | Extra components |
//! |---------|------|---------|------------------|
//! | Ico | `ico` | sale | none |
//! | Purchase | `purchase` | sale | buyer |
//! | UserTokenAccount | `user_token_account` | sale | buyer |
//! | Treasury | `treasury` | sale | none |
//! | TokenAccount | `token_account` | sale | investor |
//! | StakingAccount | `staking_account` | staking | none |
//! | StakerInfo | `staker_info` | staking | staking account, owner |

use crate::error::{ClientError, ClientResult};
use std::fmt;
use std::str::FromStr;

pub const ICO_SEED: &[u8] = b"ico";
pub const PURCHASE_SEED: &[u8] = b"purchase";
pub const STAKING_ACCOUNT_SEED: &[u8] = b"staking_account";
pub const STAKER_INFO_SEED: &[u8] = b"staker_info";
pub const USER_TOKEN_ACCOUNT_SEED: &[u8] = b"user_token_account";
pub const TREASURY_SEED: &[u8] = b"treasury";
pub const TOKEN_ACCOUNT_SEED: &[u8] = b"token_account";

/// What a derived address is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeedPurpose {
    /// Singleton sale state
    Ico,
    /// Per-buyer purchase record
    Purchase,
    /// Singleton staking pool
    StakingAccount,
    /// Per-owner staking aggregate
    StakerInfo,
    /// Program-owned token account for a buyer
    UserTokenAccount,
    /// Sale treasury
    Treasury,
    /// Program-owned token account for an investor
    TokenAccount,
}

impl SeedPurpose {
    /// Every registered purpose, in table order.
    pub const ALL: [SeedPurpose; 7] = [
        SeedPurpose::Ico,
        SeedPurpose::Purchase,
        SeedPurpose::StakingAccount,
        SeedPurpose::StakerInfo,
        SeedPurpose::UserTokenAccount,
        SeedPurpose::Treasury,
        SeedPurpose::TokenAccount,
    ];

    /// The registered seed bytes.
    pub const fn seed(self) -> &'static [u8] {
        match self {
            SeedPurpose::Ico => ICO_SEED,
            SeedPurpose::Purchase => PURCHASE_SEED,
            SeedPurpose::StakingAccount => STAKING_ACCOUNT_SEED,
            SeedPurpose::StakerInfo => STAKER_INFO_SEED,
            SeedPurpose::UserTokenAccount => USER_TOKEN_ACCOUNT_SEED,
            SeedPurpose::Treasury => TREASURY_SEED,
            SeedPurpose::TokenAccount => TOKEN_ACCOUNT_SEED,
        }
    }

    /// The textual tag, identical to the seed string.
    pub fn tag(self) -> &'static str {
        // Seeds are ASCII literals above.
        match self {
            SeedPurpose::Ico => "ico",
            SeedPurpose::Purchase => "purchase",
            SeedPurpose::StakingAccount => "staking_account",
            SeedPurpose::StakerInfo => "staker_info",
            SeedPurpose::UserTokenAccount => "user_token_account",
            SeedPurpose::Treasury => "treasury",
            SeedPurpose::TokenAccount => "token_account",
        }
    }

    /// Parse a textual tag.
    ///
    /// # Errors
    ///
    /// `UnknownSeedPurpose` when the tag names no registered seed.
    pub fn from_tag(tag: &str) -> ClientResult<Self> {
        SeedPurpose::ALL
            .into_iter()
            .find(|purpose| purpose.tag() == tag)
            .ok_or_else(|| ClientError::UnknownSeedPurpose(tag.to_string()))
    }
}

impl FromStr for SeedPurpose {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeedPurpose::from_tag(s)
    }
}

impl fmt::Display for SeedPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Seed bytes for a purpose.
pub fn seed_for(purpose: SeedPurpose) -> &'static [u8] {
    purpose.seed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_bytes() {
        assert_eq!(seed_for(SeedPurpose::Ico), b"ico");
        assert_eq!(seed_for(SeedPurpose::Purchase), b"purchase");
        assert_eq!(seed_for(SeedPurpose::StakingAccount), b"staking_account");
        assert_eq!(seed_for(SeedPurpose::StakerInfo), b"staker_info");
        assert_eq!(seed_for(SeedPurpose::UserTokenAccount), b"user_token_account");
        assert_eq!(seed_for(SeedPurpose::Treasury), b"treasury");
        assert_eq!(seed_for(SeedPurpose::TokenAccount), b"token_account");
    }

    #[test]
    fn test_seed_stable_across_calls() {
        for purpose in SeedPurpose::ALL {
            assert_eq!(seed_for(purpose), seed_for(purpose));
            assert_eq!(seed_for(purpose).as_ptr(), seed_for(purpose).as_ptr());
        }
    }

    #[test]
    fn test_tag_matches_seed() {
        for purpose in SeedPurpose::ALL {
            assert_eq!(purpose.tag().as_bytes(), purpose.seed());
            assert_eq!(SeedPurpose::from_tag(purpose.tag()).unwrap(), purpose);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = "vault".parse::<SeedPurpose>().unwrap_err();
        assert!(matches!(err, ClientError::UnknownSeedPurpose(tag) if tag == "vault"));

        // Case matters: seeds are byte-exact.
        assert!(SeedPurpose::from_tag("ICO").is_err());
    }
}
