//! Account State Structures
//!
//! Typed, read-only projections of the accounts owned by the sale and staking
//! programs.
//!
//! # Account Types
//!
//! | Schema | Anchor name | Program | Size |
//! |--------|-------------|---------|------|
//! | [`SaleState`] | `IcoAccount` | sale | variable (seed investor list) |
//! | [`PurchaseRecord`] | `PurchaseAccount` | sale | 89 bytes |
//! | [`StakingPool`] | `StakingAccount` | staking | 104 bytes |
//! | [`StakeRecord`] | `StakeRecord` | staking | 73 bytes |
//! | [`StakerInfo`] | `StakerInfo` | staking | 24 bytes |
//! | [`Coupon`] | `Coupon` | staking | variable (code string) |
//! | [`TokenAccount`] | (SPL Token `Pack`) | token | 165 bytes |
//!
//! # Layout
//!
//! Every account starts with an 8-byte discriminator:
//!
//! ```text
//! discriminator = sha256("account:" + AnchorName)[0..8]
//! ```
//!
//! followed by the fields in declaration order, Borsh-encoded. Accounts are
//! often allocated larger than their content (the sale reserves room for 100
//! seed investors), so trailing bytes after the last field are ignored.

pub mod coupon;
pub mod purchase;
pub mod sale;
pub mod staking;
pub mod token;

pub use coupon::{BonusType, Coupon, CouponCategory};
pub use purchase::{cumulative_by_time, totals_by_buyer, CumulativePoint, PurchaseRecord, PurchaseSummary};
pub use sale::{RoundType, SalePhase, SaleState};
pub use staking::{StakeRecord, StakeTier, StakerInfo, StakingPool};
pub use token::{TokenAccount, TokenAccountState};

use crate::error::{ClientError, ClientResult};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::hash::hashv;
use std::fmt;

/// Length of the Anchor account discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Anchor account discriminator for a type name.
pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = hashv(&[b"account:", name.as_bytes()]);
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash.to_bytes()[..DISCRIMINATOR_LEN]);
    out
}

// =============================================================================
// ACCOUNT SCHEMA TRAIT
// =============================================================================

/// A decodable (and, for fixtures, encodable) account layout.
///
/// Field encoding comes from the Borsh derives; implementors name the
/// Anchor type and may add invariants in [`AccountSchema::validate`].
///
/// ```ignore
/// let sale = SaleState::decode(&account.data)?;
/// let bytes = sale.encode()?; // discriminator + fields
/// ```
pub trait AccountSchema: BorshSerialize + BorshDeserialize {
    /// Anchor account type name.
    const NAME: &'static str;

    /// Tag used by dynamic reads.
    const TAG: SchemaTag;

    /// Exact allocation size including the discriminator, when fixed.
    ///
    /// Used as a `dataSize` filter for program scans.
    const SPACE: Option<usize>;

    /// Invariants the layout alone cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// This schema's discriminator.
    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(Self::NAME)
    }

    /// Decode full account data (discriminator + fields).
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` when the data is shorter than the discriminator,
    /// carries another type's discriminator, any field fails to decode, or
    /// [`validate`](AccountSchema::validate) rejects the result.
    fn decode(data: &[u8]) -> ClientResult<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(ClientError::mismatch(
                Self::NAME,
                format!("{} bytes is shorter than the discriminator", data.len()),
            ));
        }
        if data[..DISCRIMINATOR_LEN] != Self::discriminator() {
            return Err(ClientError::mismatch(Self::NAME, "discriminator mismatch"));
        }

        // Not `try_from_slice`: allocation slack after the fields is allowed.
        let mut fields = &data[DISCRIMINATOR_LEN..];
        let value = Self::deserialize(&mut fields)
            .map_err(|e| ClientError::mismatch(Self::NAME, e.to_string()))?;
        value
            .validate()
            .map_err(|reason| ClientError::mismatch(Self::NAME, reason))?;
        Ok(value)
    }

    /// Encode full account data (discriminator + fields).
    ///
    /// Fixed-size schemas are padded to [`AccountSchema::SPACE`].
    ///
    /// # Errors
    ///
    /// `Encode` for values Borsh refuses, such as a NaN fee.
    fn encode(&self) -> ClientResult<Vec<u8>> {
        let mut bytes = Self::discriminator().to_vec();
        self.serialize(&mut bytes)
            .map_err(|e| ClientError::encode(Self::NAME, e))?;
        if let Some(space) = Self::SPACE {
            if bytes.len() < space {
                bytes.resize(space, 0);
            }
        }
        Ok(bytes)
    }
}

// =============================================================================
// SCHEMA TAGS
// =============================================================================

/// Names a schema at runtime, for reads where the type is chosen dynamically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaTag {
    Sale,
    Purchase,
    StakingPool,
    StakeRecord,
    StakerInfo,
    Coupon,
}

impl SchemaTag {
    pub const ALL: [SchemaTag; 6] = [
        SchemaTag::Sale,
        SchemaTag::Purchase,
        SchemaTag::StakingPool,
        SchemaTag::StakeRecord,
        SchemaTag::StakerInfo,
        SchemaTag::Coupon,
    ];

    /// Anchor account type name.
    pub fn name(self) -> &'static str {
        match self {
            SchemaTag::Sale => SaleState::NAME,
            SchemaTag::Purchase => PurchaseRecord::NAME,
            SchemaTag::StakingPool => StakingPool::NAME,
            SchemaTag::StakeRecord => StakeRecord::NAME,
            SchemaTag::StakerInfo => StakerInfo::NAME,
            SchemaTag::Coupon => Coupon::NAME,
        }
    }

    pub fn discriminator(self) -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(self.name())
    }

    /// Which schema, if any, these bytes claim to be.
    pub fn identify(data: &[u8]) -> Option<SchemaTag> {
        let prefix = data.get(..DISCRIMINATOR_LEN)?;
        SchemaTag::ALL
            .into_iter()
            .find(|tag| tag.discriminator() == prefix)
    }

    /// Decode bytes as this schema.
    pub fn decode(self, data: &[u8]) -> ClientResult<DecodedAccount> {
        Ok(match self {
            SchemaTag::Sale => DecodedAccount::Sale(SaleState::decode(data)?),
            SchemaTag::Purchase => DecodedAccount::Purchase(PurchaseRecord::decode(data)?),
            SchemaTag::StakingPool => DecodedAccount::StakingPool(StakingPool::decode(data)?),
            SchemaTag::StakeRecord => DecodedAccount::StakeRecord(StakeRecord::decode(data)?),
            SchemaTag::StakerInfo => DecodedAccount::StakerInfo(StakerInfo::decode(data)?),
            SchemaTag::Coupon => DecodedAccount::Coupon(Coupon::decode(data)?),
        })
    }
}

impl fmt::Display for SchemaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a dynamic decode.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedAccount {
    Sale(SaleState),
    Purchase(PurchaseRecord),
    StakingPool(StakingPool),
    StakeRecord(StakeRecord),
    StakerInfo(StakerInfo),
    Coupon(Coupon),
}

impl DecodedAccount {
    pub fn tag(&self) -> SchemaTag {
        match self {
            DecodedAccount::Sale(_) => SchemaTag::Sale,
            DecodedAccount::Purchase(_) => SchemaTag::Purchase,
            DecodedAccount::StakingPool(_) => SchemaTag::StakingPool,
            DecodedAccount::StakeRecord(_) => SchemaTag::StakeRecord,
            DecodedAccount::StakerInfo(_) => SchemaTag::StakerInfo,
            DecodedAccount::Coupon(_) => SchemaTag::Coupon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program::pubkey::Pubkey;

    #[test]
    fn test_discriminators_are_distinct() {
        let mut seen: Vec<[u8; 8]> = SchemaTag::ALL.iter().map(|t| t.discriminator()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), SchemaTag::ALL.len());
    }

    #[test]
    fn test_discriminator_is_anchor_sighash() {
        let expected = solana_program::hash::hash(b"account:IcoAccount").to_bytes();
        assert_eq!(SchemaTag::Sale.discriminator(), expected[..8]);
    }

    #[test]
    fn test_identify_and_dynamic_decode() {
        let info = StakerInfo {
            total_staked: 1_500,
            spin_count: 3,
        };
        let bytes = info.encode().unwrap();

        assert_eq!(SchemaTag::identify(&bytes), Some(SchemaTag::StakerInfo));
        let decoded = SchemaTag::StakerInfo.decode(&bytes).unwrap();
        assert_eq!(decoded, DecodedAccount::StakerInfo(info));
        assert_eq!(decoded.tag(), SchemaTag::StakerInfo);
    }

    #[test]
    fn test_wrong_schema_is_mismatch() {
        let record = PurchaseRecord {
            buyer: Pubkey::new_unique(),
            amount: 10,
            is_distributed: false,
            timestamp: 1_700_000_000,
            sale: Pubkey::new_unique(),
        };
        let bytes = record.encode().unwrap();

        let err = SchemaTag::Sale.decode(&bytes).unwrap_err();
        assert!(matches!(err, ClientError::SchemaMismatch { schema: "IcoAccount", .. }));
    }

    #[test]
    fn test_trailing_slack_ignored() {
        let info = StakerInfo {
            total_staked: 9,
            spin_count: 1,
        };
        let mut bytes = info.encode().unwrap();
        bytes.extend_from_slice(&[0xAA; 16]);

        assert_eq!(StakerInfo::decode(&bytes).unwrap(), info);
    }

    #[test]
    fn test_short_data_is_mismatch() {
        assert!(StakerInfo::decode(&[1, 2, 3]).is_err());
        assert_eq!(SchemaTag::identify(&[1, 2, 3]), None);
    }
}
