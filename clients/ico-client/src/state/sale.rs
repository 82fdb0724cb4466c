//! Sale State (`IcoAccount`)
//!
//! The singleton sale account at PDA `["ico"]`.
//!
//! # Memory Layout
//!
//! ```text
//! ┌────────┬──────┬──────────────────────┬───────────────────────────┐
//! │ Offset │ Size │ Field                │ Type                      │
//! ├────────┼──────┼──────────────────────┼───────────────────────────┤
//! │ 0      │ 8    │ discriminator        │ sha256("account:IcoAccount")│
//! │ 8      │ 32   │ authority            │ Pubkey                    │
//! │ 40     │ 32   │ token_mint           │ Pubkey                    │
//! │ 72     │ 8    │ total_supply         │ u64                       │
//! │ 80     │ 8    │ tokens_sold          │ u64                       │
//! │ 88     │ 8    │ seed_price           │ u64 (lamports)            │
//! │ 96     │ 8    │ pre_ico_price        │ u64 (lamports)            │
//! │ 104    │ 8    │ public_price         │ u64 (lamports)            │
//! │ 112    │ 8    │ current_public_price │ u64 (lamports)            │
//! │ 120    │ 8    │ start_time           │ i64 (unix seconds)        │
//! │ 128    │ 8    │ duration             │ i64 (seconds)             │
//! │ 136    │ 1    │ is_active            │ bool                      │
//! │ 137    │ 1    │ round_type           │ enum tag                  │
//! │ 138    │ 4+32n│ seed_investors       │ Vec<Pubkey>               │
//! │ ...    │ 8    │ total_investors      │ u64                       │
//! │ ...    │ 8    │ purchase_counter     │ u64                       │
//! └────────┴──────┴──────────────────────┴───────────────────────────┘
//! ```

use crate::error::ClientError;
use crate::state::{AccountSchema, SchemaTag};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;

/// Seed investor slots the program reserves when it allocates the account.
pub const MAX_SEED_INVESTORS: usize = 100;

// =============================================================================
// ROUND TYPE
// =============================================================================

/// The pricing phase of the sale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
pub enum RoundType {
    /// Whitelisted seed investors only
    #[default]
    Seed = 0,
    /// Pre-sale
    PreIco = 1,
    /// Open sale
    PublicIco = 2,
}

impl RoundType {
    /// Identifier used in forms and request bodies.
    pub fn identifier(self) -> &'static str {
        match self {
            RoundType::Seed => "SeedRound",
            RoundType::PreIco => "PreICO",
            RoundType::PublicIco => "PublicICO",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            RoundType::Seed => "Seed Round",
            RoundType::PreIco => "Pre-ICO",
            RoundType::PublicIco => "Public ICO",
        }
    }
}

impl FromStr for RoundType {
    type Err = ClientError;

    /// Accepts `SeedRound` / `Seed`, `PreICO`, `PublicICO`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SeedRound" | "Seed" => Ok(RoundType::Seed),
            "PreICO" => Ok(RoundType::PreIco),
            "PublicICO" => Ok(RoundType::PublicIco),
            other => Err(ClientError::UnknownRoundType(other.to_string())),
        }
    }
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// SALE PHASE
// =============================================================================

/// Sale lifecycle as observed by a client at a point in time.
///
/// ```text
/// Unstarted ──(now >= start_time)──► Active ──(expiry or is_active=false)──► Ended
/// ```
///
/// `Ended` is terminal. Purchase and stake affordances must be disabled
/// once it is observed; the program still decides what actually executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SalePhase {
    Unstarted,
    Active,
    Ended,
}

// =============================================================================
// SALE STATE
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SaleState {
    pub authority: Pubkey,
    pub token_mint: Pubkey,
    pub total_supply: u64,
    /// Never exceeds `total_supply`; decoding rejects data where it does.
    pub tokens_sold: u64,
    pub seed_price: u64,
    pub pre_ico_price: u64,
    pub public_price: u64,
    pub current_public_price: u64,
    pub start_time: i64,
    pub duration: i64,
    pub is_active: bool,
    pub round_type: RoundType,
    pub seed_investors: Vec<Pubkey>,
    pub total_investors: u64,
    pub purchase_counter: u64,
}

impl SaleState {
    /// Bytes the program allocates: discriminator, fixed fields and
    /// [`MAX_SEED_INVESTORS`] slots.
    pub const ALLOCATED_SPACE: usize = 8 + 32 + 32 + 8 * 6 + 8 + 8 + 1 + 1 + 4 + 32 * MAX_SEED_INVESTORS + 8 + 8;

    /// `start_time + duration`, saturating.
    pub fn end_time(&self) -> i64 {
        self.start_time.saturating_add(self.duration)
    }

    /// Observed lifecycle phase at unix time `now`.
    pub fn phase_at(&self, now: i64) -> SalePhase {
        if !self.is_active || now >= self.end_time() {
            SalePhase::Ended
        } else if now < self.start_time {
            SalePhase::Unstarted
        } else {
            SalePhase::Active
        }
    }

    /// Whether purchase UI should be enabled at `now`. Advisory only.
    pub fn accepts_purchases(&self, now: i64) -> bool {
        self.phase_at(now) == SalePhase::Active
    }

    /// Tokens still available.
    pub fn remaining_supply(&self) -> u64 {
        self.total_supply.saturating_sub(self.tokens_sold)
    }

    /// Share of supply sold, in basis points (10_000 = 100%).
    ///
    /// Integer math on u128, so large supplies lose no precision.
    /// A zero supply reads as 0.
    pub fn percent_sold_bps(&self) -> u32 {
        if self.total_supply == 0 {
            return 0;
        }
        let bps = (self.tokens_sold as u128 * 10_000) / self.total_supply as u128;
        bps.min(10_000) as u32
    }

    /// Share of supply sold as text with two decimals, e.g. `"25.00%"`.
    pub fn percent_sold(&self) -> String {
        let bps = self.percent_sold_bps();
        format!("{}.{:02}%", bps / 100, bps % 100)
    }

    pub fn is_seed_investor(&self, investor: &Pubkey) -> bool {
        self.seed_investors.contains(investor)
    }
}

impl AccountSchema for SaleState {
    const NAME: &'static str = "IcoAccount";
    const TAG: SchemaTag = SchemaTag::Sale;
    const SPACE: Option<usize> = None;

    fn validate(&self) -> Result<(), String> {
        if self.tokens_sold > self.total_supply {
            return Err(format!(
                "tokens_sold {} exceeds total_supply {}",
                self.tokens_sold, self.total_supply
            ));
        }
        Ok(())
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SaleState {
        SaleState {
            authority: Pubkey::new_unique(),
            token_mint: Pubkey::new_unique(),
            total_supply: 1_000,
            tokens_sold: 250,
            seed_price: 1_000_000,
            pre_ico_price: 2_000_000,
            public_price: 3_000_000,
            current_public_price: 3_500_000,
            start_time: 1_700_000_000,
            duration: 86_400,
            is_active: true,
            round_type: RoundType::PreIco,
            seed_investors: vec![Pubkey::new_unique(), Pubkey::new_unique()],
            total_investors: 7,
            purchase_counter: 9,
        }
    }

    #[test]
    fn test_decode_fixture_fields_exactly() {
        let mut sale = fixture();
        sale.total_supply = u64::MAX;
        sale.tokens_sold = u64::MAX - 1;
        sale.start_time = i64::MIN + 1;

        let mut bytes = sale.encode().unwrap();
        // Allocated accounts carry zeroed slack after the last field.
        bytes.resize(SaleState::ALLOCATED_SPACE, 0);

        assert_eq!(SaleState::decode(&bytes).unwrap(), sale);
    }

    #[test]
    fn test_field_offsets() {
        let sale = fixture();
        let bytes = sale.encode().unwrap();

        assert_eq!(&bytes[8..40], sale.authority.as_ref());
        assert_eq!(&bytes[72..80], &1_000u64.to_le_bytes());
        // is_active precedes round_type, as the program declares them
        assert_eq!(bytes[136], 1);
        assert_eq!(bytes[137], RoundType::PreIco as u8);
        assert_eq!(&bytes[138..142], &2u32.to_le_bytes());
    }

    #[test]
    fn test_unknown_round_tag_rejected() {
        let mut bytes = fixture().encode().unwrap();
        bytes[137] = 3;

        let err = SaleState::decode(&bytes).unwrap_err();
        assert!(matches!(err, ClientError::SchemaMismatch { schema: "IcoAccount", .. }));
    }

    #[test]
    fn test_oversold_rejected() {
        let mut sale = fixture();
        sale.tokens_sold = sale.total_supply + 1;

        let err = SaleState::decode(&sale.encode().unwrap()).unwrap_err();
        assert!(err.to_string().contains("exceeds total_supply"));
    }

    #[test]
    fn test_truncated_investor_list_rejected() {
        let bytes = fixture().encode().unwrap();
        // Cut into the second seed investor.
        assert!(SaleState::decode(&bytes[..150 + 32]).is_err());
    }

    #[test]
    fn test_percent_sold() {
        let sale = fixture();
        assert_eq!(sale.percent_sold_bps(), 2_500);
        assert_eq!(sale.percent_sold(), "25.00%");

        let third = SaleState {
            total_supply: 3,
            tokens_sold: 1,
            ..fixture()
        };
        assert_eq!(third.percent_sold(), "33.33%");

        let empty = SaleState {
            total_supply: 0,
            tokens_sold: 0,
            ..fixture()
        };
        assert_eq!(empty.percent_sold(), "0.00%");
    }

    #[test]
    fn test_phases() {
        let sale = fixture();
        let start = sale.start_time;

        assert_eq!(sale.phase_at(start - 1), SalePhase::Unstarted);
        assert_eq!(sale.phase_at(start), SalePhase::Active);
        assert_eq!(sale.phase_at(sale.end_time() - 1), SalePhase::Active);
        assert_eq!(sale.phase_at(sale.end_time()), SalePhase::Ended);
        assert!(sale.accepts_purchases(start + 10));

        let ended = SaleState {
            is_active: false,
            ..fixture()
        };
        assert_eq!(ended.phase_at(start + 10), SalePhase::Ended);
        assert!(!ended.accepts_purchases(start + 10));
    }

    #[test]
    fn test_round_type_parsing() {
        assert_eq!("SeedRound".parse::<RoundType>().unwrap(), RoundType::Seed);
        assert_eq!("PreICO".parse::<RoundType>().unwrap(), RoundType::PreIco);
        assert_eq!("PublicICO".parse::<RoundType>().unwrap(), RoundType::PublicIco);
        assert!(matches!(
            "Private".parse::<RoundType>(),
            Err(ClientError::UnknownRoundType(_))
        ));
        assert_eq!(RoundType::PreIco.to_string(), "Pre-ICO");
    }

    #[test]
    fn test_seed_investor_lookup() {
        let sale = fixture();
        assert!(sale.is_seed_investor(&sale.seed_investors[1]));
        assert!(!sale.is_seed_investor(&Pubkey::new_unique()));
    }
}
