//! SPL Token Account
//!
//! Token accounts are owned by the SPL Token program, not by the sale, so
//! they carry no Anchor discriminator. The layout is the fixed 165-byte
//! `Pack` layout:
//!
//! | Offset | Size | Field | Notes |
//! |--------|------|-------|-------|
//! | 0 | 32 | mint | |
//! | 32 | 32 | owner | |
//! | 64 | 8 | amount | u64 LE |
//! | 72 | 36 | delegate | COption: u32 tag + Pubkey |
//! | 108 | 1 | state | 0 uninitialized, 1 initialized, 2 frozen |
//! | 109 | 12 | is_native | COption: u32 tag + u64 |
//! | 121 | 8 | delegated_amount | u64 LE |
//! | 129 | 36 | close_authority | COption: u32 tag + Pubkey |
//!
//! Token-2022 accounts append extensions after byte 165; those bytes are
//! ignored.

use crate::error::{ClientError, ClientResult};
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::pubkey::Pubkey;

const SCHEMA: &str = "TokenAccount";

/// Lifecycle of a token account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenAccountState {
    Uninitialized,
    Initialized,
    Frozen,
}

impl TokenAccountState {
    fn from_u8(value: u8) -> ClientResult<Self> {
        match value {
            0 => Ok(TokenAccountState::Uninitialized),
            1 => Ok(TokenAccountState::Initialized),
            2 => Ok(TokenAccountState::Frozen),
            other => Err(ClientError::mismatch(
                SCHEMA,
                format!("unknown account state {other}"),
            )),
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            TokenAccountState::Uninitialized => 0,
            TokenAccountState::Initialized => 1,
            TokenAccountState::Frozen => 2,
        }
    }
}

/// Decoded SPL token account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub delegate: Option<Pubkey>,
    pub state: TokenAccountState,
    /// Rent-exempt reserve when the account wraps SOL.
    pub is_native: Option<u64>,
    pub delegated_amount: u64,
    pub close_authority: Option<Pubkey>,
}

impl TokenAccount {
    pub const LEN: usize = 165;

    /// Decode the base layout.
    ///
    /// An uninitialized account is reported as a mismatch: its bytes are
    /// zeroes and carry no balance.
    pub fn unpack(data: &[u8]) -> ClientResult<Self> {
        if data.len() < Self::LEN {
            return Err(ClientError::mismatch(
                SCHEMA,
                format!("{} bytes, expected at least {}", data.len(), Self::LEN),
            ));
        }
        let input = array_ref![data, 0, TokenAccount::LEN];

        #[allow(clippy::ptr_offset_with_cast)]
        let (mint, owner, amount, delegate, state, is_native, delegated_amount, close_authority) =
            array_refs![input, 32, 32, 8, 36, 1, 12, 8, 36];

        let state = TokenAccountState::from_u8(state[0])?;
        if state == TokenAccountState::Uninitialized {
            return Err(ClientError::mismatch(SCHEMA, "account is not initialized"));
        }

        Ok(TokenAccount {
            mint: Pubkey::new_from_array(*mint),
            owner: Pubkey::new_from_array(*owner),
            amount: u64::from_le_bytes(*amount),
            delegate: unpack_option_pubkey(delegate)?,
            state,
            is_native: unpack_option_u64(is_native)?,
            delegated_amount: u64::from_le_bytes(*delegated_amount),
            close_authority: unpack_option_pubkey(close_authority)?,
        })
    }

    /// Encode the base layout. Used to build fixtures.
    pub fn pack(&self) -> Vec<u8> {
        let mut data = vec![0u8; Self::LEN];
        let output = array_mut_ref![data, 0, TokenAccount::LEN];

        #[allow(clippy::ptr_offset_with_cast)]
        let (
            mint_dst,
            owner_dst,
            amount_dst,
            delegate_dst,
            state_dst,
            is_native_dst,
            delegated_amount_dst,
            close_authority_dst,
        ) = mut_array_refs![output, 32, 32, 8, 36, 1, 12, 8, 36];

        mint_dst.copy_from_slice(self.mint.as_ref());
        owner_dst.copy_from_slice(self.owner.as_ref());
        *amount_dst = self.amount.to_le_bytes();
        pack_option_pubkey(self.delegate.as_ref(), delegate_dst);
        state_dst[0] = self.state.to_u8();
        pack_option_u64(self.is_native, is_native_dst);
        *delegated_amount_dst = self.delegated_amount.to_le_bytes();
        pack_option_pubkey(self.close_authority.as_ref(), close_authority_dst);

        data
    }
}

// =============================================================================
// COPTION HELPERS
// =============================================================================

fn unpack_option_pubkey(src: &[u8; 36]) -> ClientResult<Option<Pubkey>> {
    let (tag, body) = array_refs![src, 4, 32];
    match u32::from_le_bytes(*tag) {
        0 => Ok(None),
        1 => Ok(Some(Pubkey::new_from_array(*body))),
        other => Err(ClientError::mismatch(SCHEMA, format!("bad option tag {other}"))),
    }
}

fn pack_option_pubkey(src: Option<&Pubkey>, dst: &mut [u8; 36]) {
    let (tag, body) = mut_array_refs![dst, 4, 32];
    match src {
        Some(key) => {
            *tag = 1u32.to_le_bytes();
            body.copy_from_slice(key.as_ref());
        }
        None => {
            *tag = 0u32.to_le_bytes();
            body.fill(0);
        }
    }
}

fn unpack_option_u64(src: &[u8; 12]) -> ClientResult<Option<u64>> {
    let (tag, body) = array_refs![src, 4, 8];
    match u32::from_le_bytes(*tag) {
        0 => Ok(None),
        1 => Ok(Some(u64::from_le_bytes(*body))),
        other => Err(ClientError::mismatch(SCHEMA, format!("bad option tag {other}"))),
    }
}

fn pack_option_u64(src: Option<u64>, dst: &mut [u8; 12]) {
    let (tag, body) = mut_array_refs![dst, 4, 8];
    match src {
        Some(value) => {
            *tag = 1u32.to_le_bytes();
            *body = value.to_le_bytes();
        }
        None => {
            *tag = 0u32.to_le_bytes();
            *body = 0u64.to_le_bytes();
        }
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> TokenAccount {
        TokenAccount {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            amount: 1_500_000,
            delegate: None,
            state: TokenAccountState::Initialized,
            is_native: None,
            delegated_amount: 0,
            close_authority: Some(Pubkey::new_unique()),
        }
    }

    #[test]
    fn test_field_offsets() {
        let account = account();
        let data = account.pack();

        assert_eq!(data.len(), 165);
        assert_eq!(&data[0..32], account.mint.as_ref());
        assert_eq!(&data[32..64], account.owner.as_ref());
        assert_eq!(data[64..72], 1_500_000u64.to_le_bytes());
        assert_eq!(data[108], 1);
        assert_eq!(data[129..133], 1u32.to_le_bytes());
        assert_eq!(TokenAccount::unpack(&data).unwrap(), account);
    }

    #[test]
    fn test_extension_bytes_ignored() {
        let account = account();
        let mut data = account.pack();
        data.extend_from_slice(&[7u8; 64]);

        assert_eq!(TokenAccount::unpack(&data).unwrap().amount, 1_500_000);
    }

    #[test]
    fn test_short_data_rejected() {
        let err = TokenAccount::unpack(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, ClientError::SchemaMismatch { schema: "TokenAccount", .. }));
    }

    #[test]
    fn test_uninitialized_rejected() {
        let mut data = account().pack();
        data[108] = 0;
        assert!(TokenAccount::unpack(&data).is_err());
    }

    #[test]
    fn test_bad_option_tag_rejected() {
        let mut data = account().pack();
        data[72..76].copy_from_slice(&2u32.to_le_bytes());
        let err = TokenAccount::unpack(&data).unwrap_err();
        assert!(err.to_string().contains("bad option tag 2"));
    }
}
