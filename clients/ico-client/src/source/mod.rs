//! Account Sources
//!
//! The network seam. Everything above this module talks to a cluster through
//! three small traits:
//!
//! | Trait | Operation | RPC method |
//! |-------|-----------|------------|
//! | [`AccountSource`] | one account by address | `getAccountInfo` |
//! | [`ProgramScanner`] | all accounts of a program matching filters | `getProgramAccounts` |
//! | [`TransactionSubmitter`] | blockhash + send | `getLatestBlockhash`, `sendTransaction` |
//!
//! Implementations:
//!
//! * `RpcClient` (nonblocking) in [`rpc`]
//! * [`InMemoryLedger`] in [`memory`], used for fixtures and tests
//!
//! No implementation caches, retries or times out. Errors come back as
//! [`ClientError::Transport`](crate::ClientError) with the source intact.

pub mod memory;
pub mod rpc;

pub use memory::InMemoryLedger;

use crate::error::ClientResult;
use solana_program::hash::Hash;
use solana_program::pubkey::Pubkey;
use solana_sdk::account::Account;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

// =============================================================================
// MATCHERS
// =============================================================================

/// Server-side filter for a program scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountMatcher {
    /// Account data is exactly this many bytes
    DataSize(u64),
    /// Account data contains `bytes` starting at `offset`
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl AccountMatcher {
    pub fn memcmp(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        AccountMatcher::Memcmp {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Match a public key stored at `offset`.
    pub fn pubkey_at(offset: usize, key: &Pubkey) -> Self {
        AccountMatcher::memcmp(offset, key.to_bytes().to_vec())
    }

    /// Evaluate locally, as the RPC node would.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountMatcher::DataSize(size) => data.len() as u64 == *size,
            AccountMatcher::Memcmp { offset, bytes } => offset
                .checked_add(bytes.len())
                .and_then(|end| data.get(*offset..end))
                .map_or(false, |window| window == bytes.as_slice()),
        }
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Fetch one account.
#[allow(async_fn_in_trait)]
pub trait AccountSource {
    /// `Ok(None)` when no account exists at `address`.
    async fn get_account(&self, address: &Pubkey) -> ClientResult<Option<Account>>;
}

/// Scan all accounts owned by a program.
#[allow(async_fn_in_trait)]
pub trait ProgramScanner {
    /// Accounts owned by `program_id` matching every matcher.
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        matchers: &[AccountMatcher],
    ) -> ClientResult<Vec<(Pubkey, Account)>>;
}

/// Submit signed transactions.
#[allow(async_fn_in_trait)]
pub trait TransactionSubmitter {
    async fn latest_blockhash(&self) -> ClientResult<Hash>;

    /// Send a fully signed transaction. Exactly one attempt.
    async fn submit(&self, transaction: &Transaction) -> ClientResult<Signature>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_size_matcher() {
        let matcher = AccountMatcher::DataSize(4);
        assert!(matcher.matches(&[0; 4]));
        assert!(!matcher.matches(&[0; 5]));
    }

    #[test]
    fn test_memcmp_matcher() {
        let owner = Pubkey::new_unique();
        let mut data = vec![0u8; 8];
        data.extend_from_slice(owner.as_ref());

        assert!(AccountMatcher::pubkey_at(8, &owner).matches(&data));
        assert!(!AccountMatcher::pubkey_at(8, &Pubkey::new_unique()).matches(&data));
        // Window past the end never matches.
        assert!(!AccountMatcher::pubkey_at(16, &owner).matches(&data));
        assert!(!AccountMatcher::memcmp(usize::MAX, vec![1]).matches(&data));
    }
}
