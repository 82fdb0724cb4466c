//! JSON-RPC source over the nonblocking Solana client.

use crate::error::ClientResult;
use crate::source::{AccountMatcher, AccountSource, ProgramScanner, TransactionSubmitter};
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_program::hash::Hash;
use solana_program::pubkey::Pubkey;
use solana_sdk::account::Account;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tracing::debug;

impl From<&AccountMatcher> for RpcFilterType {
    fn from(matcher: &AccountMatcher) -> Self {
        match matcher {
            AccountMatcher::DataSize(size) => RpcFilterType::DataSize(*size),
            AccountMatcher::Memcmp { offset, bytes } => {
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(*offset, bytes))
            }
        }
    }
}

impl AccountSource for RpcClient {
    async fn get_account(&self, address: &Pubkey) -> ClientResult<Option<Account>> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await?;
        Ok(response.value)
    }
}

impl ProgramScanner for RpcClient {
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        matchers: &[AccountMatcher],
    ) -> ClientResult<Vec<(Pubkey, Account)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(matchers.iter().map(RpcFilterType::from).collect()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment()),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };

        let accounts = self
            .get_program_accounts_with_config(program_id, config)
            .await?;
        debug!(%program_id, filters = matchers.len(), found = accounts.len(), "program scan");
        Ok(accounts)
    }
}

impl TransactionSubmitter for RpcClient {
    async fn latest_blockhash(&self) -> ClientResult<Hash> {
        Ok(self.get_latest_blockhash().await?)
    }

    async fn submit(&self, transaction: &Transaction) -> ClientResult<Signature> {
        Ok(self.send_and_confirm_transaction(transaction).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_to_rpc_filter() {
        let owner = Pubkey::new_unique();
        let mut data = vec![0u8; 8];
        data.extend_from_slice(owner.as_ref());

        let size = RpcFilterType::from(&AccountMatcher::DataSize(73));
        assert!(matches!(size, RpcFilterType::DataSize(73)));

        match RpcFilterType::from(&AccountMatcher::pubkey_at(8, &owner)) {
            RpcFilterType::Memcmp(memcmp) => {
                assert!(memcmp.bytes_match(&data));
                assert!(!memcmp.bytes_match(&data[..20]));
            }
            other => panic!("unexpected filter: {other:?}"),
        }
    }
}
