//! In-memory ledger
//!
//! A map of accounts plus a log of submitted transactions. Stands in for a
//! cluster when writing fixtures: tests insert encoded records, run the
//! reader or a binding against it, then inspect what was submitted.
//!
//! Program scans are evaluated locally with the same matcher semantics the
//! RPC node applies.

use crate::error::{ClientError, ClientResult};
use crate::source::{AccountMatcher, AccountSource, ProgramScanner, TransactionSubmitter};
use crate::state::AccountSchema;
use solana_program::hash::Hash;
use solana_program::pubkey::Pubkey;
use solana_program::rent::Rent;
use solana_sdk::account::Account;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

pub struct InMemoryLedger {
    accounts: RwLock<HashMap<Pubkey, Account>>,
    submitted: Mutex<Vec<Transaction>>,
    blockhash: Hash,
}

fn poisoned() -> ClientError {
    ClientError::transport("in-memory ledger lock poisoned")
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            blockhash: Hash::new_unique(),
        }
    }

    /// Store a raw account, replacing any previous one.
    pub fn insert(&self, address: Pubkey, account: Account) -> ClientResult<()> {
        self.accounts
            .write()
            .map_err(|_| poisoned())?
            .insert(address, account);
        Ok(())
    }

    /// Encode `record` and store it as a rent-exempt account owned by `owner`.
    pub fn insert_record<T: AccountSchema>(
        &self,
        address: Pubkey,
        owner: Pubkey,
        record: &T,
    ) -> ClientResult<()> {
        let data = record.encode()?;
        let account = Account {
            lamports: Rent::default().minimum_balance(data.len()),
            data,
            owner,
            executable: false,
            rent_epoch: 0,
        };
        self.insert(address, account)
    }

    /// Remove an account, returning it if it existed.
    pub fn remove(&self, address: &Pubkey) -> ClientResult<Option<Account>> {
        Ok(self.accounts.write().map_err(|_| poisoned())?.remove(address))
    }

    /// Transactions accepted so far, oldest first.
    pub fn submitted(&self) -> ClientResult<Vec<Transaction>> {
        Ok(self.submitted.lock().map_err(|_| poisoned())?.clone())
    }

    /// The blockhash handed out to signers.
    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }
}

impl AccountSource for InMemoryLedger {
    async fn get_account(&self, address: &Pubkey) -> ClientResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .map_err(|_| poisoned())?
            .get(address)
            .cloned())
    }
}

impl ProgramScanner for InMemoryLedger {
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        matchers: &[AccountMatcher],
    ) -> ClientResult<Vec<(Pubkey, Account)>> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .filter(|(_, account)| matchers.iter().all(|m| m.matches(&account.data)))
            .map(|(address, account)| (*address, account.clone()))
            .collect())
    }
}

impl TransactionSubmitter for InMemoryLedger {
    async fn latest_blockhash(&self) -> ClientResult<Hash> {
        Ok(self.blockhash)
    }

    /// Accepts any transaction whose signatures verify. Instructions are not
    /// executed.
    async fn submit(&self, transaction: &Transaction) -> ClientResult<Signature> {
        transaction.verify().map_err(ClientError::transport)?;
        let signature = transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| ClientError::transport("transaction carries no signatures"))?;

        self.submitted
            .lock()
            .map_err(|_| poisoned())?
            .push(transaction.clone());
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StakerInfo;
    use solana_sdk::signature::{Keypair, Signer};
    use solana_sdk::system_instruction;

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let ledger = InMemoryLedger::new();
        let address = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let info = StakerInfo {
            total_staked: 5,
            spin_count: 0,
        };

        assert!(ledger.get_account(&address).await.unwrap().is_none());

        ledger.insert_record(address, owner, &info).unwrap();
        let account = ledger.get_account(&address).await.unwrap().unwrap();
        assert_eq!(account.owner, owner);
        assert_eq!(StakerInfo::decode(&account.data).unwrap(), info);

        ledger.remove(&address).unwrap();
        assert!(ledger.get_account(&address).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_filters_by_owner_program() {
        let ledger = InMemoryLedger::new();
        let program = Pubkey::new_unique();
        let info = StakerInfo::default();

        ledger.insert_record(Pubkey::new_unique(), program, &info).unwrap();
        ledger
            .insert_record(Pubkey::new_unique(), Pubkey::new_unique(), &info)
            .unwrap();

        let found = ledger
            .get_program_accounts(&program, &[AccountMatcher::DataSize(StakerInfo::LEN as u64)])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_requires_valid_signatures() {
        let ledger = InMemoryLedger::new();
        let payer = Keypair::new();
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);

        let unsigned = Transaction::new_with_payer(&[ix.clone()], Some(&payer.pubkey()));
        assert!(ledger.submit(&unsigned).await.is_err());

        let signed = Transaction::new_signed_with_payer(
            &[ix],
            Some(&payer.pubkey()),
            &[&payer],
            ledger.latest_blockhash().await.unwrap(),
        );
        let signature = ledger.submit(&signed).await.unwrap();

        assert_eq!(signature, signed.signatures[0]);
        assert_eq!(ledger.submitted().unwrap().len(), 1);
    }
}
