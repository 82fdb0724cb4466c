//! Account Reader
//!
//! Fetches raw account bytes and decodes them against a schema.
//!
//! # Outcomes
//!
//! | Chain state | Result |
//! |-------------|--------|
//! | no account at the address | `Ok(Fetched::Absent)` |
//! | account with zero-length data | `Ok(Fetched::Absent)` |
//! | account owned by another program | `Err(SchemaMismatch)` |
//! | bytes that do not decode | `Err(SchemaMismatch)` |
//! | bytes that decode | `Ok(Fetched::Present(value))` |
//! | network failure | `Err(Transport)` |
//!
//! Absence is a normal state (a buyer who has not purchased yet), so it is a
//! result and not an error. Nothing is cached: every call goes to the source.

use crate::error::{ClientError, ClientResult};
use crate::source::{AccountMatcher, AccountSource, ProgramScanner};
use crate::state::{AccountSchema, DecodedAccount, SchemaTag, TokenAccount};
use solana_program::pubkey::Pubkey;
use solana_sdk::account::Account;
use std::marker::PhantomData;
use tracing::debug;

// =============================================================================
// FETCHED
// =============================================================================

/// A read that either found the account or found nothing.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched<T> {
    Present(T),
    Absent,
}

impl<T> Fetched<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Fetched::Absent)
    }

    pub fn present(&self) -> Option<&T> {
        match self {
            Fetched::Present(value) => Some(value),
            Fetched::Absent => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Fetched::Present(value) => Some(value),
            Fetched::Absent => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Fetched<U> {
        match self {
            Fetched::Present(value) => Fetched::Present(f(value)),
            Fetched::Absent => Fetched::Absent,
        }
    }
}

impl<T> From<Option<T>> for Fetched<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Fetched::Absent, Fetched::Present)
    }
}

// =============================================================================
// READER
// =============================================================================

/// Reads accounts owned by one program.
pub struct AccountReader<'a, S> {
    source: &'a S,
    program_id: Pubkey,
}

impl<'a, S> AccountReader<'a, S> {
    pub fn new(source: &'a S, program_id: Pubkey) -> Self {
        Self { source, program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Reject accounts the expected program does not own.
    fn check_owner(&self, schema: &'static str, address: &Pubkey, account: &Account) -> ClientResult<()> {
        if account.owner != self.program_id {
            return Err(ClientError::SchemaMismatch {
                schema,
                account: address.to_string(),
                reason: format!(
                    "owned by {}, expected {}",
                    account.owner, self.program_id
                ),
            });
        }
        Ok(())
    }
}

impl<'a, S: AccountSource> AccountReader<'a, S> {
    /// Fetch the account unless it is missing or empty.
    async fn fetch_raw(&self, schema: &'static str, address: &Pubkey) -> ClientResult<Option<Account>> {
        let account = match self.source.get_account(address).await? {
            Some(account) if !account.data.is_empty() => account,
            _ => {
                debug!(%address, schema, "account absent");
                return Ok(None);
            }
        };
        self.check_owner(schema, address, &account)?;
        Ok(Some(account))
    }

    /// Fetch and decode one account as `T`.
    ///
    /// # Errors
    ///
    /// * `SchemaMismatch` - wrong owner, discriminator or layout
    /// * `Transport` - the source failed
    pub async fn fetch_typed<T: AccountSchema>(&self, address: &Pubkey) -> ClientResult<Fetched<T>> {
        let Some(account) = self.fetch_raw(T::NAME, address).await? else {
            return Ok(Fetched::Absent);
        };
        let value = T::decode(&account.data).map_err(|e| e.at_account(address))?;
        debug!(%address, schema = T::NAME, bytes = account.data.len(), "decoded account");
        Ok(Fetched::Present(value))
    }

    /// Fetch and decode one account with the schema chosen at runtime.
    pub async fn fetch_tagged(
        &self,
        address: &Pubkey,
        tag: SchemaTag,
    ) -> ClientResult<Fetched<DecodedAccount>> {
        let Some(account) = self.fetch_raw(tag.name(), address).await? else {
            return Ok(Fetched::Absent);
        };
        let value = tag.decode(&account.data).map_err(|e| e.at_account(address))?;
        Ok(Fetched::Present(value))
    }

    /// Fetch an SPL token account. The reader's program id must be the
    /// token program.
    pub async fn fetch_token_account(&self, address: &Pubkey) -> ClientResult<Fetched<TokenAccount>> {
        let Some(account) = self.fetch_raw("TokenAccount", address).await? else {
            return Ok(Fetched::Absent);
        };
        let value = TokenAccount::unpack(&account.data).map_err(|e| e.at_account(address))?;
        Ok(Fetched::Present(value))
    }
}

impl<'a, S: ProgramScanner> AccountReader<'a, S> {
    /// All `T` accounts of the program matching `matchers`.
    ///
    /// The schema's discriminator is always added as the first matcher, so
    /// other account types never reach the decoder. The returned iterator
    /// decodes lazily, is finite and can be consumed once; call again for a
    /// fresh query.
    pub async fn fetch_all_by_filter<T: AccountSchema>(
        &self,
        matchers: &[AccountMatcher],
    ) -> ClientResult<ScanResults<T>> {
        let mut filters = Vec::with_capacity(matchers.len() + 1);
        filters.push(AccountMatcher::memcmp(0, T::discriminator().to_vec()));
        filters.extend_from_slice(matchers);

        let accounts = self
            .source
            .get_program_accounts(&self.program_id, &filters)
            .await?;
        debug!(program_id = %self.program_id, schema = T::NAME, found = accounts.len(), "scan");

        Ok(ScanResults {
            inner: accounts.into_iter(),
            _schema: PhantomData,
        })
    }
}

// =============================================================================
// SCAN RESULTS
// =============================================================================

/// Decoding iterator over a program scan.
///
/// Each item is decoded when it is pulled. A record that fails to decode
/// yields `Err(SchemaMismatch)` with its address and does not stop the
/// remaining items.
pub struct ScanResults<T> {
    inner: std::vec::IntoIter<(Pubkey, Account)>,
    _schema: PhantomData<T>,
}

impl<T: AccountSchema> Iterator for ScanResults<T> {
    type Item = ClientResult<(Pubkey, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (address, account) = self.inner.next()?;
        Some(
            T::decode(&account.data)
                .map(|value| (address, value))
                .map_err(|e| e.at_account(&address)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: AccountSchema> ExactSizeIterator for ScanResults<T> {}
