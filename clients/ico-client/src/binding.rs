//! Program Binding Factory
//!
//! A [`ProgramBinding`] ties together one network endpoint, one program id
//! and one (optional) signing identity. Every read and every mutating call
//! for that program goes through it.
//!
//! # Lifecycle
//!
//! ```text
//! bind(endpoint, program_id, identity)   no network I/O
//!      │
//!      ├── reads ────► AccountReader ────► source (getAccountInfo / getProgramAccounts)
//!      │
//!      └── mutations ─► build ix ─► sign (identity + extra signers) ─► submit once
//! ```
//!
//! Bindings are created explicitly per session. There is no process-wide
//! instance; two bindings with the same inputs behave identically and derive
//! identical addresses.
//!
//! # Failure Modes
//!
//! | Situation | Error |
//! |-----------|-------|
//! | mutating call, no identity or a read-only identity | `MissingSigningIdentity` |
//! | program rejects the transaction | `Transport` (never retried) |
//! | account bytes do not decode | `SchemaMismatch` |
//! | token account not owned by the token program | `SchemaMismatch` |

use crate::error::{ClientError, ClientResult};
use crate::instruction::{
    self, CouponParams, SaleParams, SaleParamsUpdate, StakeAccounts, StakingParams,
};
use crate::pda::{self, DerivedAddress};
use crate::reader::{AccountReader, Fetched};
use crate::seeds::SeedPurpose;
use crate::source::{AccountMatcher, AccountSource, ProgramScanner, TransactionSubmitter};
use crate::state::{
    Coupon, PurchaseRecord, RoundType, SaleState, StakeRecord, StakerInfo, StakingPool,
};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// SIGNING IDENTITY
// =============================================================================

/// The caller's public key, plus the ability to sign when a wallet is
/// connected.
#[derive(Clone)]
pub struct SigningIdentity {
    pubkey: Pubkey,
    signer: Option<Arc<dyn Signer + Send + Sync>>,
}

impl SigningIdentity {
    /// Identity that can read but not sign.
    pub fn read_only(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            signer: None,
        }
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            pubkey: keypair.pubkey(),
            signer: Some(Arc::new(keypair)),
        }
    }

    pub fn from_signer(signer: Arc<dyn Signer + Send + Sync>) -> Self {
        Self {
            pubkey: signer.pubkey(),
            signer: Some(signer),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("pubkey", &self.pubkey)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

// =============================================================================
// BINDING
// =============================================================================

/// Handle scoped to one endpoint, one program and one identity.
///
/// Immutable once built. The client is shared behind an `Arc`, so bindings
/// for the sale and the staking program can use one connection.
pub struct ProgramBinding<C = RpcClient> {
    endpoint: String,
    program_id: Pubkey,
    identity: Option<SigningIdentity>,
    client: Arc<C>,
}

/// Bind to `program_id` at `endpoint` with `processed` commitment.
///
/// Lazy: constructs the RPC client without contacting the endpoint.
pub fn bind(
    endpoint: &str,
    program_id: Pubkey,
    identity: Option<SigningIdentity>,
) -> ProgramBinding<RpcClient> {
    bind_with_commitment(endpoint, program_id, identity, CommitmentConfig::processed())
}

pub fn bind_with_commitment(
    endpoint: &str,
    program_id: Pubkey,
    identity: Option<SigningIdentity>,
    commitment: CommitmentConfig,
) -> ProgramBinding<RpcClient> {
    let client = RpcClient::new_with_commitment(endpoint.to_string(), commitment);
    ProgramBinding::with_client(endpoint, program_id, identity, Arc::new(client))
}

impl<C> ProgramBinding<C> {
    /// Bind over an existing client or any other account source.
    pub fn with_client(
        endpoint: &str,
        program_id: Pubkey,
        identity: Option<SigningIdentity>,
        client: Arc<C>,
    ) -> Self {
        debug!(endpoint, %program_id, identity = ?identity, "program binding created");
        Self {
            endpoint: endpoint.to_string(),
            program_id,
            identity,
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn identity(&self) -> Option<&SigningIdentity> {
        self.identity.as_ref()
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Reader for accounts owned by this binding's program.
    pub fn reader(&self) -> AccountReader<'_, C> {
        AccountReader::new(self.client.as_ref(), self.program_id)
    }

    // =========================================================================
    // ADDRESSES
    // =========================================================================

    /// Derive under this binding's program.
    pub fn derive(&self, purpose: SeedPurpose, components: &[&[u8]]) -> ClientResult<DerivedAddress> {
        pda::derive_for(&self.program_id, purpose, components)
    }

    pub fn sale_address(&self) -> ClientResult<Pubkey> {
        Ok(pda::sale_address(&self.program_id)?.address)
    }

    pub fn purchase_address(&self, buyer: &Pubkey) -> ClientResult<Pubkey> {
        Ok(pda::purchase_address(&self.program_id, buyer)?.address)
    }

    pub fn staking_pool_address(&self) -> ClientResult<Pubkey> {
        Ok(pda::staking_pool_address(&self.program_id)?.address)
    }

    pub fn staker_info_address(&self, owner: &Pubkey) -> ClientResult<Pubkey> {
        let pool = self.staking_pool_address()?;
        Ok(pda::staker_info_address(&self.program_id, &pool, owner)?.address)
    }

    /// The identity's public key, only if it can sign.
    fn signing_pubkey(&self) -> ClientResult<Pubkey> {
        match &self.identity {
            Some(identity) if identity.can_sign() => Ok(identity.pubkey),
            _ => Err(ClientError::MissingSigningIdentity),
        }
    }
}

impl<C> Clone for ProgramBinding<C> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            program_id: self.program_id,
            identity: self.identity.clone(),
            client: Arc::clone(&self.client),
        }
    }
}

impl<C> fmt::Debug for ProgramBinding<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramBinding")
            .field("endpoint", &self.endpoint)
            .field("program_id", &self.program_id)
            .field("identity", &self.identity)
            .finish()
    }
}

// =============================================================================
// READS
// =============================================================================

impl<C: AccountSource> ProgramBinding<C> {
    /// Sale state singleton.
    pub async fn sale_state(&self) -> ClientResult<Fetched<SaleState>> {
        self.reader().fetch_typed(&self.sale_address()?).await
    }

    /// Purchase record at `["purchase", buyer]`.
    pub async fn purchase_record(&self, buyer: &Pubkey) -> ClientResult<Fetched<PurchaseRecord>> {
        self.reader().fetch_typed(&self.purchase_address(buyer)?).await
    }

    /// Purchase record at a known address (counter-keyed records).
    pub async fn purchase_record_at(&self, address: &Pubkey) -> ClientResult<Fetched<PurchaseRecord>> {
        self.reader().fetch_typed(address).await
    }

    pub async fn staking_pool(&self) -> ClientResult<Fetched<StakingPool>> {
        self.reader().fetch_typed(&self.staking_pool_address()?).await
    }

    pub async fn staker_info(&self, owner: &Pubkey) -> ClientResult<Fetched<StakerInfo>> {
        self.reader().fetch_typed(&self.staker_info_address(owner)?).await
    }

    /// Token balance held for `owner` in the sale's
    /// `["user_token_account", owner]` account.
    ///
    /// Absent until the program creates the account. The account must be
    /// owned by the SPL Token program.
    pub async fn user_token_balance(&self, owner: &Pubkey) -> ClientResult<Fetched<u64>> {
        let address = pda::user_token_account_address(&self.program_id, owner)?.address;
        self.token_balance(&address).await
    }

    /// Balance of any SPL token account, for example an associated token
    /// account from [`pda::associated_token_address`].
    pub async fn token_balance(&self, address: &Pubkey) -> ClientResult<Fetched<u64>> {
        let reader = AccountReader::new(self.client.as_ref(), pda::token_program::id());
        let account = reader.fetch_token_account(address).await?;
        debug!(%address, present = !account.is_absent(), "token balance");
        Ok(account.map(|account| account.amount))
    }
}

impl<C: ProgramScanner> ProgramBinding<C> {
    /// Decode a scan, stopping at the first record that does not decode.
    async fn scan<T: crate::state::AccountSchema>(
        &self,
        matchers: &[AccountMatcher],
    ) -> ClientResult<Vec<(Pubkey, T)>> {
        self.reader()
            .fetch_all_by_filter::<T>(matchers)
            .await?
            .collect()
    }

    /// Every purchase record of the sale.
    pub async fn purchases(&self) -> ClientResult<Vec<(Pubkey, PurchaseRecord)>> {
        self.scan(&[AccountMatcher::DataSize(PurchaseRecord::LEN as u64)])
            .await
    }

    /// Purchase records of one buyer, whatever their address scheme.
    pub async fn purchases_by_buyer(
        &self,
        buyer: &Pubkey,
    ) -> ClientResult<Vec<(Pubkey, PurchaseRecord)>> {
        self.scan(&[
            AccountMatcher::DataSize(PurchaseRecord::LEN as u64),
            AccountMatcher::pubkey_at(PurchaseRecord::BUYER_OFFSET, buyer),
        ])
        .await
    }

    /// Stake records owned by `owner`.
    pub async fn stake_records(&self, owner: &Pubkey) -> ClientResult<Vec<(Pubkey, StakeRecord)>> {
        self.scan(&[
            AccountMatcher::DataSize(StakeRecord::LEN as u64),
            AccountMatcher::pubkey_at(StakeRecord::OWNER_OFFSET, owner),
        ])
        .await
    }

    pub async fn coupons(&self) -> ClientResult<Vec<(Pubkey, Coupon)>> {
        self.scan(&[]).await
    }
}

// =============================================================================
// MUTATIONS
// =============================================================================

impl<C: TransactionSubmitter> ProgramBinding<C> {
    /// Sign `instructions` with the bound identity and submit them once.
    pub async fn send(&self, instructions: &[Instruction]) -> ClientResult<Signature> {
        self.send_with_signers(instructions, &[]).await
    }

    /// Like [`send`](Self::send), with additional co-signers (for example a
    /// freshly generated account keypair).
    ///
    /// # Errors
    ///
    /// * `MissingSigningIdentity` - checked before any network I/O
    /// * `Transport` - blockhash, signing or submission failed
    pub async fn send_with_signers(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&dyn Signer],
    ) -> ClientResult<Signature> {
        let identity = self
            .identity
            .as_ref()
            .ok_or(ClientError::MissingSigningIdentity)?;
        let signer = identity
            .signer
            .as_ref()
            .ok_or(ClientError::MissingSigningIdentity)?;

        let blockhash = self.client.latest_blockhash().await?;

        let mut signers: Vec<&dyn Signer> = Vec::with_capacity(extra_signers.len() + 1);
        signers.push(&**signer);
        signers.extend_from_slice(extra_signers);

        let mut transaction = Transaction::new_with_payer(instructions, Some(&identity.pubkey));
        transaction
            .try_sign(&signers, blockhash)
            .map_err(ClientError::transport)?;

        let signature = self.client.submit(&transaction).await?;
        info!(
            program_id = %self.program_id,
            payer = %identity.pubkey,
            instructions = instructions.len(),
            %signature,
            "transaction submitted"
        );
        Ok(signature)
    }

    // =========================================================================
    // SALE PROGRAM
    // =========================================================================

    pub async fn initialize_sale(&self, token_mint: &Pubkey, params: SaleParams) -> ClientResult<Signature> {
        let authority = self.signing_pubkey()?;
        let ix = instruction::initialize_sale(&self.program_id, &authority, token_mint, params)?;
        self.send(&[ix]).await
    }

    pub async fn buy_tokens(
        &self,
        treasury_wallet: &Pubkey,
        purchase_counter: Option<u64>,
        amount: u64,
    ) -> ClientResult<Signature> {
        let buyer = self.signing_pubkey()?;
        let ix = instruction::buy_tokens(
            &self.program_id,
            &buyer,
            treasury_wallet,
            purchase_counter,
            amount,
        )?;
        self.send(&[ix]).await
    }

    pub async fn distribute_tokens(
        &self,
        buyer: &Pubkey,
        purchase_record: &Pubkey,
    ) -> ClientResult<Signature> {
        let authority = self.signing_pubkey()?;
        let ix = instruction::distribute_tokens(&self.program_id, &authority, buyer, purchase_record)?;
        self.send(&[ix]).await
    }

    pub async fn update_round(&self, round_type: RoundType) -> ClientResult<Signature> {
        let authority = self.signing_pubkey()?;
        let ix = instruction::update_round(&self.program_id, &authority, round_type)?;
        self.send(&[ix]).await
    }

    pub async fn end_ico(&self) -> ClientResult<Signature> {
        let authority = self.signing_pubkey()?;
        let ix = instruction::end_ico(&self.program_id, &authority)?;
        self.send(&[ix]).await
    }

    pub async fn add_seed_investor(&self, investor: &Pubkey) -> ClientResult<Signature> {
        let authority = self.signing_pubkey()?;
        let ix = instruction::add_seed_investor(&self.program_id, &authority, investor)?;
        self.send(&[ix]).await
    }

    pub async fn remove_seed_investor(&self, investor: &Pubkey) -> ClientResult<Signature> {
        let authority = self.signing_pubkey()?;
        let ix = instruction::remove_seed_investor(&self.program_id, &authority, investor)?;
        self.send(&[ix]).await
    }

    pub async fn update_ico_parameters(&self, update: SaleParamsUpdate) -> ClientResult<Signature> {
        let authority = self.signing_pubkey()?;
        let ix = instruction::update_ico_parameters(&self.program_id, &authority, update)?;
        self.send(&[ix]).await
    }

    // =========================================================================
    // STAKING PROGRAM
    // =========================================================================

    pub async fn initialize_staking(
        &self,
        token_mint: &Pubkey,
        params: StakingParams,
    ) -> ClientResult<Signature> {
        let admin = self.signing_pubkey()?;
        let ix = instruction::initialize_staking(&self.program_id, &admin, token_mint, params)?;
        self.send(&[ix]).await
    }

    pub async fn update_staking(&self, params: StakingParams) -> ClientResult<Signature> {
        let admin = self.signing_pubkey()?;
        let ix = instruction::update_staking(&self.program_id, &admin, params)?;
        self.send(&[ix]).await
    }

    pub async fn create_coupon(&self, coupon: CouponParams) -> ClientResult<Signature> {
        let admin = self.signing_pubkey()?;
        let ix = instruction::create_coupon(&self.program_id, &admin, coupon)?;
        self.send(&[ix]).await
    }

    /// Token accounts for a stake or unstake by the bound identity.
    ///
    /// Both sides use associated token accounts for the pool's mint: the
    /// identity's as the staker account and the pool admin's as the admin
    /// staking wallet.
    pub fn stake_accounts(&self, pool: &StakingPool, stake_record: Pubkey) -> ClientResult<StakeAccounts> {
        let staker = self.signing_pubkey()?;
        Ok(StakeAccounts {
            staker,
            stake_record,
            staker_token_account: pda::associated_token_address(&staker, &pool.token_mint)?.address,
            admin_staking_wallet: pda::associated_token_address(&pool.admin, &pool.token_mint)?
                .address,
        })
    }

    /// Stake `amount` into a new stake record.
    ///
    /// Returns the signature and the new record's address.
    pub async fn stake(
        &self,
        pool: &StakingPool,
        amount: u64,
        coupon_code: Option<String>,
    ) -> ClientResult<(Signature, Pubkey)> {
        let record = Keypair::new();
        let accounts = self.stake_accounts(pool, record.pubkey())?;
        let ix = instruction::stake_tokens(&self.program_id, &accounts, amount, coupon_code)?;
        let signature = self.send_with_signers(&[ix], &[&record]).await?;
        Ok((signature, record.pubkey()))
    }

    /// Unstake `amount` from an existing stake record.
    pub async fn unstake(
        &self,
        pool: &StakingPool,
        stake_record: &Pubkey,
        amount: u64,
    ) -> ClientResult<Signature> {
        let accounts = self.stake_accounts(pool, *stake_record)?;
        let ix = instruction::unstake_combined(
            &self.program_id,
            &accounts,
            &pool.token_mint,
            &pool.admin,
            amount,
        )?;
        self.send(&[ix]).await
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryLedger;
    use crate::state::{StakeTier, TokenAccount, TokenAccountState};
    use solana_sdk::account::Account;

    fn ledger_binding(identity: Option<SigningIdentity>) -> (Arc<InMemoryLedger>, ProgramBinding<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let binding = ProgramBinding::with_client(
            "memory://",
            Pubkey::new_unique(),
            identity,
            ledger.clone(),
        );
        (ledger, binding)
    }

    fn pool() -> StakingPool {
        StakingPool {
            admin: Pubkey::new_unique(),
            token_mint: Pubkey::new_unique(),
            lockup_period: 60,
            low_tier_fee: 1.0,
            mid_tier_fee: 0.5,
            high_tier_fee: 0.25,
        }
    }

    #[test]
    fn test_bind_is_lazy() {
        // Nothing listens here; binding must still succeed.
        let binding = bind("http://127.0.0.1:1", Pubkey::new_unique(), None);
        assert_eq!(binding.endpoint(), "http://127.0.0.1:1");
        assert!(binding.identity().is_none());
    }

    #[test]
    fn test_identical_bindings_derive_identically() {
        let program_id = Pubkey::new_unique();
        let buyer = Pubkey::new_unique();
        let a = bind("http://127.0.0.1:8899", program_id, None);
        let b = bind("http://127.0.0.1:8899", program_id, None);

        assert_eq!(a.sale_address().unwrap(), b.sale_address().unwrap());
        assert_eq!(
            a.purchase_address(&buyer).unwrap(),
            b.purchase_address(&buyer).unwrap()
        );
        assert_eq!(
            a.derive(SeedPurpose::Treasury, &[]).unwrap(),
            b.derive(SeedPurpose::Treasury, &[]).unwrap()
        );
    }

    #[test]
    fn test_identity_debug_hides_signer() {
        let identity = SigningIdentity::from_keypair(Keypair::new());
        let text = format!("{identity:?}");
        assert!(text.contains("can_sign: true"));
    }

    #[tokio::test]
    async fn test_mutation_without_identity() {
        let (ledger, binding) = ledger_binding(None);

        let err = binding.end_ico().await.unwrap_err();
        assert!(matches!(err, ClientError::MissingSigningIdentity));
        assert!(ledger.submitted().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_with_read_only_identity() {
        let identity = SigningIdentity::read_only(Pubkey::new_unique());
        let (ledger, binding) = ledger_binding(Some(identity));

        let err = binding.send(&[]).await.unwrap_err();
        assert!(err.needs_wallet());
        let err = binding.stake(&pool(), 1, None).await.unwrap_err();
        assert!(err.needs_wallet());
        assert!(ledger.submitted().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buy_tokens_submits_signed_transaction() {
        let buyer = Keypair::new();
        let buyer_key = buyer.pubkey();
        let (ledger, binding) = ledger_binding(Some(SigningIdentity::from_keypair(buyer)));

        let signature = binding
            .buy_tokens(&Pubkey::new_unique(), None, 500)
            .await
            .unwrap();

        let submitted = ledger.submitted().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].signatures[0], signature);
        assert_eq!(submitted[0].message.account_keys[0], buyer_key);
    }

    #[tokio::test]
    async fn test_stake_cosigns_with_new_record() {
        let staker = Keypair::new();
        let (ledger, binding) = ledger_binding(Some(SigningIdentity::from_keypair(staker)));

        let (_, record) = binding
            .stake(&pool(), 1_000, Some("WELCOME10".into()))
            .await
            .unwrap();

        let submitted = ledger.submitted().unwrap();
        assert_eq!(submitted[0].signatures.len(), 2);
        assert!(submitted[0].message.account_keys.contains(&record));
    }

    #[tokio::test]
    async fn test_typed_reads_through_binding() {
        let (ledger, binding) = ledger_binding(None);
        let owner = Pubkey::new_unique();

        assert!(binding.staker_info(&owner).await.unwrap().is_absent());

        let info = StakerInfo {
            total_staked: 42,
            spin_count: 1,
        };
        ledger
            .insert_record(binding.staker_info_address(&owner).unwrap(), *binding.program_id(), &info)
            .unwrap();
        let stake = StakeRecord {
            owner,
            amount: 42,
            tier: StakeTier::Three,
            stake_timestamp: 0,
            end_timestamp: 10,
            spin_count: 1,
        };
        ledger
            .insert_record(Pubkey::new_unique(), *binding.program_id(), &stake)
            .unwrap();

        assert_eq!(binding.staker_info(&owner).await.unwrap(), Fetched::Present(info));
        let stakes = binding.stake_records(&owner).await.unwrap();
        assert_eq!(stakes.len(), 1);
        assert_eq!(stakes[0].1, stake);
        assert!(binding
            .stake_records(&Pubkey::new_unique())
            .await
            .unwrap()
            .is_empty());
    }

    fn token_account(owner: Pubkey, amount: u64) -> Account {
        let data = TokenAccount {
            mint: Pubkey::new_unique(),
            owner,
            amount,
            delegate: None,
            state: TokenAccountState::Initialized,
            is_native: None,
            delegated_amount: 0,
            close_authority: None,
        }
        .pack();
        Account {
            lamports: 2_039_280,
            data,
            owner: pda::token_program::id(),
            executable: false,
            rent_epoch: 0,
        }
    }

    #[tokio::test]
    async fn test_user_token_balance_absent() {
        let (_, binding) = ledger_binding(None);
        let balance = binding.user_token_balance(&Pubkey::new_unique()).await.unwrap();
        assert_eq!(balance, Fetched::Absent);
    }

    #[tokio::test]
    async fn test_user_token_balance_present() {
        let (ledger, binding) = ledger_binding(None);
        let buyer = Pubkey::new_unique();
        let address = pda::user_token_account_address(binding.program_id(), &buyer)
            .unwrap()
            .address;
        ledger.insert(address, token_account(buyer, 750_000)).unwrap();

        let balance = binding.user_token_balance(&buyer).await.unwrap();
        assert_eq!(balance, Fetched::Present(750_000));
        // Another buyer's account is unaffected.
        assert!(binding
            .user_token_balance(&Pubkey::new_unique())
            .await
            .unwrap()
            .is_absent());
    }

    #[tokio::test]
    async fn test_token_balance_rejects_foreign_owner() {
        let (ledger, binding) = ledger_binding(None);
        let address = Pubkey::new_unique();
        let mut account = token_account(Pubkey::new_unique(), 1);
        account.owner = *binding.program_id();
        ledger.insert(address, account).unwrap();

        let err = binding.token_balance(&address).await.unwrap_err();
        assert!(matches!(err, ClientError::SchemaMismatch { schema: "TokenAccount", .. }));
    }
}
