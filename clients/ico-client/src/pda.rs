//! Address Deriver
//!
//! Computes program-derived addresses (PDAs) the same way the runtime does,
//! so every caller reconstructs the same address without coordination.
//!
//! # How a PDA Is Found
//!
//! ```text
//! for bump in 255, 254, ..., 1:
//!     candidate = sha256(seeds || [bump] || program_id || "ProgramDerivedAddress")
//!     if candidate is NOT on the ed25519 curve:
//!         return (candidate, bump)
//! fail: DerivationExhausted
//! ```
//!
//! The search order matters: on-chain code using `find_program_address` (and
//! Anchor's `bump` constraint) takes the FIRST off-curve bump from 255 down.
//! Any other order would produce a different, unusable address.

use crate::error::{ClientError, ClientResult};
use crate::seeds::SeedPurpose;
use solana_program::pubkey::{Pubkey, PubkeyError, MAX_SEEDS, MAX_SEED_LEN};
use tracing::debug;

/// SPL Token program.
pub mod token_program {
    solana_program::declare_id!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
}

/// SPL Associated Token Account program.
pub mod associated_token_program {
    solana_program::declare_id!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
}

// =============================================================================
// DERIVED ADDRESS
// =============================================================================

/// A program-derived address together with how it was produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedAddress {
    /// The derived account address
    pub address: Pubkey,
    /// The caller's seeds, in order, without the bump
    pub seeds: Vec<Vec<u8>>,
    /// The bump that made the address fall off the curve
    pub bump: u8,
}

impl DerivedAddress {
    /// Seeds plus the trailing bump byte, as passed to `invoke_signed`.
    pub fn signer_seeds(&self) -> Vec<Vec<u8>> {
        let mut seeds = self.seeds.clone();
        seeds.push(vec![self.bump]);
        seeds
    }
}

// =============================================================================
// DERIVATION
// =============================================================================

/// Derive the address for `seeds` under `program_id`.
///
/// Pure: identical inputs always give the identical `(address, bump)`.
///
/// # Errors
///
/// * `InvalidSeeds` - more than 15 seeds, or a seed longer than 32 bytes
/// * `DerivationExhausted` - no bump in 255..=1 yields an off-curve address
pub fn derive(program_id: &Pubkey, seeds: &[&[u8]]) -> ClientResult<DerivedAddress> {
    validate_seeds(seeds)?;

    let (address, bump) = search_bump(seeds, |candidate| {
        Pubkey::create_program_address(candidate, program_id)
    })?;

    debug!(%program_id, %address, bump, seeds = seeds.len(), "derived program address");

    Ok(DerivedAddress {
        address,
        seeds: seeds.iter().map(|s| s.to_vec()).collect(),
        bump,
    })
}

/// Derive with a registered seed followed by extra components.
pub fn derive_for(
    program_id: &Pubkey,
    purpose: SeedPurpose,
    components: &[&[u8]],
) -> ClientResult<DerivedAddress> {
    let mut seeds: Vec<&[u8]> = Vec::with_capacity(components.len() + 1);
    seeds.push(purpose.seed());
    seeds.extend_from_slice(components);
    derive(program_id, &seeds)
}

/// Check the runtime's seed limits before searching.
///
/// One slot of `MAX_SEEDS` is reserved for the bump.
fn validate_seeds(seeds: &[&[u8]]) -> ClientResult<()> {
    if seeds.len() >= MAX_SEEDS {
        return Err(ClientError::InvalidSeeds(format!(
            "{} seeds given, at most {} allowed",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    if let Some((index, seed)) = seeds
        .iter()
        .enumerate()
        .find(|(_, seed)| seed.len() > MAX_SEED_LEN)
    {
        return Err(ClientError::InvalidSeeds(format!(
            "seed {} is {} bytes, at most {} allowed",
            index,
            seed.len(),
            MAX_SEED_LEN
        )));
    }
    Ok(())
}

/// Walk bumps 255 down to 1, asking `attempt` for each candidate.
///
/// `attempt` receives the seeds with the bump appended.
fn search_bump<F>(seeds: &[&[u8]], mut attempt: F) -> ClientResult<(Pubkey, u8)>
where
    F: FnMut(&[&[u8]]) -> Result<Pubkey, PubkeyError>,
{
    for bump in (1..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match attempt(&with_bump) {
            Ok(address) => return Ok((address, bump)),
            // On-curve: try the next bump
            Err(PubkeyError::InvalidSeeds) => continue,
            Err(other) => return Err(ClientError::InvalidSeeds(other.to_string())),
        }
    }
    Err(ClientError::DerivationExhausted)
}

// =============================================================================
// WELL-KNOWN ADDRESSES
// =============================================================================

/// Sale state singleton: `["ico"]`.
pub fn sale_address(program_id: &Pubkey) -> ClientResult<DerivedAddress> {
    derive_for(program_id, SeedPurpose::Ico, &[])
}

/// Purchase record for a buyer: `["purchase", buyer]`.
pub fn purchase_address(program_id: &Pubkey, buyer: &Pubkey) -> ClientResult<DerivedAddress> {
    derive_for(program_id, SeedPurpose::Purchase, &[buyer.as_ref()])
}

/// Counter-keyed purchase record: `["purchase", buyer, counter_le_u64]`.
///
/// Used by the program revision that allows several purchases per buyer;
/// `counter` is the sale's `purchase_counter` at the time of purchase.
pub fn purchase_address_with_counter(
    program_id: &Pubkey,
    buyer: &Pubkey,
    counter: u64,
) -> ClientResult<DerivedAddress> {
    let counter_bytes = counter.to_le_bytes();
    derive_for(
        program_id,
        SeedPurpose::Purchase,
        &[buyer.as_ref(), &counter_bytes],
    )
}

/// Program-owned token account for a buyer: `["user_token_account", buyer]`.
pub fn user_token_account_address(
    program_id: &Pubkey,
    buyer: &Pubkey,
) -> ClientResult<DerivedAddress> {
    derive_for(program_id, SeedPurpose::UserTokenAccount, &[buyer.as_ref()])
}

/// Sale treasury: `["treasury"]`.
pub fn treasury_address(program_id: &Pubkey) -> ClientResult<DerivedAddress> {
    derive_for(program_id, SeedPurpose::Treasury, &[])
}

/// Investor token account: `["token_account", investor]`.
pub fn token_account_address(
    program_id: &Pubkey,
    investor: &Pubkey,
) -> ClientResult<DerivedAddress> {
    derive_for(program_id, SeedPurpose::TokenAccount, &[investor.as_ref()])
}

/// Staking pool singleton: `["staking_account"]` under the staking program.
pub fn staking_pool_address(staking_program_id: &Pubkey) -> ClientResult<DerivedAddress> {
    derive_for(staking_program_id, SeedPurpose::StakingAccount, &[])
}

/// Staker aggregate: `["staker_info", staking_account, owner]`.
pub fn staker_info_address(
    staking_program_id: &Pubkey,
    staking_account: &Pubkey,
    owner: &Pubkey,
) -> ClientResult<DerivedAddress> {
    derive_for(
        staking_program_id,
        SeedPurpose::StakerInfo,
        &[staking_account.as_ref(), owner.as_ref()],
    )
}

/// Associated token account of `wallet` for `mint`.
///
/// `[wallet, token_program, mint]` under the associated token program.
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> ClientResult<DerivedAddress> {
    derive(
        &associated_token_program::id(),
        &[wallet.as_ref(), token_program::id().as_ref(), mint.as_ref()],
    )
}

// =============================================================================
// UNIT TESTS
// =============================================================================
