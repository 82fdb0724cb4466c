//! Instruction Builders
//!
//! Typed instructions for the sale and staking programs, plus builder
//! functions that resolve every account an instruction needs.
//!
//! # Instruction Format
//!
//! Both programs are Anchor programs, so instruction data is:
//!
//! ```text
//! [sighash: 8 bytes][arguments: Borsh, in declaration order]
//!
//! sighash = sha256("global:" + snake_case_method_name)[0..8]
//! ```
//!
//! # Sale Program
//!
//! | Method | Arguments | Signers |
//! |--------|-----------|---------|
//! | `initialize` | supply, three prices, start, duration, round | authority |
//! | `buy_tokens` | amount | buyer |
//! | `distribute_tokens` | none | authority |
//! | `update_round` | round | authority |
//! | `end_ico` | none | authority |
//! | `add_seed_investor` | investor | authority |
//! | `remove_seed_investor` | investor | authority |
//! | `update_ico_parameters` | optional supply, price, start, duration, round | authority |
//!
//! # Staking Program
//!
//! | Method | Arguments | Signers |
//! |--------|-----------|---------|
//! | `initialize` | lockup, three tier fees | admin |
//! | `update` | lockup, three tier fees | admin |
//! | `stake_tokens` | amount, optional coupon code | staker, new stake record |
//! | `unstake_combined` | amount | staker |
//! | `create_coupon` | coupon fields | admin |

use crate::error::{ClientError, ClientResult};
use crate::pda;
use crate::state::{BonusType, CouponCategory, RoundType};
use borsh::BorshSerialize;
use solana_program::hash::hashv;
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use solana_program::system_program;

/// Length of an Anchor instruction sighash.
pub const SIGHASH_LEN: usize = 8;

/// Anchor instruction sighash for a method name.
pub fn sighash(method: &str) -> [u8; SIGHASH_LEN] {
    let hash = hashv(&[b"global:", method.as_bytes()]);
    let mut out = [0u8; SIGHASH_LEN];
    out.copy_from_slice(&hash.to_bytes()[..SIGHASH_LEN]);
    out
}

// =============================================================================
// SALE PROGRAM
// =============================================================================

/// Arguments of the sale `initialize` instruction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct SaleParams {
    pub total_supply: u64,
    pub seed_price: u64,
    pub pre_ico_price: u64,
    pub public_price: u64,
    pub start_time: i64,
    pub duration: i64,
    pub round_type: RoundType,
}

/// Partial update of sale parameters. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize)]
pub struct SaleParamsUpdate {
    pub total_supply: Option<u64>,
    pub token_price: Option<u64>,
    pub start_time: Option<i64>,
    pub duration: Option<i64>,
    pub round_type: Option<RoundType>,
}

/// Instructions of the sale program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IcoInstruction {
    Initialize(SaleParams),
    BuyTokens { amount: u64 },
    DistributeTokens,
    UpdateRound { round_type: RoundType },
    EndIco,
    AddSeedInvestor { investor: Pubkey },
    RemoveSeedInvestor { investor: Pubkey },
    UpdateIcoParameters(SaleParamsUpdate),
}

impl IcoInstruction {
    /// Program method name, as hashed into the sighash.
    pub fn method(&self) -> &'static str {
        match self {
            IcoInstruction::Initialize(_) => "initialize",
            IcoInstruction::BuyTokens { .. } => "buy_tokens",
            IcoInstruction::DistributeTokens => "distribute_tokens",
            IcoInstruction::UpdateRound { .. } => "update_round",
            IcoInstruction::EndIco => "end_ico",
            IcoInstruction::AddSeedInvestor { .. } => "add_seed_investor",
            IcoInstruction::RemoveSeedInvestor { .. } => "remove_seed_investor",
            IcoInstruction::UpdateIcoParameters(_) => "update_ico_parameters",
        }
    }

    /// Serialize into instruction data.
    pub fn pack(&self) -> ClientResult<Vec<u8>> {
        let mut data = sighash(self.method()).to_vec();

        let written = match self {
            IcoInstruction::Initialize(params) => params.serialize(&mut data),
            IcoInstruction::BuyTokens { amount } => amount.serialize(&mut data),
            IcoInstruction::DistributeTokens | IcoInstruction::EndIco => Ok(()),
            IcoInstruction::UpdateRound { round_type } => round_type.serialize(&mut data),
            IcoInstruction::AddSeedInvestor { investor }
            | IcoInstruction::RemoveSeedInvestor { investor } => investor.serialize(&mut data),
            IcoInstruction::UpdateIcoParameters(update) => update.serialize(&mut data),
        };
        written.map_err(|e| ClientError::encode(self.method(), e))?;

        Ok(data)
    }
}

/// Create the sale account at PDA `["ico"]`.
///
/// | # | Account | Writable | Signer |
/// |---|---------|----------|--------|
/// | 0 | sale | ✓ | |
/// | 1 | authority | ✓ | ✓ |
/// | 2 | token mint | | |
/// | 3 | system program | | |
pub fn initialize_sale(
    program_id: &Pubkey,
    authority: &Pubkey,
    token_mint: &Pubkey,
    params: SaleParams,
) -> ClientResult<Instruction> {
    let sale = pda::sale_address(program_id)?;
    Ok(Instruction::new_with_bytes(
        *program_id,
        &IcoInstruction::Initialize(params).pack()?,
        vec![
            AccountMeta::new(sale.address, false),
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(*token_mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    ))
}

/// Buy `amount` tokens.
///
/// `purchase_counter` selects the counter-keyed purchase record used by the
/// multi-purchase program revision; `None` uses `["purchase", buyer]`.
///
/// | # | Account | Writable | Signer |
/// |---|---------|----------|--------|
/// | 0 | buyer | ✓ | ✓ |
/// | 1 | sale | ✓ | |
/// | 2 | purchase record | ✓ | |
/// | 3 | treasury wallet | ✓ | |
/// | 4 | token program | | |
/// | 5 | system program | | |
pub fn buy_tokens(
    program_id: &Pubkey,
    buyer: &Pubkey,
    treasury_wallet: &Pubkey,
    purchase_counter: Option<u64>,
    amount: u64,
) -> ClientResult<Instruction> {
    let sale = pda::sale_address(program_id)?;
    let purchase = match purchase_counter {
        Some(counter) => pda::purchase_address_with_counter(program_id, buyer, counter)?,
        None => pda::purchase_address(program_id, buyer)?,
    };

    Ok(Instruction::new_with_bytes(
        *program_id,
        &IcoInstruction::BuyTokens { amount }.pack()?,
        vec![
            AccountMeta::new(*buyer, true),
            AccountMeta::new(sale.address, false),
            AccountMeta::new(purchase.address, false),
            AccountMeta::new(*treasury_wallet, false),
            AccountMeta::new_readonly(pda::token_program::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    ))
}

/// Deliver purchased tokens to a buyer. Admin only.
///
/// | # | Account | Writable | Signer |
/// |---|---------|----------|--------|
/// | 0 | authority | ✓ | ✓ |
/// | 1 | sale | ✓ | |
/// | 2 | purchase record | ✓ | |
/// | 3 | buyer | | |
/// | 4 | user token account `["user_token_account", buyer]` | ✓ | |
/// | 5 | token program | | |
/// | 6 | system program | | |
pub fn distribute_tokens(
    program_id: &Pubkey,
    authority: &Pubkey,
    buyer: &Pubkey,
    purchase_record: &Pubkey,
) -> ClientResult<Instruction> {
    let sale = pda::sale_address(program_id)?;
    let user_token_account = pda::user_token_account_address(program_id, buyer)?;

    Ok(Instruction::new_with_bytes(
        *program_id,
        &IcoInstruction::DistributeTokens.pack()?,
        vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(sale.address, false),
            AccountMeta::new(*purchase_record, false),
            AccountMeta::new_readonly(*buyer, false),
            AccountMeta::new(user_token_account.address, false),
            AccountMeta::new_readonly(pda::token_program::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    ))
}

/// Sale and authority only: `update_round` and `end_ico`.
fn sale_authority_instruction(
    program_id: &Pubkey,
    authority: &Pubkey,
    instruction: IcoInstruction,
) -> ClientResult<Instruction> {
    let sale = pda::sale_address(program_id)?;
    Ok(Instruction::new_with_bytes(
        *program_id,
        &instruction.pack()?,
        vec![
            AccountMeta::new(sale.address, false),
            AccountMeta::new_readonly(*authority, true),
        ],
    ))
}

/// Authority first, then sale: seed investor and parameter updates.
fn authority_sale_instruction(
    program_id: &Pubkey,
    authority: &Pubkey,
    instruction: IcoInstruction,
) -> ClientResult<Instruction> {
    let sale = pda::sale_address(program_id)?;
    Ok(Instruction::new_with_bytes(
        *program_id,
        &instruction.pack()?,
        vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(sale.address, false),
        ],
    ))
}

pub fn update_round(
    program_id: &Pubkey,
    authority: &Pubkey,
    round_type: RoundType,
) -> ClientResult<Instruction> {
    sale_authority_instruction(program_id, authority, IcoInstruction::UpdateRound { round_type })
}

/// Close the sale. Irreversible on chain.
pub fn end_ico(program_id: &Pubkey, authority: &Pubkey) -> ClientResult<Instruction> {
    sale_authority_instruction(program_id, authority, IcoInstruction::EndIco)
}

pub fn add_seed_investor(
    program_id: &Pubkey,
    authority: &Pubkey,
    investor: &Pubkey,
) -> ClientResult<Instruction> {
    authority_sale_instruction(
        program_id,
        authority,
        IcoInstruction::AddSeedInvestor {
            investor: *investor,
        },
    )
}

pub fn remove_seed_investor(
    program_id: &Pubkey,
    authority: &Pubkey,
    investor: &Pubkey,
) -> ClientResult<Instruction> {
    authority_sale_instruction(
        program_id,
        authority,
        IcoInstruction::RemoveSeedInvestor {
            investor: *investor,
        },
    )
}

pub fn update_ico_parameters(
    program_id: &Pubkey,
    authority: &Pubkey,
    update: SaleParamsUpdate,
) -> ClientResult<Instruction> {
    authority_sale_instruction(
        program_id,
        authority,
        IcoInstruction::UpdateIcoParameters(update),
    )
}

// =============================================================================
// STAKING PROGRAM
// =============================================================================

/// Pool parameters for staking `initialize` and `update`.
#[derive(Clone, Copy, Debug, PartialEq, BorshSerialize)]
pub struct StakingParams {
    /// Seconds
    pub lockup_period: i64,
    pub low_tier_fee: f64,
    pub mid_tier_fee: f64,
    pub high_tier_fee: f64,
}

/// Arguments of `create_coupon`.
#[derive(Clone, Debug, PartialEq, BorshSerialize)]
pub struct CouponParams {
    pub code: String,
    pub bonus_type: BonusType,
    pub bonus_value: f64,
    /// Seconds
    pub duration: i64,
    pub min_stake_amount: u64,
    pub max_uses: u64,
    pub category: CouponCategory,
}

/// Instructions of the staking program.
#[derive(Clone, Debug, PartialEq)]
pub enum StakingInstruction {
    Initialize(StakingParams),
    Update(StakingParams),
    StakeTokens {
        amount: u64,
        coupon_code: Option<String>,
    },
    UnstakeCombined {
        amount: u64,
    },
    CreateCoupon(CouponParams),
}

impl StakingInstruction {
    pub fn method(&self) -> &'static str {
        match self {
            StakingInstruction::Initialize(_) => "initialize",
            StakingInstruction::Update(_) => "update",
            StakingInstruction::StakeTokens { .. } => "stake_tokens",
            StakingInstruction::UnstakeCombined { .. } => "unstake_combined",
            StakingInstruction::CreateCoupon(_) => "create_coupon",
        }
    }

    pub fn pack(&self) -> ClientResult<Vec<u8>> {
        let mut data = sighash(self.method()).to_vec();

        let written = match self {
            StakingInstruction::Initialize(params) | StakingInstruction::Update(params) => {
                params.serialize(&mut data)
            }
            StakingInstruction::StakeTokens {
                amount,
                coupon_code,
            } => amount
                .serialize(&mut data)
                .and_then(|()| coupon_code.serialize(&mut data)),
            StakingInstruction::UnstakeCombined { amount } => amount.serialize(&mut data),
            StakingInstruction::CreateCoupon(coupon) => coupon.serialize(&mut data),
        };
        written.map_err(|e| ClientError::encode(self.method(), e))?;

        Ok(data)
    }
}

/// Accounts shared by stake and unstake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeAccounts {
    pub staker: Pubkey,
    /// Fresh keypair for a stake, existing record for an unstake
    pub stake_record: Pubkey,
    pub staker_token_account: Pubkey,
    pub admin_staking_wallet: Pubkey,
}

/// Create the staking pool at PDA `["staking_account"]`.
///
/// | # | Account | Writable | Signer |
/// |---|---------|----------|--------|
/// | 0 | staking pool | ✓ | |
/// | 1 | admin | ✓ | ✓ |
/// | 2 | token mint | | |
/// | 3 | system program | | |
pub fn initialize_staking(
    staking_program_id: &Pubkey,
    admin: &Pubkey,
    token_mint: &Pubkey,
    params: StakingParams,
) -> ClientResult<Instruction> {
    let pool = pda::staking_pool_address(staking_program_id)?;
    Ok(Instruction::new_with_bytes(
        *staking_program_id,
        &StakingInstruction::Initialize(params).pack()?,
        vec![
            AccountMeta::new(pool.address, false),
            AccountMeta::new(*admin, true),
            AccountMeta::new_readonly(*token_mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    ))
}

/// Pool and admin: `update` and `create_coupon`.
fn pool_admin_instruction(
    staking_program_id: &Pubkey,
    admin: &Pubkey,
    instruction: StakingInstruction,
) -> ClientResult<Instruction> {
    let pool = pda::staking_pool_address(staking_program_id)?;
    Ok(Instruction::new_with_bytes(
        *staking_program_id,
        &instruction.pack()?,
        vec![
            AccountMeta::new(pool.address, false),
            AccountMeta::new(*admin, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    ))
}

pub fn update_staking(
    staking_program_id: &Pubkey,
    admin: &Pubkey,
    params: StakingParams,
) -> ClientResult<Instruction> {
    pool_admin_instruction(staking_program_id, admin, StakingInstruction::Update(params))
}

pub fn create_coupon(
    staking_program_id: &Pubkey,
    admin: &Pubkey,
    coupon: CouponParams,
) -> ClientResult<Instruction> {
    pool_admin_instruction(
        staking_program_id,
        admin,
        StakingInstruction::CreateCoupon(coupon),
    )
}

/// Stake tokens into a new stake record. The record's keypair must co-sign.
///
/// | # | Account | Writable | Signer |
/// |---|---------|----------|--------|
/// | 0 | staking pool | ✓ | |
/// | 1 | stake record | ✓ | ✓ |
/// | 2 | staker info | ✓ | |
/// | 3 | staker token account | ✓ | |
/// | 4 | admin staking wallet | ✓ | |
/// | 5 | staker | ✓ | ✓ |
/// | 6 | token program | | |
/// | 7 | system program | | |
pub fn stake_tokens(
    staking_program_id: &Pubkey,
    accounts: &StakeAccounts,
    amount: u64,
    coupon_code: Option<String>,
) -> ClientResult<Instruction> {
    let pool = pda::staking_pool_address(staking_program_id)?;
    let info = pda::staker_info_address(staking_program_id, &pool.address, &accounts.staker)?;

    Ok(Instruction::new_with_bytes(
        *staking_program_id,
        &StakingInstruction::StakeTokens {
            amount,
            coupon_code,
        }
        .pack()?,
        vec![
            AccountMeta::new(pool.address, false),
            AccountMeta::new(accounts.stake_record, true),
            AccountMeta::new(info.address, false),
            AccountMeta::new(accounts.staker_token_account, false),
            AccountMeta::new(accounts.admin_staking_wallet, false),
            AccountMeta::new(accounts.staker, true),
            AccountMeta::new_readonly(pda::token_program::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    ))
}

/// Withdraw `amount` from an existing stake record.
///
/// `pool_admin` is passed as the `owner` account; the program uses it as
/// the authority over the admin staking wallet.
///
/// | # | Account | Writable | Signer |
/// |---|---------|----------|--------|
/// | 0 | staking pool | ✓ | |
/// | 1 | stake record | ✓ | |
/// | 2 | staker info | ✓ | |
/// | 3 | staker token account | ✓ | |
/// | 4 | admin staking wallet | ✓ | |
/// | 5 | token mint | | |
/// | 6 | staker | ✓ | ✓ |
/// | 7 | owner (pool admin) | | |
/// | 8 | token program | | |
/// | 9 | system program | | |
pub fn unstake_combined(
    staking_program_id: &Pubkey,
    accounts: &StakeAccounts,
    token_mint: &Pubkey,
    pool_admin: &Pubkey,
    amount: u64,
) -> ClientResult<Instruction> {
    let pool = pda::staking_pool_address(staking_program_id)?;
    let info = pda::staker_info_address(staking_program_id, &pool.address, &accounts.staker)?;

    Ok(Instruction::new_with_bytes(
        *staking_program_id,
        &StakingInstruction::UnstakeCombined { amount }.pack()?,
        vec![
            AccountMeta::new(pool.address, false),
            AccountMeta::new(accounts.stake_record, false),
            AccountMeta::new(info.address, false),
            AccountMeta::new(accounts.staker_token_account, false),
            AccountMeta::new(accounts.admin_staking_wallet, false),
            AccountMeta::new_readonly(*token_mint, false),
            AccountMeta::new(accounts.staker, true),
            AccountMeta::new_readonly(*pool_admin, false),
            AccountMeta::new_readonly(pda::token_program::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    ))
}

// =============================================================================
// UNIT TESTS
// =============================================================================


/*
=============================================================================
DETAILED EXPLANATION
=============================================================================

SIGHASH VS SINGLE-BYTE DISCRIMINANT
===================================

Hand-written programs often use one leading byte to select the
instruction. Anchor programs use eight bytes instead:

sha256("global:buy_tokens")[0..8]

The method name is hashed in snake_case, even when a JavaScript caller
spells it buyTokens. Both programs here name a method "initialize", and
that is fine: the sighash only has to be unique within one program.

BORSH ARGUMENTS
===============

Arguments follow the sighash in declaration order:

buy_tokens(amount: u64)
-> [sighash x8][amount: 8 bytes LE]

stake_tokens(amount: u64, coupon_code: Option<String>)
-> [sighash x8][amount x8][0]                       (no coupon)
-> [sighash x8][amount x8][1][len: u32 LE][utf-8]   (with coupon)

Unit-like enums (RoundType, BonusType, CouponCategory) are a single
variant index byte.

ACCOUNT ORDER
=============

The program reads accounts positionally. The tables above each builder
are the contract; changing the order silently hands the program the
wrong account.
*/
