//! `ico-inspect`: read sale and staking state from a cluster and print JSON.
//!
//! ```text
//! ico-inspect sale
//! ico-inspect purchase --buyer <PUBKEY>
//! ico-inspect purchases [--buyer <PUBKEY>]
//! ico-inspect staking
//! ico-inspect staker --owner <PUBKEY>
//! ico-inspect stakes --owner <PUBKEY>
//! ico-inspect coupons
//! ico-inspect balance --owner <PUBKEY>
//! ico-inspect derive <PURPOSE> [--staking] [--component <PUBKEY>...] [--counter <N>]
//! ico-inspect is-admin <PUBKEY>
//! ```
//!
//! Configuration comes from `--config <file.json>` or the environment
//! (`.env` honoured). Log verbosity follows `RUST_LOG`.

use clap::{Parser, Subcommand};
use ico_client::config::parse_commitment;
use ico_client::format::format_sol;
use ico_client::state::{cumulative_by_time, totals_by_buyer, PurchaseSummary, SalePhase};
use ico_client::{
    ClientConfig, ClientResult, Coupon, Fetched, ProgramBinding, PurchaseRecord, SaleState,
    SeedPurpose, StakeRecord, StakerInfo, StakingPool,
};
use serde_json::{json, Value};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::pubkey::Pubkey;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ico-inspect", version, about = "Inspect ICO and staking program accounts")]
struct Cli {
    /// JSON configuration file; the environment is used when absent
    #[arg(long, env = "ICO_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured RPC endpoint
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override the configured commitment (processed, confirmed, finalized)
    #[arg(long)]
    commitment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sale state singleton
    Sale,
    /// One buyer's purchase record
    Purchase {
        #[arg(long)]
        buyer: Pubkey,
    },
    /// All purchase records with totals
    Purchases {
        #[arg(long)]
        buyer: Option<Pubkey>,
    },
    /// Staking pool parameters
    Staking,
    /// One owner's staking aggregate
    Staker {
        #[arg(long)]
        owner: Pubkey,
    },
    /// One owner's stake records
    Stakes {
        #[arg(long)]
        owner: Pubkey,
    },
    /// All coupons
    Coupons,
    /// Tokens held in an owner's program token account
    Balance {
        #[arg(long)]
        owner: Pubkey,
    },
    /// Derive a program address
    Derive {
        /// Seed purpose tag, e.g. `purchase`
        purpose: String,
        /// Derive under the staking program instead of the sale program
        #[arg(long)]
        staking: bool,
        /// Public keys appended as seeds, in order
        #[arg(long = "component")]
        components: Vec<Pubkey>,
        /// Little-endian u64 appended after the components
        #[arg(long)]
        counter: Option<u64>,
    },
    /// Whether a key is the configured admin
    IsAdmin { key: Pubkey },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "ico-inspect failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_json_file(path)?,
        None => ClientConfig::from_env()?,
    };
    if let Some(url) = &cli.rpc_url {
        config.rpc_endpoint = url.clone();
    }
    if let Some(level) = &cli.commitment {
        config.commitment = parse_commitment(level)?;
    }
    Ok(config)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

async fn run(cli: Cli) -> ClientResult<Value> {
    let config = load_config(&cli)?;
    let client = config.rpc_client();
    let ico = config.bind_ico(client.clone(), None);

    Ok(match cli.command {
        Command::Sale => fetched_json(ico.sale_state().await?, |s| sale_json(&s, unix_now())),
        Command::Purchase { buyer } => {
            let address = ico.purchase_address(&buyer)?;
            let fetched = ico.purchase_record(&buyer).await?;
            json!({
                "address": address.to_string(),
                "record": fetched_json(fetched, |r| purchase_json(&r)),
            })
        }
        Command::Purchases { buyer } => {
            let records = match buyer {
                Some(buyer) => ico.purchases_by_buyer(&buyer).await?,
                None => ico.purchases().await?,
            };
            purchases_json(&records)
        }
        Command::Staking => {
            let staking = config.bind_staking(client, None)?;
            fetched_json(staking.staking_pool().await?, |p| pool_json(&p))
        }
        Command::Staker { owner } => {
            let staking = config.bind_staking(client, None)?;
            fetched_json(staking.staker_info(&owner).await?, |i| staker_json(&i))
        }
        Command::Stakes { owner } => {
            let staking = config.bind_staking(client, None)?;
            let now = unix_now();
            let stakes = staking.stake_records(&owner).await?;
            Value::Array(
                stakes
                    .iter()
                    .map(|(address, stake)| stake_json(address, stake, now))
                    .collect(),
            )
        }
        Command::Coupons => {
            let staking = config.bind_staking(client, None)?;
            let coupons = staking.coupons().await?;
            Value::Array(coupons.iter().map(|(a, c)| coupon_json(a, c)).collect())
        }
        Command::Balance { owner } => {
            let address = ico_client::pda::user_token_account_address(ico.program_id(), &owner)?;
            let balance = ico.user_token_balance(&owner).await?;
            json!({
                "owner": owner.to_string(),
                "token_account": address.address.to_string(),
                "balance": balance.into_option(),
            })
        }
        Command::Derive {
            purpose,
            staking,
            components,
            counter,
        } => {
            let binding: ProgramBinding<RpcClient> = if staking {
                config.bind_staking(client, None)?
            } else {
                ico
            };
            derive_json(&binding, &purpose, &components, counter)?
        }
        Command::IsAdmin { key } => {
            let gate = config.admin_gate();
            json!({ "key": key.to_string(), "is_admin": gate.is_admin(Some(&key)) })
        }
    })
}

// =============================================================================
// JSON RENDERING
// =============================================================================

fn fetched_json<T>(fetched: Fetched<T>, render: impl FnOnce(T) -> Value) -> Value {
    match fetched {
        Fetched::Present(value) => render(value),
        Fetched::Absent => Value::Null,
    }
}

fn sale_json(sale: &SaleState, now: i64) -> Value {
    let phase = match sale.phase_at(now) {
        SalePhase::Unstarted => "unstarted",
        SalePhase::Active => "active",
        SalePhase::Ended => "ended",
    };
    json!({
        "authority": sale.authority.to_string(),
        "token_mint": sale.token_mint.to_string(),
        "total_supply": sale.total_supply,
        "tokens_sold": sale.tokens_sold,
        "remaining_supply": sale.remaining_supply(),
        "percent_sold": sale.percent_sold(),
        "seed_price": format_sol(sale.seed_price),
        "pre_ico_price": format_sol(sale.pre_ico_price),
        "public_price": format_sol(sale.public_price),
        "current_public_price": format_sol(sale.current_public_price),
        "start_time": sale.start_time,
        "end_time": sale.end_time(),
        "round_type": sale.round_type.identifier(),
        "round_label": sale.round_type.label(),
        "is_active": sale.is_active,
        "phase": phase,
        "seed_investors": sale.seed_investors.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
        "total_investors": sale.total_investors,
        "purchase_counter": sale.purchase_counter,
    })
}

fn purchase_json(record: &PurchaseRecord) -> Value {
    json!({
        "buyer": record.buyer.to_string(),
        "amount": record.amount,
        "is_distributed": record.is_distributed,
        "timestamp": record.timestamp,
        "sale": record.sale.to_string(),
    })
}

fn purchases_json(records: &[(Pubkey, PurchaseRecord)]) -> Value {
    let summary = PurchaseSummary::from_records(records.iter().map(|(_, r)| r));
    json!({
        "summary": {
            "purchases": summary.purchases,
            "unique_buyers": summary.unique_buyers,
            "total_amount": summary.total_amount.to_string(),
            "distributed_amount": summary.distributed_amount.to_string(),
            "pending": summary.pending,
            "pending_amount": summary.pending_amount().to_string(),
        },
        "by_buyer": totals_by_buyer(records.iter().map(|(_, r)| r))
            .into_iter()
            .map(|(buyer, total)| json!({ "buyer": buyer.to_string(), "total": total.to_string() }))
            .collect::<Vec<_>>(),
        "timeline": cumulative_by_time(records.iter().map(|(_, r)| r))
            .into_iter()
            .map(|point| {
                json!({
                    "timestamp": point.timestamp,
                    "amount": point.amount,
                    "cumulative": point.cumulative.to_string(),
                })
            })
            .collect::<Vec<_>>(),
        "records": records
            .iter()
            .map(|(address, record)| {
                let mut value = purchase_json(record);
                value["address"] = json!(address.to_string());
                value
            })
            .collect::<Vec<_>>(),
    })
}

fn pool_json(pool: &StakingPool) -> Value {
    json!({
        "admin": pool.admin.to_string(),
        "token_mint": pool.token_mint.to_string(),
        "lockup_period": pool.lockup_period,
        "low_tier_fee": pool.low_tier_fee,
        "mid_tier_fee": pool.mid_tier_fee,
        "high_tier_fee": pool.high_tier_fee,
    })
}

fn staker_json(info: &StakerInfo) -> Value {
    json!({
        "total_staked": info.total_staked,
        "total_staked_display": format_sol(info.total_staked),
        "spin_count": info.spin_count,
    })
}

fn stake_json(address: &Pubkey, stake: &StakeRecord, now: i64) -> Value {
    json!({
        "address": address.to_string(),
        "owner": stake.owner.to_string(),
        "amount": stake.amount,
        "amount_display": format_sol(stake.amount),
        "tier": stake.tier.number(),
        "stake_timestamp": stake.stake_timestamp,
        "end_timestamp": stake.end_timestamp,
        "locked": stake.is_locked_at(now),
        "spin_count": stake.spin_count,
    })
}

fn coupon_json(address: &Pubkey, coupon: &Coupon) -> Value {
    json!({
        "address": address.to_string(),
        "code": coupon.code,
        "bonus_type": format!("{:?}", coupon.bonus_type),
        "bonus_value": coupon.bonus_value,
        "duration": coupon.duration,
        "min_stake_amount": coupon.min_stake_amount,
        "max_uses": coupon.max_uses,
        "category": format!("{:?}", coupon.category),
    })
}

fn derive_json<C>(
    binding: &ProgramBinding<C>,
    purpose: &str,
    components: &[Pubkey],
    counter: Option<u64>,
) -> ClientResult<Value> {
    let purpose = SeedPurpose::from_tag(purpose)?;
    let counter_bytes = counter.map(u64::to_le_bytes);

    let mut seeds: Vec<&[u8]> = components.iter().map(|k| k.as_ref()).collect();
    if let Some(bytes) = &counter_bytes {
        seeds.push(bytes);
    }

    let derived = binding.derive(purpose, &seeds)?;

    Ok(json!({
        "program_id": binding.program_id().to_string(),
        "purpose": purpose.tag(),
        "components": components.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
        "counter": counter,
        "address": derived.address.to_string(),
        "bump": derived.bump,
    }))
}
