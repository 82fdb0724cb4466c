//! # ICO Client
//!
//! Account resolution and read layer for a token-sale program and its
//! companion staking program.
//!
//! ## Overview
//!
//! The programs own all business rules. This crate gives every caller the
//! same view of their state:
//! - Derive program addresses from one seed registry
//! - Fetch and decode accounts, with absence as a normal result
//! - Scan program accounts with server-side filters
//! - Bind a session to one endpoint, program and signing identity
//! - Check whether a caller is the configured admin (fail closed)
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`seeds`] | Seed registry |
//! | [`pda`] | Address deriver |
//! | [`state`] | Account schemas (Borsh) and SPL token accounts |
//! | [`reader`] | Account reader |
//! | [`source`] | RPC and in-memory account sources |
//! | [`instruction`] | Instruction data and account lists |
//! | [`binding`] | Program binding factory |
//! | [`access`] | Admin gate |
//! | [`config`] | Explicit client configuration |
//! | [`freshness`] | Discard superseded responses |
//!
//! ## Example
//!
//! ```no_run
//! use ico_client::{ClientConfig, Fetched};
//!
//! # async fn run() -> ico_client::ClientResult<()> {
//! let config = ClientConfig::from_env()?;
//! let sale = config.bind_ico(config.rpc_client(), None);
//!
//! match sale.sale_state().await? {
//!     Fetched::Present(state) => println!("{} sold", state.percent_sold()),
//!     Fetched::Absent => println!("sale not initialized"),
//! }
//! # Ok(())
//! # }
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Fail-closed admin check
pub mod access;

/// Program binding factory
pub mod binding;

/// Configuration from environment or JSON
pub mod config;

/// Error taxonomy
pub mod error;

/// Amount formatting
pub mod format;

/// Request-generation counter
pub mod freshness;

/// Instruction builders for both programs
pub mod instruction;

/// Program-derived addresses
pub mod pda;

/// Typed account reads and scans
pub mod reader;

/// Named seed registry
pub mod seeds;

/// Network seam
pub mod source;

/// Account layouts
pub mod state;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use access::AdminGate;
pub use binding::{bind, ProgramBinding, SigningIdentity};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use freshness::{FreshnessGuard, Guarded, Ticket};
pub use instruction::{IcoInstruction, StakingInstruction};
pub use pda::{derive, DerivedAddress};
pub use reader::{AccountReader, Fetched};
pub use seeds::{seed_for, SeedPurpose};
pub use source::{AccountMatcher, AccountSource, InMemoryLedger, ProgramScanner, TransactionSubmitter};
pub use state::{
    AccountSchema, Coupon, DecodedAccount, PurchaseRecord, RoundType, SaleState, SchemaTag,
    StakeRecord, StakerInfo, StakingPool, TokenAccount,
};
