//! Client Configuration
//!
//! Every externally supplied value in one struct, built once and passed to
//! the binding factory and the admin gate. Nothing else in the crate reads
//! the environment.
//!
//! # Sources
//!
//! | Key (JSON) | Environment variable | Required |
//! |------------|----------------------|----------|
//! | `rpc_endpoint` | `RPC_ENDPOINT` | yes |
//! | `ico_program_id` | `ICO_PROGRAM_ID` | yes |
//! | `staking_program_id` | `STAKING_PROGRAM_ID` | for staking reads |
//! | `admin_public_key` | `ADMIN_PUBLIC_KEY` | no (gate stays closed) |
//! | `token_mint_address` | `TOKEN_MINT_ADDRESS` | no |
//! | `commitment` | `RPC_COMMITMENT` | no, default `processed` |
//!
//! [`ClientConfig::from_env`] loads a `.env` file first when one exists.

use crate::access::AdminGate;
use crate::binding::{ProgramBinding, SigningIdentity};
use crate::error::{ClientError, ClientResult};
use serde::Deserialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::pubkey::Pubkey;
use solana_sdk::commitment_config::CommitmentConfig;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

pub const ENV_RPC_ENDPOINT: &str = "RPC_ENDPOINT";
pub const ENV_ICO_PROGRAM_ID: &str = "ICO_PROGRAM_ID";
pub const ENV_STAKING_PROGRAM_ID: &str = "STAKING_PROGRAM_ID";
pub const ENV_ADMIN_PUBLIC_KEY: &str = "ADMIN_PUBLIC_KEY";
pub const ENV_TOKEN_MINT_ADDRESS: &str = "TOKEN_MINT_ADDRESS";
pub const ENV_RPC_COMMITMENT: &str = "RPC_COMMITMENT";

/// Configuration as written, before validation.
#[derive(Clone, Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    rpc_endpoint: Option<String>,
    #[serde(default)]
    ico_program_id: Option<String>,
    #[serde(default)]
    staking_program_id: Option<String>,
    #[serde(default)]
    admin_public_key: Option<String>,
    #[serde(default)]
    token_mint_address: Option<String>,
    #[serde(default)]
    commitment: Option<String>,
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct ClientConfig {
    pub rpc_endpoint: String,
    pub ico_program_id: Pubkey,
    pub staking_program_id: Option<Pubkey>,
    /// Kept raw: the gate parses it and fails closed on bad input.
    pub admin_public_key: Option<String>,
    pub token_mint: Option<Pubkey>,
    pub commitment: CommitmentConfig,
}

fn required(field: &'static str, value: Option<String>) -> ClientResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ClientError::InvalidConfig {
            field,
            reason: "not set".to_string(),
        }),
    }
}

fn pubkey(field: &'static str, value: &str) -> ClientResult<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|e| ClientError::InvalidConfig {
        field,
        reason: format!("`{value}` is not a public key: {e}"),
    })
}

fn optional_pubkey(field: &'static str, value: Option<String>) -> ClientResult<Option<Pubkey>> {
    match value {
        Some(v) if !v.trim().is_empty() => pubkey(field, &v).map(Some),
        _ => Ok(None),
    }
}

/// Parse a commitment level name.
pub fn parse_commitment(value: &str) -> ClientResult<CommitmentConfig> {
    match value.trim() {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(ClientError::InvalidConfig {
            field: "commitment",
            reason: format!("`{other}` is not processed, confirmed or finalized"),
        }),
    }
}

impl TryFrom<RawConfig> for ClientConfig {
    type Error = ClientError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let rpc_endpoint = required("rpc_endpoint", raw.rpc_endpoint)?;
        let ico_program_id = pubkey("ico_program_id", &required("ico_program_id", raw.ico_program_id)?)?;
        let staking_program_id = optional_pubkey("staking_program_id", raw.staking_program_id)?;
        let token_mint = optional_pubkey("token_mint_address", raw.token_mint_address)?;

        let commitment = match raw.commitment {
            Some(level) if !level.trim().is_empty() => parse_commitment(&level)?,
            _ => CommitmentConfig::processed(),
        };

        let admin_public_key = raw.admin_public_key.filter(|v| !v.trim().is_empty());
        if admin_public_key.is_none() {
            warn!("no admin public key configured; admin checks will fail closed");
        }

        Ok(ClientConfig {
            rpc_endpoint,
            ico_program_id,
            staking_program_id,
            admin_public_key,
            token_mint,
            commitment,
        })
    }
}

impl ClientConfig {
    /// Load from the process environment, after applying a `.env` file if
    /// present.
    pub fn from_env() -> ClientResult<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup, using the environment variable
    /// names.
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        ClientConfig::try_from(RawConfig {
            rpc_endpoint: lookup(ENV_RPC_ENDPOINT),
            ico_program_id: lookup(ENV_ICO_PROGRAM_ID),
            staking_program_id: lookup(ENV_STAKING_PROGRAM_ID),
            admin_public_key: lookup(ENV_ADMIN_PUBLIC_KEY),
            token_mint_address: lookup(ENV_TOKEN_MINT_ADDRESS),
            commitment: lookup(ENV_RPC_COMMITMENT),
        })
    }

    pub fn from_json_str(json: &str) -> ClientResult<Self> {
        serde_json::from_str(json).map_err(|e| ClientError::InvalidConfig {
            field: "config",
            reason: e.to_string(),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ClientError::InvalidConfig {
            field: "config",
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    // =========================================================================
    // FACTORIES
    // =========================================================================

    /// One nonblocking RPC client for this endpoint and commitment.
    pub fn rpc_client(&self) -> Arc<RpcClient> {
        Arc::new(RpcClient::new_with_commitment(
            self.rpc_endpoint.clone(),
            self.commitment,
        ))
    }

    pub fn staking_program_id(&self) -> ClientResult<Pubkey> {
        self.staking_program_id
            .ok_or_else(|| ClientError::InvalidConfig {
                field: "staking_program_id",
                reason: "not set".to_string(),
            })
    }

    /// Binding for the sale program over `client`.
    pub fn bind_ico<C>(&self, client: Arc<C>, identity: Option<SigningIdentity>) -> ProgramBinding<C> {
        ProgramBinding::with_client(&self.rpc_endpoint, self.ico_program_id, identity, client)
    }

    /// Binding for the staking program over `client`.
    pub fn bind_staking<C>(
        &self,
        client: Arc<C>,
        identity: Option<SigningIdentity>,
    ) -> ClientResult<ProgramBinding<C>> {
        Ok(ProgramBinding::with_client(
            &self.rpc_endpoint,
            self.staking_program_id()?,
            identity,
            client,
        ))
    }

    /// Admin gate over the configured admin key.
    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::from_config(self.admin_public_key.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let program = Pubkey::new_unique();
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_RPC_ENDPOINT, "http://127.0.0.1:8899".to_string()),
            (ENV_ICO_PROGRAM_ID, program.to_string()),
        ]))
        .unwrap();

        assert_eq!(config.ico_program_id, program);
        assert_eq!(config.commitment, CommitmentConfig::processed());
        assert_eq!(config.staking_program_id, None);
        assert!(config.staking_program_id().is_err());
        assert!(!config.admin_gate().is_admin(Some(&Pubkey::new_unique())));
    }

    #[test]
    fn test_missing_endpoint() {
        let err = ClientConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidConfig {
                field: "rpc_endpoint",
                ..
            }
        ));
    }

    #[test]
    fn test_bad_program_id() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            (ENV_RPC_ENDPOINT, "http://localhost:8899".to_string()),
            (ENV_ICO_PROGRAM_ID, "nope".to_string()),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("ico_program_id"));
    }

    #[test]
    fn test_from_json() {
        let admin = Pubkey::new_unique();
        let json = serde_json::json!({
            "rpc_endpoint": "https://api.devnet.solana.com",
            "ico_program_id": Pubkey::new_unique().to_string(),
            "staking_program_id": Pubkey::new_unique().to_string(),
            "admin_public_key": admin.to_string(),
            "commitment": "confirmed",
        })
        .to_string();

        let config = ClientConfig::from_json_str(&json).unwrap();
        assert_eq!(config.commitment, CommitmentConfig::confirmed());
        assert!(config.admin_gate().is_admin(Some(&admin)));
        assert!(config.staking_program_id().is_ok());
    }

    #[test]
    fn test_json_bad_commitment() {
        let json = serde_json::json!({
            "rpc_endpoint": "http://localhost:8899",
            "ico_program_id": Pubkey::new_unique().to_string(),
            "commitment": "eventually",
        })
        .to_string();

        let err = ClientConfig::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("eventually"));
    }

    #[test]
    fn test_bindings_share_client() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_RPC_ENDPOINT, "http://127.0.0.1:8899".to_string()),
            (ENV_ICO_PROGRAM_ID, Pubkey::new_unique().to_string()),
            (ENV_STAKING_PROGRAM_ID, Pubkey::new_unique().to_string()),
        ]))
        .unwrap();

        let client = config.rpc_client();
        let ico = config.bind_ico(client.clone(), None);
        let staking = config.bind_staking(client.clone(), None).unwrap();

        assert!(Arc::ptr_eq(ico.client(), staking.client()));
        assert_ne!(ico.program_id(), staking.program_id());
    }
}
