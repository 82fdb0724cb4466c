//! Client Error Types
//!
//! Every failure this layer can surface, as one enum.
//!
//! # Categories
//!
//! | Variant | Meaning | Caller action |
//! |---------|---------|---------------|
//! | UnknownSeedPurpose | Bad seed tag (programming error) | Fail fast |
//! | InvalidSeeds | Seeds break runtime limits | Fail fast |
//! | DerivationExhausted | No bump produced an off-curve address | Hard failure |
//! | SchemaMismatch | Bytes exist but do not match the layout | Fatal, version skew |
//! | UnknownRoundType | Textual round type not recognised | Reject input |
//! | Encode | Value cannot be written in Borsh form (NaN float) | Fix the input |
//! | MissingSigningIdentity | Mutating call without a signer | Prompt for a wallet |
//! | InvalidConfig | Configuration value missing or malformed | Fix configuration |
//! | Transport | RPC / bank failure, source kept verbatim | Caller-owned retry |
//!
//! An account that does not exist is NOT an error. Reads return
//! [`Fetched::Absent`](crate::reader::Fetched) for that case.

use thiserror::Error;

/// Boxed source error carried by [`ClientError::Transport`].
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used across the crate.
pub type ClientResult<T> = Result<T, ClientError>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// Errors returned by the account resolution and read layer.
#[derive(Error, Debug)]
pub enum ClientError {
    // =========================================================================
    // ADDRESS DERIVATION
    // =========================================================================

    /// A seed purpose tag did not name any registered seed.
    ///
    /// Only reachable when a tag arrives as text (CLI input, config).
    #[error("unknown seed purpose `{0}`")]
    UnknownSeedPurpose(String),

    /// Seeds exceed what the runtime accepts for a program address.
    #[error("invalid seeds: {0}")]
    InvalidSeeds(String),

    /// Every bump from 255 down to 1 produced an on-curve point.
    ///
    /// Practically never happens. Propagated as-is; no retry with
    /// different parameters.
    #[error("no valid bump found for program address")]
    DerivationExhausted,

    // =========================================================================
    // DECODING
    // =========================================================================

    /// Account bytes exist but do not decode against the expected schema.
    ///
    /// Signals version skew between this client and the deployed program.
    #[error("account {account} does not match schema {schema}: {reason}")]
    SchemaMismatch {
        /// Schema name (Anchor account type name)
        schema: &'static str,
        /// Address of the offending account, or "<bytes>" for raw decoding
        account: String,
        /// What failed
        reason: String,
    },

    /// A textual round type was not one of the three sale phases.
    #[error("unknown round type `{0}`")]
    UnknownRoundType(String),

    /// An account fixture or instruction argument could not be serialized.
    #[error("cannot encode {what}: {reason}")]
    Encode {
        what: &'static str,
        reason: String,
    },

    // =========================================================================
    // BINDING
    // =========================================================================

    /// A mutating call was attempted without a signing-capable identity.
    #[error("no signing identity connected")]
    MissingSigningIdentity,

    /// A configuration value is missing or malformed.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Configuration key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    // =========================================================================
    // TRANSPORT
    // =========================================================================

    /// Network or bank failure, passed through unchanged.
    #[error("transport error: {0}")]
    Transport(#[source] TransportSource),
}

impl ClientError {
    /// Wrap any transport-level error.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<TransportSource>,
    {
        ClientError::Transport(err.into())
    }

    /// Build a [`ClientError::SchemaMismatch`] for raw bytes with no address.
    pub(crate) fn mismatch(schema: &'static str, reason: impl Into<String>) -> Self {
        ClientError::SchemaMismatch {
            schema,
            account: "<bytes>".to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn encode(what: &'static str, err: std::io::Error) -> Self {
        ClientError::Encode {
            what,
            reason: err.to_string(),
        }
    }

    /// Attach an address to a schema mismatch raised while decoding bytes.
    pub(crate) fn at_account(self, address: &solana_program::pubkey::Pubkey) -> Self {
        match self {
            ClientError::SchemaMismatch { schema, reason, .. } => ClientError::SchemaMismatch {
                schema,
                account: address.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// True when the error means "connect a wallet", not a system fault.
    pub fn needs_wallet(&self) -> bool {
        matches!(self, ClientError::MissingSigningIdentity)
    }
}

impl From<solana_client::client_error::ClientError> for ClientError {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        ClientError::transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program::pubkey::Pubkey;

    #[test]
    fn test_mismatch_gains_address() {
        let key = Pubkey::new_unique();
        let err = ClientError::mismatch("IcoAccount", "truncated").at_account(&key);

        match err {
            ClientError::SchemaMismatch { account, schema, .. } => {
                assert_eq!(account, key.to_string());
                assert_eq!(schema, "IcoAccount");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_at_account_leaves_other_errors() {
        let err = ClientError::DerivationExhausted.at_account(&Pubkey::new_unique());
        assert!(matches!(err, ClientError::DerivationExhausted));
    }

    #[test]
    fn test_transport_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ClientError::transport(io);

        assert!(err.to_string().contains("refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_needs_wallet() {
        assert!(ClientError::MissingSigningIdentity.needs_wallet());
        assert!(!ClientError::DerivationExhausted.needs_wallet());
    }
}
