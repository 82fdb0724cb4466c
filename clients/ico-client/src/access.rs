//! Role/Access Gate
//!
//! Decides whether a caller identity is the configured admin.
//!
//! | Caller | Configured admin | Result |
//! |--------|------------------|--------|
//! | none | anything | false |
//! | any | unset | false |
//! | any | malformed | false |
//! | key | key | `caller == admin` |
//!
//! The gate only controls which affordances a client shows. The programs
//! enforce authority on chain; nothing here is a security boundary.

use solana_program::pubkey::Pubkey;
use std::str::FromStr;
use tracing::error;

/// Fail-closed admin check.
///
/// The admin value is parsed once at construction; later configuration
/// changes need a new gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdminGate {
    admin: Option<Pubkey>,
}

impl AdminGate {
    pub fn new(admin: Option<Pubkey>) -> Self {
        Self { admin }
    }

    /// Build from the raw configured value.
    ///
    /// An unset value and a value that is not a valid base58 public key both
    /// leave the gate closed. Both are logged.
    pub fn from_config(admin: Option<&str>) -> Self {
        let admin = match admin.map(str::trim) {
            None | Some("") => {
                error!("admin public key is not configured");
                None
            }
            Some(raw) => match Pubkey::from_str(raw) {
                Ok(key) => Some(key),
                Err(e) => {
                    error!(value = raw, error = %e, "admin public key is malformed");
                    None
                }
            },
        };
        Self { admin }
    }

    /// The configured admin, if valid.
    pub fn admin(&self) -> Option<&Pubkey> {
        self.admin.as_ref()
    }

    /// True only when an identity is given and equals the configured admin.
    pub fn is_admin(&self, identity: Option<&Pubkey>) -> bool {
        match (identity, self.admin.as_ref()) {
            (Some(caller), Some(admin)) => caller == admin,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_only() {
        let admin = Pubkey::new_unique();
        let gate = AdminGate::from_config(Some(&admin.to_string()));

        assert!(gate.is_admin(Some(&admin)));
        assert!(!gate.is_admin(Some(&Pubkey::new_unique())));
        assert!(!gate.is_admin(None));
    }

    #[test]
    fn test_one_byte_difference_rejected() {
        let admin = Pubkey::new_unique();
        let gate = AdminGate::new(Some(admin));

        let mut bytes = admin.to_bytes();
        bytes[31] ^= 0x01;
        let near = Pubkey::new_from_array(bytes);

        assert_ne!(near, admin);
        assert!(!gate.is_admin(Some(&near)));
        assert!(gate.is_admin(Some(&admin)));
    }

    #[test]
    fn test_unconfigured_is_closed() {
        let gate = AdminGate::from_config(None);
        assert!(!gate.is_admin(Some(&Pubkey::new_unique())));
        assert!(!gate.is_admin(Some(&Pubkey::default())));

        let blank = AdminGate::from_config(Some("   "));
        assert_eq!(blank.admin(), None);
    }

    #[test]
    fn test_malformed_is_closed() {
        let gate = AdminGate::from_config(Some("not-a-key"));
        assert_eq!(gate.admin(), None);
        assert!(!gate.is_admin(Some(&Pubkey::default())));
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        let admin = Pubkey::new_unique();
        let gate = AdminGate::from_config(Some(&format!(" {admin}\n")));
        assert!(gate.is_admin(Some(&admin)));
    }
}
