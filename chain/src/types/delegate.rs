//! Delegate records and username validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::PublicKey;

/// Maximum length, in bytes, of a delegate username.
pub const MAX_DELEGATE_USERNAME_LENGTH: usize = 20;

/// Reasons a candidate delegate username is rejected.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum UsernameError {
    #[error("username must be 1-{MAX_DELEGATE_USERNAME_LENGTH} characters, got {0}")]
    BadLength(usize),
    #[error("username contains a character outside [a-z0-9!@$&_.]")]
    IllegalCharacter,
    #[error("username must not be purely numeric")]
    PurelyNumeric,
}

/// Validates a candidate delegate username against the rules in the
/// data model: lowercase, 1-20 bytes, matching `[a-z0-9!@$&_.]+`, and
/// not matching `^[0-9]{1,25}$` (a bare numeric string, which would be
/// ambiguous with an address).
pub fn validate_username(name: &str) -> Result<(), UsernameError> {
    if name.is_empty() || name.len() > MAX_DELEGATE_USERNAME_LENGTH {
        return Err(UsernameError::BadLength(name.len()));
    }

    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || "!@$&_.".contains(c);
    if !name.chars().all(allowed) {
        return Err(UsernameError::IllegalCharacter);
    }

    if name.len() <= 25 && name.chars().all(|c| c.is_ascii_digit()) {
        return Err(UsernameError::PurelyNumeric);
    }

    Ok(())
}

/// A delegate: an account elected to produce blocks in a round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Delegate {
    pub username: String,
    pub public_key: PublicKey,
    pub missed_blocks: u64,
    pub forged_blocks: u64,
    pub votes: u64,
    pub confirmed_vote_count: u64,
    pub approval: f64,
}

impl Delegate {
    pub fn new(username: String, public_key: PublicKey) -> Result<Self, UsernameError> {
        validate_username(&username)?;
        Ok(Self {
            username,
            public_key,
            missed_blocks: 0,
            forged_blocks: 0,
            votes: 0,
            confirmed_vote_count: 0,
            approval: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_username() {
        assert!(validate_username("genesis_delegate1").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(validate_username(""), Err(UsernameError::BadLength(0)));
    }

    #[test]
    fn rejects_too_long() {
        let name = "a".repeat(21);
        assert_eq!(
            validate_username(&name),
            Err(UsernameError::BadLength(21))
        );
    }

    #[test]
    fn rejects_uppercase() {
        assert_eq!(
            validate_username("Delegate"),
            Err(UsernameError::IllegalCharacter)
        );
    }

    #[test]
    fn rejects_purely_numeric() {
        assert_eq!(
            validate_username("123456"),
            Err(UsernameError::PurelyNumeric)
        );
    }

    #[test]
    fn accepts_allowed_punctuation() {
        assert!(validate_username("d!@$&_.1").is_ok());
    }

    #[test]
    fn new_rejects_invalid_username() {
        let pk = PublicKey([0u8; 32]);
        assert!(Delegate::new("BAD".to_string(), pk).is_err());
    }
}
