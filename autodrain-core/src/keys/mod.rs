//! Credential handling and signing keys.
//!
//! Workers only see the [`KeyDeriver`] and [`SigningKey`] traits; the
//! concrete derivation scheme lives in [`mnemonic`].

pub mod mnemonic;
pub mod strkey;

use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

pub use mnemonic::{DerivationPath, MnemonicDeriver, PI_DERIVATION_PATH};
pub use strkey::{AccountId, StrkeyError};

/// Secret credential material: a mnemonic phrase or an `S...` seed.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret. Only key derivation should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("invalid secret seed: {0}")]
    InvalidSeed(#[from] StrkeyError),

    #[error("key material rejected: {0}")]
    Rejected(String),

    #[error("invalid derivation path {0:?}")]
    InvalidPath(String),
}

/// A key able to sign transaction hashes for one account.
pub trait SigningKey: Send + Sync {
    fn account_id(&self) -> &AccountId;

    /// Ed25519 signature over `message`.
    fn sign(&self, message: &[u8]) -> [u8; 64];
}

/// Turns a credential into signing key material.
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, credential: &Credential) -> Result<Box<dyn SigningKey>, KeyError>;
}

/// Ed25519 key pair backed by `ring`.
pub struct Ed25519Key {
    pair: Ed25519KeyPair,
    account: AccountId,
}

impl Ed25519Key {
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, KeyError> {
        let pair = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|e| KeyError::Rejected(e.to_string()))?;
        let public: [u8; 32] = pair
            .public_key()
            .as_ref()
            .try_into()
            .map_err(|_| KeyError::Rejected("unexpected public key length".to_string()))?;
        Ok(Self {
            pair,
            account: AccountId::from_public_key(public),
        })
    }
}

impl SigningKey for Ed25519Key {
    fn account_id(&self) -> &AccountId {
        &self.account
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(self.pair.sign(message).as_ref());
        out
    }
}
