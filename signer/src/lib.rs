//! Abstractions and implementations for transaction signers.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use {
    ed25519_dalek::Signer as DalekSigner,
    ledger_address::Address,
    ledger_signature::Signature,
    std::fmt,
    thiserror::Error,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("keypair-pubkey mismatch")]
    KeypairPubkeyMismatch,

    #[error("not enough signers")]
    NotEnoughSigners,

    #[error("too many signers")]
    TooManySigners,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("custom error: {0}")]
    Custom(String),
}

/// The `Signer` trait declares operations that all digital signature providers
/// must support. It is the primary interface by which signers are specified in
/// transaction signing interfaces.
pub trait Signer {
    /// Infallibly gets the implementor's public key.
    fn pubkey(&self) -> Address {
        self.try_pubkey().unwrap_or_default()
    }
    /// Fallibly gets the implementor's public key.
    fn try_pubkey(&self) -> Result<Address, SignerError>;
    /// Fallibly produces an ed25519 signature over the provided `message` bytes.
    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError>;
}

impl<T: Signer + ?Sized> Signer for &T {
    fn try_pubkey(&self) -> Result<Address, SignerError> {
        (**self).try_pubkey()
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        (**self).try_sign_message(message)
    }
}

impl<T: Signer + ?Sized> Signer for Box<T> {
    fn try_pubkey(&self) -> Result<Address, SignerError> {
        (**self).try_pubkey()
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        (**self).try_sign_message(message)
    }
}

/// Convenience trait for working with mixed collections of `Signer`s.
pub trait Signers {
    fn try_pubkeys(&self) -> Result<Vec<Address>, SignerError>;
    fn try_sign_message(&self, message: &[u8]) -> Result<Vec<Signature>, SignerError>;
}

impl<T: Signer> Signers for [T] {
    fn try_pubkeys(&self) -> Result<Vec<Address>, SignerError> {
        self.iter().map(Signer::try_pubkey).collect()
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Vec<Signature>, SignerError> {
        self.iter()
            .map(|signer| signer.try_sign_message(message))
            .collect()
    }
}

impl<T: Signer, const N: usize> Signers for [T; N] {
    fn try_pubkeys(&self) -> Result<Vec<Address>, SignerError> {
        self[..].try_pubkeys()
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Vec<Signature>, SignerError> {
        Signers::try_sign_message(&self[..], message)
    }
}

impl<T: Signer> Signers for Vec<T> {
    fn try_pubkeys(&self) -> Result<Vec<Address>, SignerError> {
        self[..].try_pubkeys()
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Vec<Signature>, SignerError> {
        Signers::try_sign_message(&self[..], message)
    }
}

/// A vanilla ed25519 key pair
pub struct Keypair(ed25519_dalek::SigningKey);

impl Keypair {
    /// Constructs a new, random `Keypair` using the operating system's RNG.
    pub fn new() -> Self {
        Self::new_from_array(rand::random())
    }

    /// Builds the keypair from a 32-byte ed25519 secret key.
    pub fn new_from_array(secret_key: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&secret_key))
    }

    /// Gets this `Keypair`'s secret key bytes.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl Default for Keypair {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.pubkey())
    }
}

impl Signer for Keypair {
    #[inline]
    fn pubkey(&self) -> Address {
        Address::from(self.0.verifying_key().to_bytes())
    }

    fn try_pubkey(&self) -> Result<Address, SignerError> {
        Ok(self.pubkey())
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        Ok(Signature::from(self.0.sign(message).to_bytes()))
    }
}
