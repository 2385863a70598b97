//! Sequences of instructions executed atomically, and their wire encoding.
//!
//! A message is compiled from a fee payer, a recent blockhash and an ordered
//! list of instructions. Compilation merges the accounts of every instruction
//! into one ordered, deduplicated account table and replaces every account
//! reference with a one-byte index into it. Two wire formats exist:
//!
//! - [`legacy::Message`], the original format with a flat account table;
//! - [`v0::Message`], which may additionally reference accounts stored in
//!   on-chain address lookup tables.
//!
//! [`VersionedMessage`] wraps both and dispatches decoding on the first byte.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

mod account_keys;
mod address_lookup_table_account;
pub mod compiled_instruction;
mod compiled_keys;
mod error;
pub mod legacy;
mod serialization;
mod versions;

pub use {
    account_keys::AccountKeys,
    address_lookup_table_account::AddressLookupTableAccount,
    compiled_instruction::CompiledInstruction,
    error::{ErrorKind, MessageError, MessageSection},
    versions::{v0, MessageVersion, VersionedMessage},
};

/// Bit set on the first byte of every versioned message.
///
/// A legacy message starts with its signer count, which stays below 128 in
/// any well-formed message, so the high bit alone tells the formats apart.
pub const MESSAGE_VERSION_PREFIX: u8 = 0x80;

/// Largest account table a message may reference. Account indices are
/// single bytes.
pub const MAX_ACCOUNT_KEYS: usize = u8::MAX as usize;

/// Describes the organization of a message's account keys.
///
/// Every instruction in a message specifies which accounts it will operate
/// on, and whether those accounts must sign and/or are writable. Account
/// keys are ordered as
///
/// ```text
/// [writable signers][readonly signers][writable non-signers][readonly non-signers]
/// ```
///
/// and the header records the size of each region.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct MessageHeader {
    /// The number of signatures required for this message to be considered
    /// valid. The signers of those signatures must match the first
    /// `num_required_signatures` of the account keys.
    pub num_required_signatures: u8,
    /// The last `num_readonly_signed_accounts` of the signed keys are
    /// read-only accounts.
    pub num_readonly_signed_accounts: u8,
    /// The last `num_readonly_unsigned_accounts` of the unsigned keys are
    /// read-only accounts.
    pub num_readonly_unsigned_accounts: u8,
}

impl MessageHeader {
    /// Serialized size of the header.
    pub const LEN: usize = 3;

    pub fn is_signer(&self, key_index: usize) -> bool {
        key_index < usize::from(self.num_required_signatures)
    }

    /// Writability of a key in a static account table of `num_account_keys`
    /// entries, as encoded by the header alone.
    pub fn is_writable_index(&self, key_index: usize, num_account_keys: usize) -> bool {
        let num_signed_accounts = usize::from(self.num_required_signatures);
        if key_index >= num_account_keys {
            return false;
        }

        if key_index >= num_signed_accounts {
            let num_unsigned_accounts = num_account_keys.saturating_sub(num_signed_accounts);
            let num_writable_unsigned_accounts = num_unsigned_accounts
                .saturating_sub(usize::from(self.num_readonly_unsigned_accounts));
            let unsigned_account_index = key_index.saturating_sub(num_signed_accounts);
            unsigned_account_index < num_writable_unsigned_accounts
        } else {
            let num_writable_signed_accounts = num_signed_accounts
                .saturating_sub(usize::from(self.num_readonly_signed_accounts));
            key_index < num_writable_signed_accounts
        }
    }

    /// Header counts fit the account table they describe.
    pub(crate) fn sanitize(&self, num_static_account_keys: usize) -> Result<(), MessageError> {
        // the fee payer must be a writable signer
        if self.num_required_signatures == 0
            || self.num_readonly_signed_accounts >= self.num_required_signatures
        {
            return Err(MessageError::InvalidHeader);
        }
        let min_accounts = usize::from(self.num_required_signatures)
            .saturating_add(usize::from(self.num_readonly_unsigned_accounts));
        if num_static_account_keys < min_accounts {
            return Err(MessageError::InvalidHeader);
        }
        Ok(())
    }
}
