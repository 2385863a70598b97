//! Atomically-committed sequences of instructions, with their signatures.
//!
//! A [`Transaction`] pairs a [`VersionedMessage`] with one signature slot per
//! required signer. Slots start empty (all zeroes) and are filled by
//! [`Transaction::sign`] or [`Transaction::add_signature`]; only a fully
//! signed transaction serializes.
//!
//! # Wire format
//!
//! ```text
//! [compact-u16 signature count][64-byte signatures][message bytes]
//! ```
//!
//! # Examples
//!
//! ```
//! use ledger_hash::Hash;
//! use ledger_instruction::{AccountMeta, Instruction};
//! use ledger_address::Address;
//! use ledger_signer::{Keypair, Signer};
//! use ledger_transaction::{SigningState, Transaction};
//!
//! let payer = Keypair::new();
//! let recipient = Address::new_unique();
//! let program_id = Address::new_unique();
//! let instruction = Instruction::new_with_bytes(
//!     program_id,
//!     &[2, 0, 0, 0, 232, 3, 0, 0, 0, 0, 0, 0],
//!     vec![AccountMeta::new(payer.pubkey(), true), AccountMeta::new(recipient, false)],
//! );
//!
//! let mut tx = Transaction::compile(&[instruction], Hash::new_unique(), &payer.pubkey())?;
//! assert_eq!(tx.signing_state(), SigningState::Unsigned);
//!
//! tx.sign(&[&payer])?;
//! let wire = tx.serialize()?;
//! assert_eq!(wire.len(), 1 + 64 + 150);
//! # Ok::<(), ledger_transaction::TransactionError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    ledger_address::Address,
    ledger_hash::Hash,
    ledger_instruction::InstructionLike,
    ledger_message::{
        legacy,
        v0::{self, AddressLoader, LoadedAddresses},
        AddressLookupTableAccount, VersionedMessage,
    },
    ledger_serialize_utils::{append_short_len, append_slice, read_array, read_short_len},
    ledger_short_vec::encoded_len,
    ledger_signature::{Signature, SIGNATURE_BYTES},
    ledger_signer::Signers,
    log::debug,
};

mod error;

pub use {
    error::TransactionError,
    ledger_message::ErrorKind,
};

/// Progress of a transaction towards submission.
///
/// Signing only moves the state forward. Replacing the recent blockhash
/// changes the signed bytes and returns the transaction to `Unsigned`.
/// Serializing is the terminal step and needs `FullySigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningState {
    /// Every signature slot is empty.
    Unsigned,
    /// Some, but not all, slots hold a signature.
    PartiallySigned,
    /// Every required signature is present.
    FullySigned,
}

/// An atomically-committed sequence of instructions.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Transaction {
    /// List of signatures, parallel to the message's signer keys.
    pub signatures: Vec<Signature>,
    /// Message to sign. Only reachable through methods that keep the
    /// signatures consistent with its bytes.
    message: VersionedMessage,
}

impl Transaction {
    /// A transaction over `message` with an empty slot per required signer.
    pub fn new_unsigned(message: VersionedMessage) -> Self {
        let num_required_signatures = usize::from(message.header().num_required_signatures);
        Self {
            signatures: vec![Signature::default(); num_required_signatures],
            message,
        }
    }

    /// Compile `instructions` into a legacy message paid by `payer`.
    pub fn compile<I: InstructionLike>(
        instructions: &[I],
        recent_blockhash: Hash,
        payer: &Address,
    ) -> Result<Self, TransactionError> {
        let message = legacy::Message::try_compile(payer, instructions, recent_blockhash)?;
        Ok(Self::new_unsigned(VersionedMessage::Legacy(message)))
    }

    /// Compile `instructions` into a v0 message, loading accounts from
    /// `address_lookup_table_accounts` where possible.
    pub fn compile_v0<I: InstructionLike>(
        instructions: &[I],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        recent_blockhash: Hash,
        payer: &Address,
    ) -> Result<Self, TransactionError> {
        let message = v0::Message::try_compile(
            payer,
            instructions,
            address_lookup_table_accounts,
            recent_blockhash,
        )?;
        Ok(Self::new_unsigned(VersionedMessage::V0(message)))
    }

    pub fn message(&self) -> &VersionedMessage {
        &self.message
    }

    /// Replace the recent blockhash. The message bytes change, so every
    /// signature slot is emptied.
    pub fn set_recent_blockhash(&mut self, recent_blockhash: Hash) {
        if self.message.recent_blockhash() == &recent_blockhash {
            return;
        }
        self.message.set_recent_blockhash(recent_blockhash);
        self.signatures.fill(Signature::default());
        debug!("recent blockhash replaced, signatures cleared");
    }

    /// Resolve the lookups of a v0 message through `loader`. Resolution
    /// leaves the message bytes untouched, so signatures are kept. A legacy
    /// message has no lookups and yields `None`.
    ///
    /// # Errors
    ///
    /// Whatever [`v0::Message::resolve_with`] reports.
    pub fn resolve_lookups<L: AddressLoader + ?Sized>(
        &mut self,
        loader: &L,
    ) -> Result<Option<&LoadedAddresses>, TransactionError> {
        match &mut self.message {
            VersionedMessage::Legacy(_) => Ok(None),
            VersionedMessage::V0(message) => Ok(Some(message.resolve_with(loader)?)),
        }
    }

    /// The bytes every signature covers.
    pub fn message_data(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(self.message.serialize()?)
    }

    /// Keys that must sign, in slot order.
    pub fn signer_keys(&self) -> &[Address] {
        self.message.signer_keys()
    }

    fn signer_position(&self, pubkey: &Address) -> Result<usize, TransactionError> {
        self.signer_keys()
            .iter()
            .position(|key| key == pubkey)
            .ok_or(TransactionError::UnknownSigner(*pubkey))
    }

    fn check_slot_count(&self) -> Result<(), TransactionError> {
        let expected = self.signer_keys().len();
        if self.signatures.len() != expected {
            return Err(TransactionError::SignatureCountMismatch {
                expected,
                actual: self.signatures.len(),
            });
        }
        Ok(())
    }

    /// Sign with every signer in `signers`, each into its own slot.
    ///
    /// The message is serialized once and every signature of the call covers
    /// the same bytes. Signing again with a key overwrites its slot. Nothing
    /// is written if any signer is not a required signer of the message.
    ///
    /// # Errors
    ///
    /// `UnknownSigner` for a key outside the required signers, and any
    /// error raised by a signer.
    pub fn sign<T: Signers + ?Sized>(&mut self, signers: &T) -> Result<(), TransactionError> {
        self.check_slot_count()?;
        let positions = signers
            .try_pubkeys()?
            .iter()
            .map(|pubkey| self.signer_position(pubkey))
            .collect::<Result<Vec<usize>, TransactionError>>()?;

        let message_data = self.message_data()?;
        let signatures = signers.try_sign_message(&message_data)?;
        for (position, signature) in positions.into_iter().zip(signatures) {
            self.signatures[position] = signature;
        }

        debug!(
            "signed transaction, {} of {} signatures present",
            self.num_present_signatures(),
            self.signatures.len()
        );
        Ok(())
    }

    /// Attach a signature produced elsewhere for `pubkey`.
    pub fn add_signature(
        &mut self,
        pubkey: &Address,
        signature: Signature,
    ) -> Result<(), TransactionError> {
        self.check_slot_count()?;
        let position = self.signer_position(pubkey)?;
        self.signatures[position] = signature;
        Ok(())
    }

    fn num_present_signatures(&self) -> usize {
        self.signatures
            .iter()
            .filter(|signature| !signature.is_empty())
            .count()
    }

    /// Required signers whose slot is still empty.
    pub fn missing_signers(&self) -> Vec<Address> {
        self.signer_keys()
            .iter()
            .enumerate()
            .filter(|(position, _)| {
                self.signatures
                    .get(*position)
                    .map_or(true, Signature::is_empty)
            })
            .map(|(_, key)| *key)
            .collect()
    }

    pub fn signing_state(&self) -> SigningState {
        let required = self.signer_keys().len();
        match self.missing_signers().len() {
            0 => SigningState::FullySigned,
            missing if missing == required => SigningState::Unsigned,
            _ => SigningState::PartiallySigned,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signing_state() == SigningState::FullySigned
    }

    /// Wire bytes of a fully signed transaction.
    ///
    /// # Errors
    ///
    /// `NotFullySigned` while any slot is empty.
    pub fn serialize(&self) -> Result<Vec<u8>, TransactionError> {
        self.check_slot_count()?;
        let missing = self.missing_signers().len();
        if missing > 0 {
            return Err(TransactionError::NotFullySigned { missing });
        }

        let num_signatures = u16::try_from(self.signatures.len()).map_err(|_| {
            TransactionError::SignatureCountMismatch {
                expected: self.signer_keys().len(),
                actual: self.signatures.len(),
            }
        })?;
        let message_data = self.message_data()?;
        let mut bytes = Vec::with_capacity(self.size());
        append_short_len(&mut bytes, num_signatures);
        for signature in &self.signatures {
            append_slice(&mut bytes, signature.as_ref());
        }
        append_slice(&mut bytes, &message_data);

        debug!("serialized transaction, {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Decode a transaction that spans all of `data`.
    pub fn deserialize(data: &[u8]) -> Result<Self, TransactionError> {
        let (transaction, consumed) = Self::deserialize_partial(data)?;
        match data.len().saturating_sub(consumed) {
            0 => Ok(transaction),
            trailing => Err(TransactionError::TrailingData(trailing)),
        }
    }

    /// Decode a transaction from the front of `data`, returning it with the
    /// number of bytes it occupied.
    pub fn deserialize_partial(data: &[u8]) -> Result<(Self, usize), TransactionError> {
        let mut offset = 0;
        let num_signatures = read_short_len(&mut offset, data)
            .map_err(|_| TransactionError::NotEnoughSignatureBytes)?;
        let signatures = (0..num_signatures)
            .map(|_| {
                read_array::<SIGNATURE_BYTES>(&mut offset, data)
                    .map(Signature::from)
                    .map_err(|_| TransactionError::NotEnoughSignatureBytes)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let message_bytes = data.get(offset..).unwrap_or_default();
        let (message, message_len) = VersionedMessage::deserialize_partial(message_bytes)?;

        let expected = usize::from(message.header().num_required_signatures);
        if signatures.len() != expected {
            return Err(TransactionError::SignatureCountMismatch {
                expected,
                actual: signatures.len(),
            });
        }

        Ok((
            Self {
                signatures,
                message,
            },
            offset.saturating_add(message_len),
        ))
    }

    /// Serialized length in bytes.
    pub fn size(&self) -> usize {
        let num_signatures = self.signatures.len();
        u16::try_from(num_signatures)
            .map_or(ledger_short_vec::MAX_ENCODING_LENGTH, encoded_len)
            .saturating_add(num_signatures.saturating_mul(SIGNATURE_BYTES))
            .saturating_add(self.message.size())
    }

    /// Verify all signatures against the message.
    #[cfg(feature = "verify")]
    pub fn verify(&self) -> Result<bool, TransactionError> {
        Ok(self.verify_with_results()?.iter().all(|&valid| valid))
    }

    /// Verify each signature against its signer key, one result per slot.
    #[cfg(feature = "verify")]
    pub fn verify_with_results(&self) -> Result<Vec<bool>, TransactionError> {
        self.check_slot_count()?;
        let message_data = self.message_data()?;
        Ok(self
            .signatures
            .iter()
            .zip(self.signer_keys())
            .map(|(signature, pubkey)| signature.verify(pubkey.as_ref(), &message_data))
            .collect())
    }

    /// Structural checks of the message and the slot count.
    pub fn sanitize(&self) -> Result<(), TransactionError> {
        self.message.sanitize()?;
        self.check_slot_count()
    }
}
