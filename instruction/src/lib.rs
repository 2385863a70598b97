//! Types for directing the execution of on-chain programs.
//!
//! An [`Instruction`] names the program to run, the accounts it will touch and
//! an opaque data payload. The message compiler only relies on that triple,
//! expressed by the [`InstructionLike`] trait, so program-specific builders can
//! hand over their own types without converting first.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use ledger_address::Address;

pub mod decoder;
pub mod slots;

pub use {
    decoder::{DecodeInstructionError, DecoderTable, InstructionDecoder},
    slots::{AccountMetaSlots, SlotError},
};

/// Describes a single account read or written by a program during
/// instruction execution.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct AccountMeta {
    /// An account's public key.
    pub pubkey: Address,
    /// True if an `Instruction` requires a `Transaction` signature matching `pubkey`.
    pub is_signer: bool,
    /// True if the account data or metadata may be mutated during program execution.
    pub is_writable: bool,
}

impl AccountMeta {
    /// Construct metadata for a writable account.
    pub fn new(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// Construct metadata for a read-only account.
    pub fn new_readonly(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A directive for a single invocation of a program.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instruction {
    /// Address of the program that executes this instruction.
    pub program_id: Address,
    /// Metadata describing accounts that should be passed to the program.
    pub accounts: Vec<AccountMeta>,
    /// Opaque data passed to the program for its own interpretation.
    pub data: Vec<u8>,
}

impl Instruction {
    pub fn new_with_bytes(program_id: Address, data: &[u8], accounts: Vec<AccountMeta>) -> Self {
        Self {
            program_id,
            accounts,
            data: data.to_vec(),
        }
    }
}

/// Anything that can be compiled into a message: a program id, the ordered
/// account metas and the instruction data.
pub trait InstructionLike {
    fn program_id(&self) -> &Address;
    fn accounts(&self) -> &[AccountMeta];
    fn data(&self) -> &[u8];

    /// Copy into an owned [`Instruction`].
    fn to_instruction(&self) -> Instruction {
        Instruction {
            program_id: *self.program_id(),
            accounts: self.accounts().to_vec(),
            data: self.data().to_vec(),
        }
    }
}

impl InstructionLike for Instruction {
    fn program_id(&self) -> &Address {
        &self.program_id
    }

    fn accounts(&self) -> &[AccountMeta] {
        &self.accounts
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

impl<T: InstructionLike + ?Sized> InstructionLike for &T {
    fn program_id(&self) -> &Address {
        (**self).program_id()
    }

    fn accounts(&self) -> &[AccountMeta] {
        (**self).accounts()
    }

    fn data(&self) -> &[u8] {
        (**self).data()
    }
}

impl<T: InstructionLike + ?Sized> InstructionLike for Box<T> {
    fn program_id(&self) -> &Address {
        (**self).program_id()
    }

    fn accounts(&self) -> &[AccountMeta] {
        (**self).accounts()
    }

    fn data(&self) -> &[u8] {
        (**self).data()
    }
}
