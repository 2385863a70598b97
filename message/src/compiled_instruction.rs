#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use ledger_address::Address;

/// A compact encoding of an instruction.
///
/// A `CompiledInstruction` is a component of a multi-instruction message. It
/// is created during the construction of the message. Most users will not
/// interact with it directly.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CompiledInstruction {
    /// Index into the transaction keys array indicating the program account that executes this instruction.
    pub program_id_index: u8,
    /// Ordered indices into the transaction keys array indicating which accounts to pass to the program.
    pub accounts: Vec<u8>,
    /// The program input data.
    pub data: Vec<u8>,
}

impl CompiledInstruction {
    pub fn new_from_raw_parts(program_id_index: u8, data: Vec<u8>, accounts: Vec<u8>) -> Self {
        Self {
            program_id_index,
            accounts,
            data,
        }
    }

    /// The program key, if the index is inside `account_keys`.
    pub fn program_id<'a>(&self, account_keys: &'a [Address]) -> Option<&'a Address> {
        account_keys.get(usize::from(self.program_id_index))
    }
}
