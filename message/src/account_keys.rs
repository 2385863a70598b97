use {
    crate::{v0::LoadedAddresses, CompiledInstruction, MessageError},
    ledger_address::Address,
    ledger_instruction::{AccountMeta, Instruction, InstructionLike},
    std::collections::HashMap,
};

/// Collection of static and dynamically loaded keys used to load accounts
/// during transaction processing.
///
/// Indexing follows the resolved order: static keys, then writable loaded
/// keys, then readonly loaded keys.
#[derive(Clone, Default, Debug, Eq)]
pub struct AccountKeys<'a> {
    static_keys: &'a [Address],
    dynamic_keys: Option<&'a LoadedAddresses>,
}

impl<'a> AccountKeys<'a> {
    pub fn new(static_keys: &'a [Address], dynamic_keys: Option<&'a LoadedAddresses>) -> Self {
        Self {
            static_keys,
            dynamic_keys,
        }
    }

    /// Returns an iterator of account key segments. The ordering of segments
    /// affects how account indexes from compiled instructions are resolved and
    /// so should not be changed.
    #[inline]
    fn key_segment_iter(&self) -> impl Iterator<Item = &'a [Address]> + Clone {
        if let Some(dynamic_keys) = self.dynamic_keys {
            [
                self.static_keys,
                &dynamic_keys.writable,
                &dynamic_keys.readonly,
            ]
            .into_iter()
        } else {
            // empty segments keep the iterator type identical
            [self.static_keys, &[], &[]].into_iter()
        }
    }

    /// Returns the address of the account at the specified index of the list of
    /// message account keys constructed from static keys, followed by dynamically
    /// loaded writable addresses, and lastly the list of dynamically loaded
    /// readonly addresses.
    #[inline]
    pub fn get(&self, mut index: usize) -> Option<&'a Address> {
        for key_segment in self.key_segment_iter() {
            if index < key_segment.len() {
                return Some(&key_segment[index]);
            }
            index = index.saturating_sub(key_segment.len());
        }

        None
    }

    /// Returns the total length of loaded accounts for a message
    #[inline]
    pub fn len(&self) -> usize {
        let mut len = 0usize;
        for key_segment in self.key_segment_iter() {
            len = len.saturating_add(key_segment.len());
        }
        len
    }

    /// Returns true if this collection of account keys is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterator for the addresses of the loaded accounts for a message
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'a Address> + Clone {
        self.key_segment_iter().flatten()
    }

    /// Position of `key` in the resolved order.
    pub fn search(&self, key: &Address) -> Option<usize> {
        self.iter().position(|candidate| candidate == key)
    }

    /// Compile instructions using the order of account keys to determine
    /// compiled instruction account indexes.
    ///
    /// # Errors
    ///
    /// `TooManyAccounts` if more keys exist than a byte can index, and
    /// `UnknownInstructionKey` if an instruction names an account this
    /// collection does not hold.
    pub fn try_compile_instructions<I: InstructionLike>(
        &self,
        instructions: &[I],
    ) -> Result<Vec<CompiledInstruction>, MessageError> {
        let mut account_index_map = HashMap::<&Address, u8>::new();
        for (index, key) in self.iter().enumerate() {
            let index = u8::try_from(index).map_err(|_| MessageError::TooManyAccounts(self.len()))?;
            account_index_map.insert(key, index);
        }

        let get_account_index = |key: &Address| -> Result<u8, MessageError> {
            account_index_map
                .get(key)
                .copied()
                .ok_or(MessageError::UnknownInstructionKey(*key))
        };

        instructions
            .iter()
            .map(|ix| -> Result<CompiledInstruction, MessageError> {
                let accounts: Vec<u8> = ix
                    .accounts()
                    .iter()
                    .map(|account_meta| get_account_index(&account_meta.pubkey))
                    .collect::<Result<Vec<u8>, MessageError>>()?;

                Ok(CompiledInstruction {
                    program_id_index: get_account_index(ix.program_id())?,
                    data: ix.data().to_vec(),
                    accounts,
                })
            })
            .collect()
    }

    /// Expand compiled instructions back into full instructions.
    pub(crate) fn decompile_instructions(
        &self,
        instructions: &[CompiledInstruction],
        is_signer: impl Fn(usize) -> bool,
        is_writable: impl Fn(usize) -> bool,
    ) -> Result<Vec<Instruction>, MessageError> {
        instructions
            .iter()
            .enumerate()
            .map(|(instruction, compiled)| -> Result<Instruction, MessageError> {
                let program_id = *self.get(usize::from(compiled.program_id_index)).ok_or(
                    MessageError::InvalidProgramIdIndex {
                        instruction,
                        index: compiled.program_id_index,
                    },
                )?;
                let accounts = compiled
                    .accounts
                    .iter()
                    .map(|&index| -> Result<AccountMeta, MessageError> {
                        let key_index = usize::from(index);
                        let pubkey = *self
                            .get(key_index)
                            .ok_or(MessageError::InvalidAccountIndex { instruction, index })?;
                        Ok(AccountMeta {
                            pubkey,
                            is_signer: is_signer(key_index),
                            is_writable: is_writable(key_index),
                        })
                    })
                    .collect::<Result<Vec<_>, MessageError>>()?;
                Ok(Instruction {
                    program_id,
                    accounts,
                    data: compiled.data.clone(),
                })
            })
            .collect()
    }
}

impl PartialEq for AccountKeys<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().zip(other.iter()).all(|(a, b)| a == b) && self.len() == other.len()
    }
}
