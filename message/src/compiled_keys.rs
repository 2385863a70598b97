use {
    crate::{
        v0::{LoadedAddresses, MessageAddressTableLookup},
        AddressLookupTableAccount, MessageError, MessageHeader, MAX_ACCOUNT_KEYS,
    },
    ledger_address::Address,
    ledger_instruction::InstructionLike,
    log::{debug, trace},
    std::collections::HashMap,
};

/// Table entries past this position cannot be named by a one-byte index.
const MAX_INDEXABLE_TABLE_ENTRIES: usize = 256;

/// A helper struct to collect addresses compiled for a set of instructions.
///
/// Keys are held in first-occurrence order with the payer first; ordering by
/// signer/writable category happens in [`CompiledKeys::try_into_message_components`].
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompiledKeys {
    keys: Vec<(Address, CompiledKeyMeta)>,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
struct CompiledKeyMeta {
    is_signer: bool,
    is_writable: bool,
    is_invoked: bool,
}

impl CompiledKeyMeta {
    /// Position of the key's region in the account table.
    fn category(&self) -> u8 {
        match (self.is_signer, self.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    }
}

impl CompiledKeys {
    /// Compiles the addresses referenced by a list of instructions, merging
    /// duplicates so that each key keeps its first position and the most
    /// permissive flags seen for it.
    pub(crate) fn compile<I: InstructionLike>(
        payer: Option<&Address>,
        instructions: &[I],
    ) -> Result<Self, MessageError> {
        let payer = payer.ok_or(MessageError::MissingPayer)?;

        let mut positions = HashMap::<Address, usize>::new();
        let mut keys = Vec::new();
        let mut merge = |key: &Address, meta: CompiledKeyMeta| {
            let position = *positions.entry(*key).or_insert_with(|| {
                keys.push((*key, CompiledKeyMeta::default()));
                keys.len().saturating_sub(1)
            });
            let entry = &mut keys[position].1;
            entry.is_signer |= meta.is_signer;
            entry.is_writable |= meta.is_writable;
            entry.is_invoked |= meta.is_invoked;
        };

        merge(
            payer,
            CompiledKeyMeta {
                is_signer: true,
                is_writable: true,
                is_invoked: false,
            },
        );
        for (index, ix) in instructions.iter().enumerate() {
            trace!(
                "collecting keys of instruction {index} for program {}",
                ix.program_id()
            );
            for account_meta in ix.accounts() {
                merge(
                    &account_meta.pubkey,
                    CompiledKeyMeta {
                        is_signer: account_meta.is_signer,
                        is_writable: account_meta.is_writable,
                        is_invoked: false,
                    },
                );
            }
            merge(
                ix.program_id(),
                CompiledKeyMeta {
                    is_signer: false,
                    is_writable: false,
                    is_invoked: true,
                },
            );
        }

        Ok(Self { keys })
    }

    /// Orders the keys by category behind the payer and derives the header.
    pub(crate) fn try_into_message_components(
        mut self,
    ) -> Result<(MessageHeader, Vec<Address>), MessageError> {
        if self.keys.len() > MAX_ACCOUNT_KEYS {
            return Err(MessageError::TooManyAccounts(self.keys.len()));
        }
        let try_into_u8 = |num: usize| -> Result<u8, MessageError> {
            u8::try_from(num).map_err(|_| MessageError::TooManyAccounts(num))
        };

        // the payer stays pinned at index 0; sort_by_key is stable
        if let Some((_payer, rest)) = self.keys.split_first_mut() {
            rest.sort_by_key(|(_, meta)| meta.category());
        }

        let count = |category: u8| {
            self.keys
                .iter()
                .filter(|(_, meta)| meta.category() == category)
                .count()
        };
        let writable_signers = count(0);
        let readonly_signers = count(1);
        let readonly_non_signers = count(3);

        let header = MessageHeader {
            num_required_signatures: try_into_u8(
                writable_signers.saturating_add(readonly_signers),
            )?,
            num_readonly_signed_accounts: try_into_u8(readonly_signers)?,
            num_readonly_unsigned_accounts: try_into_u8(readonly_non_signers)?,
        };
        let static_account_keys: Vec<Address> =
            self.keys.into_iter().map(|(key, _)| key).collect();

        debug!(
            "compiled {} static account keys, {} required signatures",
            static_account_keys.len(),
            header.num_required_signatures
        );
        Ok((header, static_account_keys))
    }

    /// Moves every non-signer, non-invoked key found in the table out of the
    /// static list. Returns `None` if the table holds none of them.
    pub(crate) fn try_extract_table_lookup(
        &mut self,
        lookup_table_account: &AddressLookupTableAccount,
    ) -> Result<Option<(MessageAddressTableLookup, LoadedAddresses)>, MessageError> {
        let (writable_indexes, drained_writable_keys) =
            self.drain_keys_found_in_lookup_table(&lookup_table_account.addresses, true);
        let (readonly_indexes, drained_readonly_keys) =
            self.drain_keys_found_in_lookup_table(&lookup_table_account.addresses, false);

        if writable_indexes.is_empty() && readonly_indexes.is_empty() {
            return Ok(None);
        }

        debug!(
            "table {} supplies {} writable and {} readonly accounts",
            lookup_table_account.key,
            writable_indexes.len(),
            readonly_indexes.len()
        );
        Ok(Some((
            MessageAddressTableLookup {
                account_key: lookup_table_account.key,
                writable_indexes,
                readonly_indexes,
            },
            LoadedAddresses {
                writable: drained_writable_keys,
                readonly: drained_readonly_keys,
            },
        )))
    }

    fn drain_keys_found_in_lookup_table(
        &mut self,
        lookup_table_addresses: &[Address],
        writable: bool,
    ) -> (Vec<u8>, Vec<Address>) {
        let indexable = &lookup_table_addresses
            [..lookup_table_addresses.len().min(MAX_INDEXABLE_TABLE_ENTRIES)];
        let mut lookup_table_indexes = Vec::new();
        let mut drained_keys = Vec::new();
        self.keys.retain(|(key, meta)| {
            if meta.is_signer || meta.is_invoked || meta.is_writable != writable {
                return true;
            }
            let found = indexable
                .iter()
                .position(|candidate| candidate == key)
                .and_then(|index| u8::try_from(index).ok());
            match found {
                Some(index) => {
                    lookup_table_indexes.push(index);
                    drained_keys.push(*key);
                    false
                }
                None => true,
            }
        });
        (lookup_table_indexes, drained_keys)
    }
}
