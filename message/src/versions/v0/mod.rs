//! A future-proof transaction message format that may load accounts from
//! address lookup tables.
//!
//! Accounts that are not signers and are not invoked as programs can be
//! referenced by position inside an on-chain table instead of being
//! carried in full. Such a message has to be resolved against the table
//! contents before its full account list is known.

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
pub use loaded::{AddressLoader, LoadedAddresses};
use {
    crate::{
        compiled_keys::CompiledKeys,
        legacy::sanitize_static,
        serialization::{
            body_size, lookups_size, read_body, read_lookups, write_body, write_lookups,
            MessageBody,
        },
        AccountKeys, AddressLookupTableAccount, CompiledInstruction, MessageError, MessageHeader,
        MessageSection, MAX_ACCOUNT_KEYS, MESSAGE_VERSION_PREFIX,
    },
    ledger_address::Address,
    ledger_hash::Hash,
    ledger_instruction::{Instruction, InstructionLike},
    ledger_serialize_utils::{append_u8, read_u8},
    log::debug,
};

mod loaded;

/// Address table lookups describe an on-chain address lookup table to use
/// for loading more readonly and writable accounts in a single tx.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct MessageAddressTableLookup {
    /// Address lookup table account key
    pub account_key: Address,
    /// List of indexes used to load writable account addresses
    pub writable_indexes: Vec<u8>,
    /// List of indexes used to load readonly account addresses
    pub readonly_indexes: Vec<u8>,
}

/// A transaction message in the v0 format.
///
/// Account indexes in `instructions` reach past `account_keys` into the
/// accounts loaded by `address_table_lookups`: first every writable lookup
/// entry, then every readonly one, each in lookup order.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Message {
    /// The message header, identifying signed and read-only `account_keys`.
    /// Header values only describe static `account_keys`, they do not
    /// describe any additional account keys loaded via address table lookups.
    pub header: MessageHeader,

    /// List of accounts loaded by this transaction.
    pub account_keys: Vec<Address>,

    /// The blockhash of a recent block.
    pub recent_blockhash: Hash,

    /// Instructions that invoke a designated program, are executed in sequence,
    /// and committed in one atomic transaction if all succeed.
    pub instructions: Vec<CompiledInstruction>,

    /// List of address table lookups used to load additional accounts
    /// for this transaction.
    pub address_table_lookups: Vec<MessageAddressTableLookup>,

    /// Set once by [`Message::resolve`]; never serialized.
    #[cfg_attr(feature = "serde", serde(skip))]
    loaded_addresses: Option<LoadedAddresses>,
}

impl Message {
    /// Assemble an unresolved message from its parts.
    pub fn new(
        header: MessageHeader,
        account_keys: Vec<Address>,
        recent_blockhash: Hash,
        instructions: Vec<CompiledInstruction>,
        address_table_lookups: Vec<MessageAddressTableLookup>,
    ) -> Self {
        Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
            loaded_addresses: None,
        }
    }

    /// Create a signable transaction message from a `payer` public key,
    /// `recent_blockhash`, list of `instructions`, and a list of
    /// `address_lookup_table_accounts`.
    ///
    /// Every non-signer account that is not invoked as a program and is
    /// found in one of the tables is referenced through that table instead
    /// of the static key list. Tables are tried in order and a table that
    /// supplies nothing is left out. The returned message is unresolved, as
    /// a decoder would produce it.
    ///
    /// # Errors
    ///
    /// `MissingPayer`, `TooManyAccounts` when static and looked-up accounts
    /// together exceed 255, and `UnknownInstructionKey`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_address::Address;
    /// use ledger_hash::Hash;
    /// use ledger_instruction::{AccountMeta, Instruction};
    /// use ledger_message::{v0, AddressLookupTableAccount};
    ///
    /// let payer = Address::new_unique();
    /// let program_id = Address::new_unique();
    /// let pool = Address::new_unique();
    /// let table = AddressLookupTableAccount {
    ///     key: Address::new_unique(),
    ///     addresses: vec![Address::new_unique(), pool],
    /// };
    /// let instruction = Instruction::new_with_bytes(
    ///     program_id,
    ///     &[1],
    ///     vec![AccountMeta::new(payer, true), AccountMeta::new(pool, false)],
    /// );
    ///
    /// let mut message = v0::Message::try_compile(
    ///     &payer,
    ///     &[instruction],
    ///     &[table.clone()],
    ///     Hash::new_unique(),
    /// )
    /// .unwrap();
    /// assert_eq!(message.account_keys, vec![payer, program_id]);
    /// assert_eq!(message.address_table_lookups[0].writable_indexes, vec![1]);
    ///
    /// message.resolve(&[table]).unwrap();
    /// assert_eq!(message.is_writable(2), Ok(true));
    /// ```
    pub fn try_compile<I: InstructionLike>(
        payer: &Address,
        instructions: &[I],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        recent_blockhash: Hash,
    ) -> Result<Self, MessageError> {
        let mut compiled_keys = CompiledKeys::compile(Some(payer), instructions)?;

        let mut address_table_lookups = Vec::with_capacity(address_lookup_table_accounts.len());
        let mut loaded_addresses_list = Vec::with_capacity(address_lookup_table_accounts.len());
        for lookup_table_account in address_lookup_table_accounts {
            if let Some((lookup, loaded_addresses)) =
                compiled_keys.try_extract_table_lookup(lookup_table_account)?
            {
                address_table_lookups.push(lookup);
                loaded_addresses_list.push(loaded_addresses);
            }
        }

        let (header, static_keys) = compiled_keys.try_into_message_components()?;
        let dynamic_keys = LoadedAddresses::from_iter(loaded_addresses_list);
        let num_keys = static_keys.len().saturating_add(dynamic_keys.len());
        if num_keys > MAX_ACCOUNT_KEYS {
            return Err(MessageError::TooManyAccounts(num_keys));
        }
        let instructions = AccountKeys::new(&static_keys, Some(&dynamic_keys))
            .try_compile_instructions(instructions)?;

        debug!(
            "compiled v0 message: {} static accounts, {} looked up through {} tables, {} instructions",
            static_keys.len(),
            dynamic_keys.len(),
            address_table_lookups.len(),
            instructions.len()
        );
        Ok(Self::new(
            header,
            static_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
        ))
    }

    /// Resolve the lookups against the supplied tables.
    ///
    /// See [`Message::resolve_with`].
    pub fn resolve(
        &mut self,
        tables: &[AddressLookupTableAccount],
    ) -> Result<&LoadedAddresses, MessageError> {
        self.resolve_with(tables)
    }

    /// Resolve the lookups with any table source.
    ///
    /// Resolution happens at most once. A failed attempt leaves the message
    /// unresolved; a later call after success fails with `AlreadyResolved`
    /// and keeps the first result.
    pub fn resolve_with<L: AddressLoader + ?Sized>(
        &mut self,
        loader: &L,
    ) -> Result<&LoadedAddresses, MessageError> {
        if self.loaded_addresses.is_some() {
            return Err(MessageError::AlreadyResolved);
        }
        let loaded_addresses = loaded::load_addresses(loader, &self.address_table_lookups)?;
        let num_keys = self
            .account_keys
            .len()
            .saturating_add(loaded_addresses.len());
        if num_keys > MAX_ACCOUNT_KEYS {
            return Err(MessageError::TooManyAccounts(num_keys));
        }

        debug!(
            "resolved {} writable and {} readonly accounts from {} lookups",
            loaded_addresses.writable.len(),
            loaded_addresses.readonly.len(),
            self.address_table_lookups.len()
        );
        Ok(&*self.loaded_addresses.insert(loaded_addresses))
    }

    /// True once [`Message::resolve`] succeeded.
    pub fn is_resolved(&self) -> bool {
        self.loaded_addresses.is_some()
    }

    pub fn loaded_addresses(&self) -> Option<&LoadedAddresses> {
        self.loaded_addresses.as_ref()
    }

    /// Messages without lookups never need resolution.
    fn require_resolved(&self) -> Result<Option<&LoadedAddresses>, MessageError> {
        match &self.loaded_addresses {
            Some(loaded_addresses) => Ok(Some(loaded_addresses)),
            None if self.address_table_lookups.is_empty() => Ok(None),
            None => Err(MessageError::UnresolvedLookup),
        }
    }

    /// Full account list in resolved order.
    pub fn account_keys(&self) -> Result<AccountKeys<'_>, MessageError> {
        let dynamic_keys = self.require_resolved()?;
        Ok(AccountKeys::new(&self.account_keys, dynamic_keys))
    }

    /// Returns true if the account at the specified index signed this
    /// message. Looked-up accounts never sign.
    pub fn is_signer(&self, index: usize) -> Result<bool, MessageError> {
        self.require_resolved()?;
        Ok(index < self.account_keys.len() && self.header.is_signer(index))
    }

    /// Returns true if the account at the specified index was requested to be
    /// writable.
    pub fn is_writable(&self, index: usize) -> Result<bool, MessageError> {
        let loaded_addresses = self.require_resolved()?;
        let num_static = self.account_keys.len();
        if index < num_static {
            return Ok(self.header.is_writable_index(index, num_static));
        }
        let num_loaded_writable = loaded_addresses.map_or(0, |loaded| loaded.writable.len());
        Ok(index.saturating_sub(num_static) < num_loaded_writable)
    }

    /// The fee payer, if the message has any account.
    pub fn fee_payer(&self) -> Option<&Address> {
        self.account_keys.first()
    }

    /// Signer keys in signature order.
    pub fn signer_keys(&self) -> &[Address] {
        let num_signers = usize::from(self.header.num_required_signatures);
        &self.account_keys[..num_signers.min(self.account_keys.len())]
    }

    /// Serialize the message with its version prefix.
    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::with_capacity(self.size());
        append_u8(&mut bytes, MESSAGE_VERSION_PREFIX);
        write_body(
            &mut bytes,
            &self.header,
            &self.account_keys,
            &self.recent_blockhash,
            &self.instructions,
        )?;
        write_lookups(&mut bytes, &self.address_table_lookups)?;
        Ok(bytes)
    }

    /// Decode a v0 message that spans all of `data`.
    pub fn deserialize(data: &[u8]) -> Result<Self, MessageError> {
        let (message, consumed) = Self::deserialize_partial(data)?;
        match data.len().saturating_sub(consumed) {
            0 => Ok(message),
            trailing => Err(MessageError::TrailingData(trailing)),
        }
    }

    /// Decode a v0 message from the front of `data`, returning it with the
    /// number of bytes it occupied. The result is unresolved.
    pub fn deserialize_partial(data: &[u8]) -> Result<(Self, usize), MessageError> {
        let mut offset = 0;
        let prefix = read_u8(&mut offset, data)
            .map_err(|_| MessageError::MalformedMessage(MessageSection::VersionPrefix))?;
        if prefix & MESSAGE_VERSION_PREFIX == 0 {
            return Err(MessageError::MalformedMessage(MessageSection::VersionPrefix));
        }
        let version = prefix & !MESSAGE_VERSION_PREFIX;
        if version != 0 {
            return Err(MessageError::InvalidVersion(version));
        }

        let MessageBody {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        } = read_body(&mut offset, data)?;
        let address_table_lookups = read_lookups(&mut offset, data)?;
        Ok((
            Self::new(
                header,
                account_keys,
                recent_blockhash,
                instructions,
                address_table_lookups,
            ),
            offset,
        ))
    }

    /// Serialized length in bytes, prefix included.
    pub fn size(&self) -> usize {
        1usize
            .saturating_add(body_size(&self.account_keys, &self.instructions))
            .saturating_add(lookups_size(&self.address_table_lookups))
    }

    /// Number of accounts the lookups load once resolved.
    pub fn num_lookup_indexes(&self) -> usize {
        self.address_table_lookups
            .iter()
            .map(|lookup| {
                lookup
                    .writable_indexes
                    .len()
                    .saturating_add(lookup.readonly_indexes.len())
            })
            .fold(0usize, |acc, x| acc.saturating_add(x))
    }

    /// Structural checks that need no table contents.
    pub fn sanitize(&self) -> Result<(), MessageError> {
        sanitize_static(
            &self.header,
            &self.account_keys,
            &self.instructions,
            self.num_lookup_indexes(),
        )
    }

    /// Rebuild full instructions. Requires resolution if the message has
    /// lookups.
    pub fn decompile_instructions(&self) -> Result<Vec<Instruction>, MessageError> {
        let account_keys = self.account_keys()?;
        account_keys.decompile_instructions(
            &self.instructions,
            |i| self.is_signer(i).unwrap_or(false),
            |i| self.is_writable(i).unwrap_or(false),
        )
    }
}
