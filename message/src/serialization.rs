//! Wire encoding shared by the legacy and v0 message formats.
//!
//! # Binary Format
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ Version (u8 = 0x80 | version), v0 only                 │
//! │ MessageHeader (3 x u8)                                 │
//! │ NumAccountKeys (compact-u16)                           │
//! │ AccountKeys [[u8; 32] x NumAccountKeys]                │
//! │ RecentBlockhash [u8; 32]                               │
//! │ NumInstructions (compact-u16)                          │
//! │ Instructions, each:                                    │
//! │   ProgramIdIndex (u8)                                  │
//! │   NumAccounts (compact-u16), AccountIndexes [u8]       │
//! │   DataLen (compact-u16), Data [u8]                     │
//! │ NumLookups (compact-u16), v0 only                      │
//! │ Lookups, each:                                         │
//! │   TableAddress [u8; 32]                                │
//! │   NumWritable (compact-u16), WritableIndexes [u8]      │
//! │   NumReadonly (compact-u16), ReadonlyIndexes [u8]      │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Signatures are not part of the message.

use {
    crate::{
        v0::MessageAddressTableLookup, CompiledInstruction, MessageError, MessageHeader,
        MessageSection,
    },
    ledger_address::{Address, ADDRESS_BYTES},
    ledger_hash::{Hash, HASH_BYTES},
    ledger_serialize_utils::{
        append_short_len, append_slice, append_u8, read_address, read_array, read_short_len,
        read_short_vec_bytes, read_u8,
    },
    ledger_short_vec::encoded_len,
};

/// Fields common to both formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MessageBody {
    pub(crate) header: MessageHeader,
    pub(crate) account_keys: Vec<Address>,
    pub(crate) recent_blockhash: Hash,
    pub(crate) instructions: Vec<CompiledInstruction>,
}

/// Length prefix for a section, or `TooLong` past the compact-u16 range.
fn short_len(section: MessageSection, len: usize) -> Result<u16, MessageError> {
    u16::try_from(len).map_err(|_| MessageError::TooLong { section, len })
}

/// Wire size of a compact-u16 prefix for `len`.
fn short_len_size(len: usize) -> usize {
    u16::try_from(len).map_or(ledger_short_vec::MAX_ENCODING_LENGTH, encoded_len)
}

fn short_vec_size(len: usize) -> usize {
    short_len_size(len).saturating_add(len)
}

pub(crate) fn body_size(
    account_keys: &[Address],
    instructions: &[CompiledInstruction],
) -> usize {
    let keys_size = short_len_size(account_keys.len())
        .saturating_add(account_keys.len().saturating_mul(ADDRESS_BYTES));
    let instructions_size = instructions
        .iter()
        .map(|ix| {
            // program id index
            1usize
                .saturating_add(short_vec_size(ix.accounts.len()))
                .saturating_add(short_vec_size(ix.data.len()))
        })
        .fold(short_len_size(instructions.len()), |acc, x| {
            acc.saturating_add(x)
        });

    MessageHeader::LEN
        .saturating_add(keys_size)
        .saturating_add(HASH_BYTES)
        .saturating_add(instructions_size)
}

pub(crate) fn lookups_size(lookups: &[MessageAddressTableLookup]) -> usize {
    lookups
        .iter()
        .map(|lookup| {
            ADDRESS_BYTES
                .saturating_add(short_vec_size(lookup.writable_indexes.len()))
                .saturating_add(short_vec_size(lookup.readonly_indexes.len()))
        })
        .fold(short_len_size(lookups.len()), |acc, x| acc.saturating_add(x))
}

pub(crate) fn write_body(
    bytes: &mut Vec<u8>,
    header: &MessageHeader,
    account_keys: &[Address],
    recent_blockhash: &Hash,
    instructions: &[CompiledInstruction],
) -> Result<(), MessageError> {
    append_u8(bytes, header.num_required_signatures);
    append_u8(bytes, header.num_readonly_signed_accounts);
    append_u8(bytes, header.num_readonly_unsigned_accounts);

    append_short_len(
        bytes,
        short_len(MessageSection::AccountKeysLen, account_keys.len())?,
    );
    for key in account_keys {
        append_slice(bytes, key.as_ref());
    }
    append_slice(bytes, recent_blockhash.as_ref());

    append_short_len(
        bytes,
        short_len(MessageSection::InstructionsLen, instructions.len())?,
    );
    for (instruction, ix) in instructions.iter().enumerate() {
        append_u8(bytes, ix.program_id_index);
        append_short_len(
            bytes,
            short_len(
                MessageSection::InstructionAccounts { instruction },
                ix.accounts.len(),
            )?,
        );
        append_slice(bytes, &ix.accounts);
        append_short_len(
            bytes,
            short_len(MessageSection::InstructionData { instruction }, ix.data.len())?,
        );
        append_slice(bytes, &ix.data);
    }
    Ok(())
}

pub(crate) fn write_lookups(
    bytes: &mut Vec<u8>,
    lookups: &[MessageAddressTableLookup],
) -> Result<(), MessageError> {
    append_short_len(
        bytes,
        short_len(MessageSection::AddressTableLookupsLen, lookups.len())?,
    );
    for (lookup, table_lookup) in lookups.iter().enumerate() {
        append_slice(bytes, table_lookup.account_key.as_ref());
        append_short_len(
            bytes,
            short_len(
                MessageSection::WritableIndexes { lookup },
                table_lookup.writable_indexes.len(),
            )?,
        );
        append_slice(bytes, &table_lookup.writable_indexes);
        append_short_len(
            bytes,
            short_len(
                MessageSection::ReadonlyIndexes { lookup },
                table_lookup.readonly_indexes.len(),
            )?,
        );
        append_slice(bytes, &table_lookup.readonly_indexes);
    }
    Ok(())
}

/// Reads the body starting at the header byte.
pub(crate) fn read_body(current: &mut usize, data: &[u8]) -> Result<MessageBody, MessageError> {
    let malformed = MessageError::MalformedMessage;

    let header_bytes = read_array::<{ MessageHeader::LEN }>(current, data)
        .map_err(|_| malformed(MessageSection::Header))?;
    let header = MessageHeader {
        num_required_signatures: header_bytes[0],
        num_readonly_signed_accounts: header_bytes[1],
        num_readonly_unsigned_accounts: header_bytes[2],
    };

    let num_keys =
        read_short_len(current, data).map_err(|_| malformed(MessageSection::AccountKeysLen))?;
    let account_keys = (0..num_keys)
        .map(|index| {
            read_address(current, data).map_err(|_| malformed(MessageSection::AccountKey(index)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let recent_blockhash = read_array::<HASH_BYTES>(current, data)
        .map(Hash::from)
        .map_err(|_| malformed(MessageSection::RecentBlockhash))?;

    let num_instructions =
        read_short_len(current, data).map_err(|_| malformed(MessageSection::InstructionsLen))?;
    let instructions = (0..num_instructions)
        .map(|instruction| -> Result<CompiledInstruction, MessageError> {
            let program_id_index = read_u8(current, data)
                .map_err(|_| malformed(MessageSection::ProgramIdIndex { instruction }))?;
            let accounts = read_short_vec_bytes(current, data)
                .map_err(|_| malformed(MessageSection::InstructionAccounts { instruction }))?;
            let ix_data = read_short_vec_bytes(current, data)
                .map_err(|_| malformed(MessageSection::InstructionData { instruction }))?;
            Ok(CompiledInstruction {
                program_id_index,
                accounts,
                data: ix_data,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MessageBody {
        header,
        account_keys,
        recent_blockhash,
        instructions,
    })
}

pub(crate) fn read_lookups(
    current: &mut usize,
    data: &[u8],
) -> Result<Vec<MessageAddressTableLookup>, MessageError> {
    let malformed = MessageError::MalformedMessage;

    let num_lookups = read_short_len(current, data)
        .map_err(|_| malformed(MessageSection::AddressTableLookupsLen))?;
    (0..num_lookups)
        .map(|lookup| -> Result<MessageAddressTableLookup, MessageError> {
            let account_key = read_address(current, data)
                .map_err(|_| malformed(MessageSection::LookupTableKey { lookup }))?;
            let writable_indexes = read_short_vec_bytes(current, data)
                .map_err(|_| malformed(MessageSection::WritableIndexes { lookup }))?;
            let readonly_indexes = read_short_vec_bytes(current, data)
                .map_err(|_| malformed(MessageSection::ReadonlyIndexes { lookup }))?;
            Ok(MessageAddressTableLookup {
                account_key,
                writable_indexes,
                readonly_indexes,
            })
        })
        .collect()
}
