#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    crate::{
        legacy, AccountKeys, CompiledInstruction, MessageError, MessageHeader, MessageSection,
        MESSAGE_VERSION_PREFIX,
    },
    core::fmt,
    ledger_address::Address,
    ledger_hash::Hash,
    ledger_instruction::{DecoderTable, Instruction},
    log::trace,
};

pub mod v0;

/// Wire format of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVersion {
    Legacy,
    V0,
}

impl fmt::Display for MessageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::V0 => f.write_str("0"),
        }
    }
}

/// Either a legacy message or a v0 message.
///
/// # Serialization
///
/// If the first bit is set, the remaining 7 bits will be used to determine
/// which message version is serialized starting from version `0`. If the first
/// is bit is not set, all bytes are used to encode the legacy `Message`
/// format.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum VersionedMessage {
    Legacy(legacy::Message),
    V0(v0::Message),
}

impl Default for VersionedMessage {
    fn default() -> Self {
        Self::Legacy(legacy::Message::default())
    }
}

impl From<legacy::Message> for VersionedMessage {
    fn from(message: legacy::Message) -> Self {
        Self::Legacy(message)
    }
}

impl From<v0::Message> for VersionedMessage {
    fn from(message: v0::Message) -> Self {
        Self::V0(message)
    }
}

impl VersionedMessage {
    pub fn version(&self) -> MessageVersion {
        match self {
            Self::Legacy(_) => MessageVersion::Legacy,
            Self::V0(_) => MessageVersion::V0,
        }
    }

    pub fn header(&self) -> &MessageHeader {
        match self {
            Self::Legacy(message) => &message.header,
            Self::V0(message) => &message.header,
        }
    }

    pub fn static_account_keys(&self) -> &[Address] {
        match self {
            Self::Legacy(message) => &message.account_keys,
            Self::V0(message) => &message.account_keys,
        }
    }

    pub fn recent_blockhash(&self) -> &Hash {
        match self {
            Self::Legacy(message) => &message.recent_blockhash,
            Self::V0(message) => &message.recent_blockhash,
        }
    }

    pub fn set_recent_blockhash(&mut self, recent_blockhash: Hash) {
        match self {
            Self::Legacy(message) => message.recent_blockhash = recent_blockhash,
            Self::V0(message) => message.recent_blockhash = recent_blockhash,
        }
    }

    /// Program instructions that will be executed in sequence and committed
    /// in one atomic transaction if all succeed.
    pub fn instructions(&self) -> &[CompiledInstruction] {
        match self {
            Self::Legacy(message) => &message.instructions,
            Self::V0(message) => &message.instructions,
        }
    }

    /// Lookups of a v0 message, `None` for legacy messages.
    pub fn address_table_lookups(&self) -> Option<&[v0::MessageAddressTableLookup]> {
        match self {
            Self::Legacy(_) => None,
            Self::V0(message) => Some(&message.address_table_lookups),
        }
    }

    pub fn fee_payer(&self) -> Option<&Address> {
        self.static_account_keys().first()
    }

    /// Keys whose signatures the transaction carries, in signature order.
    pub fn signer_keys(&self) -> &[Address] {
        match self {
            Self::Legacy(message) => message.signer_keys(),
            Self::V0(message) => message.signer_keys(),
        }
    }

    /// Full account list. Fails for a v0 message whose lookups are not
    /// resolved yet.
    pub fn account_keys(&self) -> Result<AccountKeys<'_>, MessageError> {
        match self {
            Self::Legacy(message) => Ok(message.account_keys()),
            Self::V0(message) => message.account_keys(),
        }
    }

    pub fn is_signer(&self, index: usize) -> Result<bool, MessageError> {
        match self {
            Self::Legacy(message) => Ok(message.is_signer(index)),
            Self::V0(message) => message.is_signer(index),
        }
    }

    pub fn is_writable(&self, index: usize) -> Result<bool, MessageError> {
        match self {
            Self::Legacy(message) => Ok(message.is_writable(index)),
            Self::V0(message) => message.is_writable(index),
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        match self {
            Self::Legacy(message) => message.serialize(),
            Self::V0(message) => message.serialize(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Legacy(message) => message.size(),
            Self::V0(message) => message.size(),
        }
    }

    /// Decode a message of either format that spans all of `data`.
    pub fn deserialize(data: &[u8]) -> Result<Self, MessageError> {
        let (message, consumed) = Self::deserialize_partial(data)?;
        match data.len().saturating_sub(consumed) {
            0 => Ok(message),
            trailing => Err(MessageError::TrailingData(trailing)),
        }
    }

    /// Decode a message of either format from the front of `data`.
    ///
    /// A first byte with the high bit set is a version prefix whose low
    /// seven bits carry the version; only version 0 is known. Any other
    /// first byte is the signer count of a legacy message.
    pub fn deserialize_partial(data: &[u8]) -> Result<(Self, usize), MessageError> {
        let first = *data
            .first()
            .ok_or(MessageError::MalformedMessage(MessageSection::Header))?;
        if first & MESSAGE_VERSION_PREFIX == 0 {
            trace!("decoding legacy message");
            return legacy::Message::deserialize_partial(data)
                .map(|(message, consumed)| (Self::Legacy(message), consumed));
        }

        match first & !MESSAGE_VERSION_PREFIX {
            0 => {
                trace!("decoding v0 message");
                v0::Message::deserialize_partial(data)
                    .map(|(message, consumed)| (Self::V0(message), consumed))
            }
            version => Err(MessageError::InvalidVersion(version)),
        }
    }

    pub fn sanitize(&self) -> Result<(), MessageError> {
        match self {
            Self::Legacy(message) => message.sanitize(),
            Self::V0(message) => message.sanitize(),
        }
    }

    pub fn decompile_instructions(&self) -> Result<Vec<Instruction>, MessageError> {
        match self {
            Self::Legacy(message) => message.decompile_instructions(),
            Self::V0(message) => message.decompile_instructions(),
        }
    }

    /// Decode every instruction with the caller's decoder table. Instructions
    /// of programs missing from the table decode to `None`.
    pub fn decode_instructions<T>(
        &self,
        decoders: &DecoderTable<T>,
    ) -> Result<Vec<Option<T>>, MessageError> {
        self.decompile_instructions()?
            .iter()
            .map(|instruction| decoders.decode(instruction).map_err(MessageError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::AddressLookupTableAccount,
        ledger_instruction::{AccountMeta, DecodeInstructionError},
        proptest::prelude::*,
    };

    fn transfer_message() -> legacy::Message {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        legacy::Message::try_compile(
            &payer,
            &[Instruction::new_with_bytes(
                program_id,
                &[2, 0, 0, 0, 64, 0, 0, 0, 0, 0, 0, 0],
                vec![
                    AccountMeta::new(payer, true),
                    AccountMeta::new(Address::new_unique(), false),
                ],
            )],
            Hash::new_unique(),
        )
        .unwrap()
    }

    #[test]
    fn test_dispatch_legacy() {
        let message = VersionedMessage::from(transfer_message());
        let bytes = message.serialize().unwrap();
        assert!(bytes[0] < MESSAGE_VERSION_PREFIX);

        let decoded = VersionedMessage::deserialize(&bytes).unwrap();
        assert_eq!(decoded.version(), MessageVersion::Legacy);
        assert_eq!(decoded.address_table_lookups(), None);
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_dispatch_v0() {
        let legacy = transfer_message();
        let message = VersionedMessage::V0(v0::Message::new(
            legacy.header,
            legacy.account_keys.clone(),
            legacy.recent_blockhash,
            legacy.instructions.clone(),
            vec![],
        ));
        let bytes = message.serialize().unwrap();
        assert_eq!(bytes[0], MESSAGE_VERSION_PREFIX);
        // prefix and empty lookup list
        assert_eq!(bytes.len(), legacy.size() + 2);

        let decoded = VersionedMessage::deserialize(&bytes).unwrap();
        assert_eq!(decoded.version(), MessageVersion::V0);
        assert_eq!(decoded.address_table_lookups(), Some(&[][..]));
        assert_eq!(decoded, message);
        assert_eq!(decoded.static_account_keys(), &legacy.account_keys[..]);
        assert_eq!(decoded.header(), &legacy.header);
        assert_eq!(decoded.recent_blockhash(), &legacy.recent_blockhash);
        assert_eq!(decoded.instructions(), &legacy.instructions[..]);
        assert_eq!(decoded.fee_payer(), legacy.account_keys.first());
    }

    #[test]
    fn test_version_byte_boundary() {
        let mut bytes = VersionedMessage::from(transfer_message())
            .serialize()
            .unwrap();

        // 127 signers is still a legacy header byte
        bytes[0] = 127;
        let decoded = VersionedMessage::deserialize(&bytes).unwrap();
        assert_eq!(decoded.version(), MessageVersion::Legacy);
        assert_eq!(decoded.header().num_required_signatures, 127);

        for first in 129..=u8::MAX {
            bytes[0] = first;
            assert_eq!(
                VersionedMessage::deserialize(&bytes),
                Err(MessageError::InvalidVersion(first - 128)),
            );
        }

        // the rest of a legacy body is not a valid v0 body
        let mut v0_bytes = vec![MESSAGE_VERSION_PREFIX];
        v0_bytes.extend_from_slice(&bytes[..]);
        v0_bytes[1] = 1;
        assert_eq!(
            VersionedMessage::deserialize(&v0_bytes),
            Err(MessageError::MalformedMessage(
                MessageSection::AddressTableLookupsLen
            ))
        );
    }

    #[test]
    fn test_deserialize_empty() {
        assert_eq!(
            VersionedMessage::deserialize(&[]),
            Err(MessageError::MalformedMessage(MessageSection::Header))
        );
    }

    #[test]
    fn test_queries_on_unresolved_v0() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let looked_up = Address::new_unique();
        let table = AddressLookupTableAccount {
            key: Address::new_unique(),
            addresses: vec![looked_up],
        };
        let message = v0::Message::try_compile(
            &payer,
            &[Instruction::new_with_bytes(
                program_id,
                &[],
                vec![AccountMeta::new_readonly(looked_up, false)],
            )],
            std::slice::from_ref(&table),
            Hash::default(),
        )
        .unwrap();
        let mut versioned = VersionedMessage::V0(message);

        assert_eq!(versioned.is_signer(0), Err(MessageError::UnresolvedLookup));
        assert_eq!(versioned.is_writable(0), Err(MessageError::UnresolvedLookup));
        assert!(versioned.account_keys().is_err());

        if let VersionedMessage::V0(message) = &mut versioned {
            message.resolve(&[table]).unwrap();
        }
        assert_eq!(versioned.is_signer(0), Ok(true));
        assert_eq!(versioned.is_writable(2), Ok(false));
        assert_eq!(versioned.account_keys().unwrap().get(2), Some(&looked_up));
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Decoded {
        Transfer { lamports: u64 },
    }

    #[test]
    fn test_decode_instructions() {
        let legacy = transfer_message();
        let transfer_program = legacy.account_keys[2];
        let message = VersionedMessage::from(legacy);

        let decoders = DecoderTable::new().with(transfer_program, |ix: &Instruction| {
            let amount = ix
                .data
                .get(4..12)
                .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
                .ok_or_else(|| DecodeInstructionError::InvalidData {
                    program_id: ix.program_id,
                    reason: "short transfer data".to_string(),
                })?;
            Ok(Decoded::Transfer {
                lamports: u64::from_le_bytes(amount),
            })
        });
        assert_eq!(
            message.decode_instructions(&decoders),
            Ok(vec![Some(Decoded::Transfer { lamports: 64 })])
        );

        let empty: DecoderTable<Decoded> = DecoderTable::new();
        assert_eq!(message.decode_instructions(&empty), Ok(vec![None]));
    }

    proptest! {
        #[test]
        fn test_deserialize_arbitrary_bytes_never_panics(
            bytes in prop::collection::vec(any::<u8>(), 0..512)
        ) {
            if let Ok(message) = VersionedMessage::deserialize(&bytes) {
                prop_assert_eq!(message.serialize().unwrap(), bytes);
            }
        }
    }
}
