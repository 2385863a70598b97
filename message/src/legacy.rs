//! The original message format, with a flat account table.
//!
//! A legacy message carries every account it references in
//! `account_keys`. It has no version prefix: its first byte is the
//! header's signer count, which stays below [`MESSAGE_VERSION_PREFIX`].
//!
//! [`MESSAGE_VERSION_PREFIX`]: crate::MESSAGE_VERSION_PREFIX

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    crate::{
        compiled_keys::CompiledKeys,
        serialization::{body_size, read_body, write_body, MessageBody},
        AccountKeys, CompiledInstruction, MessageError, MessageHeader, MAX_ACCOUNT_KEYS,
        MESSAGE_VERSION_PREFIX,
    },
    ledger_address::Address,
    ledger_hash::Hash,
    ledger_instruction::{Instruction, InstructionLike},
    log::debug,
    std::collections::HashSet,
};

/// A transaction message in the legacy format.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Message {
    /// The message header, identifying signed and read-only `account_keys`.
    pub header: MessageHeader,

    /// All the account keys used by this transaction.
    pub account_keys: Vec<Address>,

    /// The id of a recent ledger entry.
    pub recent_blockhash: Hash,

    /// Programs that will be executed in sequence and committed in one atomic
    /// transaction if all succeed.
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Create a signable transaction message from a `payer` public key,
    /// `recent_blockhash` and a list of instructions.
    ///
    /// The payer is always the first account key, a writable signer. The
    /// remaining keys are ordered writable signers, readonly signers,
    /// writable non-signers, then readonly non-signers, each group in order
    /// of first appearance. Instruction programs are readonly non-signers
    /// unless an instruction also lists them with stronger flags.
    ///
    /// # Errors
    ///
    /// `MissingPayer` without a payer, `TooManyAccounts` when more than
    /// 255 distinct accounts are referenced, and `TooManySigners` when 128 or
    /// more accounts must sign.
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_address::Address;
    /// use ledger_hash::Hash;
    /// use ledger_instruction::{AccountMeta, Instruction};
    /// use ledger_message::legacy::Message;
    ///
    /// let payer = Address::new_unique();
    /// let recipient = Address::new_unique();
    /// let program_id = Address::new_unique();
    /// let instruction = Instruction::new_with_bytes(
    ///     program_id,
    ///     &[2, 0, 0, 0, 100, 0, 0, 0, 0, 0, 0, 0],
    ///     vec![AccountMeta::new(payer, true), AccountMeta::new(recipient, false)],
    /// );
    ///
    /// let message = Message::try_compile(&payer, &[instruction], Hash::new_unique()).unwrap();
    /// assert_eq!(message.account_keys, vec![payer, recipient, program_id]);
    /// assert_eq!(message.instructions[0].accounts, vec![0, 1]);
    /// ```
    pub fn try_compile<I: InstructionLike>(
        payer: &Address,
        instructions: &[I],
        recent_blockhash: Hash,
    ) -> Result<Self, MessageError> {
        Self::try_compile_with_payer(Some(payer), instructions, recent_blockhash)
    }

    /// Like [`Message::try_compile`] with an optional payer, for callers that
    /// carry the payer as an option and want `MissingPayer` reported.
    pub fn try_compile_with_payer<I: InstructionLike>(
        payer: Option<&Address>,
        instructions: &[I],
        recent_blockhash: Hash,
    ) -> Result<Self, MessageError> {
        let compiled_keys = CompiledKeys::compile(payer, instructions)?;
        let (header, account_keys) = compiled_keys.try_into_message_components()?;
        check_signer_count(&header)?;
        let instructions =
            AccountKeys::new(&account_keys, None).try_compile_instructions(instructions)?;

        debug!(
            "compiled legacy message: {} accounts, {} instructions",
            account_keys.len(),
            instructions.len()
        );
        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// Serialize the message into its wire bytes.
    ///
    /// # Errors
    ///
    /// `TooLong` if a section is longer than a compact-u16 can express.
    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::with_capacity(self.size());
        write_body(
            &mut bytes,
            &self.header,
            &self.account_keys,
            &self.recent_blockhash,
            &self.instructions,
        )?;
        Ok(bytes)
    }

    /// Decode a message that spans all of `data`.
    ///
    /// # Errors
    ///
    /// `MalformedMessage` naming the section that could not be read, and
    /// `TrailingData` if bytes remain after the message.
    pub fn deserialize(data: &[u8]) -> Result<Self, MessageError> {
        let (message, consumed) = Self::deserialize_partial(data)?;
        match data.len().saturating_sub(consumed) {
            0 => Ok(message),
            trailing => Err(MessageError::TrailingData(trailing)),
        }
    }

    /// Decode a message from the front of `data`, returning it with the
    /// number of bytes it occupied.
    pub fn deserialize_partial(data: &[u8]) -> Result<(Self, usize), MessageError> {
        let mut offset = 0;
        let MessageBody {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        } = read_body(&mut offset, data)?;
        Ok((
            Self {
                header,
                account_keys,
                recent_blockhash,
                instructions,
            },
            offset,
        ))
    }

    /// Serialized length in bytes, computed without serializing.
    pub fn size(&self) -> usize {
        body_size(&self.account_keys, &self.instructions)
    }

    /// The fee payer, if the message has any account.
    pub fn fee_payer(&self) -> Option<&Address> {
        self.account_keys.first()
    }

    pub fn is_signer(&self, i: usize) -> bool {
        i < self.account_keys.len() && self.header.is_signer(i)
    }

    /// Returns true if the account at the specified index was requested to be
    /// writable.
    pub fn is_writable(&self, i: usize) -> bool {
        self.header.is_writable_index(i, self.account_keys.len())
    }

    /// Signer keys in signature order.
    pub fn signer_keys(&self) -> &[Address] {
        let num_signers = usize::from(self.header.num_required_signatures);
        &self.account_keys[..num_signers.min(self.account_keys.len())]
    }

    pub fn account_keys(&self) -> AccountKeys<'_> {
        AccountKeys::new(&self.account_keys, None)
    }

    /// Check that the message is internally consistent: header counts fit,
    /// keys are unique, and every instruction index points into the table.
    pub fn sanitize(&self) -> Result<(), MessageError> {
        check_signer_count(&self.header)?;
        sanitize_static(&self.header, &self.account_keys, &self.instructions, 0)
    }

    /// Rebuild full instructions from the compiled ones.
    pub fn decompile_instructions(&self) -> Result<Vec<Instruction>, MessageError> {
        self.account_keys().decompile_instructions(
            &self.instructions,
            |i| self.is_signer(i),
            |i| self.is_writable(i),
        )
    }
}

/// The signer count is the first byte of a legacy message and must not carry
/// the version prefix bit.
fn check_signer_count(header: &MessageHeader) -> Result<(), MessageError> {
    if header.num_required_signatures >= MESSAGE_VERSION_PREFIX {
        return Err(MessageError::TooManySigners(usize::from(
            header.num_required_signatures,
        )));
    }
    Ok(())
}

/// Checks shared by both formats. `num_loaded` counts accounts supplied by
/// lookups, which instruction indexes may also reach.
pub(crate) fn sanitize_static(
    header: &MessageHeader,
    account_keys: &[Address],
    instructions: &[CompiledInstruction],
    num_loaded: usize,
) -> Result<(), MessageError> {
    header.sanitize(account_keys.len())?;

    let num_keys = account_keys.len().saturating_add(num_loaded);
    if num_keys > MAX_ACCOUNT_KEYS {
        return Err(MessageError::TooManyAccounts(num_keys));
    }

    let mut seen = HashSet::with_capacity(account_keys.len());
    for key in account_keys {
        if !seen.insert(key) {
            return Err(MessageError::DuplicateAccountKey(*key));
        }
    }

    for (instruction, ix) in instructions.iter().enumerate() {
        // the fee payer cannot be invoked, and programs are never loaded
        let program_id_index = usize::from(ix.program_id_index);
        if program_id_index == 0 || program_id_index >= account_keys.len() {
            return Err(MessageError::InvalidProgramIdIndex {
                instruction,
                index: ix.program_id_index,
            });
        }
        if let Some(&index) = ix
            .accounts
            .iter()
            .find(|&&index| usize::from(index) >= num_keys)
        {
            return Err(MessageError::InvalidAccountIndex { instruction, index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::MessageSection,
        ledger_instruction::AccountMeta,
        proptest::prelude::*,
    };

    fn transfer(payer: Address, recipient: Address, program_id: Address) -> Instruction {
        // tag (u32 LE) followed by the lamport amount (u64 LE)
        let mut data = 2u32.to_le_bytes().to_vec();
        data.extend_from_slice(&1_000u64.to_le_bytes());
        Instruction::new_with_bytes(
            program_id,
            &data,
            vec![AccountMeta::new(payer, true), AccountMeta::new(recipient, false)],
        )
    }

    #[test]
    fn test_transfer_compiles() {
        let payer = Address::new_unique();
        let recipient = Address::new_unique();
        let program_id = Address::new_unique();
        let blockhash = Hash::new_unique();

        let message =
            Message::try_compile(&payer, &[transfer(payer, recipient, program_id)], blockhash)
                .unwrap();

        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            }
        );
        assert_eq!(message.account_keys, vec![payer, recipient, program_id]);
        assert_eq!(message.recent_blockhash, blockhash);
        assert_eq!(message.instructions.len(), 1);
        assert_eq!(message.instructions[0].program_id_index, 2);
        assert_eq!(message.instructions[0].accounts, vec![0, 1]);
        assert_eq!(message.instructions[0].data.len(), 12);

        let bytes = message.serialize().unwrap();
        assert_eq!(bytes.len(), 3 + 1 + 96 + 32 + 1 + (1 + 1 + 2 + 1 + 12));
        assert_eq!(bytes.len(), 150);
        assert_eq!(message.size(), bytes.len());
        assert_eq!(message.sanitize(), Ok(()));
    }

    #[test]
    fn test_ordering_puts_payer_first() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let a = Address::new_unique();
        let b = Address::new_unique();
        let c = Address::new_unique();

        let message = Message::try_compile(
            &payer,
            &[
                Instruction::new_with_bytes(program_id, &[], vec![AccountMeta::new(c, false)]),
                Instruction::new_with_bytes(
                    program_id,
                    &[],
                    vec![AccountMeta::new_readonly(b, true), AccountMeta::new(a, true)],
                ),
            ],
            Hash::default(),
        )
        .unwrap();

        assert_eq!(message.account_keys, vec![payer, a, b, c, program_id]);
        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 3,
                num_readonly_signed_accounts: 1,
                num_readonly_unsigned_accounts: 1,
            }
        );
        assert!(message.is_signer(0) && message.is_writable(0));
        assert!(message.is_signer(1) && message.is_writable(1));
        assert!(message.is_signer(2) && !message.is_writable(2));
        assert!(!message.is_signer(3) && message.is_writable(3));
        assert!(!message.is_signer(4) && !message.is_writable(4));
        assert!(!message.is_signer(5) && !message.is_writable(5));
        assert_eq!(message.signer_keys(), &[payer, a, b]);
    }

    #[test]
    fn test_dedup_keeps_most_permissive_and_one_index() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let shared = Address::new_unique();

        let message = Message::try_compile(
            &payer,
            &[
                Instruction::new_with_bytes(
                    program_id,
                    &[],
                    vec![AccountMeta::new(shared, false)],
                ),
                Instruction::new_with_bytes(
                    program_id,
                    &[],
                    vec![AccountMeta::new_readonly(shared, false)],
                ),
            ],
            Hash::default(),
        )
        .unwrap();

        let occurrences = message
            .account_keys
            .iter()
            .filter(|key| **key == shared)
            .count();
        assert_eq!(occurrences, 1);
        let index = message.account_keys().search(&shared).unwrap();
        assert!(message.is_writable(index));
        assert_eq!(message.instructions[0].accounts, vec![index as u8]);
        assert_eq!(message.instructions[1].accounts, vec![index as u8]);
    }

    #[test]
    fn test_program_listed_as_account_keeps_stronger_flags() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();

        let message = Message::try_compile(
            &payer,
            &[Instruction::new_with_bytes(
                program_id,
                &[],
                vec![AccountMeta::new(program_id, false)],
            )],
            Hash::default(),
        )
        .unwrap();

        assert_eq!(message.account_keys, vec![payer, program_id]);
        assert!(message.is_writable(1));
        assert_eq!(message.header.num_readonly_unsigned_accounts, 0);
    }

    #[test]
    fn test_compile_without_payer() {
        assert_eq!(
            Message::try_compile_with_payer::<Instruction>(None, &[], Hash::default()),
            Err(MessageError::MissingPayer)
        );
    }

    #[test]
    fn test_compile_without_instructions() {
        let payer = Address::new_unique();
        let message = Message::try_compile::<Instruction>(&payer, &[], Hash::default()).unwrap();
        assert_eq!(message.account_keys, vec![payer]);
        assert_eq!(message.header.num_required_signatures, 1);
        assert!(message.instructions.is_empty());
        assert_eq!(message.fee_payer(), Some(&payer));
    }

    #[test]
    fn test_compile_too_many_accounts() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let accounts = (0..MAX_ACCOUNT_KEYS)
            .map(|_| AccountMeta::new_readonly(Address::new_unique(), false))
            .collect();
        assert_eq!(
            Message::try_compile(
                &payer,
                &[Instruction::new_with_bytes(program_id, &[], accounts)],
                Hash::default(),
            ),
            Err(MessageError::TooManyAccounts(MAX_ACCOUNT_KEYS + 2))
        );
    }

    fn signers_instruction(num_signers: usize) -> Instruction {
        let accounts = (0..num_signers)
            .map(|_| AccountMeta::new_readonly(Address::new_unique(), true))
            .collect();
        Instruction::new_with_bytes(Address::new_unique(), &[], accounts)
    }

    #[test]
    fn test_compile_signer_count_stays_below_version_prefix() {
        let payer = Address::new_unique();

        // payer plus 126 signers fills the last legacy signer count
        let message =
            Message::try_compile(&payer, &[signers_instruction(126)], Hash::new_unique()).unwrap();
        assert_eq!(message.header.num_required_signatures, 127);
        assert_eq!(message.sanitize(), Ok(()));
        let bytes = message.serialize().unwrap();
        assert_eq!(bytes[0], 127);
        assert_eq!(
            crate::VersionedMessage::deserialize(&bytes),
            Ok(crate::VersionedMessage::Legacy(message))
        );

        assert_eq!(
            Message::try_compile(&payer, &[signers_instruction(127)], Hash::new_unique()),
            Err(MessageError::TooManySigners(128))
        );
    }

    #[test]
    fn test_sanitize_rejects_prefixed_signer_count() {
        let payer = Address::new_unique();
        let mut message =
            Message::try_compile(&payer, &[signers_instruction(126)], Hash::default()).unwrap();
        message.header.num_required_signatures = MESSAGE_VERSION_PREFIX;
        assert_eq!(message.sanitize(), Err(MessageError::TooManySigners(128)));
    }

    #[test]
    fn test_deserialize_rejects_trailing_bytes() {
        let payer = Address::new_unique();
        let message = Message::try_compile(
            &payer,
            &[transfer(payer, Address::new_unique(), Address::new_unique())],
            Hash::new_unique(),
        )
        .unwrap();
        let mut bytes = message.serialize().unwrap();
        bytes.extend_from_slice(&[0, 0]);

        assert_eq!(
            Message::deserialize(&bytes),
            Err(MessageError::TrailingData(2))
        );
        assert_eq!(
            Message::deserialize_partial(&bytes),
            Ok((message, bytes.len() - 2))
        );
    }

    #[test]
    fn test_deserialize_truncated() {
        assert_eq!(
            Message::deserialize(&[]),
            Err(MessageError::MalformedMessage(MessageSection::Header))
        );
        assert_eq!(
            Message::deserialize(&[1, 0, 0, 1]),
            Err(MessageError::MalformedMessage(MessageSection::AccountKey(0)))
        );
    }

    #[test]
    fn test_decompile_instructions() {
        let payer = Address::new_unique();
        let recipient = Address::new_unique();
        let program_id = Address::new_unique();
        let instruction = transfer(payer, recipient, program_id);

        let message =
            Message::try_compile(&payer, &[instruction.clone()], Hash::default()).unwrap();
        assert_eq!(message.decompile_instructions(), Ok(vec![instruction]));
    }

    #[test]
    fn test_sanitize() {
        let payer = Address::new_unique();
        let recipient = Address::new_unique();
        let program_id = Address::new_unique();
        let message = Message::try_compile(
            &payer,
            &[transfer(payer, recipient, program_id)],
            Hash::default(),
        )
        .unwrap();

        let mut duplicate = message.clone();
        duplicate.account_keys[1] = payer;
        assert_eq!(
            duplicate.sanitize(),
            Err(MessageError::DuplicateAccountKey(payer))
        );

        let mut payer_invoked = message.clone();
        payer_invoked.instructions[0].program_id_index = 0;
        assert_eq!(
            payer_invoked.sanitize(),
            Err(MessageError::InvalidProgramIdIndex {
                instruction: 0,
                index: 0
            })
        );

        let mut bad_account = message.clone();
        bad_account.instructions[0].accounts[1] = 3;
        assert_eq!(
            bad_account.sanitize(),
            Err(MessageError::InvalidAccountIndex {
                instruction: 0,
                index: 3
            })
        );

        let mut bad_header = message;
        bad_header.header.num_required_signatures = 0;
        assert_eq!(bad_header.sanitize(), Err(MessageError::InvalidHeader));
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        let arb_address = any::<[u8; 32]>().prop_map(Address::from);
        let arb_instruction = (
            any::<u8>(),
            prop::collection::vec(any::<u8>(), 0..8),
            prop::collection::vec(any::<u8>(), 0..300),
        )
            .prop_map(|(program_id_index, accounts, data)| CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        (
            0u8..128,
            any::<u8>(),
            any::<u8>(),
            prop::collection::vec(arb_address, 0..6),
            any::<[u8; 32]>(),
            prop::collection::vec(arb_instruction, 0..4),
        )
            .prop_map(
                |(
                    num_required_signatures,
                    num_readonly_signed_accounts,
                    num_readonly_unsigned_accounts,
                    account_keys,
                    blockhash,
                    instructions,
                )| Message {
                    header: MessageHeader {
                        num_required_signatures,
                        num_readonly_signed_accounts,
                        num_readonly_unsigned_accounts,
                    },
                    account_keys,
                    recent_blockhash: Hash::from(blockhash),
                    instructions,
                },
            )
    }

    proptest! {
        #[test]
        fn test_serialize_round_trip(message in arb_message()) {
            let bytes = message.serialize().unwrap();
            prop_assert_eq!(bytes.len(), message.size());
            prop_assert_eq!(Message::deserialize(&bytes), Ok(message));
        }

        #[test]
        fn test_deserialize_prefix_never_panics(
            message in arb_message(),
            cut in any::<prop::sample::Index>(),
        ) {
            let bytes = message.serialize().unwrap();
            let len = cut.index(bytes.len());
            prop_assert!(Message::deserialize(&bytes[..len]).is_err());
        }
    }
}
