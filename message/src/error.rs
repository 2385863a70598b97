use {
    ledger_address::Address, ledger_instruction::DecodeInstructionError, std::fmt,
    thiserror::Error,
};

/// Broad class of a failure, used by callers to decide what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inputs can never produce a valid message; fix them and rebuild.
    Validation,
    /// Bytes do not follow the wire format; treat them as corrupt.
    Format,
    /// A one-shot or ordering contract was violated.
    State,
}

/// The part of the wire layout a codec error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSection {
    VersionPrefix,
    Header,
    AccountKeysLen,
    AccountKey(usize),
    RecentBlockhash,
    InstructionsLen,
    ProgramIdIndex { instruction: usize },
    InstructionAccounts { instruction: usize },
    InstructionData { instruction: usize },
    AddressTableLookupsLen,
    LookupTableKey { lookup: usize },
    WritableIndexes { lookup: usize },
    ReadonlyIndexes { lookup: usize },
}

impl fmt::Display for MessageSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionPrefix => write!(f, "version prefix"),
            Self::Header => write!(f, "header"),
            Self::AccountKeysLen => write!(f, "account key count"),
            Self::AccountKey(index) => write!(f, "account key {index}"),
            Self::RecentBlockhash => write!(f, "recent blockhash"),
            Self::InstructionsLen => write!(f, "instruction count"),
            Self::ProgramIdIndex { instruction } => {
                write!(f, "program id index of instruction {instruction}")
            }
            Self::InstructionAccounts { instruction } => {
                write!(f, "account indexes of instruction {instruction}")
            }
            Self::InstructionData { instruction } => write!(f, "data of instruction {instruction}"),
            Self::AddressTableLookupsLen => write!(f, "address table lookup count"),
            Self::LookupTableKey { lookup } => write!(f, "table address of lookup {lookup}"),
            Self::WritableIndexes { lookup } => write!(f, "writable indexes of lookup {lookup}"),
            Self::ReadonlyIndexes { lookup } => write!(f, "readonly indexes of lookup {lookup}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("no fee payer was supplied")]
    MissingPayer,

    #[error("message references {0} accounts, at most 255 are addressable")]
    TooManyAccounts(usize),

    #[error("legacy message needs {0} signatures, its signer count must stay below 128")]
    TooManySigners(usize),

    #[error("instruction references account {0} missing from the account table")]
    UnknownInstructionKey(Address),

    #[error("{section} is {len} entries long, compact-u16 lengths stop at 65535")]
    TooLong { section: MessageSection, len: usize },

    #[error("malformed message: {0} is truncated or not a valid encoding")]
    MalformedMessage(MessageSection),

    #[error("unsupported message version {0}")]
    InvalidVersion(u8),

    #[error("{0} unexpected bytes after the message")]
    TrailingData(usize),

    #[error("header counts do not fit the account table")]
    InvalidHeader,

    #[error("account {0} appears more than once in the account table")]
    DuplicateAccountKey(Address),

    #[error("instruction {instruction} calls program index {index} which is the fee payer or out of range")]
    InvalidProgramIdIndex { instruction: usize, index: u8 },

    #[error("instruction {instruction} references account index {index} which is out of range")]
    InvalidAccountIndex { instruction: usize, index: u8 },

    #[error("address table lookups have already been resolved")]
    AlreadyResolved,

    #[error("message carries address table lookups that have not been resolved")]
    UnresolvedLookup,

    #[error("lookup {lookup} reads index {index} of a table holding {table_len} addresses")]
    LookupIndexOutOfRange {
        lookup: usize,
        index: u8,
        table_len: usize,
    },

    #[error("no contents supplied for lookup table {0}")]
    LookupTableNotFound(Address),

    #[error(transparent)]
    DecodeInstruction(#[from] DecodeInstructionError),
}

impl MessageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPayer
            | Self::TooManyAccounts(_)
            | Self::TooManySigners(_)
            | Self::UnknownInstructionKey(_)
            | Self::TooLong { .. }
            | Self::InvalidHeader
            | Self::DuplicateAccountKey(_)
            | Self::InvalidProgramIdIndex { .. }
            | Self::InvalidAccountIndex { .. }
            | Self::UnresolvedLookup
            | Self::LookupIndexOutOfRange { .. }
            | Self::LookupTableNotFound(_)
            | Self::DecodeInstruction(_) => ErrorKind::Validation,
            Self::MalformedMessage(_) | Self::InvalidVersion(_) | Self::TrailingData(_) => {
                ErrorKind::Format
            }
            Self::AlreadyResolved => ErrorKind::State,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_name_the_section() {
        let err = MessageError::MalformedMessage(MessageSection::InstructionData { instruction: 3 });
        assert_eq!(
            err.to_string(),
            "malformed message: data of instruction 3 is truncated or not a valid encoding"
        );
        let err = MessageError::MalformedMessage(MessageSection::ReadonlyIndexes { lookup: 1 });
        assert_eq!(
            err.to_string(),
            "malformed message: readonly indexes of lookup 1 is truncated or not a valid encoding"
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(MessageError::MissingPayer.kind(), ErrorKind::Validation);
        assert_eq!(MessageError::TooManyAccounts(256).kind(), ErrorKind::Validation);
        assert_eq!(MessageError::TooManySigners(128).kind(), ErrorKind::Validation);
        assert_eq!(
            MessageError::MalformedMessage(MessageSection::Header).kind(),
            ErrorKind::Format
        );
        assert_eq!(MessageError::InvalidVersion(1).kind(), ErrorKind::Format);
        assert_eq!(MessageError::AlreadyResolved.kind(), ErrorKind::State);
    }
}
