use {
    ledger_address::Address,
    ledger_message::{ErrorKind, MessageError},
    ledger_signer::SignerError,
    thiserror::Error,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("{0} is not one of the message's required signers")]
    UnknownSigner(Address),

    #[error("transaction is missing {missing} signatures")]
    NotFullySigned { missing: usize },

    #[error("signature count mismatch: expected {expected}, got {actual}")]
    SignatureCountMismatch { expected: usize, actual: usize },

    #[error("not enough bytes for signatures")]
    NotEnoughSignatureBytes,

    #[error("{0} unexpected bytes after the transaction")]
    TrailingData(usize),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl TransactionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownSigner(_) | Self::Signer(_) => ErrorKind::Validation,
            Self::SignatureCountMismatch { .. }
            | Self::NotEnoughSignatureBytes
            | Self::TrailingData(_) => ErrorKind::Format,
            Self::NotFullySigned { .. } => ErrorKind::State,
            Self::Message(err) => err.kind(),
        }
    }
}
