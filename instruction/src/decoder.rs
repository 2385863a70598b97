//! Caller-owned table of per-program instruction decoders.
//!
//! Decoders are registered explicitly on a [`DecoderTable`] value that the
//! caller builds and passes around; there is no process-wide registry.

use {
    crate::Instruction,
    ledger_address::Address,
    log::trace,
    std::{collections::HashMap, fmt},
    thiserror::Error,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeInstructionError {
    #[error("program {program_id} instruction expects {expected} accounts, got {actual}")]
    NotEnoughAccounts {
        program_id: Address,
        expected: usize,
        actual: usize,
    },
    #[error("program {program_id} instruction data is invalid: {reason}")]
    InvalidData {
        program_id: Address,
        reason: String,
    },
}

/// Turns a raw instruction of one program into a typed value.
pub type InstructionDecoder<T> =
    Box<dyn Fn(&Instruction) -> Result<T, DecodeInstructionError> + Send + Sync>;

pub struct DecoderTable<T> {
    decoders: HashMap<Address, InstructionDecoder<T>>,
}

impl<T> Default for DecoderTable<T> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for DecoderTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderTable")
            .field("programs", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> DecoderTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `decoder` for `program_id`, returning the decoder it replaces.
    pub fn register<F>(&mut self, program_id: Address, decoder: F) -> Option<InstructionDecoder<T>>
    where
        F: Fn(&Instruction) -> Result<T, DecodeInstructionError> + Send + Sync + 'static,
    {
        self.decoders.insert(program_id, Box::new(decoder))
    }

    #[must_use]
    pub fn with<F>(mut self, program_id: Address, decoder: F) -> Self
    where
        F: Fn(&Instruction) -> Result<T, DecodeInstructionError> + Send + Sync + 'static,
    {
        self.register(program_id, decoder);
        self
    }

    pub fn contains(&self, program_id: &Address) -> bool {
        self.decoders.contains_key(program_id)
    }

    /// Decode `instruction`; `Ok(None)` when its program has no decoder.
    pub fn decode(&self, instruction: &Instruction) -> Result<Option<T>, DecodeInstructionError> {
        match self.decoders.get(&instruction.program_id) {
            Some(decoder) => decoder(instruction).map(Some),
            None => {
                trace!("no decoder for program {}", instruction.program_id);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::AccountMeta};

    #[derive(Debug, PartialEq, Eq)]
    enum Decoded {
        Transfer { from: Address, to: Address, lamports: u64 },
    }

    const SYSTEM: Address = Address::new_from_array([0u8; 32]);

    fn decode_transfer(ix: &Instruction) -> Result<Decoded, DecodeInstructionError> {
        let [from, to] = ix.accounts.as_slice() else {
            return Err(DecodeInstructionError::NotEnoughAccounts {
                program_id: ix.program_id,
                expected: 2,
                actual: ix.accounts.len(),
            });
        };
        let amount: [u8; 8] = ix
            .data
            .get(4..12)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| DecodeInstructionError::InvalidData {
                program_id: ix.program_id,
                reason: "expected 12 bytes".to_string(),
            })?;
        Ok(Decoded::Transfer {
            from: from.pubkey,
            to: to.pubkey,
            lamports: u64::from_le_bytes(amount),
        })
    }

    fn transfer(from: Address, to: Address, lamports: u64) -> Instruction {
        let mut data = 2u32.to_le_bytes().to_vec();
        data.extend_from_slice(&lamports.to_le_bytes());
        Instruction {
            program_id: SYSTEM,
            accounts: vec![AccountMeta::new(from, true), AccountMeta::new(to, false)],
            data,
        }
    }

    #[test]
    fn decodes_registered_program() {
        let table = DecoderTable::new().with(SYSTEM, decode_transfer);
        let (from, to) = (Address::new_unique(), Address::new_unique());
        assert_eq!(
            table.decode(&transfer(from, to, 42)),
            Ok(Some(Decoded::Transfer {
                from,
                to,
                lamports: 42
            }))
        );
    }

    #[test]
    fn unregistered_program_is_not_an_error() {
        let table: DecoderTable<Decoded> = DecoderTable::new();
        let mut ix = transfer(Address::new_unique(), Address::new_unique(), 1);
        ix.program_id = Address::new_unique();
        assert!(!table.contains(&ix.program_id));
        assert_eq!(table.decode(&ix), Ok(None));
    }

    #[test]
    fn decoder_errors_propagate() {
        let table = DecoderTable::new().with(SYSTEM, decode_transfer);
        let mut ix = transfer(Address::new_unique(), Address::new_unique(), 1);
        ix.accounts.pop();
        assert_eq!(
            table.decode(&ix),
            Err(DecodeInstructionError::NotEnoughAccounts {
                program_id: SYSTEM,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn tables_are_independent() {
        let mut a = DecoderTable::new();
        assert!(a.register(SYSTEM, decode_transfer).is_none());
        assert!(a.register(SYSTEM, decode_transfer).is_some());
        let b: DecoderTable<Decoded> = DecoderTable::new();
        assert!(a.contains(&SYSTEM));
        assert!(!b.contains(&SYSTEM));
    }
}
