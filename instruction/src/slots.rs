//! Positional accumulator for instruction account lists.
//!
//! Program interfaces fix the position of every account an instruction
//! takes. Builders record `(slot, meta)` pairs in any order and
//! [`AccountMetaSlots::finish`] produces the ordered list, refusing gaps and
//! double assignments.

use {crate::AccountMeta, thiserror::Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("account slot {0} assigned twice")]
    Duplicate(usize),
    #[error("account slot {0} never assigned")]
    Unset(usize),
    #[error("account slot {slot} is outside the {len} slots of this instruction")]
    OutOfRange { slot: usize, len: usize },
}

#[derive(Debug, Clone, Default)]
pub struct AccountMetaSlots {
    len: usize,
    assigned: Vec<(usize, AccountMeta)>,
}

impl AccountMetaSlots {
    /// An accumulator expecting exactly `len` accounts.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            assigned: Vec::with_capacity(len),
        }
    }

    /// Record `meta` for position `slot`.
    pub fn set(&mut self, slot: usize, meta: AccountMeta) -> &mut Self {
        self.assigned.push((slot, meta));
        self
    }

    #[must_use]
    pub fn with(mut self, slot: usize, meta: AccountMeta) -> Self {
        self.set(slot, meta);
        self
    }

    /// Produce the ordered account list.
    pub fn finish(self) -> Result<Vec<AccountMeta>, SlotError> {
        let mut slots: Vec<Option<AccountMeta>> = vec![None; self.len];
        for (slot, meta) in self.assigned {
            let entry = slots.get_mut(slot).ok_or(SlotError::OutOfRange {
                slot,
                len: self.len,
            })?;
            if entry.replace(meta).is_some() {
                return Err(SlotError::Duplicate(slot));
            }
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(slot, meta)| meta.ok_or(SlotError::Unset(slot)))
            .collect()
    }
}
