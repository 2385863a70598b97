#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    super::MessageAddressTableLookup,
    crate::{AddressLookupTableAccount, MessageError},
    ledger_address::Address,
    std::collections::HashMap,
};

/// Collection of addresses loaded from on-chain lookup tables, split by
/// read-only and writable.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct LoadedAddresses {
    /// List of addresses for writable loaded accounts
    pub writable: Vec<Address>,
    /// List of addresses for read-only loaded accounts
    pub readonly: Vec<Address>,
}

impl FromIterator<LoadedAddresses> for LoadedAddresses {
    fn from_iter<T: IntoIterator<Item = LoadedAddresses>>(iter: T) -> Self {
        let (writable, readonly): (Vec<Vec<Address>>, Vec<Vec<Address>>) = iter
            .into_iter()
            .map(|addresses| (addresses.writable, addresses.readonly))
            .unzip();
        LoadedAddresses {
            writable: writable.into_iter().flatten().collect(),
            readonly: readonly.into_iter().flatten().collect(),
        }
    }
}

impl LoadedAddresses {
    /// Checks if there are no writable or readonly addresses
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combined length of loaded writable and readonly addresses
    pub fn len(&self) -> usize {
        self.writable.len().saturating_add(self.readonly.len())
    }
}

/// Source of lookup table contents.
///
/// Callers fetch tables through their own transport; the resolver only needs
/// to read the stored addresses of a table by its key.
pub trait AddressLoader {
    /// Addresses stored in the table at `table_key`, or `None` if the table
    /// is unknown to this loader.
    fn load_table(&self, table_key: &Address) -> Option<&[Address]>;
}

impl AddressLoader for [AddressLookupTableAccount] {
    fn load_table(&self, table_key: &Address) -> Option<&[Address]> {
        self.iter()
            .find(|table| table.key == *table_key)
            .map(|table| table.addresses.as_slice())
    }
}

impl AddressLoader for Vec<AddressLookupTableAccount> {
    fn load_table(&self, table_key: &Address) -> Option<&[Address]> {
        self.as_slice().load_table(table_key)
    }
}

impl AddressLoader for HashMap<Address, Vec<Address>> {
    fn load_table(&self, table_key: &Address) -> Option<&[Address]> {
        self.get(table_key).map(Vec::as_slice)
    }
}

impl<L: AddressLoader + ?Sized> AddressLoader for &L {
    fn load_table(&self, table_key: &Address) -> Option<&[Address]> {
        (**self).load_table(table_key)
    }
}

/// Expand every lookup into addresses: all writable entries across lookups
/// in order, then all readonly entries across lookups in order.
pub(crate) fn load_addresses<L: AddressLoader + ?Sized>(
    loader: &L,
    address_table_lookups: &[MessageAddressTableLookup],
) -> Result<LoadedAddresses, MessageError> {
    address_table_lookups
        .iter()
        .enumerate()
        .map(|(lookup, table_lookup)| -> Result<LoadedAddresses, MessageError> {
            let table = loader
                .load_table(&table_lookup.account_key)
                .ok_or(MessageError::LookupTableNotFound(table_lookup.account_key))?;
            let select = |indexes: &[u8]| {
                indexes
                    .iter()
                    .map(|&index| {
                        table.get(usize::from(index)).copied().ok_or(
                            MessageError::LookupIndexOutOfRange {
                                lookup,
                                index,
                                table_len: table.len(),
                            },
                        )
                    })
                    .collect::<Result<Vec<_>, MessageError>>()
            };
            Ok(LoadedAddresses {
                writable: select(&table_lookup.writable_indexes)?,
                readonly: select(&table_lookup.readonly_indexes)?,
            })
        })
        .collect()
}
