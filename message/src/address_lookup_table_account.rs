use ledger_address::Address;

/// The definition of an address lookup table account: its address and the
/// ordered addresses it stores, as fetched from the ledger by the caller.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AddressLookupTableAccount {
    pub key: Address,
    pub addresses: Vec<Address>,
}
