//! Address representation for the ledger.
//!
//! An address is a sequence of 32 bytes, often shown as a base58 encoded string
//! (e.g. 14grJpemFaf88c8tiVb77W7TYg2W3ir6pfkKz3YjhhZ5).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    core::{
        fmt,
        str::{from_utf8, FromStr},
        sync::atomic::{AtomicU64, Ordering},
    },
    thiserror::Error,
};

/// Number of bytes in an address.
pub const ADDRESS_BYTES: usize = 32;
/// Maximum string length of a base58 encoded address.
const MAX_BASE58_LEN: usize = 44;

#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Address([u8; ADDRESS_BYTES]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAddressError {
    #[error("string decoded to wrong size for address")]
    WrongSize,
    #[error("failed to decode string to address")]
    Invalid,
}

impl Address {
    pub const fn new_from_array(address_array: [u8; ADDRESS_BYTES]) -> Self {
        Self(address_array)
    }

    /// Unique address for tests and benchmarks.
    ///
    /// Keys are derived from a process-wide counter, so they never repeat within
    /// one process but are not random.
    pub fn new_unique() -> Self {
        static I: AtomicU64 = AtomicU64::new(1);

        let mut b = [0u8; ADDRESS_BYTES];
        let i = I.fetch_add(1, Ordering::Relaxed);
        // use big endian representation to ensure that recent unique addresses
        // are always greater than less recent unique addresses
        b[0..8].copy_from_slice(&i.to_be_bytes());
        Self::from(b)
    }

    #[inline(always)]
    pub const fn to_bytes(self) -> [u8; ADDRESS_BYTES] {
        self.0
    }

    #[inline(always)]
    pub const fn as_array(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    #[inline]
    fn from(from: [u8; ADDRESS_BYTES]) -> Self {
        Self(from)
    }
}

impl From<Address> for [u8; ADDRESS_BYTES] {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = core::array::TryFromSliceError;

    #[inline]
    fn try_from(address: &[u8]) -> Result<Self, Self::Error> {
        <[u8; ADDRESS_BYTES]>::try_from(address).map(Self::from)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

fn write_as_base58(f: &mut fmt::Formatter, address: &Address) -> fmt::Result {
    let mut out = [0u8; MAX_BASE58_LEN];
    let len = five8::encode_32(&address.0, &mut out) as usize;
    // any sequence of base58 chars is valid utf8
    let as_str = from_utf8(&out[..len]).map_err(|_| fmt::Error)?;
    f.write_str(as_str)
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_as_base58(f, self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_as_base58(f, self)
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use five8::DecodeError;
        if s.len() > MAX_BASE58_LEN {
            return Err(ParseAddressError::WrongSize);
        }
        let mut bytes = [0; ADDRESS_BYTES];
        five8::decode_32(s, &mut bytes).map_err(|e| match e {
            DecodeError::InvalidChar(_) => ParseAddressError::Invalid,
            DecodeError::TooLong
            | DecodeError::TooShort
            | DecodeError::LargestTermTooHigh
            | DecodeError::OutputTooLong => ParseAddressError::WrongSize,
        })?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, proptest::prelude::*};

    #[test]
    fn display_matches_known_base58() {
        assert_eq!(
            Address::default().to_string(),
            "11111111111111111111111111111111"
        );
        let address = Address::from([255u8; ADDRESS_BYTES]);
        assert_eq!(
            address.to_string(),
            "JEKNVnkbo3jma5nREBBJCDoXFVeKkD56V3xKrvRmWxFG"
        );
    }

    #[test]
    fn from_str_rejects_bad_input() {
        let mut invalid = Address::from([255u8; ADDRESS_BYTES]).to_string();
        invalid.replace_range(0..1, "0");
        assert_eq!(invalid.parse::<Address>(), Err(ParseAddressError::Invalid));

        let too_long = "1".repeat(MAX_BASE58_LEN + 1);
        assert_eq!(
            too_long.parse::<Address>(),
            Err(ParseAddressError::WrongSize)
        );
    }

    #[test]
    fn new_unique_never_repeats() {
        let a = Address::new_unique();
        let b = Address::new_unique();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn try_from_slice_checks_length() {
        assert!(Address::try_from(&[7u8; 31][..]).is_err());
        assert_eq!(
            Address::try_from(&[7u8; 32][..]).unwrap(),
            Address::new_from_array([7u8; 32])
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_json_uses_byte_array() {
        let address = Address::new_from_array([3u8; 32]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
    }

    proptest! {
        #[test]
        fn base58_text_form_round_trips(bytes in proptest::array::uniform32(any::<u8>())) {
            let address = Address::from(bytes);
            prop_assert_eq!(address.to_string().parse::<Address>(), Ok(address));
        }
    }
}
