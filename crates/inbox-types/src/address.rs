use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Width of an account identifier in bytes.
pub const ADDRESS_LENGTH: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address '{value}': must start with '0x'")]
    MissingPrefix { value: String },
    #[error("invalid address '{value}': expected 1 to 16 hex digits")]
    InvalidLength { value: String },
    #[error("invalid address '{value}': {reason}")]
    InvalidHex { value: String, reason: String },
}

/// Fixed-width account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Address(bytes)
    }

    /// Builds an address from its big-endian integer form (`0x1` == `from_u64(1)`).
    pub const fn from_u64(value: u64) -> Self {
        Address(value.to_be_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lower-case hex without the `0x` prefix, always 16 digits.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressError::MissingPrefix {
                value: s.to_string(),
            })?;
        if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
            return Err(AddressError::InvalidLength {
                value: s.to_string(),
            });
        }
        let padded = format!("{digits:0>16}");
        let mut buf = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(&padded, &mut buf).map_err(|err| AddressError::InvalidHex {
            value: s.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Address(buf))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(value: [u8; ADDRESS_LENGTH]) -> Self {
        Address(value)
    }
}

impl FromStr for Address {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
