//! Canonical CBOR encoding for every record the ledger and journal persist.

use serde::{Serialize, de::DeserializeOwned};
use serde_cbor::value::Value as CborValue;

/// Serialize a value into deterministic CBOR bytes. Map keys are sorted by
/// round-tripping through `serde_cbor::Value`, so equal records always encode
/// to equal bytes.
pub fn to_canonical_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_cbor::Error> {
    let canonical: CborValue = serde_cbor::value::to_value(value)?;
    let mut buf = Vec::with_capacity(128);
    let mut serializer = serde_cbor::ser::Serializer::new(&mut buf);
    serializer.self_describe()?;
    canonical.serialize(&mut serializer)?;
    Ok(buf)
}

/// Encoding of the self-describe tag (55799) that prefixes canonical output.
const SELF_DESCRIBE_TAG: [u8; 3] = [0xd9, 0xd9, 0xf7];

/// Decode bytes written by `to_canonical_cbor`. The self-describe prefix is
/// skipped so externally tagged enums decode at the top level.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_cbor::Error> {
    let body = bytes.strip_prefix(&SELF_DESCRIBE_TAG).unwrap_or(bytes);
    serde_cbor::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inbox_types::{Address, CapabilityValue, Path, StaticType, Value};
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn map_order_does_not_change_encoding() {
        let mut a = HashMap::new();
        a.insert("b", 1);
        a.insert("a", 2);
        let b: BTreeMap<_, _> = a.clone().into_iter().collect();
        assert_eq!(to_canonical_cbor(&a).unwrap(), to_canonical_cbor(&b).unwrap());
    }

    #[test]
    fn decodes_nested_values() {
        let cap = CapabilityValue::new(
            Address::from_u64(1),
            Path::public("foo"),
            Some(StaticType::reference(StaticType::array(StaticType::Int))),
        );
        let value = Value::array(
            StaticType::untyped_capability(),
            vec![Value::Capability(cap), Value::Nil],
        );
        let bytes = to_canonical_cbor(&value).unwrap();
        let decoded: Value = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn top_level_enums_decode_despite_the_self_describe_tag() {
        let value = Value::int_array([3]);
        let bytes = to_canonical_cbor(&value).unwrap();
        assert!(bytes.starts_with(&SELF_DESCRIBE_TAG));
        assert_eq!(from_cbor::<Value>(&bytes).unwrap(), value);

        let untagged = serde_cbor::to_vec(&value).unwrap();
        assert_eq!(from_cbor::<Value>(&untagged).unwrap(), value);
    }
}
