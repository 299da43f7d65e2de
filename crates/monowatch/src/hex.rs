//! Serde adapters for addresses written as `"0x9036_AC40"` style strings.
//!
//! Plain JSON numbers are accepted too, so hand-edited layouts can use either.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressInput {
    String(String),
    Number(u64),
}

pub fn parse_address(raw: &str) -> Result<u64, std::num::ParseIntError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    }
}

fn resolve<E: Error>(input: AddressInput) -> Result<u64, E> {
    match input {
        AddressInput::String(raw) => parse_address(&raw).map_err(E::custom),
        AddressInput::Number(value) => Ok(value),
    }
}

pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{:08X}", value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    resolve(AddressInput::deserialize(deserializer)?)
}

/// Same encoding for a list of mirror addresses.
pub mod list {
    use super::{AddressInput, resolve};
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(values: &[u64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&format!("0x{:08X}", value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<AddressInput>::deserialize(deserializer)?
            .into_iter()
            .map(resolve)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Wrapper {
        #[serde(with = "super")]
        base: u64,
        #[serde(with = "super::list")]
        mirrors: Vec<u64>,
    }

    #[test]
    fn test_deserialize_accepts_hex_and_numbers() {
        let parsed: Wrapper =
            serde_json::from_str(r#"{"base":"0x9036_AC40","mirrors":["0x10", 32]}"#).unwrap();
        assert_eq!(parsed.base, 0x9036_AC40);
        assert_eq!(parsed.mirrors, vec![0x10, 32]);
    }

    #[test]
    fn test_serialize_uses_hex() {
        let json = serde_json::to_string(&Wrapper {
            base: 0x8000_0000,
            mirrors: vec![0x1234],
        })
        .unwrap();
        assert_eq!(json, r#"{"base":"0x80000000","mirrors":["0x00001234"]}"#);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"base":"0xZZ","mirrors":[]}"#).is_err());
    }
}
