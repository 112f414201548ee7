use std::str::FromStr;

use num_bigint::BigUint;
use serde::{self, Deserialize, Deserializer, Serializer};

fn serialize_biguint<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// The approvals API is inconsistent about amounts: ERC-1155 balances arrive as decimal strings,
/// ERC-721 ones as plain JSON numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

fn parse_biguint<E: serde::de::Error>(raw: StringOrNumber) -> Result<BigUint, E> {
    match raw {
        StringOrNumber::String(s) => BigUint::from_str(s.trim()).map_err(E::custom),
        StringOrNumber::Number(n) => Ok(BigUint::from(n)),
    }
}

pub mod biguint_string {
    use super::*;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_biguint(value, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_biguint(StringOrNumber::deserialize(deserializer)?)
    }
}

pub mod biguint_string_option {
    use super::*;

    pub fn serialize<S>(value: &Option<BigUint>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serialize_biguint(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<BigUint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<StringOrNumber>::deserialize(deserializer)?
            .map(parse_biguint)
            .transpose()
    }
}
