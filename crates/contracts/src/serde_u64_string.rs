//! Seed values serialize as decimal strings so 64-bit seeds survive JSON
//! consumers that clamp numbers to f64 precision. Deserialization accepts
//! either form.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(value)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Numeric(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text.parse::<u64>().map_err(D::Error::custom),
        Raw::Numeric(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Seeded {
        #[serde(with = "super")]
        seed: u64,
    }

    #[test]
    fn serializes_as_string() {
        let raw = serde_json::to_string(&Seeded { seed: u64::MAX }).expect("serialize");
        assert_eq!(raw, r#"{"seed":"18446744073709551615"}"#);
    }

    #[test]
    fn deserialize_accepts_string_or_number() {
        let from_string: Seeded = serde_json::from_str(r#"{"seed":"42"}"#).expect("string seed");
        let from_number: Seeded = serde_json::from_str(r#"{"seed":42}"#).expect("numeric seed");
        assert_eq!(from_string, from_number);
    }

    #[test]
    fn deserialize_rejects_garbage_string() {
        let parsed = serde_json::from_str::<Seeded>(r#"{"seed":"not-a-seed"}"#);
        assert!(parsed.is_err());
    }
}
