//! Utilities for serializing and deserializing big integers inside `zkcred_crypto` types using
//! Serde.
//!
//! The public item in this module is [`SerializeInt`]. To Serde, it looks like a "module" which
//! can be used with the `#[serde(with = "SerializeInt")]` syntax on fields holding a [`BigInt`] or
//! a container of them. Human-readable formats get signed hexadecimal strings; binary formats get
//! the signed big-endian two's complement bytes.

use crate::common::*;
use num_traits::Num;
use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{collections::BTreeMap, fmt};

#[derive(Serialize)]
#[serde(transparent)]
struct SerWrapper<'a, T: SerializeInt>(
    #[serde(serialize_with = "<T as SerializeInt>::serialize")] &'a T,
);

#[derive(Deserialize)]
#[serde(transparent)]
struct DeWrapper<T: SerializeInt>(#[serde(with = "SerializeInt")] T);

/// Serialization/deserialization functionality for [`BigInt`] and containers of it.
pub trait SerializeInt: Sized {
    /// Proxy serialization function telling serde how to serialize the implementing type.
    fn serialize<S>(this: &Self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer;

    /// Proxy deserialization function telling serde how to deserialize the implementing type.
    fn deserialize<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>;
}

struct BytesVisitor;

impl<'de> Visitor<'de> for BytesVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "the two's complement bytes of an integer")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(v.to_vec())
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element()? {
            bytes.push(byte);
        }
        Ok(bytes)
    }
}

impl SerializeInt for BigInt {
    fn serialize<S>(this: &Self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&this.to_str_radix(16))
        } else {
            serializer.serialize_bytes(&this.to_signed_bytes_be())
        }
    }

    fn deserialize<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let encoded = String::deserialize(deserializer)?;
            BigInt::from_str_radix(&encoded, 16)
                .map_err(|_| de::Error::custom("invalid integer encoding"))
        } else {
            let bytes = deserializer.deserialize_bytes(BytesVisitor)?;
            Ok(BigInt::from_signed_bytes_be(&bytes))
        }
    }
}

impl<T: SerializeInt> SerializeInt for Vec<T> {
    fn serialize<S>(this: &Self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(this.iter().map(SerWrapper))
    }

    fn deserialize<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wrapped = Vec::<DeWrapper<T>>::deserialize(deserializer)?;
        Ok(wrapped.into_iter().map(|DeWrapper(t)| t).collect())
    }
}

impl<T: SerializeInt> SerializeInt for Option<T> {
    fn serialize<S>(this: &Self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        this.as_ref().map(SerWrapper).serialize(serializer)
    }

    fn deserialize<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wrapped = Option::<DeWrapper<T>>::deserialize(deserializer)?;
        Ok(wrapped.map(|DeWrapper(t)| t))
    }
}

impl<K, T> SerializeInt for BTreeMap<K, T>
where
    K: Serialize + for<'de> Deserialize<'de> + Ord,
    T: SerializeInt,
{
    fn serialize<S>(this: &Self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(this.iter().map(|(k, v)| (k, SerWrapper(v))))
    }

    fn deserialize<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wrapped = BTreeMap::<K, DeWrapper<T>>::deserialize(deserializer)?;
        Ok(wrapped.into_iter().map(|(k, DeWrapper(t))| (k, t)).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "SerializeInt")]
        single: BigInt,
        #[serde(with = "SerializeInt")]
        many: Vec<BigInt>,
        #[serde(with = "SerializeInt")]
        keyed: BTreeMap<String, BigInt>,
        #[serde(with = "SerializeInt")]
        maybe: Option<BigInt>,
    }

    fn holder() -> Holder {
        let mut keyed = BTreeMap::new();
        let _ = keyed.insert("neg".to_string(), BigInt::from(-129));
        Holder {
            single: BigInt::from(1) << 300usize,
            many: vec![BigInt::zero(), BigInt::from(-1), BigInt::from(255)],
            keyed,
            maybe: Some(BigInt::from(42)),
        }
    }

    #[test]
    fn integers_survive_binary_encoding() {
        let holder = holder();
        let bytes = bincode::serialize(&holder).unwrap();
        assert_eq!(holder, bincode::deserialize::<Holder>(&bytes).unwrap());
    }

    #[test]
    fn integers_are_hex_in_text_formats() {
        let holder = holder();
        let json = serde_json::to_string(&holder).unwrap();
        assert!(json.contains("\"-81\""));
        assert_eq!(holder, serde_json::from_str::<Holder>(&json).unwrap());
    }
}
