use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// SHA-256 digest of a source unit's text. Pins every artifact (model,
/// counter map, dataset entry) to the exact bytes it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentHash(#[serde(serialize_with = "as_hex")] [u8; 32]);

fn as_hex<S>(digest: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&hex::encode(digest))
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_string = String::deserialize(deserializer)?;
        ContentHash::try_from(hex_string).map_err(serde::de::Error::custom)
    }
}

impl ContentHash {
    pub fn digest(input: &str) -> Self {
        ContentHash(Sha256::digest(input.as_bytes()).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self, HashError> {
        let bytes = hex::decode(&value).map_err(|_| HashError::InvalidHex(value))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashError::InvalidLength(bytes.len()))?;
        Ok(ContentHash(array))
    }
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("not a valid hexadecimal string: {0}")]
    InvalidHex(String),
    #[error("expected 32 digest bytes, got {0}")]
    InvalidLength(usize),
}
