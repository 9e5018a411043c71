use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use base64::Engine;
use rand::Rng;

/// A 128 bit session id, stored as its 16 char url-safe base64 form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sid([u8; 16]);

impl Sid {
    /// Generate a new random session id.
    pub fn new() -> Self {
        let mut random = [0u8; 12]; // 12 bytes = 16 base64 chars
        let mut id = [0u8; 16];
        rand::thread_rng().fill(&mut random);

        base64::prelude::BASE64_URL_SAFE_NO_PAD
            .encode_slice(random, &mut id)
            .unwrap();

        Sid(id)
    }

    fn as_str(&self) -> &str {
        // SAFETY: always built from base64 chars
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }
}

/// Error raised when parsing a session id from a string.
#[derive(Debug, thiserror::Error)]
pub enum SidDecodeError {
    #[error("invalid url-safe base64 string")]
    InvalidBase64String,
    #[error("invalid sid length")]
    InvalidLength,
}

impl FromStr for Sid {
    type Err = SidDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(SidDecodeError::InvalidLength);
        }
        let mut id = [0u8; 16];
        for (i, byte) in s.as_bytes().iter().enumerate() {
            if byte.is_ascii_alphanumeric() || *byte == b'_' || *byte == b'-' {
                id[i] = *byte;
            } else {
                return Err(SidDecodeError::InvalidBase64String);
            }
        }
        Ok(Sid(id))
    }
}

impl Default for Sid {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Sid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Debug for Sid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Sid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Sid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SidVisitor;
        impl serde::de::Visitor<'_> for SidVisitor {
            type Value = Sid;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                formatter.write_str("a 16 char base64 session id")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Sid::from_str(v).map_err(serde::de::Error::custom)
            }
        }
        deserializer.deserialize_str(SidVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::Sid;
    use std::str::FromStr;

    #[test]
    fn round_trip() {
        let id = Sid::new();
        let id2 = Sid::from_str(&id.to_string()).unwrap();
        assert_eq!(id, id2);
    }

    #[test]
    fn rejects_invalid() {
        assert!(Sid::from_str("short").is_err());
        assert!(Sid::from_str("aoassaAZDoin#zd{").is_err());
    }
}
