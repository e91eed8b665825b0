use std::{fmt, ops::Not, str::FromStr};

use serde::{Deserialize, Serialize};

/// Key bits in keygate insertion order.
///
/// Polarity convention: an XOR keygate is transparent when its key bit is 0,
/// an XNOR keygate when its key bit is 1. The recorded bit is always the
/// transparent one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Key(Vec<bool>);

impl Key {
    pub fn new(bits: Vec<bool>) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, bit: bool) {
        self.0.push(bit);
    }

    /// The key with bit `index` inverted.
    pub fn with_flipped(&self, index: usize) -> Self {
        let mut bits = self.0.clone();
        bits[index] = !bits[index];
        Self(bits)
    }
}

impl Not for &Key {
    type Output = Key;

    fn not(self) -> Key {
        Key(self.0.iter().map(|b| !b).collect())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.0 {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid key bit `{0}`")]
pub struct KeyParseError(char);

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(KeyParseError(other)),
            })
            .collect::<Result<_, _>>()
            .map(Key)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for Key {
    type Error = KeyParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let key: Key = "01101".parse().unwrap();
        assert_eq!(key.bits(), [false, true, true, false, true]);
        assert_eq!(key.to_string(), "01101");
        assert_eq!((!&key).to_string(), "10010");
        assert_eq!(key.with_flipped(0).to_string(), "11101");
        assert_eq!("01x".parse::<Key>(), Err(KeyParseError('x')));
    }

    #[test]
    fn serializes_as_bit_string() {
        let key: Key = "10".parse().unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), r#""10""#);
    }
}
