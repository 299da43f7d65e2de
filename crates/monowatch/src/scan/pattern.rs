use memchr::memmem;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::memory::{ByteOrder, encode_wide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Hex bytes with `??` wildcards
    Binary,
    /// Text, matched as UTF-16 at even addresses
    Text,
}

/// An encoded search pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    kind: PatternKind,
    bytes: Vec<Option<u8>>,
}

impl Pattern {
    pub fn binary(hex: &str) -> Result<Self> {
        Ok(Self {
            source: hex.to_string(),
            kind: PatternKind::Binary,
            bytes: parse_pattern(hex)?,
        })
    }

    pub fn text(text: &str, byte_order: ByteOrder) -> Result<Self> {
        if text.is_empty() {
            return Err(Error::InvalidPattern("text pattern is empty".to_string()));
        }
        Ok(Self {
            source: text.to_string(),
            kind: PatternKind::Text,
            bytes: encode_wide(text, byte_order, false)
                .into_iter()
                .map(Some)
                .collect(),
        })
    }

    pub fn parse(source: &str, kind: PatternKind, byte_order: ByteOrder) -> Result<Self> {
        match kind {
            PatternKind::Binary => Self::binary(source),
            PatternKind::Text => Self::text(source, byte_order),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn is_binary(&self) -> bool {
        self.kind == PatternKind::Binary
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn has_wildcards(&self) -> bool {
        self.bytes.iter().any(Option::is_none)
    }

    /// Offsets of every match inside `buffer`, which starts at address `base`.
    pub fn find_in(&self, buffer: &[u8], base: u64) -> Vec<usize> {
        if self.bytes.is_empty() || buffer.len() < self.bytes.len() {
            return Vec::new();
        }

        let offsets: Vec<usize> = if self.has_wildcards() {
            find_with_wildcards(buffer, &self.bytes)
        } else {
            let needle: Vec<u8> = self.bytes.iter().flatten().copied().collect();
            memmem::find_iter(buffer, &needle).collect()
        };

        match self.kind {
            PatternKind::Binary => offsets,
            PatternKind::Text => offsets
                .into_iter()
                .filter(|o| (base + *o as u64) % 2 == 0)
                .collect(),
        }
    }
}

fn find_with_wildcards(buffer: &[u8], pattern: &[Option<u8>]) -> Vec<usize> {
    let mut results = Vec::new();
    let last = buffer.len() - pattern.len();

    'outer: for i in 0..=last {
        for (j, byte) in pattern.iter().enumerate() {
            if let Some(value) = byte
                && buffer[i + j] != *value
            {
                continue 'outer;
            }
        }
        results.push(i);
    }

    results
}

pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidPattern(format!("invalid pattern token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidPattern("pattern is empty".to_string()));
    }
    if bytes.iter().all(Option::is_none) {
        return Err(Error::InvalidPattern(
            "pattern needs at least one concrete byte".to_string(),
        ));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern_with_wildcards() {
        let bytes = parse_pattern("00 44 ?? 6F").unwrap();
        assert_eq!(bytes, vec![Some(0x00), Some(0x44), None, Some(0x6F)]);
        assert_eq!(format_pattern(&bytes), "00 44 ?? 6F");
    }

    #[test]
    fn test_parse_pattern_rejects_bad_input() {
        assert!(parse_pattern("").is_err());
        assert!(parse_pattern("?? ??").is_err());
        assert!(parse_pattern("GG").is_err());
    }

    #[test]
    fn test_text_pattern_encoding() {
        let pattern = Pattern::text("buy", ByteOrder::Big).unwrap();
        assert_eq!(pattern.len(), 6);
        assert!(!pattern.is_binary());
        assert!(!pattern.has_wildcards());
    }

    #[test]
    fn test_text_match_requires_even_offset() {
        let pattern = Pattern::text("A", ByteOrder::Big).unwrap();
        // 00 41 at offset 1 is not a code unit boundary
        let buffer = [0x12, 0x00, 0x41, 0x00, 0x00, 0x41];
        assert_eq!(pattern.find_in(&buffer, 0), vec![4]);
        // Same bytes seen from an odd base address
        assert_eq!(pattern.find_in(&buffer, 1), vec![1]);
    }

    #[test]
    fn test_wildcard_search() {
        let pattern = Pattern::binary("AA ?? CC").unwrap();
        let buffer = [0x00, 0xAA, 0x01, 0xCC, 0xAA, 0xFF, 0xCC];
        assert_eq!(pattern.find_in(&buffer, 0), vec![1, 4]);
    }

    #[test]
    fn test_exact_binary_search() {
        let pattern = Pattern::binary("DE AD").unwrap();
        let buffer = [0xDE, 0xAD, 0x00, 0xDE, 0xAD];
        assert_eq!(pattern.find_in(&buffer, 0), vec![0, 3]);
    }

    #[test]
    fn test_buffer_shorter_than_pattern() {
        let pattern = Pattern::binary("01 02 03").unwrap();
        assert!(pattern.find_in(&[0x01, 0x02], 0).is_empty());
    }
}
