//! UTF-16 string decoding with garbage detection.
//!
//! Text scraped out of emulator memory is often half overwritten. Undecodable
//! units become [`MARKER`], three markers in a row end the string, and a
//! string where markers make up more than 30% of the units is flagged as
//! degraded so callers can drop it.

use encoding_rs::{UTF_16BE, UTF_16LE};

use super::port::ByteOrder;

/// Substitute for an undecodable code unit
pub const MARKER: char = '\u{FFFD}';

const MAX_MARKER_RUN: usize = 3;
const DEGRADED_RATIO: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedString {
    pub text: String,
    /// Markers seen, including a truncating run
    pub markers: usize,
    /// Code units consumed
    pub units: usize,
    pub degraded: bool,
}

fn is_undecodable(ch: char) -> bool {
    ch == MARKER || (ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
}

/// Decode `bytes` up to the first terminator unit.
pub fn decode_wide(bytes: &[u8], order: ByteOrder) -> DecodedString {
    let end = bytes
        .chunks_exact(2)
        .position(|unit| unit == [0, 0])
        .map(|index| index * 2)
        .unwrap_or(bytes.len() & !1);

    let encoding = match order {
        ByteOrder::Big => UTF_16BE,
        ByteOrder::Little => UTF_16LE,
    };
    let (raw, _) = encoding.decode_without_bom_handling(&bytes[..end]);

    let mut text = String::with_capacity(raw.len());
    let mut markers = 0usize;
    let mut run = 0usize;
    let mut units = 0usize;

    for ch in raw.chars() {
        let ch = if is_undecodable(ch) { MARKER } else { ch };
        units += ch.len_utf16();

        if ch == MARKER {
            markers += 1;
            run += 1;
            if run >= MAX_MARKER_RUN {
                // Drop the run itself, keep what came before it
                for _ in 1..run {
                    text.pop();
                }
                break;
            }
        } else {
            run = 0;
        }
        text.push(ch);
    }

    let degraded = units > 0 && markers as f64 > DEGRADED_RATIO * units as f64;

    DecodedString {
        text,
        markers,
        units,
        degraded,
    }
}

/// Encode `text` as UTF-16, optionally followed by a terminator unit.
pub fn encode_wide(text: &str, order: ByteOrder, terminate: bool) -> Vec<u8> {
    let mut bytes: Vec<u8> = text
        .encode_utf16()
        .flat_map(|unit| order.u16_bytes(unit))
        .collect();
    if terminate {
        bytes.extend_from_slice(&[0, 0]);
    }
    bytes
}
