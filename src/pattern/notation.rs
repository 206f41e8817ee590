//! Hex pattern notation.
//!
//! The notation is the byte-sequence syntax used by DROID signature files,
//! restricted to what the engine can evaluate:
//!
//! | Token     | Meaning                          |
//! |-----------|----------------------------------|
//! | `4D5A`    | literal bytes, two hex digits each |
//! | `??`      | one byte of any value            |
//! | `{4}`     | gap of exactly four bytes        |
//! | `{0-16}`  | gap of zero to sixteen bytes     |
//! | `{2-*}`   | gap of at least two bytes        |
//! | `*`       | gap of any length                |
//!
//! Whitespace between tokens is ignored.

use super::Segment;
use crate::common::{Error, Result};

/// Parse notation into a segment list.
pub(super) fn parse_segments(notation: &str) -> Result<Vec<Segment>> {
    let bytes = notation.as_bytes();
    let mut segments = Vec::new();
    let mut literal = Vec::new();
    let mut pos = 0;

    let flush = |literal: &mut Vec<u8>, segments: &mut Vec<Segment>| {
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(literal)));
        }
    };

    while pos < bytes.len() {
        match bytes[pos] {
            b if b.is_ascii_whitespace() => pos += 1,
            b'?' => {
                if bytes.get(pos + 1) != Some(&b'?') {
                    return Err(Error::invalid_pattern(notation, format!("lone `?` at {pos}")));
                }
                flush(&mut literal, &mut segments);
                segments.push(Segment::Any);
                pos += 2;
            },
            b'*' => {
                flush(&mut literal, &mut segments);
                segments.push(Segment::unbounded_gap(0));
                pos += 1;
            },
            b'{' => {
                let close = notation[pos..]
                    .find('}')
                    .map(|i| pos + i)
                    .ok_or_else(|| Error::invalid_pattern(notation, format!("unclosed `{{` at {pos}")))?;
                flush(&mut literal, &mut segments);
                segments.push(parse_gap(notation, &notation[pos + 1..close])?);
                pos = close + 1;
            },
            _ => {
                let hi = bytes.get(pos).copied().and_then(hex_value);
                let lo = bytes.get(pos + 1).copied().and_then(hex_value);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => literal.push((hi << 4) | lo),
                    _ => {
                        return Err(Error::invalid_pattern(
                            notation,
                            format!("expected hex byte at {pos}"),
                        ));
                    },
                }
                pos += 2;
            },
        }
    }
    flush(&mut literal, &mut segments);
    Ok(segments)
}

fn parse_gap(notation: &str, body: &str) -> Result<Segment> {
    let number = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| Error::invalid_pattern(notation, format!("bad gap bound `{s}`")))
    };

    match body.split_once('-') {
        None => Ok(Segment::exact_gap(number(body)?)),
        Some((min, max)) if max.trim() == "*" => Ok(Segment::unbounded_gap(number(min)?)),
        Some((min, max)) => {
            let (min, max) = (number(min)?, number(max)?);
            if min > max {
                return Err(Error::invalid_pattern(
                    notation,
                    format!("gap minimum {min} exceeds maximum {max}"),
                ));
            }
            Ok(Segment::gap(min, max))
        },
    }
}

#[inline]
fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
