//! Reading program images back from the text formats.
//!
//! `//` starts a comment and whitespace is ignored, so files written by
//! [`crate::formats`] load unchanged. Images are padded to whole
//! instructions with a warning.

use std::collections::BTreeSet;
use std::fmt;

use log::{info, warn};

use crate::formats::OutputFormat;

/// A text image that cannot be turned into bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Characters outside the format's digit set.
    InvalidCharacters {
        /// Offending characters, sorted and deduplicated.
        found: Vec<char>,
        /// Digits the format accepts.
        allowed: &'static str,
    },
    /// No digits at all.
    Empty,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCharacters { found, allowed } => {
                let found: String = found.iter().collect();
                write!(
                    f,
                    "invalid characters {found:?} in program image; only {allowed} are allowed"
                )
            }
            Self::Empty => f.write_str("no program data found"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Decodes a program image in `format`.
///
/// # Errors
///
/// Returns [`LoadError`] for text formats with stray characters or no
/// digits.
pub fn load_image(format: OutputFormat, contents: &[u8]) -> Result<Vec<u8>, LoadError> {
    match format {
        OutputFormat::Bin => Ok(contents.to_vec()),
        OutputFormat::BinaryString => parse_binary_string(&String::from_utf8_lossy(contents)),
        OutputFormat::HexString => parse_hex_string(&String::from_utf8_lossy(contents)),
    }
}

/// Parses a binary-string image such as `01000100 00000101`.
///
/// # Errors
///
/// See [`load_image`].
pub fn parse_binary_string(text: &str) -> Result<Vec<u8>, LoadError> {
    let mut digits = digits(text, 2, "'0' and '1'")?;
    let remainder = digits.len() % 8;
    if remainder != 0 {
        let padding = 8 - remainder;
        warn!(
            "binary string length ({}) is not a multiple of 8; adding {padding} zero bits",
            digits.len()
        );
        digits.resize(digits.len() + padding, 0);
    }
    let bytes = digits
        .chunks(8)
        .map(|bits| bits.iter().fold(0u8, |byte, &bit| (byte << 1) | bit))
        .collect();
    Ok(pad_to_instruction(bytes))
}

/// Parses a hex-string image such as `44 05`.
///
/// # Errors
///
/// See [`load_image`].
pub fn parse_hex_string(text: &str) -> Result<Vec<u8>, LoadError> {
    let mut digits = digits(text, 16, "hex digits")?;
    if digits.len() % 2 != 0 {
        warn!(
            "hex string length ({}) is odd; adding a zero nibble",
            digits.len()
        );
        digits.push(0);
    }
    let bytes = digits
        .chunks(2)
        .map(|nibbles| (nibbles[0] << 4) | nibbles[1])
        .collect();
    Ok(pad_to_instruction(bytes))
}

#[allow(clippy::cast_possible_truncation)]
fn digits(text: &str, radix: u32, allowed: &'static str) -> Result<Vec<u8>, LoadError> {
    let mut values = Vec::new();
    let mut invalid = BTreeSet::new();
    for line in text.lines() {
        let data = line.find("//").map_or(line, |pos| &line[..pos]);
        for c in data.chars().filter(|c| !c.is_whitespace()) {
            match c.to_digit(radix) {
                Some(value) => values.push(value as u8),
                None => {
                    invalid.insert(c);
                }
            }
        }
    }
    if !invalid.is_empty() {
        return Err(LoadError::InvalidCharacters {
            found: invalid.into_iter().collect(),
            allowed,
        });
    }
    if values.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(values)
}

fn pad_to_instruction(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.len() % 2 != 0 {
        warn!(
            "program length ({}) is odd; adding a padding byte",
            bytes.len()
        );
        bytes.push(0);
    }
    info!(
        "parsed {} bytes ({} instructions) from text image",
        bytes.len(),
        bytes.len() / 2
    );
    bytes
}
