//! Output formats for assembled programs.
//!
//! Text formats print one instruction per line as two bytes in memory
//! order, optionally annotated with the source that produced them:
//!
//! ```text
//! // Assembled from: add.asm
//! 01000100 00000101  // SET 5
//! 00001000 00000000  // HALT
//! ```

use std::fmt;
use std::path::Path;

use clap::ValueEnum;

use crate::assembler::ListingEntry;
use crate::parser::strip_comment;

const BINARY_COLUMN_WIDTH: usize = 18;
const HEX_COLUMN_WIDTH: usize = 6;

/// File format of an assembled program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw little-endian bytes.
    #[default]
    Bin,
    /// `01000100 00000101` per instruction.
    #[value(name = "binstr")]
    BinaryString,
    /// `44 05` per instruction.
    #[value(name = "hexstr")]
    HexString,
}

impl OutputFormat {
    /// Conventional file extension, without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::BinaryString => "binstr.txt",
            Self::HexString => "hexstr.txt",
        }
    }
}

/// How much source text annotates a text format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CommentLevel {
    /// Bytes only, no header.
    None,
    /// Header plus each instruction's source with its comment removed.
    #[default]
    Stripped,
    /// Header plus every source line, including blanks and comments.
    Full,
}

/// Requested output length is shorter than the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLengthError {
    /// Requested total length in bytes.
    pub requested: usize,
    /// Assembled program length in bytes.
    pub actual: usize,
}

impl fmt::Display for OutputLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "output length {} is less than the assembled binary length {}",
            self.requested, self.actual
        )
    }
}

impl std::error::Error for OutputLengthError {}

/// Zero-pads `binary` to `length` bytes.
///
/// # Errors
///
/// Returns [`OutputLengthError`] when the program is already longer.
pub fn pad_to_length(binary: &mut Vec<u8>, length: usize) -> Result<(), OutputLengthError> {
    if binary.len() > length {
        return Err(OutputLengthError {
            requested: length,
            actual: binary.len(),
        });
    }
    binary.resize(length, 0);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Radix {
    Binary,
    Hex,
}

impl Radix {
    fn pair(self, bytes: &[u8]) -> String {
        let low = bytes.first().copied().unwrap_or(0);
        let high = bytes.get(1).copied().unwrap_or(0);
        match self {
            Self::Binary => format!("{low:08b} {high:08b}"),
            Self::Hex => format!("{low:02x} {high:02x}"),
        }
    }

    const fn column(self) -> usize {
        match self {
            Self::Binary => BINARY_COLUMN_WIDTH,
            Self::Hex => HEX_COLUMN_WIDTH,
        }
    }
}

/// Renders `binary` in `format`.
///
/// `listing` and `source` supply the annotations for text formats; `input`
/// names the source file in the header. Bytes past the listed instructions
/// (output-length padding) are printed without annotation.
#[must_use]
pub fn render(
    format: OutputFormat,
    binary: &[u8],
    listing: &[ListingEntry],
    source: &str,
    input: &Path,
    comments: CommentLevel,
) -> Vec<u8> {
    let radix = match format {
        OutputFormat::Bin => return binary.to_vec(),
        OutputFormat::BinaryString => Radix::Binary,
        OutputFormat::HexString => Radix::Hex,
    };
    format_text(radix, binary, listing, source, input, comments).into_bytes()
}

/// Renders `binary` as a binary string.
#[must_use]
pub fn format_binary_string(
    binary: &[u8],
    listing: &[ListingEntry],
    source: &str,
    input: &Path,
    comments: CommentLevel,
) -> String {
    format_text(Radix::Binary, binary, listing, source, input, comments)
}

/// Renders `binary` as a hex string.
#[must_use]
pub fn format_hex_string(
    binary: &[u8],
    listing: &[ListingEntry],
    source: &str,
    input: &Path,
    comments: CommentLevel,
) -> String {
    format_text(Radix::Hex, binary, listing, source, input, comments)
}

fn format_text(
    radix: Radix,
    binary: &[u8],
    listing: &[ListingEntry],
    source: &str,
    input: &Path,
    comments: CommentLevel,
) -> String {
    let pairs: Vec<String> = binary.chunks(2).map(|bytes| radix.pair(bytes)).collect();
    let width = radix.column();
    let mut out = String::new();

    let annotated = match comments {
        CommentLevel::None => 0,
        CommentLevel::Stripped => {
            out.push_str(&header(input));
            for (entry, pair) in listing.iter().zip(&pairs) {
                let text = strip_comment(&entry.source).trim();
                out.push_str(&format!("{pair:<width$} // {text}\n"));
            }
            listing.len().min(pairs.len())
        }
        CommentLevel::Full => {
            out.push_str(&header(input));
            let mut entries = listing.iter().zip(&pairs).peekable();
            let mut annotated = 0;
            for (index, text) in source.lines().enumerate() {
                match entries.next_if(|(entry, _)| entry.line == index + 1) {
                    Some((_, pair)) => {
                        out.push_str(&format!("{pair:<width$} // {text}\n"));
                        annotated += 1;
                    }
                    None => out.push_str(&format!("{:width$} // {text}\n", "")),
                }
            }
            annotated
        }
    };

    for pair in &pairs[annotated..] {
        out.push_str(pair);
        out.push('\n');
    }
    out
}

fn header(input: &Path) -> String {
    let name = input
        .file_name()
        .map_or_else(|| input.display().to_string(), |name| name.to_string_lossy().into_owned());
    format!("// Assembled from: {name}\n")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{
        format_binary_string, format_hex_string, pad_to_length, render, CommentLevel,
        OutputFormat, OutputLengthError,
    };
    use crate::assembler::assemble;

    const SOURCE: &str = "; adds\nSET 5 ; five\n\nHALT\n";

    fn text(format: OutputFormat, comments: CommentLevel, length: Option<usize>) -> String {
        let result = assemble(SOURCE).expect("valid program");
        let mut binary = result.binary.clone();
        if let Some(length) = length {
            pad_to_length(&mut binary, length).expect("fits");
        }
        let bytes = render(
            format,
            &binary,
            &result.listing,
            SOURCE,
            Path::new("programs/add.asm"),
            comments,
        );
        String::from_utf8(bytes).expect("text output")
    }

    #[test]
    fn binary_strings_without_comments() {
        assert_eq!(
            text(OutputFormat::BinaryString, CommentLevel::None, None),
            "01000100 00000101\n00001000 00000000\n"
        );
    }

    #[test]
    fn binary_strings_with_stripped_comments() {
        assert_eq!(
            text(OutputFormat::BinaryString, CommentLevel::Stripped, None),
            "// Assembled from: add.asm\n\
             01000100 00000101  // SET 5\n\
             00001000 00000000  // HALT\n"
        );
    }

    #[test]
    fn binary_strings_with_full_source() {
        let blank = " ".repeat(18);
        let expected = format!(
            "// Assembled from: add.asm\n\
             {blank} // ; adds\n\
             01000100 00000101  // SET 5 ; five\n\
             {blank} // \n\
             00001000 00000000  // HALT\n"
        );
        assert_eq!(
            text(OutputFormat::BinaryString, CommentLevel::Full, None),
            expected
        );
    }

    #[test]
    fn hex_strings_pad_to_six_columns() {
        assert_eq!(
            text(OutputFormat::HexString, CommentLevel::Stripped, None),
            "// Assembled from: add.asm\n44 05  // SET 5\n08 00  // HALT\n"
        );
    }

    #[test]
    fn padding_is_printed_without_annotation() {
        assert_eq!(
            text(OutputFormat::HexString, CommentLevel::Stripped, Some(6)),
            "// Assembled from: add.asm\n44 05  // SET 5\n08 00  // HALT\n00 00\n"
        );
    }

    #[test]
    fn raw_binary_is_passed_through() {
        let bytes = render(
            OutputFormat::Bin,
            &[0x44, 0x05],
            &[],
            "",
            Path::new("x.asm"),
            CommentLevel::Full,
        );
        assert_eq!(bytes, vec![0x44, 0x05]);
    }

    #[test]
    fn output_length_pads_or_rejects() {
        let mut binary = vec![1, 2];
        pad_to_length(&mut binary, 4).expect("fits");
        assert_eq!(binary, vec![1, 2, 0, 0]);
        assert_eq!(
            pad_to_length(&mut binary, 2),
            Err(OutputLengthError {
                requested: 2,
                actual: 4,
            })
        );
    }

    #[test]
    fn named_formatters_match_render() {
        let result = assemble(SOURCE).expect("valid program");
        let path = Path::new("add.asm");
        assert_eq!(
            format_binary_string(&result.binary, &result.listing, SOURCE, path, CommentLevel::None),
            "01000100 00000101\n00001000 00000000\n"
        );
        assert_eq!(
            format_hex_string(&result.binary, &result.listing, SOURCE, path, CommentLevel::None),
            "44 05\n08 00\n"
        );
    }

    #[test]
    fn extensions() {
        assert_eq!(OutputFormat::Bin.extension(), "bin");
        assert_eq!(OutputFormat::BinaryString.extension(), "binstr.txt");
        assert_eq!(OutputFormat::HexString.extension(), "hexstr.txt");
    }
}
