//! Fixed-width bus values exchanged between pipeline modules.
//!
//! Each value type carries the width of the bus it travels on:
//! 1. **Data** values are 8 bits wide.
//! 2. **Instruction words** are 16 bits wide and stored little-endian.
//! 3. **Data and instruction addresses** are 12 bits wide.
//!
//! Arithmetic on these types wraps at the bus width. Checked constructors
//! reject quantities that do not fit.

use core::fmt;

use thiserror::Error;

/// Data bus width in bits.
pub const DATA_WIDTH: u32 = 8;
/// Instruction word width in bits.
pub const INSTRUCTION_WIDTH: u32 = 16;
/// An address value wider than its bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("address {value:#06X} does not fit a {width}-bit bus")]
pub struct AddressOutOfRange {
    /// Rejected raw value.
    pub value: u16,
    /// Width of the target address bus.
    pub width: u32,
}

/// Number of bytes occupied by one instruction word.
pub const INSTRUCTION_BYTES: usize = 2;
/// Data address bus width in bits.
pub const DATA_ADDRESS_WIDTH: u32 = 12;
/// Instruction address bus width in bits.
pub const INSTRUCTION_ADDRESS_WIDTH: u32 = 12;

/// One 8-bit value on the data bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DataValue(u8);

impl DataValue {
    /// The all-zero data value.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw unsigned byte.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Reinterprets a signed byte as a data value (two's complement).
    #[must_use]
    pub const fn from_signed(value: i8) -> Self {
        Self(value.to_ne_bytes()[0])
    }

    /// Unsigned interpretation.
    #[must_use]
    pub const fn unsigned(self) -> u8 {
        self.0
    }

    /// Two's-complement signed interpretation.
    #[must_use]
    pub const fn signed(self) -> i8 {
        i8::from_ne_bytes([self.0])
    }

    /// Returns true when the sign bit is set.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 & 0x80 != 0
    }

    /// Returns true when every bit is clear.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for DataValue {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<DataValue> for u16 {
    fn from(value: DataValue) -> Self {
        Self::from(value.0)
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// One 16-bit instruction word as fetched from instruction memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionWord(u16);

impl InstructionWord {
    /// Wraps a raw 16-bit word.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Builds a word from its little-endian memory image.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; INSTRUCTION_BYTES]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    /// Returns the little-endian memory image of this word.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; INSTRUCTION_BYTES] {
        self.0.to_le_bytes()
    }

    /// Raw 16-bit value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl From<InstructionWord> for u16 {
    fn from(word: InstructionWord) -> Self {
        word.0
    }
}

impl fmt::Display for InstructionWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident, $width:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "u16", into = "u16"))]
        pub struct $name(u16);

        impl $name {
            /// Mask covering every valid address bit.
            pub const MASK: u16 = (1 << $width) - 1;
            /// Address zero.
            pub const ZERO: Self = Self(0);

            /// Checked constructor; `None` when `value` is wider than the bus.
            #[must_use]
            pub const fn new(value: u16) -> Option<Self> {
                if value & !Self::MASK == 0 {
                    Some(Self(value))
                } else {
                    None
                }
            }

            /// Truncating constructor that keeps only the low address bits.
            #[must_use]
            pub const fn wrapping(value: u16) -> Self {
                Self(value & Self::MASK)
            }

            /// Raw address value.
            #[must_use]
            pub const fn value(self) -> u16 {
                self.0
            }

            /// Adds two addresses modulo the bus width.
            #[must_use]
            pub const fn wrapping_add(self, other: Self) -> Self {
                Self::wrapping(self.0.wrapping_add(other.0))
            }

            /// Address as a table index.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<$name> for u16 {
            fn from(address: $name) -> Self {
                address.0
            }
        }

        impl TryFrom<u16> for $name {
            type Error = AddressOutOfRange;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(AddressOutOfRange {
                    value,
                    width: $width,
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:03X}", self.0)
            }
        }
    };
}

address_type!(
    /// A 12-bit byte address into instruction memory.
    InstructionAddress,
    INSTRUCTION_ADDRESS_WIDTH
);

address_type!(
    /// A 12-bit address into data memory.
    DataAddress,
    DATA_ADDRESS_WIDTH
);

/// Number of byte addresses in instruction memory.
pub const INSTRUCTION_ADDRESS_SPACE: usize = 1 << INSTRUCTION_ADDRESS_WIDTH;
/// Number of cells in data memory.
pub const DATA_ADDRESS_SPACE: usize = 1 << DATA_ADDRESS_WIDTH;
