//! Identifier and barcode value types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CodecError;

/// Length of a legacy barcode: one category digit plus seven sequence digits.
pub const LEGACY_BARCODE_LENGTH: usize = 8;

/// Largest sequence representable in the legacy format.
pub const LEGACY_MAX_SEQUENCE: u32 = 9_999_999;

// ============================================================================
// Category
// ============================================================================

/// Ticket category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    A,
    B,
    C,
    D,
}

impl Category {
    /// All categories in declaration order.
    pub const ALL: [Category; 4] = [Category::A, Category::B, Category::C, Category::D];

    /// Category letter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::A => "A",
            Category::B => "B",
            Category::C => "C",
            Category::D => "D",
        }
    }

    /// Leading digit used by the legacy 8-digit format.
    pub fn legacy_digit(&self) -> u8 {
        match self {
            Category::A => 1,
            Category::B => 2,
            Category::C => 3,
            Category::D => 4,
        }
    }

    /// Inverse of [`Category::legacy_digit`].
    pub fn from_legacy_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(Category::A),
            2 => Some(Category::B),
            3 => Some(Category::C),
            4 => Some(Category::D),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Category::A),
            "B" => Ok(Category::B),
            "C" => Ok(Category::C),
            "D" => Ok(Category::D),
            _ => Err(CodecError::InvalidCategory(s.to_string())),
        }
    }
}

// ============================================================================
// Ticket identifier
// ============================================================================

/// Immutable identity of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketIdentifier {
    pub category: Category,
    pub sequence: u32,
}

impl TicketIdentifier {
    pub fn new(category: Category, sequence: u32) -> Self {
        Self { category, sequence }
    }

    /// Human-readable ticket number, e.g. `A000042`.
    pub fn ticket_number(&self) -> String {
        format!("{}{:06}", self.category, self.sequence)
    }
}

impl fmt::Display for TicketIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.category, self.sequence)
    }
}

// ============================================================================
// Barcodes
// ============================================================================

/// A validated 13-digit canonical barcode.
///
/// Only [`super::IdentifierCodec`] produces these from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalBarcode(String);

impl CanonicalBarcode {
    /// Wraps a string already known to be canonical (codec output or a
    /// persisted value).
    pub(crate) fn from_trusted(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalBarcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A barcode in the deprecated 8-digit format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyBarcode(String);

impl LegacyBarcode {
    /// Parses a legacy barcode. The format carries no checksum, so this only
    /// checks shape and the category digit.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != LEGACY_BARCODE_LENGTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let barcode = Self(s.to_string());
        let id = barcode.identifier()?;
        (id.sequence > 0).then_some(barcode)
    }

    /// Builds the legacy representation of an identifier.
    pub fn from_identifier(id: &TicketIdentifier) -> Option<Self> {
        if id.sequence == 0 || id.sequence > LEGACY_MAX_SEQUENCE {
            return None;
        }
        Some(Self(format!(
            "{}{:07}",
            id.category.legacy_digit(),
            id.sequence
        )))
    }

    /// Identifier encoded by this barcode.
    pub fn identifier(&self) -> Option<TicketIdentifier> {
        let bytes = self.0.as_bytes();
        let category = Category::from_legacy_digit(bytes.first()?.wrapping_sub(b'0'))?;
        let sequence = self.0.get(1..)?.parse::<u32>().ok()?;
        Some(TicketIdentifier::new(category, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LegacyBarcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scanned identifier string, tagged with the scheme it was encoded under.
///
/// Both variants coexist only while legacy tickets are being migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", content = "value", rename_all = "snake_case")]
pub enum IdentifierEncoding {
    Canonical(CanonicalBarcode),
    Legacy(LegacyBarcode),
}

impl IdentifierEncoding {
    pub fn as_str(&self) -> &str {
        match self {
            IdentifierEncoding::Canonical(b) => b.as_str(),
            IdentifierEncoding::Legacy(b) => b.as_str(),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, IdentifierEncoding::Legacy(_))
    }
}
