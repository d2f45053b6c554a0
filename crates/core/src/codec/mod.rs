//! Ticket identifier codec.
//!
//! Maps a `(category, sequence)` pair to the canonical 13-digit barcode and back:
//!
//! ```text
//! 978 001 000042 7
//! │   │   │      └─ weighted mod-10 check digit
//! │   │   └──────── zero-padded sequence (6 digits)
//! │   └──────────── category code (3 digits)
//! └──────────────── deployment prefix (3 digits)
//! ```
//!
//! The legacy 8-digit format (category digit + 7-digit sequence, unchecked) is
//! understood only as a migration input.

mod checksum;
mod config;
mod error;
mod identifier;
mod types;

pub use checksum::{check_digit, check_digit_str};
pub use config::{CategoryConfig, CategoryTable, CodecConfig};
pub use error::CodecError;
pub use identifier::{
    IdentifierCodec, BARCODE_LENGTH, CATEGORY_CODE_LENGTH, MAX_SEQUENCE_CAPACITY, PREFIX_LENGTH,
    SEQUENCE_DIGITS,
};
pub use types::{
    CanonicalBarcode, Category, IdentifierEncoding, LegacyBarcode, TicketIdentifier,
    LEGACY_BARCODE_LENGTH, LEGACY_MAX_SEQUENCE,
};
