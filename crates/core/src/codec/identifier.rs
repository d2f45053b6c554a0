//! Canonical barcode encoding, validation and decoding.

use super::checksum::check_digit;
use super::{
    CanonicalBarcode, Category, CodecConfig, CodecError, IdentifierEncoding, LegacyBarcode,
    TicketIdentifier,
};

/// Total length of a canonical barcode.
pub const BARCODE_LENGTH: usize = 13;
/// Length of the deployment prefix.
pub const PREFIX_LENGTH: usize = 3;
/// Length of the category code.
pub const CATEGORY_CODE_LENGTH: usize = 3;
/// Digits reserved for the sequence.
pub const SEQUENCE_DIGITS: usize = 6;
/// Largest sequence the canonical layout can hold.
pub const MAX_SEQUENCE_CAPACITY: u32 = 999_999;

const CATEGORY_START: usize = PREFIX_LENGTH;
const SEQUENCE_START: usize = CATEGORY_START + CATEGORY_CODE_LENGTH;
const CHECK_POSITION: usize = SEQUENCE_START + SEQUENCE_DIGITS;

#[derive(Debug, Clone)]
struct CategoryEntry {
    category: Category,
    code: String,
    max_sequence: u32,
}

/// Deterministic, reversible mapping between ticket identifiers and
/// canonical barcodes.
#[derive(Debug, Clone)]
pub struct IdentifierCodec {
    prefix: String,
    verification_base_url: String,
    entries: Vec<CategoryEntry>,
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

impl IdentifierCodec {
    /// Builds a codec, rejecting configurations that could produce ambiguous
    /// or overflowing barcodes.
    pub fn new(config: &CodecConfig) -> Result<Self, CodecError> {
        if !is_digits(&config.prefix, PREFIX_LENGTH) {
            return Err(CodecError::InvalidConfig(format!(
                "prefix must be {} digits, got {:?}",
                PREFIX_LENGTH, config.prefix
            )));
        }

        let mut entries: Vec<CategoryEntry> = Vec::new();
        for (category, cfg) in config.categories.entries() {
            if !is_digits(&cfg.code, CATEGORY_CODE_LENGTH) {
                return Err(CodecError::InvalidConfig(format!(
                    "category {} code must be {} digits, got {:?}",
                    category, CATEGORY_CODE_LENGTH, cfg.code
                )));
            }
            if cfg.max_sequence == 0 || cfg.max_sequence > MAX_SEQUENCE_CAPACITY {
                return Err(CodecError::InvalidConfig(format!(
                    "category {} max_sequence must be within 1..={}",
                    category, MAX_SEQUENCE_CAPACITY
                )));
            }
            if let Some(other) = entries.iter().find(|e| e.code == cfg.code) {
                return Err(CodecError::InvalidConfig(format!(
                    "categories {} and {} share code {}",
                    other.category, category, cfg.code
                )));
            }
            entries.push(CategoryEntry {
                category,
                code: cfg.code.clone(),
                max_sequence: cfg.max_sequence,
            });
        }

        Ok(Self {
            prefix: config.prefix.clone(),
            verification_base_url: config.verification_base_url.clone(),
            entries,
        })
    }

    fn entry(&self, category: Category) -> Option<&CategoryEntry> {
        self.entries.iter().find(|e| e.category == category)
    }

    fn entry_by_code(&self, code: &str) -> Option<&CategoryEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    /// Deployment prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Capacity of `category`, or `None` when the category is unmapped.
    pub fn max_sequence(&self, category: Category) -> Option<u32> {
        self.entry(category).map(|e| e.max_sequence)
    }

    /// Encodes `(category, sequence)` as a canonical barcode.
    pub fn encode(
        &self,
        category: Category,
        sequence: u32,
    ) -> Result<CanonicalBarcode, CodecError> {
        let entry = self
            .entry(category)
            .ok_or_else(|| CodecError::InvalidCategory(category.to_string()))?;

        if sequence == 0 || sequence > entry.max_sequence {
            return Err(CodecError::SequenceOutOfRange {
                category,
                sequence,
                max: entry.max_sequence,
            });
        }

        let body = format!(
            "{}{}{:0width$}",
            self.prefix,
            entry.code,
            sequence,
            width = SEQUENCE_DIGITS
        );
        let digits: Vec<u8> = body.bytes().map(|b| b - b'0').collect();
        let check = check_digit(&digits);

        Ok(CanonicalBarcode::from_trusted(format!("{}{}", body, check)))
    }

    /// Encodes an identifier.
    pub fn encode_identifier(&self, id: &TicketIdentifier) -> Result<CanonicalBarcode, CodecError> {
        self.encode(id.category, id.sequence)
    }

    /// Encodes a category given by name, as received from callers.
    pub fn encode_named(
        &self,
        category: &str,
        sequence: u32,
    ) -> Result<CanonicalBarcode, CodecError> {
        self.encode(category.parse()?, sequence)
    }

    /// True iff `barcode` has the canonical length, is all digits, carries this
    /// deployment's prefix and a known category code, and its check digit
    /// matches.
    pub fn validate(&self, barcode: &str) -> bool {
        if !is_digits(barcode, BARCODE_LENGTH) {
            return false;
        }
        if &barcode[..PREFIX_LENGTH] != self.prefix {
            return false;
        }
        if self
            .entry_by_code(&barcode[CATEGORY_START..SEQUENCE_START])
            .is_none()
        {
            return false;
        }

        let digits: Vec<u8> = barcode.bytes().map(|b| b - b'0').collect();
        check_digit(&digits[..CHECK_POSITION]) == digits[CHECK_POSITION]
    }

    /// Decodes a canonical barcode.
    ///
    /// Returns `None` when validation fails or the sequence lies outside the
    /// category's range. Never decodes partially.
    pub fn decode(&self, barcode: &str) -> Option<TicketIdentifier> {
        if !self.validate(barcode) {
            return None;
        }
        let entry = self.entry_by_code(&barcode[CATEGORY_START..SEQUENCE_START])?;
        let sequence: u32 = barcode[SEQUENCE_START..CHECK_POSITION].parse().ok()?;
        if sequence == 0 || sequence > entry.max_sequence {
            return None;
        }
        Some(TicketIdentifier::new(entry.category, sequence))
    }

    /// Parses a string into a canonical barcode if it validates.
    pub fn parse(&self, barcode: &str) -> Option<CanonicalBarcode> {
        self.decode(barcode)
            .map(|_| CanonicalBarcode::from_trusted(barcode.to_string()))
    }

    /// Classifies a scanned string by encoding scheme.
    pub fn classify(&self, s: &str) -> Option<IdentifierEncoding> {
        if let Some(barcode) = self.parse(s) {
            return Some(IdentifierEncoding::Canonical(barcode));
        }
        LegacyBarcode::parse(s).map(IdentifierEncoding::Legacy)
    }

    /// Converts a legacy barcode to its canonical form.
    pub fn convert_legacy(&self, legacy: &LegacyBarcode) -> Result<CanonicalBarcode, CodecError> {
        let id = legacy
            .identifier()
            .ok_or_else(|| CodecError::InvalidCategory(legacy.to_string()))?;
        self.encode_identifier(&id)
    }

    /// Verification reference for an identifier: the configured base URL with
    /// the ticket number appended.
    pub fn verification_reference(&self, id: &TicketIdentifier) -> String {
        format!(
            "{}{}",
            self.verification_base_url,
            urlencoding::encode(&id.ticket_number())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CategoryConfig;
    use proptest::prelude::*;

    fn codec() -> IdentifierCodec {
        IdentifierCodec::new(&CodecConfig::default()).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let barcode = codec().encode(Category::A, 123_456).unwrap();
        assert_eq!(barcode.as_str(), "9780011234564");
        assert_eq!(barcode.as_str().len(), BARCODE_LENGTH);
    }

    #[test]
    fn test_scenario_barcode() {
        let codec = codec();
        // The weighted sum over 978001123456 is 86, so 7 is not the check digit.
        assert!(!codec.validate("9780011234567"));
        assert!(codec.validate("9780011234564"));

        // Corrupt the fifth digit.
        assert!(!codec.validate("9780111234564"));
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        let codec = codec();
        assert!(matches!(
            codec.encode(Category::B, 0),
            Err(CodecError::SequenceOutOfRange { sequence: 0, .. })
        ));
        assert!(matches!(
            codec.encode(Category::B, MAX_SEQUENCE_CAPACITY + 1),
            Err(CodecError::SequenceOutOfRange { .. })
        ));
        assert!(codec.encode(Category::B, MAX_SEQUENCE_CAPACITY).is_ok());
    }

    #[test]
    fn test_encode_respects_category_capacity() {
        let mut config = CodecConfig::default();
        config.categories.c = Some(CategoryConfig::new("003", 500));
        let codec = IdentifierCodec::new(&config).unwrap();

        assert!(codec.encode(Category::C, 500).is_ok());
        assert!(matches!(
            codec.encode(Category::C, 501),
            Err(CodecError::SequenceOutOfRange { max: 500, .. })
        ));
    }

    #[test]
    fn test_encode_unmapped_category() {
        let mut config = CodecConfig::default();
        config.categories.d = None;
        let codec = IdentifierCodec::new(&config).unwrap();

        assert_eq!(
            codec.encode(Category::D, 1),
            Err(CodecError::InvalidCategory("D".to_string()))
        );
        assert!(matches!(
            codec.encode_named("Z", 1),
            Err(CodecError::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_validate_rejects_shapes() {
        let codec = codec();
        assert!(!codec.validate(""));
        assert!(!codec.validate("978001123456"));
        assert!(!codec.validate("97800112345640"));
        assert!(!codec.validate("97800112345a4"));
        // Wrong prefix with a correct check digit for that prefix.
        let foreign = {
            let body = "979001123456";
            format!("{}{}", body, crate::codec::check_digit_str(body).unwrap())
        };
        assert!(!codec.validate(&foreign));
        // Unknown category code with a correct check digit.
        let unknown = {
            let body = "978999123456";
            format!("{}{}", body, crate::codec::check_digit_str(body).unwrap())
        };
        assert!(!codec.validate(&unknown));
    }

    #[test]
    fn test_decode_invalid_returns_none() {
        let codec = codec();
        assert_eq!(codec.decode("9780011234567"), None);
        assert_eq!(codec.decode("10000001"), None);
    }

    #[test]
    fn test_decode_zero_sequence_returns_none() {
        let codec = codec();
        let body = "978001000000";
        let barcode = format!("{}{}", body, crate::codec::check_digit_str(body).unwrap());
        assert!(codec.validate(&barcode));
        assert_eq!(codec.decode(&barcode), None);
    }

    #[test]
    fn test_classify() {
        let codec = codec();
        let canonical = codec.encode(Category::A, 5).unwrap();
        assert_eq!(
            codec.classify(canonical.as_str()),
            Some(IdentifierEncoding::Canonical(canonical.clone()))
        );
        assert!(codec.classify("10000005").unwrap().is_legacy());
        assert_eq!(codec.classify("not a barcode"), None);
    }

    #[test]
    fn test_convert_legacy() {
        let codec = codec();
        let legacy = LegacyBarcode::parse("30000077").unwrap();
        let canonical = codec.convert_legacy(&legacy).unwrap();
        assert_eq!(
            codec.decode(canonical.as_str()),
            Some(TicketIdentifier::new(Category::C, 77))
        );
    }

    #[test]
    fn test_convert_legacy_beyond_capacity() {
        let codec = codec();
        let legacy = LegacyBarcode::parse("11000000").unwrap();
        assert!(matches!(
            codec.convert_legacy(&legacy),
            Err(CodecError::SequenceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_verification_reference() {
        let codec = codec();
        let reference = codec.verification_reference(&TicketIdentifier::new(Category::B, 42));
        assert_eq!(reference, "https://raffle.local/verify/B000042");
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let mut config = CodecConfig::default();
        config.prefix = "97".to_string();
        assert!(matches!(
            IdentifierCodec::new(&config),
            Err(CodecError::InvalidConfig(_))
        ));

        let mut config = CodecConfig::default();
        config.categories.b = Some(CategoryConfig::new("001", 10));
        assert!(matches!(
            IdentifierCodec::new(&config),
            Err(CodecError::InvalidConfig(_))
        ));

        let mut config = CodecConfig::default();
        config.categories.a = Some(CategoryConfig::new("001", MAX_SEQUENCE_CAPACITY + 1));
        assert!(matches!(
            IdentifierCodec::new(&config),
            Err(CodecError::InvalidConfig(_))
        ));
    }

    fn arb_category() -> impl Strategy<Value = Category> {
        prop::sample::select(Category::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_round_trip(category in arb_category(), sequence in 1u32..=MAX_SEQUENCE_CAPACITY) {
            let codec = codec();
            let barcode = codec.encode(category, sequence).unwrap();
            prop_assert!(codec.validate(barcode.as_str()));
            prop_assert_eq!(
                codec.decode(barcode.as_str()),
                Some(TicketIdentifier::new(category, sequence))
            );
        }

        #[test]
        fn prop_random_strings_match_checksum_rule(s in "[0-9]{13}") {
            let codec = codec();
            let expected = &s[..3] == "978"
                && matches!(&s[3..6], "001" | "002" | "003" | "004")
                && crate::codec::check_digit_str(&s[..12]) == Some(s.as_bytes()[12] - b'0');
            prop_assert_eq!(codec.validate(&s), expected);
        }

        #[test]
        fn prop_prefixed_random_strings_mostly_rejected(tail in "[0-9]{10}") {
            let codec = codec();
            let s = format!("978{}", tail);
            let known = matches!(&s[3..6], "001" | "002" | "003" | "004");
            let check_ok = crate::codec::check_digit_str(&s[..12]) == Some(s.as_bytes()[12] - b'0');
            prop_assert_eq!(codec.validate(&s), known && check_ok);
        }

        #[test]
        fn prop_single_digit_error_detected(
            category in arb_category(),
            sequence in 1u32..=MAX_SEQUENCE_CAPACITY,
            position in 0usize..BARCODE_LENGTH,
            delta in 1u8..=9,
        ) {
            let codec = codec();
            let barcode = codec.encode(category, sequence).unwrap();
            let mut bytes = barcode.as_str().as_bytes().to_vec();
            bytes[position] = b'0' + (bytes[position] - b'0' + delta) % 10;
            let corrupted = String::from_utf8(bytes).unwrap();
            prop_assert!(!codec.validate(&corrupted));
        }
    }
}
