//! Point-of-sale validation of scanned barcodes.
//!
//! The guard checks, in order: barcode format, ticket existence, superseded
//! (legacy-migrated) status, already sold. Format is checked before any
//! lookup so a malformed scan never reveals which tickets exist.

mod guard;
mod types;

pub use guard::SaleGuard;
pub use types::{SaleDecision, SaleError, SaleRejection};
