//! Lazy barcode assignment shared by printing and sales.

use thiserror::Error;
use tracing::debug;

use super::{Ticket, TicketError, TicketStore};
use crate::codec::{CodecError, IdentifierCodec};

/// Errors from [`ensure_codes`].
#[derive(Debug, Error)]
pub enum CodeAssignmentError {
    #[error("cannot encode ticket: {0}")]
    Codec(#[from] CodecError),

    #[error("ticket store error: {0}")]
    Store(#[from] TicketError),
}

/// Returns `ticket` with its canonical barcode and verification reference
/// assigned, generating and persisting them if missing.
///
/// A uniqueness conflict means a concurrent caller got there first: the
/// ticket is re-read and returned as long as it now carries a barcode.
pub fn ensure_codes(
    store: &dyn TicketStore,
    codec: &IdentifierCodec,
    ticket: Ticket,
) -> Result<Ticket, CodeAssignmentError> {
    if !ticket.needs_codes() {
        return Ok(ticket);
    }

    let barcode = codec.encode_identifier(&ticket.identifier)?;
    let verification_ref = codec.verification_reference(&ticket.identifier);

    match store.assign_codes(&ticket.id, &barcode, &verification_ref) {
        Ok(updated) => Ok(updated),
        Err(TicketError::Conflict { ticket_id, reason }) => {
            debug!(
                ticket_id = %ticket_id,
                reason = %reason,
                "Barcode already assigned, re-reading"
            );
            match store.get(&ticket.id)? {
                Some(current) if current.barcode.is_some() => Ok(current),
                Some(_) => Err(TicketError::Conflict { ticket_id, reason }.into()),
                None => Err(TicketError::NotFound(ticket.id).into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Category, CodecConfig, TicketIdentifier};
    use crate::ticket::SqliteTicketStore;

    fn setup() -> (SqliteTicketStore, IdentifierCodec) {
        let store = SqliteTicketStore::in_memory().unwrap();
        store.create_pool(Category::A, 1, 3).unwrap();
        (store, IdentifierCodec::new(&CodecConfig::default()).unwrap())
    }

    fn ticket(store: &SqliteTicketStore, sequence: u32) -> Ticket {
        store
            .find_by_identifier(&TicketIdentifier::new(Category::A, sequence))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_assigns_missing_codes() {
        let (store, codec) = setup();
        let updated = ensure_codes(&store, &codec, ticket(&store, 2)).unwrap();

        assert_eq!(
            updated.barcode,
            Some(codec.encode(Category::A, 2).unwrap())
        );
        assert_eq!(
            updated.verification_ref.as_deref(),
            Some("https://raffle.local/verify/A000002")
        );
    }

    #[test]
    fn test_stale_copy_is_benign() {
        let (store, codec) = setup();
        let stale = ticket(&store, 1);
        let first = ensure_codes(&store, &codec, stale.clone()).unwrap();

        // A second caller holding the pre-assignment copy gets the same codes.
        let second = ensure_codes(&store, &codec, stale).unwrap();
        assert_eq!(first.barcode, second.barcode);
    }

    #[test]
    fn test_out_of_capacity_is_codec_error() {
        let store = SqliteTicketStore::in_memory().unwrap();
        store.create_pool(Category::B, 1, 1).unwrap();
        let mut config = CodecConfig::default();
        config.categories.b = None;
        let codec = IdentifierCodec::new(&config).unwrap();

        let t = store
            .find_by_identifier(&TicketIdentifier::new(Category::B, 1))
            .unwrap()
            .unwrap();
        let result = ensure_codes(&store, &codec, t);
        assert!(matches!(result, Err(CodeAssignmentError::Codec(_))));
    }
}
