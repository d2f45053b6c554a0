//! Ticket pool: identity, lazily assigned codes, lifecycle status and print state.

mod codes;
mod sqlite_store;
mod store;
mod types;

pub use codes::{ensure_codes, CodeAssignmentError};
pub use sqlite_store::SqliteTicketStore;
pub use store::{TicketError, TicketFilter, TicketStore};
pub use types::{PrintState, Ticket, TicketStatus};
