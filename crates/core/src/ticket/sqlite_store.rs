//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode};

use super::{PrintState, Ticket, TicketError, TicketFilter, TicketStatus, TicketStore};
use crate::codec::{CanonicalBarcode, Category, LegacyBarcode, TicketIdentifier};

const TICKET_COLUMNS: &str = "id, category, sequence, barcode, legacy_barcode, verification_ref, status, printed, print_count, created_at, updated_at";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> TicketError {
    TicketError::Database(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        Self::with_busy_timeout(path, Duration::from_secs(5))
    }

    /// Like [`SqliteTicketStore::new`] with an explicit per-call lock timeout.
    pub fn with_busy_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.busy_timeout(busy_timeout).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                barcode TEXT UNIQUE,
                legacy_barcode TEXT,
                verification_ref TEXT,
                status TEXT NOT NULL DEFAULT 'available',
                printed INTEGER NOT NULL DEFAULT 0,
                print_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (category, sequence)
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
            CREATE INDEX IF NOT EXISTS idx_tickets_legacy ON tickets(legacy_barcode);

            CREATE TABLE IF NOT EXISTS ticket_print_marks (
                job_id TEXT NOT NULL,
                ticket_id TEXT NOT NULL,
                marked_at TEXT NOT NULL,
                PRIMARY KEY (job_id, ticket_id)
            );
            "#,
        )
        .map_err(db_err)
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category) = filter.category {
            conditions.push("category = ?");
            params.push(Box::new(category.as_str()));
        }

        if let Some((first, last)) = filter.sequence_range {
            conditions.push("sequence BETWEEN ? AND ?");
            params.push(Box::new(first));
            params.push(Box::new(last));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(status) = filter.exclude_status {
            conditions.push("status != ?");
            params.push(Box::new(status.as_str()));
        }

        if filter.legacy_only {
            conditions.push("legacy_barcode IS NOT NULL");
        }

        if filter.native_only {
            conditions.push("legacy_barcode IS NULL");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let id: String = row.get(0)?;
        let category_str: String = row.get(1)?;
        let sequence: u32 = row.get(2)?;
        let barcode: Option<String> = row.get(3)?;
        let legacy_barcode: Option<String> = row.get(4)?;
        let verification_ref: Option<String> = row.get(5)?;
        let status_str: String = row.get(6)?;
        let printed: bool = row.get(7)?;
        let print_count: u32 = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        let category: Category = category_str
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        let status = TicketStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(6, "status".to_string(), Type::Text)
        })?;

        Ok(Ticket {
            id,
            identifier: TicketIdentifier::new(category, sequence),
            barcode: barcode.map(CanonicalBarcode::from_trusted),
            legacy_barcode: legacy_barcode.as_deref().and_then(LegacyBarcode::parse),
            verification_ref,
            status,
            print: PrintState {
                printed,
                print_count,
            },
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<Ticket>, TicketError> {
        let result = conn.query_row(
            &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
            params![id],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }
}

impl TicketStore for SqliteTicketStore {
    fn create_pool(&self, category: Category, first: u32, last: u32) -> Result<usize, TicketError> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction().map_err(db_err)?;
        let mut created = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO tickets (id, category, sequence, status, created_at, updated_at) VALUES (?, ?, ?, 'available', ?, ?)",
                )
                .map_err(db_err)?;
            for sequence in first..=last {
                let id = uuid::Uuid::new_v4().to_string();
                created += stmt
                    .execute(params![id, category.as_str(), sequence, now, now])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;

        Ok(created)
    }

    fn create_legacy(
        &self,
        identifier: TicketIdentifier,
        legacy_barcode: LegacyBarcode,
    ) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tickets (id, category, sequence, legacy_barcode, status, created_at, updated_at) VALUES (?, ?, ?, ?, 'available', ?, ?)",
            params![
                id,
                identifier.category.as_str(),
                identifier.sequence,
                legacy_barcode.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                TicketError::Conflict {
                    ticket_id: identifier.to_string(),
                    reason: "identifier already exists".to_string(),
                }
            } else {
                db_err(e)
            }
        })?;

        Ok(Ticket {
            id,
            identifier,
            barcode: None,
            legacy_barcode: Some(legacy_barcode),
            verification_ref: None,
            status: TicketStatus::Available,
            print: PrintState::default(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, id)
    }

    fn find_by_identifier(
        &self,
        identifier: &TicketIdentifier,
    ) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!(
                "SELECT {} FROM tickets WHERE category = ? AND sequence = ?",
                TICKET_COLUMNS
            ),
            params![identifier.category.as_str(), identifier.sequence],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM tickets {} ORDER BY category ASC, sequence ASC LIMIT ? OFFSET ?",
            TICKET_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(db_err)?;

        let mut tickets = Vec::new();
        for row_result in rows {
            tickets.push(row_result.map_err(db_err)?);
        }

        Ok(tickets)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)
    }

    fn assign_codes(
        &self,
        id: &str,
        barcode: &CanonicalBarcode,
        verification_ref: &str,
    ) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let changed = conn
            .execute(
                "UPDATE tickets SET barcode = ?, verification_ref = ?, updated_at = ? WHERE id = ? AND barcode IS NULL",
                params![barcode.as_str(), verification_ref, now.to_rfc3339(), id],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    TicketError::Conflict {
                        ticket_id: id.to_string(),
                        reason: format!("barcode {} already assigned", barcode),
                    }
                } else {
                    db_err(e)
                }
            })?;

        let current =
            Self::get_locked(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        if changed == 1 {
            return Ok(current);
        }

        match &current.barcode {
            Some(existing) if existing == barcode => {
                if current.verification_ref.is_none() {
                    conn.execute(
                        "UPDATE tickets SET verification_ref = ?, updated_at = ? WHERE id = ?",
                        params![verification_ref, now.to_rfc3339(), id],
                    )
                    .map_err(db_err)?;
                    return Ok(Ticket {
                        verification_ref: Some(verification_ref.to_string()),
                        updated_at: now,
                        ..current
                    });
                }
                Ok(current)
            }
            Some(existing) => Err(TicketError::Conflict {
                ticket_id: id.to_string(),
                reason: format!("ticket already carries barcode {}", existing),
            }),
            None => Err(TicketError::Database(format!(
                "barcode update for ticket {} had no effect",
                id
            ))),
        }
    }

    fn transition_status(
        &self,
        id: &str,
        from: &[TicketStatus],
        new_status: TicketStatus,
    ) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();

        let current =
            Self::get_locked(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        let invalid_state = |current_state: TicketStatus| TicketError::InvalidState {
            ticket_id: id.to_string(),
            current_state: current_state.to_string(),
            operation: format!("move to {}", new_status),
        };

        if !from.contains(&current.status) {
            return Err(invalid_state(current.status));
        }

        let now = Utc::now();
        let changed = conn
            .execute(
                "UPDATE tickets SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
                params![
                    new_status.as_str(),
                    now.to_rfc3339(),
                    id,
                    current.status.as_str()
                ],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(invalid_state(current.status));
        }

        Ok(Ticket {
            status: new_status,
            updated_at: now,
            ..current
        })
    }

    fn mark_printed(&self, job_id: &str, ticket_ids: &[String]) -> Result<usize, TicketError> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction().map_err(db_err)?;
        let mut marked = 0;
        {
            let mut insert_mark = tx
                .prepare(
                    "INSERT OR IGNORE INTO ticket_print_marks (job_id, ticket_id, marked_at) VALUES (?, ?, ?)",
                )
                .map_err(db_err)?;
            let mut bump = tx
                .prepare(
                    "UPDATE tickets SET printed = 1, print_count = print_count + 1, updated_at = ? WHERE id = ?",
                )
                .map_err(db_err)?;

            for ticket_id in ticket_ids {
                let inserted = insert_mark
                    .execute(params![job_id, ticket_id, now])
                    .map_err(db_err)?;
                if inserted == 0 {
                    continue;
                }
                if bump.execute(params![now, ticket_id]).map_err(db_err)? == 0 {
                    // Dropping the transaction rolls back every mark so far.
                    return Err(TicketError::NotFound(ticket_id.clone()));
                }
                marked += 1;
            }
        }
        tx.commit().map_err(db_err)?;

        Ok(marked)
    }

    fn printed_by_job(&self, job_id: &str) -> Result<i64, TicketError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM ticket_print_marks WHERE job_id = ?",
            params![job_id],
            |row| row.get(0),
        )
        .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecConfig, IdentifierCodec};

    fn create_test_store() -> SqliteTicketStore {
        SqliteTicketStore::in_memory().unwrap()
    }

    fn codec() -> IdentifierCodec {
        IdentifierCodec::new(&CodecConfig::default()).unwrap()
    }

    fn ticket_at(store: &SqliteTicketStore, category: Category, sequence: u32) -> Ticket {
        store
            .find_by_identifier(&TicketIdentifier::new(category, sequence))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_create_pool() {
        let store = create_test_store();
        let created = store.create_pool(Category::A, 1, 25).unwrap();
        assert_eq!(created, 25);

        let ticket = ticket_at(&store, Category::A, 7);
        assert_eq!(ticket.status, TicketStatus::Available);
        assert!(ticket.barcode.is_none());
        assert_eq!(ticket.print, PrintState::default());
    }

    #[test]
    fn test_create_pool_is_idempotent() {
        let store = create_test_store();
        store.create_pool(Category::B, 1, 10).unwrap();
        let created = store.create_pool(Category::B, 5, 15).unwrap();
        assert_eq!(created, 5);
        assert_eq!(store.count(&TicketFilter::new()).unwrap(), 15);
    }

    #[test]
    fn test_create_legacy_conflicts_with_existing_identifier() {
        let store = create_test_store();
        store.create_pool(Category::A, 1, 3).unwrap();

        let legacy = LegacyBarcode::parse("10000002").unwrap();
        let result = store.create_legacy(TicketIdentifier::new(Category::A, 2), legacy);
        assert!(matches!(result, Err(TicketError::Conflict { .. })));
    }

    #[test]
    fn test_get_nonexistent_ticket() {
        let store = create_test_store();
        assert!(store.get("nonexistent-id").unwrap().is_none());
    }

    #[test]
    fn test_list_range_ordered() {
        let store = create_test_store();
        store.create_pool(Category::C, 1, 30).unwrap();
        store.create_pool(Category::A, 1, 30).unwrap();

        let tickets = store
            .list(&TicketFilter::in_range(Category::C, 10, 19).with_limit(1000))
            .unwrap();
        let sequences: Vec<u32> = tickets.iter().map(|t| t.identifier.sequence).collect();
        assert_eq!(sequences, (10..=19).collect::<Vec<_>>());
        assert!(tickets.iter().all(|t| t.identifier.category == Category::C));
    }

    #[test]
    fn test_list_pagination() {
        let store = create_test_store();
        store.create_pool(Category::A, 1, 5).unwrap();

        let page = store
            .list(&TicketFilter::new().with_limit(2).with_offset(4))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].identifier.sequence, 5);
    }

    #[test]
    fn test_count_with_status_filters() {
        let store = create_test_store();
        store.create_pool(Category::A, 1, 4).unwrap();
        let ticket = ticket_at(&store, Category::A, 2);
        store
            .transition_status(&ticket.id, &[TicketStatus::Available], TicketStatus::Invalid)
            .unwrap();

        let filter =
            TicketFilter::in_range(Category::A, 1, 4).without_status(TicketStatus::Invalid);
        assert_eq!(store.count(&filter).unwrap(), 3);

        let filter = TicketFilter::new().with_status(TicketStatus::Invalid);
        assert_eq!(store.count(&filter).unwrap(), 1);
    }

    #[test]
    fn test_assign_codes() {
        let store = create_test_store();
        store.create_pool(Category::A, 1, 1).unwrap();
        let ticket = ticket_at(&store, Category::A, 1);
        let barcode = codec().encode(Category::A, 1).unwrap();

        let updated = store
            .assign_codes(&ticket.id, &barcode, "https://raffle.local/verify/A000001")
            .unwrap();
        assert_eq!(updated.barcode.as_ref(), Some(&barcode));
        assert!(!updated.needs_codes());

        // Same barcode again is a no-op.
        let again = store
            .assign_codes(&ticket.id, &barcode, "https://raffle.local/verify/A000001")
            .unwrap();
        assert_eq!(again.barcode, Some(barcode));
    }

    #[test]
    fn test_assign_codes_rejects_reassignment() {
        let store = create_test_store();
        store.create_pool(Category::A, 1, 2).unwrap();
        let first = ticket_at(&store, Category::A, 1);
        let second = ticket_at(&store, Category::A, 2);
        let codec = codec();
        let barcode = codec.encode(Category::A, 1).unwrap();

        store.assign_codes(&first.id, &barcode, "ref-1").unwrap();

        // Another ticket cannot take the same barcode.
        let result = store.assign_codes(&second.id, &barcode, "ref-2");
        assert!(matches!(result, Err(TicketError::Conflict { .. })));

        // A ticket cannot switch to a different barcode.
        let other = codec.encode(Category::A, 2).unwrap();
        let result = store.assign_codes(&first.id, &other, "ref-1");
        assert!(matches!(result, Err(TicketError::Conflict { .. })));
    }

    #[test]
    fn test_assign_codes_missing_ticket() {
        let store = create_test_store();
        let barcode = codec().encode(Category::A, 1).unwrap();
        let result = store.assign_codes("missing", &barcode, "ref");
        assert!(matches!(result, Err(TicketError::NotFound(_))));
    }

    #[test]
    fn test_transition_status_guarded() {
        let store = create_test_store();
        store.create_pool(Category::D, 1, 1).unwrap();
        let ticket = ticket_at(&store, Category::D, 1);

        let sold = store
            .transition_status(&ticket.id, &[TicketStatus::Available], TicketStatus::Sold)
            .unwrap();
        assert_eq!(sold.status, TicketStatus::Sold);

        let result =
            store.transition_status(&ticket.id, &[TicketStatus::Available], TicketStatus::Sold);
        assert!(matches!(result, Err(TicketError::InvalidState { .. })));
    }

    #[test]
    fn test_mark_printed_once_per_job() {
        let store = create_test_store();
        store.create_pool(Category::A, 1, 3).unwrap();
        let ids: Vec<String> = store
            .list(&TicketFilter::new())
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();

        assert_eq!(store.mark_printed("job-1", &ids).unwrap(), 3);
        assert_eq!(store.mark_printed("job-1", &ids).unwrap(), 0);
        assert_eq!(store.mark_printed("job-2", &ids[..1]).unwrap(), 1);

        let first = store.get(&ids[0]).unwrap().unwrap();
        assert!(first.print.printed);
        assert_eq!(first.print.print_count, 2);

        let last = store.get(&ids[2]).unwrap().unwrap();
        assert_eq!(last.print.print_count, 1);
        assert_eq!(store.printed_by_job("job-1").unwrap(), 3);
    }

    #[test]
    fn test_mark_printed_all_or_nothing() {
        let store = create_test_store();
        store.create_pool(Category::A, 1, 2).unwrap();
        let mut ids: Vec<String> = store
            .list(&TicketFilter::new())
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        ids.push("ghost".to_string());

        let result = store.mark_printed("job-1", &ids);
        assert!(matches!(result, Err(TicketError::NotFound(_))));

        let ticket = store.get(&ids[0]).unwrap().unwrap();
        assert!(!ticket.print.printed);
        assert_eq!(store.printed_by_job("job-1").unwrap(), 0);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("tickets.db");

        let store = SqliteTicketStore::new(&db_path).unwrap();
        store.create_pool(Category::A, 1, 2).unwrap();
        assert!(db_path.exists());

        let reopened = SqliteTicketStore::new(&db_path).unwrap();
        assert_eq!(reopened.count(&TicketFilter::new()).unwrap(), 2);
    }
}
