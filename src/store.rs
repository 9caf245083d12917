// 🗄️ Reading Store - account directory + bulk insert of accepted readings
// SQLite (WAL) for real runs, in-memory for tests and dry runs

use crate::error::StoreError;
use crate::reading::{seed_accounts, CandidateReading, CustomerAccount, MeterReading};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Timestamps are stored in sortable ISO form
const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The two operations the upload flow needs from persistence.
pub trait ReadingStore {
    /// Snapshot of every account id known right now
    fn list_known_account_ids(&self) -> Result<HashSet<i64>, StoreError>;

    /// Insert all readings in one transaction; nothing lands on failure
    fn insert_readings(&self, readings: &[CandidateReading]) -> Result<Vec<MeterReading>, StoreError>;
}

fn to_meter_readings(readings: &[CandidateReading]) -> Result<Vec<MeterReading>, StoreError> {
    readings
        .iter()
        .map(|r| {
            MeterReading::from_accepted(r).ok_or_else(|| StoreError::InvalidValue(r.raw_value.clone()))
        })
        .collect()
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// SQLite-backed store. Cloning shares the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::new(Connection::open_in_memory()?)
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }

    /// Insert the default test accounts, skipping any already present
    pub fn seed_default_accounts(&self) -> Result<usize, StoreError> {
        self.insert_accounts(&seed_accounts())
    }

    pub fn insert_accounts(&self, accounts: &[CustomerAccount]) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO customer_accounts (id, first_name, last_name)
                     VALUES (?1, ?2, ?3)",
                )?;
                for account in accounts {
                    inserted += stmt.execute(params![account.id, account.first_name, account.last_name])?;
                }
            }
            tx.commit()?;

            tracing::info!(inserted, "customer accounts seeded");
            Ok(inserted)
        })
    }

    pub fn get_accounts(&self) -> Result<Vec<CustomerAccount>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, first_name, last_name FROM customer_accounts ORDER BY id")?;
            let accounts = stmt
                .query_map([], |row| {
                    Ok(CustomerAccount {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(accounts)
        })
    }

    pub fn get_readings(&self) -> Result<Vec<MeterReading>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, account_id, reading_time, value
                 FROM meter_readings
                 ORDER BY account_id, reading_time",
            )?;
            let readings = stmt
                .query_map([], |row| {
                    let id: String = row.get(0)?;
                    let time: String = row.get(2)?;

                    Ok(MeterReading {
                        id: Uuid::parse_str(&id).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
                        })?,
                        account_id: row.get(1)?,
                        timestamp: NaiveDateTime::parse_from_str(&time, DB_DATETIME_FORMAT).map_err(
                            |e| rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e)),
                        )?,
                        value: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(readings)
        })
    }

    pub fn count_readings(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM meter_readings", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}

impl ReadingStore for SqliteStore {
    fn list_known_account_ids(&self) -> Result<HashSet<i64>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM customer_accounts")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<HashSet<i64>, _>>()?;
            Ok(ids)
        })
    }

    fn insert_readings(&self, readings: &[CandidateReading]) -> Result<Vec<MeterReading>, StoreError> {
        let rows = to_meter_readings(readings)?;

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO meter_readings (id, account_id, reading_time, value)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for row in &rows {
                    stmt.execute(params![
                        row.id.to_string(),
                        row.account_id,
                        row.timestamp.format(DB_DATETIME_FORMAT).to_string(),
                        row.value,
                    ])?;
                }
            }
            // Dropping an uncommitted transaction rolls it back
            tx.commit()?;

            tracing::info!(inserted = rows.len(), "meter readings stored");
            Ok(rows)
        })
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // In-memory databases answer "memory" instead of "wal"
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::debug!(%journal_mode, "database opened");
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS customer_accounts (
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS meter_readings (
            id TEXT PRIMARY KEY,
            account_id INTEGER NOT NULL REFERENCES customer_accounts(id),
            reading_time TEXT NOT NULL,
            value INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meter_readings_account
         ON meter_readings(account_id, reading_time)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-process store. Inserts are all-or-nothing like the SQLite one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: HashSet<i64>,
    readings: Mutex<Vec<MeterReading>>,
}

impl MemoryStore {
    pub fn new(accounts: impl IntoIterator<Item = i64>) -> Self {
        MemoryStore {
            accounts: accounts.into_iter().collect(),
            readings: Mutex::new(Vec::new()),
        }
    }

    pub fn with_seed_accounts() -> Self {
        Self::new(seed_accounts().into_iter().map(|a| a.id))
    }

    pub fn readings(&self) -> Vec<MeterReading> {
        self.readings
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl ReadingStore for MemoryStore {
    fn list_known_account_ids(&self) -> Result<HashSet<i64>, StoreError> {
        Ok(self.accounts.clone())
    }

    fn insert_readings(&self, readings: &[CandidateReading]) -> Result<Vec<MeterReading>, StoreError> {
        let rows = to_meter_readings(readings)?;
        let mut stored = self.readings.lock().map_err(|_| StoreError::Poisoned)?;
        stored.extend(rows.iter().cloned());
        Ok(rows)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 5, day)
            .unwrap()
            .and_hms_opt(9, 24, 0)
            .unwrap()
    }

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_default_accounts().unwrap();
        store
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = store.seed_default_accounts().unwrap();
        let second = store.seed_default_accounts().unwrap();

        assert_eq!(first, 27);
        assert_eq!(second, 0);
        assert_eq!(store.get_accounts().unwrap().len(), 27);
    }

    #[test]
    fn test_list_known_account_ids() {
        let store = seeded_store();
        let ids = store.list_known_account_ids().unwrap();

        assert_eq!(ids.len(), 27);
        assert!(ids.contains(&2344));
        assert!(ids.contains(&1248));
        assert!(!ids.contains(&9999));
    }

    #[test]
    fn test_insert_readings_round_trip() {
        let store = seeded_store();
        let readings = vec![
            CandidateReading::new(2344, at(1), "01002"),
            CandidateReading::new(2233, at(2), "00323"),
        ];

        let stored = store.insert_readings(&readings).unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);

        let loaded = store.get_readings().unwrap();
        assert_eq!(store.count_readings().unwrap(), 2);
        assert_eq!(loaded[0].account_id, 2233);
        assert_eq!(loaded[0].value, 323);
        assert_eq!(loaded[0].timestamp, at(2));
        assert_eq!(loaded[1].value, 1002);
    }

    #[test]
    fn test_insert_is_all_or_nothing() {
        let store = seeded_store();
        // 9999 violates the foreign key after the first row went in
        let readings = vec![
            CandidateReading::new(2344, at(1), "01002"),
            CandidateReading::new(9999, at(1), "01002"),
        ];

        assert!(store.insert_readings(&readings).is_err());
        assert_eq!(store.count_readings().unwrap(), 0);
    }

    #[test]
    fn test_insert_rejects_non_numeric_value() {
        let store = seeded_store();
        let readings = vec![CandidateReading::new(2344, at(1), "VOID")];

        let err = store.insert_readings(&readings).unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue(_)));
        assert_eq!(store.count_readings().unwrap(), 0);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new([1, 2]);
        let readings = vec![CandidateReading::new(1, at(1), "12345")];

        assert_eq!(store.list_known_account_ids().unwrap(), HashSet::from([1, 2]));
        store.insert_readings(&readings).unwrap();
        assert_eq!(store.readings().len(), 1);
        assert_eq!(store.readings()[0].value, 12345);
    }
}
