use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, warn};

use crate::{
    error::StoreError,
    timing::{
        daily::{day_key_of, DaySchedule},
        schedule::WeeklySchedule,
    },
};

pub type ConnectionPool = Arc<Pool<SqliteConnectionManager>>;

/// Operating hours persisted in SQLite, one row per declared day.
///
/// Times are stored as their `HH:MM` text so the table stays readable from the sqlite shell.
#[derive(Clone)]
pub struct ScheduleStore {
    connection_pool: ConnectionPool,
}

impl ScheduleStore {
    pub fn setup(connection_pool: ConnectionPool) -> Result<Self, StoreError> {
        let store = Self { connection_pool };
        store.create_table()?;
        Ok(store)
    }

    /// Obtain a connection from the connection pool.
    fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.connection_pool.get()?)
    }

    fn create_table(&self) -> Result<(), StoreError> {
        let connection = self.get_connection()?;
        connection.execute(
            "CREATE TABLE IF NOT EXISTS operational_hours (
                day TEXT PRIMARY KEY,
                opens_at TEXT NOT NULL,
                closes_at TEXT NOT NULL
            )",
            (),
        )?;
        Ok(())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let connection = self.get_connection()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM operational_hours", (), |row| row.get(0))?;
        Ok(count == 0)
    }

    /**
    Load every stored day into a schedule.

    A row that no longer parses is skipped with a warning. That day then reads as having
    no hours instead of failing the whole load.
    */
    pub fn load_schedule(&self) -> Result<WeeklySchedule, StoreError> {
        let connection = self.get_connection()?;
        let mut statement =
            connection.prepare("SELECT day, opens_at, closes_at FROM operational_hours")?;
        let rows = statement.query_map((), |row| {
            let day: String = row.get(0)?;
            let opens_at: String = row.get(1)?;
            let closes_at: String = row.get(2)?;
            Ok((day, opens_at, closes_at))
        })?;

        let mut schedule = WeeklySchedule::new();
        for row in rows {
            let (day, opens_at, closes_at) = row?;
            match DaySchedule::parse(&day, &opens_at, &closes_at) {
                Ok(timing) => {
                    schedule.set(timing);
                }
                Err(err) => warn!(%day, %opens_at, %closes_at, error = %err, "skipping stored hours"),
            }
        }
        Ok(schedule)
    }

    /**
    Replace all stored hours with `schedule`.

    Runs in one transaction so readers never see a half written week.
    */
    pub fn replace_schedule(&self, schedule: &WeeklySchedule) -> Result<(), StoreError> {
        let mut connection = self.get_connection()?;
        let transaction = connection.transaction()?;
        transaction.execute("DELETE FROM operational_hours", ())?;
        {
            let mut statement = transaction.prepare(
                "INSERT INTO operational_hours (day, opens_at, closes_at) VALUES (?1, ?2, ?3)",
            )?;
            for timing in schedule.days() {
                statement.execute(rusqlite::params![
                    day_key_of(timing.day()),
                    timing.opens_at().to_string(),
                    timing.closes_at().to_string(),
                ])?;
            }
        }
        transaction.commit()?;
        debug!(days = schedule.len(), "replaced operating hours");
        Ok(())
    }

    /// Insert or update the hours of a single day.
    pub fn upsert_day(&self, timing: &DaySchedule) -> Result<(), StoreError> {
        let connection = self.get_connection()?;
        connection.execute(
            "INSERT INTO operational_hours (day, opens_at, closes_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(day) DO UPDATE SET opens_at = ?2, closes_at = ?3",
            rusqlite::params![
                day_key_of(timing.day()),
                timing.opens_at().to_string(),
                timing.closes_at().to_string(),
            ],
        )?;
        debug!(day = day_key_of(timing.day()), window = %timing.display_window(), "updated operating hours");
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// A single connection in-memory store. One connection keeps every query on the same
    /// database.
    pub fn memory_store() -> ScheduleStore {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        ScheduleStore::setup(Arc::new(pool)).unwrap()
    }
}
