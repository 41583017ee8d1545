//! SQLite storage for collected sensor box and power meter records.

mod async_db;

pub use async_db::AsyncReadingsDb;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

const HEATPUMP_TABLE: &str = "heatpump";
const GROUNDPIPE_TABLE: &str = "groundpipe";
const ELEC_TABLE: &str = "elec";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// One heat pump record: box sensor values plus the energy reading of the same cycle
#[derive(Clone, Debug, PartialEq)]
pub struct HeatpumpRow {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub input_temp: Option<f64>,
    pub output_temp: Option<f64>,
    pub flow: Option<f64>,
    pub energy: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroundpipeRow {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub input_temp: Option<f64>,
    pub output_temp: Option<f64>,
    pub flow: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElecRow {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub total_energy: Option<f64>,
}

pub struct ReadingsDb(Connection);

impl ReadingsDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        log::debug!("Opening readings store at {}", path.as_ref().display());
        // Create directory for DB if it doesn't already exist
        std::fs::create_dir_all(path.as_ref().parent().unwrap_or(Path::new("")))?;
        let connection = Connection::open(path)?;
        Self::init(connection)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(connection: Connection) -> Result<Self, StoreError> {
        connection.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS '{HEATPUMP_TABLE}' (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                input_temp REAL,
                output_temp REAL,
                flow REAL,
                energy REAL
            );
            CREATE INDEX IF NOT EXISTS idx_{HEATPUMP_TABLE}_device_ts
                ON '{HEATPUMP_TABLE}' (device_id, timestamp);
            CREATE TABLE IF NOT EXISTS '{GROUNDPIPE_TABLE}' (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                input_temp REAL,
                output_temp REAL,
                flow REAL
            );
            CREATE INDEX IF NOT EXISTS idx_{GROUNDPIPE_TABLE}_device_ts
                ON '{GROUNDPIPE_TABLE}' (device_id, timestamp);
            CREATE TABLE IF NOT EXISTS '{ELEC_TABLE}' (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                total_energy REAL
            );
            CREATE INDEX IF NOT EXISTS idx_{ELEC_TABLE}_device_ts
                ON '{ELEC_TABLE}' (device_id, timestamp);"
        ))?;

        Ok(ReadingsDb(connection))
    }

    pub fn insert_heatpump(&self, row: &HeatpumpRow) -> Result<(), StoreError> {
        self.0.execute(
            &format!(
                "INSERT INTO '{HEATPUMP_TABLE}'
                (device_id, timestamp, input_temp, output_temp, flow, energy)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![
                row.device_id,
                row.timestamp,
                row.input_temp,
                row.output_temp,
                row.flow,
                row.energy
            ],
        )?;
        log::trace!("Inserted heatpump row for {}", row.device_id);
        Ok(())
    }

    pub fn insert_groundpipe(&self, row: &GroundpipeRow) -> Result<(), StoreError> {
        self.0.execute(
            &format!(
                "INSERT INTO '{GROUNDPIPE_TABLE}'
                (device_id, timestamp, input_temp, output_temp, flow)
                VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            params![
                row.device_id,
                row.timestamp,
                row.input_temp,
                row.output_temp,
                row.flow
            ],
        )?;
        log::trace!("Inserted groundpipe row for {}", row.device_id);
        Ok(())
    }

    pub fn insert_elec(&self, row: &ElecRow) -> Result<(), StoreError> {
        self.0.execute(
            &format!(
                "INSERT INTO '{ELEC_TABLE}' (device_id, timestamp, total_energy)
                VALUES (?1, ?2, ?3)"
            ),
            params![row.device_id, row.timestamp, row.total_energy],
        )?;
        log::trace!("Inserted elec row for {}", row.device_id);
        Ok(())
    }

    /// Most recently inserted heat pump row for a device
    pub fn latest_heatpump(&self, device_id: &str) -> Result<Option<HeatpumpRow>, StoreError> {
        self.0
            .query_row(
                &format!(
                    "SELECT device_id, timestamp, input_temp, output_temp, flow, energy
                    FROM '{HEATPUMP_TABLE}' WHERE device_id = ?1 ORDER BY id DESC LIMIT 1"
                ),
                [device_id],
                |r| {
                    Ok(HeatpumpRow {
                        device_id: r.get(0)?,
                        timestamp: r.get(1)?,
                        input_temp: r.get(2)?,
                        output_temp: r.get(3)?,
                        flow: r.get(4)?,
                        energy: r.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn latest_groundpipe(&self, device_id: &str) -> Result<Option<GroundpipeRow>, StoreError> {
        self.0
            .query_row(
                &format!(
                    "SELECT device_id, timestamp, input_temp, output_temp, flow
                    FROM '{GROUNDPIPE_TABLE}' WHERE device_id = ?1 ORDER BY id DESC LIMIT 1"
                ),
                [device_id],
                groundpipe_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn latest_elec(&self, device_id: &str) -> Result<Option<ElecRow>, StoreError> {
        self.0
            .query_row(
                &format!(
                    "SELECT device_id, timestamp, total_energy
                    FROM '{ELEC_TABLE}' WHERE device_id = ?1 ORDER BY id DESC LIMIT 1"
                ),
                [device_id],
                |r| {
                    Ok(ElecRow {
                        device_id: r.get(0)?,
                        timestamp: r.get(1)?,
                        total_energy: r.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Number of rows in each of the heatpump, groundpipe and elec tables
    pub fn row_counts(&self) -> Result<(u64, u64, u64), StoreError> {
        let count = |table: &str| -> Result<u64, StoreError> {
            self.0
                .query_row(&format!("SELECT COUNT(*) FROM '{table}'"), [], |r| {
                    r.get::<_, i64>(0)
                })
                .map(|n| n as u64)
                .map_err(Into::into)
        };
        Ok((
            count(HEATPUMP_TABLE)?,
            count(GROUNDPIPE_TABLE)?,
            count(ELEC_TABLE)?,
        ))
    }
}

fn groundpipe_from_row(r: &Row<'_>) -> rusqlite::Result<GroundpipeRow> {
    Ok(GroundpipeRow {
        device_id: r.get(0)?,
        timestamp: r.get(1)?,
        input_temp: r.get(2)?,
        output_temp: r.get(3)?,
        flow: r.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn heatpump_row_keeps_absent_fields_null() {
        let db = ReadingsDb::open_in_memory().unwrap();
        let row = HeatpumpRow {
            device_id: "HP_1".to_string(),
            timestamp: ts(1_700_000_000),
            input_temp: Some(19.7),
            output_temp: None,
            flow: Some(5239.74),
            energy: None,
        };
        db.insert_heatpump(&row).unwrap();

        assert_eq!(db.latest_heatpump("HP_1").unwrap(), Some(row));
        assert_eq!(db.latest_heatpump("HP_2").unwrap(), None);
    }

    #[test]
    fn latest_returns_last_inserted_row() {
        let db = ReadingsDb::open_in_memory().unwrap();
        for (i, energy) in [10.0, 20.0, 30.0].into_iter().enumerate() {
            db.insert_elec(&ElecRow {
                device_id: "HP_1".to_string(),
                timestamp: ts(1_700_000_000 + i as i64 * 60),
                total_energy: Some(energy),
            })
            .unwrap();
        }

        let latest = db.latest_elec("HP_1").unwrap().unwrap();
        assert_eq!(latest.total_energy, Some(30.0));
        assert_eq!(latest.timestamp, ts(1_700_000_120));
        assert_eq!(db.row_counts().unwrap(), (0, 0, 3));
    }

    #[test]
    fn groundpipe_rows_are_separate_from_heatpump_rows() {
        let db = ReadingsDb::open_in_memory().unwrap();
        db.insert_groundpipe(&GroundpipeRow {
            device_id: "GP_1".to_string(),
            timestamp: ts(1_700_000_000),
            input_temp: Some(12.5),
            output_temp: Some(11.0),
            flow: None,
        })
        .unwrap();

        assert!(db.latest_heatpump("GP_1").unwrap().is_none());
        assert_eq!(
            db.latest_groundpipe("GP_1").unwrap().unwrap().input_temp,
            Some(12.5)
        );
    }
}
