//! Audit Store
//!
//! SQLite relations for metadata and threats, plus one JSON snapshot file
//! per request. A record (metadata row, threat rows, snapshot) becomes
//! visible to readers all at once or not at all.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::types::{review_path, AuditMetadata, AuditRecord, AuditRow, StoreError};
use crate::logic::request::{Location, Request, ThreatLabel};

const SCHEMA: &str = "
    PRAGMA journal_mode=WAL;
    PRAGMA synchronous=NORMAL;
    PRAGMA foreign_keys=ON;
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        origin TEXT NOT NULL,
        host TEXT NOT NULL,
        method TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS threats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        log_id INTEGER NOT NULL REFERENCES logs(id),
        threat_type TEXT NOT NULL,
        location TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_threats_log_id ON threats(log_id);
";

pub struct AuditStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    snapshot_dir: PathBuf,
}

impl AuditStore {
    pub fn open(db_path: &Path, snapshot_dir: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::create_dir_all(snapshot_dir)?;

        let writer = Connection::open(db_path)?;
        writer.execute_batch(SCHEMA)?;

        let reader = Connection::open(db_path)?;
        reader.execute_batch("PRAGMA foreign_keys=ON; PRAGMA query_only=ON;")?;

        log::info!(
            "Audit store opened: {} (snapshots in {})",
            db_path.display(),
            snapshot_dir.display()
        );

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            snapshot_dir: snapshot_dir.to_path_buf(),
        })
    }

    pub fn snapshot_path(&self, id: i64) -> PathBuf {
        self.snapshot_dir.join(format!("{id}.json"))
    }

    /// Store a classified request; assigns its identifier and timestamp
    pub fn persist(&self, req: &mut Request) -> Result<i64, StoreError> {
        if let Some(id) = req.id() {
            return Err(StoreError::AlreadyPersisted(id));
        }
        if !req.is_classified() {
            return Err(StoreError::Unclassified);
        }

        let timestamp = Utc::now();
        let document = serde_json::to_vec_pretty(&req.snapshot())?;

        let mut conn = self.writer.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO logs(timestamp, origin, host, method) VALUES(?1, ?2, ?3, ?4)",
            params![
                timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
                req.origin,
                req.host,
                req.method
            ],
        )?;
        let id = tx.last_insert_rowid();

        let snapshot = self.snapshot_path(id);
        fs::write(&snapshot, &document)?;

        let rows = (|| -> Result<(), rusqlite::Error> {
            let mut stmt = tx.prepare(
                "INSERT INTO threats(log_id, threat_type, location) VALUES(?1, ?2, ?3)",
            )?;
            for (label, location) in req.threats() {
                stmt.execute(params![id, label.as_str(), location.as_str()])?;
            }
            Ok(())
        })();

        // Rollback happens when `tx` drops; the file must go with it
        if let Err(e) = rows.and_then(|_| tx.commit()) {
            if let Err(io) = fs::remove_file(&snapshot) {
                log::warn!("Orphan snapshot {} left behind: {}", snapshot.display(), io);
            }
            return Err(e.into());
        }
        drop(conn);

        req.mark_persisted(id, timestamp);
        log::debug!("Persisted request #{} ({} threats)", id, req.threats().len());
        Ok(id)
    }

    /// Every stored request joined with its threats, one row per threat
    pub fn read_all(&self) -> Result<Vec<AuditRow>, StoreError> {
        let conn = self.reader.lock();
        let mut stmt = conn.prepare(
            "SELECT l.id, l.timestamp, l.origin, l.host, l.method, t.threat_type, t.location
             FROM logs l JOIN threats t ON t.log_id = l.id
             ORDER BY l.id ASC, t.id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                RawMetadata {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    origin: row.get(2)?,
                    host: row.get(3)?,
                    method: row.get(4)?,
                },
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (raw, label, location) = row?;
            let metadata = raw.parse()?;
            let (threat, location) = parse_threat(&label, &location)?;
            out.push(AuditRow {
                review_path: review_path(metadata.id),
                metadata,
                threat,
                location,
            });
        }
        Ok(out)
    }

    /// Metadata and threat pairs for one identifier; `None` if unknown
    pub fn read_one(&self, id: i64) -> Result<Option<AuditRecord>, StoreError> {
        let conn = self.reader.lock();

        let raw = conn
            .query_row(
                "SELECT id, timestamp, origin, host, method FROM logs WHERE id = ?1",
                params![id],
                |row| {
                    Ok(RawMetadata {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        origin: row.get(2)?,
                        host: row.get(3)?,
                        method: row.get(4)?,
                    })
                },
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT threat_type, location FROM threats WHERE log_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut threats = Vec::new();
        for row in rows {
            let (label, location) = row?;
            threats.push(parse_threat(&label, &location)?);
        }

        Ok(Some(AuditRecord {
            metadata: raw.parse()?,
            threats,
        }))
    }

    /// Raw snapshot document for one identifier; `None` if absent
    pub fn read_snapshot(&self, id: i64) -> Result<Option<serde_json::Value>, StoreError> {
        match fs::read(self.snapshot_path(id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .reader
            .lock()
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

struct RawMetadata {
    id: i64,
    timestamp: String,
    origin: String,
    host: String,
    method: String,
}

impl RawMetadata {
    fn parse(self) -> Result<AuditMetadata, StoreError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| StoreError::Corrupt(format!("timestamp {:?}: {}", self.timestamp, e)))?
            .with_timezone(&Utc);
        Ok(AuditMetadata {
            id: self.id,
            timestamp,
            origin: self.origin,
            host: self.host,
            method: self.method,
        })
    }
}

fn parse_threat(label: &str, location: &str) -> Result<(ThreatLabel, Location), StoreError> {
    let label = label
        .parse::<ThreatLabel>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let location = location
        .parse::<Location>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok((label, location))
}
