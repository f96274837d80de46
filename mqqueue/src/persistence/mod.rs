//! Gestion de la persistance SQLite pour les files

use crate::error::{Error, Result};
use crate::queue::entry::{from_nanos, observe_timestamp, to_nanos};
use crate::queue::{NewEntry, Queue, QueueEntry};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS queues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        code TEXT NOT NULL UNIQUE,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        queue_id INTEGER NOT NULL REFERENCES queues(id) ON DELETE CASCADE,
        track_id TEXT NOT NULL,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        album TEXT,
        cover TEXT,
        created_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_queue
        ON entries(queue_id, created_at, id);
";

const QUEUE_COLUMNS: &str = "id, name, code, created_at";
const ENTRY_COLUMNS: &str = "id, queue_id, track_id, title, artist, album, cover, created_at";

/// Résultat d'une tentative d'insertion de file
#[derive(Debug)]
pub enum InsertQueue {
    Created(Queue),
    /// Le nom existe déjà (création concurrente)
    NameTaken,
    /// Le code tiré est déjà attribué
    CodeTaken,
}

/// Gestionnaire de persistance (une base pour toutes les files)
pub struct PersistenceManager {
    conn: Arc<Mutex<Connection>>,
}

impl PersistenceManager {
    /// Ouvre (ou crée) la base de données
    pub fn new(db_path: &Path) -> Result<Self> {
        // Créer le répertoire parent si nécessaire
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::PersistenceError(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| Error::PersistenceError(format!("Failed to open database: {}", e)))?;

        Self::with_connection(conn)
    }

    /// Base en mémoire (tests)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::PersistenceError(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::PersistenceError(format!("Failed to create schema: {}", e)))?;

        // L'horloge d'ajout doit rester au-delà des entrées déjà stockées
        let latest: Option<i64> = conn
            .query_row("SELECT MAX(created_at) FROM entries", [], |row| row.get(0))
            .map_err(|e| Error::PersistenceError(format!("Failed to read entries: {}", e)))?;
        if let Some(latest) = latest {
            observe_timestamp(latest);
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::PersistenceError("Database connection poisoned".to_string()))
    }

    /// Insère une file ; les violations d'unicité sont renvoyées comme résultat
    pub fn insert_queue(&self, name: &str, code: &str) -> Result<InsertQueue> {
        let conn = self.conn()?;
        let created_at = SystemTime::now();

        let inserted = conn.execute(
            "INSERT INTO queues (name, code, created_at) VALUES (?1, ?2, ?3)",
            params![name, code, to_nanos(created_at)],
        );

        match inserted {
            Ok(_) => Ok(InsertQueue::Created(Queue {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                code: code.to_string(),
                created_at,
            })),
            Err(rusqlite::Error::SqliteFailure(err, Some(msg)))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                if msg.contains("queues.code") {
                    Ok(InsertQueue::CodeTaken)
                } else if msg.contains("queues.name") {
                    Ok(InsertQueue::NameTaken)
                } else {
                    Err(Error::PersistenceError(format!(
                        "Failed to insert queue: {}",
                        msg
                    )))
                }
            }
            Err(e) => Err(Error::PersistenceError(format!(
                "Failed to insert queue: {}",
                e
            ))),
        }
    }

    pub fn queue_by_id(&self, id: i64) -> Result<Option<Queue>> {
        self.find_queue("id = ?1", params![id])
    }

    pub fn queue_by_code(&self, code: &str) -> Result<Option<Queue>> {
        self.find_queue("code = ?1", params![code])
    }

    pub fn queue_by_name(&self, name: &str) -> Result<Option<Queue>> {
        self.find_queue("name = ?1", params![name])
    }

    fn find_queue(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<Queue>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM queues WHERE {}", QUEUE_COLUMNS, clause);
        conn.query_row(&sql, params, queue_from_row)
            .optional()
            .map_err(|e| Error::PersistenceError(format!("Failed to load queue: {}", e)))
    }

    /// Insère une entrée déjà validée et relit la file, dans une même transaction
    ///
    /// Retourne l'entrée créée et le contenu de la file après insertion.
    pub fn insert_entry(
        &self,
        queue_id: i64,
        entry: &NewEntry,
        created_at: SystemTime,
    ) -> Result<(QueueEntry, Vec<QueueEntry>)> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::PersistenceError(format!("Failed to begin transaction: {}", e)))?;
        let track_id = entry.track_id.clone().unwrap_or_default();

        tx.execute(
            "INSERT INTO entries (queue_id, track_id, title, artist, album, cover, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                queue_id,
                &track_id,
                &entry.title,
                &entry.artist,
                &entry.album,
                &entry.cover,
                to_nanos(created_at),
            ],
        )
        .map_err(|e| Error::PersistenceError(format!("Failed to insert entry: {}", e)))?;

        let created = QueueEntry {
            id: tx.last_insert_rowid(),
            queue_id,
            track_id,
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            album: entry.album.clone(),
            cover: entry.cover.clone(),
            created_at,
        };
        let items = query_entries(&tx, queue_id)?;

        tx.commit()
            .map_err(|e| Error::PersistenceError(format!("Failed to commit entry: {}", e)))?;
        Ok((created, items))
    }

    /// Supprime une entrée et relit la file, dans une même transaction
    ///
    /// Retourne `None` si l'entrée n'existe pas dans cette file.
    pub fn delete_entry(
        &self,
        queue_id: i64,
        entry_id: i64,
    ) -> Result<Option<(QueueEntry, Vec<QueueEntry>)>> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::PersistenceError(format!("Failed to begin transaction: {}", e)))?;

        let sql = format!(
            "SELECT {} FROM entries WHERE id = ?1 AND queue_id = ?2",
            ENTRY_COLUMNS
        );
        let Some(removed) = tx
            .query_row(&sql, params![entry_id, queue_id], entry_from_row)
            .optional()
            .map_err(|e| Error::PersistenceError(format!("Failed to load entry: {}", e)))?
        else {
            return Ok(None);
        };

        tx.execute(
            "DELETE FROM entries WHERE id = ?1 AND queue_id = ?2",
            params![entry_id, queue_id],
        )
        .map_err(|e| Error::PersistenceError(format!("Failed to delete entry: {}", e)))?;
        let items = query_entries(&tx, queue_id)?;

        tx.commit()
            .map_err(|e| Error::PersistenceError(format!("Failed to commit removal: {}", e)))?;
        Ok(Some((removed, items)))
    }

    /// Entrée la plus ancienne d'une file portant ce `track_id`
    pub fn oldest_entry_for_track(&self, queue_id: i64, track_id: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id FROM entries WHERE queue_id = ?1 AND track_id = ?2
             ORDER BY created_at ASC, id ASC LIMIT 1",
            params![queue_id, track_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::PersistenceError(format!("Failed to find entry: {}", e)))
    }

    /// Entrées d'une file, de la plus ancienne à la plus récente
    pub fn list_entries(&self, queue_id: i64) -> Result<Vec<QueueEntry>> {
        let conn = self.conn()?;
        query_entries(&conn, queue_id)
    }

    /// Exécute du SQL brut, pour préparer des états particuliers en test
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

fn query_entries(conn: &Connection, queue_id: i64) -> Result<Vec<QueueEntry>> {
    let sql = format!(
        "SELECT {} FROM entries WHERE queue_id = ?1 ORDER BY created_at ASC, id ASC",
        ENTRY_COLUMNS
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| Error::PersistenceError(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map(params![queue_id], entry_from_row)
        .map_err(|e| Error::PersistenceError(format!("Failed to query entries: {}", e)))?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(
            row.map_err(|e| Error::PersistenceError(format!("Failed to read entry: {}", e)))?,
        );
    }
    Ok(entries)
}

fn queue_from_row(row: &Row<'_>) -> rusqlite::Result<Queue> {
    Ok(Queue {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        created_at: from_nanos(row.get(3)?),
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_id: row.get(1)?,
        track_id: row.get(2)?,
        title: row.get(3)?,
        artist: row.get(4)?,
        album: row.get(5)?,
        cover: row.get(6)?,
        created_at: from_nanos(row.get(7)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::entry::next_timestamp;

    fn entry(title: &str) -> NewEntry {
        NewEntry::new(title, "artist").validate().unwrap()
    }

    #[test]
    fn test_queue_uniqueness_is_reported() {
        let db = PersistenceManager::in_memory().unwrap();

        assert!(matches!(
            db.insert_queue("party", "AAAA1111").unwrap(),
            InsertQueue::Created(_)
        ));
        assert!(matches!(
            db.insert_queue("other", "AAAA1111").unwrap(),
            InsertQueue::CodeTaken
        ));
        assert!(matches!(
            db.insert_queue("party", "BBBB2222").unwrap(),
            InsertQueue::NameTaken
        ));
    }

    #[test]
    fn test_lookup_by_id_code_name() {
        let db = PersistenceManager::in_memory().unwrap();
        let InsertQueue::Created(queue) = db.insert_queue("party", "CODE0001").unwrap() else {
            panic!("queue not created");
        };

        assert_eq!(db.queue_by_id(queue.id).unwrap().unwrap().name, "party");
        assert_eq!(db.queue_by_code("CODE0001").unwrap().unwrap().id, queue.id);
        assert_eq!(db.queue_by_name("party").unwrap().unwrap().code, "CODE0001");
        assert!(db.queue_by_name("nope").unwrap().is_none());
    }

    #[test]
    fn test_entries_are_ordered_and_scoped() {
        let db = PersistenceManager::in_memory().unwrap();
        let InsertQueue::Created(a) = db.insert_queue("a", "CODE000A").unwrap() else {
            panic!("queue not created");
        };
        let InsertQueue::Created(b) = db.insert_queue("b", "CODE000B").unwrap() else {
            panic!("queue not created");
        };

        let (first, _) = db.insert_entry(a.id, &entry("one"), next_timestamp()).unwrap();
        db.insert_entry(b.id, &entry("elsewhere"), next_timestamp()).unwrap();
        let (_, items) = db.insert_entry(a.id, &entry("two"), next_timestamp()).unwrap();
        assert_eq!(items.len(), 2);

        let titles: Vec<_> = db
            .list_entries(a.id)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["one", "two"]);

        // Une entrée d'une autre file n'est pas supprimable
        assert!(db.delete_entry(b.id, first.id).unwrap().is_none());
        let (removed, items) = db.delete_entry(a.id, first.id).unwrap().unwrap();
        assert_eq!(removed.title, "one");
        assert_eq!(items.len(), 1);
        assert!(db.delete_entry(a.id, first.id).unwrap().is_none());
    }

    fn entry_count(db: &PersistenceManager) -> i64 {
        db.conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_failed_snapshot_rolls_back_mutation() {
        let db = PersistenceManager::in_memory().unwrap();
        let InsertQueue::Created(q) = db.insert_queue("party", "CODE0001").unwrap() else {
            panic!("queue not created");
        };
        let (kept, _) = db.insert_entry(q.id, &entry("kept"), next_timestamp()).unwrap();

        // Une ligne illisible fait échouer la relecture de la file
        db.execute_raw(&format!(
            "INSERT INTO entries (queue_id, track_id, title, artist, created_at)
             VALUES ({}, 'bad', 'bad', 'bad', 'not a timestamp')",
            q.id
        ))
        .unwrap();
        assert_eq!(entry_count(&db), 2);

        assert!(db.insert_entry(q.id, &entry("new"), next_timestamp()).is_err());
        assert_eq!(entry_count(&db), 2);

        assert!(db.delete_entry(q.id, kept.id).is_err());
        assert_eq!(entry_count(&db), 2);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("queues.db");

        let queue_id = {
            let db = PersistenceManager::new(&path).unwrap();
            let InsertQueue::Created(q) = db.insert_queue("kept", "KEPT0001").unwrap() else {
                panic!("queue not created");
            };
            db.insert_entry(q.id, &entry("song").with_track_id("t-1"), next_timestamp())
                .unwrap();
            q.id
        };

        let db = PersistenceManager::new(&path).unwrap();
        let entries = db.list_entries(queue_id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].track_id, "t-1");
        assert_eq!(db.oldest_entry_for_track(queue_id, "t-1").unwrap(), Some(entries[0].id));
    }
}
