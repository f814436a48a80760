use letex_core::{Error, Message, Note, Result, Thread};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Per-user conversation threads and notes.
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the thread with `thread_id`.
    fn save_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        title: &str,
        messages: &[Message],
        updated_at: i64,
    ) -> Result<()>;

    /// All threads of `user_id`, most recently updated first.
    fn get_user_threads(&self, user_id: &str) -> Result<Vec<Thread>>;

    fn save_note(&self, user_id: &str, content: &str, created_at: i64) -> Result<Note>;

    /// All notes of `user_id`, newest first.
    fn get_user_notes(&self, user_id: &str) -> Result<Vec<Note>>;
}

pub type DocumentStoreHandle = Arc<dyn DocumentStore>;

/// SQLite-backed document store.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    inner: Arc<Mutex<Connection>>,
}

fn storage_err(context: &str) -> impl FnOnce(rusqlite::Error) -> Error + '_ {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

impl SqliteDocumentStore {
    /// Open (or create) the database at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create db directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(storage_err("Failed to open document db"))?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let store = Self {
            inner: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        info!(path = %db_path.display(), "Document store opened");
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.inner
            .lock()
            .map_err(|e| Error::Storage(format!("Lock error: {}", e)))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS threads (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                messages TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_threads_user ON threads(user_id, updated_at);

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id, created_at);
            ",
        )
        .map_err(storage_err("Failed to init document schema"))?;

        debug!("Document store schema initialized");
        Ok(())
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn save_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        title: &str,
        messages: &[Message],
        updated_at: i64,
    ) -> Result<()> {
        let messages_json = serde_json::to_string(messages)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO threads (id, user_id, title, messages, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                title = excluded.title,
                messages = excluded.messages,
                updated_at = excluded.updated_at",
            params![thread_id, user_id, title, messages_json, updated_at],
        )
        .map_err(storage_err("Failed to save thread"))?;

        debug!(thread_id = %thread_id, messages = messages.len(), "Thread saved");
        Ok(())
    }

    fn get_user_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, title, messages, updated_at FROM threads
                 WHERE user_id = ?1 ORDER BY updated_at DESC, rowid DESC",
            )
            .map_err(storage_err("Failed to prepare thread query"))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(storage_err("Failed to query threads"))?;

        let mut threads = Vec::new();
        for row in rows {
            let (id, user_id, title, messages_json, updated_at) =
                row.map_err(storage_err("Failed to read thread row"))?;
            match serde_json::from_str::<Vec<Message>>(&messages_json) {
                Ok(messages) => threads.push(Thread {
                    id,
                    user_id,
                    title,
                    messages,
                    updated_at,
                }),
                Err(e) => {
                    warn!(thread_id = %id, error = %e, "Skipping thread with unreadable messages");
                }
            }
        }
        Ok(threads)
    }

    fn save_note(&self, user_id: &str, content: &str, created_at: i64) -> Result<Note> {
        let note = Note {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            created_at,
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![note.id, note.user_id, note.content, note.created_at],
        )
        .map_err(storage_err("Failed to save note"))?;

        debug!(note_id = %note.id, "Note saved");
        Ok(note)
    }

    fn get_user_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, content, created_at FROM notes
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(storage_err("Failed to prepare note query"))?;

        let notes = stmt
            .query_map(params![user_id], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(storage_err("Failed to query notes"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(storage_err("Failed to read note row"))?;
        Ok(notes)
    }
}
