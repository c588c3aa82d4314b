//! SQLite-backed verse and book-index store.
//!
//! Two tables share one embedded database for the whole run:
//!
//! ```text
//! verses(book, chapter, verse, data BLOB)                 -- bincode Verse
//! book_index(book_id, is_talmud, title, he_title,
//!            number_of_chapters, section_names BLOB, chapters BLOB)
//! ```
//!
//! Concurrent verse tasks write independent keys, so a single connection
//! behind a mutex is enough.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use thiserror::Error;

use crate::domain::{BookIndex, BookType, Verse};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Store connection lock poisoned")]
    Poisoned,
}

/// Shared handle to the local store (cheap to clone)
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open or create the store at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an existing store for lookups only; writes fail
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fresh in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS verses (
                book TEXT NOT NULL,
                chapter INTEGER NOT NULL,
                verse INTEGER NOT NULL,
                data BLOB NOT NULL,
                PRIMARY KEY (book, chapter, verse)
            );
            CREATE TABLE IF NOT EXISTS book_index (
                book_id TEXT PRIMARY KEY,
                is_talmud INTEGER NOT NULL,
                title TEXT NOT NULL,
                he_title TEXT NOT NULL,
                number_of_chapters INTEGER NOT NULL,
                section_names BLOB NOT NULL,
                chapters BLOB NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert (or overwrite) one verse
    pub fn insert_verse(
        &self,
        book: &str,
        chapter: u32,
        verse_number: u32,
        verse: &Verse,
    ) -> Result<(), StoreError> {
        let data = bincode::serialize(verse)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO verses (book, chapter, verse, data) VALUES (?1, ?2, ?3, ?4)",
            params![book, chapter as i64, verse_number as i64, data],
        )?;
        Ok(())
    }

    /// Look up one verse
    pub fn get_verse(
        &self,
        book: &str,
        chapter: u32,
        verse_number: u32,
    ) -> Result<Option<Verse>, StoreError> {
        let data = self.get_verse_blob(book, chapter, verse_number)?;
        data.map(|bytes| bincode::deserialize(&bytes).map_err(StoreError::from))
            .transpose()
    }

    /// Raw encoded verse, as stored
    pub fn get_verse_blob(
        &self,
        book: &str,
        chapter: u32,
        verse_number: u32,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.lock()?;
        let data = conn
            .query_row(
                "SELECT data FROM verses WHERE book = ?1 AND chapter = ?2 AND verse = ?3",
                params![book, chapter as i64, verse_number as i64],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(data)
    }

    /// Number of verses stored for a book
    pub fn count_verses(&self, book: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM verses WHERE book = ?1",
            params![book],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Insert (or overwrite) a book index, keyed by title
    pub fn insert_book_index(&self, index: &BookIndex) -> Result<(), StoreError> {
        let section_names = bincode::serialize(&index.section_names)?;
        let chapters = bincode::serialize(&index.chapters)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO book_index
             (book_id, is_talmud, title, he_title, number_of_chapters, section_names, chapters)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                index.title,
                index.is_talmud() as i64,
                index.title,
                index.he_title,
                index.number_of_chapters as i64,
                section_names,
                chapters
            ],
        )?;
        Ok(())
    }

    /// Look up a book index by title
    pub fn get_book_index(&self, book_id: &str) -> Result<Option<BookIndex>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT is_talmud, title, he_title, number_of_chapters, section_names, chapters
                 FROM book_index WHERE book_id = ?1",
                params![book_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((is_talmud, title, he_title, number_of_chapters, sections, chapters)) = row else {
            return Ok(None);
        };

        Ok(Some(BookIndex {
            book_type: if is_talmud != 0 {
                BookType::Talmud
            } else {
                BookType::Other
            },
            title,
            he_title,
            number_of_chapters: number_of_chapters as u32,
            chapters: bincode::deserialize(&chapters)?,
            section_names: bincode::deserialize(&sections)?,
        }))
    }

    /// Titles of all indexed books, sorted
    pub fn list_books(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT book_id FROM book_index ORDER BY book_id ASC")?;
        let books = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }
}
