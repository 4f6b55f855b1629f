use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|s| parse_datetime(&s))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        bio: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const PROFILE_COLS: &str = "id, email, display_name, bio, password_hash, created_at, updated_at";

fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        author_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        genre: row.get(4)?,
        cover_url: row.get(5)?,
        status: row.get(6)?,
        price_cents: row.get(7)?,
        free_chapters: row.get(8)?,
        total_chapters: row.get(9)?,
        published_at: parse_datetime_opt(row.get(10)?),
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

const BOOK_COLS: &str = "id, author_id, title, description, genre, cover_url, status, \
     price_cents, free_chapters, total_chapters, published_at, created_at, updated_at";

fn row_to_chapter(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: row.get(0)?,
        book_id: row.get(1)?,
        chapter_number: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        is_free: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const CHAPTER_COLS: &str =
    "id, book_id, chapter_number, title, content, is_free, created_at, updated_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Profile operations

    fn create_profile(&self, profile: &Profile) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO profiles (id, email, display_name, bio, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    profile.id,
                    profile.email,
                    profile.display_name,
                    profile.bio,
                    profile.password_hash,
                    format_datetime(&profile.created_at),
                    format_datetime(&profile.updated_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROFILE_COLS} FROM profiles WHERE id = ?1"),
            params![id],
            row_to_profile,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROFILE_COLS} FROM profiles WHERE email = ?1 COLLATE NOCASE"),
            params![email],
            row_to_profile,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_profiles(&self, cursor: &str, limit: i32) -> Result<Vec<Profile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLS} FROM profiles WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], row_to_profile)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Role assignments

    fn list_roles(&self, user_id: &str) -> Result<Vec<Role>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT role FROM user_roles WHERE user_id = ?1")?;

        let rows = stmt.query_map(params![user_id], |row| row.get::<_, Role>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn assign_role(&self, user_id: &str, role: Role) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)",
                params![user_id, role],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::DuplicateRole(role)
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn revoke_role(&self, user_id: &str, role: Role) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role = ?2",
            params![user_id, role],
        )?;
        Ok(rows > 0)
    }

    fn any_admin_exists(&self) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_roles WHERE role = 'admin')",
            [],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id,
                session.token_hash,
                session.token_lookup,
                session.user_id,
                format_datetime(&session.created_at),
                session.expires_at.as_ref().map(format_datetime),
                session.last_used_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM sessions WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: parse_datetime_opt(row.get(5)?),
                    last_used_at: parse_datetime_opt(row.get(6)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_session_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET last_used_at = datetime('now') WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    // Book operations

    fn create_book(&self, book: &Book) -> Result<()> {
        self.conn().execute(
            "INSERT INTO books (id, author_id, title, description, genre, cover_url, status,
                                price_cents, free_chapters, total_chapters, published_at,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                book.id,
                book.author_id,
                book.title,
                book.description,
                book.genre,
                book.cover_url,
                book.status,
                book.price_cents,
                book.free_chapters,
                book.total_chapters,
                book.published_at.as_ref().map(format_datetime),
                format_datetime(&book.created_at),
                format_datetime(&book.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {BOOK_COLS} FROM books WHERE id = ?1"),
            params![id],
            row_to_book,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_published_books(&self, cursor: &str, limit: i32) -> Result<Vec<Book>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOK_COLS} FROM books
             WHERE status = 'published' AND id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], row_to_book)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_author_books(&self, author_id: &str) -> Result<Vec<Book>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOK_COLS} FROM books WHERE author_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![author_id], row_to_book)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_book(&self, book: &Book) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE books SET title = ?1, description = ?2, genre = ?3, cover_url = ?4,
                              status = ?5, price_cents = ?6, free_chapters = ?7,
                              published_at = ?8, updated_at = datetime('now')
             WHERE id = ?9",
            params![
                book.title,
                book.description,
                book.genre,
                book.cover_url,
                book.status,
                book.price_cents,
                book.free_chapters,
                book.published_at.as_ref().map(format_datetime),
                book.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn refresh_book_chapter_count(&self, book_id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE books
             SET total_chapters = (SELECT COUNT(*) FROM chapters WHERE book_id = ?1),
                 updated_at = datetime('now')
             WHERE id = ?1",
            params![book_id],
        )?;
        Ok(())
    }

    // Chapter operations

    fn create_chapter(&self, chapter: &Chapter) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO chapters (id, book_id, chapter_number, title, content, is_free,
                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    chapter.id,
                    chapter.book_id,
                    chapter.chapter_number,
                    chapter.title,
                    chapter.content,
                    chapter.is_free,
                    format_datetime(&chapter.created_at),
                    format_datetime(&chapter.updated_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict(format!(
                        "chapter {} already exists for this book",
                        chapter.chapter_number
                    ))
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_chapter(&self, id: &str) -> Result<Option<Chapter>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CHAPTER_COLS} FROM chapters WHERE id = ?1"),
            params![id],
            row_to_chapter,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_chapter_by_number(&self, book_id: &str, number: i64) -> Result<Option<Chapter>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {CHAPTER_COLS} FROM chapters WHERE book_id = ?1 AND chapter_number = ?2"
            ),
            params![book_id, number],
            row_to_chapter,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_chapters(&self, book_id: &str) -> Result<Vec<Chapter>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHAPTER_COLS} FROM chapters WHERE book_id = ?1 ORDER BY chapter_number"
        ))?;

        let rows = stmt.query_map(params![book_id], row_to_chapter)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_chapter(&self, chapter: &Chapter) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE chapters SET chapter_number = ?1, title = ?2, content = ?3, is_free = ?4,
                                     updated_at = datetime('now')
                 WHERE id = ?5",
                params![
                    chapter.chapter_number,
                    chapter.title,
                    chapter.content,
                    chapter.is_free,
                    chapter.id,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict(format!(
                        "chapter {} already exists for this book",
                        chapter.chapter_number
                    ))
                } else {
                    Error::from(e)
                }
            })?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_chapter(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM chapters WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Purchase operations

    fn create_purchase(&self, purchase: &Purchase) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO book_purchases (id, user_id, book_id, amount_cents, payment_method,
                                             transaction_id, purchased_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    purchase.id,
                    purchase.user_id,
                    purchase.book_id,
                    purchase.amount_cents,
                    purchase.payment_method,
                    purchase.transaction_id,
                    format_datetime(&purchase.purchased_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::DuplicatePurchase
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn has_purchase(&self, user_id: &str, book_id: &str) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM book_purchases WHERE user_id = ?1 AND book_id = ?2)",
            params![user_id, book_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn list_purchases(&self, user_id: &str) -> Result<Vec<Purchase>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, book_id, amount_cents, payment_method, transaction_id, purchased_at
             FROM book_purchases WHERE user_id = ?1 ORDER BY purchased_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Purchase {
                id: row.get(0)?,
                user_id: row.get(1)?,
                book_id: row.get(2)?,
                amount_cents: row.get(3)?,
                payment_method: row.get(4)?,
                transaction_id: row.get(5)?,
                purchased_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Bookmark operations

    fn create_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO bookmarks (id, user_id, book_id, chapter_id, note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    bookmark.id,
                    bookmark.user_id,
                    bookmark.book_id,
                    bookmark.chapter_id,
                    bookmark.note,
                    format_datetime(&bookmark.created_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn delete_bookmark(&self, user_id: &str, chapter_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM bookmarks WHERE user_id = ?1 AND chapter_id = ?2",
            params![user_id, chapter_id],
        )?;
        Ok(rows > 0)
    }

    fn list_bookmarks(&self, user_id: &str, book_id: &str) -> Result<Vec<Bookmark>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, book_id, chapter_id, note, created_at
             FROM bookmarks WHERE user_id = ?1 AND book_id = ?2 ORDER BY created_at",
        )?;

        let rows = stmt.query_map(params![user_id, book_id], |row| {
            Ok(Bookmark {
                id: row.get(0)?,
                user_id: row.get(1)?,
                book_id: row.get(2)?,
                chapter_id: row.get(3)?,
                note: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Reading progress

    fn upsert_progress(&self, progress: &ReadingProgress) -> Result<()> {
        self.conn().execute(
            "INSERT INTO reading_progress (user_id, book_id, chapter_id, progress_percentage, last_read_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, book_id) DO UPDATE SET
                 chapter_id = excluded.chapter_id,
                 progress_percentage = excluded.progress_percentage,
                 last_read_at = excluded.last_read_at",
            params![
                progress.user_id,
                progress.book_id,
                progress.chapter_id,
                progress.progress_percentage,
                format_datetime(&progress.last_read_at),
            ],
        )?;
        Ok(())
    }

    fn get_progress(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, book_id, chapter_id, progress_percentage, last_read_at
             FROM reading_progress WHERE user_id = ?1 AND book_id = ?2",
            params![user_id, book_id],
            |row| {
                Ok(ReadingProgress {
                    user_id: row.get(0)?,
                    book_id: row.get(1)?,
                    chapter_id: row.get(2)?,
                    progress_percentage: row.get(3)?,
                    last_read_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_progress(&self, user_id: &str) -> Result<Vec<ReadingProgress>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, book_id, chapter_id, progress_percentage, last_read_at
             FROM reading_progress WHERE user_id = ?1 ORDER BY last_read_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ReadingProgress {
                user_id: row.get(0)?,
                book_id: row.get(1)?,
                chapter_id: row.get(2)?,
                progress_percentage: row.get(3)?,
                last_read_at: parse_datetime(&row.get::<_, String>(4)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Review operations

    fn create_review(&self, review: &Review) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO reviews (id, user_id, book_id, rating, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    review.id,
                    review.user_id,
                    review.book_id,
                    review.rating,
                    review.comment,
                    format_datetime(&review.created_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict("you have already reviewed this book".to_string())
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn list_reviews(&self, book_id: &str) -> Result<Vec<Review>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, book_id, rating, comment, created_at
             FROM reviews WHERE book_id = ?1 ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![book_id], |row| {
            Ok(Review {
                id: row.get(0)?,
                user_id: row.get(1)?,
                book_id: row.get(2)?,
                rating: row.get(3)?,
                comment: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
