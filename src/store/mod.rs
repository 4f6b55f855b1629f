mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Profile operations
    fn create_profile(&self, profile: &Profile) -> Result<()>;
    fn get_profile(&self, id: &str) -> Result<Option<Profile>>;
    fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>>;
    fn list_profiles(&self, cursor: &str, limit: i32) -> Result<Vec<Profile>>;

    // Role assignments. `assign_role` rejects a duplicate grant with
    // `DuplicateRole`; `revoke_role` returns false when nothing was held.
    fn list_roles(&self, user_id: &str) -> Result<Vec<Role>>;
    fn assign_role(&self, user_id: &str, role: Role) -> Result<()>;
    fn revoke_role(&self, user_id: &str, role: Role) -> Result<bool>;
    fn any_admin_exists(&self) -> Result<bool>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn update_session_last_used(&self, id: &str) -> Result<()>;

    // Book operations
    fn create_book(&self, book: &Book) -> Result<()>;
    fn get_book(&self, id: &str) -> Result<Option<Book>>;
    fn list_published_books(&self, cursor: &str, limit: i32) -> Result<Vec<Book>>;
    fn list_author_books(&self, author_id: &str) -> Result<Vec<Book>>;
    fn update_book(&self, book: &Book) -> Result<()>;
    fn refresh_book_chapter_count(&self, book_id: &str) -> Result<()>;

    // Chapter operations
    fn create_chapter(&self, chapter: &Chapter) -> Result<()>;
    fn get_chapter(&self, id: &str) -> Result<Option<Chapter>>;
    fn get_chapter_by_number(&self, book_id: &str, number: i64) -> Result<Option<Chapter>>;
    fn list_chapters(&self, book_id: &str) -> Result<Vec<Chapter>>;
    fn update_chapter(&self, chapter: &Chapter) -> Result<()>;
    fn delete_chapter(&self, id: &str) -> Result<bool>;

    // Purchase operations; append-only, duplicate (user, book) rejected.
    fn create_purchase(&self, purchase: &Purchase) -> Result<()>;
    fn has_purchase(&self, user_id: &str, book_id: &str) -> Result<bool>;
    fn list_purchases(&self, user_id: &str) -> Result<Vec<Purchase>>;

    // Bookmark operations
    fn create_bookmark(&self, bookmark: &Bookmark) -> Result<()>;
    fn delete_bookmark(&self, user_id: &str, chapter_id: &str) -> Result<bool>;
    fn list_bookmarks(&self, user_id: &str, book_id: &str) -> Result<Vec<Bookmark>>;

    // Reading progress, keyed on (user, book)
    fn upsert_progress(&self, progress: &ReadingProgress) -> Result<()>;
    fn get_progress(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>>;
    fn list_progress(&self, user_id: &str) -> Result<Vec<ReadingProgress>>;

    // Review operations; one review per (user, book)
    fn create_review(&self, review: &Review) -> Result<()>;
    fn list_reviews(&self, book_id: &str) -> Result<Vec<Review>>;

    fn close(&self) -> Result<()>;
}
