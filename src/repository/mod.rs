mod embedded;
mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

use async_trait::async_trait;

use crate::models::{Note, NoteFields, User};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("Unique constraint violated by '{0}'")]
    Conflict(String),
}

/// Data access for users and notes.
///
/// Uniqueness of `users.username` and `notes.slug` is enforced by the store;
/// a violating write fails with [`RepositoryError::Conflict`] and leaves the
/// store unchanged.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn migrate(&self) -> Result<(), RepositoryError>;

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    async fn create_note(&self, author_id: i64, fields: NoteFields) -> Result<Note, RepositoryError>;

    async fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>, RepositoryError>;

    /// Notes owned by `author_id`, oldest first.
    async fn list_notes_by_author(&self, author_id: i64) -> Result<Vec<Note>, RepositoryError>;

    async fn update_note(
        &self,
        id: i64,
        fields: NoteFields,
    ) -> Result<Option<Note>, RepositoryError>;

    async fn delete_note(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Whether any note other than the one currently holding `exclude` uses `slug`.
    async fn slug_exists(
        &self,
        slug: &str,
        exclude: Option<&str>,
    ) -> Result<bool, RepositoryError>;

    async fn count_notes(&self) -> Result<i64, RepositoryError>;
}
