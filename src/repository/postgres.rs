use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row, error::SqlState};

use super::{Repository, RepositoryError, embedded::migrations};
use crate::models::{Note, NoteFields, User};

const NOTE_COLUMNS: &str = "id, title, text, slug, author_id, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, password_hash, created_at";

pub struct PgRepository {
    client: Mutex<Client>,
}

impl PgRepository {
    pub async fn new(database_dsn: &str) -> Result<Self, RepositoryError> {
        let (client, con) = tokio_postgres::connect(database_dsn, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = con.await {
                tracing::error!("connection error: {}", e);
            }
        });

        Ok(Self {
            client: Mutex::new(client),
        })
    }
}

fn note_from_row(row: &Row) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        slug: row.get("slug"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

fn conflict_or(e: tokio_postgres::Error, value: &str) -> RepositoryError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        RepositoryError::Conflict(value.to_string())
    } else {
        RepositoryError::Postgres(e)
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn migrate(&self) -> Result<(), RepositoryError> {
        let mut client = self.client.lock().await;
        let migrations_report = migrations::runner().run_async(&mut *client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = self
            .client
            .lock()
            .await
            .query_one(
                &format!(
                    "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
                ),
                &[&username, &password_hash],
            )
            .await
            .map_err(|e| conflict_or(e, username))?;

        Ok(user_from_row(&row))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let row = self
            .client
            .lock()
            .await
            .query_opt(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"),
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = self
            .client
            .lock()
            .await
            .query_opt(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"),
                &[&username],
            )
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn create_note(
        &self,
        author_id: i64,
        fields: NoteFields,
    ) -> Result<Note, RepositoryError> {
        let row = self
            .client
            .lock()
            .await
            .query_one(
                &format!(
                    "INSERT INTO notes (title, text, slug, author_id) VALUES ($1, $2, $3, $4) RETURNING {NOTE_COLUMNS}"
                ),
                &[&fields.title, &fields.text, &fields.slug, &author_id],
            )
            .await
            .map_err(|e| conflict_or(e, &fields.slug))?;

        Ok(note_from_row(&row))
    }

    async fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>, RepositoryError> {
        let row = self
            .client
            .lock()
            .await
            .query_opt(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE slug = $1"),
                &[&slug],
            )
            .await?;

        Ok(row.as_ref().map(note_from_row))
    }

    async fn list_notes_by_author(&self, author_id: i64) -> Result<Vec<Note>, RepositoryError> {
        let rows = self
            .client
            .lock()
            .await
            .query(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE author_id = $1 ORDER BY id"),
                &[&author_id],
            )
            .await?;

        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn update_note(
        &self,
        id: i64,
        fields: NoteFields,
    ) -> Result<Option<Note>, RepositoryError> {
        let row = self
            .client
            .lock()
            .await
            .query_opt(
                &format!(
                    "UPDATE notes SET title = $1, text = $2, slug = $3, updated_at = NOW() WHERE id = $4 RETURNING {NOTE_COLUMNS}"
                ),
                &[&fields.title, &fields.text, &fields.slug, &id],
            )
            .await
            .map_err(|e| conflict_or(e, &fields.slug))?;

        Ok(row.as_ref().map(note_from_row))
    }

    async fn delete_note(&self, id: i64) -> Result<bool, RepositoryError> {
        let rows = self
            .client
            .lock()
            .await
            .execute("DELETE FROM notes WHERE id = $1", &[&id])
            .await?;

        Ok(rows == 1)
    }

    async fn slug_exists(
        &self,
        slug: &str,
        exclude: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let row = self
            .client
            .lock()
            .await
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM notes WHERE slug = $1 AND ($2::TEXT IS NULL OR slug <> $2))",
                &[&slug, &exclude],
            )
            .await?;

        Ok(row.get(0))
    }

    async fn count_notes(&self) -> Result<i64, RepositoryError> {
        let row = self
            .client
            .lock()
            .await
            .query_one("SELECT COUNT(*) FROM notes", &[])
            .await?;

        Ok(row.get(0))
    }
}
