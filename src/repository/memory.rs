use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use std::collections::BTreeMap;

use super::{Repository, RepositoryError};
use crate::models::{Note, NoteFields, User};

#[derive(Default)]
struct State {
    users: BTreeMap<i64, User>,
    notes: BTreeMap<i64, Note>,
    next_user_id: i64,
    next_note_id: i64,
}

impl State {
    fn slug_taken(&self, slug: &str, except_id: Option<i64>) -> bool {
        self.notes
            .values()
            .any(|note| note.slug == slug && Some(note.id) != except_id)
    }
}

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn migrate(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|user| user.username == username) {
            return Err(RepositoryError::Conflict(username.to_string()));
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_note(
        &self,
        author_id: i64,
        fields: NoteFields,
    ) -> Result<Note, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.slug_taken(&fields.slug, None) {
            return Err(RepositoryError::Conflict(fields.slug));
        }

        state.next_note_id += 1;
        let now = Utc::now();
        let note = Note {
            id: state.next_note_id,
            title: fields.title,
            text: fields.text,
            slug: fields.slug,
            author_id,
            created_at: now,
            updated_at: now,
        };
        state.notes.insert(note.id, note.clone());

        Ok(note)
    }

    async fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .notes
            .values()
            .find(|note| note.slug == slug)
            .cloned())
    }

    async fn list_notes_by_author(&self, author_id: i64) -> Result<Vec<Note>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .notes
            .values()
            .filter(|note| note.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn update_note(
        &self,
        id: i64,
        fields: NoteFields,
    ) -> Result<Option<Note>, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.slug_taken(&fields.slug, Some(id)) {
            return Err(RepositoryError::Conflict(fields.slug));
        }

        Ok(state.notes.get_mut(&id).map(|note| {
            note.title = fields.title;
            note.text = fields.text;
            note.slug = fields.slug;
            note.updated_at = Utc::now();
            note.clone()
        }))
    }

    async fn delete_note(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.state.lock().await.notes.remove(&id).is_some())
    }

    async fn slug_exists(
        &self,
        slug: &str,
        exclude: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .notes
            .values()
            .any(|note| note.slug == slug && Some(note.slug.as_str()) != exclude))
    }

    async fn count_notes(&self) -> Result<i64, RepositoryError> {
        let count = self.state.lock().await.notes.len();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str, slug: &str) -> NoteFields {
        NoteFields {
            title: title.to_string(),
            text: "Текст заметки".to_string(),
            slug: slug.to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected_without_writing() {
        let repo = MemoryRepository::new();
        repo.create_note(1, fields("Первая", "test-note")).await.unwrap();

        let err = repo
            .create_note(2, fields("Вторая", "test-note"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(slug) if slug == "test-note"));
        assert_eq!(repo.count_notes().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let repo = MemoryRepository::new();
        repo.create_user("author", "hash").await.unwrap();

        assert!(matches!(
            repo.create_user("author", "other").await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn list_is_filtered_by_author() {
        let repo = MemoryRepository::new();
        repo.create_note(1, fields("a", "a")).await.unwrap();
        repo.create_note(2, fields("b", "b")).await.unwrap();
        repo.create_note(1, fields("c", "c")).await.unwrap();

        let slugs: Vec<String> = repo
            .list_notes_by_author(1)
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.slug)
            .collect();

        assert_eq!(slugs, ["a", "c"]);
    }

    #[tokio::test]
    async fn slug_exists_honours_exclusion() {
        let repo = MemoryRepository::new();
        repo.create_note(1, fields("a", "test-note")).await.unwrap();

        assert!(repo.slug_exists("test-note", None).await.unwrap());
        assert!(!repo.slug_exists("test-note", Some("test-note")).await.unwrap());
        assert!(repo.slug_exists("test-note", Some("other")).await.unwrap());
        assert!(!repo.slug_exists("missing", None).await.unwrap());
    }

    #[tokio::test]
    async fn update_keeps_own_slug_but_refuses_foreign_one() {
        let repo = MemoryRepository::new();
        let first = repo.create_note(1, fields("a", "first")).await.unwrap();
        repo.create_note(1, fields("b", "second")).await.unwrap();

        let updated = repo
            .update_note(first.id, fields("a2", "first"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "a2");

        assert!(matches!(
            repo.update_note(first.id, fields("a3", "second")).await,
            Err(RepositoryError::Conflict(_))
        ));
        let stored = repo.get_note_by_slug("first").await.unwrap().unwrap();
        assert_eq!(stored.title, "a2");
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_went_away() {
        let repo = MemoryRepository::new();
        let note = repo.create_note(1, fields("a", "a")).await.unwrap();

        assert!(repo.delete_note(note.id).await.unwrap());
        assert!(!repo.delete_note(note.id).await.unwrap());
        assert_eq!(repo.count_notes().await.unwrap(), 0);
    }
}
