use crate::{
    dto::{FormErrors, NoteForm, NoteResponse},
    guard::{self, Action, Denial, Requester},
    models::{Note, NoteFields},
    repository::{Repository, RepositoryError},
    slug::{self, SlugError},
};

use std::sync::Arc;

pub const MAX_TITLE_LENGTH: usize = 100;
pub const REQUIRED: &str = "Обязательное поле.";

#[derive(Debug, thiserror::Error)]
pub enum NoteServiceError {
    #[error(transparent)]
    Denied(#[from] Denial),

    #[error("Submitted note is invalid")]
    Validation(FormErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct NoteService {
    repo: Arc<dyn Repository>,
}

impl NoteService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Loads the note stored under `slug` if `requester` may perform `action` on it.
    async fn authorized_note(
        &self,
        requester: &Requester,
        slug: &str,
        action: Action,
    ) -> Result<Note, NoteServiceError> {
        guard::require_login(requester)?;
        let note = self.repo.get_note_by_slug(slug).await?;
        guard::authorize(requester, note.as_ref(), action)?;
        note.ok_or_else(|| Denial::NotFound.into())
    }

    /// Checks a submission and resolves its slug. `current_slug` is set on edits.
    async fn validate(
        &self,
        form: &NoteForm,
        current_slug: Option<&str>,
    ) -> Result<NoteFields, NoteServiceError> {
        let mut errors = FormErrors::default();
        let title = form.title.trim();
        let text = form.text.trim();

        if title.is_empty() {
            errors.add("title", REQUIRED);
        } else if title.chars().count() > MAX_TITLE_LENGTH {
            errors.add(
                "title",
                format!(
                    "Убедитесь, что это значение содержит не более {MAX_TITLE_LENGTH} символов (сейчас {}).",
                    title.chars().count()
                ),
            );
        }

        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let mut resolved = None;
        if !title.is_empty() || !form.slug.trim().is_empty() {
            match slug::resolve_slug(self.repo.as_ref(), title, &form.slug, current_slug).await {
                Ok(slug) => resolved = Some(slug),
                Err(SlugError::Repository(e)) => return Err(e.into()),
                Err(e) => errors.add("slug", e.to_string()),
            }
        }

        match resolved {
            Some(slug) if errors.is_empty() => Ok(NoteFields {
                title: title.to_string(),
                text: text.to_string(),
                slug,
            }),
            _ => Err(NoteServiceError::Validation(errors)),
        }
    }

    pub async fn list_notes(
        &self,
        requester: &Requester,
    ) -> Result<Vec<NoteResponse>, NoteServiceError> {
        let user = guard::authorize(requester, None, Action::List)?;
        let notes = self.repo.list_notes_by_author(user.id).await?;

        Ok(notes.into_iter().map(NoteResponse::from).collect())
    }

    pub async fn get_note(
        &self,
        requester: &Requester,
        slug: &str,
    ) -> Result<NoteResponse, NoteServiceError> {
        self.authorized_note(requester, slug, Action::View)
            .await
            .map(NoteResponse::from)
    }

    /// Current values of a note, for pre-filling the edit form.
    pub async fn edit_form(
        &self,
        requester: &Requester,
        slug: &str,
    ) -> Result<NoteForm, NoteServiceError> {
        self.authorized_note(requester, slug, Action::Edit)
            .await
            .map(|note| NoteForm::from(&note))
    }

    /// Note shown on the delete confirmation page.
    pub async fn delete_preview(
        &self,
        requester: &Requester,
        slug: &str,
    ) -> Result<NoteResponse, NoteServiceError> {
        self.authorized_note(requester, slug, Action::Delete)
            .await
            .map(NoteResponse::from)
    }

    pub async fn create_note(
        &self,
        requester: &Requester,
        form: &NoteForm,
    ) -> Result<NoteResponse, NoteServiceError> {
        let author = guard::authorize(requester, None, Action::Create)?;
        let fields = self.validate(form, None).await?;

        let note = self
            .repo
            .create_note(author.id, fields)
            .await
            .map_err(slug_conflict)?;

        tracing::info!("Note '{}' created by user {}", note.slug, author.id);

        Ok(note.into())
    }

    pub async fn update_note(
        &self,
        requester: &Requester,
        slug: &str,
        form: &NoteForm,
    ) -> Result<NoteResponse, NoteServiceError> {
        let note = self.authorized_note(requester, slug, Action::Edit).await?;
        let fields = self.validate(form, Some(&note.slug)).await?;

        let updated = self
            .repo
            .update_note(note.id, fields)
            .await
            .map_err(slug_conflict)?
            .ok_or(Denial::NotFound)?;

        tracing::info!("Note '{}' updated, now at '{}'", slug, updated.slug);

        Ok(updated.into())
    }

    pub async fn delete_note(
        &self,
        requester: &Requester,
        slug: &str,
    ) -> Result<(), NoteServiceError> {
        let note = self.authorized_note(requester, slug, Action::Delete).await?;

        if !self.repo.delete_note(note.id).await? {
            return Err(Denial::NotFound.into());
        }

        tracing::info!("Note '{}' deleted by user {}", note.slug, note.author_id);

        Ok(())
    }
}

/// A write that lost a race on the slug reports the same error as the pre-check.
fn slug_conflict(e: RepositoryError) -> NoteServiceError {
    match e {
        RepositoryError::Conflict(slug) => {
            let mut errors = FormErrors::default();
            errors.add("slug", SlugError::Taken(slug).to_string());
            NoteServiceError::Validation(errors)
        }
        other => other.into(),
    }
}
