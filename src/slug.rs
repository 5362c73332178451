//! Slug derivation and uniqueness checks for notes.

use crate::repository::{Repository, RepositoryError};

pub const MAX_SLUG_LENGTH: usize = 100;

/// Appended to a slug that is already taken.
pub const WARNING: &str = " - такой slug уже существует, придумайте уникальное значение!";

#[derive(Debug, thiserror::Error)]
pub enum SlugError {
    #[error("{0}{}", WARNING)]
    Taken(String),

    #[error(
        "Значение должно состоять только из латинских букв, цифр, знаков подчеркивания или дефиса."
    )]
    Invalid,

    #[error("Убедитесь, что это значение содержит не более {max} символов (сейчас {len}).")]
    TooLong { max: usize, len: usize },

    #[error("Не удалось сформировать slug из заголовка, укажите его вручную.")]
    Underivable,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Latin spelling of a lowercase Cyrillic letter.
fn romanize(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' | 'ґ' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'є' => "ye",
        'ж' => "zh",
        'з' => "z",
        'и' | 'і' => "i",
        'ї' => "yi",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Turns a title into a lowercase, hyphen-separated ASCII token sequence.
///
/// Cyrillic is romanized, other letters without a Latin spelling and quote
/// marks are dropped, and every other run of non-alphanumerics becomes a
/// single hyphen. The result is cut to [`MAX_SLUG_LENGTH`].
pub fn slugify(title: &str) -> String {
    fn push(slug: &mut String, part: &str, separator: &mut bool) {
        if part.is_empty() {
            return;
        }
        if *separator && !slug.is_empty() {
            slug.push('-');
        }
        *separator = false;
        slug.push_str(part);
    }

    let mut slug = String::with_capacity(title.len());
    let mut separator = false;

    for ch in title.replace('&', " and ").chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            push(&mut slug, ch.encode_utf8(&mut [0; 4]), &mut separator);
        } else if let Some(latin) = romanize(ch) {
            push(&mut slug, latin, &mut separator);
        } else if ch.is_alphanumeric() || matches!(ch, '\'' | '"' | '’' | '«' | '»') {
            continue;
        } else {
            separator = true;
        }
    }

    slug.truncate(MAX_SLUG_LENGTH);
    slug.trim_end_matches('-').to_string()
}

fn validate_requested(slug: &str) -> Result<(), SlugError> {
    let len = slug.chars().count();
    if len > MAX_SLUG_LENGTH {
        return Err(SlugError::TooLong {
            max: MAX_SLUG_LENGTH,
            len,
        });
    }

    if slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(SlugError::Invalid)
    }
}

/// Picks the slug a note will be stored under.
///
/// An empty `requested_slug` is derived from `title`; anything else is taken
/// verbatim. The slug must not belong to any note other than the one currently
/// stored under `existing_slug_for_update`.
pub async fn resolve_slug(
    repo: &dyn Repository,
    title: &str,
    requested_slug: &str,
    existing_slug_for_update: Option<&str>,
) -> Result<String, SlugError> {
    let requested_slug = requested_slug.trim();

    let slug = if requested_slug.is_empty() {
        let derived = slugify(title);
        if derived.is_empty() {
            return Err(SlugError::Underivable);
        }
        derived
    } else {
        validate_requested(requested_slug)?;
        requested_slug.to_string()
    };

    if repo.slug_exists(&slug, existing_slug_for_update).await? {
        return Err(SlugError::Taken(slug));
    }

    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::NoteFields, repository::MemoryRepository};

    async fn repo_with(slug: &str) -> MemoryRepository {
        let repo = MemoryRepository::new();
        repo.create_note(
            1,
            NoteFields {
                title: "Заголовок".to_string(),
                text: "Текст заметки".to_string(),
                slug: slug.to_string(),
            },
        )
        .await
        .unwrap();
        repo
    }

    #[test]
    fn romanizes_cyrillic_titles() {
        assert_eq!(slugify("Новая заметка"), "novaya-zametka");
        assert_eq!(slugify("Тестовая заметка"), "testovaya-zametka");
        assert_eq!(slugify("Щука и ёж"), "schuka-i-yozh");
        assert_eq!(slugify("Подъезд, объём"), "podezd-obyom");
    }

    #[test]
    fn collapses_and_trims_separators() {
        assert_eq!(slugify("  Hello,   World!!  "), "hello-world");
        assert_eq!(slugify("--a__b--"), "a-b");
        assert_eq!(slugify("Notes 2024: план"), "notes-2024-plan");
        assert_eq!(slugify("Tom & Jerry"), "tom-and-jerry");
        assert_eq!(slugify("don't"), "dont");
    }

    #[test]
    fn drops_letters_without_latin_spelling() {
        assert_eq!(slugify("日本 notes"), "notes");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn truncates_long_titles() {
        let title = "слово ".repeat(40);
        let slug = slugify(&title);

        assert!(slug.len() <= MAX_SLUG_LENGTH);
        assert!(slug.starts_with("slovo-slovo"));
        assert!(!slug.ends_with('-'));
    }

    #[tokio::test]
    async fn empty_request_derives_from_title() {
        let repo = MemoryRepository::new();
        let slug = resolve_slug(&repo, "Новая заметка", "", None).await.unwrap();
        assert_eq!(slug, "novaya-zametka");

        let slug = resolve_slug(&repo, "Новая заметка", "   ", None)
            .await
            .unwrap();
        assert_eq!(slug, "novaya-zametka");
    }

    #[tokio::test]
    async fn requested_slug_is_used_verbatim() {
        let repo = MemoryRepository::new();
        let slug = resolve_slug(&repo, "Новая заметка", "test_slug", None)
            .await
            .unwrap();
        assert_eq!(slug, "test_slug");
    }

    #[tokio::test]
    async fn taken_slug_reports_warning() {
        let repo = repo_with("test-note").await;
        let err = resolve_slug(&repo, "Что угодно", "test-note", None)
            .await
            .unwrap_err();

        assert!(matches!(err, SlugError::Taken(ref slug) if slug == "test-note"));
        assert_eq!(
            err.to_string(),
            "test-note - такой slug уже существует, придумайте уникальное значение!"
        );
    }

    #[tokio::test]
    async fn derived_slug_is_checked_too() {
        let repo = repo_with("novaya-zametka").await;
        let err = resolve_slug(&repo, "Новая заметка", "", None)
            .await
            .unwrap_err();

        assert!(matches!(err, SlugError::Taken(ref slug) if slug == "novaya-zametka"));
    }

    #[tokio::test]
    async fn edited_note_does_not_collide_with_itself() {
        let repo = repo_with("test-note").await;

        let slug = resolve_slug(&repo, "Заголовок", "test-note", Some("test-note"))
            .await
            .unwrap();
        assert_eq!(slug, "test-note");

        assert!(matches!(
            resolve_slug(&repo, "Заголовок", "test-note", Some("another")).await,
            Err(SlugError::Taken(_))
        ));
    }

    #[tokio::test]
    async fn rejects_malformed_or_underivable_slugs() {
        let repo = MemoryRepository::new();

        assert!(matches!(
            resolve_slug(&repo, "title", "with space", None).await,
            Err(SlugError::Invalid)
        ));
        assert!(matches!(
            resolve_slug(&repo, "title", "заметка", None).await,
            Err(SlugError::Invalid)
        ));
        assert!(matches!(
            resolve_slug(&repo, "title", &"a".repeat(101), None).await,
            Err(SlugError::TooLong { max: 100, len: 101 })
        ));
        assert!(matches!(
            resolve_slug(&repo, "???", "", None).await,
            Err(SlugError::Underivable)
        ));
    }
}
