//! Per-note access decisions.

use crate::models::{Note, User};

/// Identity behind the current request.
#[derive(Debug, Clone)]
pub enum Requester {
    Anonymous,
    User(User),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Create,
    View,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    /// Anonymous requester; the client is sent to the login page.
    #[error("login required")]
    LoginRequired,

    /// Missing note or a note owned by someone else. The two are not told apart.
    #[error("note not found")]
    NotFound,
}

pub const fn require_login(requester: &Requester) -> Result<&User, Denial> {
    match requester {
        Requester::User(user) => Ok(user),
        Requester::Anonymous => Err(Denial::LoginRequired),
    }
}

/// Decides whether `requester` may perform `action` on `note`.
///
/// `List` and `Create` only need a logged-in user. The per-note actions also
/// need the note to exist and to be authored by the requester.
pub fn authorize<'a>(
    requester: &'a Requester,
    note: Option<&Note>,
    action: Action,
) -> Result<&'a User, Denial> {
    let user = require_login(requester)?;

    match action {
        Action::List | Action::Create => Ok(user),
        Action::View | Action::Edit | Action::Delete => match note {
            Some(note) if note.author_id == user.id => Ok(user),
            _ => Err(Denial::NotFound),
        },
    }
}
