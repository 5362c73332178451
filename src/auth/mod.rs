pub mod password;
pub mod session;

pub use session::SESSION_USER_ID_KEY;

use std::sync::Arc;

use crate::{
    dto::{FormErrors, LoginForm, NON_FIELD_ERRORS, SignupForm},
    guard::Requester,
    models::User,
    repository::{Repository, RepositoryError},
    service::REQUIRED,
};

pub const MAX_USERNAME_LENGTH: usize = 150;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Submitted credentials are invalid")]
    Validation(FormErrors),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] argon2::password_hash::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn single_error(field: &str, message: &str) -> AuthError {
    let mut errors = FormErrors::default();
    errors.add(field, message);
    AuthError::Validation(errors)
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<User, AuthError> {
        let mut errors = FormErrors::default();
        let username = form.username.trim();

        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > MAX_USERNAME_LENGTH {
            errors.add(
                "username",
                format!(
                    "Убедитесь, что это значение содержит не более {MAX_USERNAME_LENGTH} символов."
                ),
            );
        }

        if form.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if form.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if form.password1 != form.password2 {
            errors.add("password2", "Введенные пароли не совпадают.");
        }

        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let hash = password::hash_password(&form.password1)?;
        let user = match self.repo.create_user(username, &hash).await {
            Ok(user) => user,
            Err(RepositoryError::Conflict(_)) => {
                return Err(single_error(
                    "username",
                    "Пользователь с таким именем уже существует.",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("User '{}' signed up with id {}", user.username, user.id);

        Ok(user)
    }

    pub async fn login(&self, form: &LoginForm) -> Result<User, AuthError> {
        let rejected = || {
            single_error(
                NON_FIELD_ERRORS,
                "Пожалуйста, введите правильные имя пользователя и пароль. Оба поля могут быть чувствительны к регистру.",
            )
        };

        let Some(user) = self.repo.get_user_by_username(form.username.trim()).await? else {
            return Err(rejected());
        };

        if !password::verify_password(&form.password, &user.password_hash)? {
            return Err(rejected());
        }

        Ok(user)
    }

    /// Resolves the user id stored in a session. Stale ids become anonymous.
    pub async fn requester(&self, user_id: Option<i64>) -> Result<Requester, RepositoryError> {
        let Some(user_id) = user_id else {
            return Ok(Requester::Anonymous);
        };

        Ok(self
            .repo
            .get_user(user_id)
            .await?
            .map_or(Requester::Anonymous, Requester::User))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryRepository::new()))
    }

    fn signup_form(username: &str, password1: &str, password2: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            password1: password1.to_string(),
            password2: password2.to_string(),
        }
    }

    fn login_form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let users = service();
        let created = users
            .signup(&signup_form("author", "s3cret-pass", "s3cret-pass"))
            .await
            .unwrap();

        let logged_in = users
            .login(&login_form("author", "s3cret-pass"))
            .await
            .unwrap();
        assert_eq!(logged_in.id, created.id);

        let err = users.login(&login_form("author", "wrong")).await.unwrap_err();
        assert!(
            matches!(err, AuthError::Validation(ref errors) if errors.field(NON_FIELD_ERRORS).len() == 1)
        );
    }

    #[tokio::test]
    async fn signup_validates_fields() {
        let users = service();
        let err = users
            .signup(&signup_form("", "one", "two"))
            .await
            .unwrap_err();

        let AuthError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(errors.field("username"), [REQUIRED]);
        assert_eq!(errors.field("password2"), ["Введенные пароли не совпадают."]);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_field_error() {
        let users = service();
        users
            .signup(&signup_form("author", "pass-one", "pass-one"))
            .await
            .unwrap();

        let err = users
            .signup(&signup_form("author", "pass-two", "pass-two"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthError::Validation(ref errors) if errors.field("username").len() == 1)
        );
    }

    #[tokio::test]
    async fn unknown_session_user_is_anonymous() {
        let users = service();

        assert!(matches!(
            users.requester(None).await.unwrap(),
            Requester::Anonymous
        ));
        assert!(matches!(
            users.requester(Some(42)).await.unwrap(),
            Requester::Anonymous
        ));
    }
}
