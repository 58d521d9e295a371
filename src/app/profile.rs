//! Profile mutations: e-mail change and password change.

use thiserror::Error;

use crate::api::MihfApi;
use crate::domain::{ApiError, MihfError, PasswordChangeError, User};
use crate::session::SessionHandle;

const SPECIAL_CHARS: &str = "!@#$%^&*()_+=-";

/// Rating of a candidate password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    /// One point each for length of at least 12, an uppercase letter, a
    /// lowercase letter, a digit and a special character.
    ///
    /// # Examples
    ///
    /// ```
    /// use mihf::app::PasswordStrength;
    ///
    /// assert_eq!(PasswordStrength::evaluate("abc"), PasswordStrength::Weak);
    /// assert_eq!(PasswordStrength::evaluate("Abcdef12"), PasswordStrength::Medium);
    /// assert_eq!(PasswordStrength::evaluate("Abcdefgh123!"), PasswordStrength::Strong);
    /// ```
    #[must_use]
    pub fn evaluate(password: &str) -> Self {
        let checks = [
            password.chars().count() >= 12,
            password.chars().any(|c| c.is_ascii_uppercase()),
            password.chars().any(|c| c.is_ascii_lowercase()),
            password.chars().any(|c| c.is_ascii_digit()),
            password.chars().any(|c| SPECIAL_CHARS.contains(c)),
        ];
        match checks.iter().filter(|passed| **passed).count() {
            0..=2 => Self::Weak,
            3..=4 => Self::Medium,
            _ => Self::Strong,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Weak => "Weak",
            Self::Medium => "Medium",
            Self::Strong => "Strong",
        }
    }
}

impl std::fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure of the e-mail change.
#[derive(Debug, Error)]
pub enum EmailUpdateError {
    #[error("Enter a valid e-mail")]
    InvalidEmail,

    #[error("Session expired")]
    SessionExpired,

    #[error("Could not update e-mail")]
    Api(#[source] ApiError),

    #[error(transparent)]
    Session(#[from] MihfError),
}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

/// Message shown when the new password is rejected locally.
pub const WEAK_PASSWORD_MESSAGE: &str =
    "The password must mix upper and lower case letters with digits and be at least 8 characters long";

#[derive(Debug, Clone)]
pub struct ProfileActions {
    api: MihfApi,
    session: SessionHandle,
}

impl ProfileActions {
    #[must_use]
    pub const fn new(api: MihfApi, session: SessionHandle) -> Self {
        Self { api, session }
    }

    /// Changes the account e-mail and refreshes the cached profile.
    ///
    /// # Errors
    ///
    /// Local validation and a missing session are reported before any
    /// request; backend failures as [`EmailUpdateError::Api`].
    pub async fn update_email(&self, email: &str) -> Result<User, EmailUpdateError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(EmailUpdateError::InvalidEmail);
        }
        let token = self
            .session
            .token()
            .ok_or(EmailUpdateError::SessionExpired)?;

        let dto = self
            .api
            .update_email(&token, email)
            .await
            .map_err(EmailUpdateError::Api)?;
        let user = User::from(dto);

        if !self.session.update_user(&token, user.clone()).await? {
            tracing::warn!("session changed while the e-mail change was in flight");
        }
        Ok(user)
    }

    /// Changes the password. On success the session is closed and the user
    /// has to sign in again.
    ///
    /// # Errors
    ///
    /// [`PasswordChangeError::Validation`] when the old password is empty,
    /// the confirmation differs, or the new password is weak.
    /// [`PasswordChangeError::WrongOldPassword`] when the backend rejects
    /// the current password.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), PasswordChangeError> {
        if old_password.is_empty()
            || new_password != confirmation
            || PasswordStrength::evaluate(new_password) < PasswordStrength::Medium
        {
            return Err(PasswordChangeError::Validation(
                WEAK_PASSWORD_MESSAGE.to_string(),
            ));
        }
        let token = self
            .session
            .token()
            .ok_or(PasswordChangeError::SessionExpired)?;

        self.api
            .change_password(&token, old_password, new_password)
            .await
            .map_err(PasswordChangeError::from)?;

        tracing::info!("password changed, signing out");
        if let Err(e) = self.session.logout().await {
            tracing::warn!(error = %e, "could not sign out after password change");
        }
        Ok(())
    }
}
