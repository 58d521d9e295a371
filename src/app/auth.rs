//! Sign-in form and flow.

use thiserror::Error;

use crate::api::MihfApi;
use crate::domain::{ApiError, MihfError, User};
use crate::session::{LoginOutcome, SessionHandle};

pub const PHONE_DIGITS: usize = 11;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Why a sign-in attempt failed, worded for the login screen.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Enter an 11-digit phone number and a password of at least 6 characters")]
    InvalidForm,

    #[error("{}", api_message(.0))]
    Api(ApiError),

    #[error(transparent)]
    Session(#[from] MihfError),
}

fn api_message(err: &ApiError) -> String {
    match err {
        ApiError::InvalidCredentials | ApiError::NoConnection | ApiError::ServerStatus(_) => {
            err.to_string()
        }
        ApiError::DecodingFailure | ApiError::NetworkError(_) | ApiError::Unknown => {
            "Unknown error. Please try again later".to_string()
        }
    }
}

/// Keeps only the digits of a phone number as typed.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Raw contents of the sign-in form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub phone: String,
    pub password: String,
}

impl LoginForm {
    #[must_use]
    pub fn new(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn digits(&self) -> String {
        normalize_phone(&self.phone)
    }

    #[must_use]
    pub fn is_phone_valid(&self) -> bool {
        self.digits().len() == PHONE_DIGITS
    }

    #[must_use]
    pub fn is_password_valid(&self) -> bool {
        self.password.chars().count() >= MIN_PASSWORD_LEN
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.is_phone_valid() && self.is_password_valid()
    }
}

/// Exchanges credentials for a session.
#[derive(Debug, Clone)]
pub struct AuthFlow {
    api: MihfApi,
    session: SessionHandle,
}

impl AuthFlow {
    #[must_use]
    pub const fn new(api: MihfApi, session: SessionHandle) -> Self {
        Self { api, session }
    }

    /// Validates the form locally, then signs in.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidForm`] without touching the network, otherwise the
    /// classified backend failure.
    pub async fn login(&self, form: &LoginForm) -> Result<LoginOutcome, AuthError> {
        if !form.can_submit() {
            return Err(AuthError::InvalidForm);
        }

        let response = self
            .api
            .login(&form.digits(), &form.password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "sign-in failed");
                AuthError::Api(e)
            })?;

        let user = User::from(response.user);
        tracing::info!(user_id = %user.id, "signed in");
        Ok(self.session.login(response.token, user).await?)
    }
}
