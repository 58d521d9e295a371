//! Authenticated user profile.
//!
//! [`UserDto`] is the shape the backend sends in login and profile responses;
//! [`User`] is what the session owns and caches locally. The cache format is
//! the serde form of `User` with the date of birth as an ISO-8601 calendar date.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Role alias that unlocks the referee desk.
pub const REFEREE_ALIAS: &str = "REFEREE";

/// A named role granted to a user.
///
/// `alias` is the stable identifier used for authorization checks; `name` is
/// for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub alias: String,
}

/// User profile as received from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// The signed-in user, owned by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    /// Returns `true` if any role carries `alias`, ignoring ASCII case.
    #[must_use]
    pub fn has_role(&self, alias: &str) -> bool {
        self.roles
            .iter()
            .any(|role| role.alias.eq_ignore_ascii_case(alias))
    }

    #[must_use]
    pub fn is_referee(&self) -> bool {
        self.has_role(REFEREE_ALIAS)
    }

    /// Short name for greetings.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.first_name
    }

    /// Last, first and middle name joined by spaces, skipping empty parts.
    ///
    /// # Examples
    ///
    /// ```
    /// use mihf::domain::User;
    ///
    /// let user = User {
    ///     id: "1".into(),
    ///     first_name: "Ivan".into(),
    ///     last_name: "Petrov".into(),
    ///     middle_name: None,
    ///     date_of_birth: None,
    ///     email: None,
    ///     phone: "79101234567".into(),
    ///     roles: vec![],
    /// };
    /// assert_eq!(user.full_name(), "Petrov Ivan");
    /// ```
    #[must_use]
    pub fn full_name(&self) -> String {
        [
            Some(self.last_name.as_str()),
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        let date_of_birth = dto.date_of_birth.as_deref().and_then(parse_calendar_date);
        Self {
            id: dto.id,
            first_name: dto.first_name,
            last_name: dto.last_name,
            middle_name: dto.middle_name,
            date_of_birth,
            email: dto.email,
            phone: dto.phone,
            roles: dto.roles,
        }
    }
}

/// Parses either a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
///
/// Unparseable input yields `None`; a malformed birthday never fails a login.
#[must_use]
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}
