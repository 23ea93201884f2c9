//! Authenticated principal as cached by the client.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::role::RoleClaim;

/// Validation errors returned by the user constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    EmptyDisplayName,
    DisplayNameTooLong { max: usize },
    EmptyEmail,
    InvalidEmail,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::EmptyDisplayName => write!(f, "display name must not be empty"),
            Self::DisplayNameTooLong { max } => {
                write!(f, "display name must be at most {max} characters")
            }
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "email must contain a local part and a domain"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Opaque user identifier issued by the identity service.
///
/// The apps talk to several backends; some hand out numeric ids and some
/// hand out document ids, so the value is kept as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 120;

/// Human readable name shown in headers and menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a [`DisplayName`].
    pub fn new(display_name: impl Into<String>) -> Result<Self, UserValidationError> {
        let display_name = display_name.into();
        let trimmed = display_name.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX {
            return Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Synthesise a display name from first/last name parts.
    ///
    /// Blank parts are skipped; at least one part must be non-blank.
    ///
    /// # Examples
    /// ```
    /// use portal_session::domain::DisplayName;
    ///
    /// let name = DisplayName::from_parts(Some("Ada"), Some("Lovelace")).unwrap();
    /// assert_eq!(name.as_ref(), "Ada Lovelace");
    /// let first_only = DisplayName::from_parts(Some("Ada"), None).unwrap();
    /// assert_eq!(first_only.as_ref(), "Ada");
    /// ```
    pub fn from_parts(
        first: Option<&str>,
        last: Option<&str>,
    ) -> Result<Self, UserValidationError> {
        let joined = [first, last]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self::new(joined)
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Contact email of the principal.
///
/// Only the shape is checked (`local@domain`); the server owns the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`].
    pub fn new(email: impl Into<String>) -> Result<Self, UserValidationError> {
        let email = email.into();
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        match trimmed.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(trimmed.to_owned()))
            }
            _ => Err(UserValidationError::InvalidEmail),
        }
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Cached snapshot of the authenticated principal.
///
/// ## Invariants
/// - The record is trusted for UI dispatch only. Authorisation that matters is
///   re-checked by the server on every data request.
/// - `role` never changes for the lifetime of a session.
///
/// The serialised form is the one written to the session file:
/// `{ "id", "name", "email", "role" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    id: UserId,
    name: DisplayName,
    email: Email,
    role: RoleClaim,
}

impl User {
    /// Build a new [`User`] from validated components.
    pub const fn new(id: UserId, name: DisplayName, email: Email, role: RoleClaim) -> Self {
        Self {
            id,
            name,
            email,
            role,
        }
    }

    /// Fallible constructor from raw strings.
    ///
    /// # Examples
    /// ```
    /// use portal_session::domain::{Role, User};
    ///
    /// let user = User::try_from_strings("42", "Ada Lovelace", "ada@example.com", "admin").unwrap();
    /// assert_eq!(user.role().role(), Some(Role::Admin));
    /// ```
    pub fn try_from_strings(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self::new(
            UserId::new(id)?,
            DisplayName::new(name)?,
            Email::new(email)?,
            RoleClaim::from(role.into()),
        ))
    }

    /// Stable user identifier.
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Name shown in the UI.
    pub const fn name(&self) -> &DisplayName {
        &self.name
    }

    /// Contact email.
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// Role claim as reported by the server.
    pub const fn role(&self) -> &RoleClaim {
        &self.role
    }
}

#[cfg(test)]
mod tests {
    //! Tests for the cached user model.
    use super::*;
    use crate::domain::Role;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", UserValidationError::EmptyId)]
    #[case("   ", UserValidationError::EmptyId)]
    fn rejects_blank_ids(#[case] raw: &str, #[case] expected: UserValidationError) {
        assert_eq!(UserId::new(raw), Err(expected));
    }

    #[rstest]
    #[case(Some("Ada"), Some("Lovelace"), "Ada Lovelace")]
    #[case(Some("  Ada "), None, "Ada")]
    #[case(None, Some("Lovelace"), "Lovelace")]
    #[case(Some(""), Some("Lovelace"), "Lovelace")]
    fn synthesises_names_from_parts(
        #[case] first: Option<&str>,
        #[case] last: Option<&str>,
        #[case] expected: &str,
    ) {
        let name = DisplayName::from_parts(first, last).expect("parts yield a name");
        assert_eq!(name.as_ref(), expected);
    }

    #[test]
    fn rejects_empty_name_parts() {
        assert_eq!(
            DisplayName::from_parts(Some(" "), None),
            Err(UserValidationError::EmptyDisplayName)
        );
    }

    #[test]
    fn rejects_overlong_display_names() {
        let raw = "a".repeat(DISPLAY_NAME_MAX + 1);
        assert_eq!(
            DisplayName::new(raw),
            Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX
            })
        );
    }

    #[rstest]
    #[case("ada@example.com", true)]
    #[case("@example.com", false)]
    #[case("ada@", false)]
    #[case("ada", false)]
    fn validates_email_shape(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(Email::new(raw).is_ok(), valid);
    }

    #[test]
    fn round_trips_through_the_session_file_shape() {
        let user = User::try_from_strings("7", "Grace Hopper", "grace@example.com", "coordinator")
            .expect("valid user");
        let value = serde_json::to_value(&user).expect("serialises user");
        assert_eq!(
            value,
            json!({
                "id": "7",
                "name": "Grace Hopper",
                "email": "grace@example.com",
                "role": "coordinator"
            })
        );
        let decoded: User = serde_json::from_value(value).expect("decodes user");
        assert_eq!(decoded.role().role(), Some(Role::Coordinator));
    }

    #[test]
    fn rejects_corrupt_cached_records() {
        let result = serde_json::from_value::<User>(json!({
            "id": "",
            "name": "Grace",
            "email": "grace@example.com",
            "role": "admin"
        }));
        assert!(result.is_err(), "blank ids must not decode");
    }
}
