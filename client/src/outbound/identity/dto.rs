//! DTOs for the identity endpoints.
//!
//! Backends disagree on the user shape: ids may be strings or numbers, the
//! record may be wrapped in `{ "user": ... }`, and a combined name may be
//! replaced by first/last parts in either camel or snake case. Everything is
//! decoded into these DTOs first and normalised into a domain [`User`] in one
//! pass.

use serde::{Deserialize, Serialize};

use crate::domain::{AccessToken, DisplayName, Email, RoleClaim, StoredSession, User, UserId};
use crate::outbound::wire::IdDto;

#[derive(Debug, Serialize)]
pub(super) struct LoginRequestDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginResponseDto {
    token: String,
    user: UserDto,
}

impl LoginResponseDto {
    pub(super) fn into_domain(self) -> Result<StoredSession, String> {
        let token = AccessToken::new(self.token).map_err(|error| error.to_string())?;
        Ok(StoredSession::new(token, self.user.into_domain()?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum WhoAmIResponseDto {
    Wrapped { user: UserDto },
    Bare(UserDto),
}

impl WhoAmIResponseDto {
    pub(super) fn into_domain(self) -> Result<User, String> {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user.into_domain(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UserDto {
    id: IdDto,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "firstName")]
    first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    last_name: Option<String>,
    email: String,
    role: String,
}

impl UserDto {
    pub(super) fn into_domain(self) -> Result<User, String> {
        let id = UserId::new(self.id.into_string()).map_err(|error| error.to_string())?;
        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => DisplayName::new(name),
            _ => DisplayName::from_parts(self.first_name.as_deref(), self.last_name.as_deref()),
        }
        .map_err(|error| format!("user {id} has no usable name: {error}"))?;
        let email = Email::new(self.email).map_err(|error| error.to_string())?;
        Ok(User::new(id, name, email, RoleClaim::from(self.role)))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for identity payload normalisation.
    use super::*;
    use crate::domain::Role;
    use rstest::rstest;

    fn decode_user(body: &str) -> Result<User, String> {
        serde_json::from_str::<WhoAmIResponseDto>(body)
            .map_err(|error| error.to_string())?
            .into_domain()
    }

    #[rstest]
    #[case::bare(r#"{"id":"u-1","name":"Ada Lovelace","email":"ada@example.com","role":"admin"}"#)]
    #[case::wrapped(r#"{"user":{"id":"u-1","name":"Ada Lovelace","email":"ada@example.com","role":"admin"}}"#)]
    #[case::camel_parts(r#"{"id":"u-1","firstName":"Ada","lastName":"Lovelace","email":"ada@example.com","role":"admin"}"#)]
    #[case::snake_parts(r#"{"id":"u-1","first_name":"Ada","last_name":"Lovelace","email":"ada@example.com","role":"ADMIN"}"#)]
    #[case::blank_name(r#"{"id":"u-1","name":"  ","firstName":"Ada","lastName":"Lovelace","email":"ada@example.com","role":"admin"}"#)]
    fn normalises_user_shapes(#[case] body: &str) {
        let user = decode_user(body).expect("user decodes");
        assert_eq!(user.id().as_ref(), "u-1");
        assert_eq!(user.name().as_ref(), "Ada Lovelace");
        assert_eq!(user.role().role(), Some(Role::Admin));
    }

    #[test]
    fn numeric_ids_become_strings() {
        let user = decode_user(r#"{"id":42,"name":"Cy","email":"cy@example.com","role":"contractor"}"#)
            .expect("user decodes");
        assert_eq!(user.id().as_ref(), "42");
    }

    #[test]
    fn unknown_roles_are_kept_verbatim() {
        let user = decode_user(r#"{"id":"9","name":"Eve","email":"eve@example.com","role":"auditor"}"#)
            .expect("user decodes");
        assert_eq!(user.role(), &RoleClaim::Unrecognized("auditor".to_owned()));
    }

    #[rstest]
    #[case::no_name(r#"{"id":"9","email":"eve@example.com","role":"admin"}"#)]
    #[case::bad_email(r#"{"id":"9","name":"Eve","email":"nope","role":"admin"}"#)]
    #[case::blank_id(r#"{"id":" ","name":"Eve","email":"eve@example.com","role":"admin"}"#)]
    #[case::missing_role(r#"{"id":"9","name":"Eve","email":"eve@example.com"}"#)]
    fn rejects_unusable_records(#[case] body: &str) {
        assert!(decode_user(body).is_err());
    }

    #[test]
    fn login_response_pairs_token_and_user() {
        let body = r#"{"token":"tok-1","user":{"id":1,"firstName":"Ada","email":"ada@example.com","role":"admin"}}"#;
        let session = serde_json::from_str::<LoginResponseDto>(body)
            .expect("login body decodes")
            .into_domain()
            .expect("session is valid");
        assert_eq!(session.token.expose(), "tok-1");
        assert_eq!(session.user.name().as_ref(), "Ada");
    }

    #[test]
    fn login_request_shape() {
        let request = LoginRequestDto {
            email: "ada@example.com",
            password: "secret",
        };
        insta::assert_json_snapshot!(request, @r#"
        {
          "email": "ada@example.com",
          "password": "secret"
        }
        "#);
    }
}
