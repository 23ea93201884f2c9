//! Identity outbound adapters.
//!
//! A thin HTTP implementation of the `IdentityApi` port.

mod dto;
mod http_identity_api;

pub use http_identity_api::{HttpIdentityApi, IdentityClientBuildError};
