//! Bearer token acquisition for the observation endpoints
//!
//! A single access token is fetched from Keycloak at startup and shared,
//! read-only, by every outbound request for the lifetime of the process.

mod keycloak;

pub use keycloak::KeycloakClient;

use std::fmt;
use thiserror::Error;

/// Errors that can occur while acquiring a token
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token response has no {0}")]
    MissingToken(&'static str),
}

/// The `Authorization` header presented with every observation
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthHeader {
    value: Option<String>,
}

impl AuthHeader {
    /// Header carrying a bearer token
    pub fn bearer(token: &str) -> Self {
        Self {
            value: Some(format!("Bearer {}", token)),
        }
    }

    /// No authorization, used when no OAuth credentials are configured
    pub fn none() -> Self {
        Self::default()
    }

    /// Header value, if any
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(_) => write!(f, "AuthHeader(Bearer ***)"),
            None => write!(f, "AuthHeader(none)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let header = AuthHeader::bearer("abc.def");
        assert_eq!(header.value(), Some("Bearer abc.def"));
        assert_eq!(format!("{:?}", header), "AuthHeader(Bearer ***)");
    }

    #[test]
    fn test_empty_header() {
        assert_eq!(AuthHeader::none().value(), None);
    }
}
