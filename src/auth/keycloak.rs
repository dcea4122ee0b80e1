//! Keycloak OAuth2 client
//!
//! Two-step flow, both requests authenticated with the client id and secret:
//! 1. password grant (`scope=offline_access`) returns a refresh token
//! 2. refresh-token grant returns the short-lived access token

use super::{AuthError, AuthHeader};
use crate::config::KeycloakCredentials;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Fetches tokens from a Keycloak realm's token endpoint
pub struct KeycloakClient {
    http: reqwest::Client,
    credentials: KeycloakCredentials,
}

impl KeycloakClient {
    pub fn new(credentials: KeycloakCredentials, timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, credentials })
    }

    /// Run the full flow and build the bearer header
    pub async fn fetch_auth_header(&self) -> Result<AuthHeader, AuthError> {
        let refresh_token = self.refresh_token().await?;
        let access_token = self.access_token(&refresh_token).await?;
        info!(url = %self.credentials.url, "Acquired access token");
        Ok(AuthHeader::bearer(&access_token))
    }

    /// Exchange user credentials for an offline refresh token
    pub async fn refresh_token(&self) -> Result<String, AuthError> {
        let params = password_grant(&self.credentials);
        let response = self.request_token(&params).await?;
        debug!("Received refresh token");
        response.refresh_token.ok_or(AuthError::MissingToken("refresh_token"))
    }

    /// Exchange a refresh token for an access token
    pub async fn access_token(&self, refresh_token: &str) -> Result<String, AuthError> {
        let params = refresh_grant(refresh_token);
        let response = self.request_token(&params).await?;
        debug!("Received access token");
        response.access_token.ok_or(AuthError::MissingToken("access_token"))
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.credentials.url)
            .basic_auth(&self.credentials.id_client, Some(&self.credentials.id_secret))
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

fn password_grant(credentials: &KeycloakCredentials) -> Vec<(&'static str, &str)> {
    vec![
        ("grant_type", "password"),
        ("username", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
        ("scope", "offline_access"),
    ]
}

fn refresh_grant(refresh_token: &str) -> Vec<(&'static str, &str)> {
    vec![("grant_type", "refresh_token"), ("refresh_token", refresh_token)]
}
