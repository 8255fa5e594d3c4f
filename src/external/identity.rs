use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::GoogleConfig;

const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// OAuth2 identity provider used for single sign-on and for minting
/// short-lived access tokens from stored refresh tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, IdentityError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<IdentityProfile, IdentityError>;

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, IdentityError>;
}

pub struct GoogleIdentity {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
}

impl GoogleIdentity {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            token_url: config.token_url.clone(),
        }
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<GoogleTokenResponse, IdentityError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = resp.status();
        let body: GoogleTokenResponse = resp
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        if !status.is_success() {
            let reason = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| status.to_string());
            return Err(IdentityError::BadResponse(reason));
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    name: Option<String>,
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, IdentityError> {
        let body = self
            .post_token_form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let access_token = body
            .access_token
            .ok_or_else(|| IdentityError::BadResponse("no access_token in token response".into()))?;
        Ok(TokenGrant {
            access_token,
            refresh_token: body.refresh_token,
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<IdentityProfile, IdentityError> {
        let resp = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(IdentityError::BadResponse(format!("userinfo returned {}", resp.status())));
        }

        let info: GoogleUserInfo = resp
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        let email = info
            .email
            .ok_or_else(|| IdentityError::BadResponse("profile has no email".into()))?;
        Ok(IdentityProfile { email, name: info.name })
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, IdentityError> {
        let body = self
            .post_token_form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        body.access_token
            .ok_or_else(|| IdentityError::BadResponse("Failed to refresh access token".into()))
    }
}
