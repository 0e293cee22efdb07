//! Session helpers - registration and login against the Conduit API
//!
//! These bypass the UI so specs can start from a known user or an
//! authenticated browser without clicking through forms.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{SuiteConfig, TestUser, DEFAULT_AVATAR};
use crate::error::{E2eError, E2eResult};

/// Local storage key the Conduit frontend reads its bearer token from
pub const TOKEN_STORAGE_KEY: &str = "jwt";

/// Fields to replace on the default user before registering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UserOverrides {
    /// Overlay these fields on `defaults`
    pub fn apply_to(&self, defaults: &TestUser) -> TestUser {
        TestUser {
            username: self.username.clone().unwrap_or_else(|| defaults.username.clone()),
            email: self.email.clone().unwrap_or_else(|| defaults.email.clone()),
            password: self.password.clone().unwrap_or_else(|| defaults.password.clone()),
            image: self
                .image
                .clone()
                .or_else(|| defaults.image.clone())
                .or_else(|| Some(DEFAULT_AVATAR.to_string())),
        }
    }
}

/// The subset of a user sent to the login endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl From<&TestUser> for Credentials {
    fn from(user: &TestUser) -> Self {
        Self {
            email: user.email.clone(),
            password: user.password.clone(),
        }
    }
}

/// What the registration endpoint said. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created,
    AlreadyExists,
    Rejected(u16),
}

/// Somewhere a token can be stored before the next page load
pub trait LocalStorage {
    fn set_item(&mut self, key: &str, value: &str);
}

impl LocalStorage for HashMap<String, String> {
    fn set_item(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

#[derive(Serialize)]
struct UserEnvelope<T> {
    user: T,
}

#[derive(Deserialize)]
struct LoginResponse {
    user: Option<LoginResponseUser>,
}

#[derive(Deserialize)]
struct LoginResponseUser {
    token: Option<String>,
}

/// HTTP client for the Conduit user endpoints
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    api_url: String,
    default_user: TestUser,
}

impl SessionClient {
    pub fn new(config: &SuiteConfig) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.default_command_timeout_ms.max(1000).saturating_mul(5)))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            default_user: config.user.clone(),
        })
    }

    pub fn default_user(&self) -> &TestUser {
        &self.default_user
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Register the default user with `overrides` applied.
    ///
    /// Any HTTP status is accepted so repeated runs stay green when the user
    /// already exists. Only transport failures are errors.
    pub async fn ensure_user_exists(&self, overrides: &UserOverrides) -> E2eResult<RegistrationOutcome> {
        let user = overrides.apply_to(&self.default_user);
        let url = self.endpoint("/api/users");

        let resp = self
            .http
            .post(&url)
            .json(&UserEnvelope { user: &user })
            .send()
            .await?;

        let status = resp.status();
        let outcome = if status.is_success() {
            info!("Registered test user '{}'", user.username);
            RegistrationOutcome::Created
        } else if status == StatusCode::CONFLICT {
            debug!("Test user '{}' already exists", user.username);
            RegistrationOutcome::AlreadyExists
        } else {
            warn!("Registration of '{}' returned {}, continuing", user.username, status);
            RegistrationOutcome::Rejected(status.as_u16())
        };

        Ok(outcome)
    }

    /// Log in and return the bearer token. Uses the default user when
    /// `credentials` is `None`.
    pub async fn login_token(&self, credentials: Option<&Credentials>) -> E2eResult<String> {
        let credentials = credentials
            .cloned()
            .unwrap_or_else(|| Credentials::from(&self.default_user));
        let url = self.endpoint("/api/users/login");

        debug!("Logging in as {}", credentials.email);

        let resp = self
            .http
            .post(&url)
            .json(&UserEnvelope { user: &credentials })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(E2eError::LoginRejected {
                url,
                status: status.as_u16(),
            });
        }

        let body: LoginResponse = resp.json().await?;
        body.user
            .and_then(|u| u.token)
            .filter(|t| !t.is_empty())
            .ok_or(E2eError::TokenMissing(url))
    }

    /// Log in and store the token under [`TOKEN_STORAGE_KEY`] so the next page
    /// load renders as authenticated.
    pub async fn establish_session<S>(
        &self,
        credentials: Option<&Credentials>,
        storage: &mut S,
    ) -> E2eResult<String>
    where
        S: LocalStorage + ?Sized,
    {
        let token = self.login_token(credentials).await?;
        storage.set_item(TOKEN_STORAGE_KEY, &token);
        Ok(token)
    }
}
