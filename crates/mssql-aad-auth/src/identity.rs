//! Identity client capability.
//!
//! The token endpoint protocol (authorization requests, redirect handling,
//! token cache persistence) lives behind [`IdentityClient`]. This crate only
//! drives it: one client per authority, created through an
//! [`IdentityClientFactory`].
//!
//! Silent acquisition reports its result as a [`SilentOutcome`] so that the
//! recoverable "interaction required" case is an ordinary value rather than
//! an error the orchestrator has to pick apart.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A previously authenticated identity known to an identity client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    username: String,
    home_account_id: Option<String>,
}

impl Account {
    /// Create an account handle with the given login name.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            home_account_id: None,
        }
    }

    /// Attach the identity client's opaque account identifier.
    #[must_use]
    pub fn with_home_account_id(mut self, id: impl Into<String>) -> Self {
        self.home_account_id = Some(id.into());
        self
    }

    /// Login name of the account.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Opaque account identifier, if the identity client supplied one.
    #[must_use]
    pub fn home_account_id(&self) -> Option<&str> {
        self.home_account_id.as_deref()
    }
}

/// A token issued by the identity client.
#[derive(Clone)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,
    /// Absolute expiry reported by the identity client.
    pub expires_on: DateTime<Utc>,
}

impl TokenResponse {
    /// Create a token response.
    pub fn new(access_token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_on,
        }
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Failure detail reported by the identity client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    /// Service error code, such as `invalid_grant`.
    pub code: Option<String>,
    /// Human-readable description. Must not contain token material.
    pub message: String,
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for IdentityError {}

impl IdentityError {
    /// Create an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create an error carrying a service error code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Result of a silent acquisition attempt.
#[derive(Debug, Clone)]
pub enum SilentOutcome {
    /// A token was obtained without user interaction.
    Success(TokenResponse),
    /// The request cannot complete without the user, e.g. consent is
    /// missing or the refresh token is no longer usable.
    InteractionRequired {
        /// Why interaction is needed.
        reason: String,
    },
    /// Any other failure. Not recoverable by prompting the user.
    Failure(IdentityError),
}

/// Settings used to construct an identity client for one authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Authority host URL, e.g. `https://login.microsoftonline.com`.
    pub authority: String,
    /// Tenant or audience, e.g. `common` or a tenant id.
    pub audience: String,
    /// Application (client) id.
    pub client_id: String,
    /// Application display name.
    pub client_name: String,
    /// Redirect URI; `None` selects the identity client's default.
    pub redirect_uri: Option<String>,
}

/// An identity client bound to a single authority and audience.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// List accounts with cached sign-in state.
    async fn accounts(&self) -> Result<Vec<Account>, IdentityError>;

    /// Acquire a token for `account` without user interaction.
    async fn acquire_token_silent(&self, scopes: &[String], account: &Account) -> SilentOutcome;

    /// Acquire a token by presenting a sign-in experience to the user.
    ///
    /// `login_hint`, when present, pre-fills the identity being signed in.
    async fn acquire_token_interactive(
        &self,
        scopes: &[String],
        login_hint: Option<&str>,
    ) -> Result<TokenResponse, IdentityError>;
}

/// Constructs identity clients.
///
/// Construction is synchronous: it only validates and records settings.
/// A malformed authority or client id is rejected here.
pub trait IdentityClientFactory: Send + Sync {
    /// Build a client for the given options.
    fn create(&self, options: &ClientOptions) -> Result<Arc<dyn IdentityClient>, IdentityError>;
}

impl<F> IdentityClientFactory for F
where
    F: Fn(&ClientOptions) -> Result<Arc<dyn IdentityClient>, IdentityError> + Send + Sync,
{
    fn create(&self, options: &ClientOptions) -> Result<Arc<dyn IdentityClient>, IdentityError> {
        self(options)
    }
}
