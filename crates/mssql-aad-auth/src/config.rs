//! Application identity used to construct identity clients.

use crate::error::AuthError;
use crate::identity::ClientOptions;

/// Client id registered for the sample SQL authentication provider.
pub const DEFAULT_APP_CLIENT_ID: &str = "2fd908ad-0664-4344-b9be-cd3e8b574c38";

/// Application name reported to the identity service by default.
pub const DEFAULT_APP_NAME: &str = "Sample Sql Auth Provider Implementation";

/// Environment variable overriding the application client id.
pub const ENV_CLIENT_ID: &str = "MSSQL_AAD_CLIENT_ID";

/// Environment variable overriding the application name.
pub const ENV_APP_NAME: &str = "MSSQL_AAD_APP_NAME";

/// Environment variable setting an explicit redirect URI.
pub const ENV_REDIRECT_URI: &str = "MSSQL_AAD_REDIRECT_URI";

/// Identity of the calling application.
///
/// This struct is marked `#[non_exhaustive]`; construct it with
/// [`AuthenticatorConfig::new`], [`Default::default()`] or
/// [`AuthenticatorConfig::from_env`] and the builder methods.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct AuthenticatorConfig {
    /// Application (client) id.
    pub client_id: String,

    /// Application display name.
    pub app_name: String,

    /// Redirect URI for interactive sign-in.
    ///
    /// `None` lets the identity client pick its platform default.
    pub redirect_uri: Option<String>,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_APP_CLIENT_ID.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            redirect_uri: None,
        }
    }
}

impl AuthenticatorConfig {
    /// Create a configuration for the given application.
    pub fn new(client_id: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            app_name: app_name.into(),
            redirect_uri: None,
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// Unset variables fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            config.client_id = client_id;
        }
        if let Some(app_name) = lookup(ENV_APP_NAME) {
            config.app_name = app_name;
        }
        config.redirect_uri = lookup(ENV_REDIRECT_URI).filter(|uri| !uri.trim().is_empty());
        config
    }

    /// Set the application client id.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Set an explicit redirect URI.
    #[must_use]
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Check that the required fields are present.
    ///
    /// Only emptiness is checked here. The identity client decides whether
    /// the values are well-formed when it constructs an instance.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the client id or application
    /// name is blank.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Configuration(
                "application client id must not be empty".into(),
            ));
        }
        if self.app_name.trim().is_empty() {
            return Err(AuthError::Configuration(
                "application name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Options for constructing an identity client for one authority.
    #[must_use]
    pub fn client_options(&self, authority: &str, audience: &str) -> ClientOptions {
        ClientOptions {
            authority: authority.to_string(),
            audience: audience.to_string(),
            client_id: self.client_id.clone(),
            client_name: self.app_name.clone(),
            redirect_uri: self.redirect_uri.clone(),
        }
    }
}
