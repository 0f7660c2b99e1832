//! Scripted identity client for tests.
//!
//! [`MockIdentityClient`] answers from a script (known accounts, a queue of
//! silent outcomes, one interactive result) and records every call so tests
//! can assert which acquisition path was taken.
//! [`MockClientFactory`] builds one such client per authority and counts
//! constructions.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_aad_testing::{MockClientBuilder, MockClientFactory};
//! use mssql_aad_auth::{Account, SilentOutcome};
//!
//! let factory = MockClientFactory::new(
//!     MockClientBuilder::new()
//!         .with_account(Account::new("alice@contoso.com"))
//!         .with_silent_outcome(SilentOutcome::InteractionRequired { reason: "consent".into() })
//!         .with_interactive_token("T2", expiry),
//! );
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mssql_aad_auth::registry::registry_key;
use mssql_aad_auth::{
    Account, ClientOptions, IdentityClient, IdentityClientFactory, IdentityError, SilentOutcome,
    TokenResponse,
};
use parking_lot::Mutex;

/// How the mock answers interactive sign-in.
#[derive(Debug, Clone)]
pub enum MockInteractive {
    /// Sign-in succeeds with this token.
    Token(TokenResponse),
    /// Sign-in fails.
    Error(IdentityError),
    /// Sign-in never completes, like a prompt nobody answers.
    Pending,
}

/// A call received by a [`MockIdentityClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// Account enumeration.
    Accounts,
    /// Silent acquisition.
    Silent {
        /// Login name of the account passed in.
        username: String,
        /// Requested scopes.
        scopes: Vec<String>,
    },
    /// Interactive sign-in.
    Interactive {
        /// Login hint passed in, if any.
        login_hint: Option<String>,
        /// Requested scopes.
        scopes: Vec<String>,
    },
}

/// Script for a [`MockIdentityClient`].
#[derive(Debug, Clone)]
pub struct MockClientBuilder {
    accounts: Vec<Account>,
    enumeration_error: Option<IdentityError>,
    silent: VecDeque<SilentOutcome>,
    interactive: MockInteractive,
    delay: Duration,
}

impl MockClientBuilder {
    /// Create a script with no accounts, silent acquisition always
    /// requiring interaction, and failing interactive sign-in.
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            enumeration_error: None,
            silent: VecDeque::new(),
            interactive: MockInteractive::Error(IdentityError::new(
                "no interactive result scripted",
            )),
            delay: Duration::ZERO,
        }
    }

    /// Add a cached account.
    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    /// Add cached accounts by login name.
    pub fn with_accounts<'a>(mut self, usernames: impl IntoIterator<Item = &'a str>) -> Self {
        self.accounts.extend(usernames.into_iter().map(Account::new));
        self
    }

    /// Make account enumeration fail.
    pub fn with_enumeration_error(mut self, error: IdentityError) -> Self {
        self.enumeration_error = Some(error);
        self
    }

    /// Queue the outcome of the next silent acquisition.
    pub fn with_silent_outcome(mut self, outcome: SilentOutcome) -> Self {
        self.silent.push_back(outcome);
        self
    }

    /// Queue a successful silent acquisition.
    pub fn with_silent_token(self, token: &str, expires_on: DateTime<Utc>) -> Self {
        self.with_silent_outcome(SilentOutcome::Success(TokenResponse::new(token, expires_on)))
    }

    /// Make interactive sign-in succeed.
    pub fn with_interactive_token(mut self, token: &str, expires_on: DateTime<Utc>) -> Self {
        self.interactive = MockInteractive::Token(TokenResponse::new(token, expires_on));
        self
    }

    /// Make interactive sign-in fail.
    pub fn with_interactive_error(mut self, error: IdentityError) -> Self {
        self.interactive = MockInteractive::Error(error);
        self
    }

    /// Make interactive sign-in never complete.
    pub fn with_pending_interactive(mut self) -> Self {
        self.interactive = MockInteractive::Pending;
        self
    }

    /// Delay every call by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Build a client for the given options.
    pub fn build(self, options: ClientOptions) -> MockIdentityClient {
        MockIdentityClient {
            options,
            accounts: self.accounts,
            enumeration_error: self.enumeration_error,
            silent: Mutex::new(self.silent),
            interactive: self.interactive,
            delay: self.delay,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MockClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A scripted [`IdentityClient`].
pub struct MockIdentityClient {
    options: ClientOptions,
    accounts: Vec<Account>,
    enumeration_error: Option<IdentityError>,
    silent: Mutex<VecDeque<SilentOutcome>>,
    interactive: MockInteractive,
    delay: Duration,
    calls: Mutex<Vec<MockCall>>,
}

impl MockIdentityClient {
    /// Options this client was constructed with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of silent acquisition calls.
    pub fn silent_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Silent { .. }))
    }

    /// Number of interactive sign-in calls.
    pub fn interactive_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Interactive { .. }))
    }

    /// Login hints passed to interactive sign-in, in order.
    pub fn login_hints(&self) -> Vec<Option<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                MockCall::Interactive { login_hint, .. } => Some(login_hint.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(*c)).count()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl IdentityClient for MockIdentityClient {
    async fn accounts(&self) -> Result<Vec<Account>, IdentityError> {
        self.record(MockCall::Accounts);
        self.pause().await;
        match &self.enumeration_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.accounts.clone()),
        }
    }

    async fn acquire_token_silent(&self, scopes: &[String], account: &Account) -> SilentOutcome {
        self.record(MockCall::Silent {
            username: account.username().to_string(),
            scopes: scopes.to_vec(),
        });
        self.pause().await;
        let next = self.silent.lock().pop_front();
        next.unwrap_or_else(|| SilentOutcome::InteractionRequired {
            reason: "no silent outcome scripted".into(),
        })
    }

    async fn acquire_token_interactive(
        &self,
        scopes: &[String],
        login_hint: Option<&str>,
    ) -> Result<TokenResponse, IdentityError> {
        self.record(MockCall::Interactive {
            login_hint: login_hint.map(str::to_string),
            scopes: scopes.to_vec(),
        });
        self.pause().await;
        match &self.interactive {
            MockInteractive::Token(token) => Ok(token.clone()),
            MockInteractive::Error(error) => Err(error.clone()),
            MockInteractive::Pending => std::future::pending().await,
        }
    }
}

impl fmt::Debug for MockIdentityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockIdentityClient")
            .field("options", &self.options)
            .field("accounts", &self.accounts)
            .field("calls", &self.calls.lock().len())
            .finish_non_exhaustive()
    }
}

/// Factory building a [`MockIdentityClient`] per authority from one script.
///
/// Authorities that are not `https://` URLs, or that were explicitly
/// rejected, fail construction the way a real identity client rejects a
/// malformed authority.
pub struct MockClientFactory {
    script: MockClientBuilder,
    rejected: Vec<String>,
    construction_delay: Duration,
    attempts: AtomicUsize,
    created: Mutex<Vec<Arc<MockIdentityClient>>>,
}

impl MockClientFactory {
    /// Create a factory using `script` for every client.
    pub fn new(script: MockClientBuilder) -> Self {
        Self {
            script,
            rejected: Vec::new(),
            construction_delay: Duration::ZERO,
            attempts: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Fail construction for this authority.
    pub fn reject_authority(mut self, authority: impl Into<String>) -> Self {
        self.rejected.push(authority.into());
        self
    }

    /// Block for `delay` inside every construction.
    pub fn with_construction_delay(mut self, delay: Duration) -> Self {
        self.construction_delay = delay;
        self
    }

    /// Number of construction attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of clients successfully constructed.
    pub fn creations(&self) -> usize {
        self.created.lock().len()
    }

    /// All clients constructed so far.
    pub fn clients(&self) -> Vec<Arc<MockIdentityClient>> {
        self.created.lock().clone()
    }

    /// The client constructed for an authority and audience.
    pub fn client_for(&self, authority: &str, audience: &str) -> Option<Arc<MockIdentityClient>> {
        let key = registry_key(authority, audience);
        self.created
            .lock()
            .iter()
            .find(|c| registry_key(&c.options.authority, &c.options.audience) == key)
            .cloned()
    }
}

impl IdentityClientFactory for MockClientFactory {
    fn create(&self, options: &ClientOptions) -> Result<Arc<dyn IdentityClient>, IdentityError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.construction_delay.is_zero() {
            std::thread::sleep(self.construction_delay);
        }

        if !options.authority.starts_with("https://")
            || self.rejected.iter().any(|a| a == &options.authority)
        {
            return Err(IdentityError::with_code(
                "invalid_authority",
                format!("authority '{}' is not valid", options.authority),
            ));
        }
        if options.client_id.trim().is_empty() {
            return Err(IdentityError::with_code("invalid_client", "empty client id"));
        }

        let client = Arc::new(self.script.clone().build(options.clone()));
        self.created.lock().push(Arc::clone(&client));
        Ok(client)
    }
}

impl fmt::Debug for MockClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockClientFactory")
            .field("attempts", &self.attempts())
            .field("creations", &self.creations())
            .finish_non_exhaustive()
    }
}
