//! # mssql-aad-auth
//!
//! Interactive Active Directory (Entra ID) token acquisition for SQL Server
//! connections.
//!
//! Given the authority, audience, scopes and optional username of a
//! connection attempt, [`Authenticator`] produces a bearer [`AccessToken`].
//! Cached sign-in state is reused through silent acquisition whenever a
//! cached account matches the username; otherwise, or when the identity
//! service requires interaction, the user is signed in interactively.
//!
//! The identity protocol itself is supplied by an [`IdentityClient`]
//! implementation. This crate keeps one client per authority in an
//! [`AuthorityRegistry`] and drives it.
//!
//! ## Components
//!
//! | Component | Type | Description |
//! |-----------|------|-------------|
//! | Application identity | [`AuthenticatorConfig`] | Client id and app name |
//! | Authority registry | [`AuthorityRegistry`] | One client per `authority/audience` |
//! | Account resolver | [`find_account`] | Case-insensitive username match |
//! | Orchestrator | [`Authenticator`] | Silent first, interactive fallback |
//! | Blocking facade | [`BlockingAuthenticator`] | For non-async callers |
//! | Connection seam | [`TokenProvider`], [`FedAuthInfo`] | Server login integration |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod account;
pub mod authenticator;
pub mod blocking;
pub mod config;
pub mod error;
pub mod identity;
pub mod params;
pub mod provider;
pub mod registry;

pub use account::find_account;
pub use authenticator::Authenticator;
pub use blocking::BlockingAuthenticator;
pub use config::AuthenticatorConfig;
pub use error::{AcquisitionStage, AuthError, Result};
pub use identity::{
    Account, ClientOptions, IdentityClient, IdentityClientFactory, IdentityError, SilentOutcome,
    TokenResponse,
};
pub use params::{AccessToken, AuthenticationMethod, AuthenticationParams};
pub use provider::{FedAuthInfo, TokenProvider};
pub use registry::AuthorityRegistry;
pub use tokio_util::sync::CancellationToken;
