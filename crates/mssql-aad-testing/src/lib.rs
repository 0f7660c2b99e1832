//! # mssql-aad-testing
//!
//! Test infrastructure for the interactive Active Directory authenticator.
//!
//! ## Features
//!
//! - Scripted identity client recording every call it receives
//! - Factory counting client constructions and rejecting bad authorities
//! - Fixtures for common authorities, scopes and timestamps
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mssql_aad_testing::{fixtures, MockClientBuilder, MockClientFactory};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::test]
//! async fn test_no_username_signs_in_interactively() {
//!     let factory = Arc::new(MockClientFactory::new(
//!         MockClientBuilder::new().with_interactive_token("T", fixtures::at(1_900_000_000)),
//!     ));
//!     let auth = fixtures::authenticator(Arc::clone(&factory));
//!     let token = auth
//!         .get_token(&fixtures::interactive_params(None), &CancellationToken::new())
//!         .await
//!         .unwrap();
//!     assert_eq!(token.token(), "T");
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod mock_client;

pub use mock_client::{
    MockCall, MockClientBuilder, MockClientFactory, MockIdentityClient, MockInteractive,
};
