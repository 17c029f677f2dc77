//! NewsData.io client with multi-key rotation
//!
//! `RotatingKeyHttpClient` wraps the NewsData.io REST API for the agents of
//! the prediction-market pipeline. It owns a `key_pool::CredentialPool` and
//! hides rate limiting from callers:
//! - a 429 parks the key, rotates to the least-recently-used key and reissues
//!   the same request without touching the ordinary retry budget
//! - when every key is parked the call returns an empty successful response
//!   instead of an error
//!
//! Callers see three outcomes: articles, an empty result, or an `Error` for
//! configuration problems and failures unrelated to rate limiting.

pub mod client;
pub mod error;
pub mod query;
pub mod response;

pub use client::{ClientConfig, RotatingKeyHttpClient};
pub use error::{Error, Result};
pub use query::{Endpoint, NewsQuery};
pub use response::{Article, NewsResponse};
