//! Types shared by the news gateway crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
