//! Shared types for the submission backend

pub mod error;

pub use error::{AuthError, MicError, Result};
