//! mic-backend - submission workflow for the Innovation Centre
//!
//! Students submit ideas, admins triage them, faculty review and track their
//! incubation. Every status change is a single conditional update checked
//! against one transition table.
//!
//! ## Components
//!
//! - **Auth**: bearer token decode, role gate, request-scoped principal
//! - **Workflow**: submission state machine and student operations
//! - **Services**: notifications, email queue, triage, review, incubation, AI insights
//! - **Db**: MongoDB and in-memory stores
//! - **Server**: hyper HTTP surface

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;
pub mod workflow;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{MicError, Result};
