//! Persistence backends
//!
//! - `mongo`: typed MongoDB collection wrapper
//! - `schemas`: stored document shapes and their indexes
//! - `store`: MongoDB implementation of the store traits
//! - `memory`: in-process implementation for dev mode and tests

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use store::{MongoStore, Stores};
