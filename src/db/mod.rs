//! Persistence for Notewarden
//!
//! - `repository`: the traits services depend on
//! - `memory`: DashMap backend for dev mode and tests
//! - `mongo` / `mongo_store`: MongoDB backend

pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod repository;
pub mod schemas;

pub use memory::MemoryStore;
pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use mongo_store::MongoStore;
pub use repository::{
    AccountRepository, ConditionalUpdate, ContentFilter, ContentRepository, CourseRepository,
    VoteMutation,
};
