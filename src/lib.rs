//! Notewarden - course notes with vote-driven moderation
//!
//! Notewarden serves courses, their modules, and the notes and comments
//! students post under them. Posts are voted on; a post whose score drops to
//! the flag threshold is hidden from non-admins and its author is notified.
//!
//! ## Components
//!
//! - **Auth**: JWT issuing and verification, bearer guard, Argon2 passwords
//! - **Ledger**: one vote per user per post, flag transitions, notifications
//! - **Policy**: who may modify, create and see what
//! - **Services**: accounts, courses and modules, notes and comments
//! - **Store**: in-memory (dev) or MongoDB repositories

pub mod auth;
pub mod config;
pub mod db;
pub mod ledger;
pub mod notify;
pub mod policy;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{NotewardenError, Result};
