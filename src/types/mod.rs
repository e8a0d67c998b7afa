//! Shared types for Notewarden

mod error;

pub use error::{NotewardenError, Result};
