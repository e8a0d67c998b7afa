//! Database schemas for Notewarden
//!
//! Defines MongoDB document structures for accounts, courses, modules and
//! votable content.

mod account;
mod content;
mod course;
mod metadata;

pub use account::{AccountDoc, ACCOUNT_COLLECTION};
pub use content::{ContentDoc, ContentKind, COMMENT_COLLECTION, NOTE_COLLECTION};
pub use course::{
    CourseDoc, CourseFields, CourseFormat, ModuleDoc, COURSE_COLLECTION, MODULE_COLLECTION,
};
pub use metadata::{new_document_id, Metadata};
