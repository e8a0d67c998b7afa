//! Votable content schema (notes and comments)
//!
//! Notes and comments share one shape; `parent_id` is the module id for a
//! note and the note id for a comment. Each kind lives in its own collection.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{new_document_id, Metadata};

pub const NOTE_COLLECTION: &str = "course_notes";
pub const COMMENT_COLLECTION: &str = "comments";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Note,
    Comment,
}

impl ContentKind {
    pub fn collection(self) -> &'static str {
        match self {
            ContentKind::Note => NOTE_COLLECTION,
            ContentKind::Comment => COMMENT_COLLECTION,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Note => "note",
            ContentKind::Comment => "comment",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ContentDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub kind: ContentKind,

    /// Module id (note) or note id (comment)
    pub parent_id: String,

    /// Immutable after creation
    pub author_id: String,

    pub body: String,

    /// Net of +1/-1 votes
    #[serde(default)]
    pub score: i64,

    #[serde(default)]
    pub flagged: bool,

    /// Accounts that have voted; never holds an id twice
    #[serde(default)]
    pub voted_by: Vec<String>,
}

impl ContentDoc {
    /// New unflagged item with score 0 and no voters
    pub fn new(kind: ContentKind, parent_id: String, author_id: String, body: String) -> Self {
        Self {
            id: new_document_id(),
            metadata: Metadata::new(),
            kind,
            parent_id,
            author_id,
            body,
            score: 0,
            flagged: false,
            voted_by: Vec::new(),
        }
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.voted_by.iter().any(|v| v == voter_id)
    }
}

impl IntoIndexes for ContentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "parent_id": 1, "flagged": 1 },
                Some(
                    IndexOptions::builder()
                        .name("parent_flagged_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "author_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ContentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
