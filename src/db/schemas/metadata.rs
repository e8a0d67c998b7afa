//! Common metadata for all documents
//!
//! Tracks creation, update, and soft deletion timestamps.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// Whether this document has been soft-deleted
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(now),
            created_at: Some(now),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(DateTime::now());
    }

    /// RFC 3339 creation time for API responses
    pub fn created_rfc3339(&self) -> Option<String> {
        self.created_at.map(|dt| dt.to_chrono().to_rfc3339())
    }
}

/// Fresh document id in ObjectId hex form
pub fn new_document_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}
