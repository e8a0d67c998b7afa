//! Account document schema
//!
//! Stores credentials and the role used for authorization.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{new_document_id, Metadata};

/// Collection name for accounts
pub const ACCOUNT_COLLECTION: &str = "users";

/// Account document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AccountDoc {
    #[serde(rename = "_id")]
    pub id: String,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Notification address for flagged-content mail
    pub email: String,

    /// Login name, unique
    pub username: String,

    /// Argon2 password hash
    pub password_hash: String,

    #[serde(default)]
    pub role: Role,
}

impl AccountDoc {
    pub fn new(email: String, username: String, password_hash: String, role: Role) -> Self {
        Self {
            id: new_document_id(),
            metadata: Metadata::new(),
            email,
            username,
            password_hash,
            role,
        }
    }
}

impl IntoIndexes for AccountDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AccountDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
